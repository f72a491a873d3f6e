//! IR3570 voltage regulator revision check.
//!
//! The IR3570A revision disturbs block-mode reads from the system EEPROM:
//! reading the 16th byte returns 0x08. Boards fitted with it have the
//! regulator's I2C interface switched off before the EEPROM is registered.
//! Other revisions are left alone.

use regex::Regex;
use std::sync::OnceLock;

use super::i2c_tools;
use crate::{
    error::{Error, Result},
    host::Host,
    tracing::prelude::*,
};

/// Bus the regulator sits on.
pub const IR3570_BUS: u32 = 0;

/// PMBus address the regulator answers on.
pub const IR3570_ADDR: u8 = 0x42;

/// PMBus MFR_MODEL, read as an SMBus block.
const MFR_MODEL: u8 = 0x9A;

/// Model byte reported by the affected revision.
pub const IR3570A_MODEL: u8 = 0x24;

/// Address of the IR3570A's I2C configuration interface.
pub const IR3570A_CONFIG_ADDR: u8 = 0x04;

/// Register writes that turn the IR3570A's I2C interface off, in order.
const DISABLE_I2C: [(u8, u8); 2] = [(0xE5, 0x01), (0x12, 0x02)];

/// Outcome of a successful check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ir3570Check {
    /// IR3570A found; its I2C interface was switched off
    Disabled,
    /// Some other model; nothing was written
    Unaffected { model: u8 },
}

/// The writes needed for a regulator reporting `model`, if any.
pub fn corrective_writes(model: u8) -> Option<&'static [(u8, u8)]> {
    (model == IR3570A_MODEL).then_some(&DISABLE_I2C[..])
}

/// Extract the first data byte from an `i2cdump ... s` table.
///
/// The byte is the second word on the last line, after the row label
/// (`00: 24 ...`).
pub fn parse_model(dump: &str) -> Result<u8> {
    static WORD: OnceLock<Regex> = OnceLock::new();
    let word = WORD.get_or_init(|| Regex::new(r"\w+").expect("static regex"));

    let last = dump
        .trim_end()
        .lines()
        .last()
        .ok_or_else(|| Error::Parse("empty i2cdump output".to_string()))?;

    let token = word
        .find_iter(last)
        .nth(1)
        .ok_or_else(|| Error::Parse(format!("no data byte in {:?}", last)))?
        .as_str();

    u8::from_str_radix(token, 16)
        .map_err(|_| Error::Parse(format!("{:?} is not a hex byte", token)))
}

/// Read the regulator model and disable the IR3570A if present.
pub async fn check(host: &mut Host<'_>) -> Result<Ir3570Check> {
    let out = i2c_tools::i2cdump_block(host, IR3570_BUS, IR3570_ADDR, MFR_MODEL).await?;
    let model = parse_model(&out.stdout)?;

    let Some(writes) = corrective_writes(model) else {
        debug!(model = %format!("0x{:02x}", model), "Regulator unaffected");
        return Ok(Ir3570Check::Unaffected { model });
    };

    info!("IR3570A found, disabling its I2C interface");
    let mut failure = None;
    for &(reg, value) in writes {
        match i2c_tools::i2cset(host, IR3570_BUS, IR3570A_CONFIG_ADDR, reg, value).await {
            Ok(out) if out.success() => {}
            Ok(out) => {
                failure = Some(Error::Command {
                    program: "i2cset".to_string(),
                    status: out.status,
                    stderr: out.stderr.trim().to_string(),
                });
            }
            Err(e) => failure = Some(e),
        }
    }

    match failure {
        Some(e) => Err(e),
        None => Ok(Ir3570Check::Disabled),
    }
}
