//! Thin wrappers over the i2c-tools programs.
//!
//! Addresses and registers are always passed in hex and `-y` is always
//! given, since nobody is around to answer the confirmation prompt at boot.

use crate::{error::Result, host::Host, hw_trait::CommandOutput, tracing::prelude::*};

fn hex(value: u8) -> String {
    format!("0x{:02x}", value)
}

/// `i2cget -y <bus> <addr>`: read a byte with no register selected.
pub async fn i2cget(host: &mut Host<'_>, bus: u32, addr: u8) -> Result<CommandOutput> {
    host.run("i2cget", &["-y".to_string(), bus.to_string(), hex(addr)])
        .await
}

/// `i2cset -y <bus> <addr> <reg> <value>`: write one byte to a register.
pub async fn i2cset(
    host: &mut Host<'_>,
    bus: u32,
    addr: u8,
    reg: u8,
    value: u8,
) -> Result<CommandOutput> {
    host.run(
        "i2cset",
        &["-y".to_string(), bus.to_string(), hex(addr), hex(reg), hex(value)],
    )
    .await
}

/// `i2cdump -y <bus> <addr> s <command>`: SMBus block read, as a text table.
pub async fn i2cdump_block(
    host: &mut Host<'_>,
    bus: u32,
    addr: u8,
    command: u8,
) -> Result<CommandOutput> {
    host.run(
        "i2cdump",
        &["-y".to_string(), bus.to_string(), hex(addr), "s".to_string(), hex(command)],
    )
    .await
}

/// Whether anything acknowledges a read at `addr` on `bus`.
pub async fn responds(host: &mut Host<'_>, bus: u32, addr: u8) -> bool {
    match i2cget(host, bus, addr).await {
        Ok(out) => out.success(),
        Err(e) => {
            warn!(bus, addr = %hex(addr), error = %e, "Could not run i2cget");
            false
        }
    }
}
