//! Accton (Edgecore) x86-64 switches.

pub mod as9736_64d;
pub mod as9737_32db;
pub mod es7636bt4;

use crate::{error::Result, host::Host};

pub const MANUFACTURER: &str = "Accton";

/// IANA private enterprise number.
pub const ENTERPRISE_NUMBER: u32 = 259;

/// Load `<prefix>-<name>.ko` for each name, in order.
pub(crate) async fn insmod_platform_modules(
    host: &mut Host<'_>,
    prefix: &str,
    names: &[&str],
) -> Result<()> {
    for name in names {
        host.insmod(&format!("{}-{}.ko", prefix, name)).await?;
    }
    Ok(())
}

/// Where the platform's module files live in an installed ONL image.
#[cfg(test)]
pub(crate) fn module_paths(prefix: &str, names: &[&str]) -> Vec<String> {
    names
        .iter()
        .map(|name| format!("/lib/modules/5.10.0-test/onl/accton/{prefix}/{prefix}-{name}.ko"))
        .collect()
}
