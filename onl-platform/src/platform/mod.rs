//! Platform definitions and the registry that finds them.
//!
//! Each supported switch is a [`Platform`]: an identity, a static I2C
//! topology and a `baseconfig` routine run once at boot. Platforms register
//! a [`PlatformDescriptor`] with `inventory::submit!` next to their
//! definition, so supporting a new SKU means adding one file.

pub mod accton;

use async_trait::async_trait;
use serde::Serialize;
use std::fs;

use crate::{
    config::Config,
    error::{Error, Result},
    host::Host,
    hw_trait::System,
    topology::{I2cDevice, Port, PortConfig},
    tracing::prelude::*,
};

/// Identity of a switch model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlatformInfo {
    /// ONL platform identifier, e.g. `x86-64-accton-es7636bt4-r0`
    pub id: &'static str,
    /// Marketing model name
    pub model: &'static str,
    /// SNMP sysObjectID suffix below the vendor's enterprise arc
    pub sys_object_id: &'static str,
    pub manufacturer: &'static str,
    /// IANA private enterprise number
    pub enterprise_number: u32,
    #[serde(serialize_with = "serialize_display")]
    pub port_config: PortConfig,
}

impl PlatformInfo {
    /// Full SNMP sysObjectID, e.g. `.1.3.6.1.4.1.259.7220.D4`.
    pub fn object_id(&self) -> String {
        format!(".1.3.6.1.4.1.{}{}", self.enterprise_number, self.sys_object_id)
    }
}

fn serialize_display<T: std::fmt::Display, S: serde::Serializer>(
    value: &T,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    s.collect_str(value)
}

/// A supported switch model.
#[async_trait]
pub trait Platform: Send + Sync {
    fn info(&self) -> &'static PlatformInfo;

    /// I2C clients instantiated unconditionally, in registration order.
    /// Transceiver EEPROMs are listed by [`Platform::ports`] instead.
    fn i2c_devices(&self) -> Vec<I2cDevice>;

    /// Front-panel ports whose EEPROMs are reached over I2C.
    fn ports(&self) -> Vec<Port> {
        Vec::new()
    }

    /// Load drivers and register devices. Runs once at boot.
    async fn baseconfig(&self, host: &mut Host<'_>) -> Result<()>;
}

/// Link-time registration record for a platform.
pub struct PlatformDescriptor {
    pub id: &'static str,
    pub create_fn: fn() -> Box<dyn Platform>,
}

inventory::collect!(PlatformDescriptor);

/// Platform registry backed by `inventory`.
pub struct PlatformRegistry;

impl PlatformRegistry {
    /// Descriptor registered under `id`, if any.
    pub fn find(&self, id: &str) -> Option<&'static PlatformDescriptor> {
        inventory::iter::<PlatformDescriptor>().find(|desc| desc.id == id)
    }

    /// Instantiate the platform registered under `id`.
    pub fn create(&self, id: &str) -> Result<Box<dyn Platform>> {
        self.find(id)
            .map(|desc| (desc.create_fn)())
            .ok_or_else(|| Error::UnknownPlatform(id.to_string()))
    }

    /// Every registered descriptor, sorted by id.
    pub fn all(&self) -> Vec<&'static PlatformDescriptor> {
        let mut all: Vec<_> = inventory::iter::<PlatformDescriptor>().collect();
        all.sort_by_key(|desc| desc.id);
        all
    }
}

/// Decide which platform we are running on.
///
/// An explicit identifier wins, then the `ONL_PLATFORM` value, then the
/// contents of the installer's platform file.
pub fn resolve_platform_id(
    explicit: Option<&str>,
    from_env: Option<&str>,
    config: &Config,
) -> Result<String> {
    fn given(id: Option<&str>) -> Option<&str> {
        id.map(str::trim).filter(|id| !id.is_empty())
    }
    if let Some(id) = given(explicit).or_else(|| given(from_env)) {
        return Ok(id.to_string());
    }

    let contents = fs::read_to_string(&config.platform_file).map_err(|e| {
        Error::Config(format!(
            "no platform given and {} is unreadable: {}",
            config.platform_file.display(),
            e
        ))
    })?;

    match contents.trim() {
        "" => Err(Error::Config(format!(
            "{} is empty",
            config.platform_file.display()
        ))),
        id => Ok(id.to_string()),
    }
}

/// Run `platform`'s bring-up against `sys`.
pub async fn run_baseconfig(
    platform: &dyn Platform,
    sys: &mut dyn System,
    config: &Config,
) -> Result<()> {
    let info = platform.info();
    info!(platform = info.id, model = info.model, "Starting baseconfig");

    let mut host = Host::new(sys, config, info);
    match platform.baseconfig(&mut host).await {
        Ok(()) => {
            info!(platform = info.id, "baseconfig complete");
            Ok(())
        }
        Err(e) => {
            error!(platform = info.id, error = %e, "baseconfig failed");
            Err(e)
        }
    }
}
