//! Configuration management for onl-platform.
//!
//! Defaults describe a stock ONL host. Each value can be overridden from the
//! environment, which is how the boot unit (and the test suite) points the
//! bring-up at a different root.

use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf, time::Duration};

use crate::error::{Error, Result};

/// Main configuration structure for platform bring-up.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Config {
    /// Mount point of sysfs
    pub sysfs_root: PathBuf,

    /// Device node directory (IPMI character devices live here)
    pub dev_root: PathBuf,

    /// Root of the per-release kernel module trees
    pub modules_root: PathBuf,

    /// File naming the running platform, written by the installer
    pub platform_file: PathBuf,

    /// BMC readiness retry budget
    pub ipmi: IpmiConfig,
}

/// Retry budget for bringing up the IPMI system interface.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct IpmiConfig {
    /// Attempts per layer, and number of outer cycles
    pub attempts: u32,

    /// Sleep between attempts within a layer
    #[serde(with = "secs")]
    pub interval: Duration,

    /// Length of one outer cycle
    #[serde(with = "secs")]
    pub cycle: Duration,
}

impl Default for IpmiConfig {
    fn default() -> Self {
        // The OS may boot faster than the BMC, so waiting is expected. If the
        // whole budget runs out something is wrong with the BMC.
        Self {
            attempts: 5,
            interval: Duration::from_secs(3),
            cycle: Duration::from_secs(60),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sysfs_root: PathBuf::from("/sys"),
            dev_root: PathBuf::from("/dev"),
            modules_root: PathBuf::from("/lib/modules"),
            platform_file: PathBuf::from("/etc/onl/platform"),
            ipmi: IpmiConfig::default(),
        }
    }
}

impl Config {
    /// Load defaults, then apply `ONL_*` environment overrides.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("ONL_SYSFS_ROOT") {
            config.sysfs_root = PathBuf::from(v);
        }
        if let Some(v) = lookup("ONL_DEV_ROOT") {
            config.dev_root = PathBuf::from(v);
        }
        if let Some(v) = lookup("ONL_MODULES_ROOT") {
            config.modules_root = PathBuf::from(v);
        }
        if let Some(v) = lookup("ONL_PLATFORM_FILE") {
            config.platform_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("ONL_IPMI_ATTEMPTS") {
            config.ipmi.attempts = parse_number("ONL_IPMI_ATTEMPTS", &v)?;
        }
        if let Some(v) = lookup("ONL_IPMI_INTERVAL_SECS") {
            config.ipmi.interval = parse_secs("ONL_IPMI_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = lookup("ONL_IPMI_CYCLE_SECS") {
            config.ipmi.cycle = parse_secs("ONL_IPMI_CYCLE_SECS", &v)?;
        }

        Ok(config)
    }
}

/// Longest retry interval or cycle accepted from the environment.
const MAX_SECS: u64 = 24 * 60 * 60;

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        Error::Config(format!("{key}: expected a non-negative integer, got {value:?}"))
    })
}

fn parse_secs(key: &str, value: &str) -> Result<Duration> {
    let secs: u64 = parse_number(key, value)?;
    if secs > MAX_SECS {
        return Err(Error::Config(format!(
            "{key}: {secs} seconds is longer than the {MAX_SECS} second limit"
        )));
    }
    Ok(Duration::from_secs(secs))
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
