//! Static hardware topology types.
//!
//! Platforms describe their boards with these as `const` tables; bring-up
//! feeds them, in order, to the host helpers.

use serde::Serialize;
use std::{collections::HashMap, fmt};
use strum::{Display, EnumString, IntoStaticStr};

/// Address every transceiver EEPROM answers on.
pub const PORT_EEPROM_ADDR: u8 = 0x50;

/// One I2C client to instantiate: a driver bound at an address on a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct I2cDevice {
    pub driver: &'static str,
    pub addr: u8,
    pub bus: u32,
}

impl I2cDevice {
    pub const fn new(driver: &'static str, addr: u8, bus: u32) -> Self {
        Self { driver, addr, bus }
    }

    /// Kernel name of the client, e.g. `10-0060`.
    pub fn client_name(&self) -> String {
        client_name(self.bus, self.addr)
    }
}

impl fmt::Display for I2cDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@0x{:02x} on i2c-{}", self.driver, self.addr, self.bus)
    }
}

/// Kernel name of the client at `addr` on `bus`.
pub fn client_name(bus: u32, addr: u8) -> String {
    format!("{}-{:04x}", bus, addr)
}

/// Transceiver EEPROM driver class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Optoe {
    /// QSFP (SFF-8436 paged)
    Optoe1,
    /// SFP (SFF-8472, two addresses)
    Optoe2,
    /// CMIS (QSFP-DD, OSFP)
    Optoe3,
}

impl Optoe {
    /// Driver name to hand to `new_device`.
    pub fn driver(self) -> &'static str {
        self.into()
    }
}

/// One front-panel transceiver cage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Port {
    /// 1-based front-panel number
    pub number: u16,
    /// Bus the cage's EEPROM sits on
    pub bus: u32,
    pub eeprom: Optoe,
}

impl Port {
    pub const fn new(number: u16, bus: u32, eeprom: Optoe) -> Self {
        Self { number, bus, eeprom }
    }

    /// Value written to the client's `port_name` attribute.
    pub fn name(&self) -> String {
        format!("port{}", self.number)
    }

    /// The optoe client serving this cage.
    pub fn device(&self) -> I2cDevice {
        I2cDevice::new(self.eeprom.driver(), PORT_EEPROM_ADDR, self.bus)
    }
}

/// Advertised port layout, e.g. `8x400 + 28x100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortConfig {
    /// (port count, speed in Gb/s), fastest group first
    pub groups: &'static [(u16, u32)],
}

impl PortConfig {
    pub const fn new(groups: &'static [(u16, u32)]) -> Self {
        Self { groups }
    }

    /// Total number of front-panel ports.
    pub fn port_count(&self) -> u16 {
        self.groups.iter().map(|(count, _)| count).sum()
    }
}

impl fmt::Display for PortConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .groups
            .iter()
            .map(|(count, speed)| format!("{}x{}", count, speed))
            .collect();
        write!(f, "{}", parts.join(" + "))
    }
}

/// Clients declared more than once at the same (bus, address).
pub fn find_conflicts(devices: &[I2cDevice]) -> Vec<(u32, u8)> {
    let mut seen: HashMap<(u32, u8), usize> = HashMap::new();
    for dev in devices {
        *seen.entry((dev.bus, dev.addr)).or_default() += 1;
    }
    let mut conflicts: Vec<(u32, u8)> = seen
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(key, _)| key)
        .collect();
    conflicts.sort_unstable();
    conflicts
}
