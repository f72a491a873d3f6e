//! AS9737-32DB: 32 QSFP-DD + 2 SFP, with a BMC.
//!
//! Most of the board is behind the BMC, so nothing is loaded until the IPMI
//! system interface answers.

use async_trait::async_trait;

use super::{insmod_platform_modules, ENTERPRISE_NUMBER, MANUFACTURER};
use crate::{
    error::{Error, Result},
    host::Host,
    peripheral::ipmi::IpmiInit,
    platform::{Platform, PlatformDescriptor, PlatformInfo},
    topology::{I2cDevice, Optoe, Port, PortConfig},
    tracing::prelude::*,
};

pub static INFO: PlatformInfo = PlatformInfo {
    id: "x86-64-accton-as9737-32db-r0",
    model: "AS9737-32DB",
    sys_object_id: ".9737.32",
    manufacturer: MANUFACTURER,
    enterprise_number: ENTERPRISE_NUMBER,
    port_config: PortConfig::new(&[(32, 400), (1, 10), (1, 1)]),
};

const MODULE_PREFIX: &str = "x86-64-accton-as9737-32db";
const MODULES: [&str; 9] = [
    "i2c-ocores",
    "fpga",
    "mux",
    "cpld",
    "fan",
    "psu",
    "thermal",
    "sys",
    "leds",
];

const DEVICES: &[I2cDevice] = &[
    I2cDevice::new("as9737_32db_mux", 0x77, 0),
    I2cDevice::new("as9737_32db_cpld2", 0x61, 35),
    I2cDevice::new("as9737_32db_cpld3", 0x62, 36),
];

/// Each port CPLD holds the reset lines for a contiguous range of cages.
const RESET_BANKS: [(I2cDevice, std::ops::RangeInclusive<u16>); 2] = [
    (DEVICES[1], 1..=16),
    (DEVICES[2], 17..=32),
];

const QSFPDD_PORTS: u16 = 32;
const TOTAL_PORTS: u16 = 34;

pub struct As9737_32db;

impl As9737_32db {
    /// Take every QSFP-DD cage out of reset.
    async fn release_module_resets(&self, host: &mut Host<'_>) {
        for (cpld, ports) in RESET_BANKS {
            for port in ports {
                let attr = host.client_attr(cpld.bus, cpld.addr, &format!("module_reset_{}", port));
                host.set_attr(&attr, "0").await;
            }
        }
    }
}

#[async_trait]
impl Platform for As9737_32db {
    fn info(&self) -> &'static PlatformInfo {
        &INFO
    }

    fn i2c_devices(&self) -> Vec<I2cDevice> {
        DEVICES.to_vec()
    }

    /// Cage N sits on bus N.
    fn ports(&self) -> Vec<Port> {
        (1..=TOTAL_PORTS)
            .map(|n| {
                let eeprom = if n <= QSFPDD_PORTS {
                    Optoe::Optoe3
                } else {
                    Optoe::Optoe2
                };
                Port::new(n, u32::from(n), eeprom)
            })
            .collect()
    }

    async fn baseconfig(&self, host: &mut Host<'_>) -> Result<()> {
        let ipmi = IpmiInit::new(host.config().ipmi);
        if !ipmi.init(host).await {
            return Err(Error::IpmiUnavailable);
        }

        // These come from the distribution kernel, not the platform tree.
        host.modprobe("optoe").await?;
        host.modprobe("at24").await?;
        insmod_platform_modules(host, MODULE_PREFIX, &MODULES).await?;

        host.new_i2c_devices(DEVICES).await?;

        info!("Releasing transceiver resets");
        self.release_module_resets(host).await;

        host.register_ports(&self.ports()).await
    }
}

inventory::submit! {
    PlatformDescriptor {
        id: "x86-64-accton-as9737-32db-r0",
        create_fn: || Box::new(As9737_32db),
    }
}
