//! ES7636BT4 (IXR7220-D4): 28 QSFP + 8 QSFP-DD.

use async_trait::async_trait;

use super::{insmod_platform_modules, ENTERPRISE_NUMBER, MANUFACTURER};
use crate::{
    error::Result,
    host::Host,
    peripheral::{i2c_tools, ir3570},
    platform::{Platform, PlatformDescriptor, PlatformInfo},
    topology::{I2cDevice, Optoe, Port, PortConfig},
    tracing::prelude::*,
};

pub static INFO: PlatformInfo = PlatformInfo {
    id: "x86-64-accton-es7636bt4-r0",
    model: "IXR7220-D4",
    sys_object_id: ".7220.D4",
    manufacturer: MANUFACTURER,
    enterprise_number: ENTERPRISE_NUMBER,
    port_config: PortConfig::new(&[(8, 400), (28, 100)]),
};

const MODULE_PREFIX: &str = "x86-64-accton-es7636bt4";
const MODULES: [&str; 4] = ["cpld", "fan", "psu", "leds"];

const ROOT_MUX: I2cDevice = I2cDevice::new("pca9548", 0x77, 0);

const MUXES: &[I2cDevice] = &[
    I2cDevice::new("pca9548", 0x71, 2),
    I2cDevice::new("pca9548", 0x72, 2),
    I2cDevice::new("pca9548", 0x73, 20),
    I2cDevice::new("pca9548", 0x73, 21),
    I2cDevice::new("pca9548", 0x73, 22),
    I2cDevice::new("pca9548", 0x73, 23),
    I2cDevice::new("pca9548", 0x73, 24),
];

const CPLDS: &[I2cDevice] = &[
    I2cDevice::new("es7636bt4_cpld1", 0x60, 10),
    I2cDevice::new("es7636bt4_cpld2", 0x62, 10),
    I2cDevice::new("es7636bt4_cpld3", 0x64, 10),
];

const FAN_AND_THERMAL: &[I2cDevice] = &[
    I2cDevice::new("es7636bt4_fan", 0x66, 14),
    I2cDevice::new("lm75", 0x48, 15),
    I2cDevice::new("lm75", 0x49, 15),
    I2cDevice::new("lm75", 0x4a, 15),
    I2cDevice::new("lm75", 0x4c, 15),
    I2cDevice::new("lm75", 0x4b, 15),
];

const PSUS: &[I2cDevice] = &[
    I2cDevice::new("es7636bt4_psu1", 0x51, 9),
    I2cDevice::new("acbel_fsh082", 0x59, 9),
    I2cDevice::new("es7636bt4_psu2", 0x50, 9),
    I2cDevice::new("acbel_fsh082", 0x58, 9),
];

/// Current boards carry the system EEPROM at 0x57, early ones at 0x56.
const EEPROM_BUS: u32 = 0;
const EEPROM_ADDR: u8 = 0x57;
const LEGACY_EEPROM_ADDR: u8 = 0x56;

const QSFP_PORTS: u16 = 28;
const TOTAL_PORTS: u16 = 36;

pub struct Es7636bt4;

impl Es7636bt4 {
    /// QSFP cages 1-28 hang off buses 25-52, QSFP-DD cages 29-36 off 57-64.
    fn port(number: u16) -> Port {
        if number <= QSFP_PORTS {
            Port::new(number, u32::from(number) + 24, Optoe::Optoe1)
        } else {
            Port::new(number, u32::from(number) + 28, Optoe::Optoe2)
        }
    }

    async fn register_system_eeprom(&self, host: &mut Host<'_>) -> Result<()> {
        if i2c_tools::responds(host, EEPROM_BUS, EEPROM_ADDR).await {
            return host.new_i2c_device("24c02", EEPROM_ADDR, EEPROM_BUS).await;
        }

        debug!("No EEPROM at 0x57, assuming an early board");
        match ir3570::check(host).await {
            Ok(result) => debug!(?result, "IR3570 check done"),
            Err(e) => warn!(error = %e, "IR3570 check failed"),
        }
        host.new_i2c_device("24c02", LEGACY_EEPROM_ADDR, EEPROM_BUS).await
    }
}

#[async_trait]
impl Platform for Es7636bt4 {
    fn info(&self) -> &'static PlatformInfo {
        &INFO
    }

    fn i2c_devices(&self) -> Vec<I2cDevice> {
        std::iter::once(ROOT_MUX)
            .chain(MUXES.iter().copied())
            .chain(CPLDS.iter().copied())
            .chain(FAN_AND_THERMAL.iter().copied())
            .chain(PSUS.iter().copied())
            .collect()
    }

    fn ports(&self) -> Vec<Port> {
        (1..=TOTAL_PORTS).map(Self::port).collect()
    }

    async fn baseconfig(&self, host: &mut Host<'_>) -> Result<()> {
        host.insmod("optoe").await?;
        host.insmod("accton_i2c_psu").await?;
        insmod_platform_modules(host, MODULE_PREFIX, &MODULES).await?;

        host.new_i2c_devices(&self.i2c_devices()).await?;
        host.register_ports(&self.ports()).await?;

        self.register_system_eeprom(host).await
    }
}

inventory::submit! {
    PlatformDescriptor {
        id: "x86-64-accton-es7636bt4-r0",
        create_fn: || Box::new(Es7636bt4),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config,
        hw_trait::CommandOutput,
        platform::accton::module_paths,
        testing::MockSystem,
    };
    use std::path::PathBuf;
    use test_case::test_case;

    const NEW_DEVICE_0: &str = "/sys/bus/i2c/devices/i2c-0/new_device";

    fn installed() -> MockSystem {
        module_paths(MODULE_PREFIX, &MODULES)
            .into_iter()
            .fold(MockSystem::default(), |sys, path| sys.with_path(path))
    }

    fn new_device_writes(sys: &MockSystem) -> Vec<(PathBuf, String)> {
        sys.writes
            .iter()
            .filter(|(path, _)| path.ends_with("new_device"))
            .cloned()
            .collect()
    }

    #[test_case(1, 25, Optoe::Optoe1 ; "first qsfp")]
    #[test_case(28, 52, Optoe::Optoe1 ; "last qsfp")]
    #[test_case(29, 57, Optoe::Optoe2 ; "first qsfp-dd")]
    #[test_case(36, 64, Optoe::Optoe2 ; "last qsfp-dd")]
    fn test_port_layout(number: u16, bus: u32, eeprom: Optoe) {
        let port = Es7636bt4.ports()[usize::from(number) - 1];
        assert_eq!(port, Port::new(number, bus, eeprom));
    }

    #[tokio::test]
    async fn test_baseconfig_new_board() {
        let config = Config::default();
        let mut sys = installed();
        let mut host = Host::new(&mut sys, &config, &INFO);

        Es7636bt4.baseconfig(&mut host).await.unwrap();

        let mut expected = vec![
            "modprobe optoe".to_string(),
            "modprobe accton_i2c_psu".to_string(),
        ];
        expected.extend(
            module_paths(MODULE_PREFIX, &MODULES)
                .iter()
                .map(|p| format!("insmod {p}")),
        );
        expected.push("i2cget -y 0 0x57".to_string());
        assert_eq!(sys.commands, expected);

        let registered = new_device_writes(&sys);
        assert_eq!(registered.len(), 21 + 36 + 1);
        assert_eq!(registered[0], (PathBuf::from(NEW_DEVICE_0), "pca9548 0x77\n".to_string()));
        assert_eq!(
            registered.last().unwrap(),
            &(PathBuf::from(NEW_DEVICE_0), "24c02 0x57\n".to_string())
        );
    }

    #[tokio::test]
    async fn test_baseconfig_names_every_port_once() {
        let config = Config::default();
        let mut sys = installed();
        let mut host = Host::new(&mut sys, &config, &INFO);

        Es7636bt4.baseconfig(&mut host).await.unwrap();

        for port in Es7636bt4.ports() {
            let attr = format!("/sys/bus/i2c/devices/{}-0050/port_name", port.bus);
            assert_eq!(sys.writes_to(&attr), vec![format!("port{}\n", port.number)]);
        }
    }

    #[tokio::test]
    async fn test_baseconfig_early_board_with_ir3570a() {
        let config = Config::default();
        let mut sys = installed()
            .with_result("i2cget -y 0 0x57", CommandOutput::failed(2, "Error: Read failed"))
            .with_result(
                "i2cdump -y 0 0x42 s 0x9a",
                CommandOutput::ok("     0  1  2  3\n00: 24 XX XX XX    $...\n"),
            );
        let mut host = Host::new(&mut sys, &config, &INFO);

        Es7636bt4.baseconfig(&mut host).await.unwrap();

        let tail: Vec<&str> = sys.commands.iter().rev().take(3).rev().map(String::as_str).collect();
        assert_eq!(
            tail,
            vec![
                "i2cdump -y 0 0x42 s 0x9a",
                "i2cset -y 0 0x04 0xe5 0x01",
                "i2cset -y 0 0x04 0x12 0x02",
            ]
        );
        assert_eq!(
            new_device_writes(&sys).last().unwrap().1,
            "24c02 0x56\n".to_string()
        );
    }

    #[tokio::test]
    async fn test_baseconfig_tolerates_failed_ir3570_check() {
        let config = Config::default();
        let mut sys = installed()
            .with_result("i2cget -y 0 0x57", CommandOutput::failed(2, ""))
            .with_result("i2cdump -y 0 0x42 s 0x9a", CommandOutput::failed(2, ""));
        let mut host = Host::new(&mut sys, &config, &INFO);

        Es7636bt4.baseconfig(&mut host).await.unwrap();

        assert_eq!(sys.count("i2cset -y 0 0x04 0xe5 0x01"), 0);
        assert_eq!(sys.writes_to(NEW_DEVICE_0).last(), Some(&"24c02 0x56\n"));
    }
}
