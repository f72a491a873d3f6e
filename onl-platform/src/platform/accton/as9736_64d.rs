//! AS9736-64D: 64 QSFP-DD + 2 SFP+.
//!
//! Transceiver EEPROMs are read through the FPGA driver, so unlike the other
//! Accton boards no optoe clients are registered here.

use async_trait::async_trait;

use super::{insmod_platform_modules, ENTERPRISE_NUMBER, MANUFACTURER};
use crate::{
    error::Result,
    host::Host,
    platform::{Platform, PlatformDescriptor, PlatformInfo},
    topology::{I2cDevice, PortConfig},
};

pub static INFO: PlatformInfo = PlatformInfo {
    id: "x86-64-accton-as9736-64d-r0",
    model: "AS9736-64D",
    sys_object_id: ".9736.64",
    manufacturer: MANUFACTURER,
    enterprise_number: ENTERPRISE_NUMBER,
    port_config: PortConfig::new(&[(64, 400), (2, 10)]),
};

const MODULE_PREFIX: &str = "x86-64-accton-as9736-64d";
const MODULES: [&str; 6] = ["sys", "cpld", "fan", "psu", "leds", "fpga"];

/// Intel SMBus controller, shipped in the running kernel's own tree.
const ISMT_MODULE: &str = "kernel/drivers/i2c/busses/i2c-ismt.ko";

const ROOT_MUX: I2cDevice = I2cDevice::new("pca9548", 0x72, 0);

const MUXES: &[I2cDevice] = &[
    I2cDevice::new("pca9548", 0x71, 3),
    I2cDevice::new("pca9548", 0x71, 5),
    I2cDevice::new("pca9548", 0x76, 9),
    I2cDevice::new("pca9548", 0x70, 10),
    I2cDevice::new("pca9548", 0x70, 11),
    I2cDevice::new("pca9548", 0x70, 12),
    I2cDevice::new("pca9548", 0x70, 18),
    I2cDevice::new("pca9548", 0x70, 19),
];

// The UDB/LDB CPLDs are reached over PCIe and have no I2C client.
const CONTROLLERS: &[I2cDevice] = &[
    I2cDevice::new("as9736_64d_sys_cpld", 0x60, 6),
    I2cDevice::new("sys_fpga", 0x60, 17),
    I2cDevice::new("as9736_64d_fan", 0x33, 25),
    I2cDevice::new("as9736_64d_pdb_l_cpld", 0x60, 36),
    I2cDevice::new("as9736_64d_pdb_r_cpld", 0x60, 44),
    I2cDevice::new("scm_cpld", 0x35, 51),
];

const THERMAL: &[I2cDevice] = &[
    I2cDevice::new("lm75", 0x48, 2),
    I2cDevice::new("lm75", 0x49, 2),
    I2cDevice::new("lm75", 0x4C, 14),
    I2cDevice::new("lm75", 0x49, 27),
    I2cDevice::new("lm75", 0x48, 27),
    I2cDevice::new("lm75", 0x48, 34),
    I2cDevice::new("lm75", 0x49, 42),
    I2cDevice::new("lm75", 0x48, 57),
    I2cDevice::new("lm75", 0x4C, 58),
    I2cDevice::new("lm75", 0x4C, 65),
    I2cDevice::new("lm75", 0x4D, 66),
];

const PSUS: &[I2cDevice] = &[
    I2cDevice::new("as9736_64d_psu1", 0x50, 33),
    I2cDevice::new("acbel_fsh082", 0x58, 33),
    I2cDevice::new("as9736_64d_psu2", 0x51, 41),
    I2cDevice::new("acbel_fsh082", 0x59, 41),
];

/// System EEPROM. The driver really is registered as `as973d`.
const SYS_EEPROM: I2cDevice = I2cDevice::new("as973d_64d_sys", 0x51, 20);

pub struct As9736_64d;

#[async_trait]
impl Platform for As9736_64d {
    fn info(&self) -> &'static PlatformInfo {
        &INFO
    }

    fn i2c_devices(&self) -> Vec<I2cDevice> {
        std::iter::once(ROOT_MUX)
            .chain(MUXES.iter().copied())
            .chain(CONTROLLERS.iter().copied())
            .chain(THERMAL.iter().copied())
            .chain(PSUS.iter().copied())
            .chain(std::iter::once(SYS_EEPROM))
            .collect()
    }

    async fn baseconfig(&self, host: &mut Host<'_>) -> Result<()> {
        host.insmod("optoe").await?;
        host.insmod("accton_i2c_psu").await?;
        host.insmod_kernel_module(ISMT_MODULE).await;
        insmod_platform_modules(host, MODULE_PREFIX, &MODULES).await?;

        host.new_i2c_devices(&self.i2c_devices()).await
    }
}

inventory::submit! {
    PlatformDescriptor {
        id: "x86-64-accton-as9736-64d-r0",
        create_fn: || Box::new(As9736_64d),
    }
}
