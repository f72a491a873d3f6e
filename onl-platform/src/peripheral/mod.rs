//! Peripherals bring-up talks to directly rather than through a kernel
//! driver: the BMC's system interface and the voltage regulator quirk.
//!
//! Both reach the hardware through the i2c-tools and ipmitool command-line
//! programs, wrapped in [`i2c_tools`].

pub mod i2c_tools;
pub mod ipmi;
pub mod ir3570;
