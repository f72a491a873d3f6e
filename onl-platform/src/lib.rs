//! Boot-time platform bring-up for Accton switches running Open Network
//! Linux.
//!
//! A platform's `baseconfig` loads its kernel drivers, instantiates its I2C
//! clients and applies board quirks, once, early in boot. See
//! [`platform::PlatformRegistry`] for the supported models.

pub mod config;
pub mod error;
pub mod host;
pub mod hw_trait;
pub mod peripheral;
pub mod platform;
pub mod topology;
pub mod tracing;

#[cfg(test)]
pub(crate) mod testing;
