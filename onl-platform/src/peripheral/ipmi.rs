//! BMC system interface bring-up.
//!
//! The host can finish booting before the BMC is ready, so the KCS system
//! interface may not exist yet when the `ipmi_si` driver loads. Readiness is
//! established in two layers, each with a bounded retry:
//!
//! 1. the IPMI character device appears (re-adding the KCS interface through
//!    the driver's `hotmod` parameter between checks), then
//! 2. the BMC answers an OEM "scan status" request.
//!
//! The two layers are composed under an outer retry of fixed-length cycles.

use std::time::Duration;
use tokio::time;

use crate::{config::IpmiConfig, host::Host, tracing::prelude::*};

/// I/O port of the KCS system interface.
pub const KCS_IO_PORT: u16 = 0x0ca2;

/// Device nodes the IPMI driver may create, relative to the device root.
const DEVICE_NODES: [&str; 2] = ["ipmi0", "ipmidev/0"];

/// OEM raw request (netfn 0x34, cmd 0x95) asking whether the BMC is scanning.
const OEM_SCAN_STATUS: [&str; 3] = ["raw", "0x34", "0x95"];

/// Result of one retry layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    pub ready: bool,
    /// Time charged to this layer: attempts used times the interval
    pub elapsed: Duration,
}

/// Retry driver for the IPMI system interface.
#[derive(Debug, Clone)]
pub struct IpmiInit {
    budget: IpmiConfig,
    kcs_port: u16,
}

impl IpmiInit {
    pub fn new(budget: IpmiConfig) -> Self {
        Self {
            budget,
            kcs_port: KCS_IO_PORT,
        }
    }

    /// The hotmod commands that re-add the KCS interface, in order.
    pub fn hotmod_sequence(&self) -> [String; 2] {
        [
            format!("remove,kcs,i/o,0x{:x}", self.kcs_port),
            format!("add,kcs,i/o,0x{:x}", self.kcs_port),
        ]
    }

    fn charged(&self, attempts_used: u32) -> Duration {
        self.budget.interval.saturating_mul(attempts_used)
    }

    fn device_present(&self, host: &Host<'_>) -> bool {
        DEVICE_NODES
            .iter()
            .any(|node| host.exists(&host.dev_path(node)))
    }

    /// Wait for the IPMI character device, re-adding the interface between
    /// checks.
    pub async fn init_dev_intf(&self, host: &mut Host<'_>) -> Readiness {
        let hotmod = host.sysfs_path("module/ipmi_si/parameters/hotmod");

        for attempt in 0..self.budget.attempts {
            if self.device_present(host) {
                return Readiness {
                    ready: true,
                    elapsed: self.charged(attempt),
                };
            }

            trace!(attempt, "IPMI device missing, re-adding KCS interface");
            for cmd in self.hotmod_sequence() {
                host.set_attr(&hotmod, &cmd).await;
            }

            time::sleep(self.budget.interval).await;
        }

        Readiness {
            ready: false,
            elapsed: self.charged(self.budget.attempts),
        }
    }

    /// Wait for the BMC to finish scanning.
    pub async fn init_oem_cmd(&self, host: &mut Host<'_>) -> Readiness {
        let args: Vec<String> = OEM_SCAN_STATUS.iter().map(|s| s.to_string()).collect();

        for attempt in 0..self.budget.attempts {
            match host.run("ipmitool", &args).await {
                Ok(out) if out.success() => {
                    return Readiness {
                        ready: true,
                        elapsed: self.charged(attempt),
                    };
                }
                Ok(out) => trace!(attempt, status = out.status, "BMC not ready"),
                Err(e) => trace!(attempt, error = %e, "ipmitool failed"),
            }

            time::sleep(self.budget.interval).await;
        }

        Readiness {
            ready: false,
            elapsed: self.charged(self.budget.attempts),
        }
    }

    /// Bring up the IPMI interface, or give up once the budget is spent.
    ///
    /// Each cycle runs the device layer then the OEM layer; every failed
    /// cycle, the last included, sleeps out whatever is left of its fixed
    /// length.
    pub async fn init(&self, host: &mut Host<'_>) -> bool {
        for cycle in 1..=self.budget.attempts {
            let dev = self.init_dev_intf(host).await;
            let spent = if !dev.ready {
                debug!(cycle, "IPMI device did not appear");
                dev.elapsed
            } else {
                let oem = self.init_oem_cmd(host).await;
                if oem.ready {
                    info!("IPMI dev interface is ready.");
                    return true;
                }
                debug!(cycle, "BMC did not answer");
                dev.elapsed.saturating_add(oem.elapsed)
            };

            time::sleep(self.budget.cycle.saturating_sub(spent)).await;
        }

        error!("Failed to initialize IPMI dev interface");
        false
    }
}
