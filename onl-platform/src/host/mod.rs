//! Host helpers shared by every platform's bring-up.
//!
//! [`Host`] wraps a [`System`] with the handful of operations platforms are
//! written against: loading kernel modules, instantiating I2C clients, and
//! poking sysfs attributes. Platform code never touches paths or tools
//! directly except through these helpers.

pub mod dry_run;
pub mod linux;

use std::path::{Path, PathBuf};

use crate::{
    config::Config,
    error::{Error, Result},
    hw_trait::{CommandOutput, System},
    platform::PlatformInfo,
    topology::{client_name, I2cDevice, Port},
    tracing::prelude::*,
};

pub use dry_run::{Action, DryRun};
pub use linux::LinuxSystem;

/// Bring-up context for one platform on one host.
pub struct Host<'a> {
    sys: &'a mut dyn System,
    config: &'a Config,
    platform: &'a PlatformInfo,
}

impl<'a> Host<'a> {
    pub fn new(sys: &'a mut dyn System, config: &'a Config, platform: &'a PlatformInfo) -> Self {
        Self {
            sys,
            config,
            platform,
        }
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    /// Load a kernel module by name.
    ///
    /// `module` may be a bare name (`optoe`) or a file name
    /// (`x86-64-accton-es7636bt4-cpld.ko`). The platform's module
    /// directories are searched in order; a bare name that is not found
    /// there is handed to `modprobe`, a missing `.ko` is an error.
    pub async fn insmod(&mut self, module: &str) -> Result<()> {
        let file = if module.ends_with(".ko") {
            module.to_string()
        } else {
            format!("{}.ko", module)
        };

        let name = loaded_name(&file);
        if self.module_loaded(&name) {
            debug!(module = %name, "Module already loaded");
            return Ok(());
        }

        let release = self.sys.kernel_release()?;
        let mut searched = Vec::new();
        for dir in self.module_dirs(&release) {
            let path = dir.join(&file);
            if self.sys.exists(&path) {
                return self.load_module_file(&path).await;
            }
            searched.push(path);
        }

        if module.ends_with(".ko") {
            return Err(Error::ModuleNotFound {
                module: module.to_string(),
                searched,
            });
        }

        trace!(module, "Not in platform module directories, trying modprobe");
        self.modprobe(module).await
    }

    /// Load a module through `modprobe`. Failure is an error.
    pub async fn modprobe(&mut self, module: &str) -> Result<()> {
        debug!(module, "modprobe");
        self.run_checked("modprobe", &[module.to_string()]).await.map(|_| ())
    }

    /// Load a module file from the running kernel's own tree, e.g.
    /// `kernel/drivers/i2c/busses/i2c-ismt.ko`. Failures are logged only.
    pub async fn insmod_kernel_module(&mut self, relative: &str) {
        let release = match self.sys.kernel_release() {
            Ok(release) => release,
            Err(e) => {
                warn!(module = relative, error = %e, "Cannot determine kernel release");
                return;
            }
        };

        let path = self.config.modules_root.join(release).join(relative);
        let arg = path.display().to_string();
        match self.sys.run("insmod", &[arg]).await {
            Ok(out) if out.success() => debug!(path = %path.display(), "Module loaded"),
            Ok(out) => warn!(
                path = %path.display(),
                status = out.status,
                stderr = %out.stderr.trim(),
                "insmod failed"
            ),
            Err(e) => warn!(path = %path.display(), error = %e, "insmod failed"),
        }
    }

    /// Instantiate one I2C client, unless the kernel already has it.
    pub async fn new_i2c_device(&mut self, driver: &str, addr: u8, bus: u32) -> Result<()> {
        let client = self.i2c_devices_dir().join(client_name(bus, addr));
        if self.sys.exists(&client) {
            debug!(driver, addr = %format!("0x{:02x}", addr), bus, "I2C client already present");
            return Ok(());
        }

        let path = self
            .i2c_devices_dir()
            .join(format!("i2c-{}", bus))
            .join("new_device");
        debug!(driver, addr = %format!("0x{:02x}", addr), bus, "Registering I2C client");
        self.sys
            .write(&path, &format!("{} 0x{:02x}\n", driver, addr))
            .await
    }

    /// Instantiate each client in order.
    pub async fn new_i2c_devices(&mut self, devices: &[I2cDevice]) -> Result<()> {
        for dev in devices {
            self.new_i2c_device(dev.driver, dev.addr, dev.bus).await?;
        }
        Ok(())
    }

    /// Register each transceiver EEPROM and label it with its port name.
    pub async fn register_ports(&mut self, ports: &[Port]) -> Result<()> {
        for port in ports {
            let dev = port.device();
            self.new_i2c_device(dev.driver, dev.addr, dev.bus).await?;
            let attr = self.client_attr(dev.bus, dev.addr, "port_name");
            self.set_attr(&attr, &port.name()).await;
        }
        Ok(())
    }

    /// Write a sysfs attribute. Failures are logged, never returned.
    pub async fn set_attr(&mut self, path: &Path, value: &str) {
        trace!(path = %path.display(), value, "Writing attribute");
        if let Err(e) = self.sys.write(path, &format!("{}\n", value)).await {
            warn!(path = %path.display(), value, error = %e, "Attribute write failed");
        }
    }

    /// Path of an attribute exposed by an I2C client.
    pub fn client_attr(&self, bus: u32, addr: u8, attr: &str) -> PathBuf {
        self.i2c_devices_dir().join(client_name(bus, addr)).join(attr)
    }

    /// Path below the sysfs mount.
    pub fn sysfs_path(&self, relative: &str) -> PathBuf {
        self.config.sysfs_root.join(relative)
    }

    /// Path below the device node directory.
    pub fn dev_path(&self, relative: &str) -> PathBuf {
        self.config.dev_root.join(relative)
    }

    pub fn exists(&self, path: &Path) -> bool {
        self.sys.exists(path)
    }

    /// Run a tool, returning its output whatever the exit status.
    pub async fn run(&mut self, program: &str, args: &[String]) -> Result<CommandOutput> {
        self.sys.run(program, args).await
    }

    /// Run a tool, treating a non-zero exit status as an error.
    pub async fn run_checked(&mut self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let out = self.sys.run(program, args).await?;
        if !out.success() {
            return Err(Error::Command {
                program: program.to_string(),
                status: out.status,
                stderr: out.stderr.trim().to_string(),
            });
        }
        Ok(out)
    }

    fn i2c_devices_dir(&self) -> PathBuf {
        self.sysfs_path("bus/i2c/devices")
    }

    fn module_loaded(&self, name: &str) -> bool {
        self.sys.exists(&self.sysfs_path("module").join(name))
    }

    async fn load_module_file(&mut self, path: &Path) -> Result<()> {
        debug!(path = %path.display(), "insmod");
        self.run_checked("insmod", &[path.display().to_string()])
            .await
            .map(|_| ())
    }

    /// Directories searched for platform modules, most specific first.
    fn module_dirs(&self, release: &str) -> Vec<PathBuf> {
        let base = self.config.modules_root.join(release);
        let id = self.platform.id;
        let stem = strip_revision(id);
        let vendor = self.platform.manufacturer.to_lowercase();

        vec![
            base.join(id),
            base.join(stem),
            base.join("onl").join(&vendor).join(id),
            base.join("onl").join(&vendor).join(stem),
            base.join("onl").join(&vendor).join("common"),
            base.join("onl").join("onl").join("common"),
            base.join("onl"),
            base,
        ]
    }
}

/// Name the kernel reports for a module file: no extension, `-` as `_`.
fn loaded_name(file: &str) -> String {
    file.trim_end_matches(".ko").replace('-', "_")
}

/// `x86-64-accton-es7636bt4-r0` -> `x86-64-accton-es7636bt4`
fn strip_revision(id: &str) -> &str {
    match id.rsplit_once('-') {
        Some((stem, rev))
            if rev.len() > 1
                && rev.starts_with('r')
                && rev[1..].chars().all(|c| c.is_ascii_digit()) =>
        {
            stem
        }
        _ => id,
    }
}
