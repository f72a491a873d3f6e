//! The real host: processes via tokio, files via tokio::fs.

use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

use crate::{
    error::Result,
    hw_trait::{CommandOutput, System},
    tracing::prelude::*,
};

/// [`System`] backed by the running Linux kernel.
#[derive(Debug, Default)]
pub struct LinuxSystem;

impl LinuxSystem {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl System for LinuxSystem {
    async fn run(&mut self, program: &str, args: &[String]) -> Result<CommandOutput> {
        trace!(program, ?args, "Spawning");
        let output = Command::new(program).args(args).output().await?;

        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn write(&mut self, path: &Path, contents: &str) -> Result<()> {
        tokio::fs::write(path, contents).await?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn kernel_release(&self) -> Result<String> {
        kernel_release()
    }
}

/// Release of the running kernel, from `uname(2)`.
pub fn kernel_release() -> Result<String> {
    let uts = nix::sys::utsname::uname().map_err(std::io::Error::from)?;
    Ok(uts.release().to_string_lossy().into_owned())
}
