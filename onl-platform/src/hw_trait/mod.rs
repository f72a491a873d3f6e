//! Host abstraction layer traits.
//!
//! Every effect bring-up has on the machine (running a tool, writing a sysfs
//! attribute, checking for a device node) goes through [`System`], so the
//! same platform code drives the real host, a dry run, or a test double.

use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;

use crate::error::Result;

/// Captured result of an external tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    /// Exit status; `-1` when the process was killed by a signal
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// A zero-status result with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed result with the given status and stderr.
    pub fn failed(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Effects a platform bring-up may have on its host.
#[async_trait]
pub trait System: Send {
    /// Run `program` with `args` to completion, capturing its output.
    ///
    /// A non-zero exit status is not an error here; only failing to start
    /// the process is.
    async fn run(&mut self, program: &str, args: &[String]) -> Result<CommandOutput>;

    /// Write `contents` to the file at `path` (sysfs attributes, mostly).
    async fn write(&mut self, path: &Path, contents: &str) -> Result<()>;

    /// Whether `path` exists.
    fn exists(&self, path: &Path) -> bool;

    /// Release string of the running kernel, as `uname -r` prints it.
    fn kernel_release(&self) -> Result<String>;
}
