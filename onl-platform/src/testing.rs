//! Test doubles shared by the unit tests.

use async_trait::async_trait;
use std::{
    collections::{HashMap, HashSet, VecDeque},
    io,
    path::{Path, PathBuf},
};

use crate::{
    error::Result,
    hw_trait::{CommandOutput, System},
    platform::PlatformInfo,
    topology::PortConfig,
};

pub const TEST_PLATFORM: PlatformInfo = PlatformInfo {
    id: "x86-64-accton-test-r0",
    model: "TEST-1",
    sys_object_id: ".1.1",
    manufacturer: "Accton",
    enterprise_number: 259,
    port_config: PortConfig::new(&[(2, 100)]),
};

/// Scripted [`System`] that records every effect.
///
/// Commands are keyed by their full command line. Each key holds a queue of
/// results; the last one repeats once the queue is drained. Unscripted
/// commands succeed with empty output.
#[derive(Debug, Default)]
pub struct MockSystem {
    /// Command lines run, in order
    pub commands: Vec<String>,
    /// Successful writes, in order
    pub writes: Vec<(PathBuf, String)>,
    paths: HashSet<PathBuf>,
    /// Paths that appear once this many writes have landed
    delayed_paths: Vec<(PathBuf, usize)>,
    results: HashMap<String, VecDeque<CommandOutput>>,
    /// Command lines whose program cannot be started
    spawn_errors: HashSet<String>,
    failing_writes: bool,
}

impl MockSystem {
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.insert(path.into());
        self
    }

    pub fn with_path_after_writes(mut self, path: impl Into<PathBuf>, writes: usize) -> Self {
        self.delayed_paths.push((path.into(), writes));
        self
    }

    pub fn with_result(self, command: &str, output: CommandOutput) -> Self {
        self.with_results(command, vec![output])
    }

    pub fn with_results(mut self, command: &str, outputs: Vec<CommandOutput>) -> Self {
        self.results.insert(command.to_string(), outputs.into());
        self
    }

    pub fn with_spawn_error(mut self, command: &str) -> Self {
        self.spawn_errors.insert(command.to_string());
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.failing_writes = true;
        self
    }

    /// Number of times `command` was run.
    pub fn count(&self, command: &str) -> usize {
        self.commands.iter().filter(|c| *c == command).count()
    }

    /// Contents written to `path`, in order.
    pub fn writes_to(&self, path: &str) -> Vec<&str> {
        self.writes
            .iter()
            .filter(|(p, _)| p == Path::new(path))
            .map(|(_, c)| c.as_str())
            .collect()
    }
}

#[async_trait]
impl System for MockSystem {
    async fn run(&mut self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let line = std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        self.commands.push(line.clone());

        if self.spawn_errors.contains(&line) {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such program").into());
        }

        let Some(queue) = self.results.get_mut(&line) else {
            return Ok(CommandOutput::ok(""));
        };
        let output = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        Ok(output.unwrap_or_default())
    }

    async fn write(&mut self, path: &Path, contents: &str) -> Result<()> {
        if self.failing_writes {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only").into());
        }
        self.writes.push((path.to_path_buf(), contents.to_string()));
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.paths.contains(path)
            || self
                .delayed_paths
                .iter()
                .any(|(p, after)| p == path && self.writes.len() >= *after)
    }

    fn kernel_release(&self) -> Result<String> {
        Ok("5.10.0-test".to_string())
    }
}
