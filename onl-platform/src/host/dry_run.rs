//! A host that records what bring-up would do instead of doing it.
//!
//! Reads are answered from the real filesystem where possible so a dry run
//! on a live switch shows the actual plan. Anything the run would otherwise
//! block on is presumed: IPMI device nodes exist, and when the kernel's
//! module tree is not installed at all, every module file is presumed to be
//! in the first directory searched.

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::{
    config::Config,
    error::Result,
    hw_trait::{CommandOutput, System},
};

use super::linux;

/// One recorded effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Run { program: String, args: Vec<String> },
    Write { path: PathBuf, contents: String },
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Run { program, args } if args.is_empty() => write!(f, "{}", program),
            Action::Run { program, args } => write!(f, "{} {}", program, args.join(" ")),
            Action::Write { path, contents } => {
                write!(f, "echo {:?} > {}", contents.trim_end(), path.display())
            }
        }
    }
}

/// Recording [`System`].
#[derive(Debug)]
pub struct DryRun {
    actions: Vec<Action>,
    dev_root: PathBuf,
    release: String,
    module_tree_present: bool,
}

impl DryRun {
    pub fn new(config: &Config) -> Self {
        let release = linux::kernel_release().unwrap_or_else(|_| "unknown".to_string());
        let module_tree_present = config.modules_root.join(&release).is_dir();
        Self {
            actions: Vec::new(),
            dev_root: config.dev_root.clone(),
            release,
            module_tree_present,
        }
    }

    /// Actions recorded so far, in order.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn into_actions(self) -> Vec<Action> {
        self.actions
    }

    fn presumed(&self, path: &Path) -> bool {
        if path.starts_with(&self.dev_root) {
            return true;
        }
        !self.module_tree_present && path.extension().is_some_and(|ext| ext == "ko")
    }
}

#[async_trait]
impl System for DryRun {
    async fn run(&mut self, program: &str, args: &[String]) -> Result<CommandOutput> {
        self.actions.push(Action::Run {
            program: program.to_string(),
            args: args.to_vec(),
        });
        Ok(CommandOutput::ok(""))
    }

    async fn write(&mut self, path: &Path, contents: &str) -> Result<()> {
        self.actions.push(Action::Write {
            path: path.to_path_buf(),
            contents: contents.to_string(),
        });
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists() || self.presumed(path)
    }

    fn kernel_release(&self) -> Result<String> {
        Ok(self.release.clone())
    }
}
