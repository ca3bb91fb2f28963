//! Launch plans: a descriptor resolved into a concrete command.

use launch_common::{AppName, LaunchError, LaunchResult};
use launch_descriptor::{ArgLine, LaunchDescriptor, ServerTarget};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Program, arguments and working directory for one descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub name: AppName,
    /// Script path, resolved against `working_dir` when it is a relative path
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub env: BTreeMap<String, String>,
}

impl LaunchPlan {
    /// Resolve a descriptor against `base_dir`.
    ///
    /// A relative script with a directory component (`env/bin/python`) is
    /// joined onto `base_dir`. A bare program name (`python`) is left for
    /// `PATH` lookup.
    pub fn from_descriptor(descriptor: &LaunchDescriptor, base_dir: &Path) -> LaunchResult<Self> {
        let invalid = |e: launch_common::Error| {
            LaunchError::invalid_descriptor(descriptor.name.as_str(), e.to_string())
        };

        descriptor.validate().map_err(invalid)?;
        let args = descriptor.arg_line().map_err(invalid)?.into_tokens();

        let script = Path::new(&descriptor.script);
        let program = if is_bare_program(script) || script.is_absolute() {
            script.to_path_buf()
        } else {
            base_dir.join(script)
        };

        Ok(Self {
            name: descriptor.name.clone(),
            program,
            args,
            working_dir: base_dir.to_path_buf(),
            env: BTreeMap::new(),
        })
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// The command line, shell-quoted.
    pub fn display_line(&self) -> String {
        let mut tokens = Vec::with_capacity(self.args.len() + 1);
        tokens.push(self.program.display().to_string());
        tokens.extend(self.args.iter().cloned());
        ArgLine::from_tokens(tokens).to_line()
    }

    /// Server the arguments ask for.
    pub fn server_target(&self) -> LaunchResult<ServerTarget> {
        ServerTarget::from_tokens(&self.args)
            .map_err(|e| LaunchError::invalid_descriptor(self.name.as_str(), e.to_string()))
    }

    /// Check a path-qualified script exists. Bare program names are found
    /// through `PATH` at spawn time.
    pub fn check_script(&self) -> LaunchResult<()> {
        if is_bare_program(&self.program) {
            return Ok(());
        }

        if self.program.is_file() {
            Ok(())
        } else {
            Err(LaunchError::script_missing(
                self.name.as_str(),
                self.program.display().to_string(),
            ))
        }
    }

    /// Build the foreground command: inherited stdout/stderr, no stdin.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&self.working_dir)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        cmd
    }
}

fn is_bare_program(path: &Path) -> bool {
    path.components().count() == 1 && !path.is_absolute()
}
