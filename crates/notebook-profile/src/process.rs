//! Process port used to query and create IPython profiles.

use std::collections::BTreeMap;
use std::process::{Command, Stdio};

use crate::error::{ProvisionError, Result};

pub trait ProcessRunner {
    /// Run a command and return its stdout. Non-zero exit is an error.
    fn capture(&self, program: &str, args: &[&str], env: &BTreeMap<String, String>) -> Result<String>;

    /// Run a command with inherited stdout/stderr. Non-zero exit is an error.
    fn run(&self, program: &str, args: &[&str], env: &BTreeMap<String, String>) -> Result<()>;
}

impl<T: ProcessRunner + ?Sized> ProcessRunner for &T {
    fn capture(&self, program: &str, args: &[&str], env: &BTreeMap<String, String>) -> Result<String> {
        (**self).capture(program, args, env)
    }

    fn run(&self, program: &str, args: &[&str], env: &BTreeMap<String, String>) -> Result<()> {
        (**self).run(program, args, env)
    }
}

pub(crate) fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs commands with `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    fn command(program: &str, args: &[&str], env: &BTreeMap<String, String>) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(args).envs(env);
        cmd
    }
}

impl ProcessRunner for SystemRunner {
    fn capture(&self, program: &str, args: &[&str], env: &BTreeMap<String, String>) -> Result<String> {
        let command = command_line(program, args);
        let output = Self::command(program, args, env)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ProvisionError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProvisionError::CommandFailed {
                command,
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn run(&self, program: &str, args: &[&str], env: &BTreeMap<String, String>) -> Result<()> {
        let command = command_line(program, args);
        let status = Self::command(program, args, env)
            .stdin(Stdio::null())
            .status()
            .map_err(|source| ProvisionError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !status.success() {
            return Err(ProvisionError::CommandFailed {
                command,
                code: status.code().unwrap_or(-1),
                stderr: String::new(),
            });
        }
        Ok(())
    }
}
