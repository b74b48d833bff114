use std::process::{Command, Output, Stdio};

use tracing::debug;

use crate::error::{ProvisionError, ProvisionResult};

/// Captured result of an external command. A non-zero exit is
/// data here, not an error: callers decide what failure means.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CmdOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CmdOutput {
    #[must_use]
    pub fn ok(stdout: &str) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    #[must_use]
    pub fn failed(code: i32, stderr: &str) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    /// Trimmed stdout on success, `CommandFailed` otherwise.
    pub fn into_result(self, command: &str) -> ProvisionResult<String> {
        if self.success {
            Ok(self.stdout.trim().to_string())
        } else {
            Err(ProvisionError::CommandFailed {
                command: command.to_string(),
                diagnostic: self.diagnostic(),
            })
        }
    }

    /// Best human-readable explanation of what the command said.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        self.code
            .map_or_else(|| "terminated by signal".to_string(), |c| format!("exit status {c}"))
    }
}

/// Everything the installer does to the host beyond plain file
/// writes goes through this seam.
pub trait Shell {
    /// Run a command and capture its output.
    fn exec(&self, program: &str, args: &[&str]) -> ProvisionResult<CmdOutput>;

    /// Run a command with stdio inherited, for long-running tools
    /// whose progress the operator should see.
    fn exec_interactive(&self, program: &str, args: &[&str]) -> ProvisionResult<()>;

    /// Run a command and fail unless it exits zero.
    fn run(&self, program: &str, args: &[&str]) -> ProvisionResult<String> {
        self.exec(program, args)?
            .into_result(&format_command(program, args))
    }

    /// Check if a command exists on PATH.
    fn command_exists(&self, program: &str) -> bool {
        self.exec("which", &[program]).is_ok_and(|o| o.success)
    }
}

/// The real host.
#[derive(Debug, Clone, Copy, Default)]
pub struct System;

impl Shell for System {
    fn exec(&self, program: &str, args: &[&str]) -> ProvisionResult<CmdOutput> {
        debug!(command = %format_command(program, args), "exec");
        let output = spawn(program, args)?;
        Ok(CmdOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    fn exec_interactive(&self, program: &str, args: &[&str]) -> ProvisionResult<()> {
        let command = format_command(program, args);
        debug!(command = %command, "exec (interactive)");
        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| not_found_or_io(program, e))?;

        if status.success() {
            Ok(())
        } else {
            Err(ProvisionError::CommandFailed {
                command,
                diagnostic: status
                    .code()
                    .map_or_else(|| "terminated by signal".into(), |c| format!("exit status {c}")),
            })
        }
    }
}

fn spawn(program: &str, args: &[&str]) -> ProvisionResult<Output> {
    Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| not_found_or_io(program, e))
}

fn not_found_or_io(program: &str, e: std::io::Error) -> ProvisionError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ProvisionError::CommandNotFound(program.to_string())
    } else {
        ProvisionError::Io(e)
    }
}

#[must_use]
pub fn format_command(program: &str, args: &[&str]) -> String {
    let mut parts = vec![program.to_string()];
    parts.extend(args.iter().map(|a| (*a).to_string()));
    parts.join(" ")
}
