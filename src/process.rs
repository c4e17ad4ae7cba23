// src/process.rs

//! Package-manager subprocess collaborator
//!
//! Interactive commands (install, build, start) inherit stdio and run to
//! completion. Captured commands (audit) are polled against the configured
//! timeout; a timeout is an error the caller downgrades to a scan failure,
//! never a silent success.

use crate::error::{Error, Result};
use std::io::Read;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Poll interval while waiting on a captured subprocess
const POLL_INTERVAL_MS: u64 = 50;

/// Subprocess contract the lifecycle layer consumes
pub trait ManagerProcess {
    /// Run an interactive command, returning its exit code
    fn run(&self, command: &str, args: &[String]) -> Result<i32>;

    /// Run a command with captured stdout, bounded by the configured timeout
    fn run_captured(&self, command: &str, args: &[String]) -> Result<String>;
}

/// The real package-manager executable
pub struct NpmProcess {
    program: String,
    timeout_secs: u64,
}

impl NpmProcess {
    pub fn new(program: impl Into<String>, timeout_secs: u64) -> Self {
        let mut program = program.into();
        if cfg!(windows) && program == "npm" {
            program = "npm.cmd".to_string();
        }

        Self {
            program,
            timeout_secs,
        }
    }
}

impl ManagerProcess for NpmProcess {
    fn run(&self, command: &str, args: &[String]) -> Result<i32> {
        info!("Running {} {} {}", self.program, command, args.join(" "));

        let status = Command::new(&self.program)
            .arg(command)
            .args(args)
            .status()
            .map_err(|e| Error::Process(format!("Failed to spawn {}: {}", self.program, e)))?;

        Ok(status.code().unwrap_or(-1))
    }

    fn run_captured(&self, command: &str, args: &[String]) -> Result<String> {
        debug!("Capturing {} {} {}", self.program, command, args.join(" "));

        let mut child = Command::new(&self.program)
            .arg(command)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Process(format!("Failed to spawn {}: {}", self.program, e)))?;

        let deadline = Instant::now() + Duration::from_secs(self.timeout_secs);
        loop {
            match child.try_wait() {
                Ok(Some(_status)) => break,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(Error::ProcessTimeout {
                            command: command.to_string(),
                            secs: self.timeout_secs,
                        });
                    }
                    std::thread::sleep(Duration::from_millis(POLL_INTERVAL_MS));
                }
                Err(e) => {
                    return Err(Error::Process(format!("Failed to wait on {}: {}", command, e)))
                }
            }
        }

        let mut output = String::new();
        if let Some(mut stdout) = child.stdout.take() {
            stdout
                .read_to_string(&mut output)
                .map_err(|e| Error::Process(format!("Failed to read {} output: {}", command, e)))?;
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_failure_is_a_process_error() {
        let process = NpmProcess::new("definitely-not-a-real-binary-xyz", 5);
        let result = process.run("install", &[]);
        assert!(matches!(result, Err(Error::Process(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_captures_exit_code() {
        let process = NpmProcess::new("true", 5);
        let code = process.run("--version", &[]).unwrap_or(-1);
        // `true` ignores its arguments and exits 0
        assert_eq!(code, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_captured_returns_stdout() {
        let process = NpmProcess::new("echo", 5);
        let output = process.run_captured("hello", &[]).unwrap();
        assert_eq!(output.trim(), "hello");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_captured_times_out() {
        let process = NpmProcess::new("sleep", 1);
        let result = process.run_captured("5", &[]);
        assert!(matches!(result, Err(Error::ProcessTimeout { .. })));
    }
}
