//! External command execution with bounded run time.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

/// Upper bound for any single OS tool invocation.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(15);

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Output of a command that could not be run at all.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: reason.into(),
        }
    }

    /// Trimmed stdout and stderr joined for diagnostics.
    pub fn text(&self) -> String {
        let out = self.stdout.trim();
        let err = self.stderr.trim();
        match (out.is_empty(), err.is_empty()) {
            (true, true) => String::new(),
            (false, true) => out.to_string(),
            (true, false) => err.to_string(),
            (false, false) => format!("{out}\n{err}"),
        }
    }
}

/// Command execution errors
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },
}

/// Run `program args...` and capture its output.
///
/// The child is killed if the timeout elapses. A non-zero exit status is not
/// an error here; it is reported through [`CommandOutput::success`].
pub async fn run_command(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<CommandOutput, CommandError> {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| CommandError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(source)) => {
            return Err(CommandError::Spawn {
                program: program.to_string(),
                source,
            })
        }
        Err(_) => {
            return Err(CommandError::Timeout {
                program: program.to_string(),
                timeout,
            })
        }
    };

    tracing::trace!(
        program,
        args = ?args,
        status = ?output.status.code(),
        "command finished"
    );

    Ok(CommandOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Run a command, turning launch failures and timeouts into a failed
/// [`CommandOutput`] after logging them.
pub async fn run_lenient(program: &str, args: &[&str], timeout: Duration) -> CommandOutput {
    match run_command(program, args, timeout).await {
        Ok(output) => output,
        Err(e) => {
            tracing::warn!(error = %e, "OS command failed, treating as no data");
            CommandOutput::failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_joins_streams() {
        let out = CommandOutput {
            success: true,
            stdout: "line\n".to_string(),
            stderr: "  warn \n".to_string(),
        };
        assert_eq!(out.text(), "line\nwarn");
        assert_eq!(CommandOutput::default().text(), "");
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let err = run_command("definitely-not-a-real-binary-xyz", &[], Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }

    #[tokio::test]
    async fn lenient_run_absorbs_failures() {
        let out = run_lenient("definitely-not-a-real-binary-xyz", &[], Duration::from_secs(1)).await;
        assert!(!out.success);
        assert!(out.stderr.contains("failed to launch"));
    }
}
