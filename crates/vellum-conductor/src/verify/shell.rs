use super::{mask_secrets, Verifier, VerifyOutcome};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::process::Command;

const MAX_STDERR: usize = 2000;

#[cfg(windows)]
fn shell_cmd(cmd: &str) -> (&'static str, Vec<String>) {
    ("cmd.exe", vec!["/C".into(), cmd.into()])
}

#[cfg(not(windows))]
fn shell_cmd(cmd: &str) -> (&'static str, Vec<String>) {
    ("sh", vec!["-c".into(), cmd.into()])
}

/// [`Verifier`] backed by the platform shell, run from the workspace root.
/// A command that outlives its timeout is killed with its process.
#[derive(Debug, Clone)]
pub struct ShellVerifier {
    cwd: PathBuf,
}

impl ShellVerifier {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }
}

fn truncate_stderr(text: &str) -> String {
    if text.len() <= MAX_STDERR {
        return text.to_string();
    }
    let mut end = MAX_STDERR;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[async_trait::async_trait]
impl Verifier for ShellVerifier {
    async fn verify(&self, command: &str, timeout: Duration) -> VerifyOutcome {
        let start = Instant::now();
        let (shell, args) = shell_cmd(command);

        let child = Command::new(shell)
            .args(&args)
            .current_dir(&self.cwd)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(timeout, child).await {
            Ok(Ok(output)) if output.status.success() => VerifyOutcome::passed(start.elapsed()),
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let masked = truncate_stderr(&mask_secrets(&stderr));
                VerifyOutcome::failed(
                    format!(
                        "exit {}: {}",
                        output.status.code().unwrap_or(-1),
                        masked.trim()
                    ),
                    start.elapsed(),
                )
            }
            Ok(Err(e)) => VerifyOutcome::failed(format!("spawn error: {e}"), start.elapsed()),
            Err(_) => VerifyOutcome::timed_out(command, timeout),
        }
    }
}
