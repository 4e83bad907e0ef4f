use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::error::BackendError;

/// Runs `prefix` followed by `args` and returns stdout.
///
/// `prefix` is a program plus its leading arguments, for example
/// `["sudo", "podman"]`. A non-zero exit is an error carrying stderr.
pub async fn run(prefix: &[String], args: &[&str]) -> Result<Vec<u8>, BackendError> {
    let Some((program, leading)) = prefix.split_first() else {
        return Err(BackendError::Spawn {
            program: String::new(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
        });
    };

    let rendered = prefix
        .iter()
        .map(String::as_str)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ");
    debug!(command = %rendered, "running backend command");

    let output = Command::new(program)
        .args(leading)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| BackendError::Spawn {
            program: program.clone(),
            source,
        })?;

    if output.status.success() {
        Ok(output.stdout)
    } else {
        Err(BackendError::CommandFailed {
            program: rendered,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
