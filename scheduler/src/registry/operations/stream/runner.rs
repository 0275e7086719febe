use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::config::SrtConfig;
use crate::models::reserve::{Credentials, Format};

/// Drives the `ffmpeg` subprocess that pushes a downloaded take out over
/// SRT, honoring cancellation by killing the child rather than waiting
/// for it to exit on its own.
pub struct Runner;

impl Runner {
    pub async fn run(
        &self,
        input: &Path,
        format: Format,
        credentials: &Credentials,
        srt: &SrtConfig,
        cancel: CancellationToken,
    ) -> anyhow::Result<()> {
        let destination = format!("srt://{}:{}", srt.host, srt.port);
        let format = format.as_str();

        let child = Command::new("ffmpeg")
            .args(["-f", format, "-re", "-i"])
            .arg(input)
            .args(["-acodec", "copy", "-f", format, "-passphrase", &credentials.token])
            .arg(&destination)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // `wait_with_output` drains stdout/stderr while waiting, unlike
        // `wait()` with a piped stderr: ffmpeg's continuous progress
        // output at the default loglevel would otherwise fill the pipe
        // buffer over a multi-minute broadcast and deadlock the child.
        // If `cancel` fires first, this future (and the `Child` it owns)
        // is dropped, and `kill_on_drop` kills the process.
        tokio::select! {
            _ = cancel.cancelled() => Err(anyhow::anyhow!("cancelled while streaming")),
            output = child.wait_with_output() => {
                let output = output?;
                if output.status.success() {
                    Ok(())
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    Err(anyhow::anyhow!("ffmpeg exited with {}: {}", output.status, stderr.trim()))
                }
            }
        }
    }
}
