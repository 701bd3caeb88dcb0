//! External swap engine invocation.
//!
//! The compute step is an opaque CLI run from the engine checkout. The
//! worker only owns the invocation contract: source, target, and output
//! paths plus the frame-processor flag, a hard wall-clock timeout, and
//! exit-code interpretation. A timed-out child is killed, not awaited.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::constants::SWAP_FRAME_PROCESSOR;
use crate::error::{Result, WorkerError};

/// Runs the face-swap CLI with a timeout
#[derive(Debug, Clone)]
pub struct SwapEngine {
    config: EngineConfig,
}

impl SwapEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Invoke the engine on two local inputs, producing `output`.
    ///
    /// Success is exit code 0 within the configured timeout. Non-zero exit
    /// and spawn failures are [`WorkerError::Compute`]; exceeding the
    /// timeout is [`WorkerError::ComputeTimeout`].
    pub async fn run(&self, source: &Path, target: &Path, output: &Path) -> Result<()> {
        let mut command = Command::new(&self.config.python_bin);
        command
            .arg(&self.config.entrypoint)
            .arg("-s")
            .arg(source)
            .arg("-t")
            .arg(target)
            .arg("-o")
            .arg(output)
            .arg("--frame-processor")
            .arg(SWAP_FRAME_PROCESSOR)
            .current_dir(&self.config.engine_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the future on timeout must kill the child.
            .kill_on_drop(true);

        debug!(
            source = %source.display(),
            target = %target.display(),
            output = %output.display(),
            "Executing swap engine"
        );

        let outcome = tokio::time::timeout(self.config.timeout, command.output()).await;

        match outcome {
            Err(_) => Err(WorkerError::ComputeTimeout {
                timeout_seconds: self.config.timeout.as_secs(),
            }),
            Ok(Err(e)) => Err(WorkerError::compute(format!(
                "failed to launch {}: {e}",
                self.config.python_bin
            ))),
            Ok(Ok(result)) if !result.status.success() => {
                let stderr = String::from_utf8_lossy(&result.stderr);
                Err(WorkerError::compute(format!(
                    "exit code {}: {}",
                    result.status.code().unwrap_or(-1),
                    stderr.trim()
                )))
            }
            Ok(Ok(_)) => {
                info!(output = %output.display(), "Swap completed");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[cfg(unix)]
    fn script_engine(dir: &Path, body: &str, timeout: Duration) -> SwapEngine {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("fake_engine.sh");
        std::fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        SwapEngine::new(EngineConfig {
            python_bin: "/bin/sh".to_string(),
            entrypoint: script.to_string_lossy().into_owned(),
            engine_dir: dir.to_path_buf(),
            timeout,
        })
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_invocation_produces_output() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source.jpg");
        let target = tmp.path().join("target.jpg");
        let output = tmp.path().join("output.jpeg");
        std::fs::write(&source, b"source").unwrap();
        std::fs::write(&target, b"target").unwrap();

        // Positional args: -s SRC -t TGT -o OUT --frame-processor ...
        let engine = script_engine(tmp.path(), r#"cp "$4" "$6""#, Duration::from_secs(5));
        engine.run(&source, &target, &output).await.unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"target");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_a_compute_error() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = script_engine(
            tmp.path(),
            "echo 'no face detected' >&2; exit 3",
            Duration::from_secs(5),
        );

        let err = engine
            .run(
                &tmp.path().join("s.jpg"),
                &tmp.path().join("t.jpg"),
                &tmp.path().join("o.jpeg"),
            )
            .await
            .unwrap_err();

        match err {
            WorkerError::Compute { message } => {
                assert!(message.contains("exit code 3"));
                assert!(message.contains("no face detected"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_kills_the_child() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = script_engine(tmp.path(), "sleep 30", Duration::from_millis(200));

        let err = engine
            .run(
                &tmp.path().join("s.jpg"),
                &tmp.path().join("t.jpg"),
                &tmp.path().join("o.jpeg"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, WorkerError::ComputeTimeout { .. }));
    }

    #[tokio::test]
    async fn missing_binary_is_a_compute_error() {
        let engine = SwapEngine::new(EngineConfig {
            python_bin: "/nonexistent/interpreter".to_string(),
            entrypoint: "run.py".to_string(),
            engine_dir: std::path::PathBuf::from("."),
            timeout: Duration::from_secs(1),
        });

        let err = engine
            .run(Path::new("s.jpg"), Path::new("t.jpg"), Path::new("o.jpeg"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::Compute { .. }));
    }
}
