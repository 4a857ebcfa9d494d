//! CI stage execution.

use crate::stage::StageConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::Command;

/// Result of a stage execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    /// Stage name.
    pub stage_name: String,

    /// Exit code (0 = success, -1 = killed or never ran).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// Whether execution succeeded.
    pub success: bool,
}

impl StageResult {
    /// Whether this stage passed (exit code 0).
    pub fn passed(&self) -> bool {
        self.success && self.exit_code == 0
    }

    /// Result for a stage that could not be run (spawn error, timeout).
    pub fn errored(stage_name: &str, error: &anyhow::Error, duration_ms: u64) -> Self {
        Self {
            stage_name: stage_name.to_string(),
            exit_code: -1,
            stdout: String::new(),
            stderr: error.to_string(),
            duration_ms,
            success: false,
        }
    }
}

/// CI stage runner.
pub struct CiRunner;

impl CiRunner {
    /// Execute a single stage in `workspace` and return the result.
    ///
    /// A non-zero exit is a failed [`StageResult`], not an error. Errors are
    /// reserved for an empty command, a spawn failure, or a timeout.
    pub async fn execute_stage(config: &StageConfig, workspace: &Path) -> anyhow::Result<StageResult> {
        let start = Instant::now();

        let Some((exe, args)) = config.command.split_first() else {
            anyhow::bail!("Stage {} has empty command", config.name);
        };

        let mut child = Command::new(exe)
            .args(args)
            .envs(&config.env)
            .current_dir(workspace)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| anyhow::anyhow!("Stage {} failed to spawn {}: {}", config.name, exe, e))?;

        let out_pipe = child
            .stdout
            .take()
            .ok_or_else(|| anyhow::anyhow!("Stage {} has no stdout pipe", config.name))?;
        let err_pipe = child
            .stderr
            .take()
            .ok_or_else(|| anyhow::anyhow!("Stage {} has no stderr pipe", config.name))?;

        let collect = async {
            tokio::try_join!(
                tee(out_pipe, config.echo.then(tokio::io::stdout)),
                tee(err_pipe, config.echo.then(tokio::io::stderr)),
                child.wait(),
            )
        };

        let (stdout, stderr, status) = if config.timeout_secs > 0 {
            tokio::time::timeout(std::time::Duration::from_secs(config.timeout_secs), collect)
                .await
                .map_err(|_| {
                    anyhow::anyhow!(
                        "Stage {} timed out after {} seconds",
                        config.name,
                        config.timeout_secs
                    )
                })??
        } else {
            collect.await?
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let exit_code = status.code().unwrap_or(-1);

        Ok(StageResult {
            stage_name: config.name.clone(),
            exit_code,
            stdout,
            stderr,
            duration_ms,
            success: status.success(),
        })
    }
}

/// Read `reader` to the end line by line, copying each line to `echo` as
/// it arrives. Returns everything read, lossily decoded.
async fn tee<R, W>(reader: R, mut echo: Option<W>) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut captured = Vec::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }
        if let Some(sink) = echo.as_mut() {
            sink.write_all(&line).await?;
            sink.flush().await?;
        }
        captured.extend_from_slice(&line);
    }
    Ok(String::from_utf8_lossy(&captured).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(name: &str, script: &str, timeout_secs: u64) -> StageConfig {
        StageConfig::custom(
            name.to_string(),
            vec!["sh".to_string(), "-c".to_string(), script.to_string()],
            timeout_secs,
        )
    }

    #[test]
    fn test_stage_result_passed() {
        let result = StageResult {
            stage_name: "cargo_build".to_string(),
            exit_code: 0,
            stdout: "".to_string(),
            stderr: "".to_string(),
            duration_ms: 100,
            success: true,
        };
        assert!(result.passed());
    }

    #[test]
    fn test_stage_result_errored() {
        let err = anyhow::anyhow!("boom");
        let result = StageResult::errored("cargo_test", &err, 5);
        assert!(!result.passed());
        assert_eq!(result.exit_code, -1);
        assert_eq!(result.stderr, "boom");
    }

    #[tokio::test]
    async fn test_execute_simple_command() {
        let config = StageConfig::custom(
            "echo_test".to_string(),
            vec!["echo".to_string(), "hello".to_string()],
            60,
        );

        let result = CiRunner::execute_stage(&config, Path::new("."))
            .await
            .expect("execute failed");
        assert!(result.success);
        assert_eq!(result.exit_code, 0);
        assert!(result.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn test_execute_failing_command() {
        let config = sh("exit_3", "exit 3", 60);
        let result = CiRunner::execute_stage(&config, Path::new("."))
            .await
            .expect("execute failed");
        assert!(!result.passed());
        assert_eq!(result.exit_code, 3);
    }

    #[tokio::test]
    async fn test_stage_env_and_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let config = sh("env_check", "echo \"$CARGO_TERM_COLOR\"; pwd", 60)
            .with_env("CARGO_TERM_COLOR", "always");
        let result = CiRunner::execute_stage(&config, dir.path()).await.unwrap();

        let mut lines = result.stdout.lines();
        assert_eq!(lines.next(), Some("always"));
        let pwd = std::path::PathBuf::from(lines.next().unwrap());
        assert_eq!(
            pwd.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[tokio::test]
    async fn test_output_is_captured_while_echoed() {
        let config = sh(
            "both_streams",
            "echo out-1; echo err-1 >&2; printf 'no newline'",
            60,
        );
        assert!(config.echo);
        let result = CiRunner::execute_stage(&config, Path::new(".")).await.unwrap();
        assert_eq!(result.stdout, "out-1\nno newline");
        assert_eq!(result.stderr, "err-1\n");
    }

    #[tokio::test]
    async fn test_tee_copies_every_line_to_sink() {
        let input: &[u8] = b"first\nsecond\n\xffthird";
        let mut sink = Vec::new();
        let captured = tee(input, Some(&mut sink)).await.unwrap();
        assert_eq!(sink, input);
        assert!(captured.starts_with("first\nsecond\n"));
        assert!(captured.ends_with("third"));
    }

    #[tokio::test]
    async fn test_quiet_stage_still_captures() {
        let config = sh("quiet", "echo hidden", 60).quiet();
        let result = CiRunner::execute_stage(&config, Path::new(".")).await.unwrap();
        assert_eq!(result.stdout, "hidden\n");
    }

    #[tokio::test]
    async fn test_empty_command_is_error() {
        let config = StageConfig::custom("empty".to_string(), vec![], 60);
        let err = CiRunner::execute_stage(&config, Path::new("."))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("empty command"));
    }

    #[tokio::test]
    async fn test_missing_executable_is_error() {
        let config = StageConfig::custom(
            "missing".to_string(),
            vec!["vtag-definitely-not-a-binary".to_string()],
            60,
        );
        assert!(CiRunner::execute_stage(&config, Path::new(".")).await.is_err());
    }

    #[tokio::test]
    async fn test_timeout() {
        let config = sh("sleepy", "sleep 5", 1);
        let err = CiRunner::execute_stage(&config, Path::new("."))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
