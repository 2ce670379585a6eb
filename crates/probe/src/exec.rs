use std::time::Duration;

use {
    anyhow::{Result, bail},
    tokio::process::Command,
    tracing::{debug, warn},
};

/// Options controlling probe command execution.
#[derive(Debug, Clone)]
pub struct ExecOpts {
    pub timeout: Duration,
    pub max_output_bytes: usize,
}

impl Default for ExecOpts {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_output_bytes: 200 * 1024, // 200KB
        }
    }
}

/// Run `program` with `args` and return its stdout.
///
/// No shell is involved; arguments pass through as-is. A non-zero exit,
/// spawn failure, or timeout is an error. Callers decide whether that
/// degrades or propagates.
pub async fn exec_command(program: &str, args: &[&str], opts: &ExecOpts) -> Result<String> {
    debug!(program, ?args, timeout_secs = opts.timeout.as_secs(), "probe exec");

    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::piped());
    cmd.stdin(std::process::Stdio::null());

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => bail!("failed to spawn {program}: {e}"),
    };

    match tokio::time::timeout(opts.timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => {
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                bail!(
                    "{program} exited with {}: {}",
                    output.status,
                    stderr.trim()
                );
            }
            let mut stdout = String::from_utf8_lossy(&output.stdout).into_owned();
            if stdout.len() > opts.max_output_bytes {
                stdout.truncate(opts.max_output_bytes);
                stdout.push_str("\n... [output truncated]");
            }
            Ok(stdout)
        },
        Ok(Err(e)) => bail!("failed to run {program}: {e}"),
        Err(_) => {
            warn!(program, "probe command timed out");
            bail!("{program} timed out after {}s", opts.timeout.as_secs())
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout() {
        let out = exec_command("echo", &["hello"], &ExecOpts::default())
            .await
            .unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[tokio::test]
    async fn nonzero_exit_is_an_error() {
        assert!(exec_command("false", &[], &ExecOpts::default()).await.is_err());
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let result = exec_command("waypost-no-such-binary", &[], &ExecOpts::default()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn times_out() {
        let opts = ExecOpts {
            timeout: Duration::from_millis(100),
            ..Default::default()
        };
        assert!(exec_command("sleep", &["10"], &opts).await.is_err());
    }
}
