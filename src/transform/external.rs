use crate::foundation::config::ExternalCommand;
use crate::foundation::error::{RounderError, RounderResult};
use crate::transform::gateway::TransformStrategy;
use crate::transform::params::{TransformParams, format_number};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use wait_timeout::ChildExt as _;

static SCRATCH_SEQ: AtomicU64 = AtomicU64::new(0);

/// Runs an external program as the transform routine.
///
/// Invocation: `program [args..] <src> <dst> <radius> <percent|px>`, followed by eight effect
/// arguments (shadow flag, shadow color, shadow blur, shadow offset, border flag, border color,
/// border width, border style) only when a shadow or border is requested. The routine signals
/// success by printing `SUCCESS` on stdout and must write a PNG to `<dst>`.
#[derive(Clone, Debug)]
pub struct ExternalStrategy {
    command: ExternalCommand,
    timeout: Duration,
    scratch_dir: PathBuf,
}

impl ExternalStrategy {
    /// Create a strategy with scratch files in the system temp directory.
    pub fn new(command: ExternalCommand, timeout: Duration) -> Self {
        Self {
            command,
            timeout,
            scratch_dir: std::env::temp_dir(),
        }
    }

    /// Use `dir` for the temporary source and destination files.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    fn scratch_paths(&self, input: &[u8]) -> (PathBuf, PathBuf) {
        let ext = image::guess_format(input)
            .ok()
            .and_then(|f| f.extensions_str().first().copied())
            .unwrap_or("img");
        let seq = SCRATCH_SEQ.fetch_add(1, Ordering::Relaxed);
        let stem = format!(
            "embed-rounder-{}-{}-{seq}",
            std::process::id(),
            crate::foundation::now_millis()
        );
        (
            self.scratch_dir.join(format!("{stem}-src.{ext}")),
            self.scratch_dir.join(format!("{stem}-dst.png")),
        )
    }
}

/// Positional arguments after the program's own leading args.
pub fn routine_args(src: &Path, dst: &Path, params: &TransformParams) -> Vec<String> {
    let mut args = vec![
        src.display().to_string(),
        dst.display().to_string(),
        format_number(params.radius),
        params.unit.token().to_string(),
    ];
    if !params.has_effects() {
        return args;
    }
    match &params.shadow {
        Some(s) => args.extend([
            "true".to_string(),
            s.color.to_hex(),
            format_number(s.blur_radius),
            format_number(s.offset),
        ]),
        None => args.extend(["false", "#000000", "10", "5"].map(String::from)),
    }
    match &params.border {
        Some(b) => args.extend([
            "true".to_string(),
            b.color.to_hex(),
            format_number(b.width),
            b.style.as_str().to_string(),
        ]),
        None => args.extend(["false", "#000000", "2", "solid"].map(String::from)),
    }
    args
}

impl TransformStrategy for ExternalStrategy {
    fn name(&self) -> &'static str {
        "external"
    }

    fn apply(&self, input: &[u8], params: &TransformParams) -> RounderResult<Vec<u8>> {
        let (src, dst) = self.scratch_paths(input);
        let _src_guard = TempFileGuard(Some(src.clone()));
        let _dst_guard = TempFileGuard(Some(dst.clone()));

        std::fs::write(&src, input).map_err(|e| {
            RounderError::transform_failed(format!(
                "write scratch input '{}': {e}",
                src.display()
            ))
        })?;

        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args)
            .args(routine_args(&src, &dst, params))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::debug!(program = %self.command.program, "spawning transform routine");
        let mut child = cmd.spawn().map_err(|e| {
            RounderError::transform_failed(format!(
                "failed to spawn '{}': {e}",
                self.command.program
            ))
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RounderError::transform_failed("failed to open routine stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RounderError::transform_failed("failed to open routine stderr"))?;
        let stdout_drain = drain(stdout);
        let stderr_drain = drain(stderr);

        let status = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                // drains finish once every holder of the pipes exits
                return Err(RounderError::transform_failed(format!(
                    "'{}' timed out after {}s",
                    self.command.program,
                    self.timeout.as_secs_f64()
                )));
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(RounderError::transform_failed(format!(
                    "failed to wait for '{}': {e}",
                    self.command.program
                )));
            }
        };

        let stdout = join_drain(stdout_drain)?;
        let stderr = join_drain(stderr_drain)?;
        let stdout = String::from_utf8_lossy(&stdout);
        let stderr = String::from_utf8_lossy(&stderr);

        if !status.success() || !stdout.contains("SUCCESS") {
            let detail = if stderr.trim().is_empty() {
                stdout.trim()
            } else {
                stderr.trim()
            };
            return Err(RounderError::transform_failed(format!(
                "'{}' exited with status {status}: {detail}",
                self.command.program
            )));
        }

        std::fs::read(&dst).map_err(|e| {
            RounderError::output_invalid(format!(
                "routine reported success but '{}' is unreadable: {e}",
                dst.display()
            ))
        })
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<std::io::Result<Vec<u8>>> {
    std::thread::spawn(move || {
        let mut bytes = Vec::new();
        pipe.read_to_end(&mut bytes)?;
        Ok(bytes)
    })
}

fn join_drain(handle: JoinHandle<std::io::Result<Vec<u8>>>) -> RounderResult<Vec<u8>> {
    handle
        .join()
        .map_err(|_| RounderError::transform_failed("routine output drain thread panicked"))?
        .map_err(|e| RounderError::transform_failed(format!("routine output read failed: {e}")))
}

struct TempFileGuard(Option<PathBuf>);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/transform/external.rs"]
mod tests;
