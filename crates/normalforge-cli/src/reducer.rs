//! Bit-depth reduction through an external image converter.
//!
//! The planner only sees the [`BitDepthReducer`] trait. [`MagickReducer`]
//! implements it by spawning ImageMagick and asking for `PNG8:` output.

use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use normalforge_core::CodedError;
use thiserror::Error;

/// Default bound on a single tool invocation (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Environment variable overriding the tool location.
pub const TOOL_PATH_ENV: &str = "NORMALFORGE_MAGICK";

/// Errors from the reduction step.
#[derive(Debug, Error)]
pub enum ReduceError {
    /// No usable converter executable.
    #[error("ImageMagick not found. Install it and make sure `magick` is in PATH, or set NORMALFORGE_MAGICK")]
    ToolNotFound,

    /// Failed to launch the converter.
    #[error("Failed to spawn converter: {0}")]
    SpawnFailed(#[source] std::io::Error),

    /// The converter ran past its time bound and was killed.
    #[error("Converter timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The converter exited with a non-zero status.
    #[error("Converter exited with status {exit_code}: {stderr}")]
    ProcessFailed { exit_code: i32, stderr: String },

    /// The converter reported success but produced nothing.
    #[error("Converter did not produce output: {path}")]
    OutputMissing { path: PathBuf },

    /// IO error while staging the output.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReduceError {
    /// Creates a new process failed error.
    pub fn process_failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self::ProcessFailed {
            exit_code,
            stderr: stderr.into(),
        }
    }
}

impl CodedError for ReduceError {
    fn code(&self) -> &'static str {
        match self {
            ReduceError::ToolNotFound => "REDUCE_001",
            ReduceError::SpawnFailed(_) => "REDUCE_002",
            ReduceError::Timeout { .. } => "REDUCE_003",
            ReduceError::ProcessFailed { .. } => "REDUCE_004",
            ReduceError::OutputMissing { .. } => "REDUCE_005",
            ReduceError::Io(_) => "REDUCE_006",
        }
    }

    fn category(&self) -> &'static str {
        "reduce"
    }
}

/// Produces an 8-bit palette PNG at `target` from `source`.
///
/// Success means `target` now holds the reduced image. On failure the
/// implementation must not leave a usable file at `target`.
pub trait BitDepthReducer {
    fn reduce(&self, source: &Path, target: &Path) -> Result<(), ReduceError>;
}

impl<R: BitDepthReducer + ?Sized> BitDepthReducer for &R {
    fn reduce(&self, source: &Path, target: &Path) -> Result<(), ReduceError> {
        (**self).reduce(source, target)
    }
}

/// Configuration for [`MagickReducer`].
#[derive(Debug, Clone)]
pub struct ReducerConfig {
    /// Explicit converter executable.
    pub tool_path: Option<PathBuf>,
    /// Bound on a single invocation; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Whether to capture the converter's stderr for error messages.
    pub capture_output: bool,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            tool_path: None,
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            capture_output: true,
        }
    }
}

impl ReducerConfig {
    /// Sets the converter executable path.
    pub fn tool_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.tool_path = Some(path.into());
        self
    }

    /// Sets the timeout in seconds; `0` removes the bound.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        self
    }
}

/// ImageMagick-backed reducer: `magick <source> PNG8:<target>`.
#[derive(Debug, Clone, Default)]
pub struct MagickReducer {
    config: ReducerConfig,
}

impl MagickReducer {
    /// Creates a reducer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a reducer with the given configuration.
    pub fn with_config(config: ReducerConfig) -> Self {
        Self { config }
    }

    /// Finds the converter executable.
    pub fn find_tool(&self) -> Result<PathBuf, ReduceError> {
        if let Some(ref path) = self.config.tool_path {
            if path.exists() {
                return Ok(path.clone());
            }
        }

        if let Ok(path) = std::env::var(TOOL_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Ok(path);
            }
        }

        if let Ok(path) = which::which("magick") {
            return Ok(path);
        }

        // ImageMagick 6 ships `convert` with the same syntax. On Windows that
        // name belongs to a system utility, so only look for it elsewhere.
        if !cfg!(windows) {
            if let Ok(path) = which::which("convert") {
                return Ok(path);
            }
        }

        Err(ReduceError::ToolNotFound)
    }
}

impl BitDepthReducer for MagickReducer {
    fn reduce(&self, source: &Path, target: &Path) -> Result<(), ReduceError> {
        let tool = self.find_tool()?;

        let mut output_spec = OsString::from("PNG8:");
        output_spec.push(target);

        let mut cmd = Command::new(&tool);
        cmd.arg(source).arg(output_spec).stdin(Stdio::null());

        if self.config.capture_output {
            // Only stderr is read; an unread stdout pipe could fill and stall the child.
            cmd.stdout(Stdio::null()).stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let mut child = cmd.spawn().map_err(ReduceError::SpawnFailed)?;
        let stderr_reader = drain_stderr(&mut child);
        let status = wait_with_timeout(&mut child, self.config.timeout)?;
        let stderr = stderr_reader
            .and_then(|reader| reader.join().ok())
            .unwrap_or_default();

        if !status.success() {
            let exit_code = status.code().unwrap_or(-1);
            return Err(ReduceError::process_failed(exit_code, stderr.trim()));
        }

        let produced = std::fs::metadata(target).map(|m| m.len() > 0).unwrap_or(false);
        if !produced {
            return Err(ReduceError::OutputMissing {
                path: target.to_path_buf(),
            });
        }

        Ok(())
    }
}

/// Read the child's stderr on a separate thread.
///
/// The pipe has to be emptied while the child runs: a converter that writes
/// more than the pipe buffer would otherwise block forever.
fn drain_stderr(child: &mut Child) -> Option<JoinHandle<String>> {
    let mut stderr = child.stderr.take()?;
    Some(thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stderr.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }))
}

fn wait_with_timeout(child: &mut Child, timeout: Option<Duration>) -> Result<ExitStatus, ReduceError> {
    let start = Instant::now();

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {
                if let Some(limit) = timeout {
                    if start.elapsed() > limit {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(ReduceError::Timeout {
                            timeout_secs: limit.as_secs(),
                        });
                    }
                }
                thread::sleep(Duration::from_millis(50));
            }
            Err(e) => return Err(ReduceError::SpawnFailed(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(script: &str) -> Command {
        if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", script]);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", script]);
            cmd
        }
    }

    #[test]
    fn test_config_builder() {
        let config = ReducerConfig::default()
            .tool_path("/usr/bin/magick")
            .timeout_secs(30);

        assert_eq!(config.tool_path, Some(PathBuf::from("/usr/bin/magick")));
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_zero_timeout_means_unbounded() {
        let config = ReducerConfig::default().timeout_secs(0);
        assert_eq!(config.timeout, None);
    }

    #[test]
    fn test_drain_stderr_captures_output() {
        let mut cmd = shell("echo hello 1>&2");
        cmd.stdout(Stdio::null()).stderr(Stdio::piped());
        let mut child = cmd.spawn().unwrap();

        let reader = drain_stderr(&mut child).unwrap();
        let status = wait_with_timeout(&mut child, Some(Duration::from_secs(5))).unwrap();
        assert!(status.success());
        assert!(reader.join().unwrap().to_lowercase().contains("hello"));
    }

    #[cfg(unix)]
    #[test]
    fn test_wait_with_timeout_kills_slow_child() {
        let mut child = shell("sleep 5").spawn().unwrap();
        let err = wait_with_timeout(&mut child, Some(Duration::from_millis(100))).unwrap_err();
        assert!(matches!(err, ReduceError::Timeout { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_large_stderr_does_not_stall_converter() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("fake-magick");
        // ~230 KB of warnings, well past any pipe buffer, then a normal conversion.
        std::fs::write(
            &tool,
            "#!/bin/sh\n\
             i=0\n\
             while [ $i -lt 3000 ]; do\n\
             echo 'warning: iCCP: known incorrect sRGB profile, padding padding padding padding' 1>&2\n\
             i=$((i+1))\n\
             done\n\
             cp \"$1\" \"${2#PNG8:}\"\n",
        )
        .unwrap();
        make_executable(&tool);

        let source = dir.path().join("rock.png");
        std::fs::write(&source, b"heightmap").unwrap();
        let target = dir.path().join("rock_8bit.png");

        let reducer = MagickReducer::with_config(
            ReducerConfig::default().tool_path(&tool).timeout_secs(20),
        );
        let start = Instant::now();
        reducer.reduce(&source, &target).unwrap();

        assert!(start.elapsed() < Duration::from_secs(20));
        assert_eq!(std::fs::read(&target).unwrap(), b"heightmap");
    }

    #[cfg(unix)]
    #[test]
    fn test_large_stderr_is_kept_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("fake-magick");
        std::fs::write(
            &tool,
            "#!/bin/sh\n\
             i=0\n\
             while [ $i -lt 3000 ]; do\n\
             echo 'warning: iCCP: known incorrect sRGB profile, padding padding padding padding' 1>&2\n\
             i=$((i+1))\n\
             done\n\
             echo 'no decode delegate' 1>&2\n\
             exit 1\n",
        )
        .unwrap();
        make_executable(&tool);

        let reducer = MagickReducer::with_config(
            ReducerConfig::default().tool_path(&tool).timeout_secs(20),
        );
        let err = reducer
            .reduce(&dir.path().join("rock.png"), &dir.path().join("out.png"))
            .unwrap_err();

        match err {
            ReduceError::ProcessFailed { exit_code, stderr } => {
                assert_eq!(exit_code, 1);
                assert!(stderr.len() > 200_000);
                assert!(stderr.ends_with("no decode delegate"));
            }
            other => panic!("expected ProcessFailed, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("fake-magick");
        std::fs::write(&tool, "#!/bin/sh\necho 'no decode delegate' 1>&2\nexit 1\n").unwrap();
        make_executable(&tool);

        let reducer = MagickReducer::with_config(ReducerConfig::default().tool_path(&tool));
        let target = dir.path().join("rock_8bit.png");
        let err = reducer
            .reduce(&dir.path().join("rock.png"), &target)
            .unwrap_err();

        match err {
            ReduceError::ProcessFailed { exit_code, stderr } => {
                assert_eq!(exit_code, 1);
                assert!(stderr.contains("no decode delegate"));
            }
            other => panic!("expected ProcessFailed, got {other:?}"),
        }
        assert!(!target.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_success_without_output_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("fake-magick");
        std::fs::write(&tool, "#!/bin/sh\nexit 0\n").unwrap();
        make_executable(&tool);

        let reducer = MagickReducer::with_config(ReducerConfig::default().tool_path(&tool));
        let err = reducer
            .reduce(&dir.path().join("rock.png"), &dir.path().join("out.png"))
            .unwrap_err();
        assert!(matches!(err, ReduceError::OutputMissing { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_tool_receives_png8_output_spec() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("fake-magick");
        // Strip the PNG8: prefix and copy the input, like a real conversion would.
        std::fs::write(&tool, "#!/bin/sh\ncp \"$1\" \"${2#PNG8:}\"\n").unwrap();
        make_executable(&tool);

        let source = dir.path().join("rock.png");
        std::fs::write(&source, b"heightmap").unwrap();
        let target = dir.path().join("rock_8bit.png");

        let reducer = MagickReducer::with_config(ReducerConfig::default().tool_path(&tool));
        reducer.reduce(&source, &target).unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"heightmap");
    }

    #[cfg(unix)]
    fn make_executable(path: &Path) {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms).unwrap();
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ReduceError::ToolNotFound.code(), "REDUCE_001");
        assert_eq!(ReduceError::Timeout { timeout_secs: 3 }.code(), "REDUCE_003");
        assert_eq!(ReduceError::ToolNotFound.category(), "reduce");
        assert!(ReduceError::Timeout { timeout_secs: 300 }
            .to_string()
            .contains("300 seconds"));
    }
}
