//! Download task and result types shared across the workspace

use super::Platform;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Role a fetched file plays during verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Distribution artifact, the verification target
    Main,
    /// Checksum manifest consumed by the checksum stage
    Checksum,
    /// Detached signature over the checksum manifest
    Signature,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Main => write!(f, "main"),
            FileKind::Checksum => write!(f, "checksum"),
            FileKind::Signature => write!(f, "signature"),
        }
    }
}

/// One required or optional fetch. Immutable once created.
#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub url: String,
    pub output_path: PathBuf,
    pub platform: Platform,
    pub runtime: String,
    pub version: String,
    pub kind: FileKind,
    pub headers: HashMap<String, String>,
    /// Absence upstream (404/403) is tolerated for optional files
    pub optional: bool,
}

impl DownloadTask {
    pub fn new(
        url: impl Into<String>,
        output_path: impl Into<PathBuf>,
        platform: Platform,
        runtime: impl Into<String>,
        version: impl Into<String>,
        kind: FileKind,
    ) -> Self {
        Self {
            url: url.into(),
            output_path: output_path.into(),
            platform,
            runtime: runtime.into(),
            version: version.into(),
            kind,
            headers: HashMap::new(),
            optional: false,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// File name component of the output path
    pub fn file_name(&self) -> String {
        self.output_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Outcome of executing one task.
///
/// Download code only ever constructs these; after the batch completes the
/// verification pipeline may retract a success via [`DownloadResult::mark_failed`].
#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub success: bool,
    pub size_bytes: u64,
    pub duration: Duration,
    pub error: Option<String>,
    pub task: DownloadTask,
}

impl DownloadResult {
    pub fn succeeded(task: DownloadTask, size_bytes: u64, duration: Duration) -> Self {
        Self {
            success: true,
            size_bytes,
            duration,
            error: None,
            task,
        }
    }

    pub fn failed(task: DownloadTask, error: impl Into<String>) -> Self {
        Self {
            success: false,
            size_bytes: 0,
            duration: Duration::ZERO,
            error: Some(error.into()),
            task,
        }
    }

    /// Flip an earlier success to failure (verification retraction)
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.success = false;
        self.error = Some(error.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> DownloadTask {
        DownloadTask::new(
            "https://example.com/node-v20.11.1-linux-x64.tar.gz",
            "/tmp/node-v20.11.1-linux-x64.tar.gz",
            Platform::new("linux", "x64"),
            "nodejs",
            "20.11.1",
            FileKind::Main,
        )
    }

    #[test]
    fn test_task_builders() {
        let task = task().with_header("Accept", "application/octet-stream").optional();
        assert!(task.optional);
        assert_eq!(
            task.headers.get("Accept").map(String::as_str),
            Some("application/octet-stream")
        );
        assert_eq!(task.file_name(), "node-v20.11.1-linux-x64.tar.gz");
    }

    #[test]
    fn test_result_mark_failed_retracts_success() {
        let mut result = DownloadResult::succeeded(task(), 42, Duration::from_secs(1));
        assert!(result.success);
        result.mark_failed("checksum mismatch");
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("checksum mismatch"));
        // Byte count and duration describe the transfer and stay intact
        assert_eq!(result.size_bytes, 42);
    }

    #[test]
    fn test_file_kind_display() {
        assert_eq!(FileKind::Main.to_string(), "main");
        assert_eq!(FileKind::Checksum.to_string(), "checksum");
        assert_eq!(FileKind::Signature.to_string(), "signature");
    }
}
