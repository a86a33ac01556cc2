pub mod agent_core;
pub mod cli;
pub mod commands;
pub mod config;
pub mod inference;
pub mod mcp_client;

#[cfg(test)]
pub(crate) mod test_support;

use std::path::{Path, PathBuf};

/// Number of rotated log files kept next to the active one.
const LOG_FILES_KEPT: u32 = 3;

/// Return the platform-standard data directory for mcp-chat.
///
/// - macOS: `~/Library/Application Support/mcp-chat/`
/// - Windows: `{FOLDERID_RoamingAppData}\mcp-chat\`
/// - Linux: `$XDG_DATA_HOME/mcp-chat/` (fallback `~/.local/share/mcp-chat/`)
///
/// Falls back to `~/.mcp-chat/` only if none of the above can be resolved.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = dirs::data_dir() {
        return dir.join("mcp-chat");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mcp-chat")
}

/// Initialize the tracing subscriber.
///
/// Stdout belongs to the chat, so logs go to a file: `log_file` if given,
/// otherwise `mcp-chat.log` in [`data_dir`]. A `log_file` of `-` logs to
/// stderr instead. File logs are rotated on every start (keeping the last 3)
/// and flushed line by line.
///
/// Returns the log file path, or `None` when logging to stderr.
pub fn init_tracing(log_file: Option<&Path>) -> std::io::Result<Option<PathBuf>> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mcp_chat=info,warn"));

    if log_file == Some(Path::new("-")) {
        fmt::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .try_init()
            .map_err(std::io::Error::other)?;
        return Ok(None);
    }

    let log_path = match log_file {
        Some(path) => path.to_path_buf(),
        None => data_dir().join("mcp-chat.log"),
    };
    if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    rotate_log_file(&log_path, LOG_FILES_KEPT);

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    fmt::fmt()
        .with_env_filter(filter)
        .with_writer(FlushingWriter::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .try_init()
        .map_err(std::io::Error::other)?;

    // Startup banner, so a session's log is easy to find.
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_file = %log_path.display(),
        pid = std::process::id(),
        "=== mcp-chat starting ==="
    );

    Ok(Some(log_path))
}

/// Rotate log files: `mcp-chat.log` → `.1` → `.2` → … → `.{keep}`.
///
/// The oldest file beyond `keep` is deleted. Missing files in the chain are
/// skipped.
fn rotate_log_file(base_path: &Path, keep: u32) {
    let oldest = format!("{}.{keep}", base_path.display());
    let _ = std::fs::remove_file(&oldest);

    for i in (1..keep).rev() {
        let from = format!("{}.{i}", base_path.display());
        let to = format!("{}.{}", base_path.display(), i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    if base_path.exists() {
        let to = format!("{}.1", base_path.display());
        let _ = std::fs::rename(base_path, &to);
    }
}

/// A `std::fs::File` writer that flushes after every write, so the log is
/// complete even if the process is killed.
#[derive(Clone)]
struct FlushingWriter {
    file: std::sync::Arc<std::sync::Mutex<std::fs::File>>,
}

impl FlushingWriter {
    fn new(file: std::fs::File) -> Self {
        Self {
            file: std::sync::Arc::new(std::sync::Mutex::new(file)),
        }
    }
}

impl std::io::Write for FlushingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut f = self.file.lock().map_err(|e| {
            std::io::Error::other(format!("lock poisoned: {e}"))
        })?;
        let n = std::io::Write::write(&mut *f, buf)?;
        std::io::Write::flush(&mut *f)?;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut f = self.file.lock().map_err(|e| {
            std::io::Error::other(format!("lock poisoned: {e}"))
        })?;
        std::io::Write::flush(&mut *f)
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for FlushingWriter {
    type Writer = FlushingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_rotate_log_file_keeps_last_three() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("mcp-chat.log");

        for run in 1..=5 {
            rotate_log_file(&base, 3);
            std::fs::write(&base, format!("run {run}")).unwrap();
        }

        assert_eq!(std::fs::read_to_string(&base).unwrap(), "run 5");
        let rotated = |n: u32| dir.path().join(format!("mcp-chat.log.{n}"));
        assert_eq!(std::fs::read_to_string(rotated(1)).unwrap(), "run 4");
        assert_eq!(std::fs::read_to_string(rotated(3)).unwrap(), "run 2");
        assert!(!rotated(4).exists());
    }

    #[test]
    fn test_flushing_writer_writes_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        let file = std::fs::File::create(&path).unwrap();

        let mut writer = FlushingWriter::new(file);
        writer.write_all(b"line one\n").unwrap();
        let mut clone = writer.clone();
        clone.write_all(b"line two\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "line one\nline two\n");
    }

    #[test]
    fn test_data_dir_is_app_specific() {
        let dir = data_dir();
        let name = dir.file_name().unwrap().to_string_lossy();
        assert!(name == "mcp-chat" || name == ".mcp-chat");
    }
}
