use std::path::Path;

use flexi_logger::{Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming};

/// Start file logging under `log_dir`, duplicated to the console.
///
/// `base_level` is a log spec string such as `"info"` or `"cellscan=debug"`;
/// `RUST_LOG` takes precedence when set. Keep the returned handle alive for
/// the lifetime of the program.
pub fn setup_logging(base_level: &str, log_dir: &Path) -> anyhow::Result<LoggerHandle> {
    let handle = Logger::try_with_env_or_str(base_level)?
        .log_to_file(FileSpec::default().directory(log_dir).basename("cellscan"))
        .duplicate_to_stdout(Duplicate::All)
        .rotate(
            Criterion::Size(1024 * 1024), //1MB
            Naming::Timestamps,
            Cleanup::KeepLogFiles(5),
        )
        .start()?;
    Ok(handle)
}
