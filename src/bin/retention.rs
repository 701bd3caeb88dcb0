//! # Retention Sweeper
//!
//! Periodic cleanup of aged local data: date-named upload folders and
//! stale output files past the retention threshold. Simple and
//! non-concurrent by design; runs alongside the worker on the same host.
//!
//! Configuration (environment): `UPLOAD_FOLDER` (default `uploads`),
//! `OUTPUT_FOLDER` (default `output`), `CHECK_INTERVAL` seconds between
//! sweeps (default 3600), `DAYS_THRESHOLD` retention age in days
//! (default 7).

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{NaiveDate, Utc};
use tracing::{error, info, warn};

use faceswap_worker::logging;

struct RetentionSweeper {
    upload_root: PathBuf,
    output_dir: PathBuf,
    days_threshold: i64,
}

impl RetentionSweeper {
    fn new(upload_root: PathBuf, output_dir: PathBuf, days_threshold: i64) -> Self {
        Self {
            upload_root,
            output_dir,
            days_threshold,
        }
    }

    /// Upload folders are named by date (`%Y-%m-%d`); anything else is
    /// skipped with a warning.
    fn is_expired_folder_name(&self, name: &str) -> bool {
        match NaiveDate::parse_from_str(name, "%Y-%m-%d") {
            Ok(date) => (Utc::now().date_naive() - date).num_days() > self.days_threshold,
            Err(_) => {
                warn!(name, "Unexpected folder name, skipping");
                false
            }
        }
    }

    fn is_expired_file(&self, path: &Path) -> bool {
        let modified = std::fs::metadata(path).and_then(|m| m.modified());
        match modified {
            Ok(modified) => {
                let age = SystemTime::now()
                    .duration_since(modified)
                    .unwrap_or_default();
                age > Duration::from_secs(self.days_threshold as u64 * 86_400)
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Error checking file age");
                false
            }
        }
    }

    fn sweep_upload_folders(&self) {
        let entries = match std::fs::read_dir(&self.upload_root) {
            Ok(entries) => entries,
            Err(e) => {
                error!(root = %self.upload_root.display(), error = %e, "Error listing upload root");
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            if path.is_dir() && self.is_expired_folder_name(&name) {
                info!(path = %path.display(), "Removing old upload folder");
                if let Err(e) = std::fs::remove_dir_all(&path) {
                    error!(path = %path.display(), error = %e, "Failed to remove folder");
                }
            }
        }
    }

    fn sweep_output_files(&self) {
        let entries = match std::fs::read_dir(&self.output_dir) {
            Ok(entries) => entries,
            Err(e) => {
                error!(dir = %self.output_dir.display(), error = %e, "Error listing output dir");
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() && self.is_expired_file(&path) {
                info!(path = %path.display(), "Removing old output file");
                if let Err(e) = std::fs::remove_file(&path) {
                    error!(path = %path.display(), error = %e, "Failed to remove file");
                }
            }
        }
    }

    fn sweep(&self) {
        self.sweep_upload_folders();
        self.sweep_output_files();
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[tokio::main]
async fn main() {
    logging::init_tracing();

    let upload_root = PathBuf::from(env_or("UPLOAD_FOLDER", "uploads"));
    let output_dir = PathBuf::from(env_or("OUTPUT_FOLDER", "output"));
    let interval = Duration::from_secs(
        env_or("CHECK_INTERVAL", "3600").parse().unwrap_or(3600),
    );
    let days_threshold: i64 = env_or("DAYS_THRESHOLD", "7").parse().unwrap_or(7);

    let sweeper = RetentionSweeper::new(upload_root.clone(), output_dir.clone(), days_threshold);

    info!(
        upload_root = %upload_root.display(),
        output_dir = %output_dir.display(),
        days_threshold,
        "Starting retention sweeper"
    );

    loop {
        info!("Running cleanup check");
        sweeper.sweep();

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received, stopping sweeper");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sweeper(tmp: &tempfile::TempDir) -> RetentionSweeper {
        RetentionSweeper::new(
            tmp.path().join("uploads"),
            tmp.path().join("output"),
            7,
        )
    }

    #[test]
    fn date_folders_expire_by_name() {
        let tmp = tempfile::tempdir().unwrap();
        let sweeper = sweeper(&tmp);

        let old = (Utc::now().date_naive() - chrono::Days::new(30)).format("%Y-%m-%d");
        let fresh = Utc::now().date_naive().format("%Y-%m-%d");

        assert!(sweeper.is_expired_folder_name(&old.to_string()));
        assert!(!sweeper.is_expired_folder_name(&fresh.to_string()));
        assert!(!sweeper.is_expired_folder_name("not-a-date"));
    }

    #[test]
    fn sweep_removes_only_expired_folders() {
        let tmp = tempfile::tempdir().unwrap();
        let sweeper = sweeper(&tmp);
        let uploads = tmp.path().join("uploads");

        let old_name = (Utc::now().date_naive() - chrono::Days::new(30))
            .format("%Y-%m-%d")
            .to_string();
        let fresh_name = Utc::now().date_naive().format("%Y-%m-%d").to_string();

        std::fs::create_dir_all(uploads.join(&old_name)).unwrap();
        std::fs::create_dir_all(uploads.join(&fresh_name)).unwrap();
        std::fs::create_dir_all(uploads.join("misc")).unwrap();

        sweeper.sweep_upload_folders();

        assert!(!uploads.join(&old_name).exists());
        assert!(uploads.join(&fresh_name).exists());
        assert!(uploads.join("misc").exists());
    }

    #[test]
    fn fresh_output_files_survive_sweep() {
        let tmp = tempfile::tempdir().unwrap();
        let sweeper = sweeper(&tmp);
        let output = tmp.path().join("output");
        std::fs::create_dir_all(&output).unwrap();

        let file = output.join("output_t-1_abcd.jpeg");
        std::fs::write(&file, b"artifact").unwrap();

        sweeper.sweep_output_files();
        assert!(file.exists());
    }

    #[test]
    fn sweep_tolerates_missing_directories() {
        let tmp = tempfile::tempdir().unwrap();
        // Neither uploads/ nor output/ exists; sweep must not panic.
        sweeper(&tmp).sweep();
    }
}
