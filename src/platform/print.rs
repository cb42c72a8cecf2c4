/// Print hand-off. The host owns the print dialog; nothing is reported back.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub trait PrintHost: Send + Sync {
    /// Hand a rendered page to the host's print flow. The file at `page` is
    /// owned by the host from here on.
    fn print(&self, page: &Path);
}

/// Spawns a system print command (`lp` by default) without blocking the
/// caller. The page is deleted once the command exits or fails to start.
pub struct SystemPrintHost {
    program: String,
    args: Vec<String>,
}

impl SystemPrintHost {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Default for SystemPrintHost {
    fn default() -> Self {
        Self::new("lp", Vec::new())
    }
}

impl PrintHost for SystemPrintHost {
    fn print(&self, page: &Path) {
        let spawned = Command::new(&self.program)
            .args(&self.args)
            .arg(page)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .spawn();
        match spawned {
            Ok(mut child) => {
                log::info!("print job for {} handed to {} (pid {})", page.display(), self.program, child.id());
                let page = page.to_path_buf();
                std::thread::spawn(move || {
                    if let Err(e) = child.wait() {
                        log::warn!("print command did not finish cleanly: {}", e);
                    }
                    remove_page(&page);
                });
            }
            Err(e) => {
                log::warn!("could not start {}: {}", self.program, e);
                remove_page(page);
            }
        }
    }
}

fn remove_page(page: &Path) {
    if let Err(e) = std::fs::remove_file(page) {
        log::debug!("could not remove print page {}: {}", page.display(), e);
    }
}

/// Noop host that remembers what it was asked to print
pub struct RecordingPrintHost {
    jobs: std::sync::Mutex<Vec<PathBuf>>,
}

impl RecordingPrintHost {
    pub fn new() -> Self {
        RecordingPrintHost {
            jobs: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn jobs(&self) -> Vec<PathBuf> {
        self.jobs.lock().map(|j| j.clone()).unwrap_or_default()
    }

    /// Delete every page handed over so far and forget the jobs
    pub fn finish(&self) {
        if let Ok(mut jobs) = self.jobs.lock() {
            for page in jobs.drain(..) {
                remove_page(&page);
            }
        }
    }
}

impl Default for RecordingPrintHost {
    fn default() -> Self {
        Self::new()
    }
}

impl PrintHost for RecordingPrintHost {
    fn print(&self, page: &Path) {
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.push(page.to_path_buf());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_in(dir: &tempfile::TempDir) -> PathBuf {
        let page = dir.path().join("page.png");
        std::fs::write(&page, b"png").unwrap();
        page
    }

    #[test]
    fn missing_print_program_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let page = page_in(&dir);
        let host = SystemPrintHost::new("posterkit-no-such-print-binary", vec![]);
        host.print(&page);
        assert!(!page.exists());
    }

    #[cfg(unix)]
    #[test]
    fn page_is_removed_after_print_command_exits() {
        let dir = tempfile::tempdir().unwrap();
        let page = page_in(&dir);
        SystemPrintHost::new("true", vec![]).print(&page);
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while page.exists() && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(20));
        }
        assert!(!page.exists());
    }
}
