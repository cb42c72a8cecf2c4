//! Host integrations: the native print flow and local file selection
//!
//! These are the seams where the poster tool hands control to the
//! environment it runs in. Each surface has a real implementation and an
//! in-memory one used by tests.

pub mod files;
pub mod print;

pub use files::{read_image_file, LocalFile, IMAGE_FILTER};
pub use print::{PrintHost, RecordingPrintHost, SystemPrintHost};

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn recording_host_collects_jobs() {
        let host = RecordingPrintHost::new();
        host.print(Path::new("/tmp/a.png"));
        host.print(Path::new("/tmp/b.png"));
        assert_eq!(host.jobs().len(), 2);
        assert_eq!(IMAGE_FILTER, "image/*");
    }
}
