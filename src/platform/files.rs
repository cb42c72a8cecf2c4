/// Local file selection. The `image/*` filter is a hint; nothing is rejected.

use crate::image_ref::{sniff_mime, ImageRef};
use crate::Result;
use image::ImageFormat;
use std::path::Path;

/// Filter hint shown by file pickers
pub const IMAGE_FILTER: &str = "image/*";

#[derive(Debug, Clone)]
pub struct LocalFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl LocalFile {
    pub fn into_image_ref(self) -> ImageRef {
        ImageRef::Inline {
            mime_type: self.mime_type,
            data: self.bytes,
        }
    }
}

/// Read a user-selected file. The MIME type comes from the extension when
/// it names an image format, otherwise from the content.
pub fn read_image_file(path: &Path) -> Result<LocalFile> {
    let bytes = std::fs::read(path)?;
    let mime_type = ImageFormat::from_path(path)
        .map(|f| f.to_mime_type().to_string())
        .unwrap_or_else(|_| sniff_mime(&bytes).to_string());
    if !mime_type.starts_with("image/") {
        log::warn!("{} does not look like an image ({})", path.display(), mime_type);
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(LocalFile {
        name,
        mime_type,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_decides_mime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, b"not really a jpeg").unwrap();
        let f = read_image_file(&path).unwrap();
        assert_eq!(f.mime_type, "image/jpeg");
        assert_eq!(f.name, "photo.jpg");
    }

    #[test]
    fn content_sniffing_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload");
        std::fs::write(&path, b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR").unwrap();
        let f = read_image_file(&path).unwrap();
        assert_eq!(f.mime_type, "image/png");
        assert!(f.into_image_ref().is_inline());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_image_file(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }
}
