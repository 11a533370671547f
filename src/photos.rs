use async_trait::async_trait;
use std::io;
use std::path::PathBuf;

/// Access to uploaded photo bytes by reference. The game core never
/// assumes a particular storage medium; the upload layer decides what
/// a photo reference means.
#[async_trait]
pub trait PhotoSource: Send + Sync {
    async fn read(&self, photo_ref: &str) -> io::Result<Vec<u8>>;
}

/// Photo source backed by a directory of uploaded files
pub struct DirPhotoSource {
    root: PathBuf,
}

impl DirPhotoSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl PhotoSource for DirPhotoSource {
    async fn read(&self, photo_ref: &str) -> io::Result<Vec<u8>> {
        tokio::fs::read(self.root.join(photo_ref)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_photo_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("photo.jpg"), b"jpeg bytes").unwrap();

        let source = DirPhotoSource::new(dir.path());
        let bytes = source.read("photo.jpg").await.unwrap();
        assert_eq!(bytes, b"jpeg bytes");
    }

    #[tokio::test]
    async fn test_missing_photo_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirPhotoSource::new(dir.path());
        assert!(source.read("nope.jpg").await.is_err());
    }
}
