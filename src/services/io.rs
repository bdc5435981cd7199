//! Byte-level input/output for sticker sources and results
//!
//! The pipeline itself only ever sees in-memory buffers. This service is
//! where files, streams and stdio are turned into those buffers and back.

use crate::error::{Result, StickerError};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Extension appended to the input stem when no output path is given
pub const STICKER_SUFFIX: &str = "sticker.webp";

/// Service for reading source images and writing finished stickers
pub struct ImageIOService;

impl ImageIOService {
    /// Read an image file into memory
    ///
    /// # Examples
    /// ```rust,no_run
    /// use misticker::services::ImageIOService;
    ///
    /// let bytes = ImageIOService::load_bytes("cutout.png")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_bytes<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(StickerError::file_io_error(
                "read image file",
                path_ref,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        let bytes = std::fs::read(path_ref)
            .map_err(|e| StickerError::file_io_error("read image file", path_ref, &e))?;
        log::debug!("Read {} bytes from {}", bytes.len(), path_ref.display());
        Ok(bytes)
    }

    /// Write sticker bytes to a file, creating parent directories as needed
    pub fn save_bytes<P: AsRef<Path>>(bytes: &[u8], path: P) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StickerError::file_io_error("create output directory", parent, &e)
            })?;
        }

        std::fs::write(path_ref, bytes)
            .map_err(|e| StickerError::file_io_error("write sticker", path_ref, &e))?;
        log::debug!("Wrote {} bytes to {}", bytes.len(), path_ref.display());
        Ok(())
    }

    /// Read all bytes from an async reader
    ///
    /// # Examples
    /// ```rust,no_run
    /// use misticker::services::ImageIOService;
    /// use tokio::fs::File;
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// let file = File::open("cutout.png").await?;
    /// let bytes = ImageIOService::load_from_reader(file).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn load_from_reader<R: AsyncRead + Unpin>(mut reader: R) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer).await.map_err(|e| {
            StickerError::Io(std::io::Error::new(
                e.kind(),
                format!("stream read failed: {}", e),
            ))
        })?;
        Ok(buffer)
    }

    /// Write bytes to an async writer and flush it
    ///
    /// Returns the number of bytes written.
    pub async fn save_to_writer<W: AsyncWrite + Unpin>(bytes: &[u8], mut writer: W) -> Result<u64> {
        writer.write_all(bytes).await.map_err(|e| {
            StickerError::Io(std::io::Error::new(
                e.kind(),
                format!("stream write failed: {}", e),
            ))
        })?;
        writer.flush().await.map_err(|e| {
            StickerError::Io(std::io::Error::new(
                e.kind(),
                format!("stream flush failed: {}", e),
            ))
        })?;
        Ok(bytes.len() as u64)
    }

    /// Read the whole of standard input
    pub async fn read_stdin() -> Result<Vec<u8>> {
        Self::load_from_reader(tokio::io::stdin()).await
    }

    /// Write bytes to standard output
    pub async fn write_stdout(bytes: &[u8]) -> Result<u64> {
        Self::save_to_writer(bytes, tokio::io::stdout()).await
    }

    /// Check if a file path has a decodable image extension
    pub fn is_supported_format<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .is_some_and(|ext| {
                matches!(
                    ext.as_str(),
                    "jpg" | "jpeg" | "png" | "webp" | "tiff" | "tif"
                )
            })
    }

    /// Default output path for `input`: `<stem>.sticker.webp` next to it
    #[must_use]
    pub fn default_output_path<P: AsRef<Path>>(input: P) -> PathBuf {
        let input = input.as_ref();
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("sticker");
        input.with_file_name(format!("{}.{}", stem, STICKER_SUFFIX))
    }

    /// Output path for `input` inside a batch output directory: `<dir>/<stem>.webp`
    #[must_use]
    pub fn batch_output_path<P: AsRef<Path>, D: AsRef<Path>>(input: P, output_dir: D) -> PathBuf {
        let stem = input
            .as_ref()
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("sticker");
        output_dir.as_ref().join(format!("{}.webp", stem))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_is_supported_format() {
        assert!(ImageIOService::is_supported_format("cat.jpg"));
        assert!(ImageIOService::is_supported_format("cat.JPEG"));
        assert!(ImageIOService::is_supported_format("cat.png"));
        assert!(ImageIOService::is_supported_format("cat.webp"));
        assert!(ImageIOService::is_supported_format("cat.tif"));

        assert!(!ImageIOService::is_supported_format("cat.txt"));
        assert!(!ImageIOService::is_supported_format("cat"));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let err = ImageIOService::load_bytes("/definitely/missing/cat.png").unwrap_err();
        assert!(matches!(err, StickerError::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
        assert!(err.to_string().contains("missing/cat.png"));
    }

    #[test]
    fn test_save_and_load_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("cat.webp");

        ImageIOService::save_bytes(&[1, 2, 3, 4], &path).unwrap();
        assert_eq!(ImageIOService::load_bytes(&path).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_output_paths() {
        assert_eq!(
            ImageIOService::default_output_path("/photos/cat.png"),
            PathBuf::from("/photos/cat.sticker.webp")
        );
        assert_eq!(
            ImageIOService::batch_output_path("/photos/cat.png", "/stickers"),
            PathBuf::from("/stickers/cat.webp")
        );
    }

    #[tokio::test]
    async fn test_reader_writer_round_trip() {
        let bytes = ImageIOService::load_from_reader(&b"sticker bytes"[..])
            .await
            .unwrap();
        assert_eq!(bytes, b"sticker bytes");

        let mut sink = Vec::new();
        let written = ImageIOService::save_to_writer(&bytes, &mut sink).await.unwrap();
        assert_eq!(written, 13);
        assert_eq!(sink, b"sticker bytes");
    }
}
