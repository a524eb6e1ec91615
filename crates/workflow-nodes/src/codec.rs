//! File-backed image codec and thumbnail encoding
//!
//! Files are decoded as 3-channel RGB regardless of their stored layout.
//! On write the artifact's own layout is kept: RGB artifacts become color
//! images and gray artifacts single-channel ones. The container format is
//! chosen from the file extension.

use std::io::Cursor;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use node_engine::{Artifact, Channels, ImageCodec, NodeEngineError, Result};

/// Longest edges of a workflow thumbnail
pub const THUMBNAIL_SIZE: (u32, u32) = (200, 150);

/// Reads and writes image files through the `image` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct FsImageCodec;

impl ImageCodec for FsImageCodec {
    fn read(&self, path: &Path) -> Result<Artifact> {
        let decoded = image::open(path).map_err(|e| {
            NodeEngineError::processing(
                node_engine::INPUT_NODE_TYPE,
                format!("could not load image from {}: {}", path.display(), e),
            )
        })?;
        log::debug!("Decoded {:?} ({}x{})", path, decoded.width(), decoded.height());
        from_dynamic(decoded, Channels::Rgb)
    }

    fn write(&self, path: &Path, artifact: &Artifact) -> Result<()> {
        to_dynamic(artifact)?.save(path).map_err(|e| {
            NodeEngineError::processing(
                node_engine::OUTPUT_NODE_TYPE,
                format!("could not write image to {}: {}", path.display(), e),
            )
        })
    }
}

/// View an artifact as an `image` buffer
pub fn to_dynamic(artifact: &Artifact) -> Result<DynamicImage> {
    let (w, h) = (artifact.width(), artifact.height());
    let data = artifact.data().to_vec();
    let image = match artifact.channels() {
        Channels::Gray => GrayImage::from_raw(w, h, data).map(DynamicImage::ImageLuma8),
        Channels::Rgb => RgbImage::from_raw(w, h, data).map(DynamicImage::ImageRgb8),
    };
    image.ok_or_else(|| NodeEngineError::processing("Artifact", "sample buffer too small for its shape"))
}

/// Convert an `image` buffer to an artifact with the given layout
pub fn from_dynamic(image: DynamicImage, channels: Channels) -> Result<Artifact> {
    let (w, h) = (image.width(), image.height());
    let data = match channels {
        Channels::Gray => image.into_luma8().into_raw(),
        Channels::Rgb => image.into_rgb8().into_raw(),
    };
    Artifact::new(w, h, channels, data)
}

/// PNG preview scaled to fit [`THUMBNAIL_SIZE`], as a `data:` URL
pub fn thumbnail_data_url(artifact: &Artifact) -> Result<String> {
    let preview = to_dynamic(artifact)?.thumbnail(THUMBNAIL_SIZE.0, THUMBNAIL_SIZE.1);
    let mut png = Vec::new();
    preview
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| NodeEngineError::processing("Thumbnail", e))?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(&png)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32) -> Artifact {
        let data = (0..w * h * 3).map(|i| (i % 256) as u8).collect();
        Artifact::new(w, h, Channels::Rgb, data).unwrap()
    }

    #[test]
    fn test_png_write_then_read() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("gradient.png");
        let original = gradient(10, 10);

        FsImageCodec.write(&path, &original).unwrap();
        let decoded = FsImageCodec.read(&path).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_gray_is_read_back_as_rgb() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("gray.png");
        FsImageCodec
            .write(&path, &Artifact::filled(4, 3, Channels::Gray, 77))
            .unwrap();

        let decoded = FsImageCodec.read(&path).unwrap();
        assert_eq!(decoded.channels(), Channels::Rgb);
        assert_eq!(decoded.shape(), (3, 4, 3));
        assert!(decoded.data().iter().all(|&v| v == 77));
    }

    #[test]
    fn test_missing_file_is_processing_failure() {
        let err = FsImageCodec.read(Path::new("/definitely/not/here.png")).unwrap_err();
        match err {
            NodeEngineError::ProcessingFailure { node_type, cause } => {
                assert_eq!(node_type, "Input");
                assert!(cause.contains("here.png"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_thumbnail_fits_box() {
        let url = thumbnail_data_url(&gradient(400, 100)).unwrap();
        let encoded = url.strip_prefix("data:image/png;base64,").unwrap();
        let png = STANDARD.decode(encoded).unwrap();
        let preview = image::load_from_memory(&png).unwrap();
        assert!(preview.width() <= THUMBNAIL_SIZE.0);
        assert!(preview.height() <= THUMBNAIL_SIZE.1);
        assert_eq!(preview.width(), 200);
    }
}
