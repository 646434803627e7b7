//! Image references from clients: remote URLs, local paths, or inline
//! `data:image/...;base64,` payloads. Whatever the source, the result is an
//! RGB image re-encoded as PNG for the Inference Provider.

use crate::{Error, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{DynamicImage, ImageFormat};
use std::{io::Cursor, path::PathBuf, time::Duration};
use tracing::{debug, warn};

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Remote(String),
    Path(PathBuf),
    /// Base64 payload with the `data:` header stripped.
    Inline(String),
}

impl ImageSource {
    pub fn parse(reference: &str) -> Result<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(Error::image("empty image reference"));
        }

        if reference.starts_with("data:") {
            if !reference.starts_with("data:image") {
                return Err(Error::image("inline data is not an image"));
            }
            let (_, payload) = reference
                .split_once(',')
                .ok_or_else(|| Error::image("inline image has no payload"))?;
            return Ok(Self::Inline(payload.to_string()));
        }

        if reference.starts_with("http://") || reference.starts_with("https://") {
            return Ok(Self::Remote(reference.to_string()));
        }

        Ok(Self::Path(PathBuf::from(reference)))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Remote(_) => "remote",
            Self::Path(_) => "path",
            Self::Inline(_) => "inline",
        }
    }
}

/// A decoded image, normalised to 8-bit RGB and stored as PNG.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl LoadedImage {
    pub fn to_data_url(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }
}

#[derive(Clone)]
pub struct ImageLoader {
    http: reqwest::Client,
}

impl ImageLoader {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self { http })
    }

    /// Fetches and decodes `reference`; every failure is an input error
    /// carrying a readable reason.
    pub async fn load(&self, reference: &str) -> Result<LoadedImage> {
        let source = ImageSource::parse(reference)?;
        debug!("Loading {} image", source.kind());

        let bytes = self.fetch(&source).await.map_err(|e| {
            warn!("Failed to fetch {} image: {}", source.kind(), e);
            match e {
                Error::Image(_) => e,
                other => Error::image(other.to_string()),
            }
        })?;

        tokio::task::spawn_blocking(move || normalize(&bytes))
            .await?
            .map_err(|e| match e {
                Error::Image(_) => e,
                other => Error::image(other.to_string()),
            })
    }

    async fn fetch(&self, source: &ImageSource) -> Result<Vec<u8>> {
        match source {
            ImageSource::Inline(payload) => Ok(STANDARD.decode(payload.trim())?),
            ImageSource::Path(path) => Ok(tokio::fs::read(path).await?),
            ImageSource::Remote(url) => {
                let response = self.http.get(url).send().await?.error_for_status()?;
                Ok(response.bytes().await?.to_vec())
            }
        }
    }
}

/// Decodes any supported format and re-encodes it as RGB PNG.
pub fn normalize(bytes: &[u8]) -> Result<LoadedImage> {
    let rgb = image::load_from_memory(bytes)?.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut png = Vec::new();
    DynamicImage::ImageRgb8(rgb).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

    Ok(LoadedImage { width, height, png })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use pretty_assertions::assert_eq;

    fn rgba_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 128]));
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn test_parse_sources() {
        assert_eq!(
            ImageSource::parse("https://example.com/a.png").unwrap(),
            ImageSource::Remote("https://example.com/a.png".to_string())
        );
        assert_eq!(
            ImageSource::parse(" /tmp/a.jpg ").unwrap(),
            ImageSource::Path(PathBuf::from("/tmp/a.jpg"))
        );
        assert_eq!(
            ImageSource::parse("data:image/png;base64,QUJD").unwrap(),
            ImageSource::Inline("QUJD".to_string())
        );
    }

    #[test]
    fn test_parse_rejects_bad_references() {
        assert!(ImageSource::parse("").is_err());
        assert!(ImageSource::parse("data:image/png;base64").is_err());
        assert!(ImageSource::parse("data:text/plain,hello").is_err());
    }

    #[test]
    fn test_normalize_converts_to_rgb_png() {
        let loaded = normalize(&rgba_png(4, 3)).unwrap();
        assert_eq!((loaded.width, loaded.height), (4, 3));

        let decoded = image::load_from_memory(&loaded.png).unwrap();
        assert_eq!(decoded.color(), image::ColorType::Rgb8);
        assert!(loaded.to_data_url().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        let err = normalize(b"definitely not an image").unwrap_err();
        assert!(err.is_input_failure());
    }

    #[tokio::test]
    async fn test_load_inline_image() {
        let loader = ImageLoader::new().unwrap();
        let reference = format!("data:image/png;base64,{}", STANDARD.encode(rgba_png(2, 2)));

        let loaded = loader.load(&reference).await.unwrap();
        assert_eq!((loaded.width, loaded.height), (2, 2));
    }

    #[tokio::test]
    async fn test_load_bad_base64_is_image_error() {
        let loader = ImageLoader::new().unwrap();
        let err = loader.load("data:image/png;base64,@@@").await.unwrap_err();
        assert!(matches!(err, Error::Image(_)));
    }

    #[tokio::test]
    async fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixel.png");
        std::fs::write(&path, rgba_png(1, 1)).unwrap();

        let loader = ImageLoader::new().unwrap();
        let loaded = loader.load(path.to_str().unwrap()).await.unwrap();
        assert_eq!((loaded.width, loaded.height), (1, 1));
    }

    #[tokio::test]
    async fn test_missing_path_is_descriptive_error() {
        let loader = ImageLoader::new().unwrap();
        let err = loader.load("/nonexistent/dir/cat.png").await.unwrap_err();
        assert!(matches!(err, Error::Image(_)));
        assert!(err.to_string().starts_with("Could not load image:"));
    }
}
