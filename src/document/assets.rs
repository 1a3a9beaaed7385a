//! Image loading for logos and signatures.
//!
//! Every image is decoded once to learn its pixel size and re-encoded as
//! deflated RGB (plus an optional alpha mask) ready to embed in a PDF.

use super::layout::{ImageSize, ImageSlot};
use crate::models::SignatureImage;
use base64::{engine::general_purpose::STANDARD, Engine};
use futures::future::join_all;
use miniz_oxide::deflate::compress_to_vec_zlib;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const DEFLATE_LEVEL: u8 = 6;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("HTTP request error: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("Image request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid base64 image: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Image decoding error: {0}")]
    Decode(#[from] image::ImageError),
}

/// Where an image comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    Url(String),
    Path(PathBuf),
    Base64(SignatureImage),
}

impl ImageSource {
    /// Interpret a reference as an http(s) URL, a `data:` URL or a file path.
    pub fn parse(reference: &str) -> Self {
        let reference = reference.trim();
        if reference.starts_with("http://") || reference.starts_with("https://") {
            ImageSource::Url(reference.to_string())
        } else if reference.starts_with("data:") {
            ImageSource::Base64(SignatureImage::from_base64(reference))
        } else {
            ImageSource::Path(PathBuf::from(reference))
        }
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Url(url) => write!(f, "{}", url),
            ImageSource::Path(path) => write!(f, "{}", path.display()),
            ImageSource::Base64(_) => write!(f, "inline image"),
        }
    }
}

/// A decoded image ready for embedding.
#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    pub width: u32,
    pub height: u32,
    /// zlib-deflated 8-bit RGB samples.
    pub rgb: Vec<u8>,
    /// zlib-deflated 8-bit alpha samples, when any pixel is transparent.
    pub alpha: Option<Vec<u8>>,
}

impl EmbeddedImage {
    /// Decode PNG or JPEG bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AssetError> {
        let decoded = image::load_from_memory(bytes)?;
        let (width, height) = (decoded.width(), decoded.height());

        let alpha = if decoded.color().has_alpha() {
            let mask: Vec<u8> = decoded.to_rgba8().pixels().map(|p| p.0[3]).collect();
            if mask.iter().all(|&a| a == u8::MAX) {
                None
            } else {
                Some(compress_to_vec_zlib(&mask, DEFLATE_LEVEL))
            }
        } else {
            None
        };

        let rgb = compress_to_vec_zlib(decoded.to_rgb8().as_raw(), DEFLATE_LEVEL);

        Ok(Self {
            width,
            height,
            rgb,
            alpha,
        })
    }

    /// Pixel dimensions, used for aspect-ratio scaling.
    pub fn natural_size(&self) -> ImageSize {
        ImageSize::new(self.width as f32, self.height as f32)
    }
}

/// Images loaded for one document, keyed by the slot they fill.
#[derive(Debug, Clone, Default)]
pub struct ImageSet {
    images: HashMap<ImageSlot, EmbeddedImage>,
}

impl ImageSet {
    pub fn insert(&mut self, slot: ImageSlot, image: EmbeddedImage) {
        self.images.insert(slot, image);
    }

    pub fn get(&self, slot: ImageSlot) -> Option<&EmbeddedImage> {
        self.images.get(&slot)
    }

    pub fn size(&self, slot: ImageSlot) -> Option<ImageSize> {
        self.get(slot).map(EmbeddedImage::natural_size)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }
}

/// Fetches and decodes images.
#[derive(Debug, Clone)]
pub struct AssetLoader {
    client: reqwest::Client,
}

impl AssetLoader {
    /// Create a loader; `timeout_seconds == 0` disables the fetch timeout.
    pub fn new(timeout_seconds: u64) -> Result<Self, AssetError> {
        let mut builder = reqwest::Client::builder();
        if timeout_seconds > 0 {
            builder = builder.timeout(Duration::from_secs(timeout_seconds));
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Load and decode one image.
    pub async fn load(&self, source: &ImageSource) -> Result<EmbeddedImage, AssetError> {
        let bytes = match source {
            ImageSource::Url(url) => {
                let response = self.client.get(url).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(AssetError::Status {
                        url: url.clone(),
                        status: status.as_u16(),
                    });
                }
                response.bytes().await?.to_vec()
            }
            ImageSource::Path(path) => tokio::fs::read(path).await?,
            ImageSource::Base64(signature) => STANDARD.decode(signature.payload().trim())?,
        };

        EmbeddedImage::from_bytes(&bytes)
    }

    /// Load an image, logging and swallowing any failure.
    pub async fn load_optional(&self, source: Option<&ImageSource>) -> Option<EmbeddedImage> {
        let source = source?;
        match self.load(source).await {
            Ok(image) => {
                debug!("Loaded image {} ({}x{})", source, image.width, image.height);
                Some(image)
            }
            Err(e) => {
                warn!("Skipping image {}: {}", source, e);
                None
            }
        }
    }

    /// Load every requested image concurrently; failed slots stay empty.
    pub async fn load_many(&self, requests: &[(ImageSlot, ImageSource)]) -> ImageSet {
        let loads = requests.iter().map(|(slot, source)| async move {
            (*slot, self.load_optional(Some(source)).await)
        });

        let mut set = ImageSet::default();
        for (slot, image) in join_all(loads).await {
            if let Some(image) = image {
                set.insert(slot, image);
            }
        }
        set
    }
}
