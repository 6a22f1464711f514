//! Texture loading and data structures.
//! Images decode to RGBA8 and are flipped so row 0 is the bottom row,
//! matching OBJ texture coordinates.

use std::path::Path;

use crate::error::{ImportError, ImportResult};

/// Texture data in CPU-friendly format before GPU upload.
#[derive(Clone, Debug)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl TextureData {
    pub const BYTES_PER_PIXEL: u32 = 4;

    /// Wrap raw RGBA8 pixels. Returns `None` if the size doesn't match.
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        let expected = width as usize * height as usize * Self::BYTES_PER_PIXEL as usize;
        (data.len() == expected).then_some(Self {
            data,
            width,
            height,
        })
    }

    /// Single opaque white pixel, bound for untextured draws.
    pub fn white() -> Self {
        Self {
            data: vec![255; 4],
            width: 1,
            height: 1,
        }
    }

    /// Load a PNG or JPEG texture from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> ImportResult<Self> {
        let path = path.as_ref();
        log::info!("Loading texture from {:?}", path);

        let img = image::open(path).map_err(|source| match source {
            image::ImageError::IoError(e) => ImportError::io(path.display().to_string(), e),
            source => ImportError::Texture {
                path: path.to_path_buf(),
                source,
            },
        })?;

        Ok(Self::from_image(img))
    }

    /// Decode an in-memory PNG or JPEG.
    pub fn decode(bytes: &[u8]) -> ImportResult<Self> {
        let img = image::load_from_memory(bytes).map_err(|source| ImportError::Texture {
            path: "<memory>".into(),
            source,
        })?;
        Ok(Self::from_image(img))
    }

    fn from_image(img: image::DynamicImage) -> Self {
        let rgba = img.flipv().to_rgba8();
        let (width, height) = rgba.dimensions();
        let data = rgba.into_raw();

        log::debug!("Decoded texture {}x{} with {} bytes", width, height, data.len());

        Self {
            data,
            width,
            height,
        }
    }

    /// Bytes per row of pixels.
    pub fn row_bytes(&self) -> u32 {
        self.width * Self::BYTES_PER_PIXEL
    }

    /// Check if the texture data is valid.
    pub fn is_valid(&self) -> bool {
        let expected_size = (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|pixels| pixels.checked_mul(Self::BYTES_PER_PIXEL as usize));
        expected_size == Some(self.data.len()) && self.width > 0 && self.height > 0
    }
}
