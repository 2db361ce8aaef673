//! Texture data ready for upload, plus conversions between TGA and PNG.
//! TGA pixels are stored B,G,R,A; textures here are always R,G,B,A.

use std::path::Path;

use anyhow::Context;

use crate::tga::{Image, Pixel};

/// Texture data in CPU-friendly format before GPU upload.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

/// Supported texture formats.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TextureFormat {
    Rgba8,
}

impl TextureData {
    /// Create a new texture with given dimensions and RGBA8 format.
    pub fn new_rgba8(width: u32, height: u32, data: Vec<u8>) -> anyhow::Result<Self> {
        let expected = rgba8_len(width, height)
            .with_context(|| format!("Texture size {}x{} overflows", width, height))?;
        if data.len() != expected {
            anyhow::bail!(
                "Data size {} doesn't match RGBA8 {}x{} (expected {})",
                data.len(),
                width,
                height,
                expected
            );
        }
        Ok(Self {
            data,
            width,
            height,
            format: TextureFormat::Rgba8,
        })
    }

    /// Swizzle a decoded TGA into RGBA8.
    pub fn from_tga(image: &Image) -> Self {
        let data = image
            .pixels()
            .iter()
            .flat_map(|p| [p.r, p.g, p.b, p.a])
            .collect();
        Self {
            data,
            width: image.width().into(),
            height: image.height().into(),
            format: TextureFormat::Rgba8,
        }
    }

    /// Convert back into a TGA image. Both dimensions must fit in 16 bits.
    pub fn to_tga(&self) -> anyhow::Result<Image> {
        let width = u16::try_from(self.width)
            .with_context(|| format!("Texture width {} too large for TGA", self.width))?;
        let height = u16::try_from(self.height)
            .with_context(|| format!("Texture height {} too large for TGA", self.height))?;
        let expected = width as usize * height as usize * 4;
        if self.data.len() != expected {
            anyhow::bail!(
                "Texture data is {} bytes, expected {} for {}x{}",
                self.data.len(),
                expected,
                width,
                height
            );
        }

        let mut image = Image::with_fill(width, height, Pixel::BLACK);
        for (i, rgba) in self.data.chunks_exact(4).enumerate() {
            let x = (i % self.width as usize) as u16;
            let y = (i / self.width as usize) as u16;
            image.set_pixel(x, y, Pixel::rgba(rgba[0], rgba[1], rgba[2], rgba[3]))?;
        }
        Ok(image)
    }

    /// Load texture from a 32-bit TGA file.
    pub fn load_tga<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        log::info!("Loading texture from {:?}", path);

        let image = Image::read(path)
            .with_context(|| format!("Failed to load TGA texture {:?}", path))?;
        let texture = Self::from_tga(&image);

        log::info!(
            "Loaded texture {}x{} with {} bytes",
            texture.width,
            texture.height,
            texture.data.len()
        );
        Ok(texture)
    }

    /// Load texture from PNG file.
    pub fn load_png<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        log::info!("Loading texture from {:?}", path);

        let img = image::open(path)
            .map_err(|e| anyhow::anyhow!("Failed to open image {:?}: {}", path, e))?;

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let data = rgba.into_raw();

        log::info!("Loaded texture {}x{} with {} bytes", width, height, data.len());

        Self::new_rgba8(width, height, data)
    }

    /// Write the texture as PNG.
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        image::save_buffer(
            path,
            &self.data,
            self.width,
            self.height,
            image::ColorType::Rgba8,
        )
        .with_context(|| format!("Failed to write PNG {:?}", path))?;
        log::info!("Wrote {}x{} PNG to {:?}", self.width, self.height, path);
        Ok(())
    }

    /// Get the number of bytes per pixel for the format.
    pub fn bytes_per_pixel(&self) -> u32 {
        match self.format {
            TextureFormat::Rgba8 => 4,
        }
    }

    /// Check if the texture data is valid.
    pub fn is_valid(&self) -> bool {
        rgba8_len(self.width, self.height) == Some(self.data.len())
            && self.width > 0
            && self.height > 0
    }
}

fn rgba8_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(4)
}
