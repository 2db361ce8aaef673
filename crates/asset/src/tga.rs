//! Uncompressed 32-bit true-color TGA codec.
//!
//! Layout handled here (all multi-byte fields little-endian):
//!
//! ```text
//! 0  id_length       u8
//! 1  color_map_type  u8
//! 2  image_type      u8   (2 = uncompressed true color)
//! 3  cm_first_entry  u16
//! 5  cm_length       u16
//! 7  cm_entry_size   u8
//! 8  origin_x        u16
//! 10 origin_y        u16
//! 12 width           u16
//! 14 height          u16
//! 16 bpp             u8   (must be 32)
//! 17 alpha           u8   (bits 0-3 depth, bits 4-5 direction)
//! 18 [id block][color map block][width * height pixels, B G R A]
//! ```
//!
//! [`Image::decode`] and [`Image::encode`] work on byte slices only; [`Image::read`]
//! and [`Image::write`] are the file wrappers.

use std::{fs, path::Path};

use bytemuck::{Pod, Zeroable};
use corelib::{FormatError, FormatResult};

/// Image type byte at offset 2.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageType {
    NoImageData = 0,
    UncompressedColorMapped = 1,
    UncompressedTrueColor = 2,
    UncompressedGrayscale = 3,
    RleColorMapped = 9,
    RleTrueColor = 10,
    RleGrayscale = 11,
}

impl ImageType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0 => Self::NoImageData,
            1 => Self::UncompressedColorMapped,
            2 => Self::UncompressedTrueColor,
            3 => Self::UncompressedGrayscale,
            9 => Self::RleColorMapped,
            10 => Self::RleTrueColor,
            11 => Self::RleGrayscale,
            _ => return None,
        })
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ColorMapSpec {
    pub first_entry: u16,
    pub length: u16,
    pub entry_size: u8,
}

/// Alpha channel description packed into header byte 17 as `0bxxDDAAAA`
/// (`A` depth, `D` direction, `x` unused).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlphaSpec {
    pub depth: u8,
    pub dir: u8,
}

impl AlphaSpec {
    const DEPTH_MASK: u8 = 0x0F;
    const DIR_MASK: u8 = 0x03;
    const DIR_SHIFT: u8 = 4;

    pub fn pack(self) -> u8 {
        (self.depth & Self::DEPTH_MASK) | ((self.dir & Self::DIR_MASK) << Self::DIR_SHIFT)
    }

    pub fn unpack(byte: u8) -> Self {
        Self {
            depth: byte & Self::DEPTH_MASK,
            dir: (byte >> Self::DIR_SHIFT) & Self::DIR_MASK,
        }
    }
}

impl Default for AlphaSpec {
    fn default() -> Self {
        Self { depth: 8, dir: 0 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageSpec {
    pub origin_x: u16,
    pub origin_y: u16,
    pub width: u16,
    pub height: u16,
    pub bpp: u8,
    pub alpha: AlphaSpec,
}

impl Default for ImageSpec {
    fn default() -> Self {
        Self {
            origin_x: 0,
            origin_y: 0,
            width: 0,
            height: 0,
            bpp: 32,
            alpha: AlphaSpec::default(),
        }
    }
}

/// Fixed 18-byte TGA header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub id_length: u8,
    pub color_map_type: u8,
    /// Raw type byte; see [`Header::kind`].
    pub image_type: u8,
    pub color_map: ColorMapSpec,
    pub image_spec: ImageSpec,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            id_length: 0,
            color_map_type: 0,
            image_type: ImageType::UncompressedTrueColor.as_byte(),
            color_map: ColorMapSpec::default(),
            image_spec: ImageSpec::default(),
        }
    }
}

impl Header {
    pub const SIZE: usize = 18;

    /// Default true-color header describing a `width` x `height` image.
    pub fn for_dimensions(width: u16, height: u16) -> Self {
        let mut header = Self::default();
        header.image_spec.width = width;
        header.image_spec.height = height;
        header
    }

    /// Parse the header from the first 18 bytes of `bytes`.
    pub fn parse(bytes: &[u8]) -> FormatResult<Self> {
        let raw: &[u8; Self::SIZE] = bytes
            .get(..Self::SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or(FormatError::TruncatedHeader {
                available: bytes.len(),
            })?;

        Ok(Self {
            id_length: raw[0],
            color_map_type: raw[1],
            image_type: raw[2],
            color_map: ColorMapSpec {
                first_entry: read_u16(raw, 3),
                length: read_u16(raw, 5),
                entry_size: raw[7],
            },
            image_spec: ImageSpec {
                origin_x: read_u16(raw, 8),
                origin_y: read_u16(raw, 10),
                width: read_u16(raw, 12),
                height: read_u16(raw, 14),
                bpp: raw[16],
                alpha: AlphaSpec::unpack(raw[17]),
            },
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut raw = [0u8; Self::SIZE];
        raw[0] = self.id_length;
        raw[1] = self.color_map_type;
        raw[2] = self.image_type;
        write_u16(&mut raw, 3, self.color_map.first_entry);
        write_u16(&mut raw, 5, self.color_map.length);
        raw[7] = self.color_map.entry_size;
        write_u16(&mut raw, 8, self.image_spec.origin_x);
        write_u16(&mut raw, 10, self.image_spec.origin_y);
        write_u16(&mut raw, 12, self.image_spec.width);
        write_u16(&mut raw, 14, self.image_spec.height);
        raw[16] = self.image_spec.bpp;
        raw[17] = self.image_spec.alpha.pack();
        raw
    }

    pub fn kind(&self) -> Option<ImageType> {
        ImageType::from_byte(self.image_type)
    }

    pub fn pixel_count(&self) -> usize {
        self.image_spec.width as usize * self.image_spec.height as usize
    }

    fn check_supported(&self) -> FormatResult<()> {
        if self.kind() != Some(ImageType::UncompressedTrueColor) {
            return Err(FormatError::UnsupportedFormat {
                reason: format!(
                    "image type {} (only uncompressed true color is supported)",
                    self.image_type
                ),
            });
        }
        if self.image_spec.bpp != 32 {
            return Err(FormatError::UnsupportedFormat {
                reason: format!(
                    "{} bits per pixel (only 32-bit images are supported)",
                    self.image_spec.bpp
                ),
            });
        }
        Ok(())
    }
}

fn read_u16(raw: &[u8; Header::SIZE], at: usize) -> u16 {
    u16::from_le_bytes([raw[at], raw[at + 1]])
}

fn write_u16(raw: &mut [u8; Header::SIZE], at: usize, value: u16) {
    raw[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

/// One pixel in the format's native B, G, R, A byte order.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Pixel {
    pub b: u8,
    pub g: u8,
    pub r: u8,
    pub a: u8,
}

impl Pixel {
    pub const SIZE: usize = 4;
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Opaque pixel from red, green, blue.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { b, g, r, a }
    }
}

impl Default for Pixel {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Decoded image: header plus a row-major pixel buffer without stride padding.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Image {
    header: Header,
    /// Image ID block, `header.id_length` bytes.
    image_id: Vec<u8>,
    /// Color map block, kept opaque and written back unchanged.
    color_map_data: Vec<u8>,
    pixels: Vec<Pixel>,
}

impl Image {
    /// Empty 0x0 image with the default header.
    pub fn new() -> Self {
        Self::default()
    }

    /// `width` x `height` image where every pixel is `fill`.
    pub fn with_fill(width: u16, height: u16, fill: Pixel) -> Self {
        let header = Header::for_dimensions(width, height);
        Self {
            pixels: vec![fill; header.pixel_count()],
            header,
            ..Self::default()
        }
    }

    /// Decode a complete TGA byte stream. Either the whole image is returned or
    /// an error; trailing bytes after the pixel block are ignored.
    pub fn decode(bytes: &[u8]) -> FormatResult<Self> {
        let header = Header::parse(bytes)?;

        let mut offset = Header::SIZE;
        let image_id = take(bytes, offset, header.id_length as usize)?.to_vec();
        offset += image_id.len();
        let color_map_data = take(bytes, offset, header.color_map.length as usize)?.to_vec();
        offset += color_map_data.len();

        header.check_supported()?;

        let body = take(bytes, offset, header.pixel_count() * Pixel::SIZE)?;
        let pixels: Vec<Pixel> = bytemuck::cast_slice(body).to_vec();

        log::debug!(
            "Decoded TGA {}x{} ({} pixels)",
            header.image_spec.width,
            header.image_spec.height,
            pixels.len()
        );

        Ok(Self {
            header,
            image_id,
            color_map_data,
            pixels,
        })
    }

    /// Serialize to header bytes, the ID and color map blocks carried over from
    /// decoding (empty for images built in memory), then the raw pixel buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            Header::SIZE
                + self.image_id.len()
                + self.color_map_data.len()
                + self.pixels.len() * Pixel::SIZE,
        );
        out.extend_from_slice(&self.header.to_bytes());
        out.extend_from_slice(&self.image_id);
        out.extend_from_slice(&self.color_map_data);
        out.extend_from_slice(self.as_bytes());
        out
    }

    /// Read and decode a TGA file.
    pub fn read(path: impl AsRef<Path>) -> FormatResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| FormatError::io(path, e))?;
        Self::decode(&bytes)
    }

    /// Encode and write to `path`, replacing any existing file.
    pub fn write(&self, path: impl AsRef<Path>) -> FormatResult<()> {
        let path = path.as_ref();
        fs::write(path, self.encode()).map_err(|e| FormatError::io(path, e))
    }

    /// Drop all pixels and restore the default header.
    pub fn reset(&mut self) {
        self.pixels.clear();
        self.image_id.clear();
        self.color_map_data.clear();
        self.header = Header::default();
    }

    pub fn width(&self) -> u16 {
        self.header.image_spec.width
    }

    pub fn height(&self) -> u16 {
        self.header.image_spec.height
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn image_id(&self) -> &[u8] {
        &self.image_id
    }

    pub fn color_map_data(&self) -> &[u8] {
        &self.color_map_data
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    /// Pixel buffer as raw B, G, R, A bytes.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Buffer offset of `(x, y)`, or `None` outside the image.
    pub fn offset(&self, x: u16, y: u16) -> Option<usize> {
        if x < self.width() && y < self.height() {
            Some(y as usize * self.width() as usize + x as usize)
        } else {
            None
        }
    }

    pub fn pixel(&self, x: u16, y: u16) -> FormatResult<Pixel> {
        let offset = self.checked_offset(x, y)?;
        Ok(self.pixels[offset])
    }

    pub fn set_pixel(&mut self, x: u16, y: u16, pixel: Pixel) -> FormatResult<()> {
        let offset = self.checked_offset(x, y)?;
        self.pixels[offset] = pixel;
        Ok(())
    }

    pub fn set_rgb(&mut self, x: u16, y: u16, r: u8, g: u8, b: u8) -> FormatResult<()> {
        self.set_pixel(x, y, Pixel::rgb(r, g, b))
    }

    pub fn set_rgba(&mut self, x: u16, y: u16, r: u8, g: u8, b: u8, a: u8) -> FormatResult<()> {
        self.set_pixel(x, y, Pixel::rgba(r, g, b, a))
    }

    /// Paint a rectangle, clipped to the image.
    pub fn fill_rect(&mut self, x: u16, y: u16, w: u16, h: u16, pixel: Pixel) {
        let x_end = x.saturating_add(w).min(self.width());
        let y_end = y.saturating_add(h).min(self.height());
        if x >= x_end {
            return;
        }
        let stride = self.width() as usize;
        for row in y..y_end {
            let start = row as usize * stride;
            self.pixels[start + x as usize..start + x_end as usize].fill(pixel);
        }
    }

    fn checked_offset(&self, x: u16, y: u16) -> FormatResult<usize> {
        self.offset(x, y).ok_or(FormatError::IndexOutOfBounds {
            x: x.into(),
            y: y.into(),
            width: self.width().into(),
            height: self.height().into(),
        })
    }
}

fn take(bytes: &[u8], offset: usize, len: usize) -> FormatResult<&[u8]> {
    bytes
        .get(offset..offset + len)
        .ok_or(FormatError::TruncatedBody {
            offset,
            needed: len,
            available: bytes.len().saturating_sub(offset),
        })
}
