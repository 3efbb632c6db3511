//! Decoded image raster handed to the hasher and the detector.
use crate::error::VisionError;
use image::{imageops, GrayImage, RgbImage};

/// 8-bit luminance raster.
///
/// Decoding JPEG/PNG is the transport's job; everything here works on
/// already-decoded pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFrame {
    luma: GrayImage,
}

impl ImageFrame {
    pub fn from_gray(luma: GrayImage) -> Result<Self, VisionError> {
        check_dimensions(luma.width(), luma.height())?;
        Ok(Self { luma })
    }

    /// Row-major luma bytes, exactly `width * height` long.
    pub fn from_luma(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, VisionError> {
        check_buffer("luma", width, height, 1, pixels.len())?;
        GrayImage::from_raw(width, height, pixels)
            .map(|luma| Self { luma })
            .ok_or_else(|| VisionError::InvalidImage(format!("{}x{} luma buffer rejected", width, height)))
    }

    pub fn from_rgb(rgb: &RgbImage) -> Result<Self, VisionError> {
        check_dimensions(rgb.width(), rgb.height())?;
        Ok(Self {
            luma: imageops::grayscale(rgb),
        })
    }

    /// Interleaved RGB8 bytes, converted to luma.
    pub fn from_rgb8(width: u32, height: u32, rgb: &[u8]) -> Result<Self, VisionError> {
        check_buffer("rgb", width, height, 3, rgb.len())?;
        let image = RgbImage::from_raw(width, height, rgb.to_vec())
            .ok_or_else(|| VisionError::InvalidImage(format!("{}x{} rgb buffer rejected", width, height)))?;
        Self::from_rgb(&image)
    }

    pub fn width(&self) -> u32 {
        self.luma.width()
    }

    pub fn height(&self) -> u32 {
        self.luma.height()
    }

    pub fn pixels(&self) -> &[u8] {
        self.luma.as_raw()
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.luma
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<(), VisionError> {
    if width == 0 || height == 0 {
        return Err(VisionError::InvalidImage(format!(
            "image must not be empty, got {}x{}",
            width, height
        )));
    }
    Ok(())
}

fn check_buffer(kind: &str, width: u32, height: u32, channels: usize, len: usize) -> Result<(), VisionError> {
    check_dimensions(width, height)?;
    let expected = width as usize * height as usize * channels;
    if len != expected {
        return Err(VisionError::InvalidImage(format!(
            "expected {} {} bytes for {}x{}, got {}",
            expected, kind, width, height, len
        )));
    }
    Ok(())
}
