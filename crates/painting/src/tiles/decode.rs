//! Raster decode for incoming tile patches

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use image::{ImageFormat, RgbaImage};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TileError {
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Undecodable raster (png: {primary}; fallback: {fallback})")]
    Decode {
        primary: image::ImageError,
        fallback: image::ImageError,
    },
}

/// Decode raster bytes. PNG first, then any format the decoder can sniff.
pub fn decode_tile_bytes(bytes: &[u8]) -> Result<RgbaImage, TileError> {
    match image::load_from_memory_with_format(bytes, ImageFormat::Png) {
        Ok(img) => Ok(img.to_rgba8()),
        Err(primary) => match image::load_from_memory(bytes) {
            Ok(img) => Ok(img.to_rgba8()),
            Err(fallback) => Err(TileError::Decode { primary, fallback }),
        },
    }
}

/// Decode the `png_base64` field of a tile patch
pub fn decode_tile_base64(encoded: &str) -> Result<RgbaImage, TileError> {
    let bytes = B64.decode(encoded)?;
    decode_tile_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode(img: &RgbaImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        bytes
    }

    #[test]
    fn test_decode_png() {
        let img = RgbaImage::from_pixel(4, 4, image::Rgba([1, 2, 3, 255]));
        let decoded = decode_tile_bytes(&encode(&img, ImageFormat::Png)).unwrap();
        assert_eq!(decoded, img);
    }

    #[test]
    fn test_decode_falls_back_to_sniffing() {
        let img = RgbaImage::from_pixel(4, 4, image::Rgba([9, 8, 7, 255]));
        let decoded = decode_tile_bytes(&encode(&img, ImageFormat::Bmp)).unwrap();
        assert_eq!(decoded.get_pixel(2, 2).0, [9, 8, 7, 255]);
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            decode_tile_bytes(&[0, 1, 2, 3]),
            Err(TileError::Decode { .. })
        ));
    }

    #[test]
    fn test_decode_base64() {
        let img = RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 0, 255]));
        let encoded = B64.encode(encode(&img, ImageFormat::Png));
        assert_eq!(decode_tile_base64(&encoded).unwrap(), img);
        assert!(matches!(
            decode_tile_base64("***"),
            Err(TileError::Base64(_))
        ));
    }
}
