//! CPU raster surface shared by the echo layer and the mosaic compositor

use crate::types::ToolMode;

/// Straight-alpha RGBA color with f32 channels
pub type Rgba = [f32; 4];

/// Fully transparent pixel
pub const TRANSPARENT: Rgba = [0.0, 0.0, 0.0, 0.0];

/// An RGBA float surface addressed in screen pixels
#[derive(Debug, Clone)]
pub struct CpuSurface {
    pub width: u32,
    pub height: u32,
    /// Row-major pixel data
    pixels: Vec<Rgba>,
}

impl CpuSurface {
    /// Create a transparent surface
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![TRANSPARENT; (width as usize) * (height as usize)],
        }
    }

    /// Reallocate at a new size. Contents are discarded.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels
            .resize((width as usize) * (height as usize), TRANSPARENT);
    }

    pub fn clear(&mut self, color: Rgba) {
        self.pixels.fill(color);
    }

    #[inline]
    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some((y as usize) * (self.width as usize) + (x as usize))
    }

    #[inline]
    pub fn get_pixel(&self, x: i64, y: i64) -> Option<Rgba> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    #[inline]
    pub fn set_pixel(&mut self, x: i64, y: i64, color: Rgba) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color;
        }
    }

    /// Combine `color` at `alpha` into one pixel using the tool's composite rule
    #[inline]
    pub fn composite_pixel(&mut self, x: i64, y: i64, color: Rgba, alpha: f32, mode: ToolMode) {
        let Some(i) = self.index(x, y) else {
            return;
        };
        let dst = self.pixels[i];
        self.pixels[i] = match mode {
            ToolMode::Normal => source_over(color, alpha, dst),
            ToolMode::Erase => destination_out(alpha, dst),
        };
    }

    /// Whether every pixel is fully transparent
    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|p| p[3] <= 0.0)
    }

    /// Raw bytes for upload to a presenter
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    #[inline]
    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    /// Quantize to an 8-bit image
    pub fn to_rgba8(&self) -> image::RgbaImage {
        let mut out = image::RgbaImage::new(self.width, self.height);
        for (dst, src) in out.pixels_mut().zip(self.pixels.iter()) {
            dst.0 = src.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
        }
        out
    }
}

/// Straight-alpha source-over
#[inline]
fn source_over(src: Rgba, alpha: f32, dst: Rgba) -> Rgba {
    let sa = (src[3] * alpha).clamp(0.0, 1.0);
    let da = dst[3] * (1.0 - sa);
    let out_a = sa + da;
    if out_a <= 0.0 {
        return TRANSPARENT;
    }
    [
        (src[0] * sa + dst[0] * da) / out_a,
        (src[1] * sa + dst[1] * da) / out_a,
        (src[2] * sa + dst[2] * da) / out_a,
        out_a,
    ]
}

/// Destination-out: remove coverage, keep color
#[inline]
fn destination_out(alpha: f32, dst: Rgba) -> Rgba {
    let remaining = (1.0 - alpha.clamp(0.0, 1.0)).max(0.0);
    [dst[0], dst[1], dst[2], dst[3] * remaining]
}
