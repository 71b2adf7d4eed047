use serde::{Deserialize, Serialize};

use crate::constants::MIN_WEIGHT;

/// How a dab combines with the pixels under it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum ToolMode {
    /// Source-over paint
    #[default]
    Normal = 0,
    /// Destination-out erase
    Erase = 1,
}

impl ToolMode {
    /// Map a wire value to a tool mode. Anything other than 1 paints normally.
    pub fn from_wire(value: i64) -> Self {
        match value {
            1 => Self::Erase,
            _ => Self::Normal,
        }
    }

    /// Value sent in the `tool` field of a `dabs` message
    pub fn to_wire(self) -> u8 {
        self as u8
    }
}

/// A point in world or screen space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    #[inline]
    pub fn distance(self, other: Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Linear interpolation towards `other` by factor `t`
    #[inline]
    pub fn lerp(self, other: Point, t: f32) -> Point {
        Point {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

/// A single circular paint application in world space
///
/// Laid out as four consecutive `f32` so a slice of dabs casts directly
/// to the flat `[x, y, radius, weight, ...]` array used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Dab {
    /// World-space x
    pub x: f32,
    /// World-space y
    pub y: f32,
    /// Radius in world pixels, always > 0
    pub radius: f32,
    /// Pressure or fixed alpha in (0, 1]
    pub weight: f32,
}

impl Dab {
    /// Create a dab, clamping radius and weight into their valid ranges.
    pub fn new(x: f32, y: f32, radius: f32, weight: f32) -> Self {
        let weight = if weight.is_finite() {
            weight.clamp(MIN_WEIGHT, 1.0)
        } else {
            1.0
        };
        let radius = if radius.is_finite() && radius > 0.0 {
            radius
        } else {
            f32::MIN_POSITIVE
        };
        Self {
            x,
            y,
            radius,
            weight,
        }
    }

    /// Position of the dab centre
    #[inline]
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Reinterpret dabs as the flat wire array.
pub fn dabs_as_floats(dabs: &[Dab]) -> &[f32] {
    bytemuck::cast_slice(dabs)
}

/// Rebuild dabs from a flat wire array.
///
/// Returns `None` if the array length is not a multiple of four.
/// Radius and weight are re-clamped since remote input is untrusted.
pub fn dabs_from_floats(floats: &[f32]) -> Option<Vec<Dab>> {
    if floats.len() % 4 != 0 {
        return None;
    }
    Some(
        floats
            .chunks_exact(4)
            .map(|c| Dab::new(c[0], c[1], c[2], c[3]))
            .collect(),
    )
}
