//! World <-> screen mapping

use serde::{Deserialize, Serialize};

use crate::types::Point;

/// Pan/zoom state. Screen = (world - origin) * scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub origin_x: f32,
    pub origin_y: f32,
    /// Always > 0
    pub scale: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            origin_x: 0.0,
            origin_y: 0.0,
            scale: 1.0,
        }
    }
}

impl ViewTransform {
    /// Create a view. Non-positive or non-finite scales fall back to 1.0.
    pub fn new(origin_x: f32, origin_y: f32, scale: f32) -> Self {
        let scale = if scale.is_finite() && scale > 0.0 {
            scale
        } else {
            1.0
        };
        Self {
            origin_x,
            origin_y,
            scale,
        }
    }

    #[inline]
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point::new(
            (world.x - self.origin_x) * self.scale,
            (world.y - self.origin_y) * self.scale,
        )
    }

    #[inline]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point::new(
            screen.x / self.scale + self.origin_x,
            screen.y / self.scale + self.origin_y,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let view = ViewTransform::default();
        let p = Point::new(12.0, -3.0);
        assert_eq!(view.world_to_screen(p), p);
    }

    #[test]
    fn test_inverse() {
        let view = ViewTransform::new(100.0, -50.0, 2.5);
        let p = Point::new(7.0, 9.0);
        let back = view.screen_to_world(view.world_to_screen(p));
        assert!((back.x - p.x).abs() < 1e-4);
        assert!((back.y - p.y).abs() < 1e-4);
        assert_eq!(view.world_to_screen(Point::new(100.0, -50.0)), Point::new(0.0, 0.0));
    }

    #[test]
    fn test_invalid_scale() {
        assert_eq!(ViewTransform::new(0.0, 0.0, 0.0).scale, 1.0);
        assert_eq!(ViewTransform::new(0.0, 0.0, f32::NAN).scale, 1.0);
    }
}
