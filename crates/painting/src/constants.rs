/// Edge length of a canvas tile in world pixels.
pub const TILE_SIZE: u32 = 256;

/// Dab radius at full pressure, in world pixels.
pub const BASE_RADIUS: f32 = 6.0;

/// Pressure curve exponent. Values below 1 soften the falloff for light pressure.
pub const PRESSURE_GAMMA: f32 = 0.6;

/// Dab spacing as a fraction of the dab diameter.
pub const SPACING_FRACTION: f32 = 0.1;

/// Lower bound on dab spacing in world pixels.
pub const MIN_STEP: f32 = 0.5;

/// Largest fraction the step shrinks by when the stroke doubles back on itself.
pub const MAX_CURVATURE_SHRINK: f32 = 0.6;

/// Smallest weight a dab may carry. Keeps radius and weight strictly positive.
pub const MIN_WEIGHT: f32 = 1.0 / 256.0;

/// Per-dab opacity multiplier for local echo, so overlapping dabs build up.
pub const FLOW: f32 = 0.35;

/// Default brush tip hardness.
pub const DEFAULT_HARDNESS: f32 = 0.7;

/// Movement below this distance is treated as no movement.
pub const MIN_SEGMENT_LENGTH: f32 = 1e-4;

/// Largest on-screen tip radius the echo layer will rasterize. Bigger dabs are skipped.
pub const MAX_TIP_RADIUS: u32 = 512;
