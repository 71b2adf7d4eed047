//! Stroke sampler for dab generation
//!
//! Turns raw pointer samples into evenly spaced dabs. Spacing follows the
//! dab size, tightens on sharp turns, and carries leftover distance across
//! input segments so bursty input still produces a smooth line.

use std::f32::consts::PI;

use tracing::debug;

use crate::constants::{
    BASE_RADIUS, MAX_CURVATURE_SHRINK, MIN_SEGMENT_LENGTH, MIN_STEP, MIN_WEIGHT, PRESSURE_GAMMA,
    SPACING_FRACTION,
};
use crate::types::{Dab, Point};

/// Sampler tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerParams {
    /// Radius at pressure 1.0
    pub base_radius: f32,
    /// Pressure curve exponent
    pub gamma: f32,
    /// Spacing as fraction of diameter (e.g., 0.1 = 10% of diameter)
    pub spacing_fraction: f32,
    /// Smallest allowed step
    pub min_step: f32,
    /// Maximum step reduction at a full reversal (0.6 = 60%)
    pub max_curvature_shrink: f32,
}

impl Default for SamplerParams {
    fn default() -> Self {
        Self {
            base_radius: BASE_RADIUS,
            gamma: PRESSURE_GAMMA,
            spacing_fraction: SPACING_FRACTION,
            min_step: MIN_STEP,
            max_curvature_shrink: MAX_CURVATURE_SHRINK,
        }
    }
}

impl SamplerParams {
    /// Dab radius for a pressure value
    pub fn radius_for_pressure(&self, pressure: f32) -> f32 {
        self.base_radius * clamp_pressure(pressure).powf(self.gamma)
    }

    /// Straight-line spacing for a pressure value
    pub fn base_step(&self, pressure: f32) -> f32 {
        let radius = self.radius_for_pressure(pressure);
        (self.spacing_fraction * 2.0 * radius).max(self.min_step)
    }

    /// Shrink a step by the turn angle between two segment vectors.
    ///
    /// No turn keeps the step, a full reversal shrinks it by `max_curvature_shrink`.
    pub fn curvature_step(&self, step: f32, incoming: Point, outgoing: Point) -> f32 {
        let len_in = (incoming.x * incoming.x + incoming.y * incoming.y).sqrt();
        let len_out = (outgoing.x * outgoing.x + outgoing.y * outgoing.y).sqrt();
        if len_in < MIN_SEGMENT_LENGTH || len_out < MIN_SEGMENT_LENGTH {
            return step;
        }
        let cos = ((incoming.x * outgoing.x + incoming.y * outgoing.y) / (len_in * len_out))
            .clamp(-1.0, 1.0);
        let angle = cos.acos();
        step * (1.0 - self.max_curvature_shrink.clamp(0.0, 0.9) * (angle / PI))
    }
}

/// Per-stroke sampler state, reset on pointer down and pointer up
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StrokeState {
    pub previous: Option<Point>,
    pub second_previous: Option<Point>,
    /// Distance travelled since the last emitted dab
    pub carry: f32,
    previous_pressure: f32,
}

/// Generates dabs from pointer input
#[derive(Debug, Clone, Default)]
pub struct StrokeSampler {
    params: SamplerParams,
    state: StrokeState,
}

impl StrokeSampler {
    /// Create a sampler with the given parameters
    pub fn new(params: SamplerParams) -> Self {
        Self {
            params,
            state: StrokeState::default(),
        }
    }

    pub fn params(&self) -> &SamplerParams {
        &self.params
    }

    pub fn set_params(&mut self, params: SamplerParams) {
        self.params = params;
    }

    pub fn state(&self) -> &StrokeState {
        &self.state
    }

    /// Whether a stroke is in progress
    pub fn is_active(&self) -> bool {
        self.state.previous.is_some()
    }

    /// Start a stroke. Always emits exactly one dab at `point`.
    pub fn begin(&mut self, point: Point, pressure: f32) -> Dab {
        let pressure = clamp_pressure(pressure);
        self.state = StrokeState {
            previous: Some(point),
            second_previous: None,
            carry: 0.0,
            previous_pressure: pressure,
        };
        let dab = self.dab_at(point, pressure);
        debug!(
            "StrokeSampler::begin: first dab at ({:.1}, {:.1}), radius={:.2}",
            dab.x, dab.y, dab.radius
        );
        dab
    }

    /// Continue the stroke to `point`, emitting dabs along the segment
    pub fn extend(&mut self, point: Point, pressure: f32) -> Vec<Dab> {
        let mut dabs = Vec::new();
        self.extend_into(point, pressure, &mut dabs);
        dabs
    }

    /// Run coalesced samples through `extend` in arrival order
    pub fn extend_all(&mut self, samples: impl IntoIterator<Item = (Point, f32)>) -> Vec<Dab> {
        let mut dabs = Vec::new();
        for (point, pressure) in samples {
            self.extend_into(point, pressure, &mut dabs);
        }
        dabs
    }

    fn extend_into(&mut self, point: Point, pressure: f32, out: &mut Vec<Dab>) {
        let Some(last) = self.state.previous else {
            debug!("StrokeSampler::extend: no active stroke, ignoring");
            return;
        };

        let length = last.distance(point);
        if length < MIN_SEGMENT_LENGTH {
            return;
        }

        let pressure = clamp_pressure(pressure);
        let mut step = self.params.base_step(pressure);
        if let Some(before) = self.state.second_previous {
            let incoming = Point::new(last.x - before.x, last.y - before.y);
            let outgoing = Point::new(point.x - last.x, point.y - last.y);
            step = self.params.curvature_step(step, incoming, outgoing);
        }
        // Degenerate params must not stall the walk
        let step = step.max(MIN_SEGMENT_LENGTH);

        let start_pressure = self.state.previous_pressure;
        let emitted_before = out.len();
        let mut offset = (step - self.state.carry).max(0.0);
        let mut last_offset = None;

        while offset <= length {
            let t = offset / length;
            let dab_pressure = start_pressure + (pressure - start_pressure) * t;
            out.push(self.dab_at(last.lerp(point, t), dab_pressure));
            last_offset = Some(offset);
            offset += step;
        }

        self.state.carry = match last_offset {
            Some(at) => length - at,
            None => self.state.carry + length,
        };
        self.state.second_previous = Some(last);
        self.state.previous = Some(point);
        self.state.previous_pressure = pressure;

        let emitted = out.len() - emitted_before;
        if emitted > 0 {
            debug!(
                "StrokeSampler::extend: {} dabs from ({:.1}, {:.1}) to ({:.1}, {:.1}), step={:.2}",
                emitted, last.x, last.y, point.x, point.y, step
            );
        }
    }

    /// End the stroke without emitting
    pub fn end(&mut self) {
        self.state = StrokeState::default();
    }

    fn dab_at(&self, point: Point, pressure: f32) -> Dab {
        Dab::new(
            point.x,
            point.y,
            self.params.radius_for_pressure(pressure),
            pressure,
        )
    }
}

#[inline]
fn clamp_pressure(pressure: f32) -> f32 {
    if pressure.is_finite() {
        pressure.clamp(MIN_WEIGHT, 1.0)
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_step_params() -> SamplerParams {
        SamplerParams {
            base_radius: 5.0,
            spacing_fraction: 0.1,
            ..Default::default()
        }
    }

    #[test]
    fn test_params_default() {
        let params = SamplerParams::default();
        assert_eq!(params.base_radius, BASE_RADIUS);
        assert!(params.gamma < 1.0);
        assert!(params.min_step > 0.0);
    }

    #[test]
    fn test_radius_for_pressure_gamma() {
        let params = unit_step_params();
        assert!((params.radius_for_pressure(1.0) - 5.0).abs() < 1e-5);
        // gamma < 1 keeps light pressure above the linear curve
        assert!(params.radius_for_pressure(0.25) > 5.0 * 0.25);
    }

    #[test]
    fn test_base_step_respects_min_step() {
        let params = SamplerParams {
            base_radius: 0.1,
            ..Default::default()
        };
        assert_eq!(params.base_step(1.0), params.min_step);
        assert!((unit_step_params().base_step(1.0) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_begin_emits_one_dab() {
        let mut sampler = StrokeSampler::new(unit_step_params());
        for pressure in [0.01, 0.5, 1.0] {
            let dab = sampler.begin(Point::new(3.0, 4.0), pressure);
            assert_eq!(dab.x, 3.0);
            assert_eq!(dab.y, 4.0);
            assert!(dab.radius > 0.0);
            assert!(dab.weight > 0.0 && dab.weight <= 1.0);
        }
    }

    #[test]
    fn test_straight_segment() {
        let mut sampler = StrokeSampler::new(unit_step_params());
        sampler.begin(Point::new(0.0, 0.0), 1.0);
        let dabs = sampler.extend(Point::new(100.0, 0.0), 1.0);

        assert_eq!(dabs.len(), 100);
        for (i, dab) in dabs.iter().enumerate() {
            assert!((dab.x - (i as f32 + 1.0)).abs() < 1e-3);
            assert_eq!(dab.y, 0.0);
        }
        assert!(sampler.state().carry < 1.0);
    }

    #[test]
    fn test_zero_distance_is_noop() {
        let mut sampler = StrokeSampler::new(unit_step_params());
        sampler.begin(Point::new(0.0, 0.0), 1.0);
        sampler.extend(Point::new(2.5, 0.0), 1.0);
        let before = *sampler.state();

        let dabs = sampler.extend(Point::new(2.5, 0.0), 1.0);
        assert!(dabs.is_empty());
        assert_eq!(*sampler.state(), before);
    }

    #[test]
    fn test_spacing_continuity_across_segments() {
        let mut whole = StrokeSampler::new(unit_step_params());
        whole.begin(Point::new(0.0, 0.0), 1.0);
        let long = whole.extend(Point::new(50.0, 0.0), 1.0);

        let mut pieces = StrokeSampler::new(unit_step_params());
        pieces.begin(Point::new(0.0, 0.0), 1.0);
        let short = pieces.extend_all((1..=200).map(|i| (Point::new(i as f32 * 0.25, 0.0), 1.0)));

        assert!((long.len() as i64 - short.len() as i64).abs() <= 1);
        for (a, b) in long.iter().zip(short.iter()) {
            assert!((a.x - b.x).abs() < 1e-2, "{} vs {}", a.x, b.x);
        }
    }

    #[test]
    fn test_carry_bridges_short_segments() {
        let mut sampler = StrokeSampler::new(unit_step_params());
        sampler.begin(Point::new(0.0, 0.0), 1.0);

        assert!(sampler.extend(Point::new(0.4, 0.0), 1.0).is_empty());
        assert!(sampler.extend(Point::new(0.8, 0.0), 1.0).is_empty());
        let dabs = sampler.extend(Point::new(1.2, 0.0), 1.0);
        assert_eq!(dabs.len(), 1);
        assert!((dabs[0].x - 1.0).abs() < 1e-4);
        assert!(sampler.state().carry < 1.0);
    }

    #[test]
    fn test_sharp_turn_samples_denser() {
        let params = unit_step_params();
        let mut straight = StrokeSampler::new(params);
        straight.begin(Point::new(0.0, 0.0), 1.0);
        straight.extend(Point::new(20.0, 0.0), 1.0);
        let ahead = straight.extend(Point::new(40.0, 0.0), 1.0);

        let mut turning = StrokeSampler::new(params);
        turning.begin(Point::new(0.0, 0.0), 1.0);
        turning.extend(Point::new(20.0, 0.0), 1.0);
        let back = turning.extend(Point::new(0.0, 0.0), 1.0);

        assert!(back.len() > ahead.len());
        // full reversal shrinks the step by the maximum fraction
        let expected = params.base_step(1.0) * (1.0 - params.max_curvature_shrink);
        let gap = (back[1].x - back[0].x).abs();
        assert!((gap - expected).abs() < 1e-3);
    }

    #[test]
    fn test_curvature_step_clamps_rounding() {
        let params = SamplerParams::default();
        // nearly parallel vectors whose normalized dot may overshoot 1.0
        let step = params.curvature_step(
            2.0,
            Point::new(1e-3, 1e-3),
            Point::new(1e3, 1e3),
        );
        assert!(step.is_finite());
        assert!((step - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_extend_without_begin() {
        let mut sampler = StrokeSampler::default();
        assert!(sampler.extend(Point::new(10.0, 10.0), 1.0).is_empty());
        assert!(!sampler.is_active());
    }

    #[test]
    fn test_end_resets_state() {
        let mut sampler = StrokeSampler::new(unit_step_params());
        sampler.begin(Point::new(0.0, 0.0), 1.0);
        sampler.extend(Point::new(10.5, 0.0), 1.0);
        sampler.end();

        assert!(!sampler.is_active());
        assert_eq!(sampler.state().carry, 0.0);
        assert!(sampler.extend(Point::new(20.0, 0.0), 1.0).is_empty());
    }
}
