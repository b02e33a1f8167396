//! Legend colour ramps
//!
//! A legend ramp is an ordered list of (value, colour) anchors. Consecutive
//! anchors form segments of a polyline through RGB space; an observed
//! colour is decoded by projecting it onto the nearest point of that
//! polyline and reading off the interpolated value.
//!
//! All projection arithmetic is single precision and evaluated in exactly
//! this order; changing it changes decoded values in the last bit:
//!
//! ```text
//! delta   = c2 - c1
//! t       = clamp(dot(x - c1, delta) / |delta|^2, 0, 1)
//! t       = 1        if last segment and t > snap_last_t
//! dist^2  = |x - (c1 + t * delta)|^2
//! value   = f32(v1) + t * f32(v2 - v1)
//! ```
//!
//! Segments are scanned in order and a later segment only wins with a
//! strictly smaller distance.

mod presets;

pub use presets::{PresetCatalog, CATALOG_VERSION, PERCENTILE_COLORS};

use geochroma_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// One calibration anchor of a legend ramp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegendPoint {
    /// Physical quantity (ppm, %) shown by this colour
    pub value: f64,
    /// Legend colour
    pub rgb: [u8; 3],
}

impl LegendPoint {
    pub const fn new(value: f64, rgb: [u8; 3]) -> Self {
        Self { value, rgb }
    }
}

/// An immutable legend ramp of at least two points.
///
/// Point values are not required to increase; the projection is purely
/// geometric in colour space. Use [`LegendRamp::is_monotonic`] to check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RampDef")]
pub struct LegendRamp {
    key: String,
    label: String,
    unit: String,
    points: Vec<LegendPoint>,
}

/// Unchecked wire form of a ramp, validated through `TryFrom`.
#[derive(Deserialize)]
struct RampDef {
    key: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    unit: String,
    points: Vec<LegendPoint>,
}

impl TryFrom<RampDef> for LegendRamp {
    type Error = Error;

    fn try_from(def: RampDef) -> Result<Self> {
        let label = def.label.unwrap_or_else(|| def.key.clone());
        LegendRamp::new(def.key, label, def.unit, def.points)
    }
}

/// A segment between two consecutive ramp points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub index: usize,
    pub start: LegendPoint,
    pub end: LegendPoint,
}

impl Segment {
    /// Whether both endpoints share one colour
    pub fn is_degenerate(&self) -> bool {
        self.start.rgb == self.end.rgb
    }
}

/// Result of projecting one colour onto a ramp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Decoded value
    pub value: f32,
    /// Squared RGB distance from the colour to the ramp
    pub dist_sq: f32,
    /// Index of the winning segment
    pub segment: usize,
    /// Position along the winning segment, in [0, 1]
    pub t: f32,
}

impl LegendRamp {
    /// Build a ramp, rejecting fewer than two points.
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        unit: impl Into<String>,
        points: Vec<LegendPoint>,
    ) -> Result<Self> {
        let key = key.into();
        if points.len() < 2 {
            return Err(Error::InvalidRamp {
                key,
                reason: format!("need at least 2 legend points, got {}", points.len()),
            });
        }
        Ok(Self {
            key,
            label: label.into(),
            unit: unit.into(),
            points,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn points(&self) -> &[LegendPoint] {
        &self.points
    }

    /// Number of segments (points - 1)
    pub fn segment_count(&self) -> usize {
        self.points.len() - 1
    }

    /// Iterate over segments in ramp order, degenerate ones included
    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        self.points
            .windows(2)
            .enumerate()
            .map(|(index, w)| Segment {
                index,
                start: w[0],
                end: w[1],
            })
    }

    /// Smallest and largest point value
    pub fn value_range(&self) -> (f64, f64) {
        self.points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.value), hi.max(p.value))
            })
    }

    /// Whether point values strictly increase along the ramp
    pub fn is_monotonic(&self) -> bool {
        self.points.windows(2).all(|w| w[0].value < w[1].value)
    }

    /// Decode one colour, NaN when every segment is degenerate.
    ///
    /// `snap_last_t` forces projections past that fraction of the final
    /// segment onto the ramp's last point; values outside [0, 1] (or NaN)
    /// disable snapping.
    pub fn project(&self, r: f32, g: f32, b: f32, snap_last_t: Option<f64>) -> f32 {
        self.project_with_distance(r, g, b, snap_last_t)
            .map(|p| p.value)
            .unwrap_or(f32::NAN)
    }

    /// Like [`project`](Self::project) but also reports the winning segment
    /// and distance. `None` when no segment produced a candidate.
    pub fn project_with_distance(
        &self,
        r: f32,
        g: f32,
        b: f32,
        snap_last_t: Option<f64>,
    ) -> Option<Projection> {
        let snap = snap_threshold(snap_last_t);
        let sample = [r, g, b];

        let mut best: Option<Projection> = None;
        let mut min_dist = f32::INFINITY;
        for seg in self.geometry() {
            let (t, dist_sq) = seg.project(sample, snap);
            if dist_sq < min_dist {
                min_dist = dist_sq;
                best = Some(Projection {
                    value: seg.value_at(t),
                    dist_sq,
                    segment: seg.index,
                    t,
                });
            }
        }
        best
    }

    /// Precomputed geometry of every non-degenerate segment, in ramp order.
    pub(crate) fn geometry(&self) -> Vec<SegmentGeometry> {
        let last = self.segment_count() - 1;
        self.segments()
            .filter_map(|seg| SegmentGeometry::new(&seg, seg.index == last))
            .collect()
    }
}

/// Snap threshold as used by the projection, `None` when disabled.
pub(crate) fn snap_threshold(snap_last_t: Option<f64>) -> Option<f32> {
    snap_last_t
        .filter(|s| (0.0..=1.0).contains(s))
        .map(|s| s as f32)
}

/// Single-precision form of one segment.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SegmentGeometry {
    pub(crate) index: usize,
    origin: [f32; 3],
    delta: [f32; 3],
    len_sq: f32,
    base: f32,
    span: f32,
    is_last: bool,
}

impl SegmentGeometry {
    /// `None` for zero-length segments.
    fn new(seg: &Segment, is_last: bool) -> Option<Self> {
        let c1 = seg.start.rgb;
        let c2 = seg.end.rgb;
        let delta = [
            (c2[0] as i32 - c1[0] as i32) as f32,
            (c2[1] as i32 - c1[1] as i32) as f32,
            (c2[2] as i32 - c1[2] as i32) as f32,
        ];
        let len_sq = delta[0] * delta[0] + delta[1] * delta[1] + delta[2] * delta[2];
        if len_sq <= 0.0 {
            return None;
        }

        Some(Self {
            index: seg.index,
            origin: [c1[0] as f32, c1[1] as f32, c1[2] as f32],
            delta,
            len_sq,
            base: seg.start.value as f32,
            span: (seg.end.value - seg.start.value) as f32,
            is_last,
        })
    }

    /// Clamped (and possibly snapped) position along the segment and the
    /// squared distance from `sample` to that point.
    #[inline]
    pub(crate) fn project(&self, sample: [f32; 3], snap: Option<f32>) -> (f32, f32) {
        let [o0, o1, o2] = self.origin;
        let [d0, d1, d2] = self.delta;
        let [x0, x1, x2] = sample;

        let mut t = ((x0 - o0) * d0 + (x1 - o1) * d1 + (x2 - o2) * d2) / self.len_sq;
        t = t.clamp(0.0, 1.0);
        if self.is_last {
            if let Some(snap) = snap {
                if t > snap {
                    t = 1.0;
                }
            }
        }

        let p0 = o0 + t * d0;
        let p1 = o1 + t * d1;
        let p2 = o2 + t * d2;
        let dist_sq = (x0 - p0) * (x0 - p0) + (x1 - p1) * (x1 - p1) + (x2 - p2) * (x2 - p2);
        (t, dist_sq)
    }

    #[inline]
    pub(crate) fn value_at(&self, t: f32) -> f32 {
        self.base + t * self.span
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn three_point() -> LegendRamp {
        LegendRamp::new(
            "test",
            "Test",
            "ppm",
            vec![
                LegendPoint::new(0.0, [204, 204, 204]),
                LegendPoint::new(10.0, [0, 38, 115]),
                LegendPoint::new(20.0, [0, 255, 0]),
            ],
        )
        .unwrap()
    }

    fn two_point() -> LegendRamp {
        LegendRamp::new(
            "pair",
            "Pair",
            "%",
            vec![
                LegendPoint::new(5.0, [0, 0, 0]),
                LegendPoint::new(15.0, [200, 0, 0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_too_few_points() {
        let err = LegendRamp::new("x", "x", "", vec![LegendPoint::new(1.0, [0, 0, 0])]).unwrap_err();
        assert!(matches!(err, Error::InvalidRamp { .. }));
        assert!(LegendRamp::new("x", "x", "", vec![]).is_err());
    }

    #[test]
    fn test_two_point_endpoints() {
        let ramp = two_point();
        assert_eq!(ramp.project(0.0, 0.0, 0.0, None), 5.0);
        assert_eq!(ramp.project(200.0, 0.0, 0.0, None), 15.0);
        assert_eq!(ramp.project(100.0, 0.0, 0.0, None), 10.0);
    }

    #[test]
    fn test_clamps_to_segment() {
        let ramp = two_point();
        // beyond either end of the segment
        assert_eq!(ramp.project(255.0, 0.0, 0.0, None), 15.0);
        assert_eq!(ramp.project(0.0, 50.0, 50.0, None), 5.0);
    }

    #[test]
    fn test_exact_anchor_colours() {
        let ramp = three_point();
        let p = ramp.project_with_distance(0.0, 38.0, 115.0, None).unwrap();
        assert_eq!(p.value, 10.0);
        assert_eq!(p.dist_sq, 0.0);
        // first segment reaches the shared anchor at t = 1 and keeps the tie
        assert_eq!(p.segment, 0);
        assert_eq!(p.t, 1.0);

        assert_eq!(ramp.project(204.0, 204.0, 204.0, None), 0.0);
        assert_eq!(ramp.project(0.0, 255.0, 0.0, None), 20.0);
    }

    #[test]
    fn test_last_segment_snap() {
        let ramp = two_point();
        // t = 0.7 on the only (= last) segment
        let x = 140.0;
        assert_relative_eq!(ramp.project(x, 0.0, 0.0, None), 12.0, epsilon = 1e-5);
        assert_eq!(ramp.project(x, 0.0, 0.0, Some(0.5)), 15.0);
        // below the threshold snapping does nothing
        assert_relative_eq!(ramp.project(x, 0.0, 0.0, Some(0.8)), 12.0, epsilon = 1e-5);
    }

    fn corner() -> LegendRamp {
        LegendRamp::new(
            "corner",
            "Corner",
            "",
            vec![
                LegendPoint::new(0.0, [0, 0, 0]),
                LegendPoint::new(10.0, [100, 0, 0]),
                LegendPoint::new(20.0, [100, 100, 0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_snap_applied_before_distance() {
        let ramp = corner();
        let plain = ramp.project_with_distance(100.0, 60.0, 0.0, None).unwrap();
        assert_eq!(plain.segment, 1);
        assert_eq!(plain.dist_sq, 0.0);

        let snapped = ramp.project_with_distance(100.0, 60.0, 0.0, Some(0.5)).unwrap();
        assert_eq!(snapped.segment, 1);
        assert_eq!(snapped.value, 20.0);
        // distance measured to the snapped endpoint
        assert_eq!(snapped.dist_sq, 1600.0);
    }

    #[test]
    fn test_snap_changes_winning_segment() {
        let ramp = corner();
        let plain = ramp.project_with_distance(60.0, 55.0, 0.0, None).unwrap();
        assert_eq!(plain.segment, 1);
        assert_relative_eq!(plain.value, 15.5, epsilon = 1e-4);

        // snapped endpoint (100, 100, 0) is further than the first segment
        let snapped = ramp.project_with_distance(60.0, 55.0, 0.0, Some(0.5)).unwrap();
        assert_eq!(snapped.segment, 0);
        assert_relative_eq!(snapped.value, 6.0, epsilon = 1e-4);
    }

    #[test]
    fn test_snap_out_of_range_disabled() {
        let ramp = two_point();
        let plain = ramp.project(140.0, 0.0, 0.0, None);
        for snap in [Some(-0.1), Some(1.5), Some(f64::NAN)] {
            assert_eq!(ramp.project(140.0, 0.0, 0.0, snap), plain);
        }
        // threshold 1.0 can never be exceeded after clamping
        assert_eq!(ramp.project(140.0, 0.0, 0.0, Some(1.0)), plain);
    }

    #[test]
    fn test_degenerate_segments_skipped() {
        let ramp = LegendRamp::new(
            "flat",
            "Flat",
            "",
            vec![
                LegendPoint::new(1.0, [10, 20, 30]),
                LegendPoint::new(2.0, [10, 20, 30]),
            ],
        )
        .unwrap();
        assert!(ramp.segments().all(|s| s.is_degenerate()));
        assert!(ramp.project_with_distance(10.0, 20.0, 30.0, None).is_none());
        assert!(ramp.project(10.0, 20.0, 30.0, None).is_nan());

        let ramp = LegendRamp::new(
            "partly",
            "Partly flat",
            "",
            vec![
                LegendPoint::new(1.0, [10, 20, 30]),
                LegendPoint::new(2.0, [10, 20, 30]),
                LegendPoint::new(3.0, [110, 20, 30]),
            ],
        )
        .unwrap();
        assert_eq!(ramp.project(60.0, 20.0, 30.0, None), 2.5);
    }

    #[test]
    fn test_value_within_winning_segment() {
        let ramp = three_point();
        for r in (0..=255).step_by(17) {
            for g in (0..=255).step_by(17) {
                for b in (0..=255).step_by(51) {
                    let p = ramp
                        .project_with_distance(r as f32, g as f32, b as f32, None)
                        .unwrap();
                    let seg = ramp.segments().nth(p.segment).unwrap();
                    let lo = seg.start.value.min(seg.end.value) as f32;
                    let hi = seg.start.value.max(seg.end.value) as f32;
                    assert!(p.value >= lo && p.value <= hi, "{:?} outside [{}, {}]", p, lo, hi);
                    assert!((0.0..=1.0).contains(&p.t));
                }
            }
        }
    }

    #[test]
    fn test_nan_sample() {
        assert!(three_point().project(f32::NAN, 0.0, 0.0, None).is_nan());
    }

    #[test]
    fn test_non_monotonic_still_decodes() {
        let ramp = LegendRamp::new(
            "down",
            "Down",
            "",
            vec![
                LegendPoint::new(50.0, [0, 0, 0]),
                LegendPoint::new(10.0, [0, 0, 100]),
            ],
        )
        .unwrap();
        assert!(!ramp.is_monotonic());
        assert_eq!(ramp.project(0.0, 0.0, 50.0, None), 30.0);
        assert_eq!(ramp.value_range(), (10.0, 50.0));
    }

    #[test]
    fn test_ramp_from_json() {
        let json = r#"{
            "key": "as",
            "unit": "ppm",
            "points": [
                {"value": 0.0, "rgb": [204, 204, 204]},
                {"value": 7.5, "rgb": [0, 38, 115]}
            ]
        }"#;
        let ramp: LegendRamp = serde_json::from_str(json).unwrap();
        assert_eq!(ramp.key(), "as");
        assert_eq!(ramp.label(), "as");
        assert_eq!(ramp.points().len(), 2);

        let short = r#"{"key": "x", "points": [{"value": 0.0, "rgb": [0, 0, 0]}]}"#;
        assert!(serde_json::from_str::<LegendRamp>(short).is_err());
    }
}
