//! Snap functionality for aligning moving objects to the grid, guides and siblings.
//!
//! Every snap compares the moving object's bounding box anchors (left/top, center,
//! right/bottom) against candidate reference lines. Per axis, the first candidate
//! within the threshold wins: grid before guides before sibling alignment, and
//! left/top before center before right/bottom.

use crate::document::Unit;
use crate::guides::{Guides, Orientation};
use crate::object::CanvasObject;
use kurbo::{Rect, Vec2};

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

/// Default snap threshold in pixels.
pub const DEFAULT_SNAP_THRESHOLD: f64 = 5.0;

/// How long a snap indicator stays visible.
pub const DEFAULT_INDICATOR_DURATION: Duration = Duration::from_millis(800);

/// Convert a physical grid size to whole pixels.
///
/// Floored to avoid sub-pixel jitter; never below one pixel.
pub fn grid_size_px(size: f64, unit: Unit, dpi: f64) -> f64 {
    let px = unit.to_pixels(size, dpi).floor();
    if px.is_finite() && px >= 1.0 { px } else { 1.0 }
}

/// Axis of a snap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    /// Orientation of the reference lines this axis snaps to.
    ///
    /// Snapping along x aligns to vertical lines, along y to horizontal ones.
    pub fn line_orientation(self) -> Orientation {
        match self {
            Axis::X => Orientation::Vertical,
            Axis::Y => Orientation::Horizontal,
        }
    }
}

/// Which part of the bounding box was aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// Left or top edge.
    Start,
    Center,
    /// Right or bottom edge.
    End,
}

/// What a snap aligned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapSource {
    Grid,
    Guide,
    Alignment,
}

/// Anchors of `bounds` along `axis`, in evaluation order.
fn anchors(bounds: Rect, axis: Axis) -> [(Anchor, f64); 3] {
    match axis {
        Axis::X => [
            (Anchor::Start, bounds.x0),
            (Anchor::Center, bounds.center().x),
            (Anchor::End, bounds.x1),
        ],
        Axis::Y => [
            (Anchor::Start, bounds.y0),
            (Anchor::Center, bounds.center().y),
            (Anchor::End, bounds.y1),
        ],
    }
}

/// Extent of `bounds` across `axis` (the span an indicator line covers).
fn cross_span(bounds: Rect, axis: Axis) -> (f64, f64) {
    match axis {
        Axis::X => (bounds.y0, bounds.y1),
        Axis::Y => (bounds.x0, bounds.x1),
    }
}

/// A transient line showing where an object snapped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapIndicator {
    pub orientation: Orientation,
    /// Position of the line (x for vertical, y for horizontal).
    pub position: f64,
    /// Start of the line along its own direction.
    pub from: f64,
    /// End of the line along its own direction.
    pub to: f64,
    pub source: SnapSource,
}

/// A single-axis snap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisSnap {
    pub anchor: Anchor,
    /// The reference line position the anchor lands on.
    pub target: f64,
    /// Offset that moves the anchor onto `target`.
    pub delta: f64,
    pub source: SnapSource,
}

/// Result of a snap operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapResult {
    pub x: Option<AxisSnap>,
    pub y: Option<AxisSnap>,
    /// Indicator lines to show for the applied snaps.
    pub indicators: Vec<SnapIndicator>,
}

impl SnapResult {
    /// Create a result with no snapping.
    pub fn none() -> Self {
        Self::default()
    }

    /// Offset to apply to the moving object. Zero on axes that did not snap.
    pub fn delta(&self) -> Vec2 {
        Vec2::new(
            self.x.map_or(0.0, |s| s.delta),
            self.y.map_or(0.0, |s| s.delta),
        )
    }

    pub fn snapped_x(&self) -> bool {
        self.x.is_some()
    }

    pub fn snapped_y(&self) -> bool {
        self.y.is_some()
    }

    /// Check if any snapping occurred.
    pub fn is_snapped(&self) -> bool {
        self.x.is_some() || self.y.is_some()
    }

    fn axis(&self, axis: Axis) -> Option<AxisSnap> {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }

    fn set(&mut self, axis: Axis, snap: AxisSnap, indicator: SnapIndicator) {
        match axis {
            Axis::X => self.x = Some(snap),
            Axis::Y => self.y = Some(snap),
        }
        self.indicators.push(indicator);
    }

    /// Fill axes still unsnapped from `other`; axes already snapped keep their result.
    fn merge_first_wins(&mut self, other: SnapResult) {
        for indicator in other.indicators {
            let axis = match indicator.orientation {
                Orientation::Vertical => Axis::X,
                Orientation::Horizontal => Axis::Y,
            };
            if self.axis(axis).is_none() {
                self.indicators.push(indicator);
            }
        }
        if self.x.is_none() {
            self.x = other.x;
        }
        if self.y.is_none() {
            self.y = other.y;
        }
    }
}

/// Snap a bounding box to the nearest grid line on each axis, within `threshold`.
pub fn snap_bounds_to_grid(bounds: Rect, grid_size: f64, threshold: f64) -> SnapResult {
    let mut result = SnapResult::none();
    if !(grid_size.is_finite() && grid_size > 0.0) {
        return result;
    }
    for axis in [Axis::X, Axis::Y] {
        for (anchor, value) in anchors(bounds, axis) {
            let target = (value / grid_size).round() * grid_size;
            let delta = target - value;
            if delta.abs() <= threshold {
                let (from, to) = cross_span(bounds, axis);
                result.set(
                    axis,
                    AxisSnap {
                        anchor,
                        target,
                        delta,
                        source: SnapSource::Grid,
                    },
                    SnapIndicator {
                        orientation: axis.line_orientation(),
                        position: target,
                        from,
                        to,
                        source: SnapSource::Grid,
                    },
                );
                break;
            }
        }
    }
    result
}

/// Report the grid snap for `object`. The object is not moved.
pub fn snap_to_grid(object: &CanvasObject, grid_size: f64, threshold: f64) -> SnapResult {
    snap_bounds_to_grid(object.bounds(), grid_size, threshold)
}

/// Snap a bounding box to ruler guides, within `threshold`.
///
/// Vertical guides align the x anchors, horizontal guides the y anchors. Guides are
/// tried in creation order.
pub fn snap_bounds_to_guides(bounds: Rect, guides: &Guides, threshold: f64) -> SnapResult {
    let mut result = SnapResult::none();
    for axis in [Axis::X, Axis::Y] {
        let positions = guides.positions(axis.line_orientation());
        let found = anchors(bounds, axis).into_iter().find_map(|(anchor, value)| {
            positions
                .iter()
                .copied()
                .find(|guide| (guide - value).abs() <= threshold)
                .map(|target| (anchor, value, target))
        });
        if let Some((anchor, value, target)) = found {
            let (from, to) = cross_span(bounds, axis);
            result.set(
                axis,
                AxisSnap {
                    anchor,
                    target,
                    delta: target - value,
                    source: SnapSource::Guide,
                },
                SnapIndicator {
                    orientation: axis.line_orientation(),
                    position: target,
                    from,
                    to,
                    source: SnapSource::Guide,
                },
            );
        }
    }
    result
}

/// Report the guide snap for `object`. The object is not moved.
pub fn snap_to_guides(object: &CanvasObject, guides: &Guides, threshold: f64) -> SnapResult {
    snap_bounds_to_guides(object.bounds(), guides, threshold)
}

/// Detect alignment between a bounding box and its siblings' edges and centers.
pub fn detect_alignment(bounds: Rect, siblings: &[Rect], threshold: f64) -> SnapResult {
    let mut result = SnapResult::none();
    for axis in [Axis::X, Axis::Y] {
        let found = anchors(bounds, axis).into_iter().find_map(|(anchor, value)| {
            siblings.iter().find_map(|sibling| {
                anchors(*sibling, axis)
                    .into_iter()
                    .map(|(_, line)| line)
                    .find(|line| (line - value).abs() <= threshold)
                    .map(|target| (anchor, value, target, *sibling))
            })
        });
        if let Some((anchor, value, target, sibling)) = found {
            // The indicator spans both objects.
            let (a0, a1) = cross_span(bounds, axis);
            let (b0, b1) = cross_span(sibling, axis);
            result.set(
                axis,
                AxisSnap {
                    anchor,
                    target,
                    delta: target - value,
                    source: SnapSource::Alignment,
                },
                SnapIndicator {
                    orientation: axis.line_orientation(),
                    position: target,
                    from: a0.min(b0),
                    to: a1.max(b1),
                    source: SnapSource::Alignment,
                },
            );
        }
    }
    result
}

/// Align `object` with its siblings, moving it by the resulting delta.
///
/// Evaluated synchronously during a drag, so unlike the grid and guide snaps the
/// correction is applied immediately.
pub fn compute_alignment_guides(
    object: &mut CanvasObject,
    siblings: &[Rect],
    threshold: f64,
) -> SnapResult {
    let result = detect_alignment(object.bounds(), siblings, threshold);
    if result.is_snapped() {
        object.translate(result.delta());
    }
    result
}

/// Which snaps take part in [`snap_object`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapOptions {
    pub threshold: f64,
    /// Grid size in pixels; `None` disables grid snapping.
    pub grid_size: Option<f64>,
    pub guides: bool,
    pub alignment: bool,
}

impl Default for SnapOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SNAP_THRESHOLD,
            grid_size: None,
            guides: true,
            alignment: true,
        }
    }
}

/// Run grid, guide and alignment snapping in that order and move `object` by the
/// combined delta. Each axis snaps at most once.
pub fn snap_object(
    object: &mut CanvasObject,
    options: &SnapOptions,
    guides: &Guides,
    siblings: &[Rect],
) -> SnapResult {
    let bounds = object.bounds();
    let mut result = match options.grid_size {
        Some(grid_size) => snap_bounds_to_grid(bounds, grid_size, options.threshold),
        None => SnapResult::none(),
    };
    if options.guides && !(result.snapped_x() && result.snapped_y()) {
        result.merge_first_wins(snap_bounds_to_guides(bounds, guides, options.threshold));
    }
    if options.alignment && !(result.snapped_x() && result.snapped_y()) {
        result.merge_first_wins(detect_alignment(bounds, siblings, options.threshold));
    }
    if result.is_snapped() {
        object.translate(result.delta());
    }
    result
}

/// Snap indicators currently on screen, each with an expiry.
#[derive(Debug, Clone)]
pub struct IndicatorBoard {
    duration: Duration,
    active: Vec<(SnapIndicator, Instant)>,
}

impl Default for IndicatorBoard {
    fn default() -> Self {
        Self::new(DEFAULT_INDICATOR_DURATION)
    }
}

impl IndicatorBoard {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            active: Vec::new(),
        }
    }

    /// Show the indicators of a snap result, replacing those of the same orientation.
    pub fn show(&mut self, result: &SnapResult, now: Instant) {
        for indicator in &result.indicators {
            self.active
                .retain(|(shown, _)| shown.orientation != indicator.orientation);
            self.active.push((*indicator, now + self.duration));
        }
    }

    /// Drop expired indicators. Returns true if any were dropped.
    pub fn prune(&mut self, now: Instant) -> bool {
        let before = self.active.len();
        self.active.retain(|(_, expires)| *expires > now);
        before != self.active.len()
    }

    /// Indicators still visible.
    pub fn active(&self) -> impl Iterator<Item = &SnapIndicator> {
        self.active.iter().map(|(indicator, _)| indicator)
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Rectangle, Shape};
    use kurbo::Point;

    fn rect_at(x: f64, y: f64, w: f64, h: f64) -> CanvasObject {
        CanvasObject::new(Shape::Rectangle(Rectangle::new(Point::new(x, y), w, h)))
    }

    #[test]
    fn test_grid_size_px_floors() {
        assert!((grid_size_px(5.0, Unit::Mm, 96.0) - 18.0).abs() < f64::EPSILON);
        assert!((grid_size_px(10.0, Unit::Px, 96.0) - 10.0).abs() < f64::EPSILON);
        assert!((grid_size_px(0.0, Unit::Mm, 96.0) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_grid_snap_within_threshold() {
        // Left edge at 107 is 3px from the 110 grid line. The nearest line within
        // the threshold wins, so this is +3, not -7 to the out-of-threshold 100 line.
        let obj = rect_at(107.0, 52.0, 40.0, 40.0);
        let result = snap_to_grid(&obj, 10.0, 5.0);
        let x = result.x.unwrap();
        assert_eq!(x.anchor, Anchor::Start);
        assert!((x.delta - 3.0).abs() < 1e-9);
        assert!((obj.bounds().x0 + x.delta - 110.0).abs() < 1e-9);

        let y = result.y.unwrap();
        assert!((y.delta + 2.0).abs() < 1e-9);
        assert_eq!(result.indicators.len(), 2);
    }

    #[test]
    fn test_grid_snap_lands_below() {
        let obj = rect_at(103.0, 0.0, 40.0, 40.0);
        let result = snap_to_grid(&obj, 10.0, 5.0);
        assert!((result.delta().x + 3.0).abs() < 1e-9);
        assert!((obj.bounds().x0 + result.delta().x - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_grid_snap_beyond_threshold_is_zero() {
        // A 20px grid with a 2px threshold: 107 is 7px from 100 and 13px from 120.
        let obj = rect_at(107.0, 107.0, 1.0, 1.0);
        let result = snap_to_grid(&obj, 20.0, 2.0);
        assert!(!result.is_snapped());
        assert_eq!(result.delta(), Vec2::ZERO);
        assert!(result.indicators.is_empty());
    }

    #[test]
    fn test_grid_snap_prefers_left_over_right() {
        // Left 98 (2 from 100) and right 119 (1 from 120): left is evaluated first.
        let obj = rect_at(98.0, 0.0, 21.0, 1.0);
        let x = snap_to_grid(&obj, 20.0, 5.0).x.unwrap();
        assert_eq!(x.anchor, Anchor::Start);
        assert!((x.target - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_guide_snap() {
        let guides = Guides {
            horizontal: vec![300.0],
            vertical: vec![200.0],
        };
        // Right edge 196 is 4px from the vertical guide at 200.
        let obj = rect_at(146.0, 0.0, 50.0, 10.0);
        let result = snap_to_guides(&obj, &guides, 5.0);
        let x = result.x.unwrap();
        assert_eq!(x.anchor, Anchor::End);
        assert!((x.delta - 4.0).abs() < 1e-9);
        assert!(result.y.is_none());
        assert_eq!(result.indicators[0].orientation, Orientation::Vertical);
    }

    #[test]
    fn test_guide_snap_first_guide_wins() {
        let guides = Guides {
            horizontal: vec![],
            vertical: vec![103.0, 101.0],
        };
        let obj = rect_at(100.0, 0.0, 10.0, 10.0);
        let x = snap_to_guides(&obj, &guides, 5.0).x.unwrap();
        assert!((x.target - 103.0).abs() < 1e-9);
    }

    #[test]
    fn test_alignment_moves_object() {
        let sibling = Rect::new(200.0, 0.0, 300.0, 50.0);
        // Center x 248 vs sibling center 250; top 3 vs sibling top 0.
        let mut obj = rect_at(228.0, 103.0, 40.0, 40.0);
        obj.translate(Vec2::new(0.0, -100.0));
        let result = compute_alignment_guides(&mut obj, &[sibling], 5.0);

        assert!(result.snapped_x() && result.snapped_y());
        let bounds = obj.bounds();
        assert!((bounds.center().x - 250.0).abs() < 1e-9);
        assert!(bounds.y0.abs() < 1e-9);
        let vertical = result
            .indicators
            .iter()
            .find(|i| i.orientation == Orientation::Vertical)
            .unwrap();
        assert!((vertical.from - 0.0).abs() < 1e-9);
        assert!((vertical.to - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_alignment_out_of_range_leaves_object() {
        let mut obj = rect_at(0.0, 0.0, 10.0, 10.0);
        let result = compute_alignment_guides(&mut obj, &[Rect::new(500.0, 500.0, 600.0, 600.0)], 5.0);
        assert!(!result.is_snapped());
        assert_eq!(obj.bounds(), Rect::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn test_snap_object_grid_before_guides() {
        let guides = Guides {
            horizontal: vec![],
            vertical: vec![108.0],
        };
        let options = SnapOptions {
            grid_size: Some(10.0),
            ..SnapOptions::default()
        };
        let mut obj = rect_at(107.0, 1000.5, 40.0, 40.0);
        let result = snap_object(&mut obj, &options, &guides, &[]);
        assert_eq!(result.x.unwrap().source, SnapSource::Grid);
        assert!((obj.bounds().x0 - 110.0).abs() < 1e-9);
        assert!((obj.bounds().y0 - 1000.0).abs() < 1e-9);
        // One snap per axis, one indicator per axis.
        assert_eq!(result.indicators.len(), 2);
    }

    #[test]
    fn test_snap_object_falls_through_to_alignment() {
        let options = SnapOptions {
            grid_size: None,
            ..SnapOptions::default()
        };
        let guides = Guides {
            horizontal: vec![40.0],
            vertical: vec![],
        };
        let mut obj = rect_at(52.0, 38.0, 10.0, 10.0);
        let result = snap_object(&mut obj, &options, &guides, &[Rect::new(50.0, 400.0, 80.0, 420.0)]);
        assert_eq!(result.y.unwrap().source, SnapSource::Guide);
        assert_eq!(result.x.unwrap().source, SnapSource::Alignment);
        assert_eq!(obj.bounds().origin(), Point::new(50.0, 40.0));
    }

    #[test]
    fn test_indicator_board_expiry() {
        let mut board = IndicatorBoard::new(Duration::from_millis(800));
        let obj = rect_at(107.0, 0.0, 10.0, 10.0);
        let now = Instant::now();
        board.show(&snap_to_grid(&obj, 10.0, 5.0), now);
        assert_eq!(board.active().count(), 2);

        assert!(!board.prune(now + Duration::from_millis(500)));
        assert!(board.prune(now + Duration::from_millis(900)));
        assert!(board.is_empty());
    }
}
