//! Viewport trait and point-to-viewport resolution.

use std::sync::Arc;

use glam::{Vec2, Vec3};

use crate::rect::LogicalRect;

/// A rectangular region of the surface with its own coordinate transform.
///
/// Multiple viewports may be active simultaneously (split views, minimaps).
/// Later entries in a viewport list are treated as topmost.
pub trait Viewport: Send + Sync {
    /// Unique identifier of this viewport.
    fn id(&self) -> &str;

    /// Screen bounds in logical pixels.
    fn bounds(&self) -> LogicalRect;

    /// Whether the logical point lies inside this viewport.
    fn contains(&self, x: f32, y: f32) -> bool {
        self.bounds().contains(x, y)
    }

    /// Unprojects a point (relative to the viewport origin) to a world
    /// coordinate. Returns `None` when the point cannot be unprojected.
    fn unproject(&self, xy: Vec2) -> Option<Vec3>;
}

/// Resolves the viewport a pick at logical (x, y) belongs to.
///
/// When `restrict` is non-empty only viewports with those ids are
/// considered. Among the candidates containing the point, the last
/// (topmost) wins; if none contains it, the first supplied viewport is the
/// fallback.
pub fn viewport_for_point(
    viewports: &[Arc<dyn Viewport>],
    restrict: &[String],
    x: f32,
    y: f32,
) -> Option<Arc<dyn Viewport>> {
    viewports
        .iter()
        .filter(|v| restrict.is_empty() || restrict.iter().any(|id| id == v.id()))
        .filter(|v| v.contains(x, y))
        .next_back()
        .or_else(|| viewports.first())
        .cloned()
}
