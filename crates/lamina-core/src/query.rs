//! Extraction of picked objects from a sampled pixel buffer.

use std::collections::HashSet;
use std::sync::Arc;

use crate::color::{PickingDecoder, NO_PICK_COLOR};
use crate::layer::Layer;
use crate::rect::Rect;

/// Raw decode result of one sample.
#[derive(Clone, Default)]
pub struct PickedPixel {
    /// Raw color of the winning pixel; `None` when nothing was picked.
    pub picked_color: Option<[u8; 4]>,
    /// Layer that drew the winning pixel.
    pub picked_layer: Option<Arc<dyn Layer>>,
    /// Zero-based object index within the layer; `-1` for background.
    pub picked_object_index: i64,
    /// Device x of the winning pixel.
    pub picked_x: Option<u32>,
    /// Device y of the winning pixel.
    pub picked_y: Option<u32>,
    /// Ids of the viewports the winning pixel could belong to.
    pub picked_viewports: Vec<String>,
}

impl PickedPixel {
    /// The "nothing picked" result.
    pub fn background() -> Self {
        Self {
            picked_object_index: -1,
            ..Self::default()
        }
    }

    /// Whether this sample hit an object.
    pub fn is_hit(&self) -> bool {
        self.picked_layer.is_some()
    }
}

impl std::fmt::Debug for PickedPixel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PickedPixel")
            .field("picked_color", &self.picked_color)
            .field("picked_layer", &self.picked_layer.as_ref().map(|l| l.id().to_string()))
            .field("picked_object_index", &self.picked_object_index)
            .field("picked_x", &self.picked_x)
            .field("picked_y", &self.picked_y)
            .field("picked_viewports", &self.picked_viewports)
            .finish()
    }
}

/// Scans a sampled rectangle for the non-background pixel closest to the
/// focal device point, within `device_radius`.
///
/// Rows are scanned bottom-up in device order (row 0 of the buffer is
/// `rect.y`), columns left to right; distance ties keep the pixel
/// encountered first. Returns the background result when nothing within
/// the radius decodes.
pub fn closest_object(
    pixels: &[u8],
    decoder: &PickingDecoder,
    focal_x: i64,
    focal_y: i64,
    device_radius: u32,
    rect: Rect,
) -> PickedPixel {
    let max_d2 = i64::from(device_radius) * i64::from(device_radius);
    let mut min_d2 = i64::MAX;
    let mut closest: Option<(usize, u32, u32)> = None;

    for row in 0..rect.height {
        let dy = i64::from(rect.y + row) - focal_y;
        for col in 0..rect.width {
            let dx = i64::from(rect.x + col) - focal_x;
            let d2 = dx * dx + dy * dy;
            if d2 > max_d2 || d2 >= min_d2 {
                continue;
            }
            let offset = (row as usize * rect.width as usize + col as usize) * 4;
            let color = [
                pixels[offset],
                pixels[offset + 1],
                pixels[offset + 2],
                pixels[offset + 3],
            ];
            if !decoder.resolves(color) {
                continue;
            }
            min_d2 = d2;
            closest = Some((offset, rect.x + col, rect.y + row));
        }
    }

    let Some((offset, x, y)) = closest else {
        return PickedPixel::background();
    };
    let color = [
        pixels[offset],
        pixels[offset + 1],
        pixels[offset + 2],
        pixels[offset + 3],
    ];
    match decoder.decode(color) {
        Some(decoded) => PickedPixel {
            picked_color: Some(color),
            picked_layer: Some(decoded.layer),
            picked_object_index: decoded.object_index,
            picked_x: Some(x),
            picked_y: Some(y),
            picked_viewports: decoded.viewport_ids,
        },
        None => PickedPixel::background(),
    }
}

/// Collects the unique non-background pixels of a sampled buffer.
///
/// Deduplicates by exact raw color value, preserving first-seen scan
/// order. Two colors resolving to the same data object are kept apart here
/// and reconciled at the object level by the orchestrator.
pub fn unique_objects(pixels: &[u8], decoder: &PickingDecoder) -> Vec<PickedPixel> {
    let mut seen: HashSet<[u8; 4]> = HashSet::new();
    let mut result = Vec::new();

    for chunk in pixels.chunks_exact(4) {
        let color = [chunk[0], chunk[1], chunk[2], chunk[3]];
        if color == NO_PICK_COLOR || !seen.insert(color) {
            continue;
        }
        if let Some(decoded) = decoder.decode(color) {
            result.push(PickedPixel {
                picked_color: Some(color),
                picked_layer: Some(decoded.layer),
                picked_object_index: decoded.object_index,
                picked_x: None,
                picked_y: None,
                picked_viewports: decoded.viewport_ids,
            });
        }
    }

    result
}
