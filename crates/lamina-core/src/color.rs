//! Picking color codec.
//!
//! During a picking pass every drawn primitive's color encodes an object
//! identifier instead of its visual appearance: the RGB channels carry the
//! object index plus one (low byte first) and the alpha channel carries the
//! layer slot plus one. The all-zero color is reserved for "no object", so
//! a cleared target reads back as background everywhere.
//!
//! The color alone cannot name the owning layer across passes (index space
//! is per-layer); a [`PickingDecoder`] built from the pass's slot
//! assignment resolves it.

use std::sync::Arc;

use crate::layer::Layer;

/// The reserved background color: nothing picked.
pub const NO_PICK_COLOR: [u8; 4] = [0, 0, 0, 0];

/// Maximum encodable object index (index + 1 must fit in 24 bits).
pub const MAX_OBJECT_INDEX: u32 = 0x00FF_FFFE;

/// Maximum number of layer slots per pass (slot + 1 must fit in the alpha
/// byte).
pub const MAX_LAYER_SLOTS: usize = 255;

/// Encodes a layer slot and object index into a picking color.
///
/// `slot` is the zero-based position of the layer in the pass's slot table;
/// `object_index` is the zero-based index of the object within the layer.
pub fn encode_picking_color(slot: u8, object_index: u32) -> [u8; 4] {
    debug_assert!(object_index <= MAX_OBJECT_INDEX);
    let value = object_index + 1;
    #[allow(clippy::cast_possible_truncation)]
    [
        (value & 0xFF) as u8,
        ((value >> 8) & 0xFF) as u8,
        ((value >> 16) & 0xFF) as u8,
        slot + 1,
    ]
}

/// Decodes the object index carried by a picking color.
///
/// Returns `-1` for the background color.
pub fn decode_object_index(color: [u8; 4]) -> i64 {
    let value =
        i64::from(color[0]) | (i64::from(color[1]) << 8) | (i64::from(color[2]) << 16);
    value - 1
}

/// One slot of a pass's layer assignment.
#[derive(Clone)]
pub struct DecoderEntry {
    /// The layer drawn with this slot.
    pub layer: Arc<dyn Layer>,
    /// Ids of the viewports the layer was drawn in during the pass.
    pub viewport_ids: Vec<String>,
}

/// A decoded non-background pixel.
#[derive(Clone)]
pub struct DecodedPixel {
    /// The layer that drew the pixel.
    pub layer: Arc<dyn Layer>,
    /// Zero-based object index within the layer.
    pub object_index: i64,
    /// Ids of the viewports the layer was drawn in.
    pub viewport_ids: Vec<String>,
}

/// Resolves raw picking colors to layers for one render pass.
///
/// Built from the pass's slot assignment; slot `n` in the alpha channel
/// maps to `entries[n - 1]`.
pub struct PickingDecoder {
    entries: Vec<DecoderEntry>,
}

impl PickingDecoder {
    /// Creates a decoder from the pass's slot table, in slot order.
    pub fn new(entries: Vec<DecoderEntry>) -> Self {
        Self { entries }
    }

    /// Decodes a raw color to its layer and object index.
    ///
    /// Returns `None` for the background color, an unassigned slot, or an
    /// index outside the encodable range.
    pub fn decode(&self, color: [u8; 4]) -> Option<DecodedPixel> {
        if color == NO_PICK_COLOR {
            return None;
        }
        let slot = color[3] as usize;
        if slot == 0 || slot > self.entries.len() {
            return None;
        }
        let object_index = decode_object_index(color);
        if object_index < 0 {
            return None;
        }
        let entry = &self.entries[slot - 1];
        Some(DecodedPixel {
            layer: Arc::clone(&entry.layer),
            object_index,
            viewport_ids: entry.viewport_ids.clone(),
        })
    }

    /// Cheap check whether a raw color would decode, without cloning the
    /// slot entry.
    pub fn resolves(&self, color: [u8; 4]) -> bool {
        let slot = color[3] as usize;
        color != NO_PICK_COLOR
            && slot > 0
            && slot <= self.entries.len()
            && decode_object_index(color) >= 0
    }

    /// Number of slots assigned in the pass.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pass assigned no slots.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
