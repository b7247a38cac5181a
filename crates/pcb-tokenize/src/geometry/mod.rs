//! Primitive geometry over board nodes: layers, rounding, rotation and the
//! move/rotate/scale/mirror transforms.

pub mod create;
pub mod rotation;
pub mod transform;

pub use rotation::Rotation;
pub use transform::{mirror, move_elements, rotate_elements, scale_elements};

use crate::error::TokenizeError;
use crate::tree::{Attr, Node, Tag};

/// Decimal digits kept after every arithmetic operation.
pub const ROUNDING_PRECISION: u32 = 3;

pub const LAYER_TOP: u32 = 1;
pub const LAYER_BOTTOM: u32 = 16;
pub const LAYER_PADS: u32 = 17;
pub const LAYER_VIAS: u32 = 18;
pub const LAYER_DIMENSION: u32 = 20;
pub const LAYER_TSTOP: u32 = 29;
pub const LAYER_BSTOP: u32 = 30;
pub const LAYER_HOLES: u32 = 45;

/// Layers surviving cleanup. Silkscreen (51, 52) is deliberately absent.
pub const KEPT_LAYERS: [u32; 10] = [
    LAYER_TOP,
    LAYER_BOTTOM,
    LAYER_PADS,
    LAYER_VIAS,
    LAYER_DIMENSION,
    LAYER_TSTOP,
    LAYER_BSTOP,
    44, // drills
    LAYER_HOLES,
    46, // milling
];

/// Round a float to N decimal places.
pub fn round_f64(v: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (v * factor).round() / factor
}

pub fn round_coord(v: f64) -> f64 {
    round_f64(v, ROUNDING_PRECISION)
}

/// Render a coordinate the way board documents carry them: rounded, with
/// integral values keeping a single decimal (`50.0`, not `50`).
pub fn format_coord(v: f64) -> String {
    // adding 0.0 folds -0.0 into 0.0
    let v = round_coord(v) + 0.0;
    if v.fract() == 0.0 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

/// Opposite-side layer for mirroring; layers without a pair stay put.
pub fn mirror_layer(layer: u32) -> u32 {
    match layer {
        1 => 16,
        16 => 1,
        29 => 30,
        30 => 29,
        51 => 52,
        52 => 51,
        _ => layer,
    }
}

pub fn is_copper(layer: u32) -> bool {
    layer == LAYER_TOP || layer == LAYER_BOTTOM
}

/// Layer a primitive lives on. Explicit `layer` wins; pads, holes and vias
/// have implied layers. Vertices inherit from their polygon and yield `None`.
pub fn element_layer(node: &Node) -> Result<Option<u32>, TokenizeError> {
    if let Some(raw) = node.attr(Attr::Layer) {
        let layer = raw
            .trim()
            .parse()
            .map_err(|_| TokenizeError::InvalidAttribute {
                tag: node.name().to_string(),
                attribute: Attr::Layer.as_str().to_string(),
                value: raw.to_string(),
            })?;
        return Ok(Some(layer));
    }
    match node.tag() {
        Tag::Pad => Ok(Some(LAYER_PADS)),
        Tag::Hole => Ok(Some(LAYER_HOLES)),
        Tag::Via => Ok(Some(LAYER_VIAS)),
        Tag::Vertex => Ok(None),
        _ => Err(TokenizeError::MissingRequiredAttribute {
            tag: node.name().to_string(),
            attribute: Attr::Layer.as_str().to_string(),
        }),
    }
}
