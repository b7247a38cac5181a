use super::{element_layer, format_coord, mirror_layer, round_coord, Rotation, LAYER_DIMENSION};
use crate::error::TokenizeError;
use crate::tree::{Attr, Node, Tag};

// Every transform below is defined for leaf primitives only; container
// tags reaching them are a caller bug and are reported, not skipped.

fn unhandled(node: &Node) -> TokenizeError {
    TokenizeError::UnhandledElementKind(node.name().to_string())
}

// ─── Move ────────────────────────────────────────────────────────────

/// Translate primitives by (dx, dy).
pub fn move_elements(elements: &mut [Node], dx: f64, dy: f64) -> Result<(), TokenizeError> {
    for element in elements.iter_mut() {
        match element.tag() {
            Tag::Wire | Tag::Rectangle => move_xy_pair(element, dx, dy)?,
            Tag::Circle | Tag::Hole | Tag::Via => move_xy(element, dx, dy)?,
            Tag::Polygon => {
                for vertex in vertices_mut(element) {
                    move_xy(vertex, dx, dy)?;
                }
            }
            _ => return Err(unhandled(element)),
        }
    }
    Ok(())
}

fn move_xy_pair(element: &mut Node, dx: f64, dy: f64) -> Result<(), TokenizeError> {
    add_to_attribute(element, Attr::X1, dx)?;
    add_to_attribute(element, Attr::Y1, dy)?;
    add_to_attribute(element, Attr::X2, dx)?;
    add_to_attribute(element, Attr::Y2, dy)
}

fn move_xy(element: &mut Node, dx: f64, dy: f64) -> Result<(), TokenizeError> {
    add_to_attribute(element, Attr::X, dx)?;
    add_to_attribute(element, Attr::Y, dy)
}

/// Offsets only attributes that are present.
fn add_to_attribute(element: &mut Node, attr: Attr, offset: f64) -> Result<(), TokenizeError> {
    if element.has_attr(attr) {
        let value = element.f64_attr(attr)?;
        element.set_attr(attr, format_coord(value + offset));
    }
    Ok(())
}

// ─── Rotate ──────────────────────────────────────────────────────────

/// Rotate primitives about `origin`, mirroring their layers if the rotation
/// is mirrored.
pub fn rotate_elements(
    elements: &mut [Node],
    rotation: Rotation,
    origin: (f64, f64),
) -> Result<(), TokenizeError> {
    if rotation.is_identity() {
        return Ok(());
    }
    for element in elements.iter_mut() {
        match element.tag() {
            Tag::Wire => rotate_xy_pair(element, rotation, origin)?,
            Tag::Rectangle => {
                if rotation.angle % 90 != 0 {
                    return Err(TokenizeError::UnsupportedTransform(format!(
                        "rectangle rotated by {} degrees, only multiples of 90 are supported",
                        rotation.angle
                    )));
                }
                rotate_xy_pair(element, rotation, origin)?
            }
            Tag::Circle | Tag::Hole | Tag::Via => {
                rotate_xy(element, rotation, origin)?;
                if rotation.mirror {
                    mirror(element)?;
                }
            }
            Tag::Polygon => {
                // the polygon carries the layer; vertices are only rotated
                if rotation.mirror {
                    mirror(element)?;
                }
                for vertex in vertices_mut(element) {
                    rotate_xy(vertex, rotation, origin)?;
                }
            }
            _ => return Err(unhandled(element)),
        }
    }
    Ok(())
}

fn rotate_xy(element: &mut Node, rotation: Rotation, origin: (f64, f64)) -> Result<(), TokenizeError> {
    let point = (element.f64_attr(Attr::X)?, element.f64_attr(Attr::Y)?);
    let (rx, ry) = rotation.rotate_point(point, origin);
    element.set_attr(Attr::X, format_coord(rx));
    element.set_attr(Attr::Y, format_coord(ry));
    Ok(())
}

fn rotate_xy_pair(
    element: &mut Node,
    rotation: Rotation,
    origin: (f64, f64),
) -> Result<(), TokenizeError> {
    let p1 = (element.f64_attr(Attr::X1)?, element.f64_attr(Attr::Y1)?);
    let p2 = (element.f64_attr(Attr::X2)?, element.f64_attr(Attr::Y2)?);
    let (rx1, ry1) = rotation.rotate_point(p1, origin);
    let (rx2, ry2) = rotation.rotate_point(p2, origin);
    element.set_attr(Attr::X1, format_coord(rx1));
    element.set_attr(Attr::Y1, format_coord(ry1));
    element.set_attr(Attr::X2, format_coord(rx2));
    element.set_attr(Attr::Y2, format_coord(ry2));

    if rotation.mirror {
        mirror(element)?;
    }
    Ok(())
}

/// Swap a primitive onto its opposite-side layer. Layers without a mirror
/// pair, and vertices (which have no layer), are left alone.
pub fn mirror(element: &mut Node) -> Result<(), TokenizeError> {
    if let Some(layer) = element_layer(element)? {
        let opposite = mirror_layer(layer);
        if opposite != layer {
            element.set_attr(Attr::Layer, opposite.to_string());
        }
    }
    Ok(())
}

// ─── Scale ───────────────────────────────────────────────────────────

/// Scale primitives about (0, 0). Widths of board-outline wires keep their
/// size.
pub fn scale_elements(elements: &mut [Node], factor: f64) -> Result<(), TokenizeError> {
    for element in elements.iter_mut() {
        match element.tag() {
            Tag::Wire => {
                scale_attributes(element, &[Attr::X1, Attr::Y1, Attr::X2, Attr::Y2], factor)?;
                if element_layer(element)? != Some(LAYER_DIMENSION) {
                    scale_attribute(element, Attr::Width, factor)?;
                }
            }
            Tag::Polygon => {
                scale_attributes(element, &[Attr::Width, Attr::Isolate], factor)?;
                if element.attr(Attr::Pour) == Some("hatch") {
                    if !element.has_attr(Attr::Spacing) {
                        element.set_attr(Attr::Spacing, "1.27");
                    }
                    scale_attribute(element, Attr::Spacing, factor)?;
                }
                for vertex in vertices_mut(element) {
                    scale_attributes(vertex, &[Attr::X, Attr::Y], factor)?;
                }
            }
            Tag::Circle => scale_attributes(
                element,
                &[Attr::X, Attr::Y, Attr::Radius, Attr::Width],
                factor,
            )?,
            Tag::Rectangle => {
                scale_attributes(element, &[Attr::X1, Attr::X2, Attr::Y1, Attr::Y2], factor)?
            }
            Tag::Hole | Tag::Via => {
                scale_attributes(element, &[Attr::X, Attr::Y, Attr::Drill], factor)?
            }
            _ => return Err(unhandled(element)),
        }
    }
    Ok(())
}

fn scale_attributes(element: &mut Node, attrs: &[Attr], factor: f64) -> Result<(), TokenizeError> {
    for attr in attrs {
        scale_attribute(element, *attr, factor)?;
    }
    Ok(())
}

fn scale_attribute(element: &mut Node, attr: Attr, factor: f64) -> Result<(), TokenizeError> {
    if element.has_attr(attr) {
        let value = element.f64_attr(attr)?;
        element.set_attr(attr, format_coord(round_coord(value * factor)));
    }
    Ok(())
}

fn vertices_mut(polygon: &mut Node) -> impl Iterator<Item = &mut Node> {
    polygon
        .children
        .iter_mut()
        .filter(|c| c.tag() == Tag::Vertex)
}
