//! Constructors for the primitives produced while flattening packages.

use super::format_coord;
use crate::tree::{Attr, Node, Tag};

pub fn rectangle(x1: f64, y1: f64, x2: f64, y2: f64, layer: u32) -> Node {
    Node::new(Tag::Rectangle)
        .with_attr(Attr::X1, format_coord(x1))
        .with_attr(Attr::Y1, format_coord(y1))
        .with_attr(Attr::X2, format_coord(x2))
        .with_attr(Attr::Y2, format_coord(y2))
        .with_attr(Attr::Layer, layer.to_string())
}

pub fn circle(x: f64, y: f64, width: f64, radius: f64, layer: u32) -> Node {
    Node::new(Tag::Circle)
        .with_attr(Attr::X, format_coord(x))
        .with_attr(Attr::Y, format_coord(y))
        .with_attr(Attr::Width, format_coord(width))
        .with_attr(Attr::Radius, format_coord(radius))
        .with_attr(Attr::Layer, layer.to_string())
}

pub fn hole(x: f64, y: f64, drill: f64) -> Node {
    Node::new(Tag::Hole)
        .with_attr(Attr::X, format_coord(x))
        .with_attr(Attr::Y, format_coord(y))
        .with_attr(Attr::Drill, format_coord(drill))
}

/// Through-board via spanning both copper layers.
pub fn via(x: f64, y: f64, drill: f64, shape: &str, has_stop: bool) -> Node {
    Node::new(Tag::Via)
        .with_attr(Attr::X, format_coord(x))
        .with_attr(Attr::Y, format_coord(y))
        .with_attr(Attr::Extent, "1-16")
        .with_attr(Attr::Drill, format_coord(drill))
        .with_attr(Attr::Shape, shape)
        .with_attr(Attr::AlwaysStop, if has_stop { "yes" } else { "no" })
}

pub fn wire(x1: f64, y1: f64, x2: f64, y2: f64, width: f64, layer: u32) -> Node {
    Node::new(Tag::Wire)
        .with_attr(Attr::X1, format_coord(x1))
        .with_attr(Attr::Y1, format_coord(y1))
        .with_attr(Attr::X2, format_coord(x2))
        .with_attr(Attr::Y2, format_coord(y2))
        .with_attr(Attr::Width, format_coord(width))
        .with_attr(Attr::Layer, layer.to_string())
}

pub fn vertex(x: f64, y: f64) -> Node {
    Node::new(Tag::Vertex)
        .with_attr(Attr::X, format_coord(x))
        .with_attr(Attr::Y, format_coord(y))
}
