//! Pruning of annotation tags and filling of attribute defaults on raw boards.

use crate::tree::{Attr, Node, Tag};

/// Children stripped from every container of the given kind.
fn tags_to_remove(category: Tag) -> &'static [Tag] {
    match category {
        Tag::Plain => &[Tag::Text, Tag::Dimension],
        Tag::Signal => &[Tag::ContactRef],
        Tag::Package => &[Tag::Text, Tag::Description, Tag::Dimension],
        _ => &[],
    }
}

/// Remove annotation children (texts, dimensions, contact references...)
/// from every `category` container in the tree.
pub fn cleanup_tags(root: &mut Node, category: Tag) {
    let remove = tags_to_remove(category);
    if remove.is_empty() {
        return;
    }
    root.visit_mut(&mut |node: &mut Node| {
        if node.tag() == category {
            node.children.retain(|c| !remove.contains(&c.tag()));
        }
    });
}

fn attribute_defaults(tag: Tag) -> &'static [(Attr, &'static str)] {
    match tag {
        Tag::Wire => &[
            (Attr::Curve, "0"),
            (Attr::Style, "continuous"),
            (Attr::Cap, "round"),
        ],
        Tag::Via => &[(Attr::Shape, "round")],
        Tag::Polygon => &[
            (Attr::Pour, "solid"),
            (Attr::Rank, "1"),
            (Attr::Spacing, "1.27"),
            (Attr::Isolate, "0"),
        ],
        _ => &[],
    }
}

/// Fill attributes the CAD tool treats as implied so downstream renderers see
/// them explicitly. Present values are never overwritten.
pub fn add_default_attributes(root: &mut Node) {
    root.visit_mut(&mut |node: &mut Node| {
        for (attr, value) in attribute_defaults(node.tag()) {
            if !node.has_attr(*attr) {
                node.set_attr(*attr, *value);
            }
        }
    });
}
