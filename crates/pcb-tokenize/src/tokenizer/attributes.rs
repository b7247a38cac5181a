use super::END_OF_BOARD;
use crate::error::TokenizeError;
use crate::tree::{Attr, Node, Tag};

/// Attribute key → single-glyph prefix of its token.
pub const ATTRIBUTE_GLYPHS: [(Attr, char); 21] = [
    (Attr::X, 'Ӿ'),
    (Attr::X1, 'Ẋ'),
    (Attr::X2, 'Ẍ'),
    (Attr::Y, 'Ұ'),
    (Attr::Y1, 'Ẏ'),
    (Attr::Y2, 'Ῡ'),
    (Attr::Width, 'Ẁ'),
    (Attr::Drill, 'Ḓ'),
    (Attr::Diameter, 'Ɵ'),
    (Attr::Curve, 'Ḉ'),
    (Attr::Cap, 'Ո'),
    (Attr::Spacing, 'Ṧ'),
    (Attr::Style, 'Ϫ'),
    (Attr::Shape, '§'),
    (Attr::Isolate, 'ḹ'),
    (Attr::Pour, 'Ṕ'),
    (Attr::Radius, '₨'),
    (Attr::Rot, 'Ṝ'),
    (Attr::Rank, '₭'),
    (Attr::Layer, 'Ḽ'),
    (Attr::Extent, '↔'),
];

/// Common enumerated values and the glyph that replaces them.
pub const VALUE_GLYPHS: [(&str, char); 13] = [
    ("round", '○'),
    ("flat", '╥'),
    ("continuous", 'ↄ'),
    ("longdash", '―'),
    ("shortdash", '⁞'),
    ("dashdot", '…'),
    ("square", '□'),
    ("octagon", '◊'),
    ("solid", '⌂'),
    ("hatch", '╬'),
    ("cutout", 'Ø'),
    ("no", '№'),
    ("yes", '√'),
];

/// `None` marks a mandatory attribute.
type Declared = &'static [(Attr, Option<&'static str>)];

/// Attributes emitted for a tag, in token order, with their defaults.
/// `None` for tags that cannot be tokenized.
pub fn declared_attributes(tag: Tag) -> Option<Declared> {
    let declared: Declared = match tag {
        Tag::Wire => &[
            (Attr::X1, None),
            (Attr::Y1, None),
            (Attr::X2, None),
            (Attr::Y2, None),
            (Attr::Width, None),
            (Attr::Layer, None),
            (Attr::Style, Some("continuous")),
            (Attr::Curve, Some("0")),
            (Attr::Cap, Some("round")),
        ],
        Tag::Circle => &[
            (Attr::X, None),
            (Attr::Y, None),
            (Attr::Radius, None),
            (Attr::Width, None),
            (Attr::Layer, None),
        ],
        Tag::Rectangle => &[
            (Attr::X1, None),
            (Attr::Y1, None),
            (Attr::X2, None),
            (Attr::Y2, None),
            (Attr::Layer, None),
            (Attr::Rot, Some("R0")),
        ],
        Tag::Hole => &[(Attr::X, None), (Attr::Y, None), (Attr::Drill, None)],
        Tag::Via => &[
            (Attr::X, None),
            (Attr::Y, None),
            (Attr::Drill, None),
            (Attr::Extent, None),
            (Attr::Diameter, Some("0")),
            (Attr::Shape, Some("round")),
        ],
        Tag::Polygon => &[
            (Attr::Width, None),
            (Attr::Layer, None),
            (Attr::Spacing, Some("0")),
            (Attr::Pour, Some("solid")),
            (Attr::Rank, Some("1")),
            (Attr::Isolate, Some("0")),
        ],
        Tag::Vertex => &[(Attr::X, None), (Attr::Y, None), (Attr::Curve, Some("0"))],
        Tag::Eagle | Tag::Drawing | Tag::Board | Tag::Plain | Tag::Signals | Tag::Signal => &[],
        _ => return None,
    };
    Some(declared)
}

/// Attribute codec settings.
#[derive(Debug, Clone)]
pub struct CodecConfig {
    /// Attribute names never written to a token stream.
    pub skip_attributes: Vec<String>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            skip_attributes: ["orphans", "thermals", "alwaysstop", "name", "class"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Encodes a node's attributes to `<key glyph><value>` tokens and back.
#[derive(Debug, Clone, Default)]
pub struct AttributeCodec {
    config: CodecConfig,
}

impl AttributeCodec {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    fn skipped(&self, attr: Attr) -> bool {
        self.config
            .skip_attributes
            .iter()
            .any(|name| name == attr.as_str())
    }

    /// One token per declared attribute; absent ones fall back to their
    /// default, absent mandatory ones are an error. Values are trimmed and
    /// must not contain whitespace or the end-of-board marker.
    pub fn encode(&self, node: &Node) -> Result<Vec<String>, TokenizeError> {
        let declared = declared_attributes(node.tag())
            .ok_or_else(|| TokenizeError::UnhandledElementKind(node.name().to_string()))?;

        let mut tokens = Vec::with_capacity(declared.len());
        for &(attr, default) in declared {
            if self.skipped(attr) {
                continue;
            }
            let value = match (node.attr(attr), default) {
                (Some(value), _) => value.trim(),
                (None, Some(default)) => default,
                (None, None) => {
                    return Err(TokenizeError::MissingRequiredAttribute {
                        tag: node.name().to_string(),
                        attribute: attr.as_str().to_string(),
                    })
                }
            };
            let key = key_glyph(attr).ok_or_else(|| TokenizeError::UnknownToken {
                token: attr.as_str().to_string(),
                context: format!("attribute of <{}> without a key glyph", node.name()),
            })?;
            // a value token ends at the first separator
            if value.contains(|c: char| c.is_whitespace() || c == END_OF_BOARD) {
                return Err(TokenizeError::InvalidAttribute {
                    tag: node.name().to_string(),
                    attribute: attr.as_str().to_string(),
                    value: value.to_string(),
                });
            }
            let mut token = String::new();
            token.push(key);
            match value_glyph(value) {
                Some(glyph) => token.push(glyph),
                None => token.push_str(value),
            }
            tokens.push(token);
        }
        Ok(tokens)
    }

    /// Split a token into its attribute and decoded value. `None` when the
    /// leading glyph is not an attribute key.
    pub fn decode(&self, token: &str) -> Option<(Attr, String)> {
        let mut chars = token.chars();
        let key = chars.next()?;
        let attr = attribute_for_glyph(key)?;
        let raw = chars.as_str();
        let value = value_for_glyph(raw).unwrap_or(raw);
        Some((attr, value.to_string()))
    }
}

fn key_glyph(attr: Attr) -> Option<char> {
    ATTRIBUTE_GLYPHS
        .iter()
        .find(|(a, _)| *a == attr)
        .map(|(_, g)| *g)
}

fn attribute_for_glyph(glyph: char) -> Option<Attr> {
    ATTRIBUTE_GLYPHS
        .iter()
        .find(|(_, g)| *g == glyph)
        .map(|(a, _)| *a)
}

fn value_glyph(value: &str) -> Option<char> {
    VALUE_GLYPHS
        .iter()
        .find(|(v, _)| *v == value)
        .map(|(_, g)| *g)
}

fn value_for_glyph(raw: &str) -> Option<&'static str> {
    let mut chars = raw.chars();
    let glyph = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    VALUE_GLYPHS
        .iter()
        .find(|(_, g)| *g == glyph)
        .map(|(v, _)| *v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_declared_attribute_has_a_glyph() {
        let tags = [
            Tag::Wire,
            Tag::Circle,
            Tag::Rectangle,
            Tag::Hole,
            Tag::Via,
            Tag::Polygon,
            Tag::Vertex,
        ];
        for tag in tags {
            for (attr, _) in declared_attributes(tag).unwrap() {
                let glyph = key_glyph(*attr).unwrap();
                assert_eq!(attribute_for_glyph(glyph), Some(*attr));
            }
        }
    }

    #[test]
    fn test_encode_circle_in_declared_order() {
        let circle = Node::new(Tag::Circle)
            .with_attr(Attr::Layer, "1")
            .with_attr(Attr::X, "50.0")
            .with_attr(Attr::Y, "10")
            .with_attr(Attr::Radius, "1")
            .with_attr(Attr::Width, "0.2");
        let tokens = AttributeCodec::default().encode(&circle).unwrap();
        assert_eq!(tokens, vec!["Ӿ50.0", "Ұ10", "₨1", "Ẁ0.2", "Ḽ1"]);
    }

    #[test]
    fn test_encode_fills_defaults_and_substitutes_values() {
        let wire = Node::new(Tag::Wire)
            .with_attr(Attr::X1, "0")
            .with_attr(Attr::Y1, "0")
            .with_attr(Attr::X2, "1")
            .with_attr(Attr::Y2, "1")
            .with_attr(Attr::Width, "0.25")
            .with_attr(Attr::Layer, "16")
            .with_attr(Attr::Cap, "flat");
        let tokens = AttributeCodec::default().encode(&wire).unwrap();
        assert_eq!(&tokens[6..], &["Ϫↄ", "Ḉ0", "Ո╥"]);
    }

    #[test]
    fn test_encode_missing_required() {
        let hole = Node::new(Tag::Hole).with_attr(Attr::X, "1");
        let err = AttributeCodec::default().encode(&hole).unwrap_err();
        assert!(matches!(
            err,
            TokenizeError::MissingRequiredAttribute { tag, attribute } if tag == "hole" && attribute == "y"
        ));
    }

    #[test]
    fn test_encode_trims_and_rejects_separators() {
        let hole = |drill: &str| {
            Node::new(Tag::Hole)
                .with_attr(Attr::X, "1")
                .with_attr(Attr::Y, "2")
                .with_attr(Attr::Drill, drill)
        };
        let codec = AttributeCodec::default();
        assert_eq!(codec.encode(&hole(" 0.8\t")).unwrap()[2], "Ḓ0.8");

        for drill in ["0 8", "0|8", "0\n8"] {
            let err = codec.encode(&hole(drill)).unwrap_err();
            assert!(matches!(
                err,
                TokenizeError::InvalidAttribute { tag, attribute, value }
                    if tag == "hole" && attribute == "drill" && value == drill
            ));
        }
    }

    #[test]
    fn test_skip_list_and_undeclared_attributes() {
        let via = Node::new(Tag::Via)
            .with_attr(Attr::X, "1")
            .with_attr(Attr::Y, "2")
            .with_attr(Attr::Drill, "0.3")
            .with_attr(Attr::Extent, "1-16")
            .with_attr(Attr::AlwaysStop, "yes");
        let tokens = AttributeCodec::default().encode(&via).unwrap();
        assert_eq!(tokens.len(), 6);
        assert_eq!(tokens[5], "§○");

        let codec = AttributeCodec::new(CodecConfig {
            skip_attributes: vec!["shape".to_string()],
        });
        assert_eq!(codec.encode(&via).unwrap().len(), 5);

        let signal = Node::new(Tag::Signal).with_attr(Attr::Name, "GND");
        assert!(codec.encode(&signal).unwrap().is_empty());
    }

    #[test]
    fn test_decode_tokens() {
        let codec = AttributeCodec::default();
        assert_eq!(codec.decode("Ӿ50.0"), Some((Attr::X, "50.0".to_string())));
        assert_eq!(codec.decode("Ṕ╬"), Some((Attr::Pour, "hatch".to_string())));
        assert_eq!(codec.decode("↔1-16"), Some((Attr::Extent, "1-16".to_string())));
        assert_eq!(codec.decode("Ḽ"), Some((Attr::Layer, String::new())));
        assert_eq!(codec.decode("Q1"), None);
        assert_eq!(codec.decode(""), None);
    }

    #[test]
    fn test_untokenizable_tag() {
        let element = Node::new(Tag::Element);
        assert!(matches!(
            AttributeCodec::default().encode(&element),
            Err(TokenizeError::UnhandledElementKind(_))
        ));
    }
}
