use super::{
    board_content, split_tokens, unknown_token, AttributeCodec, CodecConfig, DecodeSession,
    Grammar, StructuralGrammar, END_OF_BOARD, WORD_SEPARATOR,
};
use crate::error::TokenizeError;
use crate::repair::{ContourRepair, PolygonRepair};
use crate::tree::{Node, Tag};
use log::{debug, warn};

/// (tag, open symbol, close symbol), in vocabulary order.
const TAG_SYMBOLS: [(Tag, &str, &str); 13] = [
    (Tag::Wire, "W", "w"),
    (Tag::Circle, "C", "c"),
    (Tag::Polygon, "P", "p"),
    (Tag::Rectangle, "R", "r"),
    (Tag::Hole, "H", "h"),
    (Tag::Via, "V", "v"),
    (Tag::Signal, "S", "s"),
    (Tag::Vertex, "X", "x"),
    (Tag::Eagle, "E", "e"),
    (Tag::Drawing, "D", "d"),
    (Tag::Plain, "N", "n"),
    (Tag::Signals, "G", "g"),
    (Tag::Board, "B", "b"),
];

fn symbols_for(tag: Tag) -> Option<(&'static str, &'static str)> {
    TAG_SYMBOLS
        .iter()
        .find(|(t, _, _)| *t == tag)
        .map(|(_, open, close)| (*open, *close))
}

fn opened_by(token: &str) -> Option<(Tag, &'static str)> {
    TAG_SYMBOLS
        .iter()
        .find(|(_, open, _)| *open == token)
        .map(|(tag, _, close)| (*tag, *close))
}

/// Explicitly delimited grammar: every element is wrapped in its own open and
/// close symbol.
pub struct TreeGrammar {
    codec: AttributeCodec,
    repair: Box<dyn PolygonRepair>,
}

impl TreeGrammar {
    pub fn new(config: CodecConfig) -> Self {
        Self::with_repair(config, Box::new(ContourRepair))
    }

    pub fn with_repair(config: CodecConfig, repair: Box<dyn PolygonRepair>) -> Self {
        Self {
            codec: AttributeCodec::new(config),
            repair,
        }
    }

    fn encode_element(&self, element: &Node, tokens: &mut Vec<String>) -> Result<(), TokenizeError> {
        let (open, close) = symbols_for(element.tag())
            .ok_or_else(|| TokenizeError::UnhandledElementKind(element.name().to_string()))?;
        tokens.push(open.to_string());
        tokens.extend(self.codec.encode(element)?);
        for child in &element.children {
            self.encode_element(child, tokens)?;
        }
        tokens.push(close.to_string());
        Ok(())
    }
}

struct Frame {
    node: Node,
    close: &'static str,
}

impl StructuralGrammar for TreeGrammar {
    fn grammar(&self) -> Grammar {
        Grammar::Tree
    }

    fn encode(&self, root: &Node) -> Result<String, TokenizeError> {
        let mut tokens = Vec::new();
        self.encode_element(board_content(root)?, &mut tokens)?;
        let mut out = tokens.join(&WORD_SEPARATOR.to_string());
        out.push(END_OF_BOARD);
        Ok(out)
    }

    fn decode(&self, text: &str) -> Result<Node, TokenizeError> {
        let tokens = split_tokens(text);
        let mut session = DecodeSession::new(&self.codec, self.repair.as_ref());
        let mut root = Node::new(Tag::Eagle);
        let mut stack: Vec<Frame> = Vec::new();

        for (idx, &token) in tokens.iter().enumerate() {
            if let Some(frame) = stack.last() {
                if token == frame.close {
                    if let Some(mut done) = stack.pop() {
                        session.finish(&mut done.node)?;
                        match stack.last_mut() {
                            Some(parent) => parent.node.push(done.node),
                            None => {
                                root.push(done.node);
                                let rest = tokens.len() - idx - 1;
                                if rest > 0 {
                                    warn!("ignoring {rest} tokens after the top-level element");
                                }
                                return Ok(root);
                            }
                        }
                    }
                    continue;
                }
            }

            if let Some((tag, close)) = opened_by(token) {
                debug!("opening <{}> at token {idx}", tag.as_str());
                stack.push(Frame {
                    node: session.open(tag),
                    close,
                });
                continue;
            }

            match stack.last_mut() {
                Some(frame) => session.attribute(&mut frame.node, &tokens, idx)?,
                None => return Err(unknown_token(&tokens, idx)),
            }
        }

        match stack.last() {
            Some(frame) => Err(TokenizeError::UnclosedElement(
                frame.node.name().to_string(),
            )),
            None => Ok(root),
        }
    }

    fn tag_symbols(&self) -> Vec<&'static str> {
        TAG_SYMBOLS
            .iter()
            .flat_map(|(_, open, close)| [*open, *close])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Attr;

    fn grammar() -> TreeGrammar {
        TreeGrammar::new(CodecConfig::default())
    }

    fn drawing_with_hole() -> Node {
        Node::new(Tag::Eagle).with_child(
            Node::new(Tag::Drawing).with_child(
                Node::new(Tag::Board)
                    .with_child(
                        Node::new(Tag::Plain).with_child(
                            Node::new(Tag::Hole)
                                .with_attr(Attr::X, "1")
                                .with_attr(Attr::Y, "2")
                                .with_attr(Attr::Drill, "0.8"),
                        ),
                    )
                    .with_child(Node::new(Tag::Signals)),
            ),
        )
    }

    #[test]
    fn test_encode_wraps_every_element() {
        let tokens = grammar().encode(&drawing_with_hole()).unwrap();
        assert_eq!(tokens, "D B N H Ӿ1 Ұ2 Ḓ0.8 h n G g b d|");
    }

    #[test]
    fn test_decode_rebuilds_tree() {
        let root = grammar().decode("D B N H Ӿ1 Ұ2 Ḓ0.8 h n G g b d|").unwrap();
        assert_eq!(root.tag(), Tag::Eagle);
        assert_eq!(root, drawing_with_hole());
    }

    #[test]
    fn test_decode_names_signals_and_fixes_rank() {
        let text = "G S P Ẁ0.1 Ḽ1 ₭0 X Ӿ0 Ұ0 x X Ӿ1 Ұ0 x X Ӿ1 Ұ1 x p s S s g|";
        let root = grammar().decode(text).unwrap();
        let signals = &root.children[0];
        assert_eq!(signals.children.len(), 2);
        assert_eq!(signals.children[0].attr(Attr::Name), Some("sig0"));
        assert_eq!(signals.children[1].attr(Attr::Name), Some("sig1"));
        let polygon = &signals.children[0].children[0];
        assert_eq!(polygon.attr(Attr::Rank), Some("1"));
        assert_eq!(polygon.children.len(), 3);
    }

    #[test]
    fn test_decode_unclosed_element() {
        let err = grammar().decode("D B N n|").unwrap_err();
        assert!(matches!(err, TokenizeError::UnclosedElement(tag) if tag == "board"));
    }

    #[test]
    fn test_decode_unknown_attribute_token() {
        let err = grammar().decode("D B Q5 b d|").unwrap_err();
        assert!(matches!(
            err,
            TokenizeError::UnknownToken { token, context } if token == "Q5" && context == "D B Q5 b"
        ));
    }

    #[test]
    fn test_decode_ignores_trailing_elements() {
        let root = grammar().decode("D d D d|").unwrap();
        assert_eq!(root.children.len(), 1);
    }

    #[test]
    fn test_encode_rejects_untokenizable_tags() {
        let root = Node::new(Tag::Eagle).with_child(Node::new(Tag::Library));
        assert!(matches!(
            grammar().encode(&root),
            Err(TokenizeError::UnhandledElementKind(tag)) if tag == "library"
        ));
    }

    #[test]
    fn test_tag_symbols_pairs() {
        let symbols = grammar().tag_symbols();
        assert_eq!(symbols.len(), 26);
        assert_eq!(&symbols[..4], &["W", "w", "C", "c"]);
    }
}
