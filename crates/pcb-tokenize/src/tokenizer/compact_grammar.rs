use super::{
    board_content, split_tokens, unknown_token, AttributeCodec, CodecConfig, DecodeSession,
    Grammar, StructuralGrammar, END_OF_BOARD, WORD_SEPARATOR,
};
use crate::error::TokenizeError;
use crate::repair::{ContourRepair, PolygonRepair};
use crate::tree::{Node, Tag};
use log::{debug, warn};
use std::fmt;

/// Structural region of the document; decides which symbols are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Outside `<plain>` and `<signals>`.
    Top,
    /// Below `<plain>`.
    Plains,
    /// Below `<signals>`.
    Signals,
}

impl Phase {
    /// Phase for the children of a `tag` element opened in this phase.
    fn enter(self, tag: Tag) -> Phase {
        match (self, tag) {
            (Phase::Top, Tag::Plain) => Phase::Plains,
            (Phase::Top, Tag::Signals) => Phase::Signals,
            _ => self,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Top => write!(f, "Top"),
            Phase::Plains => write!(f, "Plains"),
            Phase::Signals => write!(f, "Signals"),
        }
    }
}

/// Open symbols per phase, in vocabulary order.
const SYMBOLS: [(Phase, Tag, &str); 16] = [
    (Phase::Top, Tag::Eagle, "E"),
    (Phase::Top, Tag::Drawing, "D"),
    (Phase::Top, Tag::Plain, "N"),
    (Phase::Top, Tag::Signals, "G"),
    (Phase::Top, Tag::Board, "B"),
    (Phase::Plains, Tag::Wire, "W"),
    (Phase::Plains, Tag::Circle, "C"),
    (Phase::Plains, Tag::Rectangle, "R"),
    (Phase::Plains, Tag::Hole, "H"),
    (Phase::Plains, Tag::Polygon, "P"),
    (Phase::Plains, Tag::Vertex, "X"),
    (Phase::Signals, Tag::Signal, "S"),
    (Phase::Signals, Tag::Wire, "w"),
    (Phase::Signals, Tag::Polygon, "p"),
    (Phase::Signals, Tag::Vertex, "x"),
    (Phase::Signals, Tag::Via, "v"),
];

fn symbol_for(phase: Phase, tag: Tag) -> Option<&'static str> {
    SYMBOLS
        .iter()
        .find(|(p, t, _)| *p == phase && *t == tag)
        .map(|(_, _, s)| *s)
}

fn lookup(token: &str) -> Option<(Phase, Tag)> {
    SYMBOLS
        .iter()
        .find(|(_, _, s)| *s == token)
        .map(|(p, t, _)| (*p, *t))
}

fn depth(tag: Tag) -> u8 {
    tag.nesting_depth().unwrap_or(0)
}

/// Implicitly nested grammar: only open symbols are emitted and nesting is
/// recovered from each tag's structural depth.
pub struct CompactGrammar {
    codec: AttributeCodec,
    repair: Box<dyn PolygonRepair>,
}

impl CompactGrammar {
    pub fn new(config: CodecConfig) -> Self {
        Self::with_repair(config, Box::new(ContourRepair))
    }

    pub fn with_repair(config: CodecConfig, repair: Box<dyn PolygonRepair>) -> Self {
        Self {
            codec: AttributeCodec::new(config),
            repair,
        }
    }

    fn encode_element(
        &self,
        element: &Node,
        phase: Phase,
        tokens: &mut Vec<String>,
    ) -> Result<(), TokenizeError> {
        let symbol =
            symbol_for(phase, element.tag()).ok_or_else(|| TokenizeError::IllegalTagForPhase {
                tag: element.name().to_string(),
                phase: phase.to_string(),
            })?;
        tokens.push(symbol.to_string());
        tokens.extend(self.codec.encode(element)?);

        let child_phase = phase.enter(element.tag());
        for child in &element.children {
            self.encode_element(child, child_phase, tokens)?;
        }
        Ok(())
    }
}

struct Frame {
    node: Node,
    /// Phase its children are decoded in.
    phase: Phase,
}

/// Pop the innermost open element and attach it to its parent. Returns true
/// when it was the top-level element.
fn close_innermost(
    stack: &mut Vec<Frame>,
    root: &mut Node,
    session: &DecodeSession<'_>,
) -> Result<bool, TokenizeError> {
    let Some(mut frame) = stack.pop() else {
        return Ok(false);
    };
    session.finish(&mut frame.node)?;
    match stack.last_mut() {
        Some(parent) => {
            parent.node.push(frame.node);
            Ok(false)
        }
        None => {
            root.push(frame.node);
            Ok(true)
        }
    }
}

impl StructuralGrammar for CompactGrammar {
    fn grammar(&self) -> Grammar {
        Grammar::Compact
    }

    fn encode(&self, root: &Node) -> Result<String, TokenizeError> {
        let mut tokens = Vec::new();
        self.encode_element(board_content(root)?, Phase::Top, &mut tokens)?;
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
            let Some((phase, tag)) = lookup(token) else {
                match stack.last_mut() {
                    Some(frame) => session.attribute(&mut frame.node, &tokens, idx)?,
                    None => return Err(unknown_token(&tokens, idx)),
                }
                continue;
            };

            // a tag no deeper than the open element belongs to an ancestor
            while let Some(frame) = stack.last() {
                if depth(tag) > depth(frame.node.tag()) {
                    break;
                }
                if close_innermost(&mut stack, &mut root, &session)? {
                    warn!(
                        "ignoring {} tokens after the top-level element",
                        tokens.len() - idx
                    );
                    return Ok(root);
                }
            }

            let expected = stack.last().map_or(Phase::Top, |f| f.phase);
            if phase != expected {
                return Err(TokenizeError::IllegalTagForPhase {
                    tag: tag.as_str().to_string(),
                    phase: expected.to_string(),
                });
            }
            debug!("opening <{}> at token {idx}", tag.as_str());
            stack.push(Frame {
                node: session.open(tag),
                phase: expected.enter(tag),
            });
        }

        while !stack.is_empty() {
            close_innermost(&mut stack, &mut root, &session)?;
        }
        Ok(root)
    }

    fn tag_symbols(&self) -> Vec<&'static str> {
        SYMBOLS.iter().map(|(_, _, s)| *s).collect()
    }
}
