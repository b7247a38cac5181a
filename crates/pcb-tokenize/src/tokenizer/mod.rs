//! Board tree ⟷ token string codecs.
//!
//! Both grammars share the attribute codec and the decode-side cleanup; they
//! differ only in how nesting is expressed.

pub mod attributes;
pub mod compact_grammar;
pub mod tree_grammar;
pub mod vocab;

pub use attributes::{AttributeCodec, CodecConfig};
pub use compact_grammar::CompactGrammar;
pub use tree_grammar::TreeGrammar;
pub use vocab::Vocabulary;

use crate::error::TokenizeError;
use crate::repair::{fix_polygons, PolygonRepair};
use crate::tree::{Attr, Node, Tag};
use std::fmt;
use std::str::FromStr;

/// Marks the end of one board's token string.
pub const END_OF_BOARD: char = '|';
/// Joins consecutive tokens.
pub const WORD_SEPARATOR: char = ' ';

/// A token grammar over board trees.
pub trait StructuralGrammar {
    fn grammar(&self) -> Grammar;

    /// Token string for the first child of `root`, terminated by the end marker.
    fn encode(&self, root: &Node) -> Result<String, TokenizeError>;

    /// Rebuild a tree under a fresh `eagle` root.
    fn decode(&self, tokens: &str) -> Result<Node, TokenizeError>;

    /// Every tag symbol of the grammar in vocabulary order.
    fn tag_symbols(&self) -> Vec<&'static str>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Grammar {
    #[default]
    Compact,
    Tree,
}

impl Grammar {
    pub fn tokenizer(&self) -> Box<dyn StructuralGrammar> {
        self.tokenizer_with(CodecConfig::default())
    }

    pub fn tokenizer_with(&self, config: CodecConfig) -> Box<dyn StructuralGrammar> {
        match self {
            Grammar::Compact => Box::new(CompactGrammar::new(config)),
            Grammar::Tree => Box::new(TreeGrammar::new(config)),
        }
    }
}

impl FromStr for Grammar {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(Grammar::Compact),
            "tree" => Ok(Grammar::Tree),
            _ => Err(format!("Unknown grammar: {s}. Use: compact, tree")),
        }
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grammar::Compact => write!(f, "compact"),
            Grammar::Tree => write!(f, "tree"),
        }
    }
}

// ─── Shared encode/decode helpers ────────────────────────────────────

/// The element that gets tokenized: the first child of the document root.
pub(crate) fn board_content(root: &Node) -> Result<&Node, TokenizeError> {
    root.children
        .first()
        .ok_or_else(|| TokenizeError::MissingElement(format!("{}/*", root.name())))
}

/// Tokens before the end marker; anything after it is ignored.
pub(crate) fn split_tokens(text: &str) -> Vec<&str> {
    let body = match text.find(END_OF_BOARD) {
        Some(end) => &text[..end],
        None => text,
    };
    body.split_whitespace().collect()
}

/// Neighbouring tokens of `idx` for error messages.
pub(crate) fn token_context(tokens: &[&str], idx: usize) -> String {
    let start = idx.saturating_sub(2);
    let end = (idx + 2).min(tokens.len());
    tokens[start..end].join(" ")
}

pub(crate) fn unknown_token(tokens: &[&str], idx: usize) -> TokenizeError {
    TokenizeError::UnknownToken {
        token: tokens[idx].to_string(),
        context: token_context(tokens, idx),
    }
}

/// Per-call decode state shared by both grammars.
pub(crate) struct DecodeSession<'a> {
    codec: &'a AttributeCodec,
    repair: &'a dyn PolygonRepair,
    signal_index: usize,
}

impl<'a> DecodeSession<'a> {
    pub(crate) fn new(codec: &'a AttributeCodec, repair: &'a dyn PolygonRepair) -> Self {
        Self {
            codec,
            repair,
            signal_index: 0,
        }
    }

    /// New node for an opening symbol. Signal names never travel in the
    /// stream, so every decoded signal gets a synthetic one.
    pub(crate) fn open(&mut self, tag: Tag) -> Node {
        let mut node = Node::new(tag);
        if tag == Tag::Signal {
            node.set_attr(Attr::Name, format!("sig{}", self.signal_index));
            self.signal_index += 1;
        }
        node
    }

    /// Apply an attribute token to the node under construction.
    pub(crate) fn attribute(
        &self,
        node: &mut Node,
        tokens: &[&str],
        idx: usize,
    ) -> Result<(), TokenizeError> {
        let (attr, value) = self
            .codec
            .decode(tokens[idx])
            .ok_or_else(|| unknown_token(tokens, idx))?;
        node.set_attr(attr, value);
        Ok(())
    }

    /// Post-process a completed node before it is attached to its parent.
    pub(crate) fn finish(&self, node: &mut Node) -> Result<(), TokenizeError> {
        match node.tag() {
            Tag::Signal => fix_polygons(node, self.repair),
            Tag::Polygon => {
                if matches!(node.attr(Attr::Rank), None | Some("0")) {
                    node.set_attr(Attr::Rank, "1");
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
