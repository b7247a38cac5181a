pub mod cleanup;
pub mod dataset;
pub mod error;
pub mod flatten;
pub mod geometry;
pub mod repair;
pub mod template;
pub mod tokenizer;
pub mod tree;
pub mod xml;

use error::TokenizeError;
use flatten::FlattenConfig;
use repair::ContourRepair;
use std::path::Path;
use tree::Node;

pub use tokenizer::{Grammar, StructuralGrammar, Vocabulary};

#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub grammar: Grammar,
    /// Fold placed packages into plain/signal geometry before encoding.
    pub flatten: bool,
}

/// Encode an Eagle board document (optionally gzip-compressed) to a token string.
pub fn board_to_tokens(data: &[u8], opts: &ConvertOptions) -> Result<String, TokenizeError> {
    let root = xml::parse(&xml::decompress(data.to_vec())?)?;
    tree_to_tokens(root, opts)
}

/// Read and encode a board file.
pub fn board_file_to_tokens(path: &Path, opts: &ConvertOptions) -> Result<String, TokenizeError> {
    tree_to_tokens(xml::read_board_file(path)?, opts)
}

/// Condense, repair and encode an already parsed board.
pub fn tree_to_tokens(root: Node, opts: &ConvertOptions) -> Result<String, TokenizeError> {
    let mut condensed = template::condense(root, opts.flatten, &FlattenConfig::default())?;
    repair::fix_board_signals(&mut condensed, &ContourRepair)?;
    opts.grammar.tokenizer().encode(&condensed)
}

/// Decode a token string into a board the CAD tool can open. An empty
/// token string decodes to a bare `eagle` root.
pub fn tokens_to_board(tokens: &str, grammar: Grammar) -> Result<Node, TokenizeError> {
    let mut root = grammar.tokenizer().decode(tokens)?;
    if !root.children.is_empty() {
        template::expand(&mut root)?;
    }
    Ok(root)
}

/// Decode a token string and merge its geometry into a caller-provided board.
pub fn tokens_to_board_with_template(
    tokens: &str,
    grammar: Grammar,
    template: &Node,
) -> Result<Node, TokenizeError> {
    let decoded = grammar.tokenizer().decode(tokens)?;
    let mut root = template::merge_board_into_template(template, &decoded)?;
    template::expand(&mut root)?;
    Ok(root)
}
