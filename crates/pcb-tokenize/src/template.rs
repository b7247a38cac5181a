//! Board condensation and expansion around fixed document skeletons.

use crate::cleanup::{add_default_attributes, cleanup_tags};
use crate::error::TokenizeError;
use crate::flatten::{flatten_board, FlattenConfig};
use crate::tree::{Node, Tag};
use crate::xml;

/// `eagle > drawing > board > {plain, signals}` and nothing else.
pub const ML_EMPTY_BOARD: &str = include_str!("../templates/ml_empty_board.brd");
/// An empty board as the CAD tool writes it, including the layer table.
pub const EMPTY_BOARD: &str = include_str!("../templates/empty_board.brd");

const PLAIN_PATH: [Tag; 3] = [Tag::Drawing, Tag::Board, Tag::Plain];
const SIGNALS_PATH: [Tag; 3] = [Tag::Drawing, Tag::Board, Tag::Signals];

pub fn ml_template() -> Result<Node, TokenizeError> {
    xml::parse(ML_EMPTY_BOARD.as_bytes())
}

pub fn empty_board_template() -> Result<Node, TokenizeError> {
    xml::parse(EMPTY_BOARD.as_bytes())
}

/// Copy of `template` with its `plain`/`signals` replaced by the given ones.
pub fn merge_into_template(
    template: &Node,
    plain: Option<Node>,
    signals: Option<Node>,
) -> Result<Node, TokenizeError> {
    let mut merged = template.clone();
    let template_plain = merged.require_path_mut(&PLAIN_PATH)?;
    if let Some(plain) = plain {
        *template_plain = plain;
    }
    let template_signals = merged.require_path_mut(&SIGNALS_PATH)?;
    if let Some(signals) = signals {
        *template_signals = signals;
    }
    Ok(merged)
}

/// Merge a board's `plain` and `signals` into a copy of `template`.
pub fn merge_board_into_template(template: &Node, board: &Node) -> Result<Node, TokenizeError> {
    merge_into_template(
        template,
        board.find_path(&PLAIN_PATH).cloned(),
        board.find_path(&SIGNALS_PATH).cloned(),
    )
}

/// Reduce a full board to the geometry the tokenizer understands.
pub fn condense(
    mut board: Node,
    flatten: bool,
    config: &FlattenConfig,
) -> Result<Node, TokenizeError> {
    cleanup_tags(&mut board, Tag::Plain);
    cleanup_tags(&mut board, Tag::Signal);
    if flatten {
        flatten_board(&mut board, config)?;
    }
    merge_board_into_template(&ml_template()?, &board)
}

fn has_child(node: &Node, name: &str) -> bool {
    node.children.iter().any(|c| c.name() == name)
}

/// Add the containers a condensed board lacks so that the CAD tool and
/// renderers can open it.
pub fn expand(root: &mut Node) -> Result<(), TokenizeError> {
    let template = empty_board_template()?;
    let drawing = root.require_path_mut(&[Tag::Drawing])?;

    if !has_child(drawing, "layers") {
        let layers = template
            .find_path(&[Tag::Drawing])
            .and_then(|d| d.children.iter().find(|c| c.name() == "layers"))
            .cloned()
            .ok_or_else(|| TokenizeError::MissingElement("drawing/layers".to_string()))?;
        let at = drawing
            .children
            .iter()
            .position(|c| c.tag() == Tag::Board)
            .unwrap_or(drawing.children.len());
        drawing.children.insert(at, layers);
    }

    let board = drawing
        .children
        .iter_mut()
        .find(|c| c.tag() == Tag::Board)
        .ok_or_else(|| TokenizeError::MissingElement("drawing/board".to_string()))?;
    if !has_child(board, "libraries") {
        let after_plain = board
            .children
            .iter()
            .position(|c| c.tag() == Tag::Plain)
            .map_or(0, |i| i + 1);
        board.children.insert(after_plain, Node::named("libraries"));
    }
    if !has_child(board, "elements") {
        let before_signals = board
            .children
            .iter()
            .position(|c| c.tag() == Tag::Signals)
            .unwrap_or(board.children.len());
        board.children.insert(before_signals, Node::named("elements"));
    }

    add_default_attributes(root);
    Ok(())
}
