use super::attributes::{ATTRIBUTE_GLYPHS, VALUE_GLYPHS};
use super::{StructuralGrammar, END_OF_BOARD, WORD_SEPARATOR};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Symbol → id table for a grammar, in assignment order. Built from the
/// static tables only, so identical for every board.
#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    entries: Vec<(String, u32)>,
}

impl Vocabulary {
    /// Ids start at `base`: the separator, digits, `.`, `-`, end marker,
    /// then tag symbols, attribute key glyphs and value glyphs.
    pub fn build(grammar: &dyn StructuralGrammar, base: u32) -> Self {
        let mut vocab = Self {
            entries: Vec::new(),
        };
        let mut next = base;
        let mut add = |symbol: String| {
            if vocab.get(&symbol).is_none() {
                vocab.entries.push((symbol, next));
                next += 1;
            }
        };

        add(WORD_SEPARATOR.to_string());
        for digit in '0'..='9' {
            add(digit.to_string());
        }
        add(".".to_string());
        add("-".to_string());
        add(END_OF_BOARD.to_string());

        for symbol in grammar.tag_symbols() {
            add(symbol.to_string());
        }
        for (_, glyph) in ATTRIBUTE_GLYPHS {
            add(glyph.to_string());
        }
        for (_, glyph) in VALUE_GLYPHS {
            add(glyph.to_string());
        }
        vocab
    }

    pub fn get(&self, symbol: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, id)| *id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.entries.iter().map(|(s, id)| (s.as_str(), *id))
    }
}

impl Serialize for Vocabulary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (symbol, id) in &self.entries {
            map.serialize_entry(symbol, id)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::Grammar;

    #[test]
    fn test_control_symbols_first() {
        let vocab = Vocabulary::build(Grammar::Compact.tokenizer().as_ref(), 1);
        assert_eq!(vocab.get(" "), Some(1));
        assert_eq!(vocab.get("0"), Some(2));
        assert_eq!(vocab.get("9"), Some(11));
        assert_eq!(vocab.get("."), Some(12));
        assert_eq!(vocab.get("-"), Some(13));
        assert_eq!(vocab.get("|"), Some(14));
        assert_eq!(vocab.get("E"), Some(15));
    }

    #[test]
    fn test_ids_are_contiguous() {
        for grammar in [Grammar::Compact, Grammar::Tree] {
            let vocab = Vocabulary::build(grammar.tokenizer().as_ref(), 10);
            let ids: Vec<u32> = vocab.iter().map(|(_, id)| id).collect();
            let expected: Vec<u32> = (10..10 + vocab.len() as u32).collect();
            assert_eq!(ids, expected);
        }
    }

    #[test]
    fn test_tree_vocabulary_layout() {
        let vocab = Vocabulary::build(Grammar::Tree.tokenizer().as_ref(), 1);
        assert_eq!(vocab.len(), 14 + 26 + 21 + 13);
        assert_eq!(vocab.get("W"), Some(15));
        assert_eq!(vocab.get("w"), Some(16));
        assert_eq!(vocab.get("Ӿ"), Some(41));
        assert_eq!(vocab.get("√"), Some(74));
    }

    #[test]
    fn test_vocabulary_is_reproducible() {
        let a = Vocabulary::build(Grammar::Compact.tokenizer().as_ref(), 1);
        let b = Vocabulary::build(Grammar::Compact.tokenizer().as_ref(), 1);
        assert_eq!(a, b);
        assert_eq!(a.len(), 14 + 16 + 21 + 13);
    }

    #[test]
    fn test_serializes_in_id_order() {
        let vocab = Vocabulary::build(Grammar::Compact.tokenizer().as_ref(), 1);
        let json = serde_json::to_string(&vocab).unwrap();
        assert!(json.starts_with(r#"{" ":1,"0":2,"1":3"#));
    }
}
