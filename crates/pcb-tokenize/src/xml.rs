//! Board document I/O: Eagle XML to and from the in-memory tree.

use crate::error::TokenizeError;
use crate::tree::{Node, Tag};
use flate2::read::GzDecoder;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Cursor, Read};
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Parse an Eagle `.brd` document into a tree rooted at its document element.
pub fn parse(data: &[u8]) -> Result<Node, TokenizeError> {
    let text = std::str::from_utf8(data)
        .map_err(|e| TokenizeError::ParseError(format!("Invalid UTF-8: {e}")))?;
    let parse_opts = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    let doc = roxmltree::Document::parse_with_options(text, parse_opts)
        .map_err(|e| TokenizeError::ParseError(format!("XML parse error: {e}")))?;
    Ok(convert(doc.root_element()))
}

fn convert(element: roxmltree::Node) -> Node {
    let mut node = Node::named(element.tag_name().name());
    for attr in element.attributes() {
        node.set_raw_attr(attr.name(), attr.value());
    }

    let mut text = String::new();
    for child in element.children() {
        if child.is_element() {
            node.push(convert(child));
        } else if child.is_text() {
            text.push_str(child.text().unwrap_or_default());
        }
    }
    // whitespace between elements is formatting, not content
    if !text.trim().is_empty() {
        node.text = Some(text);
    }
    node
}

/// Transparently inflate gzip-compressed documents.
pub fn decompress(data: Vec<u8>) -> Result<Vec<u8>, TokenizeError> {
    if !data.starts_with(&GZIP_MAGIC) {
        return Ok(data);
    }
    let mut inflated = Vec::new();
    GzDecoder::new(data.as_slice()).read_to_end(&mut inflated)?;
    Ok(inflated)
}

pub fn read_board_file(path: &Path) -> Result<Node, TokenizeError> {
    let data = decompress(std::fs::read(path)?)?;
    parse(&data)
}

fn write_error(e: impl std::fmt::Display) -> TokenizeError {
    TokenizeError::ParseError(format!("XML write error: {e}"))
}

/// Serialize a tree as an indented XML document.
pub fn serialize(root: &Node) -> Result<Vec<u8>, TokenizeError> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(write_error)?;
    if root.tag() == Tag::Eagle {
        writer
            .write_event(Event::DocType(BytesText::from_escaped(
                r#"eagle SYSTEM "eagle.dtd""#,
            )))
            .map_err(write_error)?;
    }
    write_element(&mut writer, root)?;

    let mut out = writer.into_inner().into_inner();
    out.push(b'\n');
    Ok(out)
}

fn write_element(writer: &mut Writer<Cursor<Vec<u8>>>, node: &Node) -> Result<(), TokenizeError> {
    let mut start = BytesStart::new(node.name());
    for (key, value) in node.attributes() {
        start.push_attribute((key, value));
    }

    if node.children.is_empty() && node.text.is_none() {
        return writer.write_event(Event::Empty(start)).map_err(write_error);
    }

    writer.write_event(Event::Start(start)).map_err(write_error)?;
    if let Some(text) = &node.text {
        writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(write_error)?;
    }
    for child in &node.children {
        write_element(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(node.name())))
        .map_err(write_error)
}

pub fn write_board_file(path: &Path, root: &Node) -> Result<(), TokenizeError> {
    std::fs::write(path, serialize(root)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Attr;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const BOARD: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE eagle SYSTEM "eagle.dtd">
<eagle version="9.6.2">
  <drawing>
    <settings><setting alwaysvectorfont="no"/></settings>
    <board>
      <plain>
        <wire x1="0" y1="0" x2="10" y2="0" width="0.2" layer="20"/>
        <text x="1" y="1" size="1" layer="25">R&amp;D</text>
      </plain>
      <signals/>
    </board>
  </drawing>
</eagle>"#;

    #[test]
    fn test_parse_keeps_unknown_tags_and_text() {
        let root = parse(BOARD.as_bytes()).unwrap();
        assert_eq!(root.tag(), Tag::Eagle);
        assert_eq!(root.raw_attr("version"), Some("9.6.2"));

        let drawing = &root.children[0];
        assert_eq!(drawing.children[0].name(), "settings");
        assert_eq!(drawing.children[0].tag(), Tag::Other);
        assert_eq!(drawing.children[0].children[0].raw_attr("alwaysvectorfont"), Some("no"));

        let plain = root.find_path(&[Tag::Board, Tag::Plain]).unwrap();
        assert_eq!(plain.children[0].attr(Attr::X2), Some("10"));
        assert_eq!(plain.children[1].text.as_deref(), Some("R&D"));
        assert!(plain.text.is_none());
    }

    #[test]
    fn test_serialize_then_parse() {
        let root = parse(BOARD.as_bytes()).unwrap();
        let bytes = serialize(&root).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#));
        assert!(text.contains("<!DOCTYPE eagle SYSTEM \"eagle.dtd\">"));
        assert!(text.contains("<signals/>"));
        assert!(text.contains("R&amp;D"));
        assert_eq!(parse(&bytes).unwrap(), root);
    }

    #[test]
    fn test_gzip_input() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(BOARD.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();
        let data = decompress(compressed).unwrap();
        assert_eq!(parse(&data).unwrap(), parse(BOARD.as_bytes()).unwrap());
        assert_eq!(decompress(b"<eagle/>".to_vec()).unwrap(), b"<eagle/>");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse(&[0xff, 0xfe]),
            Err(TokenizeError::ParseError(_))
        ));
        assert!(matches!(
            parse(b"<eagle><drawing></eagle>"),
            Err(TokenizeError::ParseError(_))
        ));
    }
}
