use approx::assert_abs_diff_eq;
use pcb_tokenize::error::TokenizeError;
use pcb_tokenize::repair::signed_area;
use pcb_tokenize::tree::{Attr, Node, Tag};
use pcb_tokenize::{
    board_to_tokens, template, tokens_to_board, tokens_to_board_with_template, tree_to_tokens,
    xml, ConvertOptions, Grammar,
};

const BOARD: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE eagle SYSTEM "eagle.dtd">
<eagle version="9.6.2">
  <drawing>
    <settings><setting alwaysvectorfont="no"/></settings>
    <layers><layer number="1" name="Top" color="4" fill="1" visible="yes" active="yes"/></layers>
    <board>
      <plain>
        <wire x1="0" y1="0" x2="20" y2="0" width="0" layer="20"/>
        <text x="1" y="1" size="1.27" layer="25">LOGO</text>
        <hole x="18" y="2" drill="3.2"/>
      </plain>
      <libraries>
        <library name="passives">
          <packages>
            <package name="R0805">
              <description>Chip resistor</description>
              <smd name="1" x="-1" y="0" dx="1.2" dy="1.4" layer="1"/>
              <smd name="2" x="1" y="0" dx="1.2" dy="1.4" layer="1"/>
              <wire x1="-0.4" y1="0.6" x2="0.4" y2="0.6" width="0.1" layer="21"/>
              <text x="0" y="1" size="1" layer="25">&gt;NAME</text>
            </package>
          </packages>
        </library>
      </libraries>
      <elements>
        <element name="R1" library="passives" package="R0805" value="10k" x="5" y="5"/>
        <element name="R2" library="passives" package="R0805" value="10k" x="10" y="5" rot="MR90"/>
      </elements>
      <signals>
        <signal name="GND">
          <contactref element="R1" pad="1"/>
          <polygon width="0.2" layer="1">
            <vertex x="0" y="0"/>
            <vertex x="2" y="2"/>
            <vertex x="2" y="0"/>
            <vertex x="0" y="2"/>
          </polygon>
          <wire x1="4" y1="5" x2="9" y2="5" width="0.25" layer="1"/>
        </signal>
      </signals>
    </board>
  </drawing>
</eagle>"#;

fn flattened(grammar: Grammar) -> ConvertOptions {
    ConvertOptions {
        grammar,
        flatten: true,
    }
}

fn board_path(root: &Node, last: Tag) -> &Node {
    root.find_path(&[Tag::Drawing, Tag::Board, last]).unwrap()
}

fn layer_count(nodes: &[&Node], layer: &str) -> usize {
    nodes
        .iter()
        .filter(|n| n.attr(Attr::Layer) == Some(layer))
        .count()
}

#[test]
fn test_grammars_decode_to_the_same_board() {
    let compact = board_to_tokens(BOARD.as_bytes(), &flattened(Grammar::Compact)).unwrap();
    let tree = board_to_tokens(BOARD.as_bytes(), &flattened(Grammar::Tree)).unwrap();
    assert!(compact.ends_with('|'));
    assert!(!compact.contains('\n'));
    assert!(compact.len() < tree.len());

    let from_compact = tokens_to_board(&compact, Grammar::Compact).unwrap();
    let from_tree = tokens_to_board(&tree, Grammar::Tree).unwrap();
    assert_eq!(from_compact, from_tree);
}

#[test]
fn test_flattened_packages_land_on_their_side() {
    let tokens = board_to_tokens(BOARD.as_bytes(), &flattened(Grammar::Compact)).unwrap();
    let root = tokens_to_board(&tokens, Grammar::Compact).unwrap();

    let plain = board_path(&root, Tag::Plain);
    assert_eq!(plain.descendants_with_tag(Tag::Text).len(), 0);
    assert_eq!(plain.descendants_with_tag(Tag::Hole).len(), 1);

    let rectangles = plain.descendants_with_tag(Tag::Rectangle);
    assert_eq!(rectangles.len(), 8);
    assert_eq!(layer_count(&rectangles, "1"), 2);
    assert_eq!(layer_count(&rectangles, "29"), 2);
    assert_eq!(layer_count(&rectangles, "16"), 2);
    assert_eq!(layer_count(&rectangles, "30"), 2);

    // the silkscreen wire of the package is on a dropped layer
    let wires = plain.descendants_with_tag(Tag::Wire);
    assert_eq!(wires.len(), 1);
    assert_eq!(wires[0].attr(Attr::Layer), Some("20"));
}

#[test]
fn test_self_intersecting_signal_polygon_is_split() {
    let tokens = board_to_tokens(BOARD.as_bytes(), &flattened(Grammar::Tree)).unwrap();
    let root = tokens_to_board(&tokens, Grammar::Tree).unwrap();

    let signals = board_path(&root, Tag::Signals);
    assert_eq!(signals.children.len(), 1);
    let signal = &signals.children[0];
    assert_eq!(signal.attr(Attr::Name), Some("sig0"));
    assert_eq!(signal.descendants_with_tag(Tag::ContactRef).len(), 0);
    assert_eq!(signal.children[0].tag(), Tag::Wire);

    let polygons = signal.descendants_with_tag(Tag::Polygon);
    assert_eq!(polygons.len(), 2);
    for polygon in polygons {
        assert_eq!(polygon.attr(Attr::Width), Some("0.2"));
        assert_eq!(polygon.attr(Attr::Rank), Some("1"));
        let ring: Vec<(f64, f64)> = polygon
            .children_with_tag(Tag::Vertex)
            .map(|v| {
                (
                    v.f64_attr(Attr::X).unwrap(),
                    v.f64_attr(Attr::Y).unwrap(),
                )
            })
            .collect();
        assert_eq!(ring.len(), 3);
        assert_abs_diff_eq!(signed_area(&ring), 1.0, epsilon = 1e-9);
    }
}

#[test]
fn test_decoded_board_is_complete_and_reencodes_identically() {
    for grammar in [Grammar::Compact, Grammar::Tree] {
        let opts = ConvertOptions {
            grammar,
            flatten: false,
        };
        let tokens = board_to_tokens(BOARD.as_bytes(), &opts).unwrap();
        let root = tokens_to_board(&tokens, grammar).unwrap();

        let drawing = &root.children[0];
        let names: Vec<&str> = drawing.children.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["layers", "board"]);
        let board: Vec<&str> = drawing.children[1]
            .children
            .iter()
            .map(|c| c.name())
            .collect();
        assert_eq!(board, vec!["plain", "libraries", "elements", "signals"]);

        // the written document parses back to the same tree
        let bytes = xml::serialize(&root).unwrap();
        let reparsed = xml::parse(&bytes).unwrap();
        assert_eq!(reparsed, root);

        assert_eq!(tree_to_tokens(reparsed, &opts).unwrap(), tokens);
    }
}

#[test]
fn test_decode_into_custom_template() {
    let tokens = "D B N H Ӿ1 Ұ2 Ḓ0.8 G S w Ẋ0 Ẏ0 Ẍ1 Ῡ0 Ẁ0.2 Ḽ1|";
    let base = template::empty_board_template().unwrap();
    let root = tokens_to_board_with_template(tokens, Grammar::Compact, &base).unwrap();

    let drawing = &root.children[0];
    assert_eq!(drawing.children[0].name(), "settings");
    assert_eq!(board_path(&root, Tag::Plain).children.len(), 1);
    let wires = board_path(&root, Tag::Signals).descendants_with_tag(Tag::Wire);
    assert_eq!(wires[0].attr(Attr::Cap), Some("round"));
}

#[test]
fn test_pipeline_errors() {
    assert!(matches!(
        tokens_to_board("B N v Ӿ0|", Grammar::Compact),
        Err(TokenizeError::IllegalTagForPhase { .. })
    ));
    assert!(matches!(
        tokens_to_board("D B N H Ӿ1 Ұ2 Ḓ0.8 h n", Grammar::Tree),
        Err(TokenizeError::UnclosedElement(tag)) if tag == "board"
    ));

    let broken = BOARD.replace(r#"library="passives" package="R0805" value="10k" x="5""#, r#"library="actives" package="R0805" value="10k" x="5""#);
    assert!(matches!(
        board_to_tokens(broken.as_bytes(), &flattened(Grammar::Compact)),
        Err(TokenizeError::UnresolvedReference { kind, name }) if kind == "library" && name == "actives"
    ));
    assert!(matches!(
        board_to_tokens(b"not xml", &ConvertOptions::default()),
        Err(TokenizeError::ParseError(_))
    ));
}

#[test]
fn test_attribute_values_with_separators() {
    let padded = BOARD.replace(r#"drill="3.2""#, r#"drill=" 3.2 ""#);
    let broken = BOARD.replace(r#"drill="3.2""#, r#"drill="3|2""#);
    for grammar in [Grammar::Compact, Grammar::Tree] {
        let opts = ConvertOptions {
            grammar,
            flatten: false,
        };
        let tokens = board_to_tokens(padded.as_bytes(), &opts).unwrap();
        assert_eq!(tokens, board_to_tokens(BOARD.as_bytes(), &opts).unwrap());
        let root = tokens_to_board(&tokens, grammar).unwrap();
        let holes = board_path(&root, Tag::Plain).descendants_with_tag(Tag::Hole);
        assert_eq!(holes[0].attr(Attr::Drill), Some("3.2"));

        assert!(matches!(
            board_to_tokens(broken.as_bytes(), &opts),
            Err(TokenizeError::InvalidAttribute { attribute, .. }) if attribute == "drill"
        ));
    }
}

#[test]
fn test_octagon_pads_need_the_tree_grammar() {
    let board = BOARD.replace(
        r#"<smd name="2" x="1" y="0" dx="1.2" dy="1.4" layer="1"/>"#,
        r#"<pad name="2" x="1" y="0" drill="0.8" shape="octagon"/>"#,
    );
    assert!(matches!(
        board_to_tokens(board.as_bytes(), &flattened(Grammar::Compact)),
        Err(TokenizeError::IllegalTagForPhase { tag, phase }) if tag == "via" && phase == "Plains"
    ));

    let tokens = board_to_tokens(board.as_bytes(), &flattened(Grammar::Tree)).unwrap();
    let root = tokens_to_board(&tokens, Grammar::Tree).unwrap();
    let vias = board_path(&root, Tag::Plain).descendants_with_tag(Tag::Via);
    assert_eq!(vias.len(), 2);
    assert_eq!(vias[0].attr(Attr::Shape), Some("octagon"));
}

#[test]
fn test_empty_token_string_decodes_to_bare_root() {
    for grammar in [Grammar::Compact, Grammar::Tree] {
        for tokens in ["", "|", "  \n"] {
            let root = tokens_to_board(tokens, grammar).unwrap();
            assert_eq!(root.name(), "eagle");
            assert!(root.children.is_empty());
        }
    }
}
