use crate::error::TokenizeError;

// ─── Tags ────────────────────────────────────────────────────────────

/// Element tags the converter understands. Anything else in a board
/// document is carried through as `Other` with its raw name kept on the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Eagle,
    Drawing,
    Board,
    Plain,
    Signals,
    Signal,
    Wire,
    Polygon,
    Vertex,
    Circle,
    Rectangle,
    Hole,
    Via,
    Element,
    Library,
    Package,
    Smd,
    Pad,
    Text,
    Dimension,
    ContactRef,
    Description,
    Other,
}

impl Tag {
    pub fn from_name(name: &str) -> Tag {
        match name {
            "eagle" => Tag::Eagle,
            "drawing" => Tag::Drawing,
            "board" => Tag::Board,
            "plain" => Tag::Plain,
            "signals" => Tag::Signals,
            "signal" => Tag::Signal,
            "wire" => Tag::Wire,
            "polygon" => Tag::Polygon,
            "vertex" => Tag::Vertex,
            "circle" => Tag::Circle,
            "rectangle" => Tag::Rectangle,
            "hole" => Tag::Hole,
            "via" => Tag::Via,
            "element" => Tag::Element,
            "library" => Tag::Library,
            "package" => Tag::Package,
            "smd" => Tag::Smd,
            "pad" => Tag::Pad,
            "text" => Tag::Text,
            "dimension" => Tag::Dimension,
            "contactref" => Tag::ContactRef,
            "description" => Tag::Description,
            _ => Tag::Other,
        }
    }

    /// Element name as written in the board document. `Other` has no fixed name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Eagle => "eagle",
            Tag::Drawing => "drawing",
            Tag::Board => "board",
            Tag::Plain => "plain",
            Tag::Signals => "signals",
            Tag::Signal => "signal",
            Tag::Wire => "wire",
            Tag::Polygon => "polygon",
            Tag::Vertex => "vertex",
            Tag::Circle => "circle",
            Tag::Rectangle => "rectangle",
            Tag::Hole => "hole",
            Tag::Via => "via",
            Tag::Element => "element",
            Tag::Library => "library",
            Tag::Package => "package",
            Tag::Smd => "smd",
            Tag::Pad => "pad",
            Tag::Text => "text",
            Tag::Dimension => "dimension",
            Tag::ContactRef => "contactref",
            Tag::Description => "description",
            Tag::Other => "",
        }
    }

    /// Structural nesting depth used by the compact grammar: 0 for the
    /// document root, growing towards the leaves. `None` for tags that
    /// never appear in a token stream.
    pub fn nesting_depth(&self) -> Option<u8> {
        match self {
            Tag::Eagle => Some(0),
            Tag::Drawing => Some(1),
            Tag::Board => Some(2),
            Tag::Plain | Tag::Signals => Some(3),
            Tag::Signal => Some(4),
            Tag::Wire | Tag::Polygon | Tag::Circle | Tag::Rectangle | Tag::Hole | Tag::Via => {
                Some(5)
            }
            Tag::Vertex => Some(6),
            _ => None,
        }
    }
}

// ─── Attributes ──────────────────────────────────────────────────────

/// Attribute names the converter reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attr {
    X,
    Y,
    X1,
    Y1,
    X2,
    Y2,
    Dx,
    Dy,
    Radius,
    Drill,
    Diameter,
    Layer,
    Width,
    Isolate,
    Spacing,
    Rot,
    Pour,
    Stop,
    Name,
    Roundness,
    Cap,
    Curve,
    Style,
    Extent,
    Rank,
    Shape,
    Library,
    Package,
    AlwaysStop,
    Orphans,
    Thermals,
    Class,
}

impl Attr {
    pub fn as_str(&self) -> &'static str {
        match self {
            Attr::X => "x",
            Attr::Y => "y",
            Attr::X1 => "x1",
            Attr::Y1 => "y1",
            Attr::X2 => "x2",
            Attr::Y2 => "y2",
            Attr::Dx => "dx",
            Attr::Dy => "dy",
            Attr::Radius => "radius",
            Attr::Drill => "drill",
            Attr::Diameter => "diameter",
            Attr::Layer => "layer",
            Attr::Width => "width",
            Attr::Isolate => "isolate",
            Attr::Spacing => "spacing",
            Attr::Rot => "rot",
            Attr::Pour => "pour",
            Attr::Stop => "stop",
            Attr::Name => "name",
            Attr::Roundness => "roundness",
            Attr::Cap => "cap",
            Attr::Curve => "curve",
            Attr::Style => "style",
            Attr::Extent => "extent",
            Attr::Rank => "rank",
            Attr::Shape => "shape",
            Attr::Library => "library",
            Attr::Package => "package",
            Attr::AlwaysStop => "alwaysstop",
            Attr::Orphans => "orphans",
            Attr::Thermals => "thermals",
            Attr::Class => "class",
        }
    }
}

// ─── Node ────────────────────────────────────────────────────────────

/// One element of a board tree. A node exclusively owns its children;
/// copying a subtree is always a deep clone.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    tag: Tag,
    name: String,
    attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
    pub text: Option<String>,
}

impl Node {
    /// Node for a known element. Unknown names go through [`Node::named`],
    /// which keeps them verbatim.
    pub fn new(tag: Tag) -> Self {
        debug_assert!(tag != Tag::Other, "Node::new needs a known tag, use Node::named");
        Self {
            tag,
            name: tag.as_str().to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
            text: None,
        }
    }

    /// Build a node from a raw element name, keeping unknown names verbatim.
    pub fn named(name: &str) -> Self {
        Self {
            tag: Tag::from_name(name),
            name: name.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
            text: None,
        }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_attr(mut self, attr: Attr, value: impl Into<String>) -> Self {
        self.set_attr(attr, value);
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, attr: Attr) -> Option<&str> {
        self.raw_attr(attr.as_str())
    }

    pub fn raw_attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, attr: Attr) -> bool {
        self.attr(attr).is_some()
    }

    pub fn set_attr(&mut self, attr: Attr, value: impl Into<String>) {
        self.set_raw_attr(attr.as_str(), value);
    }

    /// Set an attribute by name. Existing keys keep their position.
    pub fn set_raw_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, attr: Attr) -> Option<String> {
        let pos = self.attributes.iter().position(|(k, _)| k == attr.as_str())?;
        Some(self.attributes.remove(pos).1)
    }

    /// Attributes in document order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Required attribute; absent means `MissingRequiredAttribute`.
    pub fn required_attr(&self, attr: Attr) -> Result<&str, TokenizeError> {
        self.attr(attr)
            .ok_or_else(|| TokenizeError::MissingRequiredAttribute {
                tag: self.name.clone(),
                attribute: attr.as_str().to_string(),
            })
    }

    /// Required numeric attribute.
    pub fn f64_attr(&self, attr: Attr) -> Result<f64, TokenizeError> {
        let raw = self.required_attr(attr)?;
        self.parse_number(attr, raw)
    }

    /// Optional numeric attribute with a fallback.
    pub fn f64_attr_or(&self, attr: Attr, default: f64) -> Result<f64, TokenizeError> {
        match self.attr(attr) {
            Some(raw) => self.parse_number(attr, raw),
            None => Ok(default),
        }
    }

    fn parse_number(&self, attr: Attr, raw: &str) -> Result<f64, TokenizeError> {
        raw.trim()
            .parse()
            .map_err(|_| TokenizeError::InvalidAttribute {
                tag: self.name.clone(),
                attribute: attr.as_str().to_string(),
                value: raw.to_string(),
            })
    }

    pub fn push(&mut self, child: Node) {
        self.children.push(child);
    }

    pub fn children_with_tag(&self, tag: Tag) -> impl Iterator<Item = &Node> {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// All descendants (not including `self`) in document order.
    pub fn descendants(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        let mut stack: Vec<&Node> = self.children.iter().rev().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    pub fn descendants_with_tag(&self, tag: Tag) -> Vec<&Node> {
        self.descendants()
            .into_iter()
            .filter(|n| n.tag == tag)
            .collect()
    }

    /// First descendant matching a tag path, e.g. `[Drawing, Board, Plain]`
    /// finds the first `plain` under a `board` under any `drawing`.
    pub fn find_path(&self, path: &[Tag]) -> Option<&Node> {
        self.children
            .iter()
            .find_map(|c| c.follow(path).or_else(|| c.find_path(path)))
    }

    pub fn find_path_mut(&mut self, path: &[Tag]) -> Option<&mut Node> {
        let idx = self
            .children
            .iter()
            .position(|c| c.follow(path).is_some() || c.find_path(path).is_some())?;
        let child = &mut self.children[idx];
        if child.follow(path).is_some() {
            child.follow_mut(path)
        } else {
            child.find_path_mut(path)
        }
    }

    /// Like `find_path`, but a missing container is an error.
    pub fn require_path_mut(&mut self, path: &[Tag]) -> Result<&mut Node, TokenizeError> {
        self.find_path_mut(path)
            .ok_or_else(|| TokenizeError::MissingElement(path_string(path)))
    }

    fn follow(&self, path: &[Tag]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        if self.tag != *first {
            return None;
        }
        if rest.is_empty() {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.follow(rest))
    }

    fn follow_mut(&mut self, path: &[Tag]) -> Option<&mut Node> {
        let (first, rest) = path.split_first()?;
        if self.tag != *first {
            return None;
        }
        if rest.is_empty() {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.follow_mut(rest))
    }

    /// Visit `self` and every descendant, parents before children.
    pub fn visit_mut(&mut self, f: &mut impl FnMut(&mut Node)) {
        f(self);
        for child in &mut self.children {
            child.visit_mut(f);
        }
    }
}

pub(crate) fn path_string(path: &[Tag]) -> String {
    path.iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join("/")
}
