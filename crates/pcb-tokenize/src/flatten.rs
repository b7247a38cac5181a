use crate::error::TokenizeError;
use crate::geometry::{
    create, element_layer, is_copper, move_elements, rotate_elements, Rotation, KEPT_LAYERS,
    LAYER_BOTTOM, LAYER_BSTOP, LAYER_TOP, LAYER_TSTOP,
};
use crate::tree::{Attr, Node, Tag};
use log::debug;
use std::collections::HashMap;

/// Configuration for package flattening.
#[derive(Debug, Clone)]
pub struct FlattenConfig {
    /// Layers whose geometry survives; everything else is dropped.
    pub kept_layers: Vec<u32>,
    /// Outward clearance of stop-mask copies around pads.
    pub stop_offset: f64,
}

impl Default for FlattenConfig {
    fn default() -> Self {
        Self {
            kept_layers: KEPT_LAYERS.to_vec(),
            stop_offset: 0.1,
        }
    }
}

/// Library name → package name → package definition.
pub type LibraryCatalog = HashMap<String, HashMap<String, Node>>;

/// A placed package instance (`<element>`).
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub refdes: String,
    pub library: String,
    pub package: String,
    pub x: f64,
    pub y: f64,
    pub rotation: Rotation,
}

impl Placement {
    pub fn from_node(node: &Node) -> Result<Self, TokenizeError> {
        Ok(Self {
            refdes: node.required_attr(Attr::Name)?.to_string(),
            library: node.required_attr(Attr::Library)?.to_string(),
            package: node.required_attr(Attr::Package)?.to_string(),
            x: node.f64_attr(Attr::X)?,
            y: node.f64_attr(Attr::Y)?,
            rotation: Rotation::of(node)?,
        })
    }
}

const PLAIN_PATH: [Tag; 3] = [Tag::Drawing, Tag::Board, Tag::Plain];
const SIGNALS_PATH: [Tag; 3] = [Tag::Drawing, Tag::Board, Tag::Signals];

/// Fold every placed package into concrete primitives under `<plain>` and
/// `<signals>`. Any unresolved reference or unsupported primitive aborts the
/// whole operation.
pub fn flatten_board(root: &mut Node, config: &FlattenConfig) -> Result<(), TokenizeError> {
    let mut catalog = build_catalog(root)?;

    for packages in catalog.values_mut() {
        for package in packages.values_mut() {
            filter_child_elements(package, config)?;
            *package = transform_package(package, config)?;
        }
    }

    let placements = root
        .descendants_with_tag(Tag::Element)
        .into_iter()
        .map(Placement::from_node)
        .collect::<Result<Vec<_>, _>>()?;

    filter_child_elements(root.require_path_mut(&PLAIN_PATH)?, config)?;
    let signals = root.require_path_mut(&SIGNALS_PATH)?;
    for signal in signals.children.iter_mut().filter(|c| c.tag() == Tag::Signal) {
        filter_child_elements(signal, config)?;
    }

    for placement in &placements {
        let definition = resolve(&catalog, placement)?;
        // every instance works on its own copy of the definition
        let mut primitives = definition.children.clone();
        rotate_elements(&mut primitives, placement.rotation, (0.0, 0.0))?;
        move_elements(&mut primitives, placement.x, placement.y)?;
        debug!(
            "placed {} ({}/{}) with {} primitives",
            placement.refdes,
            placement.library,
            placement.package,
            primitives.len()
        );
        dispatch_elements(root, primitives, &placement.refdes)?;
    }

    Ok(())
}

/// Collect package definitions from every `<library>`. Libraries sharing a
/// name are merged; a package name repeated within one library is an error.
pub fn build_catalog(root: &Node) -> Result<LibraryCatalog, TokenizeError> {
    let mut catalog = LibraryCatalog::new();
    for library in root.descendants_with_tag(Tag::Library) {
        let library_name = library.required_attr(Attr::Name)?;
        let mut packages = HashMap::new();
        for package in library.descendants_with_tag(Tag::Package) {
            let package_name = package.required_attr(Attr::Name)?;
            if packages
                .insert(package_name.to_string(), package.clone())
                .is_some()
            {
                return Err(TokenizeError::DuplicatePackageDefinition(
                    package_name.to_string(),
                ));
            }
        }
        catalog
            .entry(library_name.to_string())
            .or_default()
            .extend(packages);
    }
    Ok(catalog)
}

fn resolve<'a>(catalog: &'a LibraryCatalog, placement: &Placement) -> Result<&'a Node, TokenizeError> {
    let packages = catalog
        .get(&placement.library)
        .ok_or_else(|| TokenizeError::UnresolvedReference {
            kind: "library".to_string(),
            name: placement.library.clone(),
        })?;
    packages
        .get(&placement.package)
        .ok_or_else(|| TokenizeError::UnresolvedReference {
            kind: "package".to_string(),
            name: format!("{}/{}", placement.library, placement.package),
        })
}

/// Drop children that carry no geometry of interest: annotation tags and
/// anything on a layer outside the kept set.
pub fn filter_child_elements(element: &mut Node, config: &FlattenConfig) -> Result<(), TokenizeError> {
    let mut kept = Vec::with_capacity(element.children.len());
    for child in std::mem::take(&mut element.children) {
        if matches!(
            child.tag(),
            Tag::Description | Tag::Text | Tag::Dimension | Tag::ContactRef
        ) {
            continue;
        }
        match element_layer(&child)? {
            Some(layer) if !config.kept_layers.contains(&layer) => continue,
            _ => kept.push(child),
        }
    }
    element.children = kept;
    Ok(())
}

/// Rewrite package-only primitives (`smd`, `pad`, rotated `rectangle`) into
/// the generic primitive set. Expects `filter_child_elements` to have run.
pub fn transform_package(package: &Node, config: &FlattenConfig) -> Result<Node, TokenizeError> {
    let mut transformed = Vec::new();
    for element in &package.children {
        match element.tag() {
            Tag::Wire | Tag::Polygon | Tag::Circle | Tag::Via | Tag::Hole => {
                transformed.push(element.clone())
            }
            Tag::Rectangle => transformed.push(transform_rectangle(element)?),
            Tag::Smd => transformed.extend(transform_smd(element, config)?),
            Tag::Pad => transformed.extend(transform_pad(element, config)?),
            _ => {
                return Err(TokenizeError::UnhandledElementKind(
                    element.name().to_string(),
                ))
            }
        }
    }

    let mut duplicate = package.clone();
    duplicate.children = transformed;
    Ok(duplicate)
}

/// Bake a rectangle's own rotation into its corners and drop `rot`.
pub fn transform_rectangle(rectangle: &Node) -> Result<Node, TokenizeError> {
    let rotation = Rotation::of(rectangle)?;
    if rotation.angle % 90 != 0 {
        return Err(TokenizeError::UnsupportedTransform(format!(
            "rectangle with rotation {} degrees",
            rotation.angle
        )));
    }

    let mut duplicate = rectangle.clone();
    duplicate.remove_attr(Attr::Rot);
    if rotation.mirror {
        crate::geometry::mirror(&mut duplicate)?;
    }
    if rotation.angle == 0 {
        return Ok(duplicate);
    }

    let (x1, y1) = (rectangle.f64_attr(Attr::X1)?, rectangle.f64_attr(Attr::Y1)?);
    let (x2, y2) = (rectangle.f64_attr(Attr::X2)?, rectangle.f64_attr(Attr::Y2)?);
    let center = ((x1 + x2) / 2.0, (y1 + y2) / 2.0);
    let (rx1, ry1) = rotation.rotate_point((x1, y1), center);
    let (rx2, ry2) = rotation.rotate_point((x2, y2), center);
    let layer = element_layer(&duplicate)?.unwrap_or(LAYER_TOP);
    Ok(create::rectangle(rx1, ry1, rx2, ry2, layer))
}

/// A surface-mount pad becomes a copper rectangle (or circle, for a fully
/// rounded square pad) plus an optional enlarged stop-mask copy.
pub fn transform_smd(smd: &Node, config: &FlattenConfig) -> Result<Vec<Node>, TokenizeError> {
    let cx = smd.f64_attr(Attr::X)?;
    let cy = smd.f64_attr(Attr::Y)?;
    let dx = smd.f64_attr(Attr::Dx)?;
    let dy = smd.f64_attr(Attr::Dy)?;
    let rotation = Rotation::of(smd)?;
    let roundness = smd.f64_attr_or(Attr::Roundness, 0.0)?;
    let layer = element_layer(smd)?.unwrap_or(LAYER_TOP);

    let round_pad = roundness == 100.0 && dx == dy;
    let x1 = (cx - dx / 2.0).min(cx + dx / 2.0);
    let x2 = (cx - dx / 2.0).max(cx + dx / 2.0);
    let y1 = (cy - dy / 2.0).min(cy + dy / 2.0);
    let y2 = (cy - dy / 2.0).max(cy + dy / 2.0);

    let mut elements = vec![if round_pad {
        create::circle(cx, cy, dx, dx / 2.0, layer)
    } else {
        create::rectangle(x1, y1, x2, y2, layer)
    }];

    if has_stop(smd) {
        let offset = config.stop_offset;
        let stop_layer = if layer == LAYER_BOTTOM {
            LAYER_BSTOP
        } else {
            LAYER_TSTOP
        };
        elements.push(if round_pad {
            create::circle(cx, cy, dx + offset, dx / 2.0 + offset / 2.0, stop_layer)
        } else {
            create::rectangle(x1 - offset, y1 - offset, x2 + offset, y2 + offset, stop_layer)
        });
    }

    rotate_elements(&mut elements, rotation, (cx, cy))?;
    Ok(elements)
}

/// A through-hole pad becomes copper, an optional stop-mask copy and a drill
/// hole, shaped after the pad's `shape`.
pub fn transform_pad(pad: &Node, config: &FlattenConfig) -> Result<Vec<Node>, TokenizeError> {
    let cx = pad.f64_attr(Attr::X)?;
    let cy = pad.f64_attr(Attr::Y)?;
    let drill = pad.f64_attr(Attr::Drill)?;
    let diameter = pad.f64_attr_or(Attr::Diameter, drill + 0.5)?;
    let shape = pad.attr(Attr::Shape).unwrap_or("round");
    let stop = has_stop(pad);
    let rotation = Rotation::of(pad)?;
    let offset = config.stop_offset;
    let stop_diameter = diameter + 2.0 * offset;

    let mut elements = Vec::new();
    match shape {
        "square" => {
            let (x1, x2) = (cx - diameter / 2.0, cx + diameter / 2.0);
            let (y1, y2) = (cy - diameter / 2.0, cy + diameter / 2.0);
            elements.push(create::rectangle(x1, y1, x2, y2, LAYER_TOP));
            if stop {
                elements.push(create::rectangle(
                    x1 - offset,
                    y1 - offset,
                    x2 + offset,
                    y2 + offset,
                    LAYER_TSTOP,
                ));
            }
            elements.push(create::hole(cx, cy, drill));
        }
        "round" => {
            // a ring of width d/2 at radius d/4 covers the full disc
            elements.push(create::circle(cx, cy, diameter / 2.0, diameter / 4.0, LAYER_TOP));
            if stop {
                elements.push(create::circle(
                    cx,
                    cy,
                    stop_diameter / 2.0,
                    stop_diameter / 4.0,
                    LAYER_TSTOP,
                ));
            }
            elements.push(create::hole(cx, cy, drill));
        }
        "octagon" => elements.push(create::via(cx, cy, drill, shape, stop)),
        "long" | "offset" => {
            let (x1, x2) = if shape == "long" {
                (cx - diameter / 2.0, cx + diameter / 2.0)
            } else {
                (cx, cx + diameter + drill / 2.0)
            };
            elements.push(create::wire(x1, cy, x2, cy, diameter, LAYER_TOP));
            if stop {
                elements.push(create::wire(x1, cy, x2, cy, stop_diameter, LAYER_TSTOP));
            }
            elements.push(create::hole(cx, cy, drill));
        }
        other => {
            return Err(TokenizeError::InvalidAttribute {
                tag: pad.name().to_string(),
                attribute: Attr::Shape.as_str().to_string(),
                value: other.to_string(),
            })
        }
    }

    rotate_elements(&mut elements, rotation, (cx, cy))?;
    Ok(elements)
}

fn has_stop(element: &Node) -> bool {
    element
        .attr(Attr::Stop)
        .map_or(true, |v| v.eq_ignore_ascii_case("yes"))
}

/// Copper wires and polygons belong to the net of their part.
pub fn belongs_to_signal(element: &Node) -> Result<bool, TokenizeError> {
    let copper = element_layer(element)?.is_some_and(is_copper);
    Ok(copper && matches!(element.tag(), Tag::Wire | Tag::Polygon))
}

/// Route placed primitives into a new `sig_<refdes>` signal or the shared
/// `<plain>`. A signal that ends up empty is not emitted.
pub fn dispatch_elements(
    root: &mut Node,
    primitives: Vec<Node>,
    refdes: &str,
) -> Result<(), TokenizeError> {
    let mut signal = Node::new(Tag::Signal).with_attr(Attr::Name, format!("sig_{refdes}"));
    let mut plain_elements = Vec::new();
    for element in primitives {
        if belongs_to_signal(&element)? {
            signal.push(element);
        } else {
            plain_elements.push(element);
        }
    }

    root.require_path_mut(&PLAIN_PATH)?
        .children
        .extend(plain_elements);
    if !signal.children.is_empty() {
        root.require_path_mut(&SIGNALS_PATH)?.push(signal);
    }
    Ok(())
}
