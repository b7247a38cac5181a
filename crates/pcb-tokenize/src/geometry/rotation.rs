use super::round_coord;
use crate::error::TokenizeError;
use crate::tree::{Attr, Node};

/// Rotation of a placed element: a counter-clockwise angle in whole degrees
/// and a mirror flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rotation {
    /// Always within [0, 360).
    pub angle: u32,
    pub mirror: bool,
}

impl Rotation {
    pub const IDENTITY: Rotation = Rotation {
        angle: 0,
        mirror: false,
    };

    pub fn new(angle: i32, mirror: bool) -> Self {
        Self {
            angle: angle.rem_euclid(360) as u32,
            mirror,
        }
    }

    /// Parse a rotation string such as `R90`, `MR180` or `SR0`.
    ///
    /// `S` (spin) is accepted and ignored; it has no effect on geometry.
    /// `R` only marks the presence of an angle and older files may omit it.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut rest = raw.trim().replace('S', "");
        let mirror = rest.contains('M');
        if mirror {
            rest = rest.replace('M', "");
        }
        let rest = rest.replace('R', "");
        let angle: i32 = rest.trim().parse().ok()?;
        Some(Self::new(angle, mirror))
    }

    /// Rotation carried by a node's `rot` attribute; absent means identity.
    pub fn of(node: &Node) -> Result<Self, TokenizeError> {
        match node.attr(Attr::Rot) {
            None => Ok(Self::IDENTITY),
            Some(raw) => Self::parse(raw).ok_or_else(|| TokenizeError::InvalidAttribute {
                tag: node.name().to_string(),
                attribute: Attr::Rot.as_str().to_string(),
                value: raw.to_string(),
            }),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.angle == 0 && !self.mirror
    }

    /// Rotate a point about `origin`. A mirrored rotation turns clockwise
    /// (angle `360 - a`) and does not reflect coordinates.
    pub fn rotate_point(&self, point: (f64, f64), origin: (f64, f64)) -> (f64, f64) {
        let (ox, oy) = origin;
        let (px, py) = point;
        let angle = if self.mirror {
            360 - self.angle
        } else {
            self.angle
        };
        let radians = (angle as f64).to_radians();
        let (sin, cos) = radians.sin_cos();

        let rx = ox + cos * (px - ox) - sin * (py - oy);
        let ry = oy + sin * (px - ox) + cos * (py - oy);
        (round_coord(rx), round_coord(ry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Tag;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_parse_rotation_strings() {
        assert_eq!(Rotation::parse("R90"), Some(Rotation::new(90, false)));
        assert_eq!(Rotation::parse("MR180"), Some(Rotation::new(180, true)));
        assert_eq!(Rotation::parse("SR270"), Some(Rotation::new(270, false)));
        assert_eq!(Rotation::parse("SMR45"), Some(Rotation::new(45, true)));
        assert_eq!(Rotation::parse("90"), Some(Rotation::new(90, false)));
        assert_eq!(Rotation::parse("R360"), Some(Rotation::IDENTITY));
        assert_eq!(Rotation::parse("R-90"), Some(Rotation::new(270, false)));
        assert_eq!(Rotation::parse("R22.5"), None);
    }

    #[test]
    fn test_rotation_of_node() {
        let node = Node::new(Tag::Element).with_attr(Attr::Rot, "MR90");
        assert_eq!(Rotation::of(&node).unwrap(), Rotation::new(90, true));
        assert_eq!(
            Rotation::of(&Node::new(Tag::Element)).unwrap(),
            Rotation::IDENTITY
        );
        let bad = Node::new(Tag::Element).with_attr(Attr::Rot, "Rxx");
        assert!(matches!(
            Rotation::of(&bad),
            Err(TokenizeError::InvalidAttribute { .. })
        ));
    }

    #[test]
    fn test_identity_rotation() {
        let (x, y) = Rotation::IDENTITY.rotate_point((1.25, -3.5), (10.0, 10.0));
        assert_abs_diff_eq!(x, 1.25);
        assert_abs_diff_eq!(y, -3.5);
    }

    #[test]
    fn test_rotate_ccw() {
        let (x, y) = Rotation::new(90, false).rotate_point((1.0, 0.0), (0.0, 0.0));
        assert_abs_diff_eq!(x, 0.0);
        assert_abs_diff_eq!(y, 1.0);

        let (x, y) = Rotation::new(180, false).rotate_point((2.0, 1.0), (1.0, 1.0));
        assert_abs_diff_eq!(x, 0.0);
        assert_abs_diff_eq!(y, 1.0);
    }

    #[test]
    fn test_mirrored_rotation_turns_clockwise() {
        // mirror flips the direction, coordinates are not reflected
        let (x, y) = Rotation::new(90, true).rotate_point((1.0, 0.0), (0.0, 0.0));
        assert_abs_diff_eq!(x, 0.0);
        assert_abs_diff_eq!(y, -1.0);

        let (x, y) = Rotation::new(0, true).rotate_point((1.0, 2.0), (0.0, 0.0));
        assert_abs_diff_eq!(x, 1.0);
        assert_abs_diff_eq!(y, 2.0);
    }
}
