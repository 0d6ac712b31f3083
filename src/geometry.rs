//! Placement rules for a child relative to its parent.
//!
//! World coordinates have their y axis pointing up, so a child hangs below its
//! parent when its y is smaller. For each [`Side`] a fixed linear map takes the
//! offset `child - parent` into a canonical frame where the allowed region is the
//! open positive quadrant. Projection clamps the canonical coordinates to a
//! minimum separation and maps the result back.

use std::fmt;
use std::str::FromStr;

use kurbo::{Affine, Point};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SKEW: f64 = 0.5;
pub const DEFAULT_MIN_SEPARATION: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Left, Side::Right];

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }

    fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" | "l" => Ok(Side::Left),
            "right" | "r" => Ok(Side::Right),
            other => Err(format!("unknown side '{other}' (expected 'left' or 'right')")),
        }
    }
}

/// Shape of the allowed cone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct GeometryConfig {
    /// How much a child must drop per unit of horizontal spread.
    pub skew: f64,
    /// Minimum canonical distance from both cone edges after projection.
    pub min_separation: f64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            skew: DEFAULT_SKEW,
            min_separation: DEFAULT_MIN_SEPARATION,
        }
    }
}

/// Result of [`Solver::constrain`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// The candidate projected into the allowed region.
    pub position: Point,
    /// Whether the unprojected candidate was strictly inside the cone.
    pub is_valid: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solver {
    to_canonical: [Affine; 2],
    from_canonical: [Affine; 2],
    min_separation: f64,
}

impl Default for Solver {
    fn default() -> Self {
        Self::new(GeometryConfig::default())
    }
}

impl Solver {
    pub fn new(config: GeometryConfig) -> Self {
        let skew = config.skew;
        // Coefficients are [a, b, c, d, e, f]: x' = a*x + c*y, y' = b*x + d*y.
        let left = Affine::new([-1.0, skew, 0.0, -1.0, 0.0, 0.0]);
        let right = Affine::new([1.0, -skew, 0.0, -1.0, 0.0, 0.0]);
        Self {
            to_canonical: [left, right],
            from_canonical: [left.inverse(), right.inverse()],
            min_separation: config.min_separation,
        }
    }

    pub fn min_separation(&self) -> f64 {
        self.min_separation
    }

    /// Maps `child` relative to `parent` into the canonical frame for `side`.
    pub fn canonical(&self, child: Point, parent: Point, side: Side) -> Point {
        self.to_canonical[side.index()] * (child - parent).to_point()
    }

    pub fn constrain(&self, child: Point, parent: Point, side: Side) -> Placement {
        let canonical = self.canonical(child, parent, side);
        let is_valid = canonical.x > 0.0 && canonical.y > 0.0;

        let min = self.min_separation;
        if canonical.x >= min && canonical.y >= min {
            return Placement {
                position: child,
                is_valid,
            };
        }

        let clamped = Point::new(canonical.x.max(min), canonical.y.max(min));
        let offset = self.from_canonical[side.index()] * clamped;
        Placement {
            position: parent + offset.to_vec2(),
            is_valid,
        }
    }

    pub fn is_valid(&self, child: Point, parent: Point, side: Side) -> bool {
        self.constrain(child, parent, side).is_valid
    }
}

/// [`Solver::constrain`] with the default cone.
pub fn constrain(child: Point, parent: Point, side: Side) -> Placement {
    Solver::default().constrain(child, parent, side)
}
