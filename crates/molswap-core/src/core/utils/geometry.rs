use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A Cartesian axis of the simulation box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    #[default]
    Z,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl FromStr for Axis {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x" | "0" => Ok(Axis::X),
            "y" | "1" => Ok(Axis::Y),
            "z" | "2" => Ok(Axis::Z),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(s)
    }
}

/// Mass-weighted center of a set of points.
///
/// Falls back to the geometric center when the total mass is not positive
/// (e.g. a molecule made only of virtual sites). Returns the origin for an
/// empty input.
pub fn center_of_mass(points: &[Point3<f64>], masses: impl Iterator<Item = f64>) -> Point3<f64> {
    if points.is_empty() {
        return Point3::origin();
    }

    let mut weighted = Vector3::zeros();
    let mut total_mass = 0.0;
    for (point, mass) in points.iter().zip(masses) {
        weighted += point.coords * mass;
        total_mass += mass;
    }

    if total_mass > 0.0 {
        Point3::from(weighted / total_mass)
    } else {
        geometric_center(points)
    }
}

pub fn geometric_center(points: &[Point3<f64>]) -> Point3<f64> {
    if points.is_empty() {
        return Point3::origin();
    }
    let sum: Vector3<f64> = points.iter().map(|p| p.coords).sum();
    Point3::from(sum / points.len() as f64)
}
