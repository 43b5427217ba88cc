use molswap::core::models::snapshot::ReferencePoint;
use molswap::core::utils::geometry::Axis;
use molswap::engine::config::SpatialWindow;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid window '{0}'. Expected 'AXIS:LOWER:UPPER' (e.g., 'z:1.00:1.70').")]
    InvalidWindowFormat(String),

    #[error("Invalid axis '{0}'. Expected one of 'x', 'y' or 'z'.")]
    InvalidAxis(String),

    #[error("Invalid bound '{value}' in window '{window}'.")]
    InvalidBound { window: String, value: String },

    #[error("Window '{0}' must have a lower bound below its upper bound.")]
    EmptyWindow(String),

    #[error("Invalid reference point '{0}'. Expected 'center-of-mass' or 'first-atom'.")]
    InvalidReference(String),
}

pub fn parse_axis(s: &str) -> Result<Axis, ParseError> {
    s.trim()
        .parse()
        .map_err(|_| ParseError::InvalidAxis(s.to_string()))
}

/// Parses `AXIS:LOWER:UPPER` into an open spatial window.
pub fn parse_window(s: &str) -> Result<SpatialWindow, ParseError> {
    let parts: Vec<&str> = s.split(':').collect();
    let [axis, lower, upper] = parts.as_slice() else {
        return Err(ParseError::InvalidWindowFormat(s.to_string()));
    };

    let bound = |v: &str| -> Result<f64, ParseError> {
        v.trim()
            .parse::<f64>()
            .ok()
            .filter(|b| b.is_finite())
            .ok_or_else(|| ParseError::InvalidBound {
                window: s.to_string(),
                value: v.to_string(),
            })
    };

    let window = SpatialWindow::new(parse_axis(axis)?, bound(lower)?, bound(upper)?);
    if !window.is_valid() {
        return Err(ParseError::EmptyWindow(s.to_string()));
    }
    Ok(window)
}

pub fn parse_reference(s: &str) -> Result<ReferencePoint, ParseError> {
    match s.trim() {
        "center-of-mass" | "com" => Ok(ReferencePoint::CenterOfMass),
        "first-atom" => Ok(ReferencePoint::FirstAtom),
        _ => Err(ParseError::InvalidReference(s.to_string())),
    }
}
