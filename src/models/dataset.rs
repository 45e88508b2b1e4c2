//! Dataset models

use serde::{Serialize, Serializer};

/// A single labeled value in a dataset, keyed by its timestamp
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPoint {
    pub timestamp: f64,
    pub label: String,
    pub value: String,
}

/// Client-owned position in a dataset: the timestamp of the last point received
///
/// `Cursor::START` sorts before every point, so a delta from it returns everything.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor(f64);

impl Cursor {
    pub const START: Cursor = Cursor(f64::NEG_INFINITY);

    /// Cursor positioned at a known timestamp; untrusted input goes through `from_wire`
    pub fn at(timestamp: f64) -> Cursor {
        Cursor(timestamp)
    }

    /// Accepts any number that is not NaN; `None` on the wire means `START`
    pub fn from_wire(value: Option<f64>) -> Option<Cursor> {
        match value {
            None => Some(Cursor::START),
            Some(ts) if ts.is_nan() => None,
            Some(ts) => Some(Cursor(ts)),
        }
    }

    pub fn timestamp(self) -> f64 {
        self.0
    }

    pub fn is_start(self) -> bool {
        self.0 == f64::NEG_INFINITY
    }
}

/// Serialize a cursor timestamp, writing `null` for the empty-dataset sentinel
pub fn serialize_cursor<S: Serializer>(ts: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if ts.is_finite() {
        serializer.serialize_f64(*ts)
    } else {
        serializer.serialize_none()
    }
}
