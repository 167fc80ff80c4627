//! Geometry primitives shared by the log, the registry, and the protocol.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of one WebSocket connection.
///
/// Assigned by the server when a connection is accepted and never reused, so
/// a late message from a departed connection can never be mistaken for a new
/// participant.
pub type ConnectionId = Uuid;

/// A position on the canvas in CSS pixels.
///
/// Coordinates are `f64` because browsers report pointer positions as
/// JavaScript numbers, which may be fractional on high-DPI displays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One straight line primitive.
///
/// A hand-drawn stroke is many consecutive segments, one per pointer
/// movement; segments are never grouped into a larger stroke entity.  A
/// segment is immutable once appended to the log.
///
/// # JSON shape
///
/// ```json
/// {"start":{"x":0,"y":0},"end":{"x":10,"y":10},"color":"#000000","size":5}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
    /// Stroke color as a CSS hex string, e.g. `"#FF0000"`.
    pub color: String,
    /// Stroke width in CSS pixels.
    pub size: f64,
}
