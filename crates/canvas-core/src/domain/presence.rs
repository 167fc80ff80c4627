//! PresenceRegistry: live membership and cursor positions.
//!
//! Each connected participant has one [`PresenceEntry`] holding the color the
//! server assigned on join and the last cursor position they reported.  The
//! registry is keyed by [`ConnectionId`]; keys are unique and carry no
//! ordering meaning, but [`PresenceRegistry::snapshot`] returns a `BTreeMap`
//! so that two snapshots of the same state serialize identically.
//!
//! # Colors
//!
//! Colors are drawn independently per join with no check against colors
//! already in use, so two participants may end up with the same color.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::domain::geometry::{ConnectionId, Point};

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Error type for presence operations.
#[derive(Debug, Error, PartialEq)]
pub enum PresenceError {
    /// The connection id has no entry, e.g. a cursor move that raced a disconnect.
    #[error("unknown connection: {0}")]
    UnknownConnection(ConnectionId),
}

/// One connected participant.
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceEntry {
    pub connection_id: ConnectionId,
    /// CSS hex color, e.g. `"#3FA20C"`.
    pub color: String,
    pub position: Point,
}

/// Mapping from connection id to presence entry.
pub struct PresenceRegistry {
    entries: HashMap<ConnectionId, PresenceEntry>,
    rng: StdRng,
}

impl PresenceRegistry {
    /// Creates an empty registry whose colors come from OS entropy.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Creates an empty registry with a deterministic color sequence.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            entries: HashMap::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Registers `connection_id` with a fresh random color at the origin.
    ///
    /// Joining with an id that is already present replaces its entry.
    pub fn join(&mut self, connection_id: ConnectionId) -> PresenceEntry {
        let entry = PresenceEntry {
            connection_id,
            color: random_hex_color(&mut self.rng),
            position: Point::default(),
        };
        self.entries.insert(connection_id, entry.clone());
        entry
    }

    /// Moves the cursor of `connection_id` to `point` and returns the updated entry.
    ///
    /// # Errors
    ///
    /// Returns [`PresenceError::UnknownConnection`] if the id is not registered.
    /// The registry is left unchanged in that case.
    pub fn update_position(
        &mut self,
        connection_id: ConnectionId,
        point: Point,
    ) -> Result<&PresenceEntry, PresenceError> {
        let entry = self
            .entries
            .get_mut(&connection_id)
            .ok_or(PresenceError::UnknownConnection(connection_id))?;
        entry.position = point;
        Ok(entry)
    }

    /// Removes `connection_id`.  Removing an absent id is a no-op returning `None`.
    pub fn leave(&mut self, connection_id: ConnectionId) -> Option<PresenceEntry> {
        self.entries.remove(&connection_id)
    }

    /// Returns the full current membership.
    pub fn snapshot(&self) -> BTreeMap<ConnectionId, PresenceEntry> {
        self.entries
            .iter()
            .map(|(id, entry)| (*id, entry.clone()))
            .collect()
    }

    pub fn get(&self, connection_id: ConnectionId) -> Option<&PresenceEntry> {
        self.entries.get(&connection_id)
    }

    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        self.entries.contains_key(&connection_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PresenceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresenceRegistry")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

/// Returns `#` followed by six uppercase hex digits, each drawn independently.
pub fn random_hex_color<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut color = String::with_capacity(7);
    color.push('#');
    for _ in 0..6 {
        color.push(HEX_DIGITS[rng.gen_range(0..HEX_DIGITS.len())] as char);
    }
    color
}
