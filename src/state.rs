//! Session and serial of a reconstructed mirror.
//!
//! Deltas only make sense applied in ascending serial order, without gaps,
//! on top of a state from the same session. The engine records the state it
//! reached in a small `bincode` file at the root of the mirror so the next
//! run can check that the delta it is given actually follows.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::{DeltaDocument, RrdpDocument};
use crate::error::{Result, RrdpError};

/// File name of the persisted state, relative to the mirror root.
pub const STATE_FILE: &str = ".rrdp-state";

/// Session and serial a mirror was last brought to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryState {
    /// RRDP session identifier.
    pub session_id: String,
    /// Last applied serial.
    pub serial: u64,
}

impl RepositoryState {
    /// State reached after applying `document`.
    #[must_use]
    pub fn of(document: &RrdpDocument) -> Self {
        Self {
            session_id: document.session_id().to_string(),
            serial: document.serial(),
        }
    }

    /// Location of the state file below `root`.
    #[must_use]
    pub fn path(root: &Path) -> PathBuf {
        root.join(STATE_FILE)
    }

    /// Load the state stored in `root`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or decoded.
    pub fn load(root: &Path) -> Result<Option<Self>> {
        match std::fs::read(Self::path(root)) {
            Ok(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist the state in `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn store(&self, root: &Path) -> Result<()> {
        let bytes = bincode::serialize(self)?;
        let path = Self::path(root);
        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, bytes)?;
        std::fs::rename(&temp_path, &path)?;
        Ok(())
    }

    /// Check that `document` can be applied on top of this state.
    ///
    /// A snapshot always can; a delta must be from the same session and
    /// carry exactly the next serial.
    ///
    /// # Errors
    ///
    /// Returns [`RrdpError::SessionMismatch`] or [`RrdpError::SerialGap`].
    pub fn check_next(&self, document: &RrdpDocument) -> Result<()> {
        let RrdpDocument::Delta(delta) = document else {
            return Ok(());
        };
        self.check_delta(delta)
    }

    fn check_delta(&self, delta: &DeltaDocument) -> Result<()> {
        if delta.session_id != self.session_id {
            return Err(RrdpError::SessionMismatch {
                expected: self.session_id.clone(),
                found: delta.session_id.clone(),
            });
        }
        let expected = self.serial.saturating_add(1);
        if delta.serial != expected {
            return Err(RrdpError::SerialGap {
                expected,
                found: delta.serial,
            });
        }
        Ok(())
    }
}

/// Sort `deltas` into replay order and check that they form a chain.
///
/// With a starting state, deltas at or below its serial are dropped and the
/// first remaining delta must follow it directly. All deltas must belong to
/// one session.
///
/// # Errors
///
/// Returns [`RrdpError::SessionMismatch`] or [`RrdpError::SerialGap`] when the
/// deltas cannot be replayed in sequence.
pub fn order_deltas(
    mut deltas: Vec<DeltaDocument>,
    after: Option<&RepositoryState>,
) -> Result<Vec<DeltaDocument>> {
    deltas.sort_by_key(|delta| delta.serial);

    if let Some(state) = after {
        deltas.retain(|delta| {
            let keep = delta.serial > state.serial;
            if !keep {
                debug!(serial = delta.serial, "delta already applied");
            }
            keep
        });
    }

    let mut current = match (after, deltas.first()) {
        (Some(state), _) => state.clone(),
        (None, Some(first)) => RepositoryState {
            session_id: first.session_id.clone(),
            serial: first.serial.saturating_sub(1),
        },
        (None, None) => return Ok(deltas),
    };

    for delta in &deltas {
        current.check_delta(delta)?;
        current.serial = delta.serial;
    }
    Ok(deltas)
}
