//! Per-object timestamps.

use coffre_types::Timestamp;
use serde::{Deserialize, Serialize};

/// Lifecycle timestamps carried by every group and entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Times {
    /// When the object was created.
    pub creation: Timestamp,
    /// When the object's own data last changed. Drives all newest-wins
    /// merge decisions.
    pub last_modification: Timestamp,
    /// When the object was last opened or used. Ignored by merge
    /// equality checks.
    pub last_access: Timestamp,
    /// When the object expires, if `expires` is set.
    pub expiry: Timestamp,
    /// Whether `expiry` is meaningful.
    pub expires: bool,
}

impl Times {
    /// Creates timestamps all set to the given instant.
    #[must_use]
    pub const fn at(t: Timestamp) -> Self {
        Self {
            creation: t,
            last_modification: t,
            last_access: t,
            expiry: t,
            expires: false,
        }
    }

    /// Records a modification at the given instant.
    pub fn touch_modified(&mut self, at: Timestamp) {
        self.last_modification = at;
        self.last_access = at;
    }

    /// Records an access at the given instant.
    pub fn touch_accessed(&mut self, at: Timestamp) {
        self.last_access = at;
    }
}

impl Default for Times {
    fn default() -> Self {
        Self::at(Timestamp::now())
    }
}
