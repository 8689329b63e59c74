//! Common data types for the signaling client components.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A meeting participant.
///
/// Identity is keyed on `attendee_id`; `external_user_id` is the
/// application-supplied display identifier and may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attendee {
    /// Stable attendee identifier assigned by the service
    pub attendee_id: String,
    /// External user identifier supplied at attendee creation
    pub external_user_id: String,
}

impl Attendee {
    /// Create an attendee from its two identifiers.
    #[must_use]
    pub fn new(attendee_id: impl Into<String>, external_user_id: impl Into<String>) -> Self {
        Self {
            attendee_id: attendee_id.into(),
            external_user_id: external_user_id.into(),
        }
    }
}

impl fmt::Display for Attendee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.attendee_id, self.external_user_id)
    }
}
