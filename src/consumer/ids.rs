use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a consumer id is compared with the ids already registered. Registration
/// uses [`IdMatch::collides`], pause/resume/close lookups use [`IdMatch::matches`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdMatch {
    /// Lookups match registered ids containing the looked-up id; a requested id collides
    /// when either id contains the other.
    #[default]
    Containment,
    Exact,
}

impl IdMatch {
    /// Whether the registered `key` answers a lookup for `wanted`.
    pub fn matches(self, key: &str, wanted: &str) -> bool {
        if wanted.is_empty() {
            return false;
        }
        match self {
            IdMatch::Exact => key == wanted,
            IdMatch::Containment => key.contains(wanted),
        }
    }

    /// Whether `candidate` may not be registered next to `key`.
    pub fn collides(self, key: &str, candidate: &str) -> bool {
        match self {
            IdMatch::Exact => key == candidate,
            IdMatch::Containment => self.matches(key, candidate) || candidate.contains(key),
        }
    }
}

pub(crate) fn generate_id() -> String {
    Uuid::new_v4().to_string().replace('-', "_")
}
