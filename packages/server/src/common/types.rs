// Types shared between the auth, user and lead domains.

use serde::{Deserialize, Serialize};

/// The listing a visitor was looking at when they started a login.
///
/// Properties live in another service; these are opaque references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyContext {
    pub property_id: Option<String>,
    pub property_name: Option<String>,
    pub property_url: Option<String>,
}

impl PropertyContext {
    /// Build a context from optional request fields, dropping blank values.
    pub fn from_parts(
        property_id: Option<String>,
        property_name: Option<String>,
        property_url: Option<String>,
    ) -> Self {
        Self {
            property_id: non_blank(property_id),
            property_name: non_blank(property_name),
            property_url: non_blank(property_url),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.property_id.is_none() && self.property_name.is_none() && self.property_url.is_none()
    }
}

/// Trim a value and treat empty strings as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
