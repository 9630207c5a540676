//! Linked device types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Platform a linked companion device runs on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Platform {
    Chrome,
    Windows,
    MacOs,
    Safari,
}

impl Platform {
    /// All known platforms, in pick order.
    pub const ALL: [Platform; 4] = [
        Platform::Chrome,
        Platform::Windows,
        Platform::MacOs,
        Platform::Safari,
    ];
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Platform::Chrome => "Chrome",
            Platform::Windows => "Windows",
            Platform::MacOs => "macOS",
            Platform::Safari => "Safari",
        };
        f.write_str(name)
    }
}

/// A companion device linked to the account.
///
/// Created on successful link completion, removed on disconnect. There are no
/// real session semantics behind it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkedDevice {
    pub id: String,
    pub name: String,
    pub platform: Platform,
    pub last_active: DateTime<Utc>,
    pub location: String,
}

impl LinkedDevice {
    pub fn new(
        name: impl Into<String>,
        platform: Platform,
        location: impl Into<String>,
        last_active: DateTime<Utc>,
    ) -> Self {
        let name = name.into();
        Self {
            id: Uuid::new_v4().to_string(),
            name: if name.is_empty() {
                "Unknown Device".to_string()
            } else {
                name
            },
            platform,
            last_active,
            location: location.into(),
        }
    }
}
