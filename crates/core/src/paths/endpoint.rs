//! Storage endpoints.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::relative::{join, RelativePath};

/// The three storage tiers a file moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Cache on the instrument host.
    Instrument,
    /// Facility storage.
    Facility,
    /// Remote HPC archive.
    Archive,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Instrument => "instrument",
            Tier::Facility => "facility",
            Tier::Archive => "archive",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rooted storage location plus the identity the transfer service knows it by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Human-readable name, used in logs and job labels (e.g. "spot832").
    pub name: String,
    /// Root path prefix on this endpoint.
    pub root_path: String,
    /// Opaque transfer-service identity of the endpoint.
    pub endpoint_id: String,
}

impl Endpoint {
    pub fn new(
        name: impl Into<String>,
        root_path: impl Into<String>,
        endpoint_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            root_path: root_path.into(),
            endpoint_id: endpoint_id.into(),
        }
    }

    /// Absolute path of `relative` on this endpoint.
    pub fn absolute(&self, relative: &RelativePath) -> String {
        join(&self.root_path, relative.as_str())
    }
}
