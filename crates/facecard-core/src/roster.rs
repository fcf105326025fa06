//! Identity roster.
//!
//! The roster is a small static list of known people. A default roster is
//! embedded at compile time from `contrib/roster/identities.json`; hosts may
//! point at a different JSON file instead.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

/// Compile-time embedded roster.
const BUNDLED_ROSTER: &str = include_str!("../../../contrib/roster/identities.json");

static BUNDLED: OnceLock<Result<Roster, String>> = OnceLock::new();

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("failed to read roster {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid roster JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("bundled roster is invalid: {0}")]
    Bundled(String),
}

/// A known person, matched by exact name against classifier labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub title: String,
    pub department: String,
}

/// Read-only list of identities.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    identities: Vec<Identity>,
}

impl Roster {
    pub fn new(identities: Vec<Identity>) -> Self {
        Self { identities }
    }

    /// Parse a JSON array of `{name, title, department}` records.
    pub fn from_json(json: &str) -> Result<Self, RosterError> {
        let identities: Vec<Identity> = serde_json::from_str(json)?;
        Ok(Self { identities })
    }

    /// Load a roster file from disk.
    pub fn load(path: &Path) -> Result<Self, RosterError> {
        let json = std::fs::read_to_string(path).map_err(|source| RosterError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// The embedded default roster, parsed once.
    pub fn bundled() -> Result<&'static Roster, RosterError> {
        BUNDLED
            .get_or_init(|| Roster::from_json(BUNDLED_ROSTER).map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|e| RosterError::Bundled(e.clone()))
    }

    /// Exact-name lookup.
    pub fn find(&self, name: &str) -> Option<&Identity> {
        self.identities.iter().find(|i| i.name == name)
    }

    pub fn all(&self) -> &[Identity] {
        &self.identities
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

/// Where the roster comes from.
#[derive(Debug, Clone, Default)]
pub enum RosterSource {
    #[default]
    Bundled,
    File(PathBuf),
    Static(Vec<Identity>),
}

impl RosterSource {
    fn load(&self) -> Result<Roster, RosterError> {
        match self {
            Self::Bundled => Roster::bundled().cloned(),
            Self::File(path) => Roster::load(path),
            Self::Static(identities) => Ok(Roster::new(identities.clone())),
        }
    }
}

/// Roster that is only read from its source on first use.
///
/// A failed load is not cached; the next call tries again.
#[derive(Debug, Default)]
pub struct LazyRoster {
    source: RosterSource,
    roster: Option<Roster>,
}

impl LazyRoster {
    pub fn new(source: RosterSource) -> Self {
        Self {
            source,
            roster: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.roster.is_some()
    }

    pub fn get(&mut self) -> Result<&Roster, RosterError> {
        let roster = match self.roster.take() {
            Some(roster) => roster,
            None => {
                let roster = self.source.load()?;
                tracing::info!(
                    source = ?self.source,
                    identities = roster.len(),
                    "identity roster loaded"
                );
                roster
            }
        };
        Ok(self.roster.insert(roster))
    }
}
