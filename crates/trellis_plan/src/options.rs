//! Planner configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use trellis_core::{CoreError, CoreResult};

/// How the topological sorter picks among simultaneously ready nodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TieBreak {
    /// Always take the ready node with the smallest ID
    #[default]
    Lexical,
    /// First-in first-out, seeded in declaration order
    Declaration,
}

impl TieBreak {
    /// Lowercase name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Lexical => "lexical",
            Self::Declaration => "declaration",
        }
    }
}

impl fmt::Display for TieBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TieBreak {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lexical" => Ok(Self::Lexical),
            "declaration" => Ok(Self::Declaration),
            other => Err(CoreError::ParseError {
                message: format!("unknown tie-break '{other}', expected lexical or declaration"),
            }),
        }
    }
}

/// Options controlling a planning pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlanOptions {
    /// Ordering among ready nodes
    pub tie_break: TieBreak,
    /// Run [`SystemInputs::validate`](crate::SystemInputs::validate) first
    pub validate_inputs: bool,
    /// Maximum node count (0 = no limit)
    pub max_nodes: usize,
}

impl PlanOptions {
    /// Create default options
    #[must_use]
    pub fn new() -> Self {
        Self {
            tie_break: TieBreak::Lexical,
            validate_inputs: true,
            max_nodes: 0,
        }
    }

    /// Set the tie-break policy
    #[must_use]
    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Set whether inputs are validated before building
    #[must_use]
    pub fn with_validate_inputs(mut self, validate: bool) -> Self {
        self.validate_inputs = validate;
        self
    }

    /// Set maximum node count
    #[must_use]
    pub fn with_max_nodes(mut self, max: usize) -> Self {
        self.max_nodes = max;
        self
    }
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self::new()
    }
}
