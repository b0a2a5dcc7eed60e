//! Identifiers for long-running operations.
//!
//! An operation id is a 128-bit value carried in the polling URLs as a
//! canonical hyphenated hex string (`8-4-4-4-12`). Other UUID spellings
//! (simple, braced, URN) are rejected so every id has exactly one path form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Length of the canonical hyphenated form.
const CANONICAL_LEN: usize = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(Uuid);

impl OperationId {
    /// Create a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse the canonical hyphenated form, case-insensitively.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        if value.len() != CANONICAL_LEN {
            return Err(CoreError::MalformedIdentifier(value.to_string()));
        }
        Uuid::try_parse(value)
            .map(Self)
            .map_err(|_| CoreError::MalformedIdentifier(value.to_string()))
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for OperationId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}
