use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Natural key assigned by the source system (e.g. a prisoner record id).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SourceKey(pub i64);

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Surrogate key allocated in the destination system.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct DestinationId(pub i64);

impl DestinationId {
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Random 128-bit row token. Never derived from row content, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalToken(Uuid);

impl GlobalToken {
    /// Generate a fresh token from the OS-seeded random source.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for GlobalToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn tokens_are_distinct_and_hyphenated() {
        let tokens: HashSet<String> = (0..1000).map(|_| GlobalToken::new().to_string()).collect();
        assert_eq!(tokens.len(), 1000);
        assert!(tokens.iter().all(|token| token.len() == 36));
    }
}
