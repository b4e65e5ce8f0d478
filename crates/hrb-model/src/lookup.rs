//! Static code-to-identifier lookup tables.
//!
//! Tables are built once from configuration and never mutated afterwards.
//! An unknown code is always an error; there is no default identifier.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diagnostic::RowError;
use crate::error::{ModelError, Result};

/// Which static table a code is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionKind {
    OrgUnit,
    CategoryOptionCombo,
    DataElement,
    AttributeType,
    IdentifierType,
}

impl DimensionKind {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::OrgUnit => "org unit",
            Self::CategoryOptionCombo => "category option combo",
            Self::DataElement => "data element",
            Self::AttributeType => "attribute type",
            Self::IdentifierType => "identifier type",
        }
    }
}

impl fmt::Display for DimensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One immutable code table.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionTable<V> {
    kind: DimensionKind,
    entries: BTreeMap<String, V>,
}

impl<V> DimensionTable<V> {
    pub fn empty(kind: DimensionKind) -> Self {
        Self {
            kind,
            entries: BTreeMap::new(),
        }
    }

    /// Build a table, rejecting codes listed twice.
    pub fn from_entries<I, K>(kind: DimensionKind, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (code, id) in entries {
            let code = code.into().trim().to_string();
            if map.contains_key(&code) {
                return Err(ModelError::DuplicateCode { kind, code });
            }
            map.insert(code, id);
        }
        Ok(Self { kind, entries: map })
    }

    pub fn kind(&self) -> DimensionKind {
        self.kind
    }

    /// Resolve a raw code. Surrounding whitespace is ignored.
    pub fn resolve(&self, code: &str) -> std::result::Result<&V, RowError> {
        self.get(code).ok_or_else(|| RowError::UnknownDimensionCode {
            kind: self.kind,
            code: code.to_string(),
        })
    }

    pub fn get(&self, code: &str) -> Option<&V> {
        self.entries.get(code.trim())
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(code, id)| (code.as_str(), id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: PartialEq> DimensionTable<V> {
    /// Reverse lookup: the code that maps to `id`, if any.
    pub fn code_for(&self, id: &V) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, candidate)| *candidate == id)
            .map(|(code, _)| code.as_str())
    }
}

/// String-valued tables keyed by dimension kind.
#[derive(Debug, Clone, Default)]
pub struct DimensionResolver {
    tables: BTreeMap<DimensionKind, DimensionTable<String>>,
}

impl DimensionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table; a later table for the same kind replaces the earlier one.
    #[must_use]
    pub fn with_table(mut self, table: DimensionTable<String>) -> Self {
        self.tables.insert(table.kind(), table);
        self
    }

    /// Resolve `code` against the table for `kind`.
    pub fn resolve(&self, kind: DimensionKind, code: &str) -> std::result::Result<&str, RowError> {
        match self.tables.get(&kind) {
            Some(table) => table.resolve(code).map(String::as_str),
            None => Err(RowError::UnknownDimensionCode {
                kind,
                code: code.to_string(),
            }),
        }
    }

    pub fn table(&self, kind: DimensionKind) -> Option<&DimensionTable<String>> {
        self.tables.get(&kind)
    }

    /// Reverse lookup of an identifier to its human-readable code.
    pub fn code_for(&self, kind: DimensionKind, id: &str) -> Option<&str> {
        self.tables
            .get(&kind)
            .and_then(|table| table.code_for(&id.to_string()))
    }
}
