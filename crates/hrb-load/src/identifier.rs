//! SQL identifiers that are safe to splice into statement text.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{LoadError, Result};

static IDENTIFIER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("Invalid identifier regex"));

/// A table or column name made only of ASCII letters, digits and `_`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier(String);

impl Identifier {
    pub fn parse(name: &str) -> Result<Self> {
        if IDENTIFIER_REGEX.is_match(name) {
            Ok(Self(name.to_string()))
        } else {
            Err(LoadError::UnsafeIdentifier {
                name: name.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Backtick-quoted form for MySQL statement text.
    pub fn quoted(&self) -> String {
        format!("`{}`", self.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accepts_plain_names() {
        for name in ["person", "person_attribute_type_id", "address2", "_x"] {
            assert_eq!(Identifier::parse(name).unwrap().as_str(), name);
        }
        assert_eq!(Identifier::parse("person").unwrap().quoted(), "`person`");
    }

    #[test]
    fn rejects_injection_and_punctuation() {
        for name in ["drop table;", "", "a b", "name`", "CD4<200", "date-created", "café"] {
            assert!(matches!(
                Identifier::parse(name),
                Err(LoadError::UnsafeIdentifier { .. })
            ));
        }
    }

    proptest! {
        #[test]
        fn any_name_with_a_foreign_character_is_rejected(
            prefix in "[A-Za-z0-9_]{0,8}",
            bad in "[^A-Za-z0-9_]",
            suffix in "[A-Za-z0-9_]{0,8}",
        ) {
            let name = format!("{prefix}{bad}{suffix}");
            prop_assert!(Identifier::parse(&name).is_err());
        }
    }
}
