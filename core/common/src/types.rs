//! Common types used throughout Cirrus.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Characters that may never appear in a tenant domain.
///
/// The domain doubles as the tenant's storage root directory name, so it
/// must stay a single, well-formed path component.
pub const FORBIDDEN_DOMAIN_CHARS: &[char] = &['/', '\\', '\0'];

/// A tenant's main DNS domain, like alice.example.com.
///
/// The domain identifies the tenant everywhere: it names the tenant's
/// document partition and its byte-storage root directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Domain(String);

impl Domain {
    /// Parse and validate a domain string.
    ///
    /// # Errors
    /// - Empty, `.` or `..`
    /// - Contains a filesystem-forbidden character
    pub fn parse(domain: impl Into<String>) -> crate::Result<Self> {
        let domain = domain.into();
        if domain.is_empty() {
            return Err(crate::Error::Validation(
                "Domain cannot be empty".to_string(),
            ));
        }
        if domain == "." || domain == ".." {
            return Err(crate::Error::Validation(format!(
                "Domain '{}' is malformed",
                domain
            )));
        }
        if domain.contains(FORBIDDEN_DOMAIN_CHARS) {
            return Err(crate::Error::Validation(format!(
                "Domain '{}' contains forbidden characters",
                domain.escape_default()
            )));
        }
        Ok(Self(domain))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of this tenant's document partition.
    pub fn partition(&self) -> String {
        format!("{}/", self.0)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_domain() {
        let domain = Domain::parse("alice.example.com").unwrap();
        assert_eq!(domain.as_str(), "alice.example.com");
        assert_eq!(domain.partition(), "alice.example.com/");
    }

    #[test]
    fn test_empty_domain_fails() {
        assert!(Domain::parse("").is_err());
    }

    #[test]
    fn test_dot_domains_fail() {
        assert!(Domain::parse(".").is_err());
        assert!(Domain::parse("..").is_err());
    }

    #[test]
    fn test_forbidden_characters_fail() {
        assert!(Domain::parse("alice/example").is_err());
        assert!(Domain::parse("alice\\example").is_err());
        assert!(Domain::parse("alice\0example").is_err());
    }

    #[test]
    fn test_serde_transparent() {
        let domain = Domain::parse("bob.example.com").unwrap();
        let json = serde_json::to_string(&domain).unwrap();
        assert_eq!(json, "\"bob.example.com\"");
    }
}
