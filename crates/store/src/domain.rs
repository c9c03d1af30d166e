//! Tenant domain type.
//!
//! A [`Domain`] is the unit of isolation: every stored document is stamped
//! with the caller's domain under [`DOMAIN_KEY`], and every lookup filter
//! must carry it. The value itself is opaque — it is whatever the auth
//! resolver handed out, typically a token claim.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Document key under which the domain is stamped on every stored document.
pub const DOMAIN_KEY: &str = "domain";

/// An opaque tenant domain.
///
/// Collections never resolve a domain themselves; they only accept one that
/// has already been resolved upstream. Two documents with equal identifiers
/// but different domains are unrelated, and cross-domain access is
/// indistinguishable from the document not existing.
///
/// # Examples
///
/// ```
/// use trellis_store::Domain;
///
/// let domain = Domain::new("greenhouse-12");
/// assert_eq!(domain.as_str(), "greenhouse-12");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Domain(String);

impl Domain {
    /// Creates a domain from the given string.
    pub fn new(domain: impl Into<String>) -> Self {
        Self(domain.into())
    }

    /// Returns the domain as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Domain({})", self.0)
    }
}

impl FromStr for Domain {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Domain::new(s))
    }
}

impl From<&str> for Domain {
    fn from(s: &str) -> Self {
        Domain::new(s)
    }
}

impl From<String> for Domain {
    fn from(s: String) -> Self {
        Domain::new(s)
    }
}

impl AsRef<str> for Domain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
