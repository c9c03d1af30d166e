//! Domain resolution for inbound calls.
//!
//! Services never inspect credentials themselves: a [`DomainResolver`] turns
//! the opaque authorization material of a [`RequestContext`] into the
//! caller's [`Domain`], or fails with `Unauthenticated`. Services propagate
//! that failure unchanged. Token verification internals (signature checks,
//! key fetching, claim parsing) live entirely behind the trait.

use async_trait::async_trait;
use trellis_store::{Domain, Result};

/// The narrow slice of an inbound call that the fleet services look at.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Opaque bearer credential, when one accompanied the call.
    pub authorization: Option<String>,
}

impl RequestContext {
    /// A context with no credential.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A context carrying the given bearer credential.
    pub fn with_authorization(token: impl Into<String>) -> Self {
        Self {
            authorization: Some(token.into()),
        }
    }
}

/// Resolves the caller's tenant domain from a request context.
#[async_trait]
pub trait DomainResolver: Send + Sync {
    /// Resolves the caller's domain, or fails with `Unauthenticated`.
    async fn resolve(&self, context: &RequestContext) -> Result<Domain>;
}

/// A resolver that maps every call to one fixed domain.
///
/// For tests and single-tenant embedded deployments, where there is no
/// credential to verify.
#[derive(Debug, Clone)]
pub struct StaticDomainResolver {
    domain: Domain,
}

impl StaticDomainResolver {
    /// Creates a resolver that always yields `domain`.
    pub fn new(domain: impl Into<Domain>) -> Self {
        Self {
            domain: domain.into(),
        }
    }
}

#[async_trait]
impl DomainResolver for StaticDomainResolver {
    async fn resolve(&self, _context: &RequestContext) -> Result<Domain> {
        Ok(self.domain.clone())
    }
}
