//! Credential handling for provider adapters.
//!
//! A backend is available at startup only if its provider's credential can
//! be found in the configured [`CredentialStore`]. Missing credentials are
//! not an error; the backend is simply left out of every chain.
//!
//! Credential values are wrapped in [`SecretString`] and never appear in
//! `Debug` or `Display` output.

use secrecy::{ExposeSecret, SecretString};
use std::collections::BTreeMap;
use std::fmt;

use switchyard_core::ProviderKind;

/// Where a credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialOrigin {
    /// Process environment
    Environment,
    /// Supplied in code
    Programmatic,
}

impl fmt::Display for CredentialOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialOrigin::Environment => write!(f, "environment"),
            CredentialOrigin::Programmatic => write!(f, "programmatic"),
        }
    }
}

/// A provider API key.
pub struct ApiCredential {
    value: SecretString,
    origin: CredentialOrigin,
    kind: ProviderKind,
}

impl ApiCredential {
    pub fn new(value: impl Into<String>, origin: CredentialOrigin, kind: ProviderKind) -> Self {
        Self {
            value: SecretString::from(value.into()),
            origin,
            kind,
        }
    }

    /// Expose the value at the point of use (e.g. an HTTP header).
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().trim().is_empty()
    }

    pub fn origin(&self) -> CredentialOrigin {
        self.origin
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("value", &"[REDACTED]")
            .field("origin", &self.origin)
            .field("kind", &self.kind)
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} key from {} [REDACTED]", self.kind, self.origin)
    }
}

/// Source of provider credentials.
pub trait CredentialStore: Send + Sync {
    /// Credential for `kind`, if one is configured and non-empty.
    fn credential(&self, kind: ProviderKind) -> Option<ApiCredential>;
}

/// Reads each kind's key from its environment variable
/// (see [`ProviderKind::credential_env`]).
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentials;

impl CredentialStore for EnvCredentials {
    fn credential(&self, kind: ProviderKind) -> Option<ApiCredential> {
        lookup_credential(kind, |name| std::env::var(name).ok())
    }
}

fn lookup_credential(
    kind: ProviderKind,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<ApiCredential> {
    lookup(kind.credential_env())
        .map(|v| ApiCredential::new(v, CredentialOrigin::Environment, kind))
        .filter(|c| !c.is_empty())
}

/// Fixed in-memory credentials.
#[derive(Default)]
pub struct StaticCredentials {
    keys: BTreeMap<ProviderKind, SecretString>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: ProviderKind, value: impl Into<String>) -> Self {
        self.keys.insert(kind, SecretString::from(value.into()));
        self
    }
}

impl CredentialStore for StaticCredentials {
    fn credential(&self, kind: ProviderKind) -> Option<ApiCredential> {
        self.keys
            .get(&kind)
            .map(|v| ApiCredential::new(v.expose_secret(), CredentialOrigin::Programmatic, kind))
            .filter(|c| !c.is_empty())
    }
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("kinds", &self.keys.keys().collect::<Vec<_>>())
            .finish()
    }
}
