//! Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Postgres truncates identifiers longer than this (NAMEDATALEN - 1)
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Reserved name of the shared namespace holding the catalog tables
pub const PUBLIC_SCHEMA: &str = "public";

/// A validated schema identifier.
///
/// Only ASCII letters, digits and underscores are accepted and the value is
/// folded to lowercase, so a `Namespace` can always be quoted into DDL safely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NamespaceError {
    #[error("schema identifier is empty")]
    Empty,

    #[error("schema identifier '{0}' is longer than 63 characters")]
    TooLong(String),

    #[error("schema identifier '{0}' may only contain letters, digits and underscores")]
    InvalidCharacters(String),

    #[error("schema identifier '{0}' is reserved")]
    Reserved(String),
}

impl Namespace {
    pub fn parse(raw: &str) -> Result<Self, NamespaceError> {
        if raw.is_empty() {
            return Err(NamespaceError::Empty);
        }
        if raw.len() > MAX_IDENTIFIER_LEN {
            return Err(NamespaceError::TooLong(raw.to_string()));
        }
        if !raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(NamespaceError::InvalidCharacters(raw.to_string()));
        }
        Ok(Self(raw.to_ascii_lowercase()))
    }

    /// Parse an identifier that will back a tenant. Rejects the shared
    /// namespace and the names Postgres keeps for itself.
    pub fn parse_tenant(raw: &str) -> Result<Self, NamespaceError> {
        let namespace = Self::parse(raw)?;
        if namespace.is_reserved() {
            return Err(NamespaceError::Reserved(namespace.0));
        }
        Ok(namespace)
    }

    pub fn public() -> Self {
        Self(PUBLIC_SCHEMA.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_public(&self) -> bool {
        self.0 == PUBLIC_SCHEMA
    }

    pub fn is_reserved(&self) -> bool {
        self.is_public() || self.0.starts_with("pg_") || self.0 == "information_schema"
    }

    /// Double-quoted form for interpolation into DDL and `search_path`
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0.replace('"', "\"\""))
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Namespace {
    type Error = NamespaceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Namespace> for String {
    fn from(value: Namespace) -> Self {
        value.0
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalize a `Host` header value: drop the port, the trailing root dot and
/// fold to lowercase. IPv6 literals keep their address without brackets.
pub fn normalize_host(raw: &str) -> String {
    let raw = raw.trim();

    let host = if let Some(rest) = raw.strip_prefix('[') {
        rest.split(']').next().unwrap_or_default()
    } else {
        raw.split(':').next().unwrap_or_default()
    };

    host.trim_end_matches('.').to_ascii_lowercase()
}

/// Whether a normalized host is an IP literal rather than a DNS name
pub fn is_ip_literal(host: &str) -> bool {
    host.parse::<IpAddr>().is_ok()
}
