//! Subject to role resolution
//!
//! The role table maps subjects to roles with two kinds of pattern:
//!
//! - an exact subject string (`alice@example.com`), compared case-sensitively
//! - a domain wildcard (`*@example.com`), matching any `local@example.com`
//!   with the domain compared case-insensitively
//!
//! Exact patterns always win over wildcards, regardless of table order.
//! Within each kind the first row in table order wins.
//!
//! # Example
//!
//! ```rust
//! use sheetgate_authz::roles::{RoleMapping, RoleResolver, RoleTable};
//!
//! let roles = RoleTable::new(vec![
//!     RoleMapping::new("*@example.com", "member"),
//!     RoleMapping::new("alice@example.com", "admin"),
//! ]);
//!
//! let resolver = RoleResolver::new();
//! assert_eq!(resolver.resolve("alice@example.com", &roles), Some("admin"));
//! assert_eq!(resolver.resolve("bob@EXAMPLE.com", &roles), Some("member"));
//! assert_eq!(resolver.resolve("carol@other.org", &roles), None);
//! ```

use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

/// Prefix marking a domain wildcard pattern
const DOMAIN_WILDCARD_PREFIX: &str = "*@";

/// Compiled `*@domain` pattern
#[derive(Debug, Clone)]
struct DomainPattern {
    domain: String,
    regex: Regex,
}

impl DomainPattern {
    /// Compile `*@foo.com` into `^[^@]+@foo\.com$` (case-insensitive)
    fn parse(pattern: &str) -> Option<Self> {
        let domain = pattern.strip_prefix(DOMAIN_WILDCARD_PREFIX)?;
        let source = format!("^[^@]+@{}$", regex::escape(domain));

        match RegexBuilder::new(&source).case_insensitive(true).build() {
            Ok(regex) => Some(Self {
                domain: domain.to_string(),
                regex,
            }),
            Err(e) => {
                warn!("Ignoring unusable domain pattern '{}': {}", pattern, e);
                None
            }
        }
    }

    fn matches(&self, subject: &str) -> bool {
        subject.contains('@') && self.regex.is_match(subject)
    }
}

/// Role table row: (pattern, role)
#[derive(Debug, Clone)]
pub struct RoleMapping {
    pub pattern: String,
    pub role: String,
    domain: Option<DomainPattern>,
}

impl RoleMapping {
    pub fn new(pattern: impl Into<String>, role: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let domain = DomainPattern::parse(&pattern);

        Self {
            pattern,
            role: role.into(),
            domain,
        }
    }

    /// Build a mapping from a sheet row; rows with fewer than two cells yield `None`
    pub fn from_row(row: &[String]) -> Option<Self> {
        match row {
            [pattern, role, ..] => Some(Self::new(pattern, role)),
            _ => None,
        }
    }

    /// Domain of a `*@domain` pattern
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_ref().map(|d| d.domain.as_str())
    }

    fn matches_exact(&self, subject: &str) -> bool {
        self.pattern == subject
    }

    fn matches_domain(&self, subject: &str) -> bool {
        self.domain
            .as_ref()
            .map(|d| d.matches(subject))
            .unwrap_or(false)
    }
}

impl PartialEq for RoleMapping {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern && self.role == other.role
    }
}

impl Eq for RoleMapping {}

/// Ordered role table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleTable {
    mappings: Vec<RoleMapping>,
}

impl RoleTable {
    pub fn new(mappings: Vec<RoleMapping>) -> Self {
        Self { mappings }
    }

    /// Parse sheet rows, skipping rows that are too short
    pub fn from_rows<R: AsRef<[String]>>(rows: &[R]) -> Self {
        let mappings: Vec<RoleMapping> = rows
            .iter()
            .filter_map(|row| RoleMapping::from_row(row.as_ref()))
            .collect();

        if mappings.len() < rows.len() {
            debug!("Skipped {} malformed role rows", rows.len() - mappings.len());
        }

        Self { mappings }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoleMapping> {
        self.mappings.iter()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

/// Resolves a subject to a single role name
///
/// Stateless; the table is handed in per call so a resolver can be shared
/// freely between concurrent requests.
#[derive(Debug, Clone, Default)]
pub struct RoleResolver;

impl RoleResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve `subject` against `roles`
    ///
    /// Returns `None` when no mapping applies; that is a normal outcome and the
    /// caller falls back to the `any` role.
    pub fn resolve<'a>(&self, subject: &str, roles: &'a RoleTable) -> Option<&'a str> {
        if let Some(mapping) = roles.iter().find(|m| m.matches_exact(subject)) {
            debug!(
                "Exact match for subject '{}' found role '{}'",
                subject, mapping.role
            );
            return Some(&mapping.role);
        }

        if let Some(mapping) = roles.iter().find(|m| m.matches_domain(subject)) {
            debug!(
                "Domain match for subject '{}' with pattern '{}' found role '{}'",
                subject, mapping.pattern, mapping.role
            );
            return Some(&mapping.role);
        }

        debug!("No role found for subject '{}'", subject);
        None
    }
}
