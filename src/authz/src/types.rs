//! Core access-control types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::debug;

/// Role name that every subject falls back to
pub const ANY_ROLE: &str = "any";

/// Raw response of the spreadsheet values endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetValues {
    /// Range actually returned (e.g., "Rules!A2:D102")
    #[serde(default)]
    pub range: String,

    /// "ROWS" or "COLUMNS"
    #[serde(default)]
    pub major_dimension: String,

    /// Cell rows; the endpoint omits the field entirely for an empty range
    #[serde(default)]
    pub values: Vec<Option<Vec<Value>>>,
}

impl SheetValues {
    /// Drop null and empty rows, keeping the remaining rows in sheet order.
    ///
    /// Null cells read as empty text; numbers and booleans as their JSON text.
    pub fn into_rows(self) -> Vec<Vec<String>> {
        self.values
            .into_iter()
            .flatten()
            .filter(|row| !row.is_empty())
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect()
    }
}

fn cell_text(cell: Value) -> String {
    match cell {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Access rule: (role, resource, action, permission)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRule {
    pub role: String,
    pub resource: String,
    pub action: String,
    /// "ALLOW" or "DENY" (case-insensitive); anything else denies
    pub permission: String,
}

impl AccessRule {
    pub fn new(
        role: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
        permission: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            resource: resource.into(),
            action: action.into(),
            permission: permission.into(),
        }
    }

    /// Build a rule from a sheet row; rows with fewer than four cells yield `None`
    pub fn from_row(row: &[String]) -> Option<Self> {
        match row {
            [role, resource, action, permission, ..] => {
                Some(Self::new(role, resource, action, permission))
            }
            _ => None,
        }
    }

    /// Case-insensitive match on role, resource and action
    pub fn matches(&self, role: &str, resource: &str, action: &str) -> bool {
        eq_ignore_case(&self.role, role)
            && eq_ignore_case(&self.resource, resource)
            && eq_ignore_case(&self.action, action)
    }

    /// Whether the rule grants access
    pub fn allows(&self) -> bool {
        eq_ignore_case(&self.permission, "ALLOW")
    }
}

impl fmt::Display for AccessRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.role, self.resource, self.action, self.permission
        )
    }
}

/// Ordered rule table; order decides which rule wins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTable {
    rules: Vec<AccessRule>,
}

impl RuleTable {
    pub fn new(rules: Vec<AccessRule>) -> Self {
        Self { rules }
    }

    /// Parse sheet rows, skipping rows that are too short
    pub fn from_rows<R: AsRef<[String]>>(rows: &[R]) -> Self {
        let rules: Vec<AccessRule> = rows
            .iter()
            .filter_map(|row| AccessRule::from_row(row.as_ref()))
            .collect();

        if rules.len() < rows.len() {
            debug!("Skipped {} malformed rule rows", rows.len() - rules.len());
        }

        Self { rules }
    }

    /// First rule matching (role, resource, action), in table order
    pub fn first_match(
        &self,
        role: &str,
        resource: &str,
        action: &str,
    ) -> Option<(usize, &AccessRule)> {
        self.rules
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.matches(role, resource, action))
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccessRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Final ALLOW/DENY outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Allow,
    #[default]
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Literal written back to the host: "ALLOW" or "DENY"
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Allow => "ALLOW",
            Decision::Deny => "DENY",
        }
    }
}

impl From<bool> for Decision {
    fn from(allowed: bool) -> Self {
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access check input, as extracted by the host from its request context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequest {
    /// Identity being checked (usually an email address)
    pub subject: String,

    /// Target of the access (e.g., a request path)
    pub resource: String,

    /// Verb (e.g., an HTTP method)
    pub action: String,
}

impl AccessRequest {
    pub fn new(
        subject: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            resource: resource.into(),
            action: action.into(),
        }
    }
}

/// Unicode-aware case-insensitive equality without allocating
pub(crate) fn eq_ignore_case(a: &str, b: &str) -> bool {
    if a.is_ascii() && b.is_ascii() {
        return a.eq_ignore_ascii_case(b);
    }
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}
