//! Role and rule table storage

use crate::roles::RoleTable;
use crate::types::RuleTable;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

pub mod remote;

pub use remote::RemoteConfigStore;

/// Source of the role and rule tables
///
/// `None` means the table is unavailable right now. Stores never raise: the
/// engine treats a missing table as empty and denies.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Snapshot of the role table
    async fn get_roles(&self) -> Option<Arc<RoleTable>>;

    /// Snapshot of the rule table
    async fn get_rules(&self) -> Option<Arc<RuleTable>>;
}

/// In-memory store with tables supplied by the caller
pub struct StaticConfigStore {
    roles: RwLock<Option<Arc<RoleTable>>>,
    rules: RwLock<Option<Arc<RuleTable>>>,
}

impl StaticConfigStore {
    /// Create a store serving the given tables
    pub fn new(roles: RoleTable, rules: RuleTable) -> Self {
        Self {
            roles: RwLock::new(Some(Arc::new(roles))),
            rules: RwLock::new(Some(Arc::new(rules))),
        }
    }

    /// Create a store from raw sheet rows
    pub fn from_rows<R: AsRef<[String]>>(roles: &[R], rules: &[R]) -> Self {
        Self::new(RoleTable::from_rows(roles), RuleTable::from_rows(rules))
    }

    /// Create a store whose tables are both unavailable
    pub fn unavailable() -> Self {
        Self {
            roles: RwLock::new(None),
            rules: RwLock::new(None),
        }
    }

    /// Replace the role table (`None` marks it unavailable)
    pub async fn set_roles(&self, roles: Option<RoleTable>) {
        *self.roles.write().await = roles.map(Arc::new);
    }

    /// Replace the rule table (`None` marks it unavailable)
    pub async fn set_rules(&self, rules: Option<RuleTable>) {
        *self.rules.write().await = rules.map(Arc::new);
    }
}

impl Default for StaticConfigStore {
    fn default() -> Self {
        Self::new(RoleTable::default(), RuleTable::default())
    }
}

#[async_trait]
impl ConfigStore for StaticConfigStore {
    async fn get_roles(&self) -> Option<Arc<RoleTable>> {
        self.roles.read().await.clone()
    }

    async fn get_rules(&self) -> Option<Arc<RuleTable>> {
        self.rules.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AccessRule;

    #[tokio::test]
    async fn test_static_store_snapshots() {
        let store = StaticConfigStore::default();
        let before = store.get_rules().await.unwrap();
        assert!(before.is_empty());

        store
            .set_rules(Some(RuleTable::new(vec![AccessRule::new("any", "/x", "GET", "ALLOW")])))
            .await;

        // Earlier snapshots are unaffected by replacement
        assert!(before.is_empty());
        assert_eq!(store.get_rules().await.unwrap().len(), 1);

        store.set_roles(None).await;
        assert!(store.get_roles().await.is_none());
    }

    #[tokio::test]
    async fn test_unavailable_store() {
        let store = StaticConfigStore::unavailable();
        assert!(store.get_roles().await.is_none());
        assert!(store.get_rules().await.is_none());
    }
}
