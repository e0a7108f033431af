//! # SheetGate Access Decision Engine
//!
//! Spreadsheet-driven ALLOW/DENY decisions for web requests.
//!
//! ## Features
//!
//! - **Role resolution** from exact subjects and `*@domain` wildcards
//! - **Two-pass rule matching**: the subject's role first, then the `any` role
//! - **Fail-closed**: unavailable tables or no matching rule mean DENY
//! - **TTL caching** of both tables and the access token
//! - **Two credential strategies**: the managed-runtime metadata server, or a
//!   local `gcloud` impersonation helper
//!
//! ## Example
//!
//! ```rust
//! use sheetgate_authz::{AccessDecisionEngine, StaticConfigStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = StaticConfigStore::from_rows(
//!         &[vec!["*@example.com".to_string(), "member".to_string()]],
//!         &[vec![
//!             "member".to_string(),
//!             "/reports".to_string(),
//!             "GET".to_string(),
//!             "ALLOW".to_string(),
//!         ]],
//!     );
//!     let engine = AccessDecisionEngine::new(Arc::new(store));
//!
//!     assert!(engine.evaluate("bob@example.com", "/reports", "GET").await);
//!     assert!(!engine.evaluate("bob@example.com", "/reports", "DELETE").await);
//! }
//! ```

pub mod types;
pub mod roles;
pub mod cache;
pub mod config;
pub mod command;
pub mod token;
pub mod store;
pub mod engine;
pub mod error;
pub mod server;

// Re-export commonly used types
pub use types::{AccessRequest, AccessRule, Decision, RuleTable, ANY_ROLE};
pub use roles::{RoleMapping, RoleResolver, RoleTable};
pub use cache::{CacheStats, Clock, ManualClock, SystemClock, TtlCache};
pub use config::{AuthzConfig, CacheTtls, CredentialConfig};
pub use token::{TokenProvider, TokenSource};
pub use store::{ConfigStore, RemoteConfigStore, StaticConfigStore};
pub use engine::{AccessDecision, AccessDecisionEngine, DecisionReason, EngineMetrics};
pub use error::{AuthzError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
