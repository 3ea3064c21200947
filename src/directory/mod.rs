//! Directory Adapters
//!
//! The engine consults two external directories and owns neither:
//!
//! - **CustomerDirectory**: customer type and order records, keyed by email /
//!   order reference (the ERP side)
//! - **TeamDirectory**: static roster of teams, agents and skills
//!
//! Every lookup is async and may be slow. Callers wrap lookups in
//! [`with_timeout`] and treat any `DirectoryError` as "enrichment skipped";
//! a directory failure never fails a ticket operation.
//!
//! "Not found" is `Ok(None)` (or `Ok(false)` / an empty list), never an error.

mod memory;

pub use memory::{InMemoryCustomerDirectory, StaticTeamRoster};

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use crate::types::{Agent, Customer, CustomerType, Order, Team};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),

    #[error("directory lookup timed out after {0:?}")]
    Timeout(Duration),
}

// ============================================================================
// Traits
// ============================================================================

/// Customer and order lookup (ERP connector)
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    async fn lookup_customer(&self, email: &str) -> Result<Option<Customer>, DirectoryError>;

    async fn lookup_order(&self, reference: &str) -> Result<Option<Order>, DirectoryError>;

    /// `false` for unknown emails.
    async fn is_business_customer(&self, email: &str) -> Result<bool, DirectoryError> {
        Ok(self
            .lookup_customer(email)
            .await?
            .is_some_and(|c| c.customer_type == CustomerType::Business))
    }
}

/// Team and agent roster
#[async_trait]
pub trait TeamDirectory: Send + Sync {
    async fn list_teams(&self) -> Result<Vec<Team>, DirectoryError>;

    async fn get_team(&self, name: &str) -> Result<Option<Team>, DirectoryError>;

    /// Agents of `team`, in roster order. Empty for unknown teams.
    async fn list_team_agents(&self, team: &str) -> Result<Vec<Agent>, DirectoryError>;

    async fn get_agent(&self, id: &str) -> Result<Option<Agent>, DirectoryError>;
}

// ============================================================================
// Timeout Guard
// ============================================================================

/// Run a directory lookup with an upper bound on its duration.
///
/// Elapsed lookups are cancelled (the future is dropped) and reported as
/// `DirectoryError::Timeout`.
pub async fn with_timeout<T, F>(limit: Duration, lookup: F) -> Result<T, DirectoryError>
where
    F: Future<Output = Result<T, DirectoryError>>,
{
    match tokio::time::timeout(limit, lookup).await {
        Ok(result) => result,
        Err(_) => Err(DirectoryError::Timeout(limit)),
    }
}
