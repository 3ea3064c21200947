//! Classifier
//!
//! Derives ticket metadata from free text:
//!
//! - **Keyword categories** (finance, after-sales, technical, critical): pure,
//!   synchronous substring tests
//! - **Order references**: regex candidate verified against the order directory
//! - **Business customer check**: one customer-directory call by email
//!
//! The two directory-backed operations are async and bounded by the
//! configured lookup timeout. Their errors are returned to the caller, which
//! decides what "skip the enrichment" means.

mod keywords;
mod orders;

pub use keywords::{contains_any, Category, KeywordClassifier};
pub use orders::OrderReferenceExtractor;

use std::sync::Arc;
use std::time::Duration;

use crate::config::DeskConfig;
use crate::directory::{with_timeout, CustomerDirectory, DirectoryError};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("invalid order pattern '{pattern}': {reason}")]
    InvalidOrderPattern { pattern: String, reason: String },
}

/// Keyword, order and customer classification bound to one customer directory.
#[derive(Clone)]
pub struct Classifier {
    keywords: KeywordClassifier,
    orders: OrderReferenceExtractor,
    customers: Arc<dyn CustomerDirectory>,
    lookup_timeout: Duration,
}

impl Classifier {
    pub fn new(
        config: &DeskConfig,
        customers: Arc<dyn CustomerDirectory>,
    ) -> Result<Self, ClassifierError> {
        Ok(Self {
            keywords: KeywordClassifier::new(&config.keywords),
            orders: OrderReferenceExtractor::new(&config.orders.patterns)?,
            customers,
            lookup_timeout: config.directory.lookup_timeout(),
        })
    }

    pub const fn keywords(&self) -> &KeywordClassifier {
        &self.keywords
    }

    /// Every matching keyword category, in fixed evaluation order.
    pub fn categorize(&self, text: &str) -> Vec<Category> {
        self.keywords.classify(text)
    }

    /// Verified order reference found in `text`, if any.
    pub async fn extract_order_reference(&self, text: &str) -> Result<Option<String>, DirectoryError> {
        self.orders
            .extract(text, self.customers.as_ref(), self.lookup_timeout)
            .await
    }

    /// `Ok(false)` for unknown emails; `Err` only when the directory failed.
    pub async fn is_business_customer(&self, email: &str) -> Result<bool, DirectoryError> {
        with_timeout(self.lookup_timeout, self.customers.is_business_customer(email)).await
    }

    pub const fn lookup_timeout(&self) -> Duration {
        self.lookup_timeout
    }
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("keywords", &self.keywords)
            .field("order_patterns", &self.orders.pattern_count())
            .field("lookup_timeout", &self.lookup_timeout)
            .finish_non_exhaustive()
    }
}
