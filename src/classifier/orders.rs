//! Order-reference extraction
//!
//! Patterns are tried in configuration order. The first pattern with any
//! match wins and its first match becomes the candidate; the candidate is
//! only accepted if the order directory knows it.

use regex::Regex;
use std::time::Duration;
use tracing::debug;

use super::ClassifierError;
use crate::directory::{with_timeout, CustomerDirectory, DirectoryError};

#[derive(Debug, Clone)]
pub struct OrderReferenceExtractor {
    patterns: Vec<Regex>,
}

impl OrderReferenceExtractor {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ClassifierError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|e| ClassifierError::InvalidOrderPattern {
                    pattern: p.as_ref().to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Syntactic candidate, before directory verification.
    pub fn candidate<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.patterns
            .iter()
            .find_map(|re| re.find(text))
            .map(|m| m.as_str())
    }

    /// Candidate verified against the order directory.
    ///
    /// `Ok(None)` when nothing matches or the directory does not know the
    /// candidate; `Err` when the directory failed or exceeded `limit`.
    pub async fn extract(
        &self,
        text: &str,
        directory: &dyn CustomerDirectory,
        limit: Duration,
    ) -> Result<Option<String>, DirectoryError> {
        let Some(candidate) = self.candidate(text) else {
            return Ok(None);
        };

        match with_timeout(limit, directory.lookup_order(candidate)).await? {
            Some(order) => Ok(Some(order.reference)),
            None => {
                debug!(candidate = %candidate, "Order reference candidate not in directory, discarded");
                Ok(None)
            }
        }
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}
