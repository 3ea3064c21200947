//! Reference data supplied by the external directories.
//!
//! The engine treats these as immutable lookup results and never persists them.

use serde::{Deserialize, Serialize};

/// Customer classification as reported by the customer directory
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum CustomerType {
    Private,
    Business,
    /// The directory does not know the email (or could not be reached)
    #[default]
    Unknown,
}

impl std::fmt::Display for CustomerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CustomerType::Private => write!(f, "Private"),
            CustomerType::Business => write!(f, "Business"),
            CustomerType::Unknown => write!(f, "Unknown"),
        }
    }
}

impl std::str::FromStr for CustomerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "private" | "privat" => Ok(CustomerType::Private),
            "business" => Ok(CustomerType::Business),
            "unknown" => Ok(CustomerType::Unknown),
            other => Err(format!("unknown customer type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Customer {
    pub email: String,
    pub name: String,
    pub customer_type: CustomerType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Order {
    pub reference: String,
    pub customer_email: String,
}

/// A support team and the ids of its agents
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Team {
    pub name: String,
    pub description: String,
    pub skills: Vec<String>,
    pub agents: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub email: String,
    pub team: String,
    pub skills: Vec<String>,
    /// Inactive agents are never suggested by the routing advisor
    pub active: bool,
}
