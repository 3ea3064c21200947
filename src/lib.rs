//! CoreDesk: Support Ticket Lifecycle & Automation
//!
//! Tracks customer support tickets from creation to closure and applies
//! keyword- and customer-driven automation on the way.
//!
//! ## Architecture
//!
//! - **Classifier**: keyword categories, order references, business-customer check
//! - **Automation Engine**: ordered rule interpreter for new tickets, reply-driven status transitions
//! - **Ticket Store**: id allocation, per-ticket atomic mutation with audit trail
//! - **Routing Advisor**: team and agent suggestions
//! - **Filter**: predicate + ordering over ticket snapshots
//!
//! Directories (customers, orders, teams, agents) sit behind async traits and
//! are injected at construction time together with a [`DeskConfig`].

pub mod automation;
pub mod classifier;
pub mod config;
pub mod directory;
pub mod filter;
pub mod routing;
pub mod store;
pub mod types;

pub use config::{ConfigError, DeskConfig};

pub use types::{
    Agent, Customer, CustomerType, Order, Team, Ticket, TicketId, TicketPriority, TicketStatus,
    TicketUpdate, UpdateDraft, UpdateKind,
};

pub use automation::{AutomationEngine, AutomationRule, MergePolicy, RuleCondition, RuleEffect};
pub use classifier::{Category, Classifier, ClassifierError};
pub use directory::{
    CustomerDirectory, DirectoryError, InMemoryCustomerDirectory, StaticTeamRoster, TeamDirectory,
};
pub use filter::{DateRange, FilterContext, TicketQuery};
pub use routing::{AgentSelection, RoutingAdvisor};
pub use store::{NewTicket, TicketStore};
