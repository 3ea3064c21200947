//! Desk Configuration Module
//!
//! Provides the desk configuration loaded from TOML files: classifier
//! keywords, order-reference patterns, team names, the automation rule list
//! and directory timeouts.
//!
//! ## Loading Order
//!
//! 1. `COREDESK_CONFIG` environment variable (path to TOML file)
//! 2. `coredesk.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! The config is loaded once and handed to the components that need it.
//! There is no global instance:
//!
//! ```ignore
//! let config = DeskConfig::load();
//! let engine = AutomationEngine::new(&config, customers, teams.clone())?;
//! let store = TicketStore::new(&config, Arc::new(engine));
//! let router = RoutingAdvisor::new(&config, teams);
//! ```

mod desk_config;
pub mod defaults;
pub mod validation;

pub use desk_config::*;
