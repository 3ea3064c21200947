//! In-memory directory implementations
//!
//! Immutable after construction: built once, shared behind an `Arc`, and
//! injected into the classifier, automation engine and routing advisor.

use async_trait::async_trait;
use std::collections::HashMap;

use super::{CustomerDirectory, DirectoryError, TeamDirectory};
use crate::config::defaults;
use crate::types::{Agent, Customer, CustomerType, Order, Team};

// ============================================================================
// Customers & Orders
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct InMemoryCustomerDirectory {
    customers: HashMap<String, Customer>,
    orders: HashMap<String, Order>,
}

impl InMemoryCustomerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_customer(
        mut self,
        email: impl Into<String>,
        name: impl Into<String>,
        customer_type: CustomerType,
    ) -> Self {
        let email = email.into();
        self.customers.insert(
            email.clone(),
            Customer {
                email,
                name: name.into(),
                customer_type,
            },
        );
        self
    }

    #[must_use]
    pub fn with_order(mut self, reference: impl Into<String>, customer_email: impl Into<String>) -> Self {
        let reference = reference.into();
        self.orders.insert(
            reference.clone(),
            Order {
                reference,
                customer_email: customer_email.into(),
            },
        );
        self
    }

    /// Demo shop data: private and business customers plus a handful of orders
    /// in each reference format.
    pub fn demo() -> Self {
        Self::new()
            .with_customer("anna.meier@privat.com", "Anna Meier", CustomerType::Private)
            .with_customer("john.doe@business.com", "John Doe", CustomerType::Business)
            .with_customer("support@acme.inc", "ACME Inc. Support", CustomerType::Business)
            .with_customer("maria.garcia@privat.com", "Maria Garcia", CustomerType::Private)
            .with_customer("tech@innovate.corp", "Innovate Corp", CustomerType::Business)
            .with_customer("customer@retail.shop", "Retail Shop GmbH", CustomerType::Business)
            .with_customer("peter.mueller@home.de", "Peter Müller", CustomerType::Private)
            .with_customer("info@startup.tech", "StartUp Tech", CustomerType::Business)
            .with_customer("support@global.enterprise", "Global Enterprise", CustomerType::Business)
            .with_customer("sarah.weber@email.de", "Sarah Weber", CustomerType::Private)
            .with_order("100-58273", "anna.meier@privat.com")
            .with_order("200-12345", "maria.garcia@privat.com")
            .with_order("300-67890", "customer@retail.shop")
            .with_order("400-11111", "anna.meier@privat.com")
            .with_order("ORD-482913", "john.doe@business.com")
            .with_order("B20240117", "support@acme.inc")
    }

    pub fn customer_count(&self) -> usize {
        self.customers.len()
    }
}

#[async_trait]
impl CustomerDirectory for InMemoryCustomerDirectory {
    async fn lookup_customer(&self, email: &str) -> Result<Option<Customer>, DirectoryError> {
        Ok(self.customers.get(email).cloned())
    }

    async fn lookup_order(&self, reference: &str) -> Result<Option<Order>, DirectoryError> {
        Ok(self.orders.get(reference).cloned())
    }
}

// ============================================================================
// Teams & Agents
// ============================================================================

/// Static team roster. Team order is preserved for `list_teams`.
#[derive(Debug, Clone, Default)]
pub struct StaticTeamRoster {
    teams: Vec<Team>,
    agents: HashMap<String, Agent>,
}

impl StaticTeamRoster {
    /// Build a roster, linking each agent into the team it names.
    ///
    /// Agents naming an unknown team are kept (so `get_agent` finds them) but
    /// belong to no roster.
    pub fn new(mut teams: Vec<Team>, agents: Vec<Agent>) -> Self {
        let mut by_id = HashMap::with_capacity(agents.len());
        for agent in agents {
            if let Some(team) = teams.iter_mut().find(|t| t.name == agent.team) {
                if !team.agents.contains(&agent.id) {
                    team.agents.push(agent.id.clone());
                }
            } else {
                tracing::warn!(agent = %agent.id, team = %agent.team, "Agent references unknown team");
            }
            by_id.insert(agent.id.clone(), agent);
        }
        Self {
            teams,
            agents: by_id,
        }
    }

    /// The four demo teams and six agents.
    pub fn demo() -> Self {
        let teams = vec![
            team(defaults::BASELINE_TEAM, "First level support: general requests", &["General", "Orders", "Shipping"]),
            team(defaults::SECOND_LEVEL_TEAM, "Second level support: technical problems", &["Technical", "API", "Integration", "Bugs"]),
            team(defaults::FINANCE_TEAM, "Financial support: invoices and payments", &["Invoice", "Payment", "Dunning", "Accounting"]),
            team(defaults::AFTER_SALES_TEAM, "After-sales support: returns and exchanges", &["Return", "Exchange", "Refund", "Warranty"]),
        ];
        let agents = vec![
            agent("agent1", "Sarah Weber", defaults::BASELINE_TEAM, &["General", "Orders"]),
            agent("agent2", "Michael Schmidt", defaults::BASELINE_TEAM, &["General", "Shipping"]),
            agent("agent3", "Lisa Müller", defaults::SECOND_LEVEL_TEAM, &["Technical", "API"]),
            agent("agent4", "Thomas Klein", defaults::SECOND_LEVEL_TEAM, &["Integration", "Bugs"]),
            agent("agent5", "Julia Fischer", defaults::FINANCE_TEAM, &["Invoice", "Payment"]),
            agent("agent6", "Robert Wagner", defaults::AFTER_SALES_TEAM, &["Return", "Warranty"]),
        ];
        Self::new(teams, agents)
    }
}

fn team(name: &str, description: &str, skills: &[&str]) -> Team {
    Team {
        name: name.to_string(),
        description: description.to_string(),
        skills: skills.iter().map(|s| (*s).to_string()).collect(),
        agents: Vec::new(),
    }
}

fn agent(id: &str, name: &str, team: &str, skills: &[&str]) -> Agent {
    let email = format!(
        "{}@coredesk.com",
        name.to_lowercase().replace(' ', ".").replace('ü', "ue")
    );
    Agent {
        id: id.to_string(),
        name: name.to_string(),
        email,
        team: team.to_string(),
        skills: skills.iter().map(|s| (*s).to_string()).collect(),
        active: true,
    }
}

#[async_trait]
impl TeamDirectory for StaticTeamRoster {
    async fn list_teams(&self) -> Result<Vec<Team>, DirectoryError> {
        Ok(self.teams.clone())
    }

    async fn get_team(&self, name: &str) -> Result<Option<Team>, DirectoryError> {
        Ok(self.teams.iter().find(|t| t.name == name).cloned())
    }

    async fn list_team_agents(&self, team: &str) -> Result<Vec<Agent>, DirectoryError> {
        let Some(team) = self.teams.iter().find(|t| t.name == team) else {
            return Ok(Vec::new());
        };
        Ok(team
            .agents
            .iter()
            .filter_map(|id| self.agents.get(id).cloned())
            .collect())
    }

    async fn get_agent(&self, id: &str) -> Result<Option<Agent>, DirectoryError> {
        Ok(self.agents.get(id).cloned())
    }
}
