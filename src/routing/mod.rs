//! Routing Advisor
//!
//! Suggests a team and an agent for a ticket. Purely advisory: nothing here
//! mutates a ticket except [`RoutingAdvisor::route`], which goes through the
//! store like any other caller.
//!
//! ## Team
//!
//! Same keyword categorization as automation, in fixed order, first match wins:
//!
//! | Category    | Team                     |
//! |-------------|--------------------------|
//! | finance     | `teams.finance`          |
//! | after-sales | `teams.after_sales`      |
//! | technical   | `teams.second_level`     |
//! | (none)      | `desk.baseline_team`     |
//!
//! ## Agent
//!
//! Only active agents of the suggested team are candidates.
//!
//! - `round_robin` (default): `ticket.id % roster.len()`, stable for a given
//!   ticket and roster
//! - `random`: uniform pick
//!
//! An empty roster, an unknown team, or a failed directory call yields `None`.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::classifier::{Category, KeywordClassifier};
use crate::config::{DeskConfig, TeamNames};
use crate::directory::{with_timeout, TeamDirectory};
use crate::store::TicketStore;
use crate::types::{Agent, Ticket, TicketId};

/// Agent selection policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentSelection {
    #[default]
    RoundRobin,
    Random,
}

impl std::fmt::Display for AgentSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RoundRobin => write!(f, "round_robin"),
            Self::Random => write!(f, "random"),
        }
    }
}

pub struct RoutingAdvisor {
    keywords: KeywordClassifier,
    team_names: TeamNames,
    baseline_team: String,
    teams: Arc<dyn TeamDirectory>,
    selection: AgentSelection,
    lookup_timeout: Duration,
}

impl RoutingAdvisor {
    pub fn new(config: &DeskConfig, teams: Arc<dyn TeamDirectory>) -> Self {
        Self {
            keywords: KeywordClassifier::new(&config.keywords),
            team_names: config.teams.clone(),
            baseline_team: config.desk.baseline_team.clone(),
            teams,
            selection: config.routing.agent_selection,
            lookup_timeout: config.directory.lookup_timeout(),
        }
    }

    #[must_use]
    pub const fn with_selection(mut self, selection: AgentSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn suggest_team(&self, ticket: &Ticket) -> String {
        let team = match self.keywords.routing_category(&ticket.classification_text()) {
            Some(Category::Finance) => &self.team_names.finance,
            Some(Category::AfterSales) => &self.team_names.after_sales,
            Some(Category::Technical) => &self.team_names.second_level,
            Some(Category::Critical) | None => &self.baseline_team,
        };
        team.clone()
    }

    pub async fn suggest_agent(&self, ticket: &Ticket) -> Option<String> {
        let team = self.suggest_team(ticket);
        let roster = match with_timeout(self.lookup_timeout, self.teams.list_team_agents(&team)).await {
            Ok(agents) => agents,
            Err(e) => {
                warn!(ticket_id = ticket.id, team = %team, error = %e, "Agent roster unavailable, no suggestion");
                return None;
            }
        };

        let active: Vec<&Agent> = roster.iter().filter(|a| a.active).collect();
        let chosen = self.pick(ticket.id, &active)?;
        debug!(
            ticket_id = ticket.id,
            team = %team,
            agent = %chosen.id,
            selection = %self.selection,
            "Agent suggested"
        );
        Some(chosen.id.clone())
    }

    /// Apply both suggestions to a stored ticket: reassign the team when it
    /// differs, then assign the suggested agent. Returns the updated ticket,
    /// or `None` for an unknown id.
    pub async fn route(&self, store: &TicketStore, id: TicketId) -> Option<Ticket> {
        let mut ticket = store.get_ticket(id)?;

        let team = self.suggest_team(&ticket);
        if team != ticket.assigned_team {
            ticket = store.assign_team(id, &team, Some("routing suggestion"))?;
        }

        if let Some(agent) = self.suggest_agent(&ticket).await {
            if ticket.assigned_agent.as_deref() != Some(agent.as_str()) {
                ticket = store.assign_agent(id, Some(&agent), Some("routing suggestion"))?;
            }
        }

        info!(
            ticket_id = id,
            team = %ticket.assigned_team,
            agent = ?ticket.assigned_agent,
            "Ticket routed"
        );
        Some(ticket)
    }

    fn pick<'a>(&self, ticket_id: TicketId, active: &[&'a Agent]) -> Option<&'a Agent> {
        if active.is_empty() {
            return None;
        }
        match self.selection {
            AgentSelection::RoundRobin => {
                let len = u64::try_from(active.len()).ok()?;
                let index = usize::try_from(ticket_id % len).ok()?;
                active.get(index).copied()
            }
            AgentSelection::Random => active.choose(&mut rand::thread_rng()).copied(),
        }
    }
}

impl std::fmt::Debug for RoutingAdvisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingAdvisor")
            .field("baseline_team", &self.baseline_team)
            .field("selection", &self.selection)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{DirectoryError, StaticTeamRoster};
    use crate::types::Team;
    use async_trait::async_trait;
    use chrono::Utc;

    fn advisor() -> RoutingAdvisor {
        RoutingAdvisor::new(&DeskConfig::default(), Arc::new(StaticTeamRoster::demo()))
    }

    fn ticket(id: TicketId, subject: &str, content: &str) -> Ticket {
        Ticket::new(id, "anna.meier@privat.com", subject, content, "1st-Level", Utc::now())
    }

    struct BrokenRoster;

    #[async_trait]
    impl TeamDirectory for BrokenRoster {
        async fn list_teams(&self) -> Result<Vec<Team>, DirectoryError> {
            Err(DirectoryError::Unavailable("roster offline".into()))
        }
        async fn get_team(&self, _name: &str) -> Result<Option<Team>, DirectoryError> {
            Err(DirectoryError::Unavailable("roster offline".into()))
        }
        async fn list_team_agents(&self, _team: &str) -> Result<Vec<Agent>, DirectoryError> {
            Err(DirectoryError::Unavailable("roster offline".into()))
        }
        async fn get_agent(&self, _id: &str) -> Result<Option<Agent>, DirectoryError> {
            Err(DirectoryError::Unavailable("roster offline".into()))
        }
    }

    #[test]
    fn team_follows_fixed_category_order() {
        let a = advisor();
        assert_eq!(a.suggest_team(&ticket(1, "Rechnung", "Betrag falsch")), "Finance");
        assert_eq!(a.suggest_team(&ticket(1, "Retoure", "Artikel zurück")), "After-Sales");
        assert_eq!(a.suggest_team(&ticket(1, "Login", "Error beim Anmelden")), "2nd-Level");
        // finance and technical both match, finance comes first
        assert_eq!(a.suggest_team(&ticket(1, "Rechnung", "Die API zeigt einen Fehler")), "Finance");
        assert_eq!(a.suggest_team(&ticket(1, "Lieferung", "Wann kommt sie?")), "1st-Level");
    }

    #[tokio::test]
    async fn round_robin_is_id_modulo_roster() {
        let a = advisor();
        // 2nd-Level roster: agent3, agent4
        let t2 = ticket(2, "Login", "Error beim Anmelden");
        let t3 = ticket(3, "Login", "Error beim Anmelden");
        assert_eq!(a.suggest_agent(&t2).await.as_deref(), Some("agent3"));
        assert_eq!(a.suggest_agent(&t3).await.as_deref(), Some("agent4"));
        assert_eq!(a.suggest_agent(&t3).await, a.suggest_agent(&t3).await);
    }

    #[tokio::test]
    async fn random_selection_stays_within_roster() {
        let a = advisor().with_selection(AgentSelection::Random);
        let t = ticket(5, "Login", "Error beim Anmelden");
        for _ in 0..20 {
            let agent = a.suggest_agent(&t).await.unwrap();
            assert!(agent == "agent3" || agent == "agent4");
        }
    }

    #[tokio::test]
    async fn inactive_or_missing_roster_yields_none() {
        let teams = vec![Team {
            name: "1st-Level".into(),
            description: String::new(),
            skills: Vec::new(),
            agents: Vec::new(),
        }];
        let agents = vec![Agent {
            id: "agent9".into(),
            name: "On Leave".into(),
            email: "leave@coredesk.com".into(),
            team: "1st-Level".into(),
            skills: Vec::new(),
            active: false,
        }];
        let a = RoutingAdvisor::new(&DeskConfig::default(), Arc::new(StaticTeamRoster::new(teams, agents)));
        assert_eq!(a.suggest_agent(&ticket(1, "Lieferung", "Wann kommt sie?")).await, None);
        // Finance has no roster at all here
        assert_eq!(a.suggest_agent(&ticket(1, "Rechnung", "Betrag falsch")).await, None);
    }

    #[tokio::test]
    async fn directory_failure_yields_none() {
        let a = RoutingAdvisor::new(&DeskConfig::default(), Arc::new(BrokenRoster));
        assert_eq!(a.suggest_agent(&ticket(1, "Lieferung", "Wann kommt sie?")).await, None);
    }
}
