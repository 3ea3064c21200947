//! Automation Engine
//!
//! Applies the rule list to new tickets and drives the automatic status
//! transitions when replies are added.
//!
//! ## New tickets
//!
//! 1. Extract a verified order reference from subject + first message
//! 2. Gather the remaining facts (business customer, known teams) concurrently
//! 3. Evaluate every rule exactly once, in list order. A matching rule
//!    appends one internal audit note; a faulting rule is logged and skipped
//! 4. Merge the directives of all matching rules (see `rules`) and apply them
//! 5. Refresh `last_updated`
//!
//! ## Replies
//!
//! | Author        | Current status       | New status           |
//! |---------------|----------------------|----------------------|
//! | customer      | Waiting for Customer | Open                 |
//! | anyone else   | Open                 | Waiting for Customer |
//!
//! Internal notes never transition. Every other combination leaves the status
//! unchanged; `last_updated` is refreshed regardless.

mod rules;

pub use rules::{
    default_rules, AutomationRule, Directive, DirectiveSet, MergePolicy, Resolution, RuleCondition,
    RuleContext, RuleEffect, RuleError,
};

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::classifier::{Classifier, ClassifierError};
use crate::config::DeskConfig;
use crate::directory::{with_timeout, CustomerDirectory, DirectoryError, TeamDirectory};
use crate::types::{Ticket, TicketStatus, TicketUpdate, UpdateDraft, UpdateKind};

/// Rule interpreter plus the reply-driven status machine
pub struct AutomationEngine {
    rules: Vec<AutomationRule>,
    merge_policy: MergePolicy,
    classifier: Classifier,
    teams: Arc<dyn TeamDirectory>,
    author: String,
    lookup_timeout: Duration,
}

impl AutomationEngine {
    /// Build the engine from config. Uses `[[automation.rules]]` when present,
    /// otherwise the built-in rule list.
    pub fn new(
        config: &DeskConfig,
        customers: Arc<dyn CustomerDirectory>,
        teams: Arc<dyn TeamDirectory>,
    ) -> Result<Self, ClassifierError> {
        let rules = if config.automation.rules.is_empty() {
            default_rules(&config.teams)
        } else {
            config.automation.rules.clone()
        };

        Ok(Self {
            rules,
            merge_policy: config.automation.merge_policy,
            classifier: Classifier::new(config, customers)?,
            teams,
            author: config.desk.automation_author.clone(),
            lookup_timeout: config.directory.lookup_timeout(),
        })
    }

    /// Replace the rule list.
    #[must_use]
    pub fn with_rules(mut self, rules: Vec<AutomationRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn rules(&self) -> &[AutomationRule] {
        &self.rules
    }

    pub const fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub const fn merge_policy(&self) -> MergePolicy {
        self.merge_policy
    }

    // ========================================================================
    // New tickets
    // ========================================================================

    /// Classify and route a freshly built ticket. Never fails: directory
    /// problems skip the dependent enrichment and rule faults skip the rule.
    pub async fn process_new_ticket(&self, ticket: Ticket) -> Ticket {
        self.process_new_ticket_at(ticket, Utc::now()).await
    }

    pub(crate) async fn process_new_ticket_at(&self, mut ticket: Ticket, now: DateTime<Utc>) -> Ticket {
        let text = ticket.classification_text();

        let (order, business, known_teams) = futures::join!(
            self.classifier.extract_order_reference(&text),
            self.business_check(&ticket.customer_email),
            self.known_teams(),
        );

        match order {
            Ok(Some(order_id)) => {
                debug!(ticket_id = ticket.id, order_id = %order_id, "Linked order reference");
                ticket.order_id = Some(order_id);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(ticket_id = ticket.id, error = %e, "Order lookup failed, order linkage skipped");
            }
        }

        let order_id = ticket.order_id.clone();
        let ctx = RuleContext {
            text: text.to_lowercase(),
            order_id: order_id.as_deref(),
            business_customer: business,
            known_teams,
            keywords: self.classifier.keywords(),
        };

        let mut directives = DirectiveSet::default();
        let mut fired = 0usize;
        for rule in &self.rules {
            match rule.apply(&ctx) {
                Ok(Some(rule_directives)) => {
                    debug!(ticket_id = ticket.id, rule = %rule.name, "Automation rule matched");
                    directives.extend(rule_directives);
                    ticket.push_update(
                        UpdateDraft::audit(
                            self.author.clone(),
                            format!("Automatically applied: {}", rule.name),
                            true,
                            UpdateKind::InternalNote,
                        ),
                        now,
                    );
                    fired += 1;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(ticket_id = ticket.id, rule = %rule.name, error = %e, "Automation rule failed, skipping");
                }
            }
        }

        let resolution = directives.resolve(self.merge_policy);
        apply_resolution(&mut ticket, resolution);
        ticket.touch(now);

        info!(
            ticket_id = ticket.id,
            rules_fired = fired,
            team = %ticket.assigned_team,
            priority = %ticket.priority,
            status = %ticket.status,
            order_id = ?ticket.order_id,
            "New ticket processed"
        );

        ticket
    }

    async fn business_check(&self, email: &str) -> Result<bool, DirectoryError> {
        if self.rules.iter().any(|r| r.condition.needs_customer_lookup()) {
            self.classifier.is_business_customer(email).await
        } else {
            Ok(false)
        }
    }

    async fn known_teams(&self) -> Option<HashSet<String>> {
        if !self.rules.iter().any(|r| r.effects.iter().any(RuleEffect::needs_team_lookup)) {
            return None;
        }
        match with_timeout(self.lookup_timeout, self.teams.list_teams()).await {
            Ok(teams) => Some(teams.into_iter().map(|t| t.name).collect()),
            Err(e) => {
                warn!(error = %e, "Team directory unavailable, team effects not validated");
                None
            }
        }
    }

    // ========================================================================
    // Replies
    // ========================================================================

    /// Apply the reply-driven status transition for an update that has just
    /// been appended to `ticket`. Returns the new status if one fired.
    pub fn process_ticket_update(&self, ticket: &mut Ticket, update: &TicketUpdate) -> Option<TicketStatus> {
        self.process_ticket_update_at(ticket, update, Utc::now())
    }

    pub(crate) fn process_ticket_update_at(
        &self,
        ticket: &mut Ticket,
        update: &TicketUpdate,
        now: DateTime<Utc>,
    ) -> Option<TicketStatus> {
        let transition = if update.is_internal {
            None
        } else if is_customer(ticket, &update.author) {
            (ticket.status == TicketStatus::WaitingForCustomer)
                .then_some((TicketStatus::Open, "customer reply received"))
        } else {
            (ticket.status == TicketStatus::Open)
                .then_some((TicketStatus::WaitingForCustomer, "agent reply"))
        };

        let fired = transition.map(|(new_status, cause)| {
            let old_status = ticket.status;
            ticket.status = new_status;
            ticket.push_update(
                UpdateDraft::audit(
                    self.author.clone(),
                    format!("Status automatically set to '{new_status}' ({cause})"),
                    true,
                    UpdateKind::StatusChange,
                ),
                now,
            );
            info!(ticket_id = ticket.id, from = %old_status, to = %new_status, "Automatic status transition");
            new_status
        });

        ticket.touch(now);
        fired
    }
}

impl std::fmt::Debug for AutomationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutomationEngine")
            .field("rules", &self.rules.len())
            .field("merge_policy", &self.merge_policy)
            .field("classifier", &self.classifier)
            .finish_non_exhaustive()
    }
}

fn is_customer(ticket: &Ticket, author: &str) -> bool {
    author.trim().eq_ignore_ascii_case(ticket.customer_email.trim())
}

fn apply_resolution(ticket: &mut Ticket, resolution: Resolution) {
    if let Some(team) = resolution.team {
        if team != ticket.assigned_team {
            ticket.assigned_team = team;
            ticket.assigned_agent = None;
        }
    }
    if let Some(priority) = resolution.priority {
        if priority > ticket.priority {
            ticket.priority = priority;
        }
    }
    if let Some(status) = resolution.status {
        ticket.status = status;
    }
    ticket.tags.extend(resolution.tags);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Category;
    use crate::directory::{InMemoryCustomerDirectory, StaticTeamRoster};
    use crate::types::TicketPriority;
    use async_trait::async_trait;
    use crate::types::{Customer, Order};

    fn engine() -> AutomationEngine {
        AutomationEngine::new(
            &DeskConfig::default(),
            Arc::new(InMemoryCustomerDirectory::demo()),
            Arc::new(StaticTeamRoster::demo()),
        )
        .unwrap()
    }

    fn ticket(email: &str, subject: &str, content: &str) -> Ticket {
        Ticket::new(1, email, subject, content, "1st-Level", Utc::now())
    }

    fn automation_notes(t: &Ticket) -> Vec<&str> {
        t.updates
            .iter()
            .filter(|u| u.author == "Automation" && u.kind == UpdateKind::InternalNote)
            .map(|u| u.content.as_str())
            .collect()
    }

    struct DownDirectory;

    #[async_trait]
    impl CustomerDirectory for DownDirectory {
        async fn lookup_customer(&self, _email: &str) -> Result<Option<Customer>, DirectoryError> {
            Err(DirectoryError::Unavailable("erp offline".to_string()))
        }
        async fn lookup_order(&self, _reference: &str) -> Result<Option<Order>, DirectoryError> {
            Err(DirectoryError::Unavailable("erp offline".to_string()))
        }
    }

    #[tokio::test]
    async fn plain_ticket_matches_no_rule() {
        let t = engine()
            .process_new_ticket(ticket("sarah.weber@email.de", "Lieferzeit", "Wann kommt meine Lieferung?"))
            .await;
        assert!(automation_notes(&t).is_empty());
        assert_eq!(t.updates.len(), 1);
        assert_eq!(t.assigned_team, "1st-Level");
        assert_eq!(t.priority, TicketPriority::Normal);
        assert_eq!(t.status, TicketStatus::Open);
        assert!(t.tags.is_empty());
        assert!(t.last_updated.is_some());
    }

    #[tokio::test]
    async fn business_invoice_ticket_gets_high_priority() {
        let t = engine()
            .process_new_ticket(ticket("john.doe@business.com", "Frage", "Bitte invoice 123 erneut senden"))
            .await;
        assert_eq!(t.priority, TicketPriority::High);
        assert!(t.has_tag("Business-Customer"));
        assert!(t.has_tag("Finance"));
        assert_eq!(t.assigned_team, "Finance");
        assert_eq!(
            automation_notes(&t),
            vec![
                "Automatically applied: Finance Team Assignment",
                "Automatically applied: Business Customer High Priority",
            ]
        );
    }

    #[tokio::test]
    async fn return_with_known_order_goes_to_after_sales_in_progress() {
        let t = engine()
            .process_new_ticket(ticket(
                "anna.meier@privat.com",
                "Retoure für Bestellung 100-58273",
                "Ich möchte den Artikel zurückschicken.",
            ))
            .await;
        assert_eq!(t.order_id.as_deref(), Some("100-58273"));
        assert_eq!(t.assigned_team, "After-Sales");
        assert_eq!(t.status, TicketStatus::InProgress);
        assert_eq!(t.tags, vec!["Return", "Order-Related"]);
        assert_eq!(automation_notes(&t).len(), 2);
        let seqs: Vec<u32> = t.updates.iter().map(|u| u.sequence).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn later_team_rule_wins_by_default() {
        let t = engine()
            .process_new_ticket(ticket("anna.meier@privat.com", "Rechnung falsch", "Die API zeigt einen Fehler"))
            .await;
        assert_eq!(t.assigned_team, "2nd-Level");
        assert_eq!(t.tags, vec!["Finance", "Technical"]);
    }

    #[tokio::test]
    async fn first_match_policy_keeps_earlier_team() {
        let mut config = DeskConfig::default();
        config.automation.merge_policy = MergePolicy::FirstMatchWins;
        let engine = AutomationEngine::new(
            &config,
            Arc::new(InMemoryCustomerDirectory::demo()),
            Arc::new(StaticTeamRoster::demo()),
        )
        .unwrap();
        let t = engine
            .process_new_ticket(ticket("anna.meier@privat.com", "Rechnung falsch", "Die API zeigt einen Fehler"))
            .await;
        assert_eq!(t.assigned_team, "Finance");
    }

    #[tokio::test]
    async fn critical_keyword_beats_business_priority() {
        let t = engine()
            .process_new_ticket(ticket("support@acme.inc", "URGENT", "Shop ist offline"))
            .await;
        assert_eq!(t.priority, TicketPriority::Critical);
        assert!(t.has_tag("Business-Customer"));
        assert!(t.has_tag("Critical"));
    }

    #[tokio::test]
    async fn directory_outage_skips_enrichment_but_keeps_other_rules() {
        let engine = AutomationEngine::new(
            &DeskConfig::default(),
            Arc::new(DownDirectory),
            Arc::new(StaticTeamRoster::demo()),
        )
        .unwrap();
        let t = engine
            .process_new_ticket(ticket("john.doe@business.com", "Retoure 100-58273", "Bitte abholen"))
            .await;
        assert!(t.order_id.is_none());
        assert_eq!(t.priority, TicketPriority::Normal);
        assert_eq!(t.status, TicketStatus::Open);
        assert_eq!(t.assigned_team, "After-Sales");
        assert_eq!(automation_notes(&t), vec!["Automatically applied: After-Sales Team Assignment"]);
    }

    #[tokio::test]
    async fn faulting_rule_does_not_stop_later_rules() {
        let rules = vec![
            AutomationRule::new(
                "Route to unknown team",
                RuleCondition::Category { category: Category::Finance },
                vec![RuleEffect::AssignTeam { team: "Accounting".to_string() }],
            ),
            AutomationRule::new(
                "Tag billing",
                RuleCondition::Category { category: Category::Finance },
                vec![RuleEffect::AddTag { tag: "Billing".to_string() }],
            ),
        ];
        let t = engine()
            .with_rules(rules)
            .process_new_ticket(ticket("anna.meier@privat.com", "Mahnung", "Zahlung ist erfolgt"))
            .await;
        assert_eq!(t.assigned_team, "1st-Level");
        assert_eq!(t.tags, vec!["Billing"]);
        assert_eq!(automation_notes(&t), vec!["Automatically applied: Tag billing"]);
    }

    #[test]
    fn agent_reply_moves_open_ticket_to_waiting() {
        let engine = engine();
        let mut t = ticket("anna.meier@privat.com", "Lieferzeit", "Wann?");
        let update = t.push_update(UpdateDraft::reply("agent1", "Morgen."), Utc::now()).clone();
        assert_eq!(
            engine.process_ticket_update(&mut t, &update),
            Some(TicketStatus::WaitingForCustomer)
        );
        let last = t.last_update().unwrap();
        assert_eq!(last.kind, UpdateKind::StatusChange);
        assert!(last.is_internal);
        assert_eq!(last.sequence, 3);
    }

    #[test]
    fn customer_reply_reopens_waiting_ticket() {
        let engine = engine();
        let mut t = ticket("anna.meier@privat.com", "Lieferzeit", "Wann?");
        t.status = TicketStatus::WaitingForCustomer;
        let update = t
            .push_update(UpdateDraft::reply("Anna.Meier@privat.com", "Danke!"), Utc::now())
            .clone();
        assert_eq!(engine.process_ticket_update(&mut t, &update), Some(TicketStatus::Open));
        assert_eq!(t.status, TicketStatus::Open);
    }

    #[test]
    fn internal_notes_never_transition() {
        let engine = engine();
        let mut t = ticket("anna.meier@privat.com", "Lieferzeit", "Wann?");
        t.status = TicketStatus::WaitingForCustomer;
        let update = t
            .push_update(UpdateDraft::internal_note("anna.meier@privat.com", "note"), Utc::now())
            .clone();
        let before = t.updates.len();
        assert_eq!(engine.process_ticket_update(&mut t, &update), None);
        assert_eq!(t.status, TicketStatus::WaitingForCustomer);
        assert_eq!(t.updates.len(), before);
        assert!(t.last_updated.is_some());
    }

    #[test]
    fn other_combinations_leave_status_alone() {
        let engine = engine();
        let mut t = ticket("anna.meier@privat.com", "Lieferzeit", "Wann?");
        t.status = TicketStatus::Escalated;
        let update = t.push_update(UpdateDraft::reply("agent3", "Looking"), Utc::now()).clone();
        assert_eq!(engine.process_ticket_update(&mut t, &update), None);

        t.status = TicketStatus::Open;
        let update = t
            .push_update(UpdateDraft::reply("anna.meier@privat.com", "Noch da?"), Utc::now())
            .clone();
        assert_eq!(engine.process_ticket_update(&mut t, &update), None);
        assert_eq!(t.status, TicketStatus::Open);
    }
}
