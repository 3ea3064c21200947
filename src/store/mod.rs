//! Ticket Store
//!
//! Exclusive owner of ticket identity and the only place tickets are mutated.
//!
//! ## Concurrency
//!
//! - Ids come from one atomic counter starting at 1 and are never reused
//! - Tickets live in a `DashMap<TicketId, Arc<Mutex<Ticket>>>`; the map shard
//!   lock is only held long enough to clone the `Arc`
//! - Every mutation (field write + audit entry + `last_updated`) happens under
//!   the ticket's own mutex, so readers never see a change without its audit
//!   entry. There is no store-wide lock
//! - New tickets are classified before insertion; no await happens while a
//!   ticket mutex is held
//!
//! Unknown ids are a normal outcome: every operation returns `Option`.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::automation::AutomationEngine;
use crate::config::DeskConfig;
use crate::types::{
    Ticket, TicketId, TicketPriority, TicketStatus, UpdateDraft, UpdateKind,
};

/// Input for `TicketStore::create_ticket_with`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    pub customer_email: String,
    pub subject: String,
    pub content: String,
    /// Backdate the ticket (imports, seeding). Defaults to now.
    pub created_at: Option<DateTime<Utc>>,
}

impl NewTicket {
    pub fn new(
        customer_email: impl Into<String>,
        subject: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            customer_email: customer_email.into(),
            subject: subject.into(),
            content: content.into(),
            created_at: None,
        }
    }

    #[must_use]
    pub const fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }
}

pub struct TicketStore {
    tickets: DashMap<TicketId, Arc<Mutex<Ticket>>>,
    next_id: AtomicU64,
    engine: Arc<AutomationEngine>,
    baseline_team: String,
    system_author: String,
}

impl TicketStore {
    pub fn new(config: &DeskConfig, engine: Arc<AutomationEngine>) -> Self {
        Self {
            tickets: DashMap::new(),
            next_id: AtomicU64::new(1),
            engine,
            baseline_team: config.desk.baseline_team.clone(),
            system_author: config.desk.system_author.clone(),
        }
    }

    // ========================================================================
    // Create / Read
    // ========================================================================

    /// Create a ticket in the baseline team with `content` as the customer's
    /// first message, run it through the automation engine and store it.
    pub async fn create_ticket(
        &self,
        customer_email: impl Into<String>,
        subject: impl Into<String>,
        content: impl Into<String>,
    ) -> TicketId {
        self.create_ticket_with(NewTicket::new(customer_email, subject, content))
            .await
    }

    pub async fn create_ticket_with(&self, new: NewTicket) -> TicketId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let created_at = new.created_at.unwrap_or(now);

        let ticket = Ticket::new(
            id,
            new.customer_email,
            new.subject,
            new.content,
            self.baseline_team.clone(),
            created_at,
        );
        let ticket = self.engine.process_new_ticket_at(ticket, created_at.max(now)).await;

        info!(
            ticket_id = id,
            customer = %ticket.customer_email,
            team = %ticket.assigned_team,
            "Ticket created"
        );
        self.tickets.insert(id, Arc::new(Mutex::new(ticket)));
        id
    }

    /// Snapshot of one ticket.
    pub fn get_ticket(&self, id: TicketId) -> Option<Ticket> {
        self.with_ticket(id, |t| t.clone())
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Append a reply or internal note, then let the automation engine apply
    /// the reply-driven status transition.
    pub fn add_update(&self, id: TicketId, draft: UpdateDraft) -> Option<Ticket> {
        let engine = Arc::clone(&self.engine);
        let result = self.with_ticket(id, |t| {
            let now = Utc::now();
            let update = t.push_update(draft, now).clone();
            engine.process_ticket_update_at(t, &update, now);
            t.clone()
        });
        if result.is_none() {
            debug!(ticket_id = id, "add_update on unknown ticket ignored");
        }
        result
    }

    /// Explicit status change. Always appends a visible status entry, even
    /// when the status does not change.
    pub fn set_status(&self, id: TicketId, status: TicketStatus) -> Option<Ticket> {
        let author = self.system_author.clone();
        self.mutate(id, |t| {
            let old = t.status;
            t.status = status;
            info!(ticket_id = t.id, from = %old, to = %status, "Status changed");
            UpdateDraft::audit(
                author,
                format!("Status changed from {old} to {status}"),
                false,
                UpdateKind::StatusChange,
            )
        })
    }

    /// Move the ticket to `team`. Clears the assigned agent, whose validity is
    /// scoped to the previous team.
    pub fn assign_team(&self, id: TicketId, team: &str, reason: Option<&str>) -> Option<Ticket> {
        let author = self.system_author.clone();
        self.mutate(id, |t| {
            let old = std::mem::replace(&mut t.assigned_team, team.to_string());
            let mut content = format!("Team changed from {old} to {team}");
            if let Some(agent) = t.assigned_agent.take() {
                content.push_str(&format!("; agent {agent} unassigned"));
            }
            info!(ticket_id = t.id, from = %old, to = %team, "Team assigned");
            UpdateDraft::audit(author, with_reason(content, reason), true, UpdateKind::TeamAssignment)
        })
    }

    /// Assign (or with `None`, unassign) an agent.
    ///
    /// The agent is not checked against the team roster; keeping the two
    /// consistent is the caller's job (`RoutingAdvisor::route` does).
    pub fn assign_agent(&self, id: TicketId, agent_id: Option<&str>, reason: Option<&str>) -> Option<Ticket> {
        let author = self.system_author.clone();
        self.mutate(id, |t| {
            t.assigned_agent = agent_id.map(str::to_string);
            let content = match agent_id {
                Some(agent) => format!("Assigned to agent {agent}"),
                None => "Agent unassigned".to_string(),
            };
            info!(ticket_id = t.id, agent = ?agent_id, "Agent assigned");
            UpdateDraft::audit(author, with_reason(content, reason), true, UpdateKind::AgentAssignment)
        })
    }

    pub fn set_priority(&self, id: TicketId, priority: TicketPriority, reason: Option<&str>) -> Option<Ticket> {
        let author = self.system_author.clone();
        self.mutate(id, |t| {
            let old = std::mem::replace(&mut t.priority, priority);
            info!(ticket_id = t.id, from = %old, to = %priority, "Priority changed");
            UpdateDraft::audit(
                author,
                with_reason(format!("Priority changed from {old} to {priority}"), reason),
                true,
                UpdateKind::PriorityChange,
            )
        })
    }

    // ========================================================================
    // Listing
    // ========================================================================

    /// All tickets, newest first.
    pub fn list_all(&self) -> Vec<Ticket> {
        self.snapshot(|_| true)
    }

    pub fn list_by_team(&self, team: &str) -> Vec<Ticket> {
        self.snapshot(|t| t.assigned_team == team)
    }

    pub fn list_by_agent(&self, agent_id: &str) -> Vec<Ticket> {
        self.snapshot(|t| t.assigned_agent.as_deref() == Some(agent_id))
    }

    pub fn status_counts(&self) -> HashMap<TicketStatus, usize> {
        let mut counts = HashMap::new();
        for ticket in self.list_all() {
            *counts.entry(ticket.status).or_insert(0) += 1;
        }
        counts
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn cell(&self, id: TicketId) -> Option<Arc<Mutex<Ticket>>> {
        self.tickets.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    fn with_ticket<R>(&self, id: TicketId, f: impl FnOnce(&mut Ticket) -> R) -> Option<R> {
        let cell = self.cell(id)?;
        let mut guard = lock(&cell);
        Some(f(&mut guard))
    }

    /// Field write + exactly one audit entry + `last_updated`, atomically.
    fn mutate(&self, id: TicketId, f: impl FnOnce(&mut Ticket) -> UpdateDraft) -> Option<Ticket> {
        let result = self.with_ticket(id, |t| {
            let now = Utc::now();
            let draft = f(t);
            t.push_update(draft, now);
            t.touch(now);
            t.clone()
        });
        if result.is_none() {
            debug!(ticket_id = id, "Mutation on unknown ticket ignored");
        }
        result
    }

    fn snapshot(&self, keep: impl Fn(&Ticket) -> bool) -> Vec<Ticket> {
        let cells: Vec<Arc<Mutex<Ticket>>> = self
            .tickets
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut tickets: Vec<Ticket> = cells
            .iter()
            .map(|cell| lock(cell).clone())
            .filter(|t| keep(t))
            .collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        tickets
    }
}

impl std::fmt::Debug for TicketStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketStore")
            .field("tickets", &self.tickets.len())
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .field("baseline_team", &self.baseline_team)
            .finish_non_exhaustive()
    }
}

fn lock(cell: &Mutex<Ticket>) -> MutexGuard<'_, Ticket> {
    cell.lock().unwrap_or_else(|poisoned| {
        warn!("Ticket mutex poisoned, recovering last written state");
        poisoned.into_inner()
    })
}

fn with_reason(content: String, reason: Option<&str>) -> String {
    match reason.map(str::trim) {
        Some(r) if !r.is_empty() => format!("{content} (reason: {r})"),
        _ => content,
    }
}
