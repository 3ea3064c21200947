//! Ticket types: Ticket, TicketUpdate, TicketStatus, TicketPriority, UpdateKind

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ticket identity, allocated by the store and never reused.
pub type TicketId = u64;

// ============================================================================
// Enums
// ============================================================================

/// Lifecycle status of a ticket
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Open,
    InProgress,
    WaitingForCustomer,
    Escalated,
    Resolved,
    Closed,
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketStatus::Open => write!(f, "Open"),
            TicketStatus::InProgress => write!(f, "In Progress"),
            TicketStatus::WaitingForCustomer => write!(f, "Waiting for Customer"),
            TicketStatus::Escalated => write!(f, "Escalated"),
            TicketStatus::Resolved => write!(f, "Resolved"),
            TicketStatus::Closed => write!(f, "Closed"),
        }
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "open" => Ok(TicketStatus::Open),
            "in_progress" | "inprogress" => Ok(TicketStatus::InProgress),
            "waiting_for_customer" | "waiting" => Ok(TicketStatus::WaitingForCustomer),
            "escalated" => Ok(TicketStatus::Escalated),
            "resolved" => Ok(TicketStatus::Resolved),
            "closed" => Ok(TicketStatus::Closed),
            other => Err(format!("unknown ticket status '{other}'")),
        }
    }
}

/// Ticket priority. Ordering is significant: `Critical` sorts highest.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low = 1,
    #[default]
    Normal = 2,
    High = 3,
    Critical = 4,
}

impl std::fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketPriority::Low => write!(f, "Low"),
            TicketPriority::Normal => write!(f, "Normal"),
            TicketPriority::High => write!(f, "High"),
            TicketPriority::Critical => write!(f, "Critical"),
        }
    }
}

impl std::str::FromStr for TicketPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(TicketPriority::Low),
            "normal" => Ok(TicketPriority::Normal),
            "high" => Ok(TicketPriority::High),
            "critical" => Ok(TicketPriority::Critical),
            other => Err(format!("unknown ticket priority '{other}'")),
        }
    }
}

/// What a single audit-trail entry records
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    /// Customer- or agent-visible message
    Reply,
    /// Internal note, including automation decisions
    InternalNote,
    StatusChange,
    TeamAssignment,
    AgentAssignment,
    PriorityChange,
}

impl std::fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateKind::Reply => write!(f, "Reply"),
            UpdateKind::InternalNote => write!(f, "Internal Note"),
            UpdateKind::StatusChange => write!(f, "Status Change"),
            UpdateKind::TeamAssignment => write!(f, "Team Assignment"),
            UpdateKind::AgentAssignment => write!(f, "Agent Assignment"),
            UpdateKind::PriorityChange => write!(f, "Priority Change"),
        }
    }
}

// ============================================================================
// TicketUpdate
// ============================================================================

/// One immutable entry of a ticket's append-only audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TicketUpdate {
    /// 1-based, contiguous within the parent ticket
    pub sequence: u32,
    pub timestamp: DateTime<Utc>,
    /// Customer email, agent id, or the automation/system actor
    pub author: String,
    pub content: String,
    pub is_internal: bool,
    pub kind: UpdateKind,
}

/// Caller-supplied update before the store assigns its sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateDraft {
    pub author: String,
    pub content: String,
    pub is_internal: bool,
    pub kind: UpdateKind,
}

impl UpdateDraft {
    /// A visible reply from a customer or agent.
    pub fn reply(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            content: content.into(),
            is_internal: false,
            kind: UpdateKind::Reply,
        }
    }

    /// An internal note, never shown to the customer.
    pub fn internal_note(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            content: content.into(),
            is_internal: true,
            kind: UpdateKind::InternalNote,
        }
    }

    pub(crate) fn audit(
        author: impl Into<String>,
        content: impl Into<String>,
        is_internal: bool,
        kind: UpdateKind,
    ) -> Self {
        Self {
            author: author.into(),
            content: content.into(),
            is_internal,
            kind,
        }
    }
}

// ============================================================================
// Ticket
// ============================================================================

/// A customer-support ticket.
///
/// Values handed out by the store are snapshots; mutating one has no effect
/// on the stored ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub subject: String,
    pub customer_email: String,
    /// Order reference verified against the order directory
    pub order_id: Option<String>,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub created_at: DateTime<Utc>,
    /// `None` until the first mutation
    pub last_updated: Option<DateTime<Utc>>,
    pub assigned_team: String,
    /// When set, must belong to `assigned_team` at assignment time. Not enforced
    /// for direct reassignment; `RoutingAdvisor::route` upholds it.
    pub assigned_agent: Option<String>,
    pub updates: Vec<TicketUpdate>,
    /// Duplicates are kept as emitted by the automation rules
    pub tags: Vec<String>,
}

impl Ticket {
    /// Build a fresh ticket in `Open` status with the customer's first message
    /// as update #1.
    pub fn new(
        id: TicketId,
        customer_email: impl Into<String>,
        subject: impl Into<String>,
        content: impl Into<String>,
        baseline_team: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let customer_email = customer_email.into();
        let mut ticket = Self {
            id,
            subject: subject.into(),
            customer_email: customer_email.clone(),
            order_id: None,
            status: TicketStatus::Open,
            priority: TicketPriority::Normal,
            created_at,
            last_updated: None,
            assigned_team: baseline_team.into(),
            assigned_agent: None,
            updates: Vec::new(),
            tags: Vec::new(),
        };
        ticket.push_update(UpdateDraft::reply(customer_email, content), created_at);
        ticket
    }

    /// Content of update #1, or "" when the trail is empty.
    pub fn first_content(&self) -> &str {
        self.updates.first().map_or("", |u| u.content.as_str())
    }

    /// Subject and first message joined by a space; the text every keyword
    /// and order-reference check runs against.
    pub fn classification_text(&self) -> String {
        format!("{} {}", self.subject, self.first_content())
    }

    /// Latest update, if any.
    pub fn last_update(&self) -> Option<&TicketUpdate> {
        self.updates.last()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Append an update with the next sequence number.
    pub(crate) fn push_update(&mut self, draft: UpdateDraft, at: DateTime<Utc>) -> &TicketUpdate {
        let sequence = u32::try_from(self.updates.len()).map_or(u32::MAX, |n| n.saturating_add(1));
        self.updates.push(TicketUpdate {
            sequence,
            timestamp: at,
            author: draft.author,
            content: draft.content,
            is_internal: draft.is_internal,
            kind: draft.kind,
        });
        &self.updates[self.updates.len() - 1]
    }

    /// Refresh `last_updated`, never moving it backwards.
    pub(crate) fn touch(&mut self, at: DateTime<Utc>) {
        self.last_updated = Some(match self.last_updated {
            Some(prev) if prev > at => prev,
            _ => at,
        });
    }
}
