//! Filter / Query Layer
//!
//! Pure filtering over a ticket snapshot. All predicates are AND-combined and
//! an absent (or blank) predicate imposes no constraint.
//!
//! ## Predicates
//!
//! | Field            | Match                                                      |
//! |------------------|------------------------------------------------------------|
//! | `search`         | case-insensitive substring of subject, email, or order id  |
//! | `team`           | exact team name                                            |
//! | `priority`       | equality                                                   |
//! | `status`         | equality                                                   |
//! | `customer_type`  | directory lookup per distinct email; failures are Unknown  |
//! | `date_range`     | UTC calendar day / week (Sunday start) / month of `now`    |
//! | `assigned_to_me` | `assigned_agent == ctx.current_agent`                      |
//!
//! Results are ordered by priority descending, then creation time descending;
//! ties keep input order.

use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveDate, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

use crate::directory::{with_timeout, CustomerDirectory};
use crate::types::{CustomerType, Ticket, TicketPriority, TicketStatus};

/// Relative creation-date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateRange {
    Today,
    Week,
    Month,
}

impl DateRange {
    /// Whether `created` falls inside this window as seen from `now`.
    ///
    /// The week runs from the most recent Sunday up to and including today.
    pub fn contains(self, created: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let day = created.date_naive();
        let today = now.date_naive();
        match self {
            Self::Today => day == today,
            Self::Week => day >= start_of_week(today) && day <= today,
            Self::Month => day.year() == today.year() && day.month() == today.month(),
        }
    }
}

fn start_of_week(today: NaiveDate) -> NaiveDate {
    let offset = i64::from(today.weekday().num_days_from_sunday());
    today - ChronoDuration::days(offset)
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Today => write!(f, "today"),
            Self::Week => write!(f, "week"),
            Self::Month => write!(f, "month"),
        }
    }
}

impl FromStr for DateRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "today" => Ok(Self::Today),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            other => Err(format!("unknown date range '{other}' (expected today, week or month)")),
        }
    }
}

/// Predicate set. `Default` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketQuery {
    pub search: Option<String>,
    pub team: Option<String>,
    pub priority: Option<TicketPriority>,
    pub status: Option<TicketStatus>,
    pub customer_type: Option<CustomerType>,
    pub date_range: Option<DateRange>,
    pub assigned_to_me: bool,
}

impl TicketQuery {
    pub fn has_active_filters(&self) -> bool {
        non_blank(self.search.as_deref()).is_some()
            || non_blank(self.team.as_deref()).is_some()
            || self.priority.is_some()
            || self.status.is_some()
            || self.customer_type.is_some()
            || self.date_range.is_some()
            || self.assigned_to_me
    }
}

/// Caller-side facts the query is evaluated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterContext {
    pub now: DateTime<Utc>,
    /// Agent id of the caller; without one `assigned_to_me` matches nothing.
    pub current_agent: Option<String>,
}

impl FilterContext {
    pub fn now() -> Self {
        Self {
            now: Utc::now(),
            current_agent: None,
        }
    }

    #[must_use]
    pub fn as_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.current_agent = Some(agent_id.into());
        self
    }
}

/// Filter and order `tickets`.
///
/// The directory is consulted only when `query.customer_type` is set, once
/// per distinct customer email.
pub async fn apply(
    tickets: Vec<Ticket>,
    query: &TicketQuery,
    ctx: &FilterContext,
    customers: &dyn CustomerDirectory,
    lookup_timeout: Duration,
) -> Vec<Ticket> {
    let customer_types = match query.customer_type {
        Some(_) => resolve_customer_types(&tickets, customers, lookup_timeout).await,
        None => HashMap::new(),
    };

    let search = non_blank(query.search.as_deref()).map(str::to_lowercase);
    let team = non_blank(query.team.as_deref());
    let total = tickets.len();

    let mut matched: Vec<Ticket> = tickets
        .into_iter()
        .filter(|t| search.as_deref().map_or(true, |s| matches_search(t, s)))
        .filter(|t| team.map_or(true, |team| t.assigned_team == team))
        .filter(|t| query.priority.map_or(true, |p| t.priority == p))
        .filter(|t| query.status.map_or(true, |s| t.status == s))
        .filter(|t| {
            query.customer_type.map_or(true, |wanted| {
                customer_types
                    .get(t.customer_email.as_str())
                    .copied()
                    .unwrap_or_default()
                    == wanted
            })
        })
        .filter(|t| query.date_range.map_or(true, |r| r.contains(t.created_at, ctx.now)))
        .filter(|t| {
            !query.assigned_to_me
                || matches!(
                    (&t.assigned_agent, &ctx.current_agent),
                    (Some(assigned), Some(me)) if assigned == me
                )
        })
        .collect();

    sort_for_display(&mut matched);
    debug!(total, matched = matched.len(), "Ticket filter applied");
    matched
}

/// Priority descending, then creation time descending. Stable.
pub fn sort_for_display(tickets: &mut [Ticket]) {
    tickets.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

fn matches_search(ticket: &Ticket, lowered: &str) -> bool {
    ticket.subject.to_lowercase().contains(lowered)
        || ticket.customer_email.to_lowercase().contains(lowered)
        || ticket
            .order_id
            .as_deref()
            .is_some_and(|o| o.to_lowercase().contains(lowered))
}

async fn resolve_customer_types(
    tickets: &[Ticket],
    customers: &dyn CustomerDirectory,
    limit: Duration,
) -> HashMap<String, CustomerType> {
    let emails: HashSet<&str> = tickets.iter().map(|t| t.customer_email.as_str()).collect();

    let lookups = emails.into_iter().map(|email| async move {
        let kind = match with_timeout(limit, customers.lookup_customer(email)).await {
            Ok(Some(customer)) => customer.customer_type,
            Ok(None) => CustomerType::Unknown,
            Err(e) => {
                warn!(customer = %email, error = %e, "Customer lookup failed, treating as unknown");
                CustomerType::Unknown
            }
        };
        (email.to_string(), kind)
    });

    join_all(lookups).await.into_iter().collect()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
