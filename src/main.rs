//! CoreDesk - support ticket desk
//!
//! Seeds an in-memory desk with demo directories and tickets, runs them
//! through automation and routing, then prints a filtered ticket list.
//!
//! # Usage
//!
//! ```bash
//! # All demo tickets
//! cargo run --release
//!
//! # Business customers, this week, as JSON
//! cargo run --release -- list --customer-type business --date-range week --json
//!
//! # One ticket with its full audit trail
//! cargo run --release -- show 3
//!
//! # Dump the effective configuration
//! cargo run --release -- print-config
//! ```
//!
//! # Environment Variables
//!
//! - `COREDESK_CONFIG`: Path to a `coredesk.toml` (default: `./coredesk.toml`, then built-ins)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use coredesk::filter::{self, DateRange, FilterContext, TicketQuery};
use coredesk::{
    AutomationEngine, CustomerType, DeskConfig, InMemoryCustomerDirectory, NewTicket,
    RoutingAdvisor, StaticTeamRoster, Ticket, TicketId, TicketPriority, TicketStatus, TicketStore,
    UpdateDraft,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "coredesk")]
#[command(about = "CoreDesk support ticket lifecycle and automation")]
#[command(version)]
struct CliArgs {
    /// Config file (overrides COREDESK_CONFIG and ./coredesk.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Apply routing suggestions (team + agent) to every seeded ticket
    #[arg(long, global = true)]
    route: bool,

    /// Print JSON instead of a table
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// List tickets matching the given filters
    List(ListArgs),

    /// Show one ticket with its update history
    Show {
        id: TicketId,
    },

    /// Print the effective configuration as TOML
    PrintConfig,
}

#[derive(clap::Args, Debug, Default)]
struct ListArgs {
    /// Case-insensitive search over subject, customer email and order id
    #[arg(long)]
    search: Option<String>,

    #[arg(long)]
    team: Option<String>,

    /// low, normal, high, critical
    #[arg(long)]
    priority: Option<TicketPriority>,

    /// open, in_progress, waiting_for_customer, escalated, resolved, closed
    #[arg(long)]
    status: Option<TicketStatus>,

    /// private, business, unknown
    #[arg(long)]
    customer_type: Option<CustomerType>,

    /// today, week, month
    #[arg(long)]
    date_range: Option<DateRange>,

    /// Act as this agent id (enables --mine)
    #[arg(long)]
    agent: Option<String>,

    /// Only tickets assigned to --agent
    #[arg(long)]
    mine: bool,
}

impl ListArgs {
    fn query(&self) -> TicketQuery {
        TicketQuery {
            search: self.search.clone(),
            team: self.team.clone(),
            priority: self.priority,
            status: self.status,
            customer_type: self.customer_type,
            date_range: self.date_range,
            assigned_to_me: self.mine,
        }
    }

    fn context(&self) -> FilterContext {
        FilterContext {
            now: Utc::now(),
            current_agent: self.agent.clone(),
        }
    }
}

// ============================================================================
// Desk Setup
// ============================================================================

struct Desk {
    config: DeskConfig,
    customers: Arc<InMemoryCustomerDirectory>,
    store: TicketStore,
    router: RoutingAdvisor,
}

fn build_desk(config: DeskConfig) -> Result<Desk> {
    let customers = Arc::new(InMemoryCustomerDirectory::demo());
    let teams = Arc::new(StaticTeamRoster::demo());

    let engine = AutomationEngine::new(&config, customers.clone(), teams.clone())
        .context("Failed to build automation engine")?;
    info!(
        rules = engine.rules().len(),
        merge_policy = ?engine.merge_policy(),
        customers = customers.customer_count(),
        "Automation engine ready"
    );

    let store = TicketStore::new(&config, Arc::new(engine));
    let router = RoutingAdvisor::new(&config, teams);
    Ok(Desk {
        config,
        customers,
        store,
        router,
    })
}

/// Demo tickets: (customer, subject, first message, status after creation, age in days)
const DEMO_TICKETS: &[(&str, &str, &str, Option<TicketStatus>, i64)] = &[
    ("anna.meier@privat.com", "Problem mit Bestellung 100-58273", "Hallo, meine Lieferung ist noch nicht angekommen.", None, 0),
    ("john.doe@business.com", "Anfrage zu Rechnung 9855", "Können Sie mir bitte eine Kopie der Rechnung zukommen lassen?", Some(TicketStatus::InProgress), 0),
    ("maria.garcia@privat.com", "Defekter Artikel 200-12345", "Das gelieferte Produkt funktioniert nicht richtig.", None, 0),
    ("tech@innovate.corp", "Technische Unterstützung benötigt", "Wir benötigen Hilfe bei der Integration Ihrer API.", Some(TicketStatus::InProgress), 0),
    ("customer@retail.shop", "Bestellung 300-67890 fehlt", "Unsere Bestellung ist nicht vollständig angekommen.", Some(TicketStatus::Resolved), 0),
    ("peter.mueller@home.de", "Rückgabe möglich?", "Kann ich diesen Artikel zurückgeben?", Some(TicketStatus::Resolved), 0),
    ("support@acme.inc", "Wartungsvertrag verlängern", "Unser Wartungsvertrag läuft bald ab.", None, 14),
    ("anna.meier@privat.com", "Alte Anfrage 400-11111", "Eine ältere Anfrage.", Some(TicketStatus::Resolved), 60),
];

async fn seed(desk: &Desk) -> Vec<TicketId> {
    let now = Utc::now();
    let mut ids = Vec::with_capacity(DEMO_TICKETS.len());

    for &(email, subject, content, status, age_days) in DEMO_TICKETS {
        let mut new = NewTicket::new(email, subject, content);
        if age_days > 0 {
            new = new.created_at(now - Duration::days(age_days));
        }
        let id = desk.store.create_ticket_with(new).await;
        if let Some(status) = status {
            desk.store.set_status(id, status);
        }
        ids.push(id);
    }

    // A short exchange on the first ticket: agent asks, customer answers
    if let Some(&first) = ids.first() {
        desk.store.add_update(
            first,
            UpdateDraft::reply("agent1", "Wir prüfen den Sendungsstatus. Haben Sie eine Versandbestätigung erhalten?"),
        );
        desk.store.add_update(
            first,
            UpdateDraft::internal_note("agent1", "Carrier kontaktiert."),
        );
        desk.store.add_update(
            first,
            UpdateDraft::reply("anna.meier@privat.com", "Ja, am Montag."),
        );
    }

    info!(tickets = desk.store.len(), "Demo tickets seeded");
    ids
}

// ============================================================================
// Output
// ============================================================================

fn print_table(tickets: &[Ticket]) {
    println!(
        "{:>4}  {:<8}  {:<20}  {:<12}  {:<7}  {:<28}  {}",
        "ID", "PRIO", "STATUS", "TEAM", "AGENT", "CUSTOMER", "SUBJECT"
    );
    for t in tickets {
        println!(
            "{:>4}  {:<8}  {:<20}  {:<12}  {:<7}  {:<28}  {}",
            t.id,
            t.priority.to_string(),
            t.status.to_string(),
            t.assigned_team,
            t.assigned_agent.as_deref().unwrap_or("-"),
            t.customer_email,
            t.subject
        );
    }
    println!("{} ticket(s)", tickets.len());
}

fn print_ticket(t: &Ticket) {
    println!("#{} {}", t.id, t.subject);
    println!("  Customer: {}", t.customer_email);
    println!("  Status:   {} | Priority: {}", t.status, t.priority);
    println!(
        "  Team:     {} | Agent: {}",
        t.assigned_team,
        t.assigned_agent.as_deref().unwrap_or("-")
    );
    if let Some(order) = &t.order_id {
        println!("  Order:    {order}");
    }
    if !t.tags.is_empty() {
        println!("  Tags:     {}", t.tags.join(", "));
    }
    println!();
    for u in &t.updates {
        let visibility = if u.is_internal { "internal" } else { "visible" };
        println!(
            "  [{:>2}] {} {:<16} {:<8} {}: {}",
            u.sequence,
            u.timestamp.format("%Y-%m-%d %H:%M"),
            u.kind.to_string(),
            visibility,
            u.author,
            u.content
        );
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let config = match &args.config {
        Some(path) => DeskConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => DeskConfig::load(),
    };

    if let Some(SubCommand::PrintConfig) = &args.command {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let desk = build_desk(config)?;
    info!(
        baseline_team = %desk.config.desk.baseline_team,
        selection = %desk.config.routing.agent_selection,
        "CoreDesk starting"
    );

    let ids = seed(&desk).await;
    if args.route {
        for id in &ids {
            desk.router.route(&desk.store, *id).await;
        }
    }

    match args.command {
        Some(SubCommand::Show { id }) => {
            let ticket = desk
                .store
                .get_ticket(id)
                .with_context(|| format!("Ticket {id} not found"))?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&ticket)?);
            } else {
                print_ticket(&ticket);
            }
        }
        Some(SubCommand::List(list)) => run_list(&desk, &list, args.json).await?,
        None => run_list(&desk, &ListArgs::default(), args.json).await?,
        Some(SubCommand::PrintConfig) => {}
    }

    Ok(())
}

async fn run_list(desk: &Desk, list: &ListArgs, json: bool) -> Result<()> {
    let query = list.query();
    let tickets = filter::apply(
        desk.store.list_all(),
        &query,
        &list.context(),
        desk.customers.as_ref(),
        desk.config.directory.lookup_timeout(),
    )
    .await;

    if json {
        println!("{}", serde_json::to_string_pretty(&tickets)?);
    } else {
        if query.has_active_filters() {
            info!(filters = ?query, "Filters active");
        }
        print_table(&tickets);

        let mut counts: Vec<(String, usize)> = desk
            .store
            .status_counts()
            .into_iter()
            .map(|(status, n)| (status.to_string(), n))
            .collect();
        counts.sort();
        let summary: Vec<String> = counts.iter().map(|(s, n)| format!("{s}: {n}")).collect();
        println!("Desk: {} ticket(s) | {}", desk.store.len(), summary.join(" | "));
    }
    Ok(())
}
