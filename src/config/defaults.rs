//! System-wide default constants.
//!
//! Every value here is the built-in default for a `DeskConfig` field and can
//! be overridden from `coredesk.toml`. Grouped by subsystem for easy discovery.

// ============================================================================
// Teams & Actors
// ============================================================================

/// Team every new ticket starts in.
pub const BASELINE_TEAM: &str = "1st-Level";

/// Technical escalation team.
pub const SECOND_LEVEL_TEAM: &str = "2nd-Level";

/// Invoices, payments, dunning.
pub const FINANCE_TEAM: &str = "Finance";

/// Returns, exchanges, defects.
pub const AFTER_SALES_TEAM: &str = "After-Sales";

/// Author recorded on every audit entry produced by the automation engine.
pub const AUTOMATION_AUTHOR: &str = "Automation";

/// Author recorded on audit entries produced by explicit store operations.
pub const SYSTEM_AUTHOR: &str = "System";

// ============================================================================
// Classifier Keywords
// ============================================================================

/// Billing and payment vocabulary (German and English).
pub const FINANCE_KEYWORDS: &[&str] = &[
    "rechnung", "mahnung", "zahlung", "bezahlung", "invoice", "payment", "billing",
];

/// Returns, exchanges and defective goods.
pub const AFTER_SALES_KEYWORDS: &[&str] = &[
    "retoure", "rücksendung", "umtausch", "rückgabe", "return", "exchange", "refund", "defekt",
];

/// Anything that needs 2nd-level technical support.
pub const TECHNICAL_KEYWORDS: &[&str] = &[
    "api", "integration", "technisch", "technical", "bug", "error", "problem", "installation",
];

/// Urgency markers that escalate priority to Critical.
pub const CRITICAL_KEYWORDS: &[&str] = &[
    "urgent", "kritisch", "sofort", "notfall", "emergency", "critical", "asap",
];

// ============================================================================
// Order References
// ============================================================================

/// Order-reference patterns, tried in order; the first pattern with any match wins.
///
/// - `100-58273`   numeric shop orders
/// - `ORD-123456`  marketplace orders
/// - `B12345678`   B2B orders
pub const ORDER_PATTERNS: &[&str] = &[r"\b\d{3}-\d{5,}\b", r"\bORD-\d{6,}\b", r"\bB\d{8,}\b"];

// ============================================================================
// Directory
// ============================================================================

/// Upper bound on a single directory lookup before enrichment is skipped (ms).
pub const DIRECTORY_LOOKUP_TIMEOUT_MS: u64 = 2_000;
