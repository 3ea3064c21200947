//! Automation rule descriptors and the directive merge
//!
//! A rule is data: a name, one condition and a list of effects. The engine
//! evaluates rules through a fixed interpreter loop; a matching rule turns its
//! effects into field-level directives, and the directives of all matching
//! rules are merged once at the end.
//!
//! ## Merge Policy
//!
//! | Field    | Resolution                                                   |
//! |----------|--------------------------------------------------------------|
//! | team     | `MergePolicy` (last or first matching rule in list order)    |
//! | status   | `MergePolicy`                                                |
//! | priority | highest priority wins; automation never lowers a priority    |
//! | tags     | every tag from every matching rule, in rule order, duplicates kept |

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::classifier::{contains_any, Category, KeywordClassifier};
use crate::config::TeamNames;
use crate::directory::DirectoryError;
use crate::types::{TicketPriority, TicketStatus};

// ============================================================================
// Descriptors
// ============================================================================

/// One named automation rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AutomationRule {
    /// Recorded in the audit trail and in logs
    pub name: String,
    pub condition: RuleCondition,
    pub effects: Vec<RuleEffect>,
}

impl AutomationRule {
    pub fn new(name: impl Into<String>, condition: RuleCondition, effects: Vec<RuleEffect>) -> Self {
        Self {
            name: name.into(),
            condition,
            effects,
        }
    }
}

/// Predicate over the facts gathered for a ticket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleCondition {
    /// Subject + first message matches a configured keyword category
    Category { category: Category },
    /// Subject + first message contains any of these keywords (case-insensitive)
    AnyKeyword { keywords: Vec<String> },
    /// Customer directory reports a business customer
    BusinessCustomer,
    /// A verified order reference is linked to the ticket
    HasOrderReference,
}

/// Mutation a matching rule requests
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleEffect {
    AssignTeam { team: String },
    SetPriority { priority: TicketPriority },
    AddTag { tag: String },
    SetStatus { status: TicketStatus },
}

/// How single-valued fields are resolved when several rules write them
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Later rules in list order override earlier ones
    #[default]
    LastMatchWins,
    /// The first matching rule in list order keeps the field
    FirstMatchWins,
}

/// The built-in rule list, in evaluation order.
pub fn default_rules(teams: &TeamNames) -> Vec<AutomationRule> {
    vec![
        AutomationRule::new(
            "Finance Team Assignment",
            RuleCondition::Category { category: Category::Finance },
            vec![
                RuleEffect::AssignTeam { team: teams.finance.clone() },
                RuleEffect::AddTag { tag: "Finance".to_string() },
            ],
        ),
        AutomationRule::new(
            "After-Sales Team Assignment",
            RuleCondition::Category { category: Category::AfterSales },
            vec![
                RuleEffect::AssignTeam { team: teams.after_sales.clone() },
                RuleEffect::AddTag { tag: "Return".to_string() },
            ],
        ),
        AutomationRule::new(
            "2nd-Level Escalation",
            RuleCondition::Category { category: Category::Technical },
            vec![
                RuleEffect::AssignTeam { team: teams.second_level.clone() },
                RuleEffect::AddTag { tag: "Technical".to_string() },
            ],
        ),
        AutomationRule::new(
            "Business Customer High Priority",
            RuleCondition::BusinessCustomer,
            vec![
                RuleEffect::SetPriority { priority: TicketPriority::High },
                RuleEffect::AddTag { tag: "Business-Customer".to_string() },
            ],
        ),
        AutomationRule::new(
            "Critical Keywords",
            RuleCondition::Category { category: Category::Critical },
            vec![
                RuleEffect::SetPriority { priority: TicketPriority::Critical },
                RuleEffect::AddTag { tag: "Critical".to_string() },
            ],
        ),
        AutomationRule::new(
            "Order Issue Auto-Processing",
            RuleCondition::HasOrderReference,
            vec![
                RuleEffect::SetStatus { status: TicketStatus::InProgress },
                RuleEffect::AddTag { tag: "Order-Related".to_string() },
            ],
        ),
    ]
}

// ============================================================================
// Evaluation
// ============================================================================

/// A rule's predicate or effect could not be evaluated. Logged and skipped,
/// never propagated out of the engine.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(DirectoryError),

    #[error("team '{0}' is not in the team directory")]
    UnknownTeam(String),

    #[error("invalid effect: {0}")]
    InvalidEffect(String),
}

/// Facts about one ticket, gathered (including the async directory calls)
/// before the interpreter loop runs.
#[derive(Debug)]
pub struct RuleContext<'a> {
    /// Lower-cased subject + first message
    pub text: String,
    pub order_id: Option<&'a str>,
    pub business_customer: Result<bool, DirectoryError>,
    /// `None` when the team directory could not be consulted; team effects
    /// are then accepted unchecked
    pub known_teams: Option<HashSet<String>>,
    pub keywords: &'a KeywordClassifier,
}

impl RuleCondition {
    pub fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<bool, RuleError> {
        match self {
            RuleCondition::Category { category } => Ok(ctx.keywords.matches(*category, &ctx.text)),
            RuleCondition::AnyKeyword { keywords } => {
                let lowered: Vec<String> = keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect();
                Ok(contains_any(&ctx.text, &lowered))
            }
            RuleCondition::BusinessCustomer => ctx
                .business_customer
                .clone()
                .map_err(RuleError::DependencyUnavailable),
            RuleCondition::HasOrderReference => Ok(ctx.order_id.is_some_and(|o| !o.is_empty())),
        }
    }

    /// Needs the customer-directory business check.
    pub const fn needs_customer_lookup(&self) -> bool {
        matches!(self, RuleCondition::BusinessCustomer)
    }
}

/// Field-level write requested by a matching rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Team(String),
    Priority(TicketPriority),
    Status(TicketStatus),
    Tag(String),
}

impl RuleEffect {
    pub fn directive(&self, ctx: &RuleContext<'_>) -> Result<Directive, RuleError> {
        match self {
            RuleEffect::AssignTeam { team } => {
                let team = team.trim();
                if team.is_empty() {
                    return Err(RuleError::InvalidEffect("assign_team with empty team".to_string()));
                }
                if let Some(known) = &ctx.known_teams {
                    if !known.contains(team) {
                        return Err(RuleError::UnknownTeam(team.to_string()));
                    }
                }
                Ok(Directive::Team(team.to_string()))
            }
            RuleEffect::SetPriority { priority } => Ok(Directive::Priority(*priority)),
            RuleEffect::SetStatus { status } => Ok(Directive::Status(*status)),
            RuleEffect::AddTag { tag } => {
                if tag.trim().is_empty() {
                    return Err(RuleError::InvalidEffect("add_tag with empty tag".to_string()));
                }
                Ok(Directive::Tag(tag.clone()))
            }
        }
    }

    /// Needs the team directory to validate.
    pub const fn needs_team_lookup(&self) -> bool {
        matches!(self, RuleEffect::AssignTeam { .. })
    }
}

impl AutomationRule {
    /// Evaluate the predicate and, if it holds, every effect.
    ///
    /// All-or-nothing: one failing effect discards the whole rule.
    pub fn apply(&self, ctx: &RuleContext<'_>) -> Result<Option<Vec<Directive>>, RuleError> {
        if !self.condition.evaluate(ctx)? {
            return Ok(None);
        }
        let directives = self
            .effects
            .iter()
            .map(|e| e.directive(ctx))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(directives))
    }
}

// ============================================================================
// Merge
// ============================================================================

/// Directives collected from every matching rule, in rule order
#[derive(Debug, Clone, Default)]
pub struct DirectiveSet {
    directives: Vec<Directive>,
}

/// Final field values after merging
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub team: Option<String>,
    pub priority: Option<TicketPriority>,
    pub status: Option<TicketStatus>,
    pub tags: Vec<String>,
}

impl DirectiveSet {
    pub fn extend(&mut self, directives: Vec<Directive>) {
        self.directives.extend(directives);
    }

    pub fn resolve(self, policy: MergePolicy) -> Resolution {
        let mut out = Resolution::default();
        for directive in self.directives {
            match directive {
                Directive::Team(team) => merge_scalar(&mut out.team, team, policy),
                Directive::Status(status) => merge_scalar(&mut out.status, status, policy),
                Directive::Priority(p) => {
                    out.priority = Some(out.priority.map_or(p, |current| current.max(p)));
                }
                Directive::Tag(tag) => out.tags.push(tag),
            }
        }
        out
    }
}

fn merge_scalar<T>(slot: &mut Option<T>, value: T, policy: MergePolicy) {
    match policy {
        MergePolicy::LastMatchWins => *slot = Some(value),
        MergePolicy::FirstMatchWins => {
            if slot.is_none() {
                *slot = Some(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(text: &str, keywords: &'a KeywordClassifier) -> RuleContext<'a> {
        RuleContext {
            text: text.to_lowercase(),
            order_id: None,
            business_customer: Ok(false),
            known_teams: None,
            keywords,
        }
    }

    #[test]
    fn default_rules_are_in_documented_order() {
        let names: Vec<String> = default_rules(&TeamNames::default())
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "Finance Team Assignment",
                "After-Sales Team Assignment",
                "2nd-Level Escalation",
                "Business Customer High Priority",
                "Critical Keywords",
                "Order Issue Auto-Processing",
            ]
        );
    }

    #[test]
    fn unmatched_rule_yields_no_directives() {
        let kw = KeywordClassifier::default();
        let rule = &default_rules(&TeamNames::default())[0];
        assert_eq!(rule.apply(&ctx("Lieferung fehlt", &kw)), Ok(None));
    }

    #[test]
    fn business_condition_surfaces_directory_failure() {
        let kw = KeywordClassifier::default();
        let mut c = ctx("hello", &kw);
        c.business_customer = Err(DirectoryError::Unavailable("erp down".to_string()));
        let err = RuleCondition::BusinessCustomer.evaluate(&c).unwrap_err();
        assert!(matches!(err, RuleError::DependencyUnavailable(_)));
    }

    #[test]
    fn unknown_team_fails_the_whole_rule() {
        let kw = KeywordClassifier::default();
        let mut c = ctx("invoice", &kw);
        c.known_teams = Some(HashSet::from(["Finance".to_string()]));
        let rule = AutomationRule::new(
            "Broken",
            RuleCondition::Category { category: Category::Finance },
            vec![
                RuleEffect::AddTag { tag: "Billing".to_string() },
                RuleEffect::AssignTeam { team: "Accounting".to_string() },
            ],
        );
        assert_eq!(rule.apply(&c), Err(RuleError::UnknownTeam("Accounting".to_string())));
    }

    #[test]
    fn last_match_wins_for_team() {
        let mut set = DirectiveSet::default();
        set.extend(vec![Directive::Team("Finance".into()), Directive::Tag("Finance".into())]);
        set.extend(vec![Directive::Team("After-Sales".into()), Directive::Tag("Return".into())]);
        let r = set.resolve(MergePolicy::LastMatchWins);
        assert_eq!(r.team.as_deref(), Some("After-Sales"));
        assert_eq!(r.tags, vec!["Finance", "Return"]);
    }

    #[test]
    fn first_match_wins_for_team() {
        let mut set = DirectiveSet::default();
        set.extend(vec![Directive::Team("Finance".into())]);
        set.extend(vec![Directive::Team("After-Sales".into())]);
        let r = set.resolve(MergePolicy::FirstMatchWins);
        assert_eq!(r.team.as_deref(), Some("Finance"));
    }

    #[test]
    fn priority_takes_the_highest_regardless_of_order() {
        let mut set = DirectiveSet::default();
        set.extend(vec![Directive::Priority(TicketPriority::Critical)]);
        set.extend(vec![Directive::Priority(TicketPriority::High)]);
        let r = set.clone().resolve(MergePolicy::LastMatchWins);
        assert_eq!(r.priority, Some(TicketPriority::Critical));
        assert_eq!(set.resolve(MergePolicy::FirstMatchWins).priority, Some(TicketPriority::Critical));
    }

    #[test]
    fn duplicate_tags_are_kept() {
        let mut set = DirectiveSet::default();
        set.extend(vec![Directive::Tag("VIP".into())]);
        set.extend(vec![Directive::Tag("VIP".into())]);
        assert_eq!(set.resolve(MergePolicy::LastMatchWins).tags, vec!["VIP", "VIP"]);
    }

    #[test]
    fn rules_parse_from_toml() {
        let text = r#"
name = "VIP escalation"
condition = { kind = "any_keyword", keywords = ["VIP"] }
effects = [
    { kind = "set_priority", priority = "critical" },
    { kind = "add_tag", tag = "VIP" },
]
"#;
        let rule: AutomationRule = toml::from_str(text).unwrap();
        assert_eq!(rule.effects.len(), 2);
        let kw = KeywordClassifier::default();
        let directives = rule.apply(&ctx("a vip customer", &kw)).unwrap().unwrap();
        assert_eq!(directives[0], Directive::Priority(TicketPriority::Critical));
    }
}
