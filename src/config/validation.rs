//! Config validation: unknown-key detection with Levenshtein suggestions
//! and semantic checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization and reject configs the engine cannot run with.

use std::collections::HashSet;

use crate::automation::{AutomationRule, RuleCondition, RuleEffect};

/// Key present in the TOML document but not understood by `DeskConfig`.
/// Loading continues; the key is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKey {
    /// Dotted path, e.g. `desk.baseline_taem`
    pub key: String,
    /// Closest known path, when one is near enough
    pub suggestion: Option<String>,
}

impl std::fmt::Display for UnknownKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.suggestion {
            Some(known) => write!(f, "unknown config key `{}`, did you mean `{known}`?", self.key),
            None => write!(f, "unknown config key `{}` ignored", self.key),
        }
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for DeskConfig.
///
/// Maintained by hand to match the struct hierarchy in desk_config.rs.
/// Entries inside `[[automation.rules]]` are arrays and are not walked.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [desk]
        "desk",
        "desk.baseline_team",
        "desk.automation_author",
        "desk.system_author",
        // [teams]
        "teams",
        "teams.finance",
        "teams.after_sales",
        "teams.second_level",
        // [keywords]
        "keywords",
        "keywords.finance",
        "keywords.after_sales",
        "keywords.technical",
        "keywords.critical",
        // [orders]
        "orders",
        "orders.patterns",
        // [directory]
        "directory",
        "directory.lookup_timeout_ms",
        // [routing]
        "routing",
        "routing.agent_selection",
        // [automation]
        "automation",
        "automation.merge_policy",
        "automation.rules",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Dotted paths of every table and key in the document, sections first.
/// Arrays (including `[[automation.rules]]`) are leaves.
fn key_paths(root: &toml::Value) -> Vec<String> {
    let mut paths = Vec::new();
    let mut pending: Vec<(String, &toml::Table)> = match root.as_table() {
        Some(table) => vec![(String::new(), table)],
        None => return paths,
    };

    while let Some((prefix, table)) = pending.pop() {
        for (name, value) in table {
            let path = if prefix.is_empty() { name.clone() } else { format!("{prefix}.{name}") };
            if let toml::Value::Table(child) = value {
                pending.push((path.clone(), child));
            }
            paths.push(path);
        }
    }
    paths
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
///
/// Ties resolve to the lexicographically smallest key so the suggestion is stable.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|k| (levenshtein(unknown, k), *k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys; it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<UnknownKey> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new(); // parse errors are reported by serde later
    };

    let known = known_config_keys();
    key_paths(&value)
        .into_iter()
        .filter(|path| !known.contains(path.as_str()))
        .map(|key| UnknownKey {
            suggestion: suggest_correction(&key, &known),
            key,
        })
        .collect()
}

// ============================================================================
// Semantic Validation
// ============================================================================

/// Checks that would make the engine misbehave at runtime. Returns one message
/// per problem; an empty vec means the config is usable.
pub fn validate_semantics(config: &super::DeskConfig) -> Vec<String> {
    let mut errors = Vec::new();

    for (field, value) in [
        ("desk.baseline_team", &config.desk.baseline_team),
        ("desk.automation_author", &config.desk.automation_author),
        ("desk.system_author", &config.desk.system_author),
        ("teams.finance", &config.teams.finance),
        ("teams.after_sales", &config.teams.after_sales),
        ("teams.second_level", &config.teams.second_level),
    ] {
        if value.trim().is_empty() {
            errors.push(format!("{field} must not be empty"));
        }
    }

    let k = &config.keywords;
    for (field, words) in [
        ("keywords.finance", &k.finance),
        ("keywords.after_sales", &k.after_sales),
        ("keywords.technical", &k.technical),
        ("keywords.critical", &k.critical),
    ] {
        if words.iter().all(|w| w.trim().is_empty()) {
            errors.push(format!("{field} must contain at least one keyword"));
        }
    }

    for (i, pattern) in config.orders.patterns.iter().enumerate() {
        if let Err(e) = regex::Regex::new(pattern) {
            errors.push(format!("orders.patterns[{i}] does not compile: {e}"));
        }
    }

    if config.directory.lookup_timeout_ms == 0 {
        errors.push("directory.lookup_timeout_ms must be > 0".to_string());
    }

    errors
}

/// Checks on an explicit `[[automation.rules]]` list.
pub fn validate_rules(rules: &[AutomationRule]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (i, rule) in rules.iter().enumerate() {
        if rule.name.trim().is_empty() {
            errors.push(format!("automation.rules[{i}].name must not be empty"));
        } else if !seen.insert(rule.name.as_str()) {
            errors.push(format!("automation.rules[{i}]: duplicate rule name '{}'", rule.name));
        }

        if rule.effects.is_empty() {
            errors.push(format!("automation.rules[{i}] ('{}') has no effects", rule.name));
        }

        if let RuleCondition::AnyKeyword { keywords } = &rule.condition {
            if keywords.iter().all(|w| w.trim().is_empty()) {
                errors.push(format!(
                    "automation.rules[{i}] ('{}'): any_keyword needs at least one keyword",
                    rule.name
                ));
            }
        }

        for effect in &rule.effects {
            match effect {
                RuleEffect::AssignTeam { team } if team.trim().is_empty() => errors.push(format!(
                    "automation.rules[{i}] ('{}'): assign_team with empty team",
                    rule.name
                )),
                RuleEffect::AddTag { tag } if tag.trim().is_empty() => errors.push(format!(
                    "automation.rules[{i}] ('{}'): add_tag with empty tag",
                    rule.name
                )),
                _ => {}
            }
        }
    }

    errors
}
