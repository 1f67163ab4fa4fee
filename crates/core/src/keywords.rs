//! Read-only keyword tables shared by the parser and by editor collaborators.

use crate::ast::ConditionType;

/// Words that open a top-level construct. When one of them is the first
/// token on a line it is also a recovery point.
pub const TOP_LEVEL_KEYWORDS: &[&str] = &[
    "package", "import", "global", "function", "rule", "query", "declare",
];

/// Keywords that wrap a nested pattern when followed by `(`, with the
/// condition type each one produces.
pub const PATTERN_KEYWORDS: &[(&str, ConditionType)] = &[
    ("exists", ConditionType::Exists),
    ("not", ConditionType::Not),
    ("eval", ConditionType::Eval),
    ("forall", ConditionType::Forall),
    ("collect", ConditionType::Collect),
    ("accumulate", ConditionType::Accumulate),
];

/// Rule attributes accepted between the rule name and `when`.
pub const RULE_ATTRIBUTES: &[&str] = &[
    "salience",
    "enabled",
    "date-effective",
    "date-expires",
    "no-loop",
    "agenda-group",
    "activation-group",
    "ruleflow-group",
    "lock-on-active",
    "dialect",
    "auto-focus",
    "duration",
    "timer",
    "calendars",
    "refract",
    "direct",
];

/// Words joining two condition units.
pub const CONNECTIVES: &[&str] = &["and", "or"];

pub fn is_top_level_keyword(word: &str) -> bool {
    TOP_LEVEL_KEYWORDS.contains(&word)
}

pub fn is_rule_attribute(word: &str) -> bool {
    RULE_ATTRIBUTES.contains(&word)
}
