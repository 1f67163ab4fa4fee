//! Range-annotated AST for Drools rule files.
//!
//! Every node is rebuilt from scratch on each parse; nothing here carries
//! identity across edits. Child ranges are always contained in their
//! parent's range and every sequence is kept in source order.

use serde::{Deserialize, Serialize};

// ──────────────────────────────────────────────
// Positions
// ──────────────────────────────────────────────

/// A zero-based line/column position. Columns count characters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Position { line, column }
    }
}

/// A half-open source range `[start, end)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Range { start, end }
    }

    /// Whether `other` lies entirely inside this range.
    pub fn contains(&self, other: &Range) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Whether `pos` lies inside this range (end inclusive, for cursors).
    pub fn contains_position(&self, pos: Position) -> bool {
        self.start <= pos && pos <= self.end
    }

    /// Number of lines the range touches.
    pub fn line_count(&self) -> u32 {
        self.end.line.saturating_sub(self.start.line) + 1
    }
}

// ──────────────────────────────────────────────
// File root
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DroolsFile {
    pub package: Option<PackageNode>,
    pub imports: Vec<ImportNode>,
    pub globals: Vec<GlobalNode>,
    pub functions: Vec<FunctionNode>,
    pub rules: Vec<RuleNode>,
    pub queries: Vec<QueryNode>,
    pub declares: Vec<DeclareNode>,
    /// Ranges of every line and block comment, in source order.
    pub comments: Vec<Range>,
    pub range: Range,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageNode {
    pub name: String,
    pub range: Range,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportNode {
    pub path: String,
    pub is_static: bool,
    pub is_function: bool,
    pub range: Range,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalNode {
    pub type_name: String,
    pub name: String,
    pub range: Range,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionNode {
    pub return_type: String,
    pub name: String,
    /// Raw parameter list text, without the enclosing parentheses.
    pub parameters: String,
    /// Raw body text, without the enclosing braces.
    pub body: String,
    pub range: Range,
}

// ──────────────────────────────────────────────
// Rules and queries
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleNode {
    pub name: String,
    /// Parent rule named by `extends`.
    pub parent: Option<String>,
    pub attributes: Vec<RuleAttribute>,
    pub when: Option<WhenNode>,
    pub then: Option<ThenNode>,
    pub range: Range,
}

/// A rule attribute such as `salience 10` or an annotation `@Name(...)`.
/// Annotation names keep their leading `@`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleAttribute {
    pub name: String,
    pub value: String,
    pub range: Range,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhenNode {
    pub conditions: Vec<ConditionNode>,
    pub range: Range,
}

/// Consequence of a rule. The action code is kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThenNode {
    pub content: String,
    pub range: Range,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryNode {
    pub name: String,
    /// Raw parameter list text, without the enclosing parentheses.
    pub parameters: Option<String>,
    pub conditions: WhenNode,
    pub range: Range,
}

// ──────────────────────────────────────────────
// Conditions
// ──────────────────────────────────────────────

/// Classification of a single when-clause condition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionType {
    #[default]
    Pattern,
    Exists,
    Not,
    Eval,
    Forall,
    Collect,
    Accumulate,
}

impl ConditionType {
    /// Maps a pattern keyword to its condition type. Plain fact patterns
    /// have no keyword, so `"pattern"` is not accepted here.
    pub fn from_keyword(word: &str) -> Option<Self> {
        crate::keywords::PATTERN_KEYWORDS
            .iter()
            .find(|(kw, _)| *kw == word)
            .map(|&(_, ty)| ty)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConditionType::Pattern => "pattern",
            ConditionType::Exists => "exists",
            ConditionType::Not => "not",
            ConditionType::Eval => "eval",
            ConditionType::Forall => "forall",
            ConditionType::Collect => "collect",
            ConditionType::Accumulate => "accumulate",
        }
    }
}

impl std::fmt::Display for ConditionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionNode {
    pub condition_type: ConditionType,
    /// Variable bound with `$name :` or `$name :=`, including the `$`.
    pub binding: Option<String>,
    pub content: String,
    pub is_multi_line: bool,
    pub multi_line_pattern: Option<MultiLinePatternNode>,
    /// Every matched `(`…`)` pair inside the condition, ordered by opening bracket.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parenthesis_ranges: Vec<Range>,
    pub range: Range,
}

/// A keyword pattern (`exists(`, `not(`, `accumulate(`, …) together with
/// everything found between its brackets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiLinePatternNode {
    pub pattern_type: ConditionType,
    pub keyword: String,
    pub content: String,
    pub is_complete: bool,
    /// Recursion distance from the when-clause root (root = 0).
    pub depth: usize,
    /// Variable bound to the whole pattern (`$x : not( ... )`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<String>,
    /// Keyword written before the pattern keyword, as `not` in `not exists(`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<ConditionType>,
    pub inner_conditions: Vec<ConditionNode>,
    pub nested_patterns: Vec<MultiLinePatternNode>,
    /// Range of the `(` that follows the keyword.
    pub open_bracket: Range,
    pub range: Range,
}

impl MultiLinePatternNode {
    /// Visits this pattern and every nested pattern, depth first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a MultiLinePatternNode)) {
        visit(self);
        for nested in &self.nested_patterns {
            nested.walk(visit);
        }
    }
}

// ──────────────────────────────────────────────
// Declarations
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclareKind {
    #[default]
    Type,
    Enum,
    Trait,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclareNode {
    pub kind: DeclareKind,
    pub name: String,
    pub super_type: Option<String>,
    pub annotations: Vec<String>,
    /// Enum constants, verbatim (`RED("r")`). Empty for types and traits.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constants: Vec<String>,
    pub fields: Vec<FieldNode>,
    pub range: Range,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldNode {
    pub name: String,
    pub type_name: String,
    pub annotations: Vec<String>,
    pub range: Range,
}

// ──────────────────────────────────────────────
// Range plumbing
// ──────────────────────────────────────────────

/// Nodes whose range is assigned once parsing of the construct finishes.
pub trait Ranged {
    fn range(&self) -> Range;
    fn set_range(&mut self, range: Range);
}

macro_rules! impl_ranged {
    ($($node:ty),* $(,)?) => {
        $(
            impl Ranged for $node {
                fn range(&self) -> Range {
                    self.range
                }

                fn set_range(&mut self, range: Range) {
                    self.range = range;
                }
            }
        )*
    };
}

impl_ranged!(
    PackageNode,
    ImportNode,
    GlobalNode,
    FunctionNode,
    RuleNode,
    QueryNode,
    DeclareNode,
);

impl DroolsFile {
    /// Every condition in every rule and query, outermost first.
    pub fn conditions(&self) -> impl Iterator<Item = &ConditionNode> {
        self.rules
            .iter()
            .filter_map(|r| r.when.as_ref())
            .chain(self.queries.iter().map(|q| &q.conditions))
            .flat_map(|w| w.conditions.iter())
    }

    /// Every keyword pattern reachable from a top-level condition.
    pub fn multi_line_patterns(&self) -> Vec<&MultiLinePatternNode> {
        let mut out = Vec::new();
        for cond in self.conditions() {
            if let Some(pattern) = &cond.multi_line_pattern {
                pattern.walk(&mut |p| out.push(p));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(l1: u32, c1: u32, l2: u32, c2: u32) -> Range {
        Range::new(Position::new(l1, c1), Position::new(l2, c2))
    }

    #[test]
    fn range_containment_is_inclusive_of_equal_bounds() {
        let outer = r(1, 0, 5, 3);
        assert!(outer.contains(&outer));
        assert!(outer.contains(&r(2, 4, 3, 0)));
        assert!(!outer.contains(&r(0, 9, 2, 0)));
        assert!(!outer.contains(&r(5, 0, 5, 4)));
    }

    #[test]
    fn keyword_table_rejects_plain_pattern() {
        assert_eq!(ConditionType::from_keyword("forall"), Some(ConditionType::Forall));
        assert_eq!(ConditionType::from_keyword("pattern"), None);
        assert_eq!(ConditionType::from_keyword("Exists"), None);
    }

    #[test]
    fn walk_visits_nested_patterns_depth_first() {
        let leaf = MultiLinePatternNode {
            keyword: "eval".into(),
            depth: 2,
            ..Default::default()
        };
        let mid = MultiLinePatternNode {
            keyword: "not".into(),
            depth: 1,
            nested_patterns: vec![leaf],
            ..Default::default()
        };
        let root = MultiLinePatternNode {
            keyword: "exists".into(),
            nested_patterns: vec![mid],
            ..Default::default()
        };
        let mut seen = Vec::new();
        root.walk(&mut |p| seen.push((p.keyword.clone(), p.depth)));
        assert_eq!(
            seen,
            vec![
                ("exists".to_string(), 0),
                ("not".to_string(), 1),
                ("eval".to_string(), 2)
            ]
        );
    }
}
