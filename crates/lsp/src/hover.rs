//! Hover information from the parsed tree.
//!
//! Hovering a `$variable` inside a rule or query shows the condition that
//! binds it. Hovering a keyword shows its documentation, and for pattern
//! keywords also the extent of the pattern under the cursor.

use drools_core::{ConditionNode, DroolsFile, MultiLinePatternNode, ParseResult, Position, Range, WhenNode};
use lsp_types::{Hover, HoverContents, MarkupContent, MarkupKind};

use crate::lsp_range;

/// Compute hover information for the word under `position`.
pub fn compute_hover(
    result: &ParseResult,
    position: lsp_types::Position,
    content: &str,
) -> Option<Hover> {
    let (word, range) = word_at_position(content, position)?;
    let at = Position::new(position.line, position.character);

    if word.starts_with('$') {
        let (bound_at, content) = binding_for(&result.ast, &word, at)?;
        let markdown = format!(
            "**{}** bound on line {}\n```drools\n{}\n```",
            word,
            bound_at.start.line + 1,
            content
        );
        return Some(make_hover(markdown, range));
    }

    let doc = keyword_doc(&word)?;
    let mut markdown = format!("**{}** -- {}", word, doc);
    if let Some(pattern) = pattern_at(&result.ast, at) {
        if pattern.keyword == word {
            markdown.push_str(&pattern_summary(pattern));
        }
    }
    Some(make_hover(markdown, range))
}

fn make_hover(markdown: String, range: Range) -> Hover {
    Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: markdown,
        }),
        range: Some(lsp_range(range)),
    }
}

/// The identifier (or `$variable`) covering `position`, with its range.
fn word_at_position(content: &str, position: lsp_types::Position) -> Option<(String, Range)> {
    let line = content.lines().nth(position.line as usize)?;
    let chars: Vec<char> = line.chars().collect();
    let col = position.character as usize;
    let is_ident_char = |c: char| c.is_alphanumeric() || c == '_' || c == '-';
    if col >= chars.len() || !(is_ident_char(chars[col]) || chars[col] == '$') {
        return None;
    }

    let mut start = col;
    while start > 0 && is_ident_char(chars[start - 1]) {
        start -= 1;
    }
    if start > 0 && chars[start - 1] == '$' {
        start -= 1;
    }
    let mut end = col + 1;
    while end < chars.len() && is_ident_char(chars[end]) {
        end += 1;
    }

    let word: String = chars[start..end].iter().collect();
    if word == "$" {
        return None;
    }
    let range = Range::new(
        Position::new(position.line, start as u32),
        Position::new(position.line, end as u32),
    );
    Some((word, range))
}

/// Range and text of whatever binds `name` in the rule or query enclosing
/// `at`: a condition, or a keyword pattern nested inside another.
fn binding_for<'a>(file: &'a DroolsFile, name: &str, at: Position) -> Option<(Range, &'a str)> {
    let when: &WhenNode = file
        .rules
        .iter()
        .filter(|r| r.range.contains_position(at))
        .find_map(|r| r.when.as_ref())
        .or_else(|| {
            file.queries
                .iter()
                .find(|q| q.range.contains_position(at))
                .map(|q| &q.conditions)
        })?;
    find_binding(&when.conditions, name)
}

fn find_binding<'a>(conditions: &'a [ConditionNode], name: &str) -> Option<(Range, &'a str)> {
    for cond in conditions {
        if cond.binding.as_deref() == Some(name) {
            return Some((cond.range, cond.content.as_str()));
        }
        if let Some(pattern) = &cond.multi_line_pattern {
            let mut found = None;
            pattern.walk(&mut |p| {
                if found.is_some() {
                    return;
                }
                found = if p.binding.as_deref() == Some(name) {
                    Some((p.range, p.content.as_str()))
                } else {
                    find_binding(&p.inner_conditions, name)
                };
            });
            if found.is_some() {
                return found;
            }
        }
    }
    None
}

/// Innermost keyword pattern whose keyword covers `at`.
fn pattern_at(file: &DroolsFile, at: Position) -> Option<&MultiLinePatternNode> {
    let mut best = None;
    for pattern in file.multi_line_patterns() {
        let keyword = Range::new(pattern.range.start, pattern.open_bracket.start);
        if keyword.contains_position(at) {
            best = Some(pattern);
        }
    }
    best
}

fn pattern_summary(pattern: &MultiLinePatternNode) -> String {
    let mut summary = format!(
        "\n\nSpans {} line(s), {} condition(s), {} nested pattern(s).",
        pattern.range.line_count(),
        pattern.inner_conditions.len(),
        pattern.nested_patterns.len()
    );
    if !pattern.is_complete {
        summary.push_str(" The opening parenthesis is never closed.");
    }
    summary
}

/// Short documentation for Drools keywords and rule attributes.
pub fn keyword_doc(word: &str) -> Option<&'static str> {
    let doc = match word {
        "package" => "namespace of the rules in this file",
        "import" => "makes a Java type, static member or function visible to the rules",
        "global" => "declares a variable shared between the rules and the application",
        "function" => "declares a helper function callable from conditions and consequences",
        "rule" => "declares a production rule with a `when` condition and a `then` consequence",
        "query" => "declares a named, parameterised search over working memory",
        "declare" => "declares a fact type, enum or trait",
        "extends" => "inherits the conditions of a parent rule, or the fields of a parent type",
        "when" => "starts the conditions (left-hand side) of a rule",
        "then" => "starts the consequence (right-hand side) of a rule",
        "end" => "closes a rule, query or declaration",
        "exists" => "true when at least one fact matches the enclosed pattern",
        "not" => "true when no fact matches the enclosed pattern",
        "eval" => "evaluates an arbitrary boolean expression",
        "forall" => "true when every fact matching the first pattern also matches the rest",
        "collect" => "gathers matching facts into a collection",
        "accumulate" => "folds matching facts into a value using accumulate functions",
        "from" => "matches a pattern against the result of an expression",
        "salience" => "priority of the rule on the agenda; higher fires first",
        "enabled" => "whether the rule can fire at all",
        "date-effective" => "the rule can only fire after this date",
        "date-expires" => "the rule can no longer fire after this date",
        "no-loop" => "the rule is not re-activated by its own consequence",
        "agenda-group" => "agenda group the rule's activations are placed in",
        "activation-group" => "only one rule of this group fires per activation cycle",
        "ruleflow-group" => "rule flow group controlling when the rule may fire",
        "lock-on-active" => "blocks new activations while the rule's group is active",
        "dialect" => "language of the consequence, `java` or `mvel`",
        "auto-focus" => "gives the rule's agenda group focus when it activates",
        "duration" => "delay before a scheduled activation fires",
        "timer" => "interval or cron schedule for the rule",
        "calendars" => "calendars restricting when the rule may fire",
        "refract" => "whether a modified fact may re-activate the rule",
        "direct" => "fires the rule immediately, bypassing the agenda",
        _ => return None,
    };
    Some(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use drools_core::{keywords, parse};

    const SRC: &str = "rule r\nwhen\n  $p : Person( age > 18 )\n  exists(\n    Pet( owner == $p )\n  )\nthen\n  log($p);\nend\n";

    fn hover_text(src: &str, line: u32, character: u32) -> Option<String> {
        let result = parse(src);
        let hover = compute_hover(&result, lsp_types::Position::new(line, character), src)?;
        match hover.contents {
            HoverContents::Markup(m) => Some(m.value),
            _ => None,
        }
    }

    #[test]
    fn variable_shows_binding_condition() {
        let text = hover_text(SRC, 4, 19).unwrap();
        assert!(text.starts_with("**$p** bound on line 3"));
        assert!(text.contains("$p : Person( age > 18 )"));
    }

    #[test]
    fn variable_in_consequence_resolves() {
        assert!(hover_text(SRC, 7, 7).is_some());
    }

    #[test]
    fn pattern_keyword_includes_extent() {
        let text = hover_text(SRC, 3, 3).unwrap();
        assert!(text.starts_with("**exists**"));
        assert!(text.contains("Spans 3 line(s), 1 condition(s)"));
    }

    #[test]
    fn unknown_words_have_no_hover() {
        assert!(hover_text(SRC, 2, 8).is_none());
        assert!(hover_text(SRC, 0, 5).is_none());
    }

    #[test]
    fn hyphenated_attribute_is_one_word() {
        let text = hover_text("rule r\n  no-loop true\nwhen\nthen\nend\n", 1, 4).unwrap();
        assert!(text.starts_with("**no-loop**"));
    }

    #[test]
    fn nested_pattern_binding_resolves() {
        let src = "rule r\nwhen\n  exists(\n    $x : not( Person() )\n  )\nthen\n  log($x);\nend\n";
        let text = hover_text(src, 6, 7).unwrap();
        assert!(text.starts_with("**$x** bound on line 4"), "{}", text);
        assert!(text.contains("not( Person() )"));
    }

    #[test]
    fn every_keyword_and_attribute_is_documented() {
        let pattern_keywords = keywords::PATTERN_KEYWORDS.iter().map(|(kw, _)| kw);
        for kw in keywords::TOP_LEVEL_KEYWORDS
            .iter()
            .chain(pattern_keywords)
            .chain(keywords::RULE_ATTRIBUTES)
        {
            assert!(keyword_doc(kw).is_some(), "{}", kw);
        }
    }
}
