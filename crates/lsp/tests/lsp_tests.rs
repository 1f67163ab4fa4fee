//! Editor round trips: an edited document goes through the parse cache and
//! comes out as diagnostics and hovers, without the caller re-parsing.

use drools_lsp::{compute_hover, to_lsp_diagnostics, DocumentCache};
use lsp_types::{DiagnosticSeverity, HoverContents, NumberOrString, Position, Uri};
use pretty_assertions::assert_eq;

const URI: &str = "file:///workspace/rules/orders.drl";

fn uri() -> Uri {
    URI.parse::<Uri>().expect("URI parse")
}

// ──────────────────────────────────────────────
// Fixtures
// ──────────────────────────────────────────────

const CLEAN: &str = r#"package org.acme.orders

import org.acme.Order

rule "Large order"
    salience 5
when
    $o : Order( total > 1000 )
    not(
        Approval( order == $o )
    )
then
    insert(new Approval($o));
end
"#;

/// The same file while the user is still typing the `not(` pattern.
const EDITING: &str = r#"package org.acme.orders

import org.acme.Order

rule "Large order"
    salience 5
when
    $o : Order( total > 1000 )
    not(
        Approval( order == $o )
then
    insert(new Approval($o));
end

rule "Small order"
when
    Order( total < 10 )
then
end
"#;

// ──────────────────────────────────────────────
// Diagnostics
// ──────────────────────────────────────────────

#[test]
fn clean_document_publishes_nothing() {
    let mut cache = DocumentCache::default();
    let result = cache.get_or_parse(URI, 1, CLEAN);
    assert!(to_lsp_diagnostics(&result, &uri()).is_empty());
}

#[test]
fn editing_document_reports_open_pattern_and_keeps_next_rule() {
    let mut cache = DocumentCache::default();
    cache.get_or_parse(URI, 1, CLEAN);
    let result = cache.get_or_parse(URI, 2, EDITING);

    assert_eq!(result.ast.rules.len(), 2);
    assert_eq!(result.ast.rules[1].name, "Small order");

    let diags = to_lsp_diagnostics(&result, &uri());
    let codes: Vec<_> = diags
        .iter()
        .map(|d| match &d.code {
            Some(NumberOrString::String(s)) => s.as_str(),
            _ => "",
        })
        .collect();
    assert_eq!(codes, vec!["bracket-error", "structural-error"]);
    assert!(diags
        .iter()
        .all(|d| d.severity == Some(DiagnosticSeverity::ERROR)));

    // The bracket diagnostic sits on the `(` of `not(` and links the pattern.
    assert_eq!(diags[0].range.start, Position::new(8, 7));
    let related = diags[0].related_information.as_ref().expect("related info");
    assert_eq!(related[0].location.uri, uri());
    assert_eq!(related[0].location.range.start, Position::new(8, 4));

    // The structural diagnostic sits on the rule keyword.
    assert_eq!(diags[1].range.start, Position::new(4, 0));
}

#[test]
fn fixing_the_document_clears_diagnostics() {
    let mut cache = DocumentCache::default();
    let broken = cache.get_or_parse(URI, 1, EDITING);
    assert!(broken.has_errors());
    let fixed = cache.get_or_parse(URI, 2, CLEAN);
    assert!(!fixed.has_errors());
    assert!(to_lsp_diagnostics(&fixed, &uri()).is_empty());
}

// ──────────────────────────────────────────────
// Hover
// ──────────────────────────────────────────────

fn hover_markdown(text: &str, line: u32, character: u32) -> Option<String> {
    let mut cache = DocumentCache::default();
    let result = cache.get_or_parse(URI, 1, text);
    match compute_hover(&result, Position::new(line, character), text)?.contents {
        HoverContents::Markup(m) => Some(m.value),
        _ => None,
    }
}

#[test]
fn hover_on_variable_inside_pattern() {
    let text = hover_markdown(CLEAN, 9, 28).expect("hover");
    assert!(text.contains("$o : Order( total > 1000 )"));
}

#[test]
fn hover_on_unclosed_pattern_keyword_mentions_it() {
    let text = hover_markdown(EDITING, 8, 5).expect("hover");
    assert!(text.starts_with("**not**"));
    assert!(text.contains("never closed"));
}

#[test]
fn hover_on_attribute() {
    let text = hover_markdown(CLEAN, 5, 6).expect("hover");
    assert!(text.starts_with("**salience**"));
}
