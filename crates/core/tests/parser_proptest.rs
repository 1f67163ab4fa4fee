//! Property-based tests for the parser.
//!
//! Whatever the input, parsing must finish, must not fall back to the
//! internal-error result, and must be deterministic. Well-formed files
//! must parse without diagnostics.

use drools_core::{parse, ConditionType, ErrorKind};
use proptest::prelude::*;

/// Text drawn from the characters that drive the parser's state machine.
fn drools_noise() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("rule ".to_owned()),
            Just("when\n".to_owned()),
            Just("then\n".to_owned()),
            Just("end\n".to_owned()),
            Just("exists(".to_owned()),
            Just("not ".to_owned()),
            Just("accumulate(".to_owned()),
            Just("declare ".to_owned()),
            Just("function ".to_owned()),
            Just("query ".to_owned()),
            Just("$x : ".to_owned()),
            "[(){}\\[\\]\"';,:@/*\n -]".prop_map(|s| s.to_string()),
            "[A-Za-z_][A-Za-z0-9_]{0,6}".prop_map(|s| format!("{} ", s)),
        ],
        0..80,
    )
    .prop_map(|parts| parts.concat())
}

/// One condition line that always parses cleanly.
fn condition_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Z][a-z]{1,8}".prop_map(|t| format!("{}()", t)),
        ("[a-z]{1,6}", "[A-Z][a-z]{1,8}", 0..100u32)
            .prop_map(|(v, t, n)| format!("${} : {}( age > {} )", v, t, n)),
        "[A-Z][a-z]{1,8}".prop_map(|t| format!("not {}()", t)),
        "[A-Z][a-z]{1,8}".prop_map(|t| format!("exists(\n    {}()\n  )", t)),
        "[A-Z][a-z]{1,8}".prop_map(|t| format!("not( exists( {}() ) )", t)),
        Just("eval( true )".to_owned()),
    ]
}

fn rule_strategy() -> impl Strategy<Value = String> {
    (
        "[A-Za-z][A-Za-z0-9 ]{0,12}",
        prop::collection::vec(condition_strategy(), 0..4),
    )
        .prop_map(|(name, conditions)| {
            let mut rule = format!("rule \"{}\"\nwhen\n", name);
            for c in conditions {
                rule.push_str("  ");
                rule.push_str(&c);
                rule.push('\n');
            }
            rule.push_str("then\n  act();\nend\n\n");
            rule
        })
}

proptest! {
    #[test]
    fn arbitrary_text_never_panics(src in any::<String>()) {
        let result = parse(&src);
        prop_assert!(result.errors.iter().all(|e| e.message != "Internal parser error"));
        prop_assert!(result.errors.len() <= 100);
    }

    #[test]
    fn drools_like_noise_never_panics(src in drools_noise()) {
        let result = parse(&src);
        prop_assert!(result.errors.iter().all(|e| e.message != "Internal parser error"));
        for rule in &result.ast.rules {
            prop_assert!(result.ast.range.contains(&rule.range));
        }
    }

    #[test]
    fn parsing_is_deterministic(src in drools_noise()) {
        prop_assert_eq!(parse(&src), parse(&src));
    }

    #[test]
    fn well_formed_rules_parse_cleanly(rules in prop::collection::vec(rule_strategy(), 1..8)) {
        let src = rules.concat();
        let result = parse(&src);
        prop_assert!(result.errors.is_empty(), "{:?}", result.errors);
        prop_assert_eq!(result.ast.rules.len(), rules.len());
        for rule in &result.ast.rules {
            prop_assert!(rule.then.is_some());
        }
    }

    #[test]
    fn incomplete_patterns_always_have_a_bracket_diagnostic(src in drools_noise()) {
        let result = parse(&src);
        for pattern in result.ast.multi_line_patterns() {
            if !pattern.is_complete {
                let found = result.errors.iter().any(|e| {
                    matches!(e.kind, ErrorKind::Bracket | ErrorKind::Eof)
                        && e.range == pattern.open_bracket
                });
                prop_assert!(found || result.errors.len() == 100);
            }
        }
        for cond in result.ast.conditions() {
            if cond.is_multi_line {
                prop_assert!(cond.multi_line_pattern.is_some());
                prop_assert!(cond.condition_type != ConditionType::Pattern);
            }
        }
    }
}
