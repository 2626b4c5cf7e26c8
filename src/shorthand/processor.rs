// The driver: walks the template's tokens left-to-right against a shrinking
// suffix of the input, writing captures into a result mapping, recursing
// on optional blocks for backtracking. Generalizes the regex-dispatch loop
// of `obv_lexer::lexer::core::Lexer::next_token_internal` from "match one
// of a fixed set of token regexes" to "classify one structural marker and
// recurse on the optional-block construct" (spec §4.2.1).

use std::collections::VecDeque;

use lazy_static::lazy_static;
use regex::Regex;

use super::error::ShorthandError;
use super::tokenizer::QuotedTokenizer;
use super::value::{Map, Value};

lazy_static! {
    // A bare name segment: spec §3's variable name grammar, one segment.
    static ref NAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
    // `${...}` in its entirety; the interior is split on '.' and each
    // segment re-checked against NAME_RE so a malformed dotted path (e.g.
    // a trailing or doubled '.') is caught rather than silently accepted.
    static ref VARIABLE_RE: Regex = Regex::new(r"^\$\{(.+)\}$").unwrap();
    // `?${name}` in its entirety; presence-flag names never contain '.'.
    static ref PRESENCE_FLAG_RE: Regex = Regex::new(r"^\?\$\{(.+)\}$").unwrap();
}

/// Options controlling how the processor consumes a match. The only knob
/// spec §4.2 defines.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShorthandProcessorOptions {
    /// When true, the template's single terminal capturing variable takes
    /// the untrimmed, unquoted remainder of the input verbatim instead of
    /// the whitespace-normalised, per-token-unwrapped join.
    pub final_match_raw: bool,
}

/// A compiled, reusable shorthand template. Immutable after construction,
/// so it's safe to share across threads and match repeatedly: each call to
/// `matches` builds its own private `Attempt` and never touches any other
/// attempt's state (spec §5).
pub struct ShorthandProcessor {
    template: String,
    template_tokens: Vec<String>,
    options: ShorthandProcessorOptions,
}

impl ShorthandProcessor {
    pub fn new(template: &str) -> Result<Self, ShorthandError> {
        Self::with_options(template, ShorthandProcessorOptions::default())
    }

    pub fn with_options(
        template: &str,
        options: ShorthandProcessorOptions,
    ) -> Result<Self, ShorthandError> {
        let template_tokens = QuotedTokenizer::tokenize(template)?;
        Ok(ShorthandProcessor {
            template: template.to_string(),
            template_tokens,
            options,
        })
    }

    /// Run one independent match attempt against `input`.
    pub fn matches(&self, input: &str) -> Result<Map, ShorthandError> {
        let mut attempt = Attempt {
            template: &self.template,
            tokens: self.template_tokens.iter().cloned().collect(),
            input_remaining: input.to_string(),
            result: Map::new(),
            skipping: false,
            depth: 0,
            options: self.options,
        };
        attempt.run()?;
        Ok(attempt.result)
    }
}

/// One structural concern, resolved from the raw token queue. `[` and `]`
/// are character prefixes/suffixes of tokens, not standalone tokens
/// (spec §3); `next_marker` normalises them into exactly one of these per
/// call, re-queuing whatever's left.
enum Marker {
    Open,
    Close,
    Token(String),
}

/// Strip exactly one structural marker off the front of `tokens`, pushing
/// back whatever remains so the next call sees the next concern. Shared
/// between the live driver and the non-mutating lookahead helpers below
/// (`is_last_capturing`, `peek_next_marker`), which run it against a
/// cloned queue.
fn next_marker(tokens: &mut VecDeque<String>) -> Option<Marker> {
    loop {
        let raw = tokens.pop_front()?;
        if raw == "]" {
            return Some(Marker::Close);
        }
        if let Some(rest) = raw.strip_prefix('[') {
            if !rest.is_empty() {
                tokens.push_front(rest.to_string());
            }
            return Some(Marker::Open);
        }
        if let Some(body) = raw.strip_suffix(']') {
            tokens.push_front("]".to_string());
            if !body.is_empty() {
                tokens.push_front(body.to_string());
            }
            continue;
        }
        return Some(Marker::Token(raw));
    }
}

/// Single-use per-call match state: the four pieces from spec §4.2.1
/// (`templateTokens`, `inputRemaining`, `result`, `skipping`), plus
/// `depth` for close-bracket sanity checking. Each `ShorthandProcessor::matches`
/// call builds a fresh one; Rust's ownership rules make reuse across calls
/// a compile error rather than a runtime one, which is the strongest form
/// of the "single-use attempt object" contract spec §5 asks for.
struct Attempt<'a> {
    template: &'a str,
    tokens: VecDeque<String>,
    input_remaining: String,
    result: Map,
    skipping: bool,
    depth: usize,
    options: ShorthandProcessorOptions,
}

impl<'a> Attempt<'a> {
    fn next_marker(&mut self) -> Option<Marker> {
        next_marker(&mut self.tokens)
    }

    /// True iff every remaining template token, once fully resolved, is a
    /// bare `]` — i.e. no literal/variable/optional-open concern follows
    /// the variable currently being captured (spec §4.2.1, rule 3).
    fn is_last_capturing(&self) -> bool {
        let mut probe = self.tokens.clone();
        loop {
            match next_marker(&mut probe) {
                None => return true,
                Some(Marker::Close) => continue,
                Some(_) => return false,
            }
        }
    }

    /// Non-destructive lookahead at the very next marker, used to decide
    /// whether a non-quoted captured token should be cut short at the next
    /// literal (spec §4.2.1, rule 3).
    fn peek_next_marker(&self) -> Option<(bool, String)> {
        let mut probe = self.tokens.clone();
        match next_marker(&mut probe) {
            Some(Marker::Token(raw)) => Some((QuotedTokenizer::is_quoted(&raw), raw)),
            _ => None,
        }
    }

    fn malformed(&self, message: impl Into<String>) -> ShorthandError {
        ShorthandError::MalformedTemplate {
            template: self.template.to_string(),
            message: message.into(),
        }
    }

    /// Consume an immediately-following `?${name}` presence-flag token, if
    /// present. Fails fast if a token starting with `?` doesn't match the
    /// exact shape (spec §4.2.1, rule 1).
    fn take_presence_flag(&mut self) -> Result<Option<String>, ShorthandError> {
        let front = match self.tokens.front() {
            Some(f) => f.clone(),
            None => return Ok(None),
        };
        if !front.starts_with('?') {
            return Ok(None);
        }
        if let Some(name) = presence_flag_name(&front) {
            self.tokens.pop_front();
            return Ok(Some(name));
        }
        if let Some(stripped) = front.strip_suffix(']') {
            if let Some(name) = presence_flag_name(stripped) {
                self.tokens.pop_front();
                self.tokens.push_front("]".to_string());
                return Ok(Some(name));
            }
        }
        Err(self.malformed(format!("Malformed presence flag token '{}'", front)))
    }

    /// Drive one nesting level: either the outermost call, or the body of
    /// one optional block. Returns `Ok(())` once the level is fully
    /// consumed: template exhausted at the outermost level, or a matching
    /// `]` found at a nested level. A plain token hands off to its handler
    /// and tail-recurses to keep going; an optional block is delegated to
    /// `handle_optional_open`, which decides commit-vs-skip for *and*
    /// drives everything that follows it, so a failure anywhere past the
    /// block still unwinds back to this choice point (spec §4.2.2's
    /// `TRY_MATCH` isn't resolved by the block's own body alone).
    fn run(&mut self) -> Result<(), ShorthandError> {
        match self.next_marker() {
            None => {
                if self.depth != 0 {
                    return Err(self.malformed("Unbalanced '[': missing closing ']'"));
                }
                let trailing = self.input_remaining.trim();
                if !trailing.is_empty() {
                    return Err(ShorthandError::TrailingInput {
                        remainder: trailing.to_string(),
                    });
                }
                Ok(())
            }
            Some(Marker::Close) => {
                if self.depth == 0 {
                    return Err(self.malformed("Unbalanced ']' with no matching '['"));
                }
                self.depth -= 1;
                Ok(())
            }
            Some(Marker::Open) => self.handle_optional_open(),
            Some(Marker::Token(raw)) => {
                self.handle_body(raw)?;
                self.run()
            }
        }
    }

    /// Resolve one `[...]` choice point. The "try" branch isn't just the
    /// block's own body: it's the body immediately followed by the rest of
    /// the match (another `run()` call, which naturally continues from
    /// wherever the body left off). Only if that combined attempt succeeds
    /// is the block considered to have matched — a later failure several
    /// tokens past the closing `]` still belongs to this choice point and
    /// triggers its rollback, not a bare parse failure of the block alone.
    fn handle_optional_open(&mut self) -> Result<(), ShorthandError> {
        let entry_depth = self.depth;
        let presence_name = self.take_presence_flag()?;

        if self.skipping {
            if let Some(name) = presence_name {
                self.result.insert(name, Value::Bool(false));
            }
            self.depth = entry_depth + 1;
            self.run()?;
            return self.run();
        }

        let snapshot_result = self.result.clone();
        let snapshot_input = self.input_remaining.clone();
        let snapshot_tokens = self.tokens.clone();
        self.depth = entry_depth + 1;

        let attempt = match self.run() {
            Ok(()) => {
                if let Some(name) = &presence_name {
                    self.result.insert(name.clone(), Value::Bool(true));
                }
                self.run()
            }
            Err(e) => Err(e),
        };

        match attempt {
            Ok(()) => Ok(()),
            Err(e) if e.is_malformed_template() => Err(e),
            Err(_) => {
                self.result = snapshot_result;
                self.input_remaining = snapshot_input;
                self.tokens = snapshot_tokens;
                if let Some(name) = presence_name {
                    self.result.insert(name, Value::Bool(false));
                }
                self.skipping = true;
                self.depth = entry_depth + 1;
                let drained = self.run();
                self.skipping = false;
                drained?;
                self.run()
            }
        }
    }

    fn handle_body(&mut self, raw: String) -> Result<(), ShorthandError> {
        if raw.starts_with('?') {
            return Err(self.malformed(format!(
                "Unexpected presence flag token '{}' outside an optional block",
                raw
            )));
        }
        if QuotedTokenizer::is_quoted(&raw) {
            return self.handle_literal(raw);
        }
        if let Some(caps) = VARIABLE_RE.captures(&raw) {
            let inner = &caps[1];
            let parts: Vec<&str> = inner.split('.').collect();
            if parts.iter().all(|p| NAME_RE.is_match(p)) {
                let path: Vec<String> = parts.into_iter().map(str::to_string).collect();
                return self.handle_variable(path);
            }
            return Err(self.malformed(format!("Invalid variable name '{}' in '{}'", inner, raw)));
        }
        Err(self.malformed(format!(
            "Unexpected token in shorthand pattern '{}'",
            self.template
        )))
    }

    fn handle_literal(&mut self, raw: String) -> Result<(), ShorthandError> {
        if self.skipping {
            return Ok(());
        }
        let literal = QuotedTokenizer::unwrap(&raw);
        let literal_trimmed = literal.trim_start();
        let input_trimmed = self.input_remaining.trim_start();

        if input_trimmed.starts_with(literal_trimmed) {
            let leading_ws = self.input_remaining.len() - input_trimmed.len();
            let consumed = leading_ws + literal_trimmed.len();
            self.input_remaining = self.input_remaining[consumed..].to_string();
            Ok(())
        } else if input_trimmed.is_empty() {
            Err(ShorthandError::LiteralMismatch {
                message: format!(
                    "Literal '{}' expected, when end of input reached",
                    literal_trimmed
                ),
            })
        } else {
            Err(ShorthandError::LiteralMismatch {
                message: format!(
                    "Literal '{}' expected, when encountered '{}'",
                    literal_trimmed, input_trimmed
                ),
            })
        }
    }

    fn handle_variable(&mut self, path: Vec<String>) -> Result<(), ShorthandError> {
        if self.skipping {
            return Ok(());
        }

        self.input_remaining = self.input_remaining.trim_start().to_string();
        if self.input_remaining.is_empty() {
            return Err(ShorthandError::InputExhausted {
                message: format!("End of input when looking for variable {}", path.join(".")),
            });
        }

        let captured = if self.is_last_capturing() {
            let tokens = QuotedTokenizer::tokenize(&self.input_remaining)?;
            let value = if self.options.final_match_raw {
                QuotedTokenizer::new(&self.input_remaining)
                    .remainder_raw()
                    .to_string()
            } else {
                tokens
                    .iter()
                    .map(|t| QuotedTokenizer::unwrap(t))
                    .collect::<Vec<_>>()
                    .join(" ")
            };
            self.input_remaining = String::new();
            value
        } else {
            let mut cursor = QuotedTokenizer::new(&self.input_remaining);
            let v = match cursor.next()? {
                Some(v) => v,
                None => {
                    return Err(ShorthandError::InputExhausted {
                        message: format!(
                            "End of input when looking for variable {}",
                            path.join(".")
                        ),
                    });
                }
            };

            if QuotedTokenizer::is_quoted(&v) {
                let value = QuotedTokenizer::unwrap(&v);
                self.input_remaining = self.input_remaining[v.len()..].to_string();
                value
            } else {
                let mut consumed_len = v.len();
                let mut value = v.clone();
                if let Some((true, next_raw)) = self.peek_next_marker() {
                    let next_lit = QuotedTokenizer::unwrap(&next_raw);
                    let search_from = quoted_prefix_end(&v);
                    if let Some(rel_idx) = v[search_from..].find(next_lit.as_str()) {
                        let idx = search_from + rel_idx;
                        if idx > 0 {
                            value = v[..idx].to_string();
                            consumed_len = idx;
                        }
                    }
                }
                self.input_remaining = self.input_remaining[consumed_len..].to_string();
                if QuotedTokenizer::is_quoted(&value) {
                    QuotedTokenizer::unwrap(&value)
                } else {
                    value
                }
            }
        };

        self.assign_path(&path, Value::Str(captured))
    }

    fn assign_path(&mut self, path: &[String], value: Value) -> Result<(), ShorthandError> {
        let full_path = path.join(".");
        insert_path(&mut self.result, path, value, &full_path)
    }
}

/// If `v` begins with a quoted span, return the byte offset just past its
/// closing quote; otherwise 0. Lets the next-literal search in
/// `handle_variable` skip past an embedded quoted value instead of
/// matching the delimiter text inside it.
fn quoted_prefix_end(v: &str) -> usize {
    let mut chars = v.char_indices();
    match chars.next() {
        Some((_, '"')) => {}
        _ => return 0,
    }
    let mut escaped = false;
    for (idx, c) in chars {
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
            continue;
        }
        if c == '"' {
            return idx + c.len_utf8();
        }
    }
    0
}

fn presence_flag_name(s: &str) -> Option<String> {
    let caps = PRESENCE_FLAG_RE.captures(s)?;
    let inner = &caps[1];
    if NAME_RE.is_match(inner) {
        Some(inner.to_string())
    } else {
        None
    }
}

/// Recursive dotted-path insertion: creates (or reuses) a sub-map at every
/// prefix, failing with `PathConflict` if a prefix is already bound to a
/// non-map value (spec §3's invariant).
fn insert_path(
    map: &mut Map,
    path: &[String],
    value: Value,
    full_path: &str,
) -> Result<(), ShorthandError> {
    if path.len() == 1 {
        if let Some(Value::Map(_)) = map.get(&path[0]) {
            return Err(ShorthandError::PathConflict {
                message: format!(
                    "Cannot process shorthand for [{}] because '{}' is already a map",
                    full_path, path[0]
                ),
            });
        }
        map.insert(path[0].clone(), value);
        return Ok(());
    }
    let key = &path[0];
    let entry = map
        .entry(key.clone())
        .or_insert_with(|| Value::Map(Map::new()));
    match entry {
        Value::Map(inner) => insert_path(inner, &path[1..], value, full_path),
        other => Err(ShorthandError::PathConflict {
            message: format!(
                "Cannot process shorthand for [{}] because entry '{}' is not a map ({})",
                full_path,
                key,
                other.describe()
            ),
        }),
    }
}
