// Whitespace-delimited, quote-aware tokenizer shared by the template side
// and the input side of the shorthand processor.
//
// Configuration is fixed (see spec §4.1): quotes are kept in the emitted
// token text, delimiter runs are never emitted as tokens, and an
// unterminated quote is a hard failure rather than something silently
// absorbed.

use super::error::ShorthandError;

/// Streaming, quote-aware tokenizer over a borrowed `&str`.
///
/// Mirrors the cursor-over-borrowed-input shape of `obv_lexer`'s `Lexer`:
/// a `position` byte offset that only ever moves forward.
pub struct QuotedTokenizer<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> QuotedTokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        QuotedTokenizer { input, position: 0 }
    }

    /// One-shot convenience: tokenize `input` fully and return the token list.
    pub fn tokenize(input: &'a str) -> Result<Vec<String>, ShorthandError> {
        QuotedTokenizer::new(input).tokens()
    }

    /// True iff any non-whitespace input remains to be tokenized.
    pub fn has_more(&self) -> bool {
        self.input[self.position..]
            .chars()
            .any(|c| !c.is_whitespace())
    }

    /// Pull the next whitespace-delimited, quote-aware token, advancing the
    /// cursor past it. Returns `Ok(None)` once only whitespace remains.
    pub fn next(&mut self) -> Result<Option<String>, ShorthandError> {
        loop {
            match self.input[self.position..].chars().next() {
                None => return Ok(None),
                Some(c) if c.is_whitespace() => self.position += c.len_utf8(),
                Some(_) => break,
            }
        }

        let start = self.position;
        let mut in_quote = false;
        loop {
            match self.input[self.position..].chars().next() {
                None => {
                    if in_quote {
                        return Err(ShorthandError::TokenizerFailure {
                            message: format!(
                                "Unterminated quoted string in '{}'",
                                &self.input[start..self.position]
                            ),
                        });
                    }
                    break;
                }
                Some(c) => {
                    if in_quote {
                        if c == '\\' {
                            self.position += c.len_utf8();
                            if let Some(escaped) = self.input[self.position..].chars().next() {
                                self.position += escaped.len_utf8();
                            }
                            continue;
                        }
                        self.position += c.len_utf8();
                        if c == '"' {
                            in_quote = false;
                        }
                        continue;
                    }
                    if c.is_whitespace() {
                        break;
                    }
                    self.position += c.len_utf8();
                    if c == '"' {
                        in_quote = true;
                    }
                }
            }
        }

        Ok(Some(self.input[start..self.position].to_string()))
    }

    /// All remaining tokens, collected via repeated `next()`.
    pub fn tokens(&mut self) -> Result<Vec<String>, ShorthandError> {
        let mut out = Vec::new();
        while let Some(tok) = self.next()? {
            out.push(tok);
        }
        Ok(out)
    }

    /// The untokenized remainder, with leading/trailing whitespace trimmed
    /// but internal spacing and quoting preserved. Used only by the
    /// `finalMatchRaw` capture mode.
    pub fn remainder_raw(&self) -> &'a str {
        self.input[self.position..].trim()
    }

    /// True iff `s` begins and ends with `"` and the interior is a single
    /// balanced quoted run (no unescaped `"` before the final one).
    pub fn is_quoted(s: &str) -> bool {
        let chars: Vec<char> = s.chars().collect();
        if chars.len() < 2 || chars[0] != '"' || chars[chars.len() - 1] != '"' {
            return false;
        }
        let interior = &chars[1..chars.len() - 1];
        let mut i = 0;
        while i < interior.len() {
            if interior[i] == '\\' {
                i += 2;
                continue;
            }
            if interior[i] == '"' {
                return false;
            }
            i += 1;
        }
        true
    }

    /// If `s` is quoted, strip the outer quotes and decode escape
    /// sequences; otherwise return `s` unchanged.
    pub fn unwrap(s: &str) -> String {
        if !Self::is_quoted(s) {
            return s.to_string();
        }
        let interior = &s[1..s.len() - 1];
        unescape(interior)
    }
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_whitespace() {
        let tokens = QuotedTokenizer::tokenize("foo   bar\tbaz").unwrap();
        assert_eq!(tokens, vec!["foo", "bar", "baz"]);
    }

    #[test]
    fn keeps_quotes_in_token_text() {
        let tokens = QuotedTokenizer::tokenize(r#"foo "bar baz" qux"#).unwrap();
        assert_eq!(tokens, vec!["foo", "\"bar baz\"", "qux"]);
    }

    #[test]
    fn unterminated_quote_fails() {
        let err = QuotedTokenizer::tokenize(r#"foo "bar"#).unwrap_err();
        assert!(matches!(err, ShorthandError::TokenizerFailure { .. }));
    }

    #[test]
    fn is_quoted_and_unwrap() {
        assert!(QuotedTokenizer::is_quoted("\"hello\""));
        assert!(!QuotedTokenizer::is_quoted("hello"));
        assert!(!QuotedTokenizer::is_quoted("\"unterminated"));
        assert_eq!(QuotedTokenizer::unwrap("\"hello\""), "hello");
        assert_eq!(QuotedTokenizer::unwrap("hello"), "hello");
    }

    #[test]
    fn unwrap_decodes_escapes() {
        assert_eq!(
            QuotedTokenizer::unwrap(r#""a\"b\\c\nd""#),
            "a\"b\\c\nd"
        );
    }

    #[test]
    fn remainder_raw_preserves_internal_spacing() {
        let mut t = QuotedTokenizer::new("  hello   big   world  ");
        assert_eq!(t.next().unwrap().as_deref(), Some("hello"));
        assert_eq!(t.remainder_raw(), "big   world");
    }

    #[test]
    fn has_more_false_on_whitespace_only() {
        let t = QuotedTokenizer::new("   \t  ");
        assert!(!t.has_more());
    }
}
