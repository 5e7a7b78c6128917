use smol_str::SmolStr;

use crate::error::NexusError;

/// One recognized lexical category. Order matters: `Tokenizer::read_token`
/// tries recognizers in the order they're listed on the wire-format table in
/// SPEC_FULL.md §4.1, and stops at the first one that both matches the
/// cursor and is present in the caller's accepted set.
///
/// Note this order makes `OpPost` (`=~`) unreachable whenever `OpEq` is also
/// accepted at the same position, since a bare `=` is a valid prefix of
/// `=~` and `OpEq` is tried first. That's inherited unchanged from the
/// original program's token table (`nexus/parser.py`'s `TOKENS` dict has the
/// same ordering) rather than patched, per SPEC_FULL.md §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    OpEq,
    OpNe,
    OpLt,
    OpGt,
    OpPre,
    OpPost,
    OpIn,
    Id,
    Key,
    Number,
    String,
    LineEnd,
}

/// A token matched at some cursor position. `raw` is the literal matched
/// text, unescaped for `String` (quotes included) — `Token::unescape` does
/// that separately, since not every caller of the tokenizer wants it.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub raw: SmolStr,
    pub offset: usize,
}

impl Token {
    /// Decodes a `String` token's raw text (including its surrounding
    /// quotes) into its unescaped value. `\r`, `\n`, `\\`, `\"` are the only
    /// recognized escapes; any other character following a backslash is
    /// passed through literally, matching `Parser.parseStringLiteral` in
    /// the original program.
    pub fn unescape(&self) -> String {
        debug_assert_eq!(self.kind, TokenKind::String);
        let body = &self.raw[1..self.raw.len() - 1];
        let mut out = String::with_capacity(body.len());
        let mut chars = body.chars();
        while let Some(ch) = chars.next() {
            if ch == '\\' {
                match chars.next() {
                    Some('r') => out.push('\r'),
                    Some('n') => out.push('\n'),
                    Some('\\') => out.push('\\'),
                    Some('"') => out.push('"'),
                    Some(other) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => out.push('\\'),
                }
            } else {
                out.push(ch);
            }
        }
        out
    }
}

/// Hand-written cursor tokenizer over one logical line. Stateful only in its
/// byte offset into `source`.
pub struct Tokenizer<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Tokenizer { source, pos: 0 }
    }

    pub fn offset(&self) -> usize {
        self.pos
    }

    /// True if only whitespace remains (i.e. the next token would be
    /// `LineEnd`), without consuming anything.
    pub fn at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.remaining().is_empty()
    }

    fn remaining(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.remaining();
        let skip = rest
            .find(|c: char| c != ' ' && c != '\t')
            .unwrap_or(rest.len());
        self.pos += skip;
    }

    /// Reads the next token, restricting recognition to `accept` (empty
    /// means "accept anything"). Does not advance the cursor past the
    /// match unless `advance` is true.
    pub fn read_token(
        &mut self,
        accept: &[TokenKind],
        advance: bool,
    ) -> Result<Token, NexusError> {
        self.skip_whitespace();
        let rest = self.remaining();
        let offset = self.pos;

        if rest.is_empty() {
            return self.accept_match(TokenKind::LineEnd, "", accept, advance, offset);
        }

        let accepts = |k: TokenKind| accept.is_empty() || accept.contains(&k);

        if accepts(TokenKind::OpEq) && rest.starts_with('=') {
            return self.accept_match(TokenKind::OpEq, &rest[..1], accept, advance, offset);
        }
        if accepts(TokenKind::OpNe) && rest.starts_with("!=") {
            return self.accept_match(TokenKind::OpNe, &rest[..2], accept, advance, offset);
        }
        if accepts(TokenKind::OpLt) && rest.starts_with('<') {
            return self.accept_match(TokenKind::OpLt, &rest[..1], accept, advance, offset);
        }
        if accepts(TokenKind::OpGt) && rest.starts_with('>') {
            return self.accept_match(TokenKind::OpGt, &rest[..1], accept, advance, offset);
        }
        if accepts(TokenKind::OpPre) && rest.starts_with("~=") {
            return self.accept_match(TokenKind::OpPre, &rest[..2], accept, advance, offset);
        }
        if accepts(TokenKind::OpPost) && rest.starts_with("=~") {
            return self.accept_match(TokenKind::OpPost, &rest[..2], accept, advance, offset);
        }
        if accepts(TokenKind::OpIn) && rest.starts_with('~') {
            return self.accept_match(TokenKind::OpIn, &rest[..1], accept, advance, offset);
        }
        if accepts(TokenKind::Id) {
            let len = match_ident(rest, true);
            if len > 0 {
                return self.accept_match(TokenKind::Id, &rest[..len], accept, advance, offset);
            }
        }
        if accepts(TokenKind::Key) {
            let len = match_key(rest);
            if len > 0 {
                return self.accept_match(TokenKind::Key, &rest[..len], accept, advance, offset);
            }
        }
        if accepts(TokenKind::Number) {
            if let Some(len) = match_number(rest) {
                return self.accept_match(TokenKind::Number, &rest[..len], accept, advance, offset);
            }
        }
        if accepts(TokenKind::String) {
            if let Some(len) = match_string(rest) {
                return self.accept_match(TokenKind::String, &rest[..len], accept, advance, offset);
            }
        }
        if accepts(TokenKind::LineEnd) && rest.starts_with('\n') {
            return self.accept_match(TokenKind::LineEnd, &rest[..1], accept, advance, offset);
        }

        let mut snippet = rest.to_string();
        if snippet.len() > 20 {
            snippet.truncate(20);
            snippet.push_str("...");
        }
        Err(NexusError::Tokenize { offset, snippet })
    }

    fn accept_match(
        &mut self,
        kind: TokenKind,
        text: &str,
        _accept: &[TokenKind],
        advance: bool,
        offset: usize,
    ) -> Result<Token, NexusError> {
        let token = Token {
            kind,
            raw: SmolStr::new(text),
            offset,
        };
        if advance {
            self.pos += text.len();
        }
        Ok(token)
    }

    /// Reads tokens until `LineEnd`/end-of-input, returning everything read
    /// (including the terminal `LineEnd`).
    pub fn read_until_end(&mut self, accept: &[TokenKind]) -> Result<Vec<Token>, NexusError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.read_token(accept, true)?;
            let is_end = token.kind == TokenKind::LineEnd;
            tokens.push(token);
            if is_end {
                break;
            }
        }
        Ok(tokens)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_'
}

fn match_ident(s: &str, _allow_leading_digit: bool) -> usize {
    s.chars()
        .take_while(|&c| is_ident_char(c))
        .map(char::len_utf8)
        .sum()
}

fn match_key(s: &str) -> usize {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return 0,
    }
    1 + chars.take_while(|&c| is_ident_char(c)).map(char::len_utf8).sum::<usize>()
}

/// `\d+(\.\d+)?` followed by whitespace or end-of-input.
fn match_number(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut len = 0;
    while len < bytes.len() && bytes[len].is_ascii_digit() {
        len += 1;
    }
    if len == 0 {
        return None;
    }
    if bytes.get(len) == Some(&b'.') && bytes.get(len + 1).is_some_and(u8::is_ascii_digit) {
        len += 1;
        while len < bytes.len() && bytes[len].is_ascii_digit() {
            len += 1;
        }
    }
    match bytes.get(len) {
        None | Some(b' ') | Some(b'\t') | Some(b'\n') => Some(len),
        _ => None,
    }
}

/// A `"`-delimited literal where `\"` does not terminate the string.
fn match_string(s: &str) -> Option<usize> {
    let mut chars = s.char_indices();
    if chars.next()?.1 != '"' {
        return None;
    }
    let mut escaped = false;
    for (idx, ch) in chars {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => return Some(idx + 1),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(line: &str, accept: &[TokenKind]) -> Vec<TokenKind> {
        Tokenizer::new(line)
            .read_until_end(accept)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn key_rejects_leading_digit() {
        let mut t = Tokenizer::new("123word");
        assert!(t.read_token(&[TokenKind::Key], false).is_err());
    }

    #[test]
    fn key_accepts_usual_shapes() {
        for word in ["word", "word123", "CamelCase", "with_underscore", "_underscore", "dotted.name", "dashed-name"] {
            let mut t = Tokenizer::new(word);
            let tok = t.read_token(&[TokenKind::Key], true).unwrap();
            assert_eq!(tok.kind, TokenKind::Key);
            assert_eq!(tok.raw, word);
        }
    }

    #[test]
    fn key_rejects_punctuation_prefix() {
        for word in ["-dash-prefixed", ".dot.prefixed"] {
            let mut t = Tokenizer::new(word);
            assert!(t.read_token(&[TokenKind::Key], false).is_err());
        }
    }

    #[test]
    fn newline_is_lineend() {
        let mut t = Tokenizer::new("\n");
        let tok = t.read_token(&[], true).unwrap();
        assert_eq!(tok.kind, TokenKind::LineEnd);
    }

    #[test]
    fn number_rejects_multi_dot_and_leading_dot() {
        assert_eq!(match_number("1.0.3"), None);
        assert_eq!(match_number(".438"), None);
    }

    #[test]
    fn number_accepts_plain_and_trailing_space() {
        assert_eq!(match_number("123"), Some(3));
        assert_eq!(match_number("123 "), Some(3));
        assert_eq!(match_number("3.14"), Some(4));
        assert_eq!(match_number("123abc456"), None);
    }

    #[test]
    fn string_literal_handles_escaped_quote() {
        let raw = r#""Ted \"Big Man\" Kazinsky""#;
        let mut t = Tokenizer::new(raw);
        let tok = t.read_token(&[TokenKind::String], true).unwrap();
        assert_eq!(tok.raw, raw);
        assert_eq!(tok.unescape(), "Ted \"Big Man\" Kazinsky");
    }

    #[test]
    fn read_until_end_counts_tokens() {
        // Every logical line ends in a `LineEnd` token whether that's an
        // explicit `\n` or simply running out of input (SPEC_FULL.md §4.1:
        // "Newline and end-of-input both produce a LINEEND token").
        assert_eq!(kinds("key=123", &[]).len(), 4);
        assert_eq!(kinds("key=123\n", &[]).len(), 4);
        assert_eq!(kinds("    key=123", &[]).len(), 4);
        assert_eq!(kinds("key = 123", &[]).len(), 4);
    }
}
