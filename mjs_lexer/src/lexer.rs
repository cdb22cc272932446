use std::rc::Rc;

use boa_unicode::UnicodeProperties;
use mjs_ast::Version;

use crate::error::LexError;
use crate::keyword::{self, Keyword};
use crate::token::Token;

fn is_ascii_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\u{000B}' | '\u{000C}')
}

fn is_line_terminator(c: char, version: Version) -> bool {
    match c {
        '\n' | '\r' => true,
        '\u{2028}' | '\u{2029}' => version.at_least(Version::Es3),
        _ => false,
    }
}

fn is_whitespace(c: char, version: Version) -> bool {
    if is_ascii_whitespace(c) {
        return true;
    }
    if version.at_least(Version::Es3) && c == '\u{00A0}' {
        return true; // <NBSP>
    }
    if version.at_least(Version::Es5) && c == '\u{FEFF}' {
        return true; // zero-width no-break space, ES5 whitespace
    }
    // <USP>: any other Unicode space separator, from ES3 onward.
    version.at_least(Version::Es3) && c.is_pattern_whitespace() && !is_line_terminator(c, version)
}

/// A tokenizer over a single source string. `next()` advances the cursor
/// and leaves its result in `self.token`; `has_newline_before` reports
/// whether a line terminator was skipped to reach it, which the parser
/// consults for automatic semicolon insertion. Owns its source text via a
/// cheaply-clonable `Rc<str>` rather than borrowing it, so a `Lexer` can
/// live inside a parser or agent struct without carrying a lifetime
/// parameter.
#[derive(Debug, Clone)]
pub struct Lexer {
    source: Rc<str>,
    version: Version,
    codepoint: Option<char>,
    index: u32,
    pub token: Token,
    pub start: u32,
    pub has_newline_before: bool,
    /// Set by `continue_number` when the just-lexed numeric literal used
    /// the legacy octal form (`0` followed by octal digits, no `o`/`x`
    /// prefix). Strict-mode rejection of this form is a parser concern
    /// (spec.md §4.3); the lexer only records the fact.
    pub last_number_was_legacy_octal: bool,
}

impl Lexer {
    pub fn new(source: impl AsRef<str>, version: Version) -> Self {
        let source: Rc<str> = Rc::from(source.as_ref());
        let codepoint = source.chars().next();
        Self {
            source,
            version,
            codepoint,
            index: 0,
            token: Token::Eof,
            start: 0,
            has_newline_before: false,
            last_number_was_legacy_octal: false,
        }
    }

    fn text(&self) -> &str {
        &self.source
    }

    pub fn byte_offset(&self) -> u32 {
        self.index
    }

    pub fn token_start(&self) -> u32 {
        self.start
    }

    fn step(&mut self) {
        let Some(cp) = self.codepoint else { return };
        self.index += cp.len_utf8() as u32;
        self.codepoint = self.text()[self.index as usize..].chars().next();
    }

    fn peek_char(&self) -> Option<char> {
        self.codepoint
    }

    fn peek_next_char(&self) -> Option<char> {
        self.text()[self.index as usize + self.codepoint.map(|c| c.len_utf8()).unwrap_or(0)..]
            .chars()
            .next()
    }

    fn err(&self, message: impl Into<String>) -> LexError {
        LexError::new(message, self.start)
    }

    /// Decodes a `\uXXXX` escape at the current position (cursor sitting
    /// right after the backslash). Advances past it and returns the
    /// decoded character.
    fn read_unicode_escape(&mut self) -> Result<char, LexError> {
        if self.peek_char() != Some('u') {
            return Err(self.err("expected unicode escape"));
        }
        self.step();
        let mut value = 0u32;
        for _ in 0..4 {
            let digit = self
                .peek_char()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.err("invalid unicode escape"))?;
            value = value * 16 + digit;
            self.step();
        }
        char::from_u32(value).ok_or_else(|| self.err("invalid unicode escape"))
    }

    fn continue_ident(&mut self, first: char) -> Result<Token, LexError> {
        let mut name = String::new();
        name.push(first);
        loop {
            match self.peek_char() {
                Some('\\') if self.version.at_least(Version::Es3) => {
                    self.step();
                    let ch = self.read_unicode_escape()?;
                    if !ch.is_id_continue() {
                        return Err(self.err("invalid identifier escape"));
                    }
                    name.push(ch);
                }
                Some(c) if c.is_id_continue() => {
                    name.push(c);
                    self.step();
                }
                _ => break,
            }
        }
        if let Some(kw) = keyword::lookup(&name, self.version) {
            Ok(Token::Keyword(kw))
        } else {
            Ok(Token::Ident(name))
        }
    }

    fn continue_number(&mut self) -> Result<Token, LexError> {
        self.last_number_was_legacy_octal = false;
        let start = self.start as usize;

        if self.text().as_bytes()[start] == b'0' {
            match self.peek_char() {
                Some('x' | 'X') => {
                    self.step();
                    let digits_start = self.index as usize;
                    while matches!(self.peek_char(), Some(c) if c.is_ascii_hexdigit()) {
                        self.step();
                    }
                    if self.index as usize == digits_start {
                        return Err(self.err("missing hex digits after 0x"));
                    }
                    let text = &self.text()[digits_start..self.index as usize];
                    let value = u64::from_str_radix(text, 16)
                        .map_err(|_| self.err("invalid hex literal"))?;
                    return Ok(Token::Number(value as f64));
                }
                Some('0'..='7') => {
                    let digits_start = start;
                    while matches!(self.peek_char(), Some('0'..='7')) {
                        self.step();
                    }
                    // A `8` or `9` or `.` downgrades this back to decimal.
                    if matches!(self.peek_char(), Some('8' | '9' | '.')) {
                        self.continue_decimal_tail();
                        let text = &self.text()[start..self.index as usize];
                        let value: f64 = text.parse().map_err(|_| self.err("invalid number"))?;
                        return Ok(Token::Number(value));
                    }
                    self.last_number_was_legacy_octal = true;
                    let text = &self.text()[digits_start..self.index as usize];
                    let value = u64::from_str_radix(text, 8)
                        .map_err(|_| self.err("invalid octal literal"))?;
                    return Ok(Token::Number(value as f64));
                }
                _ => {}
            }
        }

        self.continue_decimal_tail();
        let text = &self.text()[start..self.index as usize];
        let value: f64 = text.parse().map_err(|_| self.err("invalid number"))?;
        Ok(Token::Number(value))
    }

    fn continue_decimal_tail(&mut self) {
        while matches!(self.peek_char(), Some('0'..='9')) {
            self.step();
        }
        if self.peek_char() == Some('.') {
            self.step();
            while matches!(self.peek_char(), Some('0'..='9')) {
                self.step();
            }
        }
        if matches!(self.peek_char(), Some('e' | 'E')) {
            let save = self.index;
            self.step();
            if matches!(self.peek_char(), Some('+' | '-')) {
                self.step();
            }
            if matches!(self.peek_char(), Some('0'..='9')) {
                while matches!(self.peek_char(), Some('0'..='9')) {
                    self.step();
                }
            } else {
                self.index = save;
                self.codepoint = self.text()[self.index as usize..].chars().next();
            }
        }
    }

    fn continue_string(&mut self, quote: char) -> Result<Token, LexError> {
        let mut out = String::new();
        loop {
            match self.peek_char() {
                None => return Err(self.err("unterminated string literal")),
                Some(c) if c == quote => {
                    self.step();
                    break;
                }
                Some('\n' | '\r') => {
                    return Err(self.err("unterminated string literal"));
                }
                Some('\\') => {
                    self.step();
                    match self.peek_char() {
                        None => return Err(self.err("unterminated string literal")),
                        Some('\n') => {
                            // Line continuation: escaped newline contributes
                            // nothing to the string's value.
                            self.step();
                        }
                        Some('\r') => {
                            self.step();
                            if self.peek_char() == Some('\n') {
                                self.step();
                            }
                        }
                        Some('n') => {
                            out.push('\n');
                            self.step();
                        }
                        Some('t') => {
                            out.push('\t');
                            self.step();
                        }
                        Some('r') => {
                            out.push('\r');
                            self.step();
                        }
                        Some('b') => {
                            out.push('\u{0008}');
                            self.step();
                        }
                        Some('f') => {
                            out.push('\u{000C}');
                            self.step();
                        }
                        Some('v') => {
                            self.step();
                            // Accepted as an escape (producing U+000B) only
                            // from ES3 onward; ES1 treats `\v` as the
                            // literal character `v`.
                            if self.version.at_least(Version::Es3) {
                                out.push('\u{000B}');
                            } else {
                                out.push('v');
                            }
                        }
                        Some('0') if !matches!(self.peek_next_char(), Some('0'..='9')) => {
                            out.push('\u{0000}');
                            self.step();
                        }
                        Some('x') => {
                            self.step();
                            let mut value = 0u32;
                            for _ in 0..2 {
                                let digit = self
                                    .peek_char()
                                    .and_then(|c| c.to_digit(16))
                                    .ok_or_else(|| self.err("invalid hex escape"))?;
                                value = value * 16 + digit;
                                self.step();
                            }
                            out.push(char::from_u32(value).ok_or_else(|| self.err("invalid hex escape"))?);
                        }
                        Some('u') => {
                            let ch = self.read_unicode_escape()?;
                            out.push(ch);
                        }
                        Some(other) => {
                            out.push(other);
                            self.step();
                        }
                    }
                }
                Some(c) => {
                    out.push(c);
                    self.step();
                }
            }
        }
        Ok(Token::String(out))
    }

    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek_char() {
                Some(c) if is_line_terminator(c, self.version) => {
                    self.has_newline_before = true;
                    self.step();
                }
                Some(c) if is_whitespace(c, self.version) => {
                    self.step();
                }
                Some('/') if self.peek_next_char() == Some('/') => {
                    self.step();
                    self.step();
                    while !matches!(self.peek_char(), None | Some('\n' | '\r')) {
                        self.step();
                    }
                }
                Some('/') if self.peek_next_char() == Some('*') => {
                    self.step();
                    self.step();
                    loop {
                        match self.peek_char() {
                            None => return Err(self.err("unterminated comment")),
                            Some('\n' | '\r') => {
                                self.has_newline_before = true;
                                self.step();
                            }
                            Some('*') if self.peek_next_char() == Some('/') => {
                                self.step();
                                self.step();
                                break;
                            }
                            _ => self.step(),
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Advances to the next token. The lexer's own punctuator handling
    /// always treats `/` as division; callers that reach a position where
    /// the grammar instead expects a primary expression must call
    /// [`Lexer::relex_regex_literal`] once they observe `Token::Div`/
    /// `Token::DivAssign`.
    pub fn next(&mut self) -> Result<(), LexError> {
        self.has_newline_before = false;
        self.skip_trivia()?;
        self.start = self.index;

        let Some(c) = self.peek_char() else {
            self.token = Token::Eof;
            return Ok(());
        };

        self.token = match c {
            'a'..='z' | 'A'..='Z' | '_' | '$' => {
                self.step();
                self.continue_ident(c)?
            }
            '\\' if self.version.at_least(Version::Es3) => {
                self.step();
                let ch = self.read_unicode_escape()?;
                if !ch.is_id_start() {
                    return Err(self.err("invalid identifier start escape"));
                }
                self.continue_ident(ch)?
            }
            '0'..='9' => {
                self.step();
                self.continue_number()?
            }
            '\'' | '"' => {
                self.step();
                self.continue_string(c)?
            }
            '{' => self.single(Token::LBrace),
            '}' => self.single(Token::RBrace),
            '(' => self.single(Token::LParen),
            ')' => self.single(Token::RParen),
            '[' => self.single(Token::LBrack),
            ']' => self.single(Token::RBrack),
            ';' => self.single(Token::Semi),
            ',' => self.single(Token::Comma),
            ':' => self.single(Token::Colon),
            '~' => self.single(Token::BitNot),
            '.' => self.single(Token::Dot),
            '+' => self.step_then(|l| match l.peek_char() {
                Some('+') => l.consume(Token::Inc),
                Some('=') => l.consume(Token::AddAssign),
                _ => Token::Add,
            }),
            '-' => self.step_then(|l| match l.peek_char() {
                Some('-') => l.consume(Token::Dec),
                Some('=') => l.consume(Token::SubAssign),
                _ => Token::Sub,
            }),
            '*' => self.step_then(|l| match l.peek_char() {
                Some('=') => l.consume(Token::MulAssign),
                _ => Token::Mul,
            }),
            '%' => self.step_then(|l| match l.peek_char() {
                Some('=') => l.consume(Token::ModAssign),
                _ => Token::Mod,
            }),
            '/' => self.step_then(|l| match l.peek_char() {
                Some('=') => l.consume(Token::DivAssign),
                _ => Token::Div,
            }),
            '=' => self.step_then(|l| match l.peek_char() {
                Some('=') => l.step_then(|l| match l.peek_char() {
                    Some('=') => l.consume(Token::StrictEquality),
                    _ => Token::Equality,
                }),
                _ => Token::Equal,
            }),
            '!' => self.step_then(|l| match l.peek_char() {
                Some('=') => l.step_then(|l| match l.peek_char() {
                    Some('=') => l.consume(Token::StrictInequality),
                    _ => Token::Inequality,
                }),
                _ => Token::Not,
            }),
            '<' => self.step_then(|l| match l.peek_char() {
                Some('=') => l.consume(Token::Lte),
                Some('<') => l.step_then(|l| match l.peek_char() {
                    Some('=') => l.consume(Token::ShiftLeftAssign),
                    _ => Token::ShiftLeft,
                }),
                _ => Token::Lt,
            }),
            '>' => self.step_then(|l| match l.peek_char() {
                Some('=') => l.consume(Token::Gte),
                Some('>') => l.step_then(|l| match l.peek_char() {
                    Some('=') => l.consume(Token::ShiftRightAssign),
                    Some('>') => l.step_then(|l| match l.peek_char() {
                        Some('=') => l.consume(Token::UnsignedShiftRightAssign),
                        _ => Token::UnsignedShiftRight,
                    }),
                    _ => Token::ShiftRight,
                }),
                _ => Token::Gt,
            }),
            '&' => self.step_then(|l| match l.peek_char() {
                Some('&') => l.consume(Token::And),
                Some('=') => l.consume(Token::BitAndAssign),
                _ => Token::BitAnd,
            }),
            '|' => self.step_then(|l| match l.peek_char() {
                Some('|') => l.consume(Token::Or),
                Some('=') => l.consume(Token::BitOrAssign),
                _ => Token::BitOr,
            }),
            '^' => self.step_then(|l| match l.peek_char() {
                Some('=') => l.consume(Token::BitXorAssign),
                _ => Token::BitXor,
            }),
            '?' => self.single(Token::Ternary),
            other => {
                if other.is_id_start() {
                    self.step();
                    self.continue_ident(other)?
                } else if is_whitespace(other, self.version) {
                    // skip_trivia should have consumed this already.
                    self.step();
                    return self.next();
                } else {
                    return Err(self.err(format!("unexpected character '{other}'")));
                }
            }
        };

        Ok(())
    }

    fn single(&mut self, tok: Token) -> Token {
        self.step();
        tok
    }

    /// Steps past the current character, then calls `f` to decide the
    /// final token (which may itself call `step_then`/`consume` again to
    /// look further ahead — used for the two- and three-character
    /// operators).
    fn step_then(&mut self, f: impl FnOnce(&mut Self) -> Token) -> Token {
        self.step();
        f(self)
    }

    fn consume(&mut self, tok: Token) -> Token {
        self.step();
        tok
    }

    /// Re-lexes starting at the `/` that was just tokenized as `Div` or
    /// `DivAssign`, this time as a regular-expression literal. Called by
    /// the parser only at positions where the grammar admits a primary
    /// expression (spec.md §4.2, §4.3).
    pub fn relex_regex_literal(&mut self) -> Result<(), LexError> {
        self.index = self.start;
        self.codepoint = self.text()[self.index as usize..].chars().next();
        debug_assert_eq!(self.peek_char(), Some('/'));
        self.step();

        let mut pattern = String::new();
        let mut in_class = false;
        loop {
            match self.peek_char() {
                None | Some('\n' | '\r') => return Err(self.err("unterminated regular expression")),
                Some('\\') => {
                    pattern.push('\\');
                    self.step();
                    match self.peek_char() {
                        None | Some('\n' | '\r') => {
                            return Err(self.err("unterminated regular expression"))
                        }
                        Some(c) => {
                            pattern.push(c);
                            self.step();
                        }
                    }
                }
                Some('[') => {
                    in_class = true;
                    pattern.push('[');
                    self.step();
                }
                Some(']') if in_class => {
                    in_class = false;
                    pattern.push(']');
                    self.step();
                }
                Some('/') if !in_class => {
                    self.step();
                    break;
                }
                Some(c) => {
                    pattern.push(c);
                    self.step();
                }
            }
        }

        let mut flags = String::new();
        while matches!(self.peek_char(), Some(c) if c.is_ascii_alphabetic()) {
            flags.push(self.peek_char().unwrap());
            self.step();
        }

        self.token = Token::RegExp { pattern, flags };
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn tokens(source: &str, version: Version) -> Vec<Token> {
        let mut lexer = Lexer::new(source, version);
        let mut out = Vec::new();
        loop {
            lexer.next().unwrap();
            if lexer.token == Token::Eof {
                break;
            }
            out.push(lexer.token.clone());
        }
        out
    }

    #[test]
    fn operators_round_trip() {
        assert_eq!(
            tokens("+ += ++ - -= -- * *= % %= / /=", Version::Es5),
            vec![
                Token::Add,
                Token::AddAssign,
                Token::Inc,
                Token::Sub,
                Token::SubAssign,
                Token::Dec,
                Token::Mul,
                Token::MulAssign,
                Token::Mod,
                Token::ModAssign,
                Token::Div,
                Token::DivAssign,
            ]
        );
    }

    #[test]
    fn keywords_gated_by_version() {
        assert_eq!(tokens("switch", Version::Es1), vec![Token::Ident("switch".into())]);
        assert_eq!(tokens("switch", Version::Es3), vec![Token::Keyword(Keyword::Switch)]);
    }

    #[test]
    fn unterminated_string_rejects_raw_newline() {
        let mut lexer = Lexer::new("'abc\ndef'", Version::Es5);
        assert!(lexer.next().is_err());
    }

    #[test]
    fn vertical_tab_escape_gated_by_version() {
        assert_eq!(tokens("'\\v'", Version::Es1), vec![Token::String("v".into())]);
        assert_eq!(tokens("'\\v'", Version::Es3), vec![Token::String("\u{000B}".into())]);
    }

    #[test]
    fn es3_strips_format_control_before_lexing() {
        // The stripping itself happens in `mjs_ast::SourceFile::new`; here
        // we only confirm the lexer sees the already-stripped text as a
        // single identifier.
        assert_eq!(tokens("test", Version::Es3), vec![Token::Ident("test".into())]);
    }

    #[test]
    fn has_newline_before_tracks_asi_hint() {
        let mut lexer = Lexer::new("a\nb", Version::Es5);
        lexer.next().unwrap();
        assert!(!lexer.has_newline_before);
        lexer.next().unwrap();
        assert!(lexer.has_newline_before);
    }

    #[test]
    fn regex_relex_after_div_token() {
        let mut lexer = Lexer::new("/ab\\/c/gi", Version::Es5);
        lexer.next().unwrap();
        assert_eq!(lexer.token, Token::Div);
        lexer.relex_regex_literal().unwrap();
        assert_eq!(
            lexer.token,
            Token::RegExp {
                pattern: "ab\\/c".into(),
                flags: "gi".into(),
            }
        );
    }

    #[test]
    fn legacy_octal_literal_is_flagged() {
        let mut lexer = Lexer::new("0777", Version::Es5);
        lexer.next().unwrap();
        assert_eq!(lexer.token, Token::Number(511.0));
        assert!(lexer.last_number_was_legacy_octal);
    }
}
