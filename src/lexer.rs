//! # Lexer Module
//!
//! Hand-written tokenizer for the Sparkling language. Uses `memchr` for
//! SIMD-accelerated byte scanning to locate comment terminators and
//! count skipped lines. Produces a flat `Vec<Token>` consumed by the
//! parser.
//!
//! ## Key Features
//! - Zero-regex: fully hand-rolled byte dispatch.
//! - Integer literals in decimal, octal (leading `0`), and hex (`0x`).
//! - Float literals `D.D`, `.D` and `D.` with optional exponent.
//! - Character literals of 1-8 bytes, packed big-endian into an integer.
//! - C-style escape sequences including `\xHH`.
//! - `/* ... */` block comments (non-nesting).

use crate::error::{Span, SparklingError, SparklingResult};
use crate::token::{Token, TokenKind, lookup_keyword};

// -----------------------------------------------------------------------------
// LEXER STATE
// -----------------------------------------------------------------------------

/// The Sparkling lexer. Converts source bytes into a token stream.
///
/// Operates directly on a byte slice for speed, avoiding UTF-8 boundary
/// checks on the hot path. Only validates UTF-8 when extracting
/// identifier and string content.
pub struct Lexer<'src> {
    /// Source bytes being tokenized.
    source: &'src [u8],
    /// Current byte offset into `source`.
    pos: usize,
    /// Current 1-based line number.
    line: u32,
    /// Current 1-based column number.
    col: u32,
}

impl<'src> Lexer<'src> {
    /// Creates a new lexer for the given source string.
    pub fn new(source: &'src str) -> Self {
        Self {
            source: source.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    /// Tokenizes the entire source, returning all tokens including a
    /// trailing `Eof` token.
    ///
    /// # Errors
    /// Returns a `SparklingError` if the source contains an unexpected
    /// byte, an unterminated string/comment, a malformed escape, or a
    /// malformed numeric literal.
    pub fn tokenize(&mut self) -> SparklingResult<Vec<Token>> {
        let mut tokens = Vec::with_capacity(self.source.len() / 4);

        loop {
            self.skip_whitespace_and_comments()?;

            if self.is_at_end() {
                tokens.push(Token::new(
                    TokenKind::Eof,
                    Span::new(self.line, self.col, 0),
                ));
                break;
            }

            let token = self.scan_token()?;
            tokens.push(token);
        }

        Ok(tokens)
    }

    // -------------------------------------------------------------------------
    // CORE SCANNING
    // -------------------------------------------------------------------------

    /// Scans and returns the next token from the source.
    fn scan_token(&mut self) -> SparklingResult<Token> {
        let start_line = self.line;
        let start_col = self.col;
        let start_pos = self.pos;

        let byte = self.advance();

        let kind = match byte {
            // -- Single-character delimiters --
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b',' => TokenKind::Comma,
            b';' => TokenKind::Semicolon,
            b':' => TokenKind::Colon,
            b'?' => TokenKind::Question,
            b'~' => TokenKind::Tilde,
            b'#' => TokenKind::Hash,

            // -- Sequence / dictionary literal openers --
            b'@' => {
                if self.match_byte(b'[') {
                    TokenKind::AtBracket
                } else if self.match_byte(b'{') {
                    TokenKind::AtBrace
                } else {
                    return Err(SparklingError::lexer(
                        "expected `[' or `{' after '@'",
                        Span::new(start_line, start_col, 1),
                    ));
                }
            }

            // -- Dot: member access, concat, concat-assign, or a float --
            b'.' => {
                if !self.is_at_end() && self.peek().is_ascii_digit() {
                    self.scan_leading_dot_float(start_line, start_col)?
                } else if self.match_byte(b'.') {
                    if self.match_byte(b'=') {
                        TokenKind::DotDotEq
                    } else {
                        TokenKind::DotDot
                    }
                } else {
                    TokenKind::Dot
                }
            }

            // -- Operators that may be compound --
            b'+' => {
                if self.match_byte(b'=') {
                    TokenKind::PlusEq
                } else if self.match_byte(b'+') {
                    TokenKind::PlusPlus
                } else {
                    TokenKind::Plus
                }
            }
            b'-' => {
                if self.match_byte(b'=') {
                    TokenKind::MinusEq
                } else if self.match_byte(b'-') {
                    TokenKind::MinusMinus
                } else if self.match_byte(b'>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Minus
                }
            }
            b'*' => {
                if self.match_byte(b'=') {
                    TokenKind::StarEq
                } else {
                    TokenKind::Star
                }
            }
            b'/' => {
                if self.match_byte(b'=') {
                    TokenKind::SlashEq
                } else {
                    TokenKind::Slash
                }
            }
            b'%' => {
                if self.match_byte(b'=') {
                    TokenKind::PercentEq
                } else {
                    TokenKind::Percent
                }
            }
            b'=' => {
                if self.match_byte(b'=') {
                    TokenKind::EqEq
                } else {
                    TokenKind::Eq
                }
            }
            b'!' => {
                if self.match_byte(b'=') {
                    TokenKind::BangEq
                } else {
                    TokenKind::Bang
                }
            }
            b'<' => {
                if self.match_byte(b'<') {
                    if self.match_byte(b'=') {
                        TokenKind::ShlEq
                    } else {
                        TokenKind::Shl
                    }
                } else if self.match_byte(b'=') {
                    TokenKind::LtEq
                } else {
                    TokenKind::Lt
                }
            }
            b'>' => {
                if self.match_byte(b'>') {
                    if self.match_byte(b'=') {
                        TokenKind::ShrEq
                    } else {
                        TokenKind::Shr
                    }
                } else if self.match_byte(b'=') {
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            b'&' => {
                if self.match_byte(b'&') {
                    TokenKind::AmpAmp
                } else if self.match_byte(b'=') {
                    TokenKind::AmpEq
                } else {
                    TokenKind::Amp
                }
            }
            b'|' => {
                if self.match_byte(b'|') {
                    TokenKind::PipePipe
                } else if self.match_byte(b'=') {
                    TokenKind::PipeEq
                } else {
                    TokenKind::Pipe
                }
            }
            b'^' => {
                if self.match_byte(b'=') {
                    TokenKind::CaretEq
                } else {
                    TokenKind::Caret
                }
            }

            // -- String literals --
            b'"' => return self.scan_string(start_line, start_col, start_pos),

            // -- Character literals --
            b'\'' => return self.scan_char_literal(start_line, start_col, start_pos),

            // -- Number literals --
            b'0'..=b'9' => self.scan_number(byte, start_line, start_col)?,

            // -- Identifiers & keywords --
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.scan_identifier(start_pos)?,

            _ => {
                return Err(SparklingError::lexer(
                    format!("unexpected character: '{}'", byte as char),
                    Span::new(start_line, start_col, 1),
                ));
            }
        };

        let len = (self.pos - start_pos) as u32;
        Ok(Token::new(kind, Span::new(start_line, start_col, len)))
    }

    // -------------------------------------------------------------------------
    // STRING & CHARACTER SCANNING
    // -------------------------------------------------------------------------

    /// Scans a double-quoted string literal, decoding escape sequences.
    /// Strings may span lines; the raw newline is kept in the payload.
    fn scan_string(
        &mut self,
        start_line: u32,
        start_col: u32,
        start_pos: usize,
    ) -> SparklingResult<Token> {
        let mut bytes = Vec::new();

        loop {
            if self.is_at_end() {
                return Err(SparklingError::lexer(
                    "unterminated string literal",
                    Span::new(start_line, start_col, 1),
                ));
            }

            let byte = self.peek();

            if byte == b'"' {
                self.advance();
                break;
            }

            if byte == b'\\' {
                self.advance();
                // `\xHH` above 0x7f decodes to the scalar U+00HH
                let decoded = self.scan_escape()?;
                let mut utf8 = [0u8; 4];
                bytes.extend_from_slice(char::from(decoded).encode_utf8(&mut utf8).as_bytes());
                continue;
            }

            if byte == b'\n' {
                self.line += 1;
                self.col = 0;
            }
            self.advance();
            bytes.push(byte);
        }

        let content = String::from_utf8(bytes).map_err(|_| {
            SparklingError::lexer(
                "invalid UTF-8 in string literal",
                Span::new(start_line, start_col, 1),
            )
        })?;

        let len = (self.pos - start_pos) as u32;
        Ok(Token::new(
            TokenKind::Str(content),
            Span::new(start_line, start_col, len),
        ))
    }

    /// Scans a single-quoted character literal: 1-8 bytes packed
    /// big-endian into an integer token.
    fn scan_char_literal(
        &mut self,
        start_line: u32,
        start_col: u32,
        start_pos: usize,
    ) -> SparklingResult<Token> {
        let mut bytes = Vec::new();

        loop {
            if self.is_at_end() {
                return Err(SparklingError::lexer(
                    "unterminated character literal",
                    Span::new(start_line, start_col, 1),
                ));
            }

            let byte = self.peek();

            if byte == b'\'' {
                self.advance();
                break;
            }

            if byte == b'\\' {
                self.advance();
                bytes.push(self.scan_escape()?);
                continue;
            }

            if byte == b'\n' {
                self.line += 1;
                self.col = 0;
            }
            self.advance();
            bytes.push(byte);
        }

        let len = (self.pos - start_pos) as u32;
        let span = Span::new(start_line, start_col, len);

        if bytes.is_empty() {
            return Err(SparklingError::lexer("empty character literal", span));
        }
        if bytes.len() > 8 {
            return Err(SparklingError::lexer(
                "character literal longer than 8 bytes",
                span,
            ));
        }

        let mut value: u64 = 0;
        for &b in &bytes {
            value = value << 8 | u64::from(b);
        }

        Ok(Token::new(TokenKind::Int(value as i64), span))
    }

    /// Decodes one escape sequence; the backslash has been consumed.
    /// Returns the decoded byte.
    fn scan_escape(&mut self) -> SparklingResult<u8> {
        if self.is_at_end() {
            return Err(SparklingError::lexer(
                "unterminated escape sequence",
                Span::new(self.line, self.col, 1),
            ));
        }

        let esc = self.advance();
        match esc {
            b'\\' => Ok(b'\\'),
            b'/' => Ok(b'/'),
            b'\'' => Ok(b'\''),
            b'"' => Ok(b'"'),
            b'a' => Ok(0x07),
            b'b' => Ok(0x08),
            b'f' => Ok(0x0c),
            b'n' => Ok(b'\n'),
            b'r' => Ok(b'\r'),
            b't' => Ok(b'\t'),
            b'0' => Ok(0x00),
            b'x' => {
                // exactly two hex digits
                let hi = self.hex_digit()?;
                let lo = self.hex_digit()?;
                Ok(hi << 4 | lo)
            }
            _ => Err(SparklingError::lexer(
                format!("invalid escape sequence '\\{}'", esc as char),
                Span::new(self.line, self.col, 2),
            )),
        }
    }

    /// Consumes one hex digit, returning its value.
    fn hex_digit(&mut self) -> SparklingResult<u8> {
        if self.is_at_end() || !self.peek().is_ascii_hexdigit() {
            return Err(SparklingError::lexer(
                "expected two hex digits after '\\x'",
                Span::new(self.line, self.col, 1),
            ));
        }

        let b = self.advance();
        Ok(match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => b - b'a' + 10,
            _ => b - b'A' + 10,
        })
    }

    // -------------------------------------------------------------------------
    // NUMBER SCANNING — Decimal, Octal, Hex, Float
    // -------------------------------------------------------------------------

    /// Scans a number literal starting with a digit. Dispatches between
    /// hex (`0x`), octal (leading `0`), decimal, and the float forms
    /// `D.D` and `D.` with optional exponent.
    fn scan_number(
        &mut self,
        first: u8,
        start_line: u32,
        start_col: u32,
    ) -> SparklingResult<TokenKind> {
        if first == b'0' && !self.is_at_end() && (self.peek() == b'x' || self.peek() == b'X') {
            self.advance();
            return self.scan_hex_number(start_line, start_col);
        }

        let mut num = String::new();
        num.push(first as char);

        while !self.is_at_end() && self.peek().is_ascii_digit() {
            num.push(self.advance() as char);
        }

        // A digit run followed by ".." is an integer: the dots are the
        // concatenation operator, not a fraction.
        let mut is_float = false;
        if !self.is_at_end()
            && self.peek() == b'.'
            && (self.pos + 1 >= self.source.len() || self.source[self.pos + 1] != b'.')
        {
            self.advance();
            is_float = true;
            num.push('.');

            while !self.is_at_end() && self.peek().is_ascii_digit() {
                num.push(self.advance() as char);
            }
            if num.ends_with('.') {
                num.push('0'); // "5." is the float 5.0
            }

            self.scan_exponent(&mut num);
        }

        if is_float {
            let value: f64 = num.parse().map_err(|_| {
                SparklingError::lexer(
                    format!("invalid number literal: {}", num),
                    Span::new(start_line, start_col, num.len() as u32),
                )
            })?;
            return Ok(TokenKind::Float(value));
        }

        if first == b'0' && num.len() > 1 {
            // leading zero: octal
            if num.bytes().any(|b| b > b'7') {
                return Err(SparklingError::lexer(
                    format!("invalid octal literal: {}", num),
                    Span::new(start_line, start_col, num.len() as u32),
                ));
            }

            let value = i64::from_str_radix(&num, 8).map_err(|_| {
                SparklingError::lexer(
                    format!("integer literal too large: {}", num),
                    Span::new(start_line, start_col, num.len() as u32),
                )
            })?;
            return Ok(TokenKind::Int(value));
        }

        let value: i64 = num.parse().map_err(|_| {
            SparklingError::lexer(
                format!("integer literal too large: {}", num),
                Span::new(start_line, start_col, num.len() as u32),
            )
        })?;
        Ok(TokenKind::Int(value))
    }

    /// Scans hex digits after the `0x` prefix.
    fn scan_hex_number(&mut self, start_line: u32, start_col: u32) -> SparklingResult<TokenKind> {
        let mut digits = String::new();

        while !self.is_at_end() && self.peek().is_ascii_hexdigit() {
            digits.push(self.advance() as char);
        }

        if digits.is_empty() {
            return Err(SparklingError::lexer(
                "expected hex digits after '0x'",
                Span::new(start_line, start_col, 2),
            ));
        }

        let value = i64::from_str_radix(&digits, 16).map_err(|_| {
            SparklingError::lexer(
                format!("integer literal too large: 0x{}", digits),
                Span::new(start_line, start_col, digits.len() as u32 + 2),
            )
        })?;

        Ok(TokenKind::Int(value))
    }

    /// Scans a float starting with a bare `.` (the `.D` form); the dot
    /// has been consumed and the next byte is known to be a digit.
    fn scan_leading_dot_float(
        &mut self,
        start_line: u32,
        start_col: u32,
    ) -> SparklingResult<TokenKind> {
        let mut num = String::from("0.");

        while !self.is_at_end() && self.peek().is_ascii_digit() {
            num.push(self.advance() as char);
        }

        self.scan_exponent(&mut num);

        let value: f64 = num.parse().map_err(|_| {
            SparklingError::lexer(
                format!("invalid number literal: {}", num),
                Span::new(start_line, start_col, num.len() as u32),
            )
        })?;
        Ok(TokenKind::Float(value))
    }

    /// Consumes an `[eE][+-]?D+` exponent into `num`, if one follows.
    /// An `e` not followed by digits is left alone (it starts the next
    /// token, e.g. an identifier).
    fn scan_exponent(&mut self, num: &mut String) {
        if self.is_at_end() || (self.peek() != b'e' && self.peek() != b'E') {
            return;
        }

        let mut la = self.pos + 1;
        if la < self.source.len() && (self.source[la] == b'+' || self.source[la] == b'-') {
            la += 1;
        }
        if la >= self.source.len() || !self.source[la].is_ascii_digit() {
            return;
        }

        num.push(self.advance() as char); // 'e' or 'E'
        if self.peek() == b'+' || self.peek() == b'-' {
            num.push(self.advance() as char);
        }
        while !self.is_at_end() && self.peek().is_ascii_digit() {
            num.push(self.advance() as char);
        }
    }

    // -------------------------------------------------------------------------
    // IDENTIFIER SCANNING
    // -------------------------------------------------------------------------

    /// Scans an identifier or keyword token.
    fn scan_identifier(&mut self, start_pos: usize) -> SparklingResult<TokenKind> {
        while !self.is_at_end() && (self.peek().is_ascii_alphanumeric() || self.peek() == b'_') {
            self.advance();
        }

        let text = std::str::from_utf8(&self.source[start_pos..self.pos]).map_err(|_| {
            SparklingError::lexer(
                "invalid UTF-8 in identifier",
                Span::new(self.line, self.col, (self.pos - start_pos) as u32),
            )
        })?;

        match lookup_keyword(text) {
            Some(keyword) => Ok(keyword),
            None => Ok(TokenKind::Ident(text.to_string())),
        }
    }

    // -------------------------------------------------------------------------
    // WHITESPACE & COMMENT SKIPPING
    // -------------------------------------------------------------------------

    /// Skips whitespace and `/* ... */` block comments. Comments do not
    /// nest; an unterminated comment is a lexical error reported at the
    /// line the comment started on. Uses `memchr` to locate the `*/`
    /// terminator and to count the newlines a comment spans.
    fn skip_whitespace_and_comments(&mut self) -> SparklingResult<()> {
        loop {
            // Skip whitespace
            while !self.is_at_end() {
                match self.peek() {
                    b' ' | b'\t' | b'\r' => {
                        self.advance();
                    }
                    b'\n' => {
                        self.advance();
                        self.line += 1;
                        self.col = 1;
                    }
                    _ => break,
                }
            }

            // Skip block comments (/* ... */)
            if self.pos + 1 < self.source.len()
                && self.source[self.pos] == b'/'
                && self.source[self.pos + 1] == b'*'
            {
                let start_span = Span::new(self.line, self.col, 2);
                let remaining = &self.source[self.pos + 2..];

                match memchr::memmem::find(remaining, b"*/") {
                    Some(offset) => {
                        // opener + body + terminator
                        let skipped = &self.source[self.pos..self.pos + offset + 4];
                        match memchr::memrchr(b'\n', skipped) {
                            Some(last) => {
                                self.line += memchr::memchr_iter(b'\n', skipped).count() as u32;
                                self.col = (skipped.len() - last) as u32;
                            }
                            None => {
                                self.col += skipped.len() as u32;
                            }
                        }
                        self.pos += skipped.len();
                    }
                    None => {
                        return Err(SparklingError::lexer("unterminated comment", start_span));
                    }
                }
                continue;
            }

            break;
        }

        Ok(())
    }

    // -------------------------------------------------------------------------
    // LOW-LEVEL BYTE OPERATIONS
    // -------------------------------------------------------------------------

    /// Returns the current byte without advancing.
    #[inline(always)]
    fn peek(&self) -> u8 {
        self.source[self.pos]
    }

    /// Advances the position by one byte and returns the consumed byte.
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let byte = self.source[self.pos];
        self.pos += 1;
        self.col += 1;
        byte
    }

    /// Advances if the current byte matches `expected`, returning `true`.
    #[inline]
    fn match_byte(&mut self, expected: u8) -> bool {
        if !self.is_at_end() && self.source[self.pos] == expected {
            self.pos += 1;
            self.col += 1;
            true
        } else {
            false
        }
    }

    /// Returns `true` if the lexer has consumed all source bytes.
    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }
}
