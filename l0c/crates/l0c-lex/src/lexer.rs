//! Main lexer implementation for L0 source code.
//!
//! The lexer walks the source with a [`Cursor`] and produces [`Token`]s with
//! 1-based line/column spans. String and byte literals are decoded in place;
//! the decoded bytes carried on the token are the authoritative content.

use l0c_util::diagnostic::codes;
use l0c_util::{Diagnostic, FileId, Handler, Span};

use crate::cursor::Cursor;
use crate::token::{keyword_from_ident, Token, TokenKind};

/// Cap on reported lexical errors per file. Scanning continues past the cap
/// so token positions stay accurate, but no further errors are recorded.
const MAX_LEX_ERRORS: usize = 64;

/// The L0 lexer.
///
/// # Example
///
/// ```
/// use l0c_lex::{Lexer, TokenKind};
/// use l0c_util::{FileId, Handler};
///
/// let handler = Handler::new();
/// let tokens = Lexer::new("let x = 42;", &handler, FileId::DUMMY).tokenize();
/// let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
/// assert_eq!(
///     kinds,
///     vec![
///         TokenKind::Let,
///         TokenKind::Ident,
///         TokenKind::Assign,
///         TokenKind::Int,
///         TokenKind::Semi,
///         TokenKind::Eof,
///     ]
/// );
/// ```
pub struct Lexer<'a> {
    /// Cursor over the (BOM-stripped) source.
    cursor: Cursor<'a>,

    /// Diagnostic sink.
    handler: &'a Handler,

    /// File the spans refer to.
    file_id: FileId,

    /// Errors reported so far, for the per-file cap.
    errors_reported: usize,
}

impl<'a> Lexer<'a> {
    /// Create a lexer. A UTF-8 BOM at the start of `source` is discarded.
    pub fn new(source: &'a str, handler: &'a Handler, file_id: FileId) -> Self {
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        Self {
            cursor: Cursor::new(source),
            handler,
            file_id,
            errors_reported: 0,
        }
    }

    /// Lex the whole input. The returned vector always ends with an
    /// [`TokenKind::Eof`] token.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    /// Produce the next token.
    pub fn next_token(&mut self) -> Token {
        loop {
            self.skip_whitespace_and_comments();

            let start = self.cursor.position();
            let line = self.cursor.line();
            let column = self.cursor.column();

            if self.cursor.is_eof() {
                return Token::new(
                    TokenKind::Eof,
                    "",
                    Span::with_file(start, start, self.file_id, line, column),
                );
            }

            let c = self.cursor.current();

            if c.is_ascii_alphabetic() || c == '_' {
                return self.lex_word(start, line, column);
            }
            if c.is_ascii_digit() {
                return self.lex_number(start, line, column);
            }
            if c == '"' {
                return self.lex_string(start, line, column);
            }
            if c == '\'' {
                return self.lex_byte(start, line, column);
            }

            if let Some(kind) = self.lex_operator(c) {
                return self.make(kind, start, line, column);
            }

            // Stray character: report once, skip it, keep scanning.
            self.cursor.advance();
            self.report(
                codes::LEX_UNEXPECTED_CHAR,
                format!("unexpected character `{}`", c.escape_default()),
                Span::with_file(start, self.cursor.position(), self.file_id, line, column),
            );
        }
    }

    // -----------------------------------------------------------------------
    // Words, numbers
    // -----------------------------------------------------------------------

    fn lex_word(&mut self, start: usize, line: u32, column: u32) -> Token {
        while is_ident_continue(self.cursor.current()) {
            self.cursor.advance();
        }
        let lexeme = self.cursor.slice(start, self.cursor.position());
        let kind = if lexeme == "_" {
            TokenKind::Underscore
        } else {
            keyword_from_ident(lexeme).unwrap_or(TokenKind::Ident)
        };
        self.make(kind, start, line, column)
    }

    fn lex_number(&mut self, start: usize, line: u32, column: u32) -> Token {
        while self.cursor.current().is_ascii_digit() {
            self.cursor.advance();
        }

        // `123abc` is one malformed literal, not a number then a word.
        if is_ident_continue(self.cursor.current()) {
            while is_ident_continue(self.cursor.current()) {
                self.cursor.advance();
            }
            let span =
                Span::with_file(start, self.cursor.position(), self.file_id, line, column);
            self.report(
                codes::LEX_BAD_INT_LITERAL,
                format!(
                    "malformed integer literal `{}`",
                    self.cursor.slice(start, self.cursor.position())
                ),
                span,
            );
        }

        self.make(TokenKind::Int, start, line, column)
    }

    // -----------------------------------------------------------------------
    // String and byte literals
    // -----------------------------------------------------------------------

    fn lex_string(&mut self, start: usize, line: u32, column: u32) -> Token {
        let open_span = Span::with_file(start, start + 1, self.file_id, line, column);
        self.cursor.advance(); // opening quote

        let mut bytes = Vec::new();
        let mut terminated = false;

        loop {
            let c = self.cursor.current();
            if self.cursor.is_eof() || c == '\n' {
                break;
            }
            if c == '"' {
                self.cursor.advance();
                terminated = true;
                break;
            }
            if c == '\\' {
                self.decode_escape(&mut bytes);
            } else {
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                self.cursor.advance();
            }
        }

        if !terminated {
            self.report(
                codes::LEX_UNTERMINATED_STRING,
                "unterminated string literal".to_string(),
                open_span,
            );
        }

        let lexeme = self.cursor.slice(start, self.cursor.position()).to_string();
        Token::with_bytes(
            TokenKind::Str,
            lexeme,
            bytes,
            Span::with_file(start, self.cursor.position(), self.file_id, line, column),
        )
    }

    fn lex_byte(&mut self, start: usize, line: u32, column: u32) -> Token {
        let open_span = Span::with_file(start, start + 1, self.file_id, line, column);
        self.cursor.advance(); // opening quote

        let mut bytes = Vec::new();
        let c = self.cursor.current();
        if self.cursor.is_eof() || c == '\n' {
            self.report(
                codes::LEX_BAD_BYTE_LITERAL,
                "unterminated byte literal".to_string(),
                open_span,
            );
            return self.make_byte_token(start, line, column, bytes);
        }

        if c == '\\' {
            self.decode_escape(&mut bytes);
        } else {
            let code = c as u32;
            if code > 0xFF {
                self.report(
                    codes::LEX_BAD_BYTE_LITERAL,
                    format!("character `{}` does not fit in a byte", c),
                    open_span,
                );
            } else {
                bytes.push(code as u8);
            }
            self.cursor.advance();
        }

        if !self.cursor.eat('\'') {
            self.report(
                codes::LEX_BAD_BYTE_LITERAL,
                "byte literal must contain exactly one byte".to_string(),
                open_span,
            );
            // Recover: skip to the closing quote on this line if there is one.
            while !self.cursor.is_eof()
                && self.cursor.current() != '\''
                && self.cursor.current() != '\n'
            {
                self.cursor.advance();
            }
            self.cursor.eat('\'');
        }

        if bytes.len() != 1 {
            bytes = vec![0];
        }
        self.make_byte_token(start, line, column, bytes)
    }

    fn make_byte_token(&mut self, start: usize, line: u32, column: u32, bytes: Vec<u8>) -> Token {
        let lexeme = self.cursor.slice(start, self.cursor.position()).to_string();
        Token::with_bytes(
            TokenKind::Byte,
            lexeme,
            bytes,
            Span::with_file(start, self.cursor.position(), self.file_id, line, column),
        )
    }

    /// Decode one escape sequence starting at `\` and append its bytes.
    ///
    /// Supported: `\n \t \r \" \' \\`, octal `\OOO` (1-3 digits), `\xHH+`,
    /// `\uHHHH`, `\UHHHHHHHH`.
    fn decode_escape(&mut self, out: &mut Vec<u8>) {
        let start = self.cursor.position();
        let line = self.cursor.line();
        let column = self.cursor.column();
        self.cursor.advance(); // backslash

        let c = self.cursor.current();
        match c {
            'n' => {
                out.push(b'\n');
                self.cursor.advance();
            }
            't' => {
                out.push(b'\t');
                self.cursor.advance();
            }
            'r' => {
                out.push(b'\r');
                self.cursor.advance();
            }
            '"' => {
                out.push(b'"');
                self.cursor.advance();
            }
            '\'' => {
                out.push(b'\'');
                self.cursor.advance();
            }
            '\\' => {
                out.push(b'\\');
                self.cursor.advance();
            }
            '0'..='7' => {
                let mut value: u32 = 0;
                let mut digits = 0;
                while digits < 3 {
                    let d = self.cursor.current();
                    if !('0'..='7').contains(&d) {
                        break;
                    }
                    value = value * 8 + (d as u32 - '0' as u32);
                    digits += 1;
                    self.cursor.advance();
                }
                if value > 0xFF {
                    self.escape_error(start, line, column, "octal escape exceeds 255");
                } else {
                    out.push(value as u8);
                }
            }
            'x' => {
                self.cursor.advance();
                let mut value: u32 = 0;
                let mut digits = 0;
                while let Some(d) = self.cursor.current().to_digit(16) {
                    value = value.saturating_mul(16).saturating_add(d);
                    digits += 1;
                    self.cursor.advance();
                }
                if digits == 0 {
                    self.escape_error(start, line, column, "`\\x` escape needs hex digits");
                } else if value > 0xFF {
                    self.escape_error(start, line, column, "hex escape exceeds 255");
                } else {
                    out.push(value as u8);
                }
            }
            'u' => {
                self.cursor.advance();
                self.decode_unicode_escape(start, line, column, 4, out);
            }
            'U' => {
                self.cursor.advance();
                self.decode_unicode_escape(start, line, column, 8, out);
            }
            _ => {
                self.escape_error(
                    start,
                    line,
                    column,
                    &format!("invalid escape sequence `\\{}`", c.escape_default()),
                );
                if !self.cursor.is_eof() && c != '\n' {
                    self.cursor.advance();
                }
            }
        }
    }

    fn decode_unicode_escape(
        &mut self,
        start: usize,
        line: u32,
        column: u32,
        digit_count: u32,
        out: &mut Vec<u8>,
    ) {
        let mut value: u32 = 0;
        for _ in 0..digit_count {
            match self.cursor.current().to_digit(16) {
                Some(d) => {
                    value = value.saturating_mul(16).saturating_add(d);
                    self.cursor.advance();
                }
                None => {
                    self.escape_error(
                        start,
                        line,
                        column,
                        &format!("unicode escape needs {} hex digits", digit_count),
                    );
                    return;
                }
            }
        }
        match char::from_u32(value) {
            Some(ch) => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
            None => {
                self.escape_error(start, line, column, "invalid unicode codepoint in escape");
            }
        }
    }

    fn escape_error(&mut self, start: usize, line: u32, column: u32, message: &str) {
        let span = Span::with_file(start, self.cursor.position(), self.file_id, line, column);
        self.report(codes::LEX_INVALID_ESCAPE, message.to_string(), span);
    }

    // -----------------------------------------------------------------------
    // Operators and punctuation
    // -----------------------------------------------------------------------

    /// Try to lex an operator or punctuation token starting at `c`. Consumes
    /// the characters of the token on success.
    fn lex_operator(&mut self, c: char) -> Option<TokenKind> {
        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semi,
            '.' => TokenKind::Dot,
            '?' => TokenKind::Question,
            '+' => TokenKind::Plus,
            '%' => TokenKind::Percent,
            '^' => TokenKind::Caret,
            '~' => TokenKind::Tilde,
            '/' => TokenKind::Slash,
            '*' => TokenKind::Star,
            ':' => {
                self.cursor.advance();
                return Some(if self.cursor.eat(':') {
                    TokenKind::ColonColon
                } else {
                    TokenKind::Colon
                });
            }
            '-' => {
                self.cursor.advance();
                return Some(if self.cursor.eat('>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Minus
                });
            }
            '=' => {
                self.cursor.advance();
                return Some(if self.cursor.eat('=') {
                    TokenKind::EqEq
                } else if self.cursor.eat('>') {
                    TokenKind::FatArrow
                } else {
                    TokenKind::Assign
                });
            }
            '!' => {
                self.cursor.advance();
                return Some(if self.cursor.eat('=') {
                    TokenKind::BangEq
                } else {
                    TokenKind::Bang
                });
            }
            '<' => {
                self.cursor.advance();
                return Some(if self.cursor.eat('=') {
                    TokenKind::Le
                } else if self.cursor.eat('<') {
                    TokenKind::Shl
                } else {
                    TokenKind::Lt
                });
            }
            '>' => {
                self.cursor.advance();
                return Some(if self.cursor.eat('=') {
                    TokenKind::Ge
                } else if self.cursor.eat('>') {
                    TokenKind::Shr
                } else {
                    TokenKind::Gt
                });
            }
            '&' => {
                self.cursor.advance();
                return Some(if self.cursor.eat('&') {
                    TokenKind::AmpAmp
                } else {
                    TokenKind::Amp
                });
            }
            '|' => {
                self.cursor.advance();
                return Some(if self.cursor.eat('|') {
                    TokenKind::PipePipe
                } else {
                    TokenKind::Pipe
                });
            }
            _ => return None,
        };
        self.cursor.advance();
        Some(kind)
    }

    // -----------------------------------------------------------------------
    // Whitespace, comments, helpers
    // -----------------------------------------------------------------------

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            let c = self.cursor.current();
            if c.is_whitespace() && c != '\0' {
                self.cursor.advance();
            } else if c == '/' && self.cursor.peek() == '/' {
                while !self.cursor.is_eof() && self.cursor.current() != '\n' {
                    self.cursor.advance();
                }
            } else {
                break;
            }
        }
    }

    fn make(&mut self, kind: TokenKind, start: usize, line: u32, column: u32) -> Token {
        let lexeme = self.cursor.slice(start, self.cursor.position());
        Token::new(
            kind,
            lexeme,
            Span::with_file(start, self.cursor.position(), self.file_id, line, column),
        )
    }

    fn report(&mut self, code: l0c_util::DiagnosticCode, message: String, span: Span) {
        if self.errors_reported < MAX_LEX_ERRORS {
            self.handler.emit(Diagnostic::error(code, message).with_span(span));
        }
        self.errors_reported += 1;
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token.is_eof() {
            None
        } else {
            Some(token)
        }
    }
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_tokens(source: &str) -> (Vec<Token>, Handler) {
        let handler = Handler::new();
        let tokens = Lexer::new(source, &handler, FileId::DUMMY).tokenize();
        (tokens, handler)
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex_tokens(source).0.iter().map(|t| t.kind).collect()
    }

    fn first_token(source: &str) -> Token {
        lex_tokens(source).0.into_iter().next().unwrap()
    }

    #[test]
    fn test_simple_identifier() {
        let t = first_token("foo");
        assert_eq!(t.kind, TokenKind::Ident);
        assert_eq!(t.lexeme, "foo");
    }

    #[test]
    fn test_identifier_with_underscore() {
        let t = first_token("_private1");
        assert_eq!(t.kind, TokenKind::Ident);
        assert_eq!(t.lexeme, "_private1");
    }

    #[test]
    fn test_wildcard_token() {
        assert_eq!(
            kinds("_ _x"),
            vec![TokenKind::Underscore, TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("module import func extern struct enum type let"),
            vec![
                TokenKind::Module,
                TokenKind::Import,
                TokenKind::Func,
                TokenKind::Extern,
                TokenKind::Struct,
                TokenKind::Enum,
                TokenKind::Type,
                TokenKind::Let,
                TokenKind::Eof,
            ]
        );
        assert_eq!(
            kinds("if else while for with cleanup match case"),
            vec![
                TokenKind::If,
                TokenKind::Else,
                TokenKind::While,
                TokenKind::For,
                TokenKind::With,
                TokenKind::Cleanup,
                TokenKind::Match,
                TokenKind::Case,
                TokenKind::Eof,
            ]
        );
        assert_eq!(
            kinds("drop break continue return new as const sizeof"),
            vec![
                TokenKind::Drop,
                TokenKind::Break,
                TokenKind::Continue,
                TokenKind::Return,
                TokenKind::New,
                TokenKind::As,
                TokenKind::Const,
                TokenKind::Sizeof,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_identifier_not_keyword() {
        assert_eq!(kinds("funcs"), vec![TokenKind::Ident, TokenKind::Eof]);
        assert_eq!(kinds("lets"), vec![TokenKind::Ident, TokenKind::Eof]);
    }

    #[test]
    fn test_literal_words() {
        assert_eq!(
            kinds("true false null"),
            vec![TokenKind::True, TokenKind::False, TokenKind::Null, TokenKind::Eof]
        );
    }

    #[test]
    fn test_integers() {
        let t = first_token("12345");
        assert_eq!(t.kind, TokenKind::Int);
        assert_eq!(t.lexeme, "12345");
    }

    #[test]
    fn test_malformed_integer_is_one_error() {
        let (tokens, handler) = lex_tokens("123abc;");
        assert_eq!(tokens[0].kind, TokenKind::Int);
        assert_eq!(tokens[1].kind, TokenKind::Semi);
        assert_eq!(handler.error_count(), 1);
        assert_eq!(handler.diagnostics()[0].code, codes::LEX_BAD_INT_LITERAL);
    }

    #[test]
    fn test_two_char_operators() {
        assert_eq!(
            kinds("== != <= >= << >> && || -> => ::"),
            vec![
                TokenKind::EqEq,
                TokenKind::BangEq,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::Shl,
                TokenKind::Shr,
                TokenKind::AmpAmp,
                TokenKind::PipePipe,
                TokenKind::Arrow,
                TokenKind::FatArrow,
                TokenKind::ColonColon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_single_char_operators() {
        assert_eq!(
            kinds("+ - * / % = ! < > & | ^ ~ ?"),
            vec![
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Percent,
                TokenKind::Assign,
                TokenKind::Bang,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::Amp,
                TokenKind::Pipe,
                TokenKind::Caret,
                TokenKind::Tilde,
                TokenKind::Question,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_punctuation() {
        assert_eq!(
            kinds("( ) { } [ ] , ; : ."),
            vec![
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::Comma,
                TokenKind::Semi,
                TokenKind::Colon,
                TokenKind::Dot,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_positions_match_visual_layout() {
        let (tokens, _) = lex_tokens("let x =\n  42;");
        assert_eq!((tokens[0].span.line, tokens[0].span.column), (1, 1)); // let
        assert_eq!((tokens[1].span.line, tokens[1].span.column), (1, 5)); // x
        assert_eq!((tokens[2].span.line, tokens[2].span.column), (1, 7)); // =
        assert_eq!((tokens[3].span.line, tokens[3].span.column), (2, 3)); // 42
        assert_eq!((tokens[4].span.line, tokens[4].span.column), (2, 5)); // ;
    }

    #[test]
    fn test_line_comment_skipped() {
        assert_eq!(
            kinds("a // the rest is gone == !=\nb"),
            vec![TokenKind::Ident, TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn test_bom_discarded() {
        let (tokens, handler) = lex_tokens("\u{feff}module");
        assert_eq!(tokens[0].kind, TokenKind::Module);
        assert_eq!((tokens[0].span.line, tokens[0].span.column), (1, 1));
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_string_literal_decoded() {
        let t = first_token(r#""hello""#);
        assert_eq!(t.kind, TokenKind::Str);
        assert_eq!(t.bytes, b"hello");
        assert_eq!(t.lexeme, r#""hello""#);
    }

    #[test]
    fn test_string_escapes() {
        let t = first_token(r#""a\n\t\r\"\'\\b""#);
        assert_eq!(t.bytes, b"a\n\t\r\"'\\b");
    }

    #[test]
    fn test_octal_and_hex_escapes() {
        let t = first_token(r#""\0\101\x41\xff""#);
        assert_eq!(t.bytes, &[0x00, 0x41, 0x41, 0xff]);
    }

    #[test]
    fn test_unicode_escapes() {
        let t = first_token(r#""é\U0001F600""#);
        let mut expected = Vec::new();
        expected.extend_from_slice("é".as_bytes());
        expected.extend_from_slice("😀".as_bytes());
        assert_eq!(t.bytes, expected);
    }

    #[test]
    fn test_invalid_escape_reported() {
        let (_, handler) = lex_tokens(r#""\q""#);
        assert_eq!(handler.error_count(), 1);
        assert_eq!(handler.diagnostics()[0].code, codes::LEX_INVALID_ESCAPE);
    }

    #[test]
    fn test_unterminated_string_single_error_at_open_quote() {
        let (tokens, handler) = lex_tokens("let s = \"abc\nlet t = 1;");
        // Exactly one LEX error, located at the opening quote.
        let diags = handler.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, codes::LEX_UNTERMINATED_STRING);
        let span = diags[0].span.unwrap();
        assert_eq!((span.line, span.column), (1, 9));
        // Lexing continues on the next line.
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Semi));
    }

    #[test]
    fn test_byte_literals() {
        let t = first_token("'a'");
        assert_eq!(t.kind, TokenKind::Byte);
        assert_eq!(t.bytes, vec![b'a']);

        let t = first_token(r"'\n'");
        assert_eq!(t.bytes, vec![b'\n']);

        let t = first_token(r"'\x7f'");
        assert_eq!(t.bytes, vec![0x7f]);
    }

    #[test]
    fn test_bad_byte_literal() {
        let (_, handler) = lex_tokens("'ab'");
        assert_eq!(handler.error_count(), 1);
        assert_eq!(handler.diagnostics()[0].code, codes::LEX_BAD_BYTE_LITERAL);
    }

    #[test]
    fn test_stray_character() {
        let (tokens, handler) = lex_tokens("a @ b");
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![TokenKind::Ident, TokenKind::Ident, TokenKind::Eof]
        );
        assert_eq!(handler.error_count(), 1);
        assert_eq!(handler.diagnostics()[0].code, codes::LEX_UNEXPECTED_CHAR);
    }

    #[test]
    fn test_error_cap() {
        let source: String = "@".repeat(MAX_LEX_ERRORS + 50);
        let (_, handler) = lex_tokens(&source);
        assert_eq!(handler.error_count(), MAX_LEX_ERRORS);
    }

    #[test]
    fn test_iterator_stops_before_eof() {
        let handler = Handler::new();
        let lexer = Lexer::new("a b c", &handler, FileId::DUMMY);
        assert_eq!(lexer.count(), 3);
    }

    #[test]
    fn test_empty_input() {
        let (tokens, handler) = lex_tokens("");
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].is_eof());
        assert!(!handler.has_errors());
    }
}
