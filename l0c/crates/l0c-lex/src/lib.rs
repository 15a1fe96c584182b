//! l0c-lex - Lexical analyzer for L0 source text.
//!
//! Transforms UTF-8 source (a leading BOM is tolerated and discarded) into a
//! token sequence with 1-based line/column spans. Whitespace and `// ...`
//! line comments are skipped. String and byte literals are decoded here;
//! the decoded bytes on the token are the authoritative content.
//!
//! Lexical errors (stray characters, unterminated literals, bad escapes) are
//! reported through the shared [`Handler`](l0c_util::Handler) and the lexer
//! keeps scanning so one run surfaces as many problems as possible, up to a
//! per-file cap.

pub mod cursor;
pub mod lexer;
pub mod token;

pub use lexer::Lexer;
pub use token::{keyword_from_ident, Token, TokenKind};
