//! Type reference parsing.
//!
//! `Type := SimpleType '*'* '?'?` where `SimpleType` is a possibly
//! module-qualified identifier (`seg(.seg)*::Name`). The nullable marker may
//! appear at most once and only trailing; the parser consumes malformed
//! suffix runs so later tokens do not cascade, and reports them here.

use l0c_lex::TokenKind;
use l0c_util::diagnostic::codes;
use l0c_util::DottedName;

use crate::ast::{QualName, TypeRef};
use crate::Parser;

impl<'a> Parser<'a> {
    /// Parse a type reference.
    pub fn parse_type_ref(&mut self) -> Option<TypeRef> {
        let name = self.parse_type_name()?;
        let mut span = name.span;

        let mut ptr_depth: u8 = 0;
        while let Some(star) = self.eat(TokenKind::Star) {
            span = span.to(star.span);
            ptr_depth = ptr_depth.saturating_add(1);
        }

        let mut nullable = false;
        if let Some(q) = self.eat(TokenKind::Question) {
            span = span.to(q.span);
            nullable = true;
        }

        // `?` is trailing-only and at-most-once; eat malformed suffix runs
        // so the caller sees a clean boundary.
        if self.check(TokenKind::Question) || (nullable && self.check(TokenKind::Star)) {
            let bad_start = self.cur_span();
            let mut bad_end = bad_start;
            while self.check(TokenKind::Question) || self.check(TokenKind::Star) {
                bad_end = self.bump().span;
            }
            self.error(
                codes::PAR_BAD_TYPE_REF,
                "`?` may appear at most once, after any pointer suffixes".to_string(),
                bad_start.to(bad_end),
            );
            span = span.to(bad_end);
        }

        Some(TypeRef {
            name,
            ptr_depth,
            nullable,
            span,
        })
    }

    /// Parse a qualified name in type position: `Name` or
    /// `seg(.seg)*::Name`, plus any extra `::`-segments (kept for the
    /// resolver to reject).
    pub(crate) fn parse_type_name(&mut self) -> Option<QualName> {
        let first = self.expect(TokenKind::Ident, "type reference")?;
        let mut span = first.span;

        if !self.check(TokenKind::Dot) && !self.check(TokenKind::ColonColon) {
            return Some(QualName::plain(first.lexeme, span));
        }

        let mut segments = vec![first.lexeme];
        while self.eat(TokenKind::Dot).is_some() {
            let seg = self.expect(TokenKind::Ident, "type reference")?;
            span = span.to(seg.span);
            segments.push(seg.lexeme);
        }

        self.expect(TokenKind::ColonColon, "qualified type reference")?;
        let name = self.expect(TokenKind::Ident, "qualified type reference")?;
        span = span.to(name.span);

        // Multi-`::` paths are consumed here and rejected semantically.
        let mut extra = Vec::new();
        while self.eat(TokenKind::ColonColon).is_some() {
            let seg = self.expect(TokenKind::Ident, "qualified type reference")?;
            span = span.to(seg.span);
            extra.push(seg.lexeme);
        }

        Some(QualName {
            module: DottedName::new(segments),
            name: name.lexeme,
            extra,
            span,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeIdGen;
    use l0c_lex::Lexer;
    use l0c_util::{FileId, Handler};

    fn parse_type(source: &str) -> (Option<TypeRef>, Handler) {
        let handler = Handler::new();
        let mut ids = NodeIdGen::new();
        let tokens = Lexer::new(source, &handler, FileId::DUMMY).tokenize();
        let mut parser = Parser::new(tokens, &handler, &mut ids, FileId::DUMMY);
        let ty = parser.parse_type_ref();
        (ty, handler)
    }

    #[test]
    fn test_simple_type() {
        let (ty, handler) = parse_type("int");
        assert!(!handler.has_errors());
        let ty = ty.unwrap();
        assert_eq!(ty.name.name, "int");
        assert_eq!(ty.ptr_depth, 0);
        assert!(!ty.nullable);
    }

    #[test]
    fn test_pointer_and_nullable() {
        let (ty, handler) = parse_type("Point**?");
        assert!(!handler.has_errors());
        let ty = ty.unwrap();
        assert_eq!(ty.ptr_depth, 2);
        assert!(ty.nullable);
    }

    #[test]
    fn test_qualified_type() {
        let (ty, handler) = parse_type("geo.shapes::Point*");
        assert!(!handler.has_errors());
        let ty = ty.unwrap();
        assert_eq!(ty.name.module.as_ref().unwrap().to_string(), "geo.shapes");
        assert_eq!(ty.name.name, "Point");
        assert!(ty.name.extra.is_empty());
        assert_eq!(ty.ptr_depth, 1);
    }

    #[test]
    fn test_multi_colon_path_consumed() {
        // Consumed by the parser without a syntax error; the resolver
        // rejects the extra segment.
        let (ty, handler) = parse_type("a::B::C");
        assert!(!handler.has_errors());
        let ty = ty.unwrap();
        assert_eq!(ty.name.name, "B");
        assert_eq!(ty.name.extra, vec!["C".to_string()]);
    }

    #[test]
    fn test_double_nullable_rejected() {
        let (ty, handler) = parse_type("int??");
        assert!(handler.has_errors());
        assert_eq!(handler.diagnostics()[0].code, codes::PAR_BAD_TYPE_REF);
        // Still yields a usable type.
        assert!(ty.unwrap().nullable);
    }

    #[test]
    fn test_pointer_after_nullable_rejected() {
        let (_, handler) = parse_type("int?*");
        assert!(handler.has_errors());
        assert_eq!(handler.diagnostics()[0].code, codes::PAR_BAD_TYPE_REF);
    }
}
