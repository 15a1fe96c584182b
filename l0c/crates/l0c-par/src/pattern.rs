//! Match pattern parsing.
//!
//! `Pat := '_' | Qual ( '(' (IDENT | '_') (',' (IDENT | '_'))* ')' )?`
//!
//! Only wildcard and variant patterns exist; the wildcard never binds.

use l0c_lex::TokenKind;
use l0c_util::diagnostic::codes;

use crate::ast::{Pattern, PatternVar, VariantPattern};
use crate::Parser;

impl<'a> Parser<'a> {
    /// Parse one match pattern.
    pub fn parse_pattern(&mut self) -> Option<Pattern> {
        if let Some(tok) = self.eat(TokenKind::Underscore) {
            return Some(Pattern::Wildcard(tok.span));
        }

        if !self.check(TokenKind::Ident) {
            self.error(
                codes::PAR_BAD_PATTERN,
                format!("expected a variant pattern or `_`, found {}", self.kind()),
                self.cur_span(),
            );
            return None;
        }

        let name = self.parse_type_name()?;
        let mut span = name.span;

        let mut binds = Vec::new();
        if self.eat(TokenKind::LParen).is_some() {
            if !self.check(TokenKind::RParen) {
                loop {
                    if let Some(tok) = self.eat(TokenKind::Underscore) {
                        binds.push(PatternVar {
                            name: None,
                            span: tok.span,
                        });
                    } else if let Some(tok) = self.eat(TokenKind::Ident) {
                        binds.push(PatternVar {
                            name: Some(tok.lexeme),
                            span: tok.span,
                        });
                    } else {
                        self.error(
                            codes::PAR_BAD_PATTERN,
                            format!(
                                "expected a binding name or `_` in pattern, found {}",
                                self.kind()
                            ),
                            self.cur_span(),
                        );
                        return None;
                    }
                    if self.eat(TokenKind::Comma).is_none() {
                        break;
                    }
                }
            }
            let close = self.expect(TokenKind::RParen, "variant pattern")?;
            span = span.to(close.span);
        }

        Some(Pattern::Variant(VariantPattern { name, binds, span }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeIdGen;
    use l0c_lex::Lexer;
    use l0c_util::{FileId, Handler};

    fn parse_pat(source: &str) -> (Option<Pattern>, Handler) {
        let handler = Handler::new();
        let mut ids = NodeIdGen::new();
        let tokens = Lexer::new(source, &handler, FileId::DUMMY).tokenize();
        let mut parser = Parser::new(tokens, &handler, &mut ids, FileId::DUMMY);
        let pat = parser.parse_pattern();
        (pat, handler)
    }

    #[test]
    fn test_wildcard_pattern() {
        let (pat, handler) = parse_pat("_");
        assert!(!handler.has_errors());
        assert!(matches!(pat.unwrap(), Pattern::Wildcard(_)));
    }

    #[test]
    fn test_bare_variant_pattern() {
        let (pat, handler) = parse_pat("Red");
        assert!(!handler.has_errors());
        match pat.unwrap() {
            Pattern::Variant(v) => {
                assert_eq!(v.name.name, "Red");
                assert!(v.binds.is_empty());
            }
            other => panic!("expected variant, got {:?}", other),
        }
    }

    #[test]
    fn test_variant_with_bindings() {
        let (pat, handler) = parse_pat("Rect(w, _, h)");
        assert!(!handler.has_errors());
        match pat.unwrap() {
            Pattern::Variant(v) => {
                assert_eq!(v.binds.len(), 3);
                assert_eq!(v.binds[0].name.as_deref(), Some("w"));
                assert!(v.binds[1].name.is_none());
                assert_eq!(v.binds[2].name.as_deref(), Some("h"));
            }
            other => panic!("expected variant, got {:?}", other),
        }
    }

    #[test]
    fn test_qualified_variant_pattern() {
        let (pat, handler) = parse_pat("colors::Red()");
        assert!(!handler.has_errors());
        match pat.unwrap() {
            Pattern::Variant(v) => {
                assert_eq!(v.name.module.as_ref().unwrap().to_string(), "colors");
                assert_eq!(v.name.name, "Red");
            }
            other => panic!("expected variant, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_pattern() {
        let (pat, handler) = parse_pat("42");
        assert!(pat.is_none());
        assert_eq!(handler.diagnostics()[0].code, codes::PAR_BAD_PATTERN);
    }
}
