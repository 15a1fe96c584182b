//! Statement parsing.
//!
//! Covers blocks, `let`, assignment (statement-only), expression statements,
//! `if`/`else`, `while`, `for`, `with`, `match`, `case`, `drop`, `break`,
//! `continue`, and `return`. A failed statement reports a diagnostic and the
//! block loop resynchronizes at the next statement boundary.

use l0c_lex::TokenKind;
use l0c_util::diagnostic::codes;

use crate::ast::{
    AssignStmt, Block, CaseArm, CaseStmt, DropStmt, ElseBranch, Expr, ExprKind, ExprStmt, ForStmt,
    IfStmt, LetStmt, MatchArm, MatchStmt, ReturnStmt, Stmt, UnOp, WhileStmt, WithItem, WithStmt,
};
use crate::Parser;

impl<'a> Parser<'a> {
    /// Parse a `{ ... }` block.
    pub fn parse_block(&mut self) -> Option<Block> {
        let open = self.expect(TokenKind::LBrace, "block")?;
        let id = self.next_id();

        let mut stmts = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.at_eof() {
            match self.parse_stmt() {
                Some(stmt) => stmts.push(stmt),
                None => self.synchronize_stmt(),
            }
        }
        let close = self.expect(TokenKind::RBrace, "block")?;

        Some(Block {
            id,
            stmts,
            span: open.span.to(close.span),
        })
    }

    /// Parse one statement.
    pub fn parse_stmt(&mut self) -> Option<Stmt> {
        match self.kind() {
            TokenKind::LBrace => self.parse_block().map(Stmt::Block),
            TokenKind::Let => self.parse_let_stmt().map(Stmt::Let),
            TokenKind::If => self.parse_if_stmt().map(Stmt::If),
            TokenKind::While => self.parse_while_stmt().map(Stmt::While),
            TokenKind::For => self.parse_for_stmt().map(Stmt::For),
            TokenKind::With => self.parse_with_stmt().map(Stmt::With),
            TokenKind::Match => self.parse_match_stmt().map(Stmt::Match),
            TokenKind::Case => self.parse_case_stmt().map(Stmt::Case),
            TokenKind::Drop => {
                let start = self.cur_span();
                self.bump();
                let expr = self.parse_expr()?;
                let semi = self.expect(TokenKind::Semi, "drop statement")?;
                Some(Stmt::Drop(DropStmt {
                    expr,
                    span: start.to(semi.span),
                }))
            }
            TokenKind::Break => {
                let start = self.cur_span();
                self.bump();
                let semi = self.expect(TokenKind::Semi, "break statement")?;
                Some(Stmt::Break(start.to(semi.span)))
            }
            TokenKind::Continue => {
                let start = self.cur_span();
                self.bump();
                let semi = self.expect(TokenKind::Semi, "continue statement")?;
                Some(Stmt::Continue(start.to(semi.span)))
            }
            TokenKind::Return => {
                let start = self.cur_span();
                self.bump();
                let value = if self.check(TokenKind::Semi) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                let semi = self.expect(TokenKind::Semi, "return statement")?;
                Some(Stmt::Return(ReturnStmt {
                    value,
                    span: start.to(semi.span),
                }))
            }
            _ => {
                // Assignment or expression statement.
                let stmt = self.parse_assign_or_expr_stmt()?;
                self.expect(TokenKind::Semi, "statement")?;
                Some(stmt)
            }
        }
    }

    fn parse_let_stmt(&mut self) -> Option<LetStmt> {
        let start = self.cur_span();
        self.bump(); // let
        let (mut stmt, _) = self.parse_let_tail(start)?;
        let semi = self.expect(TokenKind::Semi, "let statement")?;
        stmt.span = stmt.span.to(semi.span);
        Some(stmt)
    }

    /// Shared tail of `let` forms: `name [: Type] = init`. The caller has
    /// consumed the `let` keyword. Returns the statement and its end span.
    fn parse_let_tail(&mut self, start: l0c_util::Span) -> Option<(LetStmt, l0c_util::Span)> {
        let name_tok = self.expect(TokenKind::Ident, "binding name")?;
        let ty = if self.eat(TokenKind::Colon).is_some() {
            Some(self.parse_type_ref()?)
        } else {
            None
        };
        self.expect(TokenKind::Assign, "let binding")?;
        let init = self.parse_expr()?;
        let end = init.span;
        Some((
            LetStmt {
                id: self.next_id(),
                name: name_tok.lexeme,
                name_span: name_tok.span,
                ty,
                init,
                span: start.to(end),
            },
            end,
        ))
    }

    /// Parse `target = value` or a bare expression, without the trailing
    /// semicolon. Used for plain statements, `for` headers, and inline
    /// `with` cleanups.
    fn parse_assign_or_expr_stmt(&mut self) -> Option<Stmt> {
        let expr = self.parse_expr()?;
        if self.eat(TokenKind::Assign).is_some() {
            let value = self.parse_expr()?;
            let span = expr.span.to(value.span);
            Some(Stmt::Assign(AssignStmt {
                target: expr,
                value,
                span,
            }))
        } else {
            let span = expr.span;
            Some(Stmt::Expr(ExprStmt { expr, span }))
        }
    }

    fn parse_if_stmt(&mut self) -> Option<IfStmt> {
        let start = self.cur_span();
        self.bump(); // if
        self.expect(TokenKind::LParen, "if condition")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen, "if condition")?;
        let then_block = self.parse_block()?;
        let mut end = then_block.span;

        let else_branch = if self.eat(TokenKind::Else).is_some() {
            if self.check(TokenKind::If) {
                let nested = self.parse_if_stmt()?;
                end = nested.span;
                Some(ElseBranch::If(Box::new(nested)))
            } else {
                let block = self.parse_block()?;
                end = block.span;
                Some(ElseBranch::Block(block))
            }
        } else {
            None
        };

        Some(IfStmt {
            cond,
            then_block,
            else_branch,
            span: start.to(end),
        })
    }

    fn parse_while_stmt(&mut self) -> Option<WhileStmt> {
        let start = self.cur_span();
        self.bump(); // while
        self.expect(TokenKind::LParen, "while condition")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen, "while condition")?;
        let body = self.parse_block()?;
        let span = start.to(body.span);
        Some(WhileStmt { cond, body, span })
    }

    fn parse_for_stmt(&mut self) -> Option<ForStmt> {
        let start = self.cur_span();
        self.bump(); // for
        self.expect(TokenKind::LParen, "for header")?;
        let id = self.next_id();

        let init = if self.check(TokenKind::Semi) {
            None
        } else if self.check(TokenKind::Let) {
            let let_start = self.cur_span();
            self.bump();
            let (stmt, _) = self.parse_let_tail(let_start)?;
            Some(Box::new(Stmt::Let(stmt)))
        } else {
            Some(Box::new(self.parse_assign_or_expr_stmt()?))
        };
        self.expect(TokenKind::Semi, "for header")?;

        let cond = if self.check(TokenKind::Semi) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenKind::Semi, "for header")?;

        let step = if self.check(TokenKind::RParen) {
            None
        } else {
            Some(Box::new(self.parse_assign_or_expr_stmt()?))
        };
        self.expect(TokenKind::RParen, "for header")?;

        let body = self.parse_block()?;
        let span = start.to(body.span);

        Some(ForStmt {
            id,
            init,
            cond,
            step,
            body,
            span,
        })
    }

    fn parse_with_stmt(&mut self) -> Option<WithStmt> {
        let start = self.cur_span();
        self.bump(); // with
        self.expect(TokenKind::LParen, "with header")?;
        let id = self.next_id();

        let mut items = Vec::new();
        loop {
            let item_start = self.cur_span();
            self.expect(TokenKind::Let, "with header item")?;
            let name_tok = self.expect(TokenKind::Ident, "with header item")?;
            let ty = if self.eat(TokenKind::Colon).is_some() {
                Some(self.parse_type_ref()?)
            } else {
                None
            };
            self.expect(TokenKind::Assign, "with header item")?;
            let init = self.parse_expr()?;
            let mut end = init.span;

            let cleanup = if self.eat(TokenKind::FatArrow).is_some() {
                let stmt = self.parse_inline_cleanup()?;
                end = stmt.span();
                Some(Box::new(stmt))
            } else {
                None
            };

            items.push(WithItem {
                id: self.next_id(),
                name: name_tok.lexeme,
                name_span: name_tok.span,
                ty,
                init,
                cleanup,
                span: item_start.to(end),
            });

            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expect(TokenKind::RParen, "with header")?;

        let body = self.parse_block()?;
        let mut end = body.span;

        let cleanup = if self.eat(TokenKind::Cleanup).is_some() {
            let block = self.parse_block()?;
            end = block.span;
            Some(block)
        } else {
            None
        };

        let span = start.to(end);

        // Form validation: every item inline, or none and a cleanup block.
        let inline = items.iter().filter(|i| i.cleanup.is_some()).count();
        if inline > 0 && inline < items.len() {
            self.error(
                codes::PAR_MIXED_WITH_CLEANUP,
                "either every `with` item has an inline `=>` cleanup or none does".to_string(),
                span,
            );
        } else if inline > 0 && cleanup.is_some() {
            self.error(
                codes::PAR_MIXED_WITH_CLEANUP,
                "inline `=>` cleanups cannot be combined with a `cleanup` block".to_string(),
                span,
            );
        } else if inline == 0 && cleanup.is_none() {
            self.error(
                codes::PAR_MIXED_WITH_CLEANUP,
                "`with` without inline cleanups requires a trailing `cleanup { ... }` block"
                    .to_string(),
                span,
            );
        }

        Some(WithStmt {
            id,
            items,
            body,
            cleanup,
            span,
        })
    }

    /// Inline cleanup after `=>`: a block, a `drop`, or a call/assignment,
    /// without a trailing semicolon.
    fn parse_inline_cleanup(&mut self) -> Option<Stmt> {
        match self.kind() {
            TokenKind::LBrace => self.parse_block().map(Stmt::Block),
            TokenKind::Drop => {
                let start = self.cur_span();
                self.bump();
                let expr = self.parse_expr()?;
                let span = start.to(expr.span);
                Some(Stmt::Drop(DropStmt { expr, span }))
            }
            _ => self.parse_assign_or_expr_stmt(),
        }
    }

    fn parse_match_stmt(&mut self) -> Option<MatchStmt> {
        let match_span = self.cur_span();
        self.bump(); // match
        self.expect(TokenKind::LParen, "match scrutinee")?;
        let scrutinee = self.parse_expr()?;
        self.expect(TokenKind::RParen, "match scrutinee")?;
        self.expect(TokenKind::LBrace, "match body")?;

        let mut arms = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.at_eof() {
            let arm_start = self.cur_span();
            let id = self.next_id();
            let pattern = self.parse_pattern()?;
            self.expect(TokenKind::FatArrow, "match arm")?;
            let body = self.parse_block()?;
            let span = arm_start.to(body.span);
            arms.push(MatchArm {
                id,
                pattern,
                body,
                span,
            });
        }
        let close = self.expect(TokenKind::RBrace, "match body")?;

        Some(MatchStmt {
            scrutinee,
            arms,
            match_span,
            span: match_span.to(close.span),
        })
    }

    fn parse_case_stmt(&mut self) -> Option<CaseStmt> {
        let case_span = self.cur_span();
        self.bump(); // case
        self.expect(TokenKind::LParen, "case scrutinee")?;
        let scrutinee = self.parse_expr()?;
        self.expect(TokenKind::RParen, "case scrutinee")?;
        self.expect(TokenKind::LBrace, "case body")?;

        let mut arms = Vec::new();
        let mut default: Option<Block> = None;
        while !self.check(TokenKind::RBrace) && !self.at_eof() {
            if self.check(TokenKind::Else) {
                let else_span = self.cur_span();
                self.bump();
                self.expect(TokenKind::FatArrow, "case else arm")?;
                let block = self.parse_block()?;
                if default.is_some() {
                    self.error(
                        codes::PAR_UNEXPECTED_TOKEN,
                        "duplicate `else` arm in `case`".to_string(),
                        else_span,
                    );
                } else {
                    default = Some(block);
                }
                continue;
            }

            let arm_start = self.cur_span();
            let literal = self.parse_case_literal()?;
            self.expect(TokenKind::FatArrow, "case arm")?;
            let body = self.parse_block()?;
            let span = arm_start.to(body.span);
            arms.push(CaseArm {
                literal,
                body,
                span,
            });
        }
        let close = self.expect(TokenKind::RBrace, "case body")?;

        Some(CaseStmt {
            scrutinee,
            arms,
            default,
            case_span,
            span: case_span.to(close.span),
        })
    }

    /// Case arm literals: int (optionally negated), byte, string, bool.
    fn parse_case_literal(&mut self) -> Option<Expr> {
        if self.check(TokenKind::Minus) {
            let minus = self.bump();
            let lit = self.parse_case_literal()?;
            if !matches!(lit.kind, ExprKind::Int(_)) {
                self.error(
                    codes::PAR_UNEXPECTED_TOKEN,
                    "`-` in a case arm may only negate an integer literal".to_string(),
                    lit.span,
                );
            }
            let span = minus.span.to(lit.span);
            return Some(Expr {
                id: self.next_id(),
                kind: ExprKind::Unary {
                    op: UnOp::Neg,
                    operand: Box::new(lit),
                },
                span,
            });
        }

        match self.kind() {
            TokenKind::Int
            | TokenKind::Byte
            | TokenKind::Str
            | TokenKind::True
            | TokenKind::False => {
                // Reuse the primary parser for the literal forms.
                self.parse_expr()
            }
            other => {
                self.error(
                    codes::PAR_UNEXPECTED_TOKEN,
                    format!("expected a literal case arm, found {}", other),
                    self.cur_span(),
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeIdGen;
    use l0c_lex::Lexer;
    use l0c_util::{FileId, Handler};

    fn parse_stmt_source(source: &str) -> (Option<Stmt>, Handler) {
        let handler = Handler::new();
        let mut ids = NodeIdGen::new();
        let tokens = Lexer::new(source, &handler, FileId::DUMMY).tokenize();
        let mut parser = Parser::new(tokens, &handler, &mut ids, FileId::DUMMY);
        let stmt = parser.parse_stmt();
        (stmt, handler)
    }

    fn expect_stmt(source: &str) -> Stmt {
        let (stmt, handler) = parse_stmt_source(source);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        stmt.unwrap()
    }

    #[test]
    fn test_let_statement() {
        match expect_stmt("let x: int = 1 + 2;") {
            Stmt::Let(l) => {
                assert_eq!(l.name, "x");
                assert!(l.ty.is_some());
            }
            other => panic!("expected let, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment_statement() {
        match expect_stmt("p.x = 3;") {
            Stmt::Assign(a) => {
                assert!(matches!(a.target.kind, ExprKind::Field { .. }));
            }
            other => panic!("expected assign, got {:?}", other),
        }
    }

    #[test]
    fn test_expression_statement() {
        match expect_stmt("go();") {
            Stmt::Expr(e) => assert!(matches!(e.expr.kind, ExprKind::Call { .. })),
            other => panic!("expected expr stmt, got {:?}", other),
        }
    }

    #[test]
    fn test_if_else_chain() {
        match expect_stmt("if (a) { return 1; } else if (b) { return 2; } else { return 3; }") {
            Stmt::If(stmt) => match stmt.else_branch {
                Some(ElseBranch::If(nested)) => {
                    assert!(matches!(nested.else_branch, Some(ElseBranch::Block(_))));
                }
                other => panic!("expected else-if, got {:?}", other),
            },
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_while_statement() {
        match expect_stmt("while (i < 10) { i = i + 1; }") {
            Stmt::While(w) => assert_eq!(w.body.stmts.len(), 1),
            other => panic!("expected while, got {:?}", other),
        }
    }

    #[test]
    fn test_for_statement_full_header() {
        match expect_stmt("for (let i = 0; i < 10; i = i + 1) { use_it(i); }") {
            Stmt::For(f) => {
                assert!(matches!(f.init.as_deref(), Some(Stmt::Let(_))));
                assert!(f.cond.is_some());
                assert!(matches!(f.step.as_deref(), Some(Stmt::Assign(_))));
            }
            other => panic!("expected for, got {:?}", other),
        }
    }

    #[test]
    fn test_for_statement_empty_header() {
        match expect_stmt("for (;;) { break; }") {
            Stmt::For(f) => {
                assert!(f.init.is_none());
                assert!(f.cond.is_none());
                assert!(f.step.is_none());
            }
            other => panic!("expected for, got {:?}", other),
        }
    }

    #[test]
    fn test_with_inline_cleanups() {
        match expect_stmt("with (let f = open(\"x\") => close(f), let g = open(\"y\") => close(g)) { use_it(f); }") {
            Stmt::With(w) => {
                assert_eq!(w.items.len(), 2);
                assert!(w.items.iter().all(|i| i.cleanup.is_some()));
                assert!(w.cleanup.is_none());
            }
            other => panic!("expected with, got {:?}", other),
        }
    }

    #[test]
    fn test_with_cleanup_block() {
        match expect_stmt("with (let f = open(\"x\")) { use_it(f); } cleanup { close(f); }") {
            Stmt::With(w) => {
                assert_eq!(w.items.len(), 1);
                assert!(w.items[0].cleanup.is_none());
                assert!(w.cleanup.is_some());
            }
            other => panic!("expected with, got {:?}", other),
        }
    }

    #[test]
    fn test_with_mixed_forms_rejected() {
        let (_, handler) =
            parse_stmt_source("with (let a = f() => g(a), let b = f()) { use_it(a); }");
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.code == codes::PAR_MIXED_WITH_CLEANUP));
    }

    #[test]
    fn test_with_block_form_requires_cleanup() {
        let (_, handler) = parse_stmt_source("with (let a = f()) { use_it(a); }");
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.code == codes::PAR_MIXED_WITH_CLEANUP));
    }

    #[test]
    fn test_match_statement() {
        let src = "match (c) { Red() => { return 1; } Green() => { return 2; } _ => { return 0; } }";
        match expect_stmt(src) {
            Stmt::Match(m) => {
                assert_eq!(m.arms.len(), 3);
                assert!(matches!(m.arms[2].pattern, crate::ast::Pattern::Wildcard(_)));
            }
            other => panic!("expected match, got {:?}", other),
        }
    }

    #[test]
    fn test_case_statement() {
        let src = "case (n) { 0 => { a(); } 1 => { b(); } else => { c(); } }";
        match expect_stmt(src) {
            Stmt::Case(c) => {
                assert_eq!(c.arms.len(), 2);
                assert!(c.default.is_some());
            }
            other => panic!("expected case, got {:?}", other),
        }
    }

    #[test]
    fn test_case_string_arms() {
        let src = "case (s) { \"on\" => { a(); } \"off\" => { b(); } }";
        match expect_stmt(src) {
            Stmt::Case(c) => assert_eq!(c.arms.len(), 2),
            other => panic!("expected case, got {:?}", other),
        }
    }

    #[test]
    fn test_case_negative_literal() {
        let src = "case (n) { -1 => { a(); } }";
        match expect_stmt(src) {
            Stmt::Case(c) => {
                assert!(matches!(
                    c.arms[0].literal.kind,
                    ExprKind::Unary { op: UnOp::Neg, .. }
                ));
            }
            other => panic!("expected case, got {:?}", other),
        }
    }

    #[test]
    fn test_drop_statement() {
        match expect_stmt("drop p;") {
            Stmt::Drop(d) => assert!(matches!(d.expr.kind, ExprKind::Var(_))),
            other => panic!("expected drop, got {:?}", other),
        }
    }

    #[test]
    fn test_loop_control_statements() {
        assert!(matches!(expect_stmt("break;"), Stmt::Break(_)));
        assert!(matches!(expect_stmt("continue;"), Stmt::Continue(_)));
    }

    #[test]
    fn test_return_forms() {
        match expect_stmt("return;") {
            Stmt::Return(r) => assert!(r.value.is_none()),
            other => panic!("expected return, got {:?}", other),
        }
        match expect_stmt("return x + 1;") {
            Stmt::Return(r) => assert!(r.value.is_some()),
            other => panic!("expected return, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_block() {
        match expect_stmt("{ let x = 1; { let y = 2; } }") {
            Stmt::Block(b) => assert_eq!(b.stmts.len(), 2),
            other => panic!("expected block, got {:?}", other),
        }
    }

    #[test]
    fn test_block_recovers_after_bad_statement() {
        let (stmt, handler) = parse_stmt_source("{ let = 1; ok(); }");
        assert!(handler.has_errors());
        match stmt.unwrap() {
            Stmt::Block(b) => {
                // The statement after the broken one still parses.
                assert!(b
                    .stmts
                    .iter()
                    .any(|s| matches!(s, Stmt::Expr(_))));
            }
            other => panic!("expected block, got {:?}", other),
        }
    }
}
