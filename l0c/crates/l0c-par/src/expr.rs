//! Expression parsing using Pratt-style binding powers.
//!
//! # Operator precedence (lowest to highest)
//!
//! | Level | Operators | Associativity |
//! |-------|-----------|---------------|
//! | 1 | `\|\|` | Left |
//! | 2 | `&&` | Left |
//! | 3 | `\|` | Left |
//! | 4 | `^` | Left |
//! | 5 | `&` | Left |
//! | 6 | `==`, `!=` | Left |
//! | 7 | `<`, `<=`, `>`, `>=` | Left |
//! | 8 | `<<`, `>>` | Left |
//! | 9 | `+`, `-` | Left |
//! | 10 | `*`, `/`, `%` | Left |
//! | 11 | unary `- ! ~ *` | Prefix |
//! | 12 | `as` | Left |
//! | 13 | call, index, field, `?` | Postfix |
//!
//! The bitwise and shift levels are reserved: they parse here and the type
//! checker rejects them until their defined-behavior bounds are enforced by
//! runtime helpers.
//!
//! `new T(args?)` is a primary expression. A type in argument position
//! (`sizeof(Point*)`) is recognized by lookahead: a builtin type name, or a
//! qualified identifier followed by one or more `*` and an optional `?`,
//! ending at `,` or `)`.

use l0c_lex::TokenKind;
use l0c_util::diagnostic::codes;

use crate::ast::{BinOp, Expr, ExprKind, UnOp};
use crate::Parser;

/// Binding power levels for the Pratt loop.
/// Higher numbers bind tighter.
#[doc(hidden)]
pub mod bp {
    /// Minimum binding power (start of expression).
    pub const MIN: u8 = 0;

    /// Logical OR: `||`
    pub const LOGICAL_OR: u8 = 2;

    /// Logical AND: `&&`
    pub const LOGICAL_AND: u8 = 4;

    /// Bitwise OR: `|` (reserved)
    pub const BITWISE_OR: u8 = 6;

    /// Bitwise XOR: `^` (reserved)
    pub const BITWISE_XOR: u8 = 8;

    /// Bitwise AND: `&` (reserved)
    pub const BITWISE_AND: u8 = 10;

    /// Equality: `==`, `!=`
    pub const EQUALITY: u8 = 12;

    /// Relational: `<`, `<=`, `>`, `>=`
    pub const COMPARISON: u8 = 14;

    /// Shift: `<<`, `>>` (reserved)
    pub const SHIFT: u8 = 16;

    /// Additive: `+`, `-`
    pub const ADDITIVE: u8 = 18;

    /// Multiplicative: `*`, `/`, `%`
    pub const MULTIPLICATIVE: u8 = 20;
}

/// Builtin type names recognized in type-argument position.
const BUILTIN_TYPE_NAMES: [&str; 5] = ["int", "byte", "bool", "string", "void"];

impl<'a> Parser<'a> {
    /// Main expression entry point.
    pub fn parse_expr(&mut self) -> Option<Expr> {
        self.parse_expr_bp(bp::MIN)
    }

    /// Pratt core: parse an expression consuming only operators whose left
    /// binding power is at least `min_bp`.
    ///
    /// Left-associative operators use `right_bp = left_bp + 1`.
    fn parse_expr_bp(&mut self, min_bp: u8) -> Option<Expr> {
        let mut lhs = self.parse_unary()?;

        while let Some((op, l_bp, r_bp)) = self.infix_binding_power() {
            if l_bp < min_bp {
                break;
            }
            self.bump();
            let rhs = self.parse_expr_bp(r_bp)?;
            let span = lhs.span.to(rhs.span);
            lhs = Expr {
                id: self.next_id(),
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            };
        }

        Some(lhs)
    }

    /// Binding powers of the current token as an infix operator.
    fn infix_binding_power(&self) -> Option<(BinOp, u8, u8)> {
        let (op, l) = match self.kind() {
            TokenKind::PipePipe => (BinOp::Or, bp::LOGICAL_OR),
            TokenKind::AmpAmp => (BinOp::And, bp::LOGICAL_AND),
            TokenKind::Pipe => (BinOp::BitOr, bp::BITWISE_OR),
            TokenKind::Caret => (BinOp::BitXor, bp::BITWISE_XOR),
            TokenKind::Amp => (BinOp::BitAnd, bp::BITWISE_AND),
            TokenKind::EqEq => (BinOp::Eq, bp::EQUALITY),
            TokenKind::BangEq => (BinOp::Ne, bp::EQUALITY),
            TokenKind::Lt => (BinOp::Lt, bp::COMPARISON),
            TokenKind::Le => (BinOp::Le, bp::COMPARISON),
            TokenKind::Gt => (BinOp::Gt, bp::COMPARISON),
            TokenKind::Ge => (BinOp::Ge, bp::COMPARISON),
            TokenKind::Shl => (BinOp::Shl, bp::SHIFT),
            TokenKind::Shr => (BinOp::Shr, bp::SHIFT),
            TokenKind::Plus => (BinOp::Add, bp::ADDITIVE),
            TokenKind::Minus => (BinOp::Sub, bp::ADDITIVE),
            TokenKind::Star => (BinOp::Mul, bp::MULTIPLICATIVE),
            TokenKind::Slash => (BinOp::Div, bp::MULTIPLICATIVE),
            TokenKind::Percent => (BinOp::Rem, bp::MULTIPLICATIVE),
            _ => return None,
        };
        Some((op, l, l + 1))
    }

    /// Prefix level: `- ! ~ *`. Casts bind tighter than prefix operators,
    /// so `-x as int` parses as `-(x as int)`.
    fn parse_unary(&mut self) -> Option<Expr> {
        let op = match self.kind() {
            TokenKind::Minus => Some(UnOp::Neg),
            TokenKind::Bang => Some(UnOp::Not),
            TokenKind::Tilde => Some(UnOp::BitNot),
            TokenKind::Star => Some(UnOp::Deref),
            _ => None,
        };

        if let Some(op) = op {
            let op_tok = self.bump();
            let operand = self.parse_unary()?;
            let span = op_tok.span.to(operand.span);
            return Some(Expr {
                id: self.next_id(),
                kind: ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            });
        }

        self.parse_cast()
    }

    /// Cast level: `e as T`, left-chaining.
    fn parse_cast(&mut self) -> Option<Expr> {
        let mut expr = self.parse_postfix()?;
        while self.eat(TokenKind::As).is_some() {
            let ty = self.parse_type_ref()?;
            let span = expr.span.to(ty.span);
            expr = Expr {
                id: self.next_id(),
                kind: ExprKind::Cast {
                    operand: Box::new(expr),
                    ty,
                },
                span,
            };
        }
        Some(expr)
    }

    /// Postfix level: call, index, field access, try.
    fn parse_postfix(&mut self) -> Option<Expr> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.kind() {
                TokenKind::LParen => {
                    self.bump();
                    let args = self.parse_call_args()?;
                    let close = self.expect(TokenKind::RParen, "call arguments")?;
                    let span = expr.span.to(close.span);
                    expr = Expr {
                        id: self.next_id(),
                        kind: ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    };
                }
                TokenKind::LBracket => {
                    self.bump();
                    let index = self.parse_expr()?;
                    let close = self.expect(TokenKind::RBracket, "index expression")?;
                    let span = expr.span.to(close.span);
                    expr = Expr {
                        id: self.next_id(),
                        kind: ExprKind::Index {
                            target: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    };
                }
                TokenKind::Dot => {
                    self.bump();
                    let field = self.expect(TokenKind::Ident, "field access")?;
                    let span = expr.span.to(field.span);
                    expr = Expr {
                        id: self.next_id(),
                        kind: ExprKind::Field {
                            target: Box::new(expr),
                            field: field.lexeme,
                            field_span: field.span,
                        },
                        span,
                    };
                }
                TokenKind::Question => {
                    let q = self.bump();
                    let span = expr.span.to(q.span);
                    expr = Expr {
                        id: self.next_id(),
                        kind: ExprKind::Try {
                            operand: Box::new(expr),
                        },
                        span,
                    };
                }
                _ => break,
            }
        }

        Some(expr)
    }

    /// Primary expressions: literals, references, parens, `new`.
    fn parse_primary(&mut self) -> Option<Expr> {
        match self.kind() {
            TokenKind::Int => {
                let tok = self.bump();
                let value = match tok.lexeme.parse::<i64>() {
                    // The checker enforces the i32 range so that
                    // `-2147483648` survives as Neg(2147483648).
                    Ok(v) if v <= 2_147_483_648 => v,
                    _ => {
                        self.error(
                            codes::PAR_INT_OUT_OF_RANGE,
                            format!("integer literal `{}` is out of range", tok.lexeme),
                            tok.span,
                        );
                        0
                    }
                };
                Some(Expr {
                    id: self.next_id(),
                    kind: ExprKind::Int(value),
                    span: tok.span,
                })
            }
            TokenKind::Byte => {
                let tok = self.bump();
                let value = tok.bytes.first().copied().unwrap_or(0);
                Some(Expr {
                    id: self.next_id(),
                    kind: ExprKind::Byte(value),
                    span: tok.span,
                })
            }
            TokenKind::Str => {
                let tok = self.bump();
                Some(Expr {
                    id: self.next_id(),
                    kind: ExprKind::Str(tok.bytes),
                    span: tok.span,
                })
            }
            TokenKind::True | TokenKind::False => {
                let value = self.check(TokenKind::True);
                let tok = self.bump();
                Some(Expr {
                    id: self.next_id(),
                    kind: ExprKind::Bool(value),
                    span: tok.span,
                })
            }
            TokenKind::Null => {
                let tok = self.bump();
                Some(Expr {
                    id: self.next_id(),
                    kind: ExprKind::Null,
                    span: tok.span,
                })
            }
            TokenKind::LParen => {
                let open = self.bump();
                let inner = self.parse_expr()?;
                let close = self.expect(TokenKind::RParen, "parenthesized expression")?;
                Some(Expr {
                    id: self.next_id(),
                    kind: ExprKind::Paren(Box::new(inner)),
                    span: open.span.to(close.span),
                })
            }
            TokenKind::New => {
                let new_tok = self.bump();
                let ty = self.parse_type_name()?;
                self.expect(TokenKind::LParen, "`new` expression")?;
                let args = self.parse_call_args()?;
                let close = self.expect(TokenKind::RParen, "`new` expression")?;
                Some(Expr {
                    id: self.next_id(),
                    kind: ExprKind::New { ty, args },
                    span: new_tok.span.to(close.span),
                })
            }
            TokenKind::Sizeof => {
                // Reserved word, surfaced as a plain callee name; the type
                // checker resolves it to the intrinsic.
                let tok = self.bump();
                Some(Expr {
                    id: self.next_id(),
                    kind: ExprKind::Var(tok.lexeme),
                    span: tok.span,
                })
            }
            TokenKind::Ident => {
                if self.qualified_ref_ahead() {
                    let name = self.parse_type_name()?;
                    let span = name.span;
                    Some(Expr {
                        id: self.next_id(),
                        kind: ExprKind::Qualified(name),
                        span,
                    })
                } else {
                    let tok = self.bump();
                    Some(Expr {
                        id: self.next_id(),
                        kind: ExprKind::Var(tok.lexeme),
                        span: tok.span,
                    })
                }
            }
            other => {
                self.error(
                    codes::PAR_UNEXPECTED_TOKEN,
                    format!("expected an expression, found {}", other),
                    self.cur_span(),
                );
                None
            }
        }
    }

    /// Parse comma-separated call arguments, recognizing type-in-argument
    /// position by lookahead.
    pub(crate) fn parse_call_args(&mut self) -> Option<Vec<Expr>> {
        let mut args = Vec::new();
        if self.check(TokenKind::RParen) {
            return Some(args);
        }
        loop {
            if self.type_arg_ahead() {
                let ty = self.parse_type_ref()?;
                args.push(Expr {
                    id: self.next_id(),
                    span: ty.span,
                    kind: ExprKind::TypeExpr(ty),
                });
            } else {
                args.push(self.parse_expr()?);
            }
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        Some(args)
    }

    /// Lookahead: does a qualified reference `seg(.seg)*::Name` start here?
    fn qualified_ref_ahead(&self) -> bool {
        debug_assert_eq!(self.kind(), TokenKind::Ident);
        let mut j = 0;
        while self.nth_kind(j + 1) == TokenKind::Dot && self.nth_kind(j + 2) == TokenKind::Ident {
            j += 2;
        }
        self.nth_kind(j + 1) == TokenKind::ColonColon && self.nth_kind(j + 2) == TokenKind::Ident
    }

    /// Lookahead: does a type argument start here?
    ///
    /// Matches a builtin type name, or an identifier path followed by one or
    /// more `*` and an optional `?`, that ends at `,` or `)`.
    fn type_arg_ahead(&self) -> bool {
        if self.kind() != TokenKind::Ident {
            return false;
        }

        let mut j = 0;
        // Path: seg(.seg)* and optional ::Name segments.
        while self.nth_kind(j + 1) == TokenKind::Dot && self.nth_kind(j + 2) == TokenKind::Ident {
            j += 2;
        }
        let mut qualified = false;
        while self.nth_kind(j + 1) == TokenKind::ColonColon
            && self.nth_kind(j + 2) == TokenKind::Ident
        {
            qualified = true;
            j += 2;
        }

        let mut stars = 0;
        while self.nth_kind(j + 1) == TokenKind::Star {
            stars += 1;
            j += 1;
        }
        if self.nth_kind(j + 1) == TokenKind::Question {
            j += 1;
        }

        let ends = matches!(
            self.nth_kind(j + 1),
            TokenKind::Comma | TokenKind::RParen
        );
        if !ends {
            return false;
        }

        let is_builtin =
            !qualified && j == 0 && BUILTIN_TYPE_NAMES.contains(&self.cur().lexeme.as_str());
        stars >= 1 || is_builtin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeIdGen;
    use l0c_lex::Lexer;
    use l0c_util::{FileId, Handler};

    fn parse_expression(source: &str) -> (Option<Expr>, Handler) {
        let handler = Handler::new();
        let mut ids = NodeIdGen::new();
        let tokens = Lexer::new(source, &handler, FileId::DUMMY).tokenize();
        let mut parser = Parser::new(tokens, &handler, &mut ids, FileId::DUMMY);
        let expr = parser.parse_expr();
        (expr, handler)
    }

    fn expect_expr(source: &str) -> Expr {
        let (expr, handler) = parse_expression(source);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        expr.unwrap()
    }

    fn as_binary(expr: &Expr) -> (BinOp, &Expr, &Expr) {
        match &expr.kind {
            ExprKind::Binary { op, lhs, rhs } => (*op, lhs, rhs),
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_mul_binds_tighter_than_add() {
        let expr = expect_expr("2 + 3 * 4");
        let (op, lhs, rhs) = as_binary(&expr);
        assert_eq!(op, BinOp::Add);
        assert!(matches!(lhs.kind, ExprKind::Int(2)));
        let (op, _, _) = as_binary(rhs);
        assert_eq!(op, BinOp::Mul);
    }

    #[test]
    fn test_left_associativity() {
        let expr = expect_expr("10 - 4 - 3");
        let (op, lhs, rhs) = as_binary(&expr);
        assert_eq!(op, BinOp::Sub);
        assert!(matches!(rhs.kind, ExprKind::Int(3)));
        let (inner_op, _, _) = as_binary(lhs);
        assert_eq!(inner_op, BinOp::Sub);
    }

    #[test]
    fn test_comparison_below_additive() {
        let expr = expect_expr("a + 1 < b * 2");
        let (op, _, _) = as_binary(&expr);
        assert_eq!(op, BinOp::Lt);
    }

    #[test]
    fn test_logical_precedence() {
        let expr = expect_expr("a || b && c");
        let (op, _, rhs) = as_binary(&expr);
        assert_eq!(op, BinOp::Or);
        let (op, _, _) = as_binary(rhs);
        assert_eq!(op, BinOp::And);
    }

    #[test]
    fn test_reserved_operators_parse() {
        // Reserved operators still parse; the checker rejects them.
        let expr = expect_expr("a & b | c ^ d << 2");
        let (op, _, _) = as_binary(&expr);
        assert_eq!(op, BinOp::BitOr);
    }

    #[test]
    fn test_unary_chain() {
        let expr = expect_expr("!!ok");
        match &expr.kind {
            ExprKind::Unary { op, operand } => {
                assert_eq!(*op, UnOp::Not);
                assert!(matches!(
                    operand.kind,
                    ExprKind::Unary { op: UnOp::Not, .. }
                ));
            }
            other => panic!("expected unary, got {:?}", other),
        }
    }

    #[test]
    fn test_deref_and_field() {
        let expr = expect_expr("*p.next");
        // Postfix binds tighter: *(p.next)
        match &expr.kind {
            ExprKind::Unary { op, operand } => {
                assert_eq!(*op, UnOp::Deref);
                assert!(matches!(operand.kind, ExprKind::Field { .. }));
            }
            other => panic!("expected deref, got {:?}", other),
        }
    }

    #[test]
    fn test_cast_tighter_than_unary() {
        let expr = expect_expr("-x as int");
        match &expr.kind {
            ExprKind::Unary { op, operand } => {
                assert_eq!(*op, UnOp::Neg);
                assert!(matches!(operand.kind, ExprKind::Cast { .. }));
            }
            other => panic!("expected unary around cast, got {:?}", other),
        }
    }

    #[test]
    fn test_cast_in_binary() {
        let expr = expect_expr("x as byte + y");
        let (op, lhs, _) = as_binary(&expr);
        assert_eq!(op, BinOp::Add);
        assert!(matches!(lhs.kind, ExprKind::Cast { .. }));
    }

    #[test]
    fn test_call_and_try() {
        let expr = expect_expr("lookup(key)?");
        match &expr.kind {
            ExprKind::Try { operand } => {
                assert!(matches!(operand.kind, ExprKind::Call { .. }));
            }
            other => panic!("expected try, got {:?}", other),
        }
    }

    #[test]
    fn test_index_parses() {
        let expr = expect_expr("xs[0]");
        assert!(matches!(expr.kind, ExprKind::Index { .. }));
    }

    #[test]
    fn test_new_expression() {
        let expr = expect_expr("new Point(1, 2)");
        match &expr.kind {
            ExprKind::New { ty, args } => {
                assert_eq!(ty.name, "Point");
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected new, got {:?}", other),
        }
    }

    #[test]
    fn test_qualified_reference() {
        let expr = expect_expr("io.fs::open");
        match &expr.kind {
            ExprKind::Qualified(q) => {
                assert_eq!(q.module.as_ref().unwrap().to_string(), "io.fs");
                assert_eq!(q.name, "open");
            }
            other => panic!("expected qualified ref, got {:?}", other),
        }
    }

    #[test]
    fn test_dot_without_colons_is_field_access() {
        let expr = expect_expr("p.x");
        assert!(matches!(expr.kind, ExprKind::Field { .. }));
    }

    #[test]
    fn test_sizeof_builtin_type_arg() {
        let expr = expect_expr("sizeof(int)");
        match &expr.kind {
            ExprKind::Call { callee, args } => {
                assert!(matches!(&callee.kind, ExprKind::Var(n) if n == "sizeof"));
                assert_eq!(args.len(), 1);
                assert!(matches!(args[0].kind, ExprKind::TypeExpr(_)));
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_sizeof_pointer_type_arg() {
        let expr = expect_expr("sizeof(Point*)");
        match &expr.kind {
            ExprKind::Call { args, .. } => match &args[0].kind {
                ExprKind::TypeExpr(ty) => {
                    assert_eq!(ty.name.name, "Point");
                    assert_eq!(ty.ptr_depth, 1);
                }
                other => panic!("expected type expr, got {:?}", other),
            },
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_multiplication_is_not_type_arg() {
        let expr = expect_expr("f(a * b)");
        match &expr.kind {
            ExprKind::Call { args, .. } => {
                assert!(matches!(args[0].kind, ExprKind::Binary { .. }));
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_int_literal_range() {
        let (_, handler) = parse_expression("2147483648");
        // Representable in the AST; the checker enforces context.
        assert!(!handler.has_errors());

        let (_, handler) = parse_expression("99999999999");
        assert!(handler.has_errors());
        assert_eq!(handler.diagnostics()[0].code, codes::PAR_INT_OUT_OF_RANGE);
    }

    #[test]
    fn test_null_literal() {
        let expr = expect_expr("null");
        assert!(matches!(expr.kind, ExprKind::Null));
    }

    #[test]
    fn test_paren_expression() {
        let expr = expect_expr("(1 + 2) * 3");
        let (op, lhs, _) = as_binary(&expr);
        assert_eq!(op, BinOp::Mul);
        assert!(matches!(lhs.kind, ExprKind::Paren(_)));
    }
}
