//! l0c-par - Recursive-descent parser for L0.
//!
//! Single pass over the token stream, producing a fully spanned [`ast`]
//! tree. Ungrammatical input is reported through the shared handler with
//! the offending token's span; the parser then advances to the next
//! statement or declaration boundary so one run collects as many
//! diagnostics as possible.
//!
//! Expression parsing uses Pratt-style binding powers; see [`expr`] for the
//! precedence table.

pub mod ast;
pub mod expr;
pub mod pattern;
pub mod pretty;
pub mod stmt;
pub mod types;

use l0c_lex::{Lexer, Token, TokenKind};
use l0c_util::diagnostic::codes;
use l0c_util::{Diagnostic, DiagnosticCode, DottedName, FileId, Handler, Span};

use ast::{Import, Module, NodeIdGen, TopDecl};

/// Lex and parse one source file.
///
/// Returns `None` when the module header is unusable; otherwise returns a
/// best-effort [`Module`] even in the presence of errors (the driver gates
/// later phases on the handler).
pub fn parse_source(
    source: &str,
    handler: &Handler,
    ids: &mut NodeIdGen,
    file_id: FileId,
) -> Option<Module> {
    let tokens = Lexer::new(source, handler, file_id).tokenize();
    Parser::new(tokens, handler, ids, file_id).parse_module()
}

/// The recursive-descent parser.
pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    handler: &'a Handler,
    ids: &'a mut NodeIdGen,
    file_id: FileId,
}

impl<'a> Parser<'a> {
    /// Create a parser over a token stream. The stream must end with an
    /// [`TokenKind::Eof`] token, as produced by [`Lexer::tokenize`].
    pub fn new(
        tokens: Vec<Token>,
        handler: &'a Handler,
        ids: &'a mut NodeIdGen,
        file_id: FileId,
    ) -> Self {
        debug_assert!(tokens.last().is_some_and(Token::is_eof));
        Self {
            tokens,
            pos: 0,
            handler,
            ids,
            file_id,
        }
    }

    /// Parse `module <dotted>;` then imports then declarations.
    pub fn parse_module(&mut self) -> Option<Module> {
        let header_start = self.cur_span();
        if self.eat(TokenKind::Module).is_none() {
            self.error(
                codes::PAR_BAD_MODULE_HEADER,
                format!("expected `module` header, found {}", self.kind()),
                header_start,
            );
            return None;
        }

        let (name, name_span) = match self.parse_dotted_name("module header") {
            Some(parts) => parts,
            None => {
                // Without a module name nothing downstream can use the file.
                return None;
            }
        };
        self.expect(TokenKind::Semi, "module header");

        let mut imports = Vec::new();
        while self.check(TokenKind::Import) {
            let start = self.cur_span();
            self.bump();
            if let Some((import_name, import_span)) = self.parse_dotted_name("import") {
                self.expect(TokenKind::Semi, "import");
                imports.push(Import {
                    name: import_name,
                    span: start.to(import_span),
                });
            } else {
                self.synchronize_top();
            }
        }

        let mut decls = Vec::new();
        while !self.at_eof() {
            match self.parse_top_decl() {
                Some(decl) => decls.push(decl),
                None => self.synchronize_top(),
            }
        }

        Some(Module {
            name,
            name_span,
            file_id: self.file_id,
            imports,
            decls,
        })
    }

    /// Parse one top-level declaration.
    fn parse_top_decl(&mut self) -> Option<TopDecl> {
        match self.kind() {
            TokenKind::Func => self.parse_func(false).map(TopDecl::Func),
            TokenKind::Extern => {
                self.bump();
                if !self.check(TokenKind::Func) {
                    self.error(
                        codes::PAR_UNEXPECTED_TOKEN,
                        format!("expected `func` after `extern`, found {}", self.kind()),
                        self.cur_span(),
                    );
                    return None;
                }
                // parse_func consumes the `func` keyword itself.
                self.parse_func(true).map(TopDecl::Func)
            }
            TokenKind::Struct => self.parse_struct().map(TopDecl::Struct),
            TokenKind::Enum => self.parse_enum().map(TopDecl::Enum),
            TokenKind::Type => self.parse_alias().map(TopDecl::TypeAlias),
            TokenKind::Let => self.parse_top_let().map(TopDecl::TopLet),
            TokenKind::Const => {
                self.error(
                    codes::PAR_CONST_RESERVED,
                    "`const` is reserved at the top level and not yet supported".to_string(),
                    self.cur_span(),
                );
                self.bump();
                None
            }
            _ => {
                self.error(
                    codes::PAR_EXPECTED_DECL,
                    format!("expected a declaration, found {}", self.kind()),
                    self.cur_span(),
                );
                None
            }
        }
    }

    fn parse_func(&mut self, is_extern: bool) -> Option<ast::FuncDecl> {
        let start = self.cur_span();
        self.expect(TokenKind::Func, "function declaration")?;
        let name_tok = self.expect(TokenKind::Ident, "function name")?;

        self.expect(TokenKind::LParen, "function parameter list")?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                let p_start = self.cur_span();
                let p_name = self.expect(TokenKind::Ident, "parameter name")?;
                self.expect(TokenKind::Colon, "parameter type")?;
                let ty = self.parse_type_ref()?;
                params.push(ast::Param {
                    name: p_name.lexeme,
                    span: p_start.to(ty.span),
                    ty,
                });
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "function parameter list")?;

        let ret = if self.eat(TokenKind::Arrow).is_some() {
            Some(self.parse_type_ref()?)
        } else {
            None
        };

        let (body, end_span) = if is_extern {
            let semi = self.expect(TokenKind::Semi, "extern function declaration")?;
            (None, semi.span)
        } else {
            let block = self.parse_block()?;
            let span = block.span;
            (Some(block), span)
        };

        Some(ast::FuncDecl {
            name: name_tok.lexeme,
            name_span: name_tok.span,
            params,
            ret,
            body,
            is_extern,
            span: start.to(end_span),
        })
    }

    fn parse_struct(&mut self) -> Option<ast::StructDecl> {
        let start = self.cur_span();
        self.bump(); // struct
        let name_tok = self.expect(TokenKind::Ident, "struct name")?;
        self.expect(TokenKind::LBrace, "struct body")?;

        let mut fields = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.at_eof() {
            let f_start = self.cur_span();
            let f_name = self.expect(TokenKind::Ident, "field name")?;
            self.expect(TokenKind::Colon, "field type")?;
            let ty = self.parse_type_ref()?;
            self.expect(TokenKind::Semi, "field declaration")?;
            fields.push(ast::Field {
                name: f_name.lexeme,
                span: f_start.to(ty.span),
                ty,
            });
        }
        let close = self.expect(TokenKind::RBrace, "struct body")?;

        Some(ast::StructDecl {
            name: name_tok.lexeme,
            name_span: name_tok.span,
            fields,
            span: start.to(close.span),
        })
    }

    fn parse_enum(&mut self) -> Option<ast::EnumDecl> {
        let start = self.cur_span();
        self.bump(); // enum
        let name_tok = self.expect(TokenKind::Ident, "enum name")?;
        self.expect(TokenKind::LBrace, "enum body")?;

        let mut variants = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.at_eof() {
            let v_start = self.cur_span();
            let v_name = self.expect(TokenKind::Ident, "variant name")?;
            self.expect(TokenKind::LParen, "variant payload")?;
            let mut fields = Vec::new();
            if !self.check(TokenKind::RParen) {
                loop {
                    let f_start = self.cur_span();
                    let f_name = self.expect(TokenKind::Ident, "payload field name")?;
                    self.expect(TokenKind::Colon, "payload field type")?;
                    let ty = self.parse_type_ref()?;
                    fields.push(ast::Field {
                        name: f_name.lexeme,
                        span: f_start.to(ty.span),
                        ty,
                    });
                    if self.eat(TokenKind::Comma).is_none() {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RParen, "variant payload")?;
            let semi = self.expect(TokenKind::Semi, "variant declaration")?;
            variants.push(ast::Variant {
                name: v_name.lexeme,
                fields,
                span: v_start.to(semi.span),
            });
        }
        let close = self.expect(TokenKind::RBrace, "enum body")?;

        Some(ast::EnumDecl {
            name: name_tok.lexeme,
            name_span: name_tok.span,
            variants,
            span: start.to(close.span),
        })
    }

    fn parse_alias(&mut self) -> Option<ast::AliasDecl> {
        let start = self.cur_span();
        self.bump(); // type
        let name_tok = self.expect(TokenKind::Ident, "type alias name")?;
        self.expect(TokenKind::Assign, "type alias")?;
        let target = self.parse_type_ref()?;
        let semi = self.expect(TokenKind::Semi, "type alias")?;

        Some(ast::AliasDecl {
            name: name_tok.lexeme,
            name_span: name_tok.span,
            target,
            span: start.to(semi.span),
        })
    }

    fn parse_top_let(&mut self) -> Option<ast::TopLetDecl> {
        let start = self.cur_span();
        self.bump(); // let
        let name_tok = self.expect(TokenKind::Ident, "binding name")?;
        let ty = if self.eat(TokenKind::Colon).is_some() {
            Some(self.parse_type_ref()?)
        } else {
            None
        };
        self.expect(TokenKind::Assign, "top-level binding")?;
        let init = self.parse_expr()?;
        let semi = self.expect(TokenKind::Semi, "top-level binding")?;

        Some(ast::TopLetDecl {
            name: name_tok.lexeme,
            name_span: name_tok.span,
            ty,
            init,
            span: start.to(semi.span),
        })
    }

    /// Parse `seg(.seg)*` into a [`DottedName`].
    fn parse_dotted_name(&mut self, context: &str) -> Option<(DottedName, Span)> {
        let first = self.expect(TokenKind::Ident, context)?;
        let mut span = first.span;
        let mut segments = vec![first.lexeme];
        while self.eat(TokenKind::Dot).is_some() {
            let seg = self.expect(TokenKind::Ident, context)?;
            span = span.to(seg.span);
            segments.push(seg.lexeme);
        }
        // Segments are identifier tokens, so construction cannot fail.
        DottedName::new(segments).map(|name| (name, span))
    }

    // -----------------------------------------------------------------------
    // Token plumbing
    // -----------------------------------------------------------------------

    /// The current token.
    pub(crate) fn cur(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    /// Kind of the current token.
    pub(crate) fn kind(&self) -> TokenKind {
        self.cur().kind
    }

    /// Kind of the token `n` positions ahead (clamped to Eof).
    pub(crate) fn nth_kind(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    /// Span of the current token.
    pub(crate) fn cur_span(&self) -> Span {
        self.cur().span
    }

    /// Returns true at the end-of-input token.
    pub(crate) fn at_eof(&self) -> bool {
        self.kind() == TokenKind::Eof
    }

    /// Consume and return the current token.
    pub(crate) fn bump(&mut self) -> Token {
        let token = self.cur().clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    /// Returns true if the current token has the given kind.
    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    /// Consume the current token if it has the given kind.
    pub(crate) fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.check(kind) {
            Some(self.bump())
        } else {
            None
        }
    }

    /// Consume a token of the given kind or report `PAR-0001`.
    pub(crate) fn expect(&mut self, kind: TokenKind, context: &str) -> Option<Token> {
        if self.check(kind) {
            Some(self.bump())
        } else {
            self.error(
                codes::PAR_UNEXPECTED_TOKEN,
                format!(
                    "expected {} in {}, found {}",
                    kind.describe(),
                    context,
                    self.kind()
                ),
                self.cur_span(),
            );
            None
        }
    }

    /// Allocate a fresh node id.
    pub(crate) fn next_id(&mut self) -> ast::NodeId {
        self.ids.alloc()
    }

    /// Report a parse error.
    pub(crate) fn error(&self, code: DiagnosticCode, message: String, span: Span) {
        self.handler
            .emit(Diagnostic::error(code, message).with_span(span));
    }

    // -----------------------------------------------------------------------
    // Recovery
    // -----------------------------------------------------------------------

    /// Skip forward to the next declaration boundary.
    fn synchronize_top(&mut self) {
        // Always make progress.
        if !self.at_eof() {
            self.bump();
        }
        while !self.at_eof() {
            match self.kind() {
                TokenKind::Func
                | TokenKind::Extern
                | TokenKind::Struct
                | TokenKind::Enum
                | TokenKind::Type
                | TokenKind::Let
                | TokenKind::Const
                | TokenKind::Import => return,
                TokenKind::Semi | TokenKind::RBrace => {
                    self.bump();
                    return;
                }
                _ => {
                    self.bump();
                }
            }
        }
    }

    /// Skip forward to the next statement boundary.
    pub(crate) fn synchronize_stmt(&mut self) {
        if !self.at_eof() {
            self.bump();
        }
        while !self.at_eof() {
            match self.kind() {
                TokenKind::Semi => {
                    self.bump();
                    return;
                }
                TokenKind::RBrace
                | TokenKind::Let
                | TokenKind::If
                | TokenKind::While
                | TokenKind::For
                | TokenKind::With
                | TokenKind::Match
                | TokenKind::Case
                | TokenKind::Drop
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Return
                | TokenKind::LBrace => return,
                _ => {
                    self.bump();
                }
            }
        }
    }
}
