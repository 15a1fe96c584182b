//! Canonical source printer for the AST.
//!
//! Prints a parsed module back to L0 source in a fixed layout. The printer
//! exists for parser testing: parse, print, re-parse, print again - the two
//! printed forms must be identical (whitespace is canonical, semantics are
//! preserved).

use crate::ast::{
    Block, CaseStmt, ElseBranch, Expr, ExprKind, ForStmt, IfStmt, MatchStmt, Module, Pattern,
    QualName, Stmt, TopDecl, TypeRef, WithStmt,
};

/// Print a whole module.
pub fn print_module(module: &Module) -> String {
    let mut p = Printer::new();
    p.line(&format!("module {};", module.name));
    for import in &module.imports {
        p.line(&format!("import {};", import.name));
    }
    for decl in &module.decls {
        p.blank();
        p.print_decl(decl);
    }
    p.out
}

struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn new() -> Self {
        Self {
            out: String::new(),
            indent: 0,
        }
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn print_decl(&mut self, decl: &TopDecl) {
        match decl {
            TopDecl::Func(f) => {
                let params: Vec<String> = f
                    .params
                    .iter()
                    .map(|p| format!("{}: {}", p.name, type_ref(&p.ty)))
                    .collect();
                let ret = f
                    .ret
                    .as_ref()
                    .map(|t| format!(" -> {}", type_ref(t)))
                    .unwrap_or_default();
                let head = format!(
                    "{}func {}({}){}",
                    if f.is_extern { "extern " } else { "" },
                    f.name,
                    params.join(", "),
                    ret
                );
                match &f.body {
                    Some(body) => {
                        self.line(&format!("{} {{", head));
                        self.print_block_inner(body);
                        self.line("}");
                    }
                    None => self.line(&format!("{};", head)),
                }
            }
            TopDecl::Struct(s) => {
                self.line(&format!("struct {} {{", s.name));
                self.indent += 1;
                for field in &s.fields {
                    self.line(&format!("{}: {};", field.name, type_ref(&field.ty)));
                }
                self.indent -= 1;
                self.line("}");
            }
            TopDecl::Enum(e) => {
                self.line(&format!("enum {} {{", e.name));
                self.indent += 1;
                for variant in &e.variants {
                    let fields: Vec<String> = variant
                        .fields
                        .iter()
                        .map(|f| format!("{}: {}", f.name, type_ref(&f.ty)))
                        .collect();
                    self.line(&format!("{}({});", variant.name, fields.join(", ")));
                }
                self.indent -= 1;
                self.line("}");
            }
            TopDecl::TypeAlias(a) => {
                self.line(&format!("type {} = {};", a.name, type_ref(&a.target)));
            }
            TopDecl::TopLet(l) => {
                let ty = l
                    .ty
                    .as_ref()
                    .map(|t| format!(": {}", type_ref(t)))
                    .unwrap_or_default();
                self.line(&format!("let {}{} = {};", l.name, ty, expr(&l.init)));
            }
        }
    }

    fn print_block_inner(&mut self, block: &Block) {
        self.indent += 1;
        for stmt in &block.stmts {
            self.print_stmt(stmt);
        }
        self.indent -= 1;
    }

    fn print_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(b) => {
                self.line("{");
                self.print_block_inner(b);
                self.line("}");
            }
            Stmt::Let(l) => {
                let ty = l
                    .ty
                    .as_ref()
                    .map(|t| format!(": {}", type_ref(t)))
                    .unwrap_or_default();
                self.line(&format!("let {}{} = {};", l.name, ty, expr(&l.init)));
            }
            Stmt::Assign(a) => {
                self.line(&format!("{} = {};", expr(&a.target), expr(&a.value)));
            }
            Stmt::Expr(e) => self.line(&format!("{};", expr(&e.expr))),
            Stmt::If(stmt) => self.print_if(stmt),
            Stmt::While(w) => {
                self.line(&format!("while ({}) {{", expr(&w.cond)));
                self.print_block_inner(&w.body);
                self.line("}");
            }
            Stmt::For(f) => self.print_for(f),
            Stmt::With(w) => self.print_with(w),
            Stmt::Match(m) => self.print_match(m),
            Stmt::Case(c) => self.print_case(c),
            Stmt::Drop(d) => self.line(&format!("drop {};", expr(&d.expr))),
            Stmt::Break(_) => self.line("break;"),
            Stmt::Continue(_) => self.line("continue;"),
            Stmt::Return(r) => match &r.value {
                Some(value) => self.line(&format!("return {};", expr(value))),
                None => self.line("return;"),
            },
        }
    }

    fn print_if(&mut self, stmt: &IfStmt) {
        self.line(&format!("if ({}) {{", expr(&stmt.cond)));
        self.print_block_inner(&stmt.then_block);
        match &stmt.else_branch {
            None => self.line("}"),
            Some(ElseBranch::Block(block)) => {
                self.line("} else {");
                self.print_block_inner(block);
                self.line("}");
            }
            Some(ElseBranch::If(nested)) => {
                // Flatten the chain textually: `} else if (...) {`.
                self.line(&format!("}} else if ({}) {{", expr(&nested.cond)));
                self.print_block_inner(&nested.then_block);
                match &nested.else_branch {
                    None => self.line("}"),
                    Some(ElseBranch::Block(block)) => {
                        self.line("} else {");
                        self.print_block_inner(block);
                        self.line("}");
                    }
                    Some(ElseBranch::If(deeper)) => {
                        // Rare deep chains re-enter the same logic.
                        self.print_else_if_chain(deeper);
                    }
                }
            }
        }
    }

    fn print_else_if_chain(&mut self, stmt: &IfStmt) {
        self.line(&format!("}} else if ({}) {{", expr(&stmt.cond)));
        self.print_block_inner(&stmt.then_block);
        match &stmt.else_branch {
            None => self.line("}"),
            Some(ElseBranch::Block(block)) => {
                self.line("} else {");
                self.print_block_inner(block);
                self.line("}");
            }
            Some(ElseBranch::If(deeper)) => self.print_else_if_chain(deeper),
        }
    }

    fn print_for(&mut self, f: &ForStmt) {
        let init = f.init.as_deref().map(simple_stmt).unwrap_or_default();
        let cond = f.cond.as_ref().map(expr).unwrap_or_default();
        let step = f.step.as_deref().map(simple_stmt).unwrap_or_default();
        self.line(&format!("for ({}; {}; {}) {{", init, cond, step));
        self.print_block_inner(&f.body);
        self.line("}");
    }

    fn print_with(&mut self, w: &WithStmt) {
        let items: Vec<String> = w
            .items
            .iter()
            .map(|item| {
                let ty = item
                    .ty
                    .as_ref()
                    .map(|t| format!(": {}", type_ref(t)))
                    .unwrap_or_default();
                match &item.cleanup {
                    Some(stmt) => format!(
                        "let {}{} = {} => {}",
                        item.name,
                        ty,
                        expr(&item.init),
                        simple_stmt(stmt)
                    ),
                    None => format!("let {}{} = {}", item.name, ty, expr(&item.init)),
                }
            })
            .collect();
        self.line(&format!("with ({}) {{", items.join(", ")));
        self.print_block_inner(&w.body);
        match &w.cleanup {
            Some(block) => {
                self.line("} cleanup {");
                self.print_block_inner(block);
                self.line("}");
            }
            None => self.line("}"),
        }
    }

    fn print_match(&mut self, m: &MatchStmt) {
        self.line(&format!("match ({}) {{", expr(&m.scrutinee)));
        self.indent += 1;
        for arm in &m.arms {
            let pat = match &arm.pattern {
                Pattern::Wildcard(_) => "_".to_string(),
                Pattern::Variant(v) => {
                    let binds: Vec<String> = v
                        .binds
                        .iter()
                        .map(|b| b.name.clone().unwrap_or_else(|| "_".to_string()))
                        .collect();
                    format!("{}({})", qual_name(&v.name), binds.join(", "))
                }
            };
            self.line(&format!("{} => {{", pat));
            self.print_block_inner(&arm.body);
            self.line("}");
        }
        self.indent -= 1;
        self.line("}");
    }

    fn print_case(&mut self, c: &CaseStmt) {
        self.line(&format!("case ({}) {{", expr(&c.scrutinee)));
        self.indent += 1;
        for arm in &c.arms {
            self.line(&format!("{} => {{", expr(&arm.literal)));
            self.print_block_inner(&arm.body);
            self.line("}");
        }
        if let Some(block) = &c.default {
            self.line("else => {");
            self.print_block_inner(block);
            self.line("}");
        }
        self.indent -= 1;
        self.line("}");
    }
}

/// Print a statement on one line, without a trailing semicolon (for `for`
/// headers and inline `with` cleanups).
fn simple_stmt(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Let(l) => {
            let ty = l
                .ty
                .as_ref()
                .map(|t| format!(": {}", type_ref(t)))
                .unwrap_or_default();
            format!("let {}{} = {}", l.name, ty, expr(&l.init))
        }
        Stmt::Assign(a) => format!("{} = {}", expr(&a.target), expr(&a.value)),
        Stmt::Expr(e) => expr(&e.expr),
        Stmt::Drop(d) => format!("drop {}", expr(&d.expr)),
        other => format!("/* unsupported {:?} */", other.span()),
    }
}

/// Print a qualified name.
fn qual_name(name: &QualName) -> String {
    let mut out = String::new();
    if let Some(module) = &name.module {
        out.push_str(&module.to_string());
        out.push_str("::");
    }
    out.push_str(&name.name);
    for extra in &name.extra {
        out.push_str("::");
        out.push_str(extra);
    }
    out
}

/// Print a type reference.
fn type_ref(ty: &TypeRef) -> String {
    let mut out = qual_name(&ty.name);
    for _ in 0..ty.ptr_depth {
        out.push('*');
    }
    if ty.nullable {
        out.push('?');
    }
    out
}

/// Print an expression.
fn expr(e: &Expr) -> String {
    match &e.kind {
        ExprKind::Int(v) => v.to_string(),
        ExprKind::Byte(b) => {
            if b.is_ascii_graphic() || *b == b' ' {
                match *b {
                    b'\'' => "'\\''".to_string(),
                    b'\\' => "'\\\\'".to_string(),
                    _ => format!("'{}'", *b as char),
                }
            } else {
                format!("'\\x{:02x}'", b)
            }
        }
        ExprKind::Str(bytes) => format!("\"{}\"", escape_string(bytes)),
        ExprKind::Bool(true) => "true".to_string(),
        ExprKind::Bool(false) => "false".to_string(),
        ExprKind::Null => "null".to_string(),
        ExprKind::Var(name) => name.clone(),
        ExprKind::Qualified(q) => qual_name(q),
        ExprKind::Unary { op, operand } => format!("{}{}", op.symbol(), expr(operand)),
        ExprKind::Binary { op, lhs, rhs } => {
            format!("{} {} {}", expr(lhs), op.symbol(), expr(rhs))
        }
        ExprKind::Call { callee, args } => {
            let args: Vec<String> = args.iter().map(expr).collect();
            format!("{}({})", expr(callee), args.join(", "))
        }
        ExprKind::Index { target, index } => format!("{}[{}]", expr(target), expr(index)),
        ExprKind::Field { target, field, .. } => format!("{}.{}", expr(target), field),
        ExprKind::Cast { operand, ty } => format!("{} as {}", expr(operand), type_ref(ty)),
        ExprKind::Try { operand } => format!("{}?", expr(operand)),
        ExprKind::New { ty, args } => {
            let args: Vec<String> = args.iter().map(expr).collect();
            format!("new {}({})", qual_name(ty), args.join(", "))
        }
        ExprKind::Paren(inner) => format!("({})", expr(inner)),
        ExprKind::TypeExpr(ty) => type_ref(ty),
    }
}

/// Escape decoded string bytes back to literal form.
fn escape_string(bytes: &[u8]) -> String {
    let mut out = String::new();
    for &b in bytes {
        match b {
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            b'\r' => out.push_str("\\r"),
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\x{:02x}", b)),
        }
    }
    out
}
