//! Local scope resolution.
//!
//! For each non-extern function, builds a [`FunctionEnv`]: parameters in the
//! root scope, a child scope per block, `for` header, `with` header, and
//! match arm, with pattern variables bound in arm scopes. The wildcard never
//! binds. Duplicate names within one scope are diagnosed as `LOC-`.

use std::rc::Rc;

use l0c_par::ast::{Block, ElseBranch, FuncDecl, Module, Pattern, Stmt, TopDecl};
use l0c_util::diagnostic::codes;
use l0c_util::{Diagnostic, DottedName, Handler};

use crate::analysis::{AnalysisResult, BindingKind, FunctionEnv, ScopeId};
use crate::types::Type;

pub(crate) fn resolve(result: &mut AnalysisResult, handler: &Handler) {
    let modules: Vec<(DottedName, Rc<Module>)> = result
        .unit
        .modules
        .iter()
        .map(|name| (name.clone(), Rc::clone(&result.unit.asts[name])))
        .collect();

    for (module_name, module) in &modules {
        for decl in &module.decls {
            let TopDecl::Func(func) = decl else { continue };
            if func.is_extern {
                continue;
            }
            let env = build_function_env(result, handler, module_name, func);
            result
                .func_envs
                .insert((module_name.clone(), func.name.clone()), env);
        }
    }
}

fn build_function_env(
    result: &AnalysisResult,
    handler: &Handler,
    module: &DottedName,
    func: &FuncDecl,
) -> FunctionEnv {
    let mut env = FunctionEnv::new();
    let root = env.root;

    let sig = result
        .func_types
        .get(&(module.clone(), func.name.clone()));

    for (index, param) in func.params.iter().enumerate() {
        let ty = sig.and_then(|s| s.params.get(index).cloned());
        declare(
            handler,
            module,
            &mut env,
            root,
            &param.name,
            param.span,
            BindingKind::Param(index),
            ty,
        );
    }

    if let Some(body) = &func.body {
        let mut builder = ScopeBuilder {
            handler,
            module,
            env: &mut env,
        };
        builder.visit_block(body, root);
    }

    env
}

struct ScopeBuilder<'a> {
    handler: &'a Handler,
    module: &'a DottedName,
    env: &'a mut FunctionEnv,
}

impl<'a> ScopeBuilder<'a> {
    fn visit_block(&mut self, block: &Block, parent: ScopeId) {
        let scope = self.env.child(parent);
        self.env.scope_of.insert(block.id, scope);
        for stmt in &block.stmts {
            self.visit_stmt(stmt, scope);
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt, scope: ScopeId) {
        match stmt {
            Stmt::Block(block) => self.visit_block(block, scope),
            Stmt::Let(l) => {
                self.visit_expr_scopes(&l.init, scope);
                if let Some(id) = declare(
                    self.handler,
                    self.module,
                    self.env,
                    scope,
                    &l.name,
                    l.name_span,
                    BindingKind::Let,
                    None,
                ) {
                    self.env.binding_of.insert(l.id, id);
                }
            }
            Stmt::Assign(a) => {
                self.visit_expr_scopes(&a.target, scope);
                self.visit_expr_scopes(&a.value, scope);
            }
            Stmt::Expr(e) => self.visit_expr_scopes(&e.expr, scope),
            Stmt::If(stmt) => {
                self.visit_expr_scopes(&stmt.cond, scope);
                self.visit_block(&stmt.then_block, scope);
                match &stmt.else_branch {
                    Some(ElseBranch::Block(block)) => self.visit_block(block, scope),
                    Some(ElseBranch::If(nested)) => {
                        self.visit_stmt_if(nested, scope);
                    }
                    None => {}
                }
            }
            Stmt::While(w) => {
                self.visit_expr_scopes(&w.cond, scope);
                self.visit_block(&w.body, scope);
            }
            Stmt::For(f) => {
                // The header opens its own scope; the body nests inside it.
                let header = self.env.child(scope);
                self.env.scope_of.insert(f.id, header);
                if let Some(init) = &f.init {
                    self.visit_stmt(init, header);
                }
                if let Some(cond) = &f.cond {
                    self.visit_expr_scopes(cond, header);
                }
                if let Some(step) = &f.step {
                    self.visit_stmt(step, header);
                }
                self.visit_block(&f.body, header);
            }
            Stmt::With(w) => {
                let header = self.env.child(scope);
                self.env.scope_of.insert(w.id, header);
                for item in &w.items {
                    self.visit_expr_scopes(&item.init, header);
                    if let Some(id) = declare(
                        self.handler,
                        self.module,
                        self.env,
                        header,
                        &item.name,
                        item.name_span,
                        BindingKind::WithItem,
                        None,
                    ) {
                        self.env.binding_of.insert(item.id, id);
                    }
                    if let Some(cleanup) = &item.cleanup {
                        self.visit_stmt(cleanup, header);
                    }
                }
                self.visit_block(&w.body, header);
                if let Some(cleanup) = &w.cleanup {
                    self.visit_block(cleanup, header);
                }
            }
            Stmt::Match(m) => {
                self.visit_expr_scopes(&m.scrutinee, scope);
                for arm in &m.arms {
                    let arm_scope = self.env.child(scope);
                    self.env.scope_of.insert(arm.id, arm_scope);
                    if let Pattern::Variant(v) = &arm.pattern {
                        for bind in &v.binds {
                            // `_` in a binding position never binds.
                            let Some(name) = &bind.name else { continue };
                            declare(
                                self.handler,
                                self.module,
                                self.env,
                                arm_scope,
                                name,
                                bind.span,
                                BindingKind::PatVar,
                                None,
                            );
                        }
                    }
                    self.visit_block(&arm.body, arm_scope);
                }
            }
            Stmt::Case(c) => {
                self.visit_expr_scopes(&c.scrutinee, scope);
                for arm in &c.arms {
                    self.visit_block(&arm.body, scope);
                }
                if let Some(default) = &c.default {
                    self.visit_block(default, scope);
                }
            }
            Stmt::Drop(d) => self.visit_expr_scopes(&d.expr, scope),
            Stmt::Break(_) | Stmt::Continue(_) => {}
            Stmt::Return(r) => {
                if let Some(value) = &r.value {
                    self.visit_expr_scopes(value, scope);
                }
            }
        }
    }

    fn visit_stmt_if(&mut self, stmt: &l0c_par::ast::IfStmt, scope: ScopeId) {
        self.visit_expr_scopes(&stmt.cond, scope);
        self.visit_block(&stmt.then_block, scope);
        match &stmt.else_branch {
            Some(ElseBranch::Block(block)) => self.visit_block(block, scope),
            Some(ElseBranch::If(nested)) => self.visit_stmt_if(nested, scope),
            None => {}
        }
    }

    /// Expressions contain no scopes of their own today; this hook exists so
    /// the checker can assume every scope-bearing node has an entry.
    fn visit_expr_scopes(&mut self, _expr: &l0c_par::ast::Expr, _scope: ScopeId) {}
}

#[allow(clippy::too_many_arguments)]
fn declare(
    handler: &Handler,
    module: &DottedName,
    env: &mut FunctionEnv,
    scope: ScopeId,
    name: &str,
    span: l0c_util::Span,
    kind: BindingKind,
    ty: Option<Type>,
) -> Option<crate::analysis::BindingId> {
    match env.declare(scope, name, span, kind, ty) {
        Ok(id) => Some(id),
        Err(existing) => {
            let first = env.bindings[existing].span;
            handler.emit(
                Diagnostic::error(
                    codes::LOC_DUPLICATE_BINDING,
                    format!(
                        "`{}` is already bound in this scope (first bound at line {})",
                        name, first.line
                    ),
                )
                .with_span(span)
                .with_module(module.clone()),
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::analyze_sources;

    fn env_for<'r>(
        result: &'r AnalysisResult,
        module: &str,
        func: &str,
    ) -> &'r FunctionEnv {
        &result.func_envs[&(DottedName::parse(module).unwrap(), func.to_string())]
    }

    #[test]
    fn test_params_in_root_scope() {
        let (result, handler) = analyze_sources(&[(
            "m",
            "module m;\nfunc f(a: int, b: string) { return; }\n",
        )]);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());

        let env = env_for(&result, "m", "f");
        let a = env.lookup(env.root, "a").unwrap();
        assert_eq!(env.bindings[a].kind, BindingKind::Param(0));
        assert_eq!(env.bindings[a].ty, Some(Type::Int));
    }

    #[test]
    fn test_block_scopes_nest() {
        let (result, handler) = analyze_sources(&[(
            "m",
            "module m;\nfunc f() { let x = 1; { let y = 2; let z = x + y; } }\n",
        )]);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());

        let env = env_for(&result, "m", "f");
        // Two block scopes plus the root.
        assert_eq!(env.scopes.len(), 3);
    }

    #[test]
    fn test_duplicate_in_same_scope_diagnosed() {
        let (_, handler) = analyze_sources(&[(
            "m",
            "module m;\nfunc f() { let x = 1; let x = 2; }\n",
        )]);
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.code == codes::LOC_DUPLICATE_BINDING));
    }

    #[test]
    fn test_shadowing_in_child_scope_allowed() {
        let (_, handler) = analyze_sources(&[(
            "m",
            "module m;\nfunc f() { let x = 1; { let x = 2; } }\n",
        )]);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
    }

    #[test]
    fn test_param_duplicate_diagnosed() {
        let (_, handler) = analyze_sources(&[(
            "m",
            "module m;\nfunc f(a: int, a: int) {}\n",
        )]);
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.code == codes::LOC_DUPLICATE_BINDING));
    }

    #[test]
    fn test_pattern_vars_bind_in_arm_scope() {
        let (result, handler) = analyze_sources(&[(
            "m",
            "module m;\n\
             enum E { A(v: int); B(); }\n\
             func f(e: E) -> int {\n\
               match (e) { A(v) => { return v; } B() => { return 0; } }\n\
             }\n",
        )]);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());

        let env = env_for(&result, "m", "f");
        let has_pat_var = env
            .bindings
            .iter()
            .any(|b| b.name == "v" && b.kind == BindingKind::PatVar);
        assert!(has_pat_var);
    }

    #[test]
    fn test_wildcard_binding_position_does_not_bind() {
        let (result, handler) = analyze_sources(&[(
            "m",
            "module m;\n\
             enum E { A(v: int, w: int); }\n\
             func f(e: E) -> int {\n\
               match (e) { A(_, w) => { return w; } }\n\
             }\n",
        )]);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());

        let env = env_for(&result, "m", "f");
        assert!(!env.bindings.iter().any(|b| b.name == "_"));
        assert!(env.bindings.iter().any(|b| b.name == "w"));
    }

    #[test]
    fn test_for_header_opens_scope() {
        let (result, handler) = analyze_sources(&[(
            "m",
            "module m;\n\
             func f() {\n\
               for (let i = 0; i < 3; i = i + 1) { let j = i; }\n\
               for (let i = 5; i < 9; i = i + 1) { let j = i; }\n\
             }\n",
        )]);
        // Two headers may both bind `i` without clashing.
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        let env = env_for(&result, "m", "f");
        let count = env.bindings.iter().filter(|b| b.name == "i").count();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_with_header_binds_items() {
        let (result, handler) = analyze_sources(&[(
            "m",
            "module m;\n\
             extern func open(path: string) -> int;\n\
             extern func close(h: int);\n\
             func f() {\n\
               with (let h = open(\"x\") => close(h)) { close(h); }\n\
             }\n",
        )]);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        let env = env_for(&result, "m", "f");
        assert!(env
            .bindings
            .iter()
            .any(|b| b.name == "h" && b.kind == BindingKind::WithItem));
    }
}
