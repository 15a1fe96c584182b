//! Expression and statement type checking.
//!
//! Records a type for every expression by node identity, resolves variable
//! references to their declaring binding site, and enforces the typing
//! rules: operator typing (with the reserved bitwise/shift set rejected),
//! call compatibility with nullable widening, one-hop auto-deref field
//! access, cast rules, `try` short-circuit typing, place-expression
//! assignment, bool conditions, return-on-every-path, match exhaustiveness
//! and overlap, `case` literal dispatch, and flow-sensitive tracking of
//! dropped pointer locals (dropped on any path counts as dropped; a
//! reassignment restores usability).

use std::rc::Rc;

use rustc_hash::FxHashSet;

use l0c_par::ast::{
    Block, CaseStmt, ElseBranch, Expr, ExprKind, FuncDecl, IfStmt, MatchStmt, Module, Pattern,
    Stmt, TopDecl, UnOp,
};
use l0c_util::diagnostic::codes;
use l0c_util::{Diagnostic, DiagnosticCode, DottedName, Handler, Span};

use crate::analysis::{
    AnalysisResult, BindingId, EnumInfo, FunctionEnv, Intrinsic, ScopeId, SymbolKind, VarTarget,
};
use crate::sigs::{lookup_symbol, resolve_type_ref_resolved};
use crate::types::Type;

/// Bindings dropped on some path reaching the current program point.
type DropSet = FxHashSet<BindingId>;

pub(crate) fn run(result: &mut AnalysisResult, handler: &Handler) {
    let modules: Vec<(DottedName, Rc<Module>)> = result
        .unit
        .modules
        .iter()
        .map(|name| (name.clone(), Rc::clone(&result.unit.asts[name])))
        .collect();

    for (module_name, module) in &modules {
        for decl in &module.decls {
            match decl {
                TopDecl::TopLet(l) => check_top_let(result, handler, module_name, l),
                TopDecl::Func(f) if !f.is_extern => {
                    check_function(result, handler, module_name, f);
                }
                _ => {}
            }
        }
    }
}

/// Top-level `let` initializers are restricted to literals so the backend
/// can emit them as C static initializers.
fn check_top_let(
    result: &mut AnalysisResult,
    handler: &Handler,
    module: &DottedName,
    decl: &l0c_par::ast::TopLetDecl,
) {
    let declared = result
        .let_types
        .get(&(module.clone(), decl.name.clone()))
        .cloned()
        .unwrap_or(Type::Int);

    let literal_ty = literal_type(&decl.init, Some(&declared));
    match literal_ty {
        Some(found) => {
            record_literal_types(result, &decl.init, &found);
            if !compatible(&declared, &found) {
                handler.emit(
                    Diagnostic::error(
                        codes::TYP_MISMATCH,
                        format!(
                            "top-level `let {}` is declared `{}` but initialized with `{}`",
                            decl.name, declared, found
                        ),
                    )
                    .with_span(decl.init.span)
                    .with_module(module.clone()),
                );
            }
        }
        None => {
            handler.emit(
                Diagnostic::error(
                    codes::TYP_TOP_LET_NOT_LITERAL,
                    format!(
                        "top-level `let {}` must be initialized with a literal",
                        decl.name
                    ),
                )
                .with_span(decl.init.span)
                .with_module(module.clone()),
            );
            record_literal_types(result, &decl.init, &declared);
        }
    }
}

/// Structural literal typing for global initializers.
fn literal_type(expr: &Expr, expected: Option<&Type>) -> Option<Type> {
    match &expr.kind {
        ExprKind::Int(v) if *v <= i32::MAX as i64 => Some(Type::Int),
        ExprKind::Byte(_) => Some(Type::Byte),
        ExprKind::Bool(_) => Some(Type::Bool),
        ExprKind::Str(_) => Some(Type::String),
        ExprKind::Null => expected.filter(|t| t.is_nullable()).cloned(),
        ExprKind::Unary {
            op: UnOp::Neg,
            operand,
        } => match operand.kind {
            ExprKind::Int(v) if v <= 2_147_483_648 => Some(Type::Int),
            _ => None,
        },
        _ => None,
    }
}

/// Record expression types for a literal tree (globals are lowered too, so
/// the every-expression-typed invariant covers them).
fn record_literal_types(result: &mut AnalysisResult, expr: &Expr, ty: &Type) {
    result.expr_types.insert(expr.id, ty.clone());
    if let ExprKind::Unary { operand, .. } = &expr.kind {
        result.expr_types.insert(operand.id, ty.clone());
    }
}

fn check_function(
    result: &mut AnalysisResult,
    handler: &Handler,
    module: &DottedName,
    func: &FuncDecl,
) {
    let key = (module.clone(), func.name.clone());
    let Some(body) = &func.body else { return };

    let env = result.func_envs.remove(&key).unwrap_or_default();
    let ret = result
        .func_types
        .get(&key)
        .map(|sig| sig.result.clone())
        .unwrap_or(Type::Void);

    let mut checker = FnChecker {
        result: &mut *result,
        handler,
        module: module.clone(),
        env,
        ret: ret.clone(),
        loop_depth: 0,
        cleanup_depth: 0,
    };

    let mut state = DropSet::default();
    checker.check_block(body, &mut state);

    if ret != Type::Void && !block_returns(body) {
        handler.emit(
            Diagnostic::error(
                codes::TYP_MISSING_RETURN,
                format!(
                    "function `{}` returns `{}` but not on every control path",
                    func.name, ret
                ),
            )
            .with_span(func.name_span)
            .with_module(module.clone()),
        );
    }

    let env = checker.env;
    result.func_envs.insert(key, env);
}

struct FnChecker<'r, 'h> {
    result: &'r mut AnalysisResult,
    handler: &'h Handler,
    module: DottedName,
    env: FunctionEnv,
    ret: Type,
    loop_depth: usize,
    /// Nonzero while checking `with` cleanup code, where jumps out of the
    /// statement are not allowed.
    cleanup_depth: usize,
}

impl<'r, 'h> FnChecker<'r, 'h> {
    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn check_block(&mut self, block: &Block, state: &mut DropSet) {
        let scope = self
            .env
            .scope_of
            .get(&block.id)
            .copied()
            .unwrap_or(self.env.root);
        for stmt in &block.stmts {
            self.check_stmt(stmt, scope, state);
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt, scope: ScopeId, state: &mut DropSet) {
        match stmt {
            Stmt::Block(block) => self.check_block(block, state),
            Stmt::Let(l) => {
                let declared = l
                    .ty
                    .as_ref()
                    .and_then(|tr| self.resolve_type(tr));
                let init_ty = self.check_expr(&l.init, scope, state, declared.as_ref());

                if init_ty == Type::Void {
                    self.error(
                        codes::TYP_VOID_VALUE,
                        "cannot bind a `void` value".to_string(),
                        l.init.span,
                    );
                }
                if let Some(declared) = &declared {
                    if !compatible(declared, &init_ty) {
                        self.error(
                            codes::TYP_MISMATCH,
                            format!("expected `{}`, found `{}`", declared, init_ty),
                            l.init.span,
                        );
                    }
                }

                let final_ty = declared.unwrap_or(init_ty);
                if let Some(&binding) = self.env.binding_of.get(&l.id) {
                    self.env.bindings[binding].ty = Some(final_ty);
                    state.remove(&binding);
                }
            }
            Stmt::Assign(a) => {
                if !is_place_expr(&a.target) {
                    self.error(
                        codes::TYP_NOT_A_PLACE,
                        "assignment target must be a place expression".to_string(),
                        a.target.span,
                    );
                }

                // A plain-variable target is being overwritten, so its
                // dropped state is not a use; assignment restores it.
                let restored = direct_var_binding(&self.env, scope, &a.target);
                let target_ty = self.check_assign_target(&a.target, scope, state);
                let value_ty = self.check_expr(&a.value, scope, state, Some(&target_ty));
                if !compatible(&target_ty, &value_ty) {
                    self.error(
                        codes::TYP_MISMATCH,
                        format!("cannot assign `{}` to `{}`", value_ty, target_ty),
                        a.value.span,
                    );
                }
                if let Some(binding) = restored {
                    state.remove(&binding);
                }
            }
            Stmt::Expr(e) => {
                self.check_expr(&e.expr, scope, state, None);
            }
            Stmt::If(stmt) => self.check_if(stmt, scope, state),
            Stmt::While(w) => {
                let cond_ty = self.check_expr(&w.cond, scope, state, Some(&Type::Bool));
                self.require_bool(&cond_ty, w.cond.span);

                let mut body_state = state.clone();
                self.loop_depth += 1;
                self.check_block(&w.body, &mut body_state);
                self.loop_depth -= 1;
                state.extend(body_state);
            }
            Stmt::For(f) => {
                let header = self
                    .env
                    .scope_of
                    .get(&f.id)
                    .copied()
                    .unwrap_or(self.env.root);
                if let Some(init) = &f.init {
                    self.check_stmt(init, header, state);
                }
                if let Some(cond) = &f.cond {
                    let cond_ty = self.check_expr(cond, header, state, Some(&Type::Bool));
                    self.require_bool(&cond_ty, cond.span);
                }

                let mut body_state = state.clone();
                self.loop_depth += 1;
                self.check_block(&f.body, &mut body_state);
                if let Some(step) = &f.step {
                    self.check_stmt(step, header, &mut body_state);
                }
                self.loop_depth -= 1;
                state.extend(body_state);
            }
            Stmt::With(w) => {
                let header = self
                    .env
                    .scope_of
                    .get(&w.id)
                    .copied()
                    .unwrap_or(self.env.root);
                for item in &w.items {
                    let declared = item
                        .ty
                        .as_ref()
                        .and_then(|tr| self.resolve_type(tr));
                    let init_ty = self.check_expr(&item.init, header, state, declared.as_ref());
                    if let Some(declared) = &declared {
                        if !compatible(declared, &init_ty) {
                            self.error(
                                codes::TYP_MISMATCH,
                                format!("expected `{}`, found `{}`", declared, init_ty),
                                item.init.span,
                            );
                        }
                    }
                    let final_ty = declared.unwrap_or(init_ty);
                    if let Some(&binding) = self.env.binding_of.get(&item.id) {
                        self.env.bindings[binding].ty = Some(final_ty);
                    }
                    if let Some(cleanup) = &item.cleanup {
                        let mut cleanup_state = state.clone();
                        // Cleanup code may not jump out; loops inside it
                        // start their own nesting.
                        let saved_loops = std::mem::replace(&mut self.loop_depth, 0);
                        self.cleanup_depth += 1;
                        self.check_stmt(cleanup, header, &mut cleanup_state);
                        self.cleanup_depth -= 1;
                        self.loop_depth = saved_loops;
                    }
                }

                self.check_block(&w.body, state);
                if let Some(cleanup) = &w.cleanup {
                    let mut cleanup_state = state.clone();
                    let saved_loops = std::mem::replace(&mut self.loop_depth, 0);
                    self.cleanup_depth += 1;
                    self.check_block(cleanup, &mut cleanup_state);
                    self.cleanup_depth -= 1;
                    self.loop_depth = saved_loops;
                }
            }
            Stmt::Match(m) => self.check_match(m, scope, state),
            Stmt::Case(c) => self.check_case(c, scope, state),
            Stmt::Drop(d) => self.check_drop(d, scope, state),
            Stmt::Break(span) | Stmt::Continue(span) => {
                if self.loop_depth == 0 {
                    if self.cleanup_depth > 0 {
                        self.error(
                            codes::TYP_CLEANUP_JUMP,
                            "`break`/`continue` cannot leave `with` cleanup code".to_string(),
                            *span,
                        );
                    } else {
                        self.error(
                            codes::TYP_LOOP_CONTROL_OUTSIDE_LOOP,
                            "`break`/`continue` outside of a loop".to_string(),
                            *span,
                        );
                    }
                }
            }
            Stmt::Return(r) if self.cleanup_depth > 0 => {
                if let Some(value) = &r.value {
                    self.check_expr(value, scope, state, None);
                }
                self.error(
                    codes::TYP_CLEANUP_JUMP,
                    "`return` cannot leave `with` cleanup code".to_string(),
                    r.span,
                );
            }
            Stmt::Return(r) => match (&r.value, self.ret.clone()) {
                (None, Type::Void) => {}
                (None, ret) => {
                    self.error(
                        codes::TYP_RETURN_MISMATCH,
                        format!("function returns `{}` but `return` has no value", ret),
                        r.span,
                    );
                }
                (Some(value), Type::Void) => {
                    self.check_expr(value, scope, state, None);
                    self.error(
                        codes::TYP_RETURN_MISMATCH,
                        "void function cannot return a value".to_string(),
                        value.span,
                    );
                }
                (Some(value), ret) => {
                    let found = self.check_expr(value, scope, state, Some(&ret));
                    if !compatible(&ret, &found) {
                        self.error(
                            codes::TYP_RETURN_MISMATCH,
                            format!("expected `{}`, found `{}`", ret, found),
                            value.span,
                        );
                    }
                }
            },
        }
    }

    fn check_if(&mut self, stmt: &IfStmt, scope: ScopeId, state: &mut DropSet) {
        let cond_ty = self.check_expr(&stmt.cond, scope, state, Some(&Type::Bool));
        self.require_bool(&cond_ty, stmt.cond.span);

        let mut then_state = state.clone();
        self.check_block(&stmt.then_block, &mut then_state);

        match &stmt.else_branch {
            Some(ElseBranch::Block(block)) => {
                let mut else_state = state.clone();
                self.check_block(block, &mut else_state);
                *state = &then_state | &else_state;
            }
            Some(ElseBranch::If(nested)) => {
                let mut else_state = state.clone();
                self.check_if(nested, scope, &mut else_state);
                *state = &then_state | &else_state;
            }
            None => {
                state.extend(then_state);
            }
        }
    }

    fn check_drop(&mut self, d: &l0c_par::ast::DropStmt, scope: ScopeId, state: &mut DropSet) {
        let target = strip_parens(&d.expr);
        let ExprKind::Var(name) = &target.kind else {
            self.check_expr(&d.expr, scope, state, None);
            self.error(
                codes::TYP_BAD_DROP,
                "`drop` operand must be a local variable".to_string(),
                d.expr.span,
            );
            return;
        };

        let Some(binding) = self.env.lookup(scope, name) else {
            self.check_expr(&d.expr, scope, state, None);
            self.error(
                codes::TYP_BAD_DROP,
                format!("`drop` operand `{}` is not a local variable", name),
                d.expr.span,
            );
            return;
        };

        if state.contains(&binding) {
            self.error(
                codes::TYP_USE_AFTER_DROP,
                format!("`{}` was already dropped on some path", name),
                d.expr.span,
            );
        }

        let ty = self.env.bindings[binding].ty.clone().unwrap_or(Type::Int);
        let is_droppable = matches!(&ty, Type::Pointer(_))
            || matches!(&ty, Type::Nullable(inner) if matches!(&**inner, Type::Pointer(_)));
        if !is_droppable {
            self.error(
                codes::TYP_BAD_DROP,
                format!("`drop` needs a pointer or nullable pointer, found `{}`", ty),
                d.expr.span,
            );
        }

        self.result
            .var_targets
            .insert(target.id, VarTarget::Local(binding));
        // Record every paren layer down to the variable itself.
        let mut cursor = &d.expr;
        loop {
            self.record(cursor.id, ty.clone());
            match &cursor.kind {
                ExprKind::Paren(inner) => cursor = inner,
                _ => break,
            }
        }
        state.insert(binding);
    }

    fn check_match(&mut self, m: &MatchStmt, scope: ScopeId, state: &mut DropSet) {
        let scrut_ty = self.check_expr(&m.scrutinee, scope, state, None);

        // At most one implicit deref to reach the enum value.
        let enum_key = match &scrut_ty {
            Type::Enum { module, name } => Some((module.clone(), name.clone())),
            Type::Pointer(inner) => match &**inner {
                Type::Enum { module, name } => Some((module.clone(), name.clone())),
                _ => None,
            },
            _ => None,
        };

        let info: Option<EnumInfo> = match &enum_key {
            Some(key) => self.result.enum_infos.get(key).cloned(),
            None => {
                self.error(
                    codes::MTC_NOT_AN_ENUM,
                    format!("match scrutinee must be an enum value, found `{}`", scrut_ty),
                    m.scrutinee.span,
                );
                None
            }
        };

        let mut seen: FxHashSet<usize> = FxHashSet::default();
        let mut wildcard_seen = false;
        let mut merged = state.clone();

        for arm in &m.arms {
            if wildcard_seen {
                self.handler.emit(
                    Diagnostic::warning(
                        codes::MTC_UNREACHABLE_ARM,
                        "arm is unreachable: it follows a wildcard".to_string(),
                    )
                    .with_span(arm.pattern.span())
                    .with_module(self.module.clone()),
                );
            }

            match &arm.pattern {
                Pattern::Wildcard(_) => {
                    wildcard_seen = true;
                }
                Pattern::Variant(v) => {
                    // With an unusable scrutinee, still give the named
                    // bindings a recovery type so arm bodies don't cascade.
                    if info.is_none() {
                        let arm_scope = self
                            .env
                            .scope_of
                            .get(&arm.id)
                            .copied()
                            .unwrap_or(self.env.root);
                        for bind in &v.binds {
                            let Some(bind_name) = &bind.name else { continue };
                            if let Some(&binding) =
                                self.env.scopes[arm_scope].bindings.get(bind_name)
                            {
                                self.env.bindings[binding].ty = Some(Type::Int);
                            }
                        }
                    }
                    if let (Some(info), Some((enum_module, enum_name))) = (&info, &enum_key) {
                        let qualifier_ok = match &v.name.module {
                            Some(qualifier) => qualifier == enum_module,
                            None => true,
                        };
                        match info.variant_index(&v.name.name).filter(|_| qualifier_ok) {
                            Some(index) => {
                                if !seen.insert(index) {
                                    self.error(
                                        codes::MTC_DUPLICATE_ARM,
                                        format!("variant `{}` is matched more than once", v.name.name),
                                        v.span,
                                    );
                                }

                                let fields = info.variants[index].fields.clone();
                                if v.binds.len() != fields.len() {
                                    self.error(
                                        codes::MTC_PATTERN_ARITY,
                                        format!(
                                            "pattern binds {} variables but `{}` has {} payload fields",
                                            v.binds.len(),
                                            v.name.name,
                                            fields.len()
                                        ),
                                        v.span,
                                    );
                                }

                                // Type the bound pattern variables.
                                let arm_scope = self
                                    .env
                                    .scope_of
                                    .get(&arm.id)
                                    .copied()
                                    .unwrap_or(self.env.root);
                                for (bind, (_, field_ty)) in v.binds.iter().zip(fields.iter()) {
                                    let Some(bind_name) = &bind.name else { continue };
                                    if let Some(&binding) =
                                        self.env.scopes[arm_scope].bindings.get(bind_name)
                                    {
                                        self.env.bindings[binding].ty = Some(field_ty.clone());
                                    }
                                }
                            }
                            None => {
                                self.error(
                                    codes::MTC_UNKNOWN_VARIANT,
                                    format!(
                                        "`{}` is not a variant of enum `{}`",
                                        v.name.name, enum_name
                                    ),
                                    v.name.span,
                                );
                            }
                        }
                    }
                }
            }

            let mut arm_state = state.clone();
            self.check_block(&arm.body, &mut arm_state);
            merged.extend(arm_state);
        }

        *state = merged;

        if let Some(info) = &info {
            if !wildcard_seen && seen.len() != info.variants.len() {
                let missing: Vec<&str> = info
                    .variants
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| !seen.contains(i))
                    .map(|(_, v)| v.name.as_str())
                    .collect();
                self.error(
                    codes::MTC_NON_EXHAUSTIVE,
                    format!(
                        "match is not exhaustive: missing {}",
                        missing
                            .iter()
                            .map(|n| format!("`{}`", n))
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                    m.match_span,
                );
            }
        }
    }

    fn check_case(&mut self, c: &CaseStmt, scope: ScopeId, state: &mut DropSet) {
        let scrut_ty = self.check_expr(&c.scrutinee, scope, state, None);
        let dispatchable = matches!(
            scrut_ty,
            Type::Int | Type::Byte | Type::Bool | Type::String
        );
        if !dispatchable {
            self.error(
                codes::MTC_CASE_TYPE,
                format!(
                    "`case` dispatches on int, byte, bool, or string, found `{}`",
                    scrut_ty
                ),
                c.scrutinee.span,
            );
        }

        let mut seen: Vec<CaseValue> = Vec::new();
        let mut merged = state.clone();

        for arm in &c.arms {
            match case_literal_value(&arm.literal) {
                Some(value) => {
                    let lit_ty = value.ty();
                    record_case_literal(self.result, &arm.literal, &lit_ty);
                    if dispatchable && lit_ty != scrut_ty {
                        self.error(
                            codes::MTC_CASE_TYPE,
                            format!(
                                "case arm literal is `{}` but the scrutinee is `{}`",
                                lit_ty, scrut_ty
                            ),
                            arm.literal.span,
                        );
                    } else if seen.contains(&value) {
                        self.error(
                            codes::MTC_CASE_DUPLICATE,
                            "duplicate case arm literal".to_string(),
                            arm.literal.span,
                        );
                    } else {
                        seen.push(value);
                    }
                }
                None => {
                    self.check_expr(&arm.literal, scope, state, None);
                    self.error(
                        codes::MTC_CASE_TYPE,
                        "case arm must be a literal".to_string(),
                        arm.literal.span,
                    );
                }
            }

            let mut arm_state = state.clone();
            self.check_block(&arm.body, &mut arm_state);
            merged.extend(arm_state);
        }

        if let Some(default) = &c.default {
            let mut default_state = state.clone();
            self.check_block(default, &mut default_state);
            merged.extend(default_state);
        }

        *state = merged;
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn check_expr(
        &mut self,
        expr: &Expr,
        scope: ScopeId,
        state: &mut DropSet,
        expected: Option<&Type>,
    ) -> Type {
        match &expr.kind {
            ExprKind::Int(v) => {
                if *v > i32::MAX as i64 {
                    self.error(
                        codes::TYP_MISMATCH,
                        format!("integer literal `{}` is out of range for `int`", v),
                        expr.span,
                    );
                }
                self.record(expr.id, Type::Int)
            }
            ExprKind::Byte(_) => self.record(expr.id, Type::Byte),
            ExprKind::Str(_) => self.record(expr.id, Type::String),
            ExprKind::Bool(_) => self.record(expr.id, Type::Bool),
            ExprKind::Null => match expected {
                Some(ty) if ty.is_nullable() => self.record(expr.id, ty.clone()),
                _ => {
                    self.error(
                        codes::TYP_NULL_CONTEXT,
                        "`null` needs a nullable type from context".to_string(),
                        expr.span,
                    );
                    self.record(expr.id, Type::Int.nullable())
                }
            },
            ExprKind::Var(_) | ExprKind::Qualified(_) => {
                self.check_reference(expr, scope, state)
            }
            ExprKind::Unary { op, operand } => self.check_unary(expr, *op, operand, scope, state),
            ExprKind::Binary { op, lhs, rhs } => {
                self.check_binary(expr, *op, lhs, rhs, scope, state)
            }
            ExprKind::Call { callee, args } => self.check_call(expr, callee, args, scope, state),
            ExprKind::Index { target, index } => {
                self.check_expr(target, scope, state, None);
                self.check_expr(index, scope, state, None);
                self.error(
                    codes::TYP_NO_INDEXING,
                    "indexing is not supported: no array or slice types exist yet".to_string(),
                    expr.span,
                );
                self.record(expr.id, recovery(expected))
            }
            ExprKind::Field {
                target,
                field,
                field_span,
            } => self.check_field(expr, target, field, *field_span, scope, state),
            ExprKind::Cast { operand, ty } => self.check_cast(expr, operand, ty, scope, state),
            ExprKind::Try { operand } => {
                let op_ty = self.check_expr(operand, scope, state, None);
                let result_ty = match &op_ty {
                    Type::Nullable(inner) => (**inner).clone(),
                    other => {
                        self.error(
                            codes::TYP_BAD_TRY,
                            format!("operand of `?` must be nullable, found `{}`", other),
                            operand.span,
                        );
                        other.clone()
                    }
                };
                if !self.ret.is_nullable() {
                    self.error(
                        codes::TYP_BAD_TRY,
                        "`?` requires the enclosing function to return a nullable type"
                            .to_string(),
                        expr.span,
                    );
                }
                self.record(expr.id, result_ty)
            }
            ExprKind::New { ty, args } => self.check_new(expr, ty, args, scope, state),
            ExprKind::Paren(inner) => {
                let ty = self.check_expr(inner, scope, state, expected);
                self.record(expr.id, ty)
            }
            ExprKind::TypeExpr(tr) => {
                // Only valid as the argument of `sizeof`; the call case
                // consumes it there. Anywhere else it is an error.
                let denoted = self.resolve_type(tr).unwrap_or(Type::Int);
                self.error(
                    codes::TYP_MISMATCH,
                    "a type cannot be used as a value here".to_string(),
                    expr.span,
                );
                self.record(expr.id, denoted)
            }
        }
    }

    /// `Var` and `Qualified` references.
    fn check_reference(&mut self, expr: &Expr, scope: ScopeId, state: &mut DropSet) -> Type {
        // Locals first (unqualified only).
        if let ExprKind::Var(name) = &expr.kind {
            if name == "sizeof" {
                self.error(
                    codes::TYP_BAD_SIZEOF,
                    "`sizeof` must be called with a single type argument".to_string(),
                    expr.span,
                );
                return self.record(expr.id, Type::Int);
            }
            if let Some(binding) = self.env.lookup(scope, name) {
                if state.contains(&binding) {
                    self.error(
                        codes::TYP_USE_AFTER_DROP,
                        format!("`{}` was dropped and not reassigned", name),
                        expr.span,
                    );
                }
                self.result
                    .var_targets
                    .insert(expr.id, VarTarget::Local(binding));
                let ty = match self.env.bindings[binding].ty.clone() {
                    Some(ty) => ty,
                    None => {
                        self.error(
                            codes::TYP_UNKNOWN_VALUE,
                            format!("`{}` is used before its declaration completes", name),
                            expr.span,
                        );
                        Type::Int
                    }
                };
                return self.record(expr.id, ty);
            }
        }

        let qual = reference_qual_name(expr);
        let Some(qual) = qual else {
            return self.record(expr.id, Type::Int);
        };
        if !qual.extra.is_empty() {
            self.error(
                codes::NAM_MULTI_SEGMENT,
                format!("`{}` has more than one `::` segment", qual.name),
                expr.span,
            );
            return self.record(expr.id, Type::Int);
        }

        let Some(symbol_id) = lookup_symbol(
            self.result,
            self.handler,
            &self.module,
            &qual,
            codes::NAM_UNKNOWN_NAME,
        ) else {
            return self.record(expr.id, Type::Int);
        };

        let symbol = self.result.symbols[symbol_id].clone();
        match symbol.kind {
            SymbolKind::Let => {
                self.result.var_targets.insert(
                    expr.id,
                    VarTarget::TopLet(symbol.module.clone(), symbol.name.clone()),
                );
                self.record(expr.id, symbol.ty.unwrap_or(Type::Int))
            }
            SymbolKind::Func => {
                self.result.var_targets.insert(
                    expr.id,
                    VarTarget::Func(symbol.module.clone(), symbol.name.clone()),
                );
                self.record(expr.id, symbol.ty.unwrap_or(Type::Int))
            }
            SymbolKind::EnumVariant => {
                let Some(Type::Func { params, result }) = &symbol.ty else {
                    return self.record(expr.id, Type::Int);
                };
                let Type::Enum { module, name } = &**result else {
                    return self.record(expr.id, Type::Int);
                };
                self.result.var_targets.insert(
                    expr.id,
                    VarTarget::EnumVariant {
                        module: module.clone(),
                        enum_name: name.clone(),
                        variant_index: symbol.variant_index.unwrap_or(0),
                    },
                );
                if params.is_empty() {
                    // A bare zero-payload variant reference is an implicit
                    // constructor call.
                    self.record(expr.id, (**result).clone())
                } else {
                    self.error(
                        codes::TYP_WRONG_ARITY,
                        format!(
                            "variant `{}` carries a payload and must be called",
                            symbol.name
                        ),
                        expr.span,
                    );
                    self.record(expr.id, (**result).clone())
                }
            }
            SymbolKind::Struct | SymbolKind::Enum | SymbolKind::TypeAlias => {
                self.error(
                    codes::TYP_UNKNOWN_VALUE,
                    format!("`{}` is a type, not a value", symbol.name),
                    expr.span,
                );
                self.record(expr.id, Type::Int)
            }
        }
    }

    fn check_unary(
        &mut self,
        expr: &Expr,
        op: UnOp,
        operand: &Expr,
        scope: ScopeId,
        state: &mut DropSet,
    ) -> Type {
        // `-<int literal>` folds, so INT_MIN is expressible.
        if op == UnOp::Neg {
            if let ExprKind::Int(v) = operand.kind {
                self.record(operand.id, Type::Int);
                if v > 2_147_483_648 {
                    // The parser already reported the oversized literal.
                }
                return self.record(expr.id, Type::Int);
            }
        }

        let op_ty = self.check_expr(operand, scope, state, None);
        let result_ty = match op {
            UnOp::Neg => {
                if op_ty.is_numeric() {
                    op_ty
                } else {
                    self.error(
                        codes::TYP_BAD_UNARY,
                        format!("unary `-` needs int or byte, found `{}`", op_ty),
                        expr.span,
                    );
                    Type::Int
                }
            }
            UnOp::Not => {
                if op_ty != Type::Bool {
                    self.error(
                        codes::TYP_BAD_UNARY,
                        format!("`!` needs bool, found `{}`", op_ty),
                        expr.span,
                    );
                }
                Type::Bool
            }
            UnOp::BitNot => {
                if op_ty != Type::Int {
                    self.error(
                        codes::TYP_BAD_UNARY,
                        format!("`~` needs int, found `{}`", op_ty),
                        expr.span,
                    );
                }
                Type::Int
            }
            UnOp::Deref => match &op_ty {
                Type::Pointer(inner) => (**inner).clone(),
                Type::Nullable(inner) if matches!(&**inner, Type::Pointer(_)) => {
                    self.error(
                        codes::TYP_BAD_DEREF,
                        "cannot dereference a nullable pointer; narrow it first".to_string(),
                        expr.span,
                    );
                    match &**inner {
                        Type::Pointer(pointee) => (**pointee).clone(),
                        _ => Type::Int,
                    }
                }
                other => {
                    self.error(
                        codes::TYP_BAD_DEREF,
                        format!("cannot dereference `{}`", other),
                        expr.span,
                    );
                    Type::Int
                }
            },
        };
        self.record(expr.id, result_ty)
    }

    fn check_binary(
        &mut self,
        expr: &Expr,
        op: l0c_par::ast::BinOp,
        lhs: &Expr,
        rhs: &Expr,
        scope: ScopeId,
        state: &mut DropSet,
    ) -> Type {
        use l0c_par::ast::BinOp;

        let lt = self.check_expr(lhs, scope, state, None);
        let rt = self.check_expr(rhs, scope, state, None);

        if op.is_reserved() {
            self.error(
                codes::TYP_RESERVED_OPERATOR,
                format!(
                    "operator `{}` is reserved until its defined-behavior bounds are enforced",
                    op.symbol()
                ),
                expr.span,
            );
            return self.record(expr.id, Type::Int);
        }

        let result_ty = match op {
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => {
                if lt.is_numeric() && rt.is_numeric() {
                    if lt == rt {
                        lt
                    } else {
                        // Mixed int/byte arithmetic widens to int.
                        Type::Int
                    }
                } else {
                    self.bad_binary(op, &lt, &rt, expr.span);
                    Type::Int
                }
            }
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                if !(lt.is_numeric() && rt.is_numeric()) {
                    self.bad_binary(op, &lt, &rt, expr.span);
                }
                Type::Bool
            }
            BinOp::Eq | BinOp::Ne => {
                let ok = (lt == rt && lt.is_eq_builtin()) || (lt.is_numeric() && rt.is_numeric());
                if !ok {
                    self.bad_binary(op, &lt, &rt, expr.span);
                }
                Type::Bool
            }
            BinOp::And | BinOp::Or => {
                if lt != Type::Bool || rt != Type::Bool {
                    self.bad_binary(op, &lt, &rt, expr.span);
                }
                Type::Bool
            }
            BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::Shl | BinOp::Shr => {
                unreachable!("reserved operators returned above")
            }
        };
        self.record(expr.id, result_ty)
    }

    fn check_call(
        &mut self,
        expr: &Expr,
        callee: &Expr,
        args: &[Expr],
        scope: ScopeId,
        state: &mut DropSet,
    ) -> Type {
        // sizeof intrinsic.
        if let ExprKind::Var(name) = &callee.kind {
            if name == "sizeof" && self.env.lookup(scope, name).is_none() {
                return self.check_sizeof(expr, callee, args, scope, state);
            }
        }

        // Enum variant constructors get their own path so the bare-callee
        // arity error does not fire for payload variants.
        if let Some(qual) = reference_qual_name(callee) {
            if qual.extra.is_empty() && !is_local(&self.env, scope, callee) {
                if let Some(symbol_id) = peek_symbol(self.result, &self.module, &qual) {
                    if self.result.symbols[symbol_id].kind == SymbolKind::EnumVariant {
                        return self.check_variant_ctor(expr, callee, symbol_id, args, scope, state);
                    }
                }
            }
        }

        let callee_ty = self.check_expr(callee, scope, state, None);
        let Type::Func { params, result } = callee_ty else {
            self.error(
                codes::TYP_NOT_CALLABLE,
                format!("`{}` is not callable", callee_ty),
                callee.span,
            );
            for arg in args {
                self.check_expr(arg, scope, state, None);
            }
            return self.record(expr.id, Type::Int);
        };

        self.check_args(&params, args, expr.span, scope, state);
        self.record(expr.id, (*result).clone())
    }

    fn check_sizeof(
        &mut self,
        expr: &Expr,
        callee: &Expr,
        args: &[Expr],
        scope: ScopeId,
        state: &mut DropSet,
    ) -> Type {
        self.record(
            callee.id,
            Type::Func {
                params: Vec::new(),
                result: Box::new(Type::Int),
            },
        );

        match args {
            [arg] => match &arg.kind {
                ExprKind::TypeExpr(tr) => {
                    let denoted = self.resolve_type(tr).unwrap_or(Type::Int);
                    self.record(arg.id, denoted);
                    self.result
                        .intrinsic_targets
                        .insert(expr.id, Intrinsic::Sizeof);
                }
                _ => {
                    self.check_expr(arg, scope, state, None);
                    self.error(
                        codes::TYP_BAD_SIZEOF,
                        "`sizeof` takes a type argument, e.g. `sizeof(Point*)`".to_string(),
                        arg.span,
                    );
                }
            },
            _ => {
                for arg in args {
                    self.check_expr(arg, scope, state, None);
                }
                self.error(
                    codes::TYP_BAD_SIZEOF,
                    "`sizeof` takes exactly one type argument".to_string(),
                    expr.span,
                );
            }
        }
        self.record(expr.id, Type::Int)
    }

    fn check_variant_ctor(
        &mut self,
        expr: &Expr,
        callee: &Expr,
        symbol_id: crate::analysis::SymbolId,
        args: &[Expr],
        scope: ScopeId,
        state: &mut DropSet,
    ) -> Type {
        let symbol = self.result.symbols[symbol_id].clone();
        let Some(Type::Func { params, result }) = &symbol.ty else {
            return self.record(expr.id, Type::Int);
        };
        let result_ty = (**result).clone();

        if let Type::Enum { module, name } = &result_ty {
            self.result.var_targets.insert(
                callee.id,
                VarTarget::EnumVariant {
                    module: module.clone(),
                    enum_name: name.clone(),
                    variant_index: symbol.variant_index.unwrap_or(0),
                },
            );
        }
        self.record(callee.id, symbol.ty.clone().unwrap_or(Type::Int));

        self.check_args(&params.clone(), args, expr.span, scope, state);
        self.record(expr.id, result_ty)
    }

    fn check_args(
        &mut self,
        params: &[Type],
        args: &[Expr],
        call_span: Span,
        scope: ScopeId,
        state: &mut DropSet,
    ) {
        if params.len() != args.len() {
            self.error(
                codes::TYP_WRONG_ARITY,
                format!("expected {} arguments, found {}", params.len(), args.len()),
                call_span,
            );
        }
        for (i, arg) in args.iter().enumerate() {
            if let ExprKind::TypeExpr(tr) = &arg.kind {
                let denoted = self.resolve_type(tr).unwrap_or(Type::Int);
                self.record(arg.id, denoted);
                self.error(
                    codes::TYP_MISMATCH,
                    "a type argument is only valid in `sizeof`".to_string(),
                    arg.span,
                );
                continue;
            }
            let expected = params.get(i);
            let found = self.check_expr(arg, scope, state, expected);
            if let Some(expected) = expected {
                if !compatible(expected, &found) {
                    self.error(
                        codes::TYP_MISMATCH,
                        format!("expected `{}`, found `{}`", expected, found),
                        arg.span,
                    );
                }
            }
        }
    }

    fn check_field(
        &mut self,
        expr: &Expr,
        target: &Expr,
        field: &str,
        field_span: Span,
        scope: ScopeId,
        state: &mut DropSet,
    ) -> Type {
        let target_ty = self.check_expr(target, scope, state, None);

        if matches!(&target_ty, Type::Nullable(inner) if matches!(&**inner, Type::Pointer(_))) {
            self.error(
                codes::TYP_BAD_FIELD_ACCESS,
                "field access through a nullable pointer; narrow it first".to_string(),
                field_span,
            );
            return self.record(expr.id, Type::Int);
        }

        // Exactly one implicit pointer hop.
        let base = match &target_ty {
            Type::Pointer(inner) => (**inner).clone(),
            other => other.clone(),
        };

        let Type::Struct { module, name } = &base else {
            self.error(
                codes::TYP_BAD_FIELD_ACCESS,
                format!("`{}` has no fields", target_ty),
                field_span,
            );
            return self.record(expr.id, Type::Int);
        };

        let key = (module.clone(), name.clone());
        let field_ty = self
            .result
            .struct_infos
            .get(&key)
            .and_then(|info| {
                info.fields
                    .iter()
                    .find(|(n, _)| n == field)
                    .map(|(_, t)| t.clone())
            });

        match field_ty {
            Some(ty) => self.record(expr.id, ty),
            None => {
                self.error(
                    codes::TYP_BAD_FIELD_ACCESS,
                    format!("struct `{}` has no field `{}`", name, field),
                    field_span,
                );
                self.record(expr.id, Type::Int)
            }
        }
    }

    fn check_cast(
        &mut self,
        expr: &Expr,
        operand: &Expr,
        tr: &l0c_par::ast::TypeRef,
        scope: ScopeId,
        state: &mut DropSet,
    ) -> Type {
        let target = self.resolve_type(tr);
        let source = self.check_expr(operand, scope, state, target.as_ref());
        let Some(target) = target else {
            return self.record(expr.id, source);
        };

        let ok = source == target
            || matches!(&source, Type::Nullable(inner) if **inner == target)
            || matches!(&target, Type::Nullable(inner) if **inner == source)
            || (source == Type::Int && target == Type::Byte)
            || (source == Type::Byte && target == Type::Int);

        if !ok {
            self.error(
                codes::TYP_BAD_CAST,
                format!("no conversion from `{}` to `{}`", source, target),
                expr.span,
            );
        }
        self.record(expr.id, target)
    }

    fn check_new(
        &mut self,
        expr: &Expr,
        ty_name: &l0c_par::ast::QualName,
        args: &[Expr],
        scope: ScopeId,
        state: &mut DropSet,
    ) -> Type {
        let symbol_id = if ty_name.extra.is_empty() {
            lookup_symbol(
                self.result,
                self.handler,
                &self.module,
                ty_name,
                codes::NAM_UNKNOWN_NAME,
            )
        } else {
            self.error(
                codes::NAM_MULTI_SEGMENT,
                format!("`{}` has more than one `::` segment", ty_name.name),
                ty_name.span,
            );
            None
        };

        let struct_key = symbol_id.and_then(|id| {
            let symbol = &self.result.symbols[id];
            match (&symbol.kind, &symbol.ty) {
                (SymbolKind::Struct, _) => Some((symbol.module.clone(), symbol.name.clone())),
                (SymbolKind::TypeAlias, Some(Type::Struct { module, name })) => {
                    Some((module.clone(), name.clone()))
                }
                _ => None,
            }
        });

        let Some(key) = struct_key else {
            if symbol_id.is_some() {
                self.error(
                    codes::TYP_BAD_NEW,
                    format!("`new` needs a struct type, `{}` is not one", ty_name.name),
                    ty_name.span,
                );
            }
            for arg in args {
                self.check_expr(arg, scope, state, None);
            }
            return self.record(expr.id, recovery(None));
        };

        let fields = self.result.struct_infos[&key].fields.clone();
        if !args.is_empty() {
            if args.len() != fields.len() {
                self.error(
                    codes::TYP_BAD_NEW,
                    format!(
                        "`new {}` takes zero or {} arguments, found {}",
                        key.1,
                        fields.len(),
                        args.len()
                    ),
                    expr.span,
                );
            }
            for (i, arg) in args.iter().enumerate() {
                let expected = fields.get(i).map(|(_, t)| t);
                let found = self.check_expr(arg, scope, state, expected);
                if let Some(expected) = expected {
                    if !compatible(expected, &found) {
                        self.error(
                            codes::TYP_MISMATCH,
                            format!("expected `{}`, found `{}`", expected, found),
                            arg.span,
                        );
                    }
                }
            }
        }

        let struct_ty = Type::Struct {
            module: key.0,
            name: key.1,
        };
        self.record(expr.id, Type::Pointer(Box::new(struct_ty)))
    }

    /// Type an assignment target, without treating a dropped plain variable
    /// as a use (the assignment restores it).
    fn check_assign_target(&mut self, target: &Expr, scope: ScopeId, state: &mut DropSet) -> Type {
        match &target.kind {
            ExprKind::Var(name) => {
                if let Some(binding) = self.env.lookup(scope, name) {
                    self.result
                        .var_targets
                        .insert(target.id, VarTarget::Local(binding));
                    let ty = self.env.bindings[binding].ty.clone().unwrap_or(Type::Int);
                    return self.record(target.id, ty);
                }
                self.check_expr(target, scope, state, None)
            }
            ExprKind::Paren(inner) => {
                let ty = self.check_assign_target(inner, scope, state);
                self.record(target.id, ty)
            }
            _ => self.check_expr(target, scope, state, None),
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn resolve_type(&mut self, tr: &l0c_par::ast::TypeRef) -> Option<Type> {
        resolve_type_ref_resolved(self.result, self.handler, &self.module, tr, false)
    }

    fn record(&mut self, id: l0c_par::ast::NodeId, ty: Type) -> Type {
        self.result.expr_types.insert(id, ty.clone());
        ty
    }

    fn require_bool(&mut self, ty: &Type, span: Span) {
        if *ty != Type::Bool {
            self.error(
                codes::TYP_CONDITION_NOT_BOOL,
                format!("condition must be `bool`, found `{}`", ty),
                span,
            );
        }
    }

    fn bad_binary(&mut self, op: l0c_par::ast::BinOp, lt: &Type, rt: &Type, span: Span) {
        self.error(
            codes::TYP_BAD_BINARY,
            format!(
                "operator `{}` cannot be applied to `{}` and `{}`",
                op.symbol(),
                lt,
                rt
            ),
            span,
        );
    }

    fn error(&self, code: DiagnosticCode, message: String, span: Span) {
        self.handler.emit(
            Diagnostic::error(code, message)
                .with_span(span)
                .with_module(self.module.clone()),
        );
    }
}

// ---------------------------------------------------------------------------
// Free helpers
// ---------------------------------------------------------------------------

/// Recovery type when checking already failed.
fn recovery(expected: Option<&Type>) -> Type {
    expected.cloned().unwrap_or(Type::Int)
}

/// Nullable widening: `T` is acceptable where `T?` is expected.
fn compatible(expected: &Type, found: &Type) -> bool {
    expected == found
        || matches!(expected, Type::Nullable(inner) if **inner == *found)
}

/// Place expressions: variable, deref, field access, possibly parenthesized.
fn is_place_expr(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Var(_) | ExprKind::Qualified(_) | ExprKind::Field { .. } => true,
        ExprKind::Unary {
            op: UnOp::Deref, ..
        } => true,
        ExprKind::Paren(inner) => is_place_expr(inner),
        _ => false,
    }
}

fn strip_parens(expr: &Expr) -> &Expr {
    match &expr.kind {
        ExprKind::Paren(inner) => strip_parens(inner),
        _ => expr,
    }
}

/// The binding a plain-variable expression refers to, if any.
fn direct_var_binding(env: &FunctionEnv, scope: ScopeId, expr: &Expr) -> Option<BindingId> {
    match &strip_parens(expr).kind {
        ExprKind::Var(name) => env.lookup(scope, name),
        _ => None,
    }
}

/// Is `expr` a reference shadowed by a local binding?
fn is_local(env: &FunctionEnv, scope: ScopeId, expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Var(name) => env.lookup(scope, name).is_some(),
        _ => false,
    }
}

/// A reference expression's qualified name, if it is one.
fn reference_qual_name(expr: &Expr) -> Option<l0c_par::ast::QualName> {
    match &expr.kind {
        ExprKind::Var(name) => Some(l0c_par::ast::QualName::plain(name.clone(), expr.span)),
        ExprKind::Qualified(qual) => Some(qual.clone()),
        _ => None,
    }
}

/// Resolve a reference to a symbol without emitting diagnostics, for the
/// constructor-call peek.
fn peek_symbol(
    result: &AnalysisResult,
    module: &DottedName,
    name: &l0c_par::ast::QualName,
) -> Option<crate::analysis::SymbolId> {
    match &name.module {
        Some(qualifier) => {
            let importing = qualifier == module
                || result
                    .unit
                    .asts
                    .get(module)
                    .map(|m| m.imports.iter().any(|i| &i.name == qualifier))
                    .unwrap_or(false);
            if !importing {
                return None;
            }
            result
                .module_envs
                .get(qualifier)
                .and_then(|env| env.locals.get(&name.name).copied())
        }
        None => match result.module_envs.get(module)?.lookup(&name.name) {
            crate::analysis::Lookup::Local(id) | crate::analysis::Lookup::Imported(id) => Some(id),
            _ => None,
        },
    }
}

/// Literal value of a `case` arm.
#[derive(Clone, Debug, PartialEq, Eq)]
enum CaseValue {
    Int(i64),
    Byte(u8),
    Bool(bool),
    Str(Vec<u8>),
}

impl CaseValue {
    fn ty(&self) -> Type {
        match self {
            CaseValue::Int(_) => Type::Int,
            CaseValue::Byte(_) => Type::Byte,
            CaseValue::Bool(_) => Type::Bool,
            CaseValue::Str(_) => Type::String,
        }
    }
}

fn case_literal_value(expr: &Expr) -> Option<CaseValue> {
    match &expr.kind {
        ExprKind::Int(v) => Some(CaseValue::Int(*v)),
        ExprKind::Byte(b) => Some(CaseValue::Byte(*b)),
        ExprKind::Bool(b) => Some(CaseValue::Bool(*b)),
        ExprKind::Str(bytes) => Some(CaseValue::Str(bytes.clone())),
        ExprKind::Unary {
            op: UnOp::Neg,
            operand,
        } => match &operand.kind {
            ExprKind::Int(v) => Some(CaseValue::Int(-v)),
            _ => None,
        },
        ExprKind::Paren(inner) => case_literal_value(inner),
        _ => None,
    }
}

fn record_case_literal(result: &mut AnalysisResult, expr: &Expr, ty: &Type) {
    result.expr_types.insert(expr.id, ty.clone());
    match &expr.kind {
        ExprKind::Unary { operand, .. } => record_case_literal(result, operand, ty),
        ExprKind::Paren(inner) => record_case_literal(result, inner, ty),
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Return-path analysis
// ---------------------------------------------------------------------------

/// Does every control path through the block end in a `return`?
///
/// Conservative: loops never count, `break`/`continue` do not count, a
/// `match` counts when every arm returns (a non-exhaustive match already has
/// its own error), a `case` needs an `else` arm.
pub fn block_returns(block: &Block) -> bool {
    block.stmts.iter().any(stmt_returns)
}

/// Does this single statement guarantee a `return` on every path through it?
pub fn stmt_returns(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Return(_) => true,
        Stmt::Block(block) => block_returns(block),
        Stmt::If(stmt) => if_returns(stmt),
        Stmt::Match(m) => !m.arms.is_empty() && m.arms.iter().all(|arm| block_returns(&arm.body)),
        Stmt::Case(c) => {
            c.default.as_ref().is_some_and(block_returns)
                && c.arms.iter().all(|arm| block_returns(&arm.body))
        }
        Stmt::With(w) => block_returns(&w.body),
        _ => false,
    }
}

fn if_returns(stmt: &IfStmt) -> bool {
    let then_returns = block_returns(&stmt.then_block);
    match &stmt.else_branch {
        Some(ElseBranch::Block(block)) => then_returns && block_returns(block),
        Some(ElseBranch::If(nested)) => then_returns && if_returns(nested),
        None => false,
    }
}
