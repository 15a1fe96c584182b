//! Statement and expression lowering to C99.
//!
//! One [`FuncLowerer`] per function walks the typed AST and writes C. The
//! load-bearing machinery is the frame stack: every lexical scope pushes a
//! frame recording its owned ARC bindings (released in reverse declaration
//! order on exit) and its pending `with` cleanups (run LIFO after the
//! releases). `return`, `break`, `continue`, and `?` early exits emit the
//! pending cleanups for every frame they leave before jumping.
//!
//! Ownership rules:
//! - copying from a place expression at an ownership-taking site retains;
//! - a fresh rvalue (call result, constructor) moves in without a retain;
//! - fresh ARC rvalues in borrowing positions are materialized into
//!   anonymous owned temporaries so scope exit releases them;
//! - `opt as T` and `opt?` keep their operand's place-ness, so unwrapped
//!   place values retain-copy instead of double-owning;
//! - returning an owned local moves it out (its release is skipped);
//! - assigning to an ARC parameter promotes it to owned without releasing
//!   the borrowed value it arrived with.
//!
//! Loops lower to `for (;;)` with `goto` break/continue targets, so a
//! `break` inside a lowered `switch` still exits the loop.

use rustc_hash::FxHashSet;

use l0c_par::ast::{Block, Expr, ExprKind, FuncDecl, NodeId, Pattern, Stmt, UnOp};
use l0c_sem::{
    AnalysisResult, BindingId, BindingKind, FunctionEnv, Intrinsic, Type, VarTarget,
};
use l0c_util::{DottedName, Span};

use crate::cwriter::CWriter;
use crate::error::{CodegenError, Result};
use crate::types::{
    cdecl, ctype, emit_arc_op, mangle_item, mangle_local, opt_name, release_helper, tag_const,
    type_name,
};
use crate::LitTable;

/// One lexical scope on the cleanup stack.
struct Frame<'ast> {
    kind: FrameKind,
    /// Owned ARC bindings, in declaration order.
    owned: Vec<Owned>,
    /// Pending `with` cleanups, in registration order.
    withs: Vec<WithCleanup<'ast>>,
}

#[derive(Clone, PartialEq)]
enum FrameKind {
    /// Function top: parameters promoted to owned live here.
    Top,
    /// Plain block scope.
    Block,
    /// Loop scope: `break`/`continue` jump to these labels.
    Loop { brk: String, cont: String },
}

#[derive(Clone)]
struct Owned {
    binding: Option<BindingId>,
    c_name: String,
    ty: Type,
}

#[derive(Clone, Copy)]
enum WithCleanup<'ast> {
    Inline(&'ast Stmt),
    Block(&'ast Block),
}

impl<'ast> Frame<'ast> {
    fn new(kind: FrameKind) -> Self {
        Self {
            kind,
            owned: Vec::new(),
            withs: Vec::new(),
        }
    }
}

/// A lowered expression: the C text plus its place/rvalue classification.
pub(crate) struct LoweredExpr {
    pub c: String,
    pub place: bool,
}

impl LoweredExpr {
    fn place(c: String) -> Self {
        Self { c, place: true }
    }
    fn rvalue(c: String) -> Self {
        Self { c, place: false }
    }
}

/// Lowers one function to C.
pub(crate) struct FuncLowerer<'a, 'ast> {
    analysis: &'a AnalysisResult,
    env: &'a FunctionEnv,
    literals: &'a mut LitTable,
    w: CWriter,
    frames: Vec<Frame<'ast>>,
    tmp: u32,
    labels: u32,
    ret: Type,
    line_directives: bool,
    file_path: String,
    /// Parameters promoted to owned by assignment.
    promoted: FxHashSet<BindingId>,
}

impl<'a, 'ast> FuncLowerer<'a, 'ast> {
    /// Lower a non-extern function to its full C definition.
    pub(crate) fn lower_function(
        analysis: &'a AnalysisResult,
        literals: &'a mut LitTable,
        module: &'a DottedName,
        func: &'ast FuncDecl,
        line_directives: bool,
        file_path: &str,
    ) -> Result<String> {
        let key = (module.clone(), func.name.clone());
        let body = func
            .body
            .as_ref()
            .ok_or_else(|| CodegenError::BadShape(format!("extern `{}` lowered", func.name)))?;
        let env = analysis
            .func_envs
            .get(&key)
            .ok_or_else(|| CodegenError::BadShape(format!("no scope env for `{}`", func.name)))?;
        let sig = analysis
            .func_types
            .get(&key)
            .ok_or_else(|| CodegenError::BadShape(format!("no signature for `{}`", func.name)))?;

        let mut lowerer = FuncLowerer {
            analysis,
            env,
            literals,
            w: CWriter::new(),
            frames: Vec::new(),
            tmp: 0,
            labels: 0,
            ret: sig.result.clone(),
            line_directives,
            file_path: file_path.to_string(),
            promoted: FxHashSet::default(),
        };

        lowerer.emit_line_directive(func.span);
        let params: Vec<String> = func
            .params
            .iter()
            .zip(&sig.params)
            .map(|(p, ty)| cdecl(ty, &mangle_local(&p.name)))
            .collect();
        let params = if params.is_empty() {
            "void".to_string()
        } else {
            params.join(", ")
        };
        lowerer.w.line(&format!(
            "static {} {{",
            signature(&sig.result, &mangle_item(module, &func.name), &params)
        ));

        lowerer.frames.push(Frame::new(FrameKind::Top));
        let terminated = lowerer.lower_block(body)?;
        if !terminated {
            lowerer.w.indent();
            lowerer.emit_frame_exit(0, None)?;
            lowerer.w.dedent();
        }
        lowerer.frames.pop();

        lowerer.w.line("}");
        Ok(lowerer.w.finish())
    }

    // -----------------------------------------------------------------------
    // Blocks and frames
    // -----------------------------------------------------------------------

    /// Lower a block's statements inside the caller's braces. Returns true
    /// when control cannot reach the end of the block.
    fn lower_block(&mut self, block: &'ast Block) -> Result<bool> {
        self.w.indent();
        self.frames.push(Frame::new(FrameKind::Block));

        let mut terminated = false;
        for stmt in &block.stmts {
            if terminated {
                // Unreachable; the checker accepted it, nothing to emit.
                break;
            }
            terminated = self.lower_stmt(stmt)?;
        }

        if !terminated {
            self.emit_frame_exit(self.frames.len() - 1, None)?;
        }
        self.frames.pop();
        self.w.dedent();
        Ok(terminated)
    }

    /// Emit one frame's scope-exit code: owned releases in reverse
    /// declaration order, then pending `with` cleanups LIFO.
    fn emit_frame_exit(&mut self, index: usize, skip: Option<BindingId>) -> Result<()> {
        let owned = self.frames[index].owned.clone();
        let withs = self.frames[index].withs.clone();

        for entry in owned.iter().rev() {
            if skip.is_some() && entry.binding == skip {
                continue;
            }
            emit_arc_op(self.analysis, &mut self.w, &entry.c_name, &entry.ty, false);
        }
        for cleanup in withs.iter().rev() {
            match cleanup {
                WithCleanup::Inline(stmt) => {
                    self.lower_stmt(stmt)?;
                }
                WithCleanup::Block(block) => {
                    self.w.line("{");
                    self.lower_block(block)?;
                    self.w.line("}");
                }
            }
        }
        Ok(())
    }

    /// Emit scope exits for every live frame, innermost first. Used by
    /// `return` and the `?` early exit.
    fn emit_all_exits(&mut self, skip: Option<BindingId>) -> Result<()> {
        for index in (0..self.frames.len()).rev() {
            self.emit_frame_exit(index, skip)?;
        }
        Ok(())
    }

    /// Emit scope exits for frames inside the innermost loop (exclusive);
    /// the loop frame's own cleanup runs after its break label.
    fn emit_exits_to_loop(&mut self) -> Result<Option<(String, String)>> {
        let Some(loop_index) = self
            .frames
            .iter()
            .rposition(|f| matches!(f.kind, FrameKind::Loop { .. }))
        else {
            return Ok(None);
        };
        for index in ((loop_index + 1)..self.frames.len()).rev() {
            self.emit_frame_exit(index, None)?;
        }
        let FrameKind::Loop { brk, cont } = self.frames[loop_index].kind.clone() else {
            unreachable!();
        };
        Ok(Some((brk, cont)))
    }

    fn current_frame(&mut self) -> &mut Frame<'ast> {
        self.frames.last_mut().expect("frame stack is never empty")
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    /// Lower one statement; returns true when it unconditionally leaves the
    /// enclosing scope (so following cleanup would be unreachable).
    fn lower_stmt(&mut self, stmt: &'ast Stmt) -> Result<bool> {
        self.emit_line_directive(stmt.span());
        match stmt {
            Stmt::Block(block) => {
                self.w.line("{");
                let terminated = self.lower_block(block)?;
                self.w.line("}");
                Ok(terminated)
            }
            Stmt::Let(l) => {
                let binding = self
                    .env
                    .binding_of
                    .get(&l.id)
                    .copied()
                    .ok_or_else(|| CodegenError::BadShape(format!("unbound let `{}`", l.name)))?;
                let ty = self.binding_type(binding)?;
                let c_name = mangle_local(&l.name);

                let init_ty = self.expr_ty(l.init.id)?;
                let init = self.lower_expr(&l.init)?;
                let init_c = widen(init.c, &init_ty, &ty);
                self.w
                    .line(&format!("{} = {};", cdecl(&ty, &c_name), init_c));
                self.take_ownership(binding, &c_name, &ty, init.place);
                Ok(false)
            }
            Stmt::Assign(a) => {
                self.lower_assign(&a.target, &a.value)?;
                Ok(false)
            }
            Stmt::Expr(e) => {
                let ty = self.expr_ty(e.expr.id)?;
                let lowered = self.lower_expr(&e.expr)?;
                if ty == Type::Void {
                    self.w.line(&format!("{};", lowered.c));
                } else if self.is_arc(&ty) && !lowered.place {
                    // A discarded fresh ARC value would leak; pin it to the
                    // scope so exit cleanup releases it.
                    let tmp = self.fresh_tmp();
                    self.w.line(&format!("{} = {};", cdecl(&ty, &tmp), lowered.c));
                    self.current_frame().owned.push(Owned {
                        binding: None,
                        c_name: tmp,
                        ty,
                    });
                } else {
                    self.w.line(&format!("(void)({});", lowered.c));
                }
                Ok(false)
            }
            Stmt::If(stmt) => self.lower_if(stmt),
            Stmt::While(w) => {
                let brk = self.fresh_label("brk");
                let cont = self.fresh_label("cont");
                self.frames.push(Frame::new(FrameKind::Loop {
                    brk: brk.clone(),
                    cont: cont.clone(),
                }));

                self.w.line("for (;;) {");
                self.w.indent();
                let cond = self.lower_cond_scoped(&w.cond)?;
                self.w.line(&format!("if (!{}) goto {};", cond, brk));
                self.w.line("{");
                self.lower_block(&w.body)?;
                self.w.line("}");
                self.w.line(&format!("{}: ;", cont));
                self.w.dedent();
                self.w.line("}");
                self.w.line(&format!("{}: ;", brk));

                self.emit_frame_exit(self.frames.len() - 1, None)?;
                self.frames.pop();
                Ok(false)
            }
            Stmt::For(f) => {
                let brk = self.fresh_label("brk");
                let cont = self.fresh_label("cont");
                self.w.line("{");
                self.w.indent();
                self.frames.push(Frame::new(FrameKind::Loop {
                    brk: brk.clone(),
                    cont: cont.clone(),
                }));

                if let Some(init) = &f.init {
                    self.lower_stmt(init)?;
                }
                self.w.line("for (;;) {");
                self.w.indent();
                if let Some(cond) = &f.cond {
                    let cond_c = self.lower_cond_scoped(cond)?;
                    self.w.line(&format!("if (!{}) goto {};", cond_c, brk));
                }
                self.w.line("{");
                self.lower_block(&f.body)?;
                self.w.line("}");
                self.w.line(&format!("{}: ;", cont));
                if let Some(step) = &f.step {
                    self.w.line("{");
                    self.w.indent();
                    self.frames.push(Frame::new(FrameKind::Block));
                    self.lower_stmt(step)?;
                    self.emit_frame_exit(self.frames.len() - 1, None)?;
                    self.frames.pop();
                    self.w.dedent();
                    self.w.line("}");
                }
                self.w.dedent();
                self.w.line("}");
                self.w.line(&format!("{}: ;", brk));

                self.emit_frame_exit(self.frames.len() - 1, None)?;
                self.frames.pop();
                self.w.dedent();
                self.w.line("}");
                Ok(false)
            }
            Stmt::With(w) => self.lower_with(w),
            Stmt::Match(m) => self.lower_match(m),
            Stmt::Case(c) => self.lower_case(c),
            Stmt::Drop(d) => {
                self.lower_drop(d)?;
                Ok(false)
            }
            Stmt::Break(_) => {
                let targets = self.emit_exits_to_loop()?;
                let Some((brk, _)) = targets else {
                    return Err(CodegenError::BadShape("break outside loop".to_string()));
                };
                self.w.line(&format!("goto {};", brk));
                Ok(true)
            }
            Stmt::Continue(_) => {
                let targets = self.emit_exits_to_loop()?;
                let Some((_, cont)) = targets else {
                    return Err(CodegenError::BadShape("continue outside loop".to_string()));
                };
                self.w.line(&format!("goto {};", cont));
                Ok(true)
            }
            Stmt::Return(r) => {
                self.lower_return(r.value.as_ref())?;
                Ok(true)
            }
        }
    }

    fn lower_if(&mut self, stmt: &'ast l0c_par::ast::IfStmt) -> Result<bool> {
        let cond = self.lower_expr(&stmt.cond)?;
        self.w.line(&format!("if ({}) {{", cond.c));
        let then_terminated = self.lower_block(&stmt.then_block)?;

        let else_terminated = match &stmt.else_branch {
            Some(l0c_par::ast::ElseBranch::Block(block)) => {
                self.w.line("} else {");
                self.lower_block(block)?
            }
            Some(l0c_par::ast::ElseBranch::If(nested)) => {
                self.w.line("} else {");
                self.w.indent();
                self.frames.push(Frame::new(FrameKind::Block));
                let t = self.lower_if(nested)?;
                if !t {
                    self.emit_frame_exit(self.frames.len() - 1, None)?;
                }
                self.frames.pop();
                self.w.dedent();
                t
            }
            None => false,
        };
        self.w.line("}");
        Ok(then_terminated && else_terminated && stmt.else_branch.is_some())
    }

    /// Evaluate a loop condition in its own throwaway scope so ARC
    /// temporaries materialized during the test are released every
    /// iteration, not once after the loop.
    fn lower_cond_scoped(&mut self, cond: &'ast Expr) -> Result<String> {
        let tmp = self.fresh_tmp();
        self.w.line(&format!("l0_bool {};", tmp));
        self.w.line("{");
        self.w.indent();
        self.frames.push(Frame::new(FrameKind::Block));
        let lowered = self.lower_expr(cond)?;
        self.w.line(&format!("{} = {};", tmp, lowered.c));
        self.emit_frame_exit(self.frames.len() - 1, None)?;
        self.frames.pop();
        self.w.dedent();
        self.w.line("}");
        Ok(tmp)
    }

    fn lower_assign(&mut self, target: &'ast Expr, value: &'ast Expr) -> Result<()> {
        let target_ty = self.expr_ty(target.id)?;
        let value_ty = self.expr_ty(value.id)?;
        let lowered_target = self.lower_expr(target)?;
        let lowered_value = self.lower_expr(value)?;
        let source_c = lowered_value.c.clone();
        let value_c = widen(lowered_value.c, &value_ty, &target_ty);

        if !self.is_arc(&target_ty) {
            self.w
                .line(&format!("{} = {};", lowered_target.c, value_c));
            return Ok(());
        }

        // ARC assignment. An un-promoted parameter holds a borrow: the old
        // value is not released and the binding becomes owned from here on.
        let param_promotion = self.assign_promotes_param(target);
        if lowered_value.place {
            // Retain the source before releasing the target: self-assignment
            // must not free the value out from under the copy.
            emit_arc_op(self.analysis, &mut self.w, &source_c, &value_ty, true);
        }
        if let Some(binding) = param_promotion {
            self.promoted.insert(binding);
            let c_name = lowered_target.c.clone();
            let ty = target_ty.clone();
            self.frames[0].owned.push(Owned {
                binding: Some(binding),
                c_name,
                ty,
            });
        } else {
            emit_arc_op(
                self.analysis,
                &mut self.w,
                &lowered_target.c,
                &target_ty,
                false,
            );
        }
        self.w
            .line(&format!("{} = {};", lowered_target.c, value_c));
        Ok(())
    }

    /// Does this assignment target name an ARC parameter not yet promoted?
    fn assign_promotes_param(&self, target: &Expr) -> Option<BindingId> {
        let target = strip_parens(target);
        let VarTarget::Local(binding) = self.analysis.var_targets.get(&target.id)? else {
            return None;
        };
        let binding = *binding;
        if self.promoted.contains(&binding) {
            return None;
        }
        match self.env.bindings[binding].kind {
            BindingKind::Param(_) => Some(binding),
            _ => None,
        }
    }

    fn lower_return(&mut self, value: Option<&'ast Expr>) -> Result<()> {
        let Some(value) = value else {
            self.emit_all_exits(None)?;
            self.w.line("return;");
            return Ok(());
        };

        let ret = self.ret.clone();
        let value_ty = self.expr_ty(value.id)?;
        let lowered = self.lower_expr(value)?;
        let place = lowered.place;
        let value_c = widen(lowered.c, &value_ty, &ret);

        if !self.is_arc(&ret) {
            if self.frames_are_clean() {
                self.w.line(&format!("return {};", value_c));
            } else {
                let tmp = self.fresh_tmp();
                self.w.line(&format!("{} = {};", cdecl(&ret, &tmp), value_c));
                self.emit_all_exits(None)?;
                self.w.line(&format!("return {};", tmp));
            }
            return Ok(());
        }

        // Returning an owned local is a move: no retain, and its own
        // release is skipped on the way out.
        let moved = self.owned_local_of(value);
        let tmp = self.fresh_tmp();
        self.w.line(&format!("{} = {};", cdecl(&ret, &tmp), value_c));
        match moved {
            Some(binding) => {
                self.emit_all_exits(Some(binding))?;
            }
            None => {
                if place {
                    emit_arc_op(self.analysis, &mut self.w, &tmp, &ret, true);
                }
                self.emit_all_exits(None)?;
            }
        }
        self.w.line(&format!("return {};", tmp));
        Ok(())
    }

    /// The owned-local binding a returned expression moves out, if any.
    fn owned_local_of(&self, expr: &Expr) -> Option<BindingId> {
        let expr = strip_parens(expr);
        let VarTarget::Local(binding) = self.analysis.var_targets.get(&expr.id)? else {
            return None;
        };
        let binding = *binding;
        let is_owned = self
            .frames
            .iter()
            .any(|f| f.owned.iter().any(|o| o.binding == Some(binding)));
        is_owned.then_some(binding)
    }

    fn frames_are_clean(&self) -> bool {
        self.frames
            .iter()
            .all(|f| f.owned.is_empty() && f.withs.is_empty())
    }

    fn lower_with(&mut self, w: &'ast l0c_par::ast::WithStmt) -> Result<bool> {
        self.w.line("{");
        self.w.indent();
        self.frames.push(Frame::new(FrameKind::Block));

        if let Some(cleanup_block) = &w.cleanup {
            // Block form: every item is declared null/zero first so a header
            // failure leaves the cleanup block with safe values, and the
            // cleanup is pending from the start.
            for item in &w.items {
                let binding = self.with_item_binding(item)?;
                let ty = self.binding_type(binding)?;
                let c_name = mangle_local(&item.name);
                self.emit_zero_decl(&ty, &c_name);
            }
            self.current_frame().withs.push(WithCleanup::Block(cleanup_block));

            for item in &w.items {
                let binding = self.with_item_binding(item)?;
                let ty = self.binding_type(binding)?;
                let c_name = mangle_local(&item.name);
                self.emit_line_directive(item.span);
                let init_ty = self.expr_ty(item.init.id)?;
                let init = self.lower_expr(&item.init)?;
                let init_c = widen(init.c, &init_ty, &ty);
                self.w.line(&format!("{} = {};", c_name, init_c));
                self.take_ownership(binding, &c_name, &ty, init.place);
            }
        } else {
            // Inline form: each item's cleanup becomes pending only after
            // its init succeeded, so a `?` failure in a later item unwinds
            // exactly the items acquired before it.
            for item in &w.items {
                let binding = self.with_item_binding(item)?;
                let ty = self.binding_type(binding)?;
                let c_name = mangle_local(&item.name);
                self.emit_line_directive(item.span);
                let init_ty = self.expr_ty(item.init.id)?;
                let init = self.lower_expr(&item.init)?;
                let init_c = widen(init.c, &init_ty, &ty);
                self.w
                    .line(&format!("{} = {};", cdecl(&ty, &c_name), init_c));
                self.take_ownership(binding, &c_name, &ty, init.place);
                if let Some(cleanup) = &item.cleanup {
                    self.current_frame().withs.push(WithCleanup::Inline(cleanup));
                }
            }
        }

        self.w.line("{");
        let terminated = self.lower_block(&w.body)?;
        self.w.line("}");

        if !terminated {
            self.emit_frame_exit(self.frames.len() - 1, None)?;
        }
        self.frames.pop();
        self.w.dedent();
        self.w.line("}");
        Ok(terminated)
    }

    fn with_item_binding(&self, item: &l0c_par::ast::WithItem) -> Result<BindingId> {
        self.env
            .binding_of
            .get(&item.id)
            .copied()
            .ok_or_else(|| CodegenError::BadShape(format!("unbound with item `{}`", item.name)))
    }

    fn emit_zero_decl(&mut self, ty: &Type, c_name: &str) {
        match ty {
            Type::Int | Type::Byte | Type::Bool => {
                self.w.line(&format!("{} = 0;", cdecl(ty, c_name)));
            }
            Type::String => {
                self.w
                    .line(&format!("{} = L0_EMPTY_STRING;", cdecl(ty, c_name)));
            }
            Type::Pointer(_) => {
                self.w.line(&format!("{} = NULL;", cdecl(ty, c_name)));
            }
            Type::Nullable(inner) if matches!(&**inner, Type::Pointer(_)) => {
                self.w.line(&format!("{} = NULL;", cdecl(ty, c_name)));
            }
            _ => {
                self.w.line(&format!("{};", cdecl(ty, c_name)));
                self.w
                    .line(&format!("memset(&{}, 0, sizeof {});", c_name, c_name));
            }
        }
    }

    /// Register an ownership-taking site: retain when copying from a place,
    /// and schedule the binding for scope-exit release.
    fn take_ownership(&mut self, binding: BindingId, c_name: &str, ty: &Type, from_place: bool) {
        if !self.is_arc(ty) {
            return;
        }
        if from_place {
            emit_arc_op(self.analysis, &mut self.w, c_name, ty, true);
        }
        self.current_frame().owned.push(Owned {
            binding: Some(binding),
            c_name: c_name.to_string(),
            ty: ty.clone(),
        });
    }

    fn lower_match(&mut self, m: &'ast l0c_par::ast::MatchStmt) -> Result<bool> {
        let scrut_ty = self.expr_ty(m.scrutinee.id)?;
        let lowered = self.lower_expr(&m.scrutinee)?;
        let scrut = self.borrowed_operand(lowered, &scrut_ty);

        let (enum_module, enum_name, access) = match &scrut_ty {
            Type::Enum { module, name } => (module.clone(), name.clone(), "."),
            Type::Pointer(inner) => match &**inner {
                Type::Enum { module, name } => (module.clone(), name.clone(), "->"),
                other => {
                    return Err(CodegenError::BadShape(format!(
                        "match on non-enum {:?}",
                        other
                    )))
                }
            },
            other => {
                return Err(CodegenError::BadShape(format!(
                    "match on non-enum {:?}",
                    other
                )))
            }
        };
        let info = self
            .analysis
            .enum_infos
            .get(&(enum_module.clone(), enum_name.clone()))
            .cloned()
            .ok_or_else(|| CodegenError::BadShape(format!("missing enum `{}`", enum_name)))?;

        self.w.line(&format!("switch ({}{}tag) {{", scrut, access));

        let mut all_return = !m.arms.is_empty();
        let mut has_wildcard = false;

        for arm in &m.arms {
            let arm_terminated;
            match &arm.pattern {
                Pattern::Wildcard(_) => {
                    has_wildcard = true;
                    self.w.line("default: {");
                    self.w.indent();
                    self.frames.push(Frame::new(FrameKind::Block));
                    let t = self.lower_block(&arm.body)?;
                    if !t {
                        self.emit_frame_exit(self.frames.len() - 1, None)?;
                        self.w.line("break;");
                    }
                    self.frames.pop();
                    self.w.dedent();
                    self.w.line("}");
                    arm_terminated = t;
                }
                Pattern::Variant(v) => {
                    let index = info.variant_index(&v.name.name).ok_or_else(|| {
                        CodegenError::BadShape(format!("unknown variant `{}`", v.name.name))
                    })?;
                    self.w.line(&format!(
                        "case {}: {{",
                        tag_const(&enum_module, &enum_name, &v.name.name)
                    ));
                    self.w.indent();
                    self.frames.push(Frame::new(FrameKind::Block));

                    // Bind payload fields into arm locals; copies from the
                    // scrutinee retain.
                    let arm_scope = self.env.scope_of.get(&arm.id).copied();
                    let fields = &info.variants[index].fields;
                    for (bind, (field_name, field_ty)) in v.binds.iter().zip(fields.iter()) {
                        let Some(bind_name) = &bind.name else { continue };
                        let c_name = mangle_local(bind_name);
                        let src = format!(
                            "{}{}d.v{}.{}",
                            scrut,
                            access,
                            index,
                            mangle_local(field_name)
                        );
                        self.w
                            .line(&format!("{} = {};", cdecl(field_ty, &c_name), src));
                        if let Some(scope) = arm_scope {
                            if let Some(&binding) = self.env.scopes[scope].bindings.get(bind_name)
                            {
                                self.take_ownership(binding, &c_name, field_ty, true);
                            }
                        }
                    }

                    let t = self.lower_block(&arm.body)?;
                    if !t {
                        self.emit_frame_exit(self.frames.len() - 1, None)?;
                        self.w.line("break;");
                    }
                    self.frames.pop();
                    self.w.dedent();
                    self.w.line("}");
                    arm_terminated = t;
                }
            }
            all_return = all_return && arm_terminated;
        }

        if !has_wildcard {
            self.w.line("default: _rt_panic(\"invalid enum tag\");");
        }
        self.w.line("}");

        Ok(all_return)
    }

    fn lower_case(&mut self, c: &'ast l0c_par::ast::CaseStmt) -> Result<bool> {
        let scrut_ty = self.expr_ty(c.scrutinee.id)?;
        let lowered = self.lower_expr(&c.scrutinee)?;

        if scrut_ty == Type::String {
            let scrut = self.borrowed_operand(lowered, &scrut_ty);
            let mut first = true;
            for arm in &c.arms {
                let lit = self.case_literal_c(&arm.literal)?;
                let keyword = if first { "if" } else { "} else if" };
                first = false;
                self.w
                    .line(&format!("{} (rt_string_eq({}, {})) {{", keyword, scrut, lit));
                self.lower_block(&arm.body)?;
            }
            if let Some(default) = &c.default {
                if first {
                    self.w.line("{");
                } else {
                    self.w.line("} else {");
                }
                self.lower_block(default)?;
                self.w.line("}");
            } else if !first {
                self.w.line("}");
            }
            return Ok(stmt_returns_case(c));
        }

        self.w.line(&format!("switch ({}) {{", lowered.c));
        for arm in &c.arms {
            let lit = self.case_literal_c(&arm.literal)?;
            self.w.line(&format!("case {}: {{", lit));
            let t = self.lower_block(&arm.body)?;
            if !t {
                self.w.indent();
                self.w.line("break;");
                self.w.dedent();
            }
            self.w.line("}");
        }
        match &c.default {
            Some(default) => {
                self.w.line("default: {");
                let t = self.lower_block(default)?;
                if !t {
                    self.w.indent();
                    self.w.line("break;");
                    self.w.dedent();
                }
                self.w.line("}");
            }
            None => self.w.line("default: break;"),
        }
        self.w.line("}");
        Ok(stmt_returns_case(c))
    }

    /// C text of a case arm literal.
    fn case_literal_c(&mut self, literal: &Expr) -> Result<String> {
        match &literal.kind {
            ExprKind::Int(v) => Ok(v.to_string()),
            ExprKind::Byte(b) => Ok(b.to_string()),
            ExprKind::Bool(true) => Ok("1".to_string()),
            ExprKind::Bool(false) => Ok("0".to_string()),
            ExprKind::Str(bytes) => {
                let name = self.literals.intern(bytes);
                Ok(format!("(&{})", name))
            }
            ExprKind::Unary {
                op: UnOp::Neg,
                operand,
            } => match &operand.kind {
                ExprKind::Int(v) => Ok(render_negated_int(*v)),
                _ => Err(CodegenError::BadShape("non-literal case arm".to_string())),
            },
            ExprKind::Paren(inner) => self.case_literal_c(inner),
            _ => Err(CodegenError::BadShape("non-literal case arm".to_string())),
        }
    }

    fn lower_drop(&mut self, d: &'ast l0c_par::ast::DropStmt) -> Result<()> {
        let target = strip_parens(&d.expr);
        let ty = self.expr_ty(target.id)?;
        let lowered = self.lower_expr(&d.expr)?;

        // Owned-field cleanup for the pointee before the tracker free.
        let (pointee, nullable) = match &ty {
            Type::Pointer(inner) => (Some(&**inner), false),
            Type::Nullable(outer) => match &**outer {
                Type::Pointer(inner) => (Some(&**inner), true),
                _ => (None, false),
            },
            _ => (None, false),
        };
        if let Some(pointee @ (Type::Struct { module, name } | Type::Enum { module, name })) =
            pointee
        {
            if self.analysis.type_contains_string(pointee) {
                let helper = release_helper(module, name);
                if nullable {
                    self.w.line(&format!("if ({} != NULL) {{", lowered.c));
                    self.w.indent();
                    self.w.line(&format!("{}({});", helper, lowered.c));
                    self.w.dedent();
                    self.w.line("}");
                } else {
                    self.w.line(&format!("{}({});", helper, lowered.c));
                }
            }
        }

        self.w.line(&format!("_rt_drop({});", lowered.c));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    pub(crate) fn lower_expr(&mut self, expr: &'ast Expr) -> Result<LoweredExpr> {
        match &expr.kind {
            ExprKind::Int(v) => Ok(LoweredExpr::rvalue(v.to_string())),
            ExprKind::Byte(b) => Ok(LoweredExpr::rvalue(b.to_string())),
            ExprKind::Bool(true) => Ok(LoweredExpr::rvalue("L0_TRUE".to_string())),
            ExprKind::Bool(false) => Ok(LoweredExpr::rvalue("L0_FALSE".to_string())),
            ExprKind::Str(bytes) => {
                // Literal statics have stable lifetime and noop ARC ops, so
                // they behave like places: no temp pinning, retain-on-copy.
                let name = self.literals.intern(bytes);
                Ok(LoweredExpr::place(format!("(&{})", name)))
            }
            ExprKind::Null => {
                let ty = self.expr_ty(expr.id)?;
                Ok(LoweredExpr::rvalue(self.none_value(&ty)))
            }
            ExprKind::Var(_) | ExprKind::Qualified(_) => self.lower_reference(expr),
            ExprKind::Paren(inner) => self.lower_expr(inner),
            ExprKind::Unary { op, operand } => self.lower_unary(*op, operand),
            ExprKind::Binary { op, lhs, rhs } => self.lower_binary(*op, lhs, rhs),
            ExprKind::Call { callee, args } => self.lower_call(expr, callee, args),
            ExprKind::Field { target, field, .. } => self.lower_field(target, field),
            ExprKind::Cast { operand, ty: _ } => self.lower_cast(expr, operand),
            ExprKind::Try { operand } => self.lower_try(operand),
            ExprKind::New { args, .. } => self.lower_new(expr, args),
            ExprKind::Index { .. } => {
                Err(CodegenError::BadShape("indexing reached lowering".to_string()))
            }
            ExprKind::TypeExpr(_) => Err(CodegenError::BadShape(
                "type expression outside sizeof".to_string(),
            )),
        }
    }

    fn lower_reference(&mut self, expr: &'ast Expr) -> Result<LoweredExpr> {
        let target = self
            .analysis
            .var_targets
            .get(&expr.id)
            .ok_or(CodegenError::MissingVarTarget(expr.id))?
            .clone();

        match target {
            VarTarget::Local(binding) => {
                let name = mangle_local(&self.env.bindings[binding].name);
                Ok(LoweredExpr::place(name))
            }
            VarTarget::TopLet(module, name) => {
                Ok(LoweredExpr::place(mangle_item(&module, &name)))
            }
            VarTarget::Func(module, name) => {
                Ok(LoweredExpr::rvalue(self.func_c_name(&module, &name)))
            }
            VarTarget::EnumVariant {
                module,
                enum_name,
                variant_index,
            } => {
                // Bare zero-payload variant: implicit constructor call.
                self.construct_variant(&module, &enum_name, variant_index, &[])
            }
        }
    }

    /// C name of a function: extern functions keep their name verbatim.
    fn func_c_name(&self, module: &DottedName, name: &str) -> String {
        let is_extern = self
            .analysis
            .unit
            .asts
            .get(module)
            .map(|ast| {
                ast.decls.iter().any(|d| match d {
                    l0c_par::ast::TopDecl::Func(f) => f.name == name && f.is_extern,
                    _ => false,
                })
            })
            .unwrap_or(false);
        if is_extern {
            name.to_string()
        } else {
            mangle_item(module, name)
        }
    }

    fn lower_unary(&mut self, op: UnOp, operand: &'ast Expr) -> Result<LoweredExpr> {
        // Fold negated integer literals so INT_MIN stays expressible.
        if op == UnOp::Neg {
            if let ExprKind::Int(v) = operand.kind {
                return Ok(LoweredExpr::rvalue(render_negated_int(v)));
            }
        }

        let operand_ty = self.expr_ty(operand.id)?;
        let lowered = self.lower_expr(operand)?;
        match op {
            UnOp::Neg => match operand_ty {
                Type::Byte => Ok(LoweredExpr::rvalue(format!("((l0_byte)(0 - {}))", lowered.c))),
                _ => Ok(LoweredExpr::rvalue(format!("_rt_isub(0, {})", lowered.c))),
            },
            UnOp::Not => Ok(LoweredExpr::rvalue(format!("((l0_bool)!{})", lowered.c))),
            UnOp::BitNot => Ok(LoweredExpr::rvalue(format!("(~{})", lowered.c))),
            UnOp::Deref => Ok(LoweredExpr::place(format!("(*{})", lowered.c))),
        }
    }

    fn lower_binary(
        &mut self,
        op: l0c_par::ast::BinOp,
        lhs: &'ast Expr,
        rhs: &'ast Expr,
    ) -> Result<LoweredExpr> {
        use l0c_par::ast::BinOp;

        // Short-circuit operators keep the right operand's side effects
        // (and its ARC temporaries) inside the untaken branch.
        if matches!(op, BinOp::And | BinOp::Or) {
            let tmp = self.fresh_tmp();
            let lhs_c = self.lower_expr(lhs)?;
            self.w.line(&format!("l0_bool {} = {};", tmp, lhs_c.c));
            let test = if op == BinOp::And {
                format!("if ({}) {{", tmp)
            } else {
                format!("if (!{}) {{", tmp)
            };
            self.w.line(&test);
            self.w.indent();
            self.frames.push(Frame::new(FrameKind::Block));
            let rhs_c = self.lower_expr(rhs)?;
            self.w.line(&format!("{} = {};", tmp, rhs_c.c));
            self.emit_frame_exit(self.frames.len() - 1, None)?;
            self.frames.pop();
            self.w.dedent();
            self.w.line("}");
            return Ok(LoweredExpr::rvalue(tmp));
        }

        let lhs_ty = self.expr_ty(lhs.id)?;
        let rhs_ty = self.expr_ty(rhs.id)?;
        let lowered_lhs = self.lower_expr(lhs)?;
        let lowered_rhs = self.lower_expr(rhs)?;
        let a = self.borrowed_operand(lowered_lhs, &lhs_ty);
        let b = self.borrowed_operand(lowered_rhs, &rhs_ty);

        let both_bytes = lhs_ty == Type::Byte && rhs_ty == Type::Byte;
        let c = match op {
            BinOp::Add | BinOp::Sub | BinOp::Mul if both_bytes => {
                // Byte arithmetic wraps; unsigned, defined.
                format!("((l0_byte)({} {} {}))", a, op.symbol(), b)
            }
            BinOp::Div if both_bytes => format!("_rt_bdiv({}, {})", a, b),
            BinOp::Rem if both_bytes => format!("_rt_bmod({}, {})", a, b),
            BinOp::Add => format!("_rt_iadd({}, {})", a, b),
            BinOp::Sub => format!("_rt_isub({}, {})", a, b),
            BinOp::Mul => format!("_rt_imul({}, {})", a, b),
            BinOp::Div => format!("_rt_idiv({}, {})", a, b),
            BinOp::Rem => format!("_rt_imod({}, {})", a, b),
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                format!("((l0_bool)({} {} {}))", a, op.symbol(), b)
            }
            BinOp::Eq if lhs_ty == Type::String => format!("rt_string_eq({}, {})", a, b),
            BinOp::Ne if lhs_ty == Type::String => {
                format!("((l0_bool)!rt_string_eq({}, {}))", a, b)
            }
            BinOp::Eq | BinOp::Ne => format!("((l0_bool)({} {} {}))", a, op.symbol(), b),
            BinOp::Shl => format!("_rt_shl({}, {})", a, b),
            BinOp::Shr => format!("_rt_shr({}, {})", a, b),
            BinOp::And | BinOp::Or => unreachable!("handled above"),
            BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor => {
                return Err(CodegenError::BadShape(format!(
                    "reserved operator `{}` reached lowering",
                    op.symbol()
                )))
            }
        };
        Ok(LoweredExpr::rvalue(c))
    }

    fn lower_call(
        &mut self,
        expr: &'ast Expr,
        callee: &'ast Expr,
        args: &'ast [Expr],
    ) -> Result<LoweredExpr> {
        // sizeof intrinsic.
        if let Some(Intrinsic::Sizeof) = self.analysis.intrinsic_targets.get(&expr.id) {
            let arg = args
                .first()
                .ok_or_else(|| CodegenError::BadShape("sizeof without argument".to_string()))?;
            let denoted = self.expr_ty(arg.id)?;
            return Ok(LoweredExpr::rvalue(format!(
                "((l0_int)sizeof({}))",
                ctype(&denoted)
            )));
        }

        // Variant constructor call.
        if let Some(VarTarget::EnumVariant {
            module,
            enum_name,
            variant_index,
        }) = self.analysis.var_targets.get(&callee.id).cloned()
        {
            return self.construct_variant(&module, &enum_name, variant_index, args);
        }

        let callee_ty = self.expr_ty(callee.id)?;
        let param_tys = match &callee_ty {
            Type::Func { params, .. } => params.clone(),
            other => {
                return Err(CodegenError::BadShape(format!(
                    "call of non-function {:?}",
                    other
                )))
            }
        };

        let lowered_callee = self.lower_expr(callee)?;
        let mut arg_cs = Vec::new();
        for (index, arg) in args.iter().enumerate() {
            let arg_ty = self.expr_ty(arg.id)?;
            let lowered = self.lower_expr(arg)?;
            let c = self.borrowed_operand(lowered, &arg_ty);
            arg_cs.push(match param_tys.get(index) {
                Some(param_ty) => widen(c, &arg_ty, param_ty),
                None => c,
            });
        }
        Ok(LoweredExpr::rvalue(format!(
            "{}({})",
            lowered_callee.c,
            arg_cs.join(", ")
        )))
    }

    fn construct_variant(
        &mut self,
        module: &DottedName,
        enum_name: &str,
        variant_index: usize,
        args: &'ast [Expr],
    ) -> Result<LoweredExpr> {
        let info = self
            .analysis
            .enum_infos
            .get(&(module.clone(), enum_name.to_string()))
            .cloned()
            .ok_or_else(|| CodegenError::BadShape(format!("missing enum `{}`", enum_name)))?;
        let variant = info
            .variants
            .get(variant_index)
            .ok_or_else(|| CodegenError::BadShape("variant index out of range".to_string()))?;

        let enum_c = type_name(module, enum_name);
        let tmp = self.fresh_tmp();
        self.w.line(&format!("{} {};", enum_c, tmp));
        self.w.line(&format!("memset(&{}, 0, sizeof {});", tmp, tmp));
        self.w.line(&format!(
            "{}.tag = {};",
            tmp,
            tag_const(module, enum_name, &variant.name)
        ));

        for (arg, (field_name, field_ty)) in args.iter().zip(variant.fields.iter()) {
            let arg_ty = self.expr_ty(arg.id)?;
            let lowered = self.lower_expr(arg)?;
            let place = lowered.place;
            let value_c = widen(lowered.c, &arg_ty, field_ty);
            let dst = format!("{}.d.v{}.{}", tmp, variant_index, mangle_local(field_name));
            self.w.line(&format!("{} = {};", dst, value_c));
            // The enum value owns its payload: copies from places retain,
            // fresh rvalues move in.
            if place && self.is_arc(field_ty) {
                emit_arc_op(self.analysis, &mut self.w, &dst, field_ty, true);
            }
        }

        Ok(LoweredExpr::rvalue(tmp))
    }

    fn lower_field(
        &mut self,
        target: &'ast Expr,
        field: &str,
    ) -> Result<LoweredExpr> {
        let target_ty = self.expr_ty(target.id)?;
        let lowered = self.lower_expr(target)?;
        // A fresh ARC struct rvalue must outlive the field read; pin it.
        let base = self.borrowed_operand(lowered, &target_ty);

        let access = match &target_ty {
            Type::Pointer(_) => "->",
            _ => ".",
        };
        Ok(LoweredExpr::place(format!(
            "{}{}{}",
            base,
            access,
            mangle_local(field)
        )))
    }

    fn lower_cast(&mut self, expr: &'ast Expr, operand: &'ast Expr) -> Result<LoweredExpr> {
        let source = self.expr_ty(operand.id)?;
        let target = self.expr_ty(expr.id)?;
        let lowered = self.lower_expr(operand)?;

        if source == target {
            return Ok(lowered);
        }

        // T? as T: checked unwrap. Place-ness carries over (rule: the
        // unwrap of a place is place-like, so owning sites retain-copy).
        if let Type::Nullable(inner) = &source {
            if **inner == target {
                return self.lower_unwrap(&source, lowered);
            }
        }

        // T as T?: safe wrap.
        if let Type::Nullable(inner) = &target {
            if **inner == source {
                return Ok(match &**inner {
                    Type::Pointer(_) => lowered,
                    payload => {
                        let c = format!(
                            "(({}){{ L0_TRUE, {} }})",
                            opt_name(payload),
                            lowered.c
                        );
                        LoweredExpr {
                            c,
                            place: lowered.place,
                        }
                    }
                });
            }
        }

        match (&source, &target) {
            (Type::Int, Type::Byte) => {
                Ok(LoweredExpr::rvalue(format!("_rt_narrow_byte({})", lowered.c)))
            }
            (Type::Byte, Type::Int) => {
                Ok(LoweredExpr::rvalue(format!("((l0_int){})", lowered.c)))
            }
            (s, t) => Err(CodegenError::BadShape(format!(
                "cast {:?} -> {:?} reached lowering",
                s, t
            ))),
        }
    }

    /// Checked unwrap shared by `opt as T`.
    fn lower_unwrap(&mut self, source: &Type, lowered: LoweredExpr) -> Result<LoweredExpr> {
        let Type::Nullable(inner) = source else {
            return Err(CodegenError::BadShape("unwrap of non-nullable".to_string()));
        };
        let tmp = self.fresh_tmp();
        self.w
            .line(&format!("{} = {};", cdecl(source, &tmp), lowered.c));
        match &**inner {
            Type::Pointer(_) => {
                self.w
                    .line(&format!("_rt_unwrap_check({} != NULL);", tmp));
                Ok(LoweredExpr {
                    c: tmp,
                    place: lowered.place,
                })
            }
            _ => {
                self.w
                    .line(&format!("_rt_unwrap_check({}.has_value);", tmp));
                Ok(LoweredExpr {
                    c: format!("{}.value", tmp),
                    place: lowered.place,
                })
            }
        }
    }

    fn lower_try(&mut self, operand: &'ast Expr) -> Result<LoweredExpr> {
        let source = self.expr_ty(operand.id)?;
        let lowered = self.lower_expr(operand)?;
        let Type::Nullable(inner) = &source else {
            return Err(CodegenError::BadShape("try on non-nullable".to_string()));
        };

        let tmp = self.fresh_tmp();
        self.w
            .line(&format!("{} = {};", cdecl(&source, &tmp), lowered.c));

        let is_none = match &**inner {
            Type::Pointer(_) => format!("{} == NULL", tmp),
            _ => format!("!{}.has_value", tmp),
        };
        self.w.line(&format!("if ({}) {{", is_none));
        self.w.indent();
        self.emit_all_exits(None)?;
        let ret = self.ret.clone();
        self.w.line(&format!("return {};", self.none_value(&ret)));
        self.w.dedent();
        self.w.line("}");

        let c = match &**inner {
            Type::Pointer(_) => tmp,
            _ => format!("{}.value", tmp),
        };
        Ok(LoweredExpr {
            c,
            place: lowered.place,
        })
    }

    fn lower_new(&mut self, expr: &'ast Expr, args: &'ast [Expr]) -> Result<LoweredExpr> {
        let result_ty = self.expr_ty(expr.id)?;
        let Type::Pointer(pointee) = &result_ty else {
            return Err(CodegenError::BadShape("new without pointer type".to_string()));
        };
        let Type::Struct { module, name } = &**pointee else {
            return Err(CodegenError::BadShape("new of non-struct".to_string()));
        };
        let struct_c = type_name(module, name);
        let info = self
            .analysis
            .struct_infos
            .get(&(module.clone(), name.clone()))
            .cloned()
            .ok_or_else(|| CodegenError::BadShape(format!("missing struct `{}`", name)))?;

        let tmp = self.fresh_tmp();
        self.w.line(&format!(
            "{} *{} = ({} *)_rt_alloc_obj(sizeof({}));",
            struct_c, tmp, struct_c, struct_c
        ));
        for (arg, (field_name, field_ty)) in args.iter().zip(info.fields.iter()) {
            let arg_ty = self.expr_ty(arg.id)?;
            let lowered = self.lower_expr(arg)?;
            let place = lowered.place;
            let value_c = widen(lowered.c, &arg_ty, field_ty);
            let dst = format!("{}->{}", tmp, mangle_local(field_name));
            self.w.line(&format!("{} = {};", dst, value_c));
            if place && self.is_arc(field_ty) {
                emit_arc_op(self.analysis, &mut self.w, &dst, field_ty, true);
            }
        }
        Ok(LoweredExpr::rvalue(tmp))
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Pin a fresh ARC rvalue used in a borrowing position to the current
    /// scope so it is released at scope exit; places pass through.
    fn borrowed_operand(&mut self, lowered: LoweredExpr, ty: &Type) -> String {
        if lowered.place || !self.is_arc(ty) {
            return lowered.c;
        }
        let tmp = self.fresh_tmp();
        self.w.line(&format!("{} = {};", cdecl(ty, &tmp), lowered.c));
        self.current_frame().owned.push(Owned {
            binding: None,
            c_name: tmp.clone(),
            ty: ty.clone(),
        });
        tmp
    }

    /// The "none" value of a nullable type.
    fn none_value(&self, ty: &Type) -> String {
        match ty {
            Type::Nullable(inner) => match &**inner {
                Type::Pointer(_) => "NULL".to_string(),
                payload => format!("(({}){{0}})", opt_name(payload)),
            },
            // Void functions return nothing; used by `return` lowering only
            // for nullable returns, so anything else is an internal error
            // surfaced at the call site.
            _ => "0".to_string(),
        }
    }

    fn is_arc(&self, ty: &Type) -> bool {
        self.analysis.type_contains_string(ty)
    }

    fn expr_ty(&self, id: NodeId) -> Result<Type> {
        self.analysis
            .expr_types
            .get(&id)
            .cloned()
            .ok_or(CodegenError::MissingExprType(id))
    }

    fn binding_type(&self, binding: BindingId) -> Result<Type> {
        self.env.bindings[binding]
            .ty
            .clone()
            .ok_or_else(|| CodegenError::BadShape("untyped binding".to_string()))
    }

    fn fresh_tmp(&mut self) -> String {
        let id = self.tmp;
        self.tmp += 1;
        format!("_t{}", id)
    }

    fn fresh_label(&mut self, kind: &str) -> String {
        let id = self.labels;
        self.labels += 1;
        format!("l0_{}_{}", kind, id)
    }

    fn emit_line_directive(&mut self, span: Span) {
        if self.line_directives && span.line > 0 {
            self.w
                .raw_line(&format!("#line {} \"{}\"", span.line, self.file_path));
        }
    }
}

/// Render a function signature with the declarator in place.
fn signature(ret: &Type, name: &str, params: &str) -> String {
    format!("{} {}({})", ctype(ret), name, params)
}

/// Widen `T` to `T?` at an assignment-like boundary: value payloads wrap
/// into their optional struct, pointers share the NULL-niche representation.
fn widen(c: String, found: &Type, expected: &Type) -> String {
    let Type::Nullable(inner) = expected else {
        return c;
    };
    if found.is_nullable() || **inner != *found {
        return c;
    }
    match &**inner {
        Type::Pointer(_) => c,
        payload => format!("(({}){{ L0_TRUE, {} }})", opt_name(payload), c),
    }
}

fn strip_parens(expr: &Expr) -> &Expr {
    match &expr.kind {
        ExprKind::Paren(inner) => strip_parens(inner),
        _ => expr,
    }
}

/// Conservative negative-literal rendering; INT_MIN has no positive twin.
fn render_negated_int(v: i64) -> String {
    if v == 2_147_483_648 {
        "(-2147483647 - 1)".to_string()
    } else {
        format!("(-{})", v)
    }
}

/// Return-path shape of a `case` statement (mirrors the checker's lattice:
/// an `else` arm is required, and every arm must return).
fn stmt_returns_case(c: &l0c_par::ast::CaseStmt) -> bool {
    c.default
        .as_ref()
        .map(l0c_sem::block_returns)
        .unwrap_or(false)
        && c.arms.iter().all(|arm| l0c_sem::block_returns(&arm.body))
}
