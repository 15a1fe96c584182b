//! Signature resolution.
//!
//! Resolves every top-level type reference: function parameter and return
//! types, struct fields, enum variant payloads, alias targets, and top-level
//! `let` types. Fills `func_types`, `struct_infos`, `enum_infos`,
//! `let_types`, and `Symbol.ty`.
//!
//! Alias cycles are caught by memoized DFS over alias targets; value-type
//! dependency cycles (a struct or enum containing itself by value) by a
//! three-color DFS over the by-value reference graph.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use l0c_par::ast::{Module, QualName, TopDecl, TypeRef};
use l0c_util::diagnostic::codes;
use l0c_util::{Diagnostic, DottedName, Handler, Span};

use crate::analysis::{
    AnalysisResult, EnumInfo, FuncType, Lookup, StructInfo, SymbolId, SymbolKind, VariantInfo,
};
use crate::types::Type;

#[derive(Clone)]
enum AliasState {
    Resolving,
    Done(Type),
    Failed,
}

pub(crate) fn resolve(result: &mut AnalysisResult, handler: &Handler) {
    let modules: Vec<(DottedName, Rc<Module>)> = result
        .unit
        .modules
        .iter()
        .map(|name| (name.clone(), Rc::clone(&result.unit.asts[name])))
        .collect();

    let mut resolver = SigResolver {
        result,
        handler,
        alias_states: FxHashMap::default(),
    };

    // Aliases first: everything else may reference them.
    let alias_ids: Vec<SymbolId> = resolver
        .result
        .symbols
        .iter_enumerated()
        .filter(|(_, s)| s.kind == SymbolKind::TypeAlias)
        .map(|(id, _)| id)
        .collect();
    for id in alias_ids {
        resolver.alias_type(id);
    }

    for (module_name, module) in &modules {
        for decl in &module.decls {
            match decl {
                TopDecl::Struct(s) => resolver.resolve_struct(module_name, s),
                TopDecl::Enum(e) => resolver.resolve_enum(module_name, e),
                TopDecl::Func(f) => resolver.resolve_func(module_name, f),
                TopDecl::TopLet(l) => resolver.resolve_top_let(module_name, l),
                TopDecl::TypeAlias(_) => {}
            }
        }
    }

    resolver.check_value_cycles();
}

struct SigResolver<'a> {
    result: &'a mut AnalysisResult,
    handler: &'a Handler,
    alias_states: FxHashMap<SymbolId, AliasState>,
}

impl<'a> SigResolver<'a> {
    // -----------------------------------------------------------------------
    // Declarations
    // -----------------------------------------------------------------------

    fn resolve_struct(&mut self, module: &DottedName, decl: &l0c_par::ast::StructDecl) {
        let mut fields: Vec<(String, Type)> = Vec::new();
        for field in &decl.fields {
            if fields.iter().any(|(n, _)| n == &field.name) {
                self.handler.emit(
                    Diagnostic::error(
                        codes::SIG_DUPLICATE_FIELD,
                        format!("duplicate field `{}` in struct `{}`", field.name, decl.name),
                    )
                    .with_span(field.span)
                    .with_module(module.clone()),
                );
                continue;
            }
            let ty = self
                .resolve_type_ref(module, &field.ty, false)
                .unwrap_or(Type::Int);
            fields.push((field.name.clone(), ty));
        }

        self.result.struct_infos.insert(
            (module.clone(), decl.name.clone()),
            StructInfo {
                fields,
                span: decl.span,
            },
        );
        self.set_symbol_type(
            module,
            &decl.name,
            Type::Struct {
                module: module.clone(),
                name: decl.name.clone(),
            },
        );
    }

    fn resolve_enum(&mut self, module: &DottedName, decl: &l0c_par::ast::EnumDecl) {
        let enum_ty = Type::Enum {
            module: module.clone(),
            name: decl.name.clone(),
        };

        let mut variants: Vec<VariantInfo> = Vec::new();
        for variant in &decl.variants {
            if variants.iter().any(|v| v.name == variant.name) {
                self.handler.emit(
                    Diagnostic::error(
                        codes::SIG_DUPLICATE_VARIANT,
                        format!(
                            "duplicate variant `{}` in enum `{}`",
                            variant.name, decl.name
                        ),
                    )
                    .with_span(variant.span)
                    .with_module(module.clone()),
                );
                continue;
            }

            let mut fields: Vec<(String, Type)> = Vec::new();
            for field in &variant.fields {
                if fields.iter().any(|(n, _)| n == &field.name) {
                    self.handler.emit(
                        Diagnostic::error(
                            codes::SIG_DUPLICATE_FIELD,
                            format!(
                                "duplicate payload field `{}` in variant `{}`",
                                field.name, variant.name
                            ),
                        )
                        .with_span(field.span)
                        .with_module(module.clone()),
                    );
                    continue;
                }
                let ty = self
                    .resolve_type_ref(module, &field.ty, false)
                    .unwrap_or(Type::Int);
                fields.push((field.name.clone(), ty));
            }

            // Variant constructors get function types.
            self.set_symbol_type(
                module,
                &variant.name,
                Type::Func {
                    params: fields.iter().map(|(_, t)| t.clone()).collect(),
                    result: Box::new(enum_ty.clone()),
                },
            );

            variants.push(VariantInfo {
                name: variant.name.clone(),
                fields,
            });
        }

        self.result.enum_infos.insert(
            (module.clone(), decl.name.clone()),
            EnumInfo {
                variants,
                span: decl.span,
            },
        );
        self.set_symbol_type(module, &decl.name, enum_ty);
    }

    fn resolve_func(&mut self, module: &DottedName, decl: &l0c_par::ast::FuncDecl) {
        let params: Vec<Type> = decl
            .params
            .iter()
            .map(|p| {
                self.resolve_type_ref(module, &p.ty, false)
                    .unwrap_or(Type::Int)
            })
            .collect();
        let result_ty = match &decl.ret {
            Some(tr) => self.resolve_type_ref(module, tr, true).unwrap_or(Type::Void),
            None => Type::Void,
        };

        self.result.func_types.insert(
            (module.clone(), decl.name.clone()),
            FuncType {
                params: params.clone(),
                result: result_ty.clone(),
            },
        );
        self.set_symbol_type(
            module,
            &decl.name,
            Type::Func {
                params,
                result: Box::new(result_ty),
            },
        );
    }

    fn resolve_top_let(&mut self, module: &DottedName, decl: &l0c_par::ast::TopLetDecl) {
        let ty = match &decl.ty {
            Some(tr) => self.resolve_type_ref(module, tr, false),
            None => infer_literal_type(&decl.init),
        };

        let ty = match ty {
            Some(ty) => ty,
            None => {
                if decl.ty.is_none() {
                    self.handler.emit(
                        Diagnostic::error(
                            codes::SIG_UNKNOWN_TYPE,
                            format!(
                                "top-level `let {}` needs a type annotation or a literal initializer",
                                decl.name
                            ),
                        )
                        .with_span(decl.name_span)
                        .with_module(module.clone()),
                    );
                }
                Type::Int
            }
        };

        self.result
            .let_types
            .insert((module.clone(), decl.name.clone()), ty.clone());
        self.set_symbol_type(module, &decl.name, ty);
    }

    // -----------------------------------------------------------------------
    // Type references
    // -----------------------------------------------------------------------

    /// Resolve a syntactic type reference against `module`'s environment.
    ///
    /// `allow_void` is true only for bare function return types.
    pub(crate) fn resolve_type_ref(
        &mut self,
        module: &DottedName,
        tr: &TypeRef,
        allow_void: bool,
    ) -> Option<Type> {
        let base = self.resolve_base(module, &tr.name)?;

        if base == Type::Void {
            if tr.ptr_depth > 0 || tr.nullable || !allow_void {
                self.emit(
                    codes::SIG_VOID_IN_TYPE,
                    "`void` is only valid as a bare function return type".to_string(),
                    tr.span,
                    module,
                );
                return None;
            }
            return Some(Type::Void);
        }

        let mut ty = base;
        for _ in 0..tr.ptr_depth {
            ty = Type::Pointer(Box::new(ty));
        }

        if tr.nullable {
            if ty.is_nullable() {
                self.emit(
                    codes::SIG_DOUBLE_NULLABLE,
                    format!("`{}` is already nullable", ty),
                    tr.span,
                    module,
                );
                return None;
            }
            ty = Type::Nullable(Box::new(ty));
        }

        Some(ty)
    }

    /// Resolve the named base of a type reference.
    fn resolve_base(&mut self, module: &DottedName, name: &QualName) -> Option<Type> {
        if !name.extra.is_empty() {
            self.emit(
                codes::NAM_MULTI_SEGMENT,
                format!("`{}` has more than one `::` segment", render_qual(name)),
                name.span,
                module,
            );
            return None;
        }

        if name.module.is_none() {
            match name.name.as_str() {
                "int" => return Some(Type::Int),
                "byte" => return Some(Type::Byte),
                "bool" => return Some(Type::Bool),
                "string" => return Some(Type::String),
                "void" => return Some(Type::Void),
                _ => {}
            }
        }

        let symbol_id = self.lookup_symbol(module, name, codes::SIG_UNKNOWN_TYPE)?;
        let symbol = &self.result.symbols[symbol_id];
        match symbol.kind {
            SymbolKind::Struct => Some(Type::Struct {
                module: symbol.module.clone(),
                name: symbol.name.clone(),
            }),
            SymbolKind::Enum => Some(Type::Enum {
                module: symbol.module.clone(),
                name: symbol.name.clone(),
            }),
            SymbolKind::TypeAlias => self.alias_type(symbol_id),
            _ => {
                let kind = symbol.kind;
                self.emit(
                    codes::SIG_NOT_A_TYPE,
                    format!("`{}` is not a type (it is a {:?})", name.name, kind),
                    name.span,
                    module,
                );
                None
            }
        }
    }

    /// Resolve a possibly qualified name to a symbol, sharing the lookup
    /// rules between type and (later) value references.
    pub(crate) fn lookup_symbol(
        &mut self,
        module: &DottedName,
        name: &QualName,
        missing_code: l0c_util::DiagnosticCode,
    ) -> Option<SymbolId> {
        lookup_symbol(self.result, self.handler, module, name, missing_code)
    }

    /// Resolve an alias symbol's target, detecting cycles.
    fn alias_type(&mut self, id: SymbolId) -> Option<Type> {
        match self.alias_states.get(&id) {
            Some(AliasState::Done(ty)) => return Some(ty.clone()),
            Some(AliasState::Failed) => return None,
            Some(AliasState::Resolving) => {
                let symbol = &self.result.symbols[id];
                let (name, span, module) = (
                    symbol.name.clone(),
                    symbol.name_span,
                    symbol.module.clone(),
                );
                self.emit(
                    codes::SIG_ALIAS_CYCLE,
                    format!("type alias `{}` refers to itself", name),
                    span,
                    &module,
                );
                self.alias_states.insert(id, AliasState::Failed);
                return None;
            }
            None => {}
        }

        self.alias_states.insert(id, AliasState::Resolving);

        let symbol = &self.result.symbols[id];
        let module = symbol.module.clone();
        let decl_index = symbol.decl_index;
        let ast = Rc::clone(&self.result.unit.asts[&module]);
        let TopDecl::TypeAlias(alias) = &ast.decls[decl_index] else {
            self.alias_states.insert(id, AliasState::Failed);
            return None;
        };

        let resolved = self.resolve_type_ref(&module, &alias.target, false);
        match &resolved {
            Some(ty) => {
                self.alias_states.insert(id, AliasState::Done(ty.clone()));
                self.result.symbols[id].ty = Some(ty.clone());
            }
            None => {
                // Keep Failed if the cycle path already marked it.
                self.alias_states
                    .entry(id)
                    .and_modify(|s| {
                        if matches!(s, AliasState::Resolving) {
                            *s = AliasState::Failed;
                        }
                    });
            }
        }
        resolved
    }

    // -----------------------------------------------------------------------
    // Value-type dependency cycles
    // -----------------------------------------------------------------------

    /// Detect structs/enums that contain themselves by value.
    fn check_value_cycles(&mut self) {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Grey,
            Black,
        }

        let keys: Vec<(DottedName, String)> = self
            .result
            .struct_infos
            .keys()
            .chain(self.result.enum_infos.keys())
            .cloned()
            .collect();
        let mut colors: FxHashMap<(DottedName, String), Color> =
            keys.iter().map(|k| (k.clone(), Color::White)).collect();

        fn by_value_edges(result: &AnalysisResult, key: &(DottedName, String)) -> Vec<(DottedName, String)> {
            let mut out = Vec::new();
            let mut push_ty = |ty: &Type, out: &mut Vec<(DottedName, String)>| {
                // Pointers break the by-value chain; nullables do not.
                match ty.strip_nullable() {
                    Type::Struct { module, name } | Type::Enum { module, name } => {
                        out.push((module.clone(), name.clone()));
                    }
                    _ => {}
                }
            };
            if let Some(info) = result.struct_infos.get(key) {
                for (_, ty) in &info.fields {
                    push_ty(ty, &mut out);
                }
            }
            if let Some(info) = result.enum_infos.get(key) {
                for variant in &info.variants {
                    for (_, ty) in &variant.fields {
                        push_ty(ty, &mut out);
                    }
                }
            }
            out
        }

        fn visit(
            result: &AnalysisResult,
            handler: &Handler,
            colors: &mut FxHashMap<(DottedName, String), Color>,
            stack: &mut Vec<(DottedName, String)>,
            key: &(DottedName, String),
        ) {
            match colors.get(key) {
                Some(Color::Black) => return,
                Some(Color::Grey) => {
                    let pos = stack.iter().position(|k| k == key).unwrap_or(0);
                    let cycle: Vec<String> = stack[pos..]
                        .iter()
                        .chain(std::iter::once(key))
                        .map(|(m, n)| format!("{}::{}", m, n))
                        .collect();
                    let span = result
                        .struct_infos
                        .get(key)
                        .map(|i| i.span)
                        .or_else(|| result.enum_infos.get(key).map(|i| i.span))
                        .unwrap_or(Span::DUMMY);
                    handler.emit(
                        Diagnostic::error(
                            codes::SIG_VALUE_CYCLE,
                            format!(
                                "type contains itself by value: {}",
                                cycle.join(" -> ")
                            ),
                        )
                        .with_span(span)
                        .with_module(key.0.clone()),
                    );
                    return;
                }
                _ => {}
            }

            colors.insert(key.clone(), Color::Grey);
            stack.push(key.clone());
            for next in by_value_edges(result, key) {
                if colors.contains_key(&next) {
                    visit(result, handler, colors, stack, &next);
                }
            }
            stack.pop();
            colors.insert(key.clone(), Color::Black);
        }

        let mut stack = Vec::new();
        for key in &keys {
            visit(self.result, self.handler, &mut colors, &mut stack, key);
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn set_symbol_type(&mut self, module: &DottedName, name: &str, ty: Type) {
        if let Some(env) = self.result.module_envs.get(module) {
            if let Some(&id) = env.locals.get(name) {
                self.result.symbols[id].ty = Some(ty);
            }
        }
    }

    fn emit(
        &self,
        code: l0c_util::DiagnosticCode,
        message: String,
        span: Span,
        module: &DottedName,
    ) {
        self.handler.emit(
            Diagnostic::error(code, message)
                .with_span(span)
                .with_module(module.clone()),
        );
    }
}

/// Resolve a possibly qualified name to a symbol: the shared lookup rule for
/// type references and value references.
///
/// A qualifier must name the current module or one of its imports; an
/// unqualified name goes through the merged environment, reporting ambiguity
/// on use.
pub(crate) fn lookup_symbol(
    result: &AnalysisResult,
    handler: &Handler,
    module: &DottedName,
    name: &QualName,
    missing_code: l0c_util::DiagnosticCode,
) -> Option<SymbolId> {
    let emit = |code, message: String, span: Span| {
        handler.emit(
            Diagnostic::error(code, message)
                .with_span(span)
                .with_module(module.clone()),
        );
    };

    match &name.module {
        Some(qualifier) => {
            let importing = result
                .unit
                .asts
                .get(module)
                .map(|m| m.imports.iter().any(|i| &i.name == qualifier))
                .unwrap_or(false);
            if qualifier != module && !importing {
                emit(
                    codes::NAM_UNKNOWN_MODULE,
                    format!("module `{}` is not imported here", qualifier),
                    name.span,
                );
                return None;
            }
            let Some(env) = result.module_envs.get(qualifier) else {
                emit(
                    codes::NAM_UNKNOWN_MODULE,
                    format!("module `{}` is not part of this compilation unit", qualifier),
                    name.span,
                );
                return None;
            };
            match env.locals.get(&name.name) {
                Some(&id) => Some(id),
                None => {
                    emit(
                        missing_code,
                        format!("`{}` is not defined in module `{}`", name.name, qualifier),
                        name.span,
                    );
                    None
                }
            }
        }
        None => {
            let env = result.module_envs.get(module)?;
            match env.lookup(&name.name) {
                Lookup::Local(id) | Lookup::Imported(id) => Some(id),
                Lookup::Ambiguous(sources) => {
                    let from: Vec<String> =
                        sources.iter().map(|(m, _)| format!("`{}`", m)).collect();
                    emit(
                        codes::NAM_AMBIGUOUS,
                        format!(
                            "`{}` is ambiguous: imported from {}",
                            name.name,
                            from.join(" and ")
                        ),
                        name.span,
                    );
                    None
                }
                Lookup::Missing => {
                    emit(
                        missing_code,
                        format!("unknown name `{}`", name.name),
                        name.span,
                    );
                    None
                }
            }
        }
    }
}

/// Resolve a type reference after signature resolution has filled every
/// type symbol, so aliases read straight from `Symbol.ty`. Used by the type
/// checker for local annotations, casts, and type arguments.
pub(crate) fn resolve_type_ref_resolved(
    result: &AnalysisResult,
    handler: &Handler,
    module: &DottedName,
    tr: &TypeRef,
    allow_void: bool,
) -> Option<Type> {
    let emit = |code, message: String| {
        handler.emit(
            Diagnostic::error(code, message)
                .with_span(tr.span)
                .with_module(module.clone()),
        );
    };

    let base = if tr.name.module.is_none() && tr.name.extra.is_empty() {
        match tr.name.name.as_str() {
            "int" => Some(Type::Int),
            "byte" => Some(Type::Byte),
            "bool" => Some(Type::Bool),
            "string" => Some(Type::String),
            "void" => Some(Type::Void),
            _ => None,
        }
    } else {
        None
    };

    let base = match base {
        Some(base) => base,
        None => {
            if !tr.name.extra.is_empty() {
                emit(
                    codes::NAM_MULTI_SEGMENT,
                    format!("`{}` has more than one `::` segment", render_qual(&tr.name)),
                );
                return None;
            }
            let id = lookup_symbol(result, handler, module, &tr.name, codes::SIG_UNKNOWN_TYPE)?;
            let symbol = &result.symbols[id];
            match symbol.kind {
                SymbolKind::Struct | SymbolKind::Enum | SymbolKind::TypeAlias => {
                    match &symbol.ty {
                        Some(ty) => ty.clone(),
                        // Signature resolution already diagnosed the alias.
                        None => return None,
                    }
                }
                kind => {
                    emit(
                        codes::SIG_NOT_A_TYPE,
                        format!("`{}` is not a type (it is a {:?})", tr.name.name, kind),
                    );
                    return None;
                }
            }
        }
    };

    if base == Type::Void {
        if tr.ptr_depth > 0 || tr.nullable || !allow_void {
            emit(
                codes::SIG_VOID_IN_TYPE,
                "`void` is only valid as a bare function return type".to_string(),
            );
            return None;
        }
        return Some(Type::Void);
    }

    let mut ty = base;
    for _ in 0..tr.ptr_depth {
        ty = Type::Pointer(Box::new(ty));
    }
    if tr.nullable {
        if ty.is_nullable() {
            emit(
                codes::SIG_DOUBLE_NULLABLE,
                format!("`{}` is already nullable", ty),
            );
            return None;
        }
        ty = Type::Nullable(Box::new(ty));
    }
    Some(ty)
}

/// Best-effort type of a literal initializer, for unannotated top-level lets.
fn infer_literal_type(expr: &l0c_par::ast::Expr) -> Option<Type> {
    use l0c_par::ast::ExprKind;
    match &expr.kind {
        ExprKind::Int(_) => Some(Type::Int),
        ExprKind::Byte(_) => Some(Type::Byte),
        ExprKind::Bool(_) => Some(Type::Bool),
        ExprKind::Str(_) => Some(Type::String),
        ExprKind::Unary {
            op: l0c_par::ast::UnOp::Neg,
            operand,
        } => match operand.kind {
            ExprKind::Int(_) => Some(Type::Int),
            _ => None,
        },
        _ => None,
    }
}

/// Render a qualified name for diagnostics.
fn render_qual(name: &QualName) -> String {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::analyze_sources;

    #[test]
    fn test_function_signature_resolved() {
        let (result, handler) = analyze_sources(&[(
            "m",
            "module m;\nfunc f(a: int, s: string?) -> bool { return true; }\n",
        )]);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());

        let key = (DottedName::parse("m").unwrap(), "f".to_string());
        let sig = &result.func_types[&key];
        assert_eq!(sig.params, vec![Type::Int, Type::String.nullable()]);
        assert_eq!(sig.result, Type::Bool);
    }

    #[test]
    fn test_struct_and_enum_infos() {
        let (result, handler) = analyze_sources(&[(
            "m",
            "module m;\n\
             struct Point { x: int; y: int; }\n\
             enum Shape { Circle(r: int); Rect(w: int, h: int); }\n",
        )]);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());

        let m = DottedName::parse("m").unwrap();
        let point = &result.struct_infos[&(m.clone(), "Point".to_string())];
        assert_eq!(point.fields.len(), 2);

        let shape = &result.enum_infos[&(m.clone(), "Shape".to_string())];
        assert_eq!(shape.variants.len(), 2);
        assert_eq!(shape.variant_index("Rect"), Some(1));
        assert_eq!(shape.variants[1].fields.len(), 2);
    }

    #[test]
    fn test_alias_resolves_through() {
        let (result, handler) = analyze_sources(&[(
            "m",
            "module m;\ntype Id = int;\nfunc f(x: Id) -> Id { return x; }\n",
        )]);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());

        let key = (DottedName::parse("m").unwrap(), "f".to_string());
        assert_eq!(result.func_types[&key].params, vec![Type::Int]);
    }

    #[test]
    fn test_alias_cycle_detected() {
        let (_, handler) = analyze_sources(&[(
            "m",
            "module m;\ntype A = B;\ntype B = A;\n",
        )]);
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.code == codes::SIG_ALIAS_CYCLE));
    }

    #[test]
    fn test_value_cycle_detected() {
        let (_, handler) = analyze_sources(&[(
            "m",
            "module m;\nstruct Node { next: Node; }\n",
        )]);
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.code == codes::SIG_VALUE_CYCLE));
    }

    #[test]
    fn test_pointer_breaks_value_cycle() {
        let (_, handler) = analyze_sources(&[(
            "m",
            "module m;\nstruct Node { value: int; next: Node*?; }\n",
        )]);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
    }

    #[test]
    fn test_mutual_value_cycle_detected() {
        let (_, handler) = analyze_sources(&[(
            "m",
            "module m;\nstruct A { b: B; }\nstruct B { a: A; }\n",
        )]);
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.code == codes::SIG_VALUE_CYCLE));
    }

    #[test]
    fn test_unknown_type() {
        let (_, handler) = analyze_sources(&[(
            "m",
            "module m;\nfunc f(x: Ghost) {}\n",
        )]);
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.code == codes::SIG_UNKNOWN_TYPE));
    }

    #[test]
    fn test_non_type_used_as_type() {
        let (_, handler) = analyze_sources(&[(
            "m",
            "module m;\nfunc g() {}\nfunc f(x: g) {}\n",
        )]);
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.code == codes::SIG_NOT_A_TYPE));
    }

    #[test]
    fn test_void_only_as_bare_return() {
        let (_, handler) = analyze_sources(&[(
            "m",
            "module m;\nfunc f(x: void) {}\n",
        )]);
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.code == codes::SIG_VOID_IN_TYPE));

        let (_, handler) = analyze_sources(&[(
            "m",
            "module m;\nfunc f() -> void? {}\n",
        )]);
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.code == codes::SIG_VOID_IN_TYPE));
    }

    #[test]
    fn test_alias_nullable_double_wrap_rejected() {
        let (_, handler) = analyze_sources(&[(
            "m",
            "module m;\ntype MaybeInt = int?;\nfunc f(x: MaybeInt?) {}\n",
        )]);
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.code == codes::SIG_DOUBLE_NULLABLE));
    }

    #[test]
    fn test_qualified_type_reference() {
        let (result, handler) = analyze_sources(&[
            ("geo", "module geo;\nstruct Point { x: int; }\n"),
            (
                "app",
                "module app;\nimport geo;\nfunc f(p: geo::Point*) {}\n",
            ),
        ]);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());

        let key = (DottedName::parse("app").unwrap(), "f".to_string());
        match &result.func_types[&key].params[0] {
            Type::Pointer(inner) => {
                assert!(matches!(&**inner, Type::Struct { name, .. } if name == "Point"));
            }
            other => panic!("expected pointer, got {:?}", other),
        }
    }

    #[test]
    fn test_unimported_module_qualifier() {
        let (_, handler) = analyze_sources(&[
            ("geo", "module geo;\nstruct Point { x: int; }\n"),
            ("app", "module app;\nfunc f(p: geo::Point) {}\n"),
        ]);
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.code == codes::NAM_UNKNOWN_MODULE));
    }

    #[test]
    fn test_multi_segment_path_rejected() {
        let (_, handler) = analyze_sources(&[(
            "m",
            "module m;\nstruct S { x: int; }\nfunc f(p: m::S::T) {}\n",
        )]);
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.code == codes::NAM_MULTI_SEGMENT));
    }
}
