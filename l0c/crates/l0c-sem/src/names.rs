//! Name resolution: per-module environments.
//!
//! Two phases, run per module leaves-first:
//!
//! 1. insert every locally defined symbol (functions, structs, enums and
//!    their variants, aliases, top-level lets), diagnosing duplicates;
//! 2. open-import every exported symbol of each imported module, recording
//!    one entry per source module so a name imported twice can be flagged
//!    as ambiguous when (and only when) it is referenced.
//!
//! This pass produces no types; it only associates names with [`Symbol`]
//! records.

use std::rc::Rc;

use l0c_par::ast::TopDecl;
use l0c_util::diagnostic::codes;
use l0c_util::{Diagnostic, DottedName, Handler};

use crate::analysis::{AnalysisResult, ModuleEnv, Symbol, SymbolId, SymbolKind};

/// Build every module's environment.
pub(crate) fn resolve(result: &mut AnalysisResult, handler: &Handler) {
    let modules: Vec<(DottedName, Rc<l0c_par::ast::Module>)> = result
        .unit
        .modules
        .iter()
        .map(|name| (name.clone(), Rc::clone(&result.unit.asts[name])))
        .collect();

    // Phase 1: local symbols.
    for (name, module) in &modules {
        let mark = handler.mark();
        let mut env = ModuleEnv::new(name.clone());

        for (decl_index, decl) in module.decls.iter().enumerate() {
            let kind = match decl {
                TopDecl::Func(_) => SymbolKind::Func,
                TopDecl::Struct(_) => SymbolKind::Struct,
                TopDecl::Enum(_) => SymbolKind::Enum,
                TopDecl::TypeAlias(_) => SymbolKind::TypeAlias,
                TopDecl::TopLet(_) => SymbolKind::Let,
            };

            insert_local(
                result,
                handler,
                &mut env,
                kind,
                name,
                decl.name(),
                decl.name_span(),
                decl_index,
                None,
            );

            // Enum variants are module-level symbols of their own.
            if let TopDecl::Enum(e) = decl {
                for (variant_index, variant) in e.variants.iter().enumerate() {
                    insert_local(
                        result,
                        handler,
                        &mut env,
                        SymbolKind::EnumVariant,
                        name,
                        &variant.name,
                        variant.span,
                        decl_index,
                        Some(variant_index),
                    );
                }
            }
        }

        result.module_envs.insert(name.clone(), env);
        handler.sort_tail(mark);
    }

    // Phase 2: open imports.
    for (name, module) in &modules {
        let mut additions: Vec<(String, DottedName, SymbolId)> = Vec::new();
        for import in &module.imports {
            let Some(exporter) = result.module_envs.get(&import.name) else {
                // The loader already diagnosed the missing module.
                continue;
            };
            for (exported_name, &symbol) in &exporter.locals {
                additions.push((exported_name.clone(), import.name.clone(), symbol));
            }
        }

        let env = result
            .module_envs
            .get_mut(name)
            .expect("environment inserted in phase 1");
        for (exported_name, source, symbol) in additions {
            env.imported
                .entry(exported_name)
                .or_default()
                .push((source, symbol));
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn insert_local(
    result: &mut AnalysisResult,
    handler: &Handler,
    env: &mut ModuleEnv,
    kind: SymbolKind,
    module: &DottedName,
    name: &str,
    name_span: l0c_util::Span,
    decl_index: usize,
    variant_index: Option<usize>,
) {
    if let Some(&existing) = env.locals.get(name) {
        let first_span = result.symbols[existing].name_span;
        handler.emit(
            Diagnostic::error(
                codes::NAM_DUPLICATE_DEF,
                format!(
                    "`{}` is defined more than once in module `{}` (first defined at line {})",
                    name, module, first_span.line
                ),
            )
            .with_span(name_span)
            .with_module(module.clone()),
        );
        return;
    }

    let id = result.symbols.push(Symbol {
        kind,
        module: module.clone(),
        name: name.to_string(),
        name_span,
        decl_index,
        variant_index,
        ty: None,
    });
    env.locals.insert(name.to_string(), id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Lookup;
    use crate::test_support::analyze_sources;

    #[test]
    fn test_local_symbols_registered() {
        let (result, handler) = analyze_sources(&[(
            "m",
            "module m;\n\
             func f() {}\n\
             struct S { x: int; }\n\
             enum E { A(); B(v: int); }\n\
             type T = int;\n\
             let g: int = 1;\n",
        )]);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());

        let env = &result.module_envs[&l0c_util::DottedName::parse("m").unwrap()];
        for name in ["f", "S", "E", "A", "B", "T", "g"] {
            assert!(
                matches!(env.lookup(name), Lookup::Local(_)),
                "missing {}",
                name
            );
        }
    }

    #[test]
    fn test_duplicate_definition() {
        let (_, handler) = analyze_sources(&[(
            "m",
            "module m;\nfunc f() {}\nstruct f { x: int; }\n",
        )]);
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.code == codes::NAM_DUPLICATE_DEF));
    }

    #[test]
    fn test_variant_collides_with_decl() {
        let (_, handler) = analyze_sources(&[(
            "m",
            "module m;\nfunc Red() {}\nenum Color { Red(); }\n",
        )]);
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.code == codes::NAM_DUPLICATE_DEF));
    }

    #[test]
    fn test_open_import_brings_symbols() {
        let (result, handler) = analyze_sources(&[
            ("lib", "module lib;\nfunc helper() {}\n"),
            ("app", "module app;\nimport lib;\n"),
        ]);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());

        let env = &result.module_envs[&l0c_util::DottedName::parse("app").unwrap()];
        assert!(matches!(env.lookup("helper"), Lookup::Imported(_)));
    }

    #[test]
    fn test_ambiguous_import_not_eagerly_reported() {
        let (result, handler) = analyze_sources(&[
            ("a", "module a;\nfunc shared() {}\n"),
            ("b", "module b;\nfunc shared() {}\n"),
            ("app", "module app;\nimport a;\nimport b;\n"),
        ]);
        // No reference to `shared`, so no ambiguity error.
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());

        let env = &result.module_envs[&l0c_util::DottedName::parse("app").unwrap()];
        assert!(matches!(env.lookup("shared"), Lookup::Ambiguous(_)));
    }
}
