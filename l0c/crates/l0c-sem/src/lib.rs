//! l0c-sem - Semantic analysis pipeline.
//!
//! Four passes over a loaded compilation unit, in order:
//!
//! 1. [`names`] - per-module environments (local symbols + open imports),
//! 2. [`sigs`] - signature and type-reference resolution with alias and
//!    value-type cycle detection,
//! 3. [`scope`] - lexical scope trees for non-extern functions,
//! 4. [`check`] - expression/statement type checking, match exhaustiveness,
//!    and flow-sensitive dropped-variable tracking.
//!
//! A pass never aborts the pipeline on a user error; diagnostics accumulate
//! in the shared handler and each pass sorts its own tail by source
//! position. Lowering is gated on the error count by the driver.

pub mod analysis;
mod check;
mod names;
mod scope;
mod sigs;
pub mod types;

pub use analysis::{
    AnalysisResult, Binding, BindingId, BindingKind, EnumInfo, FuncType, FunctionEnv, Intrinsic,
    Lookup, ModuleEnv, QualKey, ScopeId, StructInfo, Symbol, SymbolId, SymbolKind, VarTarget,
    VariantInfo,
};
pub use check::{block_returns, stmt_returns};
pub use types::Type;

use l0c_load::CompilationUnit;
use l0c_util::Handler;

/// Run the full semantic pipeline over a loaded unit.
///
/// The result always carries whatever could be resolved; callers gate
/// lowering on [`Handler::has_errors`] (mirrored into
/// [`AnalysisResult::diagnostics`]).
pub fn analyze(unit: CompilationUnit, handler: &Handler) -> AnalysisResult {
    let mut result = AnalysisResult::new(unit);

    let mark = handler.mark();
    names::resolve(&mut result, handler);
    handler.sort_tail(mark);

    let mark = handler.mark();
    sigs::resolve(&mut result, handler);
    handler.sort_tail(mark);

    let mark = handler.mark();
    scope::resolve(&mut result, handler);
    handler.sort_tail(mark);

    let mark = handler.mark();
    check::run(&mut result, handler);
    handler.sort_tail(mark);

    result.diagnostics = handler.diagnostics();
    result
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::fs;

    use l0c_load::{Loader, SearchRoots};
    use l0c_util::{DottedName, Handler, SourceMap};

    use crate::analysis::AnalysisResult;

    /// Write the given `(module_name, source)` pairs into a temp tree, load
    /// the last one as the entry module, and run the full pipeline.
    pub(crate) fn analyze_sources(sources: &[(&str, &str)]) -> (AnalysisResult, Handler) {
        let dir = tempfile::TempDir::new().unwrap();
        for (name, source) in sources {
            let rel = DottedName::parse(name).unwrap().rel_path("l0");
            let path = dir.path().join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, source).unwrap();
        }

        let handler = Handler::new();
        let mut source_map = SourceMap::new();
        let roots = SearchRoots::new(Vec::new(), vec![dir.path().to_path_buf()]);
        let entry = DottedName::parse(sources.last().unwrap().0).unwrap();

        let unit = {
            let mut loader = Loader::new(roots, &handler, &mut source_map);
            loader
                .load_unit(&entry)
                .expect("entry module must load in tests")
        };

        let result = crate::analyze(unit, &handler);
        (result, handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_support::analyze_sources;

    #[test]
    fn test_pipeline_produces_complete_result() {
        let (result, handler) = analyze_sources(&[
            ("lib", "module lib;\nfunc double(x: int) -> int { return x * 2; }\n"),
            (
                "app",
                "module app;\nimport lib;\nfunc main() -> int { return double(21); }\n",
            ),
        ]);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());

        assert_eq!(result.unit.modules.len(), 2);
        assert_eq!(result.module_envs.len(), 2);
        assert_eq!(result.func_types.len(), 2);
        assert_eq!(result.func_envs.len(), 2);
        assert!(!result.expr_types.is_empty());
        assert!(!result.var_targets.is_empty());
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_diagnostics_snapshot_in_result() {
        let (result, handler) = analyze_sources(&[(
            "m",
            "module m;\nfunc f() -> int { return missing; }\n",
        )]);
        assert!(handler.has_errors());
        assert_eq!(result.diagnostics.len(), handler.diagnostics().len());
    }

    #[test]
    fn test_errors_do_not_abort_later_functions() {
        // The first function has a type error; the second is still checked
        // and gets its own diagnostic.
        let (_, handler) = analyze_sources(&[(
            "m",
            "module m;\n\
             func f() -> int { return true; }\n\
             func g() -> int { return \"no\"; }\n",
        )]);
        let returns = handler
            .diagnostics()
            .iter()
            .filter(|d| d.code == l0c_util::diagnostic::codes::TYP_RETURN_MISMATCH)
            .count();
        assert_eq!(returns, 2);
    }
}
