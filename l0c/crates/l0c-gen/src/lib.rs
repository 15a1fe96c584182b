//! l0c-gen - C99 lowering backend.
//!
//! Consumes an error-free [`AnalysisResult`] and emits one C99 translation
//! unit, in this order: trace defines (before the runtime include), the
//! runtime include, forward declarations for user types, early wrapper
//! typedefs (the builtin optionals are owned by the runtime header), type
//! definitions in by-value dependency order, late wrapper typedefs for user
//! value types made nullable, ARC retain/release helpers, string literal
//! statics, top-level `let` globals, function declarations, function
//! definitions, and the `main` entry wrapper when the entry module defines
//! `main`.
//!
//! The backend refuses to emit while error diagnostics exist. Internal
//! consistency violations surface as `ICE-` diagnostics; they are fatal to
//! the translation unit but not to the process.

mod c99;
mod cwriter;
pub mod error;
pub mod types;


use indexmap::IndexMap;

use l0c_par::ast::{Expr, ExprKind, TopDecl, UnOp};
use l0c_sem::{AnalysisResult, Type};
use l0c_util::diagnostic::codes;
use l0c_util::{Diagnostic, DottedName, Handler, Severity, SourceMap};

use c99::FuncLowerer;
use cwriter::CWriter;
use error::{CodegenError, Result};
use types::{cdecl, ctype, mangle_item};

/// Codegen toggles, per the driver contract.
#[derive(Clone, Debug)]
pub struct CodegenOptions {
    /// Emit `#line` directives mapping back to source. On by default.
    pub line_directives: bool,
    /// Define `L0_TRACE_ARC 1` before the runtime include.
    pub trace_arc: bool,
    /// Define `L0_TRACE_MEMORY 1` before the runtime include.
    pub trace_memory: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            line_directives: true,
            trace_arc: false,
            trace_memory: false,
        }
    }
}

/// Interned string literals; each distinct byte sequence becomes one
/// file-scope static.
pub(crate) struct LitTable {
    entries: IndexMap<Vec<u8>, usize>,
}

impl LitTable {
    fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Intern decoded bytes, returning the C name of the static.
    pub(crate) fn intern(&mut self, bytes: &[u8]) -> String {
        let next = self.entries.len();
        let index = *self.entries.entry(bytes.to_vec()).or_insert(next);
        format!("l0_strlit_{}", index)
    }

    /// Emit the literal statics.
    fn emit(&self, w: &mut CWriter) {
        if self.entries.is_empty() {
            return;
        }
        w.line("/* string literals */");
        for (bytes, index) in &self.entries {
            w.line(&format!(
                "static l0_str l0_strlit_{} = L0_STRING_CONST({}, {});",
                index,
                c_string_literal(bytes),
                bytes.len()
            ));
        }
        w.blank();
    }
}

/// Emit the whole translation unit.
///
/// `source_map` supplies the file paths used in `#line` directives.
pub fn emit_unit(
    analysis: &AnalysisResult,
    source_map: &SourceMap,
    handler: &Handler,
    options: &CodegenOptions,
) -> Result<String> {
    let error_count = analysis
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    if error_count > 0 {
        handler.emit(Diagnostic::error(
            codes::BAK_ERRORS_PRESENT,
            format!(
                "refusing to emit C: {} error diagnostic(s) present",
                error_count
            ),
        ));
        return Err(CodegenError::ErrorsPresent(error_count));
    }

    match emit_unit_inner(analysis, source_map, options) {
        Ok(text) => Ok(text),
        Err(err) => {
            let code = match &err {
                CodegenError::MissingExprType(_) => codes::ICE_MISSING_EXPR_TYPE,
                CodegenError::MainWithParams => codes::BAK_MAIN_PARAMS,
                _ => codes::ICE_BAD_SHAPE,
            };
            handler.emit(Diagnostic::error(code, err.to_string()));
            Err(err)
        }
    }
}

fn emit_unit_inner(
    analysis: &AnalysisResult,
    source_map: &SourceMap,
    options: &CodegenOptions,
) -> Result<String> {
    let mut literals = LitTable::new();

    // Lower globals and functions first; they populate the literal table.
    let mut globals = CWriter::new();
    let mut defs = String::new();
    let mut decls = CWriter::new();

    for module_name in &analysis.unit.modules {
        let module = &analysis.unit.asts[module_name];
        let file_path = source_map
            .file(module.file_id)
            .map(|f| f.path.display().to_string())
            .unwrap_or_else(|| format!("{}.l0", module_name.joined("/")));

        for decl in &module.decls {
            match decl {
                TopDecl::TopLet(l) => {
                    let key = (module_name.clone(), l.name.clone());
                    let ty = analysis
                        .let_types
                        .get(&key)
                        .ok_or_else(|| {
                            CodegenError::BadShape(format!("untyped global `{}`", l.name))
                        })?
                        .clone();
                    let init = global_initializer(&l.init, &ty, &mut literals)?;
                    globals.line(&format!(
                        "static {} = {};",
                        cdecl(&ty, &mangle_item(module_name, &l.name)),
                        init
                    ));
                }
                TopDecl::Func(f) => {
                    let key = (module_name.clone(), f.name.clone());
                    let sig = analysis.func_types.get(&key).ok_or_else(|| {
                        CodegenError::BadShape(format!("unresolved function `{}`", f.name))
                    })?;
                    let param_types: Vec<String> = if sig.params.is_empty() {
                        vec!["void".to_string()]
                    } else {
                        sig.params.iter().map(|t| cdecl(t, "")).collect()
                    };

                    if f.is_extern {
                        // The runtime's own helpers are already defined by
                        // the included header; redeclaring them as extern
                        // would fight their internal linkage.
                        if !is_runtime_name(&f.name) {
                            decls.line(&format!(
                                "extern {} {}({});",
                                ctype(&sig.result),
                                f.name,
                                param_types.join(", ")
                            ));
                        }
                    } else {
                        decls.line(&format!(
                            "static {} {}({});",
                            ctype(&sig.result),
                            mangle_item(module_name, &f.name),
                            param_types.join(", ")
                        ));

                        let body = FuncLowerer::lower_function(
                            analysis,
                            &mut literals,
                            module_name,
                            f,
                            options.line_directives,
                            &file_path,
                        )?;
                        defs.push_str(&body);
                        defs.push('\n');
                    }
                }
                _ => {}
            }
        }
    }

    let entry_wrapper = emit_entry_wrapper(analysis)?;

    // Assemble the unit in the documented order.
    let mut w = CWriter::new();
    w.line("/* generated C99 translation unit */");
    w.blank();
    if options.trace_arc {
        w.raw_line("#define L0_TRACE_ARC 1");
    }
    if options.trace_memory {
        w.raw_line("#define L0_TRACE_MEMORY 1");
    }
    w.raw_line(&format!("#include \"{}\"", l0c_rt::RUNTIME_HEADER_NAME));
    w.blank();

    types::emit_forward_decls(analysis, &mut w);

    // Early wrappers: the builtin-payload optionals are part of the runtime
    // header's API, so this phase has nothing left to define.
    types::emit_type_defs(analysis, &mut w);
    types::emit_late_wrappers(analysis, &mut w);
    types::emit_arc_helpers(analysis, &mut w);

    literals.emit(&mut w);

    let mut out = w.finish();
    if !globals.is_empty() {
        out.push_str("/* top-level bindings */\n");
        out.push_str(globals.as_str());
        out.push('\n');
    }
    if !decls.is_empty() {
        out.push_str("/* function declarations */\n");
        out.push_str(decls.as_str());
        out.push('\n');
    }
    out.push_str(&defs);
    if let Some(wrapper) = entry_wrapper {
        out.push_str(&wrapper);
    }
    Ok(out)
}

/// The `int main(int argc, char **argv)` wrapper, when the entry module
/// defines a (non-extern) `main`.
fn emit_entry_wrapper(analysis: &AnalysisResult) -> Result<Option<String>> {
    let entry = &analysis.unit.entry;
    let module = &analysis.unit.asts[entry];
    let main = module.decls.iter().find_map(|d| match d {
        TopDecl::Func(f) if f.name == "main" && !f.is_extern => Some(f),
        _ => None,
    });
    let Some(main) = main else {
        return Ok(None);
    };
    if !main.params.is_empty() {
        return Err(CodegenError::MainWithParams);
    }

    let sig = analysis
        .func_types
        .get(&(entry.clone(), "main".to_string()))
        .ok_or_else(|| CodegenError::BadShape("unresolved entry main".to_string()))?;
    let mangled = mangle_item(entry, "main");

    let mut w = CWriter::new();
    w.line("int main(int argc, char **argv) {");
    w.indent();
    w.line("_rt_init_args(argc, argv);");
    match &sig.result {
        Type::Int => w.line(&format!("return (int){}();", mangled)),
        Type::Bool => w.line(&format!("return {}() ? 1 : 0;", mangled)),
        Type::Void => {
            w.line(&format!("{}();", mangled));
            w.line("return 0;");
        }
        _ => {
            w.line(&format!("(void){}();", mangled));
            w.line("return 0;");
        }
    }
    w.dedent();
    w.line("}");
    Ok(Some(w.finish()))
}

/// Names provided by the runtime header itself.
fn is_runtime_name(name: &str) -> bool {
    name.starts_with("rt_") || name.starts_with("_rt")
}

/// C initializer for a top-level `let`. The checker restricted these to
/// literals, so static initialization is always possible.
fn global_initializer(expr: &Expr, ty: &Type, literals: &mut LitTable) -> Result<String> {
    let value = match &expr.kind {
        ExprKind::Int(v) => v.to_string(),
        ExprKind::Byte(b) => b.to_string(),
        ExprKind::Bool(true) => "L0_TRUE".to_string(),
        ExprKind::Bool(false) => "L0_FALSE".to_string(),
        ExprKind::Str(bytes) => format!("(&{})", literals.intern(bytes)),
        ExprKind::Null => {
            return Ok(match ty {
                Type::Nullable(inner) if matches!(&**inner, Type::Pointer(_)) => {
                    "NULL".to_string()
                }
                _ => "{ 0 }".to_string(),
            });
        }
        ExprKind::Unary {
            op: UnOp::Neg,
            operand,
        } => match &operand.kind {
            ExprKind::Int(v) if *v == 2_147_483_648 => "(-2147483647 - 1)".to_string(),
            ExprKind::Int(v) => format!("(-{})", v),
            _ => {
                return Err(CodegenError::BadShape(
                    "non-literal global initializer".to_string(),
                ))
            }
        },
        _ => {
            return Err(CodegenError::BadShape(
                "non-literal global initializer".to_string(),
            ))
        }
    };

    // Widen `T` to `T?` with a braced initializer (statics cannot use
    // compound literals).
    if let Type::Nullable(inner) = ty {
        if !matches!(&**inner, Type::Pointer(_)) {
            return Ok(format!("{{ L0_TRUE, {} }}", value));
        }
    }
    Ok(value)
}

/// Render decoded bytes as a C string literal.
fn c_string_literal(bytes: &[u8]) -> String {
    let mut out = String::from("\"");
    for &b in bytes {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            b'\r' => out.push_str("\\r"),
            0x20..=0x7e => out.push(b as char),
            // Three-digit octal so a following digit cannot extend the
            // escape.
            _ => out.push_str(&format!("\\{:03o}", b)),
        }
    }
    out.push('"');
    out
}

/// Quick access for the driver: the unit's entry module defines `main`.
pub fn entry_defines_main(analysis: &AnalysisResult) -> bool {
    analysis.unit.asts[&analysis.unit.entry]
        .decls
        .iter()
        .any(|d| matches!(d, TopDecl::Func(f) if f.name == "main" && !f.is_extern))
}

/// Mangled C name of a top-level item, exposed for driver/tests.
pub fn c_name_of(module: &DottedName, name: &str) -> String {
    mangle_item(module, name)
}
