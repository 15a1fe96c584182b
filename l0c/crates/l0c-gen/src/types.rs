//! Type lowering: mangled names, C type rendering, and the type sections of
//! the translation unit (forward declarations, topologically ordered
//! definitions, late optional wrappers, and ARC retain/release helpers for
//! value types that transitively contain strings).

use indexmap::IndexSet;
use l0c_sem::{AnalysisResult, QualKey, Type};
use l0c_util::DottedName;

use crate::cwriter::CWriter;

/// C keywords and names the emitter reserves for itself. Locals that
/// collide receive a fixed `_l0` suffix.
const C_KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
    "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef",
    "union", "unsigned", "void", "volatile", "while", "main", "NULL",
];

/// Mangle a top-level item: `l0_<module_segments>_<ident>`.
pub(crate) fn mangle_item(module: &DottedName, name: &str) -> String {
    format!("l0_{}_{}", module.joined("_"), name)
}

/// C name for a local identifier. Names colliding with C keywords or with
/// emitter-reserved prefixes get a fixed suffix.
pub(crate) fn mangle_local(name: &str) -> String {
    let reserved = C_KEYWORDS.contains(&name)
        || name.starts_with("l0_")
        || name.starts_with("L0_")
        || name.starts_with("rt_")
        || name.starts_with("_rt")
        || name.starts_with("_t")
        || name.starts_with("_c");
    if reserved {
        format!("{}_l0", name)
    } else {
        name.to_string()
    }
}

/// Name of the lowered struct/enum type.
pub(crate) fn type_name(module: &DottedName, name: &str) -> String {
    mangle_item(module, name)
}

/// Name of the optional wrapper for a non-pointer payload.
pub(crate) fn opt_name(inner: &Type) -> String {
    match inner {
        Type::Int => "l0_opt_int".to_string(),
        Type::Byte => "l0_opt_byte".to_string(),
        Type::Bool => "l0_opt_bool".to_string(),
        Type::String => "l0_opt_string".to_string(),
        Type::Struct { module, name } | Type::Enum { module, name } => {
            format!("l0_opt_{}_{}", module.joined("_"), name)
        }
        other => panic!("no optional wrapper for {:?}", other),
    }
}

/// Tag constant for an enum variant.
pub(crate) fn tag_const(module: &DottedName, enum_name: &str, variant: &str) -> String {
    format!("{}_tag_{}", type_name(module, enum_name), variant)
}

/// Tag enum type name.
pub(crate) fn tag_type(module: &DottedName, enum_name: &str) -> String {
    format!("{}_tag", type_name(module, enum_name))
}

/// Payload struct type for one variant.
pub(crate) fn payload_type(module: &DottedName, enum_name: &str, variant: &str) -> String {
    format!("{}_{}_t", type_name(module, enum_name), variant)
}

/// Release helper for an ARC-bearing value type.
pub(crate) fn release_helper(module: &DottedName, name: &str) -> String {
    format!("l0_release_{}_{}", module.joined("_"), name)
}

/// Retain helper for an ARC-bearing value type.
pub(crate) fn retain_helper(module: &DottedName, name: &str) -> String {
    format!("l0_retain_{}_{}", module.joined("_"), name)
}

/// Render a type as a C type name (usable without a declarator).
///
/// Function types need [`cdecl`]; they cannot be rendered standalone.
pub(crate) fn ctype(ty: &Type) -> String {
    match ty {
        Type::Int => "l0_int".to_string(),
        Type::Byte => "l0_byte".to_string(),
        Type::Bool => "l0_bool".to_string(),
        Type::String => "l0_string".to_string(),
        Type::Void => "void".to_string(),
        Type::Struct { module, name } | Type::Enum { module, name } => type_name(module, name),
        Type::Pointer(inner) => format!("{} *", ctype(inner)),
        Type::Nullable(inner) => match &**inner {
            // `T*?` shares the pointer representation; NULL is the niche.
            Type::Pointer(_) => ctype(inner),
            other => opt_name(other),
        },
        Type::Func { .. } => panic!("function types need a declarator"),
    }
}

/// Render a declaration of `name` with type `ty` (handles function
/// pointers, which C cannot spell without the declarator).
pub(crate) fn cdecl(ty: &Type, name: &str) -> String {
    match ty {
        Type::Func { params, result } => {
            let params = if params.is_empty() {
                "void".to_string()
            } else {
                params.iter().map(ctype).collect::<Vec<_>>().join(", ")
            };
            format!("{} (*{})({})", ctype(result), name, params)
        }
        other => format!("{} {}", ctype(other), name),
    }
}

/// Struct/enum keys of the unit in topological by-value dependency order,
/// ties broken by (module, name) lexicographically.
pub(crate) fn topo_type_order(analysis: &AnalysisResult) -> Vec<QualKey> {
    let mut keys: Vec<QualKey> = analysis
        .struct_infos
        .keys()
        .chain(analysis.enum_infos.keys())
        .cloned()
        .collect();
    keys.sort();

    let mut order = Vec::new();
    let mut visited: IndexSet<QualKey> = IndexSet::new();

    fn by_value_deps(analysis: &AnalysisResult, key: &QualKey) -> Vec<QualKey> {
        let mut deps = Vec::new();
        let mut push = |ty: &Type| {
            if let Type::Struct { module, name } | Type::Enum { module, name } =
                ty.strip_nullable()
            {
                deps.push((module.clone(), name.clone()));
            }
        };
        if let Some(info) = analysis.struct_infos.get(key) {
            for (_, ty) in &info.fields {
                push(ty);
            }
        }
        if let Some(info) = analysis.enum_infos.get(key) {
            for variant in &info.variants {
                for (_, ty) in &variant.fields {
                    push(ty);
                }
            }
        }
        deps.sort();
        deps.dedup();
        deps
    }

    fn visit(
        analysis: &AnalysisResult,
        key: &QualKey,
        visited: &mut IndexSet<QualKey>,
        order: &mut Vec<QualKey>,
    ) {
        if visited.contains(key) {
            return;
        }
        visited.insert(key.clone());
        for dep in by_value_deps(analysis, key) {
            if analysis.struct_infos.contains_key(&dep) || analysis.enum_infos.contains_key(&dep) {
                visit(analysis, &dep, visited, order);
            }
        }
        order.push(key.clone());
    }

    for key in &keys {
        visit(analysis, key, &mut visited, &mut order);
    }
    order
}

/// Collect every `Nullable(T)` with a user value payload used anywhere in
/// the unit; these need `L0_DEFINE_OPT` instantiations after the type
/// definitions.
pub(crate) fn collect_user_optionals(analysis: &AnalysisResult) -> Vec<QualKey> {
    let mut found: IndexSet<QualKey> = IndexSet::new();

    fn visit(ty: &Type, found: &mut IndexSet<QualKey>) {
        match ty {
            Type::Nullable(inner) => {
                if let Type::Struct { module, name } | Type::Enum { module, name } = &**inner {
                    found.insert((module.clone(), name.clone()));
                }
                visit(inner, found);
            }
            Type::Pointer(inner) => visit(inner, found),
            Type::Func { params, result } => {
                for p in params {
                    visit(p, found);
                }
                visit(result, found);
            }
            _ => {}
        }
    }

    for info in analysis.struct_infos.values() {
        for (_, ty) in &info.fields {
            visit(ty, &mut found);
        }
    }
    for info in analysis.enum_infos.values() {
        for variant in &info.variants {
            for (_, ty) in &variant.fields {
                visit(ty, &mut found);
            }
        }
    }
    for sig in analysis.func_types.values() {
        for p in &sig.params {
            visit(p, &mut found);
        }
        visit(&sig.result, &mut found);
    }
    for ty in analysis.let_types.values() {
        visit(ty, &mut found);
    }
    for ty in analysis.expr_types.values() {
        visit(ty, &mut found);
    }
    for env in analysis.func_envs.values() {
        for binding in env.bindings.iter() {
            if let Some(ty) = &binding.ty {
                visit(ty, &mut found);
            }
        }
    }

    let mut keys: Vec<QualKey> = found.into_iter().collect();
    keys.sort();
    keys
}

/// Emit forward declarations for every user type.
pub(crate) fn emit_forward_decls(analysis: &AnalysisResult, w: &mut CWriter) {
    let order = topo_type_order(analysis);
    if order.is_empty() {
        return;
    }
    w.line("/* forward declarations */");
    for (module, name) in &order {
        let c_name = type_name(module, name);
        w.line(&format!("typedef struct {} {};", c_name, c_name));
    }
    w.blank();
}

/// Emit the full type definitions in dependency order.
pub(crate) fn emit_type_defs(analysis: &AnalysisResult, w: &mut CWriter) {
    for key in topo_type_order(analysis) {
        let (module, name) = &key;
        let c_name = type_name(module, name);

        if let Some(info) = analysis.struct_infos.get(&key) {
            w.line(&format!("struct {} {{", c_name));
            w.indent();
            if info.fields.is_empty() {
                // C99 forbids empty structs.
                w.line("char _dummy;");
            }
            for (field_name, field_ty) in &info.fields {
                w.line(&format!("{};", cdecl(field_ty, &mangle_local(field_name))));
            }
            w.dedent();
            w.line("};");
            w.blank();
        } else if let Some(info) = analysis.enum_infos.get(&key) {
            // Tag enum.
            if info.variants.is_empty() {
                w.line(&format!(
                    "typedef enum {{ {}_empty = 0 }} {};",
                    tag_type(module, name),
                    tag_type(module, name)
                ));
            } else {
                let tags: Vec<String> = info
                    .variants
                    .iter()
                    .map(|v| tag_const(module, name, &v.name))
                    .collect();
                w.line(&format!(
                    "typedef enum {{ {} }} {};",
                    tags.join(", "),
                    tag_type(module, name)
                ));
            }

            // Per-variant payload structs.
            for variant in &info.variants {
                w.line("typedef struct {");
                w.indent();
                if variant.fields.is_empty() {
                    w.line("char _dummy;");
                }
                for (field_name, field_ty) in &variant.fields {
                    w.line(&format!("{};", cdecl(field_ty, &mangle_local(field_name))));
                }
                w.dedent();
                w.line(&format!("}} {};", payload_type(module, name, &variant.name)));
            }

            // The tagged union itself.
            w.line(&format!("struct {} {{", c_name));
            w.indent();
            w.line(&format!("{} tag;", tag_type(module, name)));
            if !info.variants.is_empty() {
                w.line("union {");
                w.indent();
                for (index, variant) in info.variants.iter().enumerate() {
                    w.line(&format!(
                        "{} v{};",
                        payload_type(module, name, &variant.name),
                        index
                    ));
                }
                w.dedent();
                w.line("} d;");
            }
            w.dedent();
            w.line("};");
            w.blank();
        }
    }
}

/// Emit `L0_DEFINE_OPT` instantiations for user value types made nullable.
pub(crate) fn emit_late_wrappers(analysis: &AnalysisResult, w: &mut CWriter) {
    let optionals = collect_user_optionals(analysis);
    if optionals.is_empty() {
        return;
    }
    w.line("/* optional wrappers for user value types */");
    for (module, name) in optionals {
        let inner = type_name(&module, &name);
        w.line(&format!(
            "L0_DEFINE_OPT(l0_opt_{}_{}, {});",
            module.joined("_"),
            name,
            inner
        ));
    }
    w.blank();
}

/// Emit an operation (retain or release) on a value of `ty` held in the C
/// place expression `place`. No code is emitted for non-ARC types.
pub(crate) fn emit_arc_op(
    analysis: &AnalysisResult,
    w: &mut CWriter,
    place: &str,
    ty: &Type,
    retain: bool,
) {
    match ty {
        Type::String => {
            let op = if retain { "rt_string_retain" } else { "rt_string_release" };
            w.line(&format!("{}({});", op, place));
        }
        Type::Struct { module, name } | Type::Enum { module, name } => {
            if analysis.type_contains_string(ty) {
                let helper = if retain {
                    retain_helper(module, name)
                } else {
                    release_helper(module, name)
                };
                w.line(&format!("{}(&{});", helper, place));
            }
        }
        Type::Nullable(inner) => {
            if matches!(&**inner, Type::Pointer(_)) {
                return;
            }
            if !analysis.type_contains_string(inner) {
                return;
            }
            w.line(&format!("if ({}.has_value) {{", place));
            w.indent();
            emit_arc_op(analysis, w, &format!("{}.value", place), inner, retain);
            w.dedent();
            w.line("}");
        }
        _ => {}
    }
}

/// Emit retain/release helper functions for every ARC-bearing struct/enum,
/// in dependency order so helpers only call helpers defined above them.
pub(crate) fn emit_arc_helpers(analysis: &AnalysisResult, w: &mut CWriter) {
    let order: Vec<QualKey> = topo_type_order(analysis)
        .into_iter()
        .filter(|(module, name)| {
            let ty = if analysis.struct_infos.contains_key(&(module.clone(), name.clone())) {
                Type::Struct {
                    module: module.clone(),
                    name: name.clone(),
                }
            } else {
                Type::Enum {
                    module: module.clone(),
                    name: name.clone(),
                }
            };
            analysis.type_contains_string(&ty)
        })
        .collect();

    if order.is_empty() {
        return;
    }

    w.line("/* retain/release helpers for string-bearing value types */");
    for (module, name) in &order {
        let key = (module.clone(), name.clone());
        let c_name = type_name(module, name);

        for retain in [false, true] {
            let helper = if retain {
                retain_helper(module, name)
            } else {
                release_helper(module, name)
            };
            w.line(&format!("static void {}({} *v) {{", helper, c_name));
            w.indent();

            if let Some(info) = analysis.struct_infos.get(&key) {
                for (field_name, field_ty) in &info.fields {
                    emit_arc_op(
                        analysis,
                        w,
                        &format!("v->{}", mangle_local(field_name)),
                        field_ty,
                        retain,
                    );
                }
            } else if let Some(info) = analysis.enum_infos.get(&key) {
                w.line("switch (v->tag) {");
                for (index, variant) in info.variants.iter().enumerate() {
                    w.line(&format!("case {}: {{", tag_const(module, name, &variant.name)));
                    w.indent();
                    for (field_name, field_ty) in &variant.fields {
                        emit_arc_op(
                            analysis,
                            w,
                            &format!("v->d.v{}.{}", index, mangle_local(field_name)),
                            field_ty,
                            retain,
                        );
                    }
                    w.line("break;");
                    w.dedent();
                    w.line("}");
                }
                w.line("default: break;");
                w.line("}");
            }

            w.dedent();
            w.line("}");
        }
    }
    w.blank();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(name: &str) -> DottedName {
        DottedName::parse(name).unwrap()
    }

    #[test]
    fn test_mangle_item() {
        assert_eq!(mangle_item(&module("a.b"), "f"), "l0_a_b_f");
        assert_eq!(mangle_item(&module("m"), "main"), "l0_m_main");
    }

    #[test]
    fn test_mangle_local_reserved() {
        assert_eq!(mangle_local("x"), "x");
        assert_eq!(mangle_local("register"), "register_l0");
        assert_eq!(mangle_local("l0_sneaky"), "l0_sneaky_l0");
        assert_eq!(mangle_local("rt_thing"), "rt_thing_l0");
    }

    #[test]
    fn test_ctype_builtins() {
        assert_eq!(ctype(&Type::Int), "l0_int");
        assert_eq!(ctype(&Type::String), "l0_string");
        assert_eq!(
            ctype(&Type::Pointer(Box::new(Type::Struct {
                module: module("m"),
                name: "P".to_string(),
            }))),
            "l0_m_P *"
        );
    }

    #[test]
    fn test_nullable_pointer_shares_representation() {
        let ptr = Type::Pointer(Box::new(Type::Int));
        assert_eq!(ctype(&ptr.clone().nullable()), ctype(&ptr));
    }

    #[test]
    fn test_nullable_value_uses_wrapper() {
        assert_eq!(ctype(&Type::Int.nullable()), "l0_opt_int");
        let user = Type::Struct {
            module: module("geo"),
            name: "Point".to_string(),
        };
        assert_eq!(ctype(&user.nullable()), "l0_opt_geo_Point");
    }

    #[test]
    fn test_cdecl_function_pointer() {
        let ty = Type::Func {
            params: vec![Type::Int],
            result: Box::new(Type::Bool),
        };
        assert_eq!(cdecl(&ty, "pred"), "l0_bool (*pred)(l0_int)");
    }

    #[test]
    fn test_tag_and_payload_names() {
        let m = module("m");
        assert_eq!(tag_const(&m, "E", "A"), "l0_m_E_tag_A");
        assert_eq!(tag_type(&m, "E"), "l0_m_E_tag");
        assert_eq!(payload_type(&m, "E", "A"), "l0_m_E_A_t");
    }
}
