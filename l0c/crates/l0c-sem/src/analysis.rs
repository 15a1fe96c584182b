//! Analysis tables: symbols, module environments, function scopes, and the
//! [`AnalysisResult`] every later phase consumes.
//!
//! Symbols live in one arena indexed by [`SymbolId`]; module environments
//! map names to symbol ids with open-import ambiguity bookkeeping resolved
//! lazily (a name imported from two modules only errors when referenced).

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use l0c_load::CompilationUnit;
use l0c_par::ast::NodeId;
use l0c_util::{define_idx, Diagnostic, DottedName, IndexVec, Span};

use crate::types::Type;

define_idx!(SymbolId);
define_idx!(ScopeId);
define_idx!(BindingId);

/// Key for per-declaration tables: defining module plus declared name.
pub type QualKey = (DottedName, String);

/// What kind of top-level thing a symbol names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Func,
    Struct,
    Enum,
    EnumVariant,
    TypeAlias,
    Let,
}

/// One top-level symbol.
#[derive(Clone, Debug)]
pub struct Symbol {
    /// Symbol kind.
    pub kind: SymbolKind,
    /// Defining module.
    pub module: DottedName,
    /// Declared name.
    pub name: String,
    /// Span of the declared name.
    pub name_span: Span,
    /// Index of the declaration in the defining module's `decls`.
    pub decl_index: usize,
    /// For `EnumVariant`: index of the variant within the enum.
    pub variant_index: Option<usize>,
    /// Resolved type, filled by the signature resolver and never mutated
    /// afterward. For functions and variant constructors this is a
    /// [`Type::Func`]; for type symbols it is the denoted type.
    pub ty: Option<Type>,
}

/// Result of a merged-environment lookup.
#[derive(Clone, Debug)]
pub enum Lookup {
    /// Defined in the module itself.
    Local(SymbolId),
    /// Brought in by exactly one open import.
    Imported(SymbolId),
    /// Imported from more than one module; error on use.
    Ambiguous(Vec<(DottedName, SymbolId)>),
    /// Not in scope.
    Missing,
}

/// Per-module name environment.
#[derive(Clone, Debug)]
pub struct ModuleEnv {
    /// The module this environment belongs to.
    pub module: DottedName,
    /// Symbols defined in this module, in declaration order.
    pub locals: IndexMap<String, SymbolId>,
    /// Symbols visible through open imports; one entry per source module so
    /// ambiguity can be reported with provenance.
    pub imported: IndexMap<String, Vec<(DottedName, SymbolId)>>,
}

impl ModuleEnv {
    /// Create an empty environment.
    pub fn new(module: DottedName) -> Self {
        Self {
            module,
            locals: IndexMap::new(),
            imported: IndexMap::new(),
        }
    }

    /// Merged lookup: locals shadow imports; ambiguous imports surface as
    /// [`Lookup::Ambiguous`].
    pub fn lookup(&self, name: &str) -> Lookup {
        if let Some(&id) = self.locals.get(name) {
            return Lookup::Local(id);
        }
        match self.imported.get(name) {
            Some(sources) if sources.len() == 1 => Lookup::Imported(sources[0].1),
            Some(sources) if sources.len() > 1 => Lookup::Ambiguous(sources.clone()),
            _ => Lookup::Missing,
        }
    }
}

/// How a binding was introduced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingKind {
    /// Function parameter (with its position).
    Param(usize),
    /// `let` statement (including `for` headers).
    Let,
    /// `with` header item.
    WithItem,
    /// Match-arm pattern variable.
    PatVar,
}

/// One local binding.
#[derive(Clone, Debug)]
pub struct Binding {
    pub name: String,
    pub span: Span,
    pub kind: BindingKind,
    /// Type, filled by the scope resolver (parameters) or the checker
    /// (everything else).
    pub ty: Option<Type>,
}

/// One lexical scope.
#[derive(Clone, Debug, Default)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    /// Bindings declared directly in this scope.
    pub bindings: IndexMap<String, BindingId>,
}

/// The scope tree of one non-extern function.
#[derive(Clone, Debug)]
pub struct FunctionEnv {
    pub scopes: IndexVec<ScopeId, Scope>,
    pub bindings: IndexVec<BindingId, Binding>,
    /// Root scope holding the parameters.
    pub root: ScopeId,
    /// Scope opened by a block / match arm / `for` header / `with` header,
    /// keyed by that node's id.
    pub scope_of: FxHashMap<NodeId, ScopeId>,
    /// Binding introduced by a `let` / `with` item, keyed by its node id.
    pub binding_of: FxHashMap<NodeId, BindingId>,
}

impl FunctionEnv {
    /// Create an environment with an empty root scope.
    pub fn new() -> Self {
        let mut scopes = IndexVec::new();
        let root = scopes.push(Scope::default());
        Self {
            scopes,
            bindings: IndexVec::new(),
            root,
            scope_of: FxHashMap::default(),
            binding_of: FxHashMap::default(),
        }
    }

    /// Open a child scope.
    pub fn child(&mut self, parent: ScopeId) -> ScopeId {
        self.scopes.push(Scope {
            parent: Some(parent),
            bindings: IndexMap::new(),
        })
    }

    /// Declare a binding in `scope`. Returns the previous binding id when
    /// the name is already taken in that same scope.
    pub fn declare(
        &mut self,
        scope: ScopeId,
        name: &str,
        span: Span,
        kind: BindingKind,
        ty: Option<Type>,
    ) -> Result<BindingId, BindingId> {
        if let Some(&existing) = self.scopes[scope].bindings.get(name) {
            return Err(existing);
        }
        let id = self.bindings.push(Binding {
            name: name.to_string(),
            span,
            kind,
            ty,
        });
        self.scopes[scope].bindings.insert(name.to_string(), id);
        Ok(id)
    }

    /// Look a name up from `scope` outward to the root.
    pub fn lookup(&self, mut scope: ScopeId, name: &str) -> Option<BindingId> {
        loop {
            if let Some(&id) = self.scopes[scope].bindings.get(name) {
                return Some(id);
            }
            match self.scopes[scope].parent {
                Some(parent) => scope = parent,
                None => return None,
            }
        }
    }
}

impl Default for FunctionEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolved function signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FuncType {
    pub params: Vec<Type>,
    pub result: Type,
}

/// Resolved struct layout.
#[derive(Clone, Debug)]
pub struct StructInfo {
    pub fields: Vec<(String, Type)>,
    pub span: Span,
}

/// Resolved enum layout.
#[derive(Clone, Debug)]
pub struct EnumInfo {
    pub variants: Vec<VariantInfo>,
    pub span: Span,
}

/// One resolved enum variant.
#[derive(Clone, Debug)]
pub struct VariantInfo {
    pub name: String,
    pub fields: Vec<(String, Type)>,
}

impl EnumInfo {
    /// Index of a variant by name.
    pub fn variant_index(&self, name: &str) -> Option<usize> {
        self.variants.iter().position(|v| v.name == name)
    }
}

/// What a variable reference resolved to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VarTarget {
    /// A local binding of the enclosing function.
    Local(BindingId),
    /// A top-level `let`.
    TopLet(DottedName, String),
    /// A function.
    Func(DottedName, String),
    /// An enum variant constructor.
    EnumVariant {
        module: DottedName,
        enum_name: String,
        variant_index: usize,
    },
}

/// Compiler-recognized intrinsic calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intrinsic {
    /// `sizeof(T)`: size of the lowered C type, as `int`.
    Sizeof,
}

/// Everything the semantic pipeline produces; the backend's sole input.
#[derive(Debug)]
pub struct AnalysisResult {
    /// The loaded compilation unit.
    pub unit: CompilationUnit,
    /// Symbol arena.
    pub symbols: IndexVec<SymbolId, Symbol>,
    /// Per-module environments.
    pub module_envs: FxHashMap<DottedName, ModuleEnv>,
    /// Function signatures, including extern functions.
    pub func_types: FxHashMap<QualKey, FuncType>,
    /// Struct layouts, in declaration order across the unit.
    pub struct_infos: IndexMap<QualKey, StructInfo>,
    /// Enum layouts, in declaration order across the unit.
    pub enum_infos: IndexMap<QualKey, EnumInfo>,
    /// Types of top-level `let` bindings.
    pub let_types: FxHashMap<QualKey, Type>,
    /// Scope trees of non-extern functions.
    pub func_envs: FxHashMap<QualKey, FunctionEnv>,
    /// Type of every checked expression, by node identity.
    pub expr_types: FxHashMap<NodeId, Type>,
    /// Resolution of every variable reference, by node identity.
    pub var_targets: FxHashMap<NodeId, VarTarget>,
    /// Calls recognized as intrinsics, by call-expression identity.
    pub intrinsic_targets: FxHashMap<NodeId, Intrinsic>,
    /// Snapshot of all diagnostics after the pipeline ran.
    pub diagnostics: Vec<Diagnostic>,
}

impl AnalysisResult {
    /// Create an empty result around a loaded unit.
    pub fn new(unit: CompilationUnit) -> Self {
        Self {
            unit,
            symbols: IndexVec::new(),
            module_envs: FxHashMap::default(),
            func_types: FxHashMap::default(),
            struct_infos: IndexMap::new(),
            enum_infos: IndexMap::new(),
            let_types: FxHashMap::default(),
            func_envs: FxHashMap::default(),
            expr_types: FxHashMap::default(),
            var_targets: FxHashMap::default(),
            intrinsic_targets: FxHashMap::default(),
            diagnostics: Vec::new(),
        }
    }

    /// The recorded type of an expression node.
    pub fn expr_type(&self, id: NodeId) -> Option<&Type> {
        self.expr_types.get(&id)
    }

    /// Returns true when `ty` transitively contains an ARC `string` by
    /// value. Pointers do not propagate ownership.
    pub fn type_contains_string(&self, ty: &Type) -> bool {
        match ty {
            Type::String => true,
            Type::Nullable(inner) => self.type_contains_string(inner),
            Type::Struct { module, name } => self
                .struct_infos
                .get(&(module.clone(), name.clone()))
                .is_some_and(|info| {
                    info.fields
                        .iter()
                        .any(|(_, fty)| self.type_contains_string(fty))
                }),
            Type::Enum { module, name } => self
                .enum_infos
                .get(&(module.clone(), name.clone()))
                .is_some_and(|info| {
                    info.variants.iter().any(|v| {
                        v.fields
                            .iter()
                            .any(|(_, fty)| self.type_contains_string(fty))
                    })
                }),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use l0c_util::Span;

    fn name(s: &str) -> DottedName {
        DottedName::parse(s).unwrap()
    }

    #[test]
    fn test_module_env_locals_shadow_imports() {
        let mut env = ModuleEnv::new(name("m"));
        env.locals.insert("f".to_string(), SymbolId(0));
        env.imported
            .insert("f".to_string(), vec![(name("other"), SymbolId(1))]);

        assert!(matches!(env.lookup("f"), Lookup::Local(SymbolId(0))));
    }

    #[test]
    fn test_module_env_ambiguity_is_lazy() {
        let mut env = ModuleEnv::new(name("m"));
        env.imported.insert(
            "f".to_string(),
            vec![(name("a"), SymbolId(0)), (name("b"), SymbolId(1))],
        );

        match env.lookup("f") {
            Lookup::Ambiguous(sources) => assert_eq!(sources.len(), 2),
            other => panic!("expected ambiguous, got {:?}", other),
        }
        assert!(matches!(env.lookup("g"), Lookup::Missing));
    }

    #[test]
    fn test_function_env_scoping() {
        let mut env = FunctionEnv::new();
        let root = env.root;
        let x = env
            .declare(root, "x", Span::DUMMY, BindingKind::Param(0), Some(Type::Int))
            .unwrap();

        let inner = env.child(root);
        assert_eq!(env.lookup(inner, "x"), Some(x));

        // Shadowing in a child scope is fine.
        let x2 = env
            .declare(inner, "x", Span::DUMMY, BindingKind::Let, None)
            .unwrap();
        assert_eq!(env.lookup(inner, "x"), Some(x2));
        assert_eq!(env.lookup(root, "x"), Some(x));
    }

    #[test]
    fn test_function_env_duplicate_in_same_scope() {
        let mut env = FunctionEnv::new();
        let root = env.root;
        let first = env
            .declare(root, "x", Span::DUMMY, BindingKind::Let, None)
            .unwrap();
        let err = env
            .declare(root, "x", Span::DUMMY, BindingKind::Let, None)
            .unwrap_err();
        assert_eq!(err, first);
    }
}
