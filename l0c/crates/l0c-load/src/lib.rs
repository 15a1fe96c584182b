//! l0c-load - Module loader and compilation-unit closure.
//!
//! Resolves dotted module names against ordered search roots (system roots
//! first, then project roots; `a.b` maps to `a/b.l0` relative to some root),
//! caches parsed modules by name, and walks imports depth-first with an
//! in-progress set so import cycles are reported with the full path instead
//! of recursing forever.
//!
//! The closure of the entry module is returned leaves-first, which is the
//! order downstream phases want for deterministic processing.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use l0c_par::ast::{Module, NodeIdGen};
use l0c_util::diagnostic::codes;
use l0c_util::{Diagnostic, DottedName, Handler, SourceMap, Span};

/// Ordered module search roots. System roots take precedence over project
/// roots.
#[derive(Clone, Debug, Default)]
pub struct SearchRoots {
    /// Roots searched first.
    pub system: Vec<PathBuf>,
    /// Roots searched after the system roots.
    pub project: Vec<PathBuf>,
}

impl SearchRoots {
    /// Create search roots from system and project directories.
    pub fn new(system: Vec<PathBuf>, project: Vec<PathBuf>) -> Self {
        Self { system, project }
    }

    /// Iterate roots in search order.
    fn iter(&self) -> impl Iterator<Item = &Path> {
        self.system
            .iter()
            .chain(self.project.iter())
            .map(PathBuf::as_path)
    }
}

/// Internal resolution failure; surfaced as `DRV-` diagnostics.
#[derive(Debug, Error)]
enum LoadError {
    #[error("module source not found in any search root")]
    NotFound,
    #[error("failed to read `{path}`: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The entry module plus the transitive closure of its imports.
#[derive(Debug)]
pub struct CompilationUnit {
    /// Name of the entry module.
    pub entry: DottedName,
    /// Every module of the unit, leaves first; the entry module is last.
    pub modules: Vec<DottedName>,
    /// Parsed ASTs by module name.
    pub asts: FxHashMap<DottedName, Rc<Module>>,
}

impl CompilationUnit {
    /// Look up a module's AST.
    pub fn module(&self, name: &DottedName) -> Option<&Rc<Module>> {
        self.asts.get(name)
    }

    /// The entry module's AST.
    pub fn entry_module(&self) -> &Rc<Module> {
        &self.asts[&self.entry]
    }
}

/// The module loader.
pub struct Loader<'a> {
    roots: SearchRoots,
    handler: &'a Handler,
    source_map: &'a mut SourceMap,
    ids: NodeIdGen,
    cache: FxHashMap<DottedName, Rc<Module>>,
    /// Modules currently being loaded, in DFS discovery order. Re-entry
    /// signals an import cycle.
    loading: Vec<DottedName>,
    /// Modules that already failed; suppresses duplicate diagnostics.
    failed: FxHashSet<DottedName>,
    /// Post-order (leaves-first) accumulation for the closure.
    order: Vec<DottedName>,
}

impl<'a> Loader<'a> {
    /// Create a loader over the given roots.
    pub fn new(roots: SearchRoots, handler: &'a Handler, source_map: &'a mut SourceMap) -> Self {
        Self {
            roots,
            handler,
            source_map,
            ids: NodeIdGen::new(),
            cache: FxHashMap::default(),
            loading: Vec::new(),
            failed: FxHashSet::default(),
            order: Vec::new(),
        }
    }

    /// Load the entry module and the transitive closure of its imports.
    ///
    /// Returns `None` when the entry module itself cannot be loaded. Other
    /// failures (missing imports, cycles, parse errors) are reported through
    /// the handler and leave the unit partially populated; the driver gates
    /// later phases on the error count.
    pub fn load_unit(&mut self, entry: &DottedName) -> Option<CompilationUnit> {
        self.load_module(entry, None)?;

        Some(CompilationUnit {
            entry: entry.clone(),
            modules: std::mem::take(&mut self.order),
            asts: self.cache.clone(),
        })
    }

    /// Load one module (and its imports, depth-first).
    fn load_module(&mut self, name: &DottedName, import_span: Option<Span>) -> Option<Rc<Module>> {
        if let Some(cached) = self.cache.get(name) {
            return Some(Rc::clone(cached));
        }
        if self.failed.contains(name) {
            return None;
        }

        if let Some(pos) = self.loading.iter().position(|m| m == name) {
            // Import cycle: name every module on it, in discovery order.
            let mut path: Vec<String> = self.loading[pos..]
                .iter()
                .map(DottedName::to_string)
                .collect();
            path.push(name.to_string());
            let mut diag = Diagnostic::error(
                codes::DRV_IMPORT_CYCLE,
                format!("import cycle: {}", path.join(" -> ")),
            );
            if let Some(span) = import_span {
                diag = diag.with_span(span);
            }
            self.handler.emit(diag);
            return None;
        }

        let (path, mut source) = match self.resolve(name) {
            Ok(found) => found,
            Err(err) => {
                let mut diag = Diagnostic::error(
                    match err {
                        LoadError::NotFound => codes::DRV_MODULE_NOT_FOUND,
                        LoadError::Read { .. } => codes::DRV_READ_FAILED,
                    },
                    format!("cannot load module `{}`: {}", name, err),
                );
                if let Some(span) = import_span {
                    diag = diag.with_span(span);
                }
                self.handler.emit(diag);
                self.failed.insert(name.clone());
                return None;
            }
        };

        // Strip a UTF-8 BOM here as well so stored source lines up with the
        // byte offsets in lexer spans.
        if let Some(stripped) = source.strip_prefix('\u{feff}') {
            source = stripped.to_string();
        }

        let file_id = self.source_map.add_file(&path, source.clone());

        let module = match l0c_par::parse_source(&source, self.handler, &mut self.ids, file_id) {
            Some(module) => module,
            None => {
                self.failed.insert(name.clone());
                return None;
            }
        };

        if &module.name != name {
            self.handler.emit(
                Diagnostic::error(
                    codes::DRV_MODULE_NAME_MISMATCH,
                    format!(
                        "file declares `module {};` but was loaded as `{}`",
                        module.name, name
                    ),
                )
                .with_span(module.name_span),
            );
            self.failed.insert(name.clone());
            return None;
        }
        self.source_map.set_module(file_id, name.to_string());

        // Depth-first over imports with this module marked in-progress.
        self.loading.push(name.clone());
        for import in &module.imports {
            self.load_module(&import.name, Some(import.span));
        }
        self.loading.pop();

        let module = Rc::new(module);
        self.cache.insert(name.clone(), Rc::clone(&module));
        self.order.push(name.clone());
        Some(module)
    }

    /// Find a module's source file in root order and read it.
    fn resolve(&self, name: &DottedName) -> Result<(PathBuf, String), LoadError> {
        let rel = name.rel_path("l0");
        for root in self.roots.iter() {
            let candidate = root.join(&rel);
            if candidate.is_file() {
                return std::fs::read_to_string(&candidate)
                    .map(|text| (candidate.clone(), text))
                    .map_err(|source| LoadError::Read {
                        path: candidate,
                        source,
                    });
            }
        }
        Err(LoadError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_module(dir: &TempDir, rel: &str, content: &str) {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn load(dir: &TempDir, entry: &str) -> (Option<CompilationUnit>, Handler) {
        let handler = Handler::new();
        let mut sm = SourceMap::new();
        let roots = SearchRoots::new(Vec::new(), vec![dir.path().to_path_buf()]);
        let mut loader = Loader::new(roots, &handler, &mut sm);
        let unit = loader.load_unit(&DottedName::parse(entry).unwrap());
        (unit, handler)
    }

    #[test]
    fn test_single_module() {
        let dir = TempDir::new().unwrap();
        write_module(&dir, "app.l0", "module app;\nfunc main() -> int { return 0; }\n");

        let (unit, handler) = load(&dir, "app");
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        let unit = unit.unwrap();
        assert_eq!(unit.modules.len(), 1);
        assert_eq!(unit.entry.to_string(), "app");
    }

    #[test]
    fn test_dotted_name_maps_to_nested_path() {
        let dir = TempDir::new().unwrap();
        write_module(&dir, "util/strings.l0", "module util.strings;\n");
        write_module(
            &dir,
            "app.l0",
            "module app;\nimport util.strings;\n",
        );

        let (unit, handler) = load(&dir, "app");
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        let unit = unit.unwrap();
        let names: Vec<_> = unit.modules.iter().map(DottedName::to_string).collect();
        // Leaves first: the import precedes the importer.
        assert_eq!(names, vec!["util.strings", "app"]);
    }

    #[test]
    fn test_transitive_closure_is_leaves_first() {
        let dir = TempDir::new().unwrap();
        write_module(&dir, "c.l0", "module c;\n");
        write_module(&dir, "b.l0", "module b;\nimport c;\n");
        write_module(&dir, "a.l0", "module a;\nimport b;\nimport c;\n");

        let (unit, handler) = load(&dir, "a");
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        let unit = unit.unwrap();
        let names: Vec<_> = unit.modules.iter().map(DottedName::to_string).collect();
        assert_eq!(names, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_shared_import_is_loaded_once() {
        let dir = TempDir::new().unwrap();
        write_module(&dir, "common.l0", "module common;\n");
        write_module(&dir, "x.l0", "module x;\nimport common;\n");
        write_module(&dir, "y.l0", "module y;\nimport common;\n");
        write_module(&dir, "app.l0", "module app;\nimport x;\nimport y;\n");

        let (unit, handler) = load(&dir, "app");
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        let unit = unit.unwrap();
        let count = unit
            .modules
            .iter()
            .filter(|m| m.to_string() == "common")
            .count();
        assert_eq!(count, 1);
        assert_eq!(unit.modules.len(), 4);
    }

    #[test]
    fn test_import_cycle_names_every_module_on_it() {
        let dir = TempDir::new().unwrap();
        write_module(&dir, "a.l0", "module a;\nimport b;\n");
        write_module(&dir, "b.l0", "module b;\nimport c;\n");
        write_module(&dir, "c.l0", "module c;\nimport a;\n");

        let (_, handler) = load(&dir, "a");
        let cycles: Vec<_> = handler
            .diagnostics()
            .into_iter()
            .filter(|d| d.code == codes::DRV_IMPORT_CYCLE)
            .collect();
        assert_eq!(cycles.len(), 1);
        assert!(
            cycles[0].message.contains("a -> b -> c -> a"),
            "got: {}",
            cycles[0].message
        );
    }

    #[test]
    fn test_self_import_cycle() {
        let dir = TempDir::new().unwrap();
        write_module(&dir, "a.l0", "module a;\nimport a;\n");

        let (_, handler) = load(&dir, "a");
        let diags = handler.diagnostics();
        assert!(diags
            .iter()
            .any(|d| d.code == codes::DRV_IMPORT_CYCLE && d.message.contains("a -> a")));
    }

    #[test]
    fn test_missing_module() {
        let dir = TempDir::new().unwrap();
        write_module(&dir, "app.l0", "module app;\nimport nowhere;\n");

        let (unit, handler) = load(&dir, "app");
        // The entry still loads; the missing import is a diagnostic.
        assert!(unit.is_some());
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.code == codes::DRV_MODULE_NOT_FOUND));
    }

    #[test]
    fn test_missing_entry_module() {
        let dir = TempDir::new().unwrap();
        let (unit, handler) = load(&dir, "ghost");
        assert!(unit.is_none());
        assert!(handler.has_errors());
    }

    #[test]
    fn test_module_name_mismatch() {
        let dir = TempDir::new().unwrap();
        write_module(&dir, "app.l0", "module elsewhere;\n");

        let (unit, handler) = load(&dir, "app");
        assert!(unit.is_none());
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.code == codes::DRV_MODULE_NAME_MISMATCH));
    }

    #[test]
    fn test_system_roots_take_precedence() {
        let sys = TempDir::new().unwrap();
        let proj = TempDir::new().unwrap();
        write_module(&sys, "lib.l0", "module lib;\nfunc from_system() {}\n");
        write_module(&proj, "lib.l0", "module lib;\nfunc from_project() {}\n");

        let handler = Handler::new();
        let mut sm = SourceMap::new();
        let roots = SearchRoots::new(
            vec![sys.path().to_path_buf()],
            vec![proj.path().to_path_buf()],
        );
        let mut loader = Loader::new(roots, &handler, &mut sm);
        let unit = loader
            .load_unit(&DottedName::parse("lib").unwrap())
            .unwrap();

        let module = unit.entry_module();
        assert_eq!(module.decls[0].name(), "from_system");
    }

    #[test]
    fn test_closure_is_import_fixed_point() {
        let dir = TempDir::new().unwrap();
        write_module(&dir, "d.l0", "module d;\n");
        write_module(&dir, "c.l0", "module c;\nimport d;\n");
        write_module(&dir, "b.l0", "module b;\nimport d;\n");
        write_module(&dir, "a.l0", "module a;\nimport b;\nimport c;\n");

        let (unit, handler) = load(&dir, "a");
        assert!(!handler.has_errors());
        let unit = unit.unwrap();

        // Every import of every module in the unit is itself in the unit.
        for name in &unit.modules {
            let module = unit.module(name).unwrap();
            for import in &module.imports {
                assert!(
                    unit.asts.contains_key(&import.name),
                    "import {} of {} missing from closure",
                    import.name,
                    name
                );
            }
        }
    }
}
