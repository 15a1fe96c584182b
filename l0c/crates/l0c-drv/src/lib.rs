//! l0c-drv - Compiler driver.
//!
//! Orchestrates the pipeline: load the compilation unit (lex + parse run
//! inside the loader), run the semantic passes, and - when no error
//! diagnostics exist - emit the C99 translation unit. Each invocation is
//! hermetic; there is no persisted state.
//!
//! Pass ordering is fixed, and each pass's diagnostics are sorted by
//! (file, line, column, code) while the cross-pass order stays append-only.
//! Warnings never block lowering; errors do.

use std::path::PathBuf;

use l0c_gen::CodegenOptions;
use l0c_load::{Loader, SearchRoots};
use l0c_util::diagnostic::{codes, render};
use l0c_util::{Diagnostic, DottedName, Handler, Severity, SourceMap};

/// Driver configuration, per the external driver contract.
#[derive(Clone, Debug)]
pub struct Config {
    /// Entry module name, dotted.
    pub entry: String,
    /// Project search roots, searched after the system roots.
    pub project_roots: Vec<PathBuf>,
    /// System search roots, searched first.
    pub system_roots: Vec<PathBuf>,
    /// Emit `#line` directives (default true).
    pub line_directives: bool,
    /// Enable ARC tracing in the generated program.
    pub trace_arc: bool,
    /// Enable memory tracing in the generated program.
    pub trace_memory: bool,
    /// When set, write the C unit (and the runtime header beside it) here.
    pub out_path: Option<PathBuf>,
}

impl Config {
    /// A configuration with defaults for everything but the entry name.
    pub fn new(entry: impl Into<String>) -> Self {
        Self {
            entry: entry.into(),
            project_roots: Vec::new(),
            system_roots: Vec::new(),
            line_directives: true,
            trace_arc: false,
            trace_memory: false,
            out_path: None,
        }
    }
}

/// Everything a driver invocation produces.
#[derive(Debug)]
pub struct CompileOutput {
    /// The emitted translation unit, absent when lowering was refused.
    pub c_source: Option<String>,
    /// Full diagnostics list, in pass order.
    pub diagnostics: Vec<Diagnostic>,
    /// True when any diagnostic is an error.
    pub has_errors: bool,
    /// Source registry, for rendering diagnostics.
    pub source_map: SourceMap,
}

impl CompileOutput {
    /// Render all diagnostics in the stderr format.
    pub fn render_diagnostics(&self) -> String {
        self.diagnostics
            .iter()
            .map(|d| render(d, &self.source_map))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Run the pipeline for one entry module.
pub fn compile(config: &Config) -> CompileOutput {
    let handler = Handler::new();
    let mut source_map = SourceMap::new();

    let Some(entry) = DottedName::parse(&config.entry) else {
        handler.emit(Diagnostic::error(
            codes::L0C_BAD_ENTRY_NAME,
            format!("`{}` is not a valid module name", config.entry),
        ));
        return finish(None, handler, source_map);
    };

    let roots = SearchRoots::new(config.system_roots.clone(), config.project_roots.clone());

    let mark = handler.mark();
    let unit = {
        let mut loader = Loader::new(roots, &handler, &mut source_map);
        loader.load_unit(&entry)
    };
    handler.sort_tail(mark);

    let Some(unit) = unit else {
        return finish(None, handler, source_map);
    };

    let analysis = l0c_sem::analyze(unit, &handler);

    if handler.has_errors() {
        return finish(None, handler, source_map);
    }

    let options = CodegenOptions {
        line_directives: config.line_directives,
        trace_arc: config.trace_arc,
        trace_memory: config.trace_memory,
    };
    let c_source = l0c_gen::emit_unit(&analysis, &source_map, &handler, &options).ok();

    if let (Some(c), Some(out_path)) = (&c_source, &config.out_path) {
        write_outputs(c, out_path, &handler);
    }

    finish(c_source, handler, source_map)
}

/// Write the translation unit and place the runtime header beside it.
fn write_outputs(c_source: &str, out_path: &PathBuf, handler: &Handler) {
    if let Err(err) = std::fs::write(out_path, c_source) {
        handler.emit(Diagnostic::error(
            codes::L0C_WRITE_FAILED,
            format!("cannot write `{}`: {}", out_path.display(), err),
        ));
        return;
    }

    let header_path = out_path
        .parent()
        .map(|p| p.join(l0c_rt::RUNTIME_HEADER_NAME))
        .unwrap_or_else(|| PathBuf::from(l0c_rt::RUNTIME_HEADER_NAME));
    if let Err(err) = std::fs::write(&header_path, l0c_rt::RUNTIME_HEADER) {
        handler.emit(Diagnostic::error(
            codes::L0C_WRITE_FAILED,
            format!("cannot write `{}`: {}", header_path.display(), err),
        ));
    }
}

fn finish(c_source: Option<String>, handler: Handler, source_map: SourceMap) -> CompileOutput {
    let diagnostics = handler.take();
    let has_errors = diagnostics
        .iter()
        .any(|d| d.severity == Severity::Error);
    CompileOutput {
        c_source,
        diagnostics,
        has_errors,
        source_map,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_module(dir: &tempfile::TempDir, rel: &str, content: &str) {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_successful_compile() {
        let dir = tempfile::TempDir::new().unwrap();
        write_module(&dir, "app.l0", "module app;\nfunc main() -> int { return 14; }\n");

        let mut config = Config::new("app");
        config.project_roots.push(dir.path().to_path_buf());
        let output = compile(&config);

        assert!(!output.has_errors, "{}", output.render_diagnostics());
        let c = output.c_source.unwrap();
        assert!(c.contains("l0_app_main"));
        assert!(c.contains("int main(int argc, char **argv)"));
    }

    #[test]
    fn test_invalid_entry_name() {
        let output = compile(&Config::new("not..a..name"));
        assert!(output.has_errors);
        assert!(output
            .diagnostics
            .iter()
            .any(|d| d.code == codes::L0C_BAD_ENTRY_NAME));
        assert!(output.c_source.is_none());
    }

    #[test]
    fn test_errors_block_lowering() {
        let dir = tempfile::TempDir::new().unwrap();
        write_module(&dir, "app.l0", "module app;\nfunc main() -> int { return nope; }\n");

        let mut config = Config::new("app");
        config.project_roots.push(dir.path().to_path_buf());
        let output = compile(&config);

        assert!(output.has_errors);
        assert!(output.c_source.is_none());
    }

    #[test]
    fn test_warnings_do_not_block_lowering() {
        let dir = tempfile::TempDir::new().unwrap();
        write_module(
            &dir,
            "app.l0",
            "module app;\n\
             enum E { A(); B(); }\n\
             func f(e: E) {\n\
               match (e) { _ => { } A() => { } }\n\
             }\n\
             func main() -> int { return 0; }\n",
        );

        let mut config = Config::new("app");
        config.project_roots.push(dir.path().to_path_buf());
        let output = compile(&config);

        // The unreachable arm is a warning; output is still produced.
        assert!(!output.has_errors, "{}", output.render_diagnostics());
        assert!(!output.diagnostics.is_empty());
        assert!(output.c_source.is_some());
    }

    #[test]
    fn test_output_files_written() {
        let dir = tempfile::TempDir::new().unwrap();
        write_module(&dir, "app.l0", "module app;\nfunc main() -> int { return 0; }\n");
        let out_dir = tempfile::TempDir::new().unwrap();
        let out_path = out_dir.path().join("app.c");

        let mut config = Config::new("app");
        config.project_roots.push(dir.path().to_path_buf());
        config.out_path = Some(out_path.clone());
        let output = compile(&config);

        assert!(!output.has_errors, "{}", output.render_diagnostics());
        assert!(out_path.is_file());
        // The trusted runtime header lands next to the unit.
        assert!(out_dir.path().join("l0_runtime.h").is_file());
        let header = fs::read_to_string(out_dir.path().join("l0_runtime.h")).unwrap();
        assert!(header.contains("rt_string_retain"));
    }

    #[test]
    fn test_rendered_diagnostic_format() {
        let dir = tempfile::TempDir::new().unwrap();
        write_module(
            &dir,
            "app.l0",
            "module app;\nfunc main() -> int { return true; }\n",
        );

        let mut config = Config::new("app");
        config.project_roots.push(dir.path().to_path_buf());
        let output = compile(&config);

        let rendered = output.render_diagnostics();
        // path:line:column(module): severity: CODE message
        assert!(
            rendered.contains(":2:29(app): error: TYP-0016"),
            "got: {}",
            rendered
        );
        // Gutter and caret lines follow.
        assert!(rendered.contains("| func main() -> int { return true; }"));
        assert!(rendered.contains('^'));
    }

    #[test]
    fn test_trace_toggles_reach_the_unit() {
        let dir = tempfile::TempDir::new().unwrap();
        write_module(&dir, "app.l0", "module app;\nfunc main() -> int { return 0; }\n");

        let mut config = Config::new("app");
        config.project_roots.push(dir.path().to_path_buf());
        config.trace_arc = true;
        config.trace_memory = true;
        let output = compile(&config);

        let c = output.c_source.unwrap();
        assert!(c.contains("#define L0_TRACE_ARC 1"));
        assert!(c.contains("#define L0_TRACE_MEMORY 1"));
    }
}
