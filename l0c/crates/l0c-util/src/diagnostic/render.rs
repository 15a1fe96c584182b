//! Stderr rendering of diagnostics.
//!
//! The format is
//!
//! ```text
//! path:line:column(module): severity: CODE message
//!    12 | let x = f(y);
//!       |         ^^^^
//! ```
//!
//! with a right-aligned gutter and a caret line spanning the diagnostic's
//! column range. Every component degrades gracefully when absent: without a
//! span the location prefix is omitted, without source text the gutter is
//! omitted, without a module the parenthesized attribution is omitted.

use crate::span::SourceMap;

use super::Diagnostic;

/// Render one diagnostic to its stderr form.
pub fn render(diag: &Diagnostic, source_map: &SourceMap) -> String {
    let mut out = String::new();

    let file = diag.span.and_then(|s| source_map.file(s.file_id));

    if let (Some(span), Some(file)) = (diag.span, file) {
        out.push_str(&file.path.display().to_string());
        out.push(':');
        out.push_str(&span.line.to_string());
        out.push(':');
        out.push_str(&span.column.to_string());
        if let Some(module) = &diag.module {
            out.push('(');
            out.push_str(&module.to_string());
            out.push(')');
        }
        out.push_str(": ");
    } else if let Some(module) = &diag.module {
        out.push('(');
        out.push_str(&module.to_string());
        out.push_str("): ");
    }

    out.push_str(&diag.severity.to_string());
    out.push_str(": ");
    out.push_str(&diag.code.to_string());
    out.push(' ');
    out.push_str(&diag.message);

    if let Some(span) = diag.span {
        if let Some(line_text) = source_map.line_text(span.file_id, span.line) {
            let line_no = span.line.to_string();
            let gutter_width = line_no.len().max(4);

            out.push('\n');
            out.push_str(&format!("{:>width$} | ", line_no, width = gutter_width));
            out.push_str(line_text);

            let column = span.column.max(1) as usize;
            let mut carets = span.len().max(1);
            // Clamp the caret run to the visible line.
            let line_len = line_text.chars().count();
            if column <= line_len + 1 {
                carets = carets.min(line_len + 1 - column + 1).max(1);
                out.push('\n');
                out.push_str(&format!("{:>width$} | ", "", width = gutter_width));
                out.push_str(&" ".repeat(column - 1));
                out.push_str(&"^".repeat(carets));
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::{codes, Diagnostic};
    use crate::name::DottedName;
    use crate::span::{SourceMap, Span};

    #[test]
    fn test_render_full_location() {
        let mut sm = SourceMap::new();
        let id = sm.add_file("src/m.l0", "module m;\nlet x = y;\n".to_string());

        let span = Span::with_file(18, 19, id, 2, 9);
        let diag = Diagnostic::error(codes::NAM_UNKNOWN_NAME, "unknown name `y`")
            .with_span(span)
            .with_module(DottedName::parse("m").unwrap());

        let rendered = render(&diag, &sm);
        let mut lines = rendered.lines();
        assert_eq!(
            lines.next().unwrap(),
            "src/m.l0:2:9(m): error: NAM-0004 unknown name `y`"
        );
        assert_eq!(lines.next().unwrap(), "   2 | let x = y;");
        assert_eq!(lines.next().unwrap(), "     |         ^");
    }

    #[test]
    fn test_render_without_span() {
        let sm = SourceMap::new();
        let diag = Diagnostic::error(codes::DRV_MODULE_NOT_FOUND, "module `a.b` not found");
        assert_eq!(
            render(&diag, &sm),
            "error: DRV-0001 module `a.b` not found"
        );
    }

    #[test]
    fn test_render_module_only() {
        let sm = SourceMap::new();
        let diag = Diagnostic::warning(codes::MTC_UNREACHABLE_ARM, "unreachable arm")
            .with_module(DottedName::parse("a.b").unwrap());
        assert_eq!(
            render(&diag, &sm),
            "(a.b): warning: MTC-0003 unreachable arm"
        );
    }

    #[test]
    fn test_render_caret_spans_token() {
        let mut sm = SourceMap::new();
        let id = sm.add_file("m.l0", "return whoops;\n".to_string());
        let span = Span::with_file(7, 13, id, 1, 8);
        let diag = Diagnostic::error(codes::NAM_UNKNOWN_NAME, "unknown").with_span(span);

        let rendered = render(&diag, &sm);
        let caret_line = rendered.lines().last().unwrap();
        assert!(caret_line.ends_with("^^^^^^"), "got: {caret_line}");
    }
}
