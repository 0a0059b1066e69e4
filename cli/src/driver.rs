//! Runs the checking pipeline over a file and renders the outcome.

use anyhow::{Context as _, Result};
use ariadne::{Color, Label, Report, ReportKind, Source};
use frontend::diagnostics::Diagnostic;
use frontend::parser::Parser;
use frontend::pipeline;
use kernel::ContextElem;
use std::fs;
use std::path::Path;

pub struct CheckOptions {
    /// Print every checked global with its type on success.
    pub dump_context: bool,
    /// Print the parser's debug trace.
    pub trace: bool,
}

/// The driver's verdict: `Ok(true)` means the program checked.
pub fn check_file(path: &Path, options: &CheckOptions) -> Result<bool> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("cannot read `{}`", path.display()))?;
    let source = raw.replace("\r\n", "\n");
    let filename = path.display().to_string();

    if options.trace {
        // The trace is printed even for a failed parse; the pipeline run
        // below reports the error itself.
        let mut parser = Parser::new(&source);
        let _ = parser.parse_program();
        for node in parser.into_trace() {
            print!("{}", node.render());
        }
    }

    match pipeline::check_source(&source) {
        Ok(ctx) => {
            if options.dump_context {
                for elem in ctx.globals() {
                    match elem {
                        ContextElem::Var(name, ty) => println!("var {name} : {ty}"),
                        ContextElem::Def(name, ty, val) => {
                            println!("def {name} : {ty} := {val}")
                        }
                    }
                }
            } else {
                println!("ok: {} declaration(s)", ctx.globals().len());
            }
            Ok(true)
        }
        Err(err) => {
            eprintln!("error in {} phase", err.phase());
            print_diagnostic(&filename, &source, &err.to_diagnostic())?;
            Ok(false)
        }
    }
}

fn print_diagnostic(filename: &str, source: &str, diagnostic: &Diagnostic) -> Result<()> {
    let offset = diagnostic.span.map(|s| s.start.offset).unwrap_or(0);
    let mut builder = Report::build(ReportKind::Error, filename, offset)
        .with_message(diagnostic.message_with_code());

    if let Some(span) = diagnostic.span {
        builder = builder.with_label(
            Label::new((filename, span.start.offset..span.end.offset))
                .with_message(diagnostic.message_with_code())
                .with_color(Color::Red),
        );
    }
    for (span, label) in &diagnostic.labels {
        builder = builder.with_label(
            Label::new((filename, span.start.offset..span.end.offset))
                .with_message(label)
                .with_color(Color::Cyan),
        );
    }

    builder
        .finish()
        .eprint((filename, Source::from(source)))
        .context("cannot render the diagnostic")?;
    Ok(())
}
