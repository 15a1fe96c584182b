//! `l0c` - compile an L0 module to a C99 translation unit.
//!
//! Thin flag parsing only; the full CLI experience lives outside the core.
//!
//! Usage: `l0c <entry> [-p DIR]... [-s DIR]... [-o FILE]
//!         [--no-line-directives] [--trace-arc] [--trace-memory]`

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use l0c_drv::{compile, Config};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {}", e);
        std::process::exit(2);
    }
}

fn run() -> Result<()> {
    let config = parse_args(std::env::args().skip(1))?;
    let output = compile(&config);

    let rendered = output.render_diagnostics();
    if !rendered.is_empty() {
        eprintln!("{}", rendered);
    }

    if output.has_errors {
        std::process::exit(1);
    }

    if config.out_path.is_none() {
        if let Some(c) = &output.c_source {
            print!("{}", c);
        }
    }
    Ok(())
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<Config> {
    let mut entry: Option<String> = None;
    let mut config = Config::new(String::new());

    let mut args = args.peekable();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-p" | "--project-root" => {
                let dir = args.next().context("`-p` needs a directory")?;
                config.project_roots.push(PathBuf::from(dir));
            }
            "-s" | "--system-root" => {
                let dir = args.next().context("`-s` needs a directory")?;
                config.system_roots.push(PathBuf::from(dir));
            }
            "-o" | "--output" => {
                let file = args.next().context("`-o` needs a file path")?;
                config.out_path = Some(PathBuf::from(file));
            }
            "--no-line-directives" => config.line_directives = false,
            "--trace-arc" => config.trace_arc = true,
            "--trace-memory" => config.trace_memory = true,
            other if other.starts_with('-') => bail!("unknown flag `{}`", other),
            other => {
                if entry.replace(other.to_string()).is_some() {
                    bail!("more than one entry module given");
                }
            }
        }
    }

    let Some(entry) = entry else {
        bail!(
            "usage: l0c <entry> [-p DIR]... [-s DIR]... [-o FILE] \
             [--no-line-directives] [--trace-arc] [--trace-memory]"
        );
    };
    config.entry = entry;

    // Default to searching the current directory when no roots are given.
    if config.project_roots.is_empty() && config.system_roots.is_empty() {
        config.project_roots.push(PathBuf::from("."));
    }
    Ok(config)
}
