use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use ariadne::{Color, Label, Report, ReportKind, Source};
use clap::{ArgAction, Parser};
use tracing::Level;

use ecsl_common::manifest::{self, EcslManifest, ManifestError};
use ecsl_common::{CompileError, Diagnostic};
use ecsl_compiler::codegen::{CodegenOptions, FilterMode};
use ecsl_compiler::lexer::Lexer;
use ecsl_compiler::{compile, SAMPLE_PROGRAM};

/// File name reported for the embedded sample program.
const SAMPLE_FILE: &str = "sample.ecs";

/// ecsl compiler.
///
/// Translates an .ecs program into a single self-contained C source file.
#[derive(Parser)]
#[command(
    name = "ecslc",
    version,
    about,
    long_about = "ecsl compiler.\n\nTranslates an .ecs program (structs, components, entity functions)\ninto one C source file containing the entity storage and lifecycle runtime.\nWithout an input file the built-in sample program is compiled.\n\nExamples:\n  ecslc game.ecs                  Print C to stdout\n  ecslc game.ecs -o game.c        Write C to a file\n  ecslc game.ecs --check          Check for errors only\n  ecslc game.ecs --emit-ir        Print the flat IR as JSON\n  ecslc --filter any game.ecs     Foreach visits entities with any listed component"
)]
struct Cli {
    /// Input .ecs source file (default: built-in sample program).
    input: Option<PathBuf>,

    /// Output file path (default: stdout).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Check for errors without generating C.
    #[arg(long)]
    check: bool,

    /// Suppress warning output.
    #[arg(short, long)]
    quiet: bool,

    /// Emit the flat IR as JSON instead of C.
    #[arg(long = "emit-ir")]
    emit_ir: bool,

    /// Emit token stream to stdout (debug).
    #[arg(long = "emit-tokens")]
    emit_tokens: bool,

    /// Entity capacity of the generated world (overrides Ecsl.toml).
    #[arg(long = "max-entities", value_name = "N")]
    max_entities: Option<usize>,

    /// How foreach filters combine: all | any (overrides Ecsl.toml).
    #[arg(long, value_name = "MODE")]
    filter: Option<FilterMode>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let (source, file_name) = match &cli.input {
        Some(path) => match fs::read_to_string(path) {
            Ok(s) => (s, display_name(path)),
            Err(e) => {
                eprintln!("error: could not read '{}': {}", path.display(), e);
                process::exit(1);
            }
        },
        None => {
            tracing::debug!("no input file, compiling the built-in sample");
            (SAMPLE_PROGRAM.to_string(), SAMPLE_FILE.to_string())
        }
    };

    // === Manifest ===
    let manifest = match load_manifest(cli.input.as_deref()) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };
    let options = match build_options(&cli, manifest.as_ref()) {
        Ok(o) => o,
        Err(message) => {
            eprintln!("error: {}", message);
            process::exit(1);
        }
    };
    tracing::debug!(
        max_entity_count = options.max_entity_count,
        filter = %options.filter_mode,
        primitives = options.primitives.len(),
        "codegen options resolved"
    );

    // === Tokens (debug) ===
    if cli.emit_tokens {
        let (tokens, lex_diags) = Lexer::new(&source, &file_name).tokenize();
        for diag in lex_diags.diagnostics() {
            print_diagnostic(diag, &source, &file_name);
        }
        if lex_diags.has_errors() {
            process::exit(1);
        }
        for token in &tokens {
            println!(
                "{:>4}:{:<3} {:?} {:?}",
                token.span.start.line, token.span.start.column, token.kind, token.lexeme,
            );
        }
        return;
    }

    // === Compile ===
    let compiled = compile(&source, &file_name, &options)
        .unwrap_or_else(|e| fail(&e, &source, &file_name));
    tracing::debug!(
        items = compiled.program.items.len(),
        warnings = compiled.warnings.len(),
        bytes = compiled.output.len(),
        "compilation finished"
    );

    if !cli.quiet {
        for diag in &compiled.warnings {
            print_diagnostic(diag, &source, &file_name);
        }
    }

    if cli.check {
        println!("No errors found.");
        return;
    }

    // === IR ===
    if cli.emit_ir {
        let module_name = module_name(&cli, manifest.as_ref());
        match compiled.ir_json(&module_name, &file_name) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("error: failed to serialize IR: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    // === C Output ===
    let output = &compiled.output;
    match &cli.output {
        Some(path) => match fs::write(path, output) {
            Ok(()) => {
                tracing::info!(
                    input = %file_name,
                    output = %path.display(),
                    bytes = output.len(),
                    "compiled"
                );
            }
            Err(e) => {
                eprintln!("error: could not write '{}': {}", path.display(), e);
                process::exit(1);
            }
        },
        None => print!("{}", output),
    }
}

/// Log to stderr so stdout stays clean for generated C.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

/// Find Ecsl.toml next to the input (walking up), or from the working
/// directory when compiling the sample. A missing manifest is not an error.
fn load_manifest(input: Option<&Path>) -> Result<Option<EcslManifest>, ManifestError> {
    let start = match input {
        Some(path) => fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf()),
        None => std::env::current_dir()?.join(SAMPLE_FILE),
    };
    match manifest::find_and_load_manifest(&start) {
        Ok(m) => {
            tracing::debug!(root = %m.root_dir.display(), "loaded Ecsl.toml");
            Ok(Some(m))
        }
        Err(ManifestError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Defaults, then Ecsl.toml, then command-line flags.
fn build_options(cli: &Cli, manifest: Option<&EcslManifest>) -> Result<CodegenOptions, String> {
    let mut options = CodegenOptions::default();

    if let Some(m) = manifest {
        if let Some(count) = m.codegen.max_entity_count {
            options.max_entity_count = count;
        }
        if let Some(filter) = &m.codegen.foreach_filter {
            options.filter_mode = filter.parse()?;
        }
        options.add_primitives(m.codegen.primitives.iter().cloned());
    }

    if let Some(count) = cli.max_entities {
        if count == 0 {
            return Err("--max-entities must be greater than zero".to_string());
        }
        options.max_entity_count = count;
    }
    if let Some(filter) = cli.filter {
        options.filter_mode = filter;
    }
    Ok(options)
}

fn module_name(cli: &Cli, manifest: Option<&EcslManifest>) -> String {
    if let Some(path) = &cli.input {
        return path
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
    }
    manifest
        .and_then(|m| m.project.as_ref())
        .map(|p| p.name.clone())
        .unwrap_or_else(|| "sample".to_string())
}

fn fail(error: &CompileError, source: &str, file_name: &str) -> ! {
    print_diagnostic(&error.to_diagnostic(), source, file_name);
    process::exit(1);
}

fn print_diagnostic(diag: &Diagnostic, source: &str, file_name: &str) {
    let kind = if diag.is_error() {
        ReportKind::Error
    } else {
        ReportKind::Warning
    };

    if let Some(ref span) = diag.span {
        let start = span.start.offset as usize;
        let end = (span.end.offset as usize).max(start + 1);

        let color = if diag.is_error() {
            Color::Red
        } else {
            Color::Yellow
        };

        let mut report = Report::build(kind, file_name, start)
            .with_message(&diag.message)
            .with_label(
                Label::new((file_name, start..end))
                    .with_message(&diag.message)
                    .with_color(color),
            );

        for related in &diag.related {
            let rs = related.span.start.offset as usize;
            let re = (related.span.end.offset as usize).max(rs + 1);
            report = report.with_label(
                Label::new((file_name, rs..re))
                    .with_message(&related.message)
                    .with_color(Color::Blue),
            );
        }

        if let Some(ref suggestion) = diag.suggestion {
            report = report.with_help(suggestion);
        }

        if let Err(e) = report
            .finish()
            .eprint((file_name, Source::from(source)))
        {
            tracing::warn!(error = %e, "failed to render diagnostic");
            eprintln!("{}", diag);
        }
    } else {
        let prefix = if diag.is_error() { "error" } else { "warning" };
        eprintln!("{}: {}", prefix, diag.message);
        if let Some(ref suggestion) = diag.suggestion {
            eprintln!("   = help: {}", suggestion);
        }
        eprintln!();
    }
}
