mod config;
mod test_runner;

use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use batch::{BatchUpdate, EncodeOptions, ReplayError, SimulatedDocument};
use docmark::{CompileOptions, CompileResult, IndexUnit, Notice};

use crate::config::Config;

const SUBCOMMANDS: &[&str] = &["compile", "check", "test", "help"];

#[derive(Parser)]
#[command(
    name = "docmark",
    version,
    about = "Compile markdown into document text and formatting requests"
)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Config file (defaults to ./docmark.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Raise the log level (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a markdown file and print the result
    Compile(CompileArgs),

    /// Compile, encode and replay a file against an empty document
    Check(CheckArgs),

    /// Run .test.md fixture files
    Test(TestArgs),
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// The flattened plain text
    Text,
    /// One format operation per line
    Ops,
    /// The batch update request body
    Json,
    /// The parsed markdown tree
    Tree,
}

#[derive(clap::Args)]
struct TargetArgs {
    /// Markdown source file
    file: String,

    /// Index of the first inserted character in the target document
    #[arg(long, value_name = "N")]
    base: Option<u64>,

    /// Count indices in UTF-16 code units
    #[arg(long)]
    utf16: bool,
}

#[derive(clap::Args)]
struct CompileArgs {
    #[command(flatten)]
    target: TargetArgs,

    #[arg(short, long, value_enum, default_value_t = Format::Ops)]
    format: Format,
}

#[derive(clap::Args)]
struct CheckArgs {
    #[command(flatten)]
    target: TargetArgs,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.md file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    // Backwards compatibility: `docmark file.md` works like
    // `docmark compile file.md`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(pos) = first_positional(&args) {
        if !SUBCOMMANDS.contains(&args[pos].as_str()) {
            args.insert(pos, "compile".to_string());
        }
    }

    let cli = Cli::parse_from(&args);
    init_logging(cli.verbose);

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    match cli.command {
        Command::Compile(compile_args) => do_compile(compile_args, &config, cli.no_color),
        Command::Check(check_args) => do_check(check_args, &config, cli.no_color),
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code = test_runner::run_tests(path, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

/// Position of the first argument that is neither a flag nor a flag's value.
fn first_positional(args: &[String]) -> Option<usize> {
    let mut skip_value = false;
    for (pos, arg) in args.iter().enumerate().skip(1) {
        if skip_value {
            skip_value = false;
            continue;
        }
        if arg == "--config" {
            skip_value = true;
            continue;
        }
        if !arg.starts_with('-') {
            return Some(pos);
        }
    }
    None
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn color_choice(no_color: bool) -> ColorChoice {
    if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    }
}

fn read_source(file: &str) -> String {
    match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", file, e);
            process::exit(1);
        }
    }
}

/// Config values with the command line flags applied on top.
fn compile_options(target: &TargetArgs, config: &Config) -> CompileOptions {
    let mut options = config.compile;
    if let Some(base) = target.base {
        options.base_index = base;
    }
    if target.utf16 {
        options.index_unit = IndexUnit::Utf16;
    }
    options
}

fn compile_or_exit(source: &str, options: &CompileOptions) -> CompileResult {
    match docmark::compile_markdown(source, options) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

fn do_compile(args: CompileArgs, config: &Config, no_color: bool) {
    let source = read_source(&args.target.file);
    let options = compile_options(&args.target, config);

    if args.format == Format::Tree {
        print!("{}", docmark::parser::parse(&source));
        return;
    }

    let result = compile_or_exit(&source, &options);
    emit_notices(&args.target.file, &source, &result.notices, no_color);

    match args.format {
        Format::Text => print!("{}", result.plain_text),
        Format::Ops => {
            for op in &result.operations {
                println!("{}", op);
            }
        }
        Format::Json => {
            let batch = batch::encode(&result, &config.batch);
            match batch.to_json_pretty() {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("error: cannot serialize batch: {}", e);
                    process::exit(1);
                }
            }
        }
        Format::Tree => {}
    }
}

fn do_check(args: CheckArgs, config: &Config, no_color: bool) {
    let source = read_source(&args.target.file);
    let options = compile_options(&args.target, config);
    let result = compile_or_exit(&source, &options);
    emit_notices(&args.target.file, &source, &result.notices, no_color);

    let (doc, batch) = match replay(&result, &options, &config.batch) {
        Ok(replayed) => replayed,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    for paragraph in doc.paragraphs() {
        if paragraph.end <= options.base_index {
            continue;
        }
        println!("{}", paragraph);
    }
    eprintln!(
        "ok: {} requests applied, {} operations",
        batch.requests.len(),
        result.operations.len()
    );
}

/// Encode `result` and apply it to a document whose blank paragraphs stand
/// in for whatever precedes the insertion point.
fn replay(
    result: &CompileResult,
    options: &CompileOptions,
    encode: &EncodeOptions,
) -> Result<(SimulatedDocument, BatchUpdate), ReplayError> {
    let mut doc = SimulatedDocument::for_insertion_at(options.base_index, options.index_unit)?;
    let batch = batch::encode(result, encode);
    debug!(requests = batch.requests.len(), "checking batch");
    doc.apply(&batch)?;
    Ok((doc, batch))
}

fn emit_notices(name: &str, source: &str, notices: &[Notice], no_color: bool) {
    if notices.is_empty() {
        return;
    }
    let mut files = SimpleFiles::new();
    let file_id = files.add(name.to_string(), source.to_string());
    let writer = StandardStream::stderr(color_choice(no_color));
    let config = term::Config::default();
    for notice in notices {
        let diagnostic = notice.to_diagnostic(file_id);
        let _ = term::emit_to_write_style(&mut writer.lock(), &config, &files, &diagnostic);
    }
}
