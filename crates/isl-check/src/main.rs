//! Analyze an ISL domain file and print its diagnostics.
//!
//! Usage: `isl-check <domain.json> [--config options.toml] [--pass ID]... [--skip ID]... [--hints]`

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use isl_analyzer::{AnalysisResult, AnalyzeOptions, PassRunner};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum Format {
    #[default]
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "isl-check")]
#[command(about = "Run semantic analysis passes over an ISL domain")]
struct Args {
    /// Domain AST as JSON
    domain: PathBuf,

    /// TOML file with analysis options
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run only this pass (repeatable)
    #[arg(long = "pass", value_name = "ID")]
    passes: Vec<String>,

    /// Leave out this pass (repeatable)
    #[arg(long, value_name = "ID")]
    skip: Vec<String>,

    /// Include hint diagnostics
    #[arg(long)]
    hints: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    format: Format,

    /// List the registered passes and exit
    #[arg(long)]
    list_passes: bool,
}

impl Args {
    /// Options from the config file, overridden by flags
    fn options(&self) -> Result<AnalyzeOptions, String> {
        let mut options = match &self.config {
            Some(path) => AnalyzeOptions::load_from_file(path).map_err(|e| e.to_string())?,
            None => AnalyzeOptions::new(),
        };
        if !self.passes.is_empty() {
            options = options.only(self.passes.iter().cloned());
        }
        for id in &self.skip {
            options = options.skip(id.as_str());
        }
        if self.hints {
            options = options.include_hints(true);
        }
        Ok(options)
    }
}

fn list_passes(runner: &PassRunner) {
    for pass in runner.registry().all_passes() {
        println!("{:<28} {:>4}  {}", pass.id, pass.priority, pass.description);
    }
}

fn print_text(path: &Path, result: &AnalysisResult) {
    if result.diagnostics.is_empty() {
        println!("No issues found.");
    }
    for d in &result.diagnostics {
        println!(
            "{}:{}: {} [{}] {}: {}",
            path.display(),
            d.span.start,
            d.severity.as_str(),
            d.code.as_deref().unwrap_or("?"),
            d.source,
            d.message
        );
    }
    let stats = &result.stats;
    println!(
        "{} error(s), {} warning(s), {} hint(s) from {}/{} passes",
        stats.errors, stats.warnings, stats.hints, stats.passes_run, stats.total_passes
    );
}

fn run(args: &Args) -> Result<bool, String> {
    let runner = PassRunner::global();
    if args.list_passes {
        list_passes(runner);
        return Ok(true);
    }

    let options = args.options()?;
    debug!(?options, "resolved options");

    let domain = isl_ast::load_domain_from_file(&args.domain)
        .map_err(|e| format!("{}: {e}", args.domain.display()))?;
    let result = runner.analyze(&domain, &options);

    match args.format {
        Format::Text => print_text(&args.domain, &result),
        Format::Json => {
            let json = serde_json::to_string_pretty(&result).map_err(|e| e.to_string())?;
            println!("{json}");
        }
    }

    Ok(result.success)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(message) => {
            error!("{message}");
            ExitCode::FAILURE
        }
    }
}
