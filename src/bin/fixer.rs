//! CLI for the fixer-dsl tool.

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use fixer_dsl::prelude::*;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "fixer")]
#[command(author, version, about = "Structural source-to-source fixers", long_about = None)]
struct Cli {
    /// Log more (-v info, -vv debug, -vvv trace); overrides RUST_LOG
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run fixers over files and directories
    Run(RunArgs),

    /// List available fixers in default order
    List {
        /// YAML config declaring settings and custom fixers
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the syntax tree of a file
    Parse {
        file: PathBuf,
    },

    /// Compile a pattern and print its normalized form
    Pattern {
        spec: String,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Files or directories to fix
    #[arg(default_value = ".")]
    paths: Vec<PathBuf>,

    /// Fixer to run, in order; repeat for more (default: configured order)
    #[arg(short = 'f', long = "fix")]
    fixers: Vec<String>,

    /// Fixer to leave out
    #[arg(short = 'x', long)]
    skip: Vec<String>,

    /// Print a diff instead of writing files
    #[arg(long)]
    dry_run: bool,

    /// Keep the original of each rewritten file as <file>.bak
    #[arg(long)]
    backup: bool,

    /// YAML config declaring settings and custom fixers
    #[arg(long)]
    config: Option<PathBuf>,

    /// Worker threads (default: available parallelism)
    #[arg(short, long)]
    jobs: Option<usize>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// File extension searched in directories; replaces the configured list
    #[arg(long = "extension")]
    extensions: Vec<String>,

    /// Glob a file must match, relative to each directory
    #[arg(long)]
    include: Vec<String>,

    /// Glob to exclude, relative to each directory
    #[arg(long)]
    exclude: Vec<String>,

    /// Disable colored diffs
    #[arg(long)]
    no_color: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run(args) => cmd_run(args),
        Commands::List { config } => cmd_list(config.as_deref()),
        Commands::Parse { file } => cmd_parse(&file),
        Commands::Pattern { spec } => cmd_pattern(&spec),
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = if verbose > 0 {
        EnvFilter::new(level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<FixerConfig> {
    match path {
        Some(path) => FixerConfig::from_yaml(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(FixerConfig::default()),
    }
}

fn cmd_run(args: RunArgs) -> Result<ExitCode> {
    let mut config = load_config(args.config.as_deref())?;
    if !args.extensions.is_empty() {
        config.extensions = args.extensions;
    }
    config.include.extend(args.include);
    config.exclude.extend(args.exclude);
    if args.jobs.is_some() {
        config.jobs = args.jobs;
    }
    config.validate().context("Invalid settings")?;

    let registry = FixerRegistry::from_config(&config).context("Failed to build fixers")?;
    let mut runner = FixRunner::from_config(&registry, &config)
        .paths(args.paths)
        .fixers(args.fixers)
        .backup(args.backup);
    for name in args.skip {
        runner = runner.skip(name);
    }
    if args.dry_run {
        runner = runner.dry_run();
    }

    let report = runner.run().context("Fixer run failed")?;

    match args.format {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Text => {
            if args.dry_run {
                let diff = report.diff();
                if !args.no_color && std::io::stdout().is_terminal() {
                    print!("{}", colorize(&diff));
                } else {
                    print!("{diff}");
                }
            }
            eprintln!("{report}");
        }
    }

    Ok(if report.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn cmd_list(config: Option<&Path>) -> Result<ExitCode> {
    let config = load_config(config)?;
    let registry = FixerRegistry::from_config(&config).context("Failed to build fixers")?;

    println!("Default order:");
    for name in registry.default_order() {
        if let Some(fixer) = registry.by_name(name) {
            println!("  {:<16} {}", fixer.name(), fixer.description());
        }
    }

    let extra: Vec<&Fixer> = registry
        .all()
        .iter()
        .filter(|f| !registry.default_order().iter().any(|n| n == f.name()))
        .collect();
    if !extra.is_empty() {
        println!("Available with --fix:");
        for fixer in extra {
            println!("  {:<16} {}", fixer.name(), fixer.description());
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_parse(file: &Path) -> Result<ExitCode> {
    let source = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let tree = parse(&source).map_err(|e| e.in_file(file))?;
    print!("{}", tree.dump());
    Ok(ExitCode::SUCCESS)
}

fn cmd_pattern(spec: &str) -> Result<ExitCode> {
    let pattern = compile(spec)?;
    println!("{pattern}");
    if !pattern.capture_names().is_empty() {
        println!("captures: {}", pattern.capture_names().join(", "));
    }
    Ok(ExitCode::SUCCESS)
}
