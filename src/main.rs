use clap::{Parser, Subcommand};
use jenius::config::{self, SiteConfig};
use jenius::plan::{Destinations, Plan, Planner};
use jenius::site::Site;
use jenius::{generate, naming, output};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jenius")]
#[command(about = "Incremental static generator for course sites")]
#[command(long_about = "\
Incremental static generator for course sites

Markup pages (.xumlv) are expanded through a template into HTML; every other
file is copied. Only what changed since the last build is regenerated, and
destination files without a source are removed.

Source structure:

  source/
  ├── .jenius.toml                 # Site config (optional)
  ├── index.xumlv                  # Index page, titles the directory in breadcrumbs
  ├── style.css                    # Copied as is
  └── unix/
      ├── index.xumlv
      ├── td01.xumlv               # → unix/td01.html
      └── PRIVATE/                 # Private destination only
          └── td01-solution.c

Two destinations are supported: the public one, and an optional private one
that also receives PRIVATE directories and the answers to exercises.

Run 'jenius gen-config' to generate a documented .jenius.toml.")]
#[command(version)]
struct Cli {
    /// Log progress (overrides RUST_LOG with info)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Flags shared by commands that plan.
#[derive(clap::Args, Clone)]
struct PlanArgs {
    /// Regenerate every file, even when its destination is up to date
    #[arg(long)]
    force: bool,

    /// Config file (default: .jenius.toml in the source directory)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Plan and apply: prune, copy, and render into the destinations
    Build {
        /// SOURCE DEST [PRIVATE_DEST] TEMPLATE
        #[arg(required = true, num_args = 3..=4, value_name = "PATHS")]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        args: PlanArgs,
    },
    /// Show what a build would do without touching the destinations
    Plan {
        /// SOURCE DEST [PRIVATE_DEST]
        #[arg(required = true, num_args = 2..=3, value_name = "PATHS")]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        args: PlanArgs,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a stock .jenius.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Build { paths, args } => {
            let (source, destinations, template) = match paths.as_slice() {
                [source, public, template] => (source, destinations(public, None)?, template),
                [source, public, private, template] => {
                    (source, destinations(public, Some(private))?, template)
                }
                _ => return Err("expected SOURCE DEST [PRIVATE_DEST] TEMPLATE".into()),
            };
            let source = std::path::absolute(source)?;
            let template = std::path::absolute(template)?;
            let site_config = resolve_config(&source, &args)?;
            for root in [&destinations.public, &destinations.private].into_iter().flatten() {
                std::fs::create_dir_all(root)?;
            }
            init_thread_pool(&site_config.processing);

            println!("==> Planning {}", source.display());
            let mut plan = make_plan(&source, &destinations, &site_config, args.force)?;
            plan.remove(&template);
            let shown = display_roots(&source, &destinations);
            output::print_plan(&plan, shown);

            println!("==> Building");
            let site = Site::load(&template, &source, site_config.markup.clone())?;
            let report = generate::execute(&plan, &site)?;
            output::print_report(&report, shown);
            if !report.is_success() {
                return Err(format!("{} file(s) failed", report.failures.len()).into());
            }
            println!("==> Build complete");
        }
        Command::Plan { paths, args, json } => {
            let (source, destinations) = match paths.as_slice() {
                [source, public] => (source, destinations(public, None)?),
                [source, public, private] => (source, destinations(public, Some(private))?),
                _ => return Err("expected SOURCE DEST [PRIVATE_DEST]".into()),
            };
            let source = std::path::absolute(source)?;
            let site_config = resolve_config(&source, &args)?;
            let plan = make_plan(&source, &destinations, &site_config, args.force)?;
            if json {
                println!("{}", serde_json::to_string_pretty(plan.entries())?);
            } else {
                output::print_plan(&plan, display_roots(&source, &destinations));
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn destinations(public: &Path, private: Option<&PathBuf>) -> std::io::Result<Destinations> {
    Ok(Destinations {
        public: Some(std::path::absolute(public)?),
        private: private.map(std::path::absolute).transpose()?,
    })
}

fn display_roots<'a>(source: &'a Path, destinations: &'a Destinations) -> output::Roots<'a> {
    output::Roots {
        source,
        public: destinations.public.as_deref(),
        private: destinations.private.as_deref(),
    }
}

/// `--config` when given, otherwise `.jenius.toml` in the source directory.
fn resolve_config(source: &Path, args: &PlanArgs) -> Result<SiteConfig, config::ConfigError> {
    match &args.config {
        Some(path) => config::load_config_file(path),
        None => config::load_config(source),
    }
}

fn make_plan(
    source: &Path,
    destinations: &Destinations,
    site_config: &SiteConfig,
    force: bool,
) -> Result<Plan, jenius::plan::PlanError> {
    let markup = &site_config.markup;
    Planner::new(
        |name: &str| naming::map_name(name, markup),
        site_config.layout.private_dir.as_str(),
    )
    .force(force)
    .diff(source, destinations)
}
