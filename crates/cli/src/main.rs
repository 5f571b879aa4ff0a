use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use cssmap_cli::convert::{convert_file, write_converted};
use cssmap_cli::http_api::{router, ApiState};
use cssmap_cli::output::{EntryOutput, ModuleOutput, StatusOutput, WebpackOutput};
use cssmap_cli::report::{render_entry, render_module, render_status, render_webpack};
use cssmap_cli::validate::{render_failures, validate_json_files};
use cssmap_indexer::{
    refresh_once, DatasetFetcher, FileFetcher, HttpFetcher, RefreshConfig, RefreshScheduler,
    SnapshotStore, DEFAULT_BASE_URL,
};
use cssmap_protocol::ReleaseChannel;
use cssmap_search::{MappingView, QueryEngine};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "cssmap")]
#[command(about = "Cross-version CSS class mappings for Steam UI themes", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    source: SourceArgs,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Print lookup results as JSON (implies --quiet)
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Args, Clone)]
struct SourceArgs {
    /// Mappings document URL
    #[arg(long, global = true, env = "BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Read the mappings document from a local file instead of the URL
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    /// HTTP timeout for one fetch, in seconds
    #[arg(long, global = true, default_value_t = 30)]
    fetch_timeout_secs: u64,
}

impl SourceArgs {
    fn fetcher(&self) -> Result<Arc<dyn DatasetFetcher>> {
        if let Some(path) = &self.dataset {
            return Ok(Arc::new(FileFetcher::new(path)));
        }
        let fetcher = HttpFetcher::new(
            self.base_url.clone(),
            Duration::from_secs(self.fetch_timeout_secs),
        )
        .context("Failed to build HTTP client")?;
        Ok(Arc::new(fetcher))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the loaded mapping, latest versions, and the version table
    Status,

    /// Find related info to a css class
    Class(ClassArgs),

    /// Find related info to a webpack key
    Webpack(WebpackArgs),

    /// Show one module by its mapping id
    Module(ModuleArgs),

    /// Complete a partial css class or webpack key
    Suggest(SuggestArgs),

    /// Convert a stylesheet to cross-version css classes
    Convert(ConvertArgs),

    /// Validate JSON files
    #[command(name = "validate-json")]
    ValidateJson(ValidateJsonArgs),

    /// Keep mappings refreshed in the background and serve lookups over HTTP
    Serve(ServeArgs),
}

#[derive(Args)]
struct ClassArgs {
    css_class: String,
}

#[derive(Args)]
struct WebpackArgs {
    webpack_key: String,
}

#[derive(Args)]
struct ModuleArgs {
    module_id: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum SuggestKind {
    Class,
    Webpack,
}

#[derive(Args)]
struct SuggestArgs {
    #[arg(value_enum)]
    kind: SuggestKind,

    needle: String,
}

#[derive(Args)]
struct ConvertArgs {
    file: PathBuf,

    /// Write the converted file (same file name) into this directory instead of stdout
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

#[derive(Args)]
struct ValidateJsonArgs {
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Strip Markdown ```json fences and backticks before parsing
    #[arg(long)]
    strip_fences: bool,
}

#[derive(Args)]
struct ServeArgs {
    /// Address to bind the HTTP server
    #[arg(long, default_value = "127.0.0.1:7710")]
    bind: String,

    /// Seconds between successful refreshes
    #[arg(long, default_value_t = 60 * 60 * 24)]
    refresh_interval_secs: u64,

    /// Seconds to wait before retrying a failed refresh
    #[arg(long, default_value_t = 5)]
    retry_backoff_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();
    if cli.json {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    // reqwest/hyper are noisy at debug
    if !cli.verbose {
        builder.filter_module("hyper", log::LevelFilter::Warn);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Status => run_status(&cli.source, cli.json).await?,
        Commands::Class(args) => run_class(&cli.source, args, cli.json).await?,
        Commands::Webpack(args) => run_webpack(&cli.source, args, cli.json).await?,
        Commands::Module(args) => run_module(&cli.source, args, cli.json).await?,
        Commands::Suggest(args) => run_suggest(&cli.source, args, cli.json).await?,
        Commands::Convert(args) => run_convert(&cli.source, args).await?,
        Commands::ValidateJson(args) => run_validate_json(args).await?,
        Commands::Serve(args) => serve(&cli.source, args).await?,
    }

    Ok(())
}

async fn load_view(source: &SourceArgs) -> Result<MappingView> {
    let fetcher = source.fetcher()?;
    let store = SnapshotStore::new();
    refresh_once(fetcher.as_ref(), &store)
        .await
        .with_context(|| format!("Failed to load mappings from {}", fetcher.describe()))?;
    Ok(QueryEngine::new(store).view()?)
}

fn channel_name<'a>(view: &'a MappingView) -> impl Fn(&str) -> Option<&'a str> + Copy {
    move |version: &str| -> Option<&'a str> {
        view.snapshot().channel_of(version).map(ReleaseChannel::as_str)
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_status(source: &SourceArgs, json: bool) -> Result<()> {
    let view = load_view(source).await?;
    let status = StatusOutput::from_snapshot(view.snapshot());
    if json {
        return print_json(&status);
    }
    print!("{}", render_status(&status));
    Ok(())
}

async fn run_class(source: &SourceArgs, args: ClassArgs, json: bool) -> Result<()> {
    let view = load_view(source).await?;
    let entry = view
        .find_css_class(&args.css_class)
        .with_context(|| format!("css class {} not found", args.css_class))?;
    let output = EntryOutput::new(&entry);
    if json {
        return print_json(&output);
    }
    println!("{}", render_module(&output.module));
    print!("{}", render_entry(&output, channel_name(&view)));
    Ok(())
}

async fn run_webpack(source: &SourceArgs, args: WebpackArgs, json: bool) -> Result<()> {
    let view = load_view(source).await?;
    let entries = view
        .find_webpack_key(&args.webpack_key)
        .with_context(|| format!("webpack key {} not found", args.webpack_key))?;
    let output = WebpackOutput::new(&entries);
    if json {
        return print_json(&output);
    }
    print!("{}", render_webpack(&output, channel_name(&view)));
    Ok(())
}

async fn run_module(source: &SourceArgs, args: ModuleArgs, json: bool) -> Result<()> {
    let view = load_view(source).await?;
    let module = view
        .find_module(&args.module_id)
        .with_context(|| format!("module {} not found", args.module_id))?;
    let output = ModuleOutput::new(&args.module_id, module);
    if json {
        return print_json(&output);
    }
    print!("{}", render_module(&output));
    Ok(())
}

async fn run_suggest(source: &SourceArgs, args: SuggestArgs, json: bool) -> Result<()> {
    let view = load_view(source).await?;
    let found = match args.kind {
        SuggestKind::Class => view.suggest_css_classes(&args.needle),
        SuggestKind::Webpack => view.suggest_webpack_keys(&args.needle),
    };
    if json {
        return print_json(&found);
    }
    for item in found {
        println!("{item}");
    }
    Ok(())
}

async fn run_convert(source: &SourceArgs, args: ConvertArgs) -> Result<()> {
    let view = load_view(source).await?;
    let converted = convert_file(&view, &args.file).await?;
    match args.out_dir {
        Some(out_dir) => {
            let target = write_converted(&converted, &out_dir).await?;
            log::info!("Wrote {}", target.display());
        }
        None => print!("{}", converted.content),
    }
    Ok(())
}

async fn run_validate_json(args: ValidateJsonArgs) -> Result<()> {
    let failures = validate_json_files(&args.files, args.strip_fences).await;
    if failures.is_empty() {
        println!("JSON ok");
        return Ok(());
    }
    println!("{}", render_failures(&failures));
    anyhow::bail!("{} of {} files failed validation", failures.len(), args.files.len());
}

async fn serve(source: &SourceArgs, args: ServeArgs) -> Result<()> {
    let fetcher = source.fetcher()?;
    let store = SnapshotStore::new();
    let config = RefreshConfig {
        interval: Duration::from_secs(args.refresh_interval_secs),
        retry_backoff: Duration::from_secs(args.retry_backoff_secs),
    };
    let scheduler = RefreshScheduler::start(fetcher, store.clone(), config);
    let app = router(ApiState::new(QueryEngine::new(store), Some(scheduler)));

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;
    log::info!("Serving mappings API on http://{}", args.bind);
    axum::serve(listener, app).await?;
    Ok(())
}
