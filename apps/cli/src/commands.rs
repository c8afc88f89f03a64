//! CLI command definitions, routing, and tracing setup.

use std::sync::Mutex;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

use substack2md_core::{ArchiveOutcome, ProgressReporter, run_archive};
use substack2md_fetch::{
    AuthenticatedFetcher, Credentials, DirectFetcher, LoginOptions, PageFetcher,
};
use substack2md_shared::{AppConfig, PublicationSession, init_config, load_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// substack2md — archive Substack publications as local markdown.
#[derive(Parser)]
#[command(
    name = "substack2md",
    version,
    about = "Archive a Substack publication as local markdown and HTML files.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Archive a publication (or a single post) to local files.
    Scrape {
        /// Publication URL, or a single post URL (contains /p/).
        url: String,

        /// Maximum number of posts to process (0 = all).
        #[arg(short = 'n', long, default_value = "0")]
        number: usize,

        /// Download CDN images and rewrite references to local paths.
        #[arg(long)]
        images: bool,

        /// Log in as a subscriber to archive paid posts. Credentials are
        /// read from the environment variables named in the config.
        #[arg(long)]
        premium: bool,

        /// Override the markdown output directory.
        #[arg(short, long)]
        directory: Option<String>,

        /// Override the HTML output directory.
        #[arg(long)]
        html_directory: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "substack2md=info",
        1 => "substack2md=debug",
        _ => "substack2md=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Scrape {
            url,
            number,
            images,
            premium,
            directory,
            html_directory,
        } => {
            cmd_scrape(
                &url,
                number,
                images,
                premium,
                directory.as_deref(),
                html_directory.as_deref(),
            )
            .await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

async fn cmd_scrape(
    url: &str,
    number: usize,
    images: bool,
    premium: bool,
    directory: Option<&str>,
    html_directory: Option<&str>,
) -> Result<()> {
    let config = load_config()?;

    let parsed_url = Url::parse(url).map_err(|e| eyre!("invalid URL '{url}': {e}"))?;

    let mut dirs = config.defaults.clone();
    if let Some(dir) = directory {
        dirs.md_dir = dir.to_string();
    }
    if let Some(dir) = html_directory {
        dirs.html_dir = dir.to_string();
    }

    let session = PublicationSession::new(&parsed_url, &dirs, images, number)?;

    info!(
        writer = %session.writer,
        single_post = session.single_post.is_some(),
        images,
        premium,
        "starting archive run"
    );

    let fetcher: Box<dyn PageFetcher> = if premium {
        let credentials = Credentials::from_env(&config.auth)?;
        let options = LoginOptions {
            timeout_secs: session.timeout_secs,
            ..LoginOptions::default()
        };
        Box::new(AuthenticatedFetcher::login(&credentials, &options).await?)
    } else {
        Box::new(DirectFetcher::new(session.timeout_secs)?)
    };

    let reporter = CliProgress::new();
    let outcome = run_archive(
        &session,
        &config.filters.exclude_keywords,
        fetcher.as_ref(),
        &reporter,
    )
    .await?;
    reporter.finish();

    print_summary(&session.writer, &outcome);
    Ok(())
}

fn print_summary(writer: &str, outcome: &ArchiveOutcome) {
    println!();
    println!("  Archive complete for {writer}");
    println!("  Processed: {}", outcome.processed);
    println!("  Archived:  {}", outcome.archived);
    println!("  Existing:  {}", outcome.skipped_existing);
    println!("  Paywalled: {}", outcome.skipped_paywalled);
    println!("  Failed:    {}", outcome.failed);
    println!("  Ledger:    {}", outcome.ledger_path.display());
    println!("  Index:     {}", outcome.index_path.display());
    println!("  Time:      {:.1}s", outcome.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using indicatif spinners/bars.
struct CliProgress {
    multi: MultiProgress,
    spinner: ProgressBar,
    images: Mutex<Option<ProgressBar>>,
}

impl CliProgress {
    fn new() -> Self {
        let multi = MultiProgress::new();
        let spinner = multi.add(ProgressBar::new_spinner());
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self {
            multi,
            spinner,
            images: Mutex::new(None),
        }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, message: &str) {
        self.spinner.set_message(message.to_string());
    }

    fn post_processed(&self, url: &str) {
        self.spinner.set_message(format!("Archived {url}"));
    }

    fn images_started(&self, total: usize) {
        let bar = self.multi.add(ProgressBar::new(total as u64));
        bar.set_style(
            ProgressStyle::with_template("  images [{bar:20.green}] {pos}/{len}")
                .unwrap(),
        );
        *self.images.lock().unwrap() = Some(bar);
    }

    fn image_fetched(&self) {
        if let Some(bar) = self.images.lock().unwrap().as_ref() {
            bar.inc(1);
        }
    }

    fn images_finished(&self) {
        if let Some(bar) = self.images.lock().unwrap().take() {
            bar.finish_and_clear();
        }
    }
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
