use std::path::PathBuf;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use activity_digest::app::App;
use activity_digest::archive::ArchiveHttpClient;
use activity_digest::config::{ConfigLoader, Settings};
use activity_digest::domain::DateFormat;
use activity_digest::error::DigestError;
use activity_digest::window::DateWindow;

#[derive(Parser)]
#[command(name = "activity-digest")]
#[command(about = "Fetch a window of archive activity and write a curve-scaled dataset")]
#[command(version)]
struct Cli {
    /// First day of the window (YYYY-MM-DD). Defaults to the days ending today.
    date: Option<String>,

    /// Window length in days; the window covers this many days plus one.
    #[arg(long)]
    days: Option<u32>,

    #[arg(long)]
    output: Option<Utf8PathBuf>,

    #[arg(long)]
    date_format: Option<DateFormat>,

    #[arg(long)]
    pretty: bool,

    /// JSON settings file.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    base_url: Option<String>,

    #[arg(long)]
    collection: Option<String>,

    /// Resolve the window and print the requests without fetching or writing.
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    fn overrides(&self) -> Settings {
        Settings {
            base_url: self.base_url.clone(),
            collection: self.collection.clone(),
            window_days: self.days,
            output_path: self.output.clone(),
            date_format: self.date_format,
            pretty: self.pretty.then_some(true),
            ..Settings::default()
        }
    }
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<DigestError>() {
            return ExitCode::from(err.exit_code());
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = ConfigLoader::resolve(
        ConfigLoader::token_from_env(),
        cli.config.as_deref(),
        cli.overrides(),
    )?;
    let today = chrono::Local::now().date_naive();
    let window = DateWindow::build(cli.date.as_deref(), config.window_days, today)?;

    let client = ArchiveHttpClient::new(&config)?;

    if cli.dry_run {
        for day in window.days() {
            info!(url = %client.redacted_url(day), "would fetch");
        }
        info!(path = %config.output_path, "would write");
        return Ok(());
    }

    let app = App::new(config, client)?;
    let summary = app.run(&window)?;
    info!(
        start = %summary.start_date,
        end = %summary.end_date,
        keys = summary.keys,
        max_value = summary.max_value,
        path = %summary.output_path,
        "done"
    );
    Ok(())
}
