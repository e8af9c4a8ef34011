use clap::{Parser, Subcommand};
use fintrace_core::tools::Toolbox;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "fintrace_cli")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Financial health report (ratios + company context) as JSON.
    Health {
        /// Ticker symbol, e.g. AAPL.
        ticker: String,
    },
    /// Digest of recent relevant company news.
    News { ticker: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = fintrace_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    let toolbox = match Toolbox::from_settings(&settings) {
        Ok(toolbox) => toolbox,
        Err(e) => {
            tracing::error!(error = %e, "failed to build tool providers");
            return Err(e);
        }
    };

    match args.command {
        Command::Health { ticker } => {
            tracing::info!(%ticker, "running financial health report");
            let report = toolbox.get_financial_health(&ticker).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::News { ticker } => {
            tracing::info!(%ticker, "fetching company news digest");
            println!("{}", toolbox.get_company_news(&ticker).await);
        }
    }

    Ok(())
}

fn init_sentry(settings: &fintrace_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
