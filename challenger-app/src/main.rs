use std::path::PathBuf;

use anyhow::Result;
use challenger_common::observability::{init_logging, LogConfig};
use challenger_common::report::RuntimeReport;
use challenger_config::{ChallengerConfigLoader, ConfigMap, ConfigOutcome};
use challenger_drivers::challenger_browser::context::ChallengeContextBuilder;
use clap::Parser;
use serde_json::Value;
use tracing::{debug, info};

/// Bring up a configured challenger browser session.
#[derive(Debug, Parser)]
#[command(name = "challenger")]
struct Cli {
    /// User configuration file, bootstrapped from the sample on first run.
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Built-in sample configuration shipped with the project.
    #[arg(long, default_value = "config-sample.yaml")]
    sample: PathBuf,

    /// Run with a visible browser window instead of the default silent mode.
    #[arg(long)]
    visible: bool,

    /// Restrict the language of challenge labels.
    #[arg(long)]
    lang: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Load config; a first run only writes the user file and stops.
    let settings = match ChallengerConfigLoader::new()
        .with_output(&cli.config)
        .with_sample(&cli.sample)
        .load()?
    {
        ConfigOutcome::Loaded(map) => map,
        ConfigOutcome::Bootstrapped { output } => {
            println!("configuration file was missing: {}", output.display());
            println!("[EXIT] a fresh copy was generated from the sample; edit it and restart");
            std::process::exit(0);
        }
    };

    let mut log_config = LogConfig::default();
    if let Some(dir) = string_key(&settings, "log_dir") {
        log_config.log_dir = Some(PathBuf::from(dir));
    }
    let log_path = init_logging(log_config)?;
    debug!(log_path = %log_path.display(), "logging initialised");

    let lang = cli.lang.clone().or_else(|| string_key(&settings, "lang"));
    let mut builder = ChallengeContextBuilder::new().silence(!cli.visible);
    if let Some(lang) = lang {
        builder = builder.lang(lang);
    }
    let mut context = builder.build().await?;

    info!(
        "{}",
        RuntimeReport::new("ChallengerRuntime")
            .message("browser session established")
            .field("silence", !cli.visible)
    );

    if let Some(homepage) = string_key(&settings, "homepage") {
        debug!(%homepage, "warming up the session");
        context.goto(&homepage).await?;
    }

    context.close().await
}

fn string_key(map: &ConfigMap, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}
