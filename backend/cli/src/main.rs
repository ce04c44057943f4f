mod config_cmd;
mod serve;
mod terminal_output;
mod wiring;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use medsnap_config::resolve_config_path;
use medsnap_core::{AdviceProvider, AdviceRequest, TextExtractor};
use medsnap_logging::init_logger;
use medsnap_media::{detect_mime_type, is_image};

#[derive(Parser)]
#[command(name = "medsnap")]
#[command(about = "MedSnap: medication label photos in, advice and reminders out")]
#[command(version)]
struct Cli {
    /// Config file (default: $MEDSNAP_CONFIG_DIR/config.yaml or ~/.medsnap/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the Telegram bot
    Serve,
    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Run OCR on a local image and print the recognized text
    Ocr {
        /// Path to an image file
        image: PathBuf,
    },
    /// Ask the advice providers about a medication label text
    Advise {
        /// Confirmed label text
        text: String,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate the config and probe the OCR binary
    Check,
    /// Print the effective config with secrets masked
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = resolve_config_path(cli.config.as_deref());

    match cli.command {
        Commands::Serve => {
            // Validation logs its warnings, so the logger goes in first.
            let (config, report) = serve::load_for_serving(&path).await?;
            init_logger(&wiring::log_options(&config));
            medsnap_config::ensure_valid(&report)?;
            serve::run_server(config).await?;
        }
        Commands::Config { action } => {
            match action {
                ConfigAction::Check => {
                    if !config_cmd::check(&path).await? {
                        std::process::exit(1);
                    }
                }
                ConfigAction::Show => {
                    let config = medsnap_config::load(&path).await?;
                    print!("{}", config_cmd::show(&config)?);
                }
            }
        }
        Commands::Ocr { image } => {
            let config = medsnap_config::load(&path).await?;
            let mime = detect_mime_type(&image);
            if !is_image(mime) {
                terminal_output::note_warn(&format!(
                    "{} does not look like an image ({mime}); trying anyway",
                    image.display()
                ));
            }
            let bytes = tokio::fs::read(&image)
                .await
                .with_context(|| format!("Failed to read {}", image.display()))?;
            let text = wiring::build_extractor(&config).extract_text(&bytes).await?;
            if text.trim().is_empty() {
                terminal_output::note_warn("No text found in the image.");
            } else {
                println!("{}", text.trim());
            }
        }
        Commands::Advise { text } => {
            let config = medsnap_config::load(&path).await?;
            let advisor = wiring::build_advisor(&config)?;
            let timeout = Duration::from_secs(config.advice_timeout_secs());
            match tokio::time::timeout(timeout, advisor.get_advice(&AdviceRequest::new(text))).await
            {
                Ok(advice) => println!("{}", advice?),
                Err(_) => bail!("advice timed out after {}s", timeout.as_secs()),
            }
        }
    }

    Ok(())
}
