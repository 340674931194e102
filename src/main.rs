use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand, ValueHint};

use cardforge::card::CardKind;
use cardforge::commands::generate::{self, GenerateOptions};
use cardforge::export::ExportFormat;
use cardforge::llm;
use cardforge::llm::prompt::CountPolicy;
use cardforge::settings::{Settings, load_settings, save_settings};

#[derive(Parser, Debug)]
#[command(
    name = "cardforge",
    version,
    about = "Turn study notes into flashcards with an LLM.",
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true,
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a card set from study material and review it
    Generate {
        /// Path to a text file with the study material. Reads stdin when omitted.
        #[arg(value_name = "PATH", value_hint = ValueHint::FilePath)]
        path: Option<PathBuf>,
        /// Card schema to generate
        #[arg(long, value_enum, default_value = "basic")]
        kind: CardKind,
        /// Exact number of cards to request. The model picks a count when omitted.
        #[arg(long, value_name = "COUNT", value_parser = clap::value_parser!(u32).range(1..=50))]
        count: Option<u32>,
        /// Topic name, used for the export file name
        #[arg(long, value_name = "TOPIC")]
        topic: Option<String>,
        /// Export destination. Defaults to a name derived from the topic.
        #[arg(long, value_name = "PATH", value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
        /// Export format
        #[arg(long, value_enum, default_value = "csv")]
        format: ExportFormat,
        /// Skip the review session and export directly
        #[arg(long, default_value_t = false)]
        plain: bool,
    },
    /// Show or change persisted settings
    Config {
        /// Set the sampling temperature (0.0..=1.0)
        #[arg(long, value_name = "TEMP")]
        temperature: Option<f32>,
        /// Print the current settings
        #[arg(long, default_value_t = false)]
        show: bool,
    },
    /// Manage the OpenAI API key
    Llm {
        /// Store a new API key in the local auth file
        #[arg(long, value_name = "KEY", conflicts_with = "clear")]
        set: Option<String>,
        /// Remove the stored API key from the local auth file
        #[arg(long, conflicts_with = "test")]
        clear: bool,
        /// Verify the configured API key by calling the OpenAI API
        #[arg(long, conflicts_with = "clear")]
        test: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("{:?}", err);
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Generate {
            path,
            kind,
            count,
            topic,
            output,
            format,
            plain,
        } => {
            let count = count.map(CountPolicy::Fixed).unwrap_or(CountPolicy::Automatic);
            generate::run(GenerateOptions {
                path,
                kind,
                count,
                topic,
                output,
                format,
                plain,
            })
            .await?;
        }
        Command::Config { temperature, show } => handle_config_command(temperature, show)?,
        Command::Llm { set, clear, test } => handle_llm_command(set, clear, test).await?,
    }

    Ok(())
}

fn handle_config_command(temperature: Option<f32>, show: bool) -> Result<()> {
    let mut action_taken = false;

    if let Some(temperature) = temperature {
        if !(0.0..=1.0).contains(&temperature) {
            bail!("Temperature must be between 0.0 and 1.0.");
        }
        save_settings(&Settings { temperature })?;
        println!("Set sampling temperature to {temperature}.");
        action_taken = true;
    }

    if show {
        let settings = load_settings()?;
        println!("temperature = {}", settings.temperature);
        action_taken = true;
    }

    if !action_taken {
        bail!("No action provided. Use --temperature or --show.");
    }
    Ok(())
}

async fn handle_llm_command(set: Option<String>, clear: bool, test: bool) -> Result<()> {
    let mut action_taken = false;

    if let Some(key) = set {
        llm::store_api_key(&key)?;
        println!("Stored OpenAI API key in the local auth file.");
        action_taken = true;
    }

    if clear {
        let removed = llm::clear_api_key()?;
        if removed {
            println!("Removed the stored OpenAI API key.");
        } else {
            println!("No OpenAI API key found in the auth file.");
        }
        action_taken = true;
    }

    if test {
        let source = llm::test_configured_api_key().await?;
        println!("OpenAI API key from the {} is valid.", source.description());
        action_taken = true;
    }

    if !action_taken {
        bail!("No action provided. Use --set, --clear, or --test.");
    }
    Ok(())
}
