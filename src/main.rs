// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

use slidelingo::app_config::{self, resolve_config_path, Config, TranslationProvider, DEFAULT_CONFIG_FILE};
use slidelingo::app_controller::{Controller, RunOptions, ScopeMode, SlideSelection};
use slidelingo::translation::CancellationToken;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Ollama,
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
    #[value(name = "lmstudio")]
    LMStudio,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
            CliTranslationProvider::LMStudio => TranslationProvider::LMStudio,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check that the configured provider is reachable
    Check(ProviderArgs),

    /// Generate shell completions for slidelingo
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Options shared by every command talking to a provider
#[derive(Args, Debug, Clone)]
struct ProviderArgs {
    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// Input deck file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Source language code, or 'auto' to let the model detect it
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Only translate this slide (1-based)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..), conflicts_with = "all_slides")]
    slide: Option<u32>,

    /// Translate every slide (default)
    #[arg(long)]
    all_slides: bool,

    /// Print the first translated paragraphs without writing the deck
    #[arg(long)]
    preview: bool,

    /// Directory for translated decks (defaults to the input's directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    provider: ProviderArgs,
}

/// slidelingo - Slide deck translation with AI
///
/// Translates the text of presentation decks with LLM providers while keeping
/// run formatting, paragraph formatting and tables intact.
#[derive(Parser, Debug)]
#[command(name = "slidelingo")]
#[command(version)]
#[command(about = "AI-powered slide deck translation tool")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "slidelingo translates the text of slide decks with AI providers, preserving formatting.

EXAMPLES:
    slidelingo deck.json                          # Translate using default config
    slidelingo -f deck.json                       # Force overwrite existing files
    slidelingo -p openai -m gpt-4o deck.json      # Use specific provider and model
    slidelingo -s auto -t es deck.json            # Detect source, translate to Spanish
    slidelingo --slide 3 --preview deck.json      # Preview slide 3 without writing
    slidelingo --log-level debug /decks/          # Process entire directory with debug logging
    slidelingo check -p ollama                    # Test the provider connection
    slidelingo completions bash > slidelingo.bash # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.

SUPPORTED PROVIDERS:
    ollama    - Local Ollama server (default: llama3.2:3b)
    openai    - OpenAI API (requires API key)
    anthropic - Anthropic Claude API (requires API key)
    lmstudio  - LM Studio local server (OpenAI-compatible on http://localhost:1234/v1)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    translate: TranslateArgs,
}

/// Logger writing colored, timestamped lines to stderr
struct CustomLogger;

impl CustomLogger {
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger))?;
        log::set_max_level(level);
        Ok(())
    }

    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }

    fn tag_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "ERROR",
            Level::Warn => "WARN ",
            Level::Info => "INFO ",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        // The max level is raised or lowered after the config is read
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let level = record.level();
            let _ = writeln!(
                std::io::stderr(),
                "{}{} {} {}\x1B[0m",
                Self::color_for_level(level),
                now,
                Self::tag_for_level(level),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info until the config says otherwise
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "slidelingo", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Check(args)) => run_check(args).await,
        None => run_translate(cli.translate).await,
    }
}

/// Load the config file and apply the provider-related overrides
fn load_config(args: &ProviderArgs) -> Result<Config> {
    if let Some(level) = &args.log_level {
        log::set_max_level(app_config::LogLevel::from(level.clone()).to_level_filter());
    }

    let config_path = resolve_config_path(&args.config_path);
    let mut config = Config::load_or_create(&config_path)
        .with_context(|| format!("Failed to load config file: {:?}", config_path))?;

    if let Some(provider) = &args.provider {
        config.translation.provider = provider.clone().into();
    }
    if let Some(model) = &args.model {
        let provider = config.translation.provider;
        config.translation.provider_config_mut(provider).model = model.clone();
    }
    match &args.log_level {
        Some(level) => config.log_level = level.clone().into(),
        None => log::set_max_level(config.log_level.to_level_filter()),
    }

    Ok(config)
}

async fn run_check(args: ProviderArgs) -> Result<()> {
    let config = load_config(&args)?;
    config.validate().context("Configuration validation failed")?;

    let controller = Controller::with_config(config)?;
    controller.test_connection().await?;
    info!("Connection OK");
    Ok(())
}

async fn run_translate(args: TranslateArgs) -> Result<()> {
    let input_path = args
        .input_path
        .clone()
        .ok_or_else(|| anyhow!("INPUT_PATH is required when no subcommand is specified"))?;

    let mut config = load_config(&args.provider)?;
    if let Some(source_lang) = &args.source_language {
        config.source_language = source_lang.clone();
    }
    if let Some(target_lang) = &args.target_language {
        config.target_language = target_lang.clone();
    }
    config.validate().context("Configuration validation failed")?;

    let options = RunOptions {
        selection: match args.slide {
            Some(number) if !args.all_slides => SlideSelection::Single(number as usize - 1),
            _ => SlideSelection::All,
        },
        mode: if args.preview { ScopeMode::Preview } else { ScopeMode::Apply },
        force_overwrite: args.force_overwrite,
    };

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing chunks in flight");
            signal_token.cancel();
        }
    });

    let controller = Controller::with_config(config)?;

    if input_path.is_file() {
        let output_dir = args
            .output
            .clone()
            .unwrap_or_else(|| input_path.parent().unwrap_or(Path::new(".")).to_path_buf());
        controller.run(input_path, output_dir, options, &cancel).await?;
    } else if input_path.is_dir() {
        controller
            .run_folder(input_path, args.output.clone(), options, &cancel)
            .await?;
    } else {
        return Err(anyhow!("Input path does not exist: {:?}", input_path));
    }

    let usage = controller.usage();
    if usage.requests > 0 {
        info!("{}", usage.summary());
    }
    Ok(())
}
