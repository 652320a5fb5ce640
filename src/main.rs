// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, error, info, warn};
use parking_lot::Mutex;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use cuedub::app_config::{self, Config, TargetLanguage, TranslationProvider};
use cuedub::app_controller::Controller;
use cuedub::providers::Translator;
use cuedub::shutdown::Shutdown;
use cuedub::translation::TranslationService;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Ollama,
    OpenAI,
    Anthropic,
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

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Dub content items into the configured target languages (default command)
    Run(RunArgs),

    /// Generate shell completions for cuedub
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Content item ids (sub-directories of the root directory)
    #[arg(value_name = "CONTENT_ID")]
    content_ids: Vec<String>,

    /// Process every content item found under the root directory
    #[arg(short, long, conflicts_with = "content_ids")]
    all: bool,

    /// Only process content ids matching this regex
    #[arg(short, long)]
    filter: Option<String>,

    /// Target language codes, overriding the configured list
    #[arg(short, long, value_delimiter = ',')]
    target_language: Vec<String>,

    /// Directory holding one sub-directory per content item
    #[arg(short, long)]
    root_dir: Option<PathBuf>,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Stop after translation, without generating audio
    #[arg(long)]
    no_audio: bool,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// cuedub - dub timed transcripts into time-aligned speech
///
/// Translates the source transcript of each content item with an LLM
/// provider, voices the translation with a speech engine and pads the speech
/// so it follows the original timeline.
#[derive(Parser, Debug)]
#[command(name = "cuedub")]
#[command(version)]
#[command(about = "Transcript translation and time-aligned dubbing")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "cuedub translates the transcript of each content item and voices it into one audio track per target language.

EXAMPLES:
    cuedub abc123                           # Dub one item into the configured languages
    cuedub --all                            # Dub every item under the root directory
    cuedub --all -f '^ep'                   # Only items whose id starts with ep
    cuedub -t es,de abc123 def456           # Only Spanish and German
    cuedub --no-audio abc123                # Translate only
    cuedub -p openai --log-level debug abc  # Use OpenAI with debug logging
    cuedub completions bash > cuedub.bash   # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.

LAYOUT:
    <root>/<id>/<id>.<src>.srt       source transcript
    <root>/<id>/<lang>/<id>.<lang>.wav  final track")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

// @struct: Coloured stderr logger with an optional plain-text file copy
struct CustomLogger {
    level: LevelFilter,
    file: Option<Mutex<File>>,
}

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter, file: Option<File>) -> Result<()> {
        let logger = Box::new(CustomLogger {
            level,
            file: file.map(Mutex::new),
        });
        log::set_boxed_logger(logger).map_err(|e| anyhow!("Failed to install logger: {}", e))?;
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
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let now = chrono::Local::now().format("%H:%M:%S.%3f");
        let _ = writeln!(
            std::io::stderr(),
            "{}{} {:<5} {}\x1B[0m",
            Self::color_for_level(record.level()),
            now,
            record.level(),
            record.args()
        );

        if let Some(file) = &self.file {
            let _ = writeln!(file.lock(), "{} {:<5} {}", now, record.level(), record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
        if let Some(file) = &self.file {
            let _ = file.lock().flush();
        }
    }
}

/// Open the log file named by a chrono pattern, e.g. `cuedub_%Y-%m-%d_%H-%M.log`
fn open_log_file(pattern: &str) -> Result<File> {
    let name = chrono::Local::now().format(pattern).to_string();
    File::create(&name).with_context(|| format!("Failed to create log file: {}", name))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "cuedub", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Run(args)) => run(args).await,
        None => run(cli.run).await,
    }
}

/// Apply command line overrides on top of the file configuration
fn apply_overrides(config: &mut Config, options: &RunArgs) {
    if !options.target_language.is_empty() {
        config.target_languages = options.target_language
            .iter()
            .map(|code| {
                config.target_language(code)
                    .cloned()
                    .unwrap_or_else(|| TargetLanguage::with_default_budget(code.as_str()))
            })
            .collect();
    }

    if let Some(filter) = &options.filter {
        config.content_id_filter = Some(filter.clone());
    }

    if let Some(root_dir) = &options.root_dir {
        config.root_dir = root_dir.clone();
    }

    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }

    if options.no_audio {
        config.generate_audio = false;
    }

    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
}

async fn run(options: RunArgs) -> Result<()> {
    let (mut config, created) = Config::load_or_create(&options.config)?;
    apply_overrides(&mut config, &options);

    let log_file = config.log_file.as_deref().map(open_log_file).transpose()?;
    CustomLogger::init(level_filter(&config.log_level), log_file)?;

    if created {
        warn!("Config file not found at {:?}, created a default one", options.config);
    }

    config.validate().context("Configuration validation failed")?;

    let shutdown = Shutdown::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current unit");
            signal.trigger();
        }
    });

    let service = TranslationService::new(config.translation.clone())?;
    if let Err(e) = service.test_connection().await {
        warn!("Translation provider {} is not answering: {}", service.name(), e);
    }

    let controller = Controller::with_config(config, shutdown)?;

    let content_ids = if options.all {
        controller.discover_content_ids()?
    } else {
        options.content_ids.clone()
    };
    if content_ids.is_empty() {
        bail!("No content items to process; pass CONTENT_ID arguments or --all");
    }

    info!(
        "Processing {} item(s) into {}",
        content_ids.len(),
        controller.config().target_languages
            .iter()
            .map(|t| t.code.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let report = controller.run(&content_ids).await;

    for failure in report.failed_languages() {
        if let Err(e) = &failure.result {
            error!("{}/{}: {}", failure.content_id, failure.language, e);
        }
    }
    for item in &report.failed_items {
        error!("{}: {}", item.content_id, item.error);
    }

    if report.has_failures() {
        bail!("{}", report);
    }

    info!("{}", report);
    Ok(())
}
