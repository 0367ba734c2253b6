// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::PathBuf;

use subtrans::app_config::{self, Config};
use subtrans::app_controller::Controller;
use subtrans::project::context::{parse_characters, parse_substitutions};
use subtrans::project::{BatchKey, ProjectContext};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
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

/// Project context options, each overriding the stored project value when set
#[derive(Args, Debug, Default)]
struct ContextArgs {
    /// Name of the film or show
    #[arg(long, global = true)]
    movie_name: Option<String>,

    /// Short synopsis given to the translator
    #[arg(long, global = true)]
    synopsis: Option<String>,

    /// Character names, separated by commas
    #[arg(long, global = true)]
    characters: Option<String>,

    /// Extra instructions for the translator
    #[arg(long, global = true)]
    instructions: Option<String>,

    /// Substitutions applied before translation, as `before::after` (repeatable)
    #[arg(long = "substitution", global = true)]
    substitutions: Vec<String>,

    /// Lines per batch before a batch is closed
    #[arg(long, global = true)]
    max_batch_size: Option<usize>,

    /// Pause in seconds that starts a new scene
    #[arg(long, global = true)]
    scene_threshold: Option<f64>,
}

impl ContextArgs {
    fn into_context(self) -> ProjectContext {
        ProjectContext {
            movie_name: self.movie_name,
            synopsis: self.synopsis,
            characters: self.characters.as_deref().map(parse_characters),
            instructions: self.instructions,
            substitutions: if self.substitutions.is_empty() {
                None
            } else {
                Some(parse_substitutions(&self.substitutions.join("\n")))
            },
            max_batch_size: self.max_batch_size,
            scene_threshold: self.scene_threshold,
            ..Default::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Split the subtitles into scenes and batches
    Batch {
        /// Subtitle file (SRT)
        input: PathBuf,
    },

    /// Print the prompt for one batch
    Prompt {
        input: PathBuf,
        #[arg(long)]
        scene: usize,
        #[arg(long)]
        batch: usize,
    },

    /// Install a completion stored in a file into one batch
    Absorb {
        input: PathBuf,
        #[arg(long)]
        scene: usize,
        #[arg(long)]
        batch: usize,
        /// File holding the raw completion text
        #[arg(long)]
        completion: PathBuf,
    },

    /// Translate every batch from completions named scene-S-batch-B.txt
    Translate {
        input: PathBuf,
        /// Directory holding the completions
        #[arg(long)]
        completions: PathBuf,
    },

    /// Merge a contiguous run of scenes
    MergeScenes {
        input: PathBuf,
        #[arg(required = true, value_delimiter = ',')]
        scenes: Vec<usize>,
    },

    /// Merge a contiguous run of batches within a scene
    MergeBatches {
        input: PathBuf,
        #[arg(long)]
        scene: usize,
        #[arg(required = true, value_delimiter = ',')]
        batches: Vec<usize>,
    },

    /// Write the translated subtitles as SRT
    Export {
        input: PathBuf,
        /// Output file, defaults to <stem>-translated.srt next to the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate shell completions for subtrans
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// subtrans - batch subtitle translation projects
///
/// Groups subtitles into scenes and batches, builds prompts for a translation
/// service, and reconciles the returned text back onto the original lines.
#[derive(Parser, Debug)]
#[command(name = "subtrans")]
#[command(version)]
#[command(about = "Batch subtitle translation projects")]
#[command(long_about = "subtrans groups subtitles into scenes and batches and reconciles translated text with the original lines.

EXAMPLES:
    subtrans batch film.srt                                  # Create the project and batch it
    subtrans prompt film.srt --scene 1 --batch 2             # Print the prompt for a batch
    subtrans absorb film.srt --scene 1 --batch 2 --completion reply.txt
    subtrans translate film.srt --completions replies/       # Absorb every stored completion
    subtrans merge-scenes film.srt 2,3                       # Merge scenes 2 and 3
    subtrans export film.srt                                 # Write film-translated.srt
    subtrans completions bash > subtrans.bash                # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. If the config file doesn't
    exist, a default one will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,

    #[command(flatten)]
    context: ContextArgs,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger; the max level is the runtime filter
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger::new(LevelFilter::Trace)))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour for log level
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
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
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
    // Start at info; the config or --log-level may change it below
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "subtrans", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(level) = cli.log_level {
        log::set_max_level(app_config::LogLevel::from(level).to_level_filter());
    }

    let mut config = Config::load_or_create(&cli.config_path)?;
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    log::set_max_level(config.log_level.to_level_filter());

    let controller = Controller::with_config(config)?.with_overrides(cli.context.into_context());

    match cli.command {
        Commands::Batch { input } => {
            controller.batch(&input)?;
        }
        Commands::Prompt { input, scene, batch } => {
            let prompt = controller.prompt(&input, BatchKey::new(scene, batch))?;
            println!("{}", prompt.to_text());
        }
        Commands::Absorb {
            input,
            scene,
            batch,
            completion,
        } => {
            controller.absorb(&input, BatchKey::new(scene, batch), &completion)?;
        }
        Commands::Translate { input, completions } => {
            let summary = controller.translate(&input, &completions).await?;
            info!(
                "{} lines translated, {} batches failed, {} fuzzy matches",
                summary.translated_lines,
                summary.failed.len(),
                summary.fuzzy_warnings.len()
            );
            if !summary.is_complete() {
                warn!("Translation is incomplete");
            }
        }
        Commands::MergeScenes { input, scenes } => {
            controller.merge_scenes(&input, &scenes)?;
        }
        Commands::MergeBatches { input, scene, batches } => {
            controller.merge_batches(&input, scene, &batches)?;
        }
        Commands::Export { input, output } => {
            controller.export(&input, output)?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}
