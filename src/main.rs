//! Application entry point for qa-video.
//!
//! # Startup sequence
//!
//! 1. Load `.env` from the working directory, then the per-user one, and
//!    initialise logging.
//! 2. Parse the command line.
//! 3. Load [`AppConfig`] from `--config` or the platform path (defaults on
//!    first run) and fill API keys from the environment.
//! 4. Build the [`PipelineOrchestrator`] with the production collaborators.
//! 5. Dispatch the subcommand.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::io::BufReader;

use qa_video::{
    app::Session,
    config::{AppConfig, AppPaths},
    format::ParseMode,
    pipeline::{PipelineOrchestrator, TaskOptions},
};

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "qa-video", version)]
#[command(about = "Turn questions into narrated videos", long_about = None)]
struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Produce one video for one question
    Run(RunArgs),
    /// Produce one video per question in a list
    Batch(BatchArgs),
    /// Interactive session: generate and re-run stages per question
    Session {
        /// Treat every non-empty line of a loaded file as a question
        #[arg(long)]
        lines: bool,
        #[command(flatten)]
        style: StyleArgs,
    },
    /// Write default settings to the config path
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Options shared by every command that renders.
#[derive(Args, Debug, Clone, Default)]
struct StyleArgs {
    /// Script language (e.g. "English", "Traditional Chinese")
    #[arg(long)]
    language: Option<String>,

    /// Voice name passed to the speech provider
    #[arg(long)]
    voice: Option<String>,

    /// Generate a background image for each question
    #[arg(long)]
    image: bool,

    /// Background image to use instead of the default
    #[arg(long)]
    background: Option<PathBuf>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    #[arg(long)]
    font_size: Option<u32>,

    /// Named color, #rrggbb, or rgba(r, g, b, a)
    #[arg(long)]
    font_color: Option<String>,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// The question to answer
    question: String,

    /// On-screen title (defaults to the question)
    #[arg(long)]
    title: Option<String>,

    /// Output file name inside the video directory
    #[arg(short, long)]
    output: Option<String>,

    #[command(flatten)]
    style: StyleArgs,
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// Question list file
    #[arg(short, long, conflicts_with = "text")]
    file: Option<PathBuf>,

    /// Question list text
    #[arg(short, long)]
    text: Option<String>,

    /// One question per non-empty line instead of blank-line-separated blocks
    #[arg(long)]
    lines: bool,

    #[command(flatten)]
    style: StyleArgs,
}

impl StyleArgs {
    fn apply(&self, opts: &mut TaskOptions) {
        if let Some(language) = &self.language {
            opts.language = language.clone();
        }
        if let Some(voice) = &self.voice {
            opts.voice = voice.clone();
        }
        opts.generate_image |= self.image;
        if self.background.is_some() {
            opts.background = self.background.clone();
        }
        if let Some(width) = self.width {
            opts.width = width;
        }
        if let Some(height) = self.height {
            opts.height = height;
        }
        if let Some(font_size) = self.font_size {
            opts.font_size = font_size;
        }
        if let Some(color) = &self.font_color {
            opts.font_color = color.clone();
        }
    }
}

fn parse_mode(lines: bool, config: &AppConfig) -> ParseMode {
    if lines {
        ParseMode::Lines
    } else {
        config.pipeline.question_mode
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let paths = AppPaths::new();
    dotenvy::dotenv().ok();
    dotenvy::from_path(&paths.env_file).ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings_file = cli.config.clone().unwrap_or(paths.settings_file);

    if let Err(e) = dispatch(cli.command, &settings_file).await {
        log::error!("{e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn dispatch(command: Command, settings_file: &Path) -> Result<()> {
    match command {
        Command::InitConfig { force } => init_config(settings_file, force),
        Command::Run(args) => {
            let (_, mut orchestrator, mut opts) = prepare(settings_file)?;
            args.style.apply(&mut opts);
            opts.title = args.title;
            opts.output_name = args.output;
            let path = orchestrator.run_task(&args.question, &opts).await?;
            println!("{}", path.display());
            Ok(())
        }
        Command::Batch(args) => {
            let (config, mut orchestrator, mut opts) = prepare(settings_file)?;
            args.style.apply(&mut opts);
            let text = match (&args.file, args.text) {
                (Some(file), _) => tokio::fs::read_to_string(file)
                    .await
                    .with_context(|| format!("failed to read {}", file.display()))?,
                (None, Some(text)) => text,
                (None, None) => bail!("either --file or --text must be provided"),
            };
            let mode = parse_mode(args.lines, &config);
            let report = orchestrator
                .run_batch_text(&text, mode, &opts, |p| {
                    println!("[{}/{}] {}", p.completed, p.total, p.question);
                })
                .await?;

            for path in &report.videos {
                println!("{}", path.display());
            }
            for warning in &report.warnings {
                eprintln!("warning: {warning}");
            }
            if report.videos.is_empty() {
                bail!("no videos were produced");
            }
            Ok(())
        }
        Command::Session { lines, style } => {
            let (config, orchestrator, mut opts) = prepare(settings_file)?;
            style.apply(&mut opts);
            let mut session = Session::new(orchestrator, opts, parse_mode(lines, &config));
            session
                .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
                .await?;
            Ok(())
        }
    }
}

/// Load settings and build the orchestrator with its default options.
fn prepare(settings_file: &Path) -> Result<(AppConfig, PipelineOrchestrator, TaskOptions)> {
    let mut config = AppConfig::load_from(settings_file)
        .with_context(|| format!("failed to load settings from {}", settings_file.display()))?;
    config.resolve_secrets();
    log::info!("config: {}", settings_file.display());

    let orchestrator = PipelineOrchestrator::from_config(&config);
    let opts = orchestrator.default_options().clone();
    Ok((config, orchestrator, opts))
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    AppConfig::default()
        .save_to(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("wrote {}", path.display());
    Ok(())
}
