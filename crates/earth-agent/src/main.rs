use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use earth_agent::commands::{self, generate::GenerateOptions, run::BrowserOptions};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "earth-agent")]
#[command(about = "Earth Agent - Google Earth Engine code from natural language\nGenerates code with a chat model and runs it in the Earth Engine Code Editor")]
#[command(version)]
struct Cli {
  /// Enable verbose diagnostic logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

/// Browser connection arguments
#[derive(Args)]
struct BrowserArgs {
  /// DevTools URL of a running Chromium (e.g. http://127.0.0.1:9222); launches one when omitted
  #[arg(long)]
  debug_url: Option<String>,
  /// Launch the browser without a window
  #[arg(long)]
  headless: bool,
}

impl From<BrowserArgs> for BrowserOptions {
  fn from(args: BrowserArgs) -> Self {
    Self { debug_url: args.debug_url, headless: args.headless }
  }
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
  On,
  Off,
}

#[derive(Subcommand)]
enum ConfigCommand {
  /// Show configuration and stored settings
  Show,
  /// Store an OpenAI API key
  SetKey { key: String },
  /// Remove the stored API key
  ClearKey,
  /// Turn validation of generated code on or off
  Validation { state: Toggle },
}

#[derive(Subcommand)]
enum Command {
  /// Generate Earth Engine code for a task
  Generate {
    /// Task description (space-separated)
    #[arg(required = true)]
    prompt: Vec<String>,
    /// OpenAI API key for this run
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    /// Skip catalog lookup and recommendation, use a single strict prompt
    #[arg(long)]
    direct: bool,
    /// Write the code to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Inject the code into the editor and press Run
    #[arg(long)]
    run: bool,
    #[command(flatten)]
    browser: BrowserArgs,
  },
  /// Inject existing code into the editor and press Run
  Run {
    /// Code file, `-` or omitted for stdin
    file: Option<PathBuf>,
    #[command(flatten)]
    browser: BrowserArgs,
  },
  /// Show catalog datasets matching a task
  Datasets {
    #[arg(required = true)]
    task: Vec<String>,
    /// Print the full analysis as JSON
    #[arg(long)]
    json: bool,
  },
  /// Extract JavaScript from model output
  Extract {
    file: Option<PathBuf>,
    /// Print which extraction strategies fired
    #[arg(long)]
    trace: bool,
  },
  /// Validate Earth Engine code
  Validate { file: Option<PathBuf> },
  /// Manage configuration and stored settings
  Config {
    #[command(subcommand)]
    command: ConfigCommand,
  },
}

async fn handle(command: Command) -> Result<()> {
  match command {
    Command::Generate { prompt, api_key, direct, output, run, browser } => {
      commands::generate::generate(GenerateOptions {
        prompt: prompt.join(" "),
        api_key,
        direct,
        output,
        run,
        browser: browser.into(),
      })
      .await
    }
    Command::Run { file, browser } => commands::run::run(file.as_deref(), &BrowserOptions::from(browser)).await,
    Command::Datasets { task, json } => commands::datasets::datasets(&task.join(" "), json).await,
    Command::Extract { file, trace } => commands::extract::extract(file.as_deref(), trace),
    Command::Validate { file } => commands::validate::validate(file.as_deref()).await,
    Command::Config { command } => match command {
      ConfigCommand::Show => commands::config::show(),
      ConfigCommand::SetKey { key } => commands::config::set_key(&key),
      ConfigCommand::ClearKey => commands::config::clear_key(),
      ConfigCommand::Validation { state } => commands::config::set_validation(matches!(state, Toggle::On)),
    },
  }
}

fn init_tracing(verbose: bool) {
  let default = if verbose { "earth_agent=debug,ee_validator=debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
  tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[tokio::main]
async fn main() {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  if let Err(e) = handle(cli.command).await {
    herald::error!(&format!("{e:#}"));
    std::process::exit(1);
  }
}
