mod cmd;
mod output;
mod prompts;

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::{Globals, TemplateArgs};
use output::print_error;

/// stackctl - converge CloudFormation stacks to a template
#[derive(Parser)]
#[command(name = "stackctl")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// AWS region (defaults to the provider chain)
  #[arg(long, global = true)]
  region: Option<String>,

  /// Time between two status polls, e.g. "2s"
  #[arg(long, global = true, value_parser = humantime::parse_duration)]
  poll_interval: Option<Duration>,

  /// Give up waiting after this long, e.g. "30m"
  #[arg(long, global = true, value_parser = humantime::parse_duration)]
  timeout: Option<Duration>,

  /// Machine-readable output where supported
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Create the stack if missing, update it otherwise
  Apply {
    /// Stack name(s)
    #[arg(required = true)]
    names: Vec<String>,

    #[command(flatten)]
    template: TemplateArgs,

    /// Report a no-op without calling the service when the template is unchanged
    #[arg(long)]
    skip_unchanged: bool,

    /// Maximum number of stacks processed at once
    #[arg(short, long, default_value_t = 4)]
    parallelism: usize,
  },

  /// Create a new stack
  Create {
    name: String,

    #[command(flatten)]
    template: TemplateArgs,
  },

  /// Update an existing stack
  Update {
    name: String,

    #[command(flatten)]
    template: TemplateArgs,

    /// Report a no-op without calling the service when the template is unchanged
    #[arg(long)]
    skip_unchanged: bool,
  },

  /// Delete stack(s)
  Delete {
    /// Stack name(s)
    #[arg(required = true)]
    names: Vec<String>,

    /// Do not ask for confirmation
    #[arg(short, long)]
    force: bool,

    /// Maximum number of stacks processed at once
    #[arg(short, long, default_value_t = 4)]
    parallelism: usize,
  },

  /// Delete the stack (if present) and create it again
  Recreate {
    name: String,

    #[command(flatten)]
    template: TemplateArgs,

    /// Do not ask for confirmation
    #[arg(short, long)]
    force: bool,
  },

  /// Show how a template differs from the deployed one
  Diff {
    name: String,

    /// Template locator: path, file://, http(s):// or inline body
    #[arg(short, long)]
    template: String,

    /// Unchanged lines shown around each change
    #[arg(short = 'U', long, default_value_t = 3)]
    context: usize,
  },

  /// Show the stack's event history
  Events { name: String },

  /// Show the stack's current status
  Status { name: String },

  /// Print the deployed template
  Show {
    name: String,

    /// Print the template exactly as stored
    #[arg(long)]
    raw: bool,
  },

  /// Validate a template with the service
  Validate {
    name: String,

    /// Template locator: path, file://, http(s):// or inline body
    #[arg(short, long)]
    template: String,
  },

  /// Show the stack's outputs
  Outputs { name: String },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let globals = Globals {
    region: cli.region,
    poll_interval: cli.poll_interval,
    timeout: cli.timeout,
    json: cli.json,
  };

  let result = match cli.command {
    Commands::Apply {
      names,
      template,
      skip_unchanged,
      parallelism,
    } => cmd::cmd_apply(&globals, &names, &template, skip_unchanged, parallelism),
    Commands::Create { name, template } => cmd::cmd_create(&globals, &name, &template),
    Commands::Update {
      name,
      template,
      skip_unchanged,
    } => cmd::cmd_update(&globals, &name, &template, skip_unchanged),
    Commands::Delete {
      names,
      force,
      parallelism,
    } => cmd::cmd_delete(&globals, &names, force, parallelism),
    Commands::Recreate { name, template, force } => cmd::cmd_recreate(&globals, &name, &template, force),
    Commands::Diff {
      name,
      template,
      context,
    } => cmd::cmd_diff(&globals, &name, &template, context),
    Commands::Events { name } => cmd::cmd_events(&globals, &name),
    Commands::Status { name } => cmd::cmd_status(&globals, &name),
    Commands::Show { name, raw } => cmd::cmd_show(&globals, &name, raw),
    Commands::Validate { name, template } => cmd::cmd_validate(&globals, &name, &template),
    Commands::Outputs { name } => cmd::cmd_outputs(&globals, &name),
  };

  match result {
    Ok(code) => code,
    Err(e) => {
      print_error(&format!("{e:#}"));
      ExitCode::FAILURE
    }
  }
}
