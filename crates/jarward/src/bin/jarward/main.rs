mod output;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use jarward::{config, logs, Supervisor};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "JARWARD_LOG";

/// Start, stop and inspect one JVM server launched from a jar.
#[derive(Debug, Parser)]
#[command(name = "jarward", version, about, arg_required_else_help = true)]
struct Cli {
	#[command(subcommand)]
	command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Launch the server in the background unless it is already running
	Start {
		/// Path to the jar, relative paths resolve against the jarward directory
		artifact: PathBuf,
	},
	/// Stop the server, forcing it after the grace period
	Stop { artifact: PathBuf },
	/// Stop the server if running, then start it again
	Restart { artifact: PathBuf },
	/// Show whether the server is running, with process diagnostics
	Status {
		artifact: PathBuf,
		/// Print the report as JSON
		#[arg(long)]
		json: bool,
	},
	/// Print the last lines of application.out
	Logs {
		artifact: PathBuf,
		#[arg(short = 'n', long = "lines", default_value_t = 100)]
		lines: usize,
	},
}

impl Command {
	fn artifact(&self) -> &Path {
		match self {
			Command::Start { artifact }
			| Command::Stop { artifact }
			| Command::Restart { artifact }
			| Command::Status { artifact, .. }
			| Command::Logs { artifact, .. } => artifact,
		}
	}
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
	let cli = Cli::parse();

	tracing_subscriber::fmt()
		.with_writer(std::io::stderr)
		.with_env_filter(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")))
		.init();

	let home = pidward::paths::home_dir(config::HOME_ENV);
	let supervisor = match config::load(&home).and_then(|cfg| Supervisor::new(&home, cli.command.artifact(), cfg)) {
		Ok(s) => s,
		Err(e) => {
			eprintln!("{} {}", "error:".red(), e);
			return ExitCode::FAILURE;
		}
	};
	let name = supervisor.name().to_string();

	match cli.command {
		Command::Start { .. } => output::start(&name, supervisor.start().await),
		Command::Stop { .. } => output::stop(&name, supervisor.stop().await),
		Command::Restart { .. } => output::restart(&name, supervisor.restart().await),
		Command::Status { json, .. } => output::status(&supervisor.status().await, json),
		Command::Logs { lines, .. } => {
			let path = supervisor.paths.log_path();
			if !path.exists() {
				eprintln!("{}: no log at {}", name, path.display());
				return ExitCode::FAILURE;
			}
			for line in logs::tail(&path, lines) {
				println!("{}", line);
			}
			ExitCode::SUCCESS
		}
	}
}
