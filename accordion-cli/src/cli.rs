use std::process;

use anyhow::Result;
use camino::Utf8Path;
use clap::{ArgAction, ArgMatches, Args, FromArgMatches, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::{project::Project, shell};

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Build { project, assets } => project.build(&assets).await,
        Command::Watch { project } => project.watch().await,
        Command::Clean { project } => project.clean().await,
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}

#[derive(Parser)]
#[command(version, about = "Copies static site assets into the build directory")]
struct Cli {
    /// Print diagnostics, twice for more detail
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the copy tasks once
    Build {
        #[command(flatten)]
        project: Project,
        /// Only run the named task, may be repeated
        #[arg(short, long = "asset", value_name = "NAME")]
        assets: Vec<String>,
    },
    /// Run all copy tasks, then rerun them as their files change
    Watch {
        #[command(flatten)]
        project: Project,
    },
    /// Remove the build directory
    Clean {
        #[command(flatten)]
        project: Project,
    },
}

impl Args for Project {
    fn augment_args(cmd: clap::Command) -> clap::Command {
        cmd.arg(clap::arg!(-c --config <PATH> "Path to the accordion.toml file"))
    }

    fn augment_args_for_update(cmd: clap::Command) -> clap::Command {
        Self::augment_args(cmd)
    }
}

impl FromArgMatches for Project {
    fn from_arg_matches(matches: &ArgMatches) -> Result<Self, clap::Error> {
        let config_path = matches.get_one::<String>("config").map(Utf8Path::new);
        let project = Self::from_env(config_path).unwrap_or_else(|err| {
            shell().error(format!("{err:#}"));
            process::exit(1);
        });
        Ok(project)
    }

    fn update_from_arg_matches(&mut self, matches: &ArgMatches) -> Result<(), clap::Error> {
        *self = Self::from_arg_matches(matches)?;
        Ok(())
    }
}
