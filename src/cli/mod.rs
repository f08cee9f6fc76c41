pub mod daemon_path;
pub mod inspect;
pub mod output;
pub mod process;
pub mod watch;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use inspect::{process_check_command, process_next_command, CheckCommand};
use process::{kill_previous_servers, restart_server};
use tracing::level_filters::LevelFilter;
use watch::process_watch_command;

use crate::{
    daemon::start_daemon,
    reminder::{sound::SoundKind, ReminderArgs},
    utils::{
        dir::resolve_paths,
        logging::{enable_logging, CLI_PREFIX},
    },
};

use self::daemon_path::to_daemon_path;

#[derive(Parser, Debug)]
#[command(name = "Taskbell", version, long_about = None)]
#[command(about = "Reminders for your task list", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default uses $XDG_STATE_HOME/taskbell or $HOME/.local/state/taskbell"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Starts a daemon raising reminders in the background")]
    Init {
        #[arg(
            last = true,
            help = "Arguments passed to the daemon, for example -- --rearm on-change"
        )]
        daemon_args: Vec<String>,
    },
    #[command(about = "Watch reminders in this terminal and acknowledge them")]
    Watch {
        #[arg(long, help = "JSON file with tasks. Defaults to tasks.json in the application directory")]
        tasks: Option<PathBuf>,
        #[command(flatten)]
        reminder: ReminderArgs,
    },
    #[command(about = "Show which reminders are due at a given moment")]
    Check {
        #[command(flatten)]
        command: CheckCommand,
    },
    #[command(about = "Show the next upcoming reminder")]
    Next {
        #[arg(long, help = "JSON file with tasks. Defaults to tasks.json in the application directory")]
        tasks: Option<PathBuf>,
    },
    #[command(
        about = "Run a daemon directly in current console. Used for debugging"
    )]
    Serve {
        #[arg(long, help = "JSON file with tasks. Defaults to tasks.json in the application directory")]
        tasks: Option<PathBuf>,
        #[command(flatten)]
        reminder: ReminderArgs,
    },
    #[command(about = "Stop currently running daemon.")]
    Stop {},
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };

    let tasks = match &args.commands {
        Commands::Watch { tasks, .. } | Commands::Next { tasks } | Commands::Serve { tasks, .. } => {
            tasks.clone()
        }
        Commands::Check { command } => command.tasks.clone(),
        Commands::Init { .. } | Commands::Stop {} => None,
    };
    let (dir, tasks) = resolve_paths(args.dir, tasks)?;
    enable_logging(CLI_PREFIX, &dir, logging_level, args.log)?;

    match args.commands {
        Commands::Init { daemon_args } => {
            restart_server(&dir, &daemon_args)?;
            Ok(())
        }
        Commands::Stop {} => {
            kill_previous_servers(&to_daemon_path(std::env::current_exe()?))?;
            Ok(())
        }
        Commands::Serve { reminder, .. } => {
            start_daemon(tasks, reminder.into_config(SoundKind::System)).await
        }
        Commands::Watch { reminder, .. } => {
            process_watch_command(tasks, reminder.into_config(SoundKind::Bell)).await
        }
        Commands::Check { command } => process_check_command(tasks, command).await,
        Commands::Next { .. } => process_next_command(tasks).await,
    }
}
