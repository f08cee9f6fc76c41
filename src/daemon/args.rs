use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

use crate::reminder::ReminderArgs;


#[derive(Parser)]
pub struct DaemonArgs {
  #[arg(long)]
  pub force: bool,
  #[arg(long)]
  pub dir: Option<PathBuf>,
  /// JSON file with the current tasks. Defaults to tasks.json in the application directory.
  #[arg(long)]
  pub tasks: Option<PathBuf>,
  /// This option is for debugging purposes only.
  #[arg(long = "log-console")]
  pub log_console : bool,
  #[arg(long = "log-filter")]
  pub log: Option<LevelFilter>,
  #[command(flatten)]
  pub reminder: ReminderArgs,
}
