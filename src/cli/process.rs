use std::{env, path::Path, process::Stdio};

use anyhow::{anyhow, bail, Result};
use sysinfo::{get_current_pid, Signal, System};
use tracing::info;

use super::daemon_path::to_daemon_path;


pub fn kill_previous_servers(name: &Path) -> Result<()> {
    let system = System::new_all();
    let current_id = get_current_pid().map_err(|e| anyhow!("Can't get current pid {e}"))?;
    for (pid, process) in system.processes().iter() {
        if *pid == current_id {
            continue;
        }
        if matches!(process.parent(), Some(p) if p == current_id) {
            continue;
        }

        if process
            .exe()
            .filter(|v| v.exists())
            .filter(|v| name == *v)
            .is_some()
        {
            info!("Stopping daemon {pid}");
            // SIGTERM lets the daemon stop its alerts. This will forcefully terminate the process
            // on Windows.
            if process.kill_with(Signal::Term).is_none() {
                process.kill();
            }
            process.wait();
        }
    }
    Ok(())
}

/// Shuts down previous daemons and starts a new one. The daemon binary detaches by itself, so this
/// only waits for its launcher to return.
pub fn restart_server(dir: &Path, daemon_args: &[String]) -> Result<()> {
    let process_name = to_daemon_path(env::current_exe()?);
    kill_previous_servers(&process_name)?;
    let mut command = std::process::Command::new(&process_name);
    command.arg("--dir").arg(dir);
    command.args(daemon_args);
    command.stdin(Stdio::null());

    println!("Spawning");
    let status = command.status()?;
    if !status.success() {
        bail!("Daemon {process_name:?} failed to start: {status}");
    }
    println!("Success");
    Ok(())
}
