use std::{env, io, path::PathBuf};

use anyhow::{Context, Result};

pub const DEFAULT_TASKS_FILE: &str = "tasks.json";

pub fn create_application_default_path() -> Result<PathBuf> {
    let path = {
        #[cfg(windows)]
        {
            let mut path =
                PathBuf::from(env::var("APPDATA").context("APPDATA should be present on Windows")?);
            path.push("taskbell");
            path
        }
        #[cfg(not(windows))]
        {
            let mut path = env::var("XDG_STATE_HOME")
                .map(PathBuf::from)
                .or_else(|_| {
                    env::var("HOME").map(|home| {
                        let mut path = PathBuf::from(home);
                        path.push(".local/state");
                        path
                    })
                })
                .context("Couldn't find neither XDG_STATE_HOME nor HOME")?;
            path.push("taskbell");
            path
        }
    };

    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}

/// Resolves the application directory and the task snapshot inside it, unless overridden. Paths
/// are absolute because the daemon changes its working directory.
pub fn resolve_paths(dir: Option<PathBuf>, tasks: Option<PathBuf>) -> Result<(PathBuf, PathBuf)> {
    let dir = match dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            dir
        }
        None => create_application_default_path()?,
    };
    let tasks = tasks.unwrap_or_else(|| dir.join(DEFAULT_TASKS_FILE));
    Ok((std::path::absolute(dir)?, std::path::absolute(tasks)?))
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use super::{resolve_paths, DEFAULT_TASKS_FILE};

    #[test]
    fn test_tasks_default_to_application_dir() -> Result<()> {
        let dir = tempdir()?;
        let app_dir = dir.path().join("taskbell");

        let (resolved, tasks) = resolve_paths(Some(app_dir.clone()), None)?;
        assert!(resolved.is_dir());
        assert_eq!(tasks, app_dir.join(DEFAULT_TASKS_FILE));

        let custom = dir.path().join("export.json");
        let (_, tasks) = resolve_paths(Some(app_dir), Some(custom.clone()))?;
        assert_eq!(tasks, custom);
        Ok(())
    }
}
