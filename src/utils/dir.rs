use std::{env, io, path::PathBuf};

use anyhow::{anyhow, Result};

/// Home directory of the current user.
pub fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Directory where application state such as logs is stored.
pub fn create_application_default_path() -> Result<PathBuf> {
    let path = {
        #[cfg(windows)]
        {
            let mut path = env::var_os("APPDATA")
                .map(PathBuf::from)
                .ok_or_else(|| anyhow!("APPDATA should be present on Windows"))?;
            path.push("clk");
            path
        }
        #[cfg(not(windows))]
        {
            let mut path = env::var_os("XDG_STATE_HOME")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .or_else(|| home_dir().map(|home| home.join(".local/state")))
                .ok_or_else(|| anyhow!("Couldn't find neither XDG_STATE_HOME nor HOME"))?;
            path.push("clk");
            path
        }
    };

    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}
