use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Pid file and socket locations for the daemon process
#[derive(Debug, Clone)]
pub struct DaemonControl {
    pid_file: PathBuf,
    sock_path: PathBuf,
}

impl DaemonControl {
    /// Create a daemon control rooted at `data_dir`
    #[must_use]
    pub fn new(data_dir: &Path) -> Self {
        Self {
            pid_file: data_dir.join("wavewake.pid"),
            sock_path: data_dir.join("wavewake.sock"),
        }
    }

    #[must_use]
    pub fn pid_path(&self) -> &Path {
        &self.pid_file
    }

    #[must_use]
    pub fn sock_path(&self) -> &Path {
        &self.sock_path
    }

    /// Get PID of running daemon
    ///
    /// # Errors
    ///
    /// Returns an error if the pid file exists but cannot be read or parsed
    pub fn get_pid(&self) -> Result<Option<u32>> {
        if !self.pid_file.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.pid_file)?;
        let pid = contents
            .trim()
            .parse::<u32>()
            .with_context(|| format!("Malformed pid file {}", self.pid_file.display()))?;
        Ok(Some(pid))
    }

    /// Record the daemon's PID, creating the data directory if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the pid file cannot be written
    pub fn write_pid(&self, pid: u32) -> Result<()> {
        if let Some(parent) = self.pid_file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.pid_file, pid.to_string())?;
        Ok(())
    }

    /// Remove PID file
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists and cannot be removed
    pub fn remove_pid(&self) -> Result<()> {
        if self.pid_file.exists() {
            fs::remove_file(&self.pid_file)?;
        }
        Ok(())
    }

    /// Remove a socket left behind by a daemon that died
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists and cannot be removed
    pub fn remove_socket(&self) -> Result<()> {
        if self.sock_path.exists() {
            fs::remove_file(&self.sock_path)?;
        }
        Ok(())
    }
}
