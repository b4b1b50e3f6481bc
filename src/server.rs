use std::io;
use std::path::PathBuf;
use std::process::{Command, ExitCode, ExitStatus, Stdio};
use thiserror::Error;

use crate::model::config::TesterConfig;

/// Interpreter flags passed ahead of `-jar`.
pub const JVM_FLAGS: [&str; 4] = [
    "-Xmx4G",
    "--enable-native-access=ALL-UNNAMED",
    "--add-opens",
    "java.base/java.lang=ALL-UNNAMED",
];

const NO_GUI: &str = "nogui";

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("server directory {} does not exist", .0.display())]
    MissingServerDir(PathBuf),

    #[error("could not start `{program}` in {}: {source}", .dir.display())]
    Spawn {
        program: String,
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("lost track of the server process: {0}")]
    Wait(#[source] io::Error),
}

/// How the server is started: interpreter, working directory and launch jar.
#[derive(Debug, Clone)]
pub struct ServerLaunch {
    pub java: String,
    pub server_dir: PathBuf,
    pub server_jar: String,
}

/// Exit status of a finished server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerExit {
    code: Option<i32>,
}

impl ServerExit {
    pub fn from_status(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }

    /// `None` when the server was terminated by a signal.
    pub fn code(&self) -> Option<i32> {
        self.code
    }

    pub fn exit_code(&self) -> ExitCode {
        match self.code {
            Some(0) => ExitCode::SUCCESS,
            Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(1).max(1)),
            None => ExitCode::FAILURE,
        }
    }
}

impl ServerLaunch {
    pub fn from_config(config: &TesterConfig) -> Self {
        Self {
            java: config.java.clone(),
            server_dir: config.server_dir.clone(),
            server_jar: config.server_jar.clone(),
        }
    }

    /// `java <flags> -jar <server_jar> nogui`, run from the server directory with inherited stdio.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.java);
        cmd.args(JVM_FLAGS)
            .arg("-jar")
            .arg(&self.server_jar)
            .arg(NO_GUI)
            .current_dir(&self.server_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        cmd
    }

    /// Fails when the server directory is missing.
    pub fn check(&self) -> Result<(), LaunchError> {
        if !self.server_dir.is_dir() {
            return Err(LaunchError::MissingServerDir(self.server_dir.clone()));
        }
        Ok(())
    }

    /// Start the server and block until it exits.
    pub fn run(&self) -> Result<ServerExit, LaunchError> {
        self.check()?;

        tracing::info!(
            "starting {} from {}",
            self.server_jar,
            self.server_dir.display()
        );

        let mut child = self.command().spawn().map_err(|source| LaunchError::Spawn {
            program: self.java.clone(),
            dir: self.server_dir.clone(),
            source,
        })?;

        tracing::debug!("server running with pid {}", child.id());

        let status = child.wait().map_err(LaunchError::Wait)?;
        Ok(ServerExit::from_status(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use std::path::Path;
    use tempfile::tempdir;

    fn launch(dir: &Path, java: &str) -> ServerLaunch {
        ServerLaunch {
            java: java.to_string(),
            server_dir: dir.to_path_buf(),
            server_jar: "paper-1.21.jar".to_string(),
        }
    }

    #[test]
    fn command_uses_fixed_arguments() {
        let dir = tempdir().unwrap();
        let cmd = launch(dir.path(), "java").command();

        assert_eq!(cmd.get_program(), OsStr::new("java"));
        let args: Vec<&OsStr> = cmd.get_args().collect();
        assert_eq!(
            args,
            [
                "-Xmx4G",
                "--enable-native-access=ALL-UNNAMED",
                "--add-opens",
                "java.base/java.lang=ALL-UNNAMED",
                "-jar",
                "paper-1.21.jar",
                "nogui",
            ]
            .map(OsStr::new)
        );
        assert_eq!(cmd.get_current_dir(), Some(dir.path()));
    }

    #[test]
    fn missing_interpreter_is_a_spawn_error() {
        let dir = tempdir().unwrap();
        let java = dir.path().join("no-such-java");

        let err = launch(dir.path(), &java.to_string_lossy()).run().unwrap_err();
        assert!(matches!(err, LaunchError::Spawn { .. }));
        assert!(err.to_string().contains("no-such-java"));
    }

    #[test]
    fn missing_server_dir_is_reported() {
        let dir = tempdir().unwrap();
        let err = launch(&dir.path().join("gone"), "java").run().unwrap_err();
        assert!(matches!(err, LaunchError::MissingServerDir(_)));
    }

    #[cfg(unix)]
    #[test]
    fn exit_code_is_reported() {
        let dir = tempdir().unwrap();
        assert_eq!(launch(dir.path(), "true").run().unwrap().code(), Some(0));
        assert_eq!(launch(dir.path(), "false").run().unwrap().code(), Some(1));
    }
}
