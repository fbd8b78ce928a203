//! Layout of the simulation platform installation.
//!
//! The platform ships its own Python interpreter wrapper (`python.sh`) at the
//! root of the install directory. The test runner is started as a module of
//! that interpreter:
//!
//! ```text
//! <root>/python.sh -m behave [runner_args...] [forwarded args...]
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::ffi::OsString;
//! use simrepeat_core::platform::PlatformInstall;
//!
//! let platform = PlatformInstall::new("/opt/isaac-sim");
//! let status = platform
//!     .command(&[OsString::from("sim.cfg.json")])
//!     .status()
//!     .unwrap();
//! println!("runner exited with {status}");
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::SimrepeatConfig;

/// Install location relative to the home directory.
pub const DEFAULT_PLATFORM_SUBDIR: &str = ".local/share/ov/pkg/isaac_sim-2023.1.1";

/// Interpreter wrapper at the install root.
pub const DEFAULT_INTERPRETER: &str = "python.sh";

/// Python module run by the interpreter.
pub const DEFAULT_RUNNER_MODULE: &str = "behave";

/// A simulation platform installation and the runner it launches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformInstall {
    root: PathBuf,
    interpreter: String,
    runner_module: String,
    runner_args: Vec<String>,
}

impl PlatformInstall {
    /// Creates an installation rooted at `root` with the default interpreter
    /// and runner module.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            interpreter: DEFAULT_INTERPRETER.to_string(),
            runner_module: DEFAULT_RUNNER_MODULE.to_string(),
            runner_args: Vec::new(),
        }
    }

    /// The built-in install location, `~/.local/share/ov/pkg/isaac_sim-2023.1.1`.
    ///
    /// Falls back to a path relative to the working directory when the home
    /// directory cannot be determined.
    pub fn default_root() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_PLATFORM_SUBDIR)
    }

    /// Resolves the installation from the config file and an optional root
    /// override (command line or environment).
    ///
    /// The override wins over `config.platform_dir`, which wins over
    /// [`Self::default_root`].
    pub fn from_config(config: &SimrepeatConfig, root_override: Option<PathBuf>) -> Self {
        let root = root_override
            .or_else(|| config.platform_dir.clone())
            .unwrap_or_else(Self::default_root);

        let mut platform = Self::new(root);
        if let Some(interpreter) = &config.interpreter {
            platform.interpreter = interpreter.clone();
        }
        if let Some(module) = &config.runner_module {
            platform.runner_module = module.clone();
        }
        platform.runner_args = config.runner_args.clone();
        platform
    }

    /// Replaces the interpreter. An absolute path is used as-is.
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    /// Replaces the runner module passed to `-m`.
    pub fn with_runner_module(mut self, module: impl Into<String>) -> Self {
        self.runner_module = module.into();
        self
    }

    /// Sets fixed arguments placed between the module name and the forwarded
    /// arguments.
    pub fn with_runner_args(mut self, args: Vec<String>) -> Self {
        self.runner_args = args;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of the interpreter executable.
    pub fn interpreter_path(&self) -> PathBuf {
        self.root.join(&self.interpreter)
    }

    /// Whether the interpreter exists as a regular file.
    pub fn is_installed(&self) -> bool {
        self.interpreter_path().is_file()
    }

    /// Arguments that precede the forwarded ones on every invocation.
    pub fn base_args(&self) -> Vec<OsString> {
        let mut args = vec![
            OsString::from("-m"),
            OsString::from(&self.runner_module),
        ];
        args.extend(self.runner_args.iter().map(OsString::from));
        args
    }

    /// Builds the runner command with `forwarded` appended verbatim.
    ///
    /// Stdio, environment and working directory are inherited.
    pub fn command(&self, forwarded: &[OsString]) -> Command {
        let mut command = Command::new(self.interpreter_path());
        command.args(self.base_args()).args(forwarded);
        command
    }

    /// The command line as display strings, program first.
    pub fn command_line(&self, forwarded: &[OsString]) -> Vec<String> {
        std::iter::once(self.interpreter_path().into_os_string())
            .chain(self.base_args())
            .chain(forwarded.iter().cloned())
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<OsString> {
        values.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_interpreter_path_joins_root() {
        let platform = PlatformInstall::new("/opt/isaac-sim");
        assert_eq!(
            platform.interpreter_path(),
            PathBuf::from("/opt/isaac-sim/python.sh")
        );
    }

    #[test]
    fn test_absolute_interpreter_ignores_root() {
        let platform = PlatformInstall::new("/opt/isaac-sim")
            .with_interpreter("/usr/bin/python3");
        assert_eq!(platform.interpreter_path(), PathBuf::from("/usr/bin/python3"));
    }

    #[test]
    fn test_command_layout() {
        let platform = PlatformInstall::new("/opt/isaac-sim");
        let command = platform.command(&args(&["sim.cfg.json", "model.json"]));

        assert_eq!(command.get_program(), "/opt/isaac-sim/python.sh");
        let got: Vec<_> = command.get_args().collect();
        assert_eq!(got, ["-m", "behave", "sim.cfg.json", "model.json"]);
    }

    #[test]
    fn test_command_without_forwarded_args() {
        let platform = PlatformInstall::new("/opt/isaac-sim");
        let command = platform.command(&[]);
        let got: Vec<_> = command.get_args().collect();
        assert_eq!(got, ["-m", "behave"]);
    }

    #[test]
    fn test_runner_args_precede_forwarded() {
        let platform = PlatformInstall::new("/opt/isaac-sim")
            .with_runner_module("pytest")
            .with_runner_args(vec!["--no-capture".to_string()]);
        let line = platform.command_line(&args(&["cfg"]));

        assert_eq!(
            line,
            [
                "/opt/isaac-sim/python.sh",
                "-m",
                "pytest",
                "--no-capture",
                "cfg"
            ]
        );
    }

    #[test]
    fn test_from_config_override_wins() {
        let config = SimrepeatConfig {
            platform_dir: Some(PathBuf::from("/from/config")),
            ..Default::default()
        };
        let platform = PlatformInstall::from_config(&config, Some(PathBuf::from("/from/flag")));
        assert_eq!(platform.root(), Path::new("/from/flag"));
    }

    #[test]
    fn test_from_config_uses_config_fields() {
        let config = SimrepeatConfig {
            platform_dir: Some(PathBuf::from("/from/config")),
            interpreter: Some("python".to_string()),
            runner_module: Some("behave_runner".to_string()),
            runner_args: vec!["-q".to_string()],
        };
        let platform = PlatformInstall::from_config(&config, None);

        assert_eq!(platform.root(), Path::new("/from/config"));
        assert_eq!(
            platform.interpreter_path(),
            PathBuf::from("/from/config/python")
        );
        assert_eq!(platform.base_args(), args(&["-m", "behave_runner", "-q"]));
    }

    #[test]
    fn test_from_empty_config_uses_default_root() {
        let platform = PlatformInstall::from_config(&SimrepeatConfig::default(), None);
        assert_eq!(platform.root(), PlatformInstall::default_root());
        assert!(platform.root().ends_with(DEFAULT_PLATFORM_SUBDIR));
    }

    #[test]
    fn test_missing_install_is_not_installed() {
        let platform = PlatformInstall::new("/nonexistent/simrepeat/platform");
        assert!(!platform.is_installed());
    }
}
