//! # simrepeat-core
//!
//! Core library for running a simulation platform's test runner a fixed
//! number of times.
//!
//! The test runner (`behave`) is launched through the Python interpreter
//! bundled with the simulation platform (NVIDIA Isaac Sim). This crate does not
//! interpret what the runner does; it launches it, waits for it, and records
//! how each invocation ended.
//!
//! ## Modules
//!
//! - [`platform`] - Layout of the platform installation and command construction
//! - [`config`] - Persistent user configuration in `~/.simrepeat/config.json`
//! - [`runner`] - The repetition loop and the [`runner::Launcher`] seam
//! - [`report`] - Serializable per-iteration run report
//!
//! ## Example
//!
//! ```no_run
//! use std::ffi::OsString;
//! use simrepeat_core::config::SimrepeatConfig;
//! use simrepeat_core::platform::PlatformInstall;
//! use simrepeat_core::runner::{ProcessLauncher, RepeatRunner};
//!
//! let config = SimrepeatConfig::load();
//! let platform = PlatformInstall::from_config(&config, None);
//! let args = vec![OsString::from("sim.cfg.json"), OsString::from("model.json")];
//!
//! let mut runner = RepeatRunner::new(ProcessLauncher::new(platform), args);
//! let report = runner.run(3, &mut std::io::stdout()).unwrap();
//! println!("last exit code: {}", report.exit_code());
//! ```

pub mod config;
pub mod platform;
pub mod report;
pub mod runner;
