//! # dockerlint-core
//!
//! Turns the raw output of a linter running inside a docker container into
//! structured diagnostics.
//!
//! - [`ExtractionConfig`]: a pattern plus the capture group holding each
//!   diagnostic field, validated once by [`ExtractionConfig::compile`]
//! - [`Extractor`]: applies a compiled config to linter output
//! - [`Settings`]: the built-in linter profiles and which one is active
//! - [`run_linter`]: pipes a document through `docker exec` and collects
//!   the diagnostics from both output streams

pub mod collect;
pub mod config;
pub mod diagnostics;
pub mod docker;
pub mod extract;
pub mod profile;

pub use collect::{
    LineBuffer, OutputChunk, RunCollector, RunOutcome, Stream, detect_daemon_error,
    exit_status_diagnostic,
};
pub use config::{ConfigError, ExtractionConfig};
pub use diagnostics::{Diagnostic, Severity, WHOLE_LINE_END};
pub use docker::{ContainerRuntime, DockerRuntime, EnvironmentOptions, RuntimeError, run_linter};
pub use extract::{Extractor, extract};
pub use profile::{
    CommandSpec, ProfileDefaults, ProfileEntry, ProfileName, ProfileSettings, ResolvedProfile,
    Settings,
};
