//! # dockerlint-lsp
//!
//! Language Server Protocol bridge that runs a linter inside a docker
//! container and reports what it finds as editor diagnostics.
//!
//! ## Features
//!
//! - Lints on open, change and save by piping the document to
//!   `docker exec -i <container> <command>`
//! - Built-in profiles for perl, perlcritic, flake8, rubocop and php, all
//!   overridable from the `dockerLinter` settings section
//! - Docker daemon failures are shown as messages instead of diagnostics
//!
//! ## Usage
//!
//! ```bash
//! dockerlint-lsp
//! ```
//!
//! The server communicates over stdin/stdout using the LSP protocol. Logs go
//! to stderr, filtered by the `DOCKERLINT_LOG` environment variable.

mod backend;
mod diagnostic_mapper;
mod error_tracker;
mod settings;

pub use backend::Backend;
pub use diagnostic_mapper::{to_lsp_diagnostic, to_lsp_diagnostics};
pub use error_tracker::ErrorTracker;
pub use settings::{ActiveConfig, SettingsPayload};

use tower_lsp::{LspService, Server};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "DOCKERLINT_LOG";

/// Install the stderr log subscriber. Stdout carries the protocol, so
/// nothing may be logged there.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

/// Start the LSP server.
///
/// This function sets up stdin/stdout communication and runs the server
/// until shutdown is requested.
///
/// # Errors
///
/// Returns an error if the server fails to start or encounters a fatal error.
pub async fn start_server() -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(Backend::new);
    Server::new(stdin, stdout, socket).serve(service).await;
    Ok(())
}
