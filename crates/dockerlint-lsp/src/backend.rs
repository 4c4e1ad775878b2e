//! LSP backend implementation for dockerlint.
//!
//! Implements the Language Server Protocol using tower-lsp. Every open
//! document is piped through the active linter profile inside its docker
//! container whenever it is opened, changed or saved.

mod events;
mod helpers;
mod revalidation;
mod validation;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dockerlint_core::{ContainerRuntime, DockerRuntime, EnvironmentOptions};
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};
use tracing::debug;

use crate::diagnostic_mapper::to_lsp_diagnostics;
use crate::settings::ActiveConfig;

/// LSP backend that handles validation requests.
///
/// Holds the client connection, the text of every open document, and the
/// current configuration snapshot. Cloning is cheap; clones share state.
pub struct Backend<R = DockerRuntime> {
    client: Client,
    runtime: Arc<R>,
    documents: Arc<RwLock<HashMap<Url, Arc<String>>>>,
    config: Arc<RwLock<Arc<ActiveConfig>>>,
    config_version: Arc<AtomicU64>,
}

impl<R> Clone for Backend<R> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            runtime: Arc::clone(&self.runtime),
            documents: Arc::clone(&self.documents),
            config: Arc::clone(&self.config),
            config_version: Arc::clone(&self.config_version),
        }
    }
}

impl Backend<DockerRuntime> {
    /// Create a new backend that runs linters through the docker CLI.
    pub fn new(client: Client) -> Self {
        Self::with_runtime(client, DockerRuntime::new())
    }
}

impl<R: ContainerRuntime> Backend<R> {
    /// Create a backend on top of a specific container runtime.
    pub fn with_runtime(client: Client, runtime: R) -> Self {
        Self {
            client,
            runtime: Arc::new(runtime),
            documents: Arc::new(RwLock::new(HashMap::new())),
            config: Arc::new(RwLock::new(Arc::new(ActiveConfig::default()))),
            config_version: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Current configuration snapshot.
    pub async fn active_config(&self) -> Arc<ActiveConfig> {
        Arc::clone(&*self.config.read().await)
    }
}

#[tower_lsp::async_trait]
impl<R: ContainerRuntime> LanguageServer for Backend<R> {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let options: EnvironmentOptions = match params.initialization_options {
            Some(value) if !value.is_null() => serde_json::from_value(value).map_err(|e| {
                tower_lsp::jsonrpc::Error::invalid_params(format!(
                    "Invalid initialization options: {e}"
                ))
            })?,
            _ => EnvironmentOptions::default(),
        };

        if let Err(e) = self.runtime.prepare(&options).await {
            return Err(helpers::initialize_error(&e));
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::FULL),
                        save: Some(TextDocumentSyncSaveOptions::Supported(true)),
                        ..Default::default()
                    },
                )),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "dockerlint-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "dockerlint-lsp initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        self.handle_did_open(params).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        self.handle_did_change(params).await;
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        self.handle_did_save(params).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.handle_did_close(params).await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        self.handle_did_change_configuration(params).await;
    }
}
