use super::*;
use dockerlint_core::RuntimeError;
use tower_lsp::jsonrpc::{Error as RpcError, ErrorCode};

/// Build the `initialize` failure for an environment problem. The `retry`
/// flag in `data` tells the client whether retrying may succeed.
pub(super) fn initialize_error(error: &RuntimeError) -> RpcError {
    RpcError {
        code: ErrorCode::InternalError,
        message: format!("Failed to initialize dockerlint: {error}").into(),
        data: Some(serde_json::json!({ "retry": error.is_retryable() })),
    }
}

impl<R: ContainerRuntime> Backend<R> {
    /// Get cached document content for a URI.
    pub(super) async fn get_document_content(&self, uri: &Url) -> Option<Arc<String>> {
        self.documents.read().await.get(uri).cloned()
    }

    /// Only publish if the document still holds the text that was linted and
    /// the settings have not been replaced in the meantime.
    pub(super) async fn should_publish_diagnostics(
        &self,
        uri: &Url,
        expected_version: u64,
        expected_content: &Arc<String>,
    ) -> bool {
        if self.config_version.load(Ordering::SeqCst) != expected_version {
            return false;
        }

        let docs = self.documents.read().await;
        match docs.get(uri) {
            Some(current) => Arc::ptr_eq(current, expected_content),
            None => false,
        }
    }
}
