use super::*;
use crate::error_tracker::ErrorTracker;
use crate::settings::SettingsPayload;
use std::future::Future;

pub(super) const MAX_CONFIG_REVALIDATION_CONCURRENCY: usize = 4;

pub(super) fn config_revalidation_concurrency(document_count: usize) -> usize {
    if document_count == 0 {
        return 0;
    }

    let available = std::thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(4);

    document_count.min(available.clamp(1, MAX_CONFIG_REVALIDATION_CONCURRENCY))
}

/// Execute `operation` on each item with bounded concurrency.
///
/// Spawns up to `max_concurrency` tasks at once (minimum 1). As each task
/// completes, the next item is dispatched, maintaining the concurrency cap.
///
/// Partial failures are collected, not propagated: if a spawned task panics
/// or is cancelled, its `JoinError` is appended to the returned `Vec` and
/// processing continues with the remaining items.
pub(super) async fn for_each_bounded<T, I, F, Fut>(
    items: I,
    max_concurrency: usize,
    operation: F,
) -> Vec<tokio::task::JoinError>
where
    T: Send + 'static,
    I: IntoIterator<Item = T>,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut join_set = tokio::task::JoinSet::new();
    let mut join_errors = Vec::new();
    let mut items = items.into_iter();
    let max_concurrency = max_concurrency.max(1);
    let operation = Arc::new(operation);

    for _ in 0..max_concurrency {
        let Some(item) = items.next() else {
            break;
        };

        let operation = Arc::clone(&operation);
        join_set.spawn(async move {
            operation(item).await;
        });
    }

    while let Some(result) = join_set.join_next().await {
        if let Err(error) = result {
            join_errors.push(error);
        }

        if let Some(item) = items.next() {
            let operation = Arc::clone(&operation);
            join_set.spawn(async move {
                operation(item).await;
            });
        }
    }

    join_errors
}

impl<R: ContainerRuntime> Backend<R> {
    /// Replace the configuration snapshot from new editor settings.
    ///
    /// Invalid settings are reported and leave the previous snapshot in
    /// place. Returns the new version when the settings were applied.
    pub(super) async fn apply_settings(&self, settings: serde_json::Value) -> Option<u64> {
        let payload = match SettingsPayload::from_value(settings) {
            Ok(payload) => payload,
            Err(e) => {
                self.client
                    .show_message(
                        MessageType::ERROR,
                        format!("Failed to parse dockerLinter settings: {e}"),
                    )
                    .await;
                return None;
            }
        };

        let profile = match ActiveConfig::resolve(&payload.docker_linter) {
            Ok(profile) => profile,
            Err(e) => {
                self.client
                    .show_message(
                        MessageType::ERROR,
                        format!("Invalid dockerLinter settings: {e}"),
                    )
                    .await;
                return None;
            }
        };

        let message = match &profile {
            Some(p) => format!("Using {} in container {}", p.name, p.container),
            None => "No linter profile configured".to_string(),
        };

        // Bump first so in-flight runs under the old snapshot stop publishing
        let version = self.config_version.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut config_guard = self.config.write().await;
            *config_guard = Arc::new(ActiveConfig::new(version, profile));
        }

        self.client.log_message(MessageType::INFO, message).await;
        Some(version)
    }

    pub(super) async fn handle_did_change_configuration(
        &self,
        params: DidChangeConfigurationParams,
    ) {
        let Some(version) = self.apply_settings(params.settings).await else {
            return;
        };

        // Re-validate all open documents with new config
        let documents: Vec<Url> = {
            let docs = self.documents.read().await;
            docs.keys().cloned().collect()
        };

        if documents.is_empty() {
            return;
        }

        let tracker = Arc::new(tokio::sync::Mutex::new(ErrorTracker::new()));
        let max_concurrency = config_revalidation_concurrency(documents.len());
        let backend = self.clone();
        let batch_tracker = Arc::clone(&tracker);
        let join_errors = for_each_bounded(documents, max_concurrency, move |uri| {
            let backend = backend.clone();
            let tracker = Arc::clone(&batch_tracker);
            async move {
                if let Err(message) = backend.validate_and_publish(uri, Some(version)).await {
                    tracker.lock().await.add(message);
                }
            }
        })
        .await;

        for error in join_errors {
            self.client
                .log_message(
                    MessageType::ERROR,
                    format!("Revalidation task failed after config change: {}", error),
                )
                .await;
        }

        let messages = tracker.lock().await.messages().to_vec();
        for message in messages {
            self.client.show_message(MessageType::ERROR, message).await;
        }
    }
}
