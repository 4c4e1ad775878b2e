use super::*;
use dockerlint_core::{ResolvedProfile, RunOutcome, RuntimeError, run_linter};

impl<R: ContainerRuntime> Backend<R> {
    /// Pipe `content` through `profile` inside its container.
    pub(super) async fn lint(
        &self,
        profile: &ResolvedProfile,
        content: &str,
    ) -> std::result::Result<RunOutcome, RuntimeError> {
        run_linter(self.runtime.as_ref(), profile, content.to_string()).await
    }

    /// Lint the cached text of `uri` and publish the diagnostics.
    ///
    /// When `expected_version` is set the run belongs to a settings-change
    /// batch and is skipped if newer settings have arrived since. Returns a
    /// user-facing message when the run could not produce diagnostics,
    /// including docker daemon errors.
    pub(super) async fn validate_and_publish(
        &self,
        uri: Url,
        expected_version: Option<u64>,
    ) -> std::result::Result<(), String> {
        let Some(content) = self.get_document_content(&uri).await else {
            return Ok(());
        };

        let config = self.active_config().await;
        if expected_version.is_some_and(|expected| expected != config.version) {
            return Ok(());
        }
        // No active profile: clear whatever a previous profile published
        let Some(profile) = config.profile.clone() else {
            if self
                .should_publish_diagnostics(&uri, config.version, &content)
                .await
            {
                self.client.publish_diagnostics(uri, vec![], None).await;
            }
            return Ok(());
        };

        debug!(uri = %uri, profile = %profile.name, version = config.version, "validating document");

        let outcome = self
            .lint(&profile, &content)
            .await
            .map_err(|e| format!("{} failed to run: {e}", profile.name))?;

        if !self
            .should_publish_diagnostics(&uri, config.version, &content)
            .await
        {
            debug!(uri = %uri, "discarding stale lint result");
            return Ok(());
        }

        if let Some(daemon_error) = outcome.daemon_error {
            return Err(daemon_error);
        }

        let diagnostics = to_lsp_diagnostics(&outcome.diagnostics, profile.name.as_str());
        self.client.publish_diagnostics(uri, diagnostics, None).await;
        Ok(())
    }

    /// Validate one document, showing any failure to the user.
    pub(super) async fn validate_single(&self, uri: Url) {
        if let Err(message) = self.validate_and_publish(uri, None).await {
            self.client.show_message(MessageType::ERROR, message).await;
        }
    }
}
