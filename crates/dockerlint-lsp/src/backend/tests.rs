use super::revalidation::{config_revalidation_concurrency, for_each_bounded};
use super::*;
use dockerlint_core::{OutputChunk, ProfileName, ResolvedProfile, RuntimeError};
use serde_json::json;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use futures::{FutureExt, StreamExt};
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tower::{Service, ServiceExt};
use tower_lsp::jsonrpc::Request as RpcRequest;
use tower_lsp::{ClientSocket, LspService};

/// Runtime that replays canned output instead of running docker.
#[derive(Default)]
struct FakeRuntime {
    prepare_error: Option<String>,
    chunks: Vec<OutputChunk>,
    exec_error: bool,
    inputs: Arc<Mutex<Vec<String>>>,
}

impl FakeRuntime {
    fn with_output(output: &str) -> Self {
        Self {
            chunks: vec![OutputChunk::stdout(output)],
            ..Default::default()
        }
    }
}

impl ContainerRuntime for FakeRuntime {
    async fn prepare(&self, _options: &EnvironmentOptions) -> std::result::Result<(), RuntimeError> {
        match &self.prepare_error {
            Some(message) => Err(RuntimeError::Environment {
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn exec(
        &self,
        _profile: &ResolvedProfile,
        input: String,
        sink: mpsc::UnboundedSender<OutputChunk>,
    ) -> std::result::Result<Option<i32>, RuntimeError> {
        self.inputs.lock().unwrap().push(input);
        if self.exec_error {
            return Err(RuntimeError::Io(std::io::Error::other("pipe closed")));
        }
        for chunk in &self.chunks {
            let _ = sink.send(chunk.clone());
        }
        Ok(Some(1))
    }
}

fn flake8_settings() -> serde_json::Value {
    json!({
        "dockerLinter": {
            "flake8": { "container": "py", "reportExitStatus": false }
        }
    })
}

fn test_uri(name: &str) -> Url {
    Url::parse(&format!("file:///project/{name}")).unwrap()
}

fn open_params(uri: &Url, text: &str) -> DidOpenTextDocumentParams {
    DidOpenTextDocumentParams {
        text_document: TextDocumentItem {
            uri: uri.clone(),
            language_id: "python".to_string(),
            version: 1,
            text: text.to_string(),
        },
    }
}

/// Service that went through `initialize`/`initialized`, so notifications
/// sent to the client reach the returned socket.
async fn initialized_service(
    runtime: FakeRuntime,
) -> (LspService<Backend<FakeRuntime>>, ClientSocket) {
    let (mut service, mut socket) =
        LspService::new(|client| Backend::with_runtime(client, runtime));

    let initialize = RpcRequest::build("initialize")
        .params(json!({ "capabilities": {} }))
        .id(1)
        .finish();
    let response = service
        .ready()
        .await
        .unwrap()
        .call(initialize)
        .await
        .unwrap();
    assert!(response.is_some_and(|r| r.is_ok()));

    let initialized = RpcRequest::build("initialized").params(json!({})).finish();
    exchange(&mut socket, async {
        service
            .ready()
            .await
            .unwrap()
            .call(initialized)
            .await
            .unwrap();
    })
    .await;

    (service, socket)
}

/// Messages already queued for the client.
fn drain(socket: &mut ClientSocket) -> Vec<RpcRequest> {
    let mut sent = Vec::new();
    while let Some(Some(request)) = socket.next().now_or_never() {
        sent.push(request);
    }
    sent
}

/// Run `action` while reading the client socket, returning everything the
/// server sent meanwhile. The client channel holds a single message, so the
/// socket has to be read while the server is still sending.
async fn exchange<F: Future>(socket: &mut ClientSocket, action: F) -> Vec<RpcRequest> {
    let mut sent = Vec::new();
    tokio::pin!(action);
    loop {
        tokio::select! {
            _ = &mut action => break,
            Some(request) = socket.next() => sent.push(request),
        }
    }
    sent.extend(drain(socket));
    sent
}

fn params_of<T: DeserializeOwned>(sent: &[RpcRequest], method: &str) -> Vec<T> {
    sent.iter()
        .filter(|request| request.method() == method)
        .map(|request| serde_json::from_value(request.params().cloned().unwrap()).unwrap())
        .collect()
}

fn published(sent: &[RpcRequest]) -> Vec<PublishDiagnosticsParams> {
    params_of(sent, "textDocument/publishDiagnostics")
}

fn shown(sent: &[RpcRequest]) -> Vec<ShowMessageParams> {
    params_of(sent, "window/showMessage")
}

/// Test that initialize() returns correct server capabilities.
#[tokio::test]
async fn test_initialize_returns_correct_capabilities() {
    let (service, _socket) =
        LspService::new(|client| Backend::with_runtime(client, FakeRuntime::default()));

    let result = service.inner().initialize(InitializeParams::default()).await;
    let init_result = result.expect("initialize should succeed");

    match init_result.capabilities.text_document_sync {
        Some(TextDocumentSyncCapability::Options(options)) => {
            assert_eq!(options.change, Some(TextDocumentSyncKind::FULL));
            assert_eq!(options.open_close, Some(true));
            assert_eq!(
                options.save,
                Some(TextDocumentSyncSaveOptions::Supported(true))
            );
        }
        _ => panic!("Expected text document sync options"),
    }

    let server_info = init_result
        .server_info
        .expect("server_info should be present");
    assert_eq!(server_info.name, "dockerlint-lsp");
    assert!(server_info.version.is_some());
}

#[tokio::test]
async fn test_initialize_environment_failure_has_retry_hint() {
    let runtime = FakeRuntime {
        prepare_error: Some("Cannot connect to the Docker daemon".to_string()),
        ..Default::default()
    };
    let (service, _socket) = LspService::new(|client| Backend::with_runtime(client, runtime));

    let err = service
        .inner()
        .initialize(InitializeParams::default())
        .await
        .expect_err("initialize should fail");

    assert!(err.message.contains("Cannot connect to the Docker daemon"));
    assert_eq!(err.data, Some(json!({ "retry": true })));
}

#[tokio::test]
async fn test_initialize_rejects_malformed_options() {
    let (service, _socket) =
        LspService::new(|client| Backend::with_runtime(client, FakeRuntime::default()));

    let params = InitializeParams {
        initialization_options: Some(json!({ "machine": 12 })),
        ..Default::default()
    };
    let err = service.inner().initialize(params).await.unwrap_err();
    assert_eq!(err.code, tower_lsp::jsonrpc::ErrorCode::InvalidParams);
}

#[tokio::test]
async fn test_shutdown_returns_ok() {
    let (service, _socket) =
        LspService::new(|client| Backend::with_runtime(client, FakeRuntime::default()));

    let result = service.inner().shutdown().await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_apply_settings_activates_profile() {
    let (service, _socket) =
        LspService::new(|client| Backend::with_runtime(client, FakeRuntime::default()));
    let backend = service.inner();

    assert_eq!(backend.apply_settings(flake8_settings()).await, Some(1));

    let config = backend.active_config().await;
    assert_eq!(config.version, 1);
    let profile = config.profile.as_ref().expect("profile should be active");
    assert_eq!(profile.name, ProfileName::Flake8);
    assert_eq!(profile.container, "py");
}

#[tokio::test]
async fn test_ambiguous_settings_keep_previous_config() {
    let (service, mut socket) =
        LspService::new(|client| Backend::with_runtime(client, FakeRuntime::default()));
    let backend = service.inner();

    backend.apply_settings(flake8_settings()).await;
    drain(&mut socket);
    let applied = backend
        .apply_settings(json!({
            "dockerLinter": {
                "perl": { "container": "pl" },
                "php": { "container": "web" }
            }
        }))
        .await;

    assert_eq!(applied, None);
    let config = backend.active_config().await;
    assert_eq!(config.version, 1);
    assert_eq!(config.profile.as_ref().unwrap().name, ProfileName::Flake8);
}

#[tokio::test]
async fn test_active_profile_resolves_ambiguity() {
    let (service, _socket) =
        LspService::new(|client| Backend::with_runtime(client, FakeRuntime::default()));
    let backend = service.inner();

    let applied = backend
        .apply_settings(json!({
            "dockerLinter": {
                "activeProfile": "php",
                "perl": { "container": "pl" },
                "php": { "container": "web" }
            }
        }))
        .await;

    assert_eq!(applied, Some(1));
    let config = backend.active_config().await;
    assert_eq!(config.profile.as_ref().unwrap().name, ProfileName::Php);
}

#[tokio::test]
async fn test_unparseable_settings_are_rejected() {
    let (service, _socket) =
        LspService::new(|client| Backend::with_runtime(client, FakeRuntime::default()));
    let backend = service.inner();

    let applied = backend
        .apply_settings(json!({ "dockerLinter": { "flake8": "yes" } }))
        .await;
    assert_eq!(applied, None);
    assert_eq!(backend.active_config().await.version, 0);
}

#[tokio::test]
async fn test_did_open_pipes_document_to_linter() {
    let runtime = FakeRuntime::with_output("stdin:1:1: F401 'os' imported but unused\n");
    let inputs = Arc::clone(&runtime.inputs);
    let (service, _socket) = LspService::new(|client| Backend::with_runtime(client, runtime));
    let backend = service.inner();
    backend.apply_settings(flake8_settings()).await;

    let uri = test_uri("app.py");
    backend.did_open(open_params(&uri, "import os\n")).await;

    assert_eq!(*inputs.lock().unwrap(), vec!["import os\n".to_string()]);
    assert!(backend.get_document_content(&uri).await.is_some());
}

#[tokio::test]
async fn test_lint_extracts_diagnostics() {
    let runtime = FakeRuntime::with_output(
        "stdin:1:1: F401 'os' imported but unused\nstdin:3:80: E501 line too long (88 > 79 characters)\n",
    );
    let (service, _socket) = LspService::new(|client| Backend::with_runtime(client, runtime));
    let backend = service.inner();
    backend.apply_settings(flake8_settings()).await;

    let config = backend.active_config().await;
    let profile = config.profile.as_ref().unwrap();
    let outcome = backend.lint(profile, "import os\n").await.unwrap();

    assert_eq!(outcome.diagnostics.len(), 2);
    let lsp = crate::diagnostic_mapper::to_lsp_diagnostics(&outcome.diagnostics, "flake8");
    assert_eq!(lsp[1].range.start, Position::new(2, 80));
    assert_eq!(lsp[1].code, Some(NumberOrString::String("E501".to_string())));
}

#[tokio::test]
async fn test_did_change_relints_new_text() {
    let runtime = FakeRuntime::with_output("");
    let inputs = Arc::clone(&runtime.inputs);
    let (service, _socket) = LspService::new(|client| Backend::with_runtime(client, runtime));
    let backend = service.inner();
    backend.apply_settings(flake8_settings()).await;

    let uri = test_uri("app.py");
    backend.did_open(open_params(&uri, "a = 1\n")).await;
    backend
        .did_change(DidChangeTextDocumentParams {
            text_document: VersionedTextDocumentIdentifier {
                uri: uri.clone(),
                version: 2,
            },
            content_changes: vec![TextDocumentContentChangeEvent {
                range: None,
                range_length: None,
                text: "a = 2\n".to_string(),
            }],
        })
        .await;

    assert_eq!(
        *inputs.lock().unwrap(),
        vec!["a = 1\n".to_string(), "a = 2\n".to_string()]
    );
    let content = backend.get_document_content(&uri).await.unwrap();
    assert_eq!(content.as_str(), "a = 2\n");
}

#[tokio::test]
async fn test_did_close_forgets_document() {
    let (service, _socket) =
        LspService::new(|client| Backend::with_runtime(client, FakeRuntime::default()));
    let backend = service.inner();

    let uri = test_uri("app.py");
    backend.did_open(open_params(&uri, "x\n")).await;
    backend
        .did_close(DidCloseTextDocumentParams {
            text_document: TextDocumentIdentifier { uri: uri.clone() },
        })
        .await;

    assert!(backend.get_document_content(&uri).await.is_none());
}

#[tokio::test]
async fn test_no_profile_skips_linting() {
    let runtime = FakeRuntime::default();
    let inputs = Arc::clone(&runtime.inputs);
    let (service, _socket) = LspService::new(|client| Backend::with_runtime(client, runtime));
    let backend = service.inner();

    let uri = test_uri("app.py");
    backend.did_open(open_params(&uri, "x\n")).await;

    assert!(inputs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_daemon_error_is_reported_as_message() {
    let runtime = FakeRuntime {
        chunks: vec![OutputChunk::stderr(
            "Error response from daemon: No such container: py\n",
        )],
        ..Default::default()
    };
    let (service, _socket) = LspService::new(|client| Backend::with_runtime(client, runtime));
    let backend = service.inner();
    backend.apply_settings(flake8_settings()).await;

    let uri = test_uri("app.py");
    backend
        .documents
        .write()
        .await
        .insert(uri.clone(), Arc::new("x\n".to_string()));

    let result = backend.validate_and_publish(uri, None).await;
    assert_eq!(
        result,
        Err("Error response from daemon: No such container: py".to_string())
    );
}

#[tokio::test]
async fn test_exec_failure_is_reported_as_message() {
    let runtime = FakeRuntime {
        exec_error: true,
        ..Default::default()
    };
    let (service, _socket) = LspService::new(|client| Backend::with_runtime(client, runtime));
    let backend = service.inner();
    backend.apply_settings(flake8_settings()).await;

    let uri = test_uri("app.py");
    backend
        .documents
        .write()
        .await
        .insert(uri.clone(), Arc::new("x\n".to_string()));

    let message = backend.validate_and_publish(uri, None).await.unwrap_err();
    assert!(message.starts_with("flake8 failed to run"));
    assert!(message.contains("pipe closed"));
}

#[tokio::test]
async fn test_stale_batch_is_skipped() {
    let runtime = FakeRuntime::default();
    let inputs = Arc::clone(&runtime.inputs);
    let (service, mut socket) = LspService::new(|client| Backend::with_runtime(client, runtime));
    let backend = service.inner();
    backend.apply_settings(flake8_settings()).await;
    drain(&mut socket);
    backend.apply_settings(flake8_settings()).await;

    let uri = test_uri("app.py");
    backend
        .documents
        .write()
        .await
        .insert(uri.clone(), Arc::new("x\n".to_string()));

    // A batch started under version 1 must not run under version 2
    assert_eq!(backend.validate_and_publish(uri, Some(1)).await, Ok(()));
    assert!(inputs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_should_publish_rejects_replaced_content() {
    let (service, _socket) =
        LspService::new(|client| Backend::with_runtime(client, FakeRuntime::default()));
    let backend = service.inner();

    let uri = test_uri("app.py");
    let original = Arc::new("a\n".to_string());
    backend
        .documents
        .write()
        .await
        .insert(uri.clone(), Arc::clone(&original));
    assert!(backend.should_publish_diagnostics(&uri, 0, &original).await);

    backend
        .documents
        .write()
        .await
        .insert(uri.clone(), Arc::new("a\n".to_string()));
    assert!(!backend.should_publish_diagnostics(&uri, 0, &original).await);
    assert!(!backend.should_publish_diagnostics(&uri, 1, &original).await);
}

#[tokio::test]
async fn test_config_change_revalidates_open_documents() {
    let runtime = FakeRuntime::with_output("");
    let inputs = Arc::clone(&runtime.inputs);
    let (service, _socket) = LspService::new(|client| Backend::with_runtime(client, runtime));
    let backend = service.inner();

    for name in ["a.py", "b.py", "c.py"] {
        backend.did_open(open_params(&test_uri(name), name)).await;
    }
    assert!(inputs.lock().unwrap().is_empty());

    backend
        .did_change_configuration(DidChangeConfigurationParams {
            settings: flake8_settings(),
        })
        .await;

    let mut linted = inputs.lock().unwrap().clone();
    linted.sort();
    assert_eq!(linted, vec!["a.py", "b.py", "c.py"]);
}

#[tokio::test]
async fn test_for_each_bounded_runs_every_item() {
    let counter = Arc::new(AtomicUsize::new(0));
    let task_counter = Arc::clone(&counter);
    let errors = for_each_bounded(0..10, 3, move |_| {
        let counter = Arc::clone(&task_counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    })
    .await;

    assert!(errors.is_empty());
    assert_eq!(counter.load(Ordering::SeqCst), 10);
}

#[tokio::test]
async fn test_for_each_bounded_collects_panics() {
    let errors = for_each_bounded(0..4, 2, |item| async move {
        if item == 2 {
            panic!("boom");
        }
    })
    .await;

    assert_eq!(errors.len(), 1);
    assert!(errors[0].is_panic());
}

#[test]
fn test_config_revalidation_concurrency_bounds() {
    assert_eq!(config_revalidation_concurrency(0), 0);
    assert_eq!(config_revalidation_concurrency(1), 1);
    assert!(config_revalidation_concurrency(100) <= super::revalidation::MAX_CONFIG_REVALIDATION_CONCURRENCY);
}

#[tokio::test]
async fn test_lint_results_are_published() {
    let runtime = FakeRuntime::with_output(
        "stdin:1:1: F401 'os' imported but unused\nstdin:3:80: E501 line too long\n",
    );
    let (service, mut socket) = initialized_service(runtime).await;
    let backend = service.inner();
    exchange(&mut socket, backend.apply_settings(flake8_settings())).await;

    let uri = test_uri("app.py");
    let sent = exchange(&mut socket, backend.did_open(open_params(&uri, "import os\n"))).await;

    let publishes = published(&sent);
    assert_eq!(publishes.len(), 1);
    assert_eq!(publishes[0].uri, uri);
    let diagnostics = &publishes[0].diagnostics;
    assert_eq!(diagnostics.len(), 2);
    assert_eq!(diagnostics[0].range.start, Position::new(0, 1));
    assert_eq!(diagnostics[0].message, "'os' imported but unused");
    assert_eq!(diagnostics[0].source.as_deref(), Some("flake8"));
    assert_eq!(
        diagnostics[1].code,
        Some(NumberOrString::String("E501".to_string()))
    );
}

#[tokio::test]
async fn test_did_close_publishes_empty_list() {
    let (service, mut socket) =
        initialized_service(FakeRuntime::with_output("stdin:1:1: F401 unused\n")).await;
    let backend = service.inner();
    exchange(&mut socket, backend.apply_settings(flake8_settings())).await;

    let uri = test_uri("app.py");
    exchange(&mut socket, backend.did_open(open_params(&uri, "import os\n"))).await;

    let close = DidCloseTextDocumentParams {
        text_document: TextDocumentIdentifier { uri: uri.clone() },
    };
    let sent = exchange(&mut socket, backend.did_close(close)).await;

    let publishes = published(&sent);
    assert_eq!(publishes.len(), 1);
    assert_eq!(publishes[0].uri, uri);
    assert!(publishes[0].diagnostics.is_empty());
}

#[tokio::test]
async fn test_removing_profile_clears_diagnostics() {
    let (service, mut socket) =
        initialized_service(FakeRuntime::with_output("stdin:1:1: F401 unused\n")).await;
    let backend = service.inner();
    exchange(&mut socket, backend.apply_settings(flake8_settings())).await;

    let uri = test_uri("app.py");
    let sent = exchange(&mut socket, backend.did_open(open_params(&uri, "import os\n"))).await;
    let before = published(&sent);
    assert_eq!(before.len(), 1);
    assert_eq!(before[0].diagnostics.len(), 1);

    let change = DidChangeConfigurationParams {
        settings: json!({ "dockerLinter": {} }),
    };
    let sent = exchange(&mut socket, backend.did_change_configuration(change)).await;

    assert!(backend.active_config().await.profile.is_none());
    let after = published(&sent);
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].uri, uri);
    assert!(after[0].diagnostics.is_empty());
}

#[tokio::test]
async fn test_daemon_error_shown_instead_of_published() {
    let runtime = FakeRuntime {
        chunks: vec![OutputChunk::stderr(
            "Error response from daemon: No such container: py\n",
        )],
        ..Default::default()
    };
    let (service, mut socket) = initialized_service(runtime).await;
    let backend = service.inner();
    exchange(&mut socket, backend.apply_settings(flake8_settings())).await;

    let uri = test_uri("app.py");
    let sent = exchange(&mut socket, backend.did_open(open_params(&uri, "x\n"))).await;

    assert!(published(&sent).is_empty());
    let messages = shown(&sent);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].typ, MessageType::ERROR);
    assert_eq!(
        messages[0].message,
        "Error response from daemon: No such container: py"
    );
}

#[tokio::test]
async fn test_batch_daemon_errors_are_shown_once() {
    let runtime = FakeRuntime {
        chunks: vec![OutputChunk::stderr(
            "Error response from daemon: No such container: py\n",
        )],
        ..Default::default()
    };
    let inputs = Arc::clone(&runtime.inputs);
    let (service, mut socket) = initialized_service(runtime).await;
    let backend = service.inner();

    for name in ["a.py", "b.py"] {
        exchange(&mut socket, backend.did_open(open_params(&test_uri(name), name))).await;
    }

    let change = DidChangeConfigurationParams {
        settings: flake8_settings(),
    };
    let sent = exchange(&mut socket, backend.did_change_configuration(change)).await;

    assert_eq!(inputs.lock().unwrap().len(), 2);
    assert!(published(&sent).is_empty());
    let messages = shown(&sent);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].message.contains("No such container: py"));
}
