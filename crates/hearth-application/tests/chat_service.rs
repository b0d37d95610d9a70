use hearth_application::{ChatService, Services};
use hearth_core::ErrorKind;
use hearth_core::error::{GenerationError, HearthError};
use hearth_core::generation::FinishReason;
use hearth_core::model::{ConfigVariant, ModelAcquisition, ModelState, RuntimeError};
use hearth_core::scripted::ScriptedRuntime;
use hearth_core::session::Role;
use hearth_core::template::PromptTemplate;
use hearth_infrastructure::{HearthPaths, NoFetcher};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct Fixture {
    _temp_dir: TempDir,
    paths: HearthPaths,
    runtime: ScriptedRuntime,
    service: ChatService,
}

/// Service rooted in a temp dir with a valid default model file on disk.
fn fixture(runtime: ScriptedRuntime) -> Fixture {
    let temp_dir = TempDir::new().unwrap();
    let paths = HearthPaths::rooted(temp_dir.path());
    let services = Services::load(paths.clone(), Arc::new(NoFetcher)).unwrap();

    let model_path = services.acquisition.default_model_path();
    std::fs::create_dir_all(model_path.parent().unwrap()).unwrap();
    std::fs::write(&model_path, b"GGUF\x03\x00\x00\x00").unwrap();

    let service = ChatService::new(services, Arc::new(runtime.clone()));
    Fixture {
        _temp_dir: temp_dir,
        paths,
        runtime,
        service,
    }
}

fn write_model(paths: &HearthPaths, name: &str, bytes: &[u8]) -> PathBuf {
    let path = paths.models_dir().join(name);
    std::fs::create_dir_all(paths.models_dir()).unwrap();
    std::fs::write(&path, bytes).unwrap();
    path
}

fn slow_reply(words: usize) -> Vec<String> {
    (0..words).map(|i| format!("w{i} ")).collect()
}

#[tokio::test]
async fn test_stream_delivers_partials_then_one_terminal_event() {
    let fx = fixture(ScriptedRuntime::new().with_reply(["Hello", " world"]));
    let conversation = fx.service.create_conversation().await.unwrap();

    let mut stream = fx
        .service
        .send_message(&conversation.id, "Hi", None)
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Some(event) = stream.recv().await {
        events.push(event);
    }

    let texts: Vec<_> = events.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["Hello", "Hello world", "Hello world"]);
    assert_eq!(events.iter().filter(|e| e.is_complete).count(), 1);
    assert!(events.last().unwrap().is_complete);
    assert_eq!(
        events.last().unwrap().finish,
        Some(FinishReason::EndOfGeneration)
    );
    assert_eq!(fx.service.model_state(), ModelState::Ready);
}

#[tokio::test]
async fn test_each_exchange_adds_two_turns() {
    let fx = fixture(ScriptedRuntime::new().with_default_reply(["Sure."]));
    let conversation = fx.service.create_conversation().await.unwrap();

    for message in ["one", "two", "three"] {
        let stream = fx
            .service
            .send_message(&conversation.id, message, None)
            .await
            .unwrap();
        let terminal = stream.final_event().await.unwrap();
        assert_eq!(terminal.text, "Sure.");
    }

    let loaded = fx.service.load_conversation(&conversation.id).await.unwrap();
    assert_eq!(loaded.turns.len(), 6);
    for (index, turn) in loaded.turns.iter().enumerate() {
        let expected = if index % 2 == 0 { Role::User } else { Role::Assistant };
        assert_eq!(turn.role, expected);
    }
    assert_eq!(loaded.title, "one");
}

#[tokio::test]
async fn test_follow_up_prompt_contains_previous_exchange() {
    let fx = fixture(ScriptedRuntime::new().with_reply(["Paris."]));
    let conversation = fx.service.create_conversation().await.unwrap();

    let first = fx
        .service
        .send_message(&conversation.id, "Capital of France?", None)
        .await
        .unwrap();
    first.final_event().await.unwrap();
    let second = fx
        .service
        .send_message(&conversation.id, "And of Italy?", None)
        .await
        .unwrap();
    second.final_event().await.unwrap();

    let prompts = fx.runtime.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains("Capital of France?"));
    assert!(prompts[1].contains("Paris."));
    assert!(prompts[1].contains("And of Italy?"));
}

#[tokio::test]
async fn test_second_send_while_running_is_busy() {
    let fx = fixture(
        ScriptedRuntime::new()
            .with_default_reply(slow_reply(30))
            .with_token_delay(Duration::from_millis(10)),
    );
    let first = fx.service.create_conversation().await.unwrap();
    let second = fx.service.create_conversation().await.unwrap();

    let running = fx
        .service
        .send_message(&first.id, "long answer please", None)
        .await
        .unwrap();

    let other = fx.service.send_message(&second.id, "hello", None).await;
    let same = fx.service.send_message(&first.id, "again", None).await;

    assert!(matches!(
        other,
        Err(HearthError::Generation(GenerationError::Busy))
    ));
    assert!(same.is_err_and(|e| e.kind() == Some(ErrorKind::GenerationBusy)));

    let terminal = running.final_event().await.unwrap();
    assert_eq!(terminal.finish, Some(FinishReason::EndOfGeneration));
    let untouched = fx.service.load_conversation(&second.id).await.unwrap();
    assert!(untouched.turns.is_empty());
}

#[tokio::test]
async fn test_cancel_still_delivers_terminal_event_and_keeps_partial_text() {
    let fx = fixture(
        ScriptedRuntime::new()
            .with_default_reply(slow_reply(200))
            .with_token_delay(Duration::from_millis(20)),
    );
    let conversation = fx.service.create_conversation().await.unwrap();

    let mut stream = fx
        .service
        .send_message(&conversation.id, "count", None)
        .await
        .unwrap();
    let first = stream.recv().await.unwrap();
    assert!(!first.is_complete);
    assert!(fx.service.is_generating(&conversation.id));

    assert!(fx.service.cancel_generation(&conversation.id));
    let terminal = stream.final_event().await.unwrap();

    assert_eq!(terminal.finish, Some(FinishReason::Cancelled));
    assert!(terminal.text.starts_with("w0"));
    assert!(!terminal.text.contains("w199"));
    assert!(!fx.service.is_generating(&conversation.id));
    assert!(!fx.service.cancel_generation(&conversation.id));

    let loaded = fx.service.load_conversation(&conversation.id).await.unwrap();
    assert_eq!(loaded.turns.len(), 2);
    assert_eq!(loaded.turns[1].text, terminal.text);
}

#[tokio::test]
async fn test_deleting_conversation_mid_run_reports_cancelled() {
    let fx = fixture(
        ScriptedRuntime::new()
            .with_default_reply(slow_reply(200))
            .with_token_delay(Duration::from_millis(20)),
    );
    let conversation = fx.service.create_conversation().await.unwrap();

    let mut stream = fx
        .service
        .send_message(&conversation.id, "count", None)
        .await
        .unwrap();
    let first = stream.recv().await.unwrap();
    assert!(!first.is_complete);

    fx.service.delete_conversation(&conversation.id).await.unwrap();
    let terminal = stream.final_event().await.unwrap();

    assert_eq!(terminal.finish, Some(FinishReason::Cancelled));
    assert!(terminal.text.starts_with("w0"));
    assert!(!fx.service.is_generating(&conversation.id));
    let loaded = fx.service.load_conversation(&conversation.id).await;
    assert!(loaded.is_err_and(|e| e.is_not_found()));
}

#[tokio::test]
async fn test_mid_run_failure_is_terminal_and_not_persisted() {
    let fx = fixture(
        ScriptedRuntime::new()
            .with_reply(["partial", " text", " more"])
            .fail_generation_after(2),
    );
    let conversation = fx.service.create_conversation().await.unwrap();

    let stream = fx
        .service
        .send_message(&conversation.id, "go", None)
        .await
        .unwrap();
    let terminal = stream.final_event().await.unwrap();

    assert!(terminal.finish.as_ref().is_some_and(|f| f.is_failure()));
    assert_eq!(terminal.text, "partial text");
    let loaded = fx.service.load_conversation(&conversation.id).await.unwrap();
    assert!(loaded.turns.is_empty());
    assert_eq!(fx.service.model_state(), ModelState::Ready);
}

#[tokio::test]
async fn test_blank_message_is_rejected_before_loading() {
    let fx = fixture(ScriptedRuntime::new());
    let conversation = fx.service.create_conversation().await.unwrap();

    let result = fx.service.send_message(&conversation.id, "   ", None).await;

    assert!(matches!(result, Err(HearthError::InvalidInput(_))));
    assert!(fx.runtime.load_calls().is_empty());
}

#[tokio::test]
async fn test_invalid_selected_file_never_reaches_the_runtime() {
    let fx = fixture(ScriptedRuntime::new());
    let not_gguf = write_model(&fx.paths, "notes.txt", b"hello");
    let bad_magic = write_model(&fx.paths, "broken.Q4_0.gguf", b"GGML\x00\x00\x00\x00");

    let selected = fx.service.select_model_file(&not_gguf).await;
    assert!(selected.is_err_and(|e| e.kind() == Some(ErrorKind::FileUnreadable)));
    assert_eq!(fx.service.model_state(), ModelState::Unloaded);

    let initialized = fx.service.initialize_model(Some(&bad_magic)).await;
    assert_eq!(initialized.unwrap_err().kind, ErrorKind::FileUnreadable);
    assert_eq!(
        fx.service.model_state(),
        ModelState::Error(ErrorKind::FileUnreadable)
    );

    assert!(fx.runtime.load_calls().is_empty());
}

#[tokio::test]
async fn test_selected_file_is_remembered_and_loaded() {
    let fx = fixture(ScriptedRuntime::new());
    let custom = write_model(&fx.paths, "custom.Q4_0.gguf", b"GGUF\x03\x00\x00\x00");

    let validation = fx.service.select_model_file(&custom).await.unwrap();

    assert!(validation.valid);
    assert!(validation.warning.is_none());
    assert_eq!(fx.service.model_status().path, Some(custom.clone()));

    let calls = fx.runtime.load_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].path, custom);
}

#[tokio::test]
async fn test_load_falls_back_to_basic_configuration() {
    let fx = fixture(
        ScriptedRuntime::new().fail_loads([RuntimeError::new("failed to allocate buffer")]),
    );
    let conversation = fx.service.create_conversation().await.unwrap();

    let stream = fx
        .service
        .send_message(&conversation.id, "hi", None)
        .await
        .unwrap();
    stream.final_event().await.unwrap();

    let variants: Vec<_> = fx
        .runtime
        .load_calls()
        .iter()
        .map(|c| c.variant)
        .collect();
    assert_eq!(variants, vec![ConfigVariant::Full, ConfigVariant::Basic]);
    assert_eq!(fx.service.model_state(), ModelState::Ready);
}

#[tokio::test]
async fn test_model_swap_cancels_in_flight_run() {
    let fx = fixture(
        ScriptedRuntime::new()
            .with_default_reply(slow_reply(200))
            .with_token_delay(Duration::from_millis(20)),
    );
    let other = write_model(&fx.paths, "other.Q5_K_M.gguf", b"GGUF\x03\x00\x00\x00");
    let conversation = fx.service.create_conversation().await.unwrap();

    let mut stream = fx
        .service
        .send_message(&conversation.id, "talk", None)
        .await
        .unwrap();
    stream.recv().await.unwrap();

    fx.service.initialize_model(Some(&other)).await.unwrap();
    let terminal = stream.final_event().await.unwrap();

    assert_eq!(terminal.finish, Some(FinishReason::Cancelled));
    assert_eq!(fx.service.model_status().path, Some(other.clone()));
    let calls = fx.runtime.load_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].path, other);
}

#[tokio::test]
async fn test_template_preamble_replaces_global_preamble() {
    let fx = fixture(ScriptedRuntime::new());
    fx.service
        .save_prompt_template(&PromptTemplate::new("pirate", "Talk like a pirate."))
        .await
        .unwrap();
    fx.service
        .set_system_preamble(Some("Global preamble."))
        .await
        .unwrap();

    let seeded = fx
        .service
        .create_conversation_from_template("pirate")
        .await
        .unwrap();
    let plain = fx.service.create_conversation().await.unwrap();

    for id in [&seeded.id, &plain.id] {
        let stream = fx.service.send_message(id, "Ahoy", None).await.unwrap();
        stream.final_event().await.unwrap();
    }

    let prompts = fx.runtime.prompts();
    assert!(prompts[0].contains("Talk like a pirate."));
    assert!(!prompts[0].contains("Global preamble."));
    assert!(prompts[1].contains("Global preamble."));
}

#[tokio::test]
async fn test_unknown_template_is_not_found() {
    let fx = fixture(ScriptedRuntime::new());

    let result = fx.service.create_conversation_from_template("missing").await;

    assert!(result.is_err_and(|e| e.is_not_found()));
}

#[tokio::test]
async fn test_preamble_falls_back_to_configured_default() {
    let fx = fixture(ScriptedRuntime::new());
    let default = fx.service.system_preamble().await;

    fx.service.set_system_preamble(Some("Be brief.")).await.unwrap();
    assert_eq!(fx.service.system_preamble().await, "Be brief.");

    fx.service.set_system_preamble(None).await.unwrap();
    assert_eq!(fx.service.system_preamble().await, default);
}

#[tokio::test]
async fn test_deleting_current_conversation_selects_another() {
    let fx = fixture(ScriptedRuntime::new());
    let older = fx.service.create_conversation().await.unwrap();
    let newer = fx.service.create_conversation().await.unwrap();
    assert_eq!(fx.service.current_conversation().await.unwrap().id, newer.id);

    fx.service.delete_conversation(&newer.id).await.unwrap();

    assert_eq!(fx.service.current_conversation().await.unwrap().id, older.id);
    let remaining = fx.service.list_conversations().await.unwrap();
    assert_eq!(remaining.len(), 1);
}

#[tokio::test]
async fn test_status_subscribers_observe_ready() {
    let fx = fixture(ScriptedRuntime::new());
    let mut status = fx.service.subscribe_model_status();
    assert_eq!(status.borrow().state, ModelState::Unloaded);
    assert!(fx.service.check_model_available().await);

    fx.service.initialize_model(None).await.unwrap();

    status.changed().await.unwrap();
    assert_eq!(status.borrow_and_update().state, ModelState::Ready);
}
