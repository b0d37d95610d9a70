//! Chat use case.
//!
//! `ChatService` is the single entry point front ends drive: it keeps the
//! model ready, assembles prompts from stored conversations, runs generation
//! on a blocking thread, streams events back and persists each exchange
//! before the terminal event is delivered.

use crate::bootstrap::Services;
use hearth_core::config::AppConfig;
use hearth_core::error::{GenerationError, HearthError, LoadError, Result};
use hearth_core::generation::{
    FinishReason, GenerationController, GenerationOutcome, GenerationParameters,
    GenerationRequest, GenerationRun, StreamEvent,
};
use hearth_core::model::{
    FileValidation, ModelAcquisition, ModelLifecycleManager, ModelRuntime, ModelState,
    ModelStatus,
};
use hearth_core::prompt::PromptAssembler;
use hearth_core::session::{Conversation, SessionStore};
use hearth_core::settings::SettingsStore;
use hearth_core::template::{PromptTemplate, PromptTemplateRepository};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

type ActiveRuns = Arc<Mutex<HashMap<String, CancellationToken>>>;

/// Orchestrates conversations, prompt templates and the model.
///
/// # Responsibilities
///
/// - Loading the model on demand and swapping it on request
/// - Turning a user message into a prompt and a streamed reply
/// - Persisting the user turn and the reply as one exchange
/// - Cancelling in-flight runs by conversation
///
/// # Concurrency
///
/// One run at a time per model. A second `send_message` while a run is
/// active fails with `Busy` instead of queueing. A conversation stays
/// registered as active until its exchange is persisted, so a follow-up
/// message always sees the previous reply.
pub struct ChatService {
    config: AppConfig,
    session_store: Arc<SessionStore>,
    templates: Arc<dyn PromptTemplateRepository>,
    settings: Arc<dyn SettingsStore>,
    acquisition: Arc<dyn ModelAcquisition>,
    lifecycle: Arc<ModelLifecycleManager>,
    assembler: PromptAssembler,
    controller: GenerationController,
    active_runs: ActiveRuns,
}

impl ChatService {
    /// Creates a new `ChatService`.
    ///
    /// # Arguments
    ///
    /// * `services` - Stores and configuration from [`Services::load`]
    /// * `runtime` - Inference backend used to load the model
    pub fn new(services: Services, runtime: Arc<dyn ModelRuntime>) -> Self {
        let Services {
            config,
            session_store,
            templates,
            settings,
            acquisition,
            ..
        } = services;

        let lifecycle = Arc::new(ModelLifecycleManager::new(
            runtime,
            acquisition.clone(),
            settings.clone(),
            config.model.clone(),
        ));

        Self {
            assembler: PromptAssembler::new(config.chat_template.clone()),
            controller: GenerationController::new(config.chat_template.clone()),
            config,
            session_store,
            templates,
            settings,
            acquisition,
            lifecycle,
            active_runs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    // --- Model ---

    /// Whether a model is loaded or a loadable file exists. Never fetches.
    pub async fn check_model_available(&self) -> bool {
        self.lifecycle.is_model_available().await
    }

    /// Loads the model, or swaps to `custom_path` if it differs from the
    /// active one.
    pub async fn initialize_model(
        &self,
        custom_path: Option<&Path>,
    ) -> std::result::Result<(), LoadError> {
        self.lifecycle.ensure_ready(custom_path).await.map(|_| ())
    }

    /// Validates a user-chosen model file, remembers it and loads it.
    ///
    /// # Returns
    ///
    /// The validation result, which may carry a compatibility warning.
    ///
    /// # Errors
    ///
    /// `FileUnreadable` if validation rejects the file; nothing is saved and
    /// the active model is left alone. Otherwise any load failure.
    pub async fn select_model_file(&self, path: &Path) -> Result<FileValidation> {
        let validation = self.acquisition.validate_selected_file(path);
        if !validation.valid {
            let reason = validation
                .reason
                .unwrap_or_else(|| "Invalid model file".to_string());
            return Err(LoadError::unreadable(path, reason).into());
        }
        if let Some(warning) = &validation.warning {
            tracing::warn!(path = %path.display(), "{}", warning);
        }

        self.settings.set_custom_model_path(Some(path)).await?;
        self.lifecycle.ensure_ready(Some(path)).await?;
        Ok(validation)
    }

    pub fn model_state(&self) -> ModelState {
        self.lifecycle.state()
    }

    pub fn model_status(&self) -> ModelStatus {
        self.lifecycle.status()
    }

    pub fn subscribe_model_status(&self) -> watch::Receiver<ModelStatus> {
        self.lifecycle.subscribe()
    }

    /// Cancels any in-flight run and releases the model.
    pub async fn unload_model(&self) {
        self.lifecycle.unload().await;
    }

    // --- Generation ---

    /// Starts generating a reply to `text` in a conversation.
    ///
    /// Returns as soon as the model is claimed; tokens arrive on the
    /// returned stream. The exchange is persisted before the terminal event
    /// unless the run failed or was cancelled before producing any text.
    ///
    /// # Arguments
    ///
    /// * `conversation_id` - Target conversation
    /// * `text` - The user message
    /// * `params` - Overrides the conversation's and the configured parameters
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a blank message, `NotFound` for an unknown
    /// conversation, a load error if no model can be made ready, and
    /// `Busy` while another run is active.
    pub async fn send_message(
        &self,
        conversation_id: &str,
        text: &str,
        params: Option<GenerationParameters>,
    ) -> Result<GenerationStream> {
        let text = text.trim();
        if text.is_empty() {
            return Err(HearthError::invalid_input("Message text is empty"));
        }

        let handle = self.lifecycle.ensure_ready(None).await?;
        let conversation = self.session_store.load_conversation(conversation_id).await?;
        let preamble = self.resolve_preamble(&conversation).await;
        let prompt = self
            .assembler
            .build(Some(&preamble), &conversation.turns, text);
        let params = params
            .or_else(|| conversation.parameters.clone())
            .unwrap_or_else(|| self.config.generation.clone());

        let request = GenerationRequest {
            conversation_id: conversation.id.clone(),
            prompt,
            preamble: Some(preamble),
            pending_user_text: text.to_string(),
            params,
        };

        let cancel = handle.run_token();
        let run = {
            let mut active = self.active_runs.lock().unwrap_or_else(PoisonError::into_inner);
            if active.contains_key(&conversation.id) {
                return Err(GenerationError::Busy.into());
            }
            let run = self.controller.begin(&handle, request)?;
            active.insert(conversation.id.clone(), cancel.clone());
            run
        };

        tracing::info!(conversation_id = %conversation.id, "Generation started");

        let (sender, receiver) = mpsc::unbounded_channel();
        let task = RunTask {
            conversation_id: conversation.id.clone(),
            user_text: text.to_string(),
            session_store: self.session_store.clone(),
            active_runs: self.active_runs.clone(),
        };
        tokio::spawn(task.drive(run, cancel, sender));

        Ok(GenerationStream {
            conversation_id: conversation.id,
            receiver,
        })
    }

    /// Requests cancellation of the conversation's in-flight run.
    ///
    /// Returns `false` if nothing was running. The run still delivers its
    /// terminal event.
    pub fn cancel_generation(&self, conversation_id: &str) -> bool {
        let active = self.active_runs.lock().unwrap_or_else(PoisonError::into_inner);
        match active.get(conversation_id) {
            Some(token) => {
                token.cancel();
                tracing::info!(conversation_id, "Generation cancel requested");
                true
            }
            None => false,
        }
    }

    pub fn is_generating(&self, conversation_id: &str) -> bool {
        self.active_runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(conversation_id)
    }

    async fn resolve_preamble(&self, conversation: &Conversation) -> String {
        if let Some(system_text) = conversation
            .system_text
            .as_deref()
            .filter(|s| !s.trim().is_empty())
        {
            return system_text.to_string();
        }
        self.system_preamble().await
    }

    // --- Conversations ---

    pub async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        self.session_store.list_conversations().await
    }

    pub async fn create_conversation(&self) -> Result<Conversation> {
        self.session_store.create_conversation(None).await
    }

    /// Creates a conversation seeded with a saved template's preamble and
    /// parameters.
    pub async fn create_conversation_from_template(&self, name: &str) -> Result<Conversation> {
        let template = self
            .templates
            .find_by_name(name)
            .await?
            .ok_or_else(|| HearthError::not_found("PromptTemplate", name))?;
        self.session_store.create_conversation(Some(&template)).await
    }

    pub async fn load_conversation(&self, conversation_id: &str) -> Result<Conversation> {
        self.session_store.load_conversation(conversation_id).await
    }

    pub async fn select_conversation(&self, conversation_id: &str) -> Result<Conversation> {
        self.session_store.select_conversation(conversation_id).await
    }

    /// The current conversation, created if there is none.
    pub async fn current_conversation(&self) -> Result<Conversation> {
        self.session_store.current_or_create().await
    }

    pub async fn rename_conversation(
        &self,
        conversation_id: &str,
        title: Option<String>,
    ) -> Result<Conversation> {
        self.session_store
            .rename_conversation(conversation_id, title)
            .await
    }

    /// Deletes a conversation, cancelling its run first.
    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        self.cancel_generation(conversation_id);
        self.session_store.delete_conversation(conversation_id).await
    }

    // --- Prompt templates ---

    pub async fn list_prompt_templates(&self) -> Result<Vec<PromptTemplate>> {
        self.templates.list_all().await
    }

    /// Saves a template, replacing one with the same name.
    pub async fn save_prompt_template(&self, template: &PromptTemplate) -> Result<()> {
        if template.name.trim().is_empty() {
            return Err(HearthError::invalid_input("Template name is empty"));
        }
        self.templates.save(template).await
    }

    pub async fn delete_prompt_template(&self, name: &str) -> Result<()> {
        self.templates.delete(name).await
    }

    // --- Preamble ---

    /// The global preamble: the stored override, else the configured default.
    pub async fn system_preamble(&self) -> String {
        match self.settings.system_preamble().await {
            Ok(Some(preamble)) => preamble,
            Ok(None) => self.config.default_preamble.clone(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored preamble, using default");
                self.config.default_preamble.clone()
            }
        }
    }

    /// Stores a global preamble override; `None` or blank restores the default.
    pub async fn set_system_preamble(&self, preamble: Option<&str>) -> Result<()> {
        self.settings.set_system_preamble(preamble).await
    }
}

/// State the spawned run task needs after generation returns.
struct RunTask {
    conversation_id: String,
    user_text: String,
    session_store: Arc<SessionStore>,
    active_runs: ActiveRuns,
}

impl RunTask {
    async fn drive(
        self,
        run: GenerationRun,
        cancel: CancellationToken,
        sender: mpsc::UnboundedSender<StreamEvent>,
    ) {
        let forward = sender.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let mut terminal = None;
            let result = run.execute(&cancel, |event| {
                if event.is_complete {
                    terminal = Some(event);
                } else if forward.send(event).is_err() {
                    // Nobody is listening any more.
                    cancel.cancel();
                }
            });
            (result, terminal)
        })
        .await;

        let (result, terminal) = match joined {
            Ok(pair) => pair,
            Err(e) => (
                Err(GenerationError::Failed(format!("generation thread panicked: {e}"))),
                None,
            ),
        };
        let mut terminal = terminal.unwrap_or_else(|| {
            let message = match &result {
                Err(e) => e.to_string(),
                Ok(_) => "generation ended without a terminal event".to_string(),
            };
            StreamEvent::complete(&self.conversation_id, "", FinishReason::Failed(message))
        });

        match &result {
            Ok(outcome) => {
                if let Err(e) = self.persist(outcome).await {
                    tracing::error!(
                        conversation_id = %self.conversation_id,
                        error = %e,
                        "Failed to save exchange"
                    );
                    terminal.finish = Some(FinishReason::Failed(format!(
                        "Failed to save conversation: {e}"
                    )));
                }
            }
            Err(e) => tracing::warn!(
                conversation_id = %self.conversation_id,
                error = %e,
                "Generation failed"
            ),
        }

        self.active_runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.conversation_id);

        if sender.send(terminal).is_err() {
            tracing::debug!(
                conversation_id = %self.conversation_id,
                "Stream dropped before the terminal event"
            );
        }
    }

    async fn persist(&self, outcome: &GenerationOutcome) -> Result<()> {
        if outcome.was_cancelled() && outcome.text.is_empty() {
            tracing::info!(
                conversation_id = %self.conversation_id,
                "Cancelled before any text, nothing saved"
            );
            return Ok(());
        }
        match self
            .session_store
            .append_exchange(&self.conversation_id, &self.user_text, &outcome.text)
            .await
        {
            Ok(_) => {}
            Err(e) if outcome.was_cancelled() && e.is_not_found() => {
                tracing::info!(
                    conversation_id = %self.conversation_id,
                    "Conversation deleted during the run, partial reply discarded"
                );
                return Ok(());
            }
            Err(e) => return Err(e),
        }
        tracing::info!(
            conversation_id = %self.conversation_id,
            tokens = outcome.token_count,
            finish = ?outcome.finish,
            "Exchange saved"
        );
        Ok(())
    }
}

/// Receiving end of one generation run.
///
/// Yields partial events in order, then exactly one terminal event, then
/// `None`.
pub struct GenerationStream {
    conversation_id: String,
    receiver: mpsc::UnboundedReceiver<StreamEvent>,
}

impl GenerationStream {
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.receiver.recv().await
    }

    /// Drains partial events and returns the terminal one.
    pub async fn final_event(mut self) -> Option<StreamEvent> {
        while let Some(event) = self.receiver.recv().await {
            if event.is_complete {
                return Some(event);
            }
        }
        None
    }
}
