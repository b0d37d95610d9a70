use super::cleanup::clean_output;
use super::event::{FinishReason, GenerationOutcome, StreamEvent};
use super::params::GenerationParameters;
use crate::error::GenerationError;
use crate::model::{ModelHandle, RunPermit, TokenId};
use crate::template::ChatTemplate;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Everything one run needs, owned so the run can move to a blocking thread.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub conversation_id: String,
    pub prompt: String,
    /// Preamble rendered into `prompt`, if any. Used to strip an echo.
    pub preamble: Option<String>,
    pub pending_user_text: String,
    pub params: GenerationParameters,
}

/// Drives streaming generation against a [`ModelHandle`].
///
/// Stop conditions are evaluated after every token in this order:
/// cancellation, stop sequence, token budget. The text is truncated strictly
/// before the earliest stop sequence, cleaned with the template's rules and
/// delivered once in the terminal event.
#[derive(Debug, Clone)]
pub struct GenerationController {
    template: ChatTemplate,
}

impl GenerationController {
    pub fn new(template: ChatTemplate) -> Self {
        Self { template }
    }

    /// Claims the model for a run without starting it.
    ///
    /// Splitting this from [`GenerationRun::execute`] lets async callers
    /// report `Busy` immediately and run the token loop on a blocking thread.
    ///
    /// # Errors
    ///
    /// `Busy` while another run holds the handle, `ModelRetired` after a swap.
    pub fn begin(
        &self,
        handle: &ModelHandle,
        request: GenerationRequest,
    ) -> Result<GenerationRun, GenerationError> {
        let permit = handle.try_acquire()?;
        Ok(GenerationRun {
            permit,
            template: self.template.clone(),
            request,
            tokens: Vec::new(),
            accumulated_text: String::new(),
            cancelled: false,
        })
    }

    /// Runs a whole generation on the current thread.
    pub fn run<F>(
        &self,
        handle: &ModelHandle,
        request: GenerationRequest,
        cancel: &CancellationToken,
        on_event: F,
    ) -> Result<GenerationOutcome, GenerationError>
    where
        F: FnMut(StreamEvent),
    {
        self.begin(handle, request)?.execute(cancel, on_event)
    }
}

/// One in-flight generation. Holds exclusive use of the model until dropped.
pub struct GenerationRun {
    permit: RunPermit,
    template: ChatTemplate,
    request: GenerationRequest,
    tokens: Vec<TokenId>,
    accumulated_text: String,
    cancelled: bool,
}

impl GenerationRun {
    pub fn conversation_id(&self) -> &str {
        &self.request.conversation_id
    }

    /// Drives the run to completion.
    ///
    /// Emits partial events in generation order followed by exactly one
    /// terminal event, including on cancellation and on runtime failure. The
    /// model is released when this returns.
    ///
    /// # Returns
    ///
    /// The outcome on normal, stop, budget or cancelled termination.
    ///
    /// # Errors
    ///
    /// `Failed` if tokenization or token generation fails. The terminal event
    /// has already been emitted with the best available text.
    pub fn execute<F>(
        mut self,
        cancel: &CancellationToken,
        mut on_event: F,
    ) -> Result<GenerationOutcome, GenerationError>
    where
        F: FnMut(StreamEvent),
    {
        let started = Instant::now();
        let result = self.drive(cancel, &mut on_event);

        let text = clean_output(
            &self.template,
            &self.accumulated_text,
            self.request.preamble.as_deref(),
            &self.request.pending_user_text,
        );
        let finish = match &result {
            Ok(reason) => reason.clone(),
            Err(e) => FinishReason::Failed(e.to_string()),
        };
        self.cancelled = finish == FinishReason::Cancelled;

        tracing::debug!(
            conversation_id = %self.request.conversation_id,
            tokens = self.tokens.len(),
            finish = ?finish,
            cancelled = self.cancelled,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Generation run finished"
        );

        on_event(StreamEvent::complete(
            self.request.conversation_id.clone(),
            text.clone(),
            finish.clone(),
        ));

        let outcome = GenerationOutcome {
            conversation_id: self.request.conversation_id.clone(),
            text,
            token_count: self.tokens.len(),
            finish,
        };
        drop(self);

        result.map(|_| outcome)
    }

    fn drive<F>(
        &mut self,
        cancel: &CancellationToken,
        on_event: &mut F,
    ) -> Result<FinishReason, GenerationError>
    where
        F: FnMut(StreamEvent),
    {
        let stops = self
            .request
            .params
            .with_stop_sequences(self.template.stop_sequences())
            .stop_sequences;
        let max_tokens = self.request.params.max_output_tokens;

        if cancel.is_cancelled() {
            return Ok(FinishReason::Cancelled);
        }
        if max_tokens == 0 {
            return Ok(FinishReason::MaxTokens);
        }

        let model = self.permit.model();
        let prompt_tokens = model
            .tokenize(&self.request.prompt)
            .map_err(|e| GenerationError::Failed(format!("tokenization failed: {e}")))?;
        let mut context = model
            .create_context(&prompt_tokens, &self.request.params)
            .map_err(|e| GenerationError::Failed(e.to_string()))?;

        loop {
            if cancel.is_cancelled() {
                return Ok(FinishReason::Cancelled);
            }

            let Some(token) = context
                .next_token()
                .map_err(|e| GenerationError::Failed(e.to_string()))?
            else {
                return Ok(FinishReason::EndOfGeneration);
            };
            self.tokens.push(token);

            let decoded = model
                .detokenize(&self.tokens)
                .map_err(|e| GenerationError::Failed(format!("detokenization failed: {e}")))?;
            let (text, hit_stop) = truncate_at_stop(decoded, &stops);
            self.accumulated_text = text;

            on_event(StreamEvent::partial(
                self.request.conversation_id.clone(),
                self.accumulated_text.clone(),
            ));

            if cancel.is_cancelled() {
                return Ok(FinishReason::Cancelled);
            }
            if hit_stop {
                return Ok(FinishReason::StopSequence);
            }
            if self.tokens.len() >= max_tokens {
                return Ok(FinishReason::MaxTokens);
            }
        }
    }
}

/// Cuts `text` before the earliest occurrence of any stop sequence.
fn truncate_at_stop(mut text: String, stops: &[String]) -> (String, bool) {
    let earliest = stops
        .iter()
        .filter(|s| !s.is_empty())
        .filter_map(|s| text.find(s.as_str()))
        .min();
    match earliest {
        Some(at) => {
            text.truncate(at);
            (text, true)
        }
        None => (text, false),
    }
}
