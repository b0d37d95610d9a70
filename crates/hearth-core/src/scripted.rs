//! Deterministic in-memory model runtime for tests.
//!
//! Replies are scripted as lists of text pieces; each piece is one token.
//! Detokenizing concatenates pieces, so tests can predict every partial
//! event exactly. Load failures and mid-run failures are scriptable too.

use crate::generation::GenerationParameters;
use crate::model::{
    GenerationContext, LoadedModel, ModelConfig, ModelRuntime, RuntimeError, TokenId,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Default)]
struct ScriptState {
    vocab: Vec<String>,
    index: HashMap<String, TokenId>,
    replies: VecDeque<Vec<String>>,
    default_reply: Vec<String>,
    load_failures: VecDeque<RuntimeError>,
    load_calls: Vec<ModelConfig>,
    prompts: Vec<String>,
    token_delay: Option<Duration>,
    fail_after: Option<usize>,
}

impl ScriptState {
    fn intern(&mut self, piece: &str) -> TokenId {
        if let Some(id) = self.index.get(piece) {
            return *id;
        }
        let id = self.vocab.len() as TokenId;
        self.vocab.push(piece.to_string());
        self.index.insert(piece.to_string(), id);
        id
    }
}

/// Cloneable handle to shared script state; clones observe the same script.
#[derive(Clone)]
pub struct ScriptedRuntime {
    state: Arc<Mutex<ScriptState>>,
}

impl Default for ScriptedRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedRuntime {
    pub fn new() -> Self {
        let state = ScriptState {
            default_reply: vec!["OK".to_string()],
            ..ScriptState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a reply; each run consumes the next queued reply, then falls
    /// back to the default reply.
    pub fn with_reply<I, S>(self, pieces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push_reply(pieces);
        self
    }

    pub fn push_reply<I, S>(&self, pieces: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let reply = pieces.into_iter().map(Into::into).collect();
        self.lock().replies.push_back(reply);
    }

    pub fn with_default_reply<I, S>(self, pieces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().default_reply = pieces.into_iter().map(Into::into).collect();
        self
    }

    /// The next `load` calls fail with these errors, in order.
    pub fn fail_loads<I>(self, errors: I) -> Self
    where
        I: IntoIterator<Item = RuntimeError>,
    {
        self.lock().load_failures.extend(errors);
        self
    }

    pub fn with_token_delay(self, delay: Duration) -> Self {
        self.lock().token_delay = Some(delay);
        self
    }

    /// Every run fails when asked for token number `n` (zero-based).
    pub fn fail_generation_after(self, n: usize) -> Self {
        self.lock().fail_after = Some(n);
        self
    }

    /// Configurations passed to `load`, in call order.
    pub fn load_calls(&self) -> Vec<ModelConfig> {
        self.lock().load_calls.clone()
    }

    /// Decoded prompts of every context created so far.
    pub fn prompts(&self) -> Vec<String> {
        self.lock().prompts.clone()
    }
}

impl ModelRuntime for ScriptedRuntime {
    fn load(&self, config: &ModelConfig) -> Result<Arc<dyn LoadedModel>, RuntimeError> {
        let mut state = self.lock();
        state.load_calls.push(config.clone());
        if let Some(err) = state.load_failures.pop_front() {
            return Err(err);
        }
        Ok(Arc::new(ScriptedModel {
            state: self.state.clone(),
        }))
    }
}

struct ScriptedModel {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedModel {
    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LoadedModel for ScriptedModel {
    fn tokenize(&self, text: &str) -> Result<Vec<TokenId>, RuntimeError> {
        let mut state = self.lock();
        Ok(text
            .split_inclusive(char::is_whitespace)
            .map(|piece| state.intern(piece))
            .collect())
    }

    fn detokenize(&self, tokens: &[TokenId]) -> Result<String, RuntimeError> {
        let state = self.lock();
        tokens
            .iter()
            .map(|id| {
                state
                    .vocab
                    .get(*id as usize)
                    .map(String::as_str)
                    .ok_or_else(|| RuntimeError::new(format!("unknown token id {id}")))
            })
            .collect()
    }

    fn create_context(
        &self,
        prompt: &[TokenId],
        _params: &GenerationParameters,
    ) -> Result<Box<dyn GenerationContext>, RuntimeError> {
        let prompt_text = self.detokenize(prompt)?;
        let mut state = self.lock();
        state.prompts.push(prompt_text);

        let reply = match state.replies.pop_front() {
            Some(reply) => reply,
            None => state.default_reply.clone(),
        };
        let tokens = reply.iter().map(|piece| state.intern(piece)).collect();

        Ok(Box::new(ScriptedContext {
            tokens,
            position: 0,
            delay: state.token_delay,
            fail_after: state.fail_after,
        }))
    }
}

struct ScriptedContext {
    tokens: Vec<TokenId>,
    position: usize,
    delay: Option<Duration>,
    fail_after: Option<usize>,
}

impl GenerationContext for ScriptedContext {
    fn next_token(&mut self) -> Result<Option<TokenId>, RuntimeError> {
        if self.fail_after == Some(self.position) {
            return Err(RuntimeError::new("scripted generation failure"));
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let token = self.tokens.get(self.position).copied();
        if token.is_some() {
            self.position += 1;
        }
        Ok(token)
    }
}
