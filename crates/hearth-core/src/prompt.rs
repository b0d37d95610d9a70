//! Prompt assembly.
//!
//! Turns `(preamble, prior turns, pending user text)` into the single string a
//! model family expects. The assembler owns ordering and boundary
//! correctness; the delimiter vocabulary comes from [`ChatTemplate`].

use crate::session::{Role, Turn};
use crate::template::ChatTemplate;

/// Pure, deterministic prompt builder for one chat template.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    template: ChatTemplate,
}

impl PromptAssembler {
    pub fn new(template: ChatTemplate) -> Self {
        Self { template }
    }

    pub fn template(&self) -> &ChatTemplate {
        &self.template
    }

    /// Builds the prompt.
    ///
    /// Layout: `bos`, the preamble exactly once (never inside a turn), every
    /// prior turn independently delimited in stored order, then the pending
    /// message as a closed user turn. No assistant turn is opened at the end;
    /// the model's first tokens are the assistant content.
    pub fn build(&self, preamble: Option<&str>, turns: &[Turn], pending_user_text: &str) -> String {
        let t = &self.template;
        let preamble = preamble.map(str::trim).filter(|p| !p.is_empty());

        let mut prompt = String::with_capacity(
            t.bos.len()
                + preamble.map_or(0, str::len)
                + turns.iter().map(|turn| turn.text.len() + 32).sum::<usize>()
                + pending_user_text.len()
                + 32,
        );
        prompt.push_str(&t.bos);

        match preamble {
            Some(preamble) => {
                prompt.push_str(preamble);
                prompt.push_str(&t.preamble_separator);
            }
            // Nothing follows the opening marker but turns, so a marker
            // configured with trailing whitespace must not leave a blank line.
            None => {
                let trimmed = prompt.trim_end().len();
                prompt.truncate(trimmed);
            }
        }

        for turn in turns {
            self.push_turn(&mut prompt, turn.role, &turn.text);
        }
        self.push_turn(&mut prompt, Role::User, pending_user_text);

        strip_trailing_assistant_open(&mut prompt, &t.open_marker(Role::Assistant));

        tracing::debug!(
            template = %t.name,
            prior_turns = turns.len(),
            prompt_chars = prompt.len(),
            "Assembled prompt"
        );
        prompt
    }

    fn push_turn(&self, prompt: &mut String, role: Role, text: &str) {
        let t = &self.template;
        prompt.push_str(&t.open_marker(role));
        prompt.push_str(text);
        prompt.push_str(&t.turn_end);
        prompt.push_str(&t.turn_separator);
    }
}

/// Removes an unclosed assistant-open header at the tail of the prompt.
fn strip_trailing_assistant_open(prompt: &mut String, assistant_open: &str) {
    let marker = assistant_open.trim_end();
    if marker.is_empty() {
        return;
    }
    loop {
        let body = prompt.trim_end();
        if !body.ends_with(marker) {
            return;
        }
        let cut = body.len() - marker.len();
        prompt.truncate(cut);
    }
}
