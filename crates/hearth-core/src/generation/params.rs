use serde::{Deserialize, Serialize};

/// Sampling and stopping parameters for one generation call.
///
/// Values are immutable for the duration of a run. Defaults come from the
/// `[generation]` config section and may be overridden per call or per saved
/// prompt template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParameters {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub min_p: f32,
    pub repeat_penalty: f32,
    /// Output token budget. The limit is inclusive: a run ends with
    /// `MaxTokens` as soon as this many tokens have been produced, and `0`
    /// produces none.
    pub max_output_tokens: usize,
    /// Literal substrings that end generation. Order is irrelevant.
    pub stop_sequences: Vec<String>,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            temperature: 0.8,
            top_p: 0.95,
            top_k: 40,
            min_p: 0.05,
            repeat_penalty: 1.1,
            max_output_tokens: 800,
            stop_sequences: Vec::new(),
        }
    }
}

impl GenerationParameters {
    /// Returns a copy with `extra` merged into the stop sequences, skipping
    /// empty strings and duplicates.
    pub fn with_stop_sequences<I, S>(&self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut merged = self.clone();
        for stop in extra {
            let stop = stop.into();
            if !stop.is_empty() && !merged.stop_sequences.contains(&stop) {
                merged.stop_sequences.push(stop);
            }
        }
        merged
    }
}
