//! Chat-turn delimiter vocabulary.
//!
//! The exact tokens that mark turn boundaries differ between model families,
//! so they are configuration. The assembler and the output cleanup both read
//! from the same [`ChatTemplate`] so that what one writes the other can strip.

use crate::session::Role;
use serde::{Deserialize, Serialize};

/// One post-processing step applied to generated text.
///
/// Rules run in list order. The default order strips a leaked preamble echo
/// first, then role headers, then bare delimiters, then the input echo, and
/// trims last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum CleanupRule {
    /// Begin-of-sequence marker plus any preamble echo after it, up to and
    /// including the next turn opener.
    StripLeakedPreamble,
    /// `turn_start` + role name + separator headers, and orphan `turn_start`.
    StripRoleHeaders,
    /// Every `turn_end`, `bos` and `eos` marker.
    StripDelimiters,
    /// A line holding only the pending user message, when the reply goes on
    /// past it.
    StripInputEcho,
    /// Every occurrence of an arbitrary literal.
    StripLiteral { text: String },
    /// Surrounding whitespace.
    Trim,
}

impl CleanupRule {
    pub fn default_rules() -> Vec<CleanupRule> {
        vec![
            CleanupRule::StripLeakedPreamble,
            CleanupRule::StripRoleHeaders,
            CleanupRule::StripDelimiters,
            CleanupRule::StripInputEcho,
            CleanupRule::Trim,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatTemplate {
    pub name: String,
    /// Begin-of-sequence marker opening every prompt.
    pub bos: String,
    /// End-of-sequence marker, if the family emits one as text.
    pub eos: Option<String>,
    pub turn_start: String,
    pub turn_end: String,
    pub user_role: String,
    pub assistant_role: String,
    /// Written between the role name and the turn text.
    pub role_separator: String,
    /// Written after each `turn_end`.
    pub turn_separator: String,
    /// Written between a rendered preamble and the first turn.
    pub preamble_separator: String,
    pub cleanup: Vec<CleanupRule>,
}

impl Default for ChatTemplate {
    fn default() -> Self {
        Self::gemma()
    }
}

impl ChatTemplate {
    /// Gemma-style `<start_of_turn>role ... <end_of_turn>` turns.
    pub fn gemma() -> Self {
        Self {
            name: "gemma".to_string(),
            bos: "<bos>".to_string(),
            eos: Some("<eos>".to_string()),
            turn_start: "<start_of_turn>".to_string(),
            turn_end: "<end_of_turn>".to_string(),
            user_role: "user".to_string(),
            assistant_role: "model".to_string(),
            role_separator: "\n".to_string(),
            turn_separator: "\n".to_string(),
            preamble_separator: String::new(),
            cleanup: CleanupRule::default_rules(),
        }
    }

    /// ChatML-style `<|im_start|>role ... <|im_end|>` turns.
    pub fn chatml() -> Self {
        Self {
            name: "chatml".to_string(),
            bos: String::new(),
            eos: Some("<|endoftext|>".to_string()),
            turn_start: "<|im_start|>".to_string(),
            turn_end: "<|im_end|>".to_string(),
            user_role: "user".to_string(),
            assistant_role: "assistant".to_string(),
            role_separator: "\n".to_string(),
            turn_separator: "\n".to_string(),
            preamble_separator: "\n".to_string(),
            cleanup: CleanupRule::default_rules(),
        }
    }

    pub fn role_name(&self, role: Role) -> &str {
        match role {
            Role::User => &self.user_role,
            Role::Assistant => &self.assistant_role,
        }
    }

    /// The header that opens a turn for `role`.
    pub fn open_marker(&self, role: Role) -> String {
        format!("{}{}{}", self.turn_start, self.role_name(role), self.role_separator)
    }

    /// Markers whose appearance in generated text means the assistant turn is over.
    ///
    /// Excludes `turn_start`, which also opens a leaked preamble echo.
    pub fn stop_sequences(&self) -> Vec<String> {
        let mut stops = vec![self.turn_end.clone()];
        if let Some(eos) = &self.eos {
            stops.push(eos.clone());
        }
        stops.retain(|s| !s.is_empty());
        stops
    }

    /// Bare delimiter tokens that never belong in displayed text.
    pub fn delimiters(&self) -> Vec<&str> {
        let mut markers = vec![self.turn_end.as_str(), self.bos.as_str()];
        if let Some(eos) = &self.eos {
            markers.push(eos.as_str());
        }
        markers.retain(|m| !m.is_empty());
        markers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemma_open_marker_uses_model_role_for_assistant() {
        let template = ChatTemplate::gemma();
        assert_eq!(template.open_marker(Role::User), "<start_of_turn>user\n");
        assert_eq!(template.open_marker(Role::Assistant), "<start_of_turn>model\n");
    }

    #[test]
    fn stop_sequences_skip_empty_markers() {
        let mut template = ChatTemplate::chatml();
        template.eos = None;
        assert_eq!(template.stop_sequences(), vec!["<|im_end|>"]);
        assert_eq!(
            ChatTemplate::gemma().stop_sequences(),
            vec!["<end_of_turn>", "<eos>"]
        );
    }

    #[test]
    fn cleanup_rules_round_trip_through_toml() {
        let toml_src = r#"
            name = "custom"
            cleanup = [
                { rule = "strip_delimiters" },
                { rule = "strip_literal", text = "[INST]" },
                { rule = "trim" },
            ]
        "#;
        let template: ChatTemplate = toml::from_str(toml_src).unwrap();

        assert_eq!(template.name, "custom");
        assert_eq!(template.turn_start, "<start_of_turn>");
        assert_eq!(
            template.cleanup,
            vec![
                CleanupRule::StripDelimiters,
                CleanupRule::StripLiteral {
                    text: "[INST]".to_string()
                },
                CleanupRule::Trim,
            ]
        );
    }
}
