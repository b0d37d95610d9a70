//! Post-processing of generated text.
//!
//! The rule list comes from the [`ChatTemplate`], so what the assembler
//! writes and what cleanup strips share one vocabulary. Rules run in list
//! order and are deterministic.

use crate::template::{ChatTemplate, CleanupRule};

/// Applies the template's cleanup rules to raw generated text.
///
/// # Arguments
///
/// * `preamble` - The preamble rendered into the prompt, used to recognise an echo
/// * `pending_user_text` - The user message the run answered
pub fn clean_output(
    template: &ChatTemplate,
    raw: &str,
    preamble: Option<&str>,
    pending_user_text: &str,
) -> String {
    let preamble = preamble.map(str::trim).filter(|p| !p.is_empty());
    let mut text = raw.to_string();

    for rule in &template.cleanup {
        text = match rule {
            CleanupRule::StripLeakedPreamble => strip_leaked_preamble(template, &text, preamble),
            CleanupRule::StripRoleHeaders => strip_role_headers(template, &text),
            CleanupRule::StripDelimiters => {
                let mut out = text;
                for marker in template.delimiters() {
                    out = out.replace(marker, "");
                }
                out
            }
            CleanupRule::StripInputEcho => strip_input_echo(&text, pending_user_text),
            CleanupRule::StripLiteral { text: literal } if !literal.is_empty() => {
                text.replace(literal.as_str(), "")
            }
            CleanupRule::StripLiteral { .. } => text,
            CleanupRule::Trim => text.trim().to_string(),
        };
    }
    text
}

/// Removes `bos` and whatever follows it up to and including the next turn
/// header, then a bare preamble echo at the head of the text.
fn strip_leaked_preamble(t: &ChatTemplate, text: &str, preamble: Option<&str>) -> String {
    let mut out = text.to_string();

    if !t.bos.is_empty() {
        while let Some(start) = out.find(&t.bos) {
            let after_bos = start + t.bos.len();
            let end = match find_turn_header_end(t, &out[after_bos..]) {
                Some(offset) => after_bos + offset,
                None => after_bos + leading_preamble_len(&out[after_bos..], preamble),
            };
            out.replace_range(start..end, "");
        }
    }

    let echo = leading_preamble_len(&out, preamble);
    if echo > 0 {
        out.replace_range(..echo, "");
    }
    out
}

/// Byte offset just past the first `turn_start` (and its role header, if
/// one follows) in `text`.
fn find_turn_header_end(t: &ChatTemplate, text: &str) -> Option<usize> {
    if t.turn_start.is_empty() {
        return None;
    }
    let start = text.find(&t.turn_start)?;
    let mut end = start + t.turn_start.len();
    for role in [&t.assistant_role, &t.user_role] {
        if !role.is_empty() && text[end..].starts_with(role.as_str()) {
            end += role.len();
            if text[end..].starts_with(t.role_separator.as_str()) {
                end += t.role_separator.len();
            }
            break;
        }
    }
    Some(end)
}

/// Length of a preamble echo (plus leading whitespace) at the head of `text`.
fn leading_preamble_len(text: &str, preamble: Option<&str>) -> usize {
    let Some(preamble) = preamble else {
        return 0;
    };
    let body = text.trim_start();
    if body.starts_with(preamble) {
        text.len() - body.len() + preamble.len()
    } else {
        0
    }
}

fn strip_role_headers(t: &ChatTemplate, text: &str) -> String {
    if t.turn_start.is_empty() {
        return text.to_string();
    }
    let mut out = text.to_string();
    for role in [&t.assistant_role, &t.user_role] {
        out = out.replace(&format!("{}{}{}", t.turn_start, role, t.role_separator), "");
        out = out.replace(&format!("{}{}", t.turn_start, role), "");
    }
    out.replace(&t.turn_start, "")
}

/// Removes the first line that is a verbatim copy of the user's message,
/// provided the reply continues on a later line. A match sharing its line
/// with other text is kept.
fn strip_input_echo(text: &str, pending_user_text: &str) -> String {
    let needle = pending_user_text.trim();
    if needle.is_empty() {
        return text.to_string();
    }

    for (at, _) in text.match_indices(needle) {
        let before = text[..at].trim_end_matches([' ', '\t']);
        if !(before.is_empty() || before.ends_with('\n')) {
            continue;
        }
        let rest = &text[at + needle.len()..];
        let Some(newline) = rest.find('\n') else {
            continue;
        };
        if !rest[..newline].trim_matches([' ', '\t', '\r']).is_empty() {
            continue;
        }
        let remainder = &rest[newline + 1..];
        if remainder.trim().is_empty() {
            continue;
        }
        let mut out = String::with_capacity(text.len());
        out.push_str(&text[..at]);
        out.push_str(remainder);
        return out;
    }
    text.to_string()
}
