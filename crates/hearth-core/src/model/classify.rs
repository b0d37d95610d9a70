//! Load-failure classification.
//!
//! Runtimes report failures as free text. This table maps known markers in
//! that text onto the closed [`ErrorKind`] set. It is a best-effort adapter:
//! anything it does not recognise is `Unknown`, and the runtime message is
//! always kept alongside the kind.

use super::runtime::RuntimeError;
use crate::error::ErrorKind;

/// `(kind, markers)`: a rule matches when every marker occurs in the
/// lowercased message or code. Rules are checked in order.
const CLASSIFICATION_RULES: &[(ErrorKind, &[&str])] = &[
    (ErrorKind::IncompatibleQuantization, &["number of elements", "block size"]),
    (ErrorKind::IncompatibleQuantization, &["quantiz"]),
    (ErrorKind::IncompatibleQuantization, &["invalid ggml type"]),
    (ErrorKind::RuntimeVersionMismatch, &["is not a function"]),
    (ErrorKind::RuntimeVersionMismatch, &["err_package_path_not_exported"]),
    (ErrorKind::RuntimeVersionMismatch, &["version mismatch"]),
    (ErrorKind::RuntimeVersionMismatch, &["unsupported file version"]),
    (ErrorKind::OutOfMemory, &["insufficientmemoryerror"]),
    (ErrorKind::OutOfMemory, &["out of memory"]),
    (ErrorKind::OutOfMemory, &["failed to allocate"]),
    (ErrorKind::FileUnreadable, &["corrupted or incomplete"]),
    (ErrorKind::FileUnreadable, &["permission denied"]),
    (ErrorKind::FileUnreadable, &["invalid magic"]),
    (ErrorKind::FileNotFound, &["no such file"]),
    (ErrorKind::FileNotFound, &["not found"]),
];

pub fn classify_load_failure(error: &RuntimeError) -> ErrorKind {
    let haystack = match &error.code {
        Some(code) => format!("{} {}", error.message, code).to_lowercase(),
        None => error.message.to_lowercase(),
    };

    CLASSIFICATION_RULES
        .iter()
        .find(|(_, markers)| markers.iter().all(|m| haystack.contains(m)))
        .map(|(kind, _)| *kind)
        .unwrap_or(ErrorKind::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(message: &str) -> ErrorKind {
        classify_load_failure(&RuntimeError::new(message))
    }

    #[test]
    fn quantization_needs_both_markers() {
        assert_eq!(
            kind_of("tensor 'blk.0' number of elements (10) is not a multiple of block size (32)"),
            ErrorKind::IncompatibleQuantization
        );
        assert_eq!(kind_of("number of elements is wrong"), ErrorKind::Unknown);
    }

    #[test]
    fn runtime_version_markers() {
        assert_eq!(kind_of("llama.loadModel is not a function"), ErrorKind::RuntimeVersionMismatch);
        let coded = RuntimeError::new("Package subpath not exported")
            .with_code("ERR_PACKAGE_PATH_NOT_EXPORTED");
        assert_eq!(classify_load_failure(&coded), ErrorKind::RuntimeVersionMismatch);
    }

    #[test]
    fn memory_markers_match_message_or_code() {
        assert_eq!(kind_of("CUDA out of memory"), ErrorKind::OutOfMemory);
        let coded = RuntimeError::new("cannot load").with_code("InsufficientMemoryError");
        assert_eq!(classify_load_failure(&coded), ErrorKind::OutOfMemory);
    }

    #[test]
    fn file_markers() {
        assert_eq!(
            kind_of("The model is corrupted or incomplete"),
            ErrorKind::FileUnreadable
        );
        assert_eq!(kind_of("ENOENT: no such file or directory"), ErrorKind::FileNotFound);
    }

    #[test]
    fn unrecognised_messages_are_unknown() {
        assert_eq!(kind_of("something odd happened"), ErrorKind::Unknown);
    }
}
