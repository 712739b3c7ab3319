//! Textual destination descriptions.
//!
//! A description is either `-` (stdout) or
//! `file:<path>[:rotate_length=<bytes>][:max_rotated_files=<count>]`.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::TraceflowError;
use crate::sinks::destination::{Destination, FileDestination};
use crate::sinks::rotation::{
    RotatingLogFile, DEFAULT_MAX_ROTATED_FILES, DEFAULT_ROTATE_LENGTH,
};

/// A parsed destination description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DestinationSpec {
    /// Write JSON lines to stdout.
    Stdout,
    /// Write JSON lines to a size-rotated file.
    File {
        /// Path of the active log file.
        path: PathBuf,
        /// Rotation threshold in bytes.
        rotate_length: u64,
        /// Number of rotated files to keep.
        max_rotated_files: usize,
    },
}

impl DestinationSpec {
    /// Opens the destination this spec describes.
    pub fn open(&self) -> Result<Arc<dyn Destination>, TraceflowError> {
        match self {
            Self::Stdout => Ok(Arc::new(FileDestination::stdout())),
            Self::File {
                path,
                rotate_length,
                max_rotated_files,
            } => {
                let file = RotatingLogFile::open(path, *rotate_length, *max_rotated_files)?;
                Ok(Arc::new(FileDestination::new(file)))
            }
        }
    }
}

fn parse_file_args(path: &str, args: &str) -> Result<DestinationSpec, TraceflowError> {
    // "file:-" aliases stdout; rotation arguments do not apply to it.
    if path == "-" {
        return Ok(DestinationSpec::Stdout);
    }
    let mut rotate_length = DEFAULT_ROTATE_LENGTH;
    let mut max_rotated_files = DEFAULT_MAX_ROTATED_FILES;

    for arg in args.split(':').filter(|arg| !arg.is_empty()) {
        let (key, value) = arg.split_once('=').ok_or_else(|| {
            TraceflowError::InvalidDestinationArg {
                key: arg.to_string(),
                value: String::new(),
            }
        })?;
        let invalid = || TraceflowError::InvalidDestinationArg {
            key: key.to_string(),
            value: value.to_string(),
        };
        match key {
            "rotate_length" => {
                rotate_length = value.parse().map_err(|_| invalid())?;
            }
            "max_rotated_files" => {
                max_rotated_files = value.parse().map_err(|_| invalid())?;
                if max_rotated_files == 0 {
                    return Err(invalid());
                }
            }
            _ => return Err(invalid()),
        }
    }

    Ok(DestinationSpec::File {
        path: PathBuf::from(path),
        rotate_length,
        max_rotated_files,
    })
}

/// Parses a textual destination description.
///
/// # Errors
///
/// Returns an error when the description kind is unknown, the text contains
/// a backslash, or a `file:` argument is malformed.
pub fn parse_destination_description(
    description: &str,
) -> Result<DestinationSpec, TraceflowError> {
    // Backslashes would be ambiguous between path separators and escapes,
    // so they are rejected outright.
    if description.contains('\\') {
        return Err(TraceflowError::UnsupportedEscape(description.to_string()));
    }
    if description == "-" {
        return Ok(DestinationSpec::Stdout);
    }
    match description.split_once(':') {
        Some(("file", rest)) => {
            let (path, args) = match rest.split_once(':') {
                Some((path, args)) => (path, args),
                None => (rest, ""),
            };
            parse_file_args(path, args)
        }
        _ => Err(TraceflowError::UnknownDestination(description.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parses_stdout() {
        assert_eq!(
            parse_destination_description("-").unwrap(),
            DestinationSpec::Stdout
        );
        assert_eq!(
            parse_destination_description("file:-").unwrap(),
            DestinationSpec::Stdout
        );
    }

    #[test]
    fn test_parses_file_with_defaults() {
        assert_eq!(
            parse_destination_description("file:/var/log/trace.json").unwrap(),
            DestinationSpec::File {
                path: PathBuf::from("/var/log/trace.json"),
                rotate_length: DEFAULT_ROTATE_LENGTH,
                max_rotated_files: DEFAULT_MAX_ROTATED_FILES,
            }
        );
    }

    #[test]
    fn test_parses_file_with_args() {
        assert_eq!(
            parse_destination_description(
                "file:trace.json:rotate_length=4096:max_rotated_files=3"
            )
            .unwrap(),
            DestinationSpec::File {
                path: PathBuf::from("trace.json"),
                rotate_length: 4096,
                max_rotated_files: 3,
            }
        );
    }

    #[test]
    fn test_rejects_unknown_kind() {
        let error = parse_destination_description("syslog:local0").unwrap_err();
        assert!(matches!(error, TraceflowError::UnknownDestination(_)));

        let error = parse_destination_description("stdout").unwrap_err();
        assert!(matches!(error, TraceflowError::UnknownDestination(_)));
    }

    #[test]
    fn test_rejects_backslash() {
        let error = parse_destination_description("file:C\\logs\\trace.json").unwrap_err();
        assert!(matches!(error, TraceflowError::UnsupportedEscape(_)));
    }

    #[test]
    fn test_rejects_malformed_args() {
        for description in [
            "file:trace.json:rotate_length=oops",
            "file:trace.json:bogus_key=1",
            "file:trace.json:rotate_length",
            "file:trace.json:max_rotated_files=0",
        ] {
            let error = parse_destination_description(description).unwrap_err();
            assert!(
                matches!(error, TraceflowError::InvalidDestinationArg { .. }),
                "expected invalid-arg error for {description:?}"
            );
        }
    }

    #[test]
    fn test_opens_file_destination() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.json");
        let description = format!("file:{}", path.display());

        let spec = parse_destination_description(&description).unwrap();
        let destination = spec.open().unwrap();
        destination.emit(&serde_json::json!({"message_type": "parser:open"}));

        let written = std::fs::read_to_string(&path).unwrap();
        let event: serde_json::Value = serde_json::from_str(written.trim()).unwrap();
        assert_eq!(event["message_type"], "parser:open");
    }
}
