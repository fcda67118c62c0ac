//! Crate-wide error taxonomy.
//!
//! `OutOfRange` is deliberately not a variant here: per the inline-encoding
//! contract it never escapes `id_codec` — callers of that module see it as a
//! plain `Result` and fall back to dictionary allocation themselves.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    TermTooLarge,
    NullByteInUri,
    InvalidUtf8,
    SequenceOverflow,
    TypeMismatch,
    NotFound,
    StorageError,
    Cancelled,
    DerivationLimitReached,
    UnsupportedTerm,
}

impl Status {
    fn as_str(&self) -> &'static str {
        match self {
            Status::TermTooLarge => "term too large",
            Status::NullByteInUri => "NUL byte in URI",
            Status::InvalidUtf8 => "invalid UTF-8",
            Status::SequenceOverflow => "sequence counter overflow",
            Status::TypeMismatch => "id tag does not match expected kind",
            Status::NotFound => "not found",
            Status::StorageError => "storage engine error",
            Status::Cancelled => "materialization cancelled",
            Status::DerivationLimitReached => "derivation limit reached",
            Status::UnsupportedTerm => "unsupported term variant",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The crate's single error type: a `Status` plus an optional human-readable
/// detail message.
#[derive(Debug, Clone)]
pub struct Error {
    status: Status,
    message: Option<String>,
}

impl Error {
    pub fn new(status: Status, message: Option<&str>) -> Self {
        Error {
            status,
            message: message.map(String::from),
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn description(&self) -> &str {
        self.message.as_deref().unwrap_or_else(|| self.status.as_str())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(m) => write!(f, "{}: {}", self.status, m),
            None => write!(f, "{}", self.status),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// Convenience constructors, one per `Status` variant, to keep call sites
/// terse (`Error::not_found("urn:x")` instead of spelling out `Status::NotFound`).
impl Error {
    pub fn term_too_large(size: usize) -> Self {
        Error::new(
            Status::TermTooLarge,
            Some(&format!("{} bytes exceeds the 16384 byte limit", size)),
        )
    }

    pub fn null_byte_in_uri() -> Self {
        Error::new(Status::NullByteInUri, None)
    }

    pub fn invalid_utf8() -> Self {
        Error::new(Status::InvalidUtf8, None)
    }

    pub fn sequence_overflow(tag: &str) -> Self {
        Error::new(
            Status::SequenceOverflow,
            Some(&format!("sequence counter for {} tag exhausted", tag)),
        )
    }

    pub fn type_mismatch(msg: &str) -> Self {
        Error::new(Status::TypeMismatch, Some(msg))
    }

    pub fn storage(inner: impl fmt::Display) -> Self {
        Error::new(Status::StorageError, Some(&inner.to_string()))
    }

    pub fn cancelled() -> Self {
        Error::new(Status::Cancelled, None)
    }

    pub fn derivation_limit_reached(cap: usize) -> Self {
        Error::new(
            Status::DerivationLimitReached,
            Some(&format!("round produced {} derivations, the configured cap", cap)),
        )
    }

    pub fn unsupported_term(msg: &str) -> Self {
        Error::new(Status::UnsupportedTerm, Some(msg))
    }
}
