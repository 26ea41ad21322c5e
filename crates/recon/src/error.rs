use std::fmt;

/// Run-level errors. Any of these aborts the operation that raised it.
#[derive(Debug)]
pub enum MatchError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad threshold, missing column mapping, etc.).
    ConfigValidation(String),
    /// Catalog source unreadable or produced no usable products.
    CatalogLoad(String),
    /// Checkpoint read or write failed for the given key.
    Checkpoint { key: String, message: String },
    /// Review / export sink failed to accept a page.
    Sink(String),
    /// IO error (file read, etc.).
    Io(String),
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::CatalogLoad(msg) => write!(f, "catalog load error: {msg}"),
            Self::Checkpoint { key, message } => {
                write!(f, "checkpoint '{key}': {message}")
            }
            Self::Sink(msg) => write!(f, "sink error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for MatchError {}

/// Per-record errors. Never fatal to a batch: the record is excluded and
/// listed in the rejected-row report.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordError {
    /// One or more required fields are empty or fail a domain check.
    /// Keys are source column labels.
    Validation(std::collections::BTreeMap<String, String>),
    /// A numeric field held a token that is neither a number nor a known
    /// correction.
    Normalization { field: String, value: String },
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(errors) => {
                write!(f, "invalid fields: ")?;
                let mut first = true;
                for (field, reason) in errors {
                    if !first {
                        write!(f, ", ")?;
                    }
                    write!(f, "{field} ({reason})")?;
                    first = false;
                }
                Ok(())
            }
            Self::Normalization { field, value } => {
                write!(f, "field '{field}': cannot coerce '{value}' to a number")
            }
        }
    }
}

impl std::error::Error for RecordError {}
