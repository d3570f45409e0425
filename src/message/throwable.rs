use std::fmt;

use serde::{Deserialize, Serialize};

/// Portable description of a failure carried by an error message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Throwable {
    pub type_name: String,
    pub message: String,
    pub cause: Option<Box<Throwable>>,
}

impl Throwable {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            cause: None,
        }
    }

    pub fn caused_by(mut self, cause: Throwable) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

impl fmt::Display for Throwable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, " (caused by {})", cause)?;
        }
        Ok(())
    }
}

/// Payload of an error message.
///
/// Stored as an opaque blob. A blob this crate cannot parse is kept as
/// `Opaque` so its bytes survive a read/write cycle untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorPayload {
    Throwable(Throwable),
    Opaque(Vec<u8>),
}

impl ErrorPayload {
    pub fn to_blob(&self) -> Result<Vec<u8>, bitcode::Error> {
        match self {
            ErrorPayload::Throwable(t) => bitcode::serialize(t),
            ErrorPayload::Opaque(bytes) => Ok(bytes.clone()),
        }
    }

    pub fn from_blob(bytes: Vec<u8>) -> Self {
        match bitcode::deserialize::<Throwable>(&bytes) {
            Ok(t) => ErrorPayload::Throwable(t),
            Err(_) => ErrorPayload::Opaque(bytes),
        }
    }

    pub fn throwable(&self) -> Option<&Throwable> {
        match self {
            ErrorPayload::Throwable(t) => Some(t),
            ErrorPayload::Opaque(_) => None,
        }
    }
}

impl From<Throwable> for ErrorPayload {
    fn from(t: Throwable) -> Self {
        ErrorPayload::Throwable(t)
    }
}
