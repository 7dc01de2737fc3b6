//! Descriptor and verdict types

use crate::error::RejectionReason;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// Metadata describing a candidate upload. The validator never sees file bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub name: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_mime_type: Option<String>,
}

impl FileDescriptor {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            reported_mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.reported_mime_type = Some(mime_type.into());
        self
    }
}

/// Outcome of a check. Exactly one reason is attached to a rejection.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    Accepted,
    Rejected(RejectionReason),
}

impl ValidationResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationResult::Accepted)
    }

    pub fn is_rejected(&self) -> bool {
        !self.is_accepted()
    }

    pub fn reason(&self) -> Option<&RejectionReason> {
        match self {
            ValidationResult::Accepted => None,
            ValidationResult::Rejected(reason) => Some(reason),
        }
    }

    pub fn into_result(self) -> Result<(), RejectionReason> {
        match self {
            ValidationResult::Accepted => Ok(()),
            ValidationResult::Rejected(reason) => Err(reason),
        }
    }
}

impl From<Result<(), RejectionReason>> for ValidationResult {
    fn from(result: Result<(), RejectionReason>) -> Self {
        match result {
            Ok(()) => ValidationResult::Accepted,
            Err(reason) => ValidationResult::Rejected(reason),
        }
    }
}

impl Serialize for ValidationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ValidationResult::Accepted => {
                let mut state = serializer.serialize_struct("ValidationResult", 1)?;
                state.serialize_field("status", "accepted")?;
                state.end()
            }
            ValidationResult::Rejected(reason) => {
                let mut state = serializer.serialize_struct("ValidationResult", 3)?;
                state.serialize_field("status", "rejected")?;
                state.serialize_field("reason", reason)?;
                state.serialize_field("message", &reason.to_string())?;
                state.end()
            }
        }
    }
}
