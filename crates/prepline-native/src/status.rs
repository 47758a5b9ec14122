//! Status and identifier vocabularies of the native import schema.

use std::fmt;

use anyhow::{bail, Result};

/// OPS submission status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    Queued = 1,
    Published = 3,
    Declined = 4,
}

impl SubmissionStatus {
    /// Map the upstream review state. An unknown state is a hard failure:
    /// guessing a status would import the preprint in the wrong stage.
    pub fn from_review_state(state: Option<&str>) -> Result<Self> {
        match state {
            Some("initial") => Ok(Self::Queued),
            Some("accepted") => Ok(Self::Published),
            Some("withdrawn") => Ok(Self::Declined),
            other => bail!("unknown review state {other:?}"),
        }
    }

    /// Status of a publication node. Declined submissions keep their
    /// publications importable as queued.
    pub fn downgraded(self) -> Self {
        match self {
            Self::Declined => Self::Queued,
            other => other,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// `<id>` node `type` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Internal,
    Public,
    Doi,
}

impl IdentifierKind {
    /// Internal ids must never clobber platform-assigned state; external
    /// ids are the join keys and must be written.
    pub fn advice(self) -> Advice {
        match self {
            Self::Internal => Advice::Ignore,
            Self::Public | Self::Doi => Advice::Update,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::Public => "public",
            Self::Doi => "doi",
        }
    }
}

/// `<id>` node `advice` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advice {
    Ignore,
    Update,
}

impl Advice {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ignore => "ignore",
            Self::Update => "update",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
