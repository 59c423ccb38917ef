//! Block editor core.
//!
//! # Responsibility
//! - Present all blocks of a Section as one continuous document while
//!   keeping each block independently addressable in storage.
//! - Detect dirty blocks by reference identity and persist a save as one
//!   atomic batch.
//! - Round-trip each block's canonical Markdown-with-mentions source.
//!
//! # Invariants
//! - Containers are isolating: edits never cross a container boundary, and
//!   a container never changes identifier in place.
//! - The document always holds at least one container.
//! - `serialize(parse(s))` is a fixed point over canonical source text.

use crate::error::ErrorKind;
use crate::model::hierarchy::BlockId;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod discovery;
pub mod document;
pub mod markdown;
pub mod session;

pub use discovery::{DiscoverySession, MentionCandidate, SlashCommand};
pub use document::{BlockContainer, ContentNode, InlineNode, SectionDocument};
pub use session::{EditorSession, SavePlan};

pub type EditorResult<T> = Result<T, EditorError>;

/// Editor-layer error.
#[derive(Debug)]
pub enum EditorError {
    /// No container with the given block identifier.
    ContainerNotFound(BlockId),
    /// Code containers hold exactly one code node; inline marks and
    /// mentions are rejected.
    CodeContainerRestriction,
    /// A node index points outside the container.
    NodeOutOfRange { index: usize, len: usize },
    /// A split position does not fall inside the container.
    InvalidSplit { index: usize, len: usize },
    /// Navigation away from unsaved changes without confirmation.
    UnsavedChanges,
    /// Persistence failure during save; the document is unchanged.
    Repo(RepoError),
}

impl EditorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ContainerNotFound(_) => ErrorKind::NotFound,
            Self::CodeContainerRestriction
            | Self::NodeOutOfRange { .. }
            | Self::InvalidSplit { .. } => ErrorKind::InvalidInput,
            Self::UnsavedChanges => ErrorKind::InvariantViolation,
            Self::Repo(err) => err.kind(),
        }
    }
}

impl Display for EditorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ContainerNotFound(id) => write!(f, "block container not found: {id}"),
            Self::CodeContainerRestriction => {
                write!(f, "code blocks cannot hold inline marks or mentions")
            }
            Self::NodeOutOfRange { index, len } => {
                write!(f, "content node index {index} out of range (len {len})")
            }
            Self::InvalidSplit { index, len } => {
                write!(f, "split position {index} out of range (len {len})")
            }
            Self::UnsavedChanges => {
                write!(f, "unsaved changes; save or confirm discarding them first")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EditorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for EditorError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}
