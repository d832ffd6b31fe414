use crate::api::Discussion;
use crate::presenter;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeletionError {
    #[error("Only the author can delete a discussion")]
    NotOwner,

    #[error("Discussion {0} is not in this feed")]
    NotFound(i64),

    #[error("A deletion is already in progress")]
    Busy,

    #[error("No deletion is waiting for confirmation")]
    NothingToConfirm,

    #[error("This feed has been closed")]
    FeedClosed,
}

/// Where a deletion stands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DeletionState {
    #[default]
    Idle,
    /// Waiting for the user to confirm. `error` holds the message of a
    /// previous failed attempt on the same target.
    Confirming {
        target: Discussion,
        error: Option<String>,
    },
    /// Delete request in flight.
    Deleting { target: Discussion },
}

/// Confirm-then-delete flow for a single feed.
///
/// ```text
/// Idle --request--> Confirming --confirm--> Deleting --ok--> Idle
///                     ^   |                    |
///                     |   +--cancel--> Idle    |
///                     +--------fail------------+
/// ```
#[derive(Debug, Clone, Default)]
pub struct DeletionCoordinator {
    state: DeletionState,
}

impl DeletionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DeletionState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, DeletionState::Idle)
    }

    pub fn is_deleting(&self) -> bool {
        matches!(self.state, DeletionState::Deleting { .. })
    }

    pub fn target(&self) -> Option<&Discussion> {
        match &self.state {
            DeletionState::Idle => None,
            DeletionState::Confirming { target, .. } | DeletionState::Deleting { target } => {
                Some(target)
            }
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            DeletionState::Confirming { error, .. } => error.as_deref(),
            _ => None,
        }
    }

    /// Confirmation question for the current target.
    pub fn prompt(&self) -> Option<String> {
        self.target().map(presenter::delete_prompt)
    }

    /// Ask to delete `target` on behalf of `viewer`.
    ///
    /// Replaces any target still waiting for confirmation. Rejected while a
    /// delete request is in flight or when `viewer` is not the author.
    pub fn request(&mut self, target: &Discussion, viewer: Option<i64>) -> Result<(), DeletionError> {
        if self.is_deleting() {
            return Err(DeletionError::Busy);
        }
        if !presenter::can_delete(target, viewer) {
            return Err(DeletionError::NotOwner);
        }
        self.state = DeletionState::Confirming {
            target: target.clone(),
            error: None,
        };
        Ok(())
    }

    /// Dismiss the confirmation. Has no effect once the request is in flight.
    pub fn cancel(&mut self) -> bool {
        match self.state {
            DeletionState::Confirming { .. } => {
                self.state = DeletionState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Move to `Deleting` and return the id to delete.
    pub fn confirm(&mut self) -> Result<i64, DeletionError> {
        match std::mem::take(&mut self.state) {
            DeletionState::Confirming { target, .. } => {
                let id = target.id;
                self.state = DeletionState::Deleting { target };
                Ok(id)
            }
            DeletionState::Deleting { target } => {
                self.state = DeletionState::Deleting { target };
                Err(DeletionError::Busy)
            }
            DeletionState::Idle => Err(DeletionError::NothingToConfirm),
        }
    }

    /// Record the outcome of the delete request.
    ///
    /// Returns the deleted id on success. On failure the confirmation comes
    /// back with `error` so the user can retry or cancel.
    pub fn complete(&mut self, result: Result<(), String>) -> Option<i64> {
        let DeletionState::Deleting { target } = std::mem::take(&mut self.state) else {
            return None;
        };
        match result {
            Ok(()) => Some(target.id),
            Err(error) => {
                self.state = DeletionState::Confirming {
                    target,
                    error: Some(error),
                };
                None
            }
        }
    }

    /// Drop whatever is pending.
    pub fn reset(&mut self) {
        self.state = DeletionState::Idle;
    }
}
