//! Editing the logged-in user's own profile.
use crate::api::{ApiError, UserSummary, UserUpdate};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("You can only edit your own profile")]
    NotOwner,

    #[error("Not editing")]
    NotEditing,

    #[error("A save is already in progress")]
    Busy,
}

/// Draft of display name and image for one user.
///
/// The last saved user is the baseline: cancelling restores it, a successful
/// save replaces it.
#[derive(Debug, Clone)]
pub struct ProfileEditor {
    user: UserSummary,
    editing: bool,
    pending: bool,
    display_name: String,
    /// New image as plain base64, `None` to keep the current one.
    image: Option<String>,
    field_errors: BTreeMap<String, String>,
    error: Option<String>,
}

impl ProfileEditor {
    pub fn new(user: UserSummary) -> Self {
        let display_name = user.display_name.clone();
        Self {
            user,
            editing: false,
            pending: false,
            display_name,
            image: None,
            field_errors: BTreeMap::new(),
            error: None,
        }
    }

    pub fn user(&self) -> &UserSummary {
        &self.user
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn field_error(&self, field: &str) -> Option<&str> {
        self.field_errors.get(field).map(String::as_str)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether `viewer` may edit this profile.
    pub fn can_edit(&self, viewer: Option<i64>) -> bool {
        viewer == Some(self.user.id)
    }

    pub fn begin_edit(&mut self, viewer: Option<i64>) -> Result<(), ProfileError> {
        if !self.can_edit(viewer) {
            return Err(ProfileError::NotOwner);
        }
        self.editing = true;
        Ok(())
    }

    pub fn set_display_name(&mut self, name: impl Into<String>) {
        self.display_name = name.into();
        self.field_errors.remove("displayName");
    }

    /// Stage a new image from raw file bytes.
    pub fn set_image_bytes(&mut self, bytes: &[u8]) {
        self.image = Some(STANDARD.encode(bytes));
        self.field_errors.remove("image");
    }

    /// Drop the draft and go back to the saved values.
    pub fn cancel(&mut self) {
        self.editing = false;
        self.display_name = self.user.display_name.clone();
        self.image = None;
        self.field_errors.clear();
        self.error = None;
    }

    /// User id and body for `PUT /users/{id}`.
    pub fn begin_save(&mut self) -> Result<(i64, UserUpdate), ProfileError> {
        if !self.editing {
            return Err(ProfileError::NotEditing);
        }
        if self.pending {
            return Err(ProfileError::Busy);
        }
        self.pending = true;
        self.error = None;
        Ok((
            self.user.id,
            UserUpdate {
                display_name: self.display_name.clone(),
                image: self.image.clone(),
            },
        ))
    }

    /// Record the outcome of a save. On success the returned user becomes the
    /// new baseline and is handed back so the caller can update the session.
    pub fn finish_save(&mut self, result: Result<UserSummary, ApiError>) -> Option<UserSummary> {
        self.pending = false;
        match result {
            Ok(user) => {
                tracing::info!(user_id = user.id, "Profile updated");
                self.user = user.clone();
                self.cancel();
                Some(user)
            }
            Err(e @ ApiError::Validation { .. }) => {
                self.field_errors = e.field_errors();
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Profile update failed");
                self.error = Some(e.to_string());
                None
            }
        }
    }
}
