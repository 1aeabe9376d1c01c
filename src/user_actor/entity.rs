use chrono::Utc;

use super::error::UserError;
use crate::actor_framework::Entity;
use crate::domain::{display_name_from_email, looks_like_email, User, UserCreate, UserKey, UserPatch};

impl Entity for User {
    const KIND: &'static str = "user";

    type Id = UserKey;
    type CreateParams = UserCreate;
    type Patch = UserPatch;
    type Action = ();
    type ActionResult = ();
    type DeleteGuard = ();
    type Error = UserError;

    fn id(&self) -> UserKey {
        self.key()
    }

    /// Creates a new User from registration parameters.
    ///
    /// # Notes
    /// When no name is given, one is derived from the email's local part.
    fn from_create_params(key: UserKey, params: UserCreate) -> Result<Self, UserError> {
        if !looks_like_email(&params.email) {
            return Err(UserError::ValidationError(format!("invalid email: {}", params.email)));
        }
        let name = match params.name {
            Some(name) if name.trim().is_empty() => {
                return Err(UserError::ValidationError("name must not be empty".to_string()))
            }
            Some(name) => name.trim().to_string(),
            None => display_name_from_email(&params.email),
        };

        let now = Utc::now();
        Ok(Self {
            email: key.email,
            role: key.role,
            name,
            created_at: now,
            updated_at: now,
        })
    }

    /// Updates the user's display name.
    fn on_update(&mut self, patch: UserPatch) -> Result<(), UserError> {
        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(UserError::ValidationError("name must not be empty".to_string()));
            }
            self.name = name.trim().to_string();
            self.updated_at = Utc::now();
        }
        Ok(())
    }

    /// No custom actions are defined for users.
    fn handle_action(&mut self, _action: ()) -> Result<(), UserError> {
        Ok(())
    }
}
