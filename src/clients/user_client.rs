use tracing::{debug, info, instrument};

use crate::actor_framework::ResourceClient;
use crate::domain::{display_name_from_email, Role, User, UserCreate, UserKey, UserPatch};
use crate::user_actor::UserError;

/// Client for interacting with the User actor.
#[derive(Clone)]
pub struct UserClient {
    inner: ResourceClient<User>,
}

crate::impl_basic_client!(UserClient, User, UserError, user);

impl UserClient {
    /// Registers a new (email, role) pair; a second registration of the same pair fails.
    #[instrument(skip(self))]
    pub async fn register(&self, email: &str, role: Role, name: Option<&str>) -> Result<User, UserError> {
        debug!("Sending request");
        let params = UserCreate {
            email: email.to_string(),
            role,
            name: name.map(str::to_string),
        };
        let user = self.inner.create(params).await?;
        info!(user_name = %user.name, "User registered");
        Ok(user)
    }

    /// Returns the existing user for (email, role), registering one on first login.
    #[instrument(skip(self))]
    pub async fn login_or_create(&self, email: &str, role: Role) -> Result<User, UserError> {
        if let Some(user) = self.get_user(UserKey::new(email, role)).await? {
            return Ok(user);
        }
        match self.register(email, role, None).await {
            // Lost a race with a concurrent first login.
            Err(UserError::AlreadyExists(_)) => self
                .get_user(UserKey::new(email, role))
                .await?
                .ok_or_else(|| UserError::NotFound(UserKey::new(email, role).to_string())),
            other => other,
        }
    }

    /// Logs in by email alone, picking the oldest role registered for it.
    #[instrument(skip(self))]
    pub async fn login_by_email(&self, email: &str) -> Result<User, UserError> {
        self.find_by_email(email)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| UserError::NotFound(format!("{email} (please sign up first)")))
    }

    /// Every role registered for `email`, oldest first.
    #[instrument(skip(self))]
    pub async fn find_by_email(&self, email: &str) -> Result<Vec<User>, UserError> {
        let mut users: Vec<User> = self
            .list_users()
            .await?
            .into_iter()
            .filter(|u| u.email == email)
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.role.as_str().cmp(b.role.as_str())));
        Ok(users)
    }

    /// One page of the directory, ordered by registration time.
    #[instrument(skip(self))]
    pub async fn users_page(&self, skip: usize, limit: usize) -> Result<Vec<User>, UserError> {
        let mut users = self.list_users().await?;
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.email.cmp(&b.email)));
        Ok(users.into_iter().skip(skip).take(limit).collect())
    }

    #[instrument(skip(self))]
    pub async fn rename_user(&self, key: UserKey, name: &str) -> Result<User, UserError> {
        debug!("Sending request");
        let patch = UserPatch { name: Some(name.to_string()) };
        Ok(self.inner.update(key, patch).await?)
    }

    /// Registered name for (email, role), or one derived from the email.
    #[instrument(skip(self))]
    pub async fn display_name(&self, email: &str, role: Role) -> Result<String, UserError> {
        Ok(self
            .get_user(UserKey::new(email, role))
            .await?
            .map(|u| u.name)
            .unwrap_or_else(|| display_name_from_email(email)))
    }
}
