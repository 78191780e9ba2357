use rand::RngCore;
use thiserror::Error;

use crate::domain::{
    entities::user::User,
    repositories::user::{UserRepository, UserRepositoryError},
};

#[derive(Debug, Error)]
pub enum UserError {
    #[error("user not found")]
    UserNotFound,
    #[error("incorrect password")]
    WrongPassword,
    #[error("email already registered")]
    EmailTaken,
    #[error("no display name for user")]
    NameNotFound,
    #[error("repository error: {0}")]
    RepositoryError(#[from] UserRepositoryError),
    #[error("other: {0}")]
    Other(String),
}

#[derive(Clone)]
pub struct UserService<R>
where
    R: UserRepository,
{
    repo: R,
}

impl<R> UserService<R>
where
    R: UserRepository,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub async fn create_user(&self, email: &str, password: &str) -> Result<i64, UserError> {
        let hash = hash_password(password)?;

        let user = User {
            email: email.to_string(),
            password: hash,
            ..Default::default()
        };

        match self.repo.insert_user(user).await {
            Ok(id) => Ok(id),
            Err(UserRepositoryError::AlreadyExists) => Err(UserError::EmailTaken),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn verify_password(&self, email: &str, password: &str) -> Result<User, UserError> {
        let user = match self.repo.get_user_by_email(email.to_owned()).await {
            Ok(user) => user,
            Err(UserRepositoryError::NotFound) => return Err(UserError::UserNotFound),
            Err(e) => return Err(e.into()),
        };

        if !argon2::verify_encoded(&user.password, password.as_bytes())
            .map_err(|e| UserError::Other(format!("{e}")))?
        {
            return Err(UserError::WrongPassword);
        }

        Ok(user)
    }

    pub async fn fetch_user_by_id(&self, user_id: i64) -> Result<User, UserError> {
        match self.repo.get_user_by_id(user_id).await {
            Ok(user) => Ok(user),
            Err(UserRepositoryError::NotFound) => Err(UserError::UserNotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// The user's display name; `NameNotFound` distinguishes a missing
    /// row from a failed lookup so the auth callback can provision one.
    pub async fn display_name(&self, user_id: i64) -> Result<String, UserError> {
        match self.repo.get_display_name(user_id).await {
            Ok(name) => Ok(name),
            Err(UserRepositoryError::NotFound) => Err(UserError::NameNotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Inserts or replaces the display name row.
    pub async fn set_display_name(&self, user_id: i64, name: &str) -> Result<(), UserError> {
        match self.repo.update_display_name(user_id, name.to_string()).await {
            Ok(0) => Ok(self
                .repo
                .insert_display_name(user_id, name.to_string())
                .await?),
            Ok(_) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn update_account(
        &self,
        user_id: i64,
        email: &str,
        user_name: &str,
    ) -> Result<(), UserError> {
        debug!("update_account for user {user_id}");

        let affected = match self.repo.update_email(user_id, email.to_string()).await {
            Ok(affected) => affected,
            Err(UserRepositoryError::AlreadyExists) => return Err(UserError::EmailTaken),
            Err(e) => return Err(e.into()),
        };
        if affected == 0 {
            return Err(UserError::UserNotFound);
        }

        self.set_display_name(user_id, user_name).await
    }
}

fn hash_password(password: &str) -> Result<String, UserError> {
    let mut salt: [u8; 32] = [0; 32];
    rand::rng().fill_bytes(&mut salt);

    let config = argon2::Config::default();
    argon2::hash_encoded(password.as_bytes(), &salt, &config)
        .map_err(|e| UserError::Other(format!("{e}")))
}
