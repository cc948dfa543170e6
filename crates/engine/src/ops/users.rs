use chrono::Utc;
use sea_orm::{QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, User,
    password::{hash_password, verify_password},
    users,
    util::normalize_optional_text,
};

use super::{Engine, with_tx};

fn normalize_email(email: &str) -> ResultEngine<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(EngineError::Validation("email is required".to_string()));
    }
    Ok(email)
}

impl Engine {
    /// Create a password account. Emails are unique, compared lower-cased.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> ResultEngine<User> {
        let email = normalize_email(email)?;
        if password.is_empty() {
            return Err(EngineError::Validation("password is required".to_string()));
        }
        let name = normalize_optional_text(name);
        with_tx!(self, |db_tx| {
            let exists = users::Entity::find()
                .filter(users::Column::Email.eq(email.clone()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(email));
            }
            let model = users::new_active(email, hash_password(password), name, Utc::now())
                .insert(&db_tx)
                .await?;
            tracing::info!(user_id = %model.id, "user registered");
            User::try_from(model)
        })
    }

    /// Check a password login. Unknown emails and wrong passwords fail the
    /// same way.
    pub async fn login(&self, email: &str, password: &str) -> ResultEngine<User> {
        let email = email.trim().to_lowercase();
        let model = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.database)
            .await?
            .ok_or(EngineError::InvalidCredentials)?;
        if !verify_password(password, &model.password_hash) {
            return Err(EngineError::InvalidCredentials);
        }
        User::try_from(model)
    }

    pub async fn user(&self, user_id: &str) -> ResultEngine<User> {
        users::Entity::find_by_id(user_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user".to_string()))
            .and_then(User::try_from)
    }

    /// Find the user owning a verified external identity, creating one with
    /// an unusable random password when the email is new.
    pub async fn user_for_external_identity(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> ResultEngine<User> {
        let email = normalize_email(email)?;
        with_tx!(self, |db_tx| {
            if let Some(model) = users::Entity::find()
                .filter(users::Column::Email.eq(email.clone()))
                .one(&db_tx)
                .await?
            {
                return User::try_from(model);
            }
            let name = normalize_optional_text(name).or_else(|| Some(email.clone()));
            let random = Uuid::new_v4().simple().to_string();
            let model = users::new_active(email, hash_password(&random), name, Utc::now())
                .insert(&db_tx)
                .await?;
            tracing::info!(user_id = %model.id, "user created from external identity");
            User::try_from(model)
        })
    }
}
