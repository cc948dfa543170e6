use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, QueryFilter, QueryOrder, prelude::*,
};
use uuid::Uuid;

use crate::{Account, Category, EngineError, ResultEngine};

mod accounts;
mod assistant;
mod budgets;
mod categories;
mod import;
mod reports;
mod transactions;
mod users;

pub use accounts::{AccountBalance, AccountUpdate, NewAccount};
pub use budgets::{BudgetUpdate, NewBudget};
pub use reports::Stats;
pub use transactions::{NewTransaction, TransactionListFilter, TransactionUpdate};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// The user's accounts, oldest first. Ties on creation time are broken by
    /// id so the first account is stable.
    async fn ordered_accounts<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
    ) -> ResultEngine<Vec<Account>> {
        crate::accounts::Entity::find()
            .filter(crate::accounts::Column::UserId.eq(user_id))
            .order_by_asc(crate::accounts::Column::CreatedAt)
            .order_by_asc(crate::accounts::Column::Id)
            .all(db)
            .await?
            .into_iter()
            .map(Account::try_from)
            .collect()
    }

    async fn user_categories<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
    ) -> ResultEngine<Vec<Category>> {
        crate::categories::Entity::find()
            .filter(crate::categories::Column::UserId.eq(user_id))
            .order_by_asc(crate::categories::Column::Name)
            .all(db)
            .await?
            .into_iter()
            .map(Category::try_from)
            .collect()
    }

    /// Load an account owned by `user_id`. Foreign ids look exactly like
    /// missing ones.
    async fn require_account(
        &self,
        db_tx: &DatabaseTransaction,
        account_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<crate::accounts::Model> {
        crate::accounts::Entity::find_by_id(account_id.to_string())
            .filter(crate::accounts::Column::UserId.eq(user_id))
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("account".to_string()))
    }

    async fn require_category(
        &self,
        db_tx: &DatabaseTransaction,
        category_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<crate::categories::Model> {
        crate::categories::Entity::find_by_id(category_id.to_string())
            .filter(crate::categories::Column::UserId.eq(user_id))
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("category".to_string()))
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}
