use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{
    Category, CategoryKind, EngineError, ResultEngine, budgets, categories, transactions,
    util::{name_key, normalize_required_name},
};

use super::{Engine, with_tx};

impl Engine {
    /// Categories of the user, by name.
    pub async fn categories(&self, user_id: &str) -> ResultEngine<Vec<Category>> {
        self.user_categories(&self.database, user_id).await
    }

    /// Create a category. Names are unique per user, ignoring case.
    pub async fn new_category(
        &self,
        user_id: &str,
        name: &str,
        kind: CategoryKind,
    ) -> ResultEngine<Category> {
        let name = normalize_required_name(name, "category")?;
        with_tx!(self, |db_tx| {
            let key = name_key(&name);
            let taken = self
                .user_categories(&db_tx, user_id)
                .await?
                .iter()
                .any(|c| name_key(&c.name) == key);
            if taken {
                return Err(EngineError::ExistingKey(name));
            }
            let category = Category {
                id: Uuid::new_v4(),
                name,
                kind,
                created_at: Utc::now(),
            };
            categories::ActiveModel {
                id: ActiveValue::Set(category.id.to_string()),
                user_id: ActiveValue::Set(user_id.to_string()),
                name: ActiveValue::Set(category.name.clone()),
                kind: ActiveValue::Set(kind.as_str().to_string()),
                created_at: ActiveValue::Set(category.created_at),
            }
            .insert(&db_tx)
            .await?;
            Ok(category)
        })
    }

    /// Delete a category. Transactions and budgets pointing at it become
    /// uncategorised.
    pub async fn delete_category(&self, user_id: &str, category_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self.require_category(&db_tx, category_id, user_id).await?;
            transactions::Entity::update_many()
                .col_expr(
                    transactions::Column::CategoryId,
                    Expr::value(Option::<String>::None),
                )
                .filter(transactions::Column::CategoryId.eq(model.id.clone()))
                .exec(&db_tx)
                .await?;
            budgets::Entity::update_many()
                .col_expr(
                    budgets::Column::CategoryId,
                    Expr::value(Option::<String>::None),
                )
                .filter(budgets::Column::CategoryId.eq(model.id.clone()))
                .exec(&db_tx)
                .await?;
            categories::Entity::delete_by_id(model.id).exec(&db_tx).await?;
            Ok(())
        })
    }
}
