//! Transaction primitives.
//!
//! A `Transaction` is a single income, expense or transfer booked on one
//! account. Amounts are always strictly positive; the kind carries the sign.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
    Transfer,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Transfer => "transfer",
        }
    }

    /// Effect of an amount of this kind on an account balance.
    pub fn signed(self, amount_minor: i64) -> i64 {
        match self {
            Self::Income => amount_minor,
            Self::Expense => -amount_minor,
            Self::Transfer => 0,
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "transfer" => Ok(Self::Transfer),
            other => Err(EngineError::Validation(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

/// Parse a list-filter bound: RFC 3339, or `YYYY-MM-DD`.
///
/// A bare date used as an inclusive end covers the whole day.
pub fn parse_range_bound(value: &str, end_of_day: bool) -> ResultEngine<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    let day = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| EngineError::Validation(format!("invalid date: {value}")))?;
    let start = day
        .and_hms_opt(0, 0, 0)
        .map(|n| Utc.from_utc_datetime(&n))
        .ok_or_else(|| EngineError::Validation(format!("invalid date: {value}")))?;
    Ok(if end_of_day {
        start + Duration::days(1) - Duration::seconds(1)
    } else {
        start
    })
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub account_id: Uuid,
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub currency: Currency,
    pub category_id: Option<Uuid>,
    /// Resolved name of `category_id`, filled when listing.
    pub category_name: Option<String>,
    pub method: Option<String>,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        account_id: Uuid,
        kind: TransactionKind,
        amount_minor: i64,
        currency: Currency,
        occurred_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            account_id,
            kind,
            amount_minor,
            currency,
            category_id: None,
            category_name: None,
            method: None,
            note: None,
            occurred_at,
        })
    }

    pub(crate) fn to_active(&self, user_id: &str, created_at: DateTime<Utc>) -> ActiveModel {
        ActiveModel {
            id: ActiveValue::Set(self.id.to_string()),
            user_id: ActiveValue::Set(user_id.to_string()),
            account_id: ActiveValue::Set(self.account_id.to_string()),
            kind: ActiveValue::Set(self.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(self.amount_minor),
            currency: ActiveValue::Set(self.currency.code().to_string()),
            category_id: ActiveValue::Set(self.category_id.map(|id| id.to_string())),
            method: ActiveValue::Set(self.method.clone()),
            note: ActiveValue::Set(self.note.clone()),
            occurred_at: ActiveValue::Set(self.occurred_at),
            created_at: ActiveValue::Set(created_at),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub account_id: String,
    pub kind: String,
    pub amount_minor: i64,
    pub currency: String,
    pub category_id: Option<String>,
    pub method: Option<String>,
    pub note: Option<String>,
    pub occurred_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Accounts,
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Categories,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<(Model, Option<super::categories::Model>)> for Transaction {
    type Error = EngineError;

    fn try_from(
        (model, category): (Model, Option<super::categories::Model>),
    ) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            account_id: parse_uuid(&model.account_id, "account")?,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount_minor: model.amount_minor,
            currency: Currency::try_from(model.currency.as_str()).unwrap_or_default(),
            category_id: model
                .category_id
                .as_deref()
                .and_then(|s| Uuid::parse_str(s).ok()),
            category_name: category.map(|c| c.name),
            method: model.method,
            note: model.note,
            occurred_at: model.occurred_at,
        })
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Transaction::try_from((model, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_non_positive_amounts() {
        let err = Transaction::new(
            Uuid::new_v4(),
            TransactionKind::Expense,
            0,
            Currency::Usd,
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidAmount("amount_minor must be > 0".to_string())
        );
    }

    #[test]
    fn range_bounds_accept_dates_and_timestamps() {
        let start = parse_range_bound("2024-03-01", false).unwrap();
        assert_eq!(start.to_rfc3339(), "2024-03-01T00:00:00+00:00");
        let end = parse_range_bound("2024-03-31", true).unwrap();
        assert_eq!(end.to_rfc3339(), "2024-03-31T23:59:59+00:00");
        let exact = parse_range_bound("2024-03-31T12:00:00+01:00", true).unwrap();
        assert_eq!(exact.to_rfc3339(), "2024-03-31T11:00:00+00:00");
        assert!(parse_range_bound("March", false).is_err());
    }

    #[test]
    fn kind_sign_applies_to_balance() {
        assert_eq!(TransactionKind::Income.signed(500), 500);
        assert_eq!(TransactionKind::Expense.signed(500), -500);
        assert_eq!(TransactionKind::Transfer.signed(500), 0);
    }
}
