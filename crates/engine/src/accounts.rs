//! The module contains the `Account` struct and its table.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    #[default]
    Bank,
    Cash,
    CreditCard,
    Other,
}

impl AccountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bank => "bank",
            Self::Cash => "cash",
            Self::CreditCard => "credit_card",
            Self::Other => "other",
        }
    }
}

impl TryFrom<&str> for AccountKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "bank" => Ok(Self::Bank),
            "cash" => Ok(Self::Cash),
            "credit_card" => Ok(Self::CreditCard),
            "other" => Ok(Self::Other),
            other => Err(EngineError::Validation(format!(
                "invalid account kind: {other}"
            ))),
        }
    }
}

/// An account.
///
/// An account is where money is kept: a bank account, a cash wallet or a
/// credit card. Imported and manual transactions always land on an account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub kind: AccountKind,
    pub currency: Currency,
    pub opening_balance_minor: i64,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub kind: String,
    pub currency: String,
    pub opening_balance_minor: i64,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Account {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: parse_uuid(&model.id, "account")?,
            name: model.name,
            kind: AccountKind::try_from(model.kind.as_str()).unwrap_or_default(),
            currency: Currency::try_from(model.currency.as_str()).unwrap_or_default(),
            opening_balance_minor: model.opening_balance_minor,
            color: model.color,
            icon: model.icon,
            created_at: model.created_at,
        })
    }
}

impl Account {
    pub(crate) fn to_active(&self, user_id: &str) -> ActiveModel {
        ActiveModel {
            id: ActiveValue::Set(self.id.to_string()),
            user_id: ActiveValue::Set(user_id.to_string()),
            name: ActiveValue::Set(self.name.clone()),
            kind: ActiveValue::Set(self.kind.as_str().to_string()),
            currency: ActiveValue::Set(self.currency.code().to_string()),
            opening_balance_minor: ActiveValue::Set(self.opening_balance_minor),
            color: ActiveValue::Set(self.color.clone()),
            icon: ActiveValue::Set(self.icon.clone()),
            created_at: ActiveValue::Set(self.created_at),
        }
    }
}
