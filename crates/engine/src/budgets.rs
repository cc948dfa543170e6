use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Currency, EngineError, ResultEngine,
    util::{current_month_bounds, parse_uuid},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetPeriod {
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

impl BudgetPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    /// Inclusive bounds of the period containing `now`.
    ///
    /// Weeks start on Monday.
    pub fn current_range(self, now: DateTime<Utc>) -> ResultEngine<(DateTime<Utc>, DateTime<Utc>)> {
        match self {
            Self::Monthly => current_month_bounds(now),
            Self::Weekly => {
                let offset = i64::from(now.weekday().num_days_from_monday());
                let day = now.date_naive() - Duration::days(offset);
                let start = midnight(day)?;
                Ok((start, start + Duration::days(7) - Duration::seconds(1)))
            }
            Self::Yearly => {
                let start = NaiveDate::from_ymd_opt(now.year(), 1, 1)
                    .ok_or_else(|| EngineError::Validation("invalid year".to_string()))
                    .and_then(midnight)?;
                let next = NaiveDate::from_ymd_opt(now.year() + 1, 1, 1)
                    .ok_or_else(|| EngineError::Validation("invalid year".to_string()))
                    .and_then(midnight)?;
                Ok((start, next - Duration::seconds(1)))
            }
        }
    }
}

fn midnight(day: NaiveDate) -> ResultEngine<DateTime<Utc>> {
    day.and_hms_opt(0, 0, 0)
        .map(|n| Utc.from_utc_datetime(&n))
        .ok_or_else(|| EngineError::Validation(format!("invalid date {day}")))
}

impl TryFrom<&str> for BudgetPeriod {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(EngineError::Validation(format!(
                "invalid budget period: {other}"
            ))),
        }
    }
}

/// A spending limit, either on a category or on a merchant name.
///
/// Budgets without a category track expenses whose note equals the budget
/// name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Budget {
    pub id: Uuid,
    pub name: String,
    pub category_id: Option<Uuid>,
    pub amount_minor: i64,
    pub currency: Currency,
    pub period: BudgetPeriod,
    pub created_at: DateTime<Utc>,
}

/// A budget together with what was spent against it in its current period.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BudgetStatus {
    pub budget: Budget,
    pub spent_minor: i64,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

impl BudgetStatus {
    pub fn remaining_minor(&self) -> i64 {
        self.budget.amount_minor - self.spent_minor
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub category_id: Option<String>,
    pub amount_minor: i64,
    pub currency: String,
    pub period: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Budget {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: parse_uuid(&model.id, "budget")?,
            name: model.name,
            category_id: model
                .category_id
                .as_deref()
                .and_then(|s| Uuid::parse_str(s).ok()),
            amount_minor: model.amount_minor,
            currency: Currency::try_from(model.currency.as_str()).unwrap_or_default(),
            period: BudgetPeriod::try_from(model.period.as_str()).unwrap_or_default(),
            created_at: model.created_at,
        })
    }
}

impl Budget {
    pub(crate) fn to_active(&self, user_id: &str) -> ActiveModel {
        ActiveModel {
            id: ActiveValue::Set(self.id.to_string()),
            user_id: ActiveValue::Set(user_id.to_string()),
            name: ActiveValue::Set(self.name.clone()),
            category_id: ActiveValue::Set(self.category_id.map(|id| id.to_string())),
            amount_minor: ActiveValue::Set(self.amount_minor),
            currency: ActiveValue::Set(self.currency.code().to_string()),
            period: ActiveValue::Set(self.period.as_str().to_string()),
            created_at: ActiveValue::Set(self.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(rfc: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn weekly_range_starts_on_monday() {
        // 2024-05-16 is a Thursday.
        let (start, end) = BudgetPeriod::Weekly
            .current_range(at("2024-05-16T10:30:00Z"))
            .unwrap();
        assert_eq!(start, at("2024-05-13T00:00:00Z"));
        assert_eq!(end, at("2024-05-19T23:59:59Z"));
    }

    #[test]
    fn monthly_and_yearly_ranges() {
        let now = at("2024-02-10T08:00:00Z");
        let (start, end) = BudgetPeriod::Monthly.current_range(now).unwrap();
        assert_eq!(start, at("2024-02-01T00:00:00Z"));
        assert_eq!(end, at("2024-02-29T23:59:59Z"));

        let (start, end) = BudgetPeriod::Yearly.current_range(now).unwrap();
        assert_eq!(start, at("2024-01-01T00:00:00Z"));
        assert_eq!(end, at("2024-12-31T23:59:59Z"));
    }

    #[test]
    fn unknown_period_is_rejected() {
        assert!(BudgetPeriod::try_from("daily").is_err());
        assert_eq!(BudgetPeriod::default(), BudgetPeriod::Monthly);
    }
}
