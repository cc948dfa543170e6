use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Gbp,
    Inr,
    Jpy,
    Chf,
    Cad,
    Aud,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
}

pub mod auth {
    use super::*;

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Role {
        #[default]
        User,
        Admin,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Register {
        pub email: String,
        pub password: String,
        pub name: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Login {
        pub email: String,
        pub password: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Refresh {
        pub refresh_token: String,
    }

    /// Google Identity Services credential (an ID token).
    #[derive(Debug, Serialize, Deserialize)]
    pub struct Google {
        pub credential: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Forgot {
        pub email: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Ok {
        pub ok: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserView {
        pub id: Uuid,
        pub email: String,
        pub name: Option<String>,
        pub role: Role,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Session {
        pub user: UserView,
        pub access_token: String,
        pub refresh_token: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccessToken {
        pub access_token: String,
    }
}

pub mod account {
    use super::*;

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum AccountKind {
        #[default]
        Bank,
        Cash,
        CreditCard,
        Other,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountNew {
        pub name: String,
        pub kind: Option<AccountKind>,
        pub currency: Option<Currency>,
        #[serde(default)]
        pub opening_balance_minor: i64,
        pub color: Option<String>,
        pub icon: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct AccountUpdate {
        pub name: Option<String>,
        pub kind: Option<AccountKind>,
        pub currency: Option<Currency>,
        pub opening_balance_minor: Option<i64>,
        pub color: Option<String>,
        pub icon: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountView {
        pub id: Uuid,
        pub name: String,
        pub kind: AccountKind,
        pub currency: Currency,
        pub opening_balance_minor: i64,
        /// Opening balance plus income minus expenses.
        pub balance_minor: i64,
        pub color: Option<String>,
        pub icon: Option<String>,
        pub created_at: DateTime<Utc>,
    }
}

pub mod category {
    use super::*;

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum CategoryKind {
        Income,
        #[default]
        Expense,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryNew {
        pub name: String,
        pub kind: Option<CategoryKind>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryView {
        pub id: Uuid,
        pub name: String,
        pub kind: CategoryKind,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Income,
        Expense,
        Transfer,
    }

    /// Query string of `GET /transactions`.
    ///
    /// `start` and `end` accept RFC 3339 or `YYYY-MM-DD`; a bare `end` date
    /// covers the whole day.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionQuery {
        pub start: Option<String>,
        pub end: Option<String>,
        pub account_id: Option<Uuid>,
        pub category_id: Option<Uuid>,
        pub kind: Option<TransactionKind>,
        pub limit: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub account_id: Uuid,
        pub kind: TransactionKind,
        pub amount_minor: i64,
        pub currency: Option<Currency>,
        pub category_id: Option<Uuid>,
        pub method: Option<String>,
        pub note: Option<String>,
        pub occurred_at: Option<DateTime<Utc>>,
    }

    /// Partial update. `clear_category` drops the category.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionUpdate {
        pub account_id: Option<Uuid>,
        pub kind: Option<TransactionKind>,
        pub amount_minor: Option<i64>,
        pub currency: Option<Currency>,
        pub category_id: Option<Uuid>,
        #[serde(default)]
        pub clear_category: bool,
        pub method: Option<String>,
        pub note: Option<String>,
        pub occurred_at: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub kind: TransactionKind,
        pub amount_minor: i64,
        pub currency: Currency,
        pub account_id: Uuid,
        pub category_id: Option<Uuid>,
        pub category_name: Option<String>,
        pub method: Option<String>,
        pub note: Option<String>,
        pub occurred_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionList {
        pub transactions: Vec<TransactionView>,
    }

    /// Response of `POST /transactions/import`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ImportResult {
        pub imported: usize,
        /// The user's latest transactions, newest first, at most 50.
        pub transactions: Vec<TransactionView>,
    }
}

pub mod budget {
    use super::*;

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum BudgetPeriod {
        Weekly,
        #[default]
        Monthly,
        Yearly,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetNew {
        pub name: String,
        pub category_id: Option<Uuid>,
        #[serde(default)]
        pub amount_minor: i64,
        pub currency: Option<Currency>,
        pub period: Option<BudgetPeriod>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BudgetUpdate {
        pub name: Option<String>,
        pub category_id: Option<Uuid>,
        #[serde(default)]
        pub clear_category: bool,
        pub amount_minor: Option<i64>,
        pub currency: Option<Currency>,
        pub period: Option<BudgetPeriod>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetView {
        pub id: Uuid,
        pub name: String,
        pub category_id: Option<Uuid>,
        pub amount_minor: i64,
        pub currency: Currency,
        pub period: BudgetPeriod,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetStatusView {
        pub budget: BudgetView,
        pub spent_minor: i64,
        pub remaining_minor: i64,
        pub period_start: DateTime<Utc>,
        pub period_end: DateTime<Utc>,
    }
}

pub mod report {
    use super::*;

    /// Query string of the report endpoints.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ReportQuery {
        /// Export format, `csv` or `pdf`. Ignored by the summary.
        #[serde(rename = "type")]
        pub format: Option<String>,
        pub start: Option<String>,
        pub end: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryTotal {
        pub category_id: Uuid,
        pub name: String,
        pub expense_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Summary {
        pub income_minor: i64,
        pub expense_minor: i64,
        pub net_minor: i64,
        pub by_category: Vec<CategoryTotal>,
    }
}

pub mod stats {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Statistic {
        pub income_minor: i64,
        pub expense_minor: i64,
        pub balance_minor: i64,
    }
}

pub mod assistant {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Ask {
        pub query: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Reply {
        pub reply: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GoalInput {
        pub goal_name: String,
        #[serde(default)]
        pub current_savings: f64,
        pub target_amount: f64,
        pub monthly_income: f64,
        pub monthly_expenses: f64,
        pub spending_habits: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Suggestions {
        pub suggestions: Vec<String>,
    }
}
