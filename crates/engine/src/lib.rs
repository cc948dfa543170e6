//! Domain model and business operations for Fintrack.
//!
//! All operations live on [`Engine`] and are scoped by the caller's user id.
//! Pure building blocks (the CSV importer, assistant routing, report
//! rendering) are exposed as modules so they can be used without a database.

pub use accounts::{Account, AccountKind};
pub use assistant::{AssistantReply, FALLBACK_REPLY, Intent, SavingsGoal};
pub use budgets::{Budget, BudgetPeriod, BudgetStatus};
pub use categories::{Category, CategoryKind};
pub use currency::Currency;
pub use error::EngineError;
pub use import::ImportOutcome;
pub use money::Money;
pub use ops::{
    AccountBalance, AccountUpdate, BudgetUpdate, Engine, EngineBuilder, NewAccount, NewBudget,
    NewTransaction, Stats, TransactionListFilter, TransactionUpdate,
};
pub use report::{CategoryTotal, ExportFormat, Summary};
pub use transactions::{Transaction, TransactionKind, parse_range_bound};
pub use users::{Role, User};

mod accounts;
pub mod assistant;
mod budgets;
mod categories;
mod currency;
mod error;
pub mod import;
mod money;
mod ops;
pub mod password;
pub mod report;
mod transactions;
mod users;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;
