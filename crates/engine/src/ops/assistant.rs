use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;

use crate::{
    AssistantReply, BudgetPeriod, EngineError, Intent, Money, NewBudget, ResultEngine,
    Transaction, TransactionKind, TransactionListFilter,
    assistant::EXPORT_LINK,
    util::{current_month_bounds, month_bounds, name_key},
};

use super::Engine;

const RECENT: u64 = 20;

fn total<'a>(transactions: impl Iterator<Item = &'a Transaction>) -> Decimal {
    transactions
        .map(|tx| Money::new(tx.amount_minor, tx.currency).to_decimal())
        .sum()
}

fn total_of(transactions: &[Transaction], kind: TransactionKind) -> Decimal {
    total(transactions.iter().filter(|tx| tx.kind == kind))
}

fn amount(value: Decimal) -> String {
    format!("{value:.2}")
}

fn day(tx: &Transaction) -> String {
    tx.occurred_at.format("%Y-%m-%d").to_string()
}

impl Engine {
    /// Answer an assistant query from the user's own data.
    ///
    /// Returns [`AssistantReply::Fallback`] when no rule matches; the caller
    /// is expected to ask a text generator instead.
    pub async fn answer(
        &self,
        user_id: &str,
        query: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<AssistantReply> {
        if query.trim().is_empty() {
            return Err(EngineError::Validation("query required".to_string()));
        }
        let intent = Intent::route(query);
        tracing::debug!(user_id, ?intent, "assistant intent");

        let reply = match intent {
            Intent::CategorySpend { name } => {
                let (start, end) = current_month_bounds(now)?;
                let expenses = self
                    .between(user_id, start, end, Some(TransactionKind::Expense))
                    .await?;
                let key = name_key(&name);
                let same = |value: Option<&String>| value.is_some_and(|v| name_key(v) == key);
                let spent = total(
                    expenses
                        .iter()
                        .filter(|tx| same(tx.note.as_ref()) || same(tx.category_name.as_ref())),
                );
                format!("You spent {} this month on {name}.", amount(spent))
            }
            Intent::Savings { month } => {
                let (start, end) = match month {
                    Some(month) => month_bounds(now.year(), month)?,
                    None => current_month_bounds(now)?,
                };
                let txs = self.between(user_id, start, end, None).await?;
                let saved = total_of(&txs, TransactionKind::Income)
                    - total_of(&txs, TransactionKind::Expense);
                format!("Savings for the period: {}.", amount(saved))
            }
            Intent::CreateBudget { name } => {
                let currency = self
                    .ordered_accounts(&self.database, user_id)
                    .await?
                    .first()
                    .map(|a| a.currency)
                    .unwrap_or_default();
                let budget = self
                    .new_budget(
                        user_id,
                        NewBudget {
                            name,
                            category_id: None,
                            amount_minor: 0,
                            currency: Some(currency),
                            period: Some(BudgetPeriod::Monthly),
                        },
                    )
                    .await?;
                format!(
                    "Created budget '{}'. You can set its amount in Budgets.",
                    budget.name
                )
            }
            Intent::ListBudgets => {
                let budgets = self.budgets(user_id).await?;
                if budgets.is_empty() {
                    "You have no budgets yet.".to_string()
                } else {
                    let lines: Vec<String> = budgets
                        .iter()
                        .map(|b| {
                            format!(
                                "{} • {} {} • {}",
                                b.name,
                                Money::new(b.amount_minor, b.currency).amount_string(),
                                b.currency,
                                b.period.as_str().to_uppercase()
                            )
                        })
                        .collect();
                    format!(
                        "Here are your budgets (amount • currency • period):\n\n{}",
                        lines.join("\n")
                    )
                }
            }
            Intent::MonthSummary => {
                let (start, end) = current_month_bounds(now)?;
                let txs = self.between(user_id, start, end, None).await?;
                let income = total_of(&txs, TransactionKind::Income);
                let expense = total_of(&txs, TransactionKind::Expense);
                format!(
                    "This month: Income {}, Expenses {}, Savings {}.",
                    amount(income),
                    amount(expense),
                    amount(income - expense)
                )
            }
            Intent::ExportReport => format!("Here is your PDF report: {EXPORT_LINK}"),
            Intent::RecentTransactions => {
                let txs = self.latest(user_id, None).await?;
                if txs.is_empty() {
                    "No transactions yet.".to_string()
                } else {
                    let lines: Vec<String> = txs
                        .iter()
                        .map(|tx| {
                            format!(
                                "{} • {} • {} • {}",
                                day(tx),
                                tx.kind.as_str().to_uppercase(),
                                tx.note.as_deref().unwrap_or("—"),
                                Money::new(tx.amount_minor, tx.currency)
                            )
                        })
                        .collect();
                    format!("Latest {} transactions:\n\n{}", txs.len(), lines.join("\n"))
                }
            }
            Intent::RecentExpenses => {
                let txs = self.latest(user_id, Some(TransactionKind::Expense)).await?;
                let lines: Vec<String> = txs
                    .iter()
                    .map(|tx| {
                        format!(
                            "{} • {} • {}",
                            day(tx),
                            tx.note.as_deref().unwrap_or("Expense"),
                            Money::new(tx.amount_minor, tx.currency)
                        )
                    })
                    .collect();
                let body = if lines.is_empty() {
                    "No expenses found.".to_string()
                } else {
                    lines.join("\n")
                };
                format!(
                    "You have {} recent expenses totaling {}.\n\n{body}",
                    txs.len(),
                    amount(total(txs.iter()))
                )
            }
            Intent::Open => return Ok(AssistantReply::Fallback),
        };
        Ok(AssistantReply::Answer(reply))
    }

    async fn between(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        kind: Option<TransactionKind>,
    ) -> ResultEngine<Vec<Transaction>> {
        let filter = TransactionListFilter {
            start: Some(start),
            end: Some(end),
            kind,
            ..TransactionListFilter::default()
        };
        self.transactions(user_id, &filter).await
    }

    async fn latest(
        &self,
        user_id: &str,
        kind: Option<TransactionKind>,
    ) -> ResultEngine<Vec<Transaction>> {
        let filter = TransactionListFilter {
            kind,
            limit: Some(RECENT),
            ..TransactionListFilter::default()
        };
        self.transactions(user_id, &filter).await
    }
}
