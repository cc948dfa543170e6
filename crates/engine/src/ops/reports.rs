use chrono::{DateTime, Utc};

use crate::{
    ExportFormat, ResultEngine, Summary, TransactionListFilter, money::total_minor, report,
};

use super::Engine;

/// Dashboard totals over every transaction of the user.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub income_minor: i64,
    pub expense_minor: i64,
    /// Sum of all account balances.
    pub balance_minor: i64,
}

fn range(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> TransactionListFilter {
    TransactionListFilter {
        start,
        end,
        ..TransactionListFilter::default()
    }
}

impl Engine {
    /// Income, expense and per-category totals between `start` and `end`.
    pub async fn summary(
        &self,
        user_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> ResultEngine<Summary> {
        let transactions = self.transactions(user_id, &range(start, end)).await?;
        Summary::from_transactions(&transactions)
    }

    /// Render the user's transactions between `start` and `end`, newest
    /// first.
    pub async fn export(
        &self,
        user_id: &str,
        format: ExportFormat,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> ResultEngine<Vec<u8>> {
        let transactions = self.transactions(user_id, &range(start, end)).await?;
        tracing::debug!(user_id, rows = transactions.len(), ?format, "rendering export");
        match format {
            ExportFormat::Csv => report::render_csv(&transactions),
            ExportFormat::Pdf => report::render_pdf(&transactions),
        }
    }

    pub async fn stats(&self, user_id: &str) -> ResultEngine<Stats> {
        let transactions = self.transactions(user_id, &range(None, None)).await?;
        let summary = Summary::from_transactions(&transactions)?;
        let balance_minor = total_minor(
            self.accounts(user_id)
                .await?
                .iter()
                .map(|a| a.balance_minor),
        )?;
        Ok(Stats {
            income_minor: summary.income_minor,
            expense_minor: summary.expense_minor,
            balance_minor,
        })
    }
}
