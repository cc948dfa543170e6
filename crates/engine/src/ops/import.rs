use chrono::{DateTime, Utc};
use sea_orm::{TransactionTrait, prelude::*};

use crate::{
    EngineError, ImportOutcome, ResultEngine,
    import::{self, Directory, RECENT_LIMIT},
};

use super::{Engine, with_tx};

impl Engine {
    /// Import a bank statement into the user's accounts.
    ///
    /// All rows are inserted in one DB transaction: either every surviving
    /// row lands or none does. Validation problems (empty upload, no account)
    /// are returned as such; any other failure becomes
    /// [`EngineError::Import`]. Rows are not deduplicated, so importing the
    /// same file twice doubles its records.
    pub async fn import_transactions(
        &self,
        user_id: &str,
        text: &str,
    ) -> ResultEngine<ImportOutcome> {
        self.run_import(user_id, text, Utc::now())
            .await
            .map_err(|err| match err {
                EngineError::Validation(_) | EngineError::Import(_) => err,
                other => {
                    tracing::error!(user_id, error = %other, "csv import failed");
                    EngineError::Import(other.to_string())
                }
            })
    }

    async fn run_import(
        &self,
        user_id: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<ImportOutcome> {
        let rows = import::parse_rows(text)?;
        with_tx!(self, |db_tx| {
            let accounts = self.ordered_accounts(&db_tx, user_id).await?;
            let categories = self.user_categories(&db_tx, user_id).await?;
            let directory = Directory::new(accounts, categories)?;
            let plan = import::plan(&rows, &directory, now);

            let mut imported = 0;
            for candidate in plan.candidates.iter().cloned() {
                candidate
                    .into_transaction()?
                    .to_active(user_id, now)
                    .insert(&db_tx)
                    .await?;
                imported += 1;
            }
            tracing::info!(
                user_id,
                rows = plan.rows,
                skipped = plan.skipped(),
                imported,
                "csv import finished"
            );

            let transactions = self
                .recent_transactions(&db_tx, user_id, RECENT_LIMIT)
                .await?;
            Ok(ImportOutcome {
                imported,
                transactions,
            })
        })
    }
}
