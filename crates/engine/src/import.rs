//! Bank-statement CSV import.
//!
//! The pipeline is split in three pure steps so each can be tested without a
//! database:
//!
//! 1. [`parse_rows`] turns the uploaded text into header-keyed [`RawRow`]s.
//! 2. [`normalize_row`] reads a row through the recognised column aliases and
//!    yields a [`RowDraft`], or `None` when the row carries no usable amount.
//! 3. [`Directory::resolve`] binds a draft to the user's accounts and
//!    categories, producing an insertable [`Candidate`].
//!
//! Persisting candidates is done by `Engine::import_transactions`.

use std::{collections::HashMap, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    Account, Category, Currency, EngineError, Money, ResultEngine, Transaction, TransactionKind,
    util::name_key,
};

/// How many of the user's latest transactions an import hands back.
pub const RECENT_LIMIT: u64 = 50;

const CREDIT_COLUMNS: &[&str] = &[
    "credit",
    "credit amount",
    "deposit",
    "amount credited",
    "credit (rs.)",
];
const DEBIT_COLUMNS: &[&str] = &[
    "debit",
    "debit amount",
    "withdrawal",
    "amount debited",
    "debit (rs.)",
];
const AMOUNT_COLUMNS: &[&str] = &["amount", "amt"];
const INDICATOR_COLUMNS: &[&str] = &["crdr", "dr/cr", "credit/debit", "txn_indicator"];
const STATUS_COLUMNS: &[&str] = &["status", "txn_status", "transaction status"];
const TYPE_COLUMNS: &[&str] = &["type", "txn_type", "transaction type"];
const DATE_COLUMNS: &[&str] = &["date", "posted", "txn_date", "transaction date"];
const NOTE_COLUMNS: &[&str] = &["merchant", "payee", "notes", "description", "memo"];
const METHOD_COLUMNS: &[&str] = &["method", "mode"];
const ACCOUNT_COLUMNS: &[&str] = &["account", "account name", "account number"];
const CURRENCY_COLUMNS: &[&str] = &["currency"];
const CATEGORY_COLUMNS: &[&str] = &["category", "category name"];

const CREDIT_TOKENS: &[&str] = &["CR", "C", "CREDIT", "CRED", "DEPOSIT", "INCOME"];
const DEBIT_TOKENS: &[&str] = &["DR", "D", "DEBIT", "DEB", "WITHDRAWAL", "WD", "WDL", "EXPENSE"];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d %b %Y",
    "%b %d %Y",
    "%b %d, %Y",
];

/// One data line of the upload, keyed by lower-cased header.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawRow {
    values: HashMap<String, String>,
}

impl RawRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }

    /// First non-empty value among `aliases`, in alias order.
    pub fn first(&self, aliases: &[&str]) -> Option<&str> {
        aliases
            .iter()
            .filter_map(|alias| self.get(alias))
            .find(|value| !value.is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A row after alias resolution, not yet bound to an account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowDraft {
    pub kind: TransactionKind,
    /// Always strictly positive.
    pub amount: Decimal,
    pub occurred_at: DateTime<Utc>,
    pub note: Option<String>,
    pub method: Option<String>,
    pub account_name: Option<String>,
    pub currency: Option<Currency>,
    pub category_name: Option<String>,
}

/// A normalised transaction ready to be inserted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub account_id: Uuid,
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub currency: Currency,
    pub category_id: Option<Uuid>,
    pub method: Option<String>,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl Candidate {
    pub fn into_transaction(self) -> ResultEngine<Transaction> {
        let mut tx = Transaction::new(
            self.account_id,
            self.kind,
            self.amount_minor,
            self.currency,
            self.occurred_at,
        )?;
        tx.category_id = self.category_id;
        tx.method = self.method;
        tx.note = self.note;
        Ok(tx)
    }
}

/// Result of an import run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportOutcome {
    /// Rows actually inserted.
    pub imported: usize,
    /// The user's most recent transactions, newest first, at most
    /// [`RECENT_LIMIT`].
    pub transactions: Vec<Transaction>,
}

/// Split the upload into header-keyed rows.
///
/// The delimiter is `;` when the header line holds more semicolons than
/// commas, `,` otherwise. Quoted fields may contain the delimiter and `""`
/// escapes; records never span lines.
pub fn parse_rows(text: &str) -> ResultEngine<Vec<RawRow>> {
    let mut lines = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty());

    let Some(header_line) = lines.next() else {
        return Err(EngineError::Validation(
            "empty or unparsable content".to_string(),
        ));
    };
    let delimiter = detect_delimiter(header_line);
    let headers: Vec<String> = split_line(header_line, delimiter)?
        .into_iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
        .collect();

    lines
        .map(|line| -> ResultEngine<RawRow> {
            let mut cells = split_line(line, delimiter)?.into_iter();
            Ok(headers
                .iter()
                .map(|header| {
                    let value = cells.next().unwrap_or_default();
                    (header.clone(), value.trim().to_string())
                })
                .collect())
        })
        .collect()
}

fn detect_delimiter(header: &str) -> u8 {
    let commas = header.matches(',').count();
    let semicolons = header.matches(';').count();
    if semicolons > commas { b';' } else { b',' }
}

fn split_line(line: &str, delimiter: u8) -> ResultEngine<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(line.as_bytes());
    match reader.records().next() {
        Some(record) => {
            let record = record.map_err(|e| EngineError::Import(e.to_string()))?;
            Ok(record.iter().map(ToString::to_string).collect())
        }
        None => Ok(Vec::new()),
    }
}

/// Parse a statement amount.
///
/// Accepts thousands separators, surrounding whitespace (including NBSP),
/// currency symbols and accounting parentheses, which make the value
/// negative.
pub fn parse_number(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    let parenthesised = trimmed.len() > 2 && trimmed.starts_with('(') && trimmed.ends_with(')');
    let cleaned: String = trimmed
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | ',' | '\u{a0}' | '$' | '€' | '£' | '₹'))
        .filter(|c| !c.is_whitespace())
        .collect();
    let cleaned = cleaned.strip_prefix('+').unwrap_or(&cleaned);
    if cleaned.is_empty() {
        return None;
    }
    let value = Decimal::from_str(cleaned).ok()?;
    Some(if parenthesised { -value.abs() } else { value })
}

/// Parse a statement date, trying the formats banks commonly export.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
}

fn kind_from_token(token: &str) -> Option<TransactionKind> {
    let token = token.trim().to_uppercase();
    if CREDIT_TOKENS.contains(&token.as_str()) {
        Some(TransactionKind::Income)
    } else if DEBIT_TOKENS.contains(&token.as_str()) {
        Some(TransactionKind::Expense)
    } else {
        None
    }
}

fn kind_from_status(status: &str) -> Option<TransactionKind> {
    match status.trim().to_uppercase().as_str() {
        "CREDITED" => Some(TransactionKind::Income),
        "DEBITED" => Some(TransactionKind::Expense),
        _ => None,
    }
}

fn amount_and_kind(row: &RawRow) -> Option<(Decimal, TransactionKind)> {
    let credit = row.first(CREDIT_COLUMNS);
    let debit = row.first(DEBIT_COLUMNS);
    if credit.is_some() || debit.is_some() {
        let side = |value: Option<&str>| {
            value
                .and_then(parse_number)
                .map(|v| v.abs())
                .unwrap_or_default()
        };
        let (credit, debit) = (side(credit), side(debit));
        return if credit > Decimal::ZERO {
            Some((credit, TransactionKind::Income))
        } else if debit > Decimal::ZERO {
            Some((debit, TransactionKind::Expense))
        } else {
            None
        };
    }

    let amount = parse_number(row.first(AMOUNT_COLUMNS)?)?;
    let signals = [
        row.first(INDICATOR_COLUMNS).and_then(kind_from_token),
        row.first(STATUS_COLUMNS).and_then(kind_from_status),
        row.first(TYPE_COLUMNS).and_then(kind_from_token),
    ];
    // A credit signal in any column wins over debit signals; the sign decides
    // only when no column says either.
    let kind = if signals.contains(&Some(TransactionKind::Income)) {
        TransactionKind::Income
    } else if signals.contains(&Some(TransactionKind::Expense)) {
        TransactionKind::Expense
    } else if amount.is_sign_negative() {
        TransactionKind::Expense
    } else {
        TransactionKind::Income
    };
    Some((amount.abs(), kind))
}

/// Read one row through the column aliases.
///
/// Returns `None` for rows without a usable non-zero amount. A missing or
/// unparsable date falls back to `now`.
pub fn normalize_row(row: &RawRow, now: DateTime<Utc>) -> Option<RowDraft> {
    let (amount, kind) = amount_and_kind(row)?;
    if amount.is_zero() {
        return None;
    }
    let text = |aliases: &[&str]| row.first(aliases).map(ToString::to_string);
    Some(RowDraft {
        kind,
        amount,
        occurred_at: row.first(DATE_COLUMNS).and_then(parse_date).unwrap_or(now),
        note: text(NOTE_COLUMNS),
        method: text(METHOD_COLUMNS),
        account_name: text(ACCOUNT_COLUMNS),
        currency: row
            .first(CURRENCY_COLUMNS)
            .and_then(|code| Currency::try_from(code).ok()),
        category_name: text(CATEGORY_COLUMNS),
    })
}

/// The user's accounts and categories, indexed for name lookups.
#[derive(Debug)]
pub struct Directory {
    default_account: Account,
    accounts: HashMap<String, Account>,
    categories: HashMap<String, Category>,
}

impl Directory {
    /// `accounts` must be ordered; the first one receives rows whose account
    /// column is missing or unknown.
    pub fn new(accounts: Vec<Account>, categories: Vec<Category>) -> ResultEngine<Self> {
        let Some(default_account) = accounts.first().cloned() else {
            return Err(EngineError::Validation("no account exists".to_string()));
        };
        let mut by_name = HashMap::new();
        for account in accounts {
            by_name.entry(name_key(&account.name)).or_insert(account);
        }
        let mut categories_by_name = HashMap::new();
        for category in categories {
            categories_by_name
                .entry(name_key(&category.name))
                .or_insert(category);
        }
        Ok(Self {
            default_account,
            accounts: by_name,
            categories: categories_by_name,
        })
    }

    pub fn account_for(&self, name: Option<&str>) -> &Account {
        name.and_then(|n| self.accounts.get(&name_key(n)))
            .unwrap_or(&self.default_account)
    }

    /// Bind a draft to an account and category.
    ///
    /// Returns `None` when the amount rounds to zero minor units in the
    /// resolved currency.
    pub fn resolve(&self, draft: RowDraft) -> Option<Candidate> {
        let account = self.account_for(draft.account_name.as_deref());
        let currency = draft.currency.unwrap_or(account.currency);
        let amount_minor = Money::from_decimal(draft.amount, currency).ok()?.minor();
        if amount_minor <= 0 {
            return None;
        }
        let category_id = draft
            .category_name
            .as_deref()
            .and_then(|name| self.categories.get(&name_key(name)))
            .filter(|category| category.kind.accepts(draft.kind))
            .map(|category| category.id);
        Some(Candidate {
            account_id: account.id,
            kind: draft.kind,
            amount_minor,
            currency,
            category_id,
            method: draft.method,
            note: draft.note,
            occurred_at: draft.occurred_at,
        })
    }
}

/// Candidates derived from an upload, plus how many rows were dropped.
#[derive(Debug)]
pub struct ImportPlan {
    pub rows: usize,
    pub candidates: Vec<Candidate>,
}

impl ImportPlan {
    pub fn skipped(&self) -> usize {
        self.rows - self.candidates.len()
    }
}

/// Normalise and resolve parsed rows.
pub fn plan(rows: &[RawRow], directory: &Directory, now: DateTime<Utc>) -> ImportPlan {
    let candidates = rows
        .iter()
        .filter_map(|row| normalize_row(row, now))
        .filter_map(|draft| directory.resolve(draft))
        .collect();
    ImportPlan {
        rows: rows.len(),
        candidates,
    }
}
