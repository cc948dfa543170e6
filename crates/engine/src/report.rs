//! Transaction summaries and exports.

use std::io::BufWriter;

use printpdf::{BuiltinFont, Mm, PdfDocument};
use uuid::Uuid;

use crate::{
    EngineError, Money, ResultEngine, Transaction, TransactionKind,
    money::add_minor,
};

/// Supported export formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Pdf,
}

impl ExportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Pdf => "application/pdf",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Csv => "report.csv",
            Self::Pdf => "report.pdf",
        }
    }
}

impl TryFrom<&str> for ExportFormat {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "pdf" => Ok(Self::Pdf),
            _ => Err(EngineError::Validation("unsupported type".to_string())),
        }
    }
}

/// Income and expense totals over a set of transactions.
///
/// Amounts are summed in minor units regardless of currency.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub income_minor: i64,
    pub expense_minor: i64,
    /// Expense totals per category, largest first. Uncategorised expenses are
    /// not listed.
    pub by_category: Vec<CategoryTotal>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryTotal {
    pub category_id: Uuid,
    pub name: String,
    pub expense_minor: i64,
}

impl Summary {
    pub fn net_minor(&self) -> i64 {
        self.income_minor - self.expense_minor
    }

    /// Fails with [`EngineError::InvalidAmount`] when a total leaves the
    /// `i64` range.
    pub fn from_transactions(transactions: &[Transaction]) -> ResultEngine<Self> {
        let mut summary = Summary::default();
        for tx in transactions {
            match tx.kind {
                TransactionKind::Income => {
                    summary.income_minor = add_minor(summary.income_minor, tx.amount_minor)?;
                }
                TransactionKind::Expense => {
                    summary.expense_minor = add_minor(summary.expense_minor, tx.amount_minor)?;
                    if let Some(category_id) = tx.category_id {
                        match summary
                            .by_category
                            .iter_mut()
                            .find(|c| c.category_id == category_id)
                        {
                            Some(total) => {
                                total.expense_minor = add_minor(total.expense_minor, tx.amount_minor)?;
                            }
                            None => summary.by_category.push(CategoryTotal {
                                category_id,
                                name: tx.category_name.clone().unwrap_or_default(),
                                expense_minor: tx.amount_minor,
                            }),
                        }
                    }
                }
                TransactionKind::Transfer => {}
            }
        }
        summary
            .by_category
            .sort_by(|a, b| b.expense_minor.cmp(&a.expense_minor).then(a.name.cmp(&b.name)));
        Ok(summary)
    }
}

fn kind_label(kind: TransactionKind) -> String {
    kind.as_str().to_uppercase()
}

/// Render transactions as CSV with a fixed column set.
pub fn render_csv(transactions: &[Transaction]) -> ResultEngine<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "id",
            "type",
            "amount",
            "currency",
            "account_id",
            "category_id",
            "date",
            "notes",
        ])
        .map_err(|e| EngineError::Report(e.to_string()))?;
    for tx in transactions {
        writer
            .write_record([
                tx.id.to_string(),
                kind_label(tx.kind),
                Money::new(tx.amount_minor, tx.currency).amount_string(),
                tx.currency.code().to_string(),
                tx.account_id.to_string(),
                tx.category_id.map(|id| id.to_string()).unwrap_or_default(),
                tx.occurred_at.to_rfc3339(),
                tx.note.clone().unwrap_or_default(),
            ])
            .map_err(|e| EngineError::Report(e.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| EngineError::Report(e.to_string()))
}

// A4 portrait, in mm.
const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const LEFT: f32 = 10.0;
const TOP: f32 = 10.0;
const ROW_H: f32 = 6.5;
const FONT_SIZE: f32 = 10.0;
pub const ROWS_PER_PAGE: usize = 40;

/// One line of the PDF report: `YYYY-MM-DD  KIND  amount currency`.
pub fn pdf_line(tx: &Transaction) -> String {
    format!(
        "{}  {}  {}",
        tx.occurred_at.format("%Y-%m-%d"),
        kind_label(tx.kind),
        Money::new(tx.amount_minor, tx.currency)
    )
}

/// Render a "Financial Report" PDF, one page per [`ROWS_PER_PAGE`] rows.
pub fn render_pdf(transactions: &[Transaction]) -> ResultEngine<Vec<u8>> {
    let (doc, page, layer) =
        PdfDocument::new("Financial Report", Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| EngineError::Report(format!("{e:?}")))?;

    let mut canvas = doc.get_page(page).get_layer(layer);
    canvas.use_text("Financial Report", 16.0, Mm(LEFT), Mm(PAGE_H - TOP), &font);
    let mut y = PAGE_H - TOP - 2.0 * ROW_H;
    for (index, tx) in transactions.iter().enumerate() {
        if index > 0 && index % ROWS_PER_PAGE == 0 {
            let (page, layer) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
            canvas = doc.get_page(page).get_layer(layer);
            y = PAGE_H - TOP;
        }
        canvas.use_text(pdf_line(tx), FONT_SIZE, Mm(LEFT), Mm(y), &font);
        y -= ROW_H;
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| EngineError::Report(format!("{e:?}")))?;
    buf.into_inner()
        .map_err(|e| EngineError::Report(e.to_string()))
}
