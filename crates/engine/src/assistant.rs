//! Intent routing for the finance assistant.
//!
//! Queries are matched against an ordered list of rules; the first rule that
//! matches decides the intent. Anything unmatched goes to the text generator.

use std::sync::OnceLock;

use regex::Regex;

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> Option<&'static Regex> {
            static R: OnceLock<Option<Regex>> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).ok()).as_ref()
        }
    };
}

re!(
    re_category_spend,
    r"(?i)(?:show|what|how)(?:.*?\bmy\b)?\s*(.+?) (?:expense|expenses|spend|spending).*?(?:this|current)?\s*month"
);
re!(re_create_budget, r"(?i)create .*budget.* for (.+)");

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// What the user asked for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    /// Expenses this month for one merchant or category.
    CategorySpend { name: String },
    /// Income minus expenses for a month of the current year (1-based), or
    /// the current month.
    Savings { month: Option<u32> },
    CreateBudget { name: String },
    ListBudgets,
    MonthSummary,
    ExportReport,
    RecentTransactions,
    RecentExpenses,
    /// Free-form question for the text generator.
    Open,
}

type Rule = fn(&str, &str) -> Option<Intent>;

// Each rule receives the trimmed query and its lower-cased form.
const RULES: &[Rule] = &[
    |query, _| {
        let caps = re_category_spend()?.captures(query)?;
        let name = caps.get(1)?.as_str().trim();
        (!name.is_empty()).then(|| Intent::CategorySpend {
            name: name.to_string(),
        })
    },
    |_, lower| {
        (lower.contains("how much") && lower.contains("save")).then(|| Intent::Savings {
            month: month_in(lower),
        })
    },
    |query, _| {
        let caps = re_create_budget()?.captures(query)?;
        let name = caps.get(1)?.as_str().trim();
        (!name.is_empty()).then(|| Intent::CreateBudget {
            name: name.to_string(),
        })
    },
    |_, lower| lower.contains("budget").then_some(Intent::ListBudgets),
    |_, lower| {
        (lower.contains("month")
            && ["spending", "summary", "report"]
                .iter()
                .any(|w| lower.contains(w)))
        .then_some(Intent::MonthSummary)
    },
    |_, lower| {
        (lower.contains("report") && (lower.contains("pdf") || lower.contains("export")))
            .then_some(Intent::ExportReport)
    },
    |_, lower| {
        lower
            .contains("transaction")
            .then_some(Intent::RecentTransactions)
    },
    |_, lower| lower.contains("expense").then_some(Intent::RecentExpenses),
];

impl Intent {
    pub fn route(query: &str) -> Intent {
        let query = query.trim();
        let lower = query.to_lowercase();
        RULES
            .iter()
            .find_map(|rule| rule(query, &lower))
            .unwrap_or(Intent::Open)
    }
}

/// First month name mentioned in `lower`, as 1-based month number.
fn month_in(lower: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|m| lower.contains(m))
        .and_then(|i| u32::try_from(i + 1).ok())
}

/// What the engine could answer on its own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssistantReply {
    Answer(String),
    /// The query should be forwarded to the text generator.
    Fallback,
}

/// Reply used when the text generator is missing or fails.
pub const FALLBACK_REPLY: &str =
    "I'm having trouble reaching the AI service right now. Please try again later.";

pub const EXPORT_LINK: &str = "/reports/export?type=pdf";

/// Prompt used for free-form questions.
pub fn assistant_prompt(query: &str) -> String {
    format!(
        "You are a helpful AI financial assistant. A user will ask you a question about their \
         finances, and you should provide a helpful and informative answer.\n\nUser query: {query}"
    )
}

/// Inputs for savings-goal suggestions.
#[derive(Clone, Debug, PartialEq)]
pub struct SavingsGoal {
    pub goal_name: String,
    pub current_savings: f64,
    pub target_amount: f64,
    pub monthly_income: f64,
    pub monthly_expenses: f64,
    pub spending_habits: String,
}

impl SavingsGoal {
    pub fn prompt(&self) -> String {
        format!(
            "You are a financial advisor providing advice to help users reach their savings goals \
             faster.\n\nBased on the following information, provide a list of actionable \
             suggestions to help the user save faster. Answer with one suggestion per line.\n\n\
             Goal Name: {}\nCurrent Savings: {}\nTarget Amount: {}\nMonthly Income: {}\n\
             Monthly Expenses: {}\nSpending Habits: {}\n\nSuggestions:\n",
            self.goal_name,
            self.current_savings,
            self.target_amount,
            self.monthly_income,
            self.monthly_expenses,
            self.spending_habits,
        )
    }
}

/// Split generator output into suggestion lines, dropping list markers.
pub fn suggestion_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(['-', '*', '•'])
                .trim_start_matches(|c: char| c.is_ascii_digit())
                .trim_start_matches(['.', ')'])
                .trim()
        })
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_spend_captures_name_after_my() {
        assert_eq!(
            Intent::route("Show my food expenses this month"),
            Intent::CategorySpend {
                name: "food".to_string()
            }
        );
        assert_eq!(
            Intent::route("what is my Rent spending for the current month?"),
            Intent::CategorySpend {
                name: "Rent".to_string()
            }
        );
    }

    #[test]
    fn savings_picks_named_month() {
        assert_eq!(
            Intent::route("How much did I save in October?"),
            Intent::Savings { month: Some(10) }
        );
        assert_eq!(
            Intent::route("how much can I save"),
            Intent::Savings { month: None }
        );
    }

    #[test]
    fn create_budget_keeps_original_case() {
        assert_eq!(
            Intent::route("Please create a new budget for Groceries"),
            Intent::CreateBudget {
                name: "Groceries".to_string()
            }
        );
    }

    #[test]
    fn rules_apply_in_order() {
        assert_eq!(Intent::route("list my budgets"), Intent::ListBudgets);
        // "budget" is checked before "month summary".
        assert_eq!(Intent::route("monthly budget summary"), Intent::ListBudgets);
        assert_eq!(Intent::route("give me a month summary"), Intent::MonthSummary);
        // "month ... report" is a summary, not an export.
        assert_eq!(Intent::route("monthly report as pdf"), Intent::MonthSummary);
        assert_eq!(Intent::route("export the report"), Intent::ExportReport);
        assert_eq!(
            Intent::route("latest transactions"),
            Intent::RecentTransactions
        );
        assert_eq!(Intent::route("list expense items"), Intent::RecentExpenses);
        assert_eq!(Intent::route("is an index fund a good idea?"), Intent::Open);
    }

    #[test]
    fn spend_rule_needs_month() {
        assert_eq!(Intent::route("show my food expenses"), Intent::RecentExpenses);
    }

    #[test]
    fn suggestions_drop_markers_and_blanks() {
        let text = "1. Cook at home\n\n- Cancel unused subscriptions\n* Automate transfers\n";
        assert_eq!(
            suggestion_lines(text),
            vec![
                "Cook at home".to_string(),
                "Cancel unused subscriptions".to_string(),
                "Automate transfers".to_string(),
            ]
        );
    }
}
