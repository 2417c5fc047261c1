use chrono::NaiveDate;
use serde::{Serialize, Serializer};

/// Render a flag the way the dashboard expects it.
pub fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

fn serialize_yes_no<S: Serializer>(flag: &bool, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(yes_no(*flag))
}

fn serialize_date<S: Serializer>(date: &NaiveDate, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&date.format("%Y-%m-%d").to_string())
}

fn serialize_amount<S: Serializer>(amount: &f64, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&format!("{amount:.2}"))
}

/// One row of the source statement, in source column order.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub date: NaiveDate,
    pub description: String,
    pub account: String,
    pub counterparty: Option<String>,
    pub code: String,
    pub debit_credit: String,
    pub amount: f64,
    pub transaction_type: String,
    pub notifications: String,
    pub balance: f64,
    pub tag: Option<String>,
    /// Cells exactly as read, in column order. Empty when built by hand.
    pub source_cells: Vec<String>,
}

impl TransactionRecord {
    /// Field values as the statement spells them, used for fingerprinting. An empty
    /// cell is null. Records without source cells fall back to re-rendered values.
    pub fn field_values(&self) -> Vec<Option<String>> {
        if !self.source_cells.is_empty() {
            return self
                .source_cells
                .iter()
                .map(|c| if c.is_empty() { None } else { Some(c.clone()) })
                .collect();
        }
        vec![
            Some(self.date.format("%Y%m%d").to_string()),
            Some(self.description.clone()),
            Some(self.account.clone()),
            self.counterparty.clone(),
            Some(self.code.clone()),
            Some(self.debit_credit.clone()),
            Some(crate::fmt::decimal_comma(self.amount)),
            Some(self.transaction_type.clone()),
            Some(self.notifications.clone()),
            Some(crate::fmt::decimal_comma(self.balance)),
            self.tag.clone(),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Incoming,
    Outgoing,
    Unknown,
}

impl Direction {
    pub fn from_debit_credit(raw: &str) -> Self {
        match raw.trim() {
            "Credit" | "Bij" => Self::Incoming,
            "Debit" | "Af" => Self::Outgoing,
            _ => Self::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Incoming => "Incoming transaction",
            Self::Outgoing => "Outgoing transaction",
            Self::Unknown => "",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CategoryFlags {
    pub is_salary: bool,
    pub is_fastfood: bool,
    pub is_groceries: bool,
    pub is_restaurant: bool,
    pub is_savings: bool,
    pub is_investment: bool,
    pub is_income: bool,
    pub is_expense: bool,
    pub is_person_to_person: bool,
    pub is_tikkie: bool,
    pub is_recurring_payment: bool,
}

/// A source row after every pipeline stage has run.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub record: TransactionRecord,
    pub fingerprint: String,
    pub counterparty_hash: Option<String>,
    pub direction: Direction,
    pub mandate_id: Option<String>,
    pub company_name: Option<String>,
    pub flags: CategoryFlags,
    pub expense_category: Option<String>,
}

impl EnrichedRecord {
    /// Amount signed by direction: money out is negative, money in positive.
    pub fn signed_amount(&self) -> f64 {
        match self.direction {
            Direction::Outgoing => -self.record.amount.abs(),
            Direction::Incoming => self.record.amount.abs(),
            Direction::Unknown => self.record.amount,
        }
    }

    pub fn company_key(&self) -> CompanyKey {
        CompanyKey {
            company_name: self.company_name.clone(),
            is_restaurant: self.flags.is_restaurant,
        }
    }

    pub fn transaction_info_key(&self) -> TransactionInfoKey {
        let f = &self.flags;
        TransactionInfoKey {
            counterparty_hash: self.counterparty_hash.clone(),
            description: self.record.description.clone(),
            direction: self.direction,
            is_salary: f.is_salary,
            is_fastfood: f.is_fastfood,
            is_groceries: f.is_groceries,
            is_savings: f.is_savings,
            is_investment: f.is_investment,
            is_income: f.is_income,
            is_expense: f.is_expense,
            is_person_to_person: f.is_person_to_person,
            is_tikkie: f.is_tikkie,
            is_recurring_payment: f.is_recurring_payment,
            expense_category: self.expense_category.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Star schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompanyKey {
    pub company_name: Option<String>,
    pub is_restaurant: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionInfoKey {
    pub counterparty_hash: Option<String>,
    pub description: String,
    pub direction: Direction,
    pub is_salary: bool,
    pub is_fastfood: bool,
    pub is_groceries: bool,
    pub is_savings: bool,
    pub is_investment: bool,
    pub is_income: bool,
    pub is_expense: bool,
    pub is_person_to_person: bool,
    pub is_tikkie: bool,
    pub is_recurring_payment: bool,
    pub expense_category: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompanyDim {
    pub company_key: usize,
    pub key: CompanyKey,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionInfoDim {
    pub transaction_info_key: usize,
    pub key: TransactionInfoKey,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fact {
    pub fact_key: usize,
    pub company_key: usize,
    pub transaction_info_key: usize,
    pub fingerprint: String,
    #[serde(serialize_with = "serialize_date")]
    pub date: NaiveDate,
    #[serde(serialize_with = "serialize_amount")]
    pub amount: f64,
}

/// Flat CSV shape of a company dimension row.
#[derive(Debug, Serialize)]
pub struct CompanyDimRow<'a> {
    pub company_key: usize,
    pub company_name: &'a str,
    #[serde(serialize_with = "serialize_yes_no")]
    pub is_restaurant: bool,
}

impl<'a> From<&'a CompanyDim> for CompanyDimRow<'a> {
    fn from(dim: &'a CompanyDim) -> Self {
        Self {
            company_key: dim.company_key,
            company_name: dim.key.company_name.as_deref().unwrap_or(""),
            is_restaurant: dim.key.is_restaurant,
        }
    }
}

/// Flat CSV shape of a transaction-info dimension row.
#[derive(Debug, Serialize)]
pub struct TransactionInfoDimRow<'a> {
    pub transaction_info_key: usize,
    pub counterparty_hash: &'a str,
    pub description: &'a str,
    pub type_of_transaction: &'static str,
    #[serde(serialize_with = "serialize_yes_no")]
    pub is_salary: bool,
    #[serde(serialize_with = "serialize_yes_no")]
    pub is_fastfood: bool,
    #[serde(serialize_with = "serialize_yes_no")]
    pub is_groceries: bool,
    #[serde(serialize_with = "serialize_yes_no")]
    pub is_savings: bool,
    #[serde(serialize_with = "serialize_yes_no")]
    pub is_investment: bool,
    #[serde(serialize_with = "serialize_yes_no")]
    pub is_income: bool,
    #[serde(serialize_with = "serialize_yes_no")]
    pub is_expense: bool,
    #[serde(serialize_with = "serialize_yes_no")]
    pub is_person_to_person: bool,
    #[serde(serialize_with = "serialize_yes_no")]
    pub is_tikkie: bool,
    #[serde(serialize_with = "serialize_yes_no")]
    pub is_recurring_payment: bool,
    pub expense_category: &'a str,
}

impl<'a> From<&'a TransactionInfoDim> for TransactionInfoDimRow<'a> {
    fn from(dim: &'a TransactionInfoDim) -> Self {
        let k = &dim.key;
        Self {
            transaction_info_key: dim.transaction_info_key,
            counterparty_hash: k.counterparty_hash.as_deref().unwrap_or(""),
            description: &k.description,
            type_of_transaction: k.direction.label(),
            is_salary: k.is_salary,
            is_fastfood: k.is_fastfood,
            is_groceries: k.is_groceries,
            is_savings: k.is_savings,
            is_investment: k.is_investment,
            is_income: k.is_income,
            is_expense: k.is_expense,
            is_person_to_person: k.is_person_to_person,
            is_tikkie: k.is_tikkie,
            is_recurring_payment: k.is_recurring_payment,
            expense_category: k.expense_category.as_deref().unwrap_or(""),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StarSchema {
    pub companies: Vec<CompanyDim>,
    pub transaction_info: Vec<TransactionInfoDim>,
    pub facts: Vec<Fact>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_labels() {
        assert_eq!(Direction::from_debit_credit("Credit").label(), "Incoming transaction");
        assert_eq!(Direction::from_debit_credit(" Debit ").label(), "Outgoing transaction");
        assert_eq!(Direction::from_debit_credit("").label(), "");
        assert_eq!(Direction::from_debit_credit("Refund"), Direction::Unknown);
    }

    #[test]
    fn test_yes_no() {
        assert_eq!(yes_no(true), "Yes");
        assert_eq!(yes_no(false), "No");
    }
}
