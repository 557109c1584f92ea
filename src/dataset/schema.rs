//! Explicit record schemas for the pipe-delimited loan files.
//!
//! Each layout is an ordered list of column names paired with the semantic
//! type the raw text is coerced to. Coercion is resolved by name when a file
//! is parsed, never by column position.

use polars::prelude::DataType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Type a raw text field is coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    /// Kept verbatim (trimmed); empty fields become null
    Text,
    /// Parsed as i64; unparsable fields become null
    Integer,
    /// Parsed as f64; unparsable fields become null
    Float,
}

impl SemanticType {
    /// Polars dtype of a column of this type.
    pub fn dtype(self) -> DataType {
        match self {
            SemanticType::Text => DataType::String,
            SemanticType::Integer => DataType::Int64,
            SemanticType::Float => DataType::Float64,
        }
    }
}

/// Which loan file family a schema describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordLayout {
    /// One row per loan at origination
    Origination,
    /// One row per loan per monthly reporting period
    Performance,
}

impl RecordLayout {
    /// File name infix used by the published sample files.
    pub fn file_tag(self) -> &'static str {
        match self {
            RecordLayout::Origination => "orig",
            RecordLayout::Performance => "svcg",
        }
    }

    /// `<base>/sample_<year>/sample_<tag>_<year>.txt`
    pub fn period_file(self, base: &Path, year: u16) -> PathBuf {
        base.join(format!("sample_{}", year))
            .join(format!("sample_{}_{}.txt", self.file_tag(), year))
    }

    /// Schema of this layout.
    pub fn schema(self) -> RecordSchema {
        match self {
            RecordLayout::Origination => RecordSchema::origination(),
            RecordLayout::Performance => RecordSchema::performance(),
        }
    }
}

/// Ordered mapping of column name to semantic type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSchema {
    columns: Vec<(String, SemanticType)>,
}

impl RecordSchema {
    /// Build a schema from `(name, type)` pairs in file order.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = (S, SemanticType)>,
        S: Into<String>,
    {
        RecordSchema {
            columns: columns.into_iter().map(|(n, t)| (n.into(), t)).collect(),
        }
    }

    /// Loan origination layout.
    pub fn origination() -> Self {
        use SemanticType::*;
        Self::new([
            ("CREDIT_SCORE", Integer),
            ("FIRST_PAYMENT_DATE", Integer),
            ("FIRST_TIME_HOMEBUYER_FLAG", Text),
            ("MATURITY_DATE", Integer),
            ("METROPOLITAN_DIVISION", Text),
            ("MORTGAGE_INSURANCE_PERCENTAGE", Float),
            ("NUMBER_OF_UNITS", Integer),
            ("OCCUPANCY_STATUS", Text),
            ("ORIGINAL_COMBINED_LOAN_TO_VALUE", Float),
            ("ORIGINAL_DEBT_TO_INCOME", Float),
            ("ORIGINAL_UPB", Float),
            ("ORIGINAL_LOAN_TO_VALUE", Float),
            ("ORIGINAL_INTEREST_RATE", Float),
            ("CHANNEL", Text),
            ("PREPAYMENT_PENALTY_MORTGAGE", Text),
            ("AMORTIZATION_TYPE", Text),
            ("PROPERTY_STATE", Text),
            ("PROPERTY_TYPE", Text),
            ("POSTAL_CODE", Text),
            ("LOAN_SEQUENCE_NUMBER", Text),
            ("LOAN_PURPOSE", Text),
            ("ORIGINAL_LOAN_TERM", Integer),
            ("NUMBER_OF_BORROWERS", Integer),
            ("SELLER_NAME", Text),
            ("SERVICER_NAME", Text),
            ("SUPER_CONFORMING_FLAG", Text),
            ("PRE_RELIEF_REFINANCE_LOAN_SEQUENCE_NUMBER", Text),
            ("PROGRAM_INDICATOR", Text),
            ("RELIEF_REFINANCE_INDICATOR", Text),
            ("PROPERTY_VALUATION_METHOD", Integer),
            ("INTEREST_ONLY_INDICATOR", Text),
            ("MI_CANCELLATION_INDICATOR", Text),
        ])
    }

    /// Monthly loan performance layout.
    pub fn performance() -> Self {
        use SemanticType::*;
        Self::new([
            ("LOAN_SEQUENCE_NUMBER", Text),
            ("MONTHLY_REPORTING_PERIOD", Integer),
            ("CURRENT_ACTUAL_UPB", Float),
            ("CURRENT_LOAN_DELINQUENCY_STATUS", Text),
            ("LOAN_AGE", Integer),
            ("REMAINING_MONTHS_TO_LEGAL_MATURITY", Integer),
            ("DEFECT_SETTLEMENT_DATE", Text),
            ("MODIFICATION_FLAG", Text),
            ("ZERO_BALANCE_CODE", Text),
            ("ZERO_BALANCE_EFFECTIVE_DATE", Text),
            ("CURRENT_INTEREST_RATE", Float),
            ("CURRENT_NON_INTEREST_BEARING_UPB", Float),
            ("DUE_DATE_OF_LAST_PAID_INSTALLMENT", Text),
            ("MI_RECOVERIES", Float),
            ("NET_SALE_PROCEEDS", Float),
            ("NON_MI_RECOVERIES", Float),
            ("TOTAL_EXPENSES", Float),
            ("LEGAL_COSTS", Float),
            ("MAINTENANCE_AND_PRESERVATION_COSTS", Float),
            ("TAXES_AND_INSURANCE", Float),
            ("MISCELLANEOUS_EXPENSES", Float),
            ("ACTUAL_LOSS_CALCULATION", Float),
            ("CUMULATIVE_MODIFICATION_COST", Float),
            ("STEP_MODIFICATION_FLAG", Text),
            ("PAYMENT_DEFERRAL", Text),
            ("ESTIMATED_LOAN_TO_VALUE", Float),
            ("ZERO_BALANCE_REMOVAL", Float),
            ("DELINQUENT_ACCRUED_INTEREST", Float),
            ("DELINQUENCY_DUE_TO_DISASTER", Text),
            ("BORROWER_ASSISTANCE_STATUS_CODE", Text),
            ("CURRENT_MONTH_MODIFICATION_COST", Float),
            ("INTEREST_BEARING_UPB", Float),
        ])
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names in file order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    /// Semantic type of a named column.
    pub fn type_of(&self, name: &str) -> Option<SemanticType> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| *t)
    }

    /// `(name, type)` pairs in file order.
    pub fn columns(&self) -> &[(String, SemanticType)] {
        &self.columns
    }
}
