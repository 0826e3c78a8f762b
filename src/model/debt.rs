//! Debts and their append-only payment records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ids::{DebtId, OrgId, PaymentId};
use crate::store::{Record, Table};

/// Debt lifecycle. `Paid` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebtStatus {
    Active,
    Overdue,
    Paid,
}

text_enum!(DebtStatus, "debt status" {
    Active => "active",
    Overdue => "overdue",
    Paid => "paid",
});

/// Money owed by an organization, in minor currency units.
///
/// `0 <= remaining_amount <= original_amount`, and `status == Paid` exactly
/// when `remaining_amount == 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debt {
    pub id: DebtId,
    pub organization: OrgId,
    pub creditor_name: String,
    pub original_amount: i64,
    pub remaining_amount: i64,
    pub status: DebtStatus,
    pub due_date: Option<NaiveDate>,
    pub created_at: u64,
}

impl Debt {
    /// Amount paid so far.
    pub fn paid_amount(&self) -> i64 {
        self.original_amount - self.remaining_amount
    }
}

impl Record for Debt {
    type Id = DebtId;
    const TABLE: Table = Table::Debts;

    fn id(&self) -> DebtId {
        self.id
    }
}

/// One payment against a debt. Never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtPayment {
    pub id: PaymentId,
    pub debt: DebtId,
    pub amount: i64,
    pub payment_date: NaiveDate,
    pub notes: Option<String>,
}

impl Record for DebtPayment {
    type Id = PaymentId;
    const TABLE: Table = Table::DebtPayments;

    fn id(&self) -> PaymentId {
        self.id
    }
}
