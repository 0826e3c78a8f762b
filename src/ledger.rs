//! Debts and payments.
//!
//! A payment reduces a debt's remaining balance, clamped at zero, and moves
//! the debt to `paid` once nothing is left. Payments on the same debt are
//! serialized by a per-debt lock so concurrent payments compound instead of
//! overwriting each other, and each payment is committed together with the
//! updated balance in one write batch.

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{ArgumentError, GraphError, LedgerError, OrgResult};
use crate::graph::require_name;
use crate::ids::{DebtId, OrgId, PaymentId};
use crate::model::{Debt, DebtPayment, DebtStatus, Organization, now_secs};
use crate::store::{KeyedLocks, Repository, WriteBatch, degrade};

/// Result of [`DebtLedger::add_payment`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentOutcome {
    pub payment_id: PaymentId,
    pub debt_id: DebtId,
    pub remaining_amount: i64,
    pub status: DebtStatus,
}

/// Input for [`DebtLedger::open_debt`].
#[derive(Debug, Clone)]
pub struct NewDebt {
    pub organization: OrgId,
    pub creditor_name: String,
    /// Minor currency units.
    pub amount: i64,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct DebtLedger {
    repo: Repository,
    locks: KeyedLocks<DebtId>,
}

impl DebtLedger {
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            locks: KeyedLocks::new(),
        }
    }

    /// Record a debt owed by `organization`.
    pub fn open_debt(&self, new: NewDebt) -> OrgResult<Debt> {
        if new.amount < 0 {
            return Err(ArgumentError::NegativeAmount {
                field: "amount",
                value: new.amount,
            }
            .into());
        }
        let creditor_name = require_name("creditor_name", &new.creditor_name)?;
        if self.repo.get::<Organization>(new.organization)?.is_none() {
            return Err(GraphError::OrganizationNotFound {
                org_id: new.organization.get(),
            }
            .into());
        }

        let status = if new.amount == 0 {
            DebtStatus::Paid
        } else {
            DebtStatus::Active
        };
        let debt = self.repo.insert(|id| Debt {
            id,
            organization: new.organization,
            creditor_name,
            original_amount: new.amount,
            remaining_amount: new.amount,
            status,
            due_date: new.due_date,
            created_at: now_secs(),
        })?;
        tracing::info!(debt = %debt.id, org = %debt.organization, amount = debt.original_amount, "opened debt");
        Ok(debt)
    }

    /// Apply a payment of `amount` minor units to a debt.
    ///
    /// Overpayment clamps the balance at zero; the full amount is still
    /// recorded on the payment. A missing debt is reported as
    /// [`LedgerError::DebtNotFound`] and nothing is written.
    pub fn add_payment(
        &self,
        debt_id: DebtId,
        amount: i64,
        payment_date: NaiveDate,
        notes: Option<String>,
    ) -> OrgResult<PaymentOutcome> {
        if amount < 0 {
            return Err(ArgumentError::NegativeAmount {
                field: "amount",
                value: amount,
            }
            .into());
        }

        self.locks
            .with(debt_id, || self.apply_payment(debt_id, amount, payment_date, notes))
    }

    fn apply_payment(
        &self,
        debt_id: DebtId,
        amount: i64,
        payment_date: NaiveDate,
        notes: Option<String>,
    ) -> OrgResult<PaymentOutcome> {
        let Some(mut debt) = self.repo.get::<Debt>(debt_id)? else {
            return Err(LedgerError::DebtNotFound {
                debt_id: debt_id.get(),
            }
            .into());
        };

        let remaining = debt.remaining_amount.saturating_sub(amount).max(0);
        debt.remaining_amount = remaining;
        if remaining == 0 {
            debt.status = DebtStatus::Paid;
        }

        let payment = DebtPayment {
            id: self.repo.allocate::<DebtPayment>()?,
            debt: debt_id,
            amount,
            payment_date,
            notes,
        };
        let mut batch = WriteBatch::new();
        batch.put(&payment)?.put(&debt)?;
        self.repo.commit(batch)?;

        tracing::info!(
            debt = %debt_id,
            payment = %payment.id,
            amount,
            remaining,
            status = %debt.status,
            "recorded debt payment"
        );
        Ok(PaymentOutcome {
            payment_id: payment.id,
            debt_id,
            remaining_amount: remaining,
            status: debt.status,
        })
    }

    /// Current state of a debt, read fresh from the store.
    pub fn debt_by_id(&self, debt_id: DebtId) -> OrgResult<Debt> {
        self.repo.get::<Debt>(debt_id)?.ok_or_else(|| {
            LedgerError::DebtNotFound {
                debt_id: debt_id.get(),
            }
            .into()
        })
    }

    /// Payments against a debt, oldest first.
    pub fn payments_for(&self, debt_id: DebtId) -> Vec<DebtPayment> {
        degrade(
            self.repo.filter(|p: &DebtPayment| p.debt == debt_id),
            "payments_for",
        )
    }

    pub fn debts_of(&self, org: OrgId) -> Vec<Debt> {
        degrade(self.repo.filter(|d: &Debt| d.organization == org), "debts_of")
    }

    pub fn debts(&self) -> Vec<Debt> {
        degrade(self.repo.scan(), "debts")
    }

    /// Move active debts due before `today` with a balance left to `overdue`.
    ///
    /// Returns the ids that changed.
    pub fn mark_overdue(&self, today: NaiveDate) -> OrgResult<Vec<DebtId>> {
        let due = |d: &Debt| {
            d.status == DebtStatus::Active
                && d.remaining_amount > 0
                && d.due_date.is_some_and(|date| date < today)
        };

        let mut changed = Vec::new();
        for candidate in self.repo.filter(due)? {
            let flipped = self.locks.with(candidate.id, || -> OrgResult<bool> {
                // a payment may have landed since the scan
                let Some(mut debt) = self.repo.get::<Debt>(candidate.id)? else {
                    return Ok(false);
                };
                if !due(&debt) {
                    return Ok(false);
                }
                debt.status = DebtStatus::Overdue;
                self.repo.put(&debt)?;
                Ok(true)
            })?;
            if flipped {
                changed.push(candidate.id);
            }
        }
        if !changed.is_empty() {
            tracing::info!(count = changed.len(), %today, "marked debts overdue");
        }
        Ok(changed)
    }
}
