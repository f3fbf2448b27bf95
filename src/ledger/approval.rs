//! Approval state machine for DEPOSIT and WITHDRAW records.
//!
//! ```text
//! DEPOSIT:  UNDER_REVIEW -> APPROVED
//!           UNDER_REVIEW -> REJECTED
//! WITHDRAW: UNDER_REVIEW -> PROCESSING -> COMPLETED
//!           UNDER_REVIEW -> REJECTED
//! ```
//!
//! Transitions only move forward. Each function here mutates one record in
//! place and leaves balance recomputation to the caller.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use super::transaction::{Transaction, TransactionStatus, TransactionType};
use crate::error::{LedgerError, Result};

/// Whether `from -> to` is an edge of the state machine for `kind`.
pub fn is_legal_transition(
    kind: TransactionType,
    from: TransactionStatus,
    to: TransactionStatus,
) -> bool {
    use TransactionStatus::*;
    match kind {
        TransactionType::Deposit => matches!((from, to), (UnderReview, Approved) | (UnderReview, Rejected)),
        TransactionType::Withdraw => matches!(
            (from, to),
            (UnderReview, Processing) | (UnderReview, Rejected) | (Processing, Completed)
        ),
        TransactionType::TradePnl | TransactionType::Adjustment => false,
    }
}

/// Terminal states accept no further transition.
pub fn is_terminal(kind: TransactionType, status: TransactionStatus) -> bool {
    use TransactionStatus::*;
    [Approved, Processing, Completed, Rejected]
        .iter()
        .all(|to| !is_legal_transition(kind, status, *to))
}

fn ensure_kind(tx: &Transaction, expected: TransactionType) -> Result<()> {
    if tx.kind != expected {
        return Err(LedgerError::WrongTransactionType {
            tx_id: tx.id.clone(),
            actual: tx.kind,
            expected,
        });
    }
    Ok(())
}

fn ensure_under_review(tx: &Transaction) -> Result<()> {
    if tx.status != TransactionStatus::UnderReview {
        return Err(LedgerError::InvalidStatus {
            tx_id: tx.id.clone(),
            status: tx.status,
            expected: TransactionStatus::UnderReview,
        });
    }
    Ok(())
}

fn transition(tx: &mut Transaction, to: TransactionStatus) -> Result<()> {
    if !is_legal_transition(tx.kind, tx.status, to) {
        return Err(LedgerError::InvalidStatus {
            tx_id: tx.id.clone(),
            status: tx.status,
            expected: TransactionStatus::UnderReview,
        });
    }
    debug!(tx_id = %tx.id, kind = %tx.kind, from = %tx.status, to = %to, "transaction transition");
    tx.status = to;
    Ok(())
}

/// UNDER_REVIEW -> APPROVED. The deposit credits the balance from now on.
pub fn approve_deposit(tx: &mut Transaction, actor: &str, now: DateTime<Utc>) -> Result<()> {
    ensure_kind(tx, TransactionType::Deposit)?;
    if tx.status == TransactionStatus::Approved {
        return Err(LedgerError::AlreadyApproved(tx.id.clone()));
    }
    ensure_under_review(tx)?;

    transition(tx, TransactionStatus::Approved)?;
    tx.approved_at = Some(now);
    tx.metadata
        .insert("approvedBy".to_string(), Value::from(actor));
    Ok(())
}

/// UNDER_REVIEW -> PROCESSING. The stored amount turns negative here and
/// starts debiting the balance; its magnitude is unchanged.
pub fn approve_withdraw(tx: &mut Transaction, actor: &str, now: DateTime<Utc>) -> Result<()> {
    ensure_kind(tx, TransactionType::Withdraw)?;
    if matches!(
        tx.status,
        TransactionStatus::Processing | TransactionStatus::Completed
    ) {
        return Err(LedgerError::AlreadyApproved(tx.id.clone()));
    }
    ensure_under_review(tx)?;

    transition(tx, TransactionStatus::Processing)?;
    tx.amount = -tx.amount.abs();
    tx.approved_at = Some(now);
    tx.metadata
        .insert("approvedBy".to_string(), Value::from(actor));
    Ok(())
}

/// UNDER_REVIEW -> REJECTED for either approvable type. No balance effect;
/// a rejected withdrawal keeps its positive amount.
pub fn reject(
    tx: &mut Transaction,
    expected: TransactionType,
    reason: Option<&str>,
    actor: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    ensure_kind(tx, expected)?;
    ensure_under_review(tx)?;

    transition(tx, TransactionStatus::Rejected)?;
    tx.rejected_at = Some(now);
    tx.metadata
        .insert("rejectedBy".to_string(), Value::from(actor));
    if let Some(reason) = reason.map(str::trim).filter(|r| !r.is_empty()) {
        tx.metadata
            .insert("rejectionReason".to_string(), Value::from(reason));
    }
    Ok(())
}

/// PROCESSING -> COMPLETED. Records settlement only; the debit already
/// happened at approval.
pub fn complete_withdraw(
    tx: &mut Transaction,
    settlement_ref: Option<&str>,
    now: DateTime<Utc>,
) -> Result<()> {
    ensure_kind(tx, TransactionType::Withdraw)?;
    if tx.status != TransactionStatus::Processing {
        return Err(LedgerError::InvalidStatus {
            tx_id: tx.id.clone(),
            status: tx.status,
            expected: TransactionStatus::Processing,
        });
    }

    transition(tx, TransactionStatus::Completed)?;
    tx.completed_at = Some(now);
    if let Some(reference) = settlement_ref.map(str::trim).filter(|r| !r.is_empty()) {
        tx.metadata
            .insert("settlementRef".to_string(), Value::from(reference));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::ledger::transaction::Metadata;

    const ALL: [TransactionStatus; 5] = [
        TransactionStatus::UnderReview,
        TransactionStatus::Approved,
        TransactionStatus::Processing,
        TransactionStatus::Completed,
        TransactionStatus::Rejected,
    ];

    fn deposit() -> Transaction {
        Transaction::deposit(100.0, Utc::now(), Metadata::new())
    }

    fn withdraw() -> Transaction {
        Transaction::withdraw(50.0, Utc::now(), Metadata::new())
    }

    #[test]
    fn test_legal_edges() {
        use TransactionStatus::*;
        let deposit_edges: Vec<_> = ALL
            .iter()
            .flat_map(|f| ALL.iter().map(move |t| (*f, *t)))
            .filter(|(f, t)| is_legal_transition(TransactionType::Deposit, *f, *t))
            .collect();
        assert_eq!(deposit_edges, vec![(UnderReview, Approved), (UnderReview, Rejected)]);

        let withdraw_edges: Vec<_> = ALL
            .iter()
            .flat_map(|f| ALL.iter().map(move |t| (*f, *t)))
            .filter(|(f, t)| is_legal_transition(TransactionType::Withdraw, *f, *t))
            .collect();
        assert_eq!(
            withdraw_edges,
            vec![
                (UnderReview, Processing),
                (UnderReview, Rejected),
                (Processing, Completed)
            ]
        );

        for f in ALL {
            for t in ALL {
                assert!(!is_legal_transition(TransactionType::TradePnl, f, t));
                assert!(!is_legal_transition(TransactionType::Adjustment, f, t));
            }
        }
    }

    #[test]
    fn test_terminal_states() {
        use TransactionStatus::*;
        assert!(is_terminal(TransactionType::Deposit, Approved));
        assert!(is_terminal(TransactionType::Deposit, Rejected));
        assert!(!is_terminal(TransactionType::Deposit, UnderReview));
        assert!(!is_terminal(TransactionType::Withdraw, Processing));
        assert!(is_terminal(TransactionType::Withdraw, Completed));
    }

    #[test]
    fn test_approve_deposit_once() {
        let mut tx = deposit();
        approve_deposit(&mut tx, "admin", Utc::now()).unwrap();
        assert_eq!(tx.status, TransactionStatus::Approved);
        assert!(tx.approved_at.is_some());
        assert_eq!(tx.amount, 100.0);

        let err = approve_deposit(&mut tx, "admin", Utc::now()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyApproved);
        assert_eq!(tx.status, TransactionStatus::Approved);
    }

    #[test]
    fn test_approve_rejected_deposit_is_invalid_status() {
        let mut tx = deposit();
        reject(&mut tx, TransactionType::Deposit, Some("bad hash"), "admin", Utc::now()).unwrap();
        assert_eq!(tx.metadata["rejectionReason"], "bad hash");
        assert_eq!(tx.metadata["rejectedBy"], "admin");

        let err = approve_deposit(&mut tx, "admin", Utc::now()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStatus);
        assert_eq!(tx.status, TransactionStatus::Rejected);
        assert!(tx.approved_at.is_none());
    }

    #[test]
    fn test_withdraw_sign_flip() {
        let mut tx = withdraw();
        assert_eq!(tx.amount, 50.0);

        approve_withdraw(&mut tx, "admin", Utc::now()).unwrap();
        assert_eq!(tx.status, TransactionStatus::Processing);
        assert_eq!(tx.amount, -50.0);

        let err = approve_withdraw(&mut tx, "admin", Utc::now()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyApproved);
        assert_eq!(tx.amount, -50.0);

        complete_withdraw(&mut tx, Some("0xabc"), Utc::now()).unwrap();
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.amount, -50.0);
        assert_eq!(tx.metadata["settlementRef"], "0xabc");

        let err = approve_withdraw(&mut tx, "admin", Utc::now()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyApproved);
    }

    #[test]
    fn test_rejected_withdraw_keeps_positive_amount() {
        let mut tx = withdraw();
        reject(&mut tx, TransactionType::Withdraw, None, "admin", Utc::now()).unwrap();
        assert_eq!(tx.amount, 50.0);
        assert!(!tx.metadata.contains_key("rejectionReason"));

        let err = reject(&mut tx, TransactionType::Withdraw, None, "admin", Utc::now()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStatus);
    }

    #[test]
    fn test_complete_requires_processing() {
        let mut tx = withdraw();
        let err = complete_withdraw(&mut tx, None, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidStatus {
                expected: TransactionStatus::Processing,
                ..
            }
        ));
        assert_eq!(tx.status, TransactionStatus::UnderReview);
    }

    #[test]
    fn test_reject_after_approval_fails() {
        let mut tx = withdraw();
        approve_withdraw(&mut tx, "admin", Utc::now()).unwrap();
        let err = reject(&mut tx, TransactionType::Withdraw, None, "admin", Utc::now()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStatus);
        assert_eq!(tx.status, TransactionStatus::Processing);
    }

    #[test]
    fn test_wrong_type_rejected() {
        let mut tx = withdraw();
        let err = approve_deposit(&mut tx, "admin", Utc::now()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);

        let mut tx = Transaction::adjustment(10.0, Utc::now(), Metadata::new());
        let err = reject(&mut tx, TransactionType::Deposit, None, "admin", Utc::now()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert_eq!(tx.status, TransactionStatus::Approved);
    }
}
