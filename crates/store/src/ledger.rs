//! Credit ledger client: atomic deduction and compensating refunds.
//!
//! Both operations are remote procedures that the backend keeps
//! idempotent per `(user_id, job_id)` pair, so repeating a refund for
//! the same job can never double-credit. The retry policy for refunds
//! lives here in [`refund_with_retry`]; a single attempt is just an RPC.

use std::time::Duration;

use artio_core::types::{JobId, UserId};
use async_trait::async_trait;
use serde_json::json;

use crate::backend::{Backend, StoreError};

/// Result of a deduction attempt that reached the ledger.
///
/// An insufficient balance is a data outcome, not a transport error:
/// the RPC succeeded and answered "no".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeductOutcome {
    Deducted,
    InsufficientCredits,
}

/// Atomic deduct/refund operations against the remote ledger.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Validate balance and deduct in one atomic remote call.
    async fn deduct(
        &self,
        user_id: UserId,
        amount: u32,
        job_id: JobId,
    ) -> Result<DeductOutcome, StoreError>;

    /// One refund attempt. Retrying is the caller's job (see
    /// [`refund_with_retry`]).
    async fn refund(&self, user_id: UserId, amount: u32, job_id: JobId)
        -> Result<(), StoreError>;
}

/// Outcome of a retried refund. Never an `Err`: exhaustion is reported
/// as `success: false` so the caller can still finalize job state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefundOutcome {
    pub success: bool,
    pub attempts: u32,
}

/// Backoff before the retry following `attempt` (1-based): `2^attempt`
/// seconds.
pub fn refund_backoff(attempt: u32) -> Duration {
    Duration::from_secs(2u64.pow(attempt))
}

/// Refund with exponential backoff, up to `max_attempts` tries.
///
/// Success on any attempt short-circuits. Exhausting every attempt is
/// logged as a critical condition needing manual ledger reconciliation,
/// and reported as `success: false` rather than raised, so the job can
/// still be moved to its terminal state.
pub async fn refund_with_retry(
    ledger: &dyn CreditLedger,
    user_id: UserId,
    amount: u32,
    job_id: JobId,
    max_attempts: u32,
) -> RefundOutcome {
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        match ledger.refund(user_id, amount, job_id).await {
            Ok(()) => {
                tracing::info!(%job_id, amount, attempt, "Refunded credits");
                return RefundOutcome {
                    success: true,
                    attempts: attempt,
                };
            }
            Err(e) => {
                tracing::warn!(
                    %job_id,
                    attempt,
                    max_attempts,
                    error = %e,
                    "Credit refund attempt failed",
                );
                last_error = Some(e);
            }
        }

        // No backoff after the final attempt.
        if attempt < max_attempts {
            tokio::time::sleep(refund_backoff(attempt)).await;
        }
    }

    tracing::error!(
        %job_id,
        %user_id,
        amount,
        max_attempts,
        last_error = %last_error.map(|e| e.to_string()).unwrap_or_default(),
        "CRITICAL: credit refund exhausted all attempts, manual reconciliation required",
    );
    RefundOutcome {
        success: false,
        attempts: max_attempts,
    }
}

/// [`CreditLedger`] over the backend's `deduct_credits` /
/// `refund_credits` remote procedures.
pub struct HttpCreditLedger {
    backend: Backend,
}

impl HttpCreditLedger {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl CreditLedger for HttpCreditLedger {
    async fn deduct(
        &self,
        user_id: UserId,
        amount: u32,
        job_id: JobId,
    ) -> Result<DeductOutcome, StoreError> {
        // The RPC validates and deducts atomically, returning a bare
        // boolean: true = deducted, false = insufficient balance.
        let deducted: bool = self
            .backend
            .rpc(
                "deduct_credits",
                &json!({
                    "p_user_id": user_id,
                    "p_amount": amount,
                    "p_description": "Image generation",
                    "p_reference_id": job_id,
                }),
            )
            .await?;

        if deducted {
            Ok(DeductOutcome::Deducted)
        } else {
            Ok(DeductOutcome::InsufficientCredits)
        }
    }

    async fn refund(
        &self,
        user_id: UserId,
        amount: u32,
        job_id: JobId,
    ) -> Result<(), StoreError> {
        self.backend
            .rpc::<serde_json::Value>(
                "refund_credits",
                &json!({
                    "p_user_id": user_id,
                    "p_amount": amount,
                    "p_description": "Refund for failed generation",
                    "p_reference_id": job_id,
                }),
            )
            .await?;
        Ok(())
    }
}
