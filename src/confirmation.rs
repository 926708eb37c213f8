//! Bounded, cancellable confirmation wait

use std::future::Future;
use tokio::sync::watch;

use crate::node::{NodeClient, PendingTransactionInfo};
use crate::transaction::TransactionId;
use crate::{AlgoXzenError, Result};

/// Sender side of a flow's cancellation signal
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn new() -> (Self, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, CancelSignal { rx: Some(rx) })
    }

    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    /// Another receiver for the same signal
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: Some(self.tx.subscribe()),
        }
    }
}

/// Receiver side; cheap to clone into each step of a flow
#[derive(Clone, Debug)]
pub struct CancelSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl CancelSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    /// Resolves once cancellation is requested; never resolves otherwise
    pub async fn cancelled(&mut self) {
        let Some(rx) = self.rx.as_mut() else {
            return std::future::pending().await;
        };
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                // Handle dropped: the last value is final
                if *rx.borrow() {
                    return;
                }
                return std::future::pending().await;
            }
        }
    }

    /// Run `fut` unless cancellation arrives first
    pub async fn guard<T, F>(&mut self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_cancelled() {
            return Err(AlgoXzenError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(AlgoXzenError::Cancelled),
            res = fut => res,
        }
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::never()
    }
}

/// Poll `txid` until it is confirmed, rejected, `max_rounds` rounds pass or
/// `cancel` fires.
pub async fn wait_for_confirmation(
    node: &dyn NodeClient,
    txid: &TransactionId,
    max_rounds: u64,
    mut cancel: CancelSignal,
) -> Result<PendingTransactionInfo> {
    let max_rounds = max_rounds.max(1);
    let status = cancel.guard(node.status()).await?;
    let mut current = status.last_round;

    for _ in 0..max_rounds {
        let info = cancel.guard(node.pending_transaction(txid)).await?;
        if let Some(round) = info.confirmed() {
            log::info!("Transaction {} confirmed in round {}", txid, round);
            return Ok(info);
        }
        if !info.pool_error.is_empty() {
            return Err(AlgoXzenError::TransactionRejected {
                txid: txid.to_string(),
                reason: info.pool_error,
            });
        }
        log::debug!("Transaction {} pending at round {}", txid, current);
        current = cancel
            .guard(node.status_after_block(current))
            .await?
            .last_round;
    }

    Err(AlgoXzenError::ConfirmationTimeout {
        txid: txid.to_string(),
        rounds: max_rounds,
    })
}
