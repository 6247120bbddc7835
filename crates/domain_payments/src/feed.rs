//! Change feed for proof activity
//!
//! Staff dashboards subscribe to learn about new uploads and reviews as they
//! happen. Publishing never fails the operation that produced the event;
//! consumers that lag or are absent can always poll the store instead.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use core_kernel::{InstallmentId, PaymentPlanId, PaymentProofId};
use crate::proof::ReviewDecision;

const DEFAULT_CAPACITY: usize = 256;

/// Something happened to a proof
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProofEvent {
    Submitted {
        proof_id: PaymentProofId,
        installment_id: InstallmentId,
        plan_id: PaymentPlanId,
    },
    Reviewed {
        proof_id: PaymentProofId,
        installment_id: InstallmentId,
        plan_id: PaymentPlanId,
        decision: ReviewDecision,
    },
}

pub type ProofEventReceiver = broadcast::Receiver<Arc<ProofEvent>>;

/// In-process broadcast of proof events
#[derive(Debug, Clone)]
pub struct ProofEventFeed {
    tx: broadcast::Sender<Arc<ProofEvent>>,
}

impl ProofEventFeed {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> ProofEventReceiver {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: ProofEvent) {
        // no receivers is fine
        if let Err(e) = self.tx.send(Arc::new(event)) {
            debug!("Proof event dropped (no subscribers): {:?}", e.0);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ProofEventFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let feed = ProofEventFeed::new();
        let mut rx = feed.subscribe();

        let event = ProofEvent::Submitted {
            proof_id: PaymentProofId::new(),
            installment_id: InstallmentId::new(),
            plan_id: PaymentPlanId::new(),
        };
        feed.publish(event.clone());

        assert_eq!(*rx.recv().await.unwrap(), event);
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let feed = ProofEventFeed::new();
        assert_eq!(feed.subscriber_count(), 0);
        feed.publish(ProofEvent::Reviewed {
            proof_id: PaymentProofId::new(),
            installment_id: InstallmentId::new(),
            plan_id: PaymentPlanId::new(),
            decision: ReviewDecision::Rejected,
        });
    }
}
