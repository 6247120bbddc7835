//! Server-sent events for proof activity

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::warn;

use domain_payments::ProofEvent;

use crate::AppState;

fn event_name(event: &ProofEvent) -> &'static str {
    match event {
        ProofEvent::Submitted { .. } => "submitted",
        ProofEvent::Reviewed { .. } => "reviewed",
    }
}

/// Streams proof submissions and reviews as they happen
///
/// A subscriber that falls behind skips the events it missed; the plan view
/// always has the current state.
pub async fn proof_events(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = BroadcastStream::new(state.proof_linker.feed().subscribe()).filter_map(|message| match message {
        Ok(event) => match Event::default().event(event_name(&event)).json_data(event.as_ref()) {
            Ok(sse) => Some(Ok::<_, Infallible>(sse)),
            Err(e) => {
                warn!(error = %e, "Proof event could not be encoded");
                None
            }
        },
        Err(e) => {
            warn!(error = %e, "Proof event subscriber lagged");
            None
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{InstallmentId, PaymentPlanId, PaymentProofId};
    use domain_payments::ReviewDecision;

    #[test]
    fn test_event_names() {
        let submitted = ProofEvent::Submitted {
            proof_id: PaymentProofId::new(),
            installment_id: InstallmentId::new(),
            plan_id: PaymentPlanId::new(),
        };
        let reviewed = ProofEvent::Reviewed {
            proof_id: PaymentProofId::new(),
            installment_id: InstallmentId::new(),
            plan_id: PaymentPlanId::new(),
            decision: ReviewDecision::Approved,
        };
        assert_eq!(event_name(&submitted), "submitted");
        assert_eq!(event_name(&reviewed), "reviewed");
    }
}
