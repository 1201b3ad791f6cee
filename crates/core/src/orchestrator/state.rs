//! Dispatch state machine.
//!
//! This module tracks the lifecycle of one dispatch and emits the matching
//! events. Transitions follow
//! `Pending -> Dispatched -> Aggregating -> Completed`, and any non-terminal
//! state may move to `Failed`.

use dk_protocol::{DispatchState, Event};
use std::time::Instant;
use tokio::sync::mpsc::Sender;
use tracing::warn;
use uuid::Uuid;

/// Whether `from -> to` is a legal transition.
pub fn can_transition(from: DispatchState, to: DispatchState) -> bool {
    use DispatchState::*;
    matches!(
        (from, to),
        (Pending, Dispatched) | (Dispatched, Aggregating) | (Aggregating, Completed)
    ) || (to == Failed && !from.is_terminal())
}

/// Live record of one dispatch.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub id: Uuid,
    pub state: DispatchState,
    pub started: Instant,
}

/// Create a new dispatch in `Pending`.
pub fn create_dispatch() -> Dispatch {
    Dispatch {
        id: Uuid::new_v4(),
        state: DispatchState::Pending,
        started: Instant::now(),
    }
}

/// Move `dispatch` to `next`.
///
/// An illegal transition is logged and ignored.
///
/// # Returns
///
/// `true` if the state changed.
pub fn transition(dispatch: &mut Dispatch, next: DispatchState) -> bool {
    if !can_transition(dispatch.state, next) {
        warn!(
            dispatch_id = %dispatch.id,
            from = ?dispatch.state,
            to = ?next,
            "illegal dispatch transition ignored"
        );
        return false;
    }
    dispatch.state = next;
    true
}

/// Send `event` if a channel is attached. A closed channel is not an error.
pub async fn emit(events_tx: Option<&Sender<Event>>, event: Event) {
    if let Some(tx) = events_tx {
        let _ = tx.send(event).await;
    }
}

/// Mark the dispatch as failed and emit `DispatchFailed`.
///
/// The event carries the state the dispatch failed from.
pub async fn fail_dispatch(dispatch: &mut Dispatch, events_tx: Option<&Sender<Event>>, error: String) {
    let from = dispatch.state;
    if transition(dispatch, DispatchState::Failed) {
        emit(
            events_tx,
            Event::DispatchFailed {
                dispatch_id: dispatch.id,
                state: from,
                error,
            },
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use DispatchState::*;

    #[test]
    fn test_legal_transitions() {
        assert!(can_transition(Pending, Dispatched));
        assert!(can_transition(Dispatched, Aggregating));
        assert!(can_transition(Aggregating, Completed));
        assert!(can_transition(Pending, Failed));
        assert!(can_transition(Aggregating, Failed));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!can_transition(Pending, Completed));
        assert!(!can_transition(Dispatched, Completed));
        assert!(!can_transition(Completed, Failed));
        assert!(!can_transition(Failed, Dispatched));
    }

    #[test]
    fn test_transition_ignores_illegal_moves() {
        let mut dispatch = create_dispatch();
        assert!(!transition(&mut dispatch, Completed));
        assert_eq!(dispatch.state, Pending);
        assert!(transition(&mut dispatch, Dispatched));
        assert_eq!(dispatch.state, Dispatched);
    }

    #[tokio::test]
    async fn test_fail_dispatch_emits_event() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut dispatch = create_dispatch();
        transition(&mut dispatch, Dispatched);

        fail_dispatch(&mut dispatch, Some(&tx), "boom".to_string()).await;

        assert_eq!(dispatch.state, Failed);
        match rx.recv().await {
            Some(Event::DispatchFailed { state, error, .. }) => {
                assert_eq!(state, Dispatched);
                assert_eq!(error, "boom");
            }
            other => panic!("Expected DispatchFailed, got {other:?}"),
        }
    }
}
