//! Correlates inbound packets with outstanding requests.
//!
//! Sequence-correlated handlers live in a pending table and fire exactly
//! once: on the matching reply, on retry exhaustion, on the periodic timeout
//! sweep, or on shutdown, whichever removes the entry first. Observers
//! registered for a message kind (or for every kind) are long-lived and are
//! never swept.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::errors::Error;
use crate::packet::{MessageKind, Packet};

/// One-shot resolver for a sequence-correlated request.
pub(crate) type ResponseHandler = Box<dyn FnOnce(Result<Packet, Error>) + Send + 'static>;

/// Long-lived callback invoked for every matching inbound packet.
pub(crate) type MessageObserver = Arc<dyn Fn(&Packet, SocketAddr) + Send + Sync + 'static>;

/// Identifier returned when registering a message observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

pub(crate) struct PendingRequest {
    expected: Vec<MessageKind>,
    accept_ack: bool,
    pub(crate) handler: ResponseHandler,
    pub(crate) deadline: Instant,
}

impl PendingRequest {
    fn matches(&self, kind: MessageKind) -> bool {
        self.expected.contains(&kind)
            || (self.accept_ack && kind == MessageKind::Acknowledgement)
    }
}

#[derive(Default)]
pub(crate) struct Dispatcher {
    pending: HashMap<u8, PendingRequest>,
    observers: Vec<(HandlerId, Option<MessageKind>, MessageObserver)>,
    next_observer: u64,
}

impl Dispatcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a one-shot handler for `sequence`.
    ///
    /// The sequence allocator never hands out a number that is still
    /// pending, so an occupied slot is a bug.
    pub(crate) fn register(
        &mut self,
        sequence: u8,
        expected: Vec<MessageKind>,
        accept_ack: bool,
        deadline: Instant,
        handler: ResponseHandler,
    ) {
        let previous = self.pending.insert(
            sequence,
            PendingRequest {
                expected,
                accept_ack,
                handler,
                deadline,
            },
        );
        debug_assert!(previous.is_none(), "sequence {sequence} reused while pending");
    }

    pub(crate) fn is_pending(&self, sequence: u8) -> bool {
        self.pending.contains_key(&sequence)
    }

    /// Remove and return the pending entry for `sequence` if `kind` matches
    /// its expectation (or it accepts a bare acknowledgement).
    pub(crate) fn resolve(&mut self, sequence: u8, kind: MessageKind) -> Option<PendingRequest> {
        if self.pending.get(&sequence)?.matches(kind) {
            self.pending.remove(&sequence)
        } else {
            None
        }
    }

    /// Remove a pending entry unconditionally (retry exhaustion).
    pub(crate) fn take(&mut self, sequence: u8) -> Option<PendingRequest> {
        self.pending.remove(&sequence)
    }

    /// Remove every entry whose deadline has passed.
    pub(crate) fn sweep(&mut self, now: Instant) -> Vec<PendingRequest> {
        let expired: Vec<u8> = self
            .pending
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .map(|(&seq, _)| seq)
            .collect();
        expired
            .into_iter()
            .filter_map(|seq| self.pending.remove(&seq))
            .collect()
    }

    /// Remove every pending entry (shutdown).
    pub(crate) fn drain(&mut self) -> Vec<PendingRequest> {
        self.pending.drain().map(|(_, entry)| entry).collect()
    }

    /// Register a long-lived observer; `kind` of `None` matches every packet.
    pub(crate) fn add_observer(
        &mut self,
        kind: Option<MessageKind>,
        observer: MessageObserver,
    ) -> HandlerId {
        self.next_observer += 1;
        let id = HandlerId(self.next_observer);
        self.observers.push((id, kind, observer));
        id
    }

    pub(crate) fn remove_observer(&mut self, id: HandlerId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer_id, _, _)| *observer_id != id);
        self.observers.len() != before
    }

    /// Clone the observers interested in `kind`, so they can be invoked
    /// without holding the state lock.
    pub(crate) fn observers_for(&self, kind: MessageKind) -> Vec<MessageObserver> {
        self.observers
            .iter()
            .filter(|(_, filter, _)| filter.is_none() || *filter == Some(kind))
            .map(|(_, _, observer)| Arc::clone(observer))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::packet::{PacketOptions, Payload};

    fn counting_handler(fired: Arc<AtomicUsize>) -> ResponseHandler {
        Box::new(move |_| {
            fired.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn sample_packet() -> Packet {
        Packet::compose(Payload::StatePower { level: 65535 }, PacketOptions::default())
    }

    #[test]
    fn test_resolve_fires_once() {
        let mut dispatcher = Dispatcher::new();
        let fired = Arc::new(AtomicUsize::new(0));
        dispatcher.register(
            7,
            vec![MessageKind::StatePower],
            false,
            Instant::now() + Duration::from_secs(45),
            counting_handler(Arc::clone(&fired)),
        );

        let entry = dispatcher.resolve(7, MessageKind::StatePower).unwrap();
        (entry.handler)(Ok(sample_packet()));
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // A second matching packet has nothing left to resolve.
        assert!(dispatcher.resolve(7, MessageKind::StatePower).is_none());
        assert!(!dispatcher.is_pending(7));
    }

    #[test]
    fn test_resolve_requires_matching_kind() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(
            1,
            vec![MessageKind::StateMultiZone],
            false,
            Instant::now() + Duration::from_secs(45),
            Box::new(|_| {}),
        );
        assert!(dispatcher.resolve(1, MessageKind::StateZone).is_none());
        assert!(dispatcher.is_pending(1));
        assert!(dispatcher.resolve(1, MessageKind::StateMultiZone).is_some());
    }

    #[test]
    fn test_acknowledgement_resolves_when_accepted() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(
            2,
            vec![MessageKind::StatePower],
            true,
            Instant::now() + Duration::from_secs(45),
            Box::new(|_| {}),
        );
        assert!(dispatcher.resolve(2, MessageKind::Acknowledgement).is_some());

        dispatcher.register(
            3,
            vec![MessageKind::StatePower],
            false,
            Instant::now() + Duration::from_secs(45),
            Box::new(|_| {}),
        );
        assert!(dispatcher.resolve(3, MessageKind::Acknowledgement).is_none());
    }

    #[test]
    fn test_sweep_expires_only_past_deadlines() {
        let mut dispatcher = Dispatcher::new();
        let now = Instant::now();
        dispatcher.register(
            1,
            vec![MessageKind::StateLight],
            false,
            now,
            Box::new(|result| assert!(matches!(result, Err(Error::Timeout)))),
        );
        dispatcher.register(
            2,
            vec![MessageKind::StateLight],
            false,
            now + Duration::from_secs(60),
            Box::new(|_| panic!("should not fire")),
        );

        let expired = dispatcher.sweep(now + Duration::from_millis(1));
        assert_eq!(expired.len(), 1);
        for entry in expired {
            (entry.handler)(Err(Error::Timeout));
        }
        assert!(!dispatcher.is_pending(1));
        assert!(dispatcher.is_pending(2));
    }

    #[test]
    fn test_observers_filter_by_kind_and_are_not_swept() {
        let mut dispatcher = Dispatcher::new();
        let seen: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

        let seen_all = Arc::clone(&seen);
        dispatcher.add_observer(
            None,
            Arc::new(move |_, _| seen_all.lock().unwrap().push("all")),
        );
        let seen_power = Arc::clone(&seen);
        let id = dispatcher.add_observer(
            Some(MessageKind::StatePower),
            Arc::new(move |_, _| seen_power.lock().unwrap().push("power")),
        );

        dispatcher.sweep(Instant::now() + Duration::from_secs(3600));

        let addr: SocketAddr = "127.0.0.1:56700".parse().unwrap();
        let packet = sample_packet();
        for observer in dispatcher.observers_for(MessageKind::StatePower) {
            observer(&packet, addr);
        }
        assert_eq!(*seen.lock().unwrap(), vec!["all", "power"]);

        for observer in dispatcher.observers_for(MessageKind::StateLight) {
            observer(&packet, addr);
        }
        assert_eq!(seen.lock().unwrap().len(), 3);

        assert!(dispatcher.remove_observer(id));
        assert!(!dispatcher.remove_observer(id));
        assert_eq!(dispatcher.observers_for(MessageKind::StatePower).len(), 1);
    }

    #[test]
    fn test_drain_returns_all_pending() {
        let mut dispatcher = Dispatcher::new();
        for seq in 0..4u8 {
            dispatcher.register(
                seq,
                vec![MessageKind::Acknowledgement],
                true,
                Instant::now() + Duration::from_secs(45),
                Box::new(|result| assert!(matches!(result, Err(Error::Closed)))),
            );
        }
        let drained = dispatcher.drain();
        assert_eq!(drained.len(), 4);
        for entry in drained {
            (entry.handler)(Err(Error::Closed));
        }
    }
}
