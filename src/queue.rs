//! Outbound send queue: rate limiting and retry-on-timeout bookkeeping.
//!
//! Transmission happens at most once per rate-limit tick, modeling the
//! processing ceiling of the bulbs' constrained radios; bursts queue instead
//! of being sent back-to-back. Units that expect a reply are re-transmitted
//! after `resend_delay` while their request is still pending, up to the
//! configured number of extra attempts, and reported as expired afterwards.
//!
//! The queue is pure bookkeeping driven by an injected clock, so the spacing
//! and retry properties are testable without sockets or timers.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// One encoded packet waiting to be transmitted.
#[derive(Debug, Clone)]
pub(crate) struct OutboundUnit {
    pub bytes: Vec<u8>,
    pub addr: SocketAddr,
    pub sequence: u8,
    /// Whether an acknowledgement/response must arrive for this unit.
    pub needs_reply: bool,
    /// Wire attempts left, counting the first transmission.
    pub sends_remaining: u8,
}

#[derive(Debug)]
struct AwaitingReply {
    unit: OutboundUnit,
    deadline: Instant,
}

/// Result of one rate-limit tick.
#[derive(Debug, Default)]
pub(crate) struct TickResult {
    /// Bytes to put on the wire this tick, with their destination and
    /// sequence number.
    pub transmit: Option<(Vec<u8>, SocketAddr, u8)>,
    /// Sequences whose retries are exhausted without a reply.
    pub expired: Vec<u8>,
}

pub(crate) struct SendQueue {
    queue: VecDeque<OutboundUnit>,
    awaiting: Vec<AwaitingReply>,
    rate_limit: Duration,
    resend_delay: Duration,
    last_transmission: Option<Instant>,
}

impl SendQueue {
    pub(crate) fn new(rate_limit: Duration, resend_delay: Duration) -> Self {
        SendQueue {
            queue: VecDeque::new(),
            awaiting: Vec::new(),
            rate_limit,
            resend_delay,
            last_transmission: None,
        }
    }

    pub(crate) fn push(&mut self, unit: OutboundUnit) {
        self.queue.push_back(unit);
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.awaiting.is_empty()
    }

    /// Advance the queue: requeue due resends, expire exhausted units, and
    /// pick at most one unit to transmit.
    ///
    /// `is_pending` reports whether a sequence still has an unresolved
    /// request; resolved units are silently dropped from the resend ledger.
    pub(crate) fn tick(&mut self, now: Instant, is_pending: impl Fn(u8) -> bool) -> TickResult {
        let mut result = TickResult::default();

        let mut index = 0;
        while index < self.awaiting.len() {
            if self.awaiting[index].deadline > now {
                index += 1;
                continue;
            }
            let due = self.awaiting.swap_remove(index);
            if !is_pending(due.unit.sequence) {
                continue;
            }
            if due.unit.sends_remaining == 0 {
                result.expired.push(due.unit.sequence);
            } else {
                // Retries jump the queue; they are already late.
                self.queue.push_front(due.unit);
            }
        }

        let spacing_ok = self
            .last_transmission
            .is_none_or(|last| now.saturating_duration_since(last) >= self.rate_limit);
        if spacing_ok && let Some(mut unit) = self.queue.pop_front() {
            self.last_transmission = Some(now);
            result.transmit = Some((unit.bytes.clone(), unit.addr, unit.sequence));
            if unit.needs_reply {
                unit.sends_remaining = unit.sends_remaining.saturating_sub(1);
                self.awaiting.push(AwaitingReply {
                    unit,
                    deadline: now + self.resend_delay,
                });
            }
        }

        result
    }
}
