//! Work queue carrying classified frames from capture tasks to the session worker.
//!
//! Uses std::sync::mpsc channel: many capture tasks send, one session worker receives.
//! Items may arrive out of tick order; the session's timestamp check sorts that out.

use chrono::{DateTime, Local};
use std::sync::mpsc::{Receiver, Sender, channel};

use crate::automation::classify::FrameClassification;
use crate::automation::state::FrameObservation;

/// A classified frame waiting for the session worker.
#[derive(Debug, Clone)]
pub struct FrameWorkItem {
    /// Tick number (1-based) that requested the frame
    pub tick: u64,
    /// Microseconds since session start when the frame was requested
    pub timestamp: u64,
    pub classification: FrameClassification,
    /// Wall-clock time the classification finished
    pub classified_at: DateTime<Local>,
}

impl FrameWorkItem {
    /// Creates a new work item.
    pub fn new(tick: u64, timestamp: u64, classification: FrameClassification) -> Self {
        Self {
            tick,
            timestamp,
            classification,
            classified_at: Local::now(),
        }
    }

    /// The state machine's view of this frame.
    pub fn observation(&self) -> FrameObservation {
        FrameObservation {
            hexagon_count: self.classification.hexagon_count,
            symbol: self.classification.symbol.clone(),
            slot: self.classification.slot,
            timestamp: self.timestamp,
        }
    }
}

/// Creates a new work queue.
///
/// Returns a tuple of (sender, receiver):
/// - Each capture task gets a clone of the sender
/// - The receiver is drained by the session worker thread
///
/// The channel closes once the driver and every in-flight task have dropped their senders.
pub fn create_work_queue() -> (Sender<FrameWorkItem>, Receiver<FrameWorkItem>) {
    channel()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn classification(symbol: &str) -> FrameClassification {
        FrameClassification {
            hexagon_count: 3,
            symbol: Some(symbol.to_string()),
            slot: Some(0),
        }
    }

    #[test]
    fn test_work_queue_send_receive() {
        let (sender, receiver) = create_work_queue();

        sender
            .send(FrameWorkItem::new(1, 200_000, classification("open")))
            .expect("Failed to send");

        let received = receiver.recv().expect("Failed to receive");
        assert_eq!(received.tick, 1);
        let obs = received.observation();
        assert_eq!(obs.timestamp, 200_000);
        assert_eq!(obs.symbol.as_deref(), Some("open"));
        assert_eq!(obs.hexagon_count, 3);
    }

    #[test]
    fn test_many_senders() {
        let (sender, receiver) = create_work_queue();

        let handles: Vec<_> = (1..=5u64)
            .map(|tick| {
                let sender = sender.clone();
                thread::spawn(move || {
                    sender
                        .send(FrameWorkItem::new(tick, tick * 1000, classification("see")))
                        .unwrap();
                })
            })
            .collect();
        drop(sender);
        for handle in handles {
            handle.join().unwrap();
        }

        let mut ticks: Vec<u64> = receiver.iter().map(|item| item.tick).collect();
        ticks.sort();
        assert_eq!(ticks, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_channel_closes_when_sender_dropped() {
        let (sender, receiver) = create_work_queue();

        sender
            .send(FrameWorkItem::new(1, 0, FrameClassification::default()))
            .unwrap();
        drop(sender);

        assert!(receiver.recv().is_ok());
        assert!(receiver.recv().is_err());
    }
}
