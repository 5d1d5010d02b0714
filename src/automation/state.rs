//! Capture session state machine.
//!
//! The session sequences through: Idle → Capturing → Stopped.
//! `step` consumes one classified frame and returns the events it caused; it
//! performs no I/O, so the runner decides how events reach the caller.

use crate::automation::config::CaptureConfig;
use crate::glyph::{CapturedSymbol, Catalog, match_by_name, match_by_name_and_index};

/// Capture session states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Waiting for indicator hexagons to appear
    Idle,
    /// Hexagons visible, accumulating glyphs
    Capturing,
    /// Session over; the polling loop must be cancelled
    Stopped,
}

impl std::fmt::Display for CaptureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureState::Idle => write!(f, "Idle"),
            CaptureState::Capturing => write!(f, "Capturing"),
            CaptureState::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Hexagons disappeared while capturing
    DrawingEnded,
    /// Every slot already holds a glyph
    SlotsFilled,
    /// Exactly one known sequence fits the captured glyphs
    Resolved,
    /// Too many ticks without progress
    LongIdle,
    /// Stopped by the caller
    Cancelled,
    /// The frame source has no more frames
    SourceExhausted,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::DrawingEnded => write!(f, "drawing ended"),
            StopReason::SlotsFilled => write!(f, "all slots filled"),
            StopReason::Resolved => write!(f, "sequence resolved"),
            StopReason::LongIdle => write!(f, "long idle"),
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::SourceExhausted => write!(f, "no more frames"),
        }
    }
}

/// One classified frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameObservation {
    pub hexagon_count: usize,
    pub symbol: Option<String>,
    pub slot: Option<usize>,
    /// Microseconds since the session started, taken when the frame was requested
    pub timestamp: u64,
}

/// Side effects of a state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Hexagons appeared; `target_length` glyphs are expected
    Started { target_length: usize },
    /// A new glyph was appended at `position`
    SymbolCaptured {
        symbol: CapturedSymbol,
        position: usize,
    },
    /// The captured glyphs identify exactly one sequence
    SequenceResolved(Vec<String>),
    LongIdleTimeout,
    /// Emitted once, on the transition into `Stopped`
    Stopped(StopReason),
}

/// Mutable state of one capture run.
#[derive(Debug, Clone)]
pub struct CaptureSession {
    captured: Vec<CapturedSymbol>,
    target_length: usize,
    state: CaptureState,
    idle_counter: u32,
    busy_counter: u32,
    last_accepted: Option<u64>,
    resolved: Option<Vec<String>>,
    idle_tick_limit: u32,
    busy_tick_limit: u32,
}

impl CaptureSession {
    pub fn new(limits: &CaptureConfig) -> Self {
        Self {
            captured: Vec::new(),
            target_length: 0,
            state: CaptureState::Idle,
            idle_counter: 0,
            busy_counter: 0,
            last_accepted: None,
            resolved: None,
            idle_tick_limit: limits.idle_tick_limit,
            busy_tick_limit: limits.busy_tick_limit,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn captured(&self) -> &[CapturedSymbol] {
        &self.captured
    }

    pub fn target_length(&self) -> usize {
        self.target_length
    }

    pub fn resolved(&self) -> Option<&[String]> {
        self.resolved.as_deref()
    }

    pub fn idle_counter(&self) -> u32 {
        self.idle_counter
    }

    pub fn busy_counter(&self) -> u32 {
        self.busy_counter
    }

    /// Start procedure: forget everything and wait for hexagons.
    pub fn reset(&mut self) {
        self.captured.clear();
        self.target_length = 0;
        self.state = CaptureState::Idle;
        self.idle_counter = 0;
        self.busy_counter = 0;
        self.last_accepted = None;
        self.resolved = None;
    }

    /// Drops the captured history and the target length. The lifecycle state is left alone.
    pub fn clear(&mut self) {
        self.captured.clear();
        self.target_length = 0;
        self.resolved = None;
        self.last_accepted = None;
    }

    /// Advances the session by one classified frame.
    pub fn step(&mut self, obs: &FrameObservation, catalog: &Catalog) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if self.state == CaptureState::Stopped {
            return events;
        }

        let hex = obs.hexagon_count;

        // A frame showing more slots than glyphs but no readable glyph is noise.
        if self.state == CaptureState::Capturing
            && hex != 0
            && obs.symbol.is_none()
            && hex > self.captured.len()
        {
            return events;
        }

        match self.state {
            CaptureState::Idle => {
                if hex != 0 {
                    self.state = CaptureState::Capturing;
                    self.target_length = hex;
                    crate::log(&format!("Capture: {} slot(s) visible, capturing", hex));
                    events.push(SessionEvent::Started { target_length: hex });
                } else {
                    self.idle_counter += 1;
                    if self.idle_counter > self.idle_tick_limit {
                        events.push(SessionEvent::LongIdleTimeout);
                        self.finish(StopReason::LongIdle, &mut events);
                    }
                }
            }
            CaptureState::Capturing => {
                if hex == 0 {
                    self.finish(StopReason::DrawingEnded, &mut events);
                } else if self.captured.len() == hex {
                    self.finish(StopReason::SlotsFilled, &mut events);
                } else if obs.symbol.is_none() {
                    self.busy_counter += 1;
                    self.target_length = hex;
                    if self.busy_counter > self.busy_tick_limit {
                        events.push(SessionEvent::LongIdleTimeout);
                        self.finish(StopReason::LongIdle, &mut events);
                    }
                }
            }
            CaptureState::Stopped => {}
        }

        if self.state == CaptureState::Capturing {
            if let Some(name) = &obs.symbol {
                self.accept(name, obs, catalog, &mut events);
            }
        }

        events
    }

    fn accept(&mut self, name: &str, obs: &FrameObservation, catalog: &Catalog, events: &mut Vec<SessionEvent>) {
        let hex = obs.hexagon_count;
        let repeated = self.captured.last().is_some_and(|last| {
            if hex >= 3 {
                last.name == name && last.slot == obs.slot
            } else {
                last.name == name
            }
        });
        if repeated {
            return;
        }
        if self.last_accepted.is_some_and(|t| obs.timestamp <= t) {
            crate::log(&format!(
                "Capture: dropping stale reading '{}' from t={}us",
                name, obs.timestamp
            ));
            return;
        }

        self.last_accepted = Some(obs.timestamp);
        self.push_symbol(CapturedSymbol::new(name, obs.slot), events);
        self.try_resolve(catalog, hex >= 3, events);
    }

    /// Appends a glyph read outside the polling loop.
    pub fn add_manual(&mut self, symbol: CapturedSymbol, catalog: &Catalog) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        self.push_symbol(symbol, &mut events);
        if self.target_length > 0 && self.state != CaptureState::Stopped {
            self.try_resolve(catalog, self.target_length >= 3, &mut events);
        }
        events
    }

    /// Stops from outside the tick procedure. Does nothing when already stopped.
    pub fn stop(&mut self, reason: StopReason) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if self.state != CaptureState::Stopped {
            self.finish(reason, &mut events);
        }
        events
    }

    fn push_symbol(&mut self, symbol: CapturedSymbol, events: &mut Vec<SessionEvent>) {
        let position = self.captured.len();
        crate::log(&format!(
            "Capture: #{} '{}' (slot {:?})",
            position + 1,
            symbol.name,
            symbol.slot
        ));
        self.captured.push(symbol.clone());
        events.push(SessionEvent::SymbolCaptured { symbol, position });
    }

    fn try_resolve(&mut self, catalog: &Catalog, by_slot: bool, events: &mut Vec<SessionEvent>) {
        if self.target_length == 0 {
            return;
        }
        let candidates = if by_slot {
            match_by_name_and_index(catalog, self.target_length, &self.captured)
        } else {
            let names: Vec<&str> = self.captured.iter().map(|c| c.name.as_str()).collect();
            match_by_name(catalog, self.target_length, &names)
        };

        if let [only] = candidates.as_slice() {
            let glyphs = only.glyphs.clone();
            crate::log(&format!("Capture: resolved {}", glyphs.join(" ")));
            self.resolved = Some(glyphs.clone());
            events.push(SessionEvent::SequenceResolved(glyphs));
            self.finish(StopReason::Resolved, events);
        } else {
            crate::log(&format!(
                "Capture: {} candidate sequence(s) of length {}",
                candidates.len(),
                self.target_length
            ));
        }
    }

    /// Stop procedure: enter `Stopped` and clear the transient counters.
    fn finish(&mut self, reason: StopReason, events: &mut Vec<SessionEvent>) {
        crate::log(&format!(
            "Capture: stopped ({}) with {} glyph(s)",
            reason,
            self.captured.len()
        ));
        self.state = CaptureState::Stopped;
        self.idle_counter = 0;
        self.busy_counter = 0;
        events.push(SessionEvent::Stopped(reason));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::from_text(
            "a,01\nb,02\nc,03\nd,04\ne,05\n",
            "a,b,c\na,c,b\nb,d,e\na,b\nd,e\n",
        )
        .unwrap()
    }

    fn obs(hexagon_count: usize, symbol: Option<&str>, slot: Option<usize>, timestamp: u64) -> FrameObservation {
        FrameObservation {
            hexagon_count,
            symbol: symbol.map(str::to_string),
            slot,
            timestamp,
        }
    }

    fn session() -> CaptureSession {
        CaptureSession::new(&CaptureConfig::default())
    }

    #[test]
    fn test_drawing_scenario() {
        let catalog = catalog();
        let mut s = session();
        let ticks = [
            obs(0, None, None, 1),
            obs(0, None, None, 2),
            obs(3, None, None, 3),
            obs(3, Some("a"), Some(0), 4),
            obs(3, None, None, 5),
            obs(0, None, None, 6),
        ];

        let events: Vec<Vec<SessionEvent>> = ticks.iter().map(|t| s.step(t, &catalog)).collect();

        assert!(events[0].is_empty() && events[1].is_empty());
        assert_eq!(events[2], vec![SessionEvent::Started { target_length: 3 }]);
        assert_eq!(
            events[3],
            vec![SessionEvent::SymbolCaptured {
                symbol: CapturedSymbol::new("a", Some(0)),
                position: 0,
            }]
        );
        assert!(events[4].is_empty(), "noise frame is skipped");
        assert_eq!(events[5], vec![SessionEvent::Stopped(StopReason::DrawingEnded)]);
        assert_eq!(s.state(), CaptureState::Stopped);
        assert_eq!(s.captured().len(), 1, "history survives the stop");
    }

    #[test]
    fn test_long_idle_fires_once_at_tick_51() {
        let catalog = catalog();
        let mut s = session();
        let mut timeouts = Vec::new();

        for tick in 1..=70u64 {
            let events = s.step(&obs(0, None, None, tick), &catalog);
            if events.contains(&SessionEvent::LongIdleTimeout) {
                timeouts.push(tick);
            }
            if tick < 51 {
                assert_eq!(s.state(), CaptureState::Idle);
            }
        }

        assert_eq!(timeouts, vec![51]);
        assert_eq!(s.state(), CaptureState::Stopped);
    }

    #[test]
    fn test_busy_timeout() {
        let catalog = catalog();
        let mut s = session();
        s.step(&obs(3, None, None, 1), &catalog);
        s.step(&obs(3, Some("c"), Some(0), 2), &catalog);
        s.step(&obs(3, Some("d"), Some(1), 3), &catalog);
        assert_eq!(s.captured().len(), 2);

        // Fewer slots than glyphs and nothing readable: the session is stuck.
        let mut fired_at = None;
        for tick in 0..100u64 {
            let events = s.step(&obs(1, None, None, 10 + tick), &catalog);
            if events.contains(&SessionEvent::LongIdleTimeout) {
                fired_at = Some(tick + 1);
                break;
            }
        }

        assert_eq!(fired_at, Some(66));
        assert_eq!(s.state(), CaptureState::Stopped);
    }

    #[test]
    fn test_repeated_reading_is_deduplicated() {
        let catalog = catalog();
        let mut s = session();
        s.step(&obs(3, None, None, 1), &catalog);
        s.step(&obs(3, Some("a"), Some(0), 2), &catalog);
        let events = s.step(&obs(3, Some("a"), Some(0), 3), &catalog);

        assert!(events.is_empty());
        assert_eq!(s.captured().len(), 1);

        // Same name in a new slot is a new glyph once three or more slots are shown.
        s.step(&obs(3, Some("a"), Some(1), 4), &catalog);
        assert_eq!(s.captured().len(), 2);
    }

    #[test]
    fn test_name_only_dedupe_below_three_slots() {
        let catalog = catalog();
        let mut s = session();
        s.step(&obs(2, None, None, 1), &catalog);
        s.step(&obs(2, Some("c"), Some(0), 2), &catalog);
        s.step(&obs(2, Some("c"), Some(1), 3), &catalog);

        assert_eq!(s.captured().len(), 1);
    }

    #[test]
    fn test_stale_timestamp_is_rejected() {
        let catalog = catalog();
        let mut s = session();
        s.step(&obs(3, None, None, 1), &catalog);
        s.step(&obs(3, Some("a"), Some(0), 10), &catalog);

        let events = s.step(&obs(3, Some("c"), Some(1), 9), &catalog);

        assert!(events.is_empty());
        assert_eq!(s.captured(), &[CapturedSymbol::new("a", Some(0))]);
    }

    #[test]
    fn test_unique_match_resolves_and_stops() {
        let catalog = catalog();
        let mut s = session();
        s.step(&obs(3, None, None, 1), &catalog);
        s.step(&obs(3, Some("a"), Some(0), 2), &catalog);
        assert_eq!(s.state(), CaptureState::Capturing, "a,b,c and a,c,b both fit");

        let events = s.step(&obs(3, Some("b"), Some(1), 3), &catalog);

        let resolved = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert!(events.contains(&SessionEvent::SequenceResolved(resolved.clone())));
        assert_eq!(events.last(), Some(&SessionEvent::Stopped(StopReason::Resolved)));
        assert_eq!(s.resolved(), Some(resolved.as_slice()));
        assert_eq!(s.state(), CaptureState::Stopped);
    }

    #[test]
    fn test_slots_filled_stops() {
        let catalog = catalog();
        let mut s = session();
        s.step(&obs(2, None, None, 1), &catalog);
        s.step(&obs(2, Some("x"), None, 2), &catalog);
        s.step(&obs(2, Some("y"), None, 3), &catalog);
        let events = s.step(&obs(2, Some("y"), None, 4), &catalog);

        assert_eq!(events, vec![SessionEvent::Stopped(StopReason::SlotsFilled)]);
    }

    #[test]
    fn test_stopped_ignores_further_frames() {
        let catalog = catalog();
        let mut s = session();
        assert_eq!(s.stop(StopReason::Cancelled), vec![SessionEvent::Stopped(StopReason::Cancelled)]);
        assert!(s.stop(StopReason::Cancelled).is_empty());
        assert!(s.step(&obs(3, Some("a"), Some(0), 5), &catalog).is_empty());
        assert!(s.captured().is_empty());
    }

    #[test]
    fn test_reset_and_clear() {
        let catalog = catalog();
        let mut s = session();
        s.step(&obs(3, None, None, 1), &catalog);
        s.step(&obs(3, Some("a"), Some(0), 2), &catalog);

        s.clear();
        assert!(s.captured().is_empty());
        assert_eq!(s.target_length(), 0);
        assert_eq!(s.state(), CaptureState::Capturing);

        s.stop(StopReason::Cancelled);
        s.reset();
        assert_eq!(s.state(), CaptureState::Idle);
        assert_eq!(s.target_length(), 0);
        assert_eq!(s.idle_counter(), 0);
    }

    #[test]
    fn test_manual_add_resolves_when_length_known() {
        let catalog = catalog();
        let mut s = session();
        let events = s.add_manual(CapturedSymbol::new("d", None), &catalog);
        assert_eq!(events.len(), 1, "length unknown, nothing to match");

        s.step(&obs(2, None, None, 1), &catalog);
        let events = s.add_manual(CapturedSymbol::new("e", None), &catalog);
        assert!(events.contains(&SessionEvent::SequenceResolved(vec!["d".into(), "e".into()])));
    }
}
