//! Auto-capture runner.
//!
//! Coordinates the driver thread, the per-tick capture tasks and the session
//! worker. The driver spawns one capture task per tick without waiting for the
//! previous one; tasks classify their frame and queue the result; the worker
//! feeds results to the session state machine and reports events.

use image::RgbaImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::automation::classify::{Classifier, FrameClassification};
use crate::automation::config::RecorderConfig;
use crate::automation::queue::{FrameWorkItem, create_work_queue};
use crate::automation::state::{CaptureSession, CaptureState, SessionEvent, StopReason};
use crate::calibration::Calibration;
use crate::capture::FrameSource;
use crate::error::{CaptureError, ConfigError, SessionError};
use crate::glyph::{CapturedSymbol, Catalog};

/// Receives session notifications, one batch at a time and in the order the
/// session changed, from whichever thread changed it.
pub trait SessionListener: Send + Sync {
    fn on_capture_started(&self, _target_length: usize) {}
    fn on_symbol_captured(&self, _symbol: &CapturedSymbol, _position: usize) {}
    fn on_sequence_resolved(&self, _glyphs: &[String]) {}
    fn on_long_idle_timeout(&self) {}
    fn on_stopped(&self, _reason: StopReason, _history: &[CapturedSymbol]) {}
}

/// Writes every notification to the log.
pub struct LogListener;

impl SessionListener for LogListener {
    fn on_capture_started(&self, target_length: usize) {
        crate::log(&format!("Drawing started: {} glyph(s) expected", target_length));
    }

    fn on_symbol_captured(&self, symbol: &CapturedSymbol, position: usize) {
        crate::log(&format!("Glyph #{}: {}", position + 1, symbol.name));
    }

    fn on_sequence_resolved(&self, glyphs: &[String]) {
        crate::log(&format!("Sequence: {}", glyphs.join(" ")));
    }

    fn on_long_idle_timeout(&self) {
        crate::log("Nothing happened for too long, giving up");
    }

    fn on_stopped(&self, reason: StopReason, history: &[CapturedSymbol]) {
        let names: Vec<&str> = history.iter().map(|s| s.name.as_str()).collect();
        crate::log(&format!("Session stopped ({}): [{}]", reason, names.join(", ")));
    }
}

fn lock_session(session: &Mutex<CaptureSession>) -> MutexGuard<'_, CaptureSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

fn dispatch(listener: &dyn SessionListener, events: &[SessionEvent], history: &[CapturedSymbol]) {
    for event in events {
        match event {
            SessionEvent::Started { target_length } => listener.on_capture_started(*target_length),
            SessionEvent::SymbolCaptured { symbol, position } => {
                listener.on_symbol_captured(symbol, *position)
            }
            SessionEvent::SequenceResolved(glyphs) => listener.on_sequence_resolved(glyphs),
            SessionEvent::LongIdleTimeout => listener.on_long_idle_timeout(),
            SessionEvent::Stopped(reason) => listener.on_stopped(*reason, history),
        }
    }
}

/// Hands out notification turns in the order session updates were made, so
/// listeners see events in that order even when several threads update the
/// session.
#[derive(Default)]
struct DispatchOrder {
    /// (turns issued, turns completed)
    turns: Mutex<(u64, u64)>,
    completed: Condvar,
}

/// Completes its turn when dropped.
struct Turn<'a> {
    order: &'a DispatchOrder,
}

impl DispatchOrder {
    /// Must be called while the session lock is held.
    fn take_turn(&self) -> u64 {
        let mut turns = self.turns.lock().unwrap_or_else(PoisonError::into_inner);
        let turn = turns.0;
        turns.0 += 1;
        turn
    }

    fn wait_turn(&self, turn: u64) -> Turn<'_> {
        let mut turns = self.turns.lock().unwrap_or_else(PoisonError::into_inner);
        while turns.1 != turn {
            turns = self
                .completed
                .wait(turns)
                .unwrap_or_else(PoisonError::into_inner);
        }
        Turn { order: self }
    }
}

impl Drop for Turn<'_> {
    fn drop(&mut self) {
        let mut turns = self.order.turns.lock().unwrap_or_else(PoisonError::into_inner);
        turns.1 += 1;
        self.order.completed.notify_all();
    }
}

/// Applies one update under the session lock and notifies the listener after
/// releasing it, in update order.
fn update_session<F>(session: &Mutex<CaptureSession>, order: &DispatchOrder, listener: &dyn SessionListener, update: F)
where
    F: FnOnce(&mut CaptureSession) -> Vec<SessionEvent>,
{
    let (events, history, turn) = {
        let mut session = lock_session(session);
        let events = update(&mut session);
        if events.is_empty() {
            return;
        }
        let history = session.captured().to_vec();
        (events, history, order.take_turn())
    };

    let _turn = order.wait_turn(turn);
    dispatch(listener, &events, &history);
}

/// State shared by the threads of one running session.
struct ActiveSession {
    classifier: Classifier,
    catalog: Arc<Catalog>,
    source: Arc<dyn FrameSource>,
    listener: Arc<dyn SessionListener>,
    session: Arc<Mutex<CaptureSession>>,
    order: Arc<DispatchOrder>,
    running: AtomicBool,
    exhausted: AtomicBool,
    epoch: Instant,
}

impl ActiveSession {
    fn apply<F>(&self, update: F)
    where
        F: FnOnce(&mut CaptureSession) -> Vec<SessionEvent>,
    {
        update_session(&self.session, &self.order, self.listener.as_ref(), |session| {
            let events = update(session);
            if session.state() == CaptureState::Stopped {
                self.running.store(false, Ordering::SeqCst);
            }
            events
        });
    }
}

fn run_driver(active: Arc<ActiveSession>, sender: Sender<FrameWorkItem>, interval: Duration) {
    let mut tick = 0u64;
    while active.running.load(Ordering::SeqCst) {
        tick += 1;
        let task_active = Arc::clone(&active);
        let task_sender = sender.clone();
        thread::spawn(move || run_frame_task(&task_active, &task_sender, tick));
        thread::sleep(interval);
    }
    crate::log(&format!("Capture driver finished after {} tick(s)", tick));
}

fn run_frame_task(active: &ActiveSession, sender: &Sender<FrameWorkItem>, tick: u64) {
    // Cancelled before it started.
    if !active.running.load(Ordering::SeqCst) {
        return;
    }

    let timestamp = active.epoch.elapsed().as_micros() as u64;
    let frame = match active.source.capture_frame() {
        Ok(frame) => frame,
        Err(CaptureError::Exhausted) => {
            if !active.exhausted.swap(true, Ordering::SeqCst) {
                crate::log(&format!("Tick {}: frame source exhausted", tick));
            }
            active.running.store(false, Ordering::SeqCst);
            return;
        }
        Err(e) => {
            crate::log(&format!("Tick {}: no frame ({})", tick, e));
            return;
        }
    };

    let classification = active.classifier.classify_frame(&frame);
    // The worker is gone only after the session ended.
    let _ = sender.send(FrameWorkItem::new(tick, timestamp, classification));
}

fn run_session_worker(active: Arc<ActiveSession>, receiver: Receiver<FrameWorkItem>) {
    for item in receiver {
        crate::log(&format!(
            "Tick {}: classified at {} ({} slot(s), glyph {:?})",
            item.tick,
            item.classified_at.format("%H:%M:%S%.3f"),
            item.classification.hexagon_count,
            item.classification.symbol
        ));
        let obs = item.observation();
        active.apply(|session| session.step(&obs, &active.catalog));
    }

    let reason = if active.exhausted.load(Ordering::SeqCst) {
        StopReason::SourceExhausted
    } else {
        StopReason::Cancelled
    };
    active.apply(|session| session.stop(reason));

    crate::set_session_log(None);
    crate::log("Session worker finished");
}

/// Owns the catalog, calibration and capture session, and runs auto-capture.
pub struct AutoCapture {
    config: RecorderConfig,
    catalog: Arc<Catalog>,
    calibration: Option<Arc<Calibration>>,
    source: Arc<dyn FrameSource>,
    listener: Arc<dyn SessionListener>,
    session: Arc<Mutex<CaptureSession>>,
    order: Arc<DispatchOrder>,
    active: Option<Arc<ActiveSession>>,
    driver: Option<JoinHandle<()>>,
    worker: Option<JoinHandle<()>>,
}

impl AutoCapture {
    pub fn new(
        config: RecorderConfig,
        catalog: Arc<Catalog>,
        source: Arc<dyn FrameSource>,
        listener: Arc<dyn SessionListener>,
    ) -> Self {
        let calibration = if config.anchors.is_empty() {
            None
        } else {
            match Calibration::from_config(&config.anchors) {
                Ok(calibration) => Some(Arc::new(calibration)),
                Err(e) => {
                    crate::log(&format!("Ignoring stored calibration: {}", e));
                    None
                }
            }
        };
        let session = Arc::new(Mutex::new(CaptureSession::new(&config.capture)));

        Self {
            config,
            catalog,
            calibration,
            source,
            listener,
            session,
            order: Arc::new(DispatchOrder::default()),
            active: None,
            driver: None,
            worker: None,
        }
    }

    pub fn calibration(&self) -> Option<&Calibration> {
        self.calibration.as_deref()
    }

    /// Replaces the calibration. Not allowed while capturing.
    pub fn set_calibration(&mut self, calibration: Calibration) -> Result<(), SessionError> {
        if self.is_running() {
            return Err(SessionError::AlreadyRunning);
        }
        self.config.anchors = calibration.to_config();
        self.calibration = Some(Arc::new(calibration));
        Ok(())
    }

    fn classifier(&self) -> Classifier {
        Classifier::new(Arc::clone(&self.catalog), self.calibration.clone(), &self.config)
    }

    /// Checks if auto-capture is currently running.
    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| a.running.load(Ordering::SeqCst))
    }

    /// Starts auto-capture in background threads and returns immediately.
    ///
    /// # Errors
    /// Returns an error if:
    /// - Auto-capture is already running
    /// - No valid 11-point calibration is available
    /// - Either catalog is empty
    pub fn start_auto_capture(&mut self) -> Result<(), SessionError> {
        if self.is_running() {
            return Err(SessionError::AlreadyRunning);
        }
        self.join_threads();

        let calibration = self
            .calibration
            .clone()
            .ok_or(ConfigError::InvalidCalibration {
                found: self.config.anchors.len(),
            })?;
        self.catalog.validate()?;

        lock_session(&self.session).reset();
        if self.config.capture.session_log {
            crate::set_session_log(Some(crate::paths::new_session_log_path()));
        }

        let active = Arc::new(ActiveSession {
            classifier: Classifier::new(Arc::clone(&self.catalog), Some(calibration), &self.config),
            catalog: Arc::clone(&self.catalog),
            source: Arc::clone(&self.source),
            listener: Arc::clone(&self.listener),
            session: Arc::clone(&self.session),
            order: Arc::clone(&self.order),
            running: AtomicBool::new(true),
            exhausted: AtomicBool::new(false),
            epoch: Instant::now(),
        });

        let interval = Duration::from_millis(self.config.capture.auto_interval_ms);
        crate::log(&format!(
            "Starting auto capture: polling every {}ms",
            interval.as_millis()
        ));

        let (sender, receiver) = create_work_queue();
        let driver_active = Arc::clone(&active);
        self.driver = Some(thread::spawn(move || run_driver(driver_active, sender, interval)));
        let worker_active = Arc::clone(&active);
        self.worker = Some(thread::spawn(move || run_session_worker(worker_active, receiver)));
        self.active = Some(active);

        Ok(())
    }

    /// Cancels auto-capture and waits for the threads to wind down.
    /// Does nothing when no session is running.
    pub fn stop_auto_capture(&mut self) {
        if let Some(active) = &self.active {
            active.running.store(false, Ordering::SeqCst);
            active.apply(|session| session.stop(StopReason::Cancelled));
        }
        self.join_threads();
    }

    /// Blocks until the running session ends on its own.
    pub fn wait(&mut self) {
        self.join_threads();
    }

    fn join_threads(&mut self) {
        if let Some(driver) = self.driver.take() {
            if driver.join().is_err() {
                crate::log("Capture driver panicked");
            }
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                crate::log("Session worker panicked");
            }
        }
    }

    /// Classifies one frame without touching the session.
    pub fn classify_frame(&self, frame: &RgbaImage) -> FrameClassification {
        self.classifier().classify_frame(frame)
    }

    /// Grabs and classifies one frame, adding a recognised glyph to the history.
    pub fn capture_once(&self) -> Result<FrameClassification, CaptureError> {
        let frame = self.source.capture_frame()?;
        let classification = self.classify_frame(&frame);

        if let Some(name) = &classification.symbol {
            let symbol = CapturedSymbol::new(name.as_str(), classification.slot);
            update_session(&self.session, &self.order, self.listener.as_ref(), |session| {
                session.add_manual(symbol, &self.catalog)
            });
        }

        Ok(classification)
    }

    /// Forgets the captured history and target length.
    pub fn clear(&self) {
        lock_session(&self.session).clear();
    }

    pub fn captured(&self) -> Vec<CapturedSymbol> {
        lock_session(&self.session).captured().to_vec()
    }

    pub fn resolved(&self) -> Option<Vec<String>> {
        lock_session(&self.session).resolved().map(<[String]>::to_vec)
    }

    pub fn state(&self) -> CaptureState {
        lock_session(&self.session).state()
    }

    /// One-line summary for status output.
    pub fn status_string(&self) -> String {
        let session = lock_session(&self.session);
        let names: Vec<&str> = session.captured().iter().map(|s| s.name.as_str()).collect();
        format!(
            "{} | {}/{} glyph(s) | [{}] | idle {} busy {}",
            session.state(),
            names.len(),
            session.target_length(),
            names.join(", "),
            session.idle_counter(),
            session.busy_counter()
        )
    }
}

impl Drop for AutoCapture {
    fn drop(&mut self) {
        self.stop_auto_capture();
    }
}
