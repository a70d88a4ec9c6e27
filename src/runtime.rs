use std::cell::Cell;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// What the main loop reacts to
#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    /// The tick interval passed. Drives time-based state such as notice expiry.
    Tick,
    /// No more input will arrive (terminal hangup, closed stdin).
    Closed,
}

/// Anything that can hand the runner input events
pub trait AppEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError>;
}

/// Events delivered over a channel. The terminal source feeds it from a
/// reader thread; tests feed it by hand.
pub struct ChannelEventSource {
    rx: Receiver<AppEvent>,
}

impl ChannelEventSource {
    pub fn new(rx: Receiver<AppEvent>) -> Self {
        Self { rx }
    }

    /// Read crossterm events on a background thread. The channel closes when
    /// reading fails, which the runner reports as `Closed`.
    pub fn terminal() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            match event::read() {
                Ok(ev) => {
                    let Some(ev) = translate(ev) else {
                        continue;
                    };
                    if tx.send(ev).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    tracing::warn!(%err, "terminal input closed");
                    break;
                }
            }
        });

        Self { rx }
    }
}

impl AppEventSource for ChannelEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Map a crossterm event to the events retype cares about.
pub fn translate(ev: CtEvent) -> Option<AppEvent> {
    match ev {
        // Windows reports releases too; only presses and repeats type.
        CtEvent::Key(key) if key.kind != KeyEventKind::Release => Some(AppEvent::Key(key)),
        CtEvent::Resize(_, _) => Some(AppEvent::Resize),
        _ => None,
    }
}

/// Pulls events from a source and interleaves ticks at a steady rate, even
/// while keys keep arriving.
pub struct Runner<E: AppEventSource> {
    events: E,
    tick_rate: Duration,
    next_tick: Cell<Instant>,
}

impl<E: AppEventSource> Runner<E> {
    pub fn new(events: E, tick_rate: Duration) -> Self {
        Self {
            events,
            tick_rate,
            next_tick: Cell::new(Instant::now() + tick_rate),
        }
    }

    /// Block until the next event or tick, whichever comes first.
    pub fn step(&self) -> AppEvent {
        let now = Instant::now();
        let deadline = self.next_tick.get();
        if now >= deadline {
            self.next_tick.set(now + self.tick_rate);
            return AppEvent::Tick;
        }

        match self.events.recv_timeout(deadline - now) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) => {
                self.next_tick.set(Instant::now() + self.tick_rate);
                AppEvent::Tick
            }
            Err(RecvTimeoutError::Disconnected) => AppEvent::Closed,
        }
    }
}
