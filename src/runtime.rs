//! The scheduler contract emitted machines depend on (§4.F), plus one
//! concrete implementation, `SyncReactor`, grounded in `smax/reactor.py`'s
//! drain-queue-then-one-alarm loop (§10.3). The three sibling backends in
//! `examples/original_source/` (`asyncio_reactor.py`, `glfw_reactor.py`,
//! `select_reactor.py`) are the out-of-scope "external collaborators" §1
//! names; `SyncReactor` is the one this crate owns.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// A file descriptor, kept as a bare integer rather than `std::os::fd::RawFd`
/// so this trait stays usable on targets without a Unix fd type.
pub type Fd = i32;

/// Handle returned by `after_s`/`after_ms`, passed back to `cancel_after`.
/// Cancellation is idempotent: cancelling an id twice, or one that already
/// fired, is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// The abstract scheduler an emitted machine runs against (§4.F). Enqueued
/// callbacks are FIFO; expired timers interleave with them (queue drained
/// first, then the oldest expired timer, then re-check, per §5
/// "Ordering"). A concrete backend owns exactly one machine's worth of
/// these callbacks at a time in single-threaded cooperative fashion.
pub trait Reactor {
  /// Enqueue `f` for later, same-thread execution.
  fn call(&mut self, f: Box<dyn FnOnce() + 'static>);

  /// Schedule `f` to run at least `seconds` from now.
  fn after_s(&mut self, seconds: f64, f: Box<dyn FnOnce() + 'static>) -> TimerId;

  /// Schedule `f` to run at least `ms` milliseconds from now.
  fn after_ms(&mut self, ms: u64, f: Box<dyn FnOnce() + 'static>) -> TimerId {
    self.after_s(ms as f64 / 1000.0, f)
  }

  /// Idempotent cancellation of a previously scheduled timer.
  fn cancel_after(&mut self, id: TimerId);

  /// Subscribe to readiness on `fd`; `on_ready` is invoked (possibly
  /// repeatedly) while the subscription is live.
  fn add_fd(&mut self, fd: Fd, on_ready: Box<dyn FnMut() + 'static>);

  fn remove_fd(&mut self, fd: Fd);

  /// Drain every ready callback, then fire at most one expired timer.
  /// Returns the time until the next pending timer, or `None` if none is
  /// scheduled.
  fn sync(&mut self) -> Option<Duration>;

  /// Run until `stop()` is called.
  fn run(&mut self);

  fn stop(&mut self);

  /// Dispatch hook invoked by an emitted machine's event methods. The
  /// default (and `SyncReactor`'s) behavior is to enqueue via `call`; an
  /// asynchronous backend could override this to return a completion
  /// handle instead, which is why it's a distinct method rather than a
  /// thin wrapper callers reach for `call` directly.
  fn run_event(&mut self, f: Box<dyn FnOnce() + 'static>) {
    self.call(f)
  }
}

struct Alarm {
  id: TimerId,
  deadline: Instant,
  seq: u64,
  f: Box<dyn FnOnce()>,
}

/// A minimal, single-threaded `Reactor`. Timers are sorted by deadline with
/// insertion order as a tiebreak (mirrors Python's stable `sort`); `sync()`
/// fires at most one expired alarm per call so a burst of simultaneous
/// timers is spread across multiple `sync()`s rather than starving the
/// FIFO queue.
pub struct SyncReactor {
  queue: VecDeque<Box<dyn FnOnce()>>,
  alarms: Vec<Alarm>,
  fds: std::collections::HashMap<Fd, Box<dyn FnMut()>>,
  next_timer: u64,
  next_seq: u64,
  stopped: bool,
  signal: Option<Box<dyn FnMut()>>,
}

impl Default for SyncReactor {
  fn default() -> Self {
    Self::new()
  }
}

impl SyncReactor {
  pub fn new() -> Self {
    Self {
      queue: VecDeque::new(),
      alarms: Vec::new(),
      fds: std::collections::HashMap::new(),
      next_timer: 0,
      next_seq: 0,
      stopped: false,
      signal: None,
    }
  }

  /// Install a hook invoked after every state-mutating call
  /// (`call`/`after_s`/`after_ms`/`cancel_after`), for a backend blocking on
  /// an OS primitive between `sync()` calls that needs waking (§10.3).
  pub fn set_signal_hook(&mut self, hook: impl FnMut() + 'static) {
    self.signal = Some(Box::new(hook));
  }

  fn signal(&mut self) {
    if let Some(hook) = &mut self.signal {
      hook();
    }
  }

  fn next_timer_id(&mut self) -> TimerId {
    let id = TimerId(self.next_timer);
    self.next_timer += 1;
    id
  }

  /// Manually mark `fd` as ready, running its registered callback. `SyncReactor`
  /// never polls a real OS descriptor itself -- that's the out-of-scope
  /// poller backend's job -- so tests and embedders drive fd readiness
  /// explicitly.
  pub fn simulate_fd_ready(&mut self, fd: Fd) {
    if let Some(cb) = self.fds.get_mut(&fd) {
      cb();
    }
  }

  /// True once every queued callback and every alarm has been consumed.
  pub fn is_idle(&self) -> bool {
    self.queue.is_empty() && self.alarms.is_empty()
  }
}

impl Reactor for SyncReactor {
  fn call(&mut self, f: Box<dyn FnOnce() + 'static>) {
    self.queue.push_back(f);
    self.signal();
  }

  fn after_s(&mut self, seconds: f64, f: Box<dyn FnOnce() + 'static>) -> TimerId {
    let id = self.next_timer_id();
    let seq = self.next_seq;
    self.next_seq += 1;
    self.alarms.push(Alarm {
      id,
      deadline: Instant::now() + Duration::from_secs_f64(seconds.max(0.0)),
      seq,
      f,
    });
    self.signal();
    id
  }

  fn cancel_after(&mut self, id: TimerId) {
    self.alarms.retain(|a| a.id != id);
    self.signal();
  }

  fn add_fd(&mut self, fd: Fd, on_ready: Box<dyn FnMut() + 'static>) {
    self.fds.insert(fd, on_ready);
  }

  fn remove_fd(&mut self, fd: Fd) {
    self.fds.remove(&fd);
  }

  fn sync(&mut self) -> Option<Duration> {
    while let Some(f) = self.queue.pop_front() {
      f();
    }

    let now = Instant::now();
    if let Some((idx, _)) = self
      .alarms
      .iter()
      .enumerate()
      .filter(|(_, a)| a.deadline <= now)
      .min_by_key(|(_, a)| (a.deadline, a.seq))
    {
      let alarm = self.alarms.remove(idx);
      (alarm.f)();
    }

    self
      .alarms
      .iter()
      .min_by_key(|a| (a.deadline, a.seq))
      .map(|a| a.deadline.saturating_duration_since(Instant::now()))
  }

  fn run(&mut self) {
    self.stopped = false;
    while !self.stopped {
      match self.sync() {
        Some(timeout) if !timeout.is_zero() => std::thread::sleep(timeout),
        Some(_) => {}
        None if self.is_idle() => break,
        None => {}
      }
    }
  }

  fn stop(&mut self) {
    self.stopped = true;
  }
}
