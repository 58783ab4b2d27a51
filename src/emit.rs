//! Code Emitter (§4.E): compiles a resolved [`model::Machine`] into an
//! artifact that *behaves* per the statechart semantics -- active-state
//! set, entry/exit protocol, event dispatch, timeouts. §1 is explicit that
//! "the emitted code's exact textual form is NOT part of the spec -- only
//! its observable behavior is", so this implementation's emission step
//! constructs a Rust value directly from the resolved model rather than
//! rendering to an intermediate host-language text only to reinterpret it
//! (see DESIGN.md for this Open Question's resolution).
//!
//! The construction/`start`/`end`/event-method contract of §4.E maps onto
//! [`MachineHandle`]; [`CompiledMachine`] is the "class" a handle is an
//! instance of.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use crate::error::{Error, Result, UsageError};
use crate::host::{ActionSite, ActionSink};
use crate::model::{Machine, ResolvedTarget, StateId, TimeScale};
use crate::runtime::{Reactor, TimerId};

/// A machine ready to be instantiated, shared cheaply (`Rc`) across however
/// many running [`MachineHandle`]s the embedder wants -- mirrors
/// [`crate::pipeline::Pipeline`]'s one-artifact-per-input-path cache.
#[derive(Clone)]
pub struct CompiledMachine(Rc<Machine>);

/// Compile a resolved machine into an artifact. Purely a wrapping step: all
/// the actual resolution work already happened in [`crate::resolve`].
pub fn compile(machine: Machine) -> CompiledMachine {
  CompiledMachine(Rc::new(machine))
}

impl CompiledMachine {
  pub fn model(&self) -> &Machine {
    &self.0
  }
}

/// Bound on nested `configure_along` recursion (§8 S6, §7 "Recursion
/// overflow"): an immediate-transition cycle with no intervening timer
/// recurses through `configure_along -> fire_default_transitions -> fire ->
/// enter -> configure_along` with no base case, so this is caught as a
/// depth limit rather than left to exhaust the real call stack.
const MAX_CONFIGURE_DEPTH: usize = 512;

struct Inner<R, H> {
  machine: CompiledMachine,
  reactor: R,
  host: H,
  /// The active-state set (§3): every currently-active state maps to the
  /// timer handles it scheduled on entry.
  active: HashMap<StateId, Vec<TimerId>>,
  running: bool,
  /// Raised for the duration of one event's actual dispatch, not merely
  /// while it's queued (§4.E "Re-entrancy guard", §10.4).
  dispatching: bool,
  /// Current `configure_along` nesting depth; see `MAX_CONFIGURE_DEPTH`.
  depth: usize,
}

/// Decrements `Inner::depth` on drop so every early return out of
/// `configure_along` (including via `?`) still unwinds the counter.
struct DepthGuard<'h, R, H>(&'h MachineHandle<R, H>);

impl<R, H> Drop for DepthGuard<'_, R, H> {
  fn drop(&mut self) {
    self.0 .0.borrow_mut().depth -= 1;
  }
}

/// One running instance of a [`CompiledMachine`]. Cheaply `Clone`-able
/// (shares the same underlying state via `Rc<RefCell<..>>`) because timers
/// and deferred event dispatch need a `'static` handle back into the
/// machine from inside a reactor callback.
pub struct MachineHandle<R, H>(Rc<RefCell<Inner<R, H>>>);

impl<R, H> Clone for MachineHandle<R, H> {
  fn clone(&self) -> Self {
    MachineHandle(Rc::clone(&self.0))
  }
}

impl<R: Reactor + 'static, H: ActionSink + 'static> MachineHandle<R, H> {
  pub fn new(machine: CompiledMachine, reactor: R, host: H) -> Self {
    MachineHandle(Rc::new(RefCell::new(Inner {
      machine,
      reactor,
      host,
      active: HashMap::new(),
      running: false,
      dispatching: false,
      depth: 0,
    })))
  }

  pub fn is_running(&self) -> bool {
    self.0.borrow().running
  }

  pub fn is_active(&self, state: StateId) -> bool {
    self.0.borrow().active.contains_key(&state)
  }

  /// The compiled machine this handle is an instance of, for an embedder
  /// that needs to resolve a state's `dot_name` to a `StateId` (e.g. to
  /// call `is_active`) without having kept its own reference around.
  pub fn compiled(&self) -> CompiledMachine {
    self.machine()
  }

  fn machine(&self) -> CompiledMachine {
    self.0.borrow().machine.clone()
  }

  /// Enters the machine root. Fails if already running (§4.E).
  pub fn start(&self) -> Result<()> {
    if self.0.borrow().running {
      return Err(Error::Usage(UsageError::AlreadyRunning));
    }
    self.0.borrow_mut().running = true;
    let root = self.machine().model().root;
    tracing::trace!(target: "harel::enter", state = %self.machine().model().state(root).dot_name, "start");
    let result = self.enter(root);
    if result.is_err() {
      self.0.borrow_mut().running = false;
    }
    result
  }

  /// Pumps the reactor this handle owns: drains ready callbacks (including
  /// deferred event dispatch) and fires at most one expired timer, per
  /// `Reactor::sync` (§4.F). An embedder wired to its own event loop calls
  /// this (or `run`) after every `submit`.
  pub fn sync(&self) -> Option<Duration> {
    self.0.borrow_mut().reactor.sync()
  }

  /// Runs this handle's reactor until `stop` is called.
  pub fn run(&self) {
    self.0.borrow_mut().reactor.run();
  }

  pub fn stop(&self) {
    self.0.borrow_mut().reactor.stop();
  }

  /// Unconfigures the machine root: recursive exit, timer cancellation.
  pub fn end(&self) {
    let root = self.machine().model().root;
    if self.is_active(root) {
      self.unconfigure(root);
    }
    self.0.borrow_mut().running = false;
  }

  /// The `ev_XXX(params...)` contract, generalized: a compiled machine
  /// doesn't have one statically named method per declared event (there is
  /// no codegen step producing Rust source for this crate to compile), so
  /// every event is submitted by name instead. Validates running, rejects
  /// re-entrant submission, and defers the actual dispatch to the reactor
  /// (§4.E "Event methods").
  pub fn submit(&self, event_name: &str, args: Vec<String>) -> Result<()> {
    {
      let inner = self.0.borrow();
      if !inner.running {
        return Err(Error::Usage(UsageError::NotStarted {
          event: event_name.to_string(),
        }));
      }
      if inner.dispatching {
        return Err(Error::Usage(UsageError::RecursiveEvent {
          event: event_name.to_string(),
        }));
      }
    }

    let event_id = self.machine().model().event_named(event_name);
    let name = event_name.to_string();
    let handle = self.clone();
    let f: Box<dyn FnOnce() + 'static> =
      Box::new(move || handle.run_dispatch(name, event_id, args));
    self.0.borrow_mut().reactor.run_event(f);
    Ok(())
  }

  fn run_dispatch(&self, name: String, event_id: Option<crate::model::EventId>, args: Vec<String>) {
    self.0.borrow_mut().dispatching = true;
    let result = match event_id {
      Some(id) => self.dispatch_with_superclasses(id, &args),
      None => Ok(false),
    };
    match result {
      Ok(true) => {}
      Ok(false) => tracing::debug!(target: "harel::ignored", event = %name, "event ignored"),
      Err(e) => {
        tracing::error!(target: "harel::overflow", event = %name, error = %e, "event dispatch aborted");
      }
    }
    self.0.borrow_mut().dispatching = false;
  }

  fn dispatch_with_superclasses(&self, event_id: crate::model::EventId, args: &[String]) -> Result<bool> {
    let root = self.machine().model().root;
    if self.dispatch_in_state(root, event_id, args)? {
      return Ok(true);
    }

    let superclasses = self.machine().model().event(event_id).superclasses.clone();
    for (super_name, bound_args) in superclasses {
      if let Some(super_id) = self.machine().model().event_named(&super_name) {
        if self.dispatch_in_state(root, super_id, &bound_args)? {
          return Ok(true);
        }
      }
    }

    Ok(false)
  }

  /// §4.E "Event dispatch": bottom-up within the active chain -- every
  /// active descendant is asked first, then this state's own transitions
  /// always run regardless of whether a descendant already handled it.
  fn dispatch_in_state(
    &self,
    state: StateId,
    event_id: crate::model::EventId,
    args: &[String],
  ) -> Result<bool> {
    let declares = self
      .machine()
      .model()
      .state(state)
      .events
      .contains(&event_id);
    if !declares {
      return Ok(false);
    }

    let mut handled = false;
    let region_count = self.machine().model().state(state).regions.len();
    for r in 0..region_count {
      let child = {
        let m = self.machine();
        let model = m.model();
        model.state(state).regions[r]
          .children
          .iter()
          .copied()
          .find(|c| self.is_active(*c))
      };
      if let Some(child) = child {
        if self.dispatch_in_state(child, event_id, args)? {
          handled = true;
        }
      }
    }

    if self.try_transitions(state, event_id, args)? {
      handled = true;
    }

    Ok(handled)
  }

  /// First matching event-transition in declaration order fires and
  /// short-circuits the rest (§8 invariant 5).
  fn try_transitions(
    &self,
    owner: StateId,
    event_id: crate::model::EventId,
    args: &[String],
  ) -> Result<bool> {
    let m = self.machine();
    let state = m.model().state(owner);
    for (n, t) in state.transitions.iter().enumerate() {
      if t.event != Some(event_id) {
        continue;
      }
      let site = ActionSite::Transition {
        owner: &state.dot_name,
        ordinal: n,
      };
      let passes = match &t.guard {
        Some(g) => self.0.borrow_mut().host.eval_guard(g, args, site),
        None => true,
      };
      if !passes {
        continue;
      }
      tracing::trace!(target: "harel::handle", state = %state.dot_name, ordinal = n, "event transition fired");
      self.fire(owner, t.target, t.code.clone(), args, site)?;
      return Ok(true);
    }
    Ok(false)
  }

  /// §4.E step 6 of `configure`: unconditional/guarded transitions with no
  /// triggering event, tried in declaration order right after entry.
  fn fire_default_transitions(&self, owner: StateId) -> Result<()> {
    let m = self.machine();
    let state = m.model().state(owner);
    for (n, t) in state.transitions.iter().enumerate() {
      if t.event.is_some() {
        continue;
      }
      let site = ActionSite::Transition {
        owner: &state.dot_name,
        ordinal: n,
      };
      let passes = match &t.guard {
        Some(g) => self.0.borrow_mut().host.eval_guard(g, &[], site),
        None => true,
      };
      if passes {
        self.fire(owner, t.target, t.code.clone(), &[], site)?;
        return Ok(());
      }
    }
    Ok(())
  }

  fn fire_timeout(&self, owner: StateId, ordinal: usize) {
    let m = self.machine();
    let state = m.model().state(owner);
    let Some(timeout) = state.timeouts.get(ordinal) else {
      return;
    };
    let site = ActionSite::Timeout {
      owner: &state.dot_name,
      ordinal,
    };
    let passes = match &timeout.guard {
      Some(g) => self.0.borrow_mut().host.eval_guard(g, &[], site),
      None => true,
    };
    if !passes {
      return;
    }
    tracing::trace!(target: "harel::timeout", state = %state.dot_name, ordinal, "timeout fired");
    let target = timeout.target;
    let code = timeout.code.clone();
    if let Err(e) = self.fire(owner, target, code, &[], site) {
      tracing::error!(target: "harel::overflow", state = %state.dot_name, ordinal, error = %e, "timeout dispatch aborted");
    }
  }

  fn fire(
    &self,
    owner: StateId,
    target: Option<ResolvedTarget>,
    code: Option<crate::model::Code>,
    args: &[String],
    site: ActionSite<'_>,
  ) -> Result<()> {
    // An internal handler (code with no target, e.g. `ev: code` or a bare
    // `ms(100): A` timeout) runs its code and leaves the active
    // configuration untouched -- the "optionally unconfigure ... enter the
    // target" steps of §4.E only apply when a target exists at all.
    // `target.unconfigure`, as precomputed by resolution, is a
    // find-it-as-a-direct-child-or-fall-back-to-a-sibling bit -- it can say
    // `false` even when `target.state` sits in a region of a *different*
    // ancestor than `owner` (a cross-region AND-state target found directly
    // as a child of the ascended state, since children are looked up across
    // all of that state's regions combined). The only boundary that's
    // actually correct per invariant 3 is the live LCA of `owner` and
    // `target.state`, recomputed here rather than trusted from resolution.
    if let Some(target) = target {
      let m = self.machine();
      let model = m.model();
      let lca = model.lca(owner, target.state);
      if lca == owner {
        // Target is within owner's own subtree; owner itself stays active.
        // `enter` below walks up from the target and `configure_along`'s own
        // peer-displacement handles any sibling it needs to exit along the
        // way -- except the one case peer-displacement explicitly skips: the
        // target is already the active occupant of its own region (a literal
        // self-transition, which still must exit and re-enter per §8 S1's
        // repeated `ev_b`).
        if self.is_active(target.state) {
          self.unconfigure(target.state);
        }
      } else {
        let boundary = model
          .ancestors(owner)
          .find(|&a| model.state(a).parent == Some(lca))
          .expect("lca is a proper ancestor of owner");
        self.unconfigure(boundary);
      }
    }

    if let Some(code) = &code {
      self.0.borrow_mut().host.run(code, args, site);
    }

    match target {
      Some(target) => self.enter(target.state),
      None => Ok(()),
    }
  }

  /// §4.E "Entry protocol": ascend to the nearest already-active ancestor,
  /// then configure back down to `target`.
  fn enter(&self, target: StateId) -> Result<()> {
    let mut path = vec![target];
    loop {
      let top = *path.first().expect("path is never empty");
      let parent = self.machine().model().state(top).parent;
      match parent {
        Some(p) if !self.is_active(p) => path.insert(0, p),
        _ => break,
      }
    }
    self.configure_along(&path)
  }

  /// `configure(path[0], ...)`, continuing the descent toward `path.last()`
  /// for whichever of `path[0]`'s regions contains `path[1]`; every other
  /// region uses its own default (start) child.
  fn configure_along(&self, path: &[StateId]) -> Result<()> {
    self.0.borrow_mut().depth += 1;
    let _guard = DepthGuard(self);
    if self.0.borrow().depth > MAX_CONFIGURE_DEPTH {
      let machine = self.machine().model().name.clone();
      return Err(Error::RecursionOverflow { machine });
    }

    let state = path[0];
    let rest = &path[1..];

    // 1. Displace peers: any other active child in the same region.
    let m = self.machine();
    let model = m.model();
    if let Some(parent) = model.state(state).parent {
      if let Some(region_idx) = model.region_of(parent, state) {
        let siblings = model.state(parent).regions[region_idx].children.clone();
        for sib in siblings {
          if sib != state && self.is_active(sib) {
            self.unconfigure(sib);
          }
        }
      }

      // 2. Safety re-entry: should not trigger given how `enter` builds
      // `path`, but guards the same out-of-order-AND-region case the
      // source does.
      if !self.is_active(parent) {
        return self.enter(state);
      }
    }

    // 3. Record active, run entry action, schedule timeouts.
    self.0.borrow_mut().active.insert(state, Vec::new());
    let dot_name = model.state(state).dot_name.clone();
    tracing::trace!(target: "harel::enter", state = %dot_name, "enter");
    if let Some(enter_code) = model.state(state).enter.clone() {
      self
        .0
        .borrow_mut()
        .host
        .run(&enter_code, &[], ActionSite::Enter { state: &dot_name });
    }
    self.schedule_timeouts(state);

    // 4/5. Configure each region: continue the path, or enter its default.
    let continuation = rest.first().map(|&next| {
      (
        model.region_of(state, next).expect("next is a child of state"),
        next,
      )
    });
    let region_count = model.state(state).regions.len();
    for r in 0..region_count {
      match continuation {
        Some((ri, _)) if ri == r => self.configure_along(rest)?,
        _ => self.enter_default(state, r)?,
      }
    }

    // 6. Fire immediate/default transitions, first guard that passes wins.
    self.fire_default_transitions(state)
  }

  fn enter_default(&self, parent: StateId, region_idx: usize) -> Result<()> {
    let m = self.machine();
    let model = m.model();
    let start = model.state(parent).regions[region_idx]
      .children
      .iter()
      .copied()
      .find(|&c| model.state(c).start);
    if let Some(start) = start {
      self.configure_along(&[start])?;
    }
    Ok(())
  }

  fn schedule_timeouts(&self, state: StateId) {
    let m = self.machine();
    let model = m.model();
    let timeouts = model.state(state).timeouts.clone();
    let dot_name = model.state(state).dot_name.clone();
    let mut handles = Vec::with_capacity(timeouts.len());
    for (ordinal, t) in timeouts.iter().enumerate() {
      let seconds = {
        let mut inner = self.0.borrow_mut();
        let raw = inner.host.eval_timeout(&t.value_expr, t.scale);
        match t.scale {
          TimeScale::Ms => raw / 1000.0,
          TimeScale::S => raw,
        }
      };
      let handle = self.clone();
      let id = self.0.borrow_mut().reactor.after_s(
        seconds,
        Box::new(move || handle.fire_timeout(state, ordinal)),
      );
      handles.push(id);
    }
    tracing::trace!(target: "harel::enter", state = %dot_name, timers = handles.len(), "scheduled timeouts");
    if let Some(entry) = self.0.borrow_mut().active.get_mut(&state) {
      entry.extend(handles);
    }
  }

  /// §4.E "unconfigure": innermost-first exit, then cancel this state's own
  /// timers and drop it from the active set.
  fn unconfigure(&self, state: StateId) {
    let m = self.machine();
    let model = m.model();
    let region_count = model.state(state).regions.len();
    for r in 0..region_count {
      let child = model.state(state).regions[r]
        .children
        .iter()
        .copied()
        .find(|c| self.is_active(*c));
      if let Some(child) = child {
        self.unconfigure(child);
      }
    }

    let dot_name = model.state(state).dot_name.clone();
    tracing::trace!(target: "harel::exit", state = %dot_name, "exit");
    if let Some(exit_code) = model.state(state).exit.clone() {
      self
        .0
        .borrow_mut()
        .host
        .run(&exit_code, &[], ActionSite::Exit { state: &dot_name });
    }

    let timers = self.0.borrow_mut().active.remove(&state).unwrap_or_default();
    for id in timers {
      self.0.borrow_mut().reactor.cancel_after(id);
    }
  }
}

#[cfg(test)]
mod tests;
