use std::time::Duration;

use indoc::indoc;

use super::*;
use crate::host::TracingHost;
use crate::runtime::SyncReactor;

fn setup(src: &str) -> MachineHandle<SyncReactor, TracingHost> {
  let spec = crate::compile_source(src).expect("compile");
  let machine = spec.machines.into_iter().next().expect("one machine");
  MachineHandle::new(compile(machine), SyncReactor::new(), TracingHost::new())
}

fn find(handle: &MachineHandle<SyncReactor, TracingHost>, dot_name: &str) -> StateId {
  let m = handle.machine();
  m.model()
    .states
    .iter()
    .find(|(_, s)| s.dot_name == dot_name)
    .map(|(id, _)| id)
    .unwrap_or_else(|| panic!("no state named {dot_name}"))
}

/// Every `run(CODE) @ site` trace entry's `CODE`, in order -- entry/exit and
/// transition/timeout code blocks all go through `TracingHost::run`, guard
/// checks are filtered out.
fn codes(handle: &MachineHandle<SyncReactor, TracingHost>) -> Vec<String> {
  handle
    .0
    .borrow()
    .host
    .trace
    .iter()
    .filter_map(|s| s.strip_prefix("run(").and_then(|r| r.rsplit_once(") @ ")))
    .map(|(code, _)| code.to_string())
    .collect()
}

// S1: flat machine, repeated self-targeting transition still exits and
// re-enters (an explicitly fired transition never treats "already there" as
// a no-op).
#[test]
fn s1_flat_machine_self_transition_reenters() {
  let src = indoc! {"
    machine M:
      ev_a -> s_a
      ev_b -> s_b
      *state s_a:
        enter: enter_a
        exit: exit_a
      state s_b:
        enter: enter_b
        exit: exit_b
  "};
  let handle = setup(src);

  handle.start().expect("start");
  assert_eq!(codes(&handle), vec!["enter_a"]);

  handle.submit("ev_b", vec![]).unwrap();
  handle.sync();
  assert_eq!(codes(&handle), vec!["enter_a", "exit_a", "enter_b"]);

  handle.submit("ev_b", vec![]).unwrap();
  handle.sync();
  assert_eq!(
    codes(&handle),
    vec!["enter_a", "exit_a", "enter_b", "exit_b", "enter_b"]
  );

  handle.submit("ev_a", vec![]).unwrap();
  handle.sync();
  assert_eq!(
    codes(&handle),
    vec!["enter_a", "exit_a", "enter_b", "exit_b", "enter_b", "exit_b", "enter_a"]
  );
}

// S2: guarded immediate transitions both fail, the unconditional default
// fires instead, and the state's own pending timer is cancelled on exit.
#[test]
fn s2_guarded_defaults_fall_through_and_cancel_the_pending_timer() {
  let src = indoc! {"
    machine M:
      *state s_start:
        [bad] -> s_bad
        [more] -> s_bad
        -> s_check
        ms(1) -> s_bad
      state s_check:
        pass
      state s_bad:
        pass
  "};
  let handle = setup(src);
  handle.0.borrow_mut().host.set_guard("bad", false);
  handle.0.borrow_mut().host.set_guard("more", false);

  handle.start().expect("start");

  let s_check = find(&handle, "M.s_check");
  let s_bad = find(&handle, "M.s_bad");
  assert!(handle.is_active(s_check));
  assert!(!handle.is_active(s_bad));
  assert!(handle.0.borrow().reactor.is_idle());
}

// S3: a transition in one AND-region targeting a state in a sibling region
// unconfigures the source region's chain and replaces the target region's
// active child with the cross-region target.
#[test]
fn s3_cross_region_target_unconfigures_source_and_descends_the_other_region() {
  let src = indoc! {"
    machine M:
      *state s_a:
        ev -> ^s_b.s_b_3
      ---
      *state s_b:
        *state s_b_1:
          pass
        state s_b_2:
          pass
        state s_b_3:
          pass
  "};
  let handle = setup(src);
  handle.start().expect("start");

  let s_a = find(&handle, "M.s_a");
  let s_b = find(&handle, "M.s_b");
  let s_b_1 = find(&handle, "M.s_b.s_b_1");
  let s_b_3 = find(&handle, "M.s_b.s_b_3");
  assert!(handle.is_active(s_a));
  assert!(handle.is_active(s_b_1));

  handle.submit("ev", vec![]).unwrap();
  handle.sync();

  assert!(!handle.is_active(s_a));
  assert!(handle.is_active(s_b));
  assert!(!handle.is_active(s_b_1));
  assert!(handle.is_active(s_b_3));
}

// S4: an event declared only via `is` specialization on one branch falls
// through to its superclass when dispatched from a branch that never
// declares it, but is handled locally by the branch that does.
#[test]
fn s4_event_specialization_falls_through_unless_declared_locally() {
  let src = indoc! {"
    machine M:
      ev_general -> s_general
      go -> s_b
      *state s_a:
        pass
      state s_b:
        ev_specific is ev_general(0) -> s_specific
      state s_general:
        pass
      state s_specific:
        pass
  "};

  let handle = setup(src);
  handle.start().expect("start");
  handle.submit("ev_specific", vec![]).unwrap();
  handle.sync();
  assert!(handle.is_active(find(&handle, "M.s_general")));

  let handle = setup(src);
  handle.start().expect("start");
  handle.submit("go", vec![]).unwrap();
  handle.sync();
  handle.submit("ev_specific", vec![]).unwrap();
  handle.sync();
  assert!(handle.is_active(find(&handle, "M.s_specific")));
}

// S5: target-less timeout clauses still run their code, a guarded one is
// skipped, and the final timeout's target is entered once its deadline
// passes.
#[test]
fn s5_timeouts_run_code_skip_guarded_and_then_transition() {
  let src = indoc! {"
    machine M:
      *state s_start:
        ms(100): A
        ms(150) [guard_fail]: fail
        ms(200): B
        ms(300) -> s_next
      state s_next:
        pass
  "};
  let handle = setup(src);
  handle.0.borrow_mut().host.set_guard("guard_fail", false);
  handle.start().expect("start");

  std::thread::sleep(Duration::from_millis(350));
  for _ in 0..4 {
    handle.sync();
  }

  assert_eq!(codes(&handle), vec!["A".to_string(), "B".to_string()]);
  assert!(handle.is_active(find(&handle, "M.s_next")));
}

// S6: an immediate-transition cycle with no intervening timer recurses
// without bound within a single `start()` call and must be reported, not
// left to exhaust the real stack.
#[test]
fn s6_immediate_transition_cycle_overflows() {
  let src = indoc! {"
    machine M:
      *state s_a:
        -> s_b
      state s_b:
        -> s_a
  "};
  let handle = setup(src);
  let err = handle.start().expect_err("an unbroken immediate cycle must overflow");
  assert!(matches!(err, Error::RecursionOverflow { .. }));
}

// S6 (cont.): replacing one leg with a zero-delay timeout breaks the same
// cycle across separate reactor ticks instead of one call stack, so it
// makes cooperative progress without ever tripping the depth limit.
#[test]
fn s6_zero_delay_timeout_breaks_the_cycle_cooperatively() {
  let src = indoc! {"
    machine M:
      *state s_a:
        s(0) -> s_b
      state s_b:
        s(0) -> s_a
  "};
  let handle = setup(src);
  handle.start().expect("start must not overflow");

  for _ in 0..6 {
    handle.sync();
  }

  assert_eq!(handle.0.borrow().depth, 0);
}
