use indoc::indoc;

use super::*;

fn resolve_ok(src: &str) -> Specification {
  let spec = syntax::parser::parse(src).expect("parse");
  resolve(&spec).expect("resolve")
}

fn resolve_err(src: &str) -> Error {
  let spec = syntax::parser::parse(src).expect("parse");
  resolve(&spec).expect_err("expected a semantic error")
}

fn only_machine(spec: &Specification) -> &Machine {
  assert_eq!(spec.machines.len(), 1);
  &spec.machines[0]
}

#[test]
fn full_and_dot_names_interleave_region_indices() {
  let src = indoc! {"
    machine M:
      *state a:
        *state b:
          pass
        ---
        *state c:
          *state d:
            pass
  "};
  let spec = resolve_ok(src);
  let m = only_machine(&spec);
  let a = m.state(m.root).regions[0].children[0];
  assert_eq!(m.state(a).full_name, "M_0_a");
  assert_eq!(m.state(a).dot_name, "M.a");

  let c = m.state(a).regions[1].children[0];
  assert_eq!(m.state(c).full_name, "M_0_a_1_c");
  assert_eq!(m.state(c).dot_name, "M.a.c");

  let d = m.state(c).regions[0].children[0];
  assert_eq!(m.state(d).full_name, "M_0_a_1_c_0_d");
  assert_eq!(m.state(d).dot_name, "M.a.c.d");
}

#[test]
fn transition_target_prefers_own_child_over_sibling() {
  let src = indoc! {"
    machine M:
      *state a:
        ev -> b
        *state b:
          pass
      state b:
        pass
  "};
  let spec = resolve_ok(src);
  let m = only_machine(&spec);
  let a = m.state(m.root).regions[0].children[0];
  let inner_b = m.state(a).regions[0].children[0];
  let t = &m.state(a).transitions[0];
  let target = t.target.unwrap();
  assert_eq!(target.state, inner_b);
  assert!(!target.unconfigure);
}

#[test]
fn transition_target_falls_back_to_sibling_and_unconfigures() {
  let src = indoc! {"
    machine M:
      *state a:
        ev -> b
      state b:
        pass
  "};
  let spec = resolve_ok(src);
  let m = only_machine(&spec);
  let a = m.state(m.root).regions[0].children[0];
  let b = m.state(m.root).regions[0].children[1];
  let t = &m.state(a).transitions[0];
  let target = t.target.unwrap();
  assert_eq!(target.state, b);
  assert!(target.unconfigure);
}

#[test]
fn transition_target_ascends_past_the_parent_to_a_cousin_branch() {
  // `a` ascends past its parent `p` entirely, since `q` is not among `p`'s
  // own children -- the literal "found in m, else in m's parent" rule
  // still finds it one level further up and unconfigures.
  let src = indoc! {"
    machine M:
      *state p:
        *state a:
          ev -> ^q
        state b:
          pass
      state q:
        pass
  "};
  let spec = resolve_ok(src);
  let m = only_machine(&spec);
  let p = m.state(m.root).regions[0].children[0];
  let q = m.state(m.root).regions[0].children[1];
  let a = m.state(p).regions[0].children[0];
  let t = &m.state(a).transitions[0];
  let target = t.target.unwrap();
  assert_eq!(target.state, q);
  assert!(target.unconfigure);
}

#[test]
fn timeout_target_is_always_a_sibling_of_the_owning_state() {
  let src = indoc! {"
    machine M:
      *state a:
        *state b:
          ms(1) -> c
        state c:
          pass
  "};
  let spec = resolve_ok(src);
  let m = only_machine(&spec);
  let a = m.state(m.root).regions[0].children[0];
  let b = m.state(a).regions[0].children[0];
  let c = m.state(a).regions[0].children[1];
  let timeout = &m.state(b).timeouts[0];
  let target = timeout.target.unwrap();
  assert_eq!(target.state, c);
  assert!(target.unconfigure);
}

#[test]
fn timeout_target_with_dotted_path_is_rejected() {
  let src = "machine M:\n  *state a:\n    *state b:\n      ms(1) -> c.d\n    state c:\n      *state d:\n        pass\n";
  let err = resolve_err(src);
  assert!(matches!(err, Error::Semantic(_)));
}

#[test]
fn event_arity_must_match_across_declarations() {
  let src = indoc! {"
    machine M:
      *state a:
        ev(x): pass
        *state b:
          pass
      state c:
        ev(x, y): pass
  "};
  let err = resolve_err(src);
  assert!(matches!(err, Error::Semantic(_)));
}

#[test]
fn duplicate_default_transition_is_rejected() {
  let src = indoc! {"
    machine M:
      *state a:
        -> a
        -> a
  "};
  let err = resolve_err(src);
  assert!(matches!(err, Error::Semantic(_)));
}

#[test]
fn multiple_start_states_in_one_region_is_rejected() {
  let src = indoc! {"
    machine M:
      *state a:
        pass
      *state b:
        pass
  "};
  let err = resolve_err(src);
  assert!(matches!(err, Error::Semantic(_)));
}

#[test]
fn missing_start_state_in_one_region_is_rejected() {
  let src = "machine M:\n  state a:\n    pass\n";
  let err = resolve_err(src);
  assert!(matches!(err, Error::Semantic(_)));
}

#[test]
fn event_list_propagates_up_to_ancestors() {
  let src = indoc! {"
    machine M:
      *state a:
        *state b:
          ev -> b
  "};
  let spec = resolve_ok(src);
  let m = only_machine(&spec);
  let a = m.state(m.root).regions[0].children[0];
  let ev = m.event_named("ev").unwrap();
  assert!(m.state(a).events.contains(&ev));
  assert!(m.state(m.root).events.contains(&ev));
}

#[test]
fn event_specialization_is_recorded_on_the_event_by_name() {
  let src = indoc! {"
    machine M:
      *state a:
        ev_specific is ev_general(0) -> a
      state b:
        pass
  "};
  let spec = resolve_ok(src);
  let m = only_machine(&spec);
  let ev = m.event_named("ev_specific").unwrap();
  let event = m.event(ev);
  assert_eq!(event.superclasses.len(), 1);
  assert_eq!(event.superclasses[0].0, "ev_general");
  assert_eq!(event.superclasses[0].1, vec!["0".to_string()]);
}
