use indoc::indoc;

use super::*;
use crate::ast::*;

fn parse_ok(src: &str) -> Spec<'_> {
  match parse(src) {
    Ok(spec) => spec,
    Err(errors) => panic!("parse failed: {errors:?}"),
  }
}

fn only_machine<'a>(spec: &'a Spec<'a>) -> &'a Machine<'a> {
  assert_eq!(spec.items.len(), 1);
  match &spec.items[0] {
    Item::Machine(m) => m,
    other => panic!("expected a machine, got {other:?}"),
  }
}

#[test]
fn flat_machine() {
  let src = indoc! {"
    machine M:
      *state s_a:
        ev_a -> s_a
      state s_b:
        ev_b -> s_b
  "};
  let spec = parse_ok(src);
  let m = only_machine(&spec);
  assert_eq!(m.name.as_ref(), "M");
  assert!(m.base.is_none());
  assert_eq!(m.regions.len(), 1);
  assert_eq!(m.regions[0].states.len(), 2);
  assert_eq!(m.regions[0].states[0].name.as_ref(), "s_a");
  assert!(m.regions[0].states[0].start);
  assert!(!m.regions[0].states[1].start);
}

#[test]
fn machine_with_base_class() {
  let spec = parse_ok("machine M(Base):\n  *state s:\n    pass\n");
  let m = only_machine(&spec);
  assert_eq!(m.base.as_ref().unwrap().as_ref(), "Base");
}

#[test]
fn parallel_regions() {
  let src = indoc! {"
    machine M:
      *state s:
        state a:
          pass
        ---
        state b:
          pass
  "};
  let spec = parse_ok(src);
  let m = only_machine(&spec);
  let s = &m.regions[0].states[0];
  assert_eq!(s.regions.len(), 2);
  assert_eq!(s.regions[0].states[0].name.as_ref(), "a");
  assert_eq!(s.regions[1].states[0].name.as_ref(), "b");
}

#[test]
fn transitions_and_timeouts_belong_to_the_state_not_a_region() {
  // `enter`/transitions/timeouts are flat on the state even when a `---`
  // inside it also splits child states into separate regions.
  let src = indoc! {"
    machine M:
      *state s:
        ev -> s
        state a:
          pass
        ---
        state b:
          pass
  "};
  let spec = parse_ok(src);
  let m = only_machine(&spec);
  let s = &m.regions[0].states[0];
  assert_eq!(s.transitions.len(), 1);
  assert_eq!(s.regions.len(), 2);
}

#[test]
fn guarded_default_transitions_and_timeout() {
  let src = indoc! {"
    machine M:
      *state s_start:
        [bad]->s_bad
        [more]->s_bad
        -> s_check
        ms(1)->s_bad
      state s_bad:
        pass
      state s_check:
        pass
  "};
  let spec = parse_ok(src);
  let m = only_machine(&spec);
  let s = &m.regions[0].states[0];
  assert_eq!(s.transitions.len(), 3);
  assert!(s.transitions[0].event.is_none());
  assert_eq!(s.transitions[0].guard.as_ref().unwrap().as_ref(), "bad");
  assert!(s.transitions[2].guard.is_none());
  assert_eq!(s.timeouts.len(), 1);
  assert_eq!(s.timeouts[0].scale, TimeScale::Ms);
  assert_eq!(s.timeouts[0].expr.as_ref(), "1");
}

#[test]
fn event_with_params_and_specialization() {
  let src = indoc! {"
    machine M:
      *state s_a:
        ev_specific is ev_general(0) -> s_general
      state s_general:
        pass
  "};
  let spec = parse_ok(src);
  let m = only_machine(&spec);
  let t = &m.regions[0].states[0].transitions[0];
  assert_eq!(t.event.as_ref().unwrap().as_ref(), "ev_specific");
  assert_eq!(t.superclasses.len(), 1);
  assert_eq!(t.superclasses[0].name.as_ref(), "ev_general");
  assert_eq!(t.superclasses[0].args.len(), 1);
  assert_eq!(t.superclasses[0].args[0].as_ref(), "0");
}

#[test]
fn event_with_declared_params() {
  let src = "machine M:\n  *state s:\n    ev(x, y): pass\n";
  let spec = parse_ok(src);
  let m = only_machine(&spec);
  let t = &m.regions[0].states[0].transitions[0];
  assert_eq!(t.params.len(), 2);
  assert_eq!(t.params[0].as_ref(), "x");
  assert_eq!(t.params[1].as_ref(), "y");
}

#[test]
fn inline_and_block_code() {
  let src = indoc! {"
    machine M:
      enter: self.ready = True
      *state s:
        ev:
          a = 1
          b = 2
  "};
  let spec = parse_ok(src);
  let m = only_machine(&spec);
  match m.enter.as_ref().unwrap() {
    Code::Inline(text) => assert_eq!(text.as_ref(), "self.ready = True"),
    Code::Block(_) => panic!("expected inline code"),
  }
  let t = &m.regions[0].states[0].transitions[0];
  match t.code.as_ref().unwrap() {
    Code::Block(lines) => {
      assert_eq!(lines.len(), 2);
      assert_eq!(lines[0].as_ref(), "a = 1");
      assert_eq!(lines[1].as_ref(), "b = 2");
    }
    Code::Inline(_) => panic!("expected block code"),
  }
}

#[test]
fn cross_level_target() {
  let src = "machine M:\n  *state s:\n    ev -> ^s_b.s_b_3\n  state s_b:\n    state s_b_3:\n      pass\n";
  let spec = parse_ok(src);
  let m = only_machine(&spec);
  let t = &m.regions[0].states[0].transitions[0];
  let target = t.target.as_ref().unwrap();
  assert_eq!(target.ups, 1);
  assert_eq!(target.path.len(), 2);
  assert_eq!(target.path[0].as_ref(), "s_b");
  assert_eq!(target.path[1].as_ref(), "s_b_3");
}

#[test]
fn constant_and_import() {
  let spec = parse_ok("import some.module\nX = 1 + 2\nmachine M:\n  *state s:\n    pass\n");
  assert_eq!(spec.items.len(), 3);
  match &spec.items[0] {
    Item::Import(i) => assert_eq!(i.text.as_ref(), "some.module"),
    other => panic!("expected import, got {other:?}"),
  }
  match &spec.items[1] {
    Item::Constant(c) => {
      assert_eq!(c.name.as_ref(), "X");
      assert_eq!(c.expr.as_ref(), "1 + 2");
    }
    other => panic!("expected constant, got {other:?}"),
  }
}

#[test]
fn missing_initial_state_marker_is_not_a_syntax_error() {
  // uniqueness-of-start is a semantic invariant, not a syntactic one.
  let spec = parse_ok("machine M:\n  state s:\n    pass\n");
  let m = only_machine(&spec);
  assert!(!m.regions[0].states[0].start);
}

#[test]
fn reports_syntax_errors_with_span() {
  let src = "machine M\n  *state s:\n    pass\n";
  let errors = parse(src).unwrap_err();
  assert!(!errors.is_empty());

  let rendered = diag::Report::error()
    .source(diag::Source::string(src))
    .message(errors[0].message.clone())
    .span(errors[0].span)
    .build()
    .emit_to_string()
    .unwrap();
  assert!(rendered.contains("machine M"));
}
