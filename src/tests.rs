//! Smoke tests for the public entry point: extract a DSL region out of a
//! host file, then run it through `compile_source`. Per-stage behavior is
//! covered in each stage's own module (`syntax::parser::tests`,
//! `resolve::tests`, `emit::tests`); this just confirms the public seam
//! between them holds together end to end.

use indoc::indoc;

use super::*;

#[test]
fn compiles_a_small_machine_end_to_end() {
  let host = indoc! {"
    // some host language file
    %%
    machine M:
      *state s_a:
        ev -> s_b
      state s_b:
        pass
    %%
    // trailing host code
  "};

  let dsl = extract::extract(host, &extract::ExtractConfig::default());
  let spec = compile_source(&dsl).expect("compile");

  assert_eq!(spec.machines.len(), 1);
  let m = &spec.machines[0];
  assert_eq!(m.name, "M");
  assert!(m.event_named("ev").is_some());
}

#[test]
fn syntax_error_carries_a_span_into_the_host_file() {
  let host = indoc! {"
    %%
    machine M
      *state s:
        pass
    %%
  "};

  let dsl = extract::extract(host, &extract::ExtractConfig::default());
  let err = compile_source(&dsl).expect_err("missing colon after machine name");
  assert!(matches!(err, Error::Syntax(_)));
}

#[test]
fn semantic_error_surfaces_as_semantic_not_syntax() {
  let src = indoc! {"
    machine M:
      state a:
        pass
  "};

  let err = compile_source(src).expect_err("region with no start state");
  assert!(matches!(err, Error::Semantic(_)));
}
