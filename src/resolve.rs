//! Semantic resolution (§4.D): turns a parsed [`ast::Spec`] into a
//! [`model::Specification`] with every cross-reference resolved to a
//! `StateId`, every name path computed, and every invariant checked.
//!
//! Runs as two passes over the tree. The first builds the state arena
//! depth-first, registers events, and records each transition/timeout
//! target as a [`PendingTarget`] (its path kept as owned strings, not
//! borrowed from the AST, so the second pass doesn't need the AST at all).
//! The second walks the arena resolving every pending target, since a
//! target can point at a state that hadn't been built yet when its
//! transition was parsed (forward references and cross-region targets are
//! both legal).

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use slotmap::SlotMap;
use span::Span;

use syntax::ast;

use crate::error::{Error, Result};
use crate::model::{
  self, Code, Event, EventId, Machine, Region, ResolvedTarget, Specification, State, StateId,
  TimeScale, Timeout, Transition,
};

pub fn resolve(spec: &ast::Spec<'_>) -> Result<Specification> {
  let mut items = Vec::with_capacity(spec.items.len());
  let mut machines = Vec::new();

  for item in &spec.items {
    match item {
      ast::Item::Constant(c) => items.push(model::Item::Constant {
        name: c.name.as_ref().to_string(),
        expr: c.expr.as_ref().to_string(),
      }),
      ast::Item::Import(i) => items.push(model::Item::Import {
        text: i.text.as_ref().to_string(),
      }),
      ast::Item::Machine(m) => machines.push(resolve_machine(m)?),
    }
  }

  Ok(Specification { items, machines })
}

enum TargetOwner {
  Transition(usize),
  Timeout(usize),
}

struct PendingTarget {
  owner: StateId,
  which: TargetOwner,
  ups: u32,
  path: Vec<String>,
  span: Span,
}

struct Builder {
  states: SlotMap<StateId, State>,
  /// Every state's own children, by name, flattened across all of its
  /// regions -- target resolution looks children up by name without
  /// regard to which region they live in.
  children_by_name: HashMap<StateId, HashMap<String, StateId>>,
  events: IndexMap<String, EventId>,
  event_table: Vec<Event>,
  pending: Vec<PendingTarget>,
}

impl Builder {
  fn register_event(
    &mut self,
    name: &str,
    params: &[String],
    superclasses: &[(String, Vec<String>)],
    span: Span,
  ) -> Result<EventId> {
    let id = match self.events.get(name) {
      Some(&id) => {
        let ev = &self.event_table[id.0];
        if !params.is_empty() && params.len() != ev.params.len() {
          return Err(Error::semantic(
            format!("event `{name}` declared with inconsistent parameter count"),
            span,
          ));
        }
        id
      }
      None => {
        let id = EventId(self.event_table.len());
        self.event_table.push(Event {
          name: name.to_string(),
          params: params.to_vec(),
          superclasses: vec![],
        });
        self.events.insert(name.to_string(), id);
        id
      }
    };

    let ev = &mut self.event_table[id.0];
    for (super_name, args) in superclasses {
      match ev.superclasses.iter().find(|(n, _)| n == super_name) {
        Some((_, existing)) if existing.len() != args.len() => {
          return Err(Error::semantic(
            format!(
              "event `{name}` has incompatible argument list with superclass `{super_name}`"
            ),
            span,
          ));
        }
        Some(_) => {}
        None => ev.superclasses.push((super_name.clone(), args.clone())),
      }
    }

    Ok(id)
  }

  /// Builds one state (or the machine root), recursing into its regions.
  /// Returns the new state's id and the set of events it or any descendant
  /// declares (propagated upward per §4.D.6).
  #[allow(clippy::too_many_arguments)]
  fn build_state(
    &mut self,
    name: &str,
    start: bool,
    parent: Option<StateId>,
    enter: &Option<ast::Code<'_>>,
    exit: &Option<ast::Code<'_>>,
    transitions: &[ast::Transition<'_>],
    timeouts: &[ast::Timeout<'_>],
    regions: &[ast::Region<'_>],
    full_prefix: &[String],
    dot_prefix: &[String],
    region_index: Option<usize>,
    state_span: Span,
  ) -> Result<(StateId, BTreeSet<usize>)> {
    let mut full_name: Vec<String> = full_prefix.to_vec();
    if let Some(r) = region_index {
      full_name.push(r.to_string());
    }
    full_name.push(name.to_string());
    let mut dot_name: Vec<String> = dot_prefix.to_vec();
    dot_name.push(name.to_string());

    let id = self.states.insert(State {
      name: name.to_string(),
      start,
      parent,
      enter: enter.as_ref().map(lower_code),
      exit: exit.as_ref().map(lower_code),
      transitions: vec![],
      timeouts: vec![],
      regions: vec![],
      full_name: full_name.join("_"),
      dot_name: dot_name.join("."),
      name_list: dot_name.clone(),
      or_n: 0,
      events: vec![],
    });

    let mut own_events = BTreeSet::new();

    let mut lowered_transitions = Vec::with_capacity(transitions.len());
    for (n, t) in transitions.iter().enumerate() {
      let event_id = match &t.event {
        Some(name) => {
          let params: Vec<String> = t.params.iter().map(|p| p.as_ref().to_string()).collect();
          let superclasses: Vec<(String, Vec<String>)> = t
            .superclasses
            .iter()
            .map(|s| {
              (
                s.name.as_ref().to_string(),
                s.args.iter().map(|a| a.as_ref().to_string()).collect(),
              )
            })
            .collect();
          let id = self.register_event(name.as_ref(), &params, &superclasses, name.span)?;
          own_events.insert(id.0);
          Some(id)
        }
        None => None,
      };

      if let Some(target) = &t.target {
        self.pending.push(PendingTarget {
          owner: id,
          which: TargetOwner::Transition(n),
          ups: target.ups,
          path: target.path.iter().map(|p| p.as_ref().to_string()).collect(),
          span: target.path[0].span,
        });
      }

      lowered_transitions.push(Transition {
        owner: id,
        event: event_id,
        guard: t.guard.as_ref().map(|g| g.as_ref().to_string()),
        target: None,
        code: t.code.as_ref().map(lower_code),
        ordinal: n,
      });
    }

    if lowered_transitions
      .iter()
      .filter(|t| t.event.is_none() && t.guard.is_none())
      .count()
      > 1
    {
      return Err(Error::semantic(
        format!("state `{name}` has multiple default transitions"),
        state_span,
      ));
    }

    let mut lowered_timeouts = Vec::with_capacity(timeouts.len());
    for (n, t) in timeouts.iter().enumerate() {
      if let Some(target) = &t.target {
        self.pending.push(PendingTarget {
          owner: id,
          which: TargetOwner::Timeout(n),
          ups: target.ups,
          path: target.path.iter().map(|p| p.as_ref().to_string()).collect(),
          span: target.path[0].span,
        });
      }
      lowered_timeouts.push(Timeout {
        owner: id,
        scale: match t.scale {
          ast::TimeScale::Ms => TimeScale::Ms,
          ast::TimeScale::S => TimeScale::S,
        },
        value_expr: t.expr.as_ref().to_string(),
        guard: t.guard.as_ref().map(|g| g.as_ref().to_string()),
        target: None,
        code: t.code.as_ref().map(lower_code),
        ordinal: n,
      });
    }

    let mut lowered_regions = Vec::with_capacity(regions.len());
    self.children_by_name.insert(id, HashMap::new());
    for (region_idx, region) in regions.iter().enumerate() {
      let mut start_found = false;
      let mut children = Vec::with_capacity(region.states.len());
      for (or_n, child) in region.states.iter().enumerate() {
        if child.start {
          if start_found {
            return Err(Error::semantic(
              format!("state `{name}` has multiple start states in one region"),
              child.name.span,
            ));
          }
          start_found = true;
        }

        let (child_id, child_events) = self.build_state(
          child.name.as_ref(),
          child.start,
          Some(id),
          &child.enter,
          &child.exit,
          &child.transitions,
          &child.timeouts,
          &child.regions,
          &full_name,
          &dot_name,
          Some(region_idx),
          child.name.span,
        )?;
        self.states[child_id].or_n = or_n;
        own_events.extend(child_events.iter().copied());

        let child_name = child.name.as_ref().to_string();
        if self
          .children_by_name
          .get_mut(&id)
          .expect("just inserted")
          .insert(child_name, child_id)
          .is_some()
        {
          return Err(Error::semantic(
            format!("state `{}` is duplicate", child.name.as_ref()),
            child.name.span,
          ));
        }

        children.push(child_id);
      }

      if !region.states.is_empty() && !start_found {
        return Err(Error::semantic(
          format!("state `{name}` has no start state in one region"),
          state_span,
        ));
      }

      lowered_regions.push(Region { children });
    }

    let state = &mut self.states[id];
    state.transitions = lowered_transitions;
    state.timeouts = lowered_timeouts;
    state.regions = lowered_regions;
    state.events = own_events.iter().map(|&n| EventId(n)).collect();

    Ok((id, own_events))
  }

  fn resolve_targets(&mut self) -> Result<()> {
    let pending = std::mem::take(&mut self.pending);
    for p in pending {
      let resolved = match p.which {
        TargetOwner::Transition(_) => self.resolve_transition_target(&p)?,
        TargetOwner::Timeout(_) => self.resolve_timeout_target(&p)?,
      };
      match p.which {
        TargetOwner::Transition(n) => {
          self.states[p.owner].transitions[n].target = Some(resolved);
        }
        TargetOwner::Timeout(n) => {
          self.states[p.owner].timeouts[n].target = Some(resolved);
        }
      }
    }
    Ok(())
  }

  fn ascend(&self, mut state: StateId, ups: u32, span: Span) -> Result<StateId> {
    for _ in 0..ups {
      state = self.states[state].parent.ok_or_else(|| {
        Error::semantic(
          format!("cannot go up from `{}`", self.states[state].name),
          span,
        )
      })?;
    }
    Ok(state)
  }

  fn child_named(&self, parent: StateId, name: &str) -> Option<StateId> {
    self
      .children_by_name
      .get(&parent)
      .and_then(|map| map.get(name))
      .copied()
  }

  /// §4.D.3: child-of-self first, then child-of-parent (sibling), then a
  /// strict child descent for any remaining path segments.
  fn resolve_transition_target(&self, p: &PendingTarget) -> Result<ResolvedTarget> {
    let m = self.ascend(p.owner, p.ups, p.span)?;

    let (mut state, unconfigure) = match self.child_named(m, &p.path[0]) {
      Some(child) => (child, false),
      None => {
        let parent = self.states[m].parent.ok_or_else(|| {
          Error::semantic(format!("cannot find target state `{}`", p.path[0]), p.span)
        })?;
        let sibling = self.child_named(parent, &p.path[0]).ok_or_else(|| {
          Error::semantic(format!("cannot find target state `{}`", p.path[0]), p.span)
        })?;
        (sibling, true)
      }
    };

    for segment in &p.path[1..] {
      state = self.child_named(state, segment).ok_or_else(|| {
        Error::semantic(format!("cannot find target state `{segment}`"), p.span)
      })?;
    }

    Ok(ResolvedTarget { state, unconfigure })
  }

  /// §10.6: a timeout target always starts one level above the owning
  /// state (the state itself is never a candidate), is always a single
  /// identifier with no further descent, and always unconfigures.
  fn resolve_timeout_target(&self, p: &PendingTarget) -> Result<ResolvedTarget> {
    if p.path.len() != 1 {
      return Err(Error::semantic(
        "timeout targets must be a single identifier, not a dotted path",
        p.span,
      ));
    }
    let above = self.states[p.owner].parent.ok_or_else(|| {
      Error::semantic(
        format!("cannot go up from `{}`", self.states[p.owner].name),
        p.span,
      )
    })?;
    let m = self.ascend(above, p.ups, p.span)?;
    let state = self
      .child_named(m, &p.path[0])
      .ok_or_else(|| Error::semantic(format!("cannot find target state `{}`", p.path[0]), p.span))?;
    Ok(ResolvedTarget {
      state,
      unconfigure: true,
    })
  }
}

fn lower_code(code: &ast::Code<'_>) -> Code {
  match code {
    ast::Code::Inline(raw) => Code::Inline(raw.as_ref().to_string()),
    ast::Code::Block(lines) => Code::Block(lines.iter().map(|l| l.as_ref().to_string()).collect()),
  }
}

fn resolve_machine(m: &ast::Machine<'_>) -> Result<Machine> {
  let mut builder = Builder {
    states: SlotMap::with_key(),
    children_by_name: HashMap::new(),
    events: IndexMap::new(),
    event_table: Vec::new(),
    pending: Vec::new(),
  };

  let (root, _) = builder.build_state(
    m.name.as_ref(),
    true,
    None,
    &m.enter,
    &m.exit,
    &m.transitions,
    &[],
    &m.regions,
    &[],
    &[],
    None,
    m.name.span,
  )?;

  builder.resolve_targets()?;

  Ok(Machine {
    name: m.name.as_ref().to_string(),
    base: m.base.as_ref().map(|b| b.as_ref().to_string()),
    root,
    states: builder.states,
    events: builder.events,
    event_table: builder.event_table,
  })
}

#[cfg(test)]
mod tests;
