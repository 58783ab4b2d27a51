//! The resolved semantic model: machines, states, events, transitions and
//! timeouts with cross-references resolved to stable indices.
//!
//! States form a recursive tree, but parent/target links are indices into
//! an arena rather than owning references -- this sidesteps the
//! cycle-ownership problems a `Rc<RefCell<..>>` tree-with-backpointers model
//! runs into the moment a transition targets a state that isn't a
//! descendant of its owner.

use indexmap::IndexMap;
use slotmap::SlotMap;

slotmap::new_key_type! {
  /// A state within a single machine's arena.
  pub struct StateId;
}

/// An event, keyed by name, shared by every state in a machine that
/// declares or inherits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeScale {
  Ms,
  S,
}

/// `{ name, params, superclasses }`. Parameter arity is the same across
/// every declaration of a given event name within a machine (enforced at
/// resolution time).
#[derive(Debug, Clone)]
pub struct Event {
  pub name: String,
  pub params: Vec<String>,
  /// `(parent_event_name, bound argument expressions)`, accumulated from
  /// every `is PARENT(args)` clause across all declarations of this event.
  /// The parent event is kept by name, not `EventId`: it is resolved by the
  /// emitted dispatcher at the point of fallback (§4.E.4), exactly as the
  /// name it is declared with is looked up dynamically in the source this
  /// behavior is grounded on.
  pub superclasses: Vec<(String, Vec<String>)>,
}

/// A compile-time-resolved transition/timeout target: `^` ascents followed
/// by a child-or-sibling descent chain, already walked down to a concrete
/// state.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedTarget {
  pub state: StateId,
  /// True iff `state` is not a descendant of the owning state -- the
  /// transition must unconfigure up to the LCA before entering it.
  pub unconfigure: bool,
}

#[derive(Debug, Clone)]
pub struct Transition {
  pub owner: StateId,
  /// `None` for a default/immediate transition (no triggering event).
  pub event: Option<EventId>,
  pub guard: Option<String>,
  pub target: Option<ResolvedTarget>,
  pub code: Option<Code>,
  pub ordinal: usize,
}

#[derive(Debug, Clone)]
pub struct Timeout {
  pub owner: StateId,
  pub scale: TimeScale,
  pub value_expr: String,
  pub guard: Option<String>,
  pub target: Option<ResolvedTarget>,
  pub code: Option<Code>,
  pub ordinal: usize,
}

/// Opaque host-language code, kept as unparsed text with leading whitespace
/// preserved line-by-line. Emitted verbatim; never interpreted here.
#[derive(Debug, Clone)]
pub enum Code {
  Inline(String),
  Block(Vec<String>),
}

/// One parallel region: an ordered list of child states, each of which is
/// active or inactive independently of its siblings in other regions of
/// the same parent.
#[derive(Debug, Clone, Default)]
pub struct Region {
  pub children: Vec<StateId>,
}

#[derive(Debug, Clone)]
pub struct State {
  pub name: String,
  pub start: bool,
  pub parent: Option<StateId>,
  pub enter: Option<Code>,
  pub exit: Option<Code>,
  pub transitions: Vec<Transition>,
  pub timeouts: Vec<Timeout>,
  pub regions: Vec<Region>,

  /// Derived during resolution (§4.D.2).
  pub full_name: String,
  pub dot_name: String,
  pub name_list: Vec<String>,
  /// Ordinal of this state among its region's siblings.
  pub or_n: usize,

  /// Union of events declared on this state and on every descendant,
  /// sorted by `EventId` (§4.D.6) -- the set of events whose dispatch must
  /// consider this subtree.
  pub events: Vec<EventId>,
}

impl State {
  pub fn is_and_state(&self) -> bool {
    self.regions.len() > 1
  }
}

/// A fully resolved machine: its state arena, rooted at `root`, plus the
/// machine-wide event table.
#[derive(Debug)]
pub struct Machine {
  pub name: String,
  pub base: Option<String>,
  pub root: StateId,
  pub states: SlotMap<StateId, State>,
  /// Ordered set of events, keyed by name (declaration order matters for
  /// nothing observable, but is kept stable for deterministic emission).
  pub events: IndexMap<String, EventId>,
  pub event_table: Vec<Event>,
}

impl Machine {
  pub fn state(&self, id: StateId) -> &State {
    &self.states[id]
  }

  pub fn event(&self, id: EventId) -> &Event {
    &self.event_table[id.0]
  }

  pub fn event_named(&self, name: &str) -> Option<EventId> {
    self.events.get(name).copied()
  }

  /// Ancestors of `id`, starting at `id` itself and walking up to the root.
  pub fn ancestors(&self, id: StateId) -> impl Iterator<Item = StateId> + '_ {
    std::iter::successors(Some(id), move |&s| self.states[s].parent)
  }

  pub fn is_ancestor(&self, ancestor: StateId, of: StateId) -> bool {
    self.ancestors(of).any(|s| s == ancestor)
  }

  /// The region of `parent` that contains `child`, if any.
  pub fn region_of(&self, parent: StateId, child: StateId) -> Option<usize> {
    self.states[parent]
      .regions
      .iter()
      .position(|r| r.children.contains(&child))
  }

  /// Least common ancestor of two states (always exists; the root is an
  /// ancestor of everything).
  pub fn lca(&self, a: StateId, b: StateId) -> StateId {
    let a_chain: Vec<StateId> = self.ancestors(a).collect();
    for anc in self.ancestors(b) {
      if a_chain.contains(&anc) {
        return anc;
      }
    }
    self.root
  }
}

/// A top-level item of a parsed specification.
#[derive(Debug, Clone)]
pub enum Item {
  Constant { name: String, expr: String },
  Import { text: String },
}

/// The fully resolved result of running a specification through the
/// pipeline: passthrough items (constants/imports) plus every machine.
#[derive(Debug)]
pub struct Specification {
  pub items: Vec<Item>,
  pub machines: Vec<Machine>,
}
