#![allow(clippy::needless_lifetimes)]

use beef::lean::Cow;
use span::Spanned;

/// An identifier, e.g. a state or event name.
pub type Ident<'src> = Spanned<Cow<'src, str>>;

/// Opaque host-language text, kept verbatim with its leading whitespace so
/// the emitter can paste it back unparsed.
pub type Raw<'src> = Spanned<Cow<'src, str>>;

/// The top of a parsed DSL region: an ordered sequence of top-level items.
#[cfg_attr(test, derive(Debug))]
pub struct Spec<'src> {
  pub items: Vec<Item<'src>>,
}

impl<'src> Spec<'src> {
  pub fn new() -> Self {
    Self { items: vec![] }
  }
}

impl<'src> Default for Spec<'src> {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg_attr(test, derive(Debug))]
pub enum Item<'src> {
  Constant(Constant<'src>),
  Import(Import<'src>),
  Machine(Machine<'src>),
}

/// `NAME = rest-of-line`, passed through verbatim to the emitted artifact.
#[cfg_attr(test, derive(Debug))]
pub struct Constant<'src> {
  pub name: Ident<'src>,
  pub expr: Raw<'src>,
}

/// `import rest-of-line`, passed through verbatim.
#[cfg_attr(test, derive(Debug))]
pub struct Import<'src> {
  pub text: Raw<'src>,
}

/// Opaque host-language code attached to an `enter:`/`exit:`/transition
/// clause. Either a single rest-of-line, or an indented block of lines with
/// their relative indentation (above the enclosing clause) preserved.
#[cfg_attr(test, derive(Debug))]
pub enum Code<'src> {
  Inline(Raw<'src>),
  Block(Vec<Raw<'src>>),
}

/// A dotted, possibly `^`-prefixed transition/timeout target.
#[cfg_attr(test, derive(Debug))]
pub struct Target<'src> {
  pub ups: u32,
  pub path: Vec<Ident<'src>>,
}

/// `is PARENT(args)`: the event this transition's event specializes, with
/// argument expressions bound to the parent event's formal parameters.
#[cfg_attr(test, derive(Debug))]
pub struct Superclass<'src> {
  pub name: Ident<'src>,
  pub args: Vec<Raw<'src>>,
}

/// `NAME(params) { is PARENT(args) }* [guard] -> target : code`, or the
/// default/immediate variant with no leading event name (`event` is `None`).
#[cfg_attr(test, derive(Debug))]
pub struct Transition<'src> {
  pub event: Option<Ident<'src>>,
  pub params: Vec<Ident<'src>>,
  pub superclasses: Vec<Superclass<'src>>,
  pub guard: Option<Raw<'src>>,
  pub target: Option<Target<'src>>,
  pub code: Option<Code<'src>>,
}

/// `ms(expr)` or `s(expr)`, with the same guard/target/code tail as a
/// transition.
#[cfg_attr(test, derive(Debug))]
pub struct Timeout<'src> {
  pub scale: TimeScale,
  pub expr: Raw<'src>,
  pub guard: Option<Raw<'src>>,
  pub target: Option<Target<'src>>,
  pub code: Option<Code<'src>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeScale {
  Ms,
  S,
}

/// One parallel region of a state or machine body: an ordered list of child
/// states. A bare `---` inside a body starts a new region (AND-composition
/// of the owning state); a single-region body is an OR-state.
///
/// Only child states are partitioned by region: `enter`/`exit`,
/// transitions and timeouts belong to the owning state as a whole, not to
/// any one region (mirrors the source data model, where `inner_states` is
/// the only per-region field on a state).
#[cfg_attr(test, derive(Debug))]
pub struct Region<'src> {
  pub states: Vec<StateDecl<'src>>,
}

impl<'src> Region<'src> {
  pub fn new() -> Self {
    Self { states: vec![] }
  }
}

impl<'src> Default for Region<'src> {
  fn default() -> Self {
    Self::new()
  }
}

/// `[*] state NAME: ...`
#[cfg_attr(test, derive(Debug))]
pub struct StateDecl<'src> {
  pub start: bool,
  pub name: Ident<'src>,
  pub enter: Option<Code<'src>>,
  pub exit: Option<Code<'src>>,
  pub transitions: Vec<Transition<'src>>,
  pub timeouts: Vec<Timeout<'src>>,
  pub regions: Vec<Region<'src>>,
}

/// `machine NAME[(BASE)]: ...`
#[cfg_attr(test, derive(Debug))]
pub struct Machine<'src> {
  pub name: Ident<'src>,
  pub base: Option<Ident<'src>>,
  pub enter: Option<Code<'src>>,
  pub exit: Option<Code<'src>>,
  pub transitions: Vec<Transition<'src>>,
  pub regions: Vec<Region<'src>>,
}
