use super::*;

/// Everything accumulated over one `INDENT body DEDENT` block: the owning
/// state's own `enter`/`exit`/transitions/timeouts, plus its child states
/// bucketed into regions by `"---"`.
pub(super) struct Body<'src> {
  pub enter: Option<ast::Code<'src>>,
  pub exit: Option<ast::Code<'src>>,
  pub transitions: Vec<ast::Transition<'src>>,
  pub timeouts: Vec<ast::Timeout<'src>>,
  pub regions: Vec<ast::Region<'src>>,
}

impl<'src> Parser<'src> {
  /// One `INDENT body DEDENT` block. `in_state` selects between `body`
  /// (machine-level, no timeouts/default-transitions/`pass`) and
  /// `state_body`. A bare `"---"` opens a new region of child states;
  /// `enter`/`exit`/transitions/timeouts always belong to the owning state
  /// as a whole, regardless of which `"---"`-separated chunk of text they
  /// were written in.
  pub(super) fn body(&mut self, in_state: bool) -> Result<Body<'src>> {
    self.indent_gt()?;
    let mut body = Body {
      enter: None,
      exit: None,
      transitions: vec![],
      timeouts: vec![],
      regions: vec![ast::Region::new()],
    };

    while self.indent_eq().is_ok() && !self.current().is(Tok_Eof) {
      self.body_item(in_state, &mut body)?;
    }

    self.dedent()?;
    Ok(body)
  }

  /// Parses one item of `body`/`state_body`, mutating `body` in place.
  fn body_item(&mut self, in_state: bool, body: &mut Body<'src>) -> Result<()> {
    if self.bump_if(Tok_Dashes) {
      body.regions.push(ast::Region::new());
      return Ok(());
    }
    if self.bump_if(Kw_Enter) {
      self.expect(Tok_Colon)?;
      body.enter = Some(self.code()?);
      return Ok(());
    }
    if self.bump_if(Kw_Exit) {
      self.expect(Tok_Colon)?;
      body.exit = Some(self.code()?);
      return Ok(());
    }
    if self.current().is(Kw_State) || self.current().is(Tok_Star) {
      body
        .regions
        .last_mut()
        .expect("at least one region")
        .states
        .push(self.state_decl()?);
      return Ok(());
    }

    if in_state {
      if self.current().is(Kw_Ms) || self.current().is(Kw_S) {
        body.timeouts.push(self.timeout()?);
        return Ok(());
      }
      if self.bump_if(Kw_Pass) {
        return Ok(());
      }
      if self.current().is(Brk_SquareL) || self.current().is(Tok_Arrow) {
        body.transitions.push(self.default_transition()?);
        return Ok(());
      }
    }

    if self.current().is(Lit_Ident) {
      body.transitions.push(self.event_transition()?);
      return Ok(());
    }

    Err(Error::new(
      "expected a transition, state or clause",
      self.current().span,
    ))
  }

  /// `state_decl := [ "*" ] "state" NAME ":" INDENT state_body DEDENT`
  fn state_decl(&mut self) -> Result<ast::StateDecl<'src>> {
    check_recursion_limit(self.current().span)?;

    let start = self.bump_if(Tok_Star);
    self.expect(Kw_State)?;
    let name = self.ident()?;
    self.expect(Tok_Colon)?;
    let body = self.body(true)?;

    Ok(ast::StateDecl {
      start,
      name,
      enter: body.enter,
      exit: body.exit,
      transitions: body.transitions,
      timeouts: body.timeouts,
      regions: body.regions,
    })
  }
}
