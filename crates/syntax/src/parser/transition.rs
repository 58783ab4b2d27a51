use super::*;

impl<'src> Parser<'src> {
  /// `target := { "^" } NAME { "." NAME }`
  pub(super) fn target(&mut self) -> Result<ast::Target<'src>> {
    let mut ups = 0u32;
    while self.bump_if(Tok_Caret) {
      ups += 1;
    }
    let mut path = vec![self.ident()?];
    while self.bump_if(Op_Dot) {
      path.push(self.ident()?);
    }
    Ok(ast::Target { ups, path })
  }

  /// `"[" cond "]"`
  pub(super) fn guard(&mut self) -> Result<Option<ast::Raw<'src>>> {
    if self.bump_if(Brk_SquareL) {
      Ok(Some(self.balanced('[', ']')?))
    } else {
      Ok(None)
    }
  }

  /// `"(" params ")"`: formal parameter identifiers of a new event.
  pub(super) fn params(&mut self) -> Result<Vec<ast::Ident<'src>>> {
    self.expect(Brk_ParenL)?;
    let (_, raw) = self.lex.raw_balanced_list('(', ')');
    self.expect(Brk_ParenR)?;
    raw
      .into_iter()
      .filter(|(_, text)| !text.is_empty())
      .map(|(span, text)| {
        if !text.chars().all(|c| c.is_alphanumeric() || c == '_') {
          return Err(Error::new("expected a parameter name", span));
        }
        Ok(Spanned::new(span, Cow::from(text)))
      })
      .collect()
  }

  /// `"(" args ")"`: raw argument expressions of a superclass binding.
  pub(super) fn args(&mut self) -> Result<Vec<ast::Raw<'src>>> {
    self.expect(Brk_ParenL)?;
    let (_, raw) = self.lex.raw_balanced_list('(', ')');
    self.expect(Brk_ParenR)?;
    Ok(
      raw
        .into_iter()
        .filter(|(_, text)| !text.is_empty())
        .map(|(span, text)| Spanned::new(span, Cow::from(text)))
        .collect(),
    )
  }

  /// `{ "is" NAME [ "(" args ")" ] }`
  pub(super) fn superclasses(&mut self) -> Result<Vec<ast::Superclass<'src>>> {
    let mut out = vec![];
    while self.bump_if(Kw_Is) {
      let name = self.ident()?;
      let args = if self.current().is(Brk_ParenL) {
        self.args()?
      } else {
        vec![]
      };
      out.push(ast::Superclass { name, args });
    }
    Ok(out)
  }

  /// `timeout := (ms|s) "(" expr ")" [ "[" cond "]" ] [ "->" target ] [ ":" code ]`
  pub(super) fn timeout(&mut self) -> Result<ast::Timeout<'src>> {
    let scale = if self.bump_if(Kw_Ms) {
      ast::TimeScale::Ms
    } else {
      self.expect(Kw_S)?;
      ast::TimeScale::S
    };
    self.expect(Brk_ParenL)?;
    let expr = self.balanced('(', ')')?;
    let guard = self.guard()?;
    let target = if self.bump_if(Tok_Arrow) {
      Some(self.target()?)
    } else {
      None
    };
    let code = if self.bump_if(Tok_Colon) {
      Some(self.code()?)
    } else {
      None
    };
    Ok(ast::Timeout {
      scale,
      expr,
      guard,
      target,
      code,
    })
  }

  /// The default/immediate transition: `[guard] -> target [: code]`.
  pub(super) fn default_transition(&mut self) -> Result<ast::Transition<'src>> {
    let guard = self.guard()?;
    self.expect(Tok_Arrow)?;
    let target = self.target()?;
    let code = if self.bump_if(Tok_Colon) {
      Some(self.code()?)
    } else {
      None
    };
    Ok(ast::Transition {
      event: None,
      params: vec![],
      superclasses: vec![],
      guard,
      target: Some(target),
      code,
    })
  }

  /// `transition := NAME [ "(" params ")" ] { "is" NAME [ "(" args ")" ] }
  ///                [ "[" cond "]" ]
  ///                ( "->" target [ ":" code ] | ":" (code | "pass") )`
  pub(super) fn event_transition(&mut self) -> Result<ast::Transition<'src>> {
    let event = self.ident()?;
    let params = if self.current().is(Brk_ParenL) {
      self.params()?
    } else {
      vec![]
    };
    let superclasses = self.superclasses()?;
    let guard = self.guard()?;

    let (target, code) = if self.bump_if(Tok_Arrow) {
      let target = self.target()?;
      let code = if self.bump_if(Tok_Colon) {
        Some(self.code()?)
      } else {
        None
      };
      (Some(target), code)
    } else {
      self.expect(Tok_Colon)?;
      let code = if self.bump_if(Kw_Pass) {
        None
      } else {
        Some(self.code()?)
      };
      (None, code)
    };

    Ok(ast::Transition {
      event: Some(event),
      params,
      superclasses,
      guard,
      target,
      code,
    })
  }
}
