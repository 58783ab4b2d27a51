use super::*;

impl<'src> Parser<'src> {
  pub(super) fn ident(&mut self) -> Result<ast::Ident<'src>> {
    self.expect(Lit_Ident)?;
    Ok(Spanned::new(
      self.previous().span,
      Cow::from(self.lex.lexeme(self.previous())),
    ))
  }

  /// `TOEOL`: the rest of the current physical line, verbatim.
  pub(super) fn rest_of_line(&mut self) -> ast::Raw<'src> {
    let (span, text) = self.lex.raw_rest_of_line();
    Spanned::new(span, Cow::from(text))
  }

  /// A single raw-lexed expression enclosed in `open`/`close`. `open` must
  /// already have been bumped past.
  pub(super) fn balanced(&mut self, open: char, close: char) -> Result<ast::Raw<'src>> {
    let (span, text) = self.lex.raw_balanced(open, close);
    self.expect(close_kind(close))?;
    Ok(Spanned::new(span, Cow::from(text.trim())))
  }

  /// `code := TOEOL | INDENT { INDENTED_CODE } DEDENT`
  ///
  /// The block variant is raw-scanned directly off the source text (see
  /// [`crate::lexer::Lexer::raw_indented_block`]), so it never touches the
  /// token-stream indent stack: its lines are opaque host-language text, not
  /// nested DSL grammar.
  pub(super) fn code(&mut self) -> Result<ast::Code<'src>> {
    if self.no_indent().is_ok() {
      Ok(ast::Code::Inline(self.rest_of_line()))
    } else {
      let enclosing = self.indent.level();
      let lines = self
        .lex
        .raw_indented_block(enclosing)
        .into_iter()
        .map(|(span, text)| Spanned::new(span, Cow::from(text)))
        .collect();
      Ok(ast::Code::Block(lines))
    }
  }
}

fn close_kind(close: char) -> TokenKind {
  match close {
    ')' => Brk_ParenR,
    ']' => Brk_SquareR,
    _ => unreachable!("unsupported bracket pair"),
  }
}
