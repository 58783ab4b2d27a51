#![deny(unused_must_use)]

use beef::lean::Cow;
use span::{Span, Spanned};

use self::indent::IndentStack;
use crate::lexer::TokenKind::*;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::{ast, Error, Result};

pub fn parse(src: &str) -> Result<ast::Spec<'_>, Vec<Error>> {
  let lexer = Lexer::new(src);
  let parser = Parser::new(lexer);
  parser.parse()
}

struct Parser<'src> {
  lex: Lexer<'src>,
  errors: Vec<Error>,
  indent: IndentStack,
}

impl<'src> Parser<'src> {
  fn new(lex: Lexer<'src>) -> Self {
    Self {
      lex,
      errors: Vec::new(),
      indent: IndentStack::new(),
    }
  }

  fn no_indent(&self) -> Result<()> {
    let token = self.current();
    if token.is(Tok_Eof) || token.ws.is_none() {
      Ok(())
    } else {
      Err(Error::new("invalid indentation", token.span))
    }
  }

  fn indent_eq(&self) -> Result<()> {
    let token = self.current();
    if token.is(Tok_Eof) || matches!(token.ws, Some(n) if self.indent.is_eq(n)) {
      Ok(())
    } else {
      Err(Error::new("invalid indentation", token.span))
    }
  }

  fn indent_gt(&mut self) -> Result<()> {
    let token = self.current();
    if token.is(Tok_Eof) {
      return Ok(());
    }
    match token.ws {
      Some(n) if self.indent.is_gt(n) => {
        self.indent.push(n);
        Ok(())
      }
      _ => Err(Error::new("expected an indented block", token.span)),
    }
  }

  fn dedent(&mut self) -> Result<()> {
    let token = self.current();
    if token.is(Tok_Eof) || matches!(token.ws, Some(n) if self.indent.is_lt(n)) {
      self.indent.pop();
      Ok(())
    } else {
      Err(Error::new("invalid indentation", token.span))
    }
  }

  #[inline]
  fn previous(&self) -> &Token {
    self.lex.previous()
  }

  #[inline]
  fn current(&self) -> &Token {
    self.lex.current()
  }

  #[inline]
  fn lexeme(&self, token: &Token) -> &'src str {
    self.lex.lexeme(token)
  }

  #[inline]
  fn expect(&mut self, kind: TokenKind) -> Result<()> {
    if self.bump_if(kind) {
      Ok(())
    } else {
      Err(Error::new(
        format!("expected `{}`", kind.name()),
        self.current().span,
      ))
    }
  }

  #[inline]
  fn bump_if(&mut self, kind: TokenKind) -> bool {
    if self.current().is(kind) {
      self.bump();
      true
    } else {
      false
    }
  }

  /// Move forward by one token, returning the previous one.
  #[inline]
  fn bump(&mut self) -> &Token {
    self.lex.bump();
    while self.current().is(Tok_Error) {
      self.errors.push(Error::new(
        format!("invalid token `{}`", self.lex.lexeme(self.current())),
        self.current().span,
      ));
      self.lex.bump();
    }
    self.previous()
  }

  /// Calls `f` and wraps the returned value in a span that encompasses the
  /// entire sequence of tokens parsed within `f`.
  #[inline]
  fn span<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<Spanned<T>> {
    let start = self.current().span;
    f(self).map(|value| {
      let end = self.previous().span;
      Spanned::new(start.join(end), value)
    })
  }

  fn sync(&mut self) {
    self.indent.reset();
    self.bump();
    while !self.current().is(Tok_Eof) {
      match self.current().kind {
        // break on tokens that begin a new top-level item or state
        Kw_Machine | Kw_Import | Kw_State => break,
        Tok_Error => self.errors.push(Error::new(
          format!("invalid token `{}`", self.lex.lexeme(self.current())),
          self.current().span,
        )),
        _ => {}
      }
      self.bump();
    }
  }

  fn parse(mut self) -> Result<ast::Spec<'src>, Vec<Error>> {
    let mut spec = ast::Spec::new();

    while !self.current().is(Tok_Eof) {
      if let Err(e) = self.item(&mut spec) {
        self.errors.push(e);
        self.sync();
      }
    }

    if !self.errors.is_empty() {
      return Err(self.errors);
    }

    Ok(spec)
  }
}

mod body;
mod common;
mod indent;
mod spec;
mod transition;

#[cfg(not(target_family = "wasm"))]
const MINIMUM_STACK_REQUIRED: usize = 64_000;

#[cfg(target_family = "wasm")]
fn check_recursion_limit(_span: Span) -> Result<()> {
  Ok(())
}

#[cfg(not(target_family = "wasm"))]
fn check_recursion_limit(span: Span) -> Result<()> {
  if stacker::remaining_stack()
    .map(|available| available > MINIMUM_STACK_REQUIRED)
    .unwrap_or(true)
  {
    Ok(())
  } else {
    Err(Error::new("nesting limit reached", span))
  }
}

#[cfg(test)]
mod tests;
