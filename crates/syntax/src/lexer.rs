#![allow(non_camel_case_types)]

use std::borrow::Borrow;
use std::mem::discriminant;
use std::ops::Range;

use logos::Logos;
use span::Span;

/// A single structural token. Raw/opaque text (rest-of-line, indented code
/// blocks, bracket-balanced expressions) is not tokenized by [`TokenKind`]
/// at all -- it's sliced directly out of the source by the `raw_*` methods
/// below, once the parser knows it wants one.
#[derive(Clone, Debug)]
pub struct Token {
  pub ws: Option<u64>,
  pub kind: TokenKind,
  pub span: Span,
}

impl Token {
  pub fn is(&self, kind: impl Borrow<TokenKind>) -> bool {
    discriminant(&self.kind) == discriminant(kind.borrow())
  }
}

#[derive(Clone)]
pub struct Lexer<'src> {
  src: &'src str,
  // Byte offset that `inner`'s spans are relative to. Reset every time a
  // `raw_*` method re-slices the source and rebuilds the inner lexer.
  base: usize,
  inner: logos::Lexer<'src, TokenKind>,
  previous: Token,
  current: Token,
  eof: Token,
}

impl<'src> Lexer<'src> {
  pub fn new(src: &'src str) -> Self {
    let end = src.len();
    let eof = Token {
      ws: None,
      span: (end..end).into(),
      kind: TokenKind::Tok_Eof,
    };

    let mut lex = Self {
      src,
      base: 0,
      inner: TokenKind::lexer(src),
      previous: eof.clone(),
      current: eof.clone(),
      eof,
    };
    lex.bump();

    lex
  }

  #[inline]
  pub fn previous(&self) -> &Token {
    &self.previous
  }

  #[inline]
  pub fn current(&self) -> &Token {
    &self.current
  }

  #[inline]
  pub fn eof(&self) -> &Token {
    &self.eof
  }

  #[inline]
  pub fn lexeme(&self, token: &Token) -> &'src str {
    &self.src[Range::from(token.span)]
  }

  #[inline]
  pub fn bump(&mut self) {
    std::mem::swap(&mut self.previous, &mut self.current);
    self.current = self.next_token().unwrap_or_else(|| self.eof.clone());
  }

  fn next_token(&mut self) -> Option<Token> {
    let base = self.base;
    let lexer = &mut self.inner;
    let mut ws = None;
    while let Some(kind) = lexer.next() {
      let lexeme = lexer.slice();
      let span: Span = lexer.span().into();
      let span = Span {
        start: span.start + base,
        end: span.end + base,
      };

      match kind {
        TokenKind::_Whitespace | TokenKind::_Comment => {}
        TokenKind::_Indent => ws = Some(measure_indent(lexeme)),
        _ => return Some(Token { ws, kind, span }),
      }
    }

    None
  }

  /// Re-point the lexer at `at` (an absolute byte offset into the original
  /// source) and re-derive `current`/`previous`. Used after a raw scan
  /// (rest-of-line, indented block, bracket-balanced region) consumes bytes
  /// the inner [`logos::Lexer`] never saw.
  fn resync(&mut self, at: usize) {
    self.base = at;
    self.inner = TokenKind::lexer(&self.src[at..]);
    self.previous = self.current.clone();
    self.current = self.next_token().unwrap_or_else(|| self.eof.clone());
  }

  /// Consume the rest of the current physical line verbatim, starting right
  /// after `self.previous()` (the token that introduced the clause, e.g. the
  /// `:` of a `code` production). Used for the `TOEOL` lexical class.
  pub fn raw_rest_of_line(&mut self) -> (Span, &'src str) {
    let start = self.previous.span.end;
    let rest = &self.src[start..];
    let len = rest.find('\n').unwrap_or(rest.len());
    let text = rest[..len].trim_end_matches('\r');
    let end = start + text.len();

    self.resync(find_line_end(self.src, start).max(end));
    ((start..end).into(), text)
  }

  /// Consume zero or more physical lines whose indentation is strictly
  /// greater than `min_indent`, stripping exactly `min_indent` leading
  /// columns from each so relative indentation is preserved. Used for the
  /// `INDENTED_CODE` lexical class.
  pub fn raw_indented_block(&mut self, min_indent: u64) -> Vec<(Span, &'src str)> {
    let mut lines = Vec::new();
    let mut pos = find_line_end(self.src, self.previous.span.end);

    loop {
      if pos >= self.src.len() {
        break;
      }
      let rest = &self.src[pos..];
      let line_len = rest.find('\n').unwrap_or(rest.len());
      let line = rest[..line_len].trim_end_matches('\r');
      let indent = leading_width(line);

      if line.trim().is_empty() {
        // blank lines don't end the block; keep them as empty continuation
        lines.push(((pos..pos).into(), ""));
        pos += line_len + 1;
        continue;
      }
      if indent <= min_indent {
        break;
      }

      let strip = min_indent as usize;
      let start = pos + strip;
      let end = pos + line.len();
      lines.push(((start..end).into(), &line[strip..]));
      pos += line_len + 1;
    }

    self.resync(pos);
    lines
  }

  /// Consume raw text balanced by `open`/`close`, assuming `open` has
  /// already been bumped past (i.e. `self.previous()` is the open bracket).
  /// Returns the inner text, excluding both delimiters; `close` becomes the
  /// new `current()` token.
  pub fn raw_balanced(&mut self, open: char, close: char) -> (Span, &'src str) {
    let start = self.previous.span.end;
    let bytes = self.src.as_bytes();
    let mut depth: i32 = 1;
    let mut i = start;
    while i < bytes.len() {
      let c = self.src[i..].chars().next().unwrap();
      if c == open {
        depth += 1;
      } else if c == close {
        depth -= 1;
        if depth == 0 {
          break;
        }
      }
      i += c.len_utf8();
    }
    let text = &self.src[start..i];

    self.resync(i);
    ((start..i).into(), text)
  }

  /// Like [`Lexer::raw_balanced`], but additionally splits the inner text on
  /// top-level commas (commas inside a nested bracket pair of any kind don't
  /// count). Used for argument/parameter lists, e.g. `is ev(a, f(b, c))`.
  pub fn raw_balanced_list(&mut self, open: char, close: char) -> (Span, Vec<(Span, &'src str)>) {
    let start = self.previous.span.end;
    let mut depth: i32 = 1;
    let mut i = start;
    let mut item_start = start;
    let mut items = Vec::new();

    while i < self.src.len() {
      let c = self.src[i..].chars().next().unwrap();
      match c {
        '(' | '[' | '{' => depth += 1,
        ')' | ']' | '}' if c == close && depth == 1 => {
          let text = self.src[item_start..i].trim();
          if !(item_start == i && items.is_empty() && text.is_empty()) {
            items.push(((item_start..i).into(), text));
          }
          depth = 0;
          break;
        }
        ')' | ']' | '}' => depth -= 1,
        ',' if depth == 1 => {
          items.push(((item_start..i).into(), self.src[item_start..i].trim()));
          item_start = i + 1;
        }
        _ => {}
      }
      if depth == 0 {
        break;
      }
      i += c.len_utf8();
    }
    let _ = open;

    self.resync(i);
    ((start..i).into(), items)
  }
}

fn find_line_end(src: &str, from: usize) -> usize {
  src[from..]
    .find('\n')
    .map(|i| from + i + 1)
    .unwrap_or(src.len())
}

fn leading_width(line: &str) -> u64 {
  line.chars().take_while(|c| *c == ' ').count() as u64
}

fn measure_indent(s: &str) -> u64 {
  let pos = s.rfind('\n').unwrap_or(0);
  (s.len() - pos - 1) as u64
}

// Structural tokens only. Rest-of-line, indented code and bracket-balanced
// expression text are sliced out of the source directly (see `raw_*` above)
// rather than tokenized, since they embed an arbitrary opaque host language.
#[derive(Clone, Copy, Debug, Logos, PartialEq)]
pub enum TokenKind {
  #[token("machine")]
  Kw_Machine,
  #[token("state")]
  Kw_State,
  #[token("pass")]
  Kw_Pass,
  #[token("enter")]
  Kw_Enter,
  #[token("exit")]
  Kw_Exit,
  #[token("import")]
  Kw_Import,
  #[token("is")]
  Kw_Is,
  #[token("ms")]
  Kw_Ms,
  #[token("s")]
  Kw_S,

  #[token("*")]
  Tok_Star,
  #[token("---")]
  Tok_Dashes,
  #[token("->")]
  Tok_Arrow,
  #[token("[")]
  Brk_SquareL,
  #[token("]")]
  Brk_SquareR,
  #[token("(")]
  Brk_ParenL,
  #[token(")")]
  Brk_ParenR,
  #[token(":")]
  Tok_Colon,
  #[token(",")]
  Tok_Comma,
  #[token(".")]
  Op_Dot,
  #[token("^")]
  Tok_Caret,
  #[token("=")]
  Op_Equal,

  #[regex(r"[0-9]+\.[0-9]+")]
  Lit_Float,
  #[regex(r"[0-9]+")]
  Lit_Int,
  #[regex("[a-zA-Z_][a-zA-Z0-9_]*")]
  Lit_Ident,

  #[doc(hidden)]
  #[regex(r"(\r?\n)+[ ]*", priority = 10)]
  _Indent,
  #[doc(hidden)]
  #[regex(r"[ \n\r]+")]
  _Whitespace,
  #[doc(hidden)]
  #[regex(r"#[^\n]*")]
  _Comment,

  #[error]
  Tok_Error,
  Tok_Eof,
}

impl TokenKind {
  pub fn name(&self) -> &'static str {
    use TokenKind::*;
    match self {
      Kw_Machine => "machine",
      Kw_State => "state",
      Kw_Pass => "pass",
      Kw_Enter => "enter",
      Kw_Exit => "exit",
      Kw_Import => "import",
      Kw_Is => "is",
      Kw_Ms => "ms",
      Kw_S => "s",
      Tok_Star => "*",
      Tok_Dashes => "---",
      Tok_Arrow => "->",
      Brk_SquareL => "[",
      Brk_SquareR => "]",
      Brk_ParenL => "(",
      Brk_ParenR => ")",
      Tok_Colon => ":",
      Tok_Comma => ",",
      Op_Dot => ".",
      Tok_Caret => "^",
      Op_Equal => "=",
      Lit_Float => "float",
      Lit_Int => "integer",
      Lit_Ident => "identifier",
      _Indent | _Whitespace | _Comment => "<trivia>",
      Tok_Error => "<invalid token>",
      Tok_Eof => "end of file",
    }
  }
}
