use super::*;

impl<'src> Parser<'src> {
  /// `spec := { machine | constant | import }`
  pub(super) fn item(&mut self, spec: &mut ast::Spec<'src>) -> Result<()> {
    self.indent_eq()?;

    if self.bump_if(Kw_Import) {
      spec.items.push(ast::Item::Import(ast::Import {
        text: self.rest_of_line(),
      }));
    } else if self.current().is(Kw_Machine) {
      spec.items.push(ast::Item::Machine(self.machine()?));
    } else {
      let name = self.ident()?;
      self.expect(Op_Equal)?;
      spec.items.push(ast::Item::Constant(ast::Constant {
        name,
        expr: self.rest_of_line(),
      }));
    }

    Ok(())
  }

  /// `machine := "machine" NAME [ "(" NAME ")" ] ":" INDENT body DEDENT`
  pub(super) fn machine(&mut self) -> Result<ast::Machine<'src>> {
    self.expect(Kw_Machine)?;
    let name = self.ident()?;
    let base = if self.bump_if(Brk_ParenL) {
      let base = self.ident()?;
      self.expect(Brk_ParenR)?;
      Some(base)
    } else {
      None
    };
    self.expect(Tok_Colon)?;
    let body = self.body(false)?;
    Ok(ast::Machine {
      name,
      base,
      enter: body.enter,
      exit: body.exit,
      transitions: body.transitions,
      regions: body.regions,
    })
  }
}
