//! Field access and record update lowering.

use sable_core::{CompilationError, Typ};

use super::{Lowered, Lowerer, Result, clear, transfer};
use crate::anf::AVal;
use crate::fragment::Fragment;
use crate::ir::{CLExp, CVal};
use crate::types::CTyp;

impl Lowerer<'_> {
    /// `base.field` lowers to a projection fragment over the base.
    pub(super) fn lower_field(&mut self, base: AVal, field: String, typ: &Typ) -> Result<Lowered> {
        let op = self.operand(base)?;
        let field_ctyp = field_of(op.val.ctyp(), &field)?;
        let frag = match op.val {
            CVal::Id(name, _) => Fragment::field(Fragment::Id(name), field),
            CVal::Frag(frag, _) => Fragment::field(frag, field),
        };
        let lowered = Lowered::value(op.setup, CVal::Frag(frag, field_ctyp), op.cleanup);
        let ctyp = self.ctyp(typ)?;
        self.coerce(lowered, &ctyp, "field access")
    }

    /// `{ base with f = v, ... }` copies the base into a fresh value and
    /// overwrites the updated fields in the order given.
    pub(super) fn lower_record_update(
        &mut self,
        base: AVal,
        fields: Vec<(String, AVal)>,
        typ: &Typ,
    ) -> Result<Lowered> {
        let ctyp = self.ctyp(typ)?;
        let (tmp, decl) = self.temp(&ctyp);
        let record = CLExp::Id(tmp.clone(), ctyp.clone());

        let mut setup = vec![decl];
        let op = self.operand(base)?;
        setup.extend(op.setup);
        setup.push(transfer(record.clone(), op.val, "record update")?);
        self.release(&op.cleanup);
        setup.extend(op.cleanup);

        for (field, value) in fields {
            let field_ctyp = field_of(&ctyp, &field)?;
            let op = self.operand(value)?;
            let dest = record.clone().field(field.clone(), field_ctyp);
            setup.extend(op.setup);
            setup.push(transfer(dest, op.val, &format!("field '{field}'"))?);
            self.release(&op.cleanup);
            setup.extend(op.cleanup);
        }

        let cleanup = clear(&tmp, &ctyp).into_iter().collect();
        Ok(Lowered::value(setup, CVal::Id(tmp, ctyp), cleanup))
    }
}

fn field_of(record: &CTyp, field: &str) -> Result<CTyp> {
    record
        .fields()
        .and_then(|fields| fields.into_iter().find(|(name, _)| name == field))
        .map(|(_, ctyp)| ctyp)
        .ok_or_else(|| CompilationError::UnknownField {
            record: record.to_string(),
            field: field.to_string(),
        })
}
