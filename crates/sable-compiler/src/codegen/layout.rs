//! Aggregate layouts and their lifecycle operations.
//!
//! A heap-represented struct or tuple gets `init`, `clear` and a deep `set`
//! that assigns stack fields and delegates heap fields to their own `set`.
//! A tagged union gets a kind enum, an anonymous payload union, the same
//! three operations and one constructor function per constructor.

use super::CEmitter;
use super::ctype::{c_type, kind_enum, kind_tag, suffix};
use super::mangle::mangle;
use crate::types::CTyp;

impl CEmitter {
    /// Emit the layout of an aggregate after the layouts it depends on.
    pub(super) fn layout(&mut self, ctyp: &CTyp) {
        let key = suffix(ctyp);
        if self.emitted.contains(&key) {
            return;
        }
        match ctyp {
            CTyp::Tuple(_) | CTyp::Struct(..) => {
                let fields = ctyp.fields().unwrap_or_default();
                for (_, field) in &fields {
                    self.layout(field);
                }
                self.emitted.insert(key);
                self.record(ctyp, &fields);
            }
            CTyp::Enum(name, members) => {
                self.emitted.insert(key);
                let members: Vec<String> = members.iter().map(|m| mangle(m)).collect();
                self.blank();
                self.line(format!("enum {} {{ {} }};", mangle(name), members.join(", ")));
            }
            CTyp::Variant(name, ctors) => {
                for (_, payload) in ctors {
                    self.layout(payload);
                }
                self.emitted.insert(key);
                self.variant(ctyp, name, ctors);
            }
            _ => {}
        }
    }

    fn record(&mut self, ctyp: &CTyp, fields: &[(String, CTyp)]) {
        let ty = c_type(ctyp);
        let sfx = suffix(ctyp);

        self.blank();
        self.open(format!("{ty} {{"));
        if fields.is_empty() {
            self.line("unit unused;");
        }
        for (field, field_ctyp) in fields {
            self.line(format!("{} {};", c_type(field_ctyp), mangle(field)));
        }
        self.close("};");

        if ctyp.is_stack() {
            return;
        }
        let heap: Vec<&(String, CTyp)> = fields.iter().filter(|(_, c)| !c.is_stack()).collect();

        self.blank();
        self.line(format!("static void init_{sfx}({ty} *op)"));
        self.open("{");
        for (field, field_ctyp) in &heap {
            self.line(format!("init_{}(&op->{});", suffix(field_ctyp), mangle(field)));
        }
        self.close("}");

        self.blank();
        self.line(format!("static void clear_{sfx}({ty} *op)"));
        self.open("{");
        for (field, field_ctyp) in heap.iter().rev() {
            self.line(format!("clear_{}(&op->{});", suffix(field_ctyp), mangle(field)));
        }
        self.close("}");

        self.blank();
        self.line(format!("static void set_{sfx}({ty} *rop, const {ty} op)"));
        self.open("{");
        for (field, field_ctyp) in fields {
            let field = mangle(field);
            if field_ctyp.is_stack() {
                self.line(format!("rop->{field} = op.{field};"));
            } else {
                self.line(format!("set_{}(&rop->{field}, op.{field});", suffix(field_ctyp)));
            }
        }
        self.close("}");
    }

    fn variant(&mut self, ctyp: &CTyp, name: &str, ctors: &[(String, CTyp)]) {
        let ty = c_type(ctyp);
        let sfx = suffix(ctyp);
        let kind = kind_enum(name);
        let tags: Vec<String> = ctors.iter().map(|(c, _)| kind_tag(c)).collect();

        self.blank();
        self.line(format!("enum {kind} {{ {} }};", tags.join(", ")));

        self.blank();
        self.open(format!("{ty} {{"));
        self.line(format!("enum {kind} kind;"));
        self.open("union {");
        for (ctor, payload) in ctors {
            self.line(format!("{} {};", c_type(payload), mangle(ctor)));
        }
        self.close("};");
        self.close("};");

        self.blank();
        self.line(format!("static void init_{sfx}({ty} *op)"));
        self.open("{");
        if let Some((first, payload)) = ctors.first() {
            self.line(format!("op->kind = {};", kind_tag(first)));
            if !payload.is_stack() {
                self.line(format!("init_{}(&op->{});", suffix(payload), mangle(first)));
            }
        }
        self.close("}");

        self.blank();
        self.line(format!("static void clear_{sfx}({ty} *op)"));
        self.open("{");
        for (ctor, payload) in ctors.iter().filter(|(_, p)| !p.is_stack()) {
            self.open(format!("if (op->kind == {}) {{", kind_tag(ctor)));
            self.line(format!("clear_{}(&op->{});", suffix(payload), mangle(ctor)));
            self.close("}");
        }
        self.close("}");

        self.blank();
        self.line(format!("static void set_{sfx}({ty} *rop, const {ty} op)"));
        self.open("{");
        self.line(format!("clear_{sfx}(rop);"));
        self.line("rop->kind = op.kind;");
        for (ctor, payload) in ctors {
            let field = mangle(ctor);
            self.open(format!("if (op.kind == {}) {{", kind_tag(ctor)));
            self.payload_store(payload, &field, &format!("op.{field}"));
            self.close("}");
        }
        self.close("}");

        for (ctor, payload) in ctors {
            let field = mangle(ctor);
            self.blank();
            self.line(format!(
                "static void {field}({ty} *rop, {} op)",
                c_type(payload)
            ));
            self.open("{");
            self.line(format!("clear_{sfx}(rop);"));
            self.line(format!("rop->kind = {};", kind_tag(ctor)));
            self.payload_store(payload, &field, "op");
            self.close("}");
        }
    }

    /// Store into the freshly selected payload of `rop`.
    fn payload_store(&mut self, payload: &CTyp, field: &str, source: &str) {
        if payload.is_stack() {
            self.line(format!("rop->{field} = {source};"));
        } else {
            let sfx = suffix(payload);
            self.line(format!("init_{sfx}(&rop->{field});"));
            self.line(format!("set_{sfx}(&rop->{field}, {source});"));
        }
    }
}
