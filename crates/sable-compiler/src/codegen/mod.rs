//! C code generator.
//!
//! The [`CEmitter`] renders a [`CompiledModule`] as one C translation unit
//! against the `sable.h` runtime. Output order is fixed: aggregate layouts
//! with their lifecycle operations, register globals, function prototypes,
//! function bodies, and finally the register lifecycle functions.
//!
//! Heap-represented values are passed to runtime operations by address and
//! stack-represented values by value. A call whose result is heap-represented
//! takes the destination's address as its first argument; a stack result is
//! assigned.
//!
//! # Example
//!
//! ```ignore
//! let source = CEmitter::new(EmitFlags::default()).emit_module(&module);
//! ```

mod ctype;
mod layout;
pub mod mangle;

use num_traits::ToPrimitive;
use rustc_hash::FxHashSet;

use crate::anf::builtins;
use crate::fragment::{Fragment, UnOp};
use crate::ir::{CFunction, CLExp, CVal, CompiledModule, Instr, RETURN_PARAM};
use crate::options::EmitFlags;
use crate::types::CTyp;
use ctype::{c_type, suffix};
use mangle::mangle;

/// Render a module with the given flags.
pub fn generate(module: &CompiledModule, flags: EmitFlags) -> String {
    CEmitter::new(flags).emit_module(module)
}

/// Emits C source text.
pub struct CEmitter {
    out: String,
    indent: usize,
    flags: EmitFlags,
    /// Functions and constructors the module defines; their names are mangled.
    defined: FxHashSet<String>,
    /// Suffixes of the aggregates whose layout has been emitted.
    emitted: FxHashSet<String>,
}

impl CEmitter {
    pub fn new(flags: EmitFlags) -> Self {
        Self {
            out: String::new(),
            indent: 0,
            flags,
            defined: FxHashSet::default(),
            emitted: FxHashSet::default(),
        }
    }

    /// Render a whole module.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn emit_module(mut self, module: &CompiledModule) -> String {
        self.defined.extend(module.functions().map(|f| f.name.clone()));
        for ctyp in module.types() {
            if let CTyp::Variant(_, ctors) = ctyp {
                self.defined.extend(ctors.iter().map(|(c, _)| c.clone()));
            }
        }

        self.line("#include \"sable.h\"");

        for ctyp in module.types() {
            self.layout(ctyp);
        }
        for tuple in used_tuples(module) {
            self.layout(&tuple);
        }

        let registers: Vec<(&str, &CTyp)> = module.registers().collect();
        if !registers.is_empty() {
            self.blank();
            for (name, ctyp) in &registers {
                self.line(format!("{} {};", c_type(ctyp), mangle(name)));
            }
        }

        let functions: Vec<&CFunction> = module.functions().collect();
        if !functions.is_empty() {
            self.blank();
            for function in &functions {
                let signature = self.signature(function);
                self.line(format!("{signature};"));
            }
        }
        for function in &functions {
            self.blank();
            self.function(function);
        }

        if self.flags.contains(EmitFlags::LIFECYCLE) {
            self.lifecycle(&registers);
        }

        self.out
    }

    // ==========================================================================
    // Basic Emission
    // ==========================================================================

    fn line(&mut self, text: impl AsRef<str>) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Emit a line ending a block header and indent.
    fn open(&mut self, text: impl AsRef<str>) {
        self.line(text);
        self.indent += 1;
    }

    /// Dedent and emit the line closing a block.
    fn close(&mut self, text: impl AsRef<str>) {
        self.indent = self.indent.saturating_sub(1);
        self.line(text);
    }

    // ==========================================================================
    // Functions
    // ==========================================================================

    fn signature(&self, function: &CFunction) -> String {
        let mut params = Vec::with_capacity(function.params.len() + 1);
        let ret = if function.returns_by_reference() {
            params.push(format!("{} *{RETURN_PARAM}", c_type(&function.ret)));
            c_type(&CTyp::Unit)
        } else {
            c_type(&function.ret)
        };
        params.extend(
            function
                .params
                .iter()
                .map(|(name, ctyp)| format!("{} {}", c_type(ctyp), mangle(name))),
        );
        let params = if params.is_empty() {
            "void".to_string()
        } else {
            params.join(", ")
        };
        let linkage = if self.flags.contains(EmitFlags::STATIC_FUNCTIONS) {
            "static "
        } else {
            ""
        };
        format!("{linkage}{ret} {}({params})", mangle(&function.name))
    }

    fn function(&mut self, function: &CFunction) {
        let signature = self.signature(function);
        self.line(signature);
        self.open("{");
        for instr in &function.body {
            self.instr(instr);
        }
        self.close("}");
    }

    fn lifecycle(&mut self, registers: &[(&str, &CTyp)]) {
        let heap: Vec<&(&str, &CTyp)> = registers.iter().filter(|(_, c)| !c.is_stack()).collect();

        self.blank();
        self.line("void model_init(void)");
        self.open("{");
        for (name, ctyp) in &heap {
            self.line(format!("init_{}(&{});", suffix(ctyp), mangle(name)));
        }
        self.close("}");

        self.blank();
        self.line("void model_fini(void)");
        self.open("{");
        for (name, ctyp) in heap.iter().rev() {
            self.line(format!("clear_{}(&{});", suffix(ctyp), mangle(name)));
        }
        self.close("}");
    }

    // ==========================================================================
    // Instructions
    // ==========================================================================

    fn instr(&mut self, instr: &Instr) {
        match instr {
            Instr::Decl(ctyp, name) => self.line(format!("{} {};", c_type(ctyp), mangle(name))),
            Instr::Alloc(ctyp, name) => {
                let name = mangle(name);
                self.line(format!("{} {name};", c_type(ctyp)));
                self.line(format!("init_{}(&{name});", suffix(ctyp)));
            }
            Instr::Init(ctyp, name, val) => {
                let name = mangle(name);
                self.line(format!("{} {name};", c_type(ctyp)));
                if val.ctyp().compatible(ctyp) {
                    self.line(format!("init_{}(&{name});", suffix(ctyp)));
                    self.line(format!("set_{}(&{name}, {});", suffix(ctyp), value(val)));
                } else {
                    self.line(format!(
                        "init_{}_of_{}(&{name}, {});",
                        suffix(ctyp),
                        suffix(val.ctyp()),
                        value(val)
                    ));
                }
            }
            Instr::If(cond, then, els, _) => {
                self.open(format!("if ({}) {{", value(cond)));
                for instr in then {
                    self.instr(instr);
                }
                if els.is_empty() {
                    self.close("}");
                } else {
                    self.close("} else {");
                    self.indent += 1;
                    for instr in els {
                        self.instr(instr);
                    }
                    self.close("}");
                }
            }
            Instr::Funcall(dest, name, args) => {
                let callee = self.callee(name);
                let args: Vec<String> = args.iter().map(value).collect();
                if dest.ctyp().is_stack() {
                    self.line(format!("{} = {callee}({});", lvalue(dest), args.join(", ")));
                } else {
                    let mut all = vec![address(dest)];
                    all.extend(args);
                    self.line(format!("{callee}({});", all.join(", ")));
                }
            }
            Instr::Convert(dest, val) => {
                let (to, from) = (dest.ctyp(), val.ctyp());
                if from.compatible(to) {
                    self.store(dest, val);
                } else if let (CTyp::FBits(..), CTyp::FBits(width, _)) = (from, to) {
                    let mask = fragment(&Fragment::mask(*width));
                    self.line(format!("{} = ({} & {mask});", lvalue(dest), value(val)));
                } else if to.is_stack() {
                    self.line(format!(
                        "{} = convert_{}_of_{}({});",
                        lvalue(dest),
                        suffix(to),
                        suffix(from),
                        value(val)
                    ));
                } else {
                    self.line(format!(
                        "convert_{}_of_{}({}, {});",
                        suffix(to),
                        suffix(from),
                        address(dest),
                        value(val)
                    ));
                }
            }
            Instr::Assign(dest, val) => self.line(format!("{} = {};", lvalue(dest), value(val))),
            Instr::Copy(dest, val) => self.line(format!(
                "set_{}({}, {});",
                suffix(dest.ctyp()),
                address(dest),
                value(val)
            )),
            Instr::Clear(ctyp, name) => {
                self.line(format!("clear_{}(&{});", suffix(ctyp), mangle(name)));
            }
            Instr::Return(val) => self.line(format!("return {};", value(val))),
            Instr::Comment(text) => {
                if self.flags.contains(EmitFlags::COMMENTS) {
                    self.line(format!("/* {} */", text.replace("*/", "* /")));
                }
            }
            Instr::Loop(body) => {
                self.open("while (true) {");
                for instr in body {
                    self.instr(instr);
                }
                self.close("}");
            }
            Instr::Break => self.line("break;"),
        }
    }

    fn store(&mut self, dest: &CLExp, val: &CVal) {
        if dest.ctyp().is_stack() {
            self.line(format!("{} = {};", lvalue(dest), value(val)));
        } else {
            self.line(format!(
                "set_{}({}, {});",
                suffix(dest.ctyp()),
                address(dest),
                value(val)
            ));
        }
    }

    /// C name of a call target.
    fn callee(&self, name: &str) -> String {
        if self.defined.contains(name) {
            mangle(name)
        } else if builtins::is_builtin(name) {
            format!("sable_{name}")
        } else {
            name.to_string()
        }
    }
}

// ==========================================================================
// Values
// ==========================================================================

fn lvalue(loc: &CLExp) -> String {
    match loc {
        CLExp::Id(name, _) => mangle(name),
        CLExp::Field(base, field, _) => format!("{}.{}", lvalue(base), mangle(field)),
        CLExp::Deref(name, _) => format!("(*{name})"),
    }
}

fn address(loc: &CLExp) -> String {
    match loc {
        CLExp::Id(name, _) => format!("&{}", mangle(name)),
        CLExp::Field(..) => format!("&({})", lvalue(loc)),
        CLExp::Deref(name, _) => name.clone(),
    }
}

fn value(val: &CVal) -> String {
    match val {
        CVal::Id(name, _) => mangle(name),
        CVal::Frag(frag, _) => fragment(frag),
    }
}

fn fragment(frag: &Fragment) -> String {
    match frag {
        Fragment::Id(name) => mangle(name),
        Fragment::Unit => "UNIT".to_string(),
        Fragment::Bool(b) => b.to_string(),
        // Lowering parses wider integers into a `big_int` and the verifier
        // rejects any that remain, so every one here fits.
        Fragment::Int(n) if n.to_i64() == Some(i64::MIN) => "INT64_MIN".to_string(),
        Fragment::Int(n) => format!("INT64_C({n})"),
        Fragment::Bits(bits, _) => format!("UINT64_C(0x{bits:X})"),
        Fragment::Str(s) => c_string(s),
        Fragment::Field(base, field) => format!("{}.{}", fragment(base), mangle(field)),
        Fragment::Binary(op, lhs, rhs) => {
            format!("({} {} {})", fragment(lhs), op.symbol(), fragment(rhs))
        }
        Fragment::Unary(UnOp::Not, operand) => format!("!{}", fragment(operand)),
        Fragment::AddrOf(name) => format!("&{}", mangle(name)),
    }
}

fn c_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            c => {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).bytes() {
                    out.push_str(&format!("\\{byte:03o}"));
                }
            }
        }
    }
    out.push('"');
    out
}

/// Every tuple representation a module declares storage of, in first-use order.
fn used_tuples(module: &CompiledModule) -> Vec<CTyp> {
    fn visit(ctyp: &CTyp, seen: &mut Vec<CTyp>) {
        if let CTyp::Tuple(elems) = ctyp {
            for elem in elems {
                visit(elem, seen);
            }
            if !seen.contains(ctyp) {
                seen.push(ctyp.clone());
            }
        }
    }

    fn visit_body(body: &[Instr], seen: &mut Vec<CTyp>) {
        for instr in body {
            match instr {
                Instr::Decl(ctyp, _)
                | Instr::Alloc(ctyp, _)
                | Instr::Init(ctyp, _, _)
                | Instr::Clear(ctyp, _) => visit(ctyp, seen),
                Instr::If(_, then, els, ctyp) => {
                    visit(ctyp, seen);
                    visit_body(then, seen);
                    visit_body(els, seen);
                }
                Instr::Loop(body) => visit_body(body, seen),
                _ => {}
            }
        }
    }

    let mut seen = Vec::new();
    for (_, ctyp) in module.registers() {
        visit(ctyp, &mut seen);
    }
    for function in module.functions() {
        visit(&function.ret, &mut seen);
        for (_, ctyp) in &function.params {
            visit(ctyp, &mut seen);
        }
        visit_body(&function.body, &mut seen);
    }
    seen
}
