//! Linear instruction form.
//!
//! Lowering produces function bodies as ordered lists of [`Instr`]. Heap
//! storage is explicit: a name is brought to life by [`Instr::Alloc`] or
//! [`Instr::Init`] and must be released by exactly one [`Instr::Clear`] on
//! every path that follows, innermost first. [`verify`] checks this.
//!
//! Nesting only occurs inside [`Instr::If`] arms and [`Instr::Loop`] bodies.

pub mod verify;

use std::fmt;

use crate::fragment::Fragment;
use crate::types::CTyp;

/// A materialized value.
#[derive(Debug, Clone, PartialEq)]
pub enum CVal {
    /// A named value.
    Id(String, CTyp),
    /// An inline fragment.
    Frag(Fragment, CTyp),
}

impl CVal {
    pub fn ctyp(&self) -> &CTyp {
        match self {
            CVal::Id(_, ctyp) | CVal::Frag(_, ctyp) => ctyp,
        }
    }

    /// The unit value.
    pub fn unit() -> Self {
        CVal::Frag(Fragment::Unit, CTyp::Unit)
    }

    /// The name this value reads, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            CVal::Id(name, _) => Some(name),
            CVal::Frag(frag, _) => frag_root(frag),
        }
    }
}

fn frag_root(frag: &Fragment) -> Option<&str> {
    match frag {
        Fragment::Id(name) => Some(name),
        Fragment::Field(base, _) => frag_root(base),
        _ => None,
    }
}

/// An assignable location.
#[derive(Debug, Clone, PartialEq)]
pub enum CLExp {
    Id(String, CTyp),
    /// A field of a struct or tuple location.
    Field(Box<CLExp>, String, CTyp),
    /// The target of a pointer-typed name.
    Deref(String, CTyp),
}

impl CLExp {
    pub fn ctyp(&self) -> &CTyp {
        match self {
            CLExp::Id(_, ctyp) | CLExp::Field(_, _, ctyp) | CLExp::Deref(_, ctyp) => ctyp,
        }
    }

    /// The variable the location belongs to.
    pub fn root(&self) -> &str {
        match self {
            CLExp::Id(name, _) | CLExp::Deref(name, _) => name,
            CLExp::Field(base, _, _) => base.root(),
        }
    }

    /// Field of this location.
    pub fn field(self, name: impl Into<String>, ctyp: CTyp) -> Self {
        CLExp::Field(Box::new(self), name.into(), ctyp)
    }
}

/// One instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    /// Declare a stack-represented local.
    Decl(CTyp, String),
    /// Declare and allocate a heap-represented local, zero-initialized.
    Alloc(CTyp, String),
    /// Declare and allocate a heap-represented local from a value.
    Init(CTyp, String, CVal),
    /// Branch on a boolean. Both arms write the same destination.
    If(CVal, Vec<Instr>, Vec<Instr>, CTyp),
    /// Call a function, writing its result to the destination.
    Funcall(CLExp, String, Vec<CVal>),
    /// Store a value into a location of a different representation.
    Convert(CLExp, CVal),
    /// Plain store of a stack-represented value.
    Assign(CLExp, CVal),
    /// Deep copy of a heap-represented value.
    Copy(CLExp, CVal),
    /// Release a heap-represented local.
    Clear(CTyp, String),
    Return(CVal),
    Comment(String),
    /// Repeat until a [`Instr::Break`].
    Loop(Vec<Instr>),
    Break,
}

impl Instr {
    /// Whether the instruction brings a heap allocation to life.
    pub fn allocates(&self) -> Option<&str> {
        match self {
            Instr::Alloc(_, name) | Instr::Init(_, name, _) => Some(name),
            _ => None,
        }
    }
}

/// A lowered function.
#[derive(Debug, Clone, PartialEq)]
pub struct CFunction {
    pub name: String,
    pub params: Vec<(String, CTyp)>,
    /// Declared result representation. A heap result is written through the
    /// [`RETURN_PARAM`] out-parameter and the body returns unit.
    pub ret: CTyp,
    pub body: Vec<Instr>,
}

impl CFunction {
    /// Whether the result is passed back through [`RETURN_PARAM`].
    pub fn returns_by_reference(&self) -> bool {
        !self.ret.is_stack()
    }
}

/// Name of the out-parameter carrying heap results.
pub const RETURN_PARAM: &str = "rop";

/// A compiled top-level definition.
#[derive(Debug, Clone, PartialEq)]
pub enum CDef {
    Register(String, CTyp),
    Function(CFunction),
    /// An aggregate type layout.
    Type(CTyp),
}

/// The definitions of one compilation run, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledModule {
    pub defs: Vec<CDef>,
}

impl CompiledModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn functions(&self) -> impl Iterator<Item = &CFunction> {
        self.defs.iter().filter_map(|def| match def {
            CDef::Function(f) => Some(f),
            _ => None,
        })
    }

    pub fn function(&self, name: &str) -> Option<&CFunction> {
        self.functions().find(|f| f.name == name)
    }

    pub fn registers(&self) -> impl Iterator<Item = (&str, &CTyp)> {
        self.defs.iter().filter_map(|def| match def {
            CDef::Register(name, ctyp) => Some((name.as_str(), ctyp)),
            _ => None,
        })
    }

    pub fn types(&self) -> impl Iterator<Item = &CTyp> {
        self.defs.iter().filter_map(|def| match def {
            CDef::Type(ctyp) => Some(ctyp),
            _ => None,
        })
    }
}

// ==========================================================================
// Debug rendering
// ==========================================================================

impl fmt::Display for CVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CVal::Id(name, _) => write!(f, "{name}"),
            CVal::Frag(frag, _) => write!(f, "{frag}"),
        }
    }
}

impl fmt::Display for CLExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CLExp::Id(name, _) => write!(f, "{name}"),
            CLExp::Field(base, field, _) => write!(f, "{base}.{field}"),
            CLExp::Deref(name, _) => write!(f, "*{name}"),
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[CVal]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

fn write_block(f: &mut fmt::Formatter<'_>, instrs: &[Instr], depth: usize) -> fmt::Result {
    for instr in instrs {
        write_instr(f, instr, depth)?;
    }
    Ok(())
}

fn write_instr(f: &mut fmt::Formatter<'_>, instr: &Instr, depth: usize) -> fmt::Result {
    let pad = "  ".repeat(depth);
    match instr {
        Instr::Decl(ctyp, name) => writeln!(f, "{pad}{ctyp} {name}"),
        Instr::Alloc(ctyp, name) => writeln!(f, "{pad}{ctyp} {name} = alloc"),
        Instr::Init(ctyp, name, val) => writeln!(f, "{pad}{ctyp} {name} = alloc {val}"),
        Instr::If(cond, then, els, _) => {
            writeln!(f, "{pad}if {cond} {{")?;
            write_block(f, then, depth + 1)?;
            writeln!(f, "{pad}}} else {{")?;
            write_block(f, els, depth + 1)?;
            writeln!(f, "{pad}}}")
        }
        Instr::Funcall(dest, name, args) => {
            write!(f, "{pad}{dest} = {name}(")?;
            write_args(f, args)?;
            writeln!(f, ")")
        }
        Instr::Convert(dest, val) => {
            writeln!(f, "{pad}{dest} = ({}) {val}", dest.ctyp())
        }
        Instr::Assign(dest, val) => writeln!(f, "{pad}{dest} = {val}"),
        Instr::Copy(dest, val) => writeln!(f, "{pad}{dest} := {val}"),
        Instr::Clear(_, name) => writeln!(f, "{pad}clear {name}"),
        Instr::Return(val) => writeln!(f, "{pad}return {val}"),
        Instr::Comment(text) => writeln!(f, "{pad}// {text}"),
        Instr::Loop(body) => {
            writeln!(f, "{pad}loop {{")?;
            write_block(f, body, depth + 1)?;
            writeln!(f, "{pad}}}")
        }
        Instr::Break => writeln!(f, "{pad}break"),
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_instr(f, self, 0)
    }
}

impl fmt::Display for CFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn {}(", self.name)?;
        for (i, (name, ctyp)) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {ctyp}")?;
        }
        writeln!(f, ") -> {} {{", self.ret)?;
        write_block(f, &self.body, 1)?;
        writeln!(f, "}}")
    }
}
