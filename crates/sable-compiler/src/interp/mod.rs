//! Reference interpreter for lowered modules.
//!
//! Executes [`CompiledModule`] functions directly over the instruction form,
//! with dynamic tracking of every heap allocation: storage brought to life
//! by `Alloc` or `Init` must be released exactly once by `Clear` before the
//! function returns, and is unusable afterwards. Calls to names the module
//! does not define go to a small primitive library (see [`primitives`]).
//!
//! The interpreter is the executable meaning of the instruction form. The
//! test suites compare it against expected values to check that lowering
//! and specialization preserve behaviour.
//!
//! # Example
//!
//! ```ignore
//! let mut interp = Interpreter::new(&module);
//! interp.set_register("R", Value::bits(0, 32))?;
//! let result = interp.call("read_low", vec![])?;
//! ```

pub mod primitives;
mod value;

use num_bigint::{BigInt, BigUint};
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::fragment::{BinOp, Fragment, UnOp};
use crate::ir::{CFunction, CLExp, CVal, CompiledModule, Instr, RETURN_PARAM};
use crate::types::CTyp;
use value::{conform, default_of, parse_literal, truncate};

pub use value::Value;

/// Instructions executed before a call gives up.
const DEFAULT_FUEL: u64 = 1_000_000;

/// Errors raised while executing a module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("'{name}' takes {expected} arguments, got {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("'{0}' is allocated while still live")]
    DoubleAlloc(String),

    #[error("'{0}' is released but was never allocated")]
    Unallocated(String),

    #[error("'{0}' is released twice")]
    DoubleRelease(String),

    #[error("'{0}' is used after release")]
    UseAfterRelease(String),

    #[error("'{name}' is still allocated when '{function}' returns")]
    Leak { function: String, name: String },

    #[error("'{0}' finished without returning")]
    NoReturn(String),

    #[error("assertion failed: {0}")]
    AssertionFailed(String),

    #[error("exception thrown: {0}")]
    Thrown(String),

    #[error("exit called")]
    Exited,

    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: String,
        found: &'static str,
    },

    #[error("{value} does not fit the representation")]
    Overflow { value: String },

    #[error("range {hi}..{lo} is out of bounds for a {width}-bit vector")]
    OutOfBounds { hi: u32, lo: u32, width: u32 },

    #[error("invalid literal '{0}'")]
    InvalidLiteral(String),

    #[error("field '{0}' does not exist")]
    UnknownField(String),

    #[error("execution ran out of fuel")]
    OutOfFuel,
}

type Result<T> = std::result::Result<T, EvalError>;

/// One named piece of storage in a frame.
#[derive(Debug)]
struct Slot {
    value: Value,
    ctyp: CTyp,
    /// Allocated by this frame and due for release.
    owned: bool,
    released: bool,
}

#[derive(Debug, Default)]
struct Frame {
    slots: FxHashMap<String, Slot>,
}

/// How a block finished.
enum Flow {
    Next,
    Break,
    Return(Value),
}

/// Executes the functions of one module.
pub struct Interpreter<'m> {
    module: &'m CompiledModule,
    registers: FxHashMap<String, (Value, CTyp)>,
    /// Constructor name to union representation.
    ctors: FxHashMap<String, CTyp>,
    members: FxHashSet<String>,
    fuel: u64,
}

impl<'m> Interpreter<'m> {
    /// Registers start out with the value of fresh storage.
    pub fn new(module: &'m CompiledModule) -> Self {
        let registers = module
            .registers()
            .map(|(name, ctyp)| (name.to_string(), (default_of(ctyp), ctyp.clone())))
            .collect();

        let mut ctors = FxHashMap::default();
        let mut members = FxHashSet::default();
        for ctyp in module.types() {
            match ctyp {
                CTyp::Variant(_, cs) => {
                    for (ctor, _) in cs {
                        ctors.insert(ctor.clone(), ctyp.clone());
                    }
                }
                CTyp::Enum(_, ms) => members.extend(ms.iter().cloned()),
                _ => {}
            }
        }

        Self {
            module,
            registers,
            ctors,
            members,
            fuel: DEFAULT_FUEL,
        }
    }

    /// Limit the number of instructions a single call may execute.
    pub fn with_fuel(mut self, fuel: u64) -> Self {
        self.fuel = fuel;
        self
    }

    pub fn register(&self, name: &str) -> Option<&Value> {
        self.registers.get(name).map(|(value, _)| value)
    }

    pub fn set_register(&mut self, name: &str, value: Value) -> Result<()> {
        let (slot, ctyp) = self
            .registers
            .get_mut(name)
            .ok_or_else(|| EvalError::UnknownVariable(name.to_string()))?;
        *slot = conform(value, ctyp)?;
        Ok(())
    }

    /// Call a module function or primitive.
    pub fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Value> {
        let mut fuel = self.fuel;
        self.invoke(name, args, &mut fuel)
    }

    fn invoke(&mut self, name: &str, args: Vec<Value>, fuel: &mut u64) -> Result<Value> {
        let module = self.module;
        if let Some(function) = module.function(name) {
            return self.run(function, args, fuel);
        }
        if let Some(union) = self.ctors.get(name) {
            let [payload] = <[Value; 1]>::try_from(args).map_err(|args| EvalError::Arity {
                name: name.to_string(),
                expected: 1,
                found: args.len(),
            })?;
            let payload_ctyp = match union {
                CTyp::Variant(_, cs) => cs.iter().find(|(c, _)| c == name).map(|(_, p)| p),
                _ => None,
            };
            let payload = match payload_ctyp {
                Some(ctyp) => conform(payload, ctyp)?,
                None => payload,
            };
            return Ok(Value::Variant(name.to_string(), Box::new(payload)));
        }
        primitives::call(name, &args)
            .unwrap_or_else(|| Err(EvalError::UnknownFunction(name.to_string())))
    }

    fn run(&mut self, function: &CFunction, args: Vec<Value>, fuel: &mut u64) -> Result<Value> {
        if args.len() != function.params.len() {
            return Err(EvalError::Arity {
                name: function.name.clone(),
                expected: function.params.len(),
                found: args.len(),
            });
        }

        let mut frame = Frame::default();
        for ((name, ctyp), arg) in function.params.iter().zip(args) {
            frame.bind(name, ctyp, conform(arg, ctyp)?, false);
        }
        if function.returns_by_reference() {
            frame.bind(RETURN_PARAM, &function.ret, default_of(&function.ret), false);
        }

        let result = match self.block(&function.body, &mut frame, fuel)? {
            Flow::Return(value) => value,
            Flow::Next | Flow::Break => return Err(EvalError::NoReturn(function.name.clone())),
        };

        let mut leaked: Vec<&String> = frame
            .slots
            .iter()
            .filter(|(_, slot)| slot.owned && !slot.released)
            .map(|(name, _)| name)
            .collect();
        leaked.sort();
        if let Some(name) = leaked.first() {
            return Err(EvalError::Leak {
                function: function.name.clone(),
                name: name.to_string(),
            });
        }

        if function.returns_by_reference() {
            frame.read(RETURN_PARAM)
        } else {
            conform(result, &function.ret)
        }
    }

    fn block(&mut self, instrs: &[Instr], frame: &mut Frame, fuel: &mut u64) -> Result<Flow> {
        for instr in instrs {
            match self.instr(instr, frame, fuel)? {
                Flow::Next => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Next)
    }

    fn instr(&mut self, instr: &Instr, frame: &mut Frame, fuel: &mut u64) -> Result<Flow> {
        *fuel = fuel.checked_sub(1).ok_or(EvalError::OutOfFuel)?;

        match instr {
            Instr::Decl(ctyp, name) => frame.bind(name, ctyp, default_of(ctyp), false),
            Instr::Alloc(ctyp, name) => {
                frame.allocate(name)?;
                frame.bind(name, ctyp, default_of(ctyp), true);
            }
            Instr::Init(ctyp, name, val) => {
                let value = match self.eval(val, frame)? {
                    Value::Str(text) if *ctyp != CTyp::String => parse_literal(&text)?,
                    value => value,
                };
                let value = conform(value, ctyp)?;
                frame.allocate(name)?;
                frame.bind(name, ctyp, value, true);
            }
            Instr::If(cond, then, els, _) => {
                let arm = match self.eval(cond, frame)? {
                    Value::Bool(true) => then,
                    Value::Bool(false) => els,
                    other => {
                        return Err(EvalError::TypeMismatch {
                            expected: "bool".to_string(),
                            found: other.kind(),
                        });
                    }
                };
                return self.block(arm, frame, fuel);
            }
            Instr::Funcall(dest, name, args) => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, frame))
                    .collect::<Result<Vec<_>>>()?;
                let result = self.invoke(name, args, fuel)?;
                self.store(dest, result, frame)?;
            }
            Instr::Convert(dest, val) | Instr::Assign(dest, val) | Instr::Copy(dest, val) => {
                let value = self.eval(val, frame)?;
                self.store(dest, value, frame)?;
            }
            Instr::Clear(_, name) => frame.release(name)?,
            Instr::Return(val) => return Ok(Flow::Return(self.eval(val, frame)?)),
            Instr::Comment(_) => {}
            Instr::Loop(body) => loop {
                match self.block(body, frame, fuel)? {
                    Flow::Next => {}
                    Flow::Break => break,
                    flow @ Flow::Return(_) => return Ok(flow),
                }
            },
            Instr::Break => return Ok(Flow::Break),
        }
        Ok(Flow::Next)
    }

    // ==========================================================================
    // Storage
    // ==========================================================================

    fn load(&self, loc: &CLExp, frame: &Frame) -> Result<Value> {
        match loc {
            CLExp::Id(name, _) | CLExp::Deref(name, _) => self.read(name, frame),
            CLExp::Field(base, field, _) => {
                let record = self.load(base, frame)?;
                record
                    .field(field)
                    .cloned()
                    .ok_or_else(|| EvalError::UnknownField(field.clone()))
            }
        }
    }

    fn store(&mut self, loc: &CLExp, value: Value, frame: &mut Frame) -> Result<()> {
        let value = conform(value, loc.ctyp())?;
        match loc {
            CLExp::Id(name, _) | CLExp::Deref(name, _) => {
                if frame.slots.contains_key(name.as_str()) {
                    *frame.slot_mut(name)? = value;
                    return Ok(());
                }
                let (slot, _) = self
                    .registers
                    .get_mut(name)
                    .ok_or_else(|| EvalError::UnknownVariable(name.clone()))?;
                *slot = value;
                Ok(())
            }
            CLExp::Field(base, field, _) => {
                let mut record = self.load(base, frame)?;
                let slot = record
                    .field_mut(field)
                    .ok_or_else(|| EvalError::UnknownField(field.clone()))?;
                *slot = value;
                self.store(base, record, frame)
            }
        }
    }

    fn read(&self, name: &str, frame: &Frame) -> Result<Value> {
        if frame.slots.contains_key(name) {
            return frame.read(name);
        }
        if let Some((value, _)) = self.registers.get(name) {
            return Ok(value.clone());
        }
        if self.members.contains(name) {
            return Ok(Value::Enum(name.to_string()));
        }
        Err(EvalError::UnknownVariable(name.to_string()))
    }

    // ==========================================================================
    // Values
    // ==========================================================================

    fn eval(&self, val: &CVal, frame: &Frame) -> Result<Value> {
        match val {
            CVal::Id(name, _) => self.read(name, frame),
            CVal::Frag(frag, _) => self.fragment(frag, frame),
        }
    }

    fn fragment(&self, frag: &Fragment, frame: &Frame) -> Result<Value> {
        match frag {
            Fragment::Id(name) => self.read(name, frame),
            Fragment::Unit => Ok(Value::Unit),
            Fragment::Bool(b) => Ok(Value::Bool(*b)),
            Fragment::Int(n) => Ok(Value::Int(n.clone())),
            Fragment::Bits(v, width) => Ok(Value::Bits(v.clone(), *width)),
            Fragment::Str(s) => Ok(Value::Str(s.clone())),
            Fragment::Field(base, field) => self
                .fragment(base, frame)?
                .field(field)
                .cloned()
                .ok_or_else(|| EvalError::UnknownField(field.clone())),
            Fragment::Binary(op, lhs, rhs) => {
                binary(*op, self.fragment(lhs, frame)?, self.fragment(rhs, frame)?)
            }
            Fragment::Unary(UnOp::Not, operand) => match self.fragment(operand, frame)? {
                Value::Bool(b) => Ok(Value::Bool(!b)),
                other => Err(EvalError::TypeMismatch {
                    expected: "bool".to_string(),
                    found: other.kind(),
                }),
            },
            Fragment::AddrOf(name) if self.registers.contains_key(name) => {
                Ok(Value::Ref(name.clone()))
            }
            Fragment::AddrOf(name) => Err(EvalError::UnknownVariable(name.clone())),
        }
    }
}

/// Fragment operators over machine words.
///
/// Bit-vector arithmetic wraps at 64 bits; the result is as wide as the
/// wider operand.
fn binary(op: BinOp, lhs: Value, rhs: Value) -> Result<Value> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => match op {
            BinOp::Add => Ok(Value::Int(a + b)),
            BinOp::Sub => Ok(Value::Int(a - b)),
            BinOp::Eq => Ok(Value::Bool(a == b)),
            BinOp::Lt => Ok(Value::Bool(a < b)),
            BinOp::Gt => Ok(Value::Bool(a > b)),
            BinOp::And | BinOp::Or | BinOp::Xor => Err(EvalError::TypeMismatch {
                expected: "bit-vector".to_string(),
                found: "integer",
            }),
        },
        (Value::Bits(a, wa), Value::Bits(b, wb)) => {
            let width = wa.max(wb);
            let word = |v: BigUint| Value::Bits(truncate(v, 64), width);
            match op {
                BinOp::Add => Ok(word(a + b)),
                BinOp::Sub => Ok(word(a + (BigUint::from(1u8) << 64u32) - b)),
                BinOp::And => Ok(word(a & b)),
                BinOp::Or => Ok(word(a | b)),
                BinOp::Xor => Ok(word(a ^ b)),
                BinOp::Eq => Ok(Value::Bool(a == b)),
                BinOp::Lt => Ok(Value::Bool(a < b)),
                BinOp::Gt => Ok(Value::Bool(a > b)),
            }
        }
        (Value::Bool(a), Value::Bool(b)) => match op {
            BinOp::And => Ok(Value::Bool(a && b)),
            BinOp::Or => Ok(Value::Bool(a || b)),
            BinOp::Xor => Ok(Value::Bool(a ^ b)),
            BinOp::Eq => Ok(Value::Bool(a == b)),
            _ => Err(EvalError::TypeMismatch {
                expected: "integer".to_string(),
                found: "bool",
            }),
        },
        (Value::Enum(a), Value::Enum(b)) if op == BinOp::Eq => Ok(Value::Bool(a == b)),
        (lhs, _) => Err(EvalError::TypeMismatch {
            expected: format!("operand of '{}'", op.symbol()),
            found: lhs.kind(),
        }),
    }
}

impl Frame {
    fn bind(&mut self, name: &str, ctyp: &CTyp, value: Value, owned: bool) {
        self.slots.insert(
            name.to_string(),
            Slot {
                value,
                ctyp: ctyp.clone(),
                owned,
                released: false,
            },
        );
    }

    /// Check that a name may be allocated: it is not live already.
    fn allocate(&self, name: &str) -> Result<()> {
        match self.slots.get(name) {
            Some(slot) if slot.owned && !slot.released => {
                Err(EvalError::DoubleAlloc(name.to_string()))
            }
            _ => Ok(()),
        }
    }

    fn release(&mut self, name: &str) -> Result<()> {
        let slot = self
            .slots
            .get_mut(name)
            .filter(|slot| slot.owned)
            .ok_or_else(|| EvalError::Unallocated(name.to_string()))?;
        if slot.released {
            return Err(EvalError::DoubleRelease(name.to_string()));
        }
        slot.released = true;
        slot.value = default_of(&slot.ctyp);
        Ok(())
    }

    fn read(&self, name: &str) -> Result<Value> {
        match self.slots.get(name) {
            Some(slot) if slot.released => Err(EvalError::UseAfterRelease(name.to_string())),
            Some(slot) => Ok(slot.value.clone()),
            None => Err(EvalError::UnknownVariable(name.to_string())),
        }
    }

    fn slot_mut(&mut self, name: &str) -> Result<&mut Value> {
        match self.slots.get_mut(name) {
            Some(slot) if slot.released => Err(EvalError::UseAfterRelease(name.to_string())),
            Some(slot) => Ok(&mut slot.value),
            None => Err(EvalError::UnknownVariable(name.to_string())),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(BigInt::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
