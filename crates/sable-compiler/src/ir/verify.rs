//! Resource-pairing verification.
//!
//! Explores every control path through a function body symbolically. Each
//! path carries the stack of heap allocations that are live on it. An
//! allocation pushes, a release must pop the top of the stack. A path that
//! returns, falls off the end or breaks out of a loop must have nothing
//! outstanding that it allocated. Branch arms are explored separately and
//! identical path states are merged afterwards, so the exploration stays
//! linear in the size of the body for well-formed code.
//!
//! Inline constants are checked on the way: an integer fragment must fit a
//! machine word to be rendered.

use rustc_hash::FxHashSet;
use thiserror::Error;

use super::{CFunction, CLExp, CVal, Instr};

/// A pairing violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("'{0}' is allocated while already live")]
    DoubleAlloc(String),

    #[error("'{0}' is released without being allocated")]
    ReleaseUnallocated(String),

    #[error("'{0}' is released twice")]
    DoubleRelease(String),

    #[error("'{found}' is released while '{expected}' is still live")]
    OutOfOrder { expected: String, found: String },

    #[error("'{0}' is used after its release")]
    UseAfterRelease(String),

    #[error("'{name}' is still live at {at}")]
    Leak { name: String, at: &'static str },

    #[error("loop body does not release what it allocates")]
    UnbalancedLoop,

    #[error("break outside of a loop")]
    BreakOutsideLoop,

    #[error("constant in '{0}' does not fit a machine word")]
    WideConstant(String),
}

type Result<T> = std::result::Result<T, VerifyError>;

#[derive(Debug, Clone, Default, PartialEq)]
struct PathState {
    live: Vec<String>,
    released: FxHashSet<String>,
}

impl PathState {
    fn read(&self, name: &str) -> Result<()> {
        if self.released.contains(name) {
            return Err(VerifyError::UseAfterRelease(name.to_string()));
        }
        Ok(())
    }

    fn read_val(&self, val: &CVal) -> Result<()> {
        if let CVal::Frag(frag, _) = val
            && !frag.fits_machine_word()
        {
            return Err(VerifyError::WideConstant(frag.to_string()));
        }
        match val.name() {
            Some(name) => self.read(name),
            None => Ok(()),
        }
    }

    fn write(&self, dest: &CLExp) -> Result<()> {
        self.read(dest.root())
    }

    fn settled(&self, at: &'static str) -> Result<()> {
        match self.live.last() {
            Some(name) => Err(VerifyError::Leak {
                name: name.clone(),
                at,
            }),
            None => Ok(()),
        }
    }
}

/// Check that every allocation in the function is released exactly once,
/// innermost first, on every path.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn verify(function: &CFunction) -> Result<()> {
    let ends = walk(&function.body, vec![PathState::default()], None)?;
    for state in ends {
        state.settled("end of function")?;
    }
    Ok(())
}

/// Run every path state through the instructions, returning the states that
/// fall through.
fn walk(
    instrs: &[Instr],
    mut states: Vec<PathState>,
    loop_entry: Option<&PathState>,
) -> Result<Vec<PathState>> {
    for instr in instrs {
        if states.is_empty() {
            break;
        }
        let mut next = Vec::with_capacity(states.len());
        for state in states {
            step(instr, state, loop_entry, &mut next)?;
        }
        states = merge(next);
    }
    Ok(states)
}

fn step(
    instr: &Instr,
    mut state: PathState,
    loop_entry: Option<&PathState>,
    out: &mut Vec<PathState>,
) -> Result<()> {
    match instr {
        Instr::Alloc(_, name) | Instr::Init(_, name, _) => {
            if let Instr::Init(_, _, val) = instr {
                state.read_val(val)?;
            }
            if state.live.contains(name) {
                return Err(VerifyError::DoubleAlloc(name.clone()));
            }
            state.released.remove(name);
            state.live.push(name.clone());
        }
        Instr::Clear(_, name) => {
            match state.live.last() {
                Some(top) if top == name => {}
                Some(top) if state.live.contains(name) => {
                    return Err(VerifyError::OutOfOrder {
                        expected: top.clone(),
                        found: name.clone(),
                    });
                }
                _ if state.released.contains(name) => {
                    return Err(VerifyError::DoubleRelease(name.clone()));
                }
                _ => return Err(VerifyError::ReleaseUnallocated(name.clone())),
            }
            state.live.pop();
            state.released.insert(name.clone());
        }
        Instr::If(cond, then, els, _) => {
            state.read_val(cond)?;
            out.extend(walk(then, vec![state.clone()], loop_entry)?);
            out.extend(walk(els, vec![state], loop_entry)?);
            return Ok(());
        }
        Instr::Loop(body) => {
            for end in walk(body, vec![state.clone()], Some(&state))? {
                if end.live != state.live {
                    return Err(VerifyError::UnbalancedLoop);
                }
            }
        }
        Instr::Break => {
            let entry = loop_entry.ok_or(VerifyError::BreakOutsideLoop)?;
            if state.live != entry.live {
                return Err(VerifyError::UnbalancedLoop);
            }
            return Ok(());
        }
        Instr::Return(val) => {
            state.read_val(val)?;
            state.settled("return")?;
            return Ok(());
        }
        Instr::Funcall(dest, _, args) => {
            for arg in args {
                state.read_val(arg)?;
            }
            state.write(dest)?;
        }
        Instr::Convert(dest, val) | Instr::Assign(dest, val) | Instr::Copy(dest, val) => {
            state.read_val(val)?;
            state.write(dest)?;
        }
        Instr::Decl(..) | Instr::Comment(_) => {}
    }
    out.push(state);
    Ok(())
}

fn merge(states: Vec<PathState>) -> Vec<PathState> {
    let mut merged: Vec<PathState> = Vec::with_capacity(states.len());
    for state in states {
        if !merged.contains(&state) {
            merged.push(state);
        }
    }
    merged
}
