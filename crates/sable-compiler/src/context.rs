//! CompilationContext - aggregate layouts accumulated over a compilation run.
//!
//! Definitions are processed in declaration order. Each struct, enum or union
//! definition extends the context; nothing is ever removed. The context is
//! threaded by value through the run: registering a type consumes the old
//! context and hands back the extended one.

use rustc_hash::FxHashMap;

use crate::types::CTyp;

/// Layout tables for every aggregate type declared so far.
#[derive(Debug, Clone, Default)]
pub struct CompilationContext {
    structs: FxHashMap<String, Vec<(String, CTyp)>>,
    enums: FxHashMap<String, Vec<String>>,
    variants: FxHashMap<String, Vec<(String, CTyp)>>,
    /// Constructor name to owning union.
    ctors: FxHashMap<String, String>,
    /// Declaration order of every aggregate, for emission.
    order: Vec<String>,
}

impl CompilationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extend with a struct layout.
    pub fn with_struct(mut self, name: impl Into<String>, fields: Vec<(String, CTyp)>) -> Self {
        let name = name.into();
        self.order.push(name.clone());
        self.structs.insert(name, fields);
        self
    }

    /// Extend with an enumeration.
    pub fn with_enum(mut self, name: impl Into<String>, members: Vec<String>) -> Self {
        let name = name.into();
        self.order.push(name.clone());
        self.enums.insert(name, members);
        self
    }

    /// Extend with a tagged union.
    pub fn with_variant(mut self, name: impl Into<String>, ctors: Vec<(String, CTyp)>) -> Self {
        let name = name.into();
        for (ctor, _) in &ctors {
            self.ctors.insert(ctor.clone(), name.clone());
        }
        self.order.push(name.clone());
        self.variants.insert(name, ctors);
        self
    }

    /// Representation of a previously declared aggregate.
    pub fn lookup(&self, name: &str) -> Option<CTyp> {
        if let Some(fields) = self.structs.get(name) {
            return Some(CTyp::Struct(name.to_string(), fields.clone()));
        }
        if let Some(members) = self.enums.get(name) {
            return Some(CTyp::Enum(name.to_string(), members.clone()));
        }
        self.variants
            .get(name)
            .map(|ctors| CTyp::Variant(name.to_string(), ctors.clone()))
    }

    /// The union a constructor belongs to, and the constructor's payload.
    pub fn ctor(&self, ctor: &str) -> Option<(CTyp, CTyp)> {
        let union = self.ctors.get(ctor)?;
        let ctors = self.variants.get(union)?;
        let (_, payload) = ctors.iter().find(|(c, _)| c == ctor)?;
        Some((
            CTyp::Variant(union.clone(), ctors.clone()),
            payload.clone(),
        ))
    }

    /// Every aggregate in declaration order.
    pub fn aggregates(&self) -> impl Iterator<Item = CTyp> + '_ {
        self.order.iter().filter_map(|name| self.lookup(name))
    }

    /// Whether any aggregate of this name has been declared.
    pub fn contains(&self, name: &str) -> bool {
        self.structs.contains_key(name)
            || self.enums.contains_key(name)
            || self.variants.contains_key(name)
    }
}
