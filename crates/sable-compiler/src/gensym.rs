//! Fresh identifier generation.

/// Produces identifiers that are unique within one compilation run.
///
/// Fresh names contain `#`, which no source identifier can, so they never
/// capture or shadow a user binding. One generator is owned by each run and
/// passed by reference to every stage that needs names; two runs never share
/// one.
#[derive(Debug, Default)]
pub struct NameGen {
    next: u64,
}

impl NameGen {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh identifier.
    pub fn fresh(&mut self) -> String {
        let name = format!("gs#{}", self.next);
        self.next += 1;
        name
    }

    /// Number of names handed out so far.
    pub fn count(&self) -> u64 {
        self.next
    }
}

/// Whether a name was produced by a [`NameGen`].
pub fn is_fresh(name: &str) -> bool {
    name.starts_with("gs#")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn names_never_repeat() {
        let mut names = NameGen::new();
        let seen: FxHashSet<String> = (0..1000).map(|_| names.fresh()).collect();
        assert_eq!(seen.len(), 1000);
        assert_eq!(names.count(), 1000);
    }

    #[test]
    fn runs_are_independent() {
        let mut a = NameGen::new();
        let mut b = NameGen::new();
        assert_eq!(a.fresh(), b.fresh());
        assert!(is_fresh(&a.fresh()));
        assert!(!is_fresh("x"));
    }
}
