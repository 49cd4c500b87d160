//! Compilation options.

use bitflags::bitflags;

bitflags! {
    /// What the code generator emits beyond the definitions themselves.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EmitFlags: u8 {
        /// Emit IR comments as C comments.
        const COMMENTS = 1 << 0;
        /// Emit `model_init`/`model_fini` for heap-represented registers.
        const LIFECYCLE = 1 << 1;
        /// Give generated functions internal linkage.
        const STATIC_FUNCTIONS = 1 << 2;
    }
}

impl Default for EmitFlags {
    fn default() -> Self {
        EmitFlags::COMMENTS | EmitFlags::LIFECYCLE
    }
}

/// Options for one compilation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Run the primitive specializer.
    pub specialize: bool,
    /// Check resource pairing of every lowered function.
    pub verify: bool,
    pub emit: EmitFlags,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            specialize: true,
            verify: true,
            emit: EmitFlags::default(),
        }
    }
}

impl CompileOptions {
    pub fn with_specialize(mut self, specialize: bool) -> Self {
        self.specialize = specialize;
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn with_emit(mut self, emit: EmitFlags) -> Self {
        self.emit = emit;
        self
    }
}
