//! Shared program registry
//!
//! Instruction memory on the decode peripheral is small and shared by
//! every unit on it. The registry loads the decode program on first use
//! and hands the same handle to every later caller.

use crate::traits::{DecodeError, DecoderBank};

/// Load-once holder for a bank's decode program
///
/// Construct one per bank before building any channel and pass it to
/// each [`Channel::new`](super::Channel::new). Taking `&mut self` makes
/// the check-and-set exclusive, so two constructions can never both
/// see the program as unloaded.
#[derive(Debug)]
pub struct ProgramRegistry<P> {
    program: Option<P>,
    load_count: u8,
}

impl<P> Default for ProgramRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> ProgramRegistry<P> {
    /// Create an empty registry
    pub const fn new() -> Self {
        Self {
            program: None,
            load_count: 0,
        }
    }

    /// Return the program handle, loading it into `bank` on first use
    ///
    /// A failed load stores nothing, so the error repeats on the next
    /// call instead of leaving a half-loaded program behind.
    pub fn ensure_loaded<B>(&mut self, bank: &mut B) -> Result<&P, DecodeError>
    where
        B: DecoderBank<Program = P>,
    {
        if self.program.is_none() {
            let program = bank.load_program()?;
            self.load_count = self.load_count.saturating_add(1);
            self.program = Some(program);
        }

        self.program.as_ref().ok_or(DecodeError::ProgramMemoryFull)
    }

    /// Check whether the program has been loaded
    pub fn is_loaded(&self) -> bool {
        self.program.is_some()
    }

    /// Handle of the loaded program, if any
    pub fn program(&self) -> Option<&P> {
        self.program.as_ref()
    }

    /// Number of loads actually performed (0 or 1)
    pub fn load_count(&self) -> u8 {
        self.load_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::mock::{MockBank, MockLine};

    #[test]
    fn test_loads_once() {
        let mut bank = MockBank::new(4);
        let mut registry = ProgramRegistry::new();

        assert!(!registry.is_loaded());

        let first = *registry.ensure_loaded(&mut bank).unwrap();
        let second = *registry.ensure_loaded(&mut bank).unwrap();

        assert_eq!(first, second);
        assert_eq!(bank.loads, 1);
        assert_eq!(registry.load_count(), 1);
        assert!(registry.is_loaded());
    }

    #[test]
    fn test_shared_across_channels() {
        let line_a = MockLine::new();
        let line_b = MockLine::new();
        let mut bank = MockBank::new(4);
        let mut registry = ProgramRegistry::new();

        let a = crate::Channel::new(&mut bank, &mut registry, 2, &line_a, 0).unwrap();
        let b = crate::Channel::new(&mut bank, &mut registry, 3, &line_b, 1).unwrap();

        assert_eq!(bank.loads, 1);
        assert_eq!(a.unit().program, b.unit().program);
        assert_eq!(Some(&a.unit().program), registry.program());
    }

    #[test]
    fn test_memory_full_is_retried() {
        let mut bank = MockBank::new(4);
        bank.memory_full = true;
        let mut registry = ProgramRegistry::new();

        assert_eq!(
            registry.ensure_loaded(&mut bank),
            Err(DecodeError::ProgramMemoryFull)
        );
        assert!(!registry.is_loaded());
        assert_eq!(registry.load_count(), 0);

        bank.memory_full = false;
        assert!(registry.ensure_loaded(&mut bank).is_ok());
        assert_eq!(bank.loads, 1);
    }
}
