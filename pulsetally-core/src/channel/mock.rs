//! Test doubles for the decoder traits

use core::cell::{Cell, RefCell};
use core::marker::PhantomData;

use heapless::Deque;

use crate::traits::{DecodeError, DecodeUnit, DecoderBank, InstanceId};

/// Simulated input line: whatever the test pushes here is what the
/// decode unit has counted
pub struct MockLine {
    pub queue: RefCell<Deque<u32, 32>>,
    /// Count the "hardware" enqueues during the first pop of a drain
    pub arrive_mid_drain: Cell<Option<u32>>,
    pub overflowed: Cell<bool>,
}

impl MockLine {
    pub fn new() -> Self {
        Self {
            queue: RefCell::new(Deque::new()),
            arrive_mid_drain: Cell::new(None),
            overflowed: Cell::new(false),
        }
    }

    pub fn with(counts: &[u32]) -> Self {
        let line = Self::new();
        line.push(counts);
        line
    }

    pub fn push(&self, counts: &[u32]) {
        let mut queue = self.queue.borrow_mut();
        for &count in counts {
            queue.push_back(count).unwrap();
        }
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }
}

pub struct MockUnit<'a> {
    pub line: &'a MockLine,
    pub instance: InstanceId,
    pub program: u8,
    pub clears: u32,
}

impl DecodeUnit for MockUnit<'_> {
    fn queue_depth(&mut self) -> u32 {
        self.line.queue.borrow().len() as u32
    }

    fn pop_raw(&mut self) -> u32 {
        let value = self.line.queue.borrow_mut().pop_front().unwrap();
        if let Some(late) = self.line.arrive_mid_drain.take() {
            self.line.push(&[late]);
        }
        value
    }

    fn clear_queue(&mut self) {
        self.clears += 1;
        self.line.queue.borrow_mut().clear();
        self.line.overflowed.set(false);
    }

    fn take_overflow(&mut self) -> bool {
        self.line.overflowed.replace(false)
    }
}

/// Bank with a configurable number of units
pub struct MockBank<'a> {
    pub loads: u32,
    pub memory_full: bool,
    taken: [bool; 8],
    units: usize,
    _lines: PhantomData<&'a MockLine>,
}

impl MockBank<'_> {
    pub fn new(units: usize) -> Self {
        Self {
            loads: 0,
            memory_full: false,
            taken: [false; 8],
            units: units.min(8),
            _lines: PhantomData,
        }
    }
}

impl<'a> DecoderBank for MockBank<'a> {
    type Program = u8;
    type Line = &'a MockLine;
    type Unit = MockUnit<'a>;

    fn load_program(&mut self) -> Result<u8, DecodeError> {
        if self.memory_full {
            return Err(DecodeError::ProgramMemoryFull);
        }
        self.loads += 1;
        Ok(7)
    }

    fn configure(
        &mut self,
        line: &'a MockLine,
        program: &u8,
        instance: InstanceId,
    ) -> Result<MockUnit<'a>, DecodeError> {
        let index = instance as usize;
        if index >= self.units {
            return Err(DecodeError::InvalidInstance(instance));
        }
        if self.taken[index] {
            return Err(DecodeError::InstanceInUse(instance));
        }
        self.taken[index] = true;

        Ok(MockUnit {
            line,
            instance,
            program: *program,
            clears: 0,
        })
    }
}
