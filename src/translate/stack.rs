//! Simulated evaluation stack.

/// Stack of producer token ids.
///
/// Holds ids, never values: `dup` pushes the same id twice and both slots alias one producer.
#[derive(Debug, Default, Clone)]
pub struct OperandStack {
    slots: Vec<u32>,
}

impl OperandStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a producer id.
    pub fn push(&mut self, id: u32) {
        self.slots.push(id);
    }

    /// Pops the top producer id.
    pub fn pop(&mut self) -> Option<u32> {
        self.slots.pop()
    }

    /// Pops `count` ids and returns them in push order (deepest first).
    ///
    /// Returns `None` and leaves the stack untouched if fewer than `count` ids are present.
    pub fn pop_many(&mut self, count: usize) -> Option<Vec<u32>> {
        let split = self.slots.len().checked_sub(count)?;
        Some(self.slots.split_off(split))
    }

    /// Drops every pending value.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Number of pending values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// `true` if no value is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
