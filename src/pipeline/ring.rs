//! Fixed-capacity slot ring with head/tail indices.
//!
//! `head` and `tail` are logical positions: the task admitted at position `i`
//! lives in slot `i % CAPACITY`. Both reset to 0 whenever the ring is empty
//! at admission time, so in a pipeline that regularly drains they stay within
//! `0..=CAPACITY`.

/// Maximum number of outstanding tasks per pipeline.
pub const CAPACITY: usize = 10;

/// Outstanding tasks occupy positions `head..tail`; every other slot is `None`.
pub(crate) struct Ring<T> {
    slots: [Option<T>; CAPACITY],
    head: usize,
    tail: usize,
}

impl<T> Ring<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            head: 0,
            tail: 0,
        }
    }

    pub(crate) fn head(&self) -> usize {
        self.head
    }

    pub(crate) fn tail(&self) -> usize {
        self.tail
    }

    pub(crate) fn len(&self) -> usize {
        self.tail - self.head
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    pub(crate) fn is_full(&self) -> bool {
        self.len() == CAPACITY
    }

    /// Append at `tail`, returning the position the task was stored at.
    ///
    /// Hands the task back when every slot is outstanding.
    pub(crate) fn push(&mut self, task: T) -> Result<usize, T> {
        if self.is_empty() {
            self.head = 0;
            self.tail = 0;
        }
        if self.is_full() {
            return Err(task);
        }

        let position = self.tail;
        self.slots[position % CAPACITY] = Some(task);
        self.tail += 1;
        Ok(position)
    }

    /// Undo the most recent `push`.
    pub(crate) fn pop_back(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        self.tail -= 1;
        self.slots[self.tail % CAPACITY].take()
    }

    pub(crate) fn peek_head(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        self.slots[self.head % CAPACITY].as_ref()
    }

    /// Release the head task and advance past it.
    pub(crate) fn pop_head(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let task = self.slots[self.head % CAPACITY].take();
        self.head += 1;
        task
    }
}
