//! Arena-backed FIFO queue with stable handles and O(1) removal.
//!
//! Price levels and trigger levels need strict arrival ordering, plus the
//! ability to remove an arbitrary resident in O(1) through a handle that was
//! recorded when the resident was inserted. This is the role the doubly
//! linked list plays in pointer-based books; here the nodes live in a slot
//! arena and handles carry a generation counter, so a stale handle (one
//! whose slot has been freed or reused) is detected instead of reaching an
//! unrelated element.

/// Stable reference to an element inside a [`FifoQueue`].
///
/// Handles stay valid across unrelated insertions and removals. A handle
/// is invalidated when its element is removed; reusing it afterwards fails
/// the generation check and is reported as "not found".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueHandle {
    slot: u32,
    generation: u32,
}

#[derive(Debug)]
struct Slot<T> {
    value: Option<T>,
    generation: u32,
    prev: Option<u32>,
    next: Option<u32>,
}

/// FIFO queue over an arena of slots.
///
/// `push_back` returns a [`QueueHandle`]; `remove` unlinks in O(1). Freed
/// slots are recycled through a free list, so a queue that churns stays at
/// its high-water-mark footprint.
#[derive(Debug)]
pub struct FifoQueue<T> {
    slots: Vec<Slot<T>>,
    head: Option<u32>,
    tail: Option<u32>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Default for FifoQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FifoQueue<T> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            head: None,
            tail: None,
            free: Vec::new(),
            len: 0,
        }
    }

    /// Number of elements currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when no elements are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends `value` at the tail and returns its handle.
    pub fn push_back(&mut self, value: T) -> QueueHandle {
        let slot = match self.free.pop() {
            Some(index) => {
                let entry = &mut self.slots[index as usize];
                entry.value = Some(value);
                entry.prev = self.tail;
                entry.next = None;
                index
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    value: Some(value),
                    generation: 0,
                    prev: self.tail,
                    next: None,
                });
                index
            }
        };

        match self.tail {
            Some(tail) => self.slots[tail as usize].next = Some(slot),
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
        self.len += 1;

        QueueHandle {
            slot,
            generation: self.slots[slot as usize].generation,
        }
    }

    fn is_live(&self, handle: QueueHandle) -> bool {
        self.slots
            .get(handle.slot as usize)
            .is_some_and(|slot| slot.generation == handle.generation && slot.value.is_some())
    }

    /// Returns a reference to the element behind `handle`, if it is still queued.
    #[must_use]
    pub fn get(&self, handle: QueueHandle) -> Option<&T> {
        if !self.is_live(handle) {
            return None;
        }
        self.slots[handle.slot as usize].value.as_ref()
    }

    /// Handle of the element at the head of the queue.
    #[must_use]
    pub fn front_handle(&self) -> Option<QueueHandle> {
        self.head.map(|slot| QueueHandle {
            slot,
            generation: self.slots[slot as usize].generation,
        })
    }

    /// Handle of the element following `handle` in FIFO order.
    #[must_use]
    pub fn next_handle(&self, handle: QueueHandle) -> Option<QueueHandle> {
        if !self.is_live(handle) {
            return None;
        }
        self.slots[handle.slot as usize].next.map(|slot| QueueHandle {
            slot,
            generation: self.slots[slot as usize].generation,
        })
    }

    /// Removes the element behind `handle` in O(1).
    ///
    /// Returns the removed element, or `None` if the handle is stale.
    pub fn remove(&mut self, handle: QueueHandle) -> Option<T> {
        if !self.is_live(handle) {
            return None;
        }
        let index = handle.slot;
        let (prev, next) = {
            let slot = &self.slots[index as usize];
            (slot.prev, slot.next)
        };

        match prev {
            Some(prev) => self.slots[prev as usize].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.slots[next as usize].prev = prev,
            None => self.tail = prev,
        }

        let slot = &mut self.slots[index as usize];
        let value = slot.value.take();
        slot.generation = slot.generation.wrapping_add(1);
        slot.prev = None;
        slot.next = None;
        self.free.push(index);
        self.len -= 1;
        value
    }

    /// Removes and returns the head element.
    pub fn pop_front(&mut self) -> Option<T> {
        let handle = self.front_handle()?;
        self.remove(handle)
    }

    /// Iterates the queued elements in FIFO order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            queue: self,
            cursor: self.head,
        }
    }
}

/// FIFO-order iterator over a [`FifoQueue`].
pub struct Iter<'a, T> {
    queue: &'a FifoQueue<T>,
    cursor: Option<u32>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.cursor?;
        let entry = &self.queue.slots[slot as usize];
        self.cursor = entry.next;
        entry.value.as_ref()
    }
}
