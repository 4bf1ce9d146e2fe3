use crate::heap::{BlockId, Heap, HeapError};

/// Growable byte array backed by a [`Heap`] block. Storage starts at eight
/// bytes and doubles whenever a push runs out of room.
#[derive(Debug, Default)]
pub struct DynArray {
    count: usize,
    capacity: usize,
    block: Option<BlockId>,
}

impl DynArray {
    pub fn push(&mut self, heap: &mut Heap, byte: u8) -> Result<(), HeapError> {
        let block = match self.block {
            Some(block) if self.capacity >= self.count + 1 => block,
            _ => {
                let capacity = grow_capacity(self.capacity);
                let block = match self.block {
                    Some(block) => heap.realloc(block, capacity)?,
                    None => heap.alloc(capacity)?,
                };
                self.block = Some(block);
                self.capacity = capacity;
                block
            }
        };

        heap.write(block, self.count, byte);
        self.count += 1;

        Ok(())
    }

    /// Returns the block to the heap and resets the array to its initial
    /// empty state.
    pub fn free(&mut self, heap: &mut Heap) {
        if let Some(block) = self.block.take() {
            heap.free(block);
        }
        self.count = 0;
        self.capacity = 0;
    }

    pub fn as_slice<'a>(&self, heap: &'a Heap) -> &'a [u8] {
        match self.block {
            Some(block) => &heap.bytes(block)[..self.count],
            None => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

fn grow_capacity(capacity: usize) -> usize {
    if capacity < 8 {
        8
    } else {
        capacity * 2
    }
}
