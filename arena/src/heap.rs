use std::error::Error;
use std::fmt;

use log::debug;

/// Fixed-capacity byte arena. Allocation bumps a pointer past the last live
/// block; freeing slides every later block down so the live region stays
/// contiguous. Blocks are addressed by stable [`BlockId`] handles that keep
/// pointing at the right bytes across compaction.
pub struct Heap {
    bytes: Vec<u8>,
    blocks: Vec<Option<Block>>,
    bump: usize,
}

#[derive(Debug, Clone, Copy)]
struct Block {
    offset: usize,
    len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockId(usize);

impl Heap {
    pub fn new(capacity: usize) -> Self {
        Heap {
            bytes: vec![0; capacity],
            blocks: Vec::new(),
            bump: 0,
        }
    }

    pub fn alloc(&mut self, len: usize) -> Result<BlockId, HeapError> {
        if self.bump + len > self.bytes.len() {
            return Err(HeapError::Exhausted);
        }

        let id = BlockId(self.blocks.len());
        self.blocks.push(Some(Block {
            offset: self.bump,
            len,
        }));
        self.bump += len;
        debug!("alloc {} byte(s) -> {:?}", len, id);

        Ok(id)
    }

    /// Moves a block into fresh storage of `new_len` bytes, copying as much
    /// of the old contents as fits. Both copies are live during the move, so
    /// the arena must have room for old and new at once; on failure the old
    /// block is untouched and stays valid.
    pub fn realloc(&mut self, id: BlockId, new_len: usize) -> Result<BlockId, HeapError> {
        let new_id = self.alloc(new_len)?;
        let old = *self.block(id);
        let new_offset = self.block(new_id).offset;

        let copy_len = old.len.min(new_len);
        self.bytes
            .copy_within(old.offset..old.offset + copy_len, new_offset);
        self.free(id);
        debug!("realloc {:?} ({} bytes) -> {:?} ({} bytes)", id, old.len, new_id, new_len);

        Ok(new_id)
    }

    /// Releases a block, zeroes the reclaimed bytes, and compacts the arena
    /// by sliding every later block down.
    ///
    /// Panics if the block was already freed.
    pub fn free(&mut self, id: BlockId) {
        let Block { offset, len } = match self.blocks.get_mut(id.0).and_then(|slot| slot.take()) {
            Some(block) => block,
            None => panic!("{:?} is not live", id),
        };

        self.bytes.copy_within(offset + len..self.bump, offset);
        for block in self.blocks.iter_mut().flatten() {
            if block.offset > offset {
                block.offset -= len;
            }
        }
        self.bump -= len;
        self.bytes[self.bump..self.bump + len].fill(0);
        debug!("free {:?} ({} bytes)", id, len);
    }

    /// Panics if `index` is outside the block or the block was freed.
    pub fn write(&mut self, id: BlockId, index: usize, byte: u8) {
        let Block { offset, len } = *self.block(id);
        assert!(index < len, "write past the end of {:?}", id);
        self.bytes[offset + index] = byte;
    }

    pub fn bytes(&self, id: BlockId) -> &[u8] {
        let Block { offset, len } = *self.block(id);
        &self.bytes[offset..offset + len]
    }

    /// The whole backing store, dead tail included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn used(&self) -> usize {
        self.bump
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    fn block(&self, id: BlockId) -> &Block {
        match self.blocks.get(id.0).and_then(|slot| slot.as_ref()) {
            Some(block) => block,
            None => panic!("{:?} is not live", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapError {
    Exhausted,
}

impl Error for HeapError {}

impl fmt::Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            Self::Exhausted => write!(f, "out of arena memory"),
        }
    }
}
