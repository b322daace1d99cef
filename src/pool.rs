use std::fmt;

use log::{debug, error, trace, warn};

use crate::{
  align::{checked_align_up, is_aligned},
  block::{Block, HEADER_SIZE, MIN_BLOCK_SIZE},
  config::PoolConfig,
  error::PoolError,
};

/// Smallest arena that still fits HEAD, TAIL and one usable free block.
pub const MIN_POOL_SIZE: usize = 2 * HEADER_SIZE + MIN_BLOCK_SIZE;

/// A first-fit allocator carving blocks out of a borrowed byte buffer.
///
/// Free blocks form a singly linked list sorted by address, bounded by two
/// header-only sentinels:
///
/// ```text
///   HEAD ──► [hdr|free] ──► [hdr|free] ──► ... ──► TAIL
/// ```
///
/// Allocated blocks are simply absent from the list. Every link is an offset
/// into the arena, so the pool never holds a raw pointer.
pub struct MemPool<'a> {
  pub(crate) arena: &'a mut [u8],
  pub(crate) base: usize,
  pub(crate) head: usize,
  pub(crate) tail: usize,
  config: PoolConfig,
}

impl fmt::Debug for MemPool<'_> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("MemPool")
      .field("base", &format_args!("{:#x}", self.base))
      .field("head", &self.head)
      .field("tail", &self.tail)
      .field("config", &self.config)
      .finish_non_exhaustive()
  }
}

impl<'a> MemPool<'a> {
  /// Builds a pool over `storage` with the default [`PoolConfig`].
  pub fn init(storage: &'a mut [u8]) -> Result<Self, PoolError> {
    Self::with_config(storage, PoolConfig::default())
  }

  pub fn with_config(
    storage: &'a mut [u8],
    config: PoolConfig,
  ) -> Result<Self, PoolError> {
    let size = storage.len();
    let too_small = PoolError::ArenaTooSmall {
      size,
      min: MIN_POOL_SIZE,
    };

    if size < MIN_POOL_SIZE {
      return Err(too_small);
    }

    // NIL is u32::MAX, so every offset has to stay below it.
    let max = u32::MAX as usize;
    if size > max {
      return Err(PoolError::ArenaTooLarge { size, max });
    }

    let base = storage.as_ptr() as usize;
    let head = checked_align_up(base).ok_or(too_small)? - base;
    let first = head + HEADER_SIZE;
    let tail_addr = crate::align_down!(base + size - HEADER_SIZE);
    let tail = tail_addr
      .checked_sub(base)
      .filter(|tail| *tail >= first + MIN_BLOCK_SIZE)
      .ok_or(too_small)?;

    Block::new(HEADER_SIZE, Some(first)).write(storage, head)?;
    Block::new(tail - first, Some(tail)).write(storage, first)?;
    Block::new(HEADER_SIZE, None).write(storage, tail)?;

    debug!(
      "[mempool] init: {} bytes at {:#x}, head={:#x} tail={:#x} capacity={}",
      size,
      base,
      head,
      tail,
      tail - first
    );

    Ok(Self {
      arena: storage,
      base,
      head,
      tail,
      config,
    })
  }

  /// Allocates `size` bytes and returns the payload offset into the arena.
  ///
  /// Returns `None` for zero-sized requests and when no free block is large
  /// enough. The payload starts on a [`MAX_ALIGN`](crate::MAX_ALIGN) boundary.
  pub fn alloc(
    &mut self,
    size: usize,
  ) -> Option<usize> {
    if size == 0 {
      return None;
    }

    if let Err(err) = self.strict_check() {
      error!("[mempool] alloc({}) refused: {}", size, err);
      return None;
    }

    match self.take_first_fit(size) {
      Ok(Some(block)) => {
        let payload = block + HEADER_SIZE;
        trace!("[mempool] alloc({}) -> {:#x}", size, payload);
        Some(payload)
      }
      Ok(None) => {
        warn!("[mempool] alloc({}) -> out of memory", size);
        None
      }
      Err(err) => {
        error!("[mempool] alloc({}) failed: {}", size, err);
        None
      }
    }
  }

  /// Returns the block owning `payload` to the free list.
  ///
  /// Only alignment and range are validated up front. A pointer that passes
  /// those checks but was never handed out by [`alloc`](Self::alloc) is
  /// rejected only if its recovered block collides with a free block.
  pub fn free(
    &mut self,
    payload: usize,
  ) -> Result<(), PoolError> {
    let result = self
      .strict_check()
      .and_then(|()| self.locate(payload))
      .and_then(|(block, size)| self.insert(block, size));

    match &result {
      Ok(()) => trace!("[mempool] free({:#x})", payload),
      Err(err) if err.is_invalid_param() => {
        warn!("[mempool] free({:#x}) rejected: {}", payload, err)
      }
      Err(err) => error!("[mempool] free({:#x}) failed: {}", payload, err),
    }

    result
  }

  /// [`free`](Self::free) for callers holding a pointer into the arena.
  pub fn free_ptr(
    &mut self,
    ptr: *const u8,
  ) -> Result<(), PoolError> {
    if ptr.is_null() {
      warn!("[mempool] free(null) rejected");
      return Err(PoolError::NullPointer);
    }

    let addr = ptr as usize;
    if !is_aligned(addr) {
      warn!("[mempool] free({:#x}) rejected: misaligned", addr);
      return Err(PoolError::Misaligned { addr });
    }

    match addr.checked_sub(self.base) {
      Some(offset) => self.free(offset),
      None => {
        warn!("[mempool] free({:#x}) rejected: below arena", addr);
        Err(PoolError::OutOfRange {
          offset: addr.wrapping_sub(self.base),
        })
      }
    }
  }

  /// Absolute address of an arena offset.
  pub fn address_of(
    &self,
    offset: usize,
  ) -> usize {
    self.base.wrapping_add(offset)
  }

  /// Usable bytes of the allocated block at `payload`, slack included.
  ///
  /// Offsets that [`free`](Self::free) would reject are rejected here too.
  pub fn payload(
    &self,
    payload: usize,
  ) -> Result<&[u8], PoolError> {
    let end = self.allocated_end(payload)?;
    Ok(&self.arena[payload..end])
  }

  pub fn payload_mut(
    &mut self,
    payload: usize,
  ) -> Result<&mut [u8], PoolError> {
    let end = self.allocated_end(payload)?;
    Ok(&mut self.arena[payload..end])
  }

  /// Size of the single free block an empty pool holds.
  pub fn capacity(&self) -> usize {
    self.tail - (self.head + HEADER_SIZE)
  }

  /// Largest request an empty pool can satisfy.
  pub fn max_alloc(&self) -> usize {
    self.capacity() - HEADER_SIZE
  }

  pub fn config(&self) -> PoolConfig {
    self.config
  }

  /// Walks the free list and verifies every structural invariant.
  pub fn check(&self) -> Result<(), PoolError> {
    let head = self.block(self.head)?;
    if head.size != HEADER_SIZE {
      return Err(PoolError::corrupted(self.head, "head sentinel resized"));
    }

    let tail = self.block(self.tail)?;
    if tail.size != HEADER_SIZE || tail.next.is_some() {
      return Err(PoolError::corrupted(self.tail, "tail sentinel modified"));
    }

    let mut previous_end = self.head + HEADER_SIZE;
    let mut current = self.next_of(self.head, &head)?;

    while current != self.tail {
      let node = self.block(current)?;

      if !is_aligned(self.address_of(current)) {
        return Err(PoolError::corrupted(current, "misaligned header"));
      }
      if node.size < MIN_BLOCK_SIZE {
        return Err(PoolError::corrupted(current, "free block below minimum size"));
      }
      if current < previous_end {
        return Err(PoolError::corrupted(current, "overlaps previous free block"));
      }
      if previous_end != self.head + HEADER_SIZE && current - previous_end < MIN_BLOCK_SIZE {
        return Err(PoolError::corrupted(current, "adjacent free blocks not coalesced"));
      }

      let end = current + node.size;
      if end > self.tail {
        return Err(PoolError::corrupted(current, "free block runs past tail"));
      }

      previous_end = end;
      current = self.next_of(current, &node)?;
    }

    Ok(())
  }

  fn strict_check(&self) -> Result<(), PoolError> {
    if self.config.is_strict() { self.check() } else { Ok(()) }
  }

  pub(crate) fn block(
    &self,
    offset: usize,
  ) -> Result<Block, PoolError> {
    Block::read(self.arena, offset)
  }

  fn set(
    &mut self,
    offset: usize,
    block: Block,
  ) -> Result<(), PoolError> {
    block.write(self.arena, offset)
  }

  fn link(
    &mut self,
    offset: usize,
    next: usize,
  ) -> Result<(), PoolError> {
    let mut block = self.block(offset)?;
    block.next = Some(next);
    self.set(offset, block)
  }

  /// Follows a free-list link, refusing anything that does not move forward.
  ///
  /// Links strictly increase and stop at TAIL, so every walk terminates even
  /// over a damaged list.
  pub(crate) fn next_of(
    &self,
    offset: usize,
    block: &Block,
  ) -> Result<usize, PoolError> {
    block
      .next
      .filter(|next| *next > offset && *next <= self.tail)
      .ok_or(PoolError::corrupted(offset, "broken free-list link"))
  }

  /// Maps a payload offset back to its block header and size.
  fn locate(
    &self,
    payload: usize,
  ) -> Result<(usize, usize), PoolError> {
    let out_of_range = PoolError::OutOfRange { offset: payload };

    let addr = self.base.checked_add(payload).ok_or(out_of_range)?;
    if !is_aligned(addr) {
      return Err(PoolError::Misaligned { addr });
    }

    let block = payload
      .checked_sub(HEADER_SIZE)
      .filter(|block| *block >= self.head + HEADER_SIZE && *block < self.tail)
      .ok_or(out_of_range)?;

    let size = self.block(block)?.size;
    if block.checked_add(size).is_none_or(|end| end > self.tail) {
      return Err(out_of_range);
    }
    if size < MIN_BLOCK_SIZE {
      return Err(PoolError::NotAllocated { offset: payload });
    }

    Ok((block, size))
  }

  /// End offset of the allocated block owning `payload`.
  fn allocated_end(
    &self,
    payload: usize,
  ) -> Result<usize, PoolError> {
    let (block, size) = self.locate(payload)?;
    self.neighbours(block, size)?;
    Ok(block + size)
  }

  /// Free-list nodes an allocated block sits between.
  ///
  /// Fails if the block is itself on the list or overlaps a free block.
  fn neighbours(
    &self,
    block: usize,
    size: usize,
  ) -> Result<(usize, usize), PoolError> {
    let not_allocated = PoolError::NotAllocated {
      offset: block + HEADER_SIZE,
    };

    let mut previous = self.head;
    let mut current = self.next_of(self.head, &self.block(self.head)?)?;

    while current < block {
      let node = self.block(current)?;
      if block < current + node.size {
        return Err(not_allocated);
      }

      previous = current;
      current = self.next_of(current, &node)?;
    }

    if current == block || block + size > current {
      return Err(not_allocated);
    }

    Ok((previous, current))
  }

  fn take_first_fit(
    &mut self,
    size: usize,
  ) -> Result<Option<usize>, PoolError> {
    let required = checked_align_up(size).and_then(|size| size.checked_add(HEADER_SIZE));
    let Some(required) = required else {
      return Ok(None);
    };

    let mut previous = self.head;
    let mut current = self.next_of(self.head, &self.block(self.head)?)?;

    while current != self.tail {
      let block = self.block(current)?;
      let next = self.next_of(current, &block)?;

      if block.size >= required {
        let space_left = block.size - required;

        if space_left >= MIN_BLOCK_SIZE {
          let split = current + required;
          self.set(split, Block::new(space_left, Some(next)))?;
          self.link(previous, split)?;
          self.set(current, Block::new(required, None))?;
        } else {
          self.link(previous, next)?;
          self.set(current, Block::new(block.size, None))?;
        }

        return Ok(Some(current));
      }

      previous = current;
      current = next;
    }

    Ok(None)
  }

  fn insert(
    &mut self,
    block: usize,
    size: usize,
  ) -> Result<(), PoolError> {
    let (previous, current) = self.neighbours(block, size)?;

    self.set(block, Block::new(size, Some(current)))?;
    self.link(previous, block)?;
    self.coalesce(previous, block, current)
  }

  fn coalesce(
    &mut self,
    previous: usize,
    current: usize,
    next: usize,
  ) -> Result<(), PoolError> {
    let block = if self.adjacent(previous, current)? {
      self.merge(previous, current)?;
      previous
    } else {
      current
    };

    if self.adjacent(block, next)? {
      self.merge(block, next)?;
    }

    Ok(())
  }

  /// Whether `second` starts too close to the end of `first` to leave room
  /// for a block in between. Sentinels never merge.
  fn adjacent(
    &self,
    first: usize,
    second: usize,
  ) -> Result<bool, PoolError> {
    if first == self.head || second == self.tail {
      return Ok(false);
    }

    let end = first + self.block(first)?.size;
    let gap = second
      .checked_sub(end)
      .ok_or(PoolError::corrupted(second, "overlaps previous free block"))?;

    Ok(gap < MIN_BLOCK_SIZE)
  }

  fn merge(
    &mut self,
    first: usize,
    second: usize,
  ) -> Result<(), PoolError> {
    let mut merged = self.block(first)?;
    let absorbed = self.block(second)?;
    debug_assert_eq!(merged.next, Some(second));

    merged.size = second + absorbed.size - first;
    merged.next = absorbed.next;
    debug_assert!(first + merged.size <= self.tail);

    self.set(first, merged)
  }
}
