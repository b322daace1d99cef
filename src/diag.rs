use crate::{block::HEADER_SIZE, pool::MemPool};

/// A node of the free list as seen from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeBlock {
  /// Arena offset of the block header.
  pub offset: usize,
  /// Total block size, header included.
  pub size: usize,
  /// Offset of the next node; the TAIL sentinel for the last block.
  pub next: usize,
}

/// Iterator over the free list, sentinels excluded.
///
/// Stops early instead of looping if it meets a broken link.
pub struct FreeBlocks<'p, 'a> {
  pool: &'p MemPool<'a>,
  current: usize,
}

impl Iterator for FreeBlocks<'_, '_> {
  type Item = FreeBlock;

  fn next(&mut self) -> Option<Self::Item> {
    let tail = self.pool.tail;
    if self.current >= tail {
      return None;
    }

    let offset = self.current;
    self.current = tail;

    let block = self.pool.block(offset).ok()?;
    let next = self.pool.next_of(offset, &block).ok()?;
    self.current = next;

    Some(FreeBlock {
      offset,
      size: block.size,
      next,
    })
  }
}

/// Snapshot of how much of the pool is free.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
  pub arena_size: usize,
  pub capacity: usize,
  pub free_bytes: usize,
  pub free_blocks: usize,
  pub largest_free: usize,
}

impl PoolStats {
  /// Largest request that would succeed right now.
  pub fn largest_request(&self) -> usize {
    self.largest_free.saturating_sub(HEADER_SIZE)
  }
}

impl<'a> MemPool<'a> {
  pub fn free_blocks(&self) -> FreeBlocks<'_, 'a> {
    let current = self
      .block(self.head)
      .and_then(|head| self.next_of(self.head, &head))
      .unwrap_or(self.tail);

    FreeBlocks {
      pool: self,
      current,
    }
  }

  pub fn stats(&self) -> PoolStats {
    self.free_blocks().fold(
      PoolStats {
        arena_size: self.arena.len(),
        capacity: self.capacity(),
        ..PoolStats::default()
      },
      |mut stats, block| {
        stats.free_bytes += block.size;
        stats.free_blocks += 1;
        stats.largest_free = stats.largest_free.max(block.size);
        stats
      },
    )
  }

  /// Prints every free block relative to HEAD.
  ///
  /// Does nothing unless the `diagnostics` feature is enabled.
  pub fn debug_print(&self) {
    #[cfg(feature = "diagnostics")]
    for block in self.free_blocks() {
      println!(
        "\tfree block: offset = {:#x}, size = {}, next = {:#x}",
        block.offset - self.head,
        block.size,
        block.next - self.head
      );
    }
  }
}

pub fn print_alloc(
  pool: &MemPool<'_>,
  size: usize,
  offset: usize,
) {
  println!(
    "Allocated {} bytes, offset = {:#x}, address = {:#x}, free = {} bytes",
    size,
    offset,
    pool.address_of(offset),
    pool.stats().free_bytes
  );
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{MAX_ALIGN, block::MIN_BLOCK_SIZE};

  #[repr(C, align(64))]
  struct Storage([u8; 1024]);

  #[test]
  fn test_stats_track_free_space() {
    let mut storage = Storage([0; 1024]);
    let mut pool = MemPool::init(&mut storage.0).unwrap();

    let empty = pool.stats();
    assert_eq!(empty.arena_size, 1024);
    assert_eq!(empty.free_blocks, 1);
    assert_eq!(empty.free_bytes, pool.capacity());
    assert_eq!(empty.largest_request(), pool.max_alloc());

    let a = pool.alloc(MAX_ALIGN).unwrap();
    let _b = pool.alloc(MAX_ALIGN).unwrap();
    pool.free(a).unwrap();

    let stats = pool.stats();
    assert_eq!(stats.free_blocks, 2);
    assert_eq!(stats.free_bytes, pool.capacity() - MIN_BLOCK_SIZE);
    assert_eq!(stats.largest_free, pool.capacity() - 2 * MIN_BLOCK_SIZE);
  }

  #[test]
  fn test_free_blocks_in_address_order() {
    let mut storage = Storage([0; 1024]);
    let mut pool = MemPool::init(&mut storage.0).unwrap();

    let payloads: Vec<usize> = (0..6).map(|_| pool.alloc(40).unwrap()).collect();
    for payload in payloads.iter().step_by(2).rev() {
      pool.free(*payload).unwrap();
    }

    let blocks: Vec<FreeBlock> = pool.free_blocks().collect();
    assert_eq!(blocks.len(), 4);
    for pair in blocks.windows(2) {
      assert!(pair[0].offset < pair[1].offset);
      assert_eq!(pair[0].next, pair[1].offset);
    }
    assert_eq!(blocks.last().map(|block| block.next), Some(pool.tail));
  }

  #[test]
  fn test_full_pool_has_no_free_blocks() {
    let mut storage = Storage([0; 1024]);
    let mut pool = MemPool::init(&mut storage.0).unwrap();

    let max = pool.max_alloc();
    pool.alloc(max).unwrap();

    assert_eq!(pool.free_blocks().next(), None);
    assert_eq!(pool.stats().largest_request(), 0);
    pool.debug_print();
  }
}
