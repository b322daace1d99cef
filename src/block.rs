use std::mem;

use crate::{MAX_ALIGN, error::PoolError};

const FIELD_SIZE: usize = mem::size_of::<u32>();

/// Stored in the `next` field of headers that link nowhere.
const NIL: u32 = u32::MAX;

/// Bytes reserved in front of every block, rounded so payloads stay aligned.
pub const HEADER_SIZE: usize = crate::align_up!(2 * FIELD_SIZE);

/// Smallest payload a free block must be able to hold.
pub const MIN_ALLOC_SIZE: usize = MAX_ALIGN;

/// Smallest block worth keeping on the free list.
pub const MIN_BLOCK_SIZE: usize = HEADER_SIZE + MIN_ALLOC_SIZE;

/// Header placed at the start of every block inside the arena.
///
/// ```text
///   ┌──────────────┬──────────────┬─────────┬─────────────────────┐
///   │ size: u32    │ next: u32    │ padding │ payload / free space│
///   └──────────────┴──────────────┴─────────┴─────────────────────┘
///   ◄──────────── HEADER_SIZE ────────────►
/// ```
///
/// `size` counts the whole block including the header. `next` is the arena
/// offset of the following free block and only means something while the
/// block sits on the free list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
  pub size: usize,
  pub next: Option<usize>,
}

impl Block {
  pub fn new(
    size: usize,
    next: Option<usize>,
  ) -> Self {
    Self { size, next }
  }

  pub fn read(
    arena: &[u8],
    offset: usize,
  ) -> Result<Self, PoolError> {
    let bytes = offset
      .checked_add(2 * FIELD_SIZE)
      .and_then(|end| arena.get(offset..end))
      .ok_or(PoolError::corrupted(offset, "header outside arena"))?;

    let (size, next) = bytes.split_at(FIELD_SIZE);
    let next = match word(next) {
      NIL => None,
      next => Some(next as usize),
    };

    Ok(Self::new(word(size) as usize, next))
  }

  pub fn write(
    &self,
    arena: &mut [u8],
    offset: usize,
  ) -> Result<(), PoolError> {
    let size = u32::try_from(self.size)
      .map_err(|_| PoolError::corrupted(offset, "block size does not fit the header"))?;

    let next = match self.next {
      Some(next) => u32::try_from(next)
        .ok()
        .filter(|next| *next != NIL)
        .ok_or(PoolError::corrupted(offset, "link does not fit the header"))?,
      None => NIL,
    };

    let bytes = offset
      .checked_add(2 * FIELD_SIZE)
      .and_then(|end| arena.get_mut(offset..end))
      .ok_or(PoolError::corrupted(offset, "header outside arena"))?;

    bytes[..FIELD_SIZE].copy_from_slice(&size.to_ne_bytes());
    bytes[FIELD_SIZE..].copy_from_slice(&next.to_ne_bytes());

    Ok(())
  }
}

fn word(bytes: &[u8]) -> u32 {
  let mut buf = [0u8; FIELD_SIZE];
  buf.copy_from_slice(bytes);
  u32::from_ne_bytes(buf)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_header_layout() {
    assert_eq!(HEADER_SIZE % MAX_ALIGN, 0);
    assert!(HEADER_SIZE >= 2 * FIELD_SIZE);
    assert_eq!(MIN_BLOCK_SIZE, HEADER_SIZE + MAX_ALIGN);
  }

  #[test]
  fn test_write_then_read() {
    let mut arena = [0u8; 64];

    Block::new(48, Some(32)).write(&mut arena, 16).unwrap();
    Block::new(16, None).write(&mut arena, 0).unwrap();

    assert_eq!(Block::read(&arena, 16).unwrap(), Block::new(48, Some(32)));
    assert_eq!(Block::read(&arena, 0).unwrap(), Block::new(16, None));
  }

  #[test]
  fn test_read_outside_arena() {
    let arena = [0u8; 16];

    assert!(matches!(
      Block::read(&arena, 12),
      Err(PoolError::Corrupted { offset: 12, .. })
    ));
    assert!(Block::read(&arena, usize::MAX).is_err());
  }

  #[test]
  fn test_write_rejects_oversized_fields() {
    let mut arena = [0u8; 16];

    assert!(Block::new(usize::MAX, None).write(&mut arena, 0).is_err());
    assert!(Block::new(16, Some(NIL as usize)).write(&mut arena, 0).is_err());
    assert!(Block::new(16, None).write(&mut arena, 12).is_err());
  }
}
