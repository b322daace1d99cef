use thiserror::Error;

/// Errors reported by [`MemPool`](crate::MemPool).
///
/// Running out of memory is not an error: [`MemPool::alloc`](crate::MemPool::alloc)
/// simply returns `None`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
  #[error("arena of {size} bytes is too small (need at least {min} usable bytes)")]
  ArenaTooSmall { size: usize, min: usize },

  #[error("arena of {size} bytes exceeds the {max} byte limit")]
  ArenaTooLarge { size: usize, max: usize },

  #[error("null pointer")]
  NullPointer,

  #[error("address {addr:#x} is not aligned to the pool alignment")]
  Misaligned { addr: usize },

  #[error("offset {offset:#x} is outside the managed region")]
  OutOfRange { offset: usize },

  #[error("block at offset {offset:#x} is not allocated")]
  NotAllocated { offset: usize },

  #[error("free list corrupted at offset {offset:#x}: {reason}")]
  Corrupted { offset: usize, reason: &'static str },
}

impl PoolError {
  /// Whether this is a rejected argument, as opposed to a broken pool.
  ///
  /// Invalid parameters never change the pool.
  pub fn is_invalid_param(&self) -> bool {
    matches!(
      self,
      Self::ArenaTooSmall { .. }
        | Self::ArenaTooLarge { .. }
        | Self::NullPointer
        | Self::Misaligned { .. }
        | Self::OutOfRange { .. }
    )
  }

  pub(crate) fn corrupted(
    offset: usize,
    reason: &'static str,
  ) -> Self {
    Self::Corrupted { offset, reason }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_invalid_param_classification() {
    assert!(PoolError::NullPointer.is_invalid_param());
    assert!(PoolError::Misaligned { addr: 3 }.is_invalid_param());
    assert!(PoolError::OutOfRange { offset: 0 }.is_invalid_param());
    assert!(PoolError::ArenaTooSmall { size: 1, min: 64 }.is_invalid_param());

    assert!(!PoolError::NotAllocated { offset: 16 }.is_invalid_param());
    assert!(!PoolError::corrupted(16, "loop").is_invalid_param());
  }

  #[test]
  fn test_display() {
    assert_eq!(
      PoolError::OutOfRange { offset: 0x20 }.to_string(),
      "offset 0x20 is outside the managed region"
    );
    assert_eq!(
      PoolError::corrupted(0x40, "size below minimum").to_string(),
      "free list corrupted at offset 0x40: size below minimum"
    );
  }
}
