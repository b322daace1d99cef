/// Runtime knobs for a [`MemPool`](crate::MemPool).
///
/// ```rust
/// use mempool::PoolConfig;
///
/// let config = PoolConfig::new().strict(true);
/// assert!(config.is_strict());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
  strict: bool,
}

impl PoolConfig {
  /// Strict checking follows the build profile: on in debug, off in release.
  pub const fn new() -> Self {
    Self {
      strict: cfg!(debug_assertions),
    }
  }

  /// Walk and verify the whole free list before every `alloc` and `free`.
  ///
  /// A pool that fails the walk refuses to hand out or take back memory.
  pub const fn strict(
    mut self,
    strict: bool,
  ) -> Self {
    self.strict = strict;
    self
  }

  pub const fn is_strict(&self) -> bool {
    self.strict
  }
}

impl Default for PoolConfig {
  fn default() -> Self {
    Self::new()
  }
}
