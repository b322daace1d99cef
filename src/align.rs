use std::mem;

/// The strictest alignment any scalar type needs on this platform.
///
/// Every block header, and therefore every payload handed out by the pool,
/// starts on a multiple of this value.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub const MAX_ALIGN: usize = mem::align_of::<libc::max_align_t>();

#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub const MAX_ALIGN: usize = 2 * mem::size_of::<usize>();

/// Rounds the given value up to the next multiple of [`MAX_ALIGN`].
///
/// # Examples
///
/// ```rust
/// use mempool::{MAX_ALIGN, align_up};
///
/// assert_eq!(align_up!(1), MAX_ALIGN);
/// assert_eq!(align_up!(MAX_ALIGN), MAX_ALIGN);
/// assert_eq!(align_up!(MAX_ALIGN + 1), 2 * MAX_ALIGN);
/// ```
#[macro_export]
macro_rules! align_up {
  ($value:expr) => {
    ($value + $crate::MAX_ALIGN - 1) & !($crate::MAX_ALIGN - 1)
  };
}

/// Rounds the given value down to the previous multiple of [`MAX_ALIGN`].
///
/// ```rust
/// use mempool::{MAX_ALIGN, align_down};
///
/// assert_eq!(align_down!(MAX_ALIGN - 1), 0);
/// assert_eq!(align_down!(2 * MAX_ALIGN + 3), 2 * MAX_ALIGN);
/// ```
#[macro_export]
macro_rules! align_down {
  ($value:expr) => {
    $value & !($crate::MAX_ALIGN - 1)
  };
}

/// Overflow-aware [`align_up!`] for sizes coming from callers.
pub(crate) fn checked_align_up(value: usize) -> Option<usize> {
  value
    .checked_add(MAX_ALIGN - 1)
    .map(|v| align_down!(v))
}

pub(crate) fn is_aligned(addr: usize) -> bool {
  addr % MAX_ALIGN == 0
}
