//! # mempool - A Fixed-Arena Memory Pool
//!
//! This crate provides a **first-fit free-list allocator** that carves
//! variable-sized blocks out of a single byte buffer supplied by the caller.
//! It never touches the system allocator, which makes it a fit for targets
//! where the platform heap is unavailable or off limits.
//!
//! ## Overview
//!
//! Free regions of the arena are chained together, in address order, by
//! headers that live inside the arena itself:
//!
//! ```text
//!   Arena Layout:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                              ARENA                                   │
//!   │                                                                      │
//!   │  ┌──────┬────────┬──────────────┬────────┬──────────────────┬──────┐ │
//!   │  │ HEAD │ alloc  │     free     │ alloc  │       free       │ TAIL │ │
//!   │  └──┬───┴────────┴──────────────┴────────┴──────────────────┴──────┘ │
//!   │     │                ▲      │                   ▲      │       ▲     │
//!   │     └────────────────┘      └───────────────────┘      └───────┘     │
//!   │                                                                      │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   HEAD and TAIL are header-only sentinels; allocated blocks are not linked.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   mempool
//!   ├── align      - MAX_ALIGN and alignment macros (align_up!, align_down!)
//!   ├── block      - In-arena block header (internal)
//!   ├── config     - PoolConfig
//!   ├── diag       - Free-list iterator, stats and dumps
//!   ├── error      - PoolError
//!   └── pool       - MemPool implementation
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use mempool::MemPool;
//!
//! let mut storage = [0u8; 1024];
//! let mut pool = MemPool::init(&mut storage).unwrap();
//!
//! // Allocate 64 bytes
//! let offset = pool.alloc(64).unwrap();
//!
//! // Use the memory
//! pool.payload_mut(offset).unwrap()[..5].copy_from_slice(b"hello");
//! assert_eq!(&pool.payload(offset).unwrap()[..5], b"hello");
//!
//! // Free the memory
//! pool.free(offset).unwrap();
//! ```
//!
//! ## How It Works
//!
//! `alloc` walks the free list from HEAD and takes the first block that is
//! big enough. If the rest of that block can still hold a minimal block it is
//! split off and stays on the list:
//!
//! ```text
//!   Split:
//!
//!   before   ──► [hdr|            free             ] ──►
//!   after        [hdr| payload ][hdr|     free     ] ──►
//!                     ▲
//!                     └── offset returned to user
//! ```
//!
//! `free` puts the block back at its address-sorted position and merges it
//! with the neighbour on either side when nothing fits in between:
//!
//! ```text
//!   Coalesce:
//!
//!   before   [hdr| free ][hdr| freed ][hdr| free ]
//!   after    [hdr|             free              ]
//! ```
//!
//! ## Features
//!
//! - **No system allocator**: all bookkeeping lives in the arena
//! - **Proper alignment**: payloads start on a [`MAX_ALIGN`] boundary
//! - **Coalescing**: freeing everything restores one contiguous block
//! - **Memory safe**: links are offsets, payloads are handed out as slices
//!
//! ## Limitations
//!
//! - **Single-threaded only**: wrap the pool in a lock to share it
//! - **No realloc**: blocks never grow or shrink in place
//! - **Fixed size**: the arena is never grown or released
//! - **Best-effort validation**: `free` checks alignment and range, and
//!   catches frees of memory that is already free, but cannot prove that an
//!   offset came from `alloc`
//!
//! ## Cargo Features
//!
//! - `diagnostics`: makes [`MemPool::debug_print`] dump the free list.

pub mod align;
mod block;
mod config;
mod diag;
mod error;
mod pool;

pub use align::MAX_ALIGN;
pub use block::{HEADER_SIZE, MIN_ALLOC_SIZE, MIN_BLOCK_SIZE};
pub use config::PoolConfig;
pub use diag::{FreeBlock, FreeBlocks, PoolStats, print_alloc};
pub use error::PoolError;
pub use pool::{MIN_POOL_SIZE, MemPool};
