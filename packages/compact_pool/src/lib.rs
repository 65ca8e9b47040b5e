#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! An object pool that keeps its items densely packed for fast iteration while handing out
//! stable handles to individual items.
//!
//! This crate provides [`CompactPool`], aimed at update-loop workloads where many short-lived
//! items are processed every tick. Such workloads want two things at once that plain
//! collections do not offer together:
//!
//! - **Cache-friendly bulk iteration** - all items live in one contiguous `Vec`, packed at
//!   its start.
//! - **O(1) allocation and release** - released slots are tracked by a free list that is stored
//!   inside the vacant slots themselves, so no additional memory is needed to track them.
//!
//! Releasing an item from the middle of the pool leaves a hole. The pool closes holes by moving
//! items from the end of the storage into them, in time proportional to the number of holes.
//! When this happens is governed by the [`DefragPolicy`].
//!
//! Because items move, the pool hands out [`Handle`]s instead of positions. A handle resolves
//! to its item through the pool, caching the position so that repeated access between
//! defragmentation passes does not need to look anything up.
//!
//! # Examples
//!
//! ```rust
//! use compact_pool::CompactPool;
//!
//! #[derive(Default)]
//! struct Enemy {
//!     hp: i32,
//! }
//!
//! let mut pool = CompactPool::<Enemy>::new();
//!
//! let boss = pool.alloc().unwrap();
//! pool.get_mut(&boss).unwrap().hp = 100;
//!
//! let minion = pool.alloc().unwrap();
//! pool.get_mut(&minion).unwrap().hp = 1;
//!
//! // Every tick, update all enemies and collect the dead ones.
//! let mut dead = Vec::new();
//!
//! pool.iterate(|enemy, id| {
//!     enemy.hp -= 1;
//!
//!     if enemy.hp <= 0 {
//!         dead.push(id);
//!     }
//! });
//!
//! for id in dead {
//!     pool.release(id).unwrap();
//! }
//!
//! assert_eq!(pool.len(), 1);
//! assert_eq!(pool.get(&boss).unwrap().hp, 99);
//! ```
//!
//! # Thread safety
//!
//! The pool is meant for single-threaded use and performs no synchronization. It can be moved
//! between threads and guarded by a lock if shared access is required.

mod builder;
mod defrag_policy;
mod error;
mod free_list;
mod handle;
mod iter;
mod pool;
mod slot;
mod visit;

pub use builder::*;
pub use defrag_policy::*;
pub use error::*;
pub(crate) use free_list::*;
pub use handle::Handle;
pub use iter::*;
pub use pool::CompactPool;
pub use slot::ElementId;
pub(crate) use slot::*;
pub use visit::*;
