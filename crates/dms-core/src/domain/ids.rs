//! Identifier types and the thread-safe allocator that hands them out.
//!
//! # Why newtypes? (for beginners)
//!
//! Screens, groups and displays are all identified by a `u64` on the wire.
//! Wrapping each in its own struct (`ScreenId`, `DisplayId`) makes it a compile
//! error to pass a display id where a screen id is expected, at zero runtime
//! cost.
//!
//! Groups are screens too (a group *is-a* screen with children), so group ids
//! are drawn from the same [`IdAllocator`] as leaf screen ids and share the
//! `ScreenId` type.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Logical identifier of a screen or a screen group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScreenId(pub u64);

/// Logical identifier of a display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DisplayId(pub u64);

/// Persistent identifier of a window session.
pub type PersistentId = i32;

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "screen#{}", self.0)
    }
}

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "display#{}", self.0)
    }
}

/// A thread-safe, monotonically increasing id source.
///
/// Ids are never reused during the lifetime of the allocator, so a stale id
/// held by a listener can never alias a newly created entity.
///
/// # Examples
///
/// ```rust
/// use dms_core::domain::ids::IdAllocator;
///
/// let ids = IdAllocator::new();
/// assert_eq!(ids.next(), 0);
/// assert_eq!(ids.next(), 1);
/// ```
#[derive(Debug)]
pub struct IdAllocator {
    inner: AtomicU64,
}

impl IdAllocator {
    /// Creates an allocator whose first id is 0.
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Creates an allocator whose first id is `first`.
    pub fn starting_at(first: u64) -> Self {
        Self {
            inner: AtomicU64::new(first),
        }
    }

    /// Returns the next id and advances the allocator.
    ///
    /// `Ordering::Relaxed` is enough: ids only need to be unique, they do not
    /// publish any other memory.
    pub fn next(&self) -> u64 {
        self.inner.fetch_add(1, Ordering::Relaxed)
    }

    /// Allocates the next screen (or group) id.
    pub fn next_screen_id(&self) -> ScreenId {
        ScreenId(self.next())
    }

    /// Allocates the next display id.
    pub fn next_display_id(&self) -> DisplayId {
        DisplayId(self.next())
    }

    /// Returns the id the next call to [`next`](Self::next) would produce.
    pub fn peek(&self) -> u64 {
        self.inner.load(Ordering::Relaxed)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
