//! Raw frame storage for captured stacks
//!
//! Two storage modes cover the two ways captures get used. [`RawTrace`]
//! owns its frames and is sized exactly to the captured count - the
//! common case. [`FrameArena`] borrows a caller-supplied slot buffer and
//! never allocates, for callers that manage their own memory (crash
//! handlers, pre-reserved logging arenas).
//!
//! Comparison, ordering and hashing read nothing but the stored
//! addresses. They never consult a symbol session, so sorting or
//! deduplicating large trace sets stays cheap even when no debug service
//! exists at all.

use std::cmp::Ordering;

use crate::domain::RawAddress;

/// Owned stack snapshot, sized exactly to the captured frame count
///
/// Equality, ordering and hashing are derived from the frame addresses
/// alone, in capture order (innermost first).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RawTrace {
    frames: Box<[RawAddress]>,
}

impl RawTrace {
    /// The empty trace (zero frames)
    #[must_use]
    pub fn empty() -> Self {
        RawTrace::default()
    }

    pub(crate) fn from_frames(frames: Vec<RawAddress>) -> Self {
        RawTrace {
            frames: frames.into_boxed_slice(),
        }
    }

    /// Number of captured frames
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Returns true when nothing was captured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The captured addresses in capture order (innermost first)
    #[must_use]
    pub fn frames(&self) -> &[RawAddress] {
        &self.frames
    }

    /// Raw address of a single frame
    ///
    /// # Panics
    /// Panics if `frame >= frame_count()`. Symbol queries, by contrast,
    /// accept any index and answer out-of-range ones with sentinels.
    #[must_use]
    pub fn address(&self, frame: usize) -> RawAddress {
        self.frames[frame]
    }
}

impl PartialOrd for RawTrace {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RawTrace {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_frames(&self.frames, &other.frames)
    }
}

/// Fixed-capacity frame storage over caller-owned memory
///
/// Construction is allocation-free: the arena starts as an empty record
/// over the slots it is given, and a capture fills at most `capacity()`
/// frames. Dropping the arena releases nothing - the buffer belongs to
/// the caller.
#[derive(Debug)]
pub struct FrameArena<'m> {
    slots: &'m mut [RawAddress],
    len: usize,
}

impl<'m> FrameArena<'m> {
    /// Wrap a caller-supplied slot buffer; capacity is the buffer length
    #[must_use]
    pub fn new(slots: &'m mut [RawAddress]) -> Self {
        FrameArena { slots, len: 0 }
    }

    /// Maximum number of frames this arena can record
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of frames recorded by the most recent capture
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.len
    }

    /// Returns true when the arena holds no frames
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The filled prefix of the slot buffer, in capture order
    #[must_use]
    pub fn frames(&self) -> &[RawAddress] {
        &self.slots[..self.len]
    }

    /// Raw address of a single frame
    ///
    /// # Panics
    /// Panics if `frame >= frame_count()`, same contract as
    /// [`RawTrace::address`].
    #[must_use]
    pub fn address(&self, frame: usize) -> RawAddress {
        self.frames()[frame]
    }

    /// Copy the record into an owned trace of exactly `frame_count()`
    /// frames
    #[must_use]
    pub fn to_trace(&self) -> RawTrace {
        RawTrace::from_frames(self.frames().to_vec())
    }

    /// Reset to the empty record and expose the slots for a walker to
    /// fill. Only the capture operation writes frames.
    pub(crate) fn writable_slots(&mut self) -> &mut [RawAddress] {
        self.len = 0;
        self.slots
    }

    pub(crate) fn set_len(&mut self, len: usize) {
        debug_assert!(len <= self.slots.len());
        self.len = len;
    }
}

/// Total order over frame sequences: fewer frames sort first, equal
/// counts fall back to lexicographic comparison in capture order
///
/// The count-major rule decides most comparisons in O(1) and makes the
/// empty trace the minimum. Two sequences compare equal exactly when
/// they have the same count and the same addresses.
#[must_use]
pub fn compare_frames(a: &[RawAddress], b: &[RawAddress]) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
