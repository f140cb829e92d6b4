//! Stack capture operations
//!
//! Capturing a stack must be cheap and must never fail: it runs inside
//! logging and crash paths where a panic or an allocation stall is worse
//! than a short trace. The operations here walk the stack through a
//! [`StackWalker`], record raw return addresses into either an owned
//! [`RawTrace`] or a caller-supplied [`FrameArena`], and derive a
//! [`Fingerprint`] from the walker's hash assist without re-reading the
//! recorded addresses.
//!
//! Nothing in this module talks to a debug service. Symbolication is a
//! separate, later step (see [`crate::session`]), and a capture taken
//! here stays usable for comparison and hashing even if no debug service
//! ever becomes available.

pub mod store;
pub mod walker;

pub use store::{compare_frames, FrameArena, RawTrace};
pub use walker::{BacktraceWalker, StackWalker, WalkReport};

use crate::domain::{Fingerprint, RawAddress};

/// Seed the fingerprint combine starts from
const FINGERPRINT_SEED: u64 = 0;

/// How a capture walks the stack
#[derive(Debug, Clone, Copy)]
pub struct CaptureOptions {
    /// Upper bound on recorded frames. Arena captures are additionally
    /// clamped to the arena's capacity.
    pub max_frames: usize,
    /// Innermost frames to drop before recording. The walk starts inside
    /// the capture machinery, so callers that want their own frame first
    /// skip the machinery frames above it.
    pub skip: usize,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        CaptureOptions {
            max_frames: 128,
            skip: 0,
        }
    }
}

/// An owned capture: the trace plus its fingerprint
#[derive(Debug, Clone)]
pub struct Captured {
    pub trace: RawTrace,
    pub fingerprint: Fingerprint,
}

/// Outcome of an arena capture; the frames themselves live in the arena
#[derive(Debug, Clone, Copy)]
pub struct CaptureReport {
    /// Frames recorded into the arena
    pub frame_count: usize,
    pub fingerprint: Fingerprint,
}

/// Capture the current stack into an owned trace with the bundled walker
#[must_use]
pub fn capture(options: CaptureOptions) -> Captured {
    capture_with(&BacktraceWalker, options)
}

/// Capture the current stack through a specific walker
#[must_use]
pub fn capture_with(walker: &dyn StackWalker, options: CaptureOptions) -> Captured {
    let mut slots = vec![RawAddress::NULL; options.max_frames];
    let report = walker.walk(options.skip, &mut slots);
    slots.truncate(report.frames.min(options.max_frames));
    Captured {
        trace: RawTrace::from_frames(slots),
        fingerprint: fingerprint_from(report.hash_assist),
    }
}

/// Capture the current stack into caller-owned memory with the bundled
/// walker; allocates nothing
pub fn capture_into(arena: &mut FrameArena<'_>, options: CaptureOptions) -> CaptureReport {
    capture_into_with(&BacktraceWalker, arena, options)
}

/// Capture the current stack into caller-owned memory through a specific
/// walker
pub fn capture_into_with(
    walker: &dyn StackWalker,
    arena: &mut FrameArena<'_>,
    options: CaptureOptions,
) -> CaptureReport {
    let limit = options.max_frames.min(arena.capacity());
    let report = walker.walk(options.skip, &mut arena.writable_slots()[..limit]);
    let frame_count = report.frames.min(limit);
    arena.set_len(frame_count);
    CaptureReport {
        frame_count,
        fingerprint: fingerprint_from(report.hash_assist),
    }
}

fn fingerprint_from(hash_assist: u64) -> Fingerprint {
    Fingerprint(hash_combine(FINGERPRINT_SEED, hash_assist))
}

/// 64-bit golden-ratio hash combine
fn hash_combine(seed: u64, value: u64) -> u64 {
    seed ^ value
        .wrapping_add(0x9e37_79b9_7f4a_7c15)
        .wrapping_add(seed << 6)
        .wrapping_add(seed >> 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Walker that replays a fixed address list, for deterministic tests
    struct ScriptedWalker {
        addrs: Vec<u64>,
        assist: u64,
    }

    impl ScriptedWalker {
        fn new(addrs: &[u64]) -> Self {
            let assist = addrs.iter().fold(0u64, |acc, a| acc.wrapping_add(*a));
            ScriptedWalker {
                addrs: addrs.to_vec(),
                assist,
            }
        }
    }

    impl StackWalker for ScriptedWalker {
        fn walk(&self, skip: usize, out: &mut [RawAddress]) -> WalkReport {
            let mut written = 0;
            for &addr in self.addrs.iter().skip(skip) {
                if written == out.len() {
                    break;
                }
                out[written] = RawAddress(addr);
                written += 1;
            }
            WalkReport {
                frames: written,
                hash_assist: self.assist,
            }
        }
    }

    #[test]
    fn test_owned_capture_is_sized_to_count() {
        let walker = ScriptedWalker::new(&[0x10, 0x20, 0x30]);
        let captured = capture_with(&walker, CaptureOptions::default());
        assert_eq!(captured.trace.frame_count(), 3);
        assert_eq!(captured.trace.address(0), RawAddress(0x10));
        assert_eq!(captured.trace.address(2), RawAddress(0x30));
    }

    #[test]
    fn test_owned_capture_clamps_to_max_frames() {
        let walker = ScriptedWalker::new(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let options = CaptureOptions {
            max_frames: 4,
            skip: 0,
        };
        let captured = capture_with(&walker, options);
        assert_eq!(captured.trace.frame_count(), 4);
        assert_eq!(captured.trace.address(3), RawAddress(4));
    }

    #[test]
    fn test_skip_shifts_the_recorded_window() {
        let walker = ScriptedWalker::new(&[0xa, 0xb, 0xc, 0xd]);
        let options = CaptureOptions {
            max_frames: 8,
            skip: 2,
        };
        let captured = capture_with(&walker, options);
        assert_eq!(captured.trace.frames(), &[RawAddress(0xc), RawAddress(0xd)]);
    }

    #[test]
    fn test_identical_walks_produce_equal_captures() {
        let walker = ScriptedWalker::new(&[0x10, 0x20, 0x30]);
        let first = capture_with(&walker, CaptureOptions::default());
        let second = capture_with(&walker, CaptureOptions::default());
        assert_eq!(first.trace, second.trace);
        assert_eq!(first.fingerprint, second.fingerprint);
    }

    #[test]
    fn test_fingerprint_tracks_hash_assist() {
        let first = capture_with(&ScriptedWalker::new(&[0x10]), CaptureOptions::default());
        let second = capture_with(&ScriptedWalker::new(&[0x20]), CaptureOptions::default());
        assert_ne!(first.fingerprint, second.fingerprint);

        // The combine is pure: the same assist always lands on the same
        // fingerprint.
        assert_eq!(
            first.fingerprint,
            Fingerprint(hash_combine(FINGERPRINT_SEED, 0x10))
        );
    }

    #[test]
    fn test_arena_capture_respects_capacity() {
        let walker = ScriptedWalker::new(&[1, 2, 3, 4, 5]);
        let mut slots = [RawAddress::NULL; 3];
        let mut arena = FrameArena::new(&mut slots);
        let report = capture_into_with(&walker, &mut arena, CaptureOptions::default());
        assert_eq!(report.frame_count, 3);
        assert_eq!(arena.frames(), &[RawAddress(1), RawAddress(2), RawAddress(3)]);
    }

    #[test]
    fn test_arena_capture_respects_max_frames_below_capacity() {
        let walker = ScriptedWalker::new(&[1, 2, 3, 4, 5]);
        let mut slots = [RawAddress::NULL; 16];
        let mut arena = FrameArena::new(&mut slots);
        let options = CaptureOptions {
            max_frames: 2,
            skip: 0,
        };
        let report = capture_into_with(&walker, &mut arena, options);
        assert_eq!(report.frame_count, 2);
        assert_eq!(arena.frame_count(), 2);
    }

    #[test]
    fn test_zero_capacity_capture_yields_valid_empty_record() {
        let walker = ScriptedWalker::new(&[1, 2, 3]);
        let mut slots: [RawAddress; 0] = [];
        let mut arena = FrameArena::new(&mut slots);
        let report = capture_into_with(&walker, &mut arena, CaptureOptions::default());
        assert_eq!(report.frame_count, 0);
        assert!(arena.is_empty());
        assert_eq!(arena.to_trace(), RawTrace::empty());
    }

    #[test]
    fn test_same_stack_same_fingerprint_across_modes() {
        let walker = ScriptedWalker::new(&[0x10, 0x20]);
        let owned = capture_with(&walker, CaptureOptions::default());
        let mut slots = [RawAddress::NULL; 8];
        let mut arena = FrameArena::new(&mut slots);
        let report = capture_into_with(&walker, &mut arena, CaptureOptions::default());
        assert_eq!(owned.fingerprint, report.fingerprint);
        assert_eq!(owned.trace, arena.to_trace());
    }
}
