//! Native stack-walking boundary
//!
//! Walking the stack is a platform capability, not something this crate
//! reimplements. [`StackWalker`] is the seam; [`BacktraceWalker`] is the
//! bundled implementation on top of the `backtrace` crate's callback API,
//! which records instruction pointers without resolving symbols. Tests
//! substitute deterministic walkers through the same seam.

use crate::domain::RawAddress;

/// What one stack walk produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkReport {
    /// Number of addresses written to the output buffer
    pub frames: usize,
    /// Per-walk hash assist, folded into the capture fingerprint. The
    /// bundled walker reports the wrapping sum of the recorded addresses;
    /// walkers with nothing cheap to offer report 0.
    pub hash_assist: u64,
}

/// A primitive that fills a buffer with raw return addresses
///
/// Implementations drop `skip` innermost frames before recording, write
/// at most `out.len()` addresses, and must not allocate on the walk path.
/// The reported `frames` never exceeds `out.len()`.
pub trait StackWalker {
    /// Walk the current thread's stack into `out`
    fn walk(&self, skip: usize, out: &mut [RawAddress]) -> WalkReport;
}

/// Stack walker backed by the `backtrace` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct BacktraceWalker;

impl BacktraceWalker {
    #[must_use]
    pub fn new() -> Self {
        BacktraceWalker
    }
}

impl StackWalker for BacktraceWalker {
    fn walk(&self, skip: usize, out: &mut [RawAddress]) -> WalkReport {
        if out.is_empty() {
            return WalkReport { frames: 0, hash_assist: 0 };
        }

        let mut written = 0usize;
        let mut hash_assist = 0u64;
        let mut remaining_skip = skip;

        backtrace::trace(|frame| {
            if remaining_skip > 0 {
                remaining_skip -= 1;
                return true;
            }

            let ip = frame.ip() as usize as u64;
            if ip == 0 {
                // Some unwinders emit a null terminator frame; skip it
                // but keep walking in case real frames follow.
                return true;
            }

            out[written] = RawAddress(ip);
            hash_assist = hash_assist.wrapping_add(ip);
            written += 1;

            written < out.len()
        });

        WalkReport {
            frames: written,
            hash_assist,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_fills_buffer_within_bounds() {
        let mut out = [RawAddress::NULL; 32];
        let report = BacktraceWalker::new().walk(0, &mut out);
        assert!(report.frames > 0, "test harness stack should be visible");
        assert!(report.frames <= out.len());
        for slot in &out[..report.frames] {
            assert!(!slot.is_null());
        }
    }

    #[test]
    fn test_hash_assist_is_sum_of_recorded_addresses() {
        let mut out = [RawAddress::NULL; 64];
        let report = BacktraceWalker::new().walk(0, &mut out);
        let sum = out[..report.frames]
            .iter()
            .fold(0u64, |acc, addr| acc.wrapping_add(addr.0));
        assert_eq!(report.hash_assist, sum);
    }

    #[test]
    fn test_skip_drops_innermost_frames() {
        // Both walks happen at the same stack depth, so the skipped walk
        // must see exactly two fewer frames.
        let mut full = [RawAddress::NULL; 256];
        let mut skipped = [RawAddress::NULL; 256];
        let full_report = BacktraceWalker::new().walk(0, &mut full);
        let skipped_report = BacktraceWalker::new().walk(2, &mut skipped);
        assert_eq!(full_report.frames, skipped_report.frames + 2);
    }

    #[test]
    fn test_small_buffer_truncates() {
        let mut out = [RawAddress::NULL; 2];
        let report = BacktraceWalker::new().walk(0, &mut out);
        assert_eq!(report.frames, 2);
    }

    #[test]
    fn test_zero_capacity_walk_is_a_noop() {
        let mut out: [RawAddress; 0] = [];
        let report = BacktraceWalker::new().walk(0, &mut out);
        assert_eq!(report, WalkReport { frames: 0, hash_assist: 0 });
    }
}
