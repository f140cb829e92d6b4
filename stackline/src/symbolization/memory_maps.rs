//! Memory mapping utilities for process address space analysis
//!
//! Symbolication has to translate runtime addresses (randomized per run
//! by ASLR for position-independent executables) back into the address
//! space the debug info was linked against. The runtime side of that
//! translation comes from `/proc/<pid>/maps`: the union of all mappings
//! backed by the process image gives the image's base and extent.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::info;

use crate::domain::Pid;

/// Memory range of a loaded image in a process's address space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRange {
    pub start: u64,
    pub end: u64,
}

impl MemoryRange {
    /// Check if an address falls within this memory range
    #[must_use]
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end
    }
}

/// Find the mapped range of `image` inside process `pid`
///
/// Reads `/proc/<pid>/maps` and unions every mapping that names the
/// image, from the minimum start address to the maximum end address. A
/// single binary typically appears as several mappings (text, rodata,
/// data), and addresses from any of them must translate.
///
/// # Errors
/// Returns an error if the maps file cannot be read or no mapping names
/// the image.
pub fn image_range(pid: Pid, image: &Path) -> Result<MemoryRange> {
    let maps_path = format!("/proc/{}/maps", pid.0);
    let maps =
        fs::read_to_string(&maps_path).with_context(|| format!("Failed to read {maps_path}"))?;
    let range = range_from_maps(&maps, image)?;
    info!(
        "Image memory range for {}: 0x{:x} - 0x{:x} ({} KB)",
        pid,
        range.start,
        range.end,
        (range.end - range.start) / 1024
    );
    Ok(range)
}

fn range_from_maps(maps: &str, image: &Path) -> Result<MemoryRange> {
    let image = image.to_string_lossy();
    let mut range: Option<MemoryRange> = None;

    for line in maps.lines() {
        // "start-end perms offset dev inode pathname"
        if !line.contains(image.as_ref()) {
            continue;
        }
        let Some((start, end)) = parse_range(line) else {
            continue;
        };
        range = Some(match range {
            Some(seen) => MemoryRange {
                start: seen.start.min(start),
                end: seen.end.max(end),
            },
            None => MemoryRange { start, end },
        });
    }

    range.ok_or_else(|| anyhow!("No mapping of {image} found"))
}

fn parse_range(line: &str) -> Option<(u64, u64)> {
    let range = line.split_whitespace().next()?;
    let (start, end) = range.split_once('-')?;
    let start = u64::from_str_radix(start, 16).ok()?;
    let end = u64::from_str_radix(end, 16).ok()?;
    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const SAMPLE_MAPS: &str = "\
55d0a1e00000-55d0a1e5c000 r--p 00000000 fd:01 123 /usr/bin/app
55d0a1e5c000-55d0a2232000 r-xp 0005c000 fd:01 123 /usr/bin/app
55d0a2232000-55d0a2356000 r--p 00432000 fd:01 123 /usr/bin/app
55d0a2357000-55d0a2392000 rw-p 00556000 fd:01 123 /usr/bin/app
7f3a40000000-7f3a40021000 rw-p 00000000 00:00 0
7f3a44000000-7f3a441b5000 r--p 00000000 fd:01 456 /usr/lib/libc.so.6
ffffffffff600000-ffffffffff601000 --xp 00000000 00:00 0 [vsyscall]
";

    #[test]
    fn test_memory_range_contains() {
        let range = MemoryRange { start: 0x1000, end: 0x2000 };

        assert!(range.contains(0x1000));
        assert!(range.contains(0x1500));
        assert!(range.contains(0x1FFF));
        assert!(!range.contains(0x0FFF));
        assert!(!range.contains(0x2000));
        assert!(!range.contains(0x2001));
    }

    #[test]
    fn test_unions_all_mappings_of_the_image() {
        let range = range_from_maps(SAMPLE_MAPS, &PathBuf::from("/usr/bin/app"))
            .expect("image should be found");
        assert_eq!(range.start, 0x55d0_a1e0_0000);
        assert_eq!(range.end, 0x55d0_a239_2000);
    }

    #[test]
    fn test_other_images_are_ignored() {
        let range = range_from_maps(SAMPLE_MAPS, &PathBuf::from("/usr/lib/libc.so.6"))
            .expect("libc should be found");
        assert_eq!(range.start, 0x7f3a_4400_0000);
        assert_eq!(range.end, 0x7f3a_441b_5000);
    }

    #[test]
    fn test_missing_image_is_an_error() {
        assert!(range_from_maps(SAMPLE_MAPS, &PathBuf::from("/nonexistent")).is_err());
    }

    #[test]
    fn test_anonymous_mappings_never_match() {
        let anonymous_only = "7f3a40000000-7f3a40021000 rw-p 00000000 00:00 0\n";
        assert!(range_from_maps(anonymous_only, &PathBuf::from("/usr/bin/app")).is_err());
    }

    #[test]
    fn test_malformed_range_lines_are_skipped() {
        let maps = "garbage /usr/bin/app\n55d0a1e00000-55d0a1e5c000 r--p 0 0 0 /usr/bin/app\n";
        let range = range_from_maps(maps, &PathBuf::from("/usr/bin/app"))
            .expect("valid line should still win");
        assert_eq!(range.start, 0x55d0_a1e0_0000);
    }

    #[test]
    fn test_own_process_maps_are_parseable() {
        // Depends on /proc, so only assert the happy path loosely.
        let exe = std::env::current_exe().expect("current exe");
        let range = image_range(Pid::current(), &exe);
        if let Ok(range) = range {
            assert!(range.start < range.end);
        }
    }
}
