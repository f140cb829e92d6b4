//! # Symbol Resolution and Address Translation
//!
//! This module turns the raw instruction pointers recorded by a capture
//! into human-readable function names, file paths and line numbers. It
//! plugs into the session layer as the bundled
//! [`DebugServiceProvider`](crate::session::DebugServiceProvider), so
//! everything here sits *behind* the service boundary: the rest of the
//! crate only ever sees sized query replies.
//!
//! ## The Translation Problem
//!
//! A captured address like `0x55f3a2b4c780` is a runtime address. Debug
//! information stores linked addresses. Modern executables are PIE
//! (position independent), so ASLR gives the image a new base on every
//! run and the two address spaces disagree by a constant:
//!
//! ```text
//! linked address = runtime address - runtime base + link base
//!
//! runtime base: lowest mapping of the image in /proc/<pid>/maps
//! link base:    lowest file-backed segment address in the ELF headers
//! ```
//!
//! ## Resolution Strategy
//!
//! 1. Translate the runtime address (reject addresses outside the
//!    image's mapped range)
//! 2. Ask DWARF via `addr2line` for the most specific inlined frame -
//!    this knows about inlining and yields file/line attribution
//! 3. If DWARF has no name, fall back to the nearest preceding ELF
//!    symbol table entry and demangle it with `rustc-demangle`
//!
//! DWARF requires the binary to be built with debug info:
//!
//! ```toml
//! [profile.release]
//! debug = true
//! ```
//!
//! Without it, names still resolve through the symbol table fallback but
//! file/line attribution comes back empty.
//!
//! ## Module Structure
//!
//! - **`provider`**: [`PlatformDebugProvider`], the bundled
//!   `DebugServiceProvider` (worker-thread image loading, bounded attach
//!   waits, sized query replies)
//! - **`image`**: the loaded debug image (DWARF context, sorted symbol
//!   table, address translation)
//! - **`memory_maps`**: `/proc/<pid>/maps` parsing for the runtime range
//!
//! The whole stack is Linux-only. Other platforms get a stub provider
//! whose `connect` fails, which the session layer converts into sentinel
//! answers - programs still capture, compare and hash traces there, they
//! just cannot symbolicate them.

#[cfg(target_os = "linux")]
mod image;
#[cfg(target_os = "linux")]
pub mod memory_maps;
#[cfg(target_os = "linux")]
pub mod provider;

#[cfg(target_os = "linux")]
pub use memory_maps::MemoryRange;
#[cfg(target_os = "linux")]
pub use provider::PlatformDebugProvider;

#[cfg(not(target_os = "linux"))]
mod stub {
    use crate::domain::ServiceError;
    use crate::session::{DebugService, DebugServiceProvider};

    /// Stand-in provider for platforms without a bundled debug service
    ///
    /// `connect` always fails, so sessions built on it stay absent and
    /// every frame query answers with sentinels.
    #[derive(Debug, Clone, Default)]
    pub struct PlatformDebugProvider;

    impl PlatformDebugProvider {
        #[must_use]
        pub fn new() -> Self {
            PlatformDebugProvider
        }
    }

    impl DebugServiceProvider for PlatformDebugProvider {
        fn connect(&self) -> Result<Box<dyn DebugService>, ServiceError> {
            Err(ServiceError::Unsupported {
                os: std::env::consts::OS,
            })
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub use stub::PlatformDebugProvider;
