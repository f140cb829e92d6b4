//! # Stackline - Stack Capture with Lazy Symbolication
//!
//! Stackline records the current call stack as raw return addresses and
//! defers everything expensive - attaching a debug service, loading
//! debug information, resolving names - until a frame is actually asked
//! about. Captures are cheap enough for logging and crash paths; symbol
//! resolution is best-effort and can never fail a caller.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Calling Program                          │
//! │          (panic hook, crash reporter, log formatter)            │
//! └─────────────┬──────────────────────────────┬────────────────────┘
//!               │ capture (hot path)           │ queries (cold path)
//!               ▼                              ▼
//! ┌──────────────────────────┐   ┌─────────────────────────────────┐
//! │         capture          │   │            session              │
//! │  • StackWalker seam      │   │  • DebugSession (lazy attach,   │
//! │  • RawTrace (owned)      │   │    memoized outcome, sentinel   │
//! │  • FrameArena (borrowed) │   │    answers)                     │
//! │  • fingerprint           │   │  • SessionCache (per pid)       │
//! └────────────┬─────────────┘   └───────────────┬─────────────────┘
//!              │                                 │ sized queries
//!              │ raw addresses                   ▼
//!              │                 ┌─────────────────────────────────┐
//!              └────────────────▶│         symbolization           │
//!                                │  • PlatformDebugProvider        │
//!                                │  • DWARF via addr2line/gimli    │
//!                                │  • ELF symbol table fallback    │
//!                                │  • /proc/<pid>/maps (ASLR)      │
//!                                └─────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`capture`]: stack walking and raw frame storage
//!   - `walker`: the [`StackWalker`] seam and the bundled
//!     `backtrace`-based walker
//!   - `store`: owned [`RawTrace`] and borrowed [`FrameArena`] storage,
//!     plus comparison/ordering over raw frames
//!
//! - [`session`]: the lazy symbolication lifecycle
//!   - `service`: the [`DebugService`] boundary and its sized-buffer
//!     calling convention
//!   - `session`: [`DebugSession`], attach-once with memoized outcome
//!   - `cache`: [`SessionCache`], sharing sessions per process
//!
//! - [`symbolization`]: the bundled Linux debug service
//!   - DWARF resolution via `addr2line`, ELF parsing via `object`,
//!     PIE/ASLR address translation via `/proc/<pid>/maps`
//!
//! - [`domain`]: core newtypes ([`RawAddress`], [`Pid`],
//!   [`Fingerprint`]) and the service error type
//!
//! ## Key Concepts
//!
//! - **Capture / resolve decoupling**: capturing touches nothing but the
//!   stack walker; comparison, ordering and hashing work on raw
//!   addresses alone and stay available with no debug service at all
//! - **Lazy, memoized attach**: the first frame query pays the attach
//!   cost once per session; a failed attach is remembered and never
//!   retried within that session
//! - **Total queries**: frame queries return `""` / `0` sentinels for
//!   anything unresolvable - out-of-range indexes, absent services,
//!   addresses the image does not cover - and never raise errors
//! - **PIE/ASLR**: runtime addresses are translated back to linked
//!   addresses before the debug info is consulted
//!
//! ## Typical Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use stackline::{capture, AttachOptions, CaptureOptions};
//! use stackline::{PlatformDebugProvider, SessionCache};
//!
//! // Hot path: record raw addresses, nothing else.
//! let captured = capture(CaptureOptions::default());
//!
//! // Cold path: resolve on demand through a shared session.
//! let cache = SessionCache::new(
//!     Arc::new(PlatformDebugProvider::new()),
//!     AttachOptions::default(),
//! );
//! let session = cache.current_process_session();
//! for frame in 0..captured.trace.frame_count() {
//!     let name = session.frame_name(captured.trace.frames(), frame);
//!     let file = session.frame_source_file(captured.trace.frames(), frame);
//!     let line = session.frame_source_line(captured.trace.frames(), frame);
//!     println!("#{frame} {name} at {file}:{line}");
//! }
//! ```

pub mod capture;
pub mod domain;
pub mod session;
pub mod symbolization;

// Re-export the primary surface for convenience
pub use capture::{
    capture, capture_into, capture_into_with, capture_with, compare_frames, BacktraceWalker,
    CaptureOptions, CaptureReport, Captured, FrameArena, RawTrace, StackWalker, WalkReport,
};
pub use domain::{Fingerprint, Pid, RawAddress, ServiceError};
pub use session::{
    AttachOptions, DebugService, DebugServiceProvider, DebugSession, QueryReply, SessionCache,
};
pub use symbolization::PlatformDebugProvider;
