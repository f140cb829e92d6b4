//! # Symbol Sessions and the Debug-Service Boundary
//!
//! Capturing a stack records raw addresses; turning an address into a
//! function name needs a **debug service** - a platform facility that can
//! inspect a running process's image and debug information. This module
//! owns everything about that relationship:
//!
//! - **`service`**: the [`DebugService`] / [`DebugServiceProvider`]
//!   traits that abstract the platform facility, plus the adapters that
//!   hide its sized-buffer calling convention
//! - **`session`**: [`DebugSession`], the lazy, memoized, fault-tolerant
//!   wrapper the rest of the crate queries
//! - **`cache`**: [`SessionCache`], sharing sessions per process so the
//!   attach cost is paid once
//!
//! ## Why sessions are lazy
//!
//! Attaching a debug service loads the process image and parses its debug
//! information - easily tens of milliseconds. Captures happen in hot
//! paths; most captured traces are never displayed. Deferring the attach
//! to the first query means programs that only capture, compare and
//! discard traces never pay it at all.
//!
//! ## Why queries cannot fail
//!
//! Frame queries return plain values: a name or `""`, a path or `""`, a
//! line or `0`. There is no error channel on purpose. The callers that
//! want symbol text - panic hooks, crash reporters, log formatters - run
//! at the worst possible moments, and a symbolication failure must
//! degrade the output, never the program. All the ways a service can
//! fail (unsupported platform, unloadable image, expired attach wait)
//! collapse into the session being *absent*, which every query answers
//! with sentinels.

pub mod cache;
pub mod service;
pub mod session;

pub use cache::SessionCache;
pub use service::{DebugService, DebugServiceProvider, QueryReply};
pub use session::{AttachOptions, DebugSession};
