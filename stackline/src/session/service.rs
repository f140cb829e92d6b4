//! Debug-service boundary
//!
//! A platform debug service is an external capability with a session
//! lifecycle (create, attach, wait, query, release) and a C-style sized
//! calling convention for text queries: call with a buffer, and if the
//! reply says the buffer was too small, call again with the size the
//! service reported. That convention belongs to the boundary, so it is
//! kept here and nowhere else - the `read_*` adapters below turn each
//! query into a single logical operation returning optional text, which
//! is what the rest of the crate consumes.

use std::time::Duration;

use crate::domain::{Pid, RawAddress, ServiceError};

/// First-call probe buffer size used by the query adapters
const PROBE_BUFFER_LEN: usize = 256;

/// Reply to a sized text query
///
/// On success `len` counts the bytes written to the buffer, all of the
/// produced text. On failure a non-zero `len` is the service's
/// retry-with-at-least-this-many-bytes hint, and zero means the address
/// could not be resolved at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryReply {
    pub ok: bool,
    pub len: usize,
}

impl QueryReply {
    /// Successful reply that produced `len` bytes
    #[must_use]
    pub fn produced(len: usize) -> Self {
        QueryReply { ok: true, len }
    }

    /// Failure carrying a required-size hint
    #[must_use]
    pub fn too_small(required: usize) -> Self {
        QueryReply {
            ok: false,
            len: required,
        }
    }

    /// Failure with nothing to offer
    #[must_use]
    pub fn not_found() -> Self {
        QueryReply { ok: false, len: 0 }
    }
}

/// Session-scoped interface to a platform debug service
///
/// One instance serves one attach lifecycle: [`attach_noninvasive`] starts
/// a non-suspending attach to a running process, [`wait_for_attach`]
/// blocks (bounded) until the service becomes usable, and the query
/// methods answer address lookups afterwards. Dropping the instance
/// releases whatever it acquired.
///
/// [`attach_noninvasive`]: DebugService::attach_noninvasive
/// [`wait_for_attach`]: DebugService::wait_for_attach
pub trait DebugService: Send {
    /// Start a non-invasive attach to `pid`
    ///
    /// # Errors
    /// Fails when the service cannot target `pid` at all (unsupported
    /// process, missing platform support, unreadable image).
    fn attach_noninvasive(&mut self, pid: Pid) -> Result<(), ServiceError>;

    /// Wait for the attach started by [`DebugService::attach_noninvasive`]
    ///
    /// # Errors
    /// Fails when no attach is in flight, the attach completed
    /// unsuccessfully, or `timeout` expired first. An expired wait
    /// abandons the attach; the service will not become usable later.
    fn wait_for_attach(&mut self, timeout: Duration) -> Result<(), ServiceError>;

    /// Write the symbol name at `address` into `buf` (sized convention)
    fn name_by_address(&mut self, address: RawAddress, buf: &mut [u8]) -> QueryReply;

    /// Write the source position of `address` into whichever outputs the
    /// caller requested; the file buffer follows the sized convention
    fn line_by_address(
        &mut self,
        address: RawAddress,
        line_out: Option<&mut u32>,
        file_buf: Option<&mut [u8]>,
    ) -> QueryReply;
}

/// Factory for debug services
///
/// The injectable seam that stands in for process-global service state:
/// sessions hold a provider and connect through it at most once, tests
/// provide scripted services, and platforms without a real service
/// provide one whose `connect` always fails.
pub trait DebugServiceProvider: Send + Sync {
    /// Create a fresh, unattached service instance
    ///
    /// # Errors
    /// Fails when services cannot be created on this platform.
    fn connect(&self) -> Result<Box<dyn DebugService>, ServiceError>;
}

/// Resolve the symbol name at `address` as one logical operation
///
/// Probes with a fixed buffer and retries exactly once, with a buffer of
/// exactly the required size, if the service asks for more room. Text
/// counts only when the reply says success: a failing reply yields `None`
/// even if the service scribbled bytes into the buffer.
pub(crate) fn read_name(service: &mut dyn DebugService, address: RawAddress) -> Option<String> {
    let mut probe = [0u8; PROBE_BUFFER_LEN];
    let reply = service.name_by_address(address, &mut probe);
    if reply.ok {
        return text_from(&probe, reply.len);
    }
    if reply.len > 0 {
        let mut sized = vec![0u8; reply.len];
        let retry = service.name_by_address(address, &mut sized);
        if retry.ok {
            return text_from(&sized, retry.len);
        }
    }
    None
}

/// Resolve the source file path at `address` as one logical operation
pub(crate) fn read_source_file(
    service: &mut dyn DebugService,
    address: RawAddress,
) -> Option<String> {
    let mut probe = [0u8; PROBE_BUFFER_LEN];
    let reply = service.line_by_address(address, None, Some(&mut probe));
    if reply.ok {
        return text_from(&probe, reply.len);
    }
    if reply.len > 0 {
        let mut sized = vec![0u8; reply.len];
        let retry = service.line_by_address(address, None, Some(&mut sized));
        if retry.ok {
            return text_from(&sized, retry.len);
        }
    }
    None
}

/// Resolve the source line number at `address`
///
/// Numeric output needs no probe/retry dance; the reply status alone
/// decides whether the written value counts.
pub(crate) fn read_source_line(service: &mut dyn DebugService, address: RawAddress) -> Option<u32> {
    let mut line = 0u32;
    let reply = service.line_by_address(address, Some(&mut line), None);
    reply.ok.then_some(line)
}

/// Decode the leading `len` bytes of a reply buffer
fn text_from(buf: &[u8], len: usize) -> Option<String> {
    let text = &buf[..len.min(buf.len())];
    if text.is_empty() {
        return None;
    }
    Some(String::from_utf8_lossy(text).into_owned())
}
