//! Bundled debug-service provider for the current process
//!
//! [`PlatformDebugProvider`] implements the service boundary on top of
//! the crate's own symbolication stack: DWARF via `addr2line`/`gimli`,
//! ELF parsing via `object`, `/proc` for the runtime memory layout. The
//! attach is non-invasive in the strictest sense - nothing in the target
//! is suspended or modified; the service only reads the image file and
//! the process's maps. Loading happens on a worker thread so the attach
//! wait can be bounded and abandoned.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use log::{debug, warn};

use super::image::LoadedImage;
use crate::domain::{Pid, RawAddress, ServiceError};
use crate::session::{DebugService, DebugServiceProvider, QueryReply};

/// Provider handing out services that symbolicate the calling process
///
/// By default the image is the running executable (`/proc/self/exe`); an
/// explicit path supports split-debug layouts and tests.
#[derive(Debug, Clone, Default)]
pub struct PlatformDebugProvider {
    image_path: Option<PathBuf>,
}

impl PlatformDebugProvider {
    /// Provider resolving against the running executable
    #[must_use]
    pub fn new() -> Self {
        PlatformDebugProvider::default()
    }

    /// Provider resolving against an explicit image file
    #[must_use]
    pub fn with_image_path(path: impl Into<PathBuf>) -> Self {
        PlatformDebugProvider {
            image_path: Some(path.into()),
        }
    }
}

impl DebugServiceProvider for PlatformDebugProvider {
    fn connect(&self) -> Result<Box<dyn DebugService>, ServiceError> {
        Ok(Box::new(PlatformDebugService {
            image_path: self.image_path.clone(),
            state: AttachState::Created,
        }))
    }
}

enum AttachState {
    /// Fresh service; no attach started
    Created,
    /// Image load running on a worker thread
    Loading(Receiver<Result<LoadedImage, ServiceError>>),
    /// Attach completed; queries can be answered
    Ready(Box<LoadedImage>),
    /// Attach failed or was abandoned
    Failed,
}

struct PlatformDebugService {
    image_path: Option<PathBuf>,
    state: AttachState,
}

impl PlatformDebugService {
    fn image(&self) -> Option<&LoadedImage> {
        match &self.state {
            AttachState::Ready(image) => Some(image.as_ref()),
            _ => None,
        }
    }
}

impl DebugService for PlatformDebugService {
    fn attach_noninvasive(&mut self, pid: Pid) -> Result<(), ServiceError> {
        let current = Pid::current();
        if pid != current {
            self.state = AttachState::Failed;
            return Err(ServiceError::ForeignProcess {
                requested: pid,
                current,
            });
        }

        let image_path = match &self.image_path {
            Some(path) => path.clone(),
            None => std::env::current_exe()?,
        };

        debug!("Starting image load for {pid}: {}", image_path.display());
        let (sender, receiver) = bounded(1);
        // Detached worker: the receiver, not the join handle, carries
        // the result.
        let _ = thread::Builder::new()
            .name("stackline-image-load".into())
            .spawn(move || {
                let outcome = LoadedImage::load(pid, &image_path)
                    .map_err(|error| ServiceError::ImageLoad(format!("{error:#}")));
                // The waiter may have abandoned the attach; a closed
                // channel just drops the loaded image.
                let _ = sender.send(outcome);
            })?;

        self.state = AttachState::Loading(receiver);
        Ok(())
    }

    fn wait_for_attach(&mut self, timeout: Duration) -> Result<(), ServiceError> {
        let AttachState::Loading(receiver) = &self.state else {
            return Err(ServiceError::NotAttached);
        };

        match receiver.recv_timeout(timeout) {
            Ok(Ok(image)) => {
                self.state = AttachState::Ready(Box::new(image));
                Ok(())
            }
            Ok(Err(error)) => {
                warn!("Image load failed: {error}");
                self.state = AttachState::Failed;
                Err(error)
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!("Image load did not finish within {timeout:?}");
                self.state = AttachState::Failed;
                Err(ServiceError::AttachTimedOut { timeout })
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.state = AttachState::Failed;
                Err(ServiceError::AttachAborted)
            }
        }
    }

    fn name_by_address(&mut self, address: RawAddress, buf: &mut [u8]) -> QueryReply {
        let Some(image) = self.image() else {
            return QueryReply::not_found();
        };
        match image.name_at(address) {
            Some(name) => write_text(&name, buf),
            None => QueryReply::not_found(),
        }
    }

    fn line_by_address(
        &mut self,
        address: RawAddress,
        line_out: Option<&mut u32>,
        file_buf: Option<&mut [u8]>,
    ) -> QueryReply {
        let Some(image) = self.image() else {
            return QueryReply::not_found();
        };
        let position = image.source_at(address);

        let mut reply = QueryReply::produced(0);
        if let Some(line_out) = line_out {
            match position.line {
                Some(line) => *line_out = line,
                None => return QueryReply::not_found(),
            }
        }
        if let Some(file_buf) = file_buf {
            match position.file.as_deref() {
                Some(file) => reply = write_text(file, file_buf),
                None => return QueryReply::not_found(),
            }
        }
        reply
    }
}

/// Render `text` through the sized-reply convention
///
/// Succeeds only when the whole text fits; otherwise reports the size a
/// retry buffer needs.
fn write_text(text: &str, buf: &mut [u8]) -> QueryReply {
    let bytes = text.as_bytes();
    if bytes.len() > buf.len() {
        return QueryReply::too_small(bytes.len());
    }
    buf[..bytes.len()].copy_from_slice(bytes);
    QueryReply::produced(bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_text_fits() {
        let mut buf = [0u8; 16];
        let reply = write_text("hello", &mut buf);
        assert_eq!(reply, QueryReply::produced(5));
        assert_eq!(&buf[..5], b"hello");
    }

    #[test]
    fn test_write_text_exact_fit() {
        let mut buf = [0u8; 5];
        assert_eq!(write_text("hello", &mut buf), QueryReply::produced(5));
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn test_write_text_reports_required_size() {
        let mut buf = [0u8; 4];
        let reply = write_text("a longer name", &mut buf);
        assert_eq!(reply, QueryReply::too_small(13));
    }

    #[test]
    fn test_wait_without_attach_is_rejected() {
        let provider = PlatformDebugProvider::new();
        let mut service = provider.connect().expect("connect");
        let result = service.wait_for_attach(Duration::from_millis(10));
        assert!(matches!(result, Err(ServiceError::NotAttached)));
    }

    #[test]
    fn test_foreign_process_is_refused() {
        let provider = PlatformDebugProvider::new();
        let mut service = provider.connect().expect("connect");
        let foreign = Pid(Pid::current().0.wrapping_add(1));
        let result = service.attach_noninvasive(foreign);
        assert!(matches!(result, Err(ServiceError::ForeignProcess { .. })));

        // A refused attach leaves the service unusable, not crashed.
        let mut buf = [0u8; 8];
        let reply = service.name_by_address(RawAddress(0x10), &mut buf);
        assert_eq!(reply, QueryReply::not_found());
    }

    #[test]
    fn test_attach_to_self_completes() {
        let provider = PlatformDebugProvider::new();
        let mut service = provider.connect().expect("connect");
        service
            .attach_noninvasive(Pid::current())
            .expect("attach should start");
        service
            .wait_for_attach(Duration::from_secs(30))
            .expect("attach should complete");
    }

    #[test]
    fn test_missing_image_fails_the_wait() {
        let provider = PlatformDebugProvider::with_image_path("/nonexistent/image");
        let mut service = provider.connect().expect("connect");
        service
            .attach_noninvasive(Pid::current())
            .expect("attach should start");
        let result = service.wait_for_attach(Duration::from_secs(30));
        assert!(matches!(result, Err(ServiceError::ImageLoad(_))));
    }
}
