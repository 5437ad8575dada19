//! Copy a revealed secret to the clipboard and wipe it after a delay.
//!
//! The wipe runs on a background thread. A newer copy supersedes any
//! pending wipe (generation counter), and the clipboard is only cleared
//! if it still holds the text we put there.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use zeroize::{Zeroize, Zeroizing};

use crate::audit::{AuditAction, AuditEntry, AuditSink};
use crate::errors::{Result, VaultError};

/// A place text can be copied to.
pub trait ClipboardBackend: Send + 'static {
    fn set_text(&mut self, text: &str) -> Result<()>;
    fn get_text(&mut self) -> Result<String>;
    fn clear(&mut self) -> Result<()>;
}

/// The OS clipboard via `arboard`.
pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

impl SystemClipboard {
    pub fn new() -> Result<Self> {
        let inner = arboard::Clipboard::new().map_err(|e| VaultError::Clipboard(e.to_string()))?;
        Ok(Self { inner })
    }
}

impl ClipboardBackend for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        self.inner
            .set_text(text.to_owned())
            .map_err(|e| VaultError::Clipboard(e.to_string()))
    }

    fn get_text(&mut self) -> Result<String> {
        self.inner
            .get_text()
            .map_err(|e| VaultError::Clipboard(e.to_string()))
    }

    fn clear(&mut self) -> Result<()> {
        self.inner
            .clear()
            .map_err(|e| VaultError::Clipboard(e.to_string()))
    }
}

/// Clipboard wrapper that schedules a wipe after every copy.
pub struct AutoClearClipboard<B: ClipboardBackend> {
    backend: Arc<Mutex<B>>,
    generation: Arc<AtomicU64>,
    delay: Duration,
    audit: Arc<dyn AuditSink>,
}

impl<B: ClipboardBackend> AutoClearClipboard<B> {
    pub fn new(backend: B, delay: Duration, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            backend: Arc::new(Mutex::new(backend)),
            generation: Arc::new(AtomicU64::new(0)),
            delay,
            audit,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Put `text` on the clipboard and start the wipe timer.
    ///
    /// The returned handle finishes once the timer fires; callers that
    /// exit early (a CLI) should join it so the wipe actually happens.
    pub fn copy(&self, text: &str) -> Result<JoinHandle<()>> {
        lock(&self.backend).set_text(text)?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        self.audit.record(&AuditEntry::new(
            Utc::now(),
            AuditAction::CopyToClipboard,
            format!("len={} clear_in={}s", text.chars().count(), self.delay.as_secs()),
        ));

        let backend = Arc::clone(&self.backend);
        let current = Arc::clone(&self.generation);
        let audit = Arc::clone(&self.audit);
        let delay = self.delay;
        let expected = Zeroizing::new(text.to_owned());

        Ok(thread::spawn(move || {
            thread::sleep(delay);
            if current.load(Ordering::SeqCst) != generation {
                tracing::debug!(generation, "clipboard wipe superseded");
                return;
            }

            let mut backend = lock(&backend);
            let still_ours = backend
                .get_text()
                .map(|mut t| {
                    let same = t == *expected;
                    t.zeroize();
                    same
                })
                .unwrap_or(true);
            if !still_ours {
                tracing::debug!("clipboard changed since copy, leaving it alone");
                return;
            }

            match backend.clear() {
                Ok(()) => audit.record(&AuditEntry::new(Utc::now(), AuditAction::ClipboardCleared, "")),
                Err(e) => tracing::warn!(error = %e, "failed to clear clipboard"),
            }
        }))
    }
}

fn lock<B>(backend: &Mutex<B>) -> std::sync::MutexGuard<'_, B> {
    backend.lock().unwrap_or_else(|p| p.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;

    #[derive(Clone, Default)]
    struct MemoryClipboard {
        text: Arc<Mutex<Option<String>>>,
    }

    impl MemoryClipboard {
        fn contents(&self) -> Option<String> {
            self.text.lock().unwrap().clone()
        }
    }

    impl ClipboardBackend for MemoryClipboard {
        fn set_text(&mut self, text: &str) -> Result<()> {
            *self.text.lock().unwrap() = Some(text.to_string());
            Ok(())
        }

        fn get_text(&mut self) -> Result<String> {
            self.text
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| VaultError::Clipboard("empty".into()))
        }

        fn clear(&mut self) -> Result<()> {
            *self.text.lock().unwrap() = None;
            Ok(())
        }
    }

    #[test]
    fn copy_is_cleared_after_delay() {
        let board = MemoryClipboard::default();
        let audit = MemoryAuditSink::new();
        let clip = AutoClearClipboard::new(board.clone(), Duration::from_millis(20), Arc::new(audit.clone()));

        let handle = clip.copy("4111111111111111").unwrap();
        assert_eq!(board.contents().as_deref(), Some("4111111111111111"));

        handle.join().unwrap();
        assert_eq!(board.contents(), None);
        assert_eq!(audit.actions(), vec!["copy_to_clipboard", "clipboard_cleared"]);
        assert!(!audit.entries()[0].details.contains("4111"));
    }

    #[test]
    fn newer_copy_supersedes_pending_wipe() {
        let board = MemoryClipboard::default();
        let audit = MemoryAuditSink::new();
        let clip = AutoClearClipboard::new(board.clone(), Duration::from_millis(50), Arc::new(audit.clone()));

        let first = clip.copy("first").unwrap();
        let second = clip.copy("second").unwrap();
        first.join().unwrap();
        assert_eq!(board.contents().as_deref(), Some("second"));

        second.join().unwrap();
        assert_eq!(board.contents(), None);
    }

    #[test]
    fn foreign_contents_are_left_alone() {
        let mut board = MemoryClipboard::default();
        let clip = AutoClearClipboard::new(
            board.clone(),
            Duration::from_millis(20),
            Arc::new(MemoryAuditSink::new()),
        );

        let handle = clip.copy("secret").unwrap();
        board.set_text("something else").unwrap();
        handle.join().unwrap();
        assert_eq!(board.contents().as_deref(), Some("something else"));
    }
}
