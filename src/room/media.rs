use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Local microphone/camera stream published into the room
///
/// The session monitor acquires it while connecting and must release it on
/// every path into `terminated`, including a leave that interrupts connect.
#[async_trait::async_trait]
pub trait LocalMedia: Send + Sync {
    /// Start capturing
    async fn acquire(&mut self) -> Result<()>;

    /// Stop capturing; a no-op when nothing is held
    async fn release(&mut self) -> Result<()>;

    fn is_active(&self) -> bool;

    /// Name for logging
    fn name(&self) -> &str;
}

/// Media handle for headless sessions where capture happens elsewhere.
///
/// Tracks acquire/release so callers can assert the stream is not leaked.
#[derive(Debug, Clone, Default)]
pub struct DetachedMedia {
    active: Arc<AtomicBool>,
}

impl DetachedMedia {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared flag observers can read after the handle moves into a monitor
    pub fn activity(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.active)
    }
}

#[async_trait::async_trait]
impl LocalMedia for DetachedMedia {
    async fn acquire(&mut self) -> Result<()> {
        if !self.active.swap(true, Ordering::SeqCst) {
            info!("Local media acquired (detached)");
        }
        Ok(())
    }

    async fn release(&mut self) -> Result<()> {
        if self.active.swap(false, Ordering::SeqCst) {
            info!("Local media released (detached)");
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "detached"
    }
}
