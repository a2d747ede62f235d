//! Graceful shutdown handling
//!
//! A cloneable signal shared by the listener and every session task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Shutdown signal that can be cloned and shared across tasks
#[derive(Clone)]
pub struct ShutdownSignal {
    sender: broadcast::Sender<()>,
    triggered: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            sender,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    pub fn trigger(&self) {
        if !self.triggered.swap(true, Ordering::SeqCst) {
            info!("Shutdown signal triggered");
            let _ = self.sender.send(());
        }
    }

    /// Subscribe now, wait later. Resolves immediately if the signal
    /// was already triggered when awaited.
    pub fn notified(&self) -> ShutdownNotified {
        ShutdownNotified {
            receiver: self.sender.subscribe(),
            triggered: self.triggered.clone(),
        }
    }

    pub async fn wait(&self) {
        self.notified().wait().await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// A future that resolves when shutdown is triggered
pub struct ShutdownNotified {
    receiver: broadcast::Receiver<()>,
    triggered: Arc<AtomicBool>,
}

impl ShutdownNotified {
    pub async fn wait(mut self) {
        if self.triggered.load(Ordering::SeqCst) {
            return;
        }
        let _ = self.receiver.recv().await;
    }
}

/// Listen for OS shutdown signals (SIGTERM, SIGINT)
pub async fn listen_for_shutdown_signals(shutdown: ShutdownSignal) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                    _ = sigint.recv() => info!("Received SIGINT"),
                }
            }
            _ => {
                warn!("Failed to install unix signal handlers, falling back to Ctrl+C");
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!(error = %e, "Failed to listen for Ctrl+C");
                    return;
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            return;
        }
        info!("Received Ctrl+C");
    }

    shutdown.trigger();
}

/// Owns the process-wide signal and bounds how long cleanup may take.
pub struct ShutdownCoordinator {
    signal: ShutdownSignal,
    timeout: Duration,
}

impl ShutdownCoordinator {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            signal: ShutdownSignal::new(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn signal(&self) -> ShutdownSignal {
        self.signal.clone()
    }

    pub fn start_signal_listener(&self) {
        let signal = self.signal.clone();
        tokio::spawn(async move {
            listen_for_shutdown_signals(signal).await;
        });
    }

    /// Run `cleanup` after shutdown was triggered, giving up after the
    /// configured timeout. Returns `false` on timeout.
    pub async fn shutdown_with_cleanup<F, Fut>(&self, cleanup: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        self.signal.wait().await;
        info!(timeout_secs = self.timeout.as_secs(), "Starting graceful shutdown");

        match tokio::time::timeout(self.timeout, cleanup()).await {
            Ok(()) => {
                info!("Graceful shutdown completed");
                true
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Graceful shutdown timed out");
                false
            }
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(30)
    }
}
