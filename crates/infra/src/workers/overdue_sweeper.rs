use std::io;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use tourdesk_events::EventBus;

use crate::config::EngineConfig;
use crate::invoice_service::{InvoiceEnvelope, InvoiceService};
use crate::invoice_store::InvoiceStore;

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(|j| j.is_finished())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweeperConfig {
    pub interval: Duration,
    /// Sweep once right after start instead of waiting a full interval.
    pub run_immediately: bool,
}

impl SweeperConfig {
    pub fn from_engine(config: &EngineConfig) -> Self {
        Self {
            interval: config.overdue_sweep_interval,
            run_immediately: true,
        }
    }
}

/// Periodically moves past-due invoices to OVERDUE.
///
/// - "today" comes from the service's clock on every tick
/// - sweep failures are logged and retried on the next tick
/// - supports graceful shutdown
#[derive(Debug)]
pub struct OverdueSweeper;

impl OverdueSweeper {
    pub fn spawn<S, B>(service: Arc<InvoiceService<S, B>>, config: SweeperConfig) -> io::Result<WorkerHandle>
    where
        S: InvoiceStore + 'static,
        B: EventBus<InvoiceEnvelope> + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let join = thread::Builder::new()
            .name("overdue-sweeper".to_string())
            .spawn(move || sweeper_loop(&service, config, shutdown_rx))?;

        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

fn sweeper_loop<S, B>(service: &InvoiceService<S, B>, config: SweeperConfig, shutdown_rx: mpsc::Receiver<()>)
where
    S: InvoiceStore,
    B: EventBus<InvoiceEnvelope>,
{
    info!(interval_secs = config.interval.as_secs(), "overdue sweeper started");

    if config.run_immediately {
        sweep(service);
    }

    loop {
        // Waiting on the shutdown channel doubles as the tick timer.
        match shutdown_rx.recv_timeout(config.interval) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => sweep(service),
        }
    }

    info!("overdue sweeper stopped");
}

fn sweep<S, B>(service: &InvoiceService<S, B>)
where
    S: InvoiceStore,
    B: EventBus<InvoiceEnvelope>,
{
    let today = service.clock().today();
    match service.check_overdue_invoices(today) {
        Ok(transitioned) => debug!(%today, transitioned = transitioned.len(), "overdue sweep tick"),
        Err(err) => warn!(%today, error = %err, "overdue sweep failed"),
    }
}
