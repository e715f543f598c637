//! Infrastructure layer: storage, numbering, delivery, export, config and the
//! invoice service that composes them.

pub mod config;
pub mod delivery;
pub mod export;
pub mod invoice_service;
pub mod invoice_store;
pub mod numbering;
pub mod workers;

#[cfg(test)]
mod integration_tests;

pub use config::EngineConfig;
pub use delivery::{Delivery, DeliveryError, DeliveryMessage, DeliveryReceipt, InMemoryOutbox};
pub use export::{DataExporter, ExportError, ExportFormat, ExportPayload, Exporter};
pub use invoice_service::{
    DeliveryOptions, InvoiceEnvelope, InvoiceService, NewInvoice, RefundInput, ReminderInput,
    ServiceError,
};
pub use invoice_store::{InMemoryInvoiceStore, InvoiceStore, StoreError};
pub use numbering::{InMemoryInvoiceNumberSequence, InvoiceNumberSequence, SequenceError};
pub use workers::{OverdueSweeper, SweeperConfig, WorkerHandle};
