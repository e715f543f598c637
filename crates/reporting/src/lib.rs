//! Invoice reporting: named report periods and invoice summaries.
//!
//! Pure computations over already-loaded invoices; no IO.

pub mod period;
pub mod summary;

pub use period::{PeriodError, ReportPeriod};
pub use summary::{InvoiceSummary, StatusCounts, TaxBreakdown};
