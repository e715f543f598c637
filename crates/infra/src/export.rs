//! Export of invoices and summaries to downloadable formats.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tourdesk_core::money::round_money;
use tourdesk_invoicing::Invoice;
use tourdesk_reporting::InvoiceSummary;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportFormat {
    Pdf,
    Csv,
    Excel,
    Json,
}

impl core::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            ExportFormat::Pdf => "PDF",
            ExportFormat::Csv => "CSV",
            ExportFormat::Excel => "EXCEL",
            ExportFormat::Json => "JSON",
        };
        f.write_str(s)
    }
}

/// A fully-formed document handed to an exporter.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ExportPayload {
    Invoices(Vec<Invoice>),
    Summary(InvoiceSummary),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export format {0} is not supported by this exporter")]
    UnsupportedFormat(ExportFormat),

    #[error("export serialization failed: {0}")]
    Serialization(String),
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        ExportError::Serialization(err.to_string())
    }
}

/// Turns a payload into the bytes of a document in the requested format.
pub trait Exporter: Send + Sync {
    fn export(&self, payload: &ExportPayload, format: ExportFormat) -> Result<Vec<u8>, ExportError>;
}

impl<E> Exporter for Arc<E>
where
    E: Exporter + ?Sized,
{
    fn export(&self, payload: &ExportPayload, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
        (**self).export(payload, format)
    }
}

/// Data-oriented exporter: JSON and CSV. Document formats (PDF, Excel) are
/// provided by dedicated rendering services.
#[derive(Debug, Default, Clone, Copy)]
pub struct DataExporter;

impl Exporter for DataExporter {
    fn export(&self, payload: &ExportPayload, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
        match format {
            ExportFormat::Json => serde_json::to_vec_pretty(payload)
                .map_err(|e| ExportError::Serialization(e.to_string())),
            ExportFormat::Csv => match payload {
                ExportPayload::Invoices(invoices) => invoices_csv(invoices),
                ExportPayload::Summary(summary) => summary_csv(summary),
            },
            ExportFormat::Pdf | ExportFormat::Excel => Err(ExportError::UnsupportedFormat(format)),
        }
    }
}

const INVOICE_COLUMNS: [&str; 15] = [
    "invoice_number",
    "status",
    "issue_date",
    "due_date",
    "recipient_name",
    "recipient_email",
    "customer_id",
    "booking_id",
    "currency",
    "subtotal",
    "total_tax",
    "discount_amount",
    "total_amount",
    "paid_amount",
    "outstanding_amount",
];

fn invoices_csv(invoices: &[Invoice]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(INVOICE_COLUMNS)?;

    for invoice in invoices {
        writer.write_record([
            invoice
                .invoice_number()
                .map(|n| n.to_string())
                .unwrap_or_default(),
            invoice.status().to_string(),
            invoice.issue_date().to_string(),
            invoice.due_date().to_string(),
            invoice.recipient().name.clone(),
            invoice.recipient().email.clone(),
            invoice.customer_id().unwrap_or_default().to_string(),
            invoice.booking_id().unwrap_or_default().to_string(),
            invoice.currency().to_string(),
            money(invoice.subtotal()),
            money(invoice.total_tax()),
            money(invoice.discount_amount()),
            money(invoice.total_amount()),
            money(invoice.paid_amount()),
            money(invoice.outstanding_amount()),
        ])?;
    }
    finish(writer)
}

/// Two tables in one document: the metrics as `metric,value` rows, then the
/// tax breakdown under its own header row.
fn summary_csv(summary: &InvoiceSummary) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    writer.write_record(["metric", "value"])?;

    let counts = [
        ("period_start", summary.range.start().to_string()),
        ("period_end", summary.range.end().to_string()),
        ("invoice_count", summary.invoice_count.to_string()),
        ("draft", summary.by_status.draft.to_string()),
        ("sent", summary.by_status.sent.to_string()),
        ("paid", summary.by_status.paid.to_string()),
        ("overdue", summary.by_status.overdue.to_string()),
        ("cancelled", summary.by_status.cancelled.to_string()),
        ("refunded", summary.by_status.refunded.to_string()),
        ("subtotal", money(summary.subtotal)),
        ("total_tax", money(summary.total_tax)),
        ("total_discount", money(summary.total_discount)),
        ("total_invoiced", money(summary.total_invoiced)),
        ("total_paid", money(summary.total_paid)),
        ("total_refunded", money(summary.total_refunded)),
        ("total_outstanding", money(summary.total_outstanding)),
        ("overdue_amount", money(summary.overdue_amount)),
    ];
    for (metric, value) in &counts {
        writer.write_record([*metric, value.as_str()])?;
    }

    writer.write_record(["tax_rate", "net_amount", "tax_amount", "gross_amount", "line_count"])?;
    for row in &summary.tax_breakdown {
        writer.write_record([
            row.rate.to_string(),
            money(row.net_amount),
            money(row.tax_amount),
            money(row.gross_amount),
            row.line_count.to_string(),
        ])?;
    }
    finish(writer)
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, ExportError> {
    writer
        .into_inner()
        .map_err(|e| ExportError::Serialization(e.to_string()))
}

fn money(amount: rust_decimal::Decimal) -> String {
    format!("{:.2}", round_money(amount))
}
