//! Post-run notification and reporting.
//!
//! - [`email`]: multipart summary email over SMTP.
//! - [`report`]: summary log lines and a preview of the ledger.

pub mod email;
pub mod report;

pub use email::{EmailConfig, EmailDelivery, EmailError, SummaryEmail};
pub use report::{log_summary, render_preview, PREVIEW_ROWS};
