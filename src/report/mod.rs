//! Interview report readiness
//!
//! - `view`: session record and report interpretation
//! - `client`: report endpoint access
//! - `poller`: bounded, cancellable polling until the report is final

mod client;
mod poller;
mod view;

pub use client::{HttpReportClient, ReportSource};
pub use poller::{PollPolicy, PollResult, Readiness, ReportPoller};
pub use view::{InterviewSummary, ReportView, SessionRecord};
