//! Cyber resilience scorecard report service.
//!
//! Accepts an assessment result over HTTP, renders it into a PDF report, and
//! emails the PDF to the submitter. The layout engine lives in
//! [`scorecard`]; HTTP routing, configuration, and SMTP dispatch are thin
//! collaborators around it.

pub mod config;
pub mod error;
pub mod mail;
pub mod routes;
pub mod scorecard;
pub mod telemetry;
