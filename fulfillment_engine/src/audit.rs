//! Best-effort audit trail for purchase and settlement outcomes.
//!
//! Every notable outcome is recorded twice: as an `audit_events` row for reconciliation queries,
//! and as a structured JSON log line for operators tailing the logs. Audit failures must never
//! fail the operation being audited, so errors here are logged and swallowed.

use log::*;

use crate::{db_types::NewAuditEvent, traits::FulfillmentGatewayDatabase};

pub async fn record<B: FulfillmentGatewayDatabase>(db: &B, event: NewAuditEvent) {
    match serde_json::to_string(&event) {
        Ok(line) => info!("🧾️ {line}"),
        Err(e) => warn!("🧾️ Could not serialize an audit event for logging: {e}"),
    }
    if let Err(e) = db.record_audit_event(event).await {
        error!("🧾️ Could not write an audit event to the database: {e}");
    }
}
