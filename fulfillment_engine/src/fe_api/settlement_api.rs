use std::fmt::{Debug, Display};

use log::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sfg_common::Credits;

use crate::{
    audit,
    config::{SettlementStatus, WebhookConfig},
    db_types::{AuditEventType, NewAuditEvent, NewWalletTopup, TopupSettlement, TopupStatus, WalletTopup},
    events::{EventProducers, TopupCreditedEvent},
    fe_api::errors::SettlementApiError,
    helpers::verify_webhook_signature,
    traits::FulfillmentGatewayDatabase,
};

//--------------------------------------  TopupNotification  -----------------------------------------------------------

/// One inbound settlement notification, as decoded by the HTTP adapter.
///
/// Gateways deliver these at least once; redelivery of the same `external_ref` is normal and
/// harmless.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopupNotification {
    /// The gateway's payment identifier. This is the idempotency key for the settlement.
    pub external_ref: String,
    /// The gateway's status string, in whatever vocabulary it speaks.
    pub status: String,
    pub amount: Credits,
    pub account_id: i64,
    /// Name of the sending gateway, used to pick a status vocabulary override.
    #[serde(default)]
    pub gateway: Option<String>,
}

//--------------------------------------     WebhookAck      -----------------------------------------------------------

/// What actually happened to a notification. Every outcome is an acknowledgement; none of them
/// should make the gateway retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WebhookOutcome {
    /// The top-up was settled and the account credited by this delivery.
    Credited,
    /// An earlier delivery already settled this reference. No-op.
    Duplicate,
    /// The gateway reported failure and the top-up was marked `failed`. No ledger mutation.
    MarkedFailed,
    /// The gateway has not decided yet. No-op.
    Pending,
    /// No top-up is registered under this reference. No-op, audit-logged.
    Unknown,
    /// The notification names an account that does not own the top-up. No-op, audit-logged.
    Discarded,
}

impl Display for WebhookOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WebhookOutcome::Credited => write!(f, "credited"),
            WebhookOutcome::Duplicate => write!(f, "duplicate"),
            WebhookOutcome::MarkedFailed => write!(f, "marked-failed"),
            WebhookOutcome::Pending => write!(f, "pending"),
            WebhookOutcome::Unknown => write!(f, "unknown"),
            WebhookOutcome::Discarded => write!(f, "discarded"),
        }
    }
}

/// The response body for a webhook call. `acknowledged` is always `true`: whatever the outcome,
/// the notification has been dealt with and the gateway must stop retrying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub acknowledged: bool,
    pub outcome: WebhookOutcome,
}

impl WebhookAck {
    pub fn new(outcome: WebhookOutcome) -> Self {
        Self { acknowledged: true, outcome }
    }
}

//--------------------------------------    SettlementApi    -----------------------------------------------------------

/// `SettlementApi` reconciles payment-gateway notifications against pending wallet top-ups.
///
/// It is the only component that credits balances from the outside world, and it only ever
/// credits: a gateway reporting failure or anything unexpected leaves the ledger alone. The
/// settlement claim and the credit run in one database transaction, so delivering the same
/// notification any number of times, concurrently or not, credits the account exactly once.
pub struct SettlementApi<B> {
    db: B,
    config: WebhookConfig,
    producers: EventProducers,
}

impl<B> Debug for SettlementApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi")
    }
}

impl<B> SettlementApi<B> {
    pub fn new(db: B, config: WebhookConfig, producers: EventProducers) -> Self {
        Self { db, config, producers }
    }

    /// Checks a webhook signature header against the raw request body, honouring the
    /// configuration switch. The HTTP adapter must call this before [`Self::reconcile_webhook`]
    /// and reject the request outright on `false`; a bad signature is not an acknowledged no-op.
    pub fn verify_signature(&self, body: &[u8], header: &str) -> bool {
        if !self.config.signature_checks {
            return true;
        }
        verify_webhook_signature(self.config.secret.reveal(), body, header)
    }
}

impl<B> SettlementApi<B>
where B: FulfillmentGatewayDatabase
{
    /// Registers a pending top-up awaiting settlement. `external_ref` is the gateway's payment
    /// identifier; the webhook that settles this top-up will carry the same reference.
    /// Re-registering a known reference returns the stored row unchanged.
    pub async fn begin_topup(
        &self,
        account_id: i64,
        amount: Credits,
        external_ref: &str,
    ) -> Result<WalletTopup, SettlementApiError> {
        if !amount.is_positive() {
            return Err(SettlementApiError::NonPositiveAmount);
        }
        let topup = self.db.create_topup(NewWalletTopup::new(account_id, amount, external_ref.to_string())).await?;
        debug!("🛍️ Awaiting settlement of {amount} for account {account_id} under reference {external_ref}");
        Ok(topup)
    }

    /// Reconciles one notification. Always returns an acknowledgement on success; the `Err` arm
    /// is reserved for infrastructure failures (the database being down), where a retry from the
    /// gateway is exactly what we want.
    pub async fn reconcile_webhook(&self, notice: TopupNotification) -> Result<WebhookAck, SettlementApiError> {
        let vocabulary = self.config.vocabulary_for(notice.gateway.as_deref());
        let status = vocabulary.classify(&notice.status);
        trace!("🛍️ Notification for {} carries status {:?} ({})", notice.external_ref, status, notice.status);
        let outcome = match status {
            SettlementStatus::Success => self.settle(&notice).await?,
            SettlementStatus::Failed => self.mark_failed(&notice).await?,
            SettlementStatus::Pending => {
                debug!("🛍️ Top-up {} is still pending at the gateway. Acknowledging only.", notice.external_ref);
                WebhookOutcome::Pending
            },
        };
        Ok(WebhookAck::new(outcome))
    }

    async fn settle(&self, notice: &TopupNotification) -> Result<WebhookOutcome, SettlementApiError> {
        let settlement =
            self.db.settle_topup(&notice.external_ref, notice.amount, Some(notice.account_id)).await?;
        let outcome = match settlement {
            TopupSettlement::Credited { topup, account, .. } => {
                if topup.amount != notice.amount {
                    warn!(
                        "🛍️ Top-up {} was registered for {} but settled for {}. The settled amount was credited.",
                        notice.external_ref, topup.amount, notice.amount
                    );
                }
                info!("🛍️ Top-up {} settled. Account {} now holds {}", notice.external_ref, account.id, account.balance);
                audit::record(
                    &self.db,
                    NewAuditEvent::new(AuditEventType::TopupSettled).for_account(account.id).with_details(json!({
                        "external_ref": notice.external_ref,
                        "registered_amount": topup.amount,
                        "credited_amount": notice.amount,
                    })),
                )
                .await;
                self.producers.publish_topup_credited(TopupCreditedEvent::new(topup, account)).await;
                WebhookOutcome::Credited
            },
            TopupSettlement::AlreadySettled(_) => {
                debug!("🛍️ Top-up {} was already settled. Acknowledging the redelivery.", notice.external_ref);
                WebhookOutcome::Duplicate
            },
            TopupSettlement::AccountMismatch { topup, claimed_account_id } => {
                self.discard(
                    notice,
                    format!(
                        "Notification names account {claimed_account_id}, but top-up {} belongs to account {}",
                        notice.external_ref, topup.account_id
                    ),
                )
                .await;
                WebhookOutcome::Discarded
            },
            TopupSettlement::Unknown => {
                self.discard(notice, format!("No top-up is registered under reference {}", notice.external_ref)).await;
                WebhookOutcome::Unknown
            },
        };
        Ok(outcome)
    }

    async fn mark_failed(&self, notice: &TopupNotification) -> Result<WebhookOutcome, SettlementApiError> {
        if let Some(topup) = self.db.fail_topup(&notice.external_ref).await? {
            info!("🛍️ Top-up {} was reported failed by the gateway. No credit was issued.", topup.external_ref);
            return Ok(WebhookOutcome::MarkedFailed);
        }
        match self.db.fetch_topup(&notice.external_ref).await? {
            // A failure notice after a successful settlement. The credit stands; a gateway that
            // contradicts itself is a matter for reconciliation reports, not the ledger.
            Some(topup) if topup.status == TopupStatus::Completed => {
                warn!("🛍️ Gateway reported failure for {}, which has already been credited.", notice.external_ref);
                Ok(WebhookOutcome::Duplicate)
            },
            Some(_) => Ok(WebhookOutcome::MarkedFailed),
            None => {
                self.discard(notice, format!("No top-up is registered under reference {}", notice.external_ref)).await;
                Ok(WebhookOutcome::Unknown)
            },
        }
    }

    async fn discard(&self, notice: &TopupNotification, reason: String) {
        warn!("🛍️ Discarding notification for {}: {reason}", notice.external_ref);
        audit::record(
            &self.db,
            NewAuditEvent::new(AuditEventType::WebhookDiscarded)
                .for_account(notice.account_id)
                .failed(reason)
                .with_details(json!({
                    "external_ref": notice.external_ref,
                    "status": notice.status,
                    "amount": notice.amount,
                })),
        )
        .await;
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}
