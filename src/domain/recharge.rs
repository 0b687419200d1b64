use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::money::{cents_to_decimal, RechargeLimits};
use crate::error::{AppError, Result};

/// Settlement mechanism for a recharge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BillingRail {
    #[serde(rename = "PIX")]
    InstantTransfer,
    #[serde(rename = "BOLETO")]
    BankSlip,
    #[serde(rename = "CREDIT_CARD")]
    Card,
}

impl std::fmt::Display for BillingRail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BillingRail::InstantTransfer => "PIX",
            BillingRail::BankSlip => "BOLETO",
            BillingRail::Card => "CREDIT_CARD",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    Received,
    Overdue,
    Refunded,
}

impl PaymentStatus {
    /// PENDING is the only non-terminal state and the only one that
    /// triggers polling.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, PaymentStatus::Confirmed | PaymentStatus::Received)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardDetails {
    pub number: String,
    pub holder_name: String,
    pub expiry_month: String,
    pub expiry_year: String,
    pub ccv: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CardHolderInfo {
    #[validate(length(min = 1))]
    pub name: String,
    /// CPF/CNPJ; formatting is stripped before the payload is built.
    #[validate(length(min = 1))]
    pub cpf_cnpj: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub phone: String,
    #[validate(length(min = 1))]
    pub postal_code: String,
    #[validate(length(min = 1))]
    pub address_number: String,
}

/// Per-rail request data. Card is the only rail that needs anything
/// beyond the amount, and the variant makes that requirement structural.
#[derive(Debug, Clone)]
pub enum BillingRequest {
    InstantTransfer,
    BankSlip,
    Card {
        card: CardDetails,
        holder: CardHolderInfo,
    },
}

impl BillingRequest {
    pub fn rail(&self) -> BillingRail {
        match self {
            BillingRequest::InstantTransfer => BillingRail::InstantTransfer,
            BillingRequest::BankSlip => BillingRail::BankSlip,
            BillingRequest::Card { .. } => BillingRail::Card,
        }
    }
}

/// A validated recharge intent, ready to send. Construct via
/// [`RechargeRequest::build`]; never persisted beyond the request.
#[derive(Debug, Clone)]
pub struct RechargeRequest {
    amount_cents: i64,
    billing: BillingRequest,
}

impl RechargeRequest {
    /// Validates the amount against the configured bounds and, for the
    /// card rail, checks every card/holder field is populated after
    /// stripping formatting. Pure; no network or storage side effects.
    pub fn build(
        amount_cents: i64,
        billing: BillingRequest,
        limits: &RechargeLimits,
    ) -> Result<Self> {
        limits.validate(amount_cents)?;

        let billing = match billing {
            BillingRequest::Card { card, holder } => {
                let card = normalize_card(card)?;
                let holder = normalize_holder(holder)?;
                BillingRequest::Card { card, holder }
            }
            other => other,
        };

        Ok(Self {
            amount_cents,
            billing,
        })
    }

    pub fn amount_cents(&self) -> i64 {
        self.amount_cents
    }

    pub fn rail(&self) -> BillingRail {
        self.billing.rail()
    }

    pub fn to_payload(&self) -> CreateRechargePayload {
        let (credit_card, credit_card_holder_info) = match &self.billing {
            BillingRequest::Card { card, holder } => (Some(card.clone()), Some(holder.clone())),
            _ => (None, None),
        };
        CreateRechargePayload {
            amount: cents_to_decimal(self.amount_cents),
            billing_type: self.rail(),
            credit_card,
            credit_card_holder_info,
        }
    }
}

fn require_digits(value: &str, field: &str) -> Result<String> {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Err(AppError::IncompleteCardData(format!(
            "{} is required",
            field
        )));
    }
    Ok(digits)
}

fn require_text(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::IncompleteCardData(format!(
            "{} is required",
            field
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_card(card: CardDetails) -> Result<CardDetails> {
    Ok(CardDetails {
        number: require_digits(&card.number, "card number")?,
        holder_name: require_text(&card.holder_name, "card holder name")?,
        expiry_month: require_digits(&card.expiry_month, "expiry month")?,
        expiry_year: require_digits(&card.expiry_year, "expiry year")?,
        ccv: require_digits(&card.ccv, "security code")?,
    })
}

fn normalize_holder(holder: CardHolderInfo) -> Result<CardHolderInfo> {
    // The backend expects unformatted digit strings for documents,
    // phones and postal codes.
    let holder = CardHolderInfo {
        name: require_text(&holder.name, "holder name")?,
        cpf_cnpj: require_digits(&holder.cpf_cnpj, "tax id")?,
        email: require_text(&holder.email, "email")?,
        phone: require_digits(&holder.phone, "phone")?,
        postal_code: require_digits(&holder.postal_code, "postal code")?,
        address_number: require_text(&holder.address_number, "address number")?,
    };
    holder
        .validate()
        .map_err(|e| AppError::IncompleteCardData(e.to_string()))?;
    Ok(holder)
}

/// Body of `POST /recharge`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRechargePayload {
    pub amount: f64,
    pub billing_type: BillingRail,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_card: Option<CardDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_card_holder_info: Option<CardHolderInfo>,
}

/// Server-acknowledged payment intent. `id` doubles as the idempotency
/// and resume key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: String,
    pub amount: f64,
    pub billing_type: BillingRail,
    pub status: PaymentStatus,
    /// PIX artifacts may arrive empty right after creation and populate
    /// on later fetches.
    #[serde(default)]
    pub pix_qr_code: Option<String>,
    #[serde(default)]
    pub pix_copy_paste: Option<String>,
    #[serde(default)]
    pub invoice_url: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

impl PaymentRecord {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Entry condition for the status poller: instant transfer only, and
    /// only while pending.
    pub fn needs_polling(&self) -> bool {
        self.billing_type == BillingRail::InstantTransfer
            && self.status == PaymentStatus::Pending
    }
}
