use std::sync::Arc;

use async_trait::async_trait;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::Notify;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use carteira::{
    config::Settings,
    domain::{format_amount, parse_amount, BillingRequest, CardDetails, CardHolderInfo, PaymentRecord},
    gateway::HttpRechargeGateway,
    service::{RechargeEvent, RechargeObserver, RechargeService, ReconciliationHandler},
};

#[derive(Parser)]
#[command(name = "carteira", about = "Wallet recharge client for the credit-report marketplace backend")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a recharge and, for PIX, track it to settlement
    Recharge {
        /// Amount in currency units, locale formatting accepted ("50", "49,90")
        #[arg(long, conflicts_with = "preset")]
        amount: Option<String>,
        /// Pick one of the configured preset amounts instead (1-based)
        #[arg(long)]
        preset: Option<usize>,
        #[arg(long, value_enum, default_value_t = Rail::Pix)]
        rail: Rail,
        /// Skip the pending-payment guard and submit anyway
        #[arg(long)]
        ignore_pending: bool,
        #[arg(long)]
        card_number: Option<String>,
        #[arg(long)]
        card_holder: Option<String>,
        #[arg(long)]
        card_expiry_month: Option<String>,
        #[arg(long)]
        card_expiry_year: Option<String>,
        #[arg(long)]
        card_ccv: Option<String>,
        #[arg(long)]
        holder_name: Option<String>,
        #[arg(long)]
        holder_tax_id: Option<String>,
        #[arg(long)]
        holder_email: Option<String>,
        #[arg(long)]
        holder_phone: Option<String>,
        #[arg(long)]
        holder_postal_code: Option<String>,
        #[arg(long)]
        holder_address_number: Option<String>,
    },
    /// Show a payment and optionally track it to a terminal state
    Status {
        id: String,
        #[arg(long)]
        watch: bool,
    },
    /// Show the current user's unresolved payment, if any
    Pending,
    /// Show the wallet balance
    Balance,
}

#[derive(Clone, Copy, ValueEnum)]
enum Rail {
    Pix,
    Boleto,
    Card,
}

/// Stand-in for the payment screen: prints lifecycle events and flags
/// terminal ones so the command can exit.
struct ConsoleObserver {
    done: Notify,
}

impl ConsoleObserver {
    fn new() -> Self {
        Self { done: Notify::new() }
    }
}

#[async_trait]
impl RechargeObserver for ConsoleObserver {
    async fn handle_event(&self, event: &RechargeEvent) {
        match event {
            RechargeEvent::StatusUpdated(record) => {
                println!("  ... still pending ({})", record.id);
            }
            RechargeEvent::Settled { record, balance } => {
                println!("Payment {} settled.", record.id);
                match balance {
                    Some(b) => println!("Wallet balance: {}", b.balance),
                    None => println!("Wallet balance refresh failed; check the wallet view."),
                }
                self.done.notify_one();
            }
            RechargeEvent::Failed(record) => {
                println!(
                    "Payment {} was refunded. Start a new recharge to try again.",
                    record.id
                );
                self.done.notify_one();
            }
            RechargeEvent::Expired(record) => {
                println!("Payment {} lapsed past its due date.", record.id);
                self.done.notify_one();
            }
            RechargeEvent::Missing { payment_id } => {
                println!("Transaction {} not found. Restart the recharge flow.", payment_id);
                self.done.notify_one();
            }
            RechargeEvent::SessionExpired => {
                println!("Session expired. Sign in again.");
                self.done.notify_one();
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carteira=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    // Load configuration
    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });

    let gateway = Arc::new(HttpRechargeGateway::new(&settings.gateway)?);
    let service = RechargeService::new(gateway.clone(), settings.recharge.clone());

    let cli = Cli::parse();
    match cli.command {
        Command::Balance => {
            let balance = service.refresh_balance().await?;
            println!("Wallet balance: {}", balance.balance);
        }
        Command::Pending => match service.check_pending_payment().await? {
            Some(record) => print_record(&record),
            None => println!("No pending payment."),
        },
        Command::Status { id, watch } => {
            let record = service.load_payment(&id).await?;
            print_record(&record);
            if watch {
                track_to_terminal(&service, gateway.clone(), record).await;
            }
        }
        Command::Recharge {
            amount,
            preset,
            rail,
            ignore_pending,
            card_number,
            card_holder,
            card_expiry_month,
            card_expiry_year,
            card_ccv,
            holder_name,
            holder_tax_id,
            holder_email,
            holder_phone,
            holder_postal_code,
            holder_address_number,
        } => {
            let amount_cents = match (amount, preset) {
                (Some(amount), _) => parse_amount(&amount)?,
                (None, Some(n)) => {
                    let presets = service.preset_amounts();
                    *presets.get(n.wrapping_sub(1)).ok_or_else(|| {
                        anyhow::anyhow!(
                            "No preset {}; configured presets: {}",
                            n,
                            presets
                                .iter()
                                .map(|c| format_amount(*c))
                                .collect::<Vec<_>>()
                                .join(", ")
                        )
                    })?
                }
                (None, None) => anyhow::bail!("Pass --amount or --preset"),
            };

            if !ignore_pending {
                if let Some(pending) = service.check_pending_payment().await? {
                    println!(
                        "You already have a pending payment of {} via {}.",
                        format_amount((pending.amount * 100.0).round() as i64),
                        pending.billing_type
                    );
                    println!(
                        "Resume it with `carteira status {} --watch`, or pass --ignore-pending to submit anyway.",
                        pending.id
                    );
                    return Ok(());
                }
            }

            let billing = match rail {
                Rail::Pix => BillingRequest::InstantTransfer,
                Rail::Boleto => BillingRequest::BankSlip,
                Rail::Card => BillingRequest::Card {
                    card: CardDetails {
                        number: card_number.unwrap_or_default(),
                        holder_name: card_holder.unwrap_or_default(),
                        expiry_month: card_expiry_month.unwrap_or_default(),
                        expiry_year: card_expiry_year.unwrap_or_default(),
                        ccv: card_ccv.unwrap_or_default(),
                    },
                    holder: CardHolderInfo {
                        name: holder_name.unwrap_or_default(),
                        cpf_cnpj: holder_tax_id.unwrap_or_default(),
                        email: holder_email.unwrap_or_default(),
                        phone: holder_phone.unwrap_or_default(),
                        postal_code: holder_postal_code.unwrap_or_default(),
                        address_number: holder_address_number.unwrap_or_default(),
                    },
                },
            };

            let record = service.create_recharge(amount_cents, billing).await?;
            print_record(&record);
            track_to_terminal(&service, gateway.clone(), record).await;
        }
    }

    Ok(())
}

async fn track_to_terminal(
    service: &RechargeService,
    gateway: Arc<HttpRechargeGateway>,
    record: PaymentRecord,
) {
    let observer = Arc::new(ConsoleObserver::new());
    let handler = Arc::new(ReconciliationHandler::new(gateway, observer.clone()));

    match service.track(record, handler).await {
        Some(handle) => {
            println!("Waiting for payment confirmation (Ctrl-C to stop tracking)...");
            tokio::select! {
                _ = observer.done.notified() => {}
                _ = tokio::signal::ctrl_c() => {
                    handle.cancel();
                    println!("Stopped tracking; the payment stays pending on the backend.");
                }
            }
            handle.stopped().await;
        }
        None => {
            // Already terminal (handled above) or settles out-of-band.
        }
    }
}

fn print_record(record: &PaymentRecord) {
    println!(
        "Payment {} | {} | {:?} | {}",
        record.id,
        record.billing_type,
        record.status,
        format_amount((record.amount * 100.0).round() as i64)
    );
    if let Some(code) = record.pix_copy_paste.as_deref().filter(|c| !c.is_empty()) {
        println!("PIX copy-paste code: {}", code);
    }
    if let Some(url) = record.invoice_url.as_deref() {
        println!("Bank slip: {}", url);
    }
    if let Some(due) = record.due_date {
        println!("Due date: {}", due.format("%Y-%m-%d"));
    }
}
