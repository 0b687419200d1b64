use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use carteira::{
    config::RechargeConfig,
    domain::{BillingRail, BillingRequest, PaymentRecord, PaymentStatus},
    error::AppError,
    gateway::FakeRechargeGateway,
    service::{RechargeEvent, RechargeObserver, RechargeService, ReconciliationHandler},
};

struct RecordingObserver {
    events: Mutex<Vec<RechargeEvent>>,
}

impl RecordingObserver {
    fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    fn events(&self) -> Vec<RechargeEvent> {
        self.events.lock().unwrap().clone()
    }

    fn settled_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, RechargeEvent::Settled { .. }))
            .count()
    }
}

#[async_trait]
impl RechargeObserver for RecordingObserver {
    async fn handle_event(&self, event: &RechargeEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

fn fast_config() -> RechargeConfig {
    RechargeConfig {
        poll_interval_ms: 10,
        ..RechargeConfig::default()
    }
}

fn confirmed_record(id: &str) -> PaymentRecord {
    PaymentRecord {
        id: id.to_string(),
        amount: 50.0,
        billing_type: BillingRail::InstantTransfer,
        status: PaymentStatus::Confirmed,
        pix_qr_code: None,
        pix_copy_paste: None,
        invoice_url: None,
        due_date: None,
    }
}

#[tokio::test]
async fn pix_recharge_polls_to_settlement() -> anyhow::Result<()> {
    let gateway = Arc::new(FakeRechargeGateway::new());
    gateway.set_balance(150.0).await;
    gateway
        .script_statuses([
            PaymentStatus::Pending,
            PaymentStatus::Pending,
            PaymentStatus::Received,
        ])
        .await;

    let service = RechargeService::new(gateway.clone(), fast_config());
    let record = service
        .create_recharge(5_000, BillingRequest::InstantTransfer)
        .await?;
    assert_eq!(record.status, PaymentStatus::Pending);

    let observer = Arc::new(RecordingObserver::new());
    let handler = Arc::new(ReconciliationHandler::new(gateway.clone(), observer.clone()));
    let handle = service
        .track(record, handler)
        .await
        .expect("pending PIX payment should poll");
    handle.stopped().await;

    // The third check returned a terminal status; no further checks may
    // be issued by this poller instance.
    assert_eq!(gateway.check_status_calls(), 3);
    assert_eq!(gateway.get_balance_calls(), 1);

    let events = observer.events();
    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], RechargeEvent::StatusUpdated(_)));
    assert!(matches!(events[1], RechargeEvent::StatusUpdated(_)));
    match &events[2] {
        RechargeEvent::Settled { balance, .. } => {
            assert_eq!(balance.as_ref().map(|b| b.balance), Some(150.0));
        }
        other => panic!("expected Settled, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn reconciliation_success_path_is_idempotent() -> anyhow::Result<()> {
    let gateway = Arc::new(FakeRechargeGateway::new());
    gateway.set_balance(99.0).await;

    let observer = Arc::new(RecordingObserver::new());
    let handler = ReconciliationHandler::new(gateway.clone(), observer.clone());

    let record = confirmed_record("pay_once");
    handler.handle_terminal(&record).await;
    handler.handle_terminal(&record).await;

    assert_eq!(observer.settled_count(), 1);
    assert_eq!(gateway.get_balance_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn already_confirmed_at_load_skips_the_poller() -> anyhow::Result<()> {
    let gateway = Arc::new(FakeRechargeGateway::new());
    gateway.set_balance(75.0).await;
    gateway.seed_record(confirmed_record("pay_done")).await;

    let service = RechargeService::new(gateway.clone(), fast_config());
    let record = service.load_payment("pay_done").await?;

    let observer = Arc::new(RecordingObserver::new());
    let handler = Arc::new(ReconciliationHandler::new(gateway.clone(), observer.clone()));
    let handle = service.track(record, handler).await;

    assert!(handle.is_none());
    assert_eq!(gateway.check_status_calls(), 0);
    assert_eq!(observer.settled_count(), 1);
    Ok(())
}

#[tokio::test]
async fn cancellation_discards_an_in_flight_check() -> anyhow::Result<()> {
    let gateway = Arc::new(FakeRechargeGateway::new());
    gateway.script_statuses([PaymentStatus::Received]).await;
    gateway.set_check_delay(Duration::from_millis(100)).await;

    let service = RechargeService::new(gateway.clone(), fast_config());
    let record = service
        .create_recharge(5_000, BillingRequest::InstantTransfer)
        .await?;

    let observer = Arc::new(RecordingObserver::new());
    let handler = Arc::new(ReconciliationHandler::new(gateway.clone(), observer.clone()));
    let handle = service.track(record, handler).await.unwrap();

    // Let the first check go in flight, then tear the screen down.
    tokio::time::sleep(Duration::from_millis(30)).await;
    handle.cancel();
    handle.stopped().await;

    // The delayed response resolves here; nothing may observe it.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(observer.events().is_empty());
    assert_eq!(gateway.get_balance_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn pending_guard_surfaces_resumable_payment() -> anyhow::Result<()> {
    let gateway = Arc::new(FakeRechargeGateway::new());
    let service = RechargeService::new(gateway.clone(), fast_config());

    let existing = service
        .create_recharge(5_000, BillingRequest::InstantTransfer)
        .await?;

    // Both guard calls see the same unresolved payment.
    let first = service.check_pending_payment().await?.unwrap();
    let second = service.check_pending_payment().await?.unwrap();
    assert_eq!(first.id, existing.id);
    assert_eq!(second.id, existing.id);

    // Creating a second payment with different parameters is rejected
    // server-side even if the guard is bypassed.
    let err = service
        .create_recharge(10_000, BillingRequest::BankSlip)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicatePending));
    Ok(())
}

#[tokio::test]
async fn pending_guard_ignores_resolved_payments() -> anyhow::Result<()> {
    let gateway = Arc::new(FakeRechargeGateway::new());
    gateway.seed_pending(confirmed_record("pay_cleared")).await;

    let service = RechargeService::new(gateway.clone(), fast_config());
    assert!(service.check_pending_payment().await?.is_none());
    Ok(())
}

#[tokio::test]
async fn bank_slip_settles_out_of_band_without_polling() -> anyhow::Result<()> {
    let gateway = Arc::new(FakeRechargeGateway::new());
    let service = RechargeService::new(gateway.clone(), fast_config());

    let record = service
        .create_recharge(5_000, BillingRequest::BankSlip)
        .await?;
    assert!(record.invoice_url.is_some());

    let observer = Arc::new(RecordingObserver::new());
    let handler = Arc::new(ReconciliationHandler::new(gateway.clone(), observer.clone()));
    let handle = service.track(record, handler).await;

    assert!(handle.is_none());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(gateway.check_status_calls(), 0);
    assert!(observer.events().is_empty());
    Ok(())
}

#[tokio::test]
async fn transient_poll_errors_are_swallowed() -> anyhow::Result<()> {
    let gateway = Arc::new(FakeRechargeGateway::new());
    gateway.set_balance(42.0).await;
    gateway.fail_checks_with_transient(2).await;
    gateway.script_statuses([PaymentStatus::Confirmed]).await;

    let service = RechargeService::new(gateway.clone(), fast_config());
    let record = service
        .create_recharge(5_000, BillingRequest::InstantTransfer)
        .await?;

    let observer = Arc::new(RecordingObserver::new());
    let handler = Arc::new(ReconciliationHandler::new(gateway.clone(), observer.clone()));
    let handle = service.track(record, handler).await.unwrap();
    handle.stopped().await;

    // Two failed ticks, then the confirming one.
    assert_eq!(gateway.check_status_calls(), 3);
    assert_eq!(observer.settled_count(), 1);
    Ok(())
}

#[tokio::test]
async fn session_expiry_stops_the_poller() -> anyhow::Result<()> {
    let gateway = Arc::new(FakeRechargeGateway::new());
    gateway.script_check_errors([AppError::Unauthorized]).await;
    gateway.script_statuses([PaymentStatus::Confirmed]).await;

    let service = RechargeService::new(gateway.clone(), fast_config());
    let record = service
        .create_recharge(5_000, BillingRequest::InstantTransfer)
        .await?;

    let observer = Arc::new(RecordingObserver::new());
    let handler = Arc::new(ReconciliationHandler::new(gateway.clone(), observer.clone()));
    let handle = service.track(record, handler).await.unwrap();
    handle.stopped().await;

    // Auth failures propagate to the application's global handling; the
    // poller must not keep issuing authenticated calls.
    assert_eq!(gateway.check_status_calls(), 1);
    let events = observer.events();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], RechargeEvent::SessionExpired));
    assert_eq!(gateway.get_balance_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn preset_amounts_are_revalidated_at_submission() -> anyhow::Result<()> {
    let gateway = Arc::new(FakeRechargeGateway::new());
    let config = RechargeConfig {
        // A stale preset below the configured minimum must still be
        // rejected when submitted.
        preset_amounts_cents: vec![100, 1_000],
        poll_interval_ms: 10,
        ..RechargeConfig::default()
    };
    let service = RechargeService::new(gateway.clone(), config);

    let presets = service.preset_amounts().to_vec();
    assert_eq!(presets, vec![100, 1_000]);

    let err = service
        .create_recharge(presets[0], BillingRequest::InstantTransfer)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidAmount(_)));

    let record = service
        .create_recharge(presets[1], BillingRequest::InstantTransfer)
        .await?;
    assert_eq!(record.amount, 10.0);
    Ok(())
}

#[tokio::test]
async fn missing_payment_stops_the_poller() -> anyhow::Result<()> {
    let gateway = Arc::new(FakeRechargeGateway::new());
    let service = RechargeService::new(gateway.clone(), fast_config());

    let record = service
        .create_recharge(5_000, BillingRequest::InstantTransfer)
        .await?;
    let payment_id = record.id.clone();
    gateway.remove_record(&payment_id).await;

    let observer = Arc::new(RecordingObserver::new());
    let handler = Arc::new(ReconciliationHandler::new(gateway.clone(), observer.clone()));
    let handle = service.track(record, handler).await.unwrap();
    handle.stopped().await;

    assert_eq!(gateway.check_status_calls(), 1);
    let events = observer.events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        RechargeEvent::Missing { payment_id: id } => assert_eq!(id, &payment_id),
        other => panic!("expected Missing, got {:?}", other),
    }
    Ok(())
}
