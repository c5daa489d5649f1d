mod common;

use common::*;
use trip_sync::domain::error::PipelineError;
use trip_sync::domain::event::{
    ApplyOutcome, DeliveryChannel, EventKind, NormalizedEvent, Provider,
};
use trip_sync::domain::money::{Currency, MoneyAmount};
use trip_sync::domain::payment::PaymentMethod;
use trip_sync::domain::refund::RefundStatus;
use trip_sync::domain::store::RefundStore;
use trip_sync::services::{applier, refunds};

fn payment_event(gateway_ref: &str) -> NormalizedEvent {
    NormalizedEvent {
        provider: Provider::CardGateway,
        external_id: gateway_ref.to_string(),
        kind: EventKind::PaymentSucceeded,
    }
}

// ── idempotence ────────────────────────────────────────────────────────

#[tokio::test]
async fn second_apply_of_same_event_is_noop_success() {
    let h = harness();
    h.store.seed_booking("BK-1", Some(30));
    h.store
        .seed_payment("BK-1", "pi_a", PaymentMethod::Card, 10_000, Currency::Usd);

    let event = payment_event("pi_a");
    let first = applier::apply(&*h.state.store, &*h.state.notifier, &event)
        .await
        .unwrap();
    let second = applier::apply(&*h.state.store, &*h.state.notifier, &event)
        .await
        .unwrap();

    assert_eq!(first, ApplyOutcome::Applied);
    assert_eq!(second, ApplyOutcome::Duplicate);
    assert_eq!(h.notifier.confirmations().len(), 1);
    assert_eq!(h.store.booking_status("BK-1").unwrap().0, "confirmed");
}

#[tokio::test]
async fn same_external_id_different_kind_applies_separately() {
    let h = harness();
    h.store.seed_booking("BK-2", Some(30));
    h.store
        .seed_payment("BK-2", "pi_b", PaymentMethod::Card, 10_000, Currency::Usd);

    let succeeded = payment_event("pi_b");
    let failed = NormalizedEvent {
        provider: Provider::CardGateway,
        external_id: "pi_b".to_string(),
        kind: EventKind::PaymentFailed {
            reason: "card declined".into(),
        },
    };

    // Out-of-order gateway delivery: both apply, keyed independently.
    applier::apply(&*h.state.store, &*h.state.notifier, &failed)
        .await
        .unwrap();
    applier::apply(&*h.state.store, &*h.state.notifier, &succeeded)
        .await
        .unwrap();
    assert_eq!(h.store.applied_count(), 2);
}

// ── failure classification ─────────────────────────────────────────────

#[tokio::test]
async fn missing_payment_is_permanent_and_keeps_the_claim() {
    let h = harness();

    let event = payment_event("pi_missing");
    let err = applier::apply(&*h.state.store, &*h.state.notifier, &event)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Permanent(_)));

    // A redelivery finds the claim still held: no second dead letter.
    let redelivery = applier::apply(&*h.state.store, &*h.state.notifier, &event)
        .await
        .unwrap();
    assert_eq!(redelivery, ApplyOutcome::Duplicate);
}

#[tokio::test]
async fn transient_failure_releases_the_claim_for_retry() {
    let h = harness();
    h.store.seed_booking("BK-3", Some(30));
    h.store
        .seed_payment("BK-3", "pi_c", PaymentMethod::Card, 10_000, Currency::Usd);
    h.store.fail_next_apply_writes(1);

    let event = payment_event("pi_c");
    let err = applier::apply(&*h.state.store, &*h.state.notifier, &event)
        .await
        .unwrap_err();
    assert!(err.is_transient());
    assert_eq!(h.store.applied_count(), 0);

    // The re-attempt can take the claim again and succeed.
    let retry = applier::apply(&*h.state.store, &*h.state.notifier, &event)
        .await
        .unwrap();
    assert_eq!(retry, ApplyOutcome::Applied);
    assert_eq!(h.store.booking_status("BK-3").unwrap().0, "confirmed");
}

// ── per-kind side effects ──────────────────────────────────────────────

#[tokio::test]
async fn payment_failed_marks_booking_and_notifies() {
    let h = harness();
    h.store.seed_booking("BK-4", Some(30));
    h.store
        .seed_payment("BK-4", "pi_d", PaymentMethod::Card, 10_000, Currency::Usd);

    let event = NormalizedEvent {
        provider: Provider::CardGateway,
        external_id: "pi_d".to_string(),
        kind: EventKind::PaymentFailed {
            reason: "insufficient funds".into(),
        },
    };
    applier::apply(&*h.state.store, &*h.state.notifier, &event)
        .await
        .unwrap();

    assert_eq!(
        h.store.booking_status("BK-4").unwrap(),
        ("payment_failed".to_string(), "failed".to_string())
    );
    assert_eq!(
        h.notifier.failures(),
        vec![("BK-4".to_string(), "insufficient funds".to_string())]
    );
}

#[tokio::test]
async fn refund_completed_moves_approved_refund_to_processed() {
    let h = harness();
    h.store.seed_booking("BK-5", Some(40));
    let payment_id =
        h.store
            .seed_payment("BK-5", "pi_e", PaymentMethod::Card, 10_000, Currency::Usd);

    let created = refunds::create(
        &*h.state.store,
        refunds::CreateRefund {
            payment_id,
            amount: MoneyAmount::new(10_000).unwrap(),
            reason: "trip cancelled".into(),
            notes: None,
            requester: "staff:ana".into(),
        },
    )
    .await
    .unwrap();
    refunds::approve(
        &*h.state.store,
        &*h.state.notifier,
        created.refund.id,
        "staff:omar",
        None,
    )
    .await
    .unwrap();

    let event = NormalizedEvent {
        provider: Provider::CardGateway,
        external_id: "pi_e".to_string(),
        kind: EventKind::RefundCompleted {
            gateway_refund_id: "re_55".into(),
        },
    };
    applier::apply(&*h.state.store, &*h.state.notifier, &event)
        .await
        .unwrap();

    let refund = h.state.store.find_refund(created.refund.id).await.unwrap().unwrap();
    assert_eq!(refund.status, RefundStatus::Processed);
    assert_eq!(refund.gateway_refund_id.as_deref(), Some("re_55"));

    let actions: Vec<String> = h
        .store
        .actions_for(created.refund.id)
        .into_iter()
        .map(|a| a.action)
        .collect();
    assert_eq!(actions, vec!["requested", "approved", "processed"]);
}

#[tokio::test]
async fn refund_completed_for_pending_refund_is_permanent() {
    let h = harness();
    h.store.seed_booking("BK-6", Some(40));
    let payment_id =
        h.store
            .seed_payment("BK-6", "pi_f", PaymentMethod::Card, 10_000, Currency::Usd);

    refunds::create(
        &*h.state.store,
        refunds::CreateRefund {
            payment_id,
            amount: MoneyAmount::new(5_000).unwrap(),
            reason: "partial".into(),
            notes: None,
            requester: "staff:ana".into(),
        },
    )
    .await
    .unwrap();

    let event = NormalizedEvent {
        provider: Provider::CardGateway,
        external_id: "pi_f".to_string(),
        kind: EventKind::RefundCompleted {
            gateway_refund_id: "re_56".into(),
        },
    };
    let err = applier::apply(&*h.state.store, &*h.state.notifier, &event)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Permanent(_)));
}

#[tokio::test]
async fn dispute_raises_alert_without_touching_state() {
    let h = harness();
    h.store.seed_booking("BK-7", Some(30));
    h.store
        .seed_payment("BK-7", "ch_g", PaymentMethod::Card, 10_000, Currency::Usd);

    let event = NormalizedEvent {
        provider: Provider::CardGateway,
        external_id: "ch_g".to_string(),
        kind: EventKind::DisputeOpened {
            reason: "fraudulent".into(),
            amount_cents: 10_000,
        },
    };
    let outcome = applier::apply(&*h.state.store, &*h.state.notifier, &event)
        .await
        .unwrap();

    assert_eq!(outcome, ApplyOutcome::Applied);
    assert_eq!(h.store.booking_status("BK-7").unwrap().0, "pending_payment");
    let alerts = h.store.all_alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, "GATEWAY_DISPUTE");
}

#[tokio::test]
async fn permanent_bounce_opts_out_and_stays_out() {
    let h = harness();
    h.store
        .seed_delivery(DeliveryChannel::Email, "msg-1", "guest@example.com");

    let bounce = NormalizedEvent {
        provider: Provider::EmailProvider,
        external_id: "msg-1".to_string(),
        kind: EventKind::DeliveryFailed {
            channel: DeliveryChannel::Email,
            recipient: "guest@example.com".into(),
            permanent: true,
            reason: "mailbox does not exist".into(),
        },
    };
    applier::apply(&*h.state.store, &*h.state.notifier, &bounce)
        .await
        .unwrap();

    assert!(h.store.opted_out(DeliveryChannel::Email, "guest@example.com"));
    assert_eq!(
        h.store
            .delivery_status(DeliveryChannel::Email, "msg-1")
            .as_deref(),
        Some("failed")
    );

    // A later successful delivery must not clear the flag.
    let delivered = NormalizedEvent {
        provider: Provider::EmailProvider,
        external_id: "msg-2".to_string(),
        kind: EventKind::DeliverySucceeded {
            channel: DeliveryChannel::Email,
            recipient: "guest@example.com".into(),
        },
    };
    applier::apply(&*h.state.store, &*h.state.notifier, &delivered)
        .await
        .unwrap();
    assert!(h.store.opted_out(DeliveryChannel::Email, "guest@example.com"));
}

#[tokio::test]
async fn transient_bounce_does_not_opt_out() {
    let h = harness();
    h.store
        .seed_delivery(DeliveryChannel::Email, "msg-3", "guest@example.com");

    let bounce = NormalizedEvent {
        provider: Provider::EmailProvider,
        external_id: "msg-3".to_string(),
        kind: EventKind::DeliveryFailed {
            channel: DeliveryChannel::Email,
            recipient: "guest@example.com".into(),
            permanent: false,
            reason: "mailbox full".into(),
        },
    };
    applier::apply(&*h.state.store, &*h.state.notifier, &bounce)
        .await
        .unwrap();

    assert!(!h.store.opted_out(DeliveryChannel::Email, "guest@example.com"));
}

#[tokio::test]
async fn delivery_event_without_log_row_still_succeeds() {
    let h = harness();

    let event = NormalizedEvent {
        provider: Provider::SmsProvider,
        external_id: "SM404".to_string(),
        kind: EventKind::DeliverySucceeded {
            channel: DeliveryChannel::Sms,
            recipient: "+15550100".into(),
        },
    };
    let outcome = applier::apply(&*h.state.store, &*h.state.notifier, &event)
        .await
        .unwrap();
    assert_eq!(outcome, ApplyOutcome::Applied);
}
