use std::collections::HashSet;
use std::sync::Arc;

use concierge::{
    DeskError, Ledger, MAX_REQUESTS, RequestGateway, RequestStatus, Submission,
};
use serde_json::json;

fn towels() -> Submission {
    Submission::default().field("room", "301").field("item", "towels")
}

#[tokio::test]
async fn request_numbers_are_one_to_n_past_capacity() {
    let gateway = RequestGateway::in_memory(Ledger::new());
    let n = MAX_REQUESTS as u64 + 25;

    for expected in 1..=n {
        let receipt = gateway.submit(towels()).await;
        assert_eq!(receipt.request_number, expected);
        assert_eq!(receipt.total_requests, expected);
    }
}

#[tokio::test]
async fn overflow_evicts_only_the_oldest() {
    let gateway = RequestGateway::in_memory(Ledger::new());

    let mut ids = Vec::new();
    for _ in 0..=MAX_REQUESTS {
        ids.push(gateway.submit(towels()).await.id);
    }

    let listed = gateway.list().await.requests;
    assert_eq!(listed.len(), MAX_REQUESTS);
    assert!(listed.iter().all(|r| r.id != ids[0]));
    assert_eq!(listed.first().unwrap().request_number, 2);
    assert_eq!(listed.last().unwrap().request_number, 501);
    let retained: HashSet<&str> = listed.iter().map(|r| r.id.as_str()).collect();
    assert!(ids[1..].iter().all(|id| retained.contains(id.as_str())));

    let next = gateway.submit(towels()).await;
    assert_eq!(next.request_number, 502);
}

#[tokio::test]
async fn invalid_status_leaves_ledger_unchanged() {
    let gateway = RequestGateway::in_memory(Ledger::new());
    let receipt = gateway.submit(towels()).await;
    let before = gateway.snapshot().await;

    let err = gateway
        .update_status(Some(&receipt.id), Some("lost in transit"))
        .await
        .unwrap_err();
    assert!(matches!(err, DeskError::Validation(_)));
    assert_eq!(gateway.snapshot().await, before);

    let update = gateway
        .update_status(Some(&receipt.id), Some("On The Way"))
        .await
        .unwrap();
    assert_eq!(update.status, RequestStatus::OnTheWay);
}

#[tokio::test]
async fn unknown_id_is_not_found_and_mutates_nothing() {
    let gateway = RequestGateway::in_memory(Ledger::new());
    gateway.submit(towels()).await;
    let before = gateway.snapshot().await;

    let err = gateway
        .update_status(Some("no-such-request"), Some("completed"))
        .await
        .unwrap_err();
    assert!(matches!(err, DeskError::NotFound(_)));
    assert_eq!(gateway.snapshot().await, before);
}

#[tokio::test]
async fn guest_fields_come_back_verbatim() {
    let gateway = RequestGateway::in_memory(Ledger::new());
    let receipt = gateway
        .submit_json(br#"{"room": "301", "item": "towels"}"#)
        .await
        .unwrap();

    let request = gateway.get(Some(&receipt.id)).await.unwrap().request;
    assert_eq!(serde_json::Value::Object(request.fields.clone()), json!({ "room": "301", "item": "towels" }));
    assert_eq!(request.status, RequestStatus::Sent);
    assert_eq!(request.status_updated_at, request.at);
}

/// Duplicate caller ids are not deduplicated: a second record is appended and
/// lookups keep returning the first one.
#[tokio::test]
async fn duplicate_caller_id_appends_second_record() {
    let gateway = RequestGateway::in_memory(Ledger::new());

    let first = gateway
        .submit(towels().with_id("room-301-towels"))
        .await;
    let second = gateway
        .submit(Submission::default().with_id("room-301-towels").field("item", "soap"))
        .await;

    assert_eq!(first.id, second.id);
    assert_ne!(first.request_number, second.request_number);

    let listed = gateway.list().await.requests;
    assert_eq!(listed.len(), 2);

    let found = gateway.get(Some("room-301-towels")).await.unwrap().request;
    assert_eq!(found.request_number, first.request_number);
    assert_eq!(found.fields["item"], "towels");

    let updated = gateway
        .update_status(Some("room-301-towels"), Some("read"))
        .await
        .unwrap();
    assert_eq!(updated.status, RequestStatus::Read);
    let listed = gateway.list().await.requests;
    assert_eq!(listed[0].status, RequestStatus::Read);
    assert_eq!(listed[1].status, RequestStatus::Sent);
}

#[tokio::test]
async fn concurrent_submits_never_share_a_number() {
    let gateway = Arc::new(RequestGateway::in_memory(Ledger::new()));

    let handles: Vec<_> = (0..64)
        .map(|_| {
            let gateway = Arc::clone(&gateway);
            tokio::spawn(async move { gateway.submit(towels()).await.request_number })
        })
        .collect();

    let mut numbers = Vec::new();
    for handle in handles {
        numbers.push(handle.await.expect("submit task should finish"));
    }
    numbers.sort_unstable();

    assert_eq!(numbers, (1..=64).collect::<Vec<u64>>());
}
