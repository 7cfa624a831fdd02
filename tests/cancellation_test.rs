//! Timeouts, caller signals, `abort_all` and the completion bookkeeping that
//! depends on them. Time is paused so timers fire deterministically.

mod support;

use courier::prelude::*;
use std::time::Duration;
use support::{EventLog, Reply, harness, json, wait_for_active};

#[tokio::test(start_paused = true)]
async fn timeout_fires_before_a_hanging_exchange() {
    let h = harness(|_| Reply::Hang);
    let log = EventLog::on_client(&h.client);

    let err = h
        .client
        .get("/slow", RequestOptions::new().timeout_ms(50))
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert!(matches!(
        err.cause(),
        HttpError::TimeoutError { after } if *after == Duration::from_millis(50)
    ));
    assert_eq!(err.status_code(), Some(504));
    assert_eq!(
        log.kinds(),
        [EventKind::Configured, EventKind::Timeout, EventKind::Error]
    );
    assert_eq!(h.hub.active_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn zero_timeout_fires_on_the_next_tick() {
    let h = harness(|_| Reply::Hang);

    let err = h
        .client
        .get("/", RequestOptions::new().timeout_ms(0))
        .await
        .unwrap_err();

    assert!(err.is_timeout());
}

#[tokio::test(start_paused = true)]
async fn settled_call_disarms_its_timer() {
    let h = harness(|_| Reply::after(10, json(200, "{}")));
    let log = EventLog::on_client(&h.client);

    h.client
        .get("/", RequestOptions::new().timeout_ms(50))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(log.count(EventKind::Timeout), 0);
    assert_eq!(log.count(EventKind::Success), 1);
}

#[tokio::test(start_paused = true)]
async fn abort_after_the_response_still_completes() {
    let h = harness(|_| Reply::after(10, json(200, "{}")));
    let log = EventLog::on_client(&h.client);
    let hub = h.hub.clone();
    h.client.register(EventKind::Success, move |_| {
        hub.abort_all();
    });

    let body = h
        .client
        .get("/", RequestOptions::new().timeout_ms(50))
        .await
        .unwrap();

    assert_eq!(body.as_json(), Some(&serde_json::json!({})));
    assert_eq!(log.count(EventKind::Aborted), 0);
    assert_eq!(log.count(EventKind::Complete), 1);
    // `abort_all` already emptied the registry, so nothing is left to finish.
    assert_eq!(log.count(EventKind::AllComplete), 0);
    assert_eq!(h.hub.active_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn response_racing_its_timeout_settles_one_way() {
    let h = harness(|_| Reply::after(50, json(200, "{}")));
    let log = EventLog::on_client(&h.client);

    let result = h.client.get("/", RequestOptions::new().timeout_ms(50)).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    match result {
        Ok(_) => assert_eq!(
            log.kinds(),
            [
                EventKind::Configured,
                EventKind::Success,
                EventKind::Complete,
                EventKind::AllComplete
            ]
        ),
        Err(err) => {
            assert!(err.is_timeout());
            assert_eq!(
                log.kinds(),
                [EventKind::Configured, EventKind::Timeout, EventKind::Error]
            );
        }
    }
    assert_eq!(h.hub.active_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn abort_all_stops_every_call_in_flight() {
    let h = harness(|_| Reply::Hang);
    let log = EventLog::on_client(&h.client);
    let opts = || RequestOptions::new().no_timeout();

    let (a, b, c, aborted) = tokio::join!(
        h.client.get("/a", opts()),
        h.client.get("/b", opts()),
        h.client.get("/c", opts()),
        async {
            wait_for_active(&h.hub, 3).await;
            h.client.abort_all()
        }
    );

    assert_eq!(aborted, 3);
    for result in [a, b, c] {
        let err = result.unwrap_err();
        assert!(err.is_abort());
        assert_eq!(err.status_code(), Some(499));
    }
    assert_eq!(log.count(EventKind::Aborted), 3);
    assert_eq!(log.count(EventKind::Error), 3);
    assert_eq!(log.count(EventKind::Complete), 0);
    assert_eq!(log.count(EventKind::AllComplete), 0);
    assert_eq!(h.hub.active_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn aborted_call_never_reports_a_timeout() {
    let h = harness(|_| Reply::Hang);
    let log = EventLog::on_client(&h.client);

    let (result, _) = tokio::join!(
        h.client.get("/", RequestOptions::new().timeout_ms(1_000)),
        async {
            wait_for_active(&h.hub, 1).await;
            h.client.abort_all()
        }
    );
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(result.unwrap_err().is_abort());
    assert_eq!(log.count(EventKind::Timeout), 0);
    assert_eq!(log.count(EventKind::Aborted), 1);
}

#[tokio::test(start_paused = true)]
async fn all_complete_fires_once_after_the_last_call() {
    let h = harness(|request| match request.url.path() {
        "/v1/a" => Reply::after(10, json(200, "{}")),
        "/v1/b" => Reply::after(20, json(200, "{}")),
        _ => Reply::after(30, json(500, "{}")),
    });
    let log = EventLog::on_hub(&h.hub);

    let (a, b, c) = tokio::join!(
        h.client.get("/a", RequestOptions::new()),
        h.client.get("/b", RequestOptions::new()),
        h.client.get("/c", RequestOptions::new()),
    );
    assert!(a.is_ok() && b.is_ok() && c.is_err());

    let kinds = log.kinds();
    assert_eq!(log.count(EventKind::Complete), 3);
    assert_eq!(log.count(EventKind::AllComplete), 1);
    assert_eq!(
        kinds[kinds.len() - 2..],
        [EventKind::Complete, EventKind::AllComplete]
    );
}

#[tokio::test(start_paused = true)]
async fn caller_signal_aborts_every_call_sharing_it() {
    let h = harness(|_| Reply::Hang);
    let log = EventLog::on_client(&h.client);
    let signal = new_cancel_token();
    let opts = || RequestOptions::new().no_timeout().signal(signal.clone());

    let (a, b, _) = tokio::join!(
        h.client.get("/a", opts()),
        h.client.get("/b", opts()),
        async {
            wait_for_active(&h.hub, 2).await;
            signal.abort();
        }
    );

    assert!(a.unwrap_err().is_abort());
    assert!(b.unwrap_err().is_abort());
    assert_eq!(log.count(EventKind::Aborted), 2);
    assert_eq!(h.hub.active_count(), 0);
}

#[tokio::test]
async fn already_aborted_signal_never_reaches_the_transport() {
    let h = harness(|_| json(200, "{}"));
    let log = EventLog::on_client(&h.client);
    let signal = CancellationToken::new();
    signal.abort();

    let err = h
        .client
        .get("/", RequestOptions::new().signal(signal))
        .await
        .unwrap_err();

    assert!(err.is_abort());
    assert_eq!(
        log.kinds(),
        [EventKind::Configured, EventKind::Aborted, EventKind::Error]
    );
    assert!(h.seen.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn signal_outlives_the_call_without_side_effects() {
    let h = harness(|_| json(200, "{}"));
    let log = EventLog::on_client(&h.client);
    let signal = new_cancel_token();

    h.client
        .get("/", RequestOptions::new().signal(signal.clone()))
        .await
        .unwrap();
    signal.abort();

    assert_eq!(log.count(EventKind::Aborted), 0);
}

#[tokio::test(start_paused = true)]
async fn dropped_call_leaves_no_trace_in_the_registry() {
    let h = harness(|_| Reply::Hang);
    let log = EventLog::on_client(&h.client);

    let outcome = tokio::time::timeout(
        Duration::from_millis(10),
        h.client.get("/", RequestOptions::new().timeout_ms(1_000)),
    )
    .await;
    assert!(outcome.is_err());
    assert_eq!(h.hub.active_count(), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(log.count(EventKind::Timeout), 0);
}

#[tokio::test(start_paused = true)]
async fn calls_started_after_abort_all_are_unaffected() {
    let h = harness(|_| Reply::after(5, json(200, "{}")));

    assert_eq!(h.client.abort_all(), 0);
    h.client.get("/", RequestOptions::new()).await.unwrap();
}
