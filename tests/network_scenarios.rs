//! Full-pipeline tests: a synthetic CDP transport plays the browser, a
//! synthetic BiDi transport plays the client, and `bidi_cdp::run` sits
//! between them exactly as it would over a real socket. Each test drives
//! one of the six numbered network scenarios end to end and asserts on the
//! BiDi wire events the translator actually produced.

mod common;

use std::time::Duration;

use serde_json::json;

use common::{event_methods, Harness};

const SHORT: Duration = Duration::from_millis(200);

/// Subscribes globally to both `browsingContext` and `network` events
/// before any target is attached — `browsingContext.contextCreated` itself
/// is gated by subscription state just like every other event, so a test
/// has to subscribe before `attach_page` can observe it.
async fn subscribe_all(harness: &mut Harness) {
    let reply = harness
        .send_command(1, "session.subscribe", json!({ "events": ["browsingContext", "network"] }))
        .await;
    assert!(reply.get("result").is_some(), "subscribe failed: {reply:?}");
}

/// Scenario 1: a normal navigation's five CDP fragments collapse into
/// `beforeRequestSent`, `responseStarted`, `responseCompleted`, in order,
/// all carrying `redirectCount=0` and the same navigation id.
#[tokio::test]
async fn normal_navigation() {
    let mut harness = Harness::start().await;
    subscribe_all(&mut harness).await;
    let (_context, session) = harness.attach_page().await;

    harness.inject_cdp_event(
        &session,
        "Network.requestWillBeSent",
        json!({
            "requestId": "req-1",
            "loaderId": "req-1",
            "documentUrl": "https://example.test/",
            "request": { "url": "https://example.test/", "method": "GET", "headers": {} },
            "wallTime": 0.0,
            "initiator": { "type": "other" },
        }),
    );
    harness.inject_cdp_event(
        &session,
        "Network.requestWillBeSentExtraInfo",
        json!({ "requestId": "req-1", "headers": { "user-agent": "test" } }),
    );
    harness.inject_cdp_event(
        &session,
        "Network.responseReceived",
        json!({
            "requestId": "req-1",
            "loaderId": "req-1",
            "response": { "url": "https://example.test/", "status": 200, "statusText": "OK", "hasExtraInfo": true },
        }),
    );
    harness.inject_cdp_event(
        &session,
        "Network.responseReceivedExtraInfo",
        json!({ "requestId": "req-1", "headers": { "content-type": "text/html" }, "statusCode": 200 }),
    );
    harness.inject_cdp_event(
        &session,
        "Network.loadingFinished",
        json!({ "requestId": "req-1", "encodedDataLength": 128.0 }),
    );

    let events = harness.collect_events(SHORT).await;
    let methods = event_methods(&events);
    assert_eq!(
        methods,
        vec![
            "network.beforeRequestSent",
            "network.responseStarted",
            "network.responseCompleted",
        ]
    );
    for event in &events {
        assert_eq!(event["params"]["redirectCount"], json!(0));
    }
}

/// Scenario 2: `requestWillBeSentExtraInfo` arriving before its matching
/// `requestWillBeSent` must not emit `beforeRequestSent` until the second
/// event lands.
#[tokio::test]
async fn extra_info_first_ordering() {
    let mut harness = Harness::start().await;
    subscribe_all(&mut harness).await;
    let (_context, session) = harness.attach_page().await;

    harness.inject_cdp_event(
        &session,
        "Network.requestWillBeSentExtraInfo",
        json!({ "requestId": "req-1", "headers": { "user-agent": "test" } }),
    );
    let none_yet = harness.collect_events(SHORT).await;
    assert!(event_methods(&none_yet).is_empty(), "unexpected early events: {none_yet:?}");

    harness.inject_cdp_event(
        &session,
        "Network.requestWillBeSent",
        json!({
            "requestId": "req-1",
            "loaderId": "req-1",
            "documentUrl": "https://example.test/",
            "request": { "url": "https://example.test/", "method": "GET", "headers": {} },
            "wallTime": 0.0,
            "initiator": { "type": "other" },
        }),
    );
    let events = harness.collect_events(SHORT).await;
    assert_eq!(event_methods(&events), vec!["network.beforeRequestSent"]);
}

/// Scenario 3: a request-phase intercept blocks `beforeRequestSent` and is
/// released by a single `continueRequest`.
#[tokio::test]
async fn request_phase_interception() {
    let mut harness = Harness::start().await;
    subscribe_all(&mut harness).await;
    let (context, session) = harness.attach_page().await;

    let reply = harness
        .send_command(
            2,
            "network.addIntercept",
            json!({
                "phases": ["beforeRequestSent"],
                "urlPatterns": [{ "type": "string", "pattern": "https://example.test/*" }],
                "contexts": [context],
            }),
        )
        .await;
    let intercept_id = reply["result"]["intercept"].as_str().unwrap().to_string();

    harness.inject_cdp_event(
        &session,
        "Network.requestWillBeSent",
        json!({
            "requestId": "req-1",
            "loaderId": "req-1",
            "documentUrl": "https://example.test/",
            "request": { "url": "https://example.test/", "method": "GET", "headers": {} },
            "wallTime": 0.0,
            "initiator": { "type": "other" },
        }),
    );
    harness.inject_cdp_event(
        &session,
        "Fetch.requestPaused",
        json!({
            "requestId": "req-1",
            "request": { "url": "https://example.test/", "method": "GET", "headers": {} },
            "networkId": "req-1",
        }),
    );

    let events = harness.collect_events(SHORT).await;
    assert_eq!(event_methods(&events), vec!["network.beforeRequestSent"]);
    assert_eq!(events[0]["params"]["isBlocked"], json!(true));
    assert_eq!(events[0]["params"]["intercepts"], json!([intercept_id]));

    let reply = harness
        .send_command(3, "network.continueRequest", json!({ "request": "req-1" }))
        .await;
    assert!(reply.get("result").is_some(), "continueRequest failed: {reply:?}");

    let events = harness.collect_events(SHORT).await;
    assert!(
        !event_methods(&events).contains(&"network.beforeRequestSent".to_string()),
        "beforeRequestSent must not be emitted twice: {events:?}"
    );
}

/// Scenario 4: `authRequired` is the one event allowed to repeat for the
/// same request.
#[tokio::test]
async fn auth_challenge_may_repeat() {
    let mut harness = Harness::start().await;
    subscribe_all(&mut harness).await;
    let (_context, session) = harness.attach_page().await;

    let auth_event = json!({
        "requestId": "req-1",
        "request": { "url": "https://example.test/", "method": "GET", "headers": {} },
        "authChallenge": { "origin": "https://example.test", "scheme": "basic", "realm": "test" },
    });
    harness.inject_cdp_event(&session, "Fetch.authRequired", auth_event.clone());
    let events = harness.collect_events(SHORT).await;
    assert_eq!(event_methods(&events), vec!["network.authRequired"]);
    assert_eq!(events[0]["params"]["request"]["method"], json!("GET"));

    harness.inject_cdp_event(&session, "Fetch.authRequired", auth_event);
    let events = harness.collect_events(SHORT).await;
    assert_eq!(
        event_methods(&events),
        vec!["network.authRequired"],
        "a second auth challenge must emit authRequired again"
    );
}

/// Scenario 5: a redirect synthesizes `responseStarted` then
/// `responseCompleted` for the hop it redirects away from, with
/// `redirectCount` incremented and the request id preserved across the hop.
#[tokio::test]
async fn redirect_synthesizes_completion() {
    let mut harness = Harness::start().await;
    subscribe_all(&mut harness).await;
    let (_context, session) = harness.attach_page().await;

    harness.inject_cdp_event(
        &session,
        "Network.requestWillBeSent",
        json!({
            "requestId": "req-1",
            "loaderId": "req-1",
            "documentUrl": "https://example.test/old",
            "request": { "url": "https://example.test/old", "method": "GET", "headers": {} },
            "wallTime": 0.0,
            "initiator": { "type": "other" },
        }),
    );
    let _ = harness.collect_events(SHORT).await;

    harness.inject_cdp_event(
        &session,
        "Network.requestWillBeSent",
        json!({
            "requestId": "req-1",
            "loaderId": "req-1",
            "documentUrl": "https://example.test/new",
            "request": { "url": "https://example.test/new", "method": "GET", "headers": {} },
            "wallTime": 0.1,
            "initiator": { "type": "other" },
            "redirectResponse": {
                "url": "https://example.test/old",
                "status": 301,
                "statusText": "Moved Permanently",
                "headers": {},
            },
        }),
    );
    let events = harness.collect_events(SHORT).await;
    let methods = event_methods(&events);
    assert_eq!(
        methods,
        vec!["network.responseStarted", "network.responseCompleted"],
        "redirect must synthesize both events for the hop redirected away from"
    );
    for event in &events {
        assert_eq!(event["params"]["redirectCount"], json!(1));
    }

    harness.inject_cdp_event(
        &session,
        "Network.responseReceived",
        json!({
            "requestId": "req-1",
            "loaderId": "req-1",
            "response": { "url": "https://example.test/new", "status": 200, "statusText": "OK" },
        }),
    );
    harness.inject_cdp_event(
        &session,
        "Network.loadingFinished",
        json!({ "requestId": "req-1", "encodedDataLength": 64.0 }),
    );
    let events = harness.collect_events(SHORT).await;
    let completed = events
        .iter()
        .find(|e| e["method"] == "network.responseCompleted")
        .expect("final hop must still complete");
    assert_eq!(completed["params"]["redirectCount"], json!(1));
    assert_eq!(completed["params"]["response"]["status"], json!(200));
}

/// Scenario 6: a favicon request's full event sequence never reaches the
/// BiDi side.
#[tokio::test]
async fn favicon_requests_are_suppressed() {
    let mut harness = Harness::start().await;
    subscribe_all(&mut harness).await;
    let (_context, session) = harness.attach_page().await;

    harness.inject_cdp_event(
        &session,
        "Network.requestWillBeSent",
        json!({
            "requestId": "req-1",
            "loaderId": "req-1",
            "documentUrl": "https://example.test/",
            "request": { "url": "https://example.test/favicon.ico", "method": "GET", "headers": {} },
            "wallTime": 0.0,
            "initiator": { "type": "other" },
        }),
    );
    harness.inject_cdp_event(
        &session,
        "Network.responseReceived",
        json!({
            "requestId": "req-1",
            "loaderId": "req-1",
            "response": { "url": "https://example.test/favicon.ico", "status": 200, "statusText": "OK" },
        }),
    );
    harness.inject_cdp_event(
        &session,
        "Network.loadingFinished",
        json!({ "requestId": "req-1", "encodedDataLength": 16.0 }),
    );

    let events = harness.collect_events(SHORT).await;
    assert!(events.is_empty(), "favicon traffic must not reach the BiDi side: {events:?}");
}
