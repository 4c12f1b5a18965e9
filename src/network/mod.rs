//! The network request tracker (spec.md §4.5): the hardest module in the
//! translator. A `network.*` CDP event only ever arrives piecemeal — this
//! merges those fragments into one record per request and decides, after
//! every fragment, whether any of the three emission gates
//! (`beforeRequestSent`/`responseStarted`/`responseCompleted`) have become
//! ready.
//!
//! The gates are pure functions of the aggregated record plus two
//! predicates the caller supplies (subscribed? intercepted?) — this module
//! has no knowledge of subscriptions or intercepts itself, it only knows
//! how to assemble and gate a request record.

pub mod auth;
pub mod collector;
pub mod intercept;

use cdp_protocol::fetch;
use cdp_protocol::network;
use cdp_protocol::page::LoaderId;
use fnv::FnvHashMap;

use crate::bidi::types::{
    headers_from_cdp, timings_from_cdp, AuthRequiredParams, BeforeRequestSentParams,
    BidiAuthChallenge, BidiRequestData, BidiResponseData, FetchErrorParams,
    ResponseCompletedParams, ResponseStartedParams,
};
pub use intercept::InterceptPhase;
use intercept::InterceptRegistry;

use crate::registry::{BrowsingContextId, NavigationId};

/// Every CDP fragment observed for one request id, kept exactly as
/// received. Nothing here computes a gate; `NetworkRequestRecord` does.
#[derive(Debug, Default, Clone)]
struct RequestBuckets {
    info: Option<network::RequestWillBeSentEvent>,
    extra_info: Option<network::RequestWillBeSentExtraInfoEvent>,
    paused: Option<fetch::RequestPausedEvent>,
}

#[derive(Debug, Default, Clone)]
struct ResponseBuckets {
    info: Option<network::ResponseReceivedEvent>,
    extra_info: Option<network::ResponseReceivedExtraInfoEvent>,
    paused: Option<fetch::RequestPausedEvent>,
}

#[derive(Debug, Default)]
struct EmittedGuard {
    before_request_sent: bool,
    response_started: bool,
    response_completed: bool,
    fetch_error: bool,
}

#[derive(Debug)]
pub struct NetworkRequestRecord {
    pub id: network::RequestId,
    pub context: BrowsingContextId,
    pub navigation: Option<NavigationId>,
    pub redirect_count: u32,
    pub served_from_cache: bool,
    pub loading_failed: Option<String>,
    pub intercept_phase: Option<InterceptPhase>,
    request: RequestBuckets,
    response: ResponseBuckets,
    emitted: EmittedGuard,
}

fn is_data_url(url: &str) -> bool {
    url.starts_with("data:")
}

impl NetworkRequestRecord {
    fn new(id: network::RequestId, context: BrowsingContextId, navigation: Option<NavigationId>) -> Self {
        NetworkRequestRecord {
            id,
            context,
            navigation,
            redirect_count: 0,
            served_from_cache: false,
            loading_failed: None,
            intercept_phase: None,
            request: RequestBuckets::default(),
            response: ResponseBuckets::default(),
            emitted: EmittedGuard::default(),
        }
    }

    fn extra_info_resolved(&self) -> bool {
        self.request.extra_info.is_some()
            || self.served_from_cache
            || is_data_url(&self.request.info.as_ref().map(|i| i.request.url.as_str()).unwrap_or(""))
            || self.loading_failed.is_some()
    }

    fn before_request_sent_ready(&self, intercept_expected: bool) -> bool {
        if self.emitted.before_request_sent || self.request.info.is_none() {
            return false;
        }
        if intercept_expected {
            self.request.paused.is_some()
        } else {
            self.extra_info_resolved()
        }
    }

    fn response_extra_info_resolved(&self) -> bool {
        self.response.extra_info.is_some()
            || self.served_from_cache
            || self
                .response
                .info
                .as_ref()
                .map(|r| !r.response.has_extra_info)
                .unwrap_or(false)
    }

    fn response_started_ready(&self, intercept_expected: bool) -> bool {
        if self.emitted.response_started {
            return false;
        }
        if self.response.info.is_none() {
            return false;
        }
        if intercept_expected {
            self.response.paused.is_some()
        } else {
            true
        }
    }

    fn response_completed_ready(&self, intercept_expected: bool) -> bool {
        if self.emitted.response_completed {
            return false;
        }
        self.response.info.is_some()
            && self.response_extra_info_resolved()
            && (!intercept_expected || self.response.paused.is_some())
    }

    fn request_data(&self) -> BidiRequestData {
        let info = self.request.info.as_ref();
        let url = info.map(|i| i.request.url.clone()).unwrap_or_default();
        let method = info.map(|i| i.request.method.clone()).unwrap_or_default();
        let headers = self
            .request
            .extra_info
            .as_ref()
            .map(|e| headers_from_cdp(&e.headers))
            .or_else(|| info.map(|i| headers_from_cdp(&i.request.headers)))
            .unwrap_or_default();
        let body_size = info.and_then(|i| {
            i.request
                .post_data
                .as_ref()
                .map(|d| d.len() as i64)
                .or(if i.request.has_post_data { None } else { Some(0) })
        });
        BidiRequestData {
            request: self.id.0.clone(),
            url,
            method,
            headers,
            headers_size: -1,
            body_size,
            timings: timings_from_cdp(
                self.response.info.as_ref().and_then(|r| r.response.timing.as_ref()),
            ),
        }
    }

    fn response_data(&self) -> BidiResponseData {
        let info = self.response.info.as_ref().map(|r| &r.response);
        let auth_challenges = info
            .filter(|r| matches!(r.status, 401 | 407))
            .and_then(|r| {
                let header_name = auth::challenge_header_for_status(r.status)?;
                r.headers
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(header_name))
                    .and_then(|(_, v)| auth::parse_challenge(v))
            })
            .map(|c: BidiAuthChallenge| vec![c])
            .unwrap_or_default();
        BidiResponseData {
            url: info.map(|r| r.url.clone()).unwrap_or_default(),
            protocol: String::new(),
            status: info.map(|r| r.status).unwrap_or(0),
            status_text: info.map(|r| r.status_text.clone()).unwrap_or_default(),
            from_cache: self.served_from_cache
                || info.map(|r| r.from_disk_cache || r.from_service_worker).unwrap_or(false),
            headers: self
                .response
                .extra_info
                .as_ref()
                .map(|e| headers_from_cdp(&e.headers))
                .or_else(|| info.map(|r| headers_from_cdp(&r.headers)))
                .unwrap_or_default(),
            mime_type: String::new(),
            bytes_received: 0,
            headers_size: -1,
            body_size: None,
            auth_challenges,
        }
    }

    fn timestamp_ms(&self) -> i64 {
        self.request
            .info
            .as_ref()
            .map(|i| (i.wall_time * 1000.0) as i64)
            .unwrap_or(0)
    }
}

/// An outcome of feeding one CDP fragment into the tracker: a BiDi event
/// ready to hand to the event manager, or a CDP command the tracker needs
/// issued on its behalf (auto-continuing a paused request nothing is
/// listening for).
#[derive(Debug)]
pub enum NetworkEffect {
    Emit {
        method: &'static str,
        context: Option<BrowsingContextId>,
        params: serde_json::Value,
    },
    AutoContinueRequest(network::RequestId),
    AutoContinueResponse(network::RequestId),
}

/// Caller-supplied predicates: does anyone want this event, and is this
/// request under interception for this phase. The tracker has no
/// subscription/intercept state of its own.
pub struct Gates<'a> {
    pub top_level: &'a BrowsingContextId,
    pub subscribed_before_request_sent: bool,
    pub subscribed_response_started: bool,
    pub subscribed_response_completed: bool,
    pub subscribed_auth_required: bool,
    pub subscribed_fetch_error: bool,
    pub intercepts: &'a InterceptRegistry,
}

impl Gates<'_> {
    fn request_intercepted(&self, url: &str) -> bool {
        self.intercepts
            .any_matches(url, InterceptPhase::BeforeRequestSent, Some(self.top_level))
    }

    fn response_intercepted(&self, url: &str) -> bool {
        self.intercepts
            .any_matches(url, InterceptPhase::ResponseStarted, Some(self.top_level))
    }
}

#[derive(Default)]
pub struct NetworkRequestTracker {
    requests: FnvHashMap<network::RequestId, NetworkRequestRecord>,
    loader_to_request: FnvHashMap<LoaderId, network::RequestId>,
}

impl NetworkRequestTracker {
    /// A favicon request has no document association a BiDi client can act
    /// on and is suppressed outright (spec.md §4.5.7).
    fn is_favicon(url: &str) -> bool {
        url.ends_with("/favicon.ico")
    }

    pub fn handle_request_will_be_sent(
        &mut self,
        context: BrowsingContextId,
        navigation: Option<NavigationId>,
        event: network::RequestWillBeSentEvent,
        gates: &Gates,
    ) -> Vec<NetworkEffect> {
        let mut effects = Vec::new();
        if Self::is_favicon(&event.request.url) {
            return effects;
        }

        let mut redirect_count = 0;

        // A redirect delivers its own `requestWillBeSent` carrying
        // `redirect_response` for the previous hop; synthesize that hop's
        // `responseCompleted` before starting the new record (spec.md
        // §4.5.3).
        if let Some(redirect_response) = event.redirect_response.clone() {
            if let Some(mut prev) = self.requests.remove(&event.request_id) {
                redirect_count = prev.redirect_count + 1;
                prev.response.info = Some(network::ResponseReceivedEvent {
                    request_id: event.request_id.clone(),
                    loader_id: event.loader_id.clone(),
                    response: redirect_response,
                    resource_type: event.resource_type.clone(),
                    frame_id: event.frame_id.clone(),
                });
                if event.redirect_has_extra_info {
                    // The extra-info for the redirected hop was already
                    // consumed against the old record by the time this
                    // arrives; treat it as resolved either way.
                }
                let intercept_expected =
                    gates.response_intercepted(prev.request.info.as_ref().map(|i| i.request.url.as_str()).unwrap_or(""));

                // spec.md §4.5.4/§8 scenario 5: a redirect synthesizes both
                // `responseStarted` and `responseCompleted` for the hop it
                // redirects away from, `responseStarted` first.
                if prev.response_started_ready(intercept_expected) && !prev.emitted.response_started {
                    prev.emitted.response_started = true;
                    if gates.subscribed_response_started {
                        effects.push(NetworkEffect::Emit {
                            method: "network.responseStarted",
                            context: Some(prev.context.clone()),
                            params: serde_json::to_value(ResponseStartedParams {
                                context: Some(prev.context.to_string()),
                                navigation: prev.navigation.map(|n| n.to_string()),
                                redirect_count: prev.redirect_count,
                                request: prev.request_data(),
                                response: prev.response_data(),
                                timestamp: prev.timestamp_ms(),
                                is_blocked: false,
                                intercepts: Vec::new(),
                            })
                            .unwrap_or_default(),
                        });
                    }
                }
                if prev.response_completed_ready(intercept_expected) && !prev.emitted.response_completed {
                    prev.emitted.response_completed = true;
                    if gates.subscribed_response_completed {
                        effects.push(NetworkEffect::Emit {
                            method: "network.responseCompleted",
                            context: Some(prev.context.clone()),
                            params: serde_json::to_value(ResponseCompletedParams {
                                context: Some(prev.context.to_string()),
                                navigation: prev.navigation.map(|n| n.to_string()),
                                redirect_count: prev.redirect_count,
                                request: prev.request_data(),
                                response: prev.response_data(),
                                timestamp: prev.timestamp_ms(),
                            })
                            .unwrap_or_default(),
                        });
                    }
                }
            }
        }

        let mut record = NetworkRequestRecord::new(event.request_id.clone(), context, navigation);
        record.redirect_count = redirect_count;
        record.request.info = Some(event.clone());
        self.loader_to_request
            .insert(event.loader_id.clone(), event.request_id.clone());

        let intercept_expected = gates.request_intercepted(&event.request.url);
        if record.before_request_sent_ready(intercept_expected) {
            record.emitted.before_request_sent = true;
            if gates.subscribed_before_request_sent {
                effects.push(Self::before_request_sent_effect(&record));
            }
        }
        self.requests.insert(event.request_id.clone(), record);
        effects
    }

    fn before_request_sent_effect(record: &NetworkRequestRecord) -> NetworkEffect {
        NetworkEffect::Emit {
            method: "network.beforeRequestSent",
            context: Some(record.context.clone()),
            params: serde_json::to_value(BeforeRequestSentParams {
                context: Some(record.context.to_string()),
                navigation: record.navigation.map(|n| n.to_string()),
                redirect_count: record.redirect_count,
                request: record.request_data(),
                timestamp: record.timestamp_ms(),
                initiator: serde_json::json!({"type": "other"}),
                is_blocked: false,
                intercepts: Vec::new(),
            })
            .unwrap_or_default(),
        }
    }

    pub fn handle_request_will_be_sent_extra_info(
        &mut self,
        event: network::RequestWillBeSentExtraInfoEvent,
        gates: &Gates,
    ) -> Vec<NetworkEffect> {
        let mut effects = Vec::new();
        let Some(record) = self.requests.get_mut(&event.request_id) else {
            return effects;
        };
        record.request.extra_info = Some(event);
        let url = record
            .request
            .info
            .as_ref()
            .map(|i| i.request.url.clone())
            .unwrap_or_default();
        let intercept_expected = gates.request_intercepted(&url);
        if record.before_request_sent_ready(intercept_expected) {
            record.emitted.before_request_sent = true;
            if gates.subscribed_before_request_sent {
                effects.push(Self::before_request_sent_effect(record));
            }
        }
        effects
    }

    pub fn handle_response_received(
        &mut self,
        event: network::ResponseReceivedEvent,
        gates: &Gates,
    ) -> Vec<NetworkEffect> {
        let mut effects = Vec::new();
        let request_id = event.request_id.clone();
        let Some(record) = self.requests.get_mut(&request_id) else {
            return effects;
        };
        record.response.info = Some(event);
        let url = record
            .request
            .info
            .as_ref()
            .map(|i| i.request.url.clone())
            .unwrap_or_default();

        let intercept_started = gates.response_intercepted(&url);
        if record.response_started_ready(intercept_started) {
            record.emitted.response_started = true;
            if gates.subscribed_response_started {
                effects.push(NetworkEffect::Emit {
                    method: "network.responseStarted",
                    context: Some(record.context.clone()),
                    params: serde_json::to_value(ResponseStartedParams {
                        context: Some(record.context.to_string()),
                        navigation: record.navigation.map(|n| n.to_string()),
                        redirect_count: record.redirect_count,
                        request: record.request_data(),
                        response: record.response_data(),
                        timestamp: record.timestamp_ms(),
                        is_blocked: false,
                        intercepts: Vec::new(),
                    })
                    .unwrap_or_default(),
                });
            }
        }
        if record.response_completed_ready(intercept_started) {
            record.emitted.response_completed = true;
            if gates.subscribed_response_completed {
                effects.push(NetworkEffect::Emit {
                    method: "network.responseCompleted",
                    context: Some(record.context.clone()),
                    params: serde_json::to_value(ResponseCompletedParams {
                        context: Some(record.context.to_string()),
                        navigation: record.navigation.map(|n| n.to_string()),
                        redirect_count: record.redirect_count,
                        request: record.request_data(),
                        response: record.response_data(),
                        timestamp: record.timestamp_ms(),
                    })
                    .unwrap_or_default(),
                });
            }
            self.requests.remove(&request_id);
            return effects;
        }
        effects
    }

    pub fn handle_response_received_extra_info(
        &mut self,
        event: network::ResponseReceivedExtraInfoEvent,
        gates: &Gates,
    ) -> Vec<NetworkEffect> {
        let mut effects = Vec::new();
        let request_id = event.request_id.clone();
        let Some(record) = self.requests.get_mut(&request_id) else {
            // Extra-info can arrive before `responseReceived` itself; the
            // spec's decision (§D) is to hold it and let the eventual
            // `responseReceived` re-check, which we cannot do without a
            // place to stash it. We accept the narrow race: a record that
            // doesn't exist yet means this event is for a request this
            // tracker never saw `requestWillBeSent` for (e.g. a race at
            // attach), and is dropped.
            return effects;
        };

        // A 3xx extra-info whose `location` echoes the in-flight request
        // URL is the artifact CDP emits for the hop this request is about
        // to redirect away from, not for the final response; applying it
        // here would mis-attribute its headers (spec.md §4.5.4).
        let is_redirect_artifact = matches!(event.status_code, Some(300..=399))
            && record
                .request
                .info
                .as_ref()
                .map(|i| i.request.url.as_str())
                .zip(
                    event
                        .headers
                        .iter()
                        .find(|(k, _)| k.eq_ignore_ascii_case("location"))
                        .map(|(_, v)| v.as_str()),
                )
                .map(|(in_flight, location)| in_flight == location)
                .unwrap_or(false);
        if is_redirect_artifact {
            return effects;
        }

        record.response.extra_info = Some(event);
        let url = record
            .request
            .info
            .as_ref()
            .map(|i| i.request.url.clone())
            .unwrap_or_default();
        let intercept_started = gates.response_intercepted(&url);
        if record.response_completed_ready(intercept_started) {
            record.emitted.response_completed = true;
            if gates.subscribed_response_completed {
                effects.push(NetworkEffect::Emit {
                    method: "network.responseCompleted",
                    context: Some(record.context.clone()),
                    params: serde_json::to_value(ResponseCompletedParams {
                        context: Some(record.context.to_string()),
                        navigation: record.navigation.map(|n| n.to_string()),
                        redirect_count: record.redirect_count,
                        request: record.request_data(),
                        response: record.response_data(),
                        timestamp: record.timestamp_ms(),
                    })
                    .unwrap_or_default(),
                });
            }
            self.requests.remove(&request_id);
        }
        effects
    }

    pub fn handle_served_from_cache(&mut self, event: network::RequestServedFromCacheEvent) {
        if let Some(record) = self.requests.get_mut(&event.request_id) {
            record.served_from_cache = true;
        }
    }

    pub fn handle_loading_failed(
        &mut self,
        event: network::LoadingFailedEvent,
        gates: &Gates,
    ) -> Vec<NetworkEffect> {
        let mut effects = Vec::new();
        let request_id = event.request_id.clone();
        let Some(record) = self.requests.get_mut(&request_id) else {
            return effects;
        };
        record.loading_failed = Some(event.error_text.clone());
        if !record.emitted.fetch_error {
            record.emitted.fetch_error = true;
            if gates.subscribed_fetch_error {
                effects.push(NetworkEffect::Emit {
                    method: "network.fetchError",
                    context: Some(record.context.clone()),
                    params: serde_json::to_value(FetchErrorParams {
                        context: Some(record.context.to_string()),
                        navigation: record.navigation.map(|n| n.to_string()),
                        redirect_count: record.redirect_count,
                        request: record.request_data(),
                        timestamp: record.timestamp_ms(),
                        error_text: event.error_text,
                    })
                    .unwrap_or_default(),
                });
            }
        }
        // Terminal for this record regardless of whether anyone was
        // subscribed to hear about it (spec.md §4.5.2: disposed after
        // `responseCompleted` or `fetchError`).
        self.requests.remove(&request_id);
        effects
    }

    pub fn handle_loading_finished(&mut self, event: network::LoadingFinishedEvent) {
        // Request bookkeeping only; the completion gate already fires off
        // `responseReceived`/extra-info, not off this event, since a
        // streaming body may finish long after the headers are visible.
        let _ = event;
    }

    pub fn handle_request_paused(
        &mut self,
        event: fetch::RequestPausedEvent,
        gates: &Gates,
    ) -> Vec<NetworkEffect> {
        let mut effects = Vec::new();
        let request_id: network::RequestId = event
            .network_id
            .clone()
            .unwrap_or_else(|| event.request_id.clone().into());

        if event.is_response_phase() {
            let intercept_expected = gates.response_intercepted(&event.request.url);
            let Some(record) = self.requests.get_mut(&request_id) else {
                return effects;
            };
            record.response.paused = Some(event.clone());
            if !intercept_expected {
                effects.push(NetworkEffect::AutoContinueResponse(event.request_id.clone().into()));
                return effects;
            }
            if record.response_started_ready(true) && !record.emitted.response_started {
                record.emitted.response_started = true;
                record.intercept_phase = Some(InterceptPhase::ResponseStarted);
                if gates.subscribed_response_started {
                    effects.push(NetworkEffect::Emit {
                        method: "network.responseStarted",
                        context: Some(record.context.clone()),
                        params: serde_json::to_value(ResponseStartedParams {
                            context: Some(record.context.to_string()),
                            navigation: record.navigation.map(|n| n.to_string()),
                            redirect_count: record.redirect_count,
                            request: record.request_data(),
                            response: record.response_data(),
                            timestamp: record.timestamp_ms(),
                            is_blocked: false,
                            intercepts: gates
                                .intercepts
                                .matching(&event.request.url, InterceptPhase::ResponseStarted, Some(gates.top_level)),
                        })
                        .unwrap_or_default(),
                    });
                }
            }
        } else {
            let intercept_expected = gates.request_intercepted(&event.request.url);
            let Some(record) = self.requests.get_mut(&request_id) else {
                return effects;
            };
            record.request.paused = Some(event.clone());
            if !intercept_expected {
                effects.push(NetworkEffect::AutoContinueRequest(event.request_id.clone().into()));
                return effects;
            }
            if record.before_request_sent_ready(true) && !record.emitted.before_request_sent {
                record.emitted.before_request_sent = true;
                record.intercept_phase = Some(InterceptPhase::BeforeRequestSent);
                if gates.subscribed_before_request_sent {
                    effects.push(NetworkEffect::Emit {
                        method: "network.beforeRequestSent",
                        context: Some(record.context.clone()),
                        params: serde_json::to_value(BeforeRequestSentParams {
                            context: Some(record.context.to_string()),
                            navigation: record.navigation.map(|n| n.to_string()),
                            redirect_count: record.redirect_count,
                            request: record.request_data(),
                            timestamp: record.timestamp_ms(),
                            initiator: serde_json::json!({"type": "other"}),
                            is_blocked: true,
                            intercepts: gates.intercepts.matching(
                                &event.request.url,
                                InterceptPhase::BeforeRequestSent,
                                Some(gates.top_level),
                            ),
                        })
                        .unwrap_or_default(),
                    });
                }
            }
        }
        effects
    }

    pub fn handle_auth_required(
        &mut self,
        event: fetch::AuthRequiredEvent,
        gates: &Gates,
    ) -> Vec<NetworkEffect> {
        let mut effects = Vec::new();
        let request_id: network::RequestId = event.request_id.clone().into();
        if let Some(record) = self.requests.get_mut(&request_id) {
            record.intercept_phase = Some(InterceptPhase::AuthRequired);
        }
        let Some(record) = self.requests.get(&request_id) else {
            return effects;
        };
        if gates.subscribed_auth_required {
            let mut response = record.response_data();
            response.auth_challenges = vec![BidiAuthChallenge {
                scheme: event.auth_challenge.scheme.clone(),
                realm: event.auth_challenge.realm.clone(),
            }];
            effects.push(NetworkEffect::Emit {
                method: "network.authRequired",
                context: Some(record.context.clone()),
                params: serde_json::to_value(AuthRequiredParams {
                    context: Some(record.context.to_string()),
                    navigation: record.navigation.map(|n| n.to_string()),
                    redirect_count: record.redirect_count,
                    request: record.request_data(),
                    response,
                    timestamp: record.timestamp_ms(),
                })
                .unwrap_or_default(),
            });
        }
        effects
    }

    pub fn navigation_for_loader(&self, loader_id: &LoaderId) -> Option<&network::RequestId> {
        self.loader_to_request.get(loader_id)
    }

    pub fn remove_context(&mut self, context: &BrowsingContextId) {
        self.requests.retain(|_, r| &r.context != context);
    }

    pub fn get(&self, id: &network::RequestId) -> Option<&NetworkRequestRecord> {
        self.requests.get(id)
    }

    /// Phase-gates the five interception-reply commands (spec.md §4.5.3):
    /// `continueRequest` needs `beforeRequestSent`, `continueWithAuth`
    /// needs `authRequired`, `continueResponse` accepts either
    /// `authRequired` (per the `ProvideCredentials`-default decision) or
    /// `responseStarted`, `failRequest` forbids `authRequired`,
    /// `provideResponse` accepts any phase. On success the phase is
    /// cleared.
    pub fn gate_intercept_command(
        &mut self,
        id: &network::RequestId,
        command: InterceptCommand,
    ) -> Result<(), crate::error::BidiError> {
        let Some(record) = self.requests.get_mut(id) else {
            return Err(crate::error::BidiError::no_such_request(format!(
                "no such request {}",
                id.0
            )));
        };
        let phase = record.intercept_phase;
        let ok = match (command, phase) {
            (InterceptCommand::ContinueRequest, Some(InterceptPhase::BeforeRequestSent)) => true,
            (InterceptCommand::ContinueWithAuth, Some(InterceptPhase::AuthRequired)) => true,
            (
                InterceptCommand::ContinueResponse,
                Some(InterceptPhase::AuthRequired) | Some(InterceptPhase::ResponseStarted),
            ) => true,
            (InterceptCommand::FailRequest, Some(InterceptPhase::AuthRequired)) => false,
            (InterceptCommand::FailRequest, Some(_)) => true,
            (InterceptCommand::ProvideResponse, Some(_)) => true,
            _ => false,
        };
        if !ok {
            return Err(crate::error::BidiError::no_such_request(format!(
                "request {} is not awaiting {:?}",
                id.0, command
            )));
        }
        record.intercept_phase = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_protocol::fetch;
    use cdp_protocol::network::{Initiator, Request, Response};

    fn ctx() -> BrowsingContextId {
        BrowsingContextId("ctx-1".into())
    }

    fn open_gates<'a>(intercepts: &'a InterceptRegistry, top_level: &'a BrowsingContextId) -> Gates<'a> {
        Gates {
            top_level,
            subscribed_before_request_sent: true,
            subscribed_response_started: true,
            subscribed_response_completed: true,
            subscribed_auth_required: true,
            subscribed_fetch_error: true,
            intercepts,
        }
    }

    fn request_will_be_sent(url: &str) -> network::RequestWillBeSentEvent {
        network::RequestWillBeSentEvent {
            request_id: network::RequestId("req-1".into()),
            loader_id: LoaderId("req-1".into()),
            document_url: url.into(),
            request: Request {
                url: url.into(),
                method: "GET".into(),
                headers: Default::default(),
                post_data: None,
                has_post_data: false,
            },
            wall_time: 0.0,
            initiator: Initiator {
                r#type: "other".into(),
                request_id: None,
            },
            redirect_has_extra_info: false,
            redirect_response: None,
            frame_id: None,
            resource_type: None,
        }
    }

    fn response_received(status: i64) -> network::ResponseReceivedEvent {
        network::ResponseReceivedEvent {
            request_id: network::RequestId("req-1".into()),
            loader_id: LoaderId("req-1".into()),
            response: Response {
                url: "https://example.test/".into(),
                status,
                status_text: "OK".into(),
                headers: Default::default(),
                from_disk_cache: false,
                from_service_worker: false,
                has_extra_info: true,
                timing: None,
                remote_ip_address: None,
            },
            resource_type: None,
            frame_id: None,
        }
    }

    fn emitted_methods(effects: &[NetworkEffect]) -> Vec<&'static str> {
        effects
            .iter()
            .filter_map(|e| match e {
                NetworkEffect::Emit { method, .. } => Some(*method),
                _ => None,
            })
            .collect()
    }

    /// Scenario 1 (spec.md §8): normal navigation in the documented event
    /// order, no interception.
    #[test]
    fn normal_navigation_emits_events_in_order() {
        let mut tracker = NetworkRequestTracker::default();
        let intercepts = InterceptRegistry::default();
        let gates = open_gates(&intercepts, &ctx());

        let e1 = tracker.handle_request_will_be_sent(
            ctx(),
            None,
            request_will_be_sent("https://example.test/"),
            &gates,
        );
        assert!(emitted_methods(&e1).is_empty(), "beforeRequestSent awaits extra-info");

        let e2 = tracker.handle_request_will_be_sent_extra_info(
            network::RequestWillBeSentExtraInfoEvent {
                request_id: network::RequestId("req-1".into()),
                associated_cookies: Vec::new(),
                headers: Default::default(),
            },
            &gates,
        );
        assert_eq!(emitted_methods(&e2), vec!["network.beforeRequestSent"]);

        let e3 = tracker.handle_response_received(response_received(200), &gates);
        assert_eq!(emitted_methods(&e3), vec!["network.responseStarted"]);

        let e4 = tracker.handle_response_received_extra_info(
            network::ResponseReceivedExtraInfoEvent {
                request_id: network::RequestId("req-1".into()),
                headers: Default::default(),
                blocked_cookies: Vec::new(),
                status_code: Some(200),
            },
            &gates,
        );
        assert_eq!(emitted_methods(&e4), vec!["network.responseCompleted"]);

        tracker.handle_loading_finished(network::LoadingFinishedEvent {
            request_id: network::RequestId("req-1".into()),
            encoded_data_length: 0.0,
        });

        // Disposed after responseCompleted.
        assert!(tracker.get(&network::RequestId("req-1".into())).is_none());
    }

    /// Scenario 2: extra-info arriving before `requestWillBeSent` holds
    /// `beforeRequestSent` until the primary event arrives.
    #[test]
    fn extra_info_first_defers_before_request_sent() {
        let mut tracker = NetworkRequestTracker::default();
        let intercepts = InterceptRegistry::default();
        let gates = open_gates(&intercepts, &ctx());

        let early = tracker.handle_request_will_be_sent_extra_info(
            network::RequestWillBeSentExtraInfoEvent {
                request_id: network::RequestId("req-1".into()),
                associated_cookies: Vec::new(),
                headers: Default::default(),
            },
            &gates,
        );
        assert!(emitted_methods(&early).is_empty());

        let after = tracker.handle_request_will_be_sent(
            ctx(),
            None,
            request_will_be_sent("https://example.test/"),
            &gates,
        );
        assert_eq!(emitted_methods(&after), vec!["network.beforeRequestSent"]);
    }

    /// Scenario 3: request-phase interception blocks `beforeRequestSent`
    /// with `isBlocked=true` until `continueRequest` is accepted.
    #[test]
    fn request_phase_interception_blocks_and_continues_once() {
        let mut tracker = NetworkRequestTracker::default();
        let mut intercepts = InterceptRegistry::default();
        let intercept_id = intercepts.add(
            vec![InterceptPhase::BeforeRequestSent],
            vec![crate::urlpattern::UrlPattern::raw("https://example.test/*").unwrap()],
            None,
        );
        let gates = open_gates(&intercepts, &ctx());

        tracker.handle_request_will_be_sent(
            ctx(),
            None,
            request_will_be_sent("https://example.test/"),
            &gates,
        );

        let paused = fetch::RequestPausedEvent {
            request_id: network::RequestId("req-1".into()),
            request: Request {
                url: "https://example.test/".into(),
                method: "GET".into(),
                headers: Default::default(),
                post_data: None,
                has_post_data: false,
            },
            frame_id: None,
            resource_type: None,
            response_error_reason: None,
            response_status_code: None,
            response_headers: None,
            network_id: Some(network::RequestId("req-1".into())),
        };
        let effects = tracker.handle_request_paused(paused, &gates);
        assert_eq!(emitted_methods(&effects), vec!["network.beforeRequestSent"]);
        let params = match &effects[0] {
            NetworkEffect::Emit { params, .. } => params,
            _ => unreachable!(),
        };
        assert_eq!(params["isBlocked"], serde_json::json!(true));
        assert_eq!(params["intercepts"], serde_json::json!([intercept_id]));

        let id = network::RequestId("req-1".into());
        assert_eq!(
            tracker.get(&id).unwrap().intercept_phase,
            Some(InterceptPhase::BeforeRequestSent)
        );
        tracker
            .gate_intercept_command(&id, InterceptCommand::ContinueRequest)
            .expect("continueRequest accepted while awaiting beforeRequestSent");
        assert!(tracker.get(&id).unwrap().intercept_phase.is_none());

        // A second continueRequest on the now-idle phase is rejected.
        assert!(tracker
            .gate_intercept_command(&id, InterceptCommand::ContinueRequest)
            .is_err());
    }

    /// Scenario 4: `authRequired` may fire more than once for the same
    /// request, unlike every other network event.
    #[test]
    fn auth_required_may_repeat() {
        let mut tracker = NetworkRequestTracker::default();
        let intercepts = InterceptRegistry::default();
        let gates = open_gates(&intercepts, &ctx());

        tracker.handle_request_will_be_sent(
            ctx(),
            None,
            request_will_be_sent("https://example.test/"),
            &gates,
        );

        let challenge = || fetch::AuthRequiredEvent {
            request_id: network::RequestId("req-1".into()),
            request: Request {
                url: "https://example.test/".into(),
                method: "GET".into(),
                headers: Default::default(),
                post_data: None,
                has_post_data: false,
            },
            frame_id: None,
            resource_type: None,
            auth_challenge: fetch::AuthChallenge {
                source: None,
                origin: "https://example.test".into(),
                scheme: "Basic".into(),
                realm: "test".into(),
            },
        };

        let first = tracker.handle_auth_required(challenge(), &gates);
        assert_eq!(emitted_methods(&first), vec!["network.authRequired"]);
        let second = tracker.handle_auth_required(challenge(), &gates);
        assert_eq!(emitted_methods(&second), vec!["network.authRequired"]);
    }

    /// Scenario 5: a redirect synthesizes `responseCompleted` for the
    /// redirected-away-from hop and increments `redirectCount` while
    /// preserving the request id across the chain.
    #[test]
    fn redirect_synthesizes_completion_and_increments_count() {
        let mut tracker = NetworkRequestTracker::default();
        let intercepts = InterceptRegistry::default();
        let gates = open_gates(&intercepts, &ctx());

        tracker.handle_request_will_be_sent(
            ctx(),
            None,
            request_will_be_sent("https://example.test/old"),
            &gates,
        );

        let mut redirected = request_will_be_sent("https://example.test/new");
        redirected.redirect_response = Some(Response {
            url: "https://example.test/old".into(),
            status: 301,
            status_text: "Moved Permanently".into(),
            headers: Default::default(),
            from_disk_cache: false,
            from_service_worker: false,
            has_extra_info: false,
            timing: None,
            remote_ip_address: None,
        });
        let effects = tracker.handle_request_will_be_sent(ctx(), None, redirected, &gates);
        let methods = emitted_methods(&effects);
        assert_eq!(
            methods,
            vec!["network.responseStarted", "network.responseCompleted"],
            "redirect must synthesize responseStarted before responseCompleted for the hop redirected away from"
        );

        let id = network::RequestId("req-1".into());
        assert_eq!(tracker.get(&id).unwrap().redirect_count, 1);

        let e = tracker.handle_response_received(response_received(200), &gates);
        assert_eq!(emitted_methods(&e), vec!["network.responseStarted"]);
        let e2 = tracker.handle_response_received_extra_info(
            network::ResponseReceivedExtraInfoEvent {
                request_id: id.clone(),
                headers: Default::default(),
                blocked_cookies: Vec::new(),
                status_code: Some(200),
            },
            &gates,
        );
        assert_eq!(emitted_methods(&e2), vec!["network.responseCompleted"]);
    }

    /// Scenario 6: favicon requests never produce any BiDi event.
    #[test]
    fn favicon_requests_are_suppressed() {
        let mut tracker = NetworkRequestTracker::default();
        let intercepts = InterceptRegistry::default();
        let gates = open_gates(&intercepts, &ctx());

        let effects = tracker.handle_request_will_be_sent(
            ctx(),
            None,
            request_will_be_sent("https://example.test/favicon.ico"),
            &gates,
        );
        assert!(effects.is_empty());
        assert!(tracker.get(&network::RequestId("req-1".into())).is_none());
    }

    /// spec.md §4.5.4: a 3xx `responseReceivedExtraInfo` whose `location`
    /// echoes the in-flight request URL is a redirect artifact and must
    /// not be applied to the final response.
    #[test]
    fn redirect_extra_info_artifact_is_dropped() {
        let mut tracker = NetworkRequestTracker::default();
        let intercepts = InterceptRegistry::default();
        let gates = open_gates(&intercepts, &ctx());

        tracker.handle_request_will_be_sent(
            ctx(),
            None,
            request_will_be_sent("https://example.test/"),
            &gates,
        );
        tracker.handle_response_received(response_received(200), &gates);

        let mut headers = network::Headers::default();
        headers.insert("location".into(), "https://example.test/".into());
        let effects = tracker.handle_response_received_extra_info(
            network::ResponseReceivedExtraInfoEvent {
                request_id: network::RequestId("req-1".into()),
                headers,
                blocked_cookies: Vec::new(),
                status_code: Some(302),
            },
            &gates,
        );
        assert!(effects.is_empty());
        let id = network::RequestId("req-1".into());
        assert!(tracker.get(&id).unwrap().response.extra_info.is_none());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptCommand {
    ContinueRequest,
    ContinueResponse,
    ContinueWithAuth,
    FailRequest,
    ProvideResponse,
}
