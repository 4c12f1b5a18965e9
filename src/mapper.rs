//! The mapper (spec.md §4/§5): the single object every processor and every
//! CDP event ultimately runs through. It owns every registry, drives the
//! `Fetch.enable` ref-count policy, turns raw CDP events into BiDi ones, and
//! is the only thing in this crate that ever calls `.await` across a
//! borrow boundary.
//!
//! Grounded on `spider_chrome::handler::Handler` (`src/handler/mod.rs`):
//! the teacher's `Handler` is exactly this shape — one struct owning every
//! session/target/listener table, polled from a single task, translating
//! `Connection` events into the values its own callers see. The difference
//! is what's on the other side: the teacher hands events to `Page`/element
//! callers, this hands replies and events to a BiDi transport.

use futures::{SinkExt, StreamExt};

use cdp_protocol::target::{SessionId, TargetId};
use cdp_protocol::{fetch, page, runtime, target};

use crate::bidi::router::{parse_command, BidiCommand, BidiMessageOut};
use crate::cdp_client::CdpClient;
use crate::cdp_conn::{CdpConnection, CdpConnectionHandle, ConnEvent};
use crate::config::{InterceptMode, TranslatorConfig};
use crate::error::{BidiError, CdpError, Result};
use crate::events::EventManager;
use crate::network::collector::DataCollectorRegistry;
use crate::network::intercept::InterceptRegistry;
use crate::network::{Gates, NetworkRequestTracker};
use crate::processors;
use crate::registry::{
    BrowsingContextId, CdpTarget, ContextTree, NavigationId, NavigationTracker, RealmTable,
    TargetTable, UserContextId,
};
use crate::subscription::SubscriptionManager;
use crate::transport::Transport;

/// Owns every piece of translator state. A `Mapper` never outlives the
/// single [`run`] loop it was built for (spec.md §5: one cooperative event
/// loop, no internal parallelism).
pub struct Mapper {
    conn: CdpConnectionHandle,
    pub contexts: ContextTree,
    pub targets: TargetTable,
    pub navigation: NavigationTracker,
    pub realms: RealmTable,
    pub subscriptions: SubscriptionManager,
    pub intercepts: InterceptRegistry,
    pub collectors: DataCollectorRegistry,
    pub network: NetworkRequestTracker,
    events: EventManager,
    config: TranslatorConfig,
}

impl Mapper {
    pub fn new(conn: CdpConnectionHandle, config: TranslatorConfig) -> Self {
        Mapper {
            conn,
            contexts: ContextTree::default(),
            targets: TargetTable::default(),
            navigation: NavigationTracker::default(),
            realms: RealmTable::default(),
            subscriptions: SubscriptionManager::default(),
            intercepts: InterceptRegistry::default(),
            collectors: DataCollectorRegistry::default(),
            network: NetworkRequestTracker::default(),
            events: EventManager::default(),
            config,
        }
    }

    /// The browser-wide client, with no session id attached. Every
    /// `Target.*` command (create, attach, close) travels over this one.
    pub fn root_client(&self) -> CdpClient {
        CdpClient::root(self.conn.clone())
    }

    fn context_for_session(&self, session: Option<&SessionId>) -> Option<BrowsingContextId> {
        let session = session?;
        self.targets.get(session).map(|t| t.context_id.clone())
    }

    pub fn client_for_context(&self, context: &BrowsingContextId) -> std::result::Result<&CdpClient, BidiError> {
        self.targets
            .all()
            .find(|t| &t.context_id == context)
            .map(|t| &t.client)
            .ok_or_else(|| BidiError::no_such_frame(format!("no such context {}", context.0)))
    }

    pub fn network_request_context(
        &self,
        id: &cdp_protocol::network::RequestId,
    ) -> std::result::Result<BrowsingContextId, BidiError> {
        self.network
            .get(id)
            .map(|r| r.context.clone())
            .ok_or_else(|| BidiError::no_such_request(format!("no such request {}", id.0)))
    }

    pub fn network_request_intercept_phase(
        &self,
        id: &cdp_protocol::network::RequestId,
    ) -> Option<crate::network::InterceptPhase> {
        self.network.get(id).and_then(|r| r.intercept_phase)
    }

    /// Registers a newly attached top-level target, idempotently (spec.md
    /// §4.1: a page that's already attached is a no-op, not a second
    /// context).
    pub async fn ensure_top_level_context(
        &mut self,
        target_id: TargetId,
        session_id: SessionId,
    ) -> Result<BrowsingContextId, CdpError> {
        if let Some(existing) = self.targets.session_for_target(&target_id) {
            if let Some(target) = self.targets.get(existing) {
                return Ok(target.context_id.clone());
            }
        }

        let context_id = BrowsingContextId::from(target_id.clone());
        self.contexts.insert_top_level(
            context_id.clone(),
            target_id.clone(),
            UserContextId::default_context(),
            "about:blank".to_string(),
        );

        let client = CdpClient::for_session(self.conn.clone(), session_id.clone());
        let target = CdpTarget::new(client, target_id, session_id, context_id.clone());
        target.enable().await?;
        self.targets.insert(target);

        self.enqueue_event(
            "browsingContext.contextCreated",
            Some(context_id.clone()),
            serde_json::json!({
                "context": context_id.0,
                "url": "about:blank",
                "children": serde_json::Value::Null,
                "parent": serde_json::Value::Null,
            }),
        );

        Ok(context_id)
    }

    /// Tears down a context and every descendant (spec.md §4.6), plus the
    /// owning target if the removed context was top-level.
    pub fn remove_context_tree(&mut self, context: &BrowsingContextId) {
        let removed = self.contexts.remove(context);
        for id in &removed {
            self.network.remove_context(id);
            self.navigation.remove_context(id);
            self.realms.clear_for_context(id);
            self.enqueue_event(
                "browsingContext.contextDestroyed",
                Some(id.clone()),
                serde_json::json!({ "context": id.0 }),
            );
        }

        let session = self
            .targets
            .all()
            .find(|t| &t.context_id == context)
            .map(|t| t.session_id.clone());
        if let Some(session) = session {
            self.targets.remove_by_session(&session);
        }
    }

    /// Starts a navigation, emitting `navigationAborted` for whatever
    /// navigation this one preempts before `navigationStarted` for itself
    /// (spec.md §4.6).
    pub fn start_navigation(
        &mut self,
        context: BrowsingContextId,
        loader_id: page::LoaderId,
        url: String,
    ) -> NavigationId {
        let start = self.navigation.start(context.clone(), loader_id, url.clone());
        if let Some(preempted) = start.preempted {
            self.enqueue_event(
                "browsingContext.navigationAborted",
                Some(context.clone()),
                serde_json::json!({ "context": context.0, "navigation": preempted.to_string(), "url": url }),
            );
        }
        self.enqueue_event(
            "browsingContext.navigationStarted",
            Some(context.clone()),
            serde_json::json!({ "context": context.0, "navigation": start.id.to_string(), "url": url }),
        );
        start.id
    }

    /// Recomputes whether `Fetch` must stay enabled on every attached
    /// target, and applies the delta (spec.md §4.4). Read-only pass first,
    /// mutable pass second, so the borrow checker never has to reconcile a
    /// `&self.intercepts` read with a `&mut self.targets` write at the same
    /// time.
    pub async fn refresh_fetch_enablement(&mut self) {
        let mut actions: Vec<(SessionId, bool, Vec<fetch::RequestPattern>)> = Vec::new();
        for target in self.targets.all() {
            let top_level = &target.context_id;
            let needed = matches!(self.config.intercept_mode, InterceptMode::Eager)
                || self.intercepts.has_any_for_target(top_level)
                || self.collectors.has_any_for_context(top_level);
            if needed != target.fetch_enabled() {
                let patterns = self.intercepts.patterns_for_target(top_level);
                actions.push((target.session_id.clone(), needed, patterns));
            }
        }

        for (session_id, needed, patterns) in actions {
            let Some(target) = self.targets.get_mut(&session_id) else {
                continue;
            };
            let outcome = if needed {
                target.bump_fetch(patterns).await
            } else {
                target.drop_fetch().await
            };
            if let Err(err) = outcome {
                tracing::debug!(?err, %session_id, "failed to toggle Fetch.enable");
            }
        }
    }

    /// Re-announces existing contexts to a subscriber that just asked for
    /// this one (spec.md §4.3's subscribe-hook replay). A context that was
    /// already visible to this channel is re-announced too; a client that
    /// subscribes twice to the same context sees a harmless duplicate
    /// rather than the processor threading a "new to this channel" flag
    /// through every call site.
    pub fn replay_subscribe_hook_for_context(&mut self, context: &BrowsingContextId) {
        let Some(node) = self.contexts.get(context) else {
            return;
        };
        let payload = serde_json::json!({
            "context": node.id.0,
            "url": node.url,
            "children": serde_json::Value::Null,
            "parent": node.parent.as_ref().map(|p| p.0.clone()),
        });
        self.enqueue_event("browsingContext.contextCreated", Some(context.clone()), payload);
        for child in self.contexts.children_of(context) {
            self.replay_subscribe_hook_for_context(&child);
        }
    }

    pub fn replay_subscribe_hook_all(&mut self) {
        let roots: Vec<BrowsingContextId> = self.contexts.top_level_ids().cloned().collect();
        for root in roots {
            self.replay_subscribe_hook_for_context(&root);
        }
    }

    fn enqueue_event(&mut self, method: &str, context: Option<BrowsingContextId>, params: serde_json::Value) {
        let channels = self.subscriptions.channels_for(method, context.as_ref());
        if channels.is_empty() {
            return;
        }
        self.events.enqueue_ready(crate::events::EventPayload {
            method: method.to_string(),
            params,
            context,
            channels,
        });
    }

    /// Drains every event ready to send, one [`BidiMessageOut::Event`] per
    /// (payload, channel) pair — a channel of `""` is the unchanneled
    /// default and carries no `goog:channel` tag (spec.md §6).
    pub fn drain_ready_events(&mut self) -> Vec<BidiMessageOut> {
        let mut out = Vec::new();
        for payload in self.events.drain_ready() {
            for channel in payload.channels {
                let tag = if channel.is_empty() { None } else { Some(channel) };
                out.push(BidiMessageOut::event(payload.method.clone(), payload.params.clone(), tag));
            }
        }
        out
    }

    /// Parses, routes, and replies to one incoming BiDi command (spec.md
    /// §6). Parse failures are reported against `id: None`, since there is
    /// no command id to reply against yet.
    pub async fn dispatch_text(&mut self, text: &str) -> BidiMessageOut {
        let command = match parse_command(text) {
            Ok(command) => command,
            Err(err) => return BidiMessageOut::error(None, err, None),
        };
        self.dispatch_command(command).await
    }

    async fn dispatch_command(&mut self, command: BidiCommand) -> BidiMessageOut {
        let BidiCommand { id, method, params, channel } = command;
        let result = self.route(&method, params, channel.clone()).await;
        match result {
            Ok(value) => BidiMessageOut::success(id, value, channel),
            Err(err) => BidiMessageOut::error(Some(id), err, channel),
        }
    }

    async fn route(
        &mut self,
        method: &str,
        params: serde_json::Value,
        channel: Option<String>,
    ) -> std::result::Result<serde_json::Value, BidiError> {
        let (module, name) = crate::bidi::router::split_method(method)?;
        match module {
            "session" => processors::session::dispatch(self, name, params, channel).await,
            "browsingContext" => processors::browsing_context::dispatch(self, name, params).await,
            "network" => processors::network::dispatch(self, name, params).await,
            "script" => processors::script::dispatch(self, name, params).await,
            "input" => processors::input::dispatch(self, name, params).await,
            "storage" => processors::storage::dispatch(self, name, params).await,
            other => Err(BidiError::unknown_command(format!("{other}.{name}"))),
        }
    }

    /// Handles one item out of the CDP connection's event stream. Returns
    /// `true` once the connection has closed and the run loop should stop.
    async fn handle_conn_event(&mut self, event: ConnEvent) -> bool {
        match event {
            ConnEvent::AttachedToTarget(ev) => self.on_attached_to_target(ev).await,
            ConnEvent::DetachedFromTarget(ev) => self.on_detached_from_target(ev),
            ConnEvent::Event { session, event } => self.handle_cdp_event(session, event).await,
            ConnEvent::Closed => return true,
        }
        false
    }

    async fn on_attached_to_target(&mut self, ev: target::AttachedToTargetEvent) {
        if ev.target_info.r#type != "page" {
            return;
        }
        if let Err(err) = self
            .ensure_top_level_context(ev.target_info.target_id.clone(), ev.session_id)
            .await
        {
            tracing::debug!(?err, "failed to enable newly attached target");
        }
    }

    fn on_detached_from_target(&mut self, ev: target::DetachedFromTargetEvent) {
        let context = self
            .targets
            .get(&ev.session_id)
            .map(|t| t.context_id.clone());
        self.targets.remove_by_session(&ev.session_id);
        if let Some(context) = context {
            self.remove_context_tree(&context);
        }
    }

    async fn handle_cdp_event(&mut self, session: Option<SessionId>, event: cdp_protocol::event::CdpEvent) {
        use cdp_protocol::event::CdpEvent;
        match event {
            CdpEvent::Target(_) => {}
            CdpEvent::Page(ev) => self.handle_page_event(session.as_ref(), ev),
            CdpEvent::Network(ev) => self.handle_network_event(session.as_ref(), ev).await,
            CdpEvent::Fetch(ev) => self.handle_fetch_event(session.as_ref(), ev).await,
            CdpEvent::Runtime(ev) => self.handle_runtime_event(session.as_ref(), ev),
        }
    }

    fn handle_page_event(&mut self, session: Option<&SessionId>, event: page::PageEvent) {
        let Some(owner) = self.context_for_session(session) else {
            return;
        };
        match event {
            page::PageEvent::FrameAttached(ev) => self.on_frame_attached(&owner, ev),
            page::PageEvent::FrameDetached(ev) => self.on_frame_detached(ev),
            page::PageEvent::FrameNavigated(ev) => self.on_frame_navigated(&owner, ev),
            page::PageEvent::NavigatedWithinDocument(ev) => self.on_navigated_within_document(ev),
            page::PageEvent::LifecycleEvent(ev) => self.on_lifecycle_event(ev),
            page::PageEvent::JavascriptDialogOpening(ev) => self.on_dialog_opening(&owner, ev),
            page::PageEvent::JavascriptDialogClosed(ev) => self.on_dialog_closed(&owner, ev),
            page::PageEvent::FrameStartedLoading(_)
            | page::PageEvent::FrameStoppedLoading(_)
            | page::PageEvent::FrameRequestedNavigation(_) => {}
        }
    }

    fn on_frame_attached(&mut self, owner: &BrowsingContextId, ev: page::FrameAttachedEvent) {
        if self.contexts.context_for_frame(&ev.frame_id).is_some() {
            return;
        }
        let parent = self
            .contexts
            .context_for_frame(&ev.parent_frame_id)
            .cloned()
            .unwrap_or_else(|| owner.clone());
        let child = BrowsingContextId(format!("frame-{}", ev.frame_id.0));
        self.contexts
            .insert_child(child.clone(), parent, ev.frame_id, String::new());
        self.enqueue_event(
            "browsingContext.contextCreated",
            Some(child.clone()),
            serde_json::json!({ "context": child.0, "url": "", "children": serde_json::Value::Null }),
        );
    }

    fn on_frame_detached(&mut self, ev: page::FrameDetachedEvent) {
        let Some(context) = self.contexts.context_for_frame(&ev.frame_id).cloned() else {
            return;
        };
        self.remove_context_tree(&context);
    }

    fn on_frame_navigated(&mut self, owner: &BrowsingContextId, ev: page::FrameNavigatedEvent) {
        let frame = ev.frame;
        if frame.parent_id.is_none() {
            self.contexts.bind_frame(owner, frame.id);
            if let Some(node) = self.contexts.get_mut(owner) {
                node.url = frame.url.clone();
            }
            self.navigation.commit(owner, frame.url.clone());
            let navigation = self.navigation.navigation_id_for_context(owner);
            self.enqueue_event(
                "browsingContext.navigationCommitted",
                Some(owner.clone()),
                serde_json::json!({
                    "context": owner.0,
                    "navigation": navigation.map(|n| n.to_string()),
                    "url": frame.url,
                }),
            );
        } else {
            let Some(context) = self.contexts.context_for_frame(&frame.id).cloned() else {
                return;
            };
            self.contexts.bind_frame(&context, frame.id);
            if let Some(node) = self.contexts.get_mut(&context) {
                node.url = frame.url;
            }
        }
    }

    fn on_navigated_within_document(&mut self, ev: page::NavigatedWithinDocumentEvent) {
        let Some(context) = self.contexts.context_for_frame(&ev.frame_id).cloned() else {
            return;
        };
        if let Some(node) = self.contexts.get_mut(&context) {
            node.url = ev.url.clone();
        }
        let navigation = self.navigation.navigation_id_for_context(&context);
        self.enqueue_event(
            "browsingContext.fragmentNavigated",
            Some(context.clone()),
            serde_json::json!({
                "context": context.0,
                "navigation": navigation.map(|n| n.to_string()),
                "url": ev.url,
            }),
        );
    }

    fn on_lifecycle_event(&mut self, ev: page::LifecycleEventEvent) {
        let method = match ev.name.as_str() {
            "DOMContentLoaded" => "browsingContext.domContentLoaded",
            "load" => "browsingContext.load",
            _ => return,
        };
        let Some(context) = self.contexts.context_for_frame(&ev.frame_id).cloned() else {
            return;
        };
        let navigation = self.navigation.navigation_id_for_loader(&ev.loader_id);
        self.enqueue_event(
            method,
            Some(context.clone()),
            serde_json::json!({
                "context": context.0,
                "navigation": navigation.map(|n| n.to_string()),
                "url": self.contexts.get(&context).map(|n| n.url.clone()).unwrap_or_default(),
            }),
        );
    }

    fn on_dialog_opening(&mut self, owner: &BrowsingContextId, ev: page::JavascriptDialogOpeningEvent) {
        self.enqueue_event(
            "browsingContext.userPromptOpened",
            Some(owner.clone()),
            serde_json::json!({
                "context": owner.0,
                "type": ev.r#type,
                "message": ev.message,
            }),
        );
    }

    fn on_dialog_closed(&mut self, owner: &BrowsingContextId, ev: page::JavascriptDialogClosedEvent) {
        self.enqueue_event(
            "browsingContext.userPromptClosed",
            Some(owner.clone()),
            serde_json::json!({ "context": owner.0, "accepted": ev.result }),
        );
    }

    fn handle_runtime_event(&mut self, session: Option<&SessionId>, event: runtime::RuntimeEvent) {
        let owner = self.context_for_session(session);
        match event {
            runtime::RuntimeEvent::ExecutionContextCreated(ev) => {
                self.realms.insert(owner.clone(), &ev.context);
                self.enqueue_event(
                    "script.realmCreated",
                    owner,
                    serde_json::json!({ "realm": ev.context.id.0, "type": "window" }),
                );
            }
            runtime::RuntimeEvent::ExecutionContextDestroyed(ev) => {
                if let Some(realm) = self.realms.remove(ev.execution_context_id) {
                    self.enqueue_event(
                        "script.realmDestroyed",
                        realm.context,
                        serde_json::json!({ "realm": ev.execution_context_id.0 }),
                    );
                }
            }
            runtime::RuntimeEvent::ExecutionContextsCleared(_) => {
                if let Some(owner) = &owner {
                    self.realms.clear_for_context(owner);
                }
            }
        }
    }

    async fn handle_network_event(&mut self, session: Option<&SessionId>, event: cdp_protocol::network::NetworkEvent) {
        use cdp_protocol::network::NetworkEvent;
        let Some(owner) = self.context_for_session(session) else {
            return;
        };
        let gates = Mapper::build_gates(&self.subscriptions, &self.intercepts, &owner);
        let effects = match event {
            NetworkEvent::RequestWillBeSent(ev) => {
                // spec.md §3: a navigation id is attached iff this is the
                // document request (CDP loaderId == requestId) — sub-resource
                // fetches under a navigating context never get stamped.
                let is_document_request = ev.loader_id.0 == ev.request_id.0;
                let navigation = if is_document_request {
                    ev.frame_id
                        .as_ref()
                        .and_then(|f| self.contexts.context_for_frame(f))
                        .and_then(|ctx| self.navigation.navigation_id_for_context(ctx))
                        .or_else(|| self.navigation.navigation_id_for_context(&owner))
                } else {
                    None
                };
                self.network
                    .handle_request_will_be_sent(owner.clone(), navigation, ev, &gates)
            }
            NetworkEvent::RequestWillBeSentExtraInfo(ev) => {
                self.network.handle_request_will_be_sent_extra_info(ev, &gates)
            }
            NetworkEvent::ResponseReceived(ev) => self.network.handle_response_received(ev, &gates),
            NetworkEvent::ResponseReceivedExtraInfo(ev) => {
                self.network.handle_response_received_extra_info(ev, &gates)
            }
            NetworkEvent::RequestServedFromCache(ev) => {
                self.network.handle_served_from_cache(ev);
                Vec::new()
            }
            NetworkEvent::LoadingFailed(ev) => {
                let request_id = ev.request_id.clone();
                let before = self.network.get(&request_id).map(|r| (r.context.clone(), r.navigation));
                let effects = self.network.handle_loading_failed(ev, &gates);
                if let Some((context, navigation)) = before {
                    let still_pending = navigation.is_some()
                        && navigation == self.navigation.navigation_id_for_context(&context);
                    if still_pending {
                        self.navigation.fail(&context);
                        self.enqueue_event(
                            "browsingContext.navigationFailed",
                            Some(context.clone()),
                            serde_json::json!({
                                "context": context.0,
                                "navigation": navigation.map(|n| n.to_string()),
                            }),
                        );
                    }
                }
                effects
            }
            NetworkEvent::LoadingFinished(ev) => {
                self.network.handle_loading_finished(ev);
                Vec::new()
            }
        };
        self.apply_network_effects(effects).await;
    }

    async fn handle_fetch_event(&mut self, session: Option<&SessionId>, event: fetch::FetchEvent) {
        use fetch::FetchEvent;
        let Some(owner) = self.context_for_session(session) else {
            return;
        };
        let gates = Mapper::build_gates(&self.subscriptions, &self.intercepts, &owner);
        let effects = match event {
            FetchEvent::RequestPaused(ev) => self.network.handle_request_paused(ev, &gates),
            FetchEvent::AuthRequired(ev) => self.network.handle_auth_required(ev, &gates),
        };
        self.apply_network_effects(effects).await;
    }

    /// Builds the gate predicates from the two fields they depend on,
    /// taken by reference rather than through `&self`, so the borrow
    /// checker sees a `Gates<'a>` tied only to `subscriptions`/`intercepts`
    /// — leaving `self.network`, `self.contexts`, and `self.navigation`
    /// free to borrow mutably alongside it at the call site.
    fn build_gates<'a>(
        subscriptions: &'a SubscriptionManager,
        intercepts: &'a InterceptRegistry,
        top_level: &'a BrowsingContextId,
    ) -> Gates<'a> {
        Gates {
            top_level,
            subscribed_before_request_sent: subscriptions
                .is_subscribed_to("network.beforeRequestSent", Some(top_level)),
            subscribed_response_started: subscriptions
                .is_subscribed_to("network.responseStarted", Some(top_level)),
            subscribed_response_completed: subscriptions
                .is_subscribed_to("network.responseCompleted", Some(top_level)),
            subscribed_auth_required: subscriptions
                .is_subscribed_to("network.authRequired", Some(top_level)),
            subscribed_fetch_error: subscriptions
                .is_subscribed_to("network.fetchError", Some(top_level)),
            intercepts,
        }
    }

    async fn apply_network_effects(&mut self, effects: Vec<crate::network::NetworkEffect>) {
        use crate::network::NetworkEffect;
        for effect in effects {
            match effect {
                NetworkEffect::Emit { method, context, params } => {
                    self.enqueue_event(method, context, params);
                }
                NetworkEffect::AutoContinueRequest(id) => {
                    if let Err(err) = self.auto_continue_request(id).await {
                        tracing::debug!(?err, "failed to auto-continue request");
                    }
                }
                NetworkEffect::AutoContinueResponse(id) => {
                    if let Err(err) = self.auto_continue_response(id).await {
                        tracing::debug!(?err, "failed to auto-continue response");
                    }
                }
            }
        }
    }

    async fn auto_continue_request(&mut self, id: cdp_protocol::network::RequestId) -> Result<()> {
        let context = match self.network_request_context(&id) {
            Ok(context) => context,
            Err(_) => return Ok(()),
        };
        let client = self.client_for_context(&context).map_err(|_| CdpError::NoSuchSession)?.clone();
        client
            .execute(fetch::ContinueRequestParams {
                request_id: id,
                url: None,
                method: None,
                post_data: None,
                headers: None,
            })
            .await?;
        Ok(())
    }

    async fn auto_continue_response(&mut self, id: cdp_protocol::network::RequestId) -> Result<()> {
        let context = match self.network_request_context(&id) {
            Ok(context) => context,
            Err(_) => return Ok(()),
        };
        let client = self.client_for_context(&context).map_err(|_| CdpError::NoSuchSession)?.clone();
        client
            .execute(fetch::ContinueResponseParams {
                request_id: id,
                response_code: None,
                response_phrase: None,
                response_headers: None,
            })
            .await?;
        Ok(())
    }
}

/// Runs the translator: one CDP connection, one BiDi transport, one
/// cooperative loop (spec.md §5) that alternates between whichever side has
/// a message ready and drains outgoing events after every step.
pub async fn run<C, B>(cdp_transport: C, mut bidi_transport: B, config: TranslatorConfig) -> Result<()>
where
    C: Transport + Send + 'static,
    B: Transport,
{
    let (conn, mut cdp_events) = CdpConnection::spawn(cdp_transport);
    let mut mapper = Mapper::new(conn, config);

    mapper
        .root_client()
        .execute(target::SetDiscoverTargetsParams { discover: true })
        .await?;
    mapper
        .root_client()
        .execute(target::SetAutoAttachParams {
            auto_attach: true,
            wait_for_debugger_on_start: false,
            flatten: Some(true),
        })
        .await?;

    loop {
        tokio::select! {
            event = cdp_events.next() => {
                match event {
                    Some(event) => {
                        if mapper.handle_conn_event(event).await {
                            break;
                        }
                    }
                    None => break,
                }
            }
            frame = bidi_transport.next() => {
                match frame {
                    Some(Ok(text)) => {
                        let reply = mapper.dispatch_text(&text).await;
                        // spec.md §5: a command's reply is emitted after every
                        // event causally triggered by handling it, so drain
                        // and send those events first.
                        let mut send_failed = false;
                        for message in mapper.drain_ready_events() {
                            if bidi_transport.send(message.to_wire_string()).await.is_err() {
                                send_failed = true;
                                break;
                            }
                        }
                        if send_failed || bidi_transport.send(reply.to_wire_string()).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(_)) | None => break,
                }
            }
        }

        for message in mapper.drain_ready_events() {
            if bidi_transport.send(message.to_wire_string()).await.is_err() {
                return Ok(());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::BindingTransport;

    /// A `Mapper` needs a live `CdpConnectionHandle`, which in turn needs a
    /// transport to spawn its connection task over; `BindingTransport` fed
    /// by channels nobody drives is enough for tests that never actually
    /// round-trip a CDP command.
    fn test_mapper() -> Mapper {
        let (_to_conn, from_page) = futures::channel::mpsc::unbounded();
        let (to_page, _from_conn) = futures::channel::mpsc::unbounded();
        let transport = BindingTransport::new(from_page, to_page);
        let (conn, _events) = CdpConnection::spawn(transport);
        Mapper::new(conn, TranslatorConfig::builder().build())
    }

    #[tokio::test]
    async fn gates_reflect_subscription_state() {
        let mut mapper = test_mapper();
        let ctx = BrowsingContextId("ctx-1".into());
        mapper.contexts.insert_top_level(
            ctx.clone(),
            TargetId("target-1".into()),
            UserContextId::default_context(),
            "about:blank".into(),
        );
        mapper
            .subscriptions
            .subscribe(vec!["network.beforeRequestSent".into()], vec![], vec![], String::new());
        let gates = Mapper::build_gates(&mapper.subscriptions, &mapper.intercepts, &ctx);
        assert!(gates.subscribed_before_request_sent);
        assert!(!gates.subscribed_response_completed);
    }

    #[tokio::test]
    async fn remove_context_tree_clears_navigation_and_realms() {
        let mut mapper = test_mapper();
        let ctx = BrowsingContextId("ctx-1".into());
        mapper.contexts.insert_top_level(
            ctx.clone(),
            TargetId("target-1".into()),
            UserContextId::default_context(),
            "about:blank".into(),
        );
        mapper
            .navigation
            .start(ctx.clone(), page::LoaderId("loader-1".into()), "https://example.com".into());
        mapper.remove_context_tree(&ctx);
        assert!(mapper.contexts.get(&ctx).is_none());
        assert!(mapper.navigation.navigation_id_for_context(&ctx).is_none());
    }
}
