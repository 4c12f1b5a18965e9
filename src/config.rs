//! Translator configuration (spec.md §6/SPEC_FULL §B.3), grounded on
//! `spider_chrome::handler::HandlerConfig` (`src/handler/mod.rs`): a plain
//! struct with a `Default` impl plus a small builder, constructed once at
//! startup and immutable thereafter — the translator has no notion of
//! runtime reconfiguration.

use std::time::Duration;

/// Which transport variant the translator binds to (spec.md §6).
#[derive(Debug, Clone)]
pub enum TransportConfig {
    /// Bind a TCP listener and accept one WebSocket client.
    WebSocket { addr: std::net::SocketAddr },
    /// Frame stdin/stdout with `\0` delimiters.
    Pipe,
    /// Host-bridged `sendBidiResponse`/`onBidiMessage` binding pair.
    Binding,
}

/// How eagerly `Fetch.enable` is toggled on attached targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptMode {
    /// Only enable `Fetch` once an intercept or collector actually applies
    /// to the target (spec.md §4.4's default behavior).
    Lazy,
    /// Enable `Fetch` on every attached target regardless of whether an
    /// intercept currently applies, trading a slightly noisier CDP session
    /// for zero latency on the first `addIntercept` after attach.
    Eager,
}

/// Immutable translator configuration, built once before the event loop
/// starts.
#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    pub transport: TransportConfig,
    /// How long a CDP command may stay pending before its callback is
    /// evicted and resolved with `closed`, mirroring the teacher's
    /// `PeriodicJob`-driven `request_timeout` (`handler/job.rs`).
    pub command_timeout: Duration,
    pub intercept_mode: InterceptMode,
}

impl TranslatorConfig {
    pub fn builder() -> TranslatorConfigBuilder {
        TranslatorConfigBuilder::default()
    }
}

#[derive(Debug)]
pub struct TranslatorConfigBuilder {
    transport: Option<TransportConfig>,
    command_timeout: Duration,
    intercept_mode: InterceptMode,
}

impl Default for TranslatorConfigBuilder {
    fn default() -> Self {
        TranslatorConfigBuilder {
            transport: None,
            command_timeout: Duration::from_secs(30),
            intercept_mode: InterceptMode::Lazy,
        }
    }
}

impl TranslatorConfigBuilder {
    pub fn transport(mut self, transport: TransportConfig) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn intercept_mode(mut self, mode: InterceptMode) -> Self {
        self.intercept_mode = mode;
        self
    }

    pub fn build(self) -> TranslatorConfig {
        TranslatorConfig {
            transport: self.transport.unwrap_or(TransportConfig::Pipe),
            command_timeout: self.command_timeout,
            intercept_mode: self.intercept_mode,
        }
    }
}
