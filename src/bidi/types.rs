//! Payload shapes for the `network.*` BiDi events (spec.md §4.5, §6).
//! Headers are flattened to plain strings rather than BiDi's full
//! `NetworkStringValue` union — sufficient for every consumer this
//! translator has, and noted as a simplification in the design ledger.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct BidiHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BidiTimings {
    pub time_origin: f64,
    pub request_time: f64,
    pub redirect_start: f64,
    pub redirect_end: f64,
    pub fetch_start: f64,
    pub dns_start: f64,
    pub dns_end: f64,
    pub connect_start: f64,
    pub connect_end: f64,
    pub tls_start: f64,
    pub request_start: f64,
    pub response_start: f64,
    pub response_end: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BidiRequestData {
    pub request: String,
    pub url: String,
    pub method: String,
    pub headers: Vec<BidiHeader>,
    pub headers_size: i64,
    pub body_size: Option<i64>,
    pub timings: BidiTimings,
}

#[derive(Debug, Clone, Serialize)]
pub struct BidiAuthChallenge {
    pub scheme: String,
    pub realm: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BidiResponseData {
    pub url: String,
    pub protocol: String,
    pub status: i64,
    pub status_text: String,
    pub from_cache: bool,
    pub headers: Vec<BidiHeader>,
    pub mime_type: String,
    pub bytes_received: i64,
    pub headers_size: i64,
    pub body_size: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub auth_challenges: Vec<BidiAuthChallenge>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeforeRequestSentParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigation: Option<String>,
    pub redirect_count: u32,
    pub request: BidiRequestData,
    pub timestamp: i64,
    pub initiator: serde_json::Value,
    pub is_blocked: bool,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub intercepts: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseStartedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigation: Option<String>,
    pub redirect_count: u32,
    pub request: BidiRequestData,
    pub response: BidiResponseData,
    pub timestamp: i64,
    pub is_blocked: bool,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub intercepts: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseCompletedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigation: Option<String>,
    pub redirect_count: u32,
    pub request: BidiRequestData,
    pub response: BidiResponseData,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequiredParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigation: Option<String>,
    pub redirect_count: u32,
    pub request: BidiRequestData,
    pub response: BidiResponseData,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchErrorParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigation: Option<String>,
    pub redirect_count: u32,
    pub request: BidiRequestData,
    pub timestamp: i64,
    pub error_text: String,
}

pub fn headers_from_cdp(headers: &cdp_protocol::network::Headers) -> Vec<BidiHeader> {
    let mut out: Vec<BidiHeader> = headers
        .iter()
        .map(|(name, value)| BidiHeader {
            name: name.clone(),
            value: value.clone(),
        })
        .collect();
    out.sort_by(|a, b| a.name.cmp(&b.name));
    out
}

pub fn headers_from_entries(entries: &[cdp_protocol::fetch::HeaderEntry]) -> Vec<BidiHeader> {
    entries
        .iter()
        .map(|h| BidiHeader {
            name: h.name.clone(),
            value: h.value.clone(),
        })
        .collect()
}

/// Builds BiDi timings from CDP's `ResourceTiming`, clamped to
/// non-negative (spec.md §D: "partial timings left at their zero
/// default rather than guessed").
pub fn timings_from_cdp(timing: Option<&cdp_protocol::network::ResourceTiming>) -> BidiTimings {
    let Some(timing) = timing else {
        return BidiTimings::default();
    };
    BidiTimings {
        time_origin: timing.request_time.max(0.0),
        request_time: timing.request_time.max(0.0),
        fetch_start: timing.request_time.max(0.0),
        request_start: timing.send_start.max(0.0),
        response_start: timing.receive_headers_end.max(0.0),
        ..BidiTimings::default()
    }
}
