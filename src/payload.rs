use serde::{Deserialize, Serialize};

/// The payload every worker marshals into an encrypted push message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct SubscribeKeys {
    pub p256dh: String,
    pub auth: String,
}

#[derive(Debug, Deserialize)]
pub struct NestedSubscription {
    pub endpoint: String,
    pub keys: SubscribeKeys,
}

/// Accepts both the nested `subscription` shape and the flat frontend
/// shape in the same body; nested wins when both are present.
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub subscription: Option<NestedSubscription>,
    pub endpoint: Option<String>,
    pub p256dh: Option<String>,
    pub auth: Option<String>,
    pub topic: Option<String>,
    #[serde(default)]
    pub ui_code: String,
}

impl SubscribeRequest {
    /// Resolves `(endpoint, p256dh, auth)`, preferring `subscription` over
    /// the flat fields. `None` if neither shape yields all three.
    pub fn resolve(&self) -> Option<(String, String, String)> {
        if let Some(sub) = &self.subscription {
            return Some((sub.endpoint.clone(), sub.keys.p256dh.clone(), sub.keys.auth.clone()));
        }
        match (&self.endpoint, &self.p256dh, &self.auth) {
            (Some(e), Some(p), Some(a)) => Some((e.clone(), p.clone(), a.clone())),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EndpointOnly {
    pub endpoint: String,
}

#[derive(Debug, Deserialize)]
pub struct UnsubscribeRequest {
    pub subscription: Option<EndpointOnly>,
    pub endpoint: Option<String>,
}

impl UnsubscribeRequest {
    pub fn resolve(&self) -> Option<String> {
        if let Some(sub) = &self.subscription {
            return Some(sub.endpoint.clone());
        }
        self.endpoint.clone()
    }
}

#[derive(Debug, Deserialize)]
pub struct TriggerRequest {
    pub title: String,
    pub body: String,
    pub url: String,
    pub topic: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TriggerSelfRequest {
    #[serde(default)]
    pub ui_code: String,
    pub endpoint: String,
}

#[derive(Debug, Deserialize)]
pub struct DryRunQuery {
    pub dry_run: Option<String>,
}

impl DryRunQuery {
    pub fn is_dry_run(&self) -> bool {
        matches!(self.dry_run.as_deref(), Some("true") | Some("1") | Some("yes"))
    }
}

#[derive(Debug, Deserialize)]
pub struct MeQuery {
    pub endpoint: String,
}
