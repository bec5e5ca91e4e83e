use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

/// Address parameter carrying the session id
pub const SESSION_PARAM: &str = "session";

/// Stable identifier binding a sequence of turns together server-side
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Fresh id from a v4 UUID
    pub fn generate() -> Self {
        Self(format!("session-{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The addressable location a reload would return to
pub trait PageAddress: Send + Sync {
    fn query_param(&self, name: &str) -> Option<String>;

    /// Set a parameter in place, without creating a navigation entry
    fn replace_query_param(&mut self, name: &str, value: &str);

    fn href(&self) -> String;
}

/// Page address backed by a parsed URL
#[derive(Debug, Clone)]
pub struct UrlAddress {
    url: Url,
}

impl UrlAddress {
    pub fn parse(address: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            url: Url::parse(address)?,
        })
    }
}

impl PageAddress for UrlAddress {
    fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    fn replace_query_param(&mut self, name: &str, value: &str) {
        let others: Vec<(String, String)> = self
            .url
            .query_pairs()
            .filter(|(key, _)| key != name)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        let mut pairs = self.url.query_pairs_mut();
        pairs.clear();
        for (k, v) in &others {
            pairs.append_pair(k, v);
        }
        pairs.append_pair(name, value);
    }

    fn href(&self) -> String {
        self.url.to_string()
    }
}

/// Recovers or creates the session id and keeps it reflected in the address
pub struct SessionIdentity<A: PageAddress> {
    address: A,
    current: Option<SessionId>,
}

impl<A: PageAddress> SessionIdentity<A> {
    pub fn new(address: A) -> Self {
        Self {
            address,
            current: None,
        }
    }

    /// Idempotent within one load: later calls return the same id
    pub fn ensure_session(&mut self) -> SessionId {
        if let Some(id) = &self.current {
            return id.clone();
        }

        let existing = self
            .address
            .query_param(SESSION_PARAM)
            .map(|s| s.trim().to_string());

        let id = match existing {
            Some(existing) if !existing.is_empty() => {
                info!("Continuing session: {}", existing);
                SessionId(existing)
            }
            _ => {
                let fresh = SessionId::generate();
                info!("Starting session: {}", fresh);
                fresh
            }
        };

        self.address.replace_query_param(SESSION_PARAM, id.as_str());
        self.current = Some(id.clone());
        id
    }

    pub fn address(&self) -> &A {
        &self.address
    }
}
