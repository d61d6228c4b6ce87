//! Durable networked cache on a remote KV service
//!
//! Speaks the StreamableHTTP command envelope:
//! ```json
//! {
//!   "command": "kv.get",
//!   "request_id": "uuid",
//!   "payload": { ... }
//! }
//! ```
//! Entries are stored as a JSON record carrying the value together with its
//! absolute expiry, tags, and volatility hint. Tag membership is mirrored
//! into server-side sets under `<namespace>:tag:<tag>` so operators can
//! inspect and administer a namespace without going through a manager.

use crate::entry::{DEFAULT_VOLATILITY, SetOptions};
use crate::error::{Result, StrataError};
use crate::provider::CacheProvider;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};
use url::Url;

/// Remote provider configuration
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL of the backing KV service
    pub base_url: String,
    /// Key prefix isolating this provider's data in the shared store
    pub namespace: String,
    /// Request timeout
    pub timeout: Duration,
    /// Default entry lifetime in milliseconds
    pub default_ttl_ms: u64,
    /// Optional authentication token
    pub auth_token: Option<String>,
}

impl RemoteConfig {
    /// Create a new configuration with the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            namespace: "strata".to_string(),
            timeout: Duration::from_secs(30),
            default_ttl_ms: crate::entry::DEFAULT_TTL_MS,
            auth_token: None,
        }
    }

    /// Set the namespace prefix
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the timeout for requests
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the default entry lifetime in milliseconds
    pub fn with_default_ttl_ms(mut self, default_ttl_ms: u64) -> Self {
        self.default_ttl_ms = default_ttl_ms;
        self
    }

    /// Set the authentication token
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }
}

/// Wire record for one cache entry
///
/// The embedded `expires_at_ms` is authoritative; the server-side TTL sent
/// alongside it is a coarse (whole-second) backstop so abandoned entries
/// still age out of the backing store.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry<T> {
    value: T,
    expires_at_ms: u64,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default = "neutral_volatility")]
    volatility: f64,
}

fn neutral_volatility() -> f64 {
    DEFAULT_VOLATILITY
}

/// Durable networked provider
pub struct RemoteCache<T> {
    config: Arc<RemoteConfig>,
    http_client: Client,
    base_url: Url,
    _marker: PhantomData<fn() -> T>,
}

impl<T> RemoteCache<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Create a new remote cache client
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)?;

        let mut http_client_builder = Client::builder().timeout(config.timeout);

        if let Some(ref token) = config.auth_token {
            let mut headers = reqwest::header::HeaderMap::new();
            if let Ok(value) = format!("Bearer {}", token).parse() {
                headers.insert(reqwest::header::AUTHORIZATION, value);
            }
            http_client_builder = http_client_builder.default_headers(headers);
        }

        let http_client = http_client_builder.build()?;

        Ok(Self {
            config: Arc::new(config),
            http_client,
            base_url,
            _marker: PhantomData,
        })
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}:{}", self.config.namespace, key)
    }

    fn tag_key(&self, tag: &str) -> String {
        format!("{}:tag:{}", self.config.namespace, tag)
    }

    /// Send a StreamableHTTP command to the backing service
    async fn send_command(&self, command: &str, payload: Value) -> Result<Value> {
        let request_id = uuid::Uuid::new_v4().to_string();

        let body = json!({
            "command": command,
            "request_id": request_id,
            "payload": payload,
        });

        let url = self.base_url.join("api/v1/command")?;

        let response = self.http_client.post(url).json(&body).send().await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(StrataError::ServerError(error_text));
        }

        let result: Value = response.json().await?;

        if !result["success"].as_bool().unwrap_or(false) {
            let error_msg = result["error"]
                .as_str()
                .unwrap_or("Unknown error")
                .to_string();
            return Err(StrataError::ServerError(error_msg));
        }

        Ok(result["payload"].clone())
    }

    /// Fetch and decode the stored record for a key
    ///
    /// Transport faults and undecodable payloads both come back as `None`;
    /// the raw JSON is returned alongside so a hit can be rewritten without
    /// re-serializing the value.
    async fn fetch_entry(&self, key: &str) -> Option<(Value, StoredEntry<T>)> {
        let response = match self
            .send_command("kv.get", json!({"key": self.full_key(key)}))
            .await
        {
            Ok(v) => v,
            Err(e) => {
                warn!("remote cache read failed for {}: {}", key, e);
                return None;
            }
        };

        if response.is_null() {
            debug!("remote cache MISS for key: {}", key);
            return None;
        }

        match serde_json::from_value::<StoredEntry<T>>(response.clone()) {
            Ok(entry) => Some((response, entry)),
            Err(e) => {
                debug!("discarding corrupt payload for {}: {}", key, e);
                None
            }
        }
    }

    /// Keys currently stored under this provider's namespace, prefix stripped
    pub async fn keys(&self) -> Result<Vec<String>> {
        let prefix = format!("{}:", self.config.namespace);
        let response = self
            .send_command("kv.keys", json!({"prefix": prefix}))
            .await?;

        let keys: Vec<String> = serde_json::from_value(response["keys"].clone())?;
        Ok(keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
            .collect())
    }

    /// Members of a server-side tag set
    pub async fn tag_members(&self, tag: &str) -> Result<Vec<String>> {
        let response = self
            .send_command("set.members", json!({"key": self.tag_key(tag)}))
            .await?;

        Ok(response
            .get("members")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default())
    }
}

#[async_trait]
impl<T> CacheProvider<T> for RemoteCache<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        "remote"
    }

    async fn get(&self, key: &str) -> Option<T> {
        let (stored, entry) = self.fetch_entry(key).await?;

        let now = epoch_ms();
        if now >= entry.expires_at_ms {
            // Server-side TTL is whole-second; drop entries it let linger
            if let Err(e) = self
                .send_command("kv.del", json!({"key": self.full_key(key)}))
                .await
            {
                warn!("failed to drop lapsed entry {}: {}", key, e);
            }
            return None;
        }

        // Reconcile the stored TTL with wall clock. The value and expiry are
        // unchanged, so a read never extends the original absolute expiry.
        let remaining_ms = entry.expires_at_ms - now;
        let rewrite = json!({
            "key": self.full_key(key),
            "value": stored,
            "ttl": remaining_ms.div_ceil(1000),
        });
        if let Err(e) = self.send_command("kv.set", rewrite).await {
            warn!("ttl reconcile failed for {}: {}", key, e);
        }

        debug!("remote cache HIT for key: {}", key);
        Some(entry.value)
    }

    async fn set(&self, key: &str, value: T, options: &SetOptions) -> Result<()> {
        let ttl_ms = options.ttl_ms.unwrap_or(self.config.default_ttl_ms);
        let entry = StoredEntry {
            value,
            expires_at_ms: epoch_ms() + ttl_ms,
            tags: options.tags.clone(),
            volatility: options.volatility.unwrap_or(DEFAULT_VOLATILITY),
        };
        let stored = serde_json::to_value(&entry)?;

        self.send_command(
            "kv.set",
            json!({
                "key": self.full_key(key),
                "value": stored,
                "ttl": ttl_ms.div_ceil(1000),
            }),
        )
        .await?;

        for tag in &options.tags {
            self.send_command(
                "set.add",
                json!({"key": self.tag_key(tag), "members": [key]}),
            )
            .await?;
        }

        debug!("remote cache SET: {} (ttl={}ms)", key, ttl_ms);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        // Learn the entry's tags before dropping it so the server-side tag
        // sets stay consistent with the keyspace
        if let Some((_, entry)) = self.fetch_entry(key).await {
            for tag in &entry.tags {
                self.send_command(
                    "set.rem",
                    json!({"key": self.tag_key(tag), "members": [key]}),
                )
                .await?;
            }
        }

        let response = self
            .send_command("kv.del", json!({"key": self.full_key(key)}))
            .await?;

        Ok(response["deleted"].as_bool().unwrap_or(false))
    }

    async fn clear(&self) -> Result<()> {
        let prefix = format!("{}:", self.config.namespace);
        let response = self
            .send_command("kv.keys", json!({"prefix": prefix}))
            .await?;

        let keys: Vec<String> =
            serde_json::from_value(response["keys"].clone()).unwrap_or_default();
        if keys.is_empty() {
            return Ok(());
        }

        debug!("remote cache CLEAR ({} entries)", keys.len());
        self.send_command("kv.mdel", json!({"keys": keys})).await?;
        Ok(())
    }

    async fn has(&self, key: &str) -> bool {
        match self.fetch_entry(key).await {
            Some((_, entry)) => epoch_ms() < entry.expires_at_ms,
            None => false,
        }
    }
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
