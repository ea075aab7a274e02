//! Couchbase cluster access over the REST services
//!
//! The management service is used for readiness and for resolving the
//! bucket → scope → collection path from the bucket's collection manifest.
//! Documents are written through the query service with a parameterized
//! `UPSERT` statement.

use crate::error::{snippet, ConnectionError, WriteError};
use crate::types::MovieRecord;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Upper bound on the initial readiness wait
pub const READY_TIMEOUT: Duration = Duration::from_secs(5);
const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);

const MGMT_PORT: u16 = 8091;
const MGMT_TLS_PORT: u16 = 18091;
const QUERY_PORT: u16 = 8093;
const QUERY_TLS_PORT: u16 = 18093;

/// Destination for finished documents
pub trait DocumentStore {
    fn upsert(
        &self,
        key: &str,
        document: &MovieRecord,
    ) -> impl Future<Output = Result<(), WriteError>> + Send;
}

// ─────────────────────────────────────────────────────────────────────────────
// Connection string
// ─────────────────────────────────────────────────────────────────────────────

/// Parsed `couchbase://` / `couchbases://` connection string
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionString {
    pub tls: bool,
    pub host: String,
}

impl ConnectionString {
    /// Parse a connection string. Only the first host is used; ports in the
    /// host list address the key-value service and are ignored here.
    ///
    /// DNS SRV records are not looked up. The host is used as the REST
    /// endpoint as written, so a cluster reachable only through SRV needs one
    /// of its node addresses in the connection string.
    pub fn parse(input: &str) -> Result<Self, ConnectionError> {
        let invalid = |reason| ConnectionError::InvalidConnectionString {
            input: input.to_string(),
            reason,
        };

        let trimmed = input.trim();
        let (tls, rest) = match trimmed.split_once("://") {
            Some(("couchbase", rest)) => (false, rest),
            Some(("couchbases", rest)) => (true, rest),
            Some(_) => return Err(invalid("scheme must be couchbase:// or couchbases://")),
            None => (false, trimmed),
        };

        let hosts = rest.split(['?', '/']).next().unwrap_or_default();
        let first = hosts
            .split([',', ';'])
            .map(str::trim)
            .find(|h| !h.is_empty())
            .ok_or_else(|| invalid("no host given"))?;

        let host = if first.starts_with('[') {
            // bracketed IPv6 literal, optionally followed by :port
            match first.find(']') {
                Some(end) => first[..=end].to_string(),
                None => return Err(invalid("unterminated IPv6 address")),
            }
        } else {
            first.split(':').next().unwrap_or(first).to_string()
        };

        if host.is_empty() {
            return Err(invalid("no host given"));
        }

        Ok(Self { tls, host })
    }

    fn base(&self, plain: u16, tls: u16) -> String {
        if self.tls {
            format!("https://{}:{}", self.host, tls)
        } else {
            format!("http://{}:{}", self.host, plain)
        }
    }

    /// Cluster management REST endpoint
    pub fn management_base(&self) -> String {
        self.base(MGMT_PORT, MGMT_TLS_PORT)
    }

    /// Query service REST endpoint
    pub fn query_base(&self) -> String {
        self.base(QUERY_PORT, QUERY_TLS_PORT)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Collection manifest
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub uid: String,
    pub scopes: Vec<ManifestScope>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestScope {
    pub name: String,
    #[serde(default)]
    pub collections: Vec<ManifestCollection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestCollection {
    pub name: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Cluster → Bucket → Scope → Collection
// ─────────────────────────────────────────────────────────────────────────────

/// Shared HTTP session for one cluster
#[derive(Clone)]
struct Session {
    client: reqwest::Client,
    username: String,
    password: String,
    management: String,
    query: String,
}

impl Session {
    fn get(&self, url: Url) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
    }

    fn url(&self, base: &str, segments: &[&str]) -> Result<Url, ConnectionError> {
        let mut url = Url::parse(base).map_err(|_| ConnectionError::InvalidConnectionString {
            input: base.to_string(),
            reason: "host is not a valid URL authority",
        })?;
        url.path_segments_mut()
            .map_err(|_| ConnectionError::InvalidConnectionString {
                input: base.to_string(),
                reason: "host is not a valid URL authority",
            })?
            .extend(segments);
        Ok(url)
    }
}

enum Probe {
    Ready,
    Unauthorized(String),
    NotYet(String),
}

pub struct Cluster {
    session: Session,
}

impl Cluster {
    /// Authenticate and wait up to [`READY_TIMEOUT`] for the cluster to be usable
    pub async fn connect(
        conn_str: &str,
        username: &str,
        password: &str,
    ) -> Result<Self, ConnectionError> {
        let parsed = ConnectionString::parse(conn_str)?;
        let client = reqwest::Client::builder()
            .connect_timeout(READY_TIMEOUT)
            .build()?;

        let cluster = Self {
            session: Session {
                client,
                username: username.to_string(),
                password: password.to_string(),
                management: parsed.management_base(),
                query: parsed.query_base(),
            },
        };

        cluster.wait_until_ready(READY_TIMEOUT).await?;
        info!(host = %parsed.host, tls = parsed.tls, "connected to cluster");
        Ok(cluster)
    }

    /// Poll the management and query services until both answer
    pub async fn wait_until_ready(&self, timeout: Duration) -> Result<(), ConnectionError> {
        let mut last_error = String::from("no probe completed");
        let poll = async {
            loop {
                match self.probe().await? {
                    Probe::Ready => return Ok::<(), ConnectionError>(()),
                    Probe::Unauthorized(url) => {
                        return Err(ConnectionError::Authentication {
                            username: self.session.username.clone(),
                            url,
                        })
                    }
                    Probe::NotYet(reason) => {
                        debug!(%reason, "cluster not ready yet");
                        last_error = reason;
                    }
                }
                tokio::time::sleep(READY_POLL_INTERVAL).await;
            }
        };

        let outcome = tokio::time::timeout(timeout, poll).await;
        match outcome {
            Ok(result) => result,
            Err(_) => Err(ConnectionError::NotReady {
                timeout,
                last_error,
            }),
        }
    }

    async fn probe(&self) -> Result<Probe, ConnectionError> {
        let targets = [
            self.session.url(&self.session.management, &["pools", "default"])?,
            self.session.url(&self.session.query, &["admin", "ping"])?,
        ];
        for url in targets {
            match self.session.get(url.clone()).send().await {
                Ok(resp) => match resp.status() {
                    s if s.is_success() => {}
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                        return Ok(Probe::Unauthorized(url.to_string()))
                    }
                    s => return Ok(Probe::NotYet(format!("HTTP {} from {}", s, url))),
                },
                Err(e) => return Ok(Probe::NotYet(format!("{}: {}", url, e))),
            }
        }
        Ok(Probe::Ready)
    }

    /// Open a bucket by name, fetching its collection manifest
    pub async fn bucket(&self, name: &str) -> Result<Bucket, ConnectionError> {
        let url = self.session.url(
            &self.session.management,
            &["pools", "default", "buckets", name, "scopes"],
        )?;
        let resp = self.session.get(url.clone()).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(ConnectionError::BucketNotFound(name.to_string()));
        }
        if !status.is_success() {
            return Err(ConnectionError::HttpStatus {
                status,
                url: url.to_string(),
                snippet: snippet(&body),
            });
        }

        let manifest: Manifest =
            serde_json::from_str(&body).map_err(|e| ConnectionError::Decode {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        debug!(bucket = name, manifest_uid = %manifest.uid, scopes = manifest.scopes.len(), "bucket opened");
        Ok(Bucket::new(self.session.clone(), name, manifest))
    }
}

pub struct Bucket {
    session: Session,
    name: String,
    manifest: Manifest,
}

impl Bucket {
    fn new(session: Session, name: &str, manifest: Manifest) -> Self {
        Self {
            session,
            name: name.to_string(),
            manifest,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self, name: &str) -> Result<Scope, ConnectionError> {
        let scope = self
            .manifest
            .scopes
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ConnectionError::ScopeNotFound {
                bucket: self.name.clone(),
                scope: name.to_string(),
            })?;
        Ok(Scope {
            session: self.session.clone(),
            bucket: self.name.clone(),
            manifest: scope.clone(),
        })
    }
}

pub struct Scope {
    session: Session,
    bucket: String,
    manifest: ManifestScope,
}

impl Scope {
    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn collection(&self, name: &str) -> Result<Collection, ConnectionError> {
        if !self.manifest.collections.iter().any(|c| c.name == name) {
            return Err(ConnectionError::CollectionNotFound {
                bucket: self.bucket.clone(),
                scope: self.manifest.name.clone(),
                collection: name.to_string(),
            });
        }
        let query_url = self.session.url(&self.session.query, &["query", "service"])?;
        Ok(Collection {
            session: self.session.clone(),
            statement: upsert_statement(&self.bucket, &self.manifest.name, name),
            keyspace: format!("{}.{}.{}", self.bucket, self.manifest.name, name),
            query_url,
        })
    }
}

/// Quote one keyspace path element
fn escape_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn upsert_statement(bucket: &str, scope: &str, collection: &str) -> String {
    format!(
        "UPSERT INTO {}.{}.{} (KEY, VALUE) VALUES ($key, $doc)",
        escape_identifier(bucket),
        escape_identifier(scope),
        escape_identifier(collection)
    )
}

/// Query service request with named parameters
#[derive(Serialize)]
struct UpsertRequest<'a> {
    statement: &'a str,
    #[serde(rename = "$key")]
    key: &'a str,
    #[serde(rename = "$doc")]
    doc: &'a MovieRecord,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    errors: Vec<QueryError>,
}

#[derive(Debug, Deserialize)]
struct QueryError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
}

/// Turn a query-service reply into the outcome of one upsert
fn check_query_response(key: &str, status: StatusCode, body: &str) -> Result<(), WriteError> {
    let parsed: Option<QueryResponse> = serde_json::from_str(body).ok();

    if let Some(resp) = &parsed {
        if let Some(err) = resp.errors.first() {
            return Err(WriteError::Rejected {
                key: key.to_string(),
                code: err.code,
                message: err.msg.clone(),
            });
        }
    }

    if !status.is_success() {
        return Err(WriteError::HttpStatus {
            key: key.to_string(),
            status,
            snippet: snippet(body),
        });
    }

    match parsed {
        Some(resp) if resp.status == "success" => Ok(()),
        Some(resp) => Err(WriteError::Rejected {
            key: key.to_string(),
            code: 0,
            message: format!("query status '{}'", resp.status),
        }),
        None => Err(WriteError::Decode {
            key: key.to_string(),
            reason: snippet(body),
        }),
    }
}

/// Write handle for one resolved collection
pub struct Collection {
    session: Session,
    statement: String,
    keyspace: String,
    query_url: Url,
}

impl Collection {
    /// `bucket.scope.collection`
    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }
}

impl DocumentStore for Collection {
    async fn upsert(&self, key: &str, document: &MovieRecord) -> Result<(), WriteError> {
        let body = UpsertRequest {
            statement: &self.statement,
            key,
            doc: document,
        };

        let resp = self
            .session
            .client
            .post(self.query_url.clone())
            .basic_auth(&self.session.username, Some(&self.session.password))
            .json(&body)
            .send()
            .await
            .map_err(|source| WriteError::Transport {
                key: key.to_string(),
                source,
            })?;

        let status = resp.status();
        let text = resp.text().await.map_err(|source| WriteError::Transport {
            key: key.to_string(),
            source,
        })?;

        check_query_response(key, status, &text)?;
        debug!(key, keyspace = %self.keyspace, "document upserted");
        Ok(())
    }
}
