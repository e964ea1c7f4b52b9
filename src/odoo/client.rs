//! Odoo XML-RPC client
//!
//! Every operation authenticates first against `/xmlrpc/2/common`, then calls
//! `execute_kw` on `/xmlrpc/2/object`. Sessions are not cached.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;

use super::xmlrpc::{self, Value};
use crate::config::OdooConfig;
use crate::error::{BackendError, BackendResult};
use crate::executor::{Record, RecordStore, SearchRequest};
use crate::predicate::{to_domain, NativePredicate};

/// A model registered in the Odoo instance (`ir.model`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub model: String,
    pub name: String,
}

#[derive(Clone)]
pub struct OdooClient {
    http: reqwest::Client,
    common_url: Url,
    object_url: Url,
    database: String,
    username: String,
    password: String,
}

impl std::fmt::Debug for OdooClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OdooClient")
            .field("object_url", &self.object_url.as_str())
            .field("database", &self.database)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl OdooClient {
    pub fn new(config: &OdooConfig) -> BackendResult<Self> {
        let (common_url, object_url) = endpoint_urls(&config.url)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            common_url,
            object_url,
            database: config.database.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    async fn call(&self, url: &Url, method: &str, params: &[Value]) -> BackendResult<Value> {
        let body = xmlrpc::encode_call(method, params);
        let response = self
            .http
            .post(url.clone())
            .header("Content-Type", "text/xml")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
            });
        }
        let text = response.text().await?;
        debug!("XML-RPC {} response: {} bytes", method, text.len());
        xmlrpc::parse_response(&text)
    }

    /// Log in and return the user id
    pub async fn authenticate(&self) -> BackendResult<i64> {
        let result = self
            .call(
                &self.common_url,
                "authenticate",
                &[
                    Value::str(&self.database),
                    Value::str(&self.username),
                    Value::str(&self.password),
                    Value::Struct(BTreeMap::new()),
                ],
            )
            .await?;
        parse_uid(&result).ok_or_else(|| BackendError::Authentication {
            username: self.username.clone(),
            database: self.database.clone(),
        })
    }

    /// `execute_kw(db, uid, password, model, method, args, kwargs)`
    pub async fn execute_kw(
        &self,
        model: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: BTreeMap<String, Value>,
    ) -> BackendResult<Value> {
        let uid = self.authenticate().await?;
        self.call(
            &self.object_url,
            "execute_kw",
            &[
                Value::str(&self.database),
                Value::Int(uid),
                Value::str(&self.password),
                Value::str(model),
                Value::str(method),
                Value::Array(args),
                Value::Struct(kwargs),
            ],
        )
        .await
    }

    #[instrument(skip(self, predicates), fields(predicates = predicates.len()))]
    pub async fn search_count(&self, model: &str, predicates: &[NativePredicate]) -> BackendResult<u64> {
        let result = self
            .execute_kw(model, "search_count", vec![to_domain(predicates)], BTreeMap::new())
            .await?;
        result
            .as_i64()
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| BackendError::Protocol(format!("search_count returned {:?}", result)))
    }

    #[instrument(skip(self, request), fields(model = %request.entity, limit = request.limit))]
    pub async fn search_read(&self, request: &SearchRequest) -> BackendResult<Vec<Record>> {
        let result = self
            .execute_kw(
                &request.entity,
                "search_read",
                vec![to_domain(&request.predicates)],
                search_read_kwargs(request),
            )
            .await?;
        records_from(&result)
    }

    /// Every model in the instance, for catalog and role maintenance
    pub async fn list_models(&self) -> BackendResult<Vec<ModelInfo>> {
        let mut kwargs = BTreeMap::new();
        kwargs.insert(
            "fields".to_string(),
            Value::Array(vec![Value::str("model"), Value::str("name")]),
        );
        kwargs.insert("order".to_string(), Value::str("model asc"));
        let result = self
            .execute_kw("ir.model", "search_read", vec![Value::Array(vec![])], kwargs)
            .await?;

        Ok(records_from(&result)?
            .into_iter()
            .filter_map(|record| {
                Some(ModelInfo {
                    model: record.get("model")?.as_str()?.to_string(),
                    name: record
                        .get("name")
                        .and_then(|n| n.as_str())
                        .unwrap_or_default()
                        .to_string(),
                })
            })
            .collect())
    }
}

#[async_trait]
impl RecordStore for OdooClient {
    async fn count(&self, entity: &str, predicates: &[NativePredicate]) -> BackendResult<u64> {
        self.search_count(entity, predicates).await
    }

    async fn search(&self, request: &SearchRequest) -> BackendResult<Vec<Record>> {
        self.search_read(request).await
    }

    fn store_name(&self) -> &str {
        "odoo"
    }
}

/// `{base}/xmlrpc/2/common` and `{base}/xmlrpc/2/object`
fn endpoint_urls(base: &str) -> BackendResult<(Url, Url)> {
    let invalid = |reason: String| BackendError::InvalidUrl {
        url: base.to_string(),
        reason,
    };
    let root = Url::parse(&format!("{}/", base.trim().trim_end_matches('/')))
        .map_err(|e| invalid(e.to_string()))?;
    if !matches!(root.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", root.scheme())));
    }
    let common = root
        .join("xmlrpc/2/common")
        .map_err(|e| invalid(e.to_string()))?;
    let object = root
        .join("xmlrpc/2/object")
        .map_err(|e| invalid(e.to_string()))?;
    Ok((common, object))
}

/// `authenticate` answers with the uid, or `false` on bad credentials
fn parse_uid(value: &Value) -> Option<i64> {
    value.as_i64().filter(|uid| *uid > 0)
}

fn search_read_kwargs(request: &SearchRequest) -> BTreeMap<String, Value> {
    let mut kwargs = BTreeMap::new();
    if !request.fields.is_empty() {
        kwargs.insert(
            "fields".to_string(),
            Value::Array(request.fields.iter().map(Value::str).collect()),
        );
    }
    kwargs.insert("limit".to_string(), Value::Int(i64::from(request.limit)));
    if let Some(order) = &request.order {
        kwargs.insert("order".to_string(), Value::str(order));
    }
    kwargs
}

fn records_from(value: &Value) -> BackendResult<Vec<Record>> {
    let rows = value
        .as_array()
        .ok_or_else(|| BackendError::Protocol("search_read did not return an array".to_string()))?;
    rows.iter()
        .map(|row| match row.to_json() {
            serde_json::Value::Object(record) => Ok(record),
            other => Err(BackendError::Protocol(format!(
                "search_read row is not a struct: {}",
                other
            ))),
        })
        .collect()
}
