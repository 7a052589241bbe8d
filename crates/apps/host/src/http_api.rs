//! `LayerApi` over the remote data service's HTTP endpoints.

use bridge::FeatureCollection;
use layers::api::{
    AptBasic, AreaStatRow, BoundaryQuery, BoxFuture, MarkerQuery, MarkerRow, StatsQuery, Summary,
    SummaryQuery,
};
use layers::{ApiError, ApiErrorKind, LayerApi};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::ApiConfig;

pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
    basic_auth: Option<(String, Option<String>)>,
}

impl HttpApi {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::with_source(ApiErrorKind::Transport, "failed to build HTTP client", e))?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            basic_auth: config.basic_auth.clone(),
        })
    }

    async fn get<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let body = self.get_value(path, query).await?;
        serde_json::from_value(body)
            .map_err(|e| ApiError::with_source(ApiErrorKind::Decode, format!("{path}: unexpected body"), e))
    }

    /// Endpoints that answer a list; anything but an array reads as empty.
    async fn get_list<T, Q>(&self, path: &str, query: &Q) -> Result<Vec<T>, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        match self.get_value(path, query).await? {
            body @ Value::Array(_) => serde_json::from_value(body).map_err(|e| {
                ApiError::with_source(ApiErrorKind::Decode, format!("{path}: unexpected rows"), e)
            }),
            other => {
                debug!(path, kind = json_kind(&other), "non-list body treated as empty");
                Ok(Vec::new())
            }
        }
    }

    async fn get_value<Q>(&self, path: &str, query: &Q) -> Result<Value, ApiError>
    where
        Q: Serialize + ?Sized,
    {
        let url = format!("{}{path}", self.base_url);
        let mut req = self.client.get(&url).query(query);
        if let Some((user, pass)) = &self.basic_auth {
            req = req.basic_auth(user, pass.as_ref());
        }

        let resp = req.send().await.map_err(|e| request_error(path, e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::new(
                ApiErrorKind::Status(status.as_u16()),
                format!("{path} answered {status}"),
            ));
        }

        let bytes = resp.bytes().await.map_err(|e| request_error(path, e))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::with_source(ApiErrorKind::Decode, format!("{path}: body is not JSON"), e))
    }
}

fn request_error(path: &str, err: reqwest::Error) -> ApiError {
    let kind = if err.is_timeout() {
        ApiErrorKind::Timeout
    } else if err.is_decode() {
        ApiErrorKind::Decode
    } else {
        ApiErrorKind::Transport
    };
    ApiError::with_source(kind, format!("{path}: request failed"), err)
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl LayerApi for HttpApi {
    fn markers(&self, query: MarkerQuery) -> BoxFuture<'_, Result<Vec<MarkerRow>, ApiError>> {
        Box::pin(async move { self.get_list("/api/markers", &query).await })
    }

    fn boundaries(&self, query: BoundaryQuery) -> BoxFuture<'_, Result<FeatureCollection, ApiError>> {
        Box::pin(async move { self.get("/api/bounds", &query).await })
    }

    fn geo_summary(&self, query: StatsQuery) -> BoxFuture<'_, Result<Vec<AreaStatRow>, ApiError>> {
        Box::pin(async move { self.get_list("/api/geo-summary", &query).await })
    }

    fn summary(&self, query: SummaryQuery) -> BoxFuture<'_, Result<Summary, ApiError>> {
        Box::pin(async move { self.get("/api/summary", &query).await })
    }

    fn apartment_basic(&self, apt_cd: String) -> BoxFuture<'_, Result<AptBasic, ApiError>> {
        Box::pin(async move { self.get("/api/aptinfo/basic", &[("apt_cd", apt_cd)]).await })
    }
}
