use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Method, RequestBuilder, Response,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;
use shared_models::error::AppError;

#[derive(Debug, Error)]
pub enum SupabaseError {
    #[error("Request to data store failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Data store error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),
}

impl SupabaseError {
    /// PostgREST answers 409 when a unique or foreign key constraint rejects a write.
    pub fn is_conflict(&self) -> bool {
        matches!(self, SupabaseError::Api { status: 409, .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SupabaseError::Api { status: 404, .. })
    }
}

impl From<SupabaseError> for AppError {
    fn from(err: SupabaseError) -> Self {
        match err {
            SupabaseError::Api { status: 401 | 403, message } => AppError::Auth(message),
            SupabaseError::Api { status: 404, message } => AppError::NotFound(message),
            SupabaseError::Api { status: 409, message } => AppError::Conflict(message),
            other => AppError::Database(other.to_string()),
        }
    }
}

/// Thin client over the PostgREST interface of the hospital database.
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap, SupabaseError> {
        let mut headers = HeaderMap::new();

        headers.insert(
            "apikey",
            HeaderValue::from_str(&self.anon_key)
                .map_err(|e| SupabaseError::InvalidHeader(e.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|e| SupabaseError::InvalidHeader(e.to_string()))?,
            );
        }

        Ok(headers)
    }

    async fn send_checked(req: RequestBuilder) -> Result<Response, SupabaseError> {
        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("Data store error ({}): {}", status, error_text);

            return Err(SupabaseError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        Ok(response)
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T, SupabaseError>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T, SupabaseError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = Self::send_checked(req).await?;
        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Runs a request whose response body is irrelevant, such as a DELETE.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(), SupabaseError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Executing {} request to {}", method, url);

        let mut req = self
            .client
            .request(method, &url)
            .headers(self.get_headers(auth_token)?);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        Self::send_checked(req).await?;
        Ok(())
    }

    /// Runs a write and asks PostgREST to echo the affected rows back.
    pub async fn write_returning<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: &str,
        body: Value,
    ) -> Result<Vec<T>, SupabaseError>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(
            method,
            path,
            Some(auth_token),
            Some(body),
            Some(Self::representation_headers()),
        )
        .await
    }

    pub fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}
