//! Authenticated JSON calls to Google APIs.
//!
//! The access token is acquired outside the bot and passed in; nothing here
//! refreshes it.

use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info};

use crate::remote::{
    Backoff, RemoteError, RemoteService, retry_after_header, retry_with_backoff,
};

#[derive(Debug, Clone)]
pub struct GoogleClient {
    http: reqwest::Client,
    access_token: String,
    retry: Backoff,
}

impl GoogleClient {
    pub fn new(access_token: impl Into<String>) -> Self {
        GoogleClient {
            http: reqwest::Client::new(),
            access_token: access_token.into(),
            retry: Backoff::STANDARD,
        }
    }

    /// Sends one request, with retries, and returns the decoded JSON body.
    pub async fn send(
        &self,
        service: RemoteService,
        description: &str,
        method: Method,
        url: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Value, RemoteError> {
        info!("{description}");
        let response = retry_with_backoff(self.retry, description, || {
            self.send_once(service, method.clone(), url, query, body)
        })
        .await?;
        debug!(%url, response = %response, "Google call succeeded");
        Ok(response)
    }

    async fn send_once(
        &self,
        service: RemoteService,
        method: Method,
        url: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Value, RemoteError> {
        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(&self.access_token)
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::from_reqwest(service, e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after_header(&response);
            let text = response.text().await.unwrap_or_default();
            return Err(RemoteError::from_status(service, status.as_u16(), text)
                .with_retry_after(retry_after.as_deref()));
        }
        response
            .json()
            .await
            .map_err(|e| RemoteError::from_reqwest(service, e))
    }
}
