//! Anymailfinder bulk company email backend.

use std::time::Duration;

use async_trait::async_trait;
use prospector_shared::{ProspectorError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{DEFAULT_TIMEOUT_SECS, EmailFinder, build_client, network_error, read_body, trim_base};

const PROVIDER: &str = "anymailfinder";
const DEFAULT_BASE_URL: &str = "https://api.anymailfinder.com";

#[derive(Debug, Serialize)]
struct CompanyRequest<'a> {
    domain: &'a str,
    email_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompanyResponse {
    #[serde(default)]
    email_status: Option<String>,
    #[serde(default)]
    emails: Vec<String>,
}

/// One `POST {base}/v5.1/find-email/company` per domain.
pub struct AnymailfinderClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl AnymailfinderClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: build_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = trim_base(base_url);
        self
    }
}

#[async_trait]
impl EmailFinder for AnymailfinderClient {
    #[instrument(skip_all, fields(provider = PROVIDER, domain = %domain))]
    async fn find_company_emails(&self, domain: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .post(format!("{}/v5.1/find-email/company", self.base_url))
            .header("Authorization", &self.api_key)
            .json(&CompanyRequest {
                domain,
                email_type: "any",
            })
            .send()
            .await
            .map_err(|e| network_error(PROVIDER, e))?;

        let Some(body) = read_body(PROVIDER, response).await? else {
            return Ok(Vec::new());
        };
        let parsed: CompanyResponse = serde_json::from_str(&body)
            .map_err(|e| ProspectorError::parse(format!("{PROVIDER} response: {e}")))?;

        if parsed.email_status.as_deref() == Some("not_found") {
            debug!("no emails on record");
            return Ok(Vec::new());
        }

        debug!(count = parsed.emails.len(), status = ?parsed.email_status, "emails found");
        Ok(parsed.emails)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> AnymailfinderClient {
        AnymailfinderClient::new("amf-key")
            .unwrap()
            .with_base_url(&server.uri())
    }

    #[tokio::test]
    async fn test_finds_company_emails() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v5.1/find-email/company"))
            .and(header("Authorization", "amf-key"))
            .and(body_json(serde_json::json!({"domain": "acme.com", "email_type": "any"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "email_status": "valid",
                "emails": ["info@acme.com", "john.doe@acme.com", "j.smith@acme.com"],
                "valid_emails": ["john.doe@acme.com"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let emails = client_for(&server).find_company_emails("acme.com").await.unwrap();
        assert_eq!(
            emails,
            vec!["info@acme.com", "john.doe@acme.com", "j.smith@acme.com"]
        );
    }

    #[tokio::test]
    async fn test_not_found_status_is_empty() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v5.1/find-email/company"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "email_status": "not_found",
                "emails": []
            })))
            .mount(&server)
            .await;

        let emails = client_for(&server).find_company_emails("nowhere.io").await.unwrap();
        assert!(emails.is_empty());
    }

    #[tokio::test]
    async fn test_http_404_is_empty() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v5.1/find-email/company"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let emails = client_for(&server).find_company_emails("nowhere.io").await.unwrap();
        assert!(emails.is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_retryable() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v5.1/find-email/company"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = client_for(&server).find_company_emails("acme.com").await.unwrap_err();
        assert!(matches!(err, ProspectorError::Provider { status: 401, .. }));
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("invalid api key"));
    }
}
