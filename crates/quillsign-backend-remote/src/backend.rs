use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;

use quillsign_core::{
    CreateSubAccountInput, CredentialInput, CredentialOutcome, PdfDocument, PortalBackend,
    PortalError, PortalResult, SubAccount, SubAccountSession, Ticket, TicketMessage,
    UpdateSubAccountInput,
};

/// Portal backend over the hosted service's HTTP API.
///
/// Row-level restriction to the owning account is enforced server-side from
/// the bearer token; the client only passes filters.
pub struct RemoteBackend {
    base_url: String,
    api_key: Option<String>,
    /// Bearer used for scoped reads: the session token once one exists,
    /// otherwise the api key. Set on successful credential exchange and on
    /// session restore.
    bearer: RwLock<Option<String>>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct VerifyLoginResponse {
    success: bool,
    #[serde(default)]
    session_token: Option<String>,
    #[serde(default)]
    sub_account: Option<SubAccount>,
}

/// Parse the total from a `Content-Range` header like `0-9/15` or `*/0`.
fn parse_content_range_total(value: &str) -> Option<i64> {
    value.rsplit('/').next()?.trim().parse().ok()
}

impl RemoteBackend {
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        RemoteBackend {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            bearer: RwLock::new(None),
            client: reqwest::Client::new(),
        }
    }

    /// Adopt a session token restored from client storage as the bearer for
    /// scoped reads. The token is trusted as-is; see the session manager's
    /// trust-on-restore policy.
    pub async fn set_bearer(&self, token: &str) {
        *self.bearer.write().await = Some(token.to_string());
    }

    async fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        let mut builder = self.client.request(method, url);
        if let Some(key) = &self.api_key {
            builder = builder.header("apikey", key);
        }
        let bearer = self.bearer.read().await.clone();
        if let Some(token) = bearer.or_else(|| self.api_key.clone()) {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn check(&self, response: reqwest::Response) -> PortalResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(PortalError::Auth(format!("{status}: {body}")));
        }
        Err(PortalError::Backend(format!("{status}: {body}")))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> PortalResult<T> {
        let response = self
            .request(reqwest::Method::GET, path)
            .await
            .send()
            .await
            .map_err(|e| PortalError::Backend(e.to_string()))?;
        let response = self.check(response).await?;
        response
            .json()
            .await
            .map_err(|e| PortalError::Decode(e.to_string()))
    }
}

#[async_trait]
impl PortalBackend for RemoteBackend {
    async fn verify_credentials(
        &self,
        input: &CredentialInput,
    ) -> PortalResult<CredentialOutcome> {
        let result: Result<VerifyLoginResponse, PortalError> = async {
            let response = self
                .request(reqwest::Method::POST, "/rpc/verify_sub_account_login")
                .await
                .json(input)
                .send()
                .await
                .map_err(|e| PortalError::Backend(e.to_string()))?;
            let response = self.check(response).await?;
            response
                .json()
                .await
                .map_err(|e| PortalError::Decode(e.to_string()))
        }
        .await;

        // Transport, status, and credential failures all collapse to one
        // generic outcome for the caller.
        let body = match result {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("credential exchange failed: {e}");
                return Ok(CredentialOutcome::Failure);
            }
        };
        match body {
            VerifyLoginResponse {
                success: true,
                session_token: Some(token),
                sub_account: Some(sub_account),
            } => {
                self.set_bearer(&token).await;
                Ok(CredentialOutcome::Success(SubAccountSession {
                    token,
                    sub_account,
                }))
            }
            VerifyLoginResponse { success: true, .. } => {
                tracing::warn!("credential exchange succeeded without token or record");
                Ok(CredentialOutcome::Failure)
            }
            _ => Ok(CredentialOutcome::Failure),
        }
    }

    async fn create_sub_account(&self, input: &CreateSubAccountInput) -> PortalResult<SubAccount> {
        let body = json!({
            "main_account_id": input.main_account_id,
            "username": input.username,
            "display_name": input.display_name,
            "password": input.password,
            "permissions": input.permissions,
        });
        let response = self
            .request(reqwest::Method::POST, "/rest/sub_accounts")
            .await
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await
            .map_err(|e| PortalError::Backend(e.to_string()))?;
        let response = self.check(response).await?;
        let mut rows: Vec<SubAccount> = response
            .json()
            .await
            .map_err(|e| PortalError::Decode(e.to_string()))?;
        rows.pop().ok_or(PortalError::SubAccountNotFound)
    }

    async fn list_sub_accounts(&self, main_account_id: &str) -> PortalResult<Vec<SubAccount>> {
        self.get_json(&format!(
            "/rest/sub_accounts?main_account_id=eq.{main_account_id}&order=created_at.asc"
        ))
        .await
    }

    async fn update_sub_account(
        &self,
        id: &str,
        input: &UpdateSubAccountInput,
    ) -> PortalResult<SubAccount> {
        let mut body = serde_json::Map::new();
        if let Some(display_name) = &input.display_name {
            body.insert("display_name".into(), json!(display_name));
        }
        if let Some(is_active) = input.is_active {
            body.insert("is_active".into(), json!(is_active));
        }
        if let Some(permissions) = input.permissions {
            body.insert("permissions".into(), json!(permissions));
        }
        let response = self
            .request(reqwest::Method::PATCH, &format!("/rest/sub_accounts?id=eq.{id}"))
            .await
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await
            .map_err(|e| PortalError::Backend(e.to_string()))?;
        let response = self.check(response).await?;
        let mut rows: Vec<SubAccount> = response
            .json()
            .await
            .map_err(|e| PortalError::Decode(e.to_string()))?;
        rows.pop().ok_or(PortalError::SubAccountNotFound)
    }

    async fn reset_password(&self, id: &str, new_password: &str) -> PortalResult<()> {
        let response = self
            .request(reqwest::Method::POST, "/rpc/reset_sub_account_password")
            .await
            .json(&json!({ "id": id, "new_password": new_password }))
            .send()
            .await
            .map_err(|e| PortalError::Backend(e.to_string()))?;
        self.check(response).await?;
        Ok(())
    }

    async fn delete_sub_account(&self, id: &str) -> PortalResult<()> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/rest/sub_accounts?id=eq.{id}"))
            .await
            .send()
            .await
            .map_err(|e| PortalError::Backend(e.to_string()))?;
        self.check(response).await?;
        Ok(())
    }

    async fn count_documents(&self, owner_id: &str) -> PortalResult<i64> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/rest/pdf_documents?user_id=eq.{owner_id}&select=id&limit=1"),
            )
            .await
            .header("Prefer", "count=exact")
            .send()
            .await
            .map_err(|e| PortalError::Backend(e.to_string()))?;
        let response = self.check(response).await?;
        let total = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| PortalError::Decode("missing content-range total".to_string()))?;
        Ok(total)
    }

    async fn list_documents(
        &self,
        owner_id: &str,
        page: u32,
        page_size: u32,
    ) -> PortalResult<Vec<PdfDocument>> {
        let offset = u64::from(page.max(1) - 1) * u64::from(page_size);
        self.get_json(&format!(
            "/rest/pdf_documents?user_id=eq.{owner_id}&order=created_at.desc&limit={page_size}&offset={offset}"
        ))
        .await
    }

    async fn list_tickets(&self, user_id: &str) -> PortalResult<Vec<Ticket>> {
        self.get_json(&format!(
            "/rest/tickets?user_id=eq.{user_id}&order=updated_at.desc"
        ))
        .await
    }

    async fn list_ticket_messages(&self, ticket_id: &str) -> PortalResult<Vec<TicketMessage>> {
        self.get_json(&format!(
            "/rest/ticket_messages?ticket_id=eq.{ticket_id}&order=created_at.asc"
        ))
        .await
    }

    async fn touch_ticket(&self, ticket_id: &str) -> PortalResult<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let response = self
            .request(reqwest::Method::PATCH, &format!("/rest/tickets?id=eq.{ticket_id}"))
            .await
            .json(&json!({ "updated_at": now }))
            .send()
            .await
            .map_err(|e| PortalError::Backend(e.to_string()))?;
        self.check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_range_with_range() {
        assert_eq!(parse_content_range_total("0-9/15"), Some(15));
    }

    #[test]
    fn content_range_empty_set() {
        assert_eq!(parse_content_range_total("*/0"), Some(0));
    }

    #[test]
    fn content_range_garbage() {
        assert_eq!(parse_content_range_total("bogus"), None);
        assert_eq!(parse_content_range_total("0-9/many"), None);
    }
}
