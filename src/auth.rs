//! Bearer-token verification against the Supabase auth REST API.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{AppError, Result};

const DEFAULT_DETAILS: &str = "Invalid or expired JWT token. Please log in again.";

#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: String,
}

#[derive(Clone)]
pub struct SupabaseAuth {
    client: reqwest::Client,
}

impl SupabaseAuth {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Resolve the token to a user via `GET {project_url}/auth/v1/user`.
    /// Every failure, network errors included, is `Unauthorized`.
    pub async fn verify(&self, project_url: &str, api_key: &str, auth_header: &str) -> Result<AuthUser> {
        let bearer = bearer(auth_header);
        let url = format!("{}/auth/v1/user", project_url.trim_end_matches('/'));

        let resp = self
            .client
            .get(&url)
            .header("apikey", api_key)
            .header(reqwest::header::AUTHORIZATION, bearer)
            .send()
            .await
            .map_err(|e| {
                warn!("auth provider unreachable: {e}");
                AppError::Unauthorized(e.to_string())
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "token rejected by auth provider");
            return Err(AppError::Unauthorized(rejection_details(&body)));
        }

        let user: AuthUser = resp.json().await.map_err(|e| {
            warn!("auth provider returned an unreadable user: {e}");
            AppError::Unauthorized(DEFAULT_DETAILS.to_string())
        })?;
        if user.id.is_empty() {
            return Err(AppError::Unauthorized(DEFAULT_DETAILS.to_string()));
        }
        debug!(user_id = %user.id, "token verified");
        Ok(user)
    }
}

/// Header value as sent, or with `Bearer ` prepended when the client omitted it.
pub fn bearer(auth_header: &str) -> String {
    if auth_header.starts_with("Bearer ") {
        auth_header.to_string()
    } else {
        format!("Bearer {auth_header}")
    }
}

fn rejection_details(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["msg", "message", "error_description", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(|m| m.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| DEFAULT_DETAILS.to_string())
}
