//! Google OAuth access token refresh
use anyhow::{Result, anyhow};
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    /// Lifetime in seconds from now
    pub expires_in: i64,
}

/// Exchange a stored refresh token for a fresh access token.
pub async fn refresh_access_token(
    http: &Client,
    oauth_hostname: &str,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> Result<OAuthTokens> {
    let params = [
        ("client_id", client_id),
        ("client_secret", client_secret),
        ("refresh_token", refresh_token),
        ("grant_type", "refresh_token"),
    ];

    let response = http
        .post(format!("{}/token", oauth_hostname))
        .form(&params)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(anyhow!("Token refresh failed ({}): {}", status, body));
    }

    let tokens = response.json::<OAuthTokens>().await?;
    Ok(tokens)
}
