use meme_core::{
    ConfigError, CoreError, RedditApiError, RedditCredentials, CLIENT_ID_VAR, CLIENT_SECRET_VAR,
};
use oauth2::basic::{BasicClient, BasicRequestTokenError};
use oauth2::http::header::{HeaderValue, CONTENT_TYPE};
use oauth2::http::{HeaderMap, StatusCode};
use oauth2::{
    AuthUrl, ClientId, ClientSecret, HttpRequest, HttpResponse, RequestTokenError, TokenResponse,
    TokenUrl,
};
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, error, info};

// Required by `BasicClient` but never visited: the client-credentials grant
// has no user-facing authorization step.
const REDDIT_AUTHORIZE_URL: &str = "https://www.reddit.com/api/v1/authorize";

/// Transport-level failure while talking to the token endpoint.
#[derive(Error, Debug)]
pub enum TokenTransportError {
    #[error("token endpoint returned HTTP {status}")]
    Rejected { status: u16, body: String },

    #[error("token request failed: {0}")]
    Network(#[from] reqwest::Error),
}

/// Exchanges the application's id/secret for an app-only bearer token.
///
/// A fresh token is requested on every call; nothing is cached or refreshed.
pub struct TokenAcquirer {
    http_client: Client,
    oauth_client: BasicClient,
}

impl TokenAcquirer {
    pub fn new(
        http_client: Client,
        credentials: &RedditCredentials,
        token_url: &str,
    ) -> Result<Self, CoreError> {
        if credentials.client_id.is_empty() {
            return Err(ConfigError::MissingEnvironmentVariable {
                var_name: CLIENT_ID_VAR.to_string(),
            }
            .into());
        }
        if credentials.client_secret.is_empty() {
            return Err(ConfigError::MissingEnvironmentVariable {
                var_name: CLIENT_SECRET_VAR.to_string(),
            }
            .into());
        }

        let auth_url = AuthUrl::new(REDDIT_AUTHORIZE_URL.to_string())
            .map_err(|e| invalid_url("auth_url", e))?;
        let token_url =
            TokenUrl::new(token_url.to_string()).map_err(|e| invalid_url("token_url", e))?;

        // Basic auth is the default credential placement for BasicClient.
        let oauth_client = BasicClient::new(
            ClientId::new(credentials.client_id.clone()),
            Some(ClientSecret::new(credentials.client_secret.clone())),
            auth_url,
            Some(token_url),
        );

        Ok(Self {
            http_client,
            oauth_client,
        })
    }

    /// A 2xx body must carry both `access_token` and `token_type`; anything
    /// else is `InvalidResponse`.
    pub async fn acquire_token(&self) -> Result<String, CoreError> {
        info!("Requesting app-only access token");
        let http_client = &self.http_client;

        let token = self
            .oauth_client
            .exchange_client_credentials()
            .request_async(|request| send_token_request(http_client, request))
            .await
            .map_err(map_token_error)?;

        debug!("Access token received (type {:?})", token.token_type());
        Ok(token.access_token().secret().to_string())
    }
}

async fn send_token_request(
    http_client: &Client,
    request: HttpRequest,
) -> Result<HttpResponse, TokenTransportError> {
    let mut builder = http_client.post(request.url.as_str()).body(request.body);
    for (name, value) in request.headers.iter() {
        builder = builder.header(name.as_str(), value.as_bytes());
    }

    let response = builder.send().await?;
    let status = response.status();

    let mut headers = HeaderMap::new();
    if let Some(content_type) = response.headers().get(reqwest::header::CONTENT_TYPE) {
        if let Ok(value) = HeaderValue::from_bytes(content_type.as_bytes()) {
            headers.insert(CONTENT_TYPE, value);
        }
    }
    let body = response.bytes().await?.to_vec();

    if !status.is_success() {
        let body = String::from_utf8_lossy(&body).into_owned();
        error!("Token endpoint rejected request: {} {}", status, body);
        return Err(TokenTransportError::Rejected {
            status: status.as_u16(),
            body,
        });
    }

    let status_code =
        StatusCode::from_u16(status.as_u16()).map_err(|_| TokenTransportError::Rejected {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body).into_owned(),
        })?;

    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}

pub(crate) fn map_token_error(error: BasicRequestTokenError<TokenTransportError>) -> CoreError {
    match error {
        RequestTokenError::Request(TokenTransportError::Rejected { status, body }) => {
            RedditApiError::TokenRejected { status, body }.into()
        }
        RequestTokenError::Request(TokenTransportError::Network(e)) if e.is_timeout() => {
            RedditApiError::RequestTimeout.into()
        }
        RequestTokenError::Request(TokenTransportError::Network(e)) => {
            RedditApiError::AuthenticationFailed {
                reason: format!("token endpoint unreachable: {}", e),
            }
            .into()
        }
        RequestTokenError::ServerResponse(response) => RedditApiError::AuthenticationFailed {
            reason: response.to_string(),
        }
        .into(),
        RequestTokenError::Parse(e, body) => RedditApiError::InvalidResponse {
            details: format!(
                "token response: {}: {}",
                e,
                String::from_utf8_lossy(&body)
            ),
        }
        .into(),
        RequestTokenError::Other(reason) => {
            RedditApiError::AuthenticationFailed { reason }.into()
        }
    }
}

fn invalid_url(field: &str, error: url::ParseError) -> CoreError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: error.to_string(),
    }
    .into()
}
