use anyhow::{Context, Result};
use reqwest::blocking::Client as HttpClient;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::PollError;
use crate::store::JsonStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Keeps the vendor OAuth pair on disk and trades the refresh token for a fresh access token.
pub struct TokenManager {
    store: JsonStore<TokenPair>,
    http: HttpClient,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl TokenManager {
    pub fn new(
        path: impl Into<PathBuf>,
        http: HttpClient,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            store: JsonStore::new(path),
            http,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn load(&self) -> Result<Option<TokenPair>> {
        self.store.load()
    }

    pub fn save(&self, pair: &TokenPair) -> Result<()> {
        self.store.save(pair)
    }

    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        let resp = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .map_err(|err| PollError::fetch(format!("token endpoint unreachable: {err}")))?;

        let status = resp.status();
        if matches!(
            status,
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            let body = resp.text().unwrap_or_default();
            return Err(PollError::auth(format!(
                "token endpoint rejected refresh token ({status}): {}",
                body.trim()
            ))
            .into());
        }
        if !status.is_success() {
            return Err(PollError::fetch(format!("token endpoint returned {status}")).into());
        }

        let parsed: TokenResponse = resp
            .json()
            .map_err(|err| PollError::auth(format!("malformed token response: {err}")))?;
        Ok(TokenPair {
            access_token: parsed.access_token,
            refresh_token: parsed
                .refresh_token
                .filter(|token| !token.trim().is_empty())
                .unwrap_or_else(|| refresh_token.to_string()),
        })
    }

    /// Load, refresh and persist; returns the new access token.
    pub fn acquire(&self) -> Result<String> {
        let current = self.load()?.ok_or_else(|| {
            PollError::auth(format!(
                "no tokens at {}; seed a refresh token with `homewatch token seed`",
                self.store.path().display()
            ))
        })?;
        let pair = self.refresh(&current.refresh_token)?;
        self.save(&pair)
            .with_context(|| format!("failed to store tokens at {}", self.store.path().display()))?;
        tracing::debug!(path = %self.store.path().display(), "vendor tokens refreshed");
        Ok(pair.access_token)
    }

    /// Writes a hand-provisioned refresh token so the next poll can refresh.
    pub fn seed(&self, refresh_token: &str, access_token: Option<&str>) -> Result<()> {
        self.save(&TokenPair {
            access_token: access_token.unwrap_or_default().to_string(),
            refresh_token: refresh_token.trim().to_string(),
        })
    }
}

#[cfg(test)]
pub(crate) mod test_http {
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    /// Serves the given responses once each, in order, and returns the raw requests.
    pub(crate) fn serve(responses: Vec<(u16, String)>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = std::thread::spawn(move || {
            let mut requests = Vec::new();
            for (status, body) in responses {
                let (stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut head = String::new();
                let mut content_length = 0usize;
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                        content_length = value.trim().parse().unwrap();
                    }
                    let done = line == "\r\n" || line.is_empty();
                    head.push_str(&line);
                    if done {
                        break;
                    }
                }
                let mut body_in = vec![0u8; content_length];
                reader.read_exact(&mut body_in).unwrap();
                head.push_str(&String::from_utf8_lossy(&body_in));
                requests.push(head);

                let mut stream = stream;
                let response = format!(
                    "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).unwrap();
                stream.flush().unwrap();
            }
            requests
        });
        (base, handle)
    }
}
