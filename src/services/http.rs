//! HTTP implementation of the controller seam

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::controller::{ActionReply, ActionRequest, Controller};
use crate::{
    error::FetchError,
    state::{ProgramMap, ProgramRunState, UserSettings, ZoneStatus},
};

/// Talks to the controller's REST API over `reqwest`
#[derive(Debug, Clone)]
pub struct HttpController {
    http: Client,
    base_url: String,
}

impl HttpController {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_body(response: Response, path: &str) -> Result<(StatusCode, Vec<u8>), FetchError> {
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(format!("reading {path}: {e}")))?;
        Ok((status, body.to_vec()))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        debug!("GET {}", path);
        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| FetchError::Transport(format!("GET {path}: {e}")))?;
        let (status, body) = Self::read_body(response, path).await?;
        if !status.is_success() {
            return Err(FetchError::Status { status: status.as_u16() });
        }
        serde_json::from_slice(&body).map_err(|e| FetchError::Malformed(format!("{path}: {e}")))
    }
}

impl Controller for HttpController {
    async fn get_zones_status(&self) -> Result<Vec<ZoneStatus>, FetchError> {
        self.get_json("/get_zones_status").await
    }

    async fn get_program_state(&self) -> Result<ProgramRunState, FetchError> {
        self.get_json("/get_program_state").await
    }

    async fn load_settings(&self) -> Result<UserSettings, FetchError> {
        self.get_json("/data/user_settings.json").await
    }

    async fn load_programs(&self) -> Result<ProgramMap, FetchError> {
        self.get_json("/data/program.json").await
    }

    /// A parseable `{success, error}` body wins over the status code, since
    /// the controller reports rejections with 4xx/5xx and a reason.
    async fn send(&self, request: &ActionRequest) -> Result<ActionReply, FetchError> {
        let path = request.path();
        debug!("POST {} {}", path, request.body());
        let response = self
            .http
            .post(self.url(path))
            .json(&request.body())
            .send()
            .await
            .map_err(|e| FetchError::Transport(format!("POST {path}: {e}")))?;
        let (status, body) = Self::read_body(response, path).await?;

        match serde_json::from_slice::<ActionReply>(&body) {
            Ok(reply) => Ok(reply),
            Err(_) if !status.is_success() => Err(FetchError::Status { status: status.as_u16() }),
            Err(e) => Err(FetchError::Malformed(format!("{path}: {e}"))),
        }
    }
}
