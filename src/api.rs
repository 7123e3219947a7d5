use crate::block::{Block, Week};
use crate::exercise_library::ExerciseType;
use crate::settings::Settings;
use crate::workout::Workout;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    RateLimited(String),
    Status(u16, String),
    Transport(Box<dyn std::error::Error + Send + Sync>),
    Decode(Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
    fn from_status(code: u16, body: String) -> Self {
        match code {
            401 => ApiError::Unauthorized(body),
            403 => ApiError::Forbidden(body),
            404 => ApiError::NotFound(body),
            429 => ApiError::RateLimited(body),
            _ => ApiError::Status(code, body),
        }
    }

    /// Whether repeating the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::RateLimited(_) | ApiError::Transport(_) => true,
            ApiError::Status(code, _) => *code >= 500,
            _ => false,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Unauthorized(body) => write!(f, "Unauthorized: {body}"),
            ApiError::Forbidden(body) => write!(f, "Forbidden: {body}"),
            ApiError::NotFound(body) => write!(f, "Not found: {body}"),
            ApiError::RateLimited(body) => write!(f, "Rate limited: {body}"),
            ApiError::Status(code, body) => write!(f, "HTTP {code}: {body}"),
            ApiError::Transport(e) => write!(f, "{e}"),
            ApiError::Decode(e) => write!(f, "Invalid response: {e}"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Transport(e) | ApiError::Decode(e) => Some(&**e),
            _ => None,
        }
    }
}

/// Partial update of a day. `Some(None)` clears the field on the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DayUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

impl DayUpdate {
    pub fn focus(focus: Option<String>) -> Self {
        DayUpdate {
            focus: Some(focus),
            notes: None,
        }
    }
}

/// The backend operations the bulk editor needs.
pub trait DayStore {
    fn update_day(&self, day_id: &str, update: &DayUpdate) -> Result<(), ApiError>;
    fn fetch_week(&self, week_id: &str) -> Result<Week, ApiError>;
}

/// List endpoints answer with either a bare array or an object wrapping it.
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(
            alias = "items",
            alias = "blocks",
            alias = "exercise_types",
            alias = "points"
        )]
        data: Vec<T>,
    },
}

impl<T> Listing<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Bare(items) | Listing::Wrapped { data: items } => items,
        }
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode(Box::new(e)))
}

/// Blocking client for the Flow HTTP API.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    agent: ureq::Agent,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token,
            agent: ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build(),
        }
    }

    /// Build a client from the saved settings and environment overrides.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.api_base_url(), settings.api_token())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let req = self
            .agent
            .request(method, &self.url(path))
            .set("Accept", "application/json");
        match &self.token {
            Some(token) => req.set("Authorization", &format!("Bearer {token}")),
            None => req,
        }
    }

    fn send(&self, method: &str, path: &str, body: Option<&Value>) -> Result<String, ApiError> {
        log::info!("{method} {path}");
        let req = self.request(method, path);
        let response = match body {
            Some(body) => req.send_json(body),
            None => req.call(),
        };
        match response {
            Ok(r) => r.into_string().map_err(|e| ApiError::Transport(Box::new(e))),
            Err(ureq::Error::Status(code, r)) => {
                let body = r.into_string().unwrap_or_default();
                Err(ApiError::from_status(code, body))
            }
            Err(e) => Err(ApiError::Transport(Box::new(e))),
        }
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        decode(&self.send("GET", path, None)?)
    }

    fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ApiError> {
        self.get::<Listing<T>>(path).map(Listing::into_vec)
    }

    pub fn list_blocks(&self) -> Result<Vec<Block>, ApiError> {
        self.get_list("/blocks")
    }

    pub fn get_block(&self, block_id: &str) -> Result<Block, ApiError> {
        self.get(&format!("/blocks/{block_id}"))
    }

    pub fn get_week(&self, week_id: &str) -> Result<Week, ApiError> {
        self.get(&format!("/weeks/{week_id}"))
    }

    pub fn update_day(&self, day_id: &str, update: &DayUpdate) -> Result<(), ApiError> {
        let body = serde_json::to_value(update).map_err(|e| ApiError::Decode(Box::new(e)))?;
        self.send("PUT", &format!("/days/{day_id}"), Some(&body))
            .map(|_| ())
    }

    /// Fetch and normalize the workout logged for a day.
    pub fn get_day_workout(&self, day_id: &str) -> Result<Workout, ApiError> {
        let body = self.send("GET", &format!("/days/{day_id}/workout"), None)?;
        Workout::from_json(&body).map_err(|e| ApiError::Decode(Box::new(e)))
    }

    pub fn list_exercise_types(&self) -> Result<Vec<ExerciseType>, ApiError> {
        self.get_list("/exercise-types")
    }

    pub fn get_series<T: DeserializeOwned>(&self, series: &str) -> Result<Vec<T>, ApiError> {
        self.get_list(&format!("/analytics/{series}"))
    }

    pub fn send_feedback(&self, message: &str) -> Result<(), ApiError> {
        let body = serde_json::json!({ "message": message });
        self.send("POST", "/feedback", Some(&body)).map(|_| ())
    }
}

impl DayStore for ApiClient {
    fn update_day(&self, day_id: &str, update: &DayUpdate) -> Result<(), ApiError> {
        ApiClient::update_day(self, day_id, update)
    }

    fn fetch_week(&self, week_id: &str) -> Result<Week, ApiError> {
        self.get_week(week_id)
    }
}
