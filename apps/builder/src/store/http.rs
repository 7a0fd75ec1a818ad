use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{FieldErrors, StoreError};
use crate::models::wire::{
    ListResponse, PersonalInfoPayload, PersonalInfoRecord, ResumeResponse, SkillsRecord,
};
use crate::models::Section;
use crate::store::ResumeStore;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    detail: Option<String>,
}

/// HTTP client for the Resume Store REST API.
///
/// Every request carries `Content-Type: application/json` and, when a session
/// token is available, `Authorization: Bearer <token>`.
#[derive(Clone)]
pub struct HttpResumeStore {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpResumeStore {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Response, StoreError> {
        debug!("{} {}", method, path);

        let mut request = self
            .client
            .request(method, self.url(path))
            .header("content-type", "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        warn!("Resume Store returned {} for {}: {}", status, path, text);
        Err(error_from_response(status, path, &text))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, StoreError> {
        let response = self.send(method, path, body).await?;
        let text = response.text().await?;
        // Empty bodies decode as `null` so `Option<T>` targets become `None`.
        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        Ok(serde_json::from_str(text)?)
    }
}

/// Maps a non-success response onto the error taxonomy.
fn error_from_response(status: StatusCode, path: &str, body: &str) -> StoreError {
    match status {
        StatusCode::BAD_REQUEST => match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(map)) => StoreError::Validation(field_errors(map)),
            _ => StoreError::Api {
                status: status.as_u16(),
                message: body.to_string(),
            },
        },
        StatusCode::UNAUTHORIZED => StoreError::Unauthorized,
        StatusCode::NOT_FOUND => StoreError::NotFound(path.to_string()),
        _ => {
            let message = serde_json::from_str::<ErrorBody>(body)
                .ok()
                .and_then(|e| e.message.or(e.detail))
                .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));
            StoreError::Api {
                status: status.as_u16(),
                message,
            }
        }
    }
}

fn field_errors(map: serde_json::Map<String, Value>) -> FieldErrors {
    map.into_iter()
        .map(|(field, value)| {
            let messages = match value {
                Value::String(s) => vec![s],
                Value::Array(items) => items
                    .into_iter()
                    .map(|v| match v {
                        Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect(),
                other => vec![other.to_string()],
            };
            (field, messages)
        })
        .collect()
}

#[async_trait]
impl ResumeStore for HttpResumeStore {
    async fn fetch_resume(&self) -> Result<ResumeResponse, StoreError> {
        self.send_json(Method::GET, "/resume/", None).await
    }

    async fn get_personal_info(&self) -> Result<Option<PersonalInfoRecord>, StoreError> {
        self.send_json(Method::GET, "/personalInfo/", None).await
    }

    async fn save_personal_info(
        &self,
        id: Option<i64>,
        payload: &PersonalInfoPayload,
    ) -> Result<PersonalInfoRecord, StoreError> {
        let body = serde_json::to_value(payload)?;
        let method = if id.is_some() { Method::PUT } else { Method::POST };
        self.send_json(method, "/personalInfo/", Some(&body)).await
    }

    async fn get_skills(&self) -> Result<Option<SkillsRecord>, StoreError> {
        self.send_json(Method::GET, "/skills/", None).await
    }

    async fn save_skills(&self, record: &SkillsRecord) -> Result<SkillsRecord, StoreError> {
        let body = serde_json::to_value(record)?;
        self.send_json(Method::PUT, "/skills/", Some(&body)).await
    }

    async fn list(&self, section: Section) -> Result<Vec<Value>, StoreError> {
        let path = format!("/{}/", section.endpoint());
        let response: Option<ListResponse<Value>> =
            self.send_json(Method::GET, &path, None).await?;
        Ok(response.map(ListResponse::into_vec).unwrap_or_default())
    }

    async fn create(&self, section: Section, body: Value) -> Result<Value, StoreError> {
        let path = format!("/{}/", section.endpoint());
        self.send_json(Method::POST, &path, Some(&body)).await
    }

    async fn update(&self, section: Section, id: i64, body: Value) -> Result<Value, StoreError> {
        let path = format!("/{}/{}/", section.endpoint(), id);
        self.send_json(Method::PUT, &path, Some(&body)).await
    }

    async fn delete(&self, section: Section, id: i64) -> Result<(), StoreError> {
        let path = format!("/{}/{}/", section.endpoint(), id);
        self.send(Method::DELETE, &path, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_request_decodes_field_errors() {
        let err = error_from_response(
            StatusCode::BAD_REQUEST,
            "/experience/",
            r#"{"title": ["This field may not be blank."], "detail": "Invalid"}"#,
        );
        let fields = err.field_errors().unwrap();
        assert_eq!(fields["title"], vec!["This field may not be blank."]);
        assert_eq!(fields["detail"], vec!["Invalid"]);
    }

    #[test]
    fn test_unauthorized_and_not_found() {
        assert!(matches!(
            error_from_response(StatusCode::UNAUTHORIZED, "/resume/", ""),
            StoreError::Unauthorized
        ));
        assert!(error_from_response(StatusCode::NOT_FOUND, "/skills/", "").is_not_found());
    }

    #[test]
    fn test_server_error_prefers_message_then_detail() {
        match error_from_response(StatusCode::BAD_GATEWAY, "/x/", r#"{"detail":"upstream down"}"#) {
            StoreError::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        match error_from_response(StatusCode::INTERNAL_SERVER_ERROR, "/x/", "<html>") {
            StoreError::Api { message, .. } => assert_eq!(message, "HTTP error! status: 500"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let store = HttpResumeStore::new("http://localhost:8000/api/", None).unwrap();
        assert_eq!(store.url("/resume/"), "http://localhost:8000/api/resume/");
    }
}
