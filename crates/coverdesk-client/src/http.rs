use coverdesk_core::AppError;
use reqwest::Response;
use serde::Deserialize;

/// Maps a transport-level reqwest failure.
pub(crate) fn send_error(e: reqwest::Error, timeout_secs: u64) -> AppError {
    if e.is_timeout() {
        AppError::Timeout(timeout_secs)
    } else if e.is_connect() {
        AppError::NetworkError(format!("Connection failed: {e}"))
    } else {
        AppError::HttpError(e.to_string())
    }
}

/// Error bodies differ between the backend's services; take the first
/// message-like field present.
#[derive(Deserialize)]
struct ErrorBody {
    msg: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
    error: Option<serde_json::Value>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.msg
            .or(self.error_description)
            .or(self.message)
            .or_else(|| match self.error {
                Some(serde_json::Value::String(s)) => Some(s),
                Some(serde_json::Value::Object(map)) => map
                    .get("message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string),
                _ => None,
            })
    }
}

/// Consumes a non-success response into its status code and message.
pub(crate) async fn error_parts(response: Response) -> (u16, String) {
    let status_code = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or_else(|| format!("HTTP {status_code}: {body}"));
    (status_code, message)
}

pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    response: Response,
) -> Result<T, AppError> {
    let body = response
        .text()
        .await
        .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))?;
    Ok(serde_json::from_str(&body)?)
}
