//! Client for the backend's data API (`/rest/v1`).
//!
//! Tables are addressed by name; filters use the data API's query syntax
//! (`column=eq.value`, `order=column.desc`, ...).

use coverdesk_core::AppError;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::BackendConfig;
use crate::http::{error_parts, read_json, send_error};

pub type Params = Vec<(&'static str, String)>;

/// `eq.` filter value.
pub fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

/// Case-insensitive substring match over several columns, as an `or`
/// filter value. Returns `None` for a blank term.
///
/// Characters with meaning in the filter grammar are dropped from the term.
pub fn ilike_any(columns: &[&str], term: &str) -> Option<String> {
    let term: String = term
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '(' | ')' | '*' | '"' | '\\'))
        .collect();
    if term.is_empty() {
        return None;
    }
    let clauses: Vec<String> = columns
        .iter()
        .map(|column| format!("{column}.ilike.*{term}*"))
        .collect();
    Some(format!("({})", clauses.join(",")))
}

#[derive(Clone)]
pub struct PostgrestClient {
    client: Client,
    base_url: String,
    api_key: String,
    timeout_secs: u64,
}

impl PostgrestClient {
    pub fn new(config: &BackendConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.rest_url(),
            api_key: config.data_key().to_string(),
            timeout_secs: config.timeout.as_secs(),
        })
    }

    fn table(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn url(&self, table: &str) -> String {
        format!("{}/{table}", self.base_url)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, AppError> {
        let response = builder
            .send()
            .await
            .map_err(|e| send_error(e, self.timeout_secs))?;

        if !response.status().is_success() {
            let (status_code, message) = error_parts(response).await;
            return Err(AppError::BackendError {
                message,
                status_code,
            });
        }
        Ok(response)
    }

    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &Params,
    ) -> Result<Vec<T>, AppError> {
        let request = self.table(self.client.get(self.url(table))).query(params);
        read_json(self.send(request).await?).await
    }

    /// First row matching `params`, if any.
    pub async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &Params,
    ) -> Result<Option<T>, AppError> {
        let mut params = params.clone();
        params.push(("limit", "1".to_string()));
        Ok(self.select(table, &params).await?.into_iter().next())
    }

    /// Inserts one row and returns it as stored.
    pub async fn insert<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
        params: &Params,
    ) -> Result<T, AppError> {
        let request = self
            .table(self.client.post(self.url(table)))
            .header("Prefer", "return=representation")
            .query(params)
            .json(body);
        let rows: Vec<T> = read_json(self.send(request).await?).await?;
        rows.into_iter().next().ok_or_else(|| AppError::BackendError {
            message: format!("Insert into {table} returned no rows"),
            status_code: 200,
        })
    }

    /// Applies `body` to every row matching `params` and returns the
    /// updated rows.
    pub async fn update<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
        params: &Params,
    ) -> Result<Vec<T>, AppError> {
        let request = self
            .table(self.client.patch(self.url(table)))
            .header("Prefer", "return=representation")
            .query(params)
            .json(body);
        read_json(self.send(request).await?).await
    }

    /// Deletes rows matching `params`; returns how many were removed.
    pub async fn delete(&self, table: &str, params: &Params) -> Result<usize, AppError> {
        let request = self
            .table(self.client.delete(self.url(table)))
            .header("Prefer", "return=representation")
            .query(params);
        let rows: Vec<serde_json::Value> = read_json(self.send(request).await?).await?;
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ilike_any() {
        assert_eq!(
            ilike_any(&["first_name", "email"], " lop ").as_deref(),
            Some("(first_name.ilike.*lop*,email.ilike.*lop*)")
        );
        assert_eq!(
            ilike_any(&["email"], "a,b(c)*").as_deref(),
            Some("(email.ilike.*abc*)")
        );
        assert_eq!(ilike_any(&["email"], " ** "), None);
    }

    #[test]
    fn test_eq() {
        assert_eq!(eq("closed_won"), "eq.closed_won");
        assert_eq!(eq(true), "eq.true");
    }
}
