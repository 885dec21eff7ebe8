use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::client::{RangeRows, RateLimitConfig, Rows, SheetMetadata, TabularClient};
use super::error::SheetsError;
use super::rate_limiter::RateLimiter;

const BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Google Sheets v4 REST implementation of the tabular collaborator.
/// Authenticates with an OAuth bearer token.
pub struct GoogleSheetsClient {
    access_token: String,
    http_client: reqwest::Client,
    rate_limiter: RateLimiter,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetResponse {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Serialize)]
struct UpdateBody {
    values: Rows,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateBody {
    value_input_option: &'static str,
    data: Vec<BatchEntry>,
}

#[derive(Debug, Serialize)]
struct BatchEntry {
    range: String,
    values: Rows,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

impl GoogleSheetsClient {
    pub fn new(access_token: String) -> Self {
        // The per-user Sheets quota is 60 requests a minute; stay under it.
        let rate_limiter = RateLimiter::new(RateLimitConfig {
            requests_per_second: 1,
            burst_size: 5,
        });

        Self {
            access_token,
            http_client: reqwest::Client::new(),
            rate_limiter,
        }
    }

    fn build_headers(&self) -> Result<HeaderMap, SheetsError> {
        let mut headers = HeaderMap::new();
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.access_token))
                .map_err(|e| SheetsError::Auth(format!("invalid access token: {}", e)))?,
        );
        Ok(headers)
    }

    /// Map a non-success response into the typed error taxonomy, reading
    /// Google's error envelope when one is present.
    async fn check(
        response: reqwest::Response,
        spreadsheet_id: &str,
    ) -> Result<reqwest::Response, SheetsError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.json::<ApiErrorBody>().await {
            Ok(body) => body.error.message,
            Err(_) => status.to_string(),
        };
        Err(map_error_status(status, spreadsheet_id, message))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
        spreadsheet_id: &str,
    ) -> Result<T, SheetsError> {
        self.rate_limiter.acquire().await;
        let response = self
            .http_client
            .get(url)
            .headers(self.build_headers()?)
            .send()
            .await?;
        let response = Self::check(response, spreadsheet_id).await?;
        Ok(response.json::<T>().await?)
    }

    async fn post_json<B: Serialize>(
        &self,
        url: String,
        body: &B,
        spreadsheet_id: &str,
    ) -> Result<(), SheetsError> {
        self.rate_limiter.acquire().await;
        let response = self
            .http_client
            .post(url)
            .headers(self.build_headers()?)
            .json(body)
            .send()
            .await?;
        Self::check(response, spreadsheet_id).await?;
        Ok(())
    }
}

fn map_error_status(status: StatusCode, spreadsheet_id: &str, message: String) -> SheetsError {
    match status {
        StatusCode::NOT_FOUND => SheetsError::SpreadsheetNotFound(spreadsheet_id.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SheetsError::Auth(message),
        StatusCode::TOO_MANY_REQUESTS => SheetsError::RateLimit(message),
        _ => SheetsError::Api {
            code: status.as_u16(),
            message,
        },
    }
}

fn cell_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl TabularClient for GoogleSheetsClient {
    async fn get_sheet_metadata(&self, spreadsheet_id: &str) -> Result<SheetMetadata, SheetsError> {
        let url = format!("{}/{}?fields=sheets.properties.title", BASE_URL, spreadsheet_id);
        let response: SpreadsheetResponse = self.get_json(url, spreadsheet_id).await?;
        Ok(SheetMetadata {
            tabs: response.sheets.into_iter().map(|s| s.properties.title).collect(),
        })
    }

    async fn create_tab(&self, spreadsheet_id: &str, name: &str) -> Result<(), SheetsError> {
        let url = format!("{}/{}:batchUpdate", BASE_URL, spreadsheet_id);
        let body = serde_json::json!({
            "requests": [{ "addSheet": { "properties": { "title": name } } }]
        });
        self.post_json(url, &body, spreadsheet_id).await
    }

    async fn get_values(&self, spreadsheet_id: &str, range: &str) -> Result<Rows, SheetsError> {
        let url = format!("{}/{}/values/{}", BASE_URL, spreadsheet_id, range);
        let response: ValueRange = self.get_json(url, spreadsheet_id).await?;
        Ok(response
            .values
            .iter()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect())
    }

    async fn clear_values(&self, spreadsheet_id: &str, range: &str) -> Result<(), SheetsError> {
        let url = format!("{}/{}/values/{}:clear", BASE_URL, spreadsheet_id, range);
        self.post_json(url, &serde_json::json!({}), spreadsheet_id).await
    }

    async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: Rows,
    ) -> Result<(), SheetsError> {
        let url = format!(
            "{}/{}/values/{}?valueInputOption=RAW",
            BASE_URL, spreadsheet_id, range
        );
        self.rate_limiter.acquire().await;
        let response = self
            .http_client
            .put(url)
            .headers(self.build_headers()?)
            .json(&UpdateBody { values: rows })
            .send()
            .await?;
        Self::check(response, spreadsheet_id).await?;
        Ok(())
    }

    async fn batch_update_values(
        &self,
        spreadsheet_id: &str,
        data: Vec<RangeRows>,
    ) -> Result<(), SheetsError> {
        let url = format!("{}/{}/values:batchUpdate", BASE_URL, spreadsheet_id);
        let body = BatchUpdateBody {
            value_input_option: "RAW",
            data: data
                .into_iter()
                .map(|(range, values)| BatchEntry { range, values })
                .collect(),
        };
        self.post_json(url, &body, spreadsheet_id).await
    }

    async fn append_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: Rows,
    ) -> Result<(), SheetsError> {
        let url = format!(
            "{}/{}/values/{}:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
            BASE_URL, spreadsheet_id, range
        );
        self.post_json(url, &UpdateBody { values: rows }, spreadsheet_id).await
    }
}
