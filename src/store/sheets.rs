//! Google Sheets v4 values API adapter

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{A1Range, Row, SheetStore, StoreError};

pub const DEFAULT_API_URL: &str = "https://sheets.googleapis.com/v4";

/// Unconnected client. [`SheetsClient::connect`] checks that the spreadsheet
/// is reachable with the given token before handing out a store.
#[derive(Clone, Debug)]
pub struct SheetsClient {
    http: Client,
    api_url: String,
    spreadsheet_id: String,
    access_token: String,
}

/// A store bound to one spreadsheet that answered a readiness check.
#[derive(Clone, Debug)]
pub struct SheetsStore { client: SheetsClient }

#[derive(Debug, Default, Deserialize)]
struct ValueRange { #[serde(default)] values: Vec<Vec<Value>> }

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRangeBody<'a> { range: &'a str, major_dimension: &'static str, values: &'a [Row] }

impl SheetsClient {
    pub fn new(api_url: impl Into<String>, spreadsheet_id: impl Into<String>, access_token: impl Into<String>, timeout: Duration) -> Result<Self, StoreError> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self { http, api_url: api_url.into(), spreadsheet_id: spreadsheet_id.into(), access_token: access_token.into() })
    }

    pub async fn connect(self) -> Result<SheetsStore, StoreError> {
        let mut url = self.spreadsheet_url()?;
        url.query_pairs_mut().append_pair("fields", "spreadsheetId");
        let response = self.http.get(url).bearer_auth(&self.access_token).send().await.map_err(unavailable)?;
        check(response).await?;
        tracing::info!(spreadsheet_id = %self.spreadsheet_id, "connected to spreadsheet");
        Ok(SheetsStore { client: self })
    }

    fn spreadsheet_url(&self) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.api_url).map_err(|e| StoreError::Unavailable(format!("bad api url: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| StoreError::Unavailable("api url cannot be a base".into()))?
            .pop_if_empty()
            .extend(["spreadsheets", self.spreadsheet_id.as_str()]);
        Ok(url)
    }

    fn values_url(&self, segment: &str) -> Result<Url, StoreError> {
        let mut url = self.spreadsheet_url()?;
        url.path_segments_mut()
            .map_err(|()| StoreError::Unavailable("api url cannot be a base".into()))?
            .extend(["values", segment]);
        Ok(url)
    }
}

/// `'Ventas'!A:R`; quoting keeps sheet names with spaces valid.
fn qualified(sheet: &str, range: &str) -> String { format!("'{}'!{}", sheet.replace('\'', "''"), range) }

fn unavailable(err: reqwest::Error) -> StoreError {
    if err.is_timeout() { StoreError::Unavailable(format!("request timed out: {err}")) } else { StoreError::Unavailable(err.to_string()) }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() { return Ok(response); }
    let body = response.text().await.unwrap_or_default();
    let reason = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => "not authorized",
        StatusCode::NOT_FOUND => "spreadsheet or sheet not found",
        _ => "request failed",
    };
    Err(StoreError::Unavailable(format!("{reason} ({status}): {body}")))
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl SheetStore for SheetsStore {
    async fn read_range(&self, sheet: &str, range: A1Range) -> Result<Vec<Row>, StoreError> {
        let c = &self.client;
        let url = c.values_url(&qualified(sheet, &range.to_string()))?;
        let response = c.http.get(url).bearer_auth(&c.access_token).send().await.map_err(unavailable)?;
        let body: ValueRange = check(response).await?.json().await.map_err(unavailable)?;
        Ok(body.values.into_iter().map(|row| row.into_iter().map(cell_text).collect()).collect())
    }

    async fn write_range(&self, sheet: &str, range: A1Range, rows: Vec<Row>) -> Result<(), StoreError> {
        let c = &self.client;
        let target = qualified(sheet, &range.to_string());
        let mut url = c.values_url(&target)?;
        url.query_pairs_mut().append_pair("valueInputOption", "USER_ENTERED");
        let body = ValueRangeBody { range: &target, major_dimension: "ROWS", values: &rows };
        let response = c.http.put(url).bearer_auth(&c.access_token).json(&body).send().await.map_err(unavailable)?;
        check(response).await?;
        tracing::debug!(sheet, range = %range, rows = rows.len(), "range written");
        Ok(())
    }

    async fn append_rows(&self, sheet: &str, rows: Vec<Row>) -> Result<(), StoreError> {
        let c = &self.client;
        let target = qualified(sheet, "A:A");
        let mut url = c.values_url(&format!("{target}:append"))?;
        url.query_pairs_mut().append_pair("valueInputOption", "USER_ENTERED").append_pair("insertDataOption", "INSERT_ROWS");
        let body = ValueRangeBody { range: &target, major_dimension: "ROWS", values: &rows };
        let response = c.http.post(url).bearer_auth(&c.access_token).json(&body).send().await.map_err(unavailable)?;
        check(response).await?;
        tracing::debug!(sheet, rows = rows.len(), "rows appended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SheetsClient {
        SheetsClient::new(DEFAULT_API_URL, "abc123", "token", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_values_url_encodes_range() {
        let url = client().values_url(&qualified("Ventas Lima", "A:R")).unwrap();
        assert_eq!(url.as_str(), "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/'Ventas%20Lima'!A:R");
    }

    #[test]
    fn test_qualified_escapes_quotes() {
        assert_eq!(qualified("Amora's", "A1:B1"), "'Amora''s'!A1:B1");
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(Value::from("38")), "38");
        assert_eq!(cell_text(Value::from(4)), "4");
        assert_eq!(cell_text(Value::Null), "");
    }
}
