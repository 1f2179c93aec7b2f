//! Google Sheets table store.
//!
//! # Responsibility
//! - Map the whole-sheet primitives onto Sheets v4 `values` endpoints.
//! - Locate the spreadsheet by ID or by title through the Drive API.
//!
//! # Invariants
//! - One primitive call is exactly one HTTP request (token refreshes aside).
//! - Calls are blocking and never retried.
//! - A missing worksheet surfaces as `StoreError::NotFound`.
//! - Reads are unformatted and writes are `RAW`, so text such as `0100`
//!   survives a read then write unchanged. Formula cells come back as their
//!   computed values.

use super::google_auth::{ServiceAccountKey, TokenProvider};
use super::{CellRef, StoreError, StoreResult, TableStore};
use crate::table::Grid;
use log::{error, info};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Instant;

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";
const MAX_ERROR_BODY_CHARS: usize = 300;

const READ_QUERY: [(&str, &str); 3] = [
    ("majorDimension", "ROWS"),
    ("valueRenderOption", "UNFORMATTED_VALUE"),
    ("dateTimeRenderOption", "FORMATTED_STRING"),
];
const WRITE_QUERY: [(&str, &str); 1] = [("valueInputOption", "RAW")];
const APPEND_QUERY: [(&str, &str); 2] = [
    ("valueInputOption", "RAW"),
    ("insertDataOption", "INSERT_ROWS"),
];

/// How to find the target spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpreadsheetLocator {
    Id(String),
    Title(String),
}

pub struct GoogleSheetsStore {
    http: Client,
    tokens: TokenProvider,
    spreadsheet_id: String,
}

impl GoogleSheetsStore {
    /// Authenticates and resolves the spreadsheet.
    ///
    /// # Errors
    /// - `StoreError::Auth` for unusable credentials.
    /// - `StoreError::NotFound` when no spreadsheet matches a title.
    pub fn connect(key: ServiceAccountKey, locator: SpreadsheetLocator) -> StoreResult<Self> {
        let http = Client::builder()
            .build()
            .map_err(|err| StoreError::Unavailable(format!("http client init failed: {err}")))?;
        let tokens = TokenProvider::new(key, http.clone());
        let spreadsheet_id = match locator {
            SpreadsheetLocator::Id(id) => id,
            SpreadsheetLocator::Title(title) => find_spreadsheet_id(&http, &tokens, &title)?,
        };
        info!("event=store_connect module=store backend=google status=ok spreadsheet_id={spreadsheet_id}");
        Ok(Self {
            http,
            tokens,
            spreadsheet_id,
        })
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    fn spreadsheet_url(&self, suffix: Option<&str>) -> StoreResult<Url> {
        let mut url = parse_url(SHEETS_API_BASE)?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StoreError::InvalidResponse("api base cannot be a base".into()))?;
            match suffix {
                Some(suffix) => segments.push(&format!("{}{suffix}", self.spreadsheet_id)),
                None => segments.push(&self.spreadsheet_id),
            };
        }
        Ok(url)
    }

    fn values_url(&self, range: &str, action: Option<&str>) -> StoreResult<Url> {
        let mut url = self.spreadsheet_url(None)?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StoreError::InvalidResponse("api base cannot be a base".into()))?;
            segments.push("values");
            match action {
                Some(action) => segments.push(&format!("{range}:{action}")),
                None => segments.push(range),
            };
        }
        Ok(url)
    }

    fn send(&self, op: &'static str, sheet: &str, request: RequestBuilder) -> StoreResult<Response> {
        let token = self.tokens.access_token()?;
        execute(op, sheet, request.bearer_auth(token))
    }

    fn sheet_titles(&self) -> StoreResult<Vec<String>> {
        let url = self.spreadsheet_url(None)?;
        let request = self
            .http
            .get(url)
            .query(&[("fields", "sheets.properties.title")]);
        let metadata: SpreadsheetMetadata = parse_json(self.send("sheet_titles", "-", request)?)?;
        Ok(metadata
            .sheets
            .into_iter()
            .map(|sheet| sheet.properties.title)
            .collect())
    }
}

impl TableStore for GoogleSheetsStore {
    fn backend_name(&self) -> &'static str {
        "google"
    }

    fn has_sheet(&self, name: &str) -> StoreResult<bool> {
        Ok(self.sheet_titles()?.iter().any(|title| title == name))
    }

    fn create_sheet(&self, name: &str, header: &[String]) -> StoreResult<()> {
        let url = self.spreadsheet_url(Some(":batchUpdate"))?;
        let body = json!({
            "requests": [{ "addSheet": { "properties": { "title": name } } }]
        });
        match self.send("create_sheet", name, self.http.post(url).json(&body)) {
            Ok(_) => {}
            Err(StoreError::Unavailable(message)) if message.contains("already exists") => {
                return Err(StoreError::AlreadyExists(name.to_string()));
            }
            Err(err) => return Err(err),
        }
        self.write_grid(name, CellRef::ORIGIN, &Grid::with_header(header.to_vec()))
    }

    fn read_grid(&self, name: &str) -> StoreResult<Grid> {
        let url = self.values_url(&sheet_range(name, None), None)?;
        let request = self.http.get(url).query(&READ_QUERY);
        let response = self
            .send("read_grid", name, request)
            .map_err(|err| missing_sheet(err, name))?;
        let range: ValueRange = parse_json(response)?;
        Ok(Grid::new(
            range
                .values
                .into_iter()
                .map(|row| row.iter().map(cell_text).collect())
                .collect(),
        ))
    }

    fn write_grid(&self, name: &str, origin: CellRef, grid: &Grid) -> StoreResult<()> {
        let range = sheet_range(name, Some(origin));
        let url = self.values_url(&range, None)?;
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": grid.rows().iter().map(|row| row_values(row)).collect::<Vec<_>>(),
        });
        let request = self.http.put(url).query(&WRITE_QUERY).json(&body);
        self.send("write_grid", name, request)
            .map(drop)
            .map_err(|err| missing_sheet(err, name))
    }

    fn append_row(&self, name: &str, values: &[String]) -> StoreResult<()> {
        let range = sheet_range(name, Some(CellRef::ORIGIN));
        let url = self.values_url(&range, Some("append"))?;
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": [row_values(values)],
        });
        let request = self.http.post(url).query(&APPEND_QUERY).json(&body);
        self.send("append_row", name, request)
            .map(drop)
            .map_err(|err| missing_sheet(err, name))
    }

    fn clear_sheet(&self, name: &str) -> StoreResult<()> {
        let url = self.values_url(&sheet_range(name, None), Some("clear"))?;
        let request = self.http.post(url).json(&json!({}));
        self.send("clear_sheet", name, request)
            .map(drop)
            .map_err(|err| missing_sheet(err, name))
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMetadata {
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
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

fn find_spreadsheet_id(http: &Client, tokens: &TokenProvider, title: &str) -> StoreResult<String> {
    let query = format!(
        "name = '{}' and mimeType = '{SPREADSHEET_MIME}' and trashed = false",
        title.replace('\\', "\\\\").replace('\'', "\\'")
    );
    let request = http
        .get(DRIVE_FILES_URL)
        .query(&[
            ("q", query.as_str()),
            ("fields", "files(id)"),
            ("supportsAllDrives", "true"),
            ("includeItemsFromAllDrives", "true"),
        ])
        .bearer_auth(tokens.access_token()?);
    let list: DriveFileList = parse_json(execute("find_spreadsheet", title, request)?)?;
    list.files
        .into_iter()
        .next()
        .map(|file| file.id)
        .ok_or_else(|| StoreError::NotFound(format!("spreadsheet titled `{title}`")))
}

fn execute(op: &'static str, sheet: &str, request: RequestBuilder) -> StoreResult<Response> {
    let started_at = Instant::now();
    let response = request.send().map_err(|err| {
        error!(
            "event=store_call module=store backend=google op={op} sheet={sheet} status=error duration_ms={} error={err}",
            started_at.elapsed().as_millis()
        );
        StoreError::Unavailable(format!("{op} request failed: {err}"))
    })?;

    let status = response.status();
    if status.is_success() {
        info!(
            "event=store_call module=store backend=google op={op} sheet={sheet} status=ok duration_ms={}",
            started_at.elapsed().as_millis()
        );
        return Ok(response);
    }

    let body = response.text().unwrap_or_default();
    error!(
        "event=store_call module=store backend=google op={op} sheet={sheet} status=error duration_ms={} http_status={}",
        started_at.elapsed().as_millis(),
        status.as_u16()
    );
    Err(status_error(status, sheet, &body))
}

fn status_error(status: StatusCode, sheet: &str, body: &str) -> StoreError {
    let detail = format!("{status}: {}", truncate_body(body));
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Auth(detail),
        StatusCode::NOT_FOUND => StoreError::NotFound(sheet.to_string()),
        _ => StoreError::Unavailable(detail),
    }
}

/// Sheets answers `400 Unable to parse range` for an unknown worksheet title.
fn missing_sheet(err: StoreError, sheet: &str) -> StoreError {
    match err {
        StoreError::Unavailable(message) if message.contains("Unable to parse range") => {
            StoreError::NotFound(sheet.to_string())
        }
        other => other,
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(response: Response) -> StoreResult<T> {
    response
        .json()
        .map_err(|err| StoreError::InvalidResponse(err.to_string()))
}

fn parse_url(raw: &str) -> StoreResult<Url> {
    Url::parse(raw).map_err(|err| StoreError::InvalidResponse(format!("bad url `{raw}`: {err}")))
}

/// A1 range covering a whole sheet, or starting at `origin`.
///
/// Sheet titles are always quoted so spaces and digits are safe.
fn sheet_range(sheet: &str, origin: Option<CellRef>) -> String {
    let quoted = format!("'{}'", sheet.replace('\'', "''"));
    match origin {
        Some(cell) => format!("{quoted}!{}", cell.to_a1()),
        None => quoted,
    }
}

/// Renders one API cell as sheet text; booleans use the sheet spelling.
fn cell_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Inverse of `cell_text`: canonical numbers and booleans keep their type,
/// everything else is sent as a string.
fn cell_value(text: &str) -> Value {
    match text {
        "TRUE" => return Value::Bool(true),
        "FALSE" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(int) = text.parse::<i64>() {
        if int.to_string() == text {
            return json!(int);
        }
    }
    if let Ok(float) = text.parse::<f64>() {
        if float.is_finite() && json!(float).to_string() == text {
            return json!(float);
        }
    }
    Value::String(text.to_string())
}

fn row_values(row: &[String]) -> Vec<Value> {
    row.iter().map(|text| cell_value(text)).collect()
}

/// Caps error bodies before they reach logs or callers.
pub(crate) fn truncate_body(body: &str) -> String {
    let flattened = body.replace(['\n', '\r'], " ");
    let mut truncated: String = flattened.chars().take(MAX_ERROR_BODY_CHARS).collect();
    if flattened.chars().count() > MAX_ERROR_BODY_CHARS {
        truncated.push_str("...");
    }
    truncated
}

#[cfg(test)]
mod tests {
    use super::{
        cell_text, cell_value, missing_sheet, sheet_range, status_error, truncate_body,
        APPEND_QUERY, READ_QUERY, WRITE_QUERY,
    };
    use crate::store::{CellRef, StoreError};
    use reqwest::StatusCode;
    use serde_json::json;

    #[test]
    fn sheet_range_quotes_titles() {
        assert_eq!(sheet_range("Sheet1", None), "'Sheet1'");
        assert_eq!(
            sheet_range("Client's List", Some(CellRef::new(1, 0))),
            "'Client''s List'!A2"
        );
    }

    #[test]
    fn cell_text_maps_json_scalars() {
        assert_eq!(cell_text(&json!("x")), "x");
        assert_eq!(cell_text(&json!(true)), "TRUE");
        assert_eq!(cell_text(&json!(26000)), "26000");
        assert_eq!(cell_text(&json!(null)), "");
    }

    #[test]
    fn requests_avoid_reparsing_cells() {
        assert!(READ_QUERY.contains(&("valueRenderOption", "UNFORMATTED_VALUE")));
        assert!(READ_QUERY.contains(&("dateTimeRenderOption", "FORMATTED_STRING")));
        assert_eq!(WRITE_QUERY, [("valueInputOption", "RAW")]);
        assert!(APPEND_QUERY.contains(&("valueInputOption", "RAW")));
        assert!(!APPEND_QUERY.iter().any(|(_, v)| *v == "USER_ENTERED"));
    }

    #[test]
    fn cell_values_keep_text_exact() {
        assert_eq!(cell_value("0100"), json!("0100"));
        assert_eq!(cell_value("01012345678"), json!("01012345678"));
        assert_eq!(cell_value("10,000"), json!("10,000"));
        assert_eq!(cell_value("=SUM(A1)"), json!("=SUM(A1)"));
        assert_eq!(cell_value(""), json!(""));
        assert_eq!(cell_value("PAID"), json!("PAID"));
        assert_eq!(cell_value("26000"), json!(26000));
        assert_eq!(cell_value("1.5"), json!(1.5));
        assert_eq!(cell_value("TRUE"), json!(true));
        for text in ["0100", "26000", "1.5", "FALSE", "", "2024-01-02"] {
            assert_eq!(cell_text(&cell_value(text)), text);
        }
    }

    #[test]
    fn status_errors_map_to_taxonomy() {
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, "S", "denied"),
            StoreError::Auth(_)
        ));
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, "S", ""),
            StoreError::NotFound(name) if name == "S"
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, "S", "quota"),
            StoreError::Unavailable(message) if message.contains("quota")
        ));
    }

    #[test]
    fn unparsable_range_means_missing_sheet() {
        let err = status_error(
            StatusCode::BAD_REQUEST,
            "Settings",
            "Unable to parse range: 'Settings'",
        );
        assert!(matches!(
            missing_sheet(err, "Settings"),
            StoreError::NotFound(name) if name == "Settings"
        ));
        assert!(matches!(
            missing_sheet(StoreError::Unavailable("quota".to_string()), "S"),
            StoreError::Unavailable(_)
        ));
    }

    #[test]
    fn truncate_body_flattens_and_caps() {
        let long = "x\n".repeat(400);
        let capped = truncate_body(&long);
        assert!(!capped.contains('\n'));
        assert!(capped.ends_with("..."));
    }
}
