// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! `ItemStore` over a hosted PostgREST endpoint (`/rest/v1/items`).

use anyhow::{Context, Result, anyhow, bail};
use europharm_app::{Item, ItemId, ItemPage, ItemPatch, ItemQuery, ItemStore, NewItem};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use reqwest::header::{AUTHORIZATION, CONTENT_RANGE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info};
use url::Url;

const ITEMS_PATH: &str = "rest/v1/items";

#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    api_key: String,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            bail!("remote.base_url must not be empty");
        }
        let base_url = Url::parse(&format!("{trimmed}/"))
            .with_context(|| format!("remote.base_url {trimmed:?} is not a valid URL"))?;
        if api_key.trim().is_empty() {
            bail!("remote.api_key must not be empty -- set it in the config file and retry");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            api_key: api_key.trim().to_owned(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Cheap reachability check: asks for zero rows.
    pub fn ping(&self) -> Result<()> {
        let mut url = self.items_url()?;
        url.query_pairs_mut()
            .append_pair("select", "id")
            .append_pair("limit", "0");
        let response = self
            .authorized(self.http.get(url))
            .send()
            .map_err(|error| connection_error(self.base_url(), error))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        Ok(())
    }

    fn items_url(&self) -> Result<Url> {
        self.base_url
            .join(ITEMS_PATH)
            .with_context(|| format!("build items URL from {}", self.base_url()))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
    }
}

impl ItemStore for Client {
    fn query_items(&self, query: &ItemQuery) -> Result<ItemPage> {
        let mut url = self.items_url()?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", "*");
            if !query.search.is_empty() {
                pairs.append_pair("or", &search_filter(&query.search));
            }
            pairs
                .append_pair(
                    "order",
                    &format!(
                        "{}.{}",
                        query.order.key.column(),
                        query.order.direction.as_sql().to_ascii_lowercase()
                    ),
                )
                .append_pair("offset", &query.offset.to_string())
                .append_pair("limit", &query.limit.to_string());
        }

        let response = self
            .authorized(self.http.get(url))
            .header("Prefer", "count=exact")
            .send()
            .map_err(|error| connection_error(self.base_url(), error))?;
        let status = response.status();
        let range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        // An offset past the end is 416 with `Content-Range: */N`; report it
        // as an empty page so the caller can clamp to the real total.
        if status == StatusCode::RANGE_NOT_SATISFIABLE
            && let Some(range) = range.as_deref()
            && let Ok(total) = parse_content_range_total(range)
        {
            debug!(search = %query.search, offset = query.offset, total, "remote page out of range");
            return Ok(ItemPage { rows: Vec::new(), total });
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let rows: Vec<ItemRow> = response.json().context("decode items page")?;
        let rows = rows
            .into_iter()
            .map(ItemRow::into_item)
            .collect::<Result<Vec<_>>>()?;
        let total = match range.as_deref() {
            Some(range) => parse_content_range_total(range)?,
            None => bail!("server did not report a row count -- check that the endpoint is PostgREST"),
        };

        debug!(search = %query.search, offset = query.offset, rows = rows.len(), total, "queried remote items");
        Ok(ItemPage { rows, total })
    }

    fn insert_item(&self, item: &NewItem) -> Result<ItemId> {
        let response = self
            .authorized(self.http.post(self.items_url()?))
            .header("Prefer", "return=representation")
            .json(&InsertBody {
                code: &item.code,
                name: &item.name,
                is_active: item.is_active,
            })
            .send()
            .map_err(|error| connection_error(self.base_url(), error))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            // The create form shows constraint messages as the server wrote them.
            if status.is_client_error()
                && status != StatusCode::UNAUTHORIZED
                && let Some(message) = postgrest_message(&body)
            {
                return Err(anyhow!(message));
            }
            return Err(clean_error_response(status, &body));
        }

        let rows: Vec<ItemRow> = response.json().context("decode inserted item")?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("server accepted the insert but returned no row"))?;
        let id = row.id.into_item_id();
        info!(id = %id, code = %item.code, "created remote item");
        Ok(id)
    }

    fn update_item(&self, id: &ItemId, patch: ItemPatch) -> Result<()> {
        let mut url = self.items_url()?;
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{id}"));
        let body = match patch {
            ItemPatch::IsActive(value) => serde_json::json!({ "is_active": value }),
        };

        let response = self
            .authorized(self.http.patch(url))
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .map_err(|error| connection_error(self.base_url(), error))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let rows: Vec<serde_json::Value> = response.json().context("decode updated item")?;
        if rows.is_empty() {
            bail!("item {id} not found or not writable -- refresh the list and retry");
        }
        info!(id = %id, column = patch.column(), "updated remote item");
        Ok(())
    }
}

/// PostgREST `or=(...)` filter matching `term` literally in code or name.
/// `ilike` turns every `*` into `%`, so terms containing `*` switch to a
/// case-insensitive regex instead.
fn search_filter(term: &str) -> String {
    let (operator, value) = if term.contains('*') {
        ("imatch", escape_with(term, |ch| "\\.^$*+?()[]{}|".contains(ch)))
    } else {
        let escaped = escape_with(term, |ch| matches!(ch, '%' | '_' | '\\'));
        ("ilike", format!("*{escaped}*"))
    };
    let quoted = quote_value(&value);
    format!("(code.{operator}.{quoted},name.{operator}.{quoted})")
}

fn escape_with(term: &str, needs_escape: impl Fn(char) -> bool) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    for ch in term.chars() {
        if needs_escape(ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Double-quoted PostgREST value; commas and parentheses stay literal.
fn quote_value(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        if matches!(ch, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

/// Total from `Content-Range: 0-9/23` (or `*/0` for an empty page).
fn parse_content_range_total(range: &str) -> Result<usize> {
    let (_, total) = range
        .rsplit_once('/')
        .ok_or_else(|| anyhow!("malformed Content-Range header {range:?}"))?;
    total
        .trim()
        .parse::<usize>()
        .with_context(|| format!("Content-Range {range:?} carries no exact count"))
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    if error.is_timeout() {
        return anyhow!("request to {base_url} timed out -- check your connection and retry");
    }
    anyhow!(
        "cannot reach {} -- check remote.base_url and your network, then retry ({})",
        base_url,
        error
    )
}

fn postgrest_message(body: &str) -> Option<String> {
    serde_json::from_str::<PostgrestError>(body)
        .ok()
        .and_then(|parsed| parsed.message)
        .filter(|message| !message.is_empty())
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<PostgrestError>(body)
        && let Some(message) = parsed.message
        && !message.is_empty()
    {
        return match parsed.hint.filter(|hint| !hint.is_empty()) {
            Some(hint) => anyhow!("server error ({}): {message} ({hint})", status.as_u16()),
            None => anyhow!("server error ({}): {message}", status.as_u16()),
        };
    }

    if body.len() < 100 && !body.contains('{') && !body.trim().is_empty() {
        return anyhow!("server error ({}): {}", status.as_u16(), body.trim());
    }

    if status == StatusCode::UNAUTHORIZED {
        return anyhow!("server rejected the API key (401) -- check remote.api_key and retry");
    }

    anyhow!("server returned {}", status.as_u16())
}

#[derive(Debug, Serialize)]
struct InsertBody<'a> {
    code: &'a str,
    name: &'a str,
    is_active: bool,
}

#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: Option<String>,
    hint: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Number(i64),
}

impl WireId {
    fn into_item_id(self) -> ItemId {
        match self {
            Self::Text(value) => ItemId::new(value),
            Self::Number(value) => ItemId::new(value.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ItemRow {
    id: WireId,
    code: String,
    name: String,
    #[serde(default)]
    alt_name: Option<String>,
    is_active: bool,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

impl ItemRow {
    fn into_item(self) -> Result<Item> {
        let created_at = parse_timestamp(self.created_at.as_deref())?;
        let updated_at = match self.updated_at.as_deref() {
            Some(raw) => parse_timestamp(Some(raw))?,
            None => created_at,
        };
        Ok(Item {
            id: self.id.into_item_id(),
            code: self.code,
            name: self.name,
            alt_name: self.alt_name,
            is_active: self.is_active,
            created_at,
            updated_at,
        })
    }
}

fn parse_timestamp(raw: Option<&str>) -> Result<OffsetDateTime> {
    match raw {
        None => Ok(OffsetDateTime::UNIX_EPOCH),
        Some(raw) => OffsetDateTime::parse(raw, &Rfc3339)
            .with_context(|| format!("unsupported timestamp {raw:?} from server")),
    }
}

#[cfg(test)]
mod tests {
    use super::{clean_error_response, parse_content_range_total, search_filter};
    use reqwest::StatusCode;

    #[test]
    fn search_filter_quotes_reserved_characters() {
        assert_eq!(
            search_filter("amox"),
            "(code.ilike.\"*amox*\",name.ilike.\"*amox*\")"
        );
        assert_eq!(
            search_filter("a,\"b\""),
            "(code.ilike.\"*a,\\\"b\\\"*\",name.ilike.\"*a,\\\"b\\\"*\")"
        );
    }

    #[test]
    fn search_filter_escapes_like_wildcards() {
        assert_eq!(
            search_filter("10_%"),
            "(code.ilike.\"*10\\\\_\\\\%*\",name.ilike.\"*10\\\\_\\\\%*\")"
        );
        assert_eq!(
            search_filter("2*3"),
            "(code.imatch.\"2\\\\*3\",name.imatch.\"2\\\\*3\")"
        );
    }

    #[test]
    fn content_range_total() {
        assert_eq!(parse_content_range_total("0-9/23").ok(), Some(23));
        assert_eq!(parse_content_range_total("*/0").ok(), Some(0));
        assert!(parse_content_range_total("0-9/*").is_err());
        assert!(parse_content_range_total("garbage").is_err());
    }

    #[test]
    fn postgrest_errors_keep_message_and_hint() {
        let error = clean_error_response(
            StatusCode::CONFLICT,
            r#"{"code":"23505","message":"duplicate key value violates unique constraint","hint":null}"#,
        );
        assert_eq!(
            error.to_string(),
            "server error (409): duplicate key value violates unique constraint"
        );

        let error = clean_error_response(StatusCode::UNAUTHORIZED, "");
        assert!(error.to_string().contains("remote.api_key"));

        let error = clean_error_response(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(error.to_string(), "server error (502): upstream down");
    }
}
