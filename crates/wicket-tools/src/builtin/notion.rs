//! Notion tool — optional knowledge-base integration.
//!
//! Registered only when an API key is configured. Responses are summarized
//! down to the fields the model actually needs; full Notion objects are far
//! too large to feed back through the tool-result channel.

use crate::error::ToolError;
use crate::traits::{Tool, ToolContext};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;

const API_BASE: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";
const MAX_PAGE_SIZE: u32 = 20;
const DEFAULT_PAGE_SIZE: u32 = 10;

/// Credentials and defaults for the Notion integration.
#[derive(Debug, Clone, Default)]
pub struct NotionConfig {
    pub api_key: String,
    pub database_id: Option<String>,
    pub default_parent_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct NotionInput {
    action: Option<String>,
    query: Option<String>,
    page_id: Option<String>,
    block_id: Option<String>,
    database_id: Option<String>,
    parent_id: Option<String>,
    title: Option<String>,
    properties: Option<Value>,
    children: Option<Value>,
    filter: Option<Value>,
    sorts: Option<Value>,
    page_size: Option<u32>,
}

pub struct NotionTool {
    config: NotionConfig,
    client: Client,
}

impl NotionTool {
    /// Create the tool; fails when no API key is configured.
    pub fn new(config: NotionConfig) -> Result<Self, ToolError> {
        if config.api_key.is_empty() {
            return Err(ToolError::InvalidInput(
                "NOTION_API_KEY is required".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ToolError::Execution(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    async fn call(&self, method: reqwest::Method, path: &str, body: Option<Value>) -> Result<Value, ToolError> {
        let mut request = self
            .client
            .request(method, format!("{API_BASE}{path}"))
            .bearer_auth(&self.config.api_key)
            .header("Notion-Version", NOTION_VERSION);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ToolError::Execution(format!("Notion API error: {e}")))?;
        let status = response.status();
        let value: Value = response
            .json()
            .await
            .map_err(|e| ToolError::Execution(format!("Notion API error: {e}")))?;

        if !status.is_success() {
            let message = value["message"].as_str().unwrap_or("unknown error");
            return Err(ToolError::Execution(format!(
                "Notion API error ({status}): {message}"
            )));
        }
        Ok(value)
    }

    async fn search(&self, input: &NotionInput) -> Result<Value, ToolError> {
        let body = json!({
            "query": input.query.clone().unwrap_or_default(),
            "page_size": normalize_page_size(input.page_size),
        });
        let response = self.call(reqwest::Method::POST, "/search", Some(body)).await?;
        Ok(summarize_list(&response))
    }

    async fn get_page(&self, input: &NotionInput) -> Result<Value, ToolError> {
        let page_id = require_field(&input.page_id, "pageId")?;
        let response = self
            .call(reqwest::Method::GET, &format!("/pages/{page_id}"), None)
            .await?;
        Ok(summarize_object(&response, true))
    }

    async fn create_page(&self, input: &NotionInput) -> Result<Value, ToolError> {
        let title = require_field(&input.title, "title")?;
        let parent = self.build_parent(input).ok_or_else(|| {
            ToolError::InvalidInput("Missing parent for createPage".to_string())
        })?;

        let mut properties = match &input.properties {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };
        if !properties.contains_key("title") {
            properties.insert(
                "title".to_string(),
                json!({"title": [{"text": {"content": title}}]}),
            );
        }

        let mut body = json!({"parent": parent, "properties": properties});
        if let Some(children) = &input.children {
            body["children"] = children.clone();
        }
        let response = self.call(reqwest::Method::POST, "/pages", Some(body)).await?;
        Ok(summarize_object(&response, true))
    }

    async fn append_block(&self, input: &NotionInput) -> Result<Value, ToolError> {
        let block_id = input
            .block_id
            .clone()
            .or_else(|| input.page_id.clone())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ToolError::InvalidInput("Missing blockId".to_string()))?;
        let children = input.children.clone().unwrap_or_else(|| json!([]));
        let response = self
            .call(
                reqwest::Method::PATCH,
                &format!("/blocks/{block_id}/children"),
                Some(json!({"children": children})),
            )
            .await?;
        Ok(summarize_list(&response))
    }

    async fn update_page(&self, input: &NotionInput) -> Result<Value, ToolError> {
        let page_id = require_field(&input.page_id, "pageId")?;
        let properties = input
            .properties
            .clone()
            .ok_or_else(|| ToolError::InvalidInput("Missing properties".to_string()))?;
        let response = self
            .call(
                reqwest::Method::PATCH,
                &format!("/pages/{page_id}"),
                Some(json!({"properties": properties})),
            )
            .await?;
        Ok(summarize_object(&response, true))
    }

    async fn query_database(&self, input: &NotionInput) -> Result<Value, ToolError> {
        let database_id = require_field(&input.database_id, "databaseId")?;
        let mut body = json!({"page_size": normalize_page_size(input.page_size)});
        if let Some(filter) = &input.filter {
            body["filter"] = filter.clone();
        }
        if let Some(sorts) = &input.sorts {
            body["sorts"] = sorts.clone();
        }
        let response = self
            .call(
                reqwest::Method::POST,
                &format!("/databases/{database_id}/query"),
                Some(body),
            )
            .await?;
        Ok(summarize_list(&response))
    }

    fn build_parent(&self, input: &NotionInput) -> Option<Value> {
        if let Some(id) = input.database_id.clone().or_else(|| self.config.database_id.clone()) {
            return Some(json!({"database_id": id}));
        }
        if let Some(id) = input.parent_id.clone().or_else(|| self.config.default_parent_id.clone()) {
            return Some(json!({"page_id": id}));
        }
        None
    }
}

#[async_trait]
impl Tool for NotionTool {
    fn name(&self) -> &str {
        "notion"
    }
    fn description(&self) -> &str {
        "Search and edit pages in the configured Notion workspace"
    }
    fn usage(&self) -> Option<&str> {
        Some(r#"input is JSON with {"action":"search|getPage|createPage|appendBlock|updatePage|queryDatabase",...}."#)
    }

    async fn run(&self, input: &str, _ctx: &ToolContext) -> Result<String, ToolError> {
        let payload: NotionInput = serde_json::from_str(input)
            .map_err(|_| ToolError::InvalidInput("Invalid JSON for notion tool".to_string()))?;

        let action = payload
            .action
            .as_deref()
            .filter(|a| !a.is_empty())
            .ok_or_else(|| ToolError::InvalidInput("Missing action for notion tool".to_string()))?;

        let result = match action {
            "search" => self.search(&payload).await?,
            "getPage" => self.get_page(&payload).await?,
            "createPage" => self.create_page(&payload).await?,
            "appendBlock" => self.append_block(&payload).await?,
            "updatePage" => self.update_page(&payload).await?,
            "queryDatabase" => self.query_database(&payload).await?,
            other => {
                return Err(ToolError::InvalidInput(format!(
                    "Unknown notion action: {other}"
                )))
            }
        };

        serde_json::to_string(&result)
            .map_err(|e| ToolError::Execution(format!("Notion API error: {e}")))
    }
}

fn require_field<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, ToolError> {
    value
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolError::InvalidInput(format!("Missing {name}")))
}

fn normalize_page_size(value: Option<u32>) -> u32 {
    match value {
        None | Some(0) => DEFAULT_PAGE_SIZE,
        Some(v) => v.min(MAX_PAGE_SIZE),
    }
}

/// Compact a list response: object/results/cursor fields only.
fn summarize_list(response: &Value) -> Value {
    let results: Vec<Value> = response["results"]
        .as_array()
        .map(|items| items.iter().map(|o| summarize_object(o, false)).collect())
        .unwrap_or_default();
    json!({
        "object": response["object"],
        "results": results,
        "next_cursor": response["next_cursor"],
        "has_more": response["has_more"],
    })
}

fn summarize_object(obj: &Value, include_properties: bool) -> Value {
    let mut summary = json!({
        "object": obj["object"],
        "id": obj["id"],
        "url": obj["url"],
        "title": extract_title(obj),
        "last_edited_time": obj["last_edited_time"],
        "parent": obj["parent"],
    });
    if include_properties {
        if let Some(props) = obj["properties"].as_object() {
            summary["properties"] = simplify_properties(props);
        }
    }
    summary
}

fn extract_title(obj: &Value) -> Value {
    let Some(properties) = obj["properties"].as_object() else {
        return Value::Null;
    };
    for prop in properties.values() {
        if prop["type"] == "title" {
            let text: String = prop["title"]
                .as_array()
                .map(|parts| {
                    parts
                        .iter()
                        .filter_map(|t| t["plain_text"].as_str())
                        .collect()
                })
                .unwrap_or_default();
            return Value::String(text);
        }
    }
    Value::Null
}

fn simplify_properties(properties: &Map<String, Value>) -> Value {
    let mut result = Map::new();
    for (key, value) in properties {
        let Some(type_name) = value["type"].as_str() else {
            result.insert(key.clone(), value.clone());
            continue;
        };
        result.insert(
            key.clone(),
            json!({"type": type_name, "value": simplify_property_value(&value[type_name])}),
        );
    }
    Value::Object(result)
}

fn simplify_property_value(value: &Value) -> Value {
    match value {
        Value::Array(items) => items.iter().map(simplify_property_value).collect(),
        Value::Object(_) => {
            for key in ["plain_text", "name", "id"] {
                if let Some(s) = value[key].as_str() {
                    return Value::String(s.to_string());
                }
            }
            value.clone()
        }
        other => other.clone(),
    }
}
