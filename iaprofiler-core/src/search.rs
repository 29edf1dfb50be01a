//! Catalog search and asset updates.
//!
//! All discovery and ignore-list resolution route through one query shape:
//!
//! ```json
//! {"pageSize": 10000, "properties": ["name"], "types": ["database_schema"],
//!  "where": {"operator": "and", "conditions": [{"property": "database.host.name",
//!            "operator": "=", "value": "HOST1"}]}}
//! ```
//!
//! Property paths such as `database_schema.database.host.name` are the
//! catalog's own and are passed through verbatim.

use crate::{
    Result,
    client::CatalogClient,
    error::ProfilerError,
    identity::AssetType,
    transport::Method,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Catalog search endpoint.
pub const SEARCH_PATH: &str = "/ibm/iis/igc-rest/v1/search";

/// Catalog asset endpoint (create with POST, update with PUT `/{rid}`).
pub const ASSETS_PATH: &str = "/ibm/iis/igc-rest/v1/assets";

/// Page size used when a query does not set one.
pub const DEFAULT_PAGE_SIZE: u32 = 10_000;

/// A catalog search request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub page_size: u32,
    pub properties: Vec<String>,
    pub types: Vec<String>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<WhereClause>,
}

/// Conjunction or disjunction of conditions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WhereClause {
    pub operator: String,
    pub conditions: Vec<Condition>,
}

/// One property condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Condition {
    pub property: String,
    pub operator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negated: Option<bool>,
}

impl Condition {
    /// `property = value`
    pub fn equals(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            operator: "=".to_string(),
            value: Some(Value::String(value.into())),
            negated: None,
        }
    }

    /// `property` is set (negated `isNull`).
    pub fn is_not_null(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            operator: "isNull".to_string(),
            value: None,
            negated: Some(true),
        }
    }
}

impl SearchQuery {
    /// A query over the given asset types with no properties or conditions.
    pub fn new(types: &[AssetType]) -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            properties: Vec::new(),
            types: types.iter().map(|t| t.as_str().to_string()).collect(),
            filter: None,
        }
    }

    /// Same as [`SearchQuery::new`] for types the crate does not model,
    /// such as `label` or `data_connection`.
    pub fn for_type_names(types: &[&str]) -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            properties: Vec::new(),
            types: types.iter().map(ToString::to_string).collect(),
            filter: None,
        }
    }

    /// Requests these properties on every returned item.
    pub fn with_properties(mut self, properties: &[&str]) -> Self {
        self.properties = properties.iter().map(ToString::to_string).collect();
        self
    }

    /// Adds a condition; all conditions are and-ed.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.filter
            .get_or_insert_with(|| WhereClause {
                operator: "and".to_string(),
                conditions: Vec::new(),
            })
            .conditions
            .push(condition);
        self
    }

    /// Overrides the page size.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

/// One page of search results.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

/// Paging block of a search response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Paging {
    /// Absolute URL of the next page
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default, rename = "numTotal")]
    pub num_total: Option<u64>,
}

/// A catalog object returned by a search.
///
/// Requested properties arrive flattened next to the fixed `_id`, `_type`
/// and `_name` keys, keyed by their property path.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchItem {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_type")]
    pub asset_type: String,
    #[serde(rename = "_name", default)]
    pub name: String,
    #[serde(flatten)]
    pub properties: serde_json::Map<String, Value>,
}

impl SearchItem {
    /// Scalar text of a property.
    ///
    /// Reference properties yield the referenced object's `_name`; list
    /// properties yield their first entry.
    pub fn text(&self, property: &str) -> Option<String> {
        self.properties.get(property).and_then(value_text)
    }

    /// Names of every entry of a list or reference property.
    pub fn names(&self, property: &str) -> Vec<String> {
        match self.properties.get(property) {
            Some(Value::Array(values)) => values.iter().filter_map(value_text).collect(),
            Some(Value::Object(object)) => match object.get("items") {
                Some(Value::Array(values)) => values.iter().filter_map(value_text).collect(),
                _ => value_text(&Value::Object(object.clone())).into_iter().collect(),
            },
            Some(value) => value_text(value).into_iter().collect(),
            None => Vec::new(),
        }
    }

    /// The item's type, if it is one the crate models.
    pub fn known_type(&self) -> Option<AssetType> {
        self.asset_type.parse().ok()
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Object(object) => object.get("_name").and_then(value_text),
        Value::Array(values) => values.first().and_then(value_text),
        Value::Null => None,
    }
}

/// Turns an absolute `paging.next` URL into a server-relative path.
fn next_page_path(next: &str) -> String {
    match url::Url::parse(next) {
        Ok(url) => match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        },
        Err(_) => next.to_string(),
    }
}

/// Extracts the new asset id from a create response.
///
/// The catalog answers either with the bare id or with a JSON object
/// carrying `_id`.
fn created_asset_id(body: &str) -> Result<String> {
    let trimmed = body.trim();
    let id = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(object)) => object
            .get("_id")
            .and_then(Value::as_str)
            .map(ToString::to_string),
        Ok(Value::String(id)) => Some(id),
        _ => Some(trimmed.to_string()),
    };
    id.filter(|id| !id.is_empty())
        .ok_or_else(|| ProfilerError::unexpected("asset create response carried no id"))
}

impl CatalogClient {
    /// Runs a search and follows `paging.next` until every page is read.
    ///
    /// # Errors
    /// Returns transport or status errors, or a serialization error if a
    /// page cannot be decoded.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchItem>> {
        let body = serde_json::to_value(query)
            .map_err(|e| ProfilerError::serialization("Failed to encode search query", e))?;
        let text = self.send_json(Method::Post, SEARCH_PATH, body).await?;
        let mut page = decode_page(&text)?;
        let mut items = std::mem::take(&mut page.items);
        let mut visited = Vec::new();

        while let Some(next) = page.paging.as_ref().and_then(|p| p.next.clone()) {
            let path = next_page_path(&next);
            if visited.contains(&path) {
                break;
            }
            debug!("Fetching next search page ({} items so far)", items.len());
            let text = self.get(&path).await?;
            visited.push(path);
            page = decode_page(&text)?;
            items.append(&mut page.items);
        }

        debug!("Search over {:?} returned {} items", query.types, items.len());
        Ok(items)
    }

    /// Creates an asset and returns its id.
    ///
    /// # Errors
    /// Returns transport or status errors, or an unexpected-response error
    /// if no id came back.
    pub async fn create_asset(&self, asset: Value) -> Result<String> {
        let body = self.send_json(Method::Post, ASSETS_PATH, asset).await?;
        created_asset_id(&body)
    }

    /// Updates properties of an existing asset.
    ///
    /// # Errors
    /// Returns transport or status errors.
    pub async fn update_asset(&self, rid: &str, changes: Value) -> Result<()> {
        let path = format!("{ASSETS_PATH}/{rid}");
        self.send_json(Method::Put, &path, changes).await?;
        Ok(())
    }
}

fn decode_page(text: &str) -> Result<SearchResponse> {
    serde_json::from_str(text)
        .map_err(|e| ProfilerError::serialization("Failed to decode search response", e))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_serializes_catalog_shape() {
        let query = SearchQuery::new(&[AssetType::Host])
            .with_properties(&["name"])
            .with_condition(Condition::is_not_null("databases"));

        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({
                "pageSize": 10000,
                "properties": ["name"],
                "types": ["host"],
                "where": {
                    "operator": "and",
                    "conditions": [
                        {"property": "databases", "operator": "isNull", "negated": true}
                    ]
                }
            })
        );
    }

    #[test]
    fn test_query_without_conditions_omits_where() {
        let value = serde_json::to_value(SearchQuery::for_type_names(&["label"])).unwrap();
        assert!(value.get("where").is_none());
        assert_eq!(value["types"], json!(["label"]));
    }

    #[test]
    fn test_item_property_access() {
        let item: SearchItem = serde_json::from_value(json!({
            "_id": "rid-1",
            "_type": "database_table",
            "_name": "T1",
            "database_schema.name": "SCH1",
            "database_schema.database": {"_name": "DB1", "_id": "rid-db"},
            "database_columns": {
                "items": [{"_name": "A"}, {"_name": "B"}],
                "paging": {"numTotal": 2}
            },
            "labels": ["Information Analyzer Ignore List"]
        }))
        .unwrap();

        assert_eq!(item.name, "T1");
        assert_eq!(item.known_type(), Some(AssetType::DatabaseTable));
        assert_eq!(item.text("database_schema.name").as_deref(), Some("SCH1"));
        assert_eq!(item.text("database_schema.database").as_deref(), Some("DB1"));
        assert_eq!(item.names("database_columns"), vec!["A", "B"]);
        assert_eq!(item.names("labels"), vec!["Information Analyzer Ignore List"]);
        assert!(item.text("missing").is_none());
        assert!(item.names("missing").is_empty());
    }

    #[test]
    fn test_next_page_path() {
        assert_eq!(
            next_page_path("https://ia:9443/ibm/iis/igc-rest/v1/search?begin=10&pageSize=10"),
            "/ibm/iis/igc-rest/v1/search?begin=10&pageSize=10"
        );
        assert_eq!(next_page_path("/relative?x=1"), "/relative?x=1");
    }

    #[test]
    fn test_created_asset_id_forms() {
        assert_eq!(created_asset_id("rid-9\n").unwrap(), "rid-9");
        assert_eq!(created_asset_id(r#"{"_id":"rid-9"}"#).unwrap(), "rid-9");
        assert_eq!(created_asset_id(r#""rid-9""#).unwrap(), "rid-9");
        assert!(created_asset_id("  ").unwrap_err().is_logical());
    }
}
