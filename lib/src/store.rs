//! Blueprint canvas state: nodes and their configuration maps.

use crate::error::{BlueprintError, Result};
use crate::patcher::Patcher;
use crate::templates;
use crate::util::Saveable;
use crate::{SMART_CACHE_KEY, TEMPLATE_KEY};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::{Error as IoError, ErrorKind as IoErrorKind, Read, Result as IoResult, Write};
use tracing::info;
use uuid::Uuid;

/// Untyped per-node configuration. Readers supply their own defaults.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct NodeConfig(Map<String, Value>);

impl NodeConfig {
    pub fn new() -> Self {
        NodeConfig(Map::new())
    }

    /// Builds a config from `key=value` pairs, see [`parse_assignment`].
    pub fn from_assignments<'a, I>(assignments: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut config = NodeConfig::new();
        for assignment in assignments {
            let (key, value) = parse_assignment(assignment)?;
            config.set(key, value);
        }
        Ok(config)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.0.get(key).and_then(Value::as_str).unwrap_or(default)
    }

    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Shallow merge: keys in `patch` overwrite existing ones.
    pub fn merge(&mut self, patch: NodeConfig) {
        for (key, value) in patch.0 {
            self.0.insert(key, value);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

/// Splits `key=value`. The value is read as JSON when it parses
/// (`true`, `42`, `"x"`, `[1]`), otherwise kept as a plain string.
pub fn parse_assignment(assignment: &str) -> Result<(String, Value)> {
    let (key, raw) = assignment
        .split_once('=')
        .ok_or_else(|| BlueprintError::InvalidAssignment(assignment.to_string()))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(BlueprintError::InvalidAssignment(assignment.to_string()));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BlueprintNode {
    pub id: Uuid,
    pub kind: String,
    pub created_at: DateTime<Utc>,
    pub config: NodeConfig,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Blueprint {
    nodes: Vec<BlueprintNode>,
}

impl Saveable for Blueprint {
    fn load<I: Read>(reader: I) -> IoResult<Self> {
        ciborium::de::from_reader(reader)
            .map_err(|_| IoError::new(IoErrorKind::InvalidData, "Failed to deserialize Blueprint"))
    }
    fn save<O: Write>(&self, writer: O) -> IoResult<()> {
        ciborium::ser::into_writer(self, writer)
            .map_err(|_| IoError::new(IoErrorKind::InvalidData, "Failed to serialize Blueprint"))
    }
}

impl Blueprint {
    pub fn new() -> Self {
        Blueprint { nodes: vec![] }
    }

    pub fn nodes(&self) -> &[BlueprintNode] {
        &self.nodes
    }

    pub fn node(&self, id: Uuid) -> Option<&BlueprintNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn add_node(&mut self, kind: impl Into<String>, config: NodeConfig) -> Uuid {
        let node = BlueprintNode {
            id: Uuid::new_v4(),
            kind: kind.into(),
            created_at: Utc::now(),
            config,
        };
        let id = node.id;
        info!(%id, kind = %node.kind, "node added");
        self.nodes.push(node);
        id
    }

    pub fn update_node_config(&mut self, id: Uuid, patch: NodeConfig) -> Result<()> {
        let node = self
            .nodes
            .iter_mut()
            .find(|node| node.id == id)
            .ok_or(BlueprintError::NodeNotFound(id))?;
        info!(%id, keys = patch.len(), "node config updated");
        node.config.merge(patch);
        Ok(())
    }

    pub fn remove_node(&mut self, id: Uuid) -> Result<BlueprintNode> {
        let index = self
            .nodes
            .iter()
            .position(|node| node.id == id)
            .ok_or(BlueprintError::NodeNotFound(id))?;
        info!(%id, "node removed");
        Ok(self.nodes.remove(index))
    }

    /// Contract source for a node: its template, cache-patched when
    /// `smart_cache` is set. Derived on every call, never stored.
    pub fn render_source(&self, id: Uuid, patcher: &Patcher) -> Result<String> {
        let node = self.node(id).ok_or(BlueprintError::NodeNotFound(id))?;
        let template = templates::require(node.config.str_or(TEMPLATE_KEY, &node.kind))?;
        if node.config.bool_or(SMART_CACHE_KEY, false) {
            Ok(patcher.patch(template.source).source)
        } else {
            Ok(template.source.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("smart_cache=true").unwrap(),
            ("smart_cache".to_string(), json!(true))
        );
        assert_eq!(
            parse_assignment("decimals=18").unwrap(),
            ("decimals".to_string(), json!(18))
        );
        assert_eq!(
            parse_assignment("name=Blueprint Token").unwrap(),
            ("name".to_string(), json!("Blueprint Token"))
        );
        assert_eq!(
            parse_assignment("url=a=b").unwrap(),
            ("url".to_string(), json!("a=b"))
        );
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=1").is_err());
    }

    #[test]
    fn test_defaults_apply_to_missing_or_mistyped_keys() {
        let config = NodeConfig::from_assignments(["decimals=\"eighteen\"", "paused=false"]).unwrap();
        assert!(config.get("decimals").and_then(Value::as_u64).is_none());
        assert!(!config.bool_or("paused", true));
        assert_eq!(config.str_or("symbol", "BPT"), "BPT");
    }

    #[test]
    fn test_set_get_remove() {
        let mut config = NodeConfig::new();
        assert!(config.is_empty());
        config.set("symbol", "BPT");
        config.set("decimals", 18);
        assert_eq!(config.get("symbol"), Some(&json!("BPT")));
        assert_eq!(config.remove("symbol"), Some(json!("BPT")));
        assert!(config.get("symbol").is_none());
        let keys: Vec<_> = config.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(keys, ["decimals"]);
    }

    #[test]
    fn test_update_is_last_write_wins() {
        let mut blueprint = Blueprint::new();
        let id = blueprint.add_node("erc20", NodeConfig::from_assignments(["symbol=AAA"]).unwrap());
        blueprint
            .update_node_config(id, NodeConfig::from_assignments(["symbol=BBB", "decimals=6"]).unwrap())
            .unwrap();
        let config = &blueprint.node(id).unwrap().config;
        assert_eq!(config.str_or("symbol", ""), "BBB");
        assert_eq!(config.get("decimals"), Some(&json!(6)));
        assert_eq!(config.len(), 2);
    }

    #[test]
    fn test_missing_node() {
        let mut blueprint = Blueprint::new();
        let id = Uuid::new_v4();
        assert!(matches!(
            blueprint.update_node_config(id, NodeConfig::new()),
            Err(BlueprintError::NodeNotFound(missing)) if missing == id
        ));
        assert!(blueprint.remove_node(id).is_err());
    }

    #[test]
    fn test_remove_node() {
        let mut blueprint = Blueprint::new();
        let first = blueprint.add_node("counter", NodeConfig::new());
        let second = blueprint.add_node("erc721", NodeConfig::new());
        let removed = blueprint.remove_node(first).unwrap();
        assert_eq!(removed.kind, "counter");
        assert_eq!(blueprint.nodes().len(), 1);
        assert_eq!(blueprint.nodes()[0].id, second);
    }

    #[test]
    fn test_render_source_follows_smart_cache_flag() {
        let patcher = Patcher::default();
        let mut blueprint = Blueprint::new();
        let id = blueprint.add_node("counter", NodeConfig::new());
        let plain = blueprint.render_source(id, &patcher).unwrap();
        assert_eq!(plain, templates::require("counter").unwrap().source);

        blueprint
            .update_node_config(id, NodeConfig::from_assignments(["smart_cache=true"]).unwrap())
            .unwrap();
        let cached = blueprint.render_source(id, &patcher).unwrap();
        assert!(patcher.is_patched(&cached));
        assert!(cached.contains("pub fn is_cacheable"));
    }

    #[test]
    fn test_render_source_template_override() {
        let mut blueprint = Blueprint::new();
        let id = blueprint.add_node("token", NodeConfig::from_assignments(["template=erc20"]).unwrap());
        let source = blueprint.render_source(id, &Patcher::default()).unwrap();
        assert!(source.contains("BlueprintToken"));

        let unknown = blueprint.add_node("token", NodeConfig::new());
        assert!(matches!(
            blueprint.render_source(unknown, &Patcher::default()),
            Err(BlueprintError::UnknownTemplate(id)) if id == "token"
        ));
    }

    #[test]
    fn test_save_and_load() {
        let mut blueprint = Blueprint::new();
        blueprint.add_node(
            "erc20",
            NodeConfig::from_assignments(["smart_cache=true", "decimals=18", "name=Token"]).unwrap(),
        );
        let mut bytes = Vec::new();
        blueprint.save(&mut bytes).unwrap();
        let loaded = Blueprint::load(bytes.as_slice()).unwrap();
        assert_eq!(loaded, blueprint);
    }
}
