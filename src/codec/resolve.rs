//! Post-parse link resolution.
//!
//! Wire references inside a blueprint (circuit peers, schedule
//! locomotives, pole neighbours, belt links) are raw 32-bit entity ids.
//! After the entity list is complete they are rewritten in one pass to
//! the 1-based entity numbers the export format uses.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{ParseError, Result};

/// raw id → (entity number, peer is a combinator).
#[derive(Debug, Default)]
pub struct EntityRegistry {
    map: HashMap<u32, (u64, bool)>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, raw_id: u32, number: u64, is_combinator: bool) -> std::result::Result<(), String> {
        if self.map.insert(raw_id, (number, is_combinator)).is_some() {
            return Err(format!("duplicate raw entity id {raw_id}"));
        }
        Ok(())
    }

    fn lookup(&self, raw_id: u32) -> std::result::Result<(u64, bool), String> {
        self.map
            .get(&raw_id)
            .copied()
            .ok_or_else(|| format!("reference to unknown entity id {raw_id}"))
    }
}

/// Rewrite every raw entity reference inside `tree`. `at` positions any
/// resolution failure at the end of the blueprint content that produced
/// the tree.
pub fn resolve_links(tree: &mut Value, registry: &EntityRegistry, at: usize) -> Result<()> {
    walk(tree, registry).map_err(|message| ParseError::new(at, message))
}

fn rewrite_id(value: &mut Value, registry: &EntityRegistry) -> std::result::Result<bool, String> {
    let raw = value
        .as_u64()
        .ok_or_else(|| format!("entity reference is not an integer: {value}"))?;
    let (number, is_combinator) = registry.lookup(raw as u32)?;
    *value = Value::from(number);
    Ok(is_combinator)
}

fn walk(value: &mut Value, registry: &EntityRegistry) -> std::result::Result<(), String> {
    match value {
        Value::Object(map) => {
            if let Some(id_value) = map.get_mut("entity_id") {
                let peer_is_combinator = rewrite_id(id_value, registry)?;
                // Single-circuit peers do not export their circuit id.
                let circuit_id = map.get("circuit_id").and_then(Value::as_u64);
                if !peer_is_combinator && circuit_id == Some(1) {
                    map.remove("circuit_id");
                }
            }
            for (key, child) in map.iter_mut() {
                match key.as_str() {
                    "locomotives" | "neighbours" => {
                        if let Value::Array(items) = child {
                            for item in items {
                                rewrite_id(item, registry)?;
                            }
                        }
                    }
                    "belt_link" => {
                        rewrite_id(child, registry)?;
                    }
                    "entity_id" | "circuit_id" => {}
                    _ => walk(child, registry)?,
                }
            }
            Ok(())
        }
        Value::Array(items) => {
            for item in items {
                walk(item, registry)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
