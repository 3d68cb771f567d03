//! Field readers shared between the entity variant decoders and the
//! object decoders: signals, conditions, property trees, icons, wire
//! connections, filter lists and item maps.

use serde_json::{json, Map, Value};

use crate::codec::decoder::Decoder;
use crate::codec::index::Kind;
use crate::error::Result;

/// Comparator table indexed by the wire byte.
pub const COMPARATORS: [&str; 6] = [">", "<", "=", "≥", "≤", "≠"];

/// Arithmetic-combinator operation table indexed by the wire byte.
pub const ARITHMETIC_OPS: [&str; 11] =
    ["*", "/", "+", "-", "%", "^", "<<", ">>", "AND", "OR", "XOR"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Item,
    Fluid,
    Virtual,
}

impl SignalKind {
    pub fn label(self) -> &'static str {
        match self {
            SignalKind::Item => "item",
            SignalKind::Fluid => "fluid",
            SignalKind::Virtual => "virtual",
        }
    }

    pub fn kind(self) -> Kind {
        match self {
            SignalKind::Item => Kind::Item,
            SignalKind::Fluid => Kind::Fluid,
            SignalKind::Virtual => Kind::VirtualSignal,
        }
    }
}

const SIGNAL_KINDS: [SignalKind; 3] = [SignalKind::Item, SignalKind::Fluid, SignalKind::Virtual];

/// Raw signal reference: kind byte plus a 16-bit ID (2 bytes even for
/// tiles). ID 0 means absent.
pub fn read_signal_id(d: &mut Decoder) -> Result<Option<(SignalKind, u16)>> {
    let kind = d.r.read_mapped_u8("signal type", &SIGNAL_KINDS)?;
    let id = d.r.read_u16()?;
    if id == 0 {
        Ok(None)
    } else {
        Ok(Some((kind, id)))
    }
}

/// Signal resolved against the prototype index; unknown IDs fail.
pub fn read_signal(d: &mut Decoder) -> Result<Option<Value>> {
    match read_signal_id(d)? {
        None => Ok(None),
        Some((kind, id)) => {
            let name = d.require_name(kind.kind(), id, "signal")?;
            Ok(Some(json!({ "type": kind.label(), "name": name })))
        }
    }
}

/// A signal compared against a hard-coded vanilla default.
pub enum DefaultedSignal {
    Absent,
    Default,
    Set(Value),
}

pub fn read_defaulted_signal(d: &mut Decoder, default_name: &str) -> Result<DefaultedSignal> {
    match read_signal_id(d)? {
        None => Ok(DefaultedSignal::Absent),
        Some((kind, id)) => {
            let name = d.require_name(kind.kind(), id, "signal")?;
            if kind == SignalKind::Virtual && name == default_name {
                Ok(DefaultedSignal::Default)
            } else {
                Ok(DefaultedSignal::Set(json!({ "type": kind.label(), "name": name })))
            }
        }
    }
}

/// Circuit condition. The all-defaults encoding (no signals, "<",
/// constant 0) is suppressed to match the game's export.
pub fn read_condition(d: &mut Decoder) -> Result<Option<Value>> {
    let comparator = d.r.read_mapped_u8("comparator", &COMPARATORS)?;
    let first = read_signal(d)?;
    let second = read_signal(d)?;
    let constant = d.r.read_i32()?;
    let use_constant = d.r.read_bool()?;

    if first.is_none() && second.is_none() && comparator == "<" && constant == 0 {
        return Ok(None);
    }

    let mut cond = Map::new();
    if let Some(first) = first {
        cond.insert("first_signal".into(), first);
    }
    if use_constant || second.is_none() {
        cond.insert("constant".into(), Value::from(constant));
    } else if let Some(second) = second {
        cond.insert("second_signal".into(), second);
    }
    cond.insert("comparator".into(), Value::from(comparator));
    Ok(Some(Value::Object(cond)))
}

/// Condition followed by the logistic-network flag. Returns the condition
/// and whether the entity connects to the logistic network.
pub fn read_condition_with_logistic(d: &mut Decoder) -> Result<(Option<Value>, bool)> {
    let condition = read_condition(d)?;
    let connect = d.r.read_bool()?;
    Ok((condition, connect))
}

/// Strings inside a property tree carry a preceding is-empty flag.
fn read_tree_string(d: &mut Decoder) -> Result<String> {
    let is_empty = d.r.read_bool()?;
    if is_empty {
        Ok(String::new())
    } else {
        d.r.read_string()
    }
}

/// Free-form tag value: a self-describing sum type. The per-node
/// "any type" flag is read and discarded.
pub fn read_property_tree(d: &mut Decoder) -> Result<Value> {
    let at = d.r.position();
    let ty = d.r.read_u8()?;
    let _any_type = d.r.read_bool()?;
    match ty {
        0 => Ok(Value::Null),
        1 => Ok(Value::from(d.r.read_bool()?)),
        2 => Ok(Value::from(d.r.read_f64()?)),
        3 => Ok(Value::from(read_tree_string(d)?)),
        4 => {
            let count = d.r.read_count32()?;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                let _key = read_tree_string(d)?;
                items.push(read_property_tree(d)?);
            }
            Ok(Value::Array(items))
        }
        5 => {
            let count = d.r.read_count32()?;
            let mut map = Map::new();
            for _ in 0..count {
                let key = read_tree_string(d)?;
                map.insert(key, read_property_tree(d)?);
            }
            Ok(Value::Object(map))
        }
        other => Err(crate::error::ParseError::new(
            at,
            format!("invalid property tree type {other}"),
        )),
    }
}

/// Icon list. The leading string list names icons whose prototype no
/// longer exists; they substitute in order for unresolvable IDs.
pub fn read_icons(d: &mut Decoder) -> Result<Option<Value>> {
    let unknown_count = d.r.read_count8()?;
    let mut unknowns = std::collections::VecDeque::with_capacity(unknown_count);
    for _ in 0..unknown_count {
        unknowns.push_back(d.r.read_string()?);
    }

    let count = d.r.read_count8()?;
    let mut icons = Vec::new();
    for slot in 0..count {
        let Some((kind, id)) = read_signal_id(d)? else { continue };
        let name = match d.prototype_name(kind.kind(), id) {
            Some(name) => name,
            None => unknowns.pop_front().ok_or_else(|| {
                d.r.error(format!("unknown {} id {id} for icon", kind.kind().label()))
            })?,
        };
        icons.push(json!({
            "signal": { "type": kind.label(), "name": name },
            "index": slot + 1,
        }));
    }
    if icons.is_empty() {
        Ok(None)
    } else {
        Ok(Some(Value::Array(icons)))
    }
}

/// One circuit's wire connections: red then green peers, each peer a raw
/// entity id plus the peer's circuit id and a literal 0xFF trailer, then
/// nine fixed zero bytes.
pub fn read_circuit_connections(d: &mut Decoder) -> Result<Option<Value>> {
    let mut block = Map::new();
    for colour in ["red", "green"] {
        let count = d.r.read_count8()?;
        let mut peers = Vec::with_capacity(count);
        for _ in 0..count {
            let entity_id = d.r.read_u32()?;
            let circuit_id = d.r.read_u8()?;
            d.r.expect(&[0xFF], "connection peer trailer")?;
            peers.push(json!({ "entity_id": entity_id, "circuit_id": circuit_id }));
        }
        if !peers.is_empty() {
            block.insert(colour.into(), Value::Array(peers));
        }
    }
    d.r.expect(&[0; 9], "circuit connection pad")?;
    if block.is_empty() {
        Ok(None)
    } else {
        Ok(Some(Value::Object(block)))
    }
}

/// Item filter list. Output indices are 1-based; absent slots are
/// suppressed.
pub fn read_filters(d: &mut Decoder) -> Result<Option<Value>> {
    let count = d.r.read_count8()?;
    let mut filters = Vec::new();
    for slot in 0..count {
        let id = d.r.read_u16()?;
        if id == 0 {
            continue;
        }
        let name = d.require_name(Kind::Item, id, "filter")?;
        filters.push(json!({ "index": slot + 1, "name": name }));
    }
    if filters.is_empty() {
        Ok(None)
    } else {
        Ok(Some(Value::Array(filters)))
    }
}

/// Logistic request slots: filters with counts.
pub fn read_logistic_filters(d: &mut Decoder) -> Result<Option<Value>> {
    let count = d.r.read_count8()?;
    let mut filters = Vec::new();
    for slot in 0..count {
        let id = d.r.read_u16()?;
        let amount = d.r.read_u32()?;
        if id == 0 {
            continue;
        }
        let name = d.require_name(Kind::Item, id, "request filter")?;
        filters.push(json!({ "index": slot + 1, "name": name, "count": amount }));
    }
    if filters.is_empty() {
        Ok(None)
    } else {
        Ok(Some(Value::Array(filters)))
    }
}

/// Item map (modules, fuel, ammo): grouped by item name.
pub fn read_items(d: &mut Decoder) -> Result<Option<Value>> {
    let count = d.r.read_count32()?;
    let mut items = Map::new();
    for _ in 0..count {
        let id = d.r.read_u16()?;
        let amount = d.r.read_u32()?;
        let name = d.require_name(Kind::Item, id, "item stack")?;
        let entry = items.entry(name).or_insert_with(|| Value::from(0u32));
        *entry = Value::from(entry.as_u64().unwrap_or(0) + amount as u64);
    }
    if items.is_empty() {
        Ok(None)
    } else {
        Ok(Some(Value::Object(items)))
    }
}

/// RGBA color, four floats.
pub fn read_color(d: &mut Decoder) -> Result<Value> {
    let r = d.r.read_f32()?;
    let g = d.r.read_f32()?;
    let b = d.r.read_f32()?;
    let a = d.r.read_f32()?;
    Ok(json!({ "r": r, "g": g, "b": b, "a": a }))
}

/// Bool-prefixed color.
pub fn read_optional_color(d: &mut Decoder) -> Result<Option<Value>> {
    if d.r.read_bool()? {
        Ok(Some(read_color(d)?))
    } else {
        Ok(None)
    }
}
