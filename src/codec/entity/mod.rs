//! Entity frame envelope and the per-class variant decoders.
//!
//! Every entity shares the same envelope: prototype ID, delta/absolute
//! position, a 0x20 frame marker, the raw entity id used for wire
//! references, version-gated pre-body bytes, the dispatched variant body,
//! and a trailer of item stacks and tags. The body decoders live in the
//! domain submodules and are looked up in a static class table.

pub mod circuits;
pub mod logistics;
pub mod military;
pub mod power;
pub mod production;
pub mod trains;
pub mod transport;

use std::collections::HashMap;
use std::sync::OnceLock;

use serde_json::{json, Map, Value};

use crate::codec::decoder::Decoder;
use crate::codec::fields;
use crate::codec::index::Kind;
use crate::codec::version::{V_1_1_51_4, V_1_1_62_5};
use crate::error::Result;

/// Entity record under construction plus the prototype it was dispatched
/// on. Decoders append fields in export order.
pub struct EntityBuf {
    pub class: String,
    pub name: String,
    pub fields: Map<String, Value>,
}

impl EntityBuf {
    fn new(class: String, name: String) -> Self {
        Self { class, name, fields: Map::new() }
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.fields.insert(key.to_string(), value);
    }

    /// The `control_behavior` attribute bag, created on first use.
    pub fn control(&mut self) -> &mut Map<String, Value> {
        self.fields
            .entry("control_behavior")
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .expect("control_behavior is an object")
    }

    pub fn set_control(&mut self, key: &str, value: Value) {
        self.control().insert(key.to_string(), value);
    }

    /// Attach one circuit's connection block ("1" for the only/input
    /// circuit, "2" for a combinator's output circuit).
    pub fn set_connections(&mut self, circuit: &str, block: Value) {
        self.fields
            .entry("connections")
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .expect("connections is an object")
            .insert(circuit.to_string(), block);
    }
}

/// A decoded entity with the transient wire identifier still attached.
/// The raw id is dropped once link resolution has rewritten references.
pub struct ParsedEntity {
    pub raw_id: u32,
    pub is_combinator: bool,
    pub record: Value,
}

type DecodeFn = fn(&mut Decoder, &mut EntityBuf) -> Result<()>;

static VARIANT_DECODERS: &[(&str, DecodeFn)] = &[
    ("accumulator", power::accumulator),
    ("ammo-turret", military::turret),
    ("arithmetic-combinator", circuits::arithmetic_combinator),
    ("artillery-turret", military::artillery_turret),
    ("artillery-wagon", trains::artillery_wagon),
    ("assembling-machine", production::assembling_machine),
    ("beacon", production::empty_body),
    ("boiler", power::directional),
    ("burner-generator", power::empty_body),
    ("cargo-wagon", trains::cargo_wagon),
    ("constant-combinator", circuits::constant_combinator),
    ("container", logistics::container),
    ("curved-rail", trains::rail),
    ("decider-combinator", circuits::decider_combinator),
    ("electric-energy-interface", power::electric_energy_interface),
    ("electric-pole", circuits::electric_pole),
    ("electric-turret", military::turret),
    ("fluid-turret", military::turret),
    ("fluid-wagon", trains::fluid_wagon),
    ("furnace", production::empty_body),
    ("gate", military::gate),
    ("generator", power::directional),
    ("heat-interface", power::heat_interface),
    ("heat-pipe", power::empty_body),
    ("infinity-container", logistics::infinity_container),
    ("infinity-pipe", production::infinity_pipe),
    ("inserter", transport::inserter),
    ("lab", production::empty_body),
    ("lamp", circuits::lamp),
    ("land-mine", military::land_mine),
    ("linked-belt", transport::linked_belt),
    ("linked-container", logistics::linked_container),
    ("loader", transport::loader),
    ("loader-1x1", transport::loader),
    ("locomotive", trains::locomotive),
    ("logistic-container", logistics::logistic_container),
    ("mining-drill", production::mining_drill),
    ("offshore-pump", production::offshore_pump),
    ("pipe", production::empty_body),
    ("pipe-to-ground", production::directional),
    ("power-switch", circuits::power_switch),
    ("programmable-speaker", circuits::programmable_speaker),
    ("pump", production::pump),
    ("radar", military::radar),
    ("rail-chain-signal", trains::rail_chain_signal),
    ("rail-signal", trains::rail_signal),
    ("reactor", power::empty_body),
    ("roboport", logistics::roboport),
    ("rocket-silo", production::rocket_silo),
    ("solar-panel", power::empty_body),
    ("splitter", transport::splitter),
    ("storage-tank", logistics::storage_tank),
    ("straight-rail", trains::rail),
    ("train-stop", trains::train_stop),
    ("transport-belt", transport::transport_belt),
    ("underground-belt", transport::underground_belt),
    ("wall", military::wall),
];

fn decoder_for(class: &str) -> Option<DecodeFn> {
    static TABLE: OnceLock<HashMap<&'static str, DecodeFn>> = OnceLock::new();
    TABLE
        .get_or_init(|| VARIANT_DECODERS.iter().copied().collect())
        .get(class)
        .copied()
}

/// Entities whose pre-body flag byte is 0x01.
const FLAGGED_CLASSES: &[&str] = &[
    "ammo-turret",
    "electric-turret",
    "fluid-turret",
    "artillery-turret",
    "land-mine",
    "radar",
];

/// Rail vehicles accept either flag value.
const RAIL_VEHICLE_CLASSES: &[&str] =
    &["locomotive", "cargo-wagon", "fluid-wagon", "artillery-wagon"];

/// Container variants carry the extra filter-inventory marker.
const CONTAINER_CLASSES: &[&str] =
    &["container", "logistic-container", "infinity-container", "linked-container"];

/// Fixed-point map coordinate to an export number: whole tiles stay
/// integers, fractions become floats.
pub fn position_value(raw: i32) -> Value {
    if raw % 256 == 0 {
        Value::from(raw / 256)
    } else {
        Value::from(raw as f64 / 256.0)
    }
}

/// Entity position with the absolute-coordinate lookahead: a first field
/// of exactly 0x7FFF switches to two absolute s32 values, anything else
/// is a signed 16-bit delta pair from the previous entity.
pub fn read_position(d: &mut Decoder, last: &mut (i32, i32)) -> Result<(i32, i32)> {
    let dx = d.r.read_i16()?;
    if dx == 0x7FFF {
        let x = d.r.read_i32()?;
        let y = d.r.read_i32()?;
        *last = (x, y);
    } else {
        let dy = d.r.read_i16()?;
        *last = (last.0 + dx as i32, last.1 + dy as i32);
    }
    Ok(*last)
}

/// Read one entity frame. `number` is the 1-based slot the entity will
/// occupy in the blueprint's entity list.
pub fn read_entity(d: &mut Decoder, last: &mut (i32, i32), number: usize) -> Result<ParsedEntity> {
    let at = d.r.position();
    let proto_id = d.r.read_u16()?;
    let proto = d
        .prototype(Kind::Entity, proto_id)
        .ok_or_else(|| crate::error::ParseError::new(at, format!("unknown entity prototype id {proto_id}")))?;

    let (x, y) = read_position(d, last)?;
    d.r.expect(&[0x20], "entity frame marker")?;

    let flag_at = d.r.position();
    let id_flags = d.r.read_u8()?;
    if id_flags & 0x10 == 0 {
        return Err(crate::error::ParseError::new(
            flag_at,
            format!("entity id flag {id_flags:#04x} is missing bit 0x10"),
        ));
    }
    d.r.expect(&[0x01], "entity id marker")?;
    let raw_id = d.r.read_u32()?;

    let class = proto.class.as_str();
    if d.version() >= V_1_1_51_4 {
        if FLAGGED_CLASSES.contains(&class) {
            d.r.expect(&[0x01], "entity pre-body flag")?;
        } else if RAIL_VEHICLE_CLASSES.contains(&class) {
            d.r.expect_oneof(&[0x00, 0x01], "entity pre-body flag")?;
        } else {
            d.r.expect(&[0x00], "entity pre-body flag")?;
        }
    }
    if d.version() >= V_1_1_62_5 && CONTAINER_CLASSES.contains(&class) {
        d.r.expect(&[0x00], "filter inventory marker")?;
    }

    let mut e = EntityBuf::new(proto.class.clone(), proto.name.clone());
    e.set("entity_number", Value::from(number));
    e.set("name", Value::from(proto.name.clone()));
    e.set("position", json!({ "x": position_value(x), "y": position_value(y) }));

    let decode = decoder_for(class)
        .ok_or_else(|| d.r.error(format!("no decoder for entity class {class:?}")))?;
    decode(d, &mut e)?;

    if let Some(items) = fields::read_items(d)? {
        e.set("items", items);
    }
    if d.r.read_bool()? {
        let tags = fields::read_property_tree(d)?;
        e.set("tags", tags);
    }

    Ok(ParsedEntity {
        raw_id,
        is_combinator: matches!(class, "arithmetic-combinator" | "decider-combinator"),
        record: Value::Object(e.fields),
    })
}

/// Direction byte; north (0) is the default and stays implicit.
pub(crate) fn read_direction(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    let direction = d.r.read_u8()?;
    if direction != 0 {
        e.set("direction", Value::from(direction));
    }
    Ok(())
}

/// Bool-prefixed connection block without any condition payload.
pub(crate) fn read_optional_connections(d: &mut Decoder, e: &mut EntityBuf) -> Result<bool> {
    if !d.r.read_bool()? {
        return Ok(false);
    }
    if let Some(block) = fields::read_circuit_connections(d)? {
        e.set_connections("1", block);
    }
    Ok(true)
}

/// Bool-prefixed connection block followed by a circuit condition.
pub(crate) fn read_circuit_condition_block(d: &mut Decoder, e: &mut EntityBuf) -> Result<bool> {
    if !d.r.read_bool()? {
        return Ok(false);
    }
    if let Some(block) = fields::read_circuit_connections(d)? {
        e.set_connections("1", block);
    }
    if let Some(cond) = fields::read_condition(d)? {
        e.set_control("circuit_condition", cond);
    }
    Ok(true)
}

/// Bool-prefixed connection block whose condition may target the logistic
/// network instead of the circuit network.
pub(crate) fn read_logistic_condition_block(d: &mut Decoder, e: &mut EntityBuf) -> Result<bool> {
    if !d.r.read_bool()? {
        return Ok(false);
    }
    if let Some(block) = fields::read_circuit_connections(d)? {
        e.set_connections("1", block);
    }
    let (condition, connect) = fields::read_condition_with_logistic(d)?;
    if connect {
        e.set_control("connect_to_logistic_network", Value::from(true));
        if let Some(cond) = condition {
            e.set_control("logistic_condition", cond);
        }
    } else if let Some(cond) = condition {
        e.set_control("circuit_condition", cond);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::writer::BinaryWriter;
    use crate::codec::PrototypeIndex;

    fn test_decoder(data: &[u8]) -> Decoder<'_> {
        let mut index = PrototypeIndex::new();
        index.add("container", 10, "wooden-chest").unwrap();
        index.add("lab", 11, "lab").unwrap();
        let mut d = Decoder::new(data);
        d.set_global_index(index);
        d.set_version(crate::codec::Version::new(1, 1, 30, 0));
        d
    }

    fn write_envelope_head(w: &mut BinaryWriter, proto_id: u16, raw_id: u32) {
        w.write_u16(proto_id);
        w.write_i16(0x7FFF);
        w.write_i32(512);
        w.write_i32(384);
        w.write_u8(0x20);
        w.write_u8(0x10);
        w.write_u8(0x01);
        w.write_u32(raw_id);
    }

    fn write_empty_trailer(w: &mut BinaryWriter) {
        w.write_u32(0); // no items
        w.write_bool(false); // no tags
    }

    #[test]
    fn envelope_absolute_position() {
        let mut w = BinaryWriter::new();
        write_envelope_head(&mut w, 11, 0xAA);
        write_empty_trailer(&mut w);
        let data = w.into_vec();
        let mut d = test_decoder(&data);
        let mut last = (0, 0);
        let parsed = read_entity(&mut d, &mut last, 1).unwrap();
        assert_eq!(parsed.raw_id, 0xAA);
        assert!(!parsed.is_combinator);
        assert_eq!(parsed.record["entity_number"], json!(1));
        assert_eq!(parsed.record["name"], json!("lab"));
        assert_eq!(parsed.record["position"], json!({ "x": 2, "y": 1.5 }));
        assert_eq!(last, (512, 384));
    }

    #[test]
    fn envelope_delta_position() {
        // Entities at (1.0, 1.5) then (3.0, 1.5); the second is stored
        // as the delta (2.0, 0.0), encoded 0x0200, 0x0000.
        let mut w = BinaryWriter::new();
        w.write_u16(11);
        w.write_i16(0x7FFF);
        w.write_i32(256);
        w.write_i32(384);
        w.write_u8(0x20);
        w.write_u8(0x10);
        w.write_u8(0x01);
        w.write_u32(1);
        write_empty_trailer(&mut w);
        w.write_u16(11);
        w.write_i16(0x0200);
        w.write_i16(0x0000);
        w.write_u8(0x20);
        w.write_u8(0x10);
        w.write_u8(0x01);
        w.write_u32(2);
        write_empty_trailer(&mut w);
        let data = w.into_vec();

        let mut d = test_decoder(&data);
        let mut last = (0, 0);
        let first = read_entity(&mut d, &mut last, 1).unwrap();
        assert_eq!(first.record["position"], json!({ "x": 1, "y": 1.5 }));
        let second = read_entity(&mut d, &mut last, 2).unwrap();
        assert_eq!(second.record["position"], json!({ "x": 3, "y": 1.5 }));
    }

    #[test]
    fn delta_boundary_is_exact() {
        // 0x7FFE must parse as a delta, not trigger absolute mode.
        let mut w = BinaryWriter::new();
        w.write_u16(11);
        w.write_i16(0x7FFE);
        w.write_i16(0);
        w.write_u8(0x20);
        w.write_u8(0x10);
        w.write_u8(0x01);
        w.write_u32(1);
        write_empty_trailer(&mut w);
        let data = w.into_vec();
        let mut d = test_decoder(&data);
        let mut last = (0, 0);
        let parsed = read_entity(&mut d, &mut last, 1).unwrap();
        assert_eq!(parsed.record["position"]["x"], json!(0x7FFE as f64 / 256.0));
    }

    #[test]
    fn missing_id_bit_fails() {
        let mut w = BinaryWriter::new();
        w.write_u16(11);
        w.write_i16(0x7FFF);
        w.write_i32(0);
        w.write_i32(0);
        w.write_u8(0x20);
        w.write_u8(0x00); // bit 0x10 missing
        let data = w.into_vec();
        let mut d = test_decoder(&data);
        let mut last = (0, 0);
        assert!(read_entity(&mut d, &mut last, 1).is_err());
    }

    #[test]
    fn container_gains_marker_bytes_with_version() {
        let mut w = BinaryWriter::new();
        write_envelope_head(&mut w, 10, 5);
        w.write_u8(0x00); // pre-body flag (>= 1.1.51.4)
        w.write_u8(0x00); // filter inventory marker (>= 1.1.62.5)
        w.write_bool(false); // no circuit connections
        write_empty_trailer(&mut w);
        let data = w.into_vec();
        let mut d = test_decoder(&data);
        d.set_version(crate::codec::Version::new(1, 1, 70, 0));
        let mut last = (0, 0);
        let parsed = read_entity(&mut d, &mut last, 1).unwrap();
        assert_eq!(parsed.record["name"], json!("wooden-chest"));
    }

    #[test]
    fn tags_land_in_the_record() {
        let mut w = BinaryWriter::new();
        write_envelope_head(&mut w, 11, 1);
        w.write_u32(0);
        w.write_bool(true);
        w.write_u8(5); // dictionary
        w.write_bool(false);
        w.write_u32(1);
        w.write_bool(false);
        w.write_string("marked");
        w.write_u8(1);
        w.write_bool(false);
        w.write_bool(true);
        let data = w.into_vec();
        let mut d = test_decoder(&data);
        let mut last = (0, 0);
        let parsed = read_entity(&mut d, &mut last, 1).unwrap();
        assert_eq!(parsed.record["tags"], json!({ "marked": true }));
    }
}
