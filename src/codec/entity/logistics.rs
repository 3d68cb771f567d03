//! Chests, logistic chests and roboports.

use serde_json::{json, Value};

use crate::codec::decoder::Decoder;
use crate::codec::fields::{self, DefaultedSignal};
use crate::codec::index::Kind;
use crate::codec::version::STABLE_V_1_1;
use crate::error::Result;

use super::{read_optional_connections, EntityBuf};

pub fn container(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    read_optional_connections(d, e)?;
    Ok(())
}

pub fn storage_tank(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    read_optional_connections(d, e)?;
    Ok(())
}

pub fn linked_container(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    let link_id = d.r.read_u32()?;
    e.set("link_id", Value::from(link_id));
    Ok(())
}

pub fn logistic_container(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    let mode = d.r.expect_oneof(&[1, 2, 3, 4, 5], "logistic mode")?;
    d.r.expect(&[0x03], "logistic container pad")?;

    if let Some(filters) = fields::read_logistic_filters(d)? {
        e.set("request_filters", filters);
    }

    // Request-from-buffers became unconditional in 1.1.19; older files
    // store it only for requester-flavoured modes.
    if d.version() >= STABLE_V_1_1 || matches!(mode, 2 | 3 | 5) {
        if d.r.read_bool()? {
            e.set("request_from_buffers", Value::from(true));
        }
    }

    read_optional_connections(d, e)?;
    Ok(())
}

const INFINITY_MODES: [&str; 3] = ["at-least", "at-most", "exactly"];

pub fn infinity_container(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    let count = d.r.read_count8()?;
    let mut filters = Vec::new();
    for slot in 0..count {
        let id = d.r.read_u16()?;
        let amount = d.r.read_u32()?;
        let mode = d.r.read_mapped_u8("infinity filter mode", &INFINITY_MODES)?;
        if id == 0 {
            continue;
        }
        let name = d.require_name(Kind::Item, id, "infinity filter")?;
        filters.push(json!({
            "name": name,
            "count": amount,
            "mode": mode,
            "index": slot + 1,
        }));
    }
    let remove_unfiltered = d.r.read_bool()?;

    let mut settings = serde_json::Map::new();
    settings.insert("remove_unfiltered_items".into(), Value::from(remove_unfiltered));
    if !filters.is_empty() {
        settings.insert("filters".into(), Value::Array(filters));
    }
    e.set("infinity_settings", Value::Object(settings));

    read_optional_connections(d, e)?;
    Ok(())
}

/// Roboport output signals are compared against the vanilla defaults and
/// suppressed when equal; an absent signal exports as a bare item type.
fn roboport_signal(e: &mut EntityBuf, key: &str, sig: DefaultedSignal) {
    match sig {
        DefaultedSignal::Default => {}
        DefaultedSignal::Absent => e.set_control(key, json!({ "type": "item" })),
        DefaultedSignal::Set(value) => e.set_control(key, value),
    }
}

pub fn roboport(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    read_optional_connections(d, e)?;

    let available_logistic = fields::read_defaulted_signal(d, "signal-X")?;
    let total_logistic = fields::read_defaulted_signal(d, "signal-Y")?;
    let available_construction = fields::read_defaulted_signal(d, "signal-Z")?;
    let total_construction = fields::read_defaulted_signal(d, "signal-T")?;
    roboport_signal(e, "available_logistic_output_signal", available_logistic);
    roboport_signal(e, "total_logistic_output_signal", total_logistic);
    roboport_signal(e, "available_construction_output_signal", available_construction);
    roboport_signal(e, "total_construction_output_signal", total_construction);

    let read_logistics = d.r.read_bool()?;
    let read_robot_stats = d.r.read_bool()?;
    if !read_logistics {
        e.set_control("read_logistics", Value::from(false));
    }
    if read_robot_stats {
        e.set_control("read_robot_stats", Value::from(true));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::writer::BinaryWriter;
    use crate::codec::{PrototypeIndex, Version};
    use serde_json::json;

    fn test_decoder(data: &[u8]) -> Decoder<'_> {
        let mut index = PrototypeIndex::new();
        index.add("item", 1, "iron-plate").unwrap();
        index.add("virtual-signal", 1, "signal-X").unwrap();
        index.add("virtual-signal", 2, "signal-Y").unwrap();
        index.add("virtual-signal", 3, "signal-Z").unwrap();
        index.add("virtual-signal", 4, "signal-T").unwrap();
        index.add("virtual-signal", 5, "signal-A").unwrap();
        let mut d = Decoder::new(data);
        d.set_global_index(index);
        d.set_version(Version::new(1, 1, 30, 0));
        d
    }

    fn buf() -> EntityBuf {
        EntityBuf { class: "x".into(), name: "x".into(), fields: Default::default() }
    }

    fn write_signal(w: &mut BinaryWriter, kind: u8, id: u16) {
        w.write_u8(kind);
        w.write_u16(id);
    }

    #[test]
    fn requester_chest_filters_and_buffers_flag() {
        let mut w = BinaryWriter::new();
        w.write_u8(2); // requester mode
        w.write_u8(0x03);
        w.write_u8(1);
        w.write_u16(1);
        w.write_u32(200);
        w.write_bool(true); // request_from_buffers
        w.write_bool(false); // no connections
        let data = w.into_vec();
        let mut d = test_decoder(&data);
        let mut e = buf();
        logistic_container(&mut d, &mut e).unwrap();
        assert_eq!(
            e.fields["request_filters"],
            json!([{ "index": 1, "name": "iron-plate", "count": 200 }])
        );
        assert_eq!(e.fields["request_from_buffers"], json!(true));
    }

    #[test]
    fn storage_chest_has_no_buffers_flag_before_1_1_19() {
        // Mode 1 (storage): the flag byte is absent pre-1.1.19.
        let mut w = BinaryWriter::new();
        w.write_u8(1);
        w.write_u8(0x03);
        w.write_u8(0); // no filters
        w.write_bool(false); // no connections
        let data = w.into_vec();
        let mut d = test_decoder(&data);
        d.set_version(Version::new(1, 1, 4, 0));
        let mut e = buf();
        logistic_container(&mut d, &mut e).unwrap();
        assert!(e.fields.get("request_from_buffers").is_none());
    }

    #[test]
    fn storage_chest_gains_buffers_flag_at_1_1_19() {
        let mut w = BinaryWriter::new();
        w.write_u8(1);
        w.write_u8(0x03);
        w.write_u8(0);
        w.write_bool(false); // request_from_buffers = false
        w.write_bool(false); // no connections
        let data = w.into_vec();
        let mut d = test_decoder(&data);
        let mut e = buf();
        logistic_container(&mut d, &mut e).unwrap();
        assert!(e.fields.get("request_from_buffers").is_none());
        assert!(d.r.is_empty());
    }

    #[test]
    fn logistic_mode_out_of_range_fails() {
        let mut w = BinaryWriter::new();
        w.write_u8(6);
        let data = w.into_vec();
        let mut d = test_decoder(&data);
        let mut e = buf();
        assert!(logistic_container(&mut d, &mut e).is_err());
    }

    #[test]
    fn infinity_container_settings() {
        let mut w = BinaryWriter::new();
        w.write_u8(2);
        w.write_u16(1);
        w.write_u32(50);
        w.write_u8(2); // exactly
        w.write_u16(0); // empty slot skipped
        w.write_u32(0);
        w.write_u8(0);
        w.write_bool(true);
        w.write_bool(false); // no connections
        let data = w.into_vec();
        let mut d = test_decoder(&data);
        let mut e = buf();
        infinity_container(&mut d, &mut e).unwrap();
        assert_eq!(
            e.fields["infinity_settings"],
            json!({
                "remove_unfiltered_items": true,
                "filters": [{ "name": "iron-plate", "count": 50, "mode": "exactly", "index": 1 }],
            })
        );
    }

    #[test]
    fn roboport_default_signals_are_suppressed() {
        let mut w = BinaryWriter::new();
        w.write_bool(false); // no connections
        write_signal(&mut w, 2, 1); // signal-X == default
        write_signal(&mut w, 2, 2); // signal-Y == default
        write_signal(&mut w, 2, 0); // absent -> {"type":"item"}
        write_signal(&mut w, 2, 5); // signal-A: custom
        w.write_bool(true); // read_logistics
        w.write_bool(false); // read_robot_stats
        let data = w.into_vec();
        let mut d = test_decoder(&data);
        let mut e = buf();
        roboport(&mut d, &mut e).unwrap();
        let cb = e.fields["control_behavior"].as_object().unwrap();
        assert!(cb.get("available_logistic_output_signal").is_none());
        assert!(cb.get("total_logistic_output_signal").is_none());
        assert_eq!(cb["available_construction_output_signal"], json!({ "type": "item" }));
        assert_eq!(
            cb["total_construction_output_signal"],
            json!({ "type": "virtual", "name": "signal-A" })
        );
        assert!(cb.get("read_logistics").is_none());
        assert!(cb.get("read_robot_stats").is_none());
    }

    #[test]
    fn linked_container_link_id() {
        let mut w = BinaryWriter::new();
        w.write_u32(9);
        let data = w.into_vec();
        let mut d = test_decoder(&data);
        let mut e = buf();
        linked_container(&mut d, &mut e).unwrap();
        assert_eq!(e.fields["link_id"], json!(9));
    }
}
