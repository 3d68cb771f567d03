//! Electric poles, lamps, combinators, power switches and speakers.

use serde_json::{json, Map, Value};

use crate::codec::decoder::Decoder;
use crate::codec::fields::{self, ARITHMETIC_OPS, COMPARATORS};
use crate::codec::version::{V_1_1_0_0, V_1_1_4_0};
use crate::error::Result;

use super::{
    read_circuit_condition_block, read_direction, read_logistic_condition_block,
    read_optional_connections, EntityBuf,
};

const MAX_POLE_NEIGHBOURS: usize = 5;

pub fn electric_pole(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    if d.version() >= V_1_1_0_0 {
        // Zero-terminated raw-id list, capped at five entries.
        let mut neighbours = Vec::new();
        while neighbours.len() < MAX_POLE_NEIGHBOURS {
            let id = d.r.read_u32()?;
            if id == 0 {
                break;
            }
            neighbours.push(Value::from(id));
        }
        if !neighbours.is_empty() {
            e.set("neighbours", Value::Array(neighbours));
        }
    } else {
        d.r.expect(&[0x00; 4], "electric pole pad")?;
    }
    read_optional_connections(d, e)?;
    Ok(())
}

pub fn lamp(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    read_circuit_condition_block(d, e)?;
    if d.r.read_bool()? {
        e.set_control("use_colors", Value::from(true));
    }
    Ok(())
}

fn signal_or_constant(cond: &mut Map<String, Value>, prefix: &str, signal: Option<Value>, constant: i32, use_constant: bool) {
    if use_constant {
        cond.insert(format!("{prefix}_constant"), Value::from(constant));
    } else if let Some(signal) = signal {
        cond.insert(format!("{prefix}_signal"), signal);
    }
}

pub fn arithmetic_combinator(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    read_direction(d, e)?;
    if let Some(block) = fields::read_circuit_connections(d)? {
        e.set_connections("1", block);
    }
    if let Some(block) = fields::read_circuit_connections(d)? {
        e.set_connections("2", block);
    }

    let first_signal = fields::read_signal(d)?;
    let second_signal = fields::read_signal(d)?;
    let output_signal = fields::read_signal(d)?;
    let first_constant = d.r.read_i32()?;
    let first_use_constant = d.r.read_bool()?;
    let second_constant = d.r.read_i32()?;
    let second_use_constant = d.r.read_bool()?;
    let operation = d.r.read_mapped_u8("arithmetic operation", &ARITHMETIC_OPS)?;

    let mut cond = Map::new();
    signal_or_constant(&mut cond, "first", first_signal, first_constant, first_use_constant);
    signal_or_constant(&mut cond, "second", second_signal, second_constant, second_use_constant);
    cond.insert("operation".into(), Value::from(operation));
    if let Some(output) = output_signal {
        cond.insert("output_signal".into(), output);
    }
    e.set_control("arithmetic_conditions", Value::Object(cond));
    Ok(())
}

pub fn decider_combinator(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    read_direction(d, e)?;
    if let Some(block) = fields::read_circuit_connections(d)? {
        e.set_connections("1", block);
    }
    if let Some(block) = fields::read_circuit_connections(d)? {
        e.set_connections("2", block);
    }

    let first_signal = fields::read_signal(d)?;
    let second_signal = fields::read_signal(d)?;
    let output_signal = fields::read_signal(d)?;
    let constant = d.r.read_i32()?;
    let comparator = d.r.read_mapped_u8("comparator", &COMPARATORS)?;
    let use_constant = d.r.read_bool()?;
    let copy_count = d.r.read_bool()?;

    let mut cond = Map::new();
    if let Some(first) = first_signal {
        cond.insert("first_signal".into(), first);
    }
    if use_constant || second_signal.is_none() {
        cond.insert("constant".into(), Value::from(constant));
    } else if let Some(second) = second_signal {
        cond.insert("second_signal".into(), second);
    }
    cond.insert("comparator".into(), Value::from(comparator));
    if let Some(output) = output_signal {
        cond.insert("output_signal".into(), output);
    }
    if !copy_count {
        cond.insert("copy_count_from_input".into(), Value::from(false));
    }
    e.set_control("decider_conditions", Value::Object(cond));
    Ok(())
}

pub fn constant_combinator(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    read_direction(d, e)?;
    read_optional_connections(d, e)?;

    let count = d.r.read_count32()?;
    let mut filters = Vec::new();
    for slot in 0..count {
        let signal = fields::read_signal(d)?;
        let amount = d.r.read_i32()?;
        let Some(signal) = signal else { continue };
        filters.push(json!({ "signal": signal, "count": amount, "index": slot + 1 }));
    }
    if !filters.is_empty() {
        e.set_control("filters", Value::Array(filters));
    }
    let is_on = d.r.read_bool()?;
    if !is_on {
        e.set_control("is_on", Value::from(false));
    }
    Ok(())
}

pub fn power_switch(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    read_logistic_condition_block(d, e)?;
    if d.version() >= V_1_1_4_0 {
        let state = d.r.read_bool()?;
        e.set("switch_state", Value::from(state));
    } else {
        d.r.expect(&[0x00], "power switch state pad")?;
    }
    Ok(())
}

pub fn programmable_speaker(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    read_circuit_condition_block(d, e)?;

    let volume = d.r.read_f64()?;
    let globally = d.r.read_bool()?;
    let polyphony = d.r.read_bool()?;
    e.set(
        "parameters",
        json!({
            "playback_volume": volume,
            "playback_globally": globally,
            "allow_polyphony": polyphony,
        }),
    );

    let show_alert = d.r.read_bool()?;
    let show_on_map = d.r.read_bool()?;
    let icon = fields::read_signal(d)?;
    let message = d.r.read_string()?;
    let mut alert = Map::new();
    alert.insert("show_alert".into(), Value::from(show_alert));
    alert.insert("show_on_map".into(), Value::from(show_on_map));
    if let Some(icon) = icon {
        alert.insert("icon_signal_id".into(), icon);
    }
    if !message.is_empty() {
        alert.insert("alert_message".into(), Value::from(message));
    }
    e.set("alert_parameters", Value::Object(alert));

    let is_pitch = d.r.read_bool()?;
    let instrument = d.r.read_u32()?;
    let note = d.r.read_u32()?;
    e.set_control(
        "circuit_parameters",
        json!({
            "signal_value_is_pitch": is_pitch,
            "instrument_id": instrument,
            "note_id": note,
        }),
    );
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
        index.add("virtual-signal", 1, "signal-A").unwrap();
        index.add("virtual-signal", 2, "signal-each").unwrap();
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

    fn write_empty_connections(w: &mut BinaryWriter) {
        w.write_u8(0);
        w.write_u8(0);
        w.write_bytes(&[0; 9]);
    }

    #[test]
    fn pole_neighbours_stop_at_zero() {
        let mut w = BinaryWriter::new();
        w.write_u32(3);
        w.write_u32(9);
        w.write_u32(0); // terminator
        w.write_bool(false); // no connections
        let data = w.into_vec();
        let mut d = test_decoder(&data);
        let mut e = buf();
        electric_pole(&mut d, &mut e).unwrap();
        assert_eq!(e.fields["neighbours"], json!([3, 9]));
        assert!(d.r.is_empty());
    }

    #[test]
    fn pole_neighbours_stop_at_cap_without_terminator() {
        let mut w = BinaryWriter::new();
        for id in 1..=5u32 {
            w.write_u32(id);
        }
        w.write_bool(false);
        let data = w.into_vec();
        let mut d = test_decoder(&data);
        let mut e = buf();
        electric_pole(&mut d, &mut e).unwrap();
        assert_eq!(e.fields["neighbours"], json!([1, 2, 3, 4, 5]));
        assert!(d.r.is_empty());
    }

    #[test]
    fn pre_1_1_pole_expects_zero_pad() {
        let mut w = BinaryWriter::new();
        w.write_bytes(&[0x00; 4]);
        w.write_bool(false);
        let data = w.into_vec();
        let mut d = test_decoder(&data);
        d.set_version(Version::new(1, 0, 17, 0));
        let mut e = buf();
        electric_pole(&mut d, &mut e).unwrap();
        assert!(e.fields.get("neighbours").is_none());
    }

    #[test]
    fn arithmetic_combinator_each_times_two() {
        let mut w = BinaryWriter::new();
        w.write_u8(2); // direction
        write_empty_connections(&mut w); // circuit 1
        write_empty_connections(&mut w); // circuit 2
        write_signal(&mut w, 2, 2); // first: signal-each
        write_signal(&mut w, 0, 0); // second: absent
        write_signal(&mut w, 2, 2); // output: signal-each
        w.write_i32(0);
        w.write_bool(false); // first is the signal
        w.write_i32(2);
        w.write_bool(true); // second is the constant
        w.write_u8(0); // "*"
        let data = w.into_vec();
        let mut d = test_decoder(&data);
        let mut e = buf();
        arithmetic_combinator(&mut d, &mut e).unwrap();
        assert_eq!(
            e.fields["control_behavior"]["arithmetic_conditions"],
            json!({
                "first_signal": { "type": "virtual", "name": "signal-each" },
                "second_constant": 2,
                "operation": "*",
                "output_signal": { "type": "virtual", "name": "signal-each" },
            })
        );
    }

    #[test]
    fn decider_copy_count_false_is_explicit() {
        let mut w = BinaryWriter::new();
        w.write_u8(0);
        write_empty_connections(&mut w);
        write_empty_connections(&mut w);
        write_signal(&mut w, 0, 1); // first: iron-plate
        write_signal(&mut w, 0, 0);
        write_signal(&mut w, 2, 1); // output: signal-A
        w.write_i32(10);
        w.write_u8(0); // ">"
        w.write_bool(true);
        w.write_bool(false); // copy_count_from_input = false
        let data = w.into_vec();
        let mut d = test_decoder(&data);
        let mut e = buf();
        decider_combinator(&mut d, &mut e).unwrap();
        let cond = &e.fields["control_behavior"]["decider_conditions"];
        assert_eq!(cond["constant"], json!(10));
        assert_eq!(cond["comparator"], json!(">"));
        assert_eq!(cond["copy_count_from_input"], json!(false));
    }

    #[test]
    fn constant_combinator_slots_and_is_on() {
        let mut w = BinaryWriter::new();
        w.write_u8(0);
        w.write_bool(false); // no connections
        w.write_u32(2);
        write_signal(&mut w, 0, 1);
        w.write_i32(100);
        write_signal(&mut w, 0, 0); // absent slot dropped
        w.write_i32(7);
        w.write_bool(false); // switched off
        let data = w.into_vec();
        let mut d = test_decoder(&data);
        let mut e = buf();
        constant_combinator(&mut d, &mut e).unwrap();
        let cb = e.fields["control_behavior"].as_object().unwrap();
        assert_eq!(
            cb["filters"],
            json!([{ "signal": { "type": "item", "name": "iron-plate" }, "count": 100, "index": 1 }])
        );
        assert_eq!(cb["is_on"], json!(false));
    }

    #[test]
    fn constant_combinator_on_state_is_implicit() {
        let mut w = BinaryWriter::new();
        w.write_u8(0);
        w.write_bool(false);
        w.write_u32(0);
        w.write_bool(true);
        let data = w.into_vec();
        let mut d = test_decoder(&data);
        let mut e = buf();
        constant_combinator(&mut d, &mut e).unwrap();
        assert!(e.fields.get("control_behavior").is_none());
    }

    #[test]
    fn power_switch_state_is_gated() {
        let mut w = BinaryWriter::new();
        w.write_bool(false); // no circuit block
        w.write_bool(true); // explicit state
        let data = w.into_vec();
        let mut d = test_decoder(&data);
        let mut e = buf();
        power_switch(&mut d, &mut e).unwrap();
        assert_eq!(e.fields["switch_state"], json!(true));

        let mut w = BinaryWriter::new();
        w.write_bool(false);
        w.write_u8(0x00); // pre-1.1.4 pad
        let data = w.into_vec();
        let mut d = test_decoder(&data);
        d.set_version(Version::new(1, 1, 3, 0));
        let mut e = buf();
        power_switch(&mut d, &mut e).unwrap();
        assert!(e.fields.get("switch_state").is_none());
    }

    #[test]
    fn speaker_parameters() {
        let mut w = BinaryWriter::new();
        w.write_bool(false); // no circuit block
        w.write_f64(0.75);
        w.write_bool(true);
        w.write_bool(false);
        w.write_bool(true); // show_alert
        w.write_bool(true); // show_on_map
        write_signal(&mut w, 2, 1);
        w.write_string("boiler low");
        w.write_bool(true); // pitch
        w.write_u32(3);
        w.write_u32(14);
        let data = w.into_vec();
        let mut d = test_decoder(&data);
        let mut e = buf();
        programmable_speaker(&mut d, &mut e).unwrap();
        assert_eq!(e.fields["parameters"]["playback_volume"], json!(0.75));
        assert_eq!(e.fields["alert_parameters"]["alert_message"], json!("boiler low"));
        assert_eq!(
            e.fields["control_behavior"]["circuit_parameters"]["instrument_id"],
            json!(3)
        );
    }
}
