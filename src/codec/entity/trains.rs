//! Rails, rail signals, train stops and rolling stock.

use serde_json::Value;

use crate::codec::decoder::Decoder;
use crate::codec::fields::{self, DefaultedSignal};
use crate::codec::version::STABLE_V_1_1;
use crate::error::Result;

use super::{read_direction, read_optional_connections, EntityBuf};

pub fn rail(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    read_direction(d, e)?;
    Ok(())
}

/// Rolling stock always exports its orientation, even due north.
fn read_orientation(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    let orientation = d.r.read_f32()?;
    e.set("orientation", Value::from(orientation as f64));
    Ok(())
}

pub fn locomotive(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    read_orientation(d, e)?;
    if let Some(color) = fields::read_optional_color(d)? {
        e.set("color", color);
    }
    Ok(())
}

pub fn cargo_wagon(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    read_orientation(d, e)?;
    let bar = d.r.read_u16()?;
    let filters = fields::read_filters(d)?;
    let mut inventory = serde_json::Map::new();
    if let Some(filters) = filters {
        inventory.insert("filters".into(), filters);
    }
    if bar != 0xFFFF {
        inventory.insert("bar".into(), Value::from(bar));
    }
    if !inventory.is_empty() {
        e.set("inventory", Value::Object(inventory));
    }
    Ok(())
}

pub fn fluid_wagon(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    read_orientation(d, e)?;
    Ok(())
}

/// The artillery wagon body is a run of sentinel literals; they carry no
/// exported state but pin the format version.
pub fn artillery_wagon(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    read_orientation(d, e)?;
    artillery_literals(d)
}

pub(super) fn artillery_literals(d: &mut Decoder) -> Result<()> {
    d.r.expect(&[0xFF, 0x7F], "artillery sentinel")?;
    d.r.expect(&[0xFF, 0xFF, 0xFF, 0x7F], "artillery sentinel")?;
    d.r.expect(&[0x00; 5], "artillery pad")?;
    Ok(())
}

pub fn train_stop(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    read_direction(d, e)?;
    let station = d.r.read_string()?;
    e.set("station", Value::from(station));
    if let Some(color) = fields::read_optional_color(d)? {
        e.set("color", color);
    }
    read_optional_connections(d, e)?;

    if d.version() >= STABLE_V_1_1 {
        let set_trains_limit = d.r.read_bool()?;
        let read_trains_count = d.r.read_bool()?;
        if set_trains_limit {
            e.set_control("set_trains_limit", Value::from(true));
        }
        if read_trains_count {
            e.set_control("read_trains_count", Value::from(true));
        }
        let manual_limit = d.r.read_u32()?;
        if manual_limit != u32::MAX {
            e.set("manual_trains_limit", Value::from(manual_limit));
        }
    }
    Ok(())
}

fn colour_signal(e: &mut EntityBuf, key: &str, sig: DefaultedSignal) {
    if let DefaultedSignal::Set(value) = sig {
        e.set_control(key, value);
    }
}

pub fn rail_signal(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    read_direction(d, e)?;
    read_optional_connections(d, e)?;
    let red = fields::read_defaulted_signal(d, "signal-red")?;
    let yellow = fields::read_defaulted_signal(d, "signal-yellow")?;
    let green = fields::read_defaulted_signal(d, "signal-green")?;
    colour_signal(e, "red_output_signal", red);
    colour_signal(e, "orange_output_signal", yellow);
    colour_signal(e, "green_output_signal", green);
    Ok(())
}

pub fn rail_chain_signal(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    read_direction(d, e)?;
    if d.version() >= STABLE_V_1_1 {
        d.r.ignore(1, "rail chain signal flag")?;
    }
    read_optional_connections(d, e)?;
    let red = fields::read_defaulted_signal(d, "signal-red")?;
    let yellow = fields::read_defaulted_signal(d, "signal-yellow")?;
    let green = fields::read_defaulted_signal(d, "signal-green")?;
    let blue = fields::read_defaulted_signal(d, "signal-blue")?;
    colour_signal(e, "red_output_signal", red);
    colour_signal(e, "orange_output_signal", yellow);
    colour_signal(e, "green_output_signal", green);
    colour_signal(e, "blue_output_signal", blue);
    Ok(())
}
