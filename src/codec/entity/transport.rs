//! Belts, splitters, loaders and inserters.

use serde_json::Value;

use crate::codec::decoder::Decoder;
use crate::codec::fields;
use crate::codec::index::Kind;
use crate::error::{ParseError, Result};

use super::{read_circuit_condition_block, read_direction, EntityBuf};

pub fn transport_belt(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    read_direction(d, e)?;
    read_circuit_condition_block(d, e)?;
    Ok(())
}

const BELT_IO_TYPES: [&str; 2] = ["input", "output"];

pub fn underground_belt(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    read_direction(d, e)?;
    let io = d.r.read_mapped_u8("underground belt type", &BELT_IO_TYPES)?;
    e.set("type", Value::from(io));
    Ok(())
}

/// Splitter priority byte. Only these nine code points are legal; the
/// side bits mean "left" when set.
fn splitter_priorities(code: u8) -> Option<(Option<&'static str>, Option<&'static str>)> {
    match code {
        0x00 => Some((None, None)),
        0x10 => Some((Some("right"), None)),
        0x13 => Some((Some("left"), None)),
        0x20 => Some((None, Some("right"))),
        0x2C => Some((None, Some("left"))),
        0x30 => Some((Some("right"), Some("right"))),
        0x33 => Some((Some("left"), Some("right"))),
        0x3C => Some((Some("right"), Some("left"))),
        0x3F => Some((Some("left"), Some("left"))),
        _ => None,
    }
}

pub fn splitter(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    read_direction(d, e)?;
    let at = d.r.position();
    let code = d.r.read_u8()?;
    let (input, output) = splitter_priorities(code)
        .ok_or_else(|| ParseError::new(at, format!("invalid splitter priority byte {code:#04x}")))?;
    if let Some(side) = input {
        e.set("input_priority", Value::from(side));
    }
    if let Some(side) = output {
        e.set("output_priority", Value::from(side));
    }
    let filter_id = d.r.read_u16()?;
    if filter_id != 0 {
        let name = d.require_name(Kind::Item, filter_id, "splitter filter")?;
        e.set("filter", Value::from(name));
    }
    Ok(())
}

pub fn loader(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    read_direction(d, e)?;
    let io = d.r.read_mapped_u8("loader type", &BELT_IO_TYPES)?;
    e.set("type", Value::from(io));
    if let Some(filters) = fields::read_filters(d)? {
        e.set("filters", filters);
    }
    Ok(())
}

pub fn inserter(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    read_direction(d, e)?;

    let at = d.r.position();
    let flags = d.r.read_u8()?;
    if flags & 0x04 == 0 || flags & !0x07 != 0 {
        return Err(ParseError::new(at, format!("invalid inserter flag byte {flags:#04x}")));
    }
    let override_stack_size = flags & 0x01 != 0;
    let whitelist = flags & 0x02 != 0;

    if override_stack_size {
        let stack = d.r.read_u8()?;
        e.set("override_stack_size", Value::from(stack));
    }

    let filters = fields::read_filters(d)?;
    if let Some(filters) = filters {
        e.set("filters", filters);
        if !whitelist {
            e.set("filter_mode", Value::from("blacklist"));
        }
    }

    read_circuit_condition_block(d, e)?;
    Ok(())
}

pub fn linked_belt(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    read_direction(d, e)?;
    let io = d.r.read_mapped_u8("linked belt type", &BELT_IO_TYPES)?;
    e.set("type", Value::from(io));
    let link = d.r.read_u32()?;
    if link != 0 {
        e.set("belt_link", Value::from(link));
    }
    Ok(())
}
