//! Walls, gates, turrets and radar.

use serde_json::Value;

use crate::codec::decoder::Decoder;
use crate::error::Result;

use super::{read_circuit_condition_block, read_direction, EntityBuf};

pub fn wall(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    read_circuit_condition_block(d, e)?;
    Ok(())
}

pub fn gate(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    read_direction(d, e)
}

pub fn land_mine(_d: &mut Decoder, _e: &mut EntityBuf) -> Result<()> {
    Ok(())
}

pub fn radar(_d: &mut Decoder, _e: &mut EntityBuf) -> Result<()> {
    Ok(())
}

/// Turrets store direction and orientation redundantly. Direction 8 is
/// the north-pinned sentinel: the real heading lives in the orientation,
/// which maps back to eighths. Orientation never survives to the output.
pub fn turret(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    let direction = d.r.read_u8()?;
    let orientation = d.r.read_f32()?;
    let effective = if direction == 8 {
        (8.0 * orientation as f64).floor() as u8
    } else {
        direction
    };
    if effective != 0 {
        e.set("direction", Value::from(effective));
    }
    Ok(())
}

pub fn artillery_turret(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    turret(d, e)?;
    super::trains::artillery_literals(d)
}
