//! Fluid handling, mining and crafting entities.

use serde_json::{json, Value};

use crate::codec::decoder::Decoder;
use crate::codec::index::Kind;
use crate::error::Result;

use super::{
    read_circuit_condition_block, read_direction, read_logistic_condition_block, EntityBuf,
};

pub use super::power::{directional, empty_body};

pub fn pump(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    read_direction(d, e)?;
    read_circuit_condition_block(d, e)?;
    Ok(())
}

pub fn mining_drill(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    read_direction(d, e)?;
    read_logistic_condition_block(d, e)?;
    Ok(())
}

pub fn offshore_pump(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    read_direction(d, e)?;
    read_logistic_condition_block(d, e)?;
    Ok(())
}

pub fn assembling_machine(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    read_direction(d, e)?;
    let recipe_id = d.r.read_u16()?;
    if recipe_id != 0 {
        let name = d.require_name(Kind::Recipe, recipe_id, "recipe")?;
        e.set("recipe", Value::from(name));
    }
    Ok(())
}

const INFINITY_PIPE_MODES: [&str; 5] = ["at-least", "at-most", "exactly", "add", "remove"];

pub fn infinity_pipe(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    let fluid_id = d.r.read_u16()?;
    let percentage = d.r.read_f64()?;
    let mode = d.r.read_mapped_u8("infinity pipe mode", &INFINITY_PIPE_MODES)?;
    let temperature = d.r.read_f64()?;
    if fluid_id != 0 {
        let name = d.require_name(Kind::Fluid, fluid_id, "infinity pipe fluid")?;
        e.set(
            "infinity_settings",
            json!({
                "name": name,
                "percentage": percentage,
                "mode": mode,
                "temperature": temperature,
            }),
        );
    }
    Ok(())
}

pub fn rocket_silo(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    if d.r.read_bool()? {
        e.set("auto_launch", Value::from(true));
    }
    Ok(())
}
