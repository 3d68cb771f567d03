//! Power production and heat entities.

use serde_json::{json, Value};

use crate::codec::decoder::Decoder;
use crate::codec::fields::{self, DefaultedSignal};
use crate::error::Result;

use super::{read_direction, read_optional_connections, EntityBuf};

/// Shared body for entities that store nothing beyond the envelope.
pub fn empty_body(_d: &mut Decoder, _e: &mut EntityBuf) -> Result<()> {
    Ok(())
}

/// Shared body for entities that only store a direction.
pub fn directional(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    read_direction(d, e)
}

pub fn accumulator(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    read_optional_connections(d, e)?;
    if let DefaultedSignal::Set(signal) = fields::read_defaulted_signal(d, "signal-A")? {
        e.set_control("output_signal", signal);
    }
    Ok(())
}

pub fn electric_energy_interface(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    let production = d.r.read_f64()?;
    let usage = d.r.read_f64()?;
    let buffer = d.r.read_f64()?;
    e.set("power_production", Value::from(production));
    e.set("power_usage", Value::from(usage));
    e.set("buffer_size", Value::from(buffer));
    Ok(())
}

const HEAT_MODES: [&str; 5] = ["at-least", "at-most", "exactly", "add", "remove"];

pub fn heat_interface(d: &mut Decoder, e: &mut EntityBuf) -> Result<()> {
    let temperature = d.r.read_f64()?;
    let mode = d.r.read_mapped_u8("heat interface mode", &HEAT_MODES)?;
    e.set("temperature", Value::from(temperature));
    e.set("mode", json!(mode));
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
        index.add("virtual-signal", 1, "signal-A").unwrap();
        index.add("virtual-signal", 2, "signal-B").unwrap();
        let mut d = Decoder::new(data);
        d.set_global_index(index);
        d.set_version(Version::new(1, 1, 30, 0));
        d
    }

    fn buf() -> EntityBuf {
        EntityBuf { class: "x".into(), name: "x".into(), fields: Default::default() }
    }

    #[test]
    fn accumulator_default_output_signal_suppressed() {
        let mut w = BinaryWriter::new();
        w.write_bool(false);
        w.write_u8(2);
        w.write_u16(1); // signal-A, the default
        let data = w.into_vec();
        let mut d = test_decoder(&data);
        let mut e = buf();
        accumulator(&mut d, &mut e).unwrap();
        assert!(e.fields.get("control_behavior").is_none());

        let mut w = BinaryWriter::new();
        w.write_bool(false);
        w.write_u8(2);
        w.write_u16(2); // signal-B
        let data = w.into_vec();
        let mut d = test_decoder(&data);
        let mut e = buf();
        accumulator(&mut d, &mut e).unwrap();
        assert_eq!(
            e.fields["control_behavior"]["output_signal"]["name"],
            json!("signal-B")
        );
    }

    #[test]
    fn energy_interface_settings() {
        let mut w = BinaryWriter::new();
        w.write_f64(1000.0);
        w.write_f64(0.0);
        w.write_f64(5000.0);
        let data = w.into_vec();
        let mut d = test_decoder(&data);
        let mut e = buf();
        electric_energy_interface(&mut d, &mut e).unwrap();
        assert_eq!(e.fields["power_production"], json!(1000.0));
        assert_eq!(e.fields["buffer_size"], json!(5000.0));
    }

    #[test]
    fn heat_interface_mode_table() {
        let mut w = BinaryWriter::new();
        w.write_f64(250.0);
        w.write_u8(3); // add
        let data = w.into_vec();
        let mut d = test_decoder(&data);
        let mut e = buf();
        heat_interface(&mut d, &mut e).unwrap();
        assert_eq!(e.fields["mode"], json!("add"));

        let mut w = BinaryWriter::new();
        w.write_f64(0.0);
        w.write_u8(5); // out of table
        let data = w.into_vec();
        let mut d = test_decoder(&data);
        let mut e = buf();
        assert!(heat_interface(&mut d, &mut e).is_err());
    }
}
