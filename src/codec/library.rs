//! Top-level decoder for `blueprint-storage.dat`.

use serde_json::{json, Map, Value};

use crate::codec::decoder::Decoder;
use crate::codec::index::PrototypeIndex;
use crate::codec::objects;
use crate::codec::version::Version;
use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Skip blueprints whose body fails to parse instead of aborting.
    pub skip_bad: bool,
    /// Surface migrations and the prototype table in the document.
    pub extended: bool,
}

/// Decoded library: the export document plus decode bookkeeping.
#[derive(Debug)]
pub struct Library {
    pub document: Value,
    pub version: Version,
    pub generation: u32,
    pub timestamp: u32,
    /// Blueprints dropped by skip-bad recovery.
    pub skipped: u32,
}

fn format_timestamp(timestamp: u32) -> String {
    match chrono::DateTime::from_timestamp(timestamp as i64, 0) {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => timestamp.to_string(),
    }
}

/// Decode a whole library file. The result is presented as a synthetic
/// blueprint book whose description records where and when the library
/// was saved.
pub fn decode_library(data: &[u8], filename: &str, options: &DecodeOptions) -> Result<Library> {
    let mut d = Decoder::new(data);
    d.skip_bad = options.skip_bad;

    let version = Version::read(&mut d.r)?;
    d.set_version(version);
    tracing::debug!(%version, "library version");
    d.r.expect(&[0x00], "library header pad")?;

    let migrations = objects::read_migrations(&mut d)?;
    let index = PrototypeIndex::read(&mut d.r)?;
    d.set_global_index(index);

    d.r.ignore(1, "library state")?;
    d.r.expect(&[0x00], "library index pad")?;
    let generation = d.r.read_u32()?;
    let timestamp = d.r.read_u32()?;
    d.r.expect(&[0x01], "library slots marker")?;

    let slots = objects::read_slots(&mut d)?;
    tracing::debug!(slots = slots.len(), skipped = d.skipped, "library decoded");

    let mut book = Map::new();
    book.insert(
        "description".into(),
        Value::from(format!(
            "{filename}, saved {}, generation {generation}",
            format_timestamp(timestamp)
        )),
    );
    book.insert("blueprints".into(), Value::Array(slots));
    book.insert("active_index".into(), Value::from(0));
    book.insert("item".into(), Value::from("blueprint-book"));
    book.insert("version".into(), Value::from(version.as_u64()));

    let mut document = Map::new();
    document.insert("blueprint_book".into(), Value::Object(book));
    if options.extended {
        let migrations: Vec<Value> = migrations
            .into_iter()
            .map(|(mod_name, migration_file)| {
                json!({ "mod_name": mod_name, "migration_file": migration_file })
            })
            .collect();
        document.insert("migrations".into(), Value::Array(migrations));
        document.insert("prototype_index".into(), d.global_index().to_value());
    }

    Ok(Library {
        document: Value::Object(document),
        version,
        generation,
        timestamp,
        skipped: d.skipped,
    })
}
