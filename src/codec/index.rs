use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::codec::BinaryReader;
use crate::error::Result;

/// Coarse bucket over prototype classes. Each kind has its own ID space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Item,
    Fluid,
    VirtualSignal,
    Tile,
    Entity,
    Recipe,
}

impl Kind {
    pub const ALL: [Kind; 6] = [
        Kind::Item,
        Kind::Fluid,
        Kind::VirtualSignal,
        Kind::Tile,
        Kind::Entity,
        Kind::Recipe,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Kind::Item => "item",
            Kind::Fluid => "fluid",
            Kind::VirtualSignal => "virtual-signal",
            Kind::Tile => "tile",
            Kind::Entity => "entity",
            Kind::Recipe => "recipe",
        }
    }
}

/// Fixed prototype-class → kind classification table. Covers the vanilla
/// classes; anything outside it is a parse error. "flying-text" classifies
/// as an entity so placeholder names for removed-mod entities resolve.
static CLASS_KINDS: &[(&str, Kind)] = &[
    // items
    ("ammo", Kind::Item),
    ("armor", Kind::Item),
    ("blueprint", Kind::Item),
    ("blueprint-book", Kind::Item),
    ("capsule", Kind::Item),
    ("copy-paste-tool", Kind::Item),
    ("deconstruction-item", Kind::Item),
    ("gun", Kind::Item),
    ("item", Kind::Item),
    ("item-with-entity-data", Kind::Item),
    ("item-with-inventory", Kind::Item),
    ("item-with-label", Kind::Item),
    ("item-with-tags", Kind::Item),
    ("mining-tool", Kind::Item),
    ("module", Kind::Item),
    ("rail-planner", Kind::Item),
    ("repair-tool", Kind::Item),
    ("selection-tool", Kind::Item),
    ("spidertron-remote", Kind::Item),
    ("tool", Kind::Item),
    ("upgrade-item", Kind::Item),
    // fluids / signals / tiles / recipes
    ("fluid", Kind::Fluid),
    ("virtual-signal", Kind::VirtualSignal),
    ("tile", Kind::Tile),
    ("recipe", Kind::Recipe),
    // entities
    ("accumulator", Kind::Entity),
    ("ammo-turret", Kind::Entity),
    ("arithmetic-combinator", Kind::Entity),
    ("artillery-turret", Kind::Entity),
    ("artillery-wagon", Kind::Entity),
    ("assembling-machine", Kind::Entity),
    ("beacon", Kind::Entity),
    ("boiler", Kind::Entity),
    ("burner-generator", Kind::Entity),
    ("cargo-wagon", Kind::Entity),
    ("constant-combinator", Kind::Entity),
    ("container", Kind::Entity),
    ("curved-rail", Kind::Entity),
    ("decider-combinator", Kind::Entity),
    ("electric-energy-interface", Kind::Entity),
    ("electric-pole", Kind::Entity),
    ("electric-turret", Kind::Entity),
    ("fluid-turret", Kind::Entity),
    ("fluid-wagon", Kind::Entity),
    ("flying-text", Kind::Entity),
    ("furnace", Kind::Entity),
    ("gate", Kind::Entity),
    ("generator", Kind::Entity),
    ("heat-interface", Kind::Entity),
    ("heat-pipe", Kind::Entity),
    ("infinity-container", Kind::Entity),
    ("infinity-pipe", Kind::Entity),
    ("inserter", Kind::Entity),
    ("lab", Kind::Entity),
    ("lamp", Kind::Entity),
    ("land-mine", Kind::Entity),
    ("linked-belt", Kind::Entity),
    ("linked-container", Kind::Entity),
    ("loader", Kind::Entity),
    ("loader-1x1", Kind::Entity),
    ("locomotive", Kind::Entity),
    ("logistic-container", Kind::Entity),
    ("mining-drill", Kind::Entity),
    ("offshore-pump", Kind::Entity),
    ("pipe", Kind::Entity),
    ("pipe-to-ground", Kind::Entity),
    ("power-switch", Kind::Entity),
    ("programmable-speaker", Kind::Entity),
    ("pump", Kind::Entity),
    ("radar", Kind::Entity),
    ("rail-chain-signal", Kind::Entity),
    ("rail-signal", Kind::Entity),
    ("reactor", Kind::Entity),
    ("roboport", Kind::Entity),
    ("rocket-silo", Kind::Entity),
    ("solar-panel", Kind::Entity),
    ("splitter", Kind::Entity),
    ("storage-tank", Kind::Entity),
    ("straight-rail", Kind::Entity),
    ("train-stop", Kind::Entity),
    ("transport-belt", Kind::Entity),
    ("underground-belt", Kind::Entity),
    ("wall", Kind::Entity),
];

/// Classify a prototype-class string into its kind.
pub fn classify(class: &str) -> Option<Kind> {
    CLASS_KINDS
        .iter()
        .find(|(name, _)| *name == class)
        .map(|(_, kind)| *kind)
}

#[derive(Debug, Clone)]
pub struct Prototype {
    pub class: String,
    pub name: String,
}

/// ID → prototype maps, one ID space per kind. Built once from the file's
/// embedded prototype table (or a blueprint's local sidecar table) and
/// read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct PrototypeIndex {
    tables: HashMap<Kind, HashMap<u16, Prototype>>,
}

impl PrototypeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an ID. ID 0 is reserved for "absent"; IDs are unique
    /// within a kind; the class must be in the classification table.
    pub fn add(&mut self, class: &str, id: u16, name: &str) -> std::result::Result<(), String> {
        let kind = classify(class).ok_or_else(|| format!("unknown prototype class {class:?}"))?;
        if id == 0 {
            return Err(format!("prototype id 0 is reserved ({class} {name:?})"));
        }
        let table = self.tables.entry(kind).or_default();
        if let Some(existing) = table.get(&id) {
            return Err(format!(
                "duplicate {} id {id}: {:?} vs {name:?}",
                kind.label(),
                existing.name
            ));
        }
        table.insert(id, Prototype { class: class.to_string(), name: name.to_string() });
        Ok(())
    }

    pub fn get(&self, kind: Kind, id: u16) -> Option<&Prototype> {
        self.tables.get(&kind)?.get(&id)
    }

    pub fn name(&self, kind: Kind, id: u16) -> Option<&str> {
        self.get(kind, id).map(|p| p.name.as_str())
    }

    /// Parse the embedded prototype table.
    ///
    /// Per-class framing is asymmetric and must stay that way: the "tile"
    /// class uses a 1-byte count with 1-byte IDs, every other class carries
    /// a literal 0x00 followed by a 2-byte count with 2-byte IDs.
    pub fn read(r: &mut BinaryReader) -> Result<Self> {
        let mut index = Self::new();
        let class_count = r.read_count16()?;
        for _ in 0..class_count {
            let class = r.read_string()?;
            if class == "tile" {
                let count = r.read_count8()?;
                for _ in 0..count {
                    let id = r.read_u8()? as u16;
                    let at = r.position();
                    let name = r.read_string()?;
                    index
                        .add(&class, id, &name)
                        .map_err(|m| crate::error::ParseError::new(at, m))?;
                }
            } else {
                r.expect(&[0x00], "prototype class pad")?;
                let count = r.read_count16()?;
                for _ in 0..count {
                    let id = r.read_u16()?;
                    let at = r.position();
                    let name = r.read_string()?;
                    index
                        .add(&class, id, &name)
                        .map_err(|m| crate::error::ParseError::new(at, m))?;
                }
            }
        }
        Ok(index)
    }

    /// Extended-output dump: kind → id → "class/name".
    pub fn to_value(&self) -> Value {
        let mut doc = Map::new();
        for kind in Kind::ALL {
            let Some(table) = self.tables.get(&kind) else { continue };
            let mut ids: Vec<_> = table.iter().collect();
            ids.sort_by_key(|(id, _)| **id);
            let mut entries = Map::new();
            for (id, proto) in ids {
                entries.insert(id.to_string(), Value::String(format!("{}/{}", proto.class, proto.name)));
            }
            doc.insert(kind.label().to_string(), Value::Object(entries));
        }
        Value::Object(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::BinaryWriter;

    fn write_entity_class(w: &mut BinaryWriter, class: &str, entries: &[(u16, &str)]) {
        w.write_string(class);
        w.write_u8(0x00);
        w.write_u16(entries.len() as u16);
        for (id, name) in entries {
            w.write_u16(*id);
            w.write_string(name);
        }
    }

    #[test]
    fn classify_covers_the_special_cases() {
        assert_eq!(classify("tile"), Some(Kind::Tile));
        assert_eq!(classify("flying-text"), Some(Kind::Entity));
        assert_eq!(classify("virtual-signal"), Some(Kind::VirtualSignal));
        assert_eq!(classify("spaceship"), None);
    }

    #[test]
    fn tile_branch_uses_one_byte_ids() {
        let mut w = BinaryWriter::new();
        w.write_u16(2);
        w.write_string("tile");
        w.write_u8(1);
        w.write_u8(7);
        w.write_string("stone-path");
        write_entity_class(&mut w, "container", &[(0x0102, "iron-chest")]);

        let data = w.into_vec();
        let index = PrototypeIndex::read(&mut BinaryReader::new(&data)).unwrap();
        assert_eq!(index.name(Kind::Tile, 7), Some("stone-path"));
        assert_eq!(index.name(Kind::Entity, 0x0102), Some("iron-chest"));
        assert_eq!(index.name(Kind::Entity, 1), None);
    }

    #[test]
    fn missing_class_pad_fails() {
        let mut w = BinaryWriter::new();
        w.write_u16(1);
        w.write_string("container");
        w.write_u8(0x01); // must be 0x00
        w.write_u16(0);
        let data = w.into_vec();
        assert!(PrototypeIndex::read(&mut BinaryReader::new(&data)).is_err());
    }

    #[test]
    fn duplicate_and_zero_ids_fail() {
        let mut index = PrototypeIndex::new();
        index.add("container", 1, "iron-chest").unwrap();
        assert!(index.add("container", 1, "steel-chest").is_err());
        assert!(index.add("container", 0, "wooden-chest").is_err());
        assert!(index.add("starship", 2, "enterprise").is_err());
        // Same numeric ID in a different kind is fine.
        index.add("item", 1, "iron-plate").unwrap();
    }

    #[test]
    fn unknown_class_in_stream_reports_offset() {
        let mut w = BinaryWriter::new();
        w.write_u16(1);
        write_entity_class(&mut w, "starship", &[(1, "enterprise")]);
        let data = w.into_vec();
        let err = PrototypeIndex::read(&mut BinaryReader::new(&data)).unwrap_err();
        assert!(err.to_string().contains("starship"));
    }
}
