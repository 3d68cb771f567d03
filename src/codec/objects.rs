//! Decoders for the four library object kinds: blueprints, blueprint
//! books, deconstruction planners and upgrade planners.

use serde_json::{json, Map, Value};

use crate::codec::decoder::Decoder;
use crate::codec::entity;
use crate::codec::fields;
use crate::codec::index::{Kind, PrototypeIndex};
use crate::codec::resolve::{self, EntityRegistry};
use crate::codec::version::{Version, STABLE_V_1_1, V_1_1_43_0};
use crate::error::{ParseError, Result};

/// (output key, required item prototype class) per slot kind tag.
const SLOT_KINDS: [(&str, &str); 4] = [
    ("blueprint", "blueprint"),
    ("blueprint_book", "blueprint-book"),
    ("deconstruction_planner", "deconstruction-item"),
    ("upgrade_planner", "upgrade-item"),
];

/// Mod migration pairs recorded at save time. Read structurally; only
/// the library-level list is ever surfaced (extended output).
pub fn read_migrations(d: &mut Decoder) -> Result<Vec<(String, String)>> {
    let count = d.r.read_count8()?;
    let mut migrations = Vec::with_capacity(count);
    for _ in 0..count {
        let mod_name = d.r.read_string()?;
        let migration_file = d.r.read_string()?;
        migrations.push((mod_name, migration_file));
    }
    Ok(migrations)
}

/// Shared slot-list dispatch, used by the library and recursively by
/// blueprint books. Free slots are omitted; the slot index is preserved
/// in the output.
pub fn read_slots(d: &mut Decoder) -> Result<Vec<Value>> {
    let count = d.r.read_count32()?;
    let mut slots = Vec::new();
    for index in 0..count {
        let used = d.r.read_bool()?;
        if !used {
            continue;
        }
        let tag = d.r.expect_oneof(&[0, 1, 2, 3], "slot kind tag")? as usize;
        let (key, expected_class) = SLOT_KINDS[tag];
        let generation = d.r.read_u32()?;
        let at = d.r.position();
        let item_id = d.r.read_u16()?;
        let proto = d
            .prototype(Kind::Item, item_id)
            .ok_or_else(|| ParseError::new(at, format!("unknown item id {item_id} for slot")))?;
        if proto.class != expected_class {
            return Err(ParseError::new(
                at,
                format!("slot item class {:?} does not match kind tag {tag} ({expected_class})", proto.class),
            ));
        }
        tracing::debug!(index, kind = key, item = %proto.name, generation, "library slot");

        let object = match tag {
            0 => read_blueprint(d, &proto.name)?,
            1 => Some(read_blueprint_book(d, &proto.name)?),
            2 => Some(read_deconstruction_planner(d, &proto.name)?),
            _ => Some(read_upgrade_planner(d, &proto.name)?),
        };
        if let Some(object) = object {
            slots.push(json!({ "index": index, key: object }));
        }
    }
    Ok(slots)
}

/// Blueprint object. Returns `None` when the body failed to parse and
/// skip-bad recovery consumed it.
pub fn read_blueprint(d: &mut Decoder, item: &str) -> Result<Option<Value>> {
    let label = d.r.read_string()?;
    d.r.expect(&[0x00], "blueprint label pad")?;
    let has_removed_mods = d.r.read_bool()?;
    let content_size = d.r.read_opt_u32()? as usize;
    let content_start = d.r.position();
    let content_end = content_start + content_size;

    match parse_blueprint_body(d, item, &label, has_removed_mods, content_start, content_end) {
        Ok(value) => Ok(Some(value)),
        Err(err) if d.skip_bad => {
            tracing::warn!(label = %label, error = %err, "skipping unparseable blueprint");
            d.skipped += 1;
            d.r.set_position(content_end);
            if has_removed_mods {
                let size = d.r.read_opt_u32()? as usize;
                d.r.read_bytes(size)?;
            }
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn parse_blueprint_body(
    d: &mut Decoder,
    item: &str,
    label: &str,
    has_removed_mods: bool,
    content_start: usize,
    content_end: usize,
) -> Result<Value> {
    // A blueprint saved with since-removed mods trails a private
    // prototype table behind its content. Hop forward to load it, come
    // back, parse the content against it, then hop past it again.
    let local = if has_removed_mods {
        d.r.set_position(content_end);
        let declared = d.r.read_opt_u32()? as usize;
        let local_start = d.r.position();
        let index = PrototypeIndex::read(&mut d.r)?;
        if d.r.position() != local_start + declared {
            return Err(ParseError::new(
                d.r.position(),
                format!(
                    "local index size mismatch: declared {declared}, parsed {}",
                    d.r.position() - local_start
                ),
            ));
        }
        let local_end = d.r.position();
        d.r.set_position(content_start);
        Some((index, local_end))
    } else {
        None
    };

    let value = match local {
        Some((index, local_end)) => {
            let value = d.with_local_index(index, |d| read_blueprint_content(d, item, label))?;
            check_content_end(d, content_end)?;
            d.r.set_position(local_end);
            value
        }
        None => {
            let value = read_blueprint_content(d, item, label)?;
            check_content_end(d, content_end)?;
            value
        }
    };
    Ok(value)
}

fn check_content_end(d: &Decoder, expected_end: usize) -> Result<()> {
    let got = d.r.position();
    if got != expected_end {
        return Err(ParseError::new(
            got,
            format!("blueprint content size mismatch: expected to end at {expected_end} ({expected_end:#x})"),
        ));
    }
    Ok(())
}

fn read_blueprint_content(d: &mut Decoder, item: &str, label: &str) -> Result<Value> {
    let version = Version::read(&mut d.r)?;
    d.with_version(version, |d| {
        d.r.expect(&[0x00], "blueprint content pad")?;
        let _migrations = read_migrations(d)?;
        let description = d.r.read_string()?;

        let mut bp = Map::new();
        if !label.is_empty() {
            bp.insert("label".into(), Value::from(label));
        }
        if !description.is_empty() {
            bp.insert("description".into(), Value::from(description));
        }

        read_snap_to_grid(d, &mut bp)?;

        let (entities, registry) = read_entities(d)?;
        let schedules = read_schedules(d)?;
        let tiles = read_tiles(d)?;
        let icons = fields::read_icons(d)?;

        if let Some(icons) = icons {
            bp.insert("icons".into(), icons);
        }
        if !entities.is_empty() {
            bp.insert("entities".into(), Value::Array(entities));
        }
        if !tiles.is_empty() {
            bp.insert("tiles".into(), Value::Array(tiles));
        }
        if !schedules.is_empty() {
            bp.insert("schedules".into(), Value::Array(schedules));
        }
        bp.insert("item".into(), Value::from(item));
        bp.insert("version".into(), Value::from(version.as_u64()));

        let mut value = Value::Object(bp);
        resolve::resolve_links(&mut value, &registry, d.r.position())?;
        Ok(value)
    })
}

fn read_snap_to_grid(d: &mut Decoder, bp: &mut Map<String, Value>) -> Result<()> {
    if !d.r.read_bool()? {
        return Ok(());
    }
    let x = d.r.read_u32()?;
    let y = d.r.read_u32()?;
    bp.insert("snap-to-grid".into(), json!({ "x": x, "y": y }));
    let absolute = d.r.read_bool()?;
    if absolute {
        bp.insert("absolute-snapping".into(), Value::from(true));
    }
    if d.version() >= STABLE_V_1_1 {
        let rel_x = d.r.read_i32()?;
        let rel_y = d.r.read_i32()?;
        if (rel_x, rel_y) != (0, 0) {
            bp.insert("position-relative-to-grid".into(), json!({ "x": rel_x, "y": rel_y }));
        }
    }
    Ok(())
}

fn read_entities(d: &mut Decoder) -> Result<(Vec<Value>, EntityRegistry)> {
    let count = d.r.read_count32()?;
    let mut entities = Vec::with_capacity(count);
    let mut registry = EntityRegistry::new();
    let mut last = (0, 0);
    for number in 1..=count {
        let at = d.r.position();
        let parsed = entity::read_entity(d, &mut last, number)?;
        registry
            .register(parsed.raw_id, number as u64, parsed.is_combinator)
            .map_err(|m| ParseError::new(at, m))?;
        entities.push(parsed.record);
    }
    Ok((entities, registry))
}

const WAIT_TYPES: [&str; 10] = [
    "time",
    "full",
    "empty",
    "item_count",
    "circuit",
    "inactivity",
    "robots_inactive",
    "fluid_count",
    "passenger_present",
    "passenger_not_present",
];

const COMPARE_TYPES: [&str; 2] = ["and", "or"];

fn read_wait_condition(d: &mut Decoder) -> Result<Value> {
    let ty = d.r.read_mapped_u8("wait condition type", &WAIT_TYPES)?;
    let compare = d.r.read_mapped_u8("wait condition compare type", &COMPARE_TYPES)?;
    let ticks = d.r.read_u32()?;
    let condition = fields::read_condition(d)?;

    let mut wait = Map::new();
    wait.insert("compare_type".into(), Value::from(compare));
    wait.insert("type".into(), Value::from(ty));
    if matches!(ty, "time" | "inactivity") {
        wait.insert("ticks".into(), Value::from(ticks));
    }
    if let Some(condition) = condition {
        wait.insert("condition".into(), condition);
    }
    Ok(Value::Object(wait))
}

fn read_schedules(d: &mut Decoder) -> Result<Vec<Value>> {
    let count = d.r.read_count32()?;
    let mut schedules = Vec::with_capacity(count);
    for _ in 0..count {
        let loco_count = d.r.read_count32()?;
        let mut locomotives = Vec::with_capacity(loco_count);
        for _ in 0..loco_count {
            locomotives.push(Value::from(d.r.read_u32()?));
        }

        let station_count = d.r.read_count32()?;
        let mut stations = Vec::with_capacity(station_count);
        for _ in 0..station_count {
            let name = d.r.read_string()?;
            let wait_count = d.r.read_count32()?;
            let mut waits = Vec::with_capacity(wait_count);
            for _ in 0..wait_count {
                waits.push(read_wait_condition(d)?);
            }
            let temporary = d.r.read_bool()?;
            let mut station = Map::new();
            station.insert("station".into(), Value::from(name));
            if !waits.is_empty() {
                station.insert("wait_conditions".into(), Value::Array(waits));
            }
            if temporary {
                station.insert("temporary".into(), Value::from(true));
                if d.version() >= V_1_1_43_0 {
                    d.r.ignore(1, "temporary station rail direction")?;
                } else {
                    d.r.ignore(4, "temporary station data")?;
                }
            }
            stations.push(Value::Object(station));
        }

        schedules.push(json!({ "locomotives": locomotives, "schedule": stations }));
    }
    Ok(schedules)
}

fn read_tiles(d: &mut Decoder) -> Result<Vec<Value>> {
    let count = d.r.read_count32()?;
    let mut tiles = Vec::with_capacity(count);
    for _ in 0..count {
        let x = d.r.read_i32()?;
        let y = d.r.read_i32()?;
        let at = d.r.position();
        let id = d.r.read_u8()? as u16;
        let name = d
            .prototype_name(Kind::Tile, id)
            .ok_or_else(|| ParseError::new(at, format!("unknown tile id {id}")))?;
        tiles.push(json!({ "position": { "x": x, "y": y }, "name": name }));
    }
    Ok(tiles)
}

pub fn read_blueprint_book(d: &mut Decoder, item: &str) -> Result<Value> {
    let label = d.r.read_string()?;
    let description = d.r.read_string()?;
    let icons = fields::read_icons(d)?;
    let blueprints = read_slots(d)?;
    let active_index = d.r.read_u8()?;
    d.r.expect(&[0x00], "blueprint book pad")?;

    let mut book = Map::new();
    if !label.is_empty() {
        book.insert("label".into(), Value::from(label));
    }
    if !description.is_empty() {
        book.insert("description".into(), Value::from(description));
    }
    if let Some(icons) = icons {
        book.insert("icons".into(), icons);
    }
    book.insert("blueprints".into(), Value::Array(blueprints));
    book.insert("active_index".into(), Value::from(active_index));
    book.insert("item".into(), Value::from(item));
    book.insert("version".into(), Value::from(d.version().as_u64()));
    Ok(Value::Object(book))
}

/// Planner filter lists use zero-based output indices, unlike
/// blueprint-entity filters.
fn planner_entity_filters(d: &mut Decoder) -> Result<Vec<Value>> {
    let unknown_count = d.r.read_count8()?;
    let mut unknowns = std::collections::VecDeque::with_capacity(unknown_count);
    for _ in 0..unknown_count {
        unknowns.push_back(d.r.read_string()?);
    }

    let count = d.r.read_count8()?;
    let mut filters = Vec::new();
    for slot in 0..count {
        let id = d.r.read_u16()?;
        if id == 0 {
            continue;
        }
        let name = match d.prototype_name(Kind::Entity, id) {
            Some(name) => name,
            None => unknowns
                .pop_front()
                .ok_or_else(|| d.r.error(format!("unknown entity id {id} for planner filter")))?,
        };
        filters.push(json!({ "index": slot, "name": name }));
    }
    Ok(filters)
}

pub fn read_deconstruction_planner(d: &mut Decoder, item: &str) -> Result<Value> {
    let label = d.r.read_string()?;
    let description = d.r.read_string()?;
    let icons = fields::read_icons(d)?;

    let entity_filter_mode = d.r.expect_oneof(&[0, 1], "entity filter mode")?;
    let entity_filters = planner_entity_filters(d)?;
    let trees_and_rocks_only = d.r.read_bool()?;
    let tile_filter_mode = d.r.expect_oneof(&[0, 1], "tile filter mode")?;
    let tile_selection_mode = d.r.expect_oneof(&[0, 1, 2, 3], "tile selection mode")?;

    let tile_count = d.r.read_count8()?;
    let mut tile_filters = Vec::new();
    for slot in 0..tile_count {
        let at = d.r.position();
        let id = d.r.read_u8()? as u16;
        if id == 0 {
            continue;
        }
        let name = d
            .prototype_name(Kind::Tile, id)
            .ok_or_else(|| ParseError::new(at, format!("unknown tile id {id} for planner filter")))?;
        tile_filters.push(json!({ "index": slot, "name": name }));
    }

    let mut settings = Map::new();
    if !description.is_empty() {
        settings.insert("description".into(), Value::from(description));
    }
    if let Some(icons) = icons {
        settings.insert("icons".into(), icons);
    }
    if entity_filter_mode != 0 {
        settings.insert("entity_filter_mode".into(), Value::from(entity_filter_mode));
    }
    if !entity_filters.is_empty() {
        settings.insert("entity_filters".into(), Value::Array(entity_filters));
    }
    if trees_and_rocks_only {
        settings.insert("trees_and_rocks_only".into(), Value::from(true));
    }
    if tile_filter_mode != 0 {
        settings.insert("tile_filter_mode".into(), Value::from(tile_filter_mode));
    }
    if tile_selection_mode != 0 {
        settings.insert("tile_selection_mode".into(), Value::from(tile_selection_mode));
    }
    if !tile_filters.is_empty() {
        settings.insert("tile_filters".into(), Value::Array(tile_filters));
    }

    let mut planner = Map::new();
    if !label.is_empty() {
        planner.insert("label".into(), Value::from(label));
    }
    if !settings.is_empty() {
        planner.insert("settings".into(), Value::Object(settings));
    }
    planner.insert("item".into(), Value::from(item));
    planner.insert("version".into(), Value::from(d.version().as_u64()));
    Ok(Value::Object(planner))
}

/// Mapper endpoint: a u8 discriminator tags entity vs item, then the ID
/// in the corresponding space.
fn read_mapper(
    d: &mut Decoder,
    unknowns: &mut std::collections::VecDeque<String>,
) -> Result<Option<Value>> {
    let tag = d.r.expect_oneof(&[0, 1], "mapper type")?;
    let (kind, label) = if tag == 0 { (Kind::Entity, "entity") } else { (Kind::Item, "item") };
    let id = d.r.read_u16()?;
    if id == 0 {
        return Ok(None);
    }
    let name = match d.prototype_name(kind, id) {
        Some(name) => name,
        None => unknowns
            .pop_front()
            .ok_or_else(|| d.r.error(format!("unknown {label} id {id} for mapper")))?,
    };
    Ok(Some(json!({ "type": label, "name": name })))
}

pub fn read_upgrade_planner(d: &mut Decoder, item: &str) -> Result<Value> {
    let label = d.r.read_string()?;
    let description = d.r.read_string()?;
    let icons = fields::read_icons(d)?;

    // Replacement names for mapper endpoints whose prototype is gone,
    // split by direction.
    let unknown_count = d.r.read_count8()?;
    let mut from_unknowns = std::collections::VecDeque::new();
    let mut to_unknowns = std::collections::VecDeque::new();
    for _ in 0..unknown_count {
        let name = d.r.read_string()?;
        let is_to = d.r.read_bool()?;
        if is_to {
            to_unknowns.push_back(name);
        } else {
            from_unknowns.push_back(name);
        }
    }

    let mapper_count = d.r.read_count8()?;
    let mut mappers = Vec::new();
    for slot in 0..mapper_count {
        let from = read_mapper(d, &mut from_unknowns)?;
        let to = read_mapper(d, &mut to_unknowns)?;
        if from.is_none() && to.is_none() {
            continue;
        }
        let mut mapper = Map::new();
        if let Some(from) = from {
            mapper.insert("from".into(), from);
        }
        if let Some(to) = to {
            mapper.insert("to".into(), to);
        }
        mapper.insert("index".into(), Value::from(slot));
        mappers.push(Value::Object(mapper));
    }

    let mut settings = Map::new();
    if !description.is_empty() {
        settings.insert("description".into(), Value::from(description));
    }
    if let Some(icons) = icons {
        settings.insert("icons".into(), icons);
    }
    if !mappers.is_empty() {
        settings.insert("mappers".into(), Value::Array(mappers));
    }

    let mut planner = Map::new();
    if !label.is_empty() {
        planner.insert("label".into(), Value::from(label));
    }
    if !settings.is_empty() {
        planner.insert("settings".into(), Value::Object(settings));
    }
    planner.insert("item".into(), Value::from(item));
    planner.insert("version".into(), Value::from(d.version().as_u64()));
    Ok(Value::Object(planner))
}
