use crate::codec::index::{Kind, Prototype, PrototypeIndex};
use crate::codec::reader::BinaryReader;
use crate::codec::version::Version;
use crate::error::Result;

/// Shared state for one decode pass over a library file.
///
/// `version` is the version currently governing gated readers. Object
/// decoders that carry their own version (blueprints, nested or not) swap
/// it in through [`Decoder::with_version`], which restores the previous
/// value on every exit path. A blueprint saved with removed mods likewise
/// swaps in its local prototype index for the duration of its content.
pub struct Decoder<'a> {
    pub r: BinaryReader<'a>,
    version: Version,
    global: PrototypeIndex,
    local: Option<PrototypeIndex>,
    /// Convert blueprint-body failures into skips instead of aborting.
    pub skip_bad: bool,
    /// Blueprints skipped so far under `skip_bad`.
    pub skipped: u32,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            r: BinaryReader::new(data),
            version: Version::default(),
            global: PrototypeIndex::new(),
            local: None,
            skip_bad: false,
            skipped: 0,
        }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    pub fn set_global_index(&mut self, index: PrototypeIndex) {
        self.global = index;
    }

    pub fn global_index(&self) -> &PrototypeIndex {
        &self.global
    }

    /// Run `f` with `version` current, restoring the previous version on
    /// both the success and the error path.
    pub fn with_version<T>(
        &mut self,
        version: Version,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let saved = std::mem::replace(&mut self.version, version);
        let out = f(self);
        self.version = saved;
        out
    }

    /// Run `f` with a blueprint-local prototype index replacing the global
    /// one. Lookups inside `f` resolve against the local table only.
    pub fn with_local_index<T>(
        &mut self,
        index: PrototypeIndex,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let saved = self.local.replace(index);
        let out = f(self);
        self.local = saved;
        out
    }

    fn index(&self) -> &PrototypeIndex {
        self.local.as_ref().unwrap_or(&self.global)
    }

    pub fn prototype(&self, kind: Kind, id: u16) -> Option<Prototype> {
        self.index().get(kind, id).cloned()
    }

    pub fn prototype_name(&self, kind: Kind, id: u16) -> Option<String> {
        self.index().name(kind, id).map(str::to_string)
    }

    /// Name lookup that fails with a positioned error when the ID is not
    /// in the index.
    pub fn require_name(&self, kind: Kind, id: u16, what: &str) -> Result<String> {
        self.prototype_name(kind, id)
            .ok_or_else(|| self.r.error(format!("unknown {} id {id} for {what}", kind.label())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_restored_on_error() {
        let mut d = Decoder::new(&[]);
        d.set_version(Version::new(1, 1, 61, 0));
        let inner = Version::new(1, 0, 0, 0);
        let result: Result<()> = d.with_version(inner, |d| {
            assert_eq!(d.version(), inner);
            Err(d.r.error("boom"))
        });
        assert!(result.is_err());
        assert_eq!(d.version(), Version::new(1, 1, 61, 0));
    }

    #[test]
    fn local_index_shadows_global() {
        let mut global = PrototypeIndex::new();
        global.add("container", 1, "iron-chest").unwrap();
        let mut local = PrototypeIndex::new();
        local.add("container", 1, "modded-chest").unwrap();

        let mut d = Decoder::new(&[]);
        d.set_global_index(global);
        assert_eq!(d.prototype_name(Kind::Entity, 1).as_deref(), Some("iron-chest"));
        d.with_local_index(local, |d| {
            assert_eq!(d.prototype_name(Kind::Entity, 1).as_deref(), Some("modded-chest"));
            // No fallback to the global table while a local one is active.
            assert_eq!(d.prototype_name(Kind::Item, 1), None);
            Ok(())
        })
        .unwrap();
        assert_eq!(d.prototype_name(Kind::Entity, 1).as_deref(), Some("iron-chest"));
    }
}
