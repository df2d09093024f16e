//! Template cache: the smaller, symbol-keyed instance of the same
//! store pattern. Holds per-notation-source nucleotide templates plus
//! a reverse template-to-symbol map for the default source.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::{info, warn};

use monomerdb_core::config::StoreConfig;
use monomerdb_core::errors::StoreError;
use monomerdb_core::types::SymbolKey;

/// Notation source whose templates back the reverse map.
pub const DEFAULT_NOTATION_SOURCE: &str = "HELM Notation";

/// Bundled default templates, the final fallback.
pub const BUNDLED_TEMPLATES: &str = include_str!("../resources/NucleotideTemplates.xml");

/// One consistent set of templates: notation source -> symbol ->
/// template text.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    by_source: BTreeMap<String, BTreeMap<SymbolKey, String>>,
}

impl TemplateSet {
    pub fn templates(&self) -> &BTreeMap<String, BTreeMap<SymbolKey, String>> {
        &self.by_source
    }

    pub fn source(&self, source: &str) -> Option<&BTreeMap<SymbolKey, String>> {
        self.by_source.get(source)
    }

    pub fn insert(&mut self, source: &str, symbol: &str, template: &str) {
        self.by_source
            .entry(source.to_string())
            .or_default()
            .insert(SymbolKey::new(symbol), template.to_string());
    }

    /// Reverse template-to-symbol map for one source; the first
    /// symbol seen for a template wins.
    pub fn reverse_map(&self, source: &str) -> HashMap<String, String> {
        let mut reverse = HashMap::new();
        if let Some(templates) = self.by_source.get(source) {
            for (symbol, template) in templates {
                reverse
                    .entry(template.clone())
                    .or_insert_with(|| symbol.as_str().to_string());
            }
        }
        reverse
    }

    pub fn is_empty(&self) -> bool {
        self.by_source.values().all(|templates| templates.is_empty())
    }
}

/// Template cache with the same swap-the-reference discipline as the
/// monomer store.
pub struct TemplateStore {
    config: StoreConfig,
    live: RwLock<Option<Arc<TemplateSet>>>,
    dirty: AtomicBool,
}

impl TemplateStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            live: RwLock::new(None),
            dirty: AtomicBool::new(false),
        }
    }

    /// The live template set, bootstrapping on first access.
    pub fn templates(&self) -> Result<Arc<TemplateSet>, StoreError> {
        if let Some(set) = self.live.read().unwrap_or_else(PoisonError::into_inner).as_ref() {
            return Ok(Arc::clone(set));
        }
        let mut live = self.live.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(set) = live.as_ref() {
            return Ok(Arc::clone(set));
        }
        let set = Arc::new(self.bootstrap()?);
        *live = Some(Arc::clone(&set));
        self.dirty.store(true, Ordering::SeqCst);
        Ok(set)
    }

    /// Replace the live template set wholesale.
    pub fn set_templates(&self, set: TemplateSet) {
        *self.live.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(set));
        self.dirty.store(true, Ordering::SeqCst);
    }

    /// Reverse map for the default notation source.
    pub fn reverse_map(&self) -> Result<HashMap<String, String>, StoreError> {
        Ok(self.templates()?.reverse_map(DEFAULT_NOTATION_SOURCE))
    }

    /// Write the live set to the template document in `cache_dir`.
    /// The dirty flag is left as-is.
    pub fn persist(&self) -> Result<(), StoreError> {
        let set = self.templates()?;
        fs::create_dir_all(&self.config.cache_dir)?;
        fs::write(self.config.template_db_path(), to_string(&set)?)?;
        Ok(())
    }

    pub fn clear(&self) {
        *self.live.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.dirty.store(true, Ordering::SeqCst);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    pub fn reset_dirty(&self) {
        self.dirty.store(false, Ordering::SeqCst);
    }

    fn bootstrap(&self) -> Result<TemplateSet, StoreError> {
        if let Some(path) = &self.config.external_templates_path {
            match read_file(path) {
                Ok(set) => {
                    info!(path = %path.display(), "templates loaded from override document");
                    return Ok(set);
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "template override unusable, skipped")
                }
            }
        }

        let local = self.config.template_db_path();
        if local.exists() {
            match read_file(&local) {
                Ok(set) => {
                    info!(path = %local.display(), "templates loaded from local document");
                    return Ok(set);
                }
                Err(err) => {
                    warn!(path = %local.display(), error = %err, "local template document corrupt, deleting");
                    let _ = fs::remove_file(&local);
                }
            }
        }

        read_str(BUNDLED_TEMPLATES).map_err(|err| StoreError::ReferenceLoad {
            message: format!("bundled template resource failed to load: {err}"),
        })
    }
}

fn doc_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Document {
        message: e.to_string(),
    }
}

pub fn read_file(path: &Path) -> Result<TemplateSet, StoreError> {
    read_str(&fs::read_to_string(path)?)
}

/// Parse a template document: `TemplateList` groups attributed with
/// their notation source, each holding `Nucleotide` entries with a
/// `Symbol` and a `Notation`. Entries without a symbol are dropped.
pub fn read_str(xml: &str) -> Result<TemplateSet, StoreError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut set = TemplateSet::default();
    let mut source: Option<String> = None;
    let mut symbol = String::new();
    let mut notation = String::new();
    let mut field: Option<String> = None;

    loop {
        match reader.read_event().map_err(doc_err)? {
            Event::Start(e) => match e.name().as_ref() {
                b"TemplateList" => {
                    let value = e
                        .try_get_attribute("notationSource")
                        .map_err(doc_err)?
                        .ok_or_else(|| doc_err("TemplateList element without notationSource"))?
                        .unescape_value()
                        .map_err(doc_err)?;
                    source = Some(value.into_owned());
                }
                b"Nucleotide" => {
                    symbol.clear();
                    notation.clear();
                }
                other => field = Some(String::from_utf8_lossy(other).into_owned()),
            },
            Event::Text(t) => {
                let text = t.unescape().map_err(doc_err)?;
                match field.as_deref() {
                    Some("Symbol") => symbol = text.into_owned(),
                    Some("Notation") => notation = text.into_owned(),
                    _ => {}
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"Nucleotide" => {
                    if let Some(source) = source.as_deref() {
                        if !symbol.is_empty() {
                            set.insert(source, &symbol, &notation);
                        }
                    }
                }
                b"TemplateList" => source = None,
                _ => field = None,
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(set)
}

/// Render a template set as the template document.
pub fn to_string(set: &TemplateSet) -> Result<String, StoreError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(doc_err)?;
    let mut root = BytesStart::new("NucleotideTemplates");
    root.push_attribute(("xmlns", "lmr"));
    writer.write_event(Event::Start(root)).map_err(doc_err)?;

    for (source, templates) in set.templates() {
        let mut list = BytesStart::new("TemplateList");
        list.push_attribute(("notationSource", source.as_str()));
        writer.write_event(Event::Start(list)).map_err(doc_err)?;
        for (symbol, notation) in templates {
            writer
                .write_event(Event::Start(BytesStart::new("Nucleotide")))
                .map_err(doc_err)?;
            for (name, value) in [("Symbol", symbol.as_str()), ("Notation", notation.as_str())] {
                writer
                    .write_event(Event::Start(BytesStart::new(name)))
                    .map_err(doc_err)?;
                writer
                    .write_event(Event::Text(BytesText::new(value)))
                    .map_err(doc_err)?;
                writer
                    .write_event(Event::End(BytesEnd::new(name)))
                    .map_err(doc_err)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new("Nucleotide")))
                .map_err(doc_err)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("TemplateList")))
            .map_err(doc_err)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("NucleotideTemplates")))
        .map_err(doc_err)?;
    String::from_utf8(writer.into_inner()).map_err(doc_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_store() -> TemplateStore {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            cache_dir: dir.path().join("cache"),
            ..StoreConfig::default()
        };
        std::mem::forget(dir);
        TemplateStore::new(config)
    }

    #[test]
    fn bundled_templates_load_for_the_default_source() {
        let store = offline_store();
        let set = store.templates().unwrap();
        let helm = set.source(DEFAULT_NOTATION_SOURCE).unwrap();
        assert_eq!(helm[&SymbolKey::new("A")], "R(A)P");
        assert!(helm.len() >= 4);
    }

    #[test]
    fn reverse_map_is_first_wins() {
        let mut set = TemplateSet::default();
        set.insert("HELM Notation", "A", "R(A)P");
        set.insert("HELM Notation", "Z", "R(A)P");
        let reverse = set.reverse_map("HELM Notation");
        assert_eq!(reverse.len(), 1);
        assert_eq!(reverse["R(A)P"], "A");
    }

    #[test]
    fn persist_and_reload_round_trips() {
        let store = offline_store();
        let mut set = TemplateSet::default();
        set.insert("HELM Notation", "dA", "[dR](A)P");
        store.set_templates(set);
        store.persist().unwrap();

        let reloaded = read_file(&store.config.template_db_path()).unwrap();
        assert_eq!(
            reloaded.source("HELM Notation").unwrap()[&SymbolKey::new("dA")],
            "[dR](A)P"
        );
    }

    #[test]
    fn access_recovers_from_a_poisoned_lock() {
        let store = offline_store();
        store.templates().unwrap();

        let _ = std::thread::scope(|scope| {
            scope
                .spawn(|| {
                    let _guard = store.live.write().unwrap_or_else(PoisonError::into_inner);
                    panic!("poisoning the template lock");
                })
                .join()
        });

        assert!(store.templates().is_ok());
    }

    #[test]
    fn corrupt_local_document_falls_back_to_bundled() {
        let store = offline_store();
        fs::create_dir_all(&store.config.cache_dir).unwrap();
        fs::write(store.config.template_db_path(), "<NucleotideTemplates").unwrap();

        let set = store.templates().unwrap();
        assert!(set.source(DEFAULT_NOTATION_SOURCE).is_some());
        // The corrupt file was removed.
        assert!(!store.config.template_db_path().exists());
    }
}
