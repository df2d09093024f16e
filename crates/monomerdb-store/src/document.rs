//! Canonical monomer document form: schema-shaped XML rooted at
//! `MonomerDB`, with a `PolymerList` of per-type `Polymer` groups and
//! a top-level `AttachmentList`. This form is the source of truth
//! when no serialized snapshot is usable.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use monomerdb_core::codec;
use monomerdb_core::errors::StoreError;
use monomerdb_core::types::{Attachment, Monomer, PolymerType, SymbolKey};
use monomerdb_core::validate;

use crate::snapshot::Snapshot;

fn doc_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Document {
        message: e.to_string(),
    }
}

/// Read a canonical document from disk. The returned snapshot has no
/// attachment catalog and no structure index; the bootstrap chain
/// supplies both.
pub fn read_file(path: &Path) -> Result<Snapshot, StoreError> {
    let xml = fs::read_to_string(path)?;
    read_str(&xml)
}

/// Parse a canonical document.
///
/// Unknown elements are ignored. A monomer without an id is dropped;
/// within a polymer group the first monomer for an id wins. Partially
/// defined attachments are never attached to their monomer. The
/// document's own `AttachmentList` is ignored: the attachment catalog
/// is rebuilt from the attachment source instead.
pub fn read_str(xml: &str) -> Result<Snapshot, StoreError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut snapshot = Snapshot::new();
    let mut current_type: Option<PolymerType> = None;
    let mut monomer: Option<Monomer> = None;
    let mut attachment: Option<Attachment> = None;
    let mut field: Option<String> = None;

    loop {
        match reader.read_event().map_err(doc_err)? {
            Event::Start(e) => match e.name().as_ref() {
                b"Polymer" => {
                    let value = e
                        .try_get_attribute("polymerType")
                        .map_err(doc_err)?
                        .ok_or_else(|| doc_err("Polymer element without polymerType"))?
                        .unescape_value()
                        .map_err(doc_err)?;
                    current_type = Some(value.parse()?);
                }
                b"Monomer" => monomer = Some(Monomer::default()),
                b"Attachment" => attachment = Some(Attachment::default()),
                other => {
                    field = Some(String::from_utf8_lossy(other).into_owned());
                }
            },
            Event::Text(t) => {
                let text = t.unescape().map_err(doc_err)?.into_owned();
                let Some(name) = field.as_deref() else {
                    continue;
                };
                if let Some(a) = attachment.as_mut() {
                    apply_attachment_field(a, name, &text);
                } else if let Some(m) = monomer.as_mut() {
                    apply_monomer_field(m, name, &text);
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"Monomer" => {
                    if let Some(mut m) = monomer.take() {
                        if let Some(polymer_type) = current_type {
                            m.polymer_type = polymer_type;
                        }
                        if !m.alternate_id.is_empty() {
                            snapshot.insert(Arc::new(m));
                        }
                    }
                }
                b"Attachment" => {
                    if let Some(a) = attachment.take() {
                        // Top-level AttachmentList entries carry no
                        // surrounding monomer and are dropped here.
                        if let Some(m) = monomer.as_mut() {
                            if validate::attachment_is_valid(&a) {
                                m.attachments.push(a);
                            }
                        }
                    }
                }
                b"Polymer" => current_type = None,
                _ => field = None,
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(snapshot)
}

fn apply_monomer_field(m: &mut Monomer, name: &str, text: &str) {
    match name {
        "MonomerID" => m.alternate_id = text.to_string(),
        "MonomerSmiles" => m.canonical_structure = text.to_string(),
        "MonomerMolFile" => {
            m.structure_body = match codec::decode(text) {
                Ok(plain) => plain,
                Err(_) => text.to_string(),
            };
        }
        "MonomerName" => m.name = text.to_string(),
        "MonomerType" => m.monomer_type = text.to_string(),
        "NaturalAnalog" => m.natural_analog = text.to_string(),
        "PolymerType" => {
            if let Ok(pt) = text.parse() {
                m.polymer_type = pt;
            }
        }
        _ => {}
    }
}

fn apply_attachment_field(a: &mut Attachment, name: &str, text: &str) {
    match name {
        "AttachmentID" => a.alternate_id = text.to_string(),
        "AttachmentLabel" => a.label = text.to_string(),
        "CapGroupName" => a.cap_group_name = text.to_string(),
        "CapGroupSmiles" => a.cap_group_smiles = text.to_string(),
        _ => {}
    }
}

/// Render a snapshot as the canonical document.
pub fn to_string(snapshot: &Snapshot) -> Result<String, StoreError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(doc_err)?;
    let mut root = BytesStart::new("MonomerDB");
    root.push_attribute(("xmlns", "lmr"));
    writer.write_event(Event::Start(root)).map_err(doc_err)?;

    writer
        .write_event(Event::Start(BytesStart::new("PolymerList")))
        .map_err(doc_err)?;
    for (polymer_type, bucket) in snapshot.monomer_db() {
        let mut polymer = BytesStart::new("Polymer");
        polymer.push_attribute(("polymerType", polymer_type.as_str()));
        writer.write_event(Event::Start(polymer)).map_err(doc_err)?;
        for monomer in bucket.values() {
            write_monomer(&mut writer, monomer)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("Polymer")))
            .map_err(doc_err)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("PolymerList")))
        .map_err(doc_err)?;

    writer
        .write_event(Event::Start(BytesStart::new("AttachmentList")))
        .map_err(doc_err)?;
    for attachment in snapshot.attachment_db().values() {
        write_attachment(&mut writer, attachment)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("AttachmentList")))
        .map_err(doc_err)?;

    writer
        .write_event(Event::End(BytesEnd::new("MonomerDB")))
        .map_err(doc_err)?;

    String::from_utf8(writer.into_inner()).map_err(doc_err)
}

/// Write the canonical document to disk.
pub fn write_file(path: &Path, snapshot: &Snapshot) -> Result<(), StoreError> {
    fs::write(path, to_string(snapshot)?)?;
    Ok(())
}

fn write_monomer<W: std::io::Write>(
    writer: &mut Writer<W>,
    monomer: &Monomer,
) -> Result<(), StoreError> {
    writer
        .write_event(Event::Start(BytesStart::new("Monomer")))
        .map_err(doc_err)?;
    write_text(writer, "MonomerID", &monomer.alternate_id)?;
    write_text(writer, "MonomerSmiles", &monomer.canonical_structure)?;
    if !monomer.structure_body.is_empty() {
        // The structure payload is embedded in its transport encoding.
        write_text(writer, "MonomerMolFile", &codec::encode(&monomer.structure_body))?;
    }
    write_text(writer, "MonomerType", &monomer.monomer_type)?;
    write_text(writer, "MonomerName", &monomer.name)?;
    write_text(writer, "NaturalAnalog", &monomer.natural_analog)?;
    write_text(writer, "PolymerType", monomer.polymer_type.as_str())?;
    if !monomer.attachments.is_empty() {
        writer
            .write_event(Event::Start(BytesStart::new("Attachments")))
            .map_err(doc_err)?;
        for attachment in &monomer.attachments {
            write_attachment(writer, attachment)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("Attachments")))
            .map_err(doc_err)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("Monomer")))
        .map_err(doc_err)?;
    Ok(())
}

fn write_attachment<W: std::io::Write>(
    writer: &mut Writer<W>,
    attachment: &Attachment,
) -> Result<(), StoreError> {
    writer
        .write_event(Event::Start(BytesStart::new("Attachment")))
        .map_err(doc_err)?;
    write_text(writer, "AttachmentID", &attachment.alternate_id)?;
    write_text(writer, "AttachmentLabel", &attachment.label)?;
    write_text(writer, "CapGroupName", &attachment.cap_group_name)?;
    write_text(writer, "CapGroupSmiles", &attachment.cap_group_smiles)?;
    writer
        .write_event(Event::End(BytesEnd::new("Attachment")))
        .map_err(doc_err)?;
    Ok(())
}

fn write_text<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: &str,
) -> Result<(), StoreError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(doc_err)?;
    writer
        .write_event(Event::Text(BytesText::new(value)))
        .map_err(doc_err)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(doc_err)?;
    Ok(())
}
