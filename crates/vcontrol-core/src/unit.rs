//! Value-conversion units and their enumerations.

use std::collections::HashSet;

use tracing::{debug, info};
use vcontrol_xml::{Cursor, Node};

use crate::bytes::decode_compact;
use crate::{field_text, required_attr, unexpected, CatalogError};

/// Conversion definition referenced by commands.
///
/// The `calc`/`icalc` expressions are kept verbatim; evaluating them is left
/// to whoever consumes the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unit {
    pub name: String,
    pub abbrev: Option<String>,
    pub get_calc: Option<String>,
    pub set_calc: Option<String>,
    pub get_icalc: Option<String>,
    pub set_icalc: Option<String>,
    pub entity: Option<String>,
    /// Raw value type such as `short` or `enum`.
    pub value_type: Option<String>,
    pub enums: Vec<EnumEntry>,
}

/// One text to byte-pattern mapping of an enumerated unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumEntry {
    pub text: String,
    /// `None` marks the default entry.
    pub bytes: Option<Vec<u8>>,
}

impl EnumEntry {
    pub fn is_default(&self) -> bool {
        self.bytes.is_none()
    }
}

impl Unit {
    /// Entry whose byte pattern equals `bytes` exactly.
    pub fn enum_by_bytes(&self, bytes: &[u8]) -> Option<&EnumEntry> {
        self.enums
            .iter()
            .find(|entry| entry.bytes.as_deref() == Some(bytes))
    }

    pub fn enum_by_text(&self, text: &str) -> Option<&EnumEntry> {
        self.enums.iter().find(|entry| entry.text == text)
    }

    /// First entry without a byte pattern.
    pub fn default_enum(&self) -> Option<&EnumEntry> {
        self.enums.iter().find(|entry| entry.is_default())
    }

    /// Look up the entry for `bytes`, falling back to the default entry.
    pub fn resolve_enum(&self, bytes: &[u8]) -> Option<&EnumEntry> {
        self.enum_by_bytes(bytes).or_else(|| self.default_enum())
    }
}

/// Compile the children of a `units` section.
pub fn compile_units(section: Node<'_>) -> Result<Vec<Unit>, CatalogError> {
    let mut units: Vec<Unit> = Vec::new();
    let mut seen = HashSet::new();
    let mut cursor = Cursor::children_of(section);

    while let Some(node) = cursor.current() {
        if !node.is_element() {
            cursor.step();
            continue;
        }
        if cursor.anchor().is_none() {
            if node.name() != "unit" {
                return Err(unexpected(node, "units"));
            }
            let name = required_attr(node, "name")?;
            if !seen.insert(name) {
                return Err(CatalogError::schema(node, format!("unit '{name}' defined twice")));
            }
            debug!(unit = name, line = node.line(), "new unit");
            units.push(Unit {
                name: name.to_string(),
                ..Unit::default()
            });
            cursor.descend(node);
            continue;
        }

        let Some(unit) = units.last_mut() else {
            return Err(unexpected(node, "units"));
        };
        apply_field(unit, node)?;
        cursor.step();
    }

    info!(count = units.len(), "units compiled");
    Ok(units)
}

fn apply_field(unit: &mut Unit, node: Node<'_>) -> Result<(), CatalogError> {
    let text = || field_text(node).map(str::to_string);
    match node.name() {
        "abbrev" => unit.abbrev = text(),
        "type" => unit.value_type = text(),
        "entity" => unit.entity = text(),
        "calc" => {
            unit.get_calc = node.attribute("get").map(str::to_string);
            unit.set_calc = node.attribute("set").map(str::to_string);
        }
        "icalc" => {
            unit.get_icalc = node.attribute("get").map(str::to_string);
            unit.set_icalc = node.attribute("set").map(str::to_string);
        }
        "enum" => {
            let text = required_attr(node, "text")?;
            let bytes = node
                .attribute("bytes")
                .map(|raw| {
                    decode_compact(raw)
                        .map_err(|err| CatalogError::schema(node, format!("enum bytes: {err}")))
                })
                .transpose()?;
            unit.enums.push(EnumEntry {
                text: text.to_string(),
                bytes,
            });
        }
        _ => return Err(unexpected(node, "unit")),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcontrol_xml::Document;

    const FIXTURE: &str = r#"<units>
  <unit name="Temperatur">
    <abbrev>UT</abbrev>
    <calc get="V/10" set="V*10"/>
    <type>short</type>
    <entity>Grad Celsius</entity>
  </unit>
  <unit name="BetriebsArt">
    <abbrev>BA</abbrev>
    <calc get="V" set="V"/>
    <icalc get="B0" set="V"/>
    <type>enum</type>
    <enum bytes="00" text="WW"/>
    <enum bytes="01 02" text="RED"/>
    <enum text="UNKNOWN"/>
  </unit>
</units>"#;

    fn compile(xml: &str) -> Result<Vec<Unit>, CatalogError> {
        let doc = Document::parse_str(xml).expect("parse");
        compile_units(doc.root().expect("root"))
    }

    #[test]
    fn units_with_calc_and_enums() {
        let units = compile(FIXTURE).expect("compile");
        assert_eq!(units.len(), 2);

        let temp = &units[0];
        assert_eq!(temp.abbrev.as_deref(), Some("UT"));
        assert_eq!(temp.get_calc.as_deref(), Some("V/10"));
        assert_eq!(temp.set_calc.as_deref(), Some("V*10"));
        assert_eq!(temp.value_type.as_deref(), Some("short"));
        assert_eq!(temp.entity.as_deref(), Some("Grad Celsius"));
        assert!(temp.enums.is_empty());

        let ba = &units[1];
        assert_eq!(ba.get_icalc.as_deref(), Some("B0"));
        assert_eq!(ba.enums.len(), 3);
        assert_eq!(ba.enum_by_bytes(&[0x01, 0x02]).map(|e| e.text.as_str()), Some("RED"));
        assert_eq!(ba.enum_by_bytes(&[0x01]), None);
        assert_eq!(ba.enum_by_text("WW").and_then(|e| e.bytes.clone()), Some(vec![0x00]));
        assert_eq!(ba.default_enum().map(|e| e.text.as_str()), Some("UNKNOWN"));
        assert_eq!(ba.resolve_enum(&[0x7F]).map(|e| e.text.as_str()), Some("UNKNOWN"));
    }

    #[test]
    fn enum_without_text_fails() {
        let xml = "<units><unit name=\"x\"><enum bytes=\"01\"/></unit></units>";
        assert!(compile(xml).unwrap_err().is_schema());
    }

    #[test]
    fn unknown_field_and_duplicates_fail() {
        let stray = "<units><unit name=\"x\"><colour>red</colour></unit></units>";
        assert!(compile(stray).unwrap_err().is_schema());

        let twice = "<units><unit name=\"x\"/><unit name=\"x\"/></units>";
        assert!(compile(twice).unwrap_err().is_schema());

        let bad_bytes = "<units><unit name=\"x\"><enum text=\"a\" bytes=\"0x1\"/></unit></units>";
        assert!(compile(bad_bytes).unwrap_err().is_schema());
    }
}
