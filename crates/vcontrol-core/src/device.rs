//! Addressable controllers and their per-device command tables.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};
use vcontrol_xml::Node;

use crate::command::Command;
use crate::protocol::Protocol;
use crate::{required_attr, CatalogError, RefKind};

/// A controller bound to one protocol.
#[derive(Debug, Clone)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub protocol: Arc<Protocol>,
    /// Source line of the `device` element.
    pub line: usize,
    commands: Vec<Command>,
    index: HashMap<Arc<str>, usize>,
}

impl Device {
    pub fn new(id: impl Into<String>, name: impl Into<String>, protocol: Arc<Protocol>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            protocol,
            line: 0,
            commands: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn command(&self, name: &str) -> Option<&Command> {
        self.index.get(name).map(|&idx| &self.commands[idx])
    }

    /// Commands in the order they were attached.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Attach a command, refusing a second command with the same name.
    ///
    /// On refusal the rejected command is handed back.
    pub(crate) fn attach(&mut self, command: Command) -> Result<(), Command> {
        if self.index.contains_key(&*command.name) {
            return Err(command);
        }
        self.index.insert(command.name.clone(), self.commands.len());
        self.commands.push(command);
        Ok(())
    }
}

/// Compile the children of a `devices` section against the known protocols.
pub fn compile_devices(
    section: Node<'_>,
    protocols: &[Arc<Protocol>],
) -> Result<Vec<Device>, CatalogError> {
    let mut devices: Vec<Device> = Vec::new();

    for node in section.children().filter(|n| n.is_element()) {
        if node.name() != "device" {
            debug!(tag = node.name(), line = node.line(), "skipping element in devices");
            continue;
        }
        let id = required_attr(node, "ID")?;
        let proto_name = required_attr(node, "protocol")?;
        let name = node.attribute("name").unwrap_or_default();

        let protocol = protocols
            .iter()
            .find(|p| p.name == proto_name)
            .ok_or_else(|| CatalogError::reference(node.line(), RefKind::Protocol, proto_name))?;
        if devices.iter().any(|d| d.id == id) {
            return Err(CatalogError::schema(node, format!("device '{id}' defined twice")));
        }

        debug!(device = id, name, protocol = proto_name, "compiled device");
        let mut device = Device::new(id, name, Arc::clone(protocol));
        device.line = node.line();
        devices.push(device);
    }

    info!(count = devices.len(), "devices compiled");
    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandOrigin;
    use vcontrol_xml::Document;

    fn protocols() -> Vec<Arc<Protocol>> {
        ["KW2", "P300"]
            .into_iter()
            .zip([0x41, 0x42])
            .map(|(name, id)| {
                Arc::new(Protocol {
                    name: name.to_string(),
                    id,
                    macros: Vec::new(),
                    initial_commands: Vec::new(),
                })
            })
            .collect()
    }

    fn compile(xml: &str) -> Result<Vec<Device>, CatalogError> {
        let doc = Document::parse_str(xml).expect("parse");
        compile_devices(doc.root().expect("root"), &protocols())
    }

    #[test]
    fn devices_resolve_protocols() {
        let devices = compile(
            r#"<devices>
  <device ID="2098" name="V200KW2" protocol="KW2"/>
  <device ID="20CB" name="VScotHO1" protocol="P300"/>
  <device ID="2094" protocol="KW2"/>
</devices>"#,
        )
        .expect("compile");
        assert_eq!(devices.len(), 3);
        assert_eq!(devices[0].id, "2098");
        assert_eq!(devices[0].protocol.name, "KW2");
        assert_eq!(devices[1].protocol.id, 0x42);
        assert_eq!(devices[2].name, "");
        assert_eq!(devices[2].line, 4);
    }

    #[test]
    fn unknown_protocol_is_a_reference_error() {
        let err = compile("<devices><device ID=\"1\" protocol=\"GWG\"/></devices>").unwrap_err();
        match err {
            CatalogError::Reference { kind, name, .. } => {
                assert_eq!(kind, RefKind::Protocol);
                assert_eq!(name, "GWG");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_attributes_and_duplicates_fail() {
        assert!(compile("<devices><device protocol=\"KW2\"/></devices>")
            .unwrap_err()
            .is_schema());
        assert!(compile("<devices><device ID=\"1\"/></devices>")
            .unwrap_err()
            .is_schema());
        assert!(compile(
            "<devices><device ID=\"1\" protocol=\"KW2\"/><device ID=\"1\" protocol=\"P300\"/></devices>"
        )
        .unwrap_err()
        .is_schema());
    }

    #[test]
    fn attach_refuses_duplicate_names() {
        let mut device = Device::new("2098", "V200KW2", Arc::clone(&protocols()[0]));
        let command = Command::named("getTempA", CommandOrigin::Default);
        assert!(device.attach(command.clone()).is_ok());
        assert!(device.attach(command).is_err());
        assert!(device.has_command("getTempA"));
        assert_eq!(device.commands().len(), 1);
        assert!(device.command("getTempB").is_none());
    }
}
