//! Protocol definitions: framing id, command macros and initial commands.

use std::collections::HashSet;

use tracing::{debug, info};
use vcontrol_xml::{Cursor, Node};

use crate::bytes::{decode_compact, decode_hex_byte};
use crate::{field_number, field_text, required_attr, unexpected, CatalogError};

/// Byte-level protocol a device speaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Protocol {
    /// Unique protocol name such as `P300`.
    pub name: String,
    /// Protocol id byte.
    pub id: u8,
    /// Named command templates.
    pub macros: Vec<Macro>,
    /// Handshake/setup commands run when the protocol is initialised.
    pub initial_commands: Vec<InitialCommand>,
}

impl Protocol {
    pub fn macro_named(&self, name: &str) -> Option<&Macro> {
        self.macros.iter().find(|m| m.name == name)
    }

    pub fn initial_command(&self, name: &str) -> Option<&InitialCommand> {
        self.initial_commands.iter().find(|c| c.name == name)
    }
}

/// Named, reusable command template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Macro {
    pub name: String,
    pub command: String,
}

/// Protocol-level setup command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialCommand {
    pub name: String,
    pub send: Vec<u8>,
    pub retry: u32,
    /// Receive timeout as written in the document.
    pub recv_timeout: u32,
}

struct Draft {
    name: String,
    line: usize,
    id: Option<u8>,
    macros: Vec<Macro>,
    initial_commands: Vec<InitialCommand>,
}

impl Draft {
    fn finish(self, seen: &mut HashSet<String>) -> Result<Protocol, CatalogError> {
        let id = self.id.ok_or_else(|| CatalogError::Schema {
            line: self.line,
            message: format!("protocol '{}' without pid", self.name),
        })?;
        if !seen.insert(self.name.clone()) {
            return Err(CatalogError::Schema {
                line: self.line,
                message: format!("protocol '{}' defined twice", self.name),
            });
        }
        debug!(
            protocol = %self.name,
            id = format_args!("{id:#04x}"),
            macros = self.macros.len(),
            initial_commands = self.initial_commands.len(),
            "compiled protocol"
        );
        Ok(Protocol {
            name: self.name,
            id,
            macros: self.macros,
            initial_commands: self.initial_commands,
        })
    }
}

/// Compile the children of a `protocols` section.
pub fn compile_protocols(section: Node<'_>) -> Result<Vec<Protocol>, CatalogError> {
    let mut protocols = Vec::new();
    let mut seen = HashSet::new();
    let mut draft: Option<Draft> = None;
    let mut cursor = Cursor::children_of(section);

    while let Some(node) = cursor.current() {
        if !node.is_element() {
            cursor.step();
            continue;
        }
        let inside = cursor.anchor().is_some();
        match (inside, draft.as_mut(), node.name()) {
            (false, _, "protocol") => {
                let name = required_attr(node, "name")?;
                if let Some(done) = draft.take() {
                    protocols.push(done.finish(&mut seen)?);
                }
                let id = node.attribute("pid").map(|pid| pid_byte(node, pid)).transpose()?;
                draft = Some(Draft {
                    name: name.to_string(),
                    line: node.line(),
                    id,
                    macros: Vec::new(),
                    initial_commands: Vec::new(),
                });
                cursor.descend(node);
                continue;
            }
            (true, Some(current), "pid") => {
                current.id = Some(pid_byte(node, field_text(node).unwrap_or(""))?);
            }
            (true, Some(current), "macros") => {
                current.macros = compile_macros(node)?;
            }
            (true, Some(current), "commands") => {
                current.initial_commands = compile_initial_commands(node)?;
            }
            (_, _, other) => {
                debug!(tag = other, line = node.line(), "skipping element in protocols");
            }
        }
        cursor.step();
    }

    if let Some(done) = draft.take() {
        protocols.push(done.finish(&mut seen)?);
    }
    info!(count = protocols.len(), "protocols compiled");
    Ok(protocols)
}

fn pid_byte(node: Node<'_>, text: &str) -> Result<u8, CatalogError> {
    decode_hex_byte(text).map_err(|err| CatalogError::schema(node, format!("pid: {err}")))
}

fn compile_macros(section: Node<'_>) -> Result<Vec<Macro>, CatalogError> {
    let mut macros: Vec<Macro> = Vec::new();
    let mut cursor = Cursor::children_of(section);

    while let Some(node) = cursor.current() {
        if !node.is_element() {
            cursor.step();
            continue;
        }
        match (cursor.anchor().is_some(), node.name()) {
            (false, "macro") => {
                let name = required_attr(node, "name")?;
                if macros.iter().any(|m| m.name == name) {
                    return Err(CatalogError::schema(node, format!("macro '{name}' defined twice")));
                }
                macros.push(Macro {
                    name: name.to_string(),
                    command: String::new(),
                });
                cursor.descend(node);
                continue;
            }
            (true, "command") => {
                if let Some(current) = macros.last_mut() {
                    current.command = field_text(node).unwrap_or_default().to_string();
                }
            }
            _ => return Err(unexpected(node, "macros")),
        }
        cursor.step();
    }

    Ok(macros)
}

fn compile_initial_commands(section: Node<'_>) -> Result<Vec<InitialCommand>, CatalogError> {
    let mut commands: Vec<InitialCommand> = Vec::new();
    let mut cursor = Cursor::children_of(section);

    while let Some(node) = cursor.current() {
        if !node.is_element() {
            cursor.step();
            continue;
        }
        let inside = cursor.anchor().is_some();
        match (inside, node.name()) {
            (false, "command") => {
                let name = required_attr(node, "name")?;
                if commands.iter().any(|c| c.name == name) {
                    return Err(CatalogError::schema(
                        node,
                        format!("initial command '{name}' defined twice"),
                    ));
                }
                commands.push(InitialCommand {
                    name: name.to_string(),
                    send: Vec::new(),
                    retry: 0,
                    recv_timeout: 0,
                });
                cursor.descend(node);
                continue;
            }
            (true, field @ ("send" | "retry" | "recvTimeout")) => {
                let Some(current) = commands.last_mut() else {
                    return Err(unexpected(node, "protocol commands"));
                };
                match field {
                    "send" => {
                        current.send = decode_compact(field_text(node).unwrap_or(""))
                            .map_err(|err| CatalogError::schema(node, format!("send: {err}")))?;
                    }
                    "retry" => current.retry = field_number(node)?.unwrap_or(0),
                    _ => current.recv_timeout = field_number(node)?.unwrap_or(0),
                }
            }
            _ => return Err(unexpected(node, "protocol commands")),
        }
        cursor.step();
    }

    Ok(commands)
}
