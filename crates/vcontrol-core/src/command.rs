//! Named device commands: global defaults, per-device overrides and the
//! propagation of defaults to devices that do not override them.
//!
//! An override inherits `name` and `description` from its default command
//! unconditionally, `unit` only when it names none itself and `protocmd`
//! only when its own attribute is missing. Every other field is taken from
//! the override as written. Inherited values are shared `Arc`s, so no
//! command can change what another command sees.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};
use vcontrol_xml::{Cursor, Node};

use crate::bytes::decode_compact;
use crate::device::Device;
use crate::{field_number, field_text, required_attr, unexpected, CatalogError, RefKind};

/// Where a device command came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandOrigin {
    /// Top-level entry of the `commands` section.
    Default,
    /// `device` element nested inside a default command.
    Override,
    /// Copy of a default attached to a device without an override.
    Propagated,
}

impl fmt::Display for CommandOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CommandOrigin::Default => "default",
            CommandOrigin::Override => "override",
            CommandOrigin::Propagated => "propagated",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: Arc<str>,
    pub proto_cmd: Option<Arc<str>>,
    /// Address as written, e.g. `5525`.
    pub address: Option<Arc<str>>,
    pub length: u32,
    /// `None` addresses the whole byte.
    pub bit: Option<u8>,
    /// Unit name or abbreviation.
    pub unit: Option<Arc<str>>,
    pub precommand: Option<Arc<str>>,
    pub error_bytes: Option<Arc<[u8]>>,
    pub description: Option<Arc<str>>,
    pub origin: CommandOrigin,
    pub line: usize,
}

impl Command {
    pub fn named(name: impl Into<Arc<str>>, origin: CommandOrigin) -> Self {
        Self {
            name: name.into(),
            proto_cmd: None,
            address: None,
            length: 0,
            bit: None,
            unit: None,
            precommand: None,
            error_bytes: None,
            description: None,
            origin,
            line: 0,
        }
    }

    /// True when both commands carry the same field values, ignoring origin and line.
    pub fn same_definition(&self, other: &Command) -> bool {
        self.name == other.name
            && self.proto_cmd == other.proto_cmd
            && self.address == other.address
            && self.length == other.length
            && self.bit == other.bit
            && self.unit == other.unit
            && self.precommand == other.precommand
            && self.error_bytes == other.error_bytes
            && self.description == other.description
    }

    fn propagated(&self) -> Self {
        Self {
            origin: CommandOrigin::Propagated,
            ..self.clone()
        }
    }

    fn inherit_from(&mut self, default: &Command, proto_cmd: Option<Arc<str>>) {
        self.name = Arc::clone(&default.name);
        self.description = default.description.clone();
        if self.unit.is_none() {
            self.unit = default.unit.clone();
        }
        self.proto_cmd = proto_cmd.or_else(|| default.proto_cmd.clone());
    }
}

/// Override parsed inside a default command, waiting for the default to be complete.
struct PendingOverride {
    device: usize,
    proto_cmd: Option<Arc<str>>,
    command: Command,
}

/// Compile a `commands` section.
///
/// Overrides are attached to `devices` as they are resolved; afterwards every
/// default is propagated to the devices still lacking it. Returns the default
/// commands in document order.
pub fn compile_commands(
    section: Node<'_>,
    devices: &mut [Device],
) -> Result<Vec<Command>, CatalogError> {
    let mut defaults: Vec<Command> = Vec::new();
    let mut seen = HashSet::new();
    let mut pending: Vec<PendingOverride> = Vec::new();
    let mut overrides = 0;
    let mut cursor = Cursor::children_of(section);

    while let Some(node) = cursor.current() {
        if !node.is_element() {
            cursor.step();
            continue;
        }
        if cursor.anchor().is_none() {
            if node.name() != "command" {
                return Err(unexpected(node, "commands"));
            }
            if let Some(default) = defaults.last() {
                overrides += attach_overrides(default, &mut pending, devices)?;
            }
            let name = required_attr(node, "name")?;
            if !seen.insert(name) {
                return Err(CatalogError::schema(node, format!("command '{name}' defined twice")));
            }
            let mut command = Command::named(name, CommandOrigin::Default);
            command.proto_cmd = node.attribute("protocmd").map(Arc::from);
            command.line = node.line();
            defaults.push(command);
            cursor.descend(node);
            continue;
        }

        let Some(current) = defaults.last_mut() else {
            return Err(unexpected(node, "commands"));
        };
        if node.name() == "device" {
            pending.push(parse_override(node, devices)?);
        } else {
            apply_field(current, node, "command")?;
        }
        cursor.step();
    }
    if let Some(default) = defaults.last() {
        overrides += attach_overrides(default, &mut pending, devices)?;
    }

    let propagated = propagate_defaults(&defaults, devices);
    info!(
        defaults = defaults.len(),
        overrides, propagated, "commands compiled"
    );
    Ok(defaults)
}

/// Attach a copy of every default to each device that has no command of that name.
///
/// Returns the number of commands attached.
pub fn propagate_defaults(defaults: &[Command], devices: &mut [Device]) -> usize {
    let mut attached = 0;
    for default in defaults {
        for device in devices.iter_mut() {
            if device.has_command(&default.name) {
                continue;
            }
            debug!(command = %default.name, device = %device.id, "propagating default command");
            if device.attach(default.propagated()).is_ok() {
                attached += 1;
            }
        }
    }
    attached
}

fn parse_override(node: Node<'_>, devices: &[Device]) -> Result<PendingOverride, CatalogError> {
    let id = required_attr(node, "ID")?;
    let device = devices
        .iter()
        .position(|d| d.id == id)
        .ok_or_else(|| CatalogError::reference(node.line(), RefKind::Device, id))?;

    let mut command = Command::named("", CommandOrigin::Override);
    command.line = node.line();
    let mut fields = Cursor::children_of(node);
    while let Some(field) = fields.current() {
        if field.is_element() {
            apply_field(&mut command, field, "command override")?;
        }
        fields.step();
    }

    Ok(PendingOverride {
        device,
        proto_cmd: node.attribute("protocmd").map(Arc::from),
        command,
    })
}

fn attach_overrides(
    default: &Command,
    pending: &mut Vec<PendingOverride>,
    devices: &mut [Device],
) -> Result<usize, CatalogError> {
    let count = pending.len();
    for PendingOverride {
        device,
        proto_cmd,
        mut command,
    } in pending.drain(..)
    {
        command.inherit_from(default, proto_cmd);
        let target = &mut devices[device];
        debug!(
            command = %command.name,
            device = %target.id,
            protocmd = ?command.proto_cmd.as_deref(),
            "attaching override"
        );
        if let Err(rejected) = target.attach(command) {
            return Err(CatalogError::Schema {
                line: rejected.line,
                message: format!(
                    "device '{}' overrides command '{}' twice",
                    target.id, rejected.name
                ),
            });
        }
    }
    Ok(count)
}

fn apply_field(command: &mut Command, node: Node<'_>, context: &str) -> Result<(), CatalogError> {
    let text = || field_text(node).map(Arc::<str>::from);
    match node.name() {
        "addr" => command.address = text(),
        "unit" => command.unit = text(),
        "precommand" => command.precommand = text(),
        "description" => command.description = text(),
        "error" => {
            let bytes = decode_compact(field_text(node).unwrap_or(""))
                .map_err(|err| CatalogError::schema(node, format!("error: {err}")))?;
            command.error_bytes = (!bytes.is_empty()).then(|| Arc::<[u8]>::from(bytes));
        }
        "len" => {
            if let Some(len) = field_number(node)? {
                command.length = len;
            }
        }
        "bit" => {
            if let Some(bit) = field_number(node)? {
                command.bit = Some(bit);
            }
        }
        _ => return Err(unexpected(node, context)),
    }
    Ok(())
}
