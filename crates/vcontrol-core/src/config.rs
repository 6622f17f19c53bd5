//! Daemon configuration block.

use tracing::{debug, info};
use vcontrol_xml::{Cursor, Node, NodeKind};

use crate::allow::{AllowEntry, AllowList};
use crate::{field_number, field_text, required_attr, CatalogError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Serial device path.
    pub tty: Option<String>,
    /// Listen port, 0 when not configured.
    pub port: u16,
    pub logfile: Option<String>,
    pub syslog: bool,
    pub debug: bool,
    /// Id of the device served by default.
    pub device_id: String,
    pub allow: AllowList,
    pub(crate) device_line: usize,
}

/// `y...` and `1...` switch a flag on; anything else switches it off.
fn truthy(text: Option<&str>) -> bool {
    text.is_some_and(|t| t.starts_with('y') || t.starts_with('1'))
}

/// Flag value read from the untrimmed text, so leading blanks switch it off.
fn flag(node: Node<'_>) -> bool {
    truthy(
        node.first_child()
            .filter(|child| child.kind() == NodeKind::Text)
            .map(|child| child.content()),
    )
}

/// Compile a `config` section.
pub fn compile_config(section: Node<'_>) -> Result<Config, CatalogError> {
    let mut config = Config::default();
    let mut device: Option<&str> = None;
    let mut cursor = Cursor::children_of(section);

    while let Some(node) = cursor.current() {
        if !node.is_element() {
            cursor.step();
            continue;
        }
        let group = cursor.anchor().map(|anchor| anchor.name());
        match (group, node.name()) {
            (None, "serial" | "net" | "logging") => {
                cursor.descend(node);
                continue;
            }
            (None, "device") => {
                let id = required_attr(node, "ID")?;
                debug!(device = id, "default device");
                device = Some(id);
                config.device_line = node.line();
            }
            (Some("serial"), "tty") => config.tty = field_text(node).map(str::to_string),
            (Some("net"), "port") => config.port = field_number(node)?.unwrap_or(0),
            (Some("net"), "allow") => {
                let ip = required_attr(node, "ip")?;
                let entry: AllowEntry = ip
                    .parse()
                    .map_err(|err| CatalogError::schema(node, format!("allow: {err}")))?;
                debug!(entry = %entry, mask = format_args!("{:#010x}", entry.mask()), "allow");
                config.allow.push(entry);
            }
            (Some("logging"), "file") => config.logfile = field_text(node).map(str::to_string),
            (Some("logging"), "syslog") => config.syslog = flag(node),
            (Some("logging"), "debug") => config.debug = flag(node),
            (_, other) => {
                debug!(tag = other, line = node.line(), "skipping element in config");
            }
        }
        cursor.step();
    }

    let Some(device) = device else {
        return Err(CatalogError::schema(section, "config without default <device ID=...>"));
    };
    config.device_id = device.to_string();
    info!(
        device = %config.device_id,
        port = config.port,
        allow = config.allow.entries().len(),
        "config compiled"
    );
    Ok(config)
}
