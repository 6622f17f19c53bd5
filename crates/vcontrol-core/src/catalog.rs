//! Catalog assembly: root validation, section discovery and dependency-ordered
//! compilation into one immutable snapshot.

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};
use vcontrol_xml::{Document, Node};

use crate::allow::AllowEntry;
use crate::command::{compile_commands, Command};
use crate::config::{compile_config, Config};
use crate::device::{compile_devices, Device};
use crate::protocol::{compile_protocols, Protocol};
use crate::unit::{compile_units, Unit};
use crate::{CatalogError, RefKind};

/// Namespace the root element has to declare.
pub const VCONTROL_NAMESPACE: &str = "http://www.openv.de/vcontrol";

/// Required name of the root element.
pub const ROOT_ELEMENT: &str = "V-Control";

/// Fully resolved protocols, units, devices, commands and configuration.
#[derive(Debug, Clone)]
pub struct Catalog {
    protocols: Vec<Arc<Protocol>>,
    units: Vec<Unit>,
    devices: Vec<Device>,
    default_commands: Vec<Command>,
    config: Config,
    default_device: usize,
    source: Option<PathBuf>,
    pub(crate) generation: u64,
}

#[derive(Default)]
struct Sections<'a> {
    protocols: Option<Node<'a>>,
    units: Option<Node<'a>>,
    devices: Option<Node<'a>>,
    commands: Option<Node<'a>>,
    config: Option<Node<'a>>,
}

impl<'a> Sections<'a> {
    /// Locate the top-level sections, looking through the `unix`, `extern`
    /// and `vito` container elements.
    fn locate(root: Node<'a>) -> Result<Self, CatalogError> {
        let mut sections = Sections::default();
        let mut containers = vec![root];
        while let Some(container) = containers.pop() {
            for node in container.children().filter(|n| n.is_element()) {
                let slot = match node.name() {
                    "unix" | "extern" | "vito" => {
                        containers.push(node);
                        continue;
                    }
                    "protocols" => &mut sections.protocols,
                    "units" => &mut sections.units,
                    "devices" => &mut sections.devices,
                    "commands" => &mut sections.commands,
                    "config" => &mut sections.config,
                    other => {
                        debug!(tag = other, line = node.line(), "skipping top-level element");
                        continue;
                    }
                };
                if let Some(first) = slot {
                    return Err(CatalogError::schema(
                        node,
                        format!(
                            "section <{}> appears twice (first at line {})",
                            node.name(),
                            first.line()
                        ),
                    ));
                }
                *slot = Some(node);
            }
        }
        Ok(sections)
    }
}

fn required<'a>(
    section: Option<Node<'a>>,
    root: Node<'a>,
    name: &str,
) -> Result<Node<'a>, CatalogError> {
    section.ok_or_else(|| CatalogError::schema(root, format!("document has no <{name}> section")))
}

impl Catalog {
    /// Read, expand and compile the document at `path`.
    ///
    /// Inclusions resolve relative to the document's directory.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let doc = Document::load(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut catalog = Self::compile(doc, base_dir)?;
        catalog.source = Some(path.to_path_buf());
        Ok(catalog)
    }

    /// Compile a document held in memory; inclusions resolve against `base_dir`.
    pub fn load_str(xml: &str, base_dir: &Path) -> Result<Self, CatalogError> {
        let doc = Document::parse_str(xml)?;
        Self::compile(doc, base_dir)
    }

    /// Compile an already parsed document.
    pub fn compile(mut doc: Document, base_dir: &Path) -> Result<Self, CatalogError> {
        check_root(&doc)?;

        match doc.expand_includes(base_dir)? {
            0 => warn!("no XInclude performed"),
            n => info!(count = n, "XInclude performed"),
        }
        let comments = doc.strip_comments();
        debug!(comments, "comments removed");

        let root = doc
            .root()
            .ok_or_else(|| CatalogError::Schema {
                line: 0,
                message: "document has no root element".into(),
            })?;
        let sections = Sections::locate(root)?;

        let protocols: Vec<Arc<Protocol>> =
            compile_protocols(required(sections.protocols, root, "protocols")?)?
                .into_iter()
                .map(Arc::new)
                .collect();
        let units = match sections.units {
            Some(section) => compile_units(section)?,
            None => Vec::new(),
        };
        let mut devices =
            compile_devices(required(sections.devices, root, "devices")?, &protocols)?;
        let default_commands = match sections.commands {
            Some(section) => compile_commands(section, &mut devices)?,
            None => Vec::new(),
        };
        let config = compile_config(required(sections.config, root, "config")?)?;

        let default_device = devices
            .iter()
            .position(|d| d.id == config.device_id)
            .ok_or_else(|| {
                CatalogError::reference(config.device_line, RefKind::Device, &config.device_id)
            })?;

        let catalog = Catalog {
            protocols,
            units,
            devices,
            default_commands,
            config,
            default_device,
            source: None,
            generation: 0,
        };
        catalog.warn_unknown_units();
        info!(
            protocols = catalog.protocols.len(),
            units = catalog.units.len(),
            devices = catalog.devices.len(),
            commands = catalog.default_commands.len(),
            default_device = %catalog.config.device_id,
            "catalog compiled"
        );
        Ok(catalog)
    }

    fn warn_unknown_units(&self) {
        let named: BTreeSet<&str> = self
            .default_commands
            .iter()
            .chain(self.devices.iter().flat_map(|d| d.commands()))
            .filter_map(|c| c.unit.as_deref())
            .collect();
        for unit in named {
            if self.unit(unit).is_none() && self.unit_by_abbrev(unit).is_none() {
                warn!(unit, "command refers to an undefined unit");
            }
        }
    }

    pub fn protocols(&self) -> &[Arc<Protocol>] {
        &self.protocols
    }

    pub fn protocol(&self, name: &str) -> Option<&Arc<Protocol>> {
        self.protocols.iter().find(|p| p.name == name)
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn unit(&self, name: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.name == name)
    }

    /// Unit whose abbreviation is `abbrev`, the way commands name them.
    pub fn unit_by_abbrev(&self, abbrev: &str) -> Option<&Unit> {
        self.units
            .iter()
            .find(|u| u.abbrev.as_deref() == Some(abbrev))
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn device(&self, id: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == id)
    }

    /// Device named by `config/device`.
    pub fn default_device(&self) -> &Device {
        &self.devices[self.default_device]
    }

    pub fn default_commands(&self) -> &[Command] {
        &self.default_commands
    }

    pub fn default_command(&self, name: &str) -> Option<&Command> {
        self.default_commands.iter().find(|c| &*c.name == name)
    }

    /// Command `name` as seen by device `device_id`.
    pub fn command(&self, device_id: &str, name: &str) -> Option<&Command> {
        self.device(device_id)?.command(name)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Allow-list entry admitting `addr`, if any.
    pub fn allow_entry(&self, addr: IpAddr) -> Option<&AllowEntry> {
        self.config.allow.find(addr)
    }

    pub fn is_allowed(&self, addr: IpAddr) -> bool {
        self.config.allow.is_allowed(addr)
    }

    /// Publish counter assigned by the store; 0 for an unpublished catalog.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// File the catalog was loaded from.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

fn check_root(doc: &Document) -> Result<(), CatalogError> {
    let Some(root) = doc.root() else {
        return Err(CatalogError::Schema {
            line: 0,
            message: "empty document".into(),
        });
    };
    if !root.declares_namespace(VCONTROL_NAMESPACE) {
        return Err(CatalogError::schema(
            root,
            format!("document of the wrong type, namespace {VCONTROL_NAMESPACE} not declared"),
        ));
    }
    if root.local_name() != ROOT_ELEMENT {
        return Err(CatalogError::schema(
            root,
            format!(
                "document of the wrong type, root element <{}> is not <{ROOT_ELEMENT}>",
                root.name()
            ),
        ));
    }
    Ok(())
}
