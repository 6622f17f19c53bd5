use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use vcontrol_core::bytes::encode_compact;
use vcontrol_core::{Catalog, Command, Device, Protocol, Unit};

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialise JSON output")?;
    println!("{text}");
    Ok(())
}

pub fn load_catalog(path: &Path) -> Result<Catalog> {
    Catalog::load(path).with_context(|| format!("load catalog from {}", path.display()))
}

fn opt(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

#[derive(Serialize)]
pub struct CommandView {
    pub name: String,
    pub origin: String,
    pub protocmd: Option<String>,
    pub addr: Option<String>,
    pub len: u32,
    pub bit: Option<u8>,
    pub unit: Option<String>,
    pub precommand: Option<String>,
    pub error: Option<String>,
    pub description: Option<String>,
}

impl From<&Command> for CommandView {
    fn from(cmd: &Command) -> Self {
        Self {
            name: cmd.name.to_string(),
            origin: cmd.origin.to_string(),
            protocmd: cmd.proto_cmd.as_deref().map(str::to_string),
            addr: cmd.address.as_deref().map(str::to_string),
            len: cmd.length,
            bit: cmd.bit,
            unit: cmd.unit.as_deref().map(str::to_string),
            precommand: cmd.precommand.as_deref().map(str::to_string),
            error: cmd.error_bytes.as_deref().map(encode_compact),
            description: cmd.description.as_deref().map(str::to_string),
        }
    }
}

impl CommandView {
    pub fn print(&self) {
        println!("{:<12} {}", "command", self.name);
        println!("{:<12} {}", "origin", self.origin);
        println!("{:<12} {}", "protocmd", opt(self.protocmd.as_deref()));
        println!("{:<12} {}", "addr", opt(self.addr.as_deref()));
        println!("{:<12} {}", "len", self.len);
        match self.bit {
            Some(bit) => println!("{:<12} {bit}", "bit"),
            None => println!("{:<12} -", "bit"),
        }
        println!("{:<12} {}", "unit", opt(self.unit.as_deref()));
        println!("{:<12} {}", "precommand", opt(self.precommand.as_deref()));
        println!("{:<12} {}", "error", opt(self.error.as_deref()));
        println!("{:<12} {}", "description", opt(self.description.as_deref()));
    }
}

#[derive(Serialize)]
pub struct DeviceView {
    pub id: String,
    pub name: String,
    pub protocol: String,
    pub commands: Vec<CommandView>,
}

impl From<&Device> for DeviceView {
    fn from(device: &Device) -> Self {
        Self {
            id: device.id.clone(),
            name: device.name.clone(),
            protocol: device.protocol.name.clone(),
            commands: device.commands().iter().map(CommandView::from).collect(),
        }
    }
}

impl DeviceView {
    pub fn print(&self) {
        println!("device {} ({}) protocol {}", self.id, self.name, self.protocol);
        println!(
            "{:<28} {:<11} {:<10} {:<6} {:<4} {}",
            "COMMAND", "ORIGIN", "PROTOCMD", "ADDR", "LEN", "UNIT"
        );
        for cmd in &self.commands {
            println!(
                "{:<28} {:<11} {:<10} {:<6} {:<4} {}",
                cmd.name,
                cmd.origin,
                opt(cmd.protocmd.as_deref()),
                opt(cmd.addr.as_deref()),
                cmd.len,
                opt(cmd.unit.as_deref()),
            );
        }
    }
}

#[derive(Serialize)]
pub struct EnumView {
    pub text: String,
    pub bytes: Option<String>,
}

#[derive(Serialize)]
pub struct UnitView {
    pub name: String,
    pub abbrev: Option<String>,
    pub get_calc: Option<String>,
    pub set_calc: Option<String>,
    pub get_icalc: Option<String>,
    pub set_icalc: Option<String>,
    pub entity: Option<String>,
    #[serde(rename = "type")]
    pub value_type: Option<String>,
    pub enums: Vec<EnumView>,
}

impl From<&Unit> for UnitView {
    fn from(unit: &Unit) -> Self {
        Self {
            name: unit.name.clone(),
            abbrev: unit.abbrev.clone(),
            get_calc: unit.get_calc.clone(),
            set_calc: unit.set_calc.clone(),
            get_icalc: unit.get_icalc.clone(),
            set_icalc: unit.set_icalc.clone(),
            entity: unit.entity.clone(),
            value_type: unit.value_type.clone(),
            enums: unit
                .enums
                .iter()
                .map(|entry| EnumView {
                    text: entry.text.clone(),
                    bytes: entry.bytes.as_deref().map(encode_compact),
                })
                .collect(),
        }
    }
}

impl UnitView {
    pub fn print(&self) {
        println!("unit {} ({})", self.name, opt(self.abbrev.as_deref()));
        println!("  type   {}", opt(self.value_type.as_deref()));
        println!("  entity {}", opt(self.entity.as_deref()));
        println!(
            "  calc   get={} set={}",
            opt(self.get_calc.as_deref()),
            opt(self.set_calc.as_deref())
        );
        println!(
            "  icalc  get={} set={}",
            opt(self.get_icalc.as_deref()),
            opt(self.set_icalc.as_deref())
        );
        for entry in &self.enums {
            match &entry.bytes {
                Some(bytes) => println!("  enum   {:<12} {}", bytes, entry.text),
                None => println!("  enum   {:<12} {}", "(default)", entry.text),
            }
        }
    }
}

#[derive(Serialize)]
pub struct InitialCommandView {
    pub name: String,
    pub send: String,
    pub retry: u32,
    pub recv_timeout: u32,
}

#[derive(Serialize)]
pub struct ProtocolView {
    pub name: String,
    pub pid: String,
    pub macros: Vec<(String, String)>,
    pub commands: Vec<InitialCommandView>,
}

impl From<&Protocol> for ProtocolView {
    fn from(proto: &Protocol) -> Self {
        Self {
            name: proto.name.clone(),
            pid: format!("{:02X}", proto.id),
            macros: proto
                .macros
                .iter()
                .map(|m| (m.name.clone(), m.command.clone()))
                .collect(),
            commands: proto
                .initial_commands
                .iter()
                .map(|c| InitialCommandView {
                    name: c.name.clone(),
                    send: encode_compact(&c.send),
                    retry: c.retry,
                    recv_timeout: c.recv_timeout,
                })
                .collect(),
        }
    }
}

impl ProtocolView {
    pub fn print(&self) {
        println!("protocol {} pid {}", self.name, self.pid);
        for (name, command) in &self.macros {
            println!("  macro   {name:<16} {command}");
        }
        for cmd in &self.commands {
            println!(
                "  command {:<16} send={} retry={} recvTimeout={}",
                cmd.name, cmd.send, cmd.retry, cmd.recv_timeout
            );
        }
    }
}
