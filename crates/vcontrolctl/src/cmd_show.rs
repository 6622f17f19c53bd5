use std::path::Path;

use anyhow::{anyhow, Result};
use vcontrol_core::Catalog;

use crate::common::{self, CommandView, DeviceView, ProtocolView, UnitView};

pub fn device(path: &Path, id: &str, json: bool) -> Result<()> {
    let catalog = common::load_catalog(path)?;
    let view = device_view(&catalog, id)?;
    if json {
        common::print_json(&view)
    } else {
        view.print();
        Ok(())
    }
}

pub fn command(path: &Path, id: &str, name: &str, json: bool) -> Result<()> {
    let catalog = common::load_catalog(path)?;
    let view = command_view(&catalog, id, name)?;
    if json {
        common::print_json(&view)
    } else {
        view.print();
        Ok(())
    }
}

pub fn unit(path: &Path, name: &str, json: bool) -> Result<()> {
    let catalog = common::load_catalog(path)?;
    let view = unit_view(&catalog, name)?;
    if json {
        common::print_json(&view)
    } else {
        view.print();
        Ok(())
    }
}

pub fn protocol(path: &Path, name: &str, json: bool) -> Result<()> {
    let catalog = common::load_catalog(path)?;
    let proto = catalog
        .protocol(name)
        .ok_or_else(|| anyhow!("protocol {name} is not defined"))?;
    let view = ProtocolView::from(proto.as_ref());
    if json {
        common::print_json(&view)
    } else {
        view.print();
        Ok(())
    }
}

fn device_view(catalog: &Catalog, id: &str) -> Result<DeviceView> {
    catalog
        .device(id)
        .map(DeviceView::from)
        .ok_or_else(|| anyhow!("device {id} is not defined"))
}

fn command_view(catalog: &Catalog, id: &str, name: &str) -> Result<CommandView> {
    let device = catalog
        .device(id)
        .ok_or_else(|| anyhow!("device {id} is not defined"))?;
    device
        .command(name)
        .map(CommandView::from)
        .ok_or_else(|| anyhow!("device {id} has no command {name}"))
}

/// Units are looked up by name first, then by abbreviation.
fn unit_view(catalog: &Catalog, name: &str) -> Result<UnitView> {
    catalog
        .unit(name)
        .or_else(|| catalog.unit_by_abbrev(name))
        .map(UnitView::from)
        .ok_or_else(|| anyhow!("unit {name} is not defined"))
}
