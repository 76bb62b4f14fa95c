//! GATT profile discovery
//!
//! The primary services of a server are discovered with read by group type requests, the
//! characteristics of each service with read by type requests, and the descriptors of each
//! characteristic with find information requests. Each step is repeated from the handle after the
//! last one found until the server answers with an *attribute not found* error.

use crate::client::GattChannel;
use crate::command::Command;
use crate::pdu::{types, ErrorCode};
use bt_exchange_channel::{Error, Result, Transport};
use bt_exchange_core::Uuid;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub handle: u16,
    pub uuid: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Characteristic {
    /// Handle of the characteristic declaration
    pub handle: u16,
    pub properties: u8,
    pub value_handle: u16,
    pub uuid: Uuid,
    pub descriptors: Vec<Descriptor>,
}

impl Characteristic {
    /// Find the handle of a descriptor
    pub fn descriptor(&self, uuid: Uuid) -> Option<u16> {
        self.descriptors.iter().find(|d| d.uuid == uuid).map(|d| d.handle)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub uuid: Uuid,
    pub start: u16,
    pub end: u16,
    pub characteristics: Vec<Characteristic>,
}

impl Service {
    pub fn characteristic(&self, uuid: Uuid) -> Option<&Characteristic> {
        self.characteristics.iter().find(|c| c.uuid == uuid)
    }
}

/// The services of a GATT server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    services: Vec<Service>,
}

impl Profile {
    /// Discover every primary service with its characteristics and descriptors
    pub fn discover<T: Transport>(gatt: &GattChannel<T>, wait: Duration) -> Result<Self> {
        let mut services = discover_services(gatt, wait)?;

        for service in services.iter_mut() {
            service.characteristics = discover_characteristics(gatt, wait, service.start, service.end)?;

            let ends: Vec<u16> = service
                .characteristics
                .iter()
                .skip(1)
                .map(|c| c.handle.checked_sub(1).ok_or(Error::General))
                .chain(core::iter::once(Ok(service.end)))
                .collect::<Result<_>>()?;

            for (characteristic, end) in service.characteristics.iter_mut().zip(ends) {
                if characteristic.value_handle < end {
                    characteristic.descriptors = discover_descriptors(gatt, wait, characteristic.value_handle + 1, end)?;
                }
            }
        }

        log::info!("discovered {} service(s)", services.len());

        Ok(Profile { services })
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn service(&self, uuid: Uuid) -> Option<&Service> {
        self.services.iter().find(|s| s.uuid == uuid)
    }

    /// Find the value handle of a characteristic of a service
    pub fn find_handle(&self, service: Uuid, characteristic: Uuid) -> Option<u16> {
        self.service(service)?
            .characteristic(characteristic)
            .map(|c| c.value_handle)
    }
}

/// Run `command` built by `build`, `None` is returned once the server has no more attributes
fn run_discovery<T, B>(gatt: &GattChannel<T>, wait: Duration, build: B) -> Result<Option<Command>>
where
    T: Transport,
    B: FnOnce(&mut Command),
{
    let mut command = gatt.command();

    build(&mut command);

    let (command, result) = gatt.execute(wait, command);

    match (result, command.error()) {
        (Err(_), Some(ErrorCode::AttributeNotFound)) => Ok(None),
        (Err(e), _) => Err(e),
        (Ok(()), _) if command.response().is_empty() => Ok(None),
        (Ok(()), _) => Ok(Some(command)),
    }
}

/// The handle to continue from after `last`, `None` if the end of the range was reached
fn next_start(last: u16, end: u16) -> Option<u16> {
    (last < end).then(|| last + 1)
}

fn discover_services<T: Transport>(gatt: &GattChannel<T>, wait: Duration) -> Result<Vec<Service>> {
    let mut services = Vec::new();
    let mut start = 0x0001;

    loop {
        let Some(command) = run_discovery(gatt, wait, |c| {
            c.read_by_group_type(start, 0xFFFF, Uuid::from_u16(types::PRIMARY_SERVICE));
        })?
        else {
            break;
        };

        let mut last = start;

        for (handle, data) in command.response().iter() {
            let (Some(end), Some(uuid)) = (
                data.get(..2).map(|raw| u16::from_le_bytes([raw[0], raw[1]])),
                data.get(2..).and_then(Uuid::from_le_slice),
            ) else {
                return Err(Error::General);
            };

            services.push(Service {
                uuid,
                start: handle,
                end,
                characteristics: Vec::new(),
            });

            last = last.max(end);
        }

        match next_start(last, 0xFFFF) {
            Some(next) if next > start => start = next,
            _ => break,
        }
    }

    Ok(services)
}

fn discover_characteristics<T: Transport>(
    gatt: &GattChannel<T>,
    wait: Duration,
    first: u16,
    end: u16,
) -> Result<Vec<Characteristic>> {
    let mut characteristics: Vec<Characteristic> = Vec::new();
    let mut start = first;

    loop {
        let Some(command) = run_discovery(gatt, wait, |c| {
            c.read_by_type(start, end, Uuid::from_u16(types::CHARACTERISTIC));
        })?
        else {
            break;
        };

        let mut last = start;

        for (handle, data) in command.response().iter() {
            let (Some(&properties), Some(value_handle), Some(uuid)) = (
                data.first(),
                data.get(1..3).map(|raw| u16::from_le_bytes([raw[0], raw[1]])),
                data.get(3..).and_then(Uuid::from_le_slice),
            ) else {
                return Err(Error::General);
            };

            // declarations are in increasing handle order within the service
            let previous = characteristics.last().map(|c| c.handle);

            if handle < first || handle > end || previous.map_or(false, |previous| handle <= previous) {
                log::warn!("characteristic declaration at invalid handle {:#06x}", handle);

                return Err(Error::General);
            }

            characteristics.push(Characteristic {
                handle,
                properties,
                value_handle,
                uuid,
                descriptors: Vec::new(),
            });

            last = last.max(value_handle);
        }

        match next_start(last, end) {
            Some(next) if next > start => start = next,
            _ => break,
        }
    }

    Ok(characteristics)
}

fn discover_descriptors<T: Transport>(
    gatt: &GattChannel<T>,
    wait: Duration,
    first: u16,
    end: u16,
) -> Result<Vec<Descriptor>> {
    let mut descriptors = Vec::new();
    let mut start = first;

    loop {
        let Some(command) = run_discovery(gatt, wait, |c| {
            c.find_information(start, end);
        })?
        else {
            break;
        };

        let mut last = start;

        for (handle, data) in command.response().iter() {
            let uuid = Uuid::from_le_slice(data).ok_or(Error::General)?;

            descriptors.push(Descriptor { handle, uuid });

            last = last.max(handle);
        }

        match next_start(last, end) {
            Some(next) if next > start => start = next,
            _ => break,
        }
    }

    Ok(descriptors)
}

/// Find the handle ranges of the primary services with the `uuid`
///
/// This uses a find by type value request, the ranges are returned as (start, end) pairs.
pub fn discover_service<T: Transport>(gatt: &GattChannel<T>, wait: Duration, uuid: Uuid) -> Result<Vec<(u16, u16)>> {
    let mut value = Vec::with_capacity(16);

    uuid.write_le(&mut value);

    let mut ranges = Vec::new();
    let mut start = 0x0001;

    loop {
        let Some(command) = run_discovery(gatt, wait, |c| {
            c.find_by_type(start, 0xFFFF, types::PRIMARY_SERVICE, &value);
        })?
        else {
            break;
        };

        let mut last = start;

        for (handle, data) in command.response().iter() {
            let end = u16::from_le_bytes([data[0], data[1]]);

            ranges.push((handle, end));

            last = last.max(end);
        }

        match next_start(last, 0xFFFF) {
            Some(next) if next > start => start = next,
            _ => break,
        }
    }

    Ok(ranges)
}
