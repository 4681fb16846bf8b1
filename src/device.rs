//! Device records and the discovery-driven presence state machine.

use std::collections::HashMap;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// Presence/power status of a device as seen by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceStatus {
    On,
    Off,
    Offline,
}

/// A light bulb (or switch) known to the client.
///
/// Created on the first discovery reply and kept for the lifetime of the
/// client, surviving offline periods so the device can come back online.
/// The label is a lazily populated cache: it holds whatever the last
/// stateLabel/stateLight reply carried, with no freshness guarantee beyond
/// "was set at least once".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Identifier derived from the MAC address, e.g. `"d073d5006d72"`.
    pub id: String,
    /// Network address the device answers on.
    pub address: SocketAddr,
    /// Cached label, populated lazily.
    pub label: Option<String>,
    pub status: DeviceStatus,
    /// Discovery round the device was last seen in.
    pub seen_on_discovery: u64,
}

/// A presence transition produced by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// First reply from a previously unrecorded device.
    Discovered,
    /// A reply arrived from a device currently marked offline.
    Online,
}

/// The set of known devices and their discovery bookkeeping.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: HashMap<String, Device>,
    round: u64,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current discovery round number.
    pub fn round(&self) -> u64 {
        self.round
    }

    /// Begin a new discovery round.
    pub fn next_round(&mut self) -> u64 {
        self.round += 1;
        self.round
    }

    /// Record a discovery (or unicast status) reply from `id` at `address`.
    ///
    /// Returns the transition this reply caused, if any. Devices never move
    /// to offline here; that only happens in [`DeviceRegistry::sweep_offline`].
    pub fn note_seen(&mut self, id: &str, address: SocketAddr) -> Option<Transition> {
        let round = self.round;
        match self.devices.get_mut(id) {
            Some(device) => {
                device.address = address;
                device.seen_on_discovery = round;
                if device.status == DeviceStatus::Offline {
                    device.status = DeviceStatus::On;
                    Some(Transition::Online)
                } else {
                    None
                }
            }
            None => {
                self.devices.insert(
                    id.to_string(),
                    Device {
                        id: id.to_string(),
                        address,
                        label: None,
                        status: DeviceStatus::On,
                        seen_on_discovery: round,
                    },
                );
                Some(Transition::Discovered)
            }
        }
    }

    /// Mark devices unseen for more than `tolerance` rounds as offline.
    ///
    /// Returns the devices that transitioned; each transitions at most once
    /// until it is seen again.
    pub fn sweep_offline(&mut self, tolerance: u64) -> Vec<Device> {
        let round = self.round;
        self.devices
            .values_mut()
            .filter(|device| {
                device.status != DeviceStatus::Offline
                    && round.saturating_sub(device.seen_on_discovery) > tolerance
            })
            .map(|device| {
                device.status = DeviceStatus::Offline;
                device.clone()
            })
            .collect()
    }

    /// Update the cached label of a known device.
    pub fn update_label(&mut self, id: &str, label: &str) {
        if let Some(device) = self.devices.get_mut(id) {
            device.label = Some(label.to_string());
        }
    }

    /// Update the cached power status of a known (online) device.
    pub fn update_power(&mut self, id: &str, on: bool) {
        if let Some(device) = self.devices.get_mut(id)
            && device.status != DeviceStatus::Offline
        {
            device.status = if on { DeviceStatus::On } else { DeviceStatus::Off };
        }
    }

    pub fn get(&self, id: &str) -> Option<&Device> {
        self.devices.get(id)
    }

    /// Find a device by id, label, or network address.
    pub fn find(&self, identifier: &str) -> Option<&Device> {
        self.devices.get(identifier).or_else(|| {
            self.devices.values().find(|device| {
                device.label.as_deref() == Some(identifier)
                    || device.address.ip().to_string() == identifier
                    || device.address.to_string() == identifier
            })
        })
    }

    /// All devices, optionally filtered by status.
    pub fn list(&self, filter: Option<DeviceStatus>) -> Vec<Device> {
        let mut devices: Vec<Device> = self
            .devices
            .values()
            .filter(|device| filter.is_none_or(|status| device.status == status))
            .cloned()
            .collect();
        devices.sort_by(|a, b| a.id.cmp(&b.id));
        devices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(last: u8) -> SocketAddr {
        format!("192.168.2.{last}:56700").parse().unwrap()
    }

    #[test]
    fn test_first_reply_creates_device() {
        let mut registry = DeviceRegistry::new();
        registry.next_round();
        let transition = registry.note_seen("d073d5006d72", addr(130));
        assert_eq!(transition, Some(Transition::Discovered));
        let device = registry.get("d073d5006d72").unwrap();
        assert_eq!(device.status, DeviceStatus::On);
        assert_eq!(device.seen_on_discovery, 1);
        assert!(device.label.is_none());
    }

    #[test]
    fn test_repeat_reply_is_not_a_transition() {
        let mut registry = DeviceRegistry::new();
        registry.next_round();
        registry.note_seen("d073d5006d72", addr(130));
        assert_eq!(registry.note_seen("d073d5006d72", addr(130)), None);
    }

    #[test]
    fn test_offline_after_tolerance_exactly_once() {
        let mut registry = DeviceRegistry::new();
        registry.next_round();
        registry.note_seen("d073d5006d72", addr(130));

        // Within tolerance: rounds 2..=4 with tolerance 3 keep it online.
        for _ in 0..3 {
            registry.next_round();
            assert!(registry.sweep_offline(3).is_empty());
        }

        registry.next_round();
        let offline = registry.sweep_offline(3);
        assert_eq!(offline.len(), 1);
        assert_eq!(offline[0].status, DeviceStatus::Offline);

        // Further sweeps do not fire again.
        registry.next_round();
        assert!(registry.sweep_offline(3).is_empty());
        assert_eq!(
            registry.get("d073d5006d72").unwrap().status,
            DeviceStatus::Offline
        );
    }

    #[test]
    fn test_offline_device_comes_back_online_once() {
        let mut registry = DeviceRegistry::new();
        registry.next_round();
        registry.note_seen("d073d5006d72", addr(130));
        for _ in 0..5 {
            registry.next_round();
        }
        assert_eq!(registry.sweep_offline(3).len(), 1);

        let transition = registry.note_seen("d073d5006d72", addr(131));
        assert_eq!(transition, Some(Transition::Online));
        // Address refreshed, second reply silent.
        assert_eq!(registry.get("d073d5006d72").unwrap().address, addr(131));
        assert_eq!(registry.note_seen("d073d5006d72", addr(131)), None);
    }

    #[test]
    fn test_devices_persist_through_offline() {
        let mut registry = DeviceRegistry::new();
        registry.next_round();
        registry.note_seen("d073d5006d72", addr(130));
        for _ in 0..10 {
            registry.next_round();
            registry.sweep_offline(3);
        }
        assert!(registry.get("d073d5006d72").is_some());
    }

    #[test]
    fn test_find_by_label_and_address() {
        let mut registry = DeviceRegistry::new();
        registry.next_round();
        registry.note_seen("d073d5006d72", addr(130));
        registry.update_label("d073d5006d72", "Kitchen");

        assert!(registry.find("d073d5006d72").is_some());
        assert!(registry.find("Kitchen").is_some());
        assert!(registry.find("192.168.2.130").is_some());
        assert!(registry.find("192.168.2.130:56700").is_some());
        assert!(registry.find("nope").is_none());
    }

    #[test]
    fn test_list_filters_by_status() {
        let mut registry = DeviceRegistry::new();
        registry.next_round();
        registry.note_seen("aaaaaaaaaaaa", addr(1));
        registry.note_seen("bbbbbbbbbbbb", addr(2));
        registry.update_power("bbbbbbbbbbbb", false);

        assert_eq!(registry.list(None).len(), 2);
        assert_eq!(registry.list(Some(DeviceStatus::On)).len(), 1);
        assert_eq!(registry.list(Some(DeviceStatus::Off)).len(), 1);
        assert_eq!(registry.list(Some(DeviceStatus::Offline)).len(), 0);
    }

    #[test]
    fn test_power_update_does_not_resurrect_offline_device() {
        let mut registry = DeviceRegistry::new();
        registry.next_round();
        registry.note_seen("d073d5006d72", addr(130));
        for _ in 0..5 {
            registry.next_round();
        }
        registry.sweep_offline(3);
        registry.update_power("d073d5006d72", true);
        assert_eq!(
            registry.get("d073d5006d72").unwrap().status,
            DeviceStatus::Offline
        );
    }
}
