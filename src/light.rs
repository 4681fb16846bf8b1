//! Per-device convenience API.
//!
//! A [`Light`] is a cheap handle onto one discovered device. Its methods
//! validate human-facing ranges (degrees, percent, kelvin), build the typed
//! payload, and drive the request through the client core.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::client::{Client, SendOptions};
use crate::color::{
    HUE_MAX, KELVIN_DEFAULT, KELVIN_MAX, KELVIN_MIN, PERCENT_MAX, parse_rgb_hex, rgb_to_hsb,
};
use crate::device::Device;
use crate::errors::Error;
use crate::packet::{
    ApplicationRequest, Hsbk, LABEL_SIZE, MessageKind, MoveDirection, MultiZoneEffect, Payload,
    TILE_STATE_COLORS, Tile, Waveform,
};
use crate::products::{self, ProductInfo};

type Result<T> = std::result::Result<T, Error>;

/// Normalized power state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Power {
    On,
    Off,
}

impl Power {
    /// Wire levels are 0 or 65535; anything nonzero counts as on.
    pub fn from_level(level: u16) -> Power {
        if level > 0 { Power::On } else { Power::Off }
    }

    pub fn to_level(self) -> u16 {
        match self {
            Power::On => u16::MAX,
            Power::Off => 0,
        }
    }
}

/// A color in human units plus kelvin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightColor {
    /// Degrees, 0-360.
    pub hue: u16,
    /// Percent, 0-100.
    pub saturation: u8,
    /// Percent, 0-100.
    pub brightness: u8,
    /// 2500-9000.
    pub kelvin: u16,
}

impl LightColor {
    pub(crate) fn from_wire(color: Hsbk) -> LightColor {
        LightColor {
            hue: scale_from_wire(color.hue, HUE_MAX as u32) as u16,
            saturation: scale_from_wire(color.saturation, PERCENT_MAX as u32) as u8,
            brightness: scale_from_wire(color.brightness, PERCENT_MAX as u32) as u8,
            kelvin: color.kelvin,
        }
    }
}

/// The full light state reported by a stateLight reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightState {
    pub color: LightColor,
    pub power: Power,
    pub label: String,
}

/// Hardware identification plus the capability-table entry, when known.
#[derive(Debug, Clone)]
pub struct HardwareVersion {
    pub vendor: u32,
    pub product: u32,
    pub version: u32,
    pub info: Option<&'static ProductInfo>,
}

/// Firmware build and version numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareVersion {
    pub build: u64,
    pub minor: u16,
    pub major: u16,
}

/// Radio diagnostics shared by host and wifi info replies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalInfo {
    pub signal: f32,
    pub tx: u32,
    pub rx: u32,
}

/// Reply to a color-zone query.
#[derive(Debug, Clone, PartialEq)]
pub enum ZoneState {
    /// State of one zone; `count` is the total number of zones.
    Single {
        count: u8,
        index: u8,
        color: LightColor,
    },
    /// State of eight consecutive zones starting at `index`.
    Multi {
        count: u8,
        index: u8,
        colors: Vec<LightColor>,
    },
}

/// Tile chain layout reported by the device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceChain {
    pub start_index: u8,
    /// Only the populated tile slots.
    pub tiles: Vec<Tile>,
    pub total_count: u8,
}

/// Colors of a 64-zone tile region.
#[derive(Debug, Clone, PartialEq)]
pub struct TileState {
    pub tile_index: u8,
    pub x: u8,
    pub y: u8,
    pub width: u8,
    pub colors: Vec<Hsbk>,
}

/// A handle to a single discovered light.
///
/// Obtained from [`Client::light`]. The handle stays valid through offline
/// periods; requests sent while the device is away fail with
/// [`Error::Timeout`] once retries are exhausted.
#[derive(Clone)]
pub struct Light {
    client: Client,
    id: String,
}

impl Light {
    pub(crate) fn new(client: Client, id: String) -> Light {
        Light { client, id }
    }

    /// The device identifier this handle addresses.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Snapshot of the device record (address, cached label, status).
    pub fn info(&self) -> Result<Device> {
        self.client.device(&self.id)
    }

    /// Turn the light on over `duration` milliseconds.
    pub async fn turn_on(&self, duration: u32) -> Result<Power> {
        self.set_power(true, duration).await
    }

    /// Turn the light off over `duration` milliseconds.
    pub async fn turn_off(&self, duration: u32) -> Result<Power> {
        self.set_power(false, duration).await
    }

    /// Set the power level and return the normalized state from the reply.
    pub async fn set_power(&self, on: bool, duration: u32) -> Result<Power> {
        let level = if on { u16::MAX } else { 0 };
        match self
            .query(
                Payload::SetPower { level, duration },
                MessageKind::StatePower,
            )
            .await?
        {
            Payload::StatePower { level } => Ok(Power::from_level(level)),
            other => Err(unexpected(other.kind())),
        }
    }

    /// Current power level, normalized.
    pub async fn get_power(&self) -> Result<Power> {
        match self.query(Payload::GetPower, MessageKind::StatePower).await? {
            Payload::StatePower { level } => Ok(Power::from_level(level)),
            other => Err(unexpected(other.kind())),
        }
    }

    /// Current color, power and label.
    pub async fn get_state(&self) -> Result<LightState> {
        match self.query(Payload::GetLight, MessageKind::StateLight).await? {
            Payload::StateLight {
                color,
                power,
                label,
            } => Ok(LightState {
                color: LightColor::from_wire(color),
                power: Power::from_level(power),
                label,
            }),
            other => Err(unexpected(other.kind())),
        }
    }

    /// Change the color.
    ///
    /// Hue in degrees (0-360), saturation and brightness in percent (0-100),
    /// kelvin 2500-9000 (3500 when `None`), transition over `duration`
    /// milliseconds.
    pub async fn set_color(
        &self,
        hue: u16,
        saturation: u8,
        brightness: u8,
        kelvin: Option<u16>,
        duration: u32,
    ) -> Result<()> {
        let color = color_to_wire(hue, saturation, brightness, kelvin)?;
        self.acked(Payload::SetColor { color, duration }).await
    }

    /// Change the color from an RGB triple.
    ///
    /// RGB poorly represents the color of light; prefer [`Light::set_color`].
    pub async fn set_color_rgb(&self, red: u8, green: u8, blue: u8, duration: u32) -> Result<()> {
        let hsb = rgb_to_hsb(red, green, blue);
        self.set_color(hsb.hue, hsb.saturation, hsb.brightness, None, duration)
            .await
    }

    /// Change the color from a `#RRGGBB` or `#RGB` hex string.
    pub async fn set_color_rgb_hex(&self, hex: &str, duration: u32) -> Result<()> {
        let (red, green, blue) = parse_rgb_hex(hex)?;
        self.set_color_rgb(red, green, blue, duration).await
    }

    /// Apply a waveform effect.
    ///
    /// `skew_ratio` is in 0.0-1.0; `period` is one cycle in milliseconds.
    #[allow(clippy::too_many_arguments)]
    pub async fn waveform(
        &self,
        hue: u16,
        saturation: u8,
        brightness: u8,
        kelvin: Option<u16>,
        transient: bool,
        period: u32,
        cycles: f32,
        skew_ratio: f32,
        waveform: Waveform,
    ) -> Result<()> {
        let color = color_to_wire(hue, saturation, brightness, kelvin)?;
        if !(0.0..=1.0).contains(&skew_ratio) {
            return Err(Error::validation(format!(
                "skew ratio must be between 0 and 1, got {skew_ratio}"
            )));
        }
        let skew = ((skew_ratio * f32::from(u16::MAX)) - 32768.0) as i16;
        self.acked(Payload::SetWaveform {
            transient,
            color,
            period,
            cycles,
            skew_ratio: skew,
            waveform,
        })
        .await
    }

    /// Maximum infrared brightness in percent.
    pub async fn get_max_ir(&self) -> Result<u8> {
        match self
            .query(Payload::GetInfrared, MessageKind::StateInfrared)
            .await?
        {
            Payload::StateInfrared { brightness } => {
                Ok(scale_from_wire(brightness, PERCENT_MAX as u32) as u8)
            }
            other => Err(unexpected(other.kind())),
        }
    }

    /// Set the maximum infrared brightness in percent (0-100).
    pub async fn set_max_ir(&self, brightness: u8) -> Result<()> {
        if brightness > PERCENT_MAX {
            return Err(Error::validation(format!(
                "infrared brightness must be between 0 and {PERCENT_MAX}, got {brightness}"
            )));
        }
        self.acked(Payload::SetInfrared {
            brightness: scale_to_wire(brightness as u32, PERCENT_MAX as u32),
        })
        .await
    }

    /// The device label. With `cache` set, a previously fetched label is
    /// returned without touching the network.
    pub async fn get_label(&self, cache: bool) -> Result<String> {
        if cache
            && let Ok(device) = self.info()
            && let Some(label) = device.label
            && !label.is_empty()
        {
            return Ok(label);
        }
        match self.query(Payload::GetLabel, MessageKind::StateLabel).await? {
            Payload::StateLabel { label } => Ok(label),
            other => Err(unexpected(other.kind())),
        }
    }

    /// Set the device label (1 to 32 bytes).
    pub async fn set_label(&self, label: &str) -> Result<()> {
        if label.is_empty() {
            return Err(Error::validation("label must be at least one character"));
        }
        if label.len() > LABEL_SIZE {
            return Err(Error::validation(format!(
                "label exceeds {LABEL_SIZE} bytes: {label:?}"
            )));
        }
        self.acked(Payload::SetLabel {
            label: label.to_string(),
        })
        .await
    }

    /// Vendor/product/version, with the capability-table entry when known.
    pub async fn get_hardware_version(&self) -> Result<HardwareVersion> {
        match self
            .query(Payload::GetVersion, MessageKind::StateVersion)
            .await?
        {
            Payload::StateVersion {
                vendor,
                product,
                version,
            } => Ok(HardwareVersion {
                vendor,
                product,
                version,
                info: products::lookup(vendor, product),
            }),
            other => Err(unexpected(other.kind())),
        }
    }

    /// Microcontroller firmware build and version.
    pub async fn get_firmware_version(&self) -> Result<FirmwareVersion> {
        match self
            .query(Payload::GetHostFirmware, MessageKind::StateHostFirmware)
            .await?
        {
            Payload::StateHostFirmware {
                build,
                version_minor,
                version_major,
            } => Ok(FirmwareVersion {
                build,
                minor: version_minor,
                major: version_major,
            }),
            other => Err(unexpected(other.kind())),
        }
    }

    /// Microcontroller radio diagnostics.
    pub async fn get_host_info(&self) -> Result<SignalInfo> {
        match self
            .query(Payload::GetHostInfo, MessageKind::StateHostInfo)
            .await?
        {
            Payload::StateHostInfo { signal, tx, rx } => Ok(SignalInfo { signal, tx, rx }),
            other => Err(unexpected(other.kind())),
        }
    }

    /// Wifi radio diagnostics.
    pub async fn get_wifi_info(&self) -> Result<SignalInfo> {
        match self
            .query(Payload::GetWifiInfo, MessageKind::StateWifiInfo)
            .await?
        {
            Payload::StateWifiInfo { signal, tx, rx } => Ok(SignalInfo { signal, tx, rx }),
            other => Err(unexpected(other.kind())),
        }
    }

    /// Wifi firmware build and version.
    pub async fn get_wifi_version(&self) -> Result<FirmwareVersion> {
        match self
            .query(Payload::GetWifiFirmware, MessageKind::StateWifiFirmware)
            .await?
        {
            Payload::StateWifiFirmware {
                build,
                version_minor,
                version_major,
            } => Ok(FirmwareVersion {
                build,
                minor: version_minor,
                major: version_major,
            }),
            other => Err(unexpected(other.kind())),
        }
    }

    /// Time since last power-on, in nanoseconds.
    pub async fn get_uptime(&self) -> Result<u64> {
        match self.query(Payload::GetInfo, MessageKind::StateInfo).await? {
            Payload::StateInfo { uptime, .. } => Ok(uptime),
            other => Err(unexpected(other.kind())),
        }
    }

    /// Ambient light level in lux.
    pub async fn get_ambient_light(&self) -> Result<f32> {
        match self
            .query(Payload::GetAmbientLight, MessageKind::StateAmbientLight)
            .await?
        {
            Payload::StateAmbientLight { flux } => Ok(flux),
            other => Err(unexpected(other.kind())),
        }
    }

    /// Query zone colors.
    ///
    /// A single-zone request (`end` absent or equal to `start`) expects a
    /// stateZone reply; a range expects stateMultiZone.
    pub async fn get_color_zones(&self, start: u8, end: Option<u8>) -> Result<ZoneState> {
        let expected = zone_response_kind(start, end);
        let reply = self
            .query(
                Payload::GetColorZones {
                    start_index: start,
                    end_index: end.unwrap_or(start),
                },
                expected,
            )
            .await?;
        match reply {
            Payload::StateZone {
                count,
                index,
                color,
            } => Ok(ZoneState::Single {
                count,
                index,
                color: LightColor::from_wire(color),
            }),
            Payload::StateMultiZone {
                count,
                index,
                colors,
            } => Ok(ZoneState::Multi {
                count,
                index,
                colors: colors.iter().copied().map(LightColor::from_wire).collect(),
            }),
            other => Err(unexpected(other.kind())),
        }
    }

    /// Color a zone range. With `apply` unset the change is buffered until a
    /// later applying change.
    #[allow(clippy::too_many_arguments)]
    pub async fn set_color_zones(
        &self,
        start: u8,
        end: u8,
        hue: u16,
        saturation: u8,
        brightness: u8,
        kelvin: Option<u16>,
        duration: u32,
        apply: bool,
    ) -> Result<()> {
        let color = color_to_wire(hue, saturation, brightness, kelvin)?;
        self.acked(Payload::SetColorZones {
            start_index: start,
            end_index: end,
            color,
            duration,
            apply: if apply {
                ApplicationRequest::Apply
            } else {
                ApplicationRequest::NoApply
            },
        })
        .await
    }

    /// Start (or stop) a firmware multizone effect.
    pub async fn set_multi_zone_effect(
        &self,
        effect: MultiZoneEffect,
        speed: u32,
        direction: MoveDirection,
    ) -> Result<()> {
        self.acked(Payload::SetMultiZoneEffect {
            instance_id: random_instance_id(),
            effect_type: effect,
            speed,
            duration: 0,
            move_direction: direction as u32,
        })
        .await
    }

    /// Switch a relay on.
    pub async fn relay_on(&self, relay_index: u8) -> Result<()> {
        self.set_relay_power(relay_index, Power::On).await
    }

    /// Switch a relay off.
    pub async fn relay_off(&self, relay_index: u8) -> Result<()> {
        self.set_relay_power(relay_index, Power::Off).await
    }

    async fn set_relay_power(&self, relay_index: u8, power: Power) -> Result<()> {
        validate_relay_index(relay_index)?;
        self.acked(Payload::SetRelayPower {
            relay_index,
            relay_level: power.to_level(),
        })
        .await
    }

    /// Power state of one relay on a switch device.
    pub async fn get_relay_power(&self, relay_index: u8) -> Result<Power> {
        validate_relay_index(relay_index)?;
        match self
            .query(
                Payload::GetRelayPower { relay_index },
                MessageKind::StateRelayPower,
            )
            .await?
        {
            Payload::StateRelayPower { relay_level, .. } => Ok(Power::from_level(relay_level)),
            other => Err(unexpected(other.kind())),
        }
    }

    /// The tile chain layout.
    pub async fn get_device_chain(&self) -> Result<DeviceChain> {
        match self
            .query(Payload::GetDeviceChain, MessageKind::StateDeviceChain)
            .await?
        {
            Payload::StateDeviceChain {
                start_index,
                mut tile_devices,
                total_count,
            } => {
                tile_devices.truncate(total_count as usize);
                Ok(DeviceChain {
                    start_index,
                    tiles: tile_devices,
                    total_count,
                })
            }
            other => Err(unexpected(other.kind())),
        }
    }

    /// Set the user-assigned position of one tile.
    pub async fn set_user_position(&self, tile_index: u8, user_x: f32, user_y: f32) -> Result<()> {
        self.acked(Payload::SetUserPosition {
            tile_index,
            user_x,
            user_y,
        })
        .await
    }

    /// Query the colors of a tile region.
    pub async fn get_tile_state(
        &self,
        tile_index: u8,
        length: u8,
        x: u8,
        y: u8,
        width: u8,
    ) -> Result<TileState> {
        match self
            .query(
                Payload::GetTileState64 {
                    tile_index,
                    length,
                    x,
                    y,
                    width,
                },
                MessageKind::StateTileState64,
            )
            .await?
        {
            Payload::StateTileState64 {
                tile_index,
                x,
                y,
                width,
                colors,
            } => Ok(TileState {
                tile_index,
                x,
                y,
                width,
                colors,
            }),
            other => Err(unexpected(other.kind())),
        }
    }

    /// Paint a tile region with up to 64 colors.
    #[allow(clippy::too_many_arguments)]
    pub async fn set_tile_state(
        &self,
        tile_index: u8,
        length: u8,
        x: u8,
        y: u8,
        width: u8,
        duration: u32,
        colors: Vec<Hsbk>,
    ) -> Result<()> {
        if colors.is_empty() || colors.len() > TILE_STATE_COLORS {
            return Err(Error::validation(format!(
                "tile colors must number 1 to {TILE_STATE_COLORS}, got {}",
                colors.len()
            )));
        }
        self.acked(Payload::SetTileState64 {
            tile_index,
            length,
            x,
            y,
            width,
            duration,
            colors,
        })
        .await
    }

    /// Reboot the device.
    pub async fn reboot(&self) -> Result<()> {
        self.query(Payload::RebootRequest, MessageKind::RebootResponse)
            .await
            .map(drop)
    }

    /// Bounce an arbitrary 64-byte payload off the device.
    pub async fn echo(&self, payload: [u8; 64]) -> Result<[u8; 64]> {
        match self
            .query(Payload::EchoRequest { payload }, MessageKind::EchoResponse)
            .await?
        {
            Payload::EchoResponse { payload } => Ok(payload),
            other => Err(unexpected(other.kind())),
        }
    }

    /// Whether the device has relays (is a switch), per the capability table.
    pub async fn has_relays(&self) -> Result<bool> {
        let hardware = self.get_hardware_version().await?;
        Ok(hardware.info.is_some_and(|info| info.features.relays))
    }

    /// The capability-table entry for this device, failing when the
    /// vendor/product pair is unknown.
    pub async fn get_product_info(&self) -> Result<&'static ProductInfo> {
        let hardware = self.get_hardware_version().await?;
        hardware.info.ok_or(Error::ProductNotFound {
            vendor: hardware.vendor,
            product: hardware.product,
        })
    }

    /// Send a payload expecting the device's State reply.
    async fn query(&self, payload: Payload, expected: MessageKind) -> Result<Payload> {
        let packet = self
            .client
            .request(
                payload,
                SendOptions {
                    target: Some(self.id.clone()),
                    res_required: true,
                    ..SendOptions::default()
                },
                &[expected],
            )
            .await?;
        Ok(packet.payload)
    }

    /// Send a payload and wait for the device's acknowledgement.
    async fn acked(&self, payload: Payload) -> Result<()> {
        self.client
            .request(
                payload,
                SendOptions {
                    target: Some(self.id.clone()),
                    ack_required: true,
                    ..SendOptions::default()
                },
                &[],
            )
            .await
            .map(drop)
    }
}

/// Which reply kind a zone query registers for.
fn zone_response_kind(start: u8, end: Option<u8>) -> MessageKind {
    match end {
        None => MessageKind::StateZone,
        Some(end) if end == start => MessageKind::StateZone,
        Some(_) => MessageKind::StateMultiZone,
    }
}

fn color_to_wire(hue: u16, saturation: u8, brightness: u8, kelvin: Option<u16>) -> Result<Hsbk> {
    if hue > HUE_MAX {
        return Err(Error::validation(format!(
            "hue must be between 0 and {HUE_MAX}, got {hue}"
        )));
    }
    if saturation > PERCENT_MAX {
        return Err(Error::validation(format!(
            "saturation must be between 0 and {PERCENT_MAX}, got {saturation}"
        )));
    }
    if brightness > PERCENT_MAX {
        return Err(Error::validation(format!(
            "brightness must be between 0 and {PERCENT_MAX}, got {brightness}"
        )));
    }
    let kelvin = kelvin.unwrap_or(KELVIN_DEFAULT);
    if !(KELVIN_MIN..=KELVIN_MAX).contains(&kelvin) {
        return Err(Error::validation(format!(
            "kelvin must be between {KELVIN_MIN} and {KELVIN_MAX}, got {kelvin}"
        )));
    }
    Ok(Hsbk {
        hue: scale_to_wire(hue as u32, HUE_MAX as u32),
        saturation: scale_to_wire(saturation as u32, PERCENT_MAX as u32),
        brightness: scale_to_wire(brightness as u32, PERCENT_MAX as u32),
        kelvin,
    })
}

fn validate_relay_index(relay_index: u8) -> Result<()> {
    if relay_index > 3 {
        return Err(Error::validation(format!(
            "relay index must be between 0 and 3, got {relay_index}"
        )));
    }
    Ok(())
}

/// Scale a human value (0..=max) onto the full 16-bit wire range.
fn scale_to_wire(value: u32, max: u32) -> u16 {
    ((value * u16::MAX as u32 + max / 2) / max) as u16
}

/// Scale a 16-bit wire value back onto 0..=max.
fn scale_from_wire(value: u16, max: u32) -> u32 {
    (value as u32 * max + (u16::MAX as u32) / 2) / u16::MAX as u32
}

fn random_instance_id() -> u32 {
    let bytes = *Uuid::new_v4().as_bytes();
    u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]])
}

fn unexpected(kind: MessageKind) -> Error {
    Error::format(format!("unexpected reply kind {kind}"))
}
