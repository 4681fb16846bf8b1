//! The message-type registry and per-type payload codecs.
//!
//! Every message the client understands is a variant of [`Payload`], keyed by
//! a [`MessageKind`] that carries both the numeric wire id and the symbolic
//! camelCase name. The registry is a closed enum: unknown type ids fail
//! decoding with [`Error::Format`] instead of being carried opaquely.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::errors::Error;
use crate::packet::fields::{Hsbk, Tile, read_label, short_read, write_label};

type Result<T> = std::result::Result<T, Error>;

/// Number of tile slots carried by a stateDeviceChain packet.
pub const DEVICE_CHAIN_SLOTS: usize = 16;
/// Number of colors carried by a stateTileState64 packet.
pub const TILE_STATE_COLORS: usize = 64;

/// Every message type the client can encode or decode.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, IntoStaticStr, Display,
)]
#[strum(serialize_all = "camelCase")]
pub enum MessageKind {
    GetService,
    StateService,
    GetHostInfo,
    StateHostInfo,
    GetHostFirmware,
    StateHostFirmware,
    GetWifiInfo,
    StateWifiInfo,
    GetWifiFirmware,
    StateWifiFirmware,
    GetLabel,
    SetLabel,
    StateLabel,
    GetVersion,
    StateVersion,
    GetInfo,
    StateInfo,
    RebootRequest,
    RebootResponse,
    Acknowledgement,
    GetLocation,
    StateLocation,
    GetGroup,
    StateGroup,
    EchoRequest,
    EchoResponse,
    GetLight,
    SetColor,
    SetWaveform,
    StateLight,
    GetPower,
    SetPower,
    StatePower,
    GetInfrared,
    StateInfrared,
    SetInfrared,
    GetAmbientLight,
    StateAmbientLight,
    SetColorZones,
    GetColorZones,
    StateZone,
    StateMultiZone,
    SetMultiZoneEffect,
    GetDeviceChain,
    StateDeviceChain,
    SetUserPosition,
    GetTileState64,
    StateTileState64,
    SetTileState64,
    GetRelayPower,
    SetRelayPower,
    StateRelayPower,
}

impl MessageKind {
    /// The numeric message type id used in the packet header.
    pub fn id(self) -> u16 {
        match self {
            MessageKind::GetService => 2,
            MessageKind::StateService => 3,
            MessageKind::GetHostInfo => 12,
            MessageKind::StateHostInfo => 13,
            MessageKind::GetHostFirmware => 14,
            MessageKind::StateHostFirmware => 15,
            MessageKind::GetWifiInfo => 16,
            MessageKind::StateWifiInfo => 17,
            MessageKind::GetWifiFirmware => 18,
            MessageKind::StateWifiFirmware => 19,
            MessageKind::GetLabel => 23,
            MessageKind::SetLabel => 24,
            MessageKind::StateLabel => 25,
            MessageKind::GetVersion => 32,
            MessageKind::StateVersion => 33,
            MessageKind::GetInfo => 34,
            MessageKind::StateInfo => 35,
            MessageKind::RebootRequest => 38,
            MessageKind::RebootResponse => 43,
            MessageKind::Acknowledgement => 45,
            MessageKind::GetLocation => 48,
            MessageKind::StateLocation => 50,
            MessageKind::GetGroup => 51,
            MessageKind::StateGroup => 53,
            MessageKind::EchoRequest => 58,
            MessageKind::EchoResponse => 59,
            MessageKind::GetLight => 101,
            MessageKind::SetColor => 102,
            MessageKind::SetWaveform => 103,
            MessageKind::StateLight => 107,
            MessageKind::GetPower => 116,
            MessageKind::SetPower => 117,
            MessageKind::StatePower => 118,
            MessageKind::GetInfrared => 120,
            MessageKind::StateInfrared => 121,
            MessageKind::SetInfrared => 122,
            MessageKind::GetAmbientLight => 401,
            MessageKind::StateAmbientLight => 402,
            MessageKind::SetColorZones => 501,
            MessageKind::GetColorZones => 502,
            MessageKind::StateZone => 503,
            MessageKind::StateMultiZone => 506,
            MessageKind::SetMultiZoneEffect => 508,
            MessageKind::GetDeviceChain => 701,
            MessageKind::StateDeviceChain => 702,
            MessageKind::SetUserPosition => 703,
            MessageKind::GetTileState64 => 707,
            MessageKind::StateTileState64 => 711,
            MessageKind::SetTileState64 => 715,
            MessageKind::GetRelayPower => 816,
            MessageKind::SetRelayPower => 817,
            MessageKind::StateRelayPower => 818,
        }
    }

    /// Look up a kind by its numeric wire id.
    pub fn from_id(id: u16) -> Option<Self> {
        MessageKind::iter().find(|kind| kind.id() == id)
    }

    /// The symbolic camelCase name, e.g. `"stateService"`.
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Whether this kind is sent by devices in reply to a client request.
    ///
    /// Everything else is a client-originated request; receiving one with
    /// our own source id means we are hearing our own broadcast echo.
    pub fn is_reply(self) -> bool {
        matches!(
            self,
            MessageKind::StateService
                | MessageKind::StateHostInfo
                | MessageKind::StateHostFirmware
                | MessageKind::StateWifiInfo
                | MessageKind::StateWifiFirmware
                | MessageKind::StateLabel
                | MessageKind::StateVersion
                | MessageKind::StateInfo
                | MessageKind::RebootResponse
                | MessageKind::Acknowledgement
                | MessageKind::StateLocation
                | MessageKind::StateGroup
                | MessageKind::EchoResponse
                | MessageKind::StateLight
                | MessageKind::StatePower
                | MessageKind::StateInfrared
                | MessageKind::StateAmbientLight
                | MessageKind::StateZone
                | MessageKind::StateMultiZone
                | MessageKind::StateDeviceChain
                | MessageKind::StateTileState64
                | MessageKind::StateRelayPower
        )
    }
}

/// Waveform shapes for transient color effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumString, Display)]
pub enum Waveform {
    Saw = 0,
    Sine = 1,
    HalfSine = 2,
    Triangle = 3,
    Pulse = 4,
}

/// Controls how multizone devices apply pending color changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationRequest {
    /// Buffer the change until a later Apply.
    NoApply = 0,
    /// Apply this change and any pending ones immediately.
    Apply = 1,
    /// Apply only pending changes, ignoring the ones in this message.
    ApplyOnly = 2,
}

/// Firmware effects available on multizone devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumString, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum MultiZoneEffect {
    Off = 0,
    Move = 1,
}

/// Animation direction for the multizone move effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumString, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum MoveDirection {
    Towards = 0,
    Away = 1,
}

impl TryFrom<u8> for Waveform {
    type Error = Error;

    fn try_from(val: u8) -> Result<Self> {
        Waveform::iter()
            .find(|w| *w as u8 == val)
            .ok_or_else(|| Error::format(format!("unknown waveform value {val}")))
    }
}

impl TryFrom<u8> for ApplicationRequest {
    type Error = Error;

    fn try_from(val: u8) -> Result<Self> {
        match val {
            0 => Ok(ApplicationRequest::NoApply),
            1 => Ok(ApplicationRequest::Apply),
            2 => Ok(ApplicationRequest::ApplyOnly),
            _ => Err(Error::format(format!(
                "unknown application request value {val}"
            ))),
        }
    }
}

impl TryFrom<u8> for MultiZoneEffect {
    type Error = Error;

    fn try_from(val: u8) -> Result<Self> {
        MultiZoneEffect::iter()
            .find(|e| *e as u8 == val)
            .ok_or_else(|| Error::format(format!("unknown multizone effect value {val}")))
    }
}

/// A decoded (or to-be-encoded) message payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    GetService,
    StateService {
        service: u8,
        port: u32,
    },
    GetHostInfo,
    StateHostInfo {
        signal: f32,
        tx: u32,
        rx: u32,
    },
    GetHostFirmware,
    StateHostFirmware {
        build: u64,
        version_minor: u16,
        version_major: u16,
    },
    GetWifiInfo,
    StateWifiInfo {
        signal: f32,
        tx: u32,
        rx: u32,
    },
    GetWifiFirmware,
    StateWifiFirmware {
        build: u64,
        version_minor: u16,
        version_major: u16,
    },
    GetLabel,
    SetLabel {
        label: String,
    },
    StateLabel {
        label: String,
    },
    GetVersion,
    StateVersion {
        vendor: u32,
        product: u32,
        version: u32,
    },
    GetInfo,
    StateInfo {
        time: u64,
        uptime: u64,
        downtime: u64,
    },
    RebootRequest,
    RebootResponse,
    Acknowledgement,
    GetLocation,
    StateLocation {
        location: [u8; 16],
        label: String,
        updated_at: u64,
    },
    GetGroup,
    StateGroup {
        group: [u8; 16],
        label: String,
        updated_at: u64,
    },
    EchoRequest {
        payload: [u8; 64],
    },
    EchoResponse {
        payload: [u8; 64],
    },
    GetLight,
    SetColor {
        color: Hsbk,
        /// Transition time in milliseconds.
        duration: u32,
    },
    SetWaveform {
        transient: bool,
        color: Hsbk,
        /// Duration of one cycle in milliseconds.
        period: u32,
        cycles: f32,
        /// Waveform skew, `[-32768, 32767]` scaled to `[0, 1]`.
        skew_ratio: i16,
        waveform: Waveform,
    },
    StateLight {
        color: Hsbk,
        power: u16,
        label: String,
    },
    GetPower,
    SetPower {
        /// 0 (off) or 65535 (on).
        level: u16,
        /// Transition time in milliseconds.
        duration: u32,
    },
    StatePower {
        level: u16,
    },
    GetInfrared,
    StateInfrared {
        brightness: u16,
    },
    SetInfrared {
        brightness: u16,
    },
    GetAmbientLight,
    StateAmbientLight {
        flux: f32,
    },
    SetColorZones {
        start_index: u8,
        end_index: u8,
        color: Hsbk,
        duration: u32,
        apply: ApplicationRequest,
    },
    GetColorZones {
        start_index: u8,
        end_index: u8,
    },
    StateZone {
        count: u8,
        index: u8,
        color: Hsbk,
    },
    StateMultiZone {
        count: u8,
        index: u8,
        colors: [Hsbk; 8],
    },
    SetMultiZoneEffect {
        instance_id: u32,
        effect_type: MultiZoneEffect,
        /// Milliseconds per animation cycle.
        speed: u32,
        /// Effect lifetime in nanoseconds; 0 runs until replaced.
        duration: u64,
        /// Direction parameter, used by the move effect.
        move_direction: u32,
    },
    GetDeviceChain,
    StateDeviceChain {
        start_index: u8,
        /// Always [`DEVICE_CHAIN_SLOTS`] entries; unused slots are zeroed.
        tile_devices: Vec<Tile>,
        total_count: u8,
    },
    SetUserPosition {
        tile_index: u8,
        user_x: f32,
        user_y: f32,
    },
    GetTileState64 {
        tile_index: u8,
        length: u8,
        x: u8,
        y: u8,
        width: u8,
    },
    StateTileState64 {
        tile_index: u8,
        x: u8,
        y: u8,
        width: u8,
        /// Always [`TILE_STATE_COLORS`] entries.
        colors: Vec<Hsbk>,
    },
    SetTileState64 {
        tile_index: u8,
        length: u8,
        x: u8,
        y: u8,
        width: u8,
        /// Transition time in milliseconds.
        duration: u32,
        /// At most [`TILE_STATE_COLORS`] entries.
        colors: Vec<Hsbk>,
    },
    GetRelayPower {
        relay_index: u8,
    },
    SetRelayPower {
        relay_index: u8,
        relay_level: u16,
    },
    StateRelayPower {
        relay_index: u8,
        relay_level: u16,
    },
}

impl Payload {
    /// The message kind this payload belongs to.
    pub fn kind(&self) -> MessageKind {
        match self {
            Payload::GetService => MessageKind::GetService,
            Payload::StateService { .. } => MessageKind::StateService,
            Payload::GetHostInfo => MessageKind::GetHostInfo,
            Payload::StateHostInfo { .. } => MessageKind::StateHostInfo,
            Payload::GetHostFirmware => MessageKind::GetHostFirmware,
            Payload::StateHostFirmware { .. } => MessageKind::StateHostFirmware,
            Payload::GetWifiInfo => MessageKind::GetWifiInfo,
            Payload::StateWifiInfo { .. } => MessageKind::StateWifiInfo,
            Payload::GetWifiFirmware => MessageKind::GetWifiFirmware,
            Payload::StateWifiFirmware { .. } => MessageKind::StateWifiFirmware,
            Payload::GetLabel => MessageKind::GetLabel,
            Payload::SetLabel { .. } => MessageKind::SetLabel,
            Payload::StateLabel { .. } => MessageKind::StateLabel,
            Payload::GetVersion => MessageKind::GetVersion,
            Payload::StateVersion { .. } => MessageKind::StateVersion,
            Payload::GetInfo => MessageKind::GetInfo,
            Payload::StateInfo { .. } => MessageKind::StateInfo,
            Payload::RebootRequest => MessageKind::RebootRequest,
            Payload::RebootResponse => MessageKind::RebootResponse,
            Payload::Acknowledgement => MessageKind::Acknowledgement,
            Payload::GetLocation => MessageKind::GetLocation,
            Payload::StateLocation { .. } => MessageKind::StateLocation,
            Payload::GetGroup => MessageKind::GetGroup,
            Payload::StateGroup { .. } => MessageKind::StateGroup,
            Payload::EchoRequest { .. } => MessageKind::EchoRequest,
            Payload::EchoResponse { .. } => MessageKind::EchoResponse,
            Payload::GetLight => MessageKind::GetLight,
            Payload::SetColor { .. } => MessageKind::SetColor,
            Payload::SetWaveform { .. } => MessageKind::SetWaveform,
            Payload::StateLight { .. } => MessageKind::StateLight,
            Payload::GetPower => MessageKind::GetPower,
            Payload::SetPower { .. } => MessageKind::SetPower,
            Payload::StatePower { .. } => MessageKind::StatePower,
            Payload::GetInfrared => MessageKind::GetInfrared,
            Payload::StateInfrared { .. } => MessageKind::StateInfrared,
            Payload::SetInfrared { .. } => MessageKind::SetInfrared,
            Payload::GetAmbientLight => MessageKind::GetAmbientLight,
            Payload::StateAmbientLight { .. } => MessageKind::StateAmbientLight,
            Payload::SetColorZones { .. } => MessageKind::SetColorZones,
            Payload::GetColorZones { .. } => MessageKind::GetColorZones,
            Payload::StateZone { .. } => MessageKind::StateZone,
            Payload::StateMultiZone { .. } => MessageKind::StateMultiZone,
            Payload::SetMultiZoneEffect { .. } => MessageKind::SetMultiZoneEffect,
            Payload::GetDeviceChain => MessageKind::GetDeviceChain,
            Payload::StateDeviceChain { .. } => MessageKind::StateDeviceChain,
            Payload::SetUserPosition { .. } => MessageKind::SetUserPosition,
            Payload::GetTileState64 { .. } => MessageKind::GetTileState64,
            Payload::StateTileState64 { .. } => MessageKind::StateTileState64,
            Payload::SetTileState64 { .. } => MessageKind::SetTileState64,
            Payload::GetRelayPower { .. } => MessageKind::GetRelayPower,
            Payload::SetRelayPower { .. } => MessageKind::SetRelayPower,
            Payload::StateRelayPower { .. } => MessageKind::StateRelayPower,
        }
    }

    /// Encode the payload body (header excluded) onto `buf`.
    ///
    /// Out-of-range fields are rejected before any bytes are written.
    pub(crate) fn write(&self, buf: &mut Vec<u8>) -> Result<()> {
        match self {
            Payload::GetService
            | Payload::GetHostInfo
            | Payload::GetHostFirmware
            | Payload::GetWifiInfo
            | Payload::GetWifiFirmware
            | Payload::GetLabel
            | Payload::GetVersion
            | Payload::GetInfo
            | Payload::RebootRequest
            | Payload::RebootResponse
            | Payload::Acknowledgement
            | Payload::GetLocation
            | Payload::GetGroup
            | Payload::GetLight
            | Payload::GetPower
            | Payload::GetInfrared
            | Payload::GetAmbientLight
            | Payload::GetDeviceChain => {}
            Payload::StateService { service, port } => {
                buf.write_u8(*service).unwrap();
                buf.write_u32::<LittleEndian>(*port).unwrap();
            }
            Payload::StateHostInfo { signal, tx, rx } | Payload::StateWifiInfo { signal, tx, rx } => {
                buf.write_f32::<LittleEndian>(*signal).unwrap();
                buf.write_u32::<LittleEndian>(*tx).unwrap();
                buf.write_u32::<LittleEndian>(*rx).unwrap();
                buf.write_i16::<LittleEndian>(0).unwrap();
            }
            Payload::StateHostFirmware {
                build,
                version_minor,
                version_major,
            }
            | Payload::StateWifiFirmware {
                build,
                version_minor,
                version_major,
            } => {
                buf.write_u64::<LittleEndian>(*build).unwrap();
                buf.write_u64::<LittleEndian>(0).unwrap();
                buf.write_u16::<LittleEndian>(*version_minor).unwrap();
                buf.write_u16::<LittleEndian>(*version_major).unwrap();
            }
            Payload::SetLabel { label } | Payload::StateLabel { label } => {
                write_label(buf, label)?;
            }
            Payload::StateVersion {
                vendor,
                product,
                version,
            } => {
                buf.write_u32::<LittleEndian>(*vendor).unwrap();
                buf.write_u32::<LittleEndian>(*product).unwrap();
                buf.write_u32::<LittleEndian>(*version).unwrap();
            }
            Payload::StateInfo {
                time,
                uptime,
                downtime,
            } => {
                buf.write_u64::<LittleEndian>(*time).unwrap();
                buf.write_u64::<LittleEndian>(*uptime).unwrap();
                buf.write_u64::<LittleEndian>(*downtime).unwrap();
            }
            Payload::StateLocation {
                location,
                label,
                updated_at,
            } => {
                buf.extend_from_slice(location);
                write_label(buf, label)?;
                buf.write_u64::<LittleEndian>(*updated_at).unwrap();
            }
            Payload::StateGroup {
                group,
                label,
                updated_at,
            } => {
                buf.extend_from_slice(group);
                write_label(buf, label)?;
                buf.write_u64::<LittleEndian>(*updated_at).unwrap();
            }
            Payload::EchoRequest { payload } | Payload::EchoResponse { payload } => {
                buf.extend_from_slice(payload);
            }
            Payload::SetColor { color, duration } => {
                buf.write_u8(0).unwrap();
                color.write(buf);
                buf.write_u32::<LittleEndian>(*duration).unwrap();
            }
            Payload::SetWaveform {
                transient,
                color,
                period,
                cycles,
                skew_ratio,
                waveform,
            } => {
                buf.write_u8(0).unwrap();
                buf.write_u8(u8::from(*transient)).unwrap();
                color.write(buf);
                buf.write_u32::<LittleEndian>(*period).unwrap();
                buf.write_f32::<LittleEndian>(*cycles).unwrap();
                buf.write_i16::<LittleEndian>(*skew_ratio).unwrap();
                buf.write_u8(*waveform as u8).unwrap();
            }
            Payload::StateLight {
                color,
                power,
                label,
            } => {
                color.write(buf);
                buf.write_i16::<LittleEndian>(0).unwrap();
                buf.write_u16::<LittleEndian>(*power).unwrap();
                write_label(buf, label)?;
                buf.write_u64::<LittleEndian>(0).unwrap();
            }
            Payload::SetPower { level, duration } => {
                buf.write_u16::<LittleEndian>(*level).unwrap();
                buf.write_u32::<LittleEndian>(*duration).unwrap();
            }
            Payload::StatePower { level } => {
                buf.write_u16::<LittleEndian>(*level).unwrap();
            }
            Payload::StateInfrared { brightness } | Payload::SetInfrared { brightness } => {
                buf.write_u16::<LittleEndian>(*brightness).unwrap();
            }
            Payload::StateAmbientLight { flux } => {
                buf.write_f32::<LittleEndian>(*flux).unwrap();
            }
            Payload::SetColorZones {
                start_index,
                end_index,
                color,
                duration,
                apply,
            } => {
                buf.write_u8(*start_index).unwrap();
                buf.write_u8(*end_index).unwrap();
                color.write(buf);
                buf.write_u32::<LittleEndian>(*duration).unwrap();
                buf.write_u8(*apply as u8).unwrap();
            }
            Payload::GetColorZones {
                start_index,
                end_index,
            } => {
                buf.write_u8(*start_index).unwrap();
                buf.write_u8(*end_index).unwrap();
            }
            Payload::StateZone {
                count,
                index,
                color,
            } => {
                buf.write_u8(*count).unwrap();
                buf.write_u8(*index).unwrap();
                color.write(buf);
            }
            Payload::StateMultiZone {
                count,
                index,
                colors,
            } => {
                buf.write_u8(*count).unwrap();
                buf.write_u8(*index).unwrap();
                for color in colors {
                    color.write(buf);
                }
            }
            Payload::SetMultiZoneEffect {
                instance_id,
                effect_type,
                speed,
                duration,
                move_direction,
            } => {
                buf.write_u32::<LittleEndian>(*instance_id).unwrap();
                buf.write_u8(*effect_type as u8).unwrap();
                buf.write_u16::<LittleEndian>(0).unwrap();
                buf.write_u32::<LittleEndian>(*speed).unwrap();
                buf.write_u64::<LittleEndian>(*duration).unwrap();
                buf.write_u32::<LittleEndian>(0).unwrap();
                buf.write_u32::<LittleEndian>(0).unwrap();
                // parameter block: parameter 1 is reserved, 2 is the move
                // direction, 3-8 are unused
                buf.write_u32::<LittleEndian>(0).unwrap();
                buf.write_u32::<LittleEndian>(*move_direction).unwrap();
                for _ in 0..5 {
                    buf.write_u32::<LittleEndian>(0).unwrap();
                }
            }
            Payload::StateDeviceChain {
                start_index,
                tile_devices,
                total_count,
            } => {
                if tile_devices.len() != DEVICE_CHAIN_SLOTS {
                    return Err(Error::validation(format!(
                        "stateDeviceChain expects exactly {DEVICE_CHAIN_SLOTS} tile slots, got {}",
                        tile_devices.len()
                    )));
                }
                buf.write_u8(*start_index).unwrap();
                for tile in tile_devices {
                    tile.write(buf);
                }
                buf.write_u8(*total_count).unwrap();
            }
            Payload::SetUserPosition {
                tile_index,
                user_x,
                user_y,
            } => {
                buf.write_u8(*tile_index).unwrap();
                buf.write_u16::<LittleEndian>(0).unwrap();
                buf.write_f32::<LittleEndian>(*user_x).unwrap();
                buf.write_f32::<LittleEndian>(*user_y).unwrap();
            }
            Payload::GetTileState64 {
                tile_index,
                length,
                x,
                y,
                width,
            } => {
                buf.write_u8(*tile_index).unwrap();
                buf.write_u8(*length).unwrap();
                buf.write_u8(0).unwrap();
                buf.write_u8(*x).unwrap();
                buf.write_u8(*y).unwrap();
                buf.write_u8(*width).unwrap();
            }
            Payload::StateTileState64 {
                tile_index,
                x,
                y,
                width,
                colors,
            } => {
                if colors.len() != TILE_STATE_COLORS {
                    return Err(Error::validation(format!(
                        "stateTileState64 expects exactly {TILE_STATE_COLORS} colors, got {}",
                        colors.len()
                    )));
                }
                buf.write_u8(*tile_index).unwrap();
                buf.write_u8(0).unwrap();
                buf.write_u8(*x).unwrap();
                buf.write_u8(*y).unwrap();
                buf.write_u8(*width).unwrap();
                for color in colors {
                    color.write(buf);
                }
            }
            Payload::SetTileState64 {
                tile_index,
                length,
                x,
                y,
                width,
                duration,
                colors,
            } => {
                if colors.is_empty() || colors.len() > TILE_STATE_COLORS {
                    return Err(Error::validation(format!(
                        "setTileState64 expects 1 to {TILE_STATE_COLORS} colors, got {}",
                        colors.len()
                    )));
                }
                buf.write_u8(*tile_index).unwrap();
                buf.write_u8(*length).unwrap();
                buf.write_u8(0).unwrap();
                buf.write_u8(*x).unwrap();
                buf.write_u8(*y).unwrap();
                buf.write_u8(*width).unwrap();
                buf.write_u32::<LittleEndian>(*duration).unwrap();
                for color in colors {
                    color.write(buf);
                }
            }
            Payload::GetRelayPower { relay_index } => {
                buf.write_u8(*relay_index).unwrap();
            }
            Payload::SetRelayPower {
                relay_index,
                relay_level,
            }
            | Payload::StateRelayPower {
                relay_index,
                relay_level,
            } => {
                buf.write_u8(*relay_index).unwrap();
                buf.write_u16::<LittleEndian>(*relay_level).unwrap();
            }
        }
        Ok(())
    }

    /// Decode a payload body (header excluded) for a known kind.
    ///
    /// Fails with [`Error::Format`] when the body length disagrees with the
    /// size declared for the kind.
    pub(crate) fn read(kind: MessageKind, body: &[u8]) -> Result<Payload> {
        let expect = |len: usize| {
            if body.len() != len {
                return Err(Error::format(format!(
                    "invalid length for {kind} packet: {} != {len}",
                    body.len()
                )));
            }
            Ok(Cursor::new(body))
        };

        let payload = match kind {
            MessageKind::GetService => {
                expect(0)?;
                Payload::GetService
            }
            MessageKind::StateService => {
                let mut c = expect(5)?;
                Payload::StateService {
                    service: c.read_u8().map_err(short_read)?,
                    port: c.read_u32::<LittleEndian>().map_err(short_read)?,
                }
            }
            MessageKind::GetHostInfo => {
                expect(0)?;
                Payload::GetHostInfo
            }
            MessageKind::StateHostInfo => {
                let mut c = expect(14)?;
                Payload::StateHostInfo {
                    signal: c.read_f32::<LittleEndian>().map_err(short_read)?,
                    tx: c.read_u32::<LittleEndian>().map_err(short_read)?,
                    rx: c.read_u32::<LittleEndian>().map_err(short_read)?,
                }
            }
            MessageKind::GetHostFirmware => {
                expect(0)?;
                Payload::GetHostFirmware
            }
            MessageKind::StateHostFirmware => {
                let mut c = expect(20)?;
                let build = c.read_u64::<LittleEndian>().map_err(short_read)?;
                c.read_u64::<LittleEndian>().map_err(short_read)?;
                Payload::StateHostFirmware {
                    build,
                    version_minor: c.read_u16::<LittleEndian>().map_err(short_read)?,
                    version_major: c.read_u16::<LittleEndian>().map_err(short_read)?,
                }
            }
            MessageKind::GetWifiInfo => {
                expect(0)?;
                Payload::GetWifiInfo
            }
            MessageKind::StateWifiInfo => {
                let mut c = expect(14)?;
                Payload::StateWifiInfo {
                    signal: c.read_f32::<LittleEndian>().map_err(short_read)?,
                    tx: c.read_u32::<LittleEndian>().map_err(short_read)?,
                    rx: c.read_u32::<LittleEndian>().map_err(short_read)?,
                }
            }
            MessageKind::GetWifiFirmware => {
                expect(0)?;
                Payload::GetWifiFirmware
            }
            MessageKind::StateWifiFirmware => {
                let mut c = expect(20)?;
                let build = c.read_u64::<LittleEndian>().map_err(short_read)?;
                c.read_u64::<LittleEndian>().map_err(short_read)?;
                Payload::StateWifiFirmware {
                    build,
                    version_minor: c.read_u16::<LittleEndian>().map_err(short_read)?,
                    version_major: c.read_u16::<LittleEndian>().map_err(short_read)?,
                }
            }
            MessageKind::GetLabel => {
                expect(0)?;
                Payload::GetLabel
            }
            MessageKind::SetLabel => {
                let mut c = expect(32)?;
                Payload::SetLabel {
                    label: read_label(&mut c)?,
                }
            }
            MessageKind::StateLabel => {
                let mut c = expect(32)?;
                Payload::StateLabel {
                    label: read_label(&mut c)?,
                }
            }
            MessageKind::GetVersion => {
                expect(0)?;
                Payload::GetVersion
            }
            MessageKind::StateVersion => {
                let mut c = expect(12)?;
                Payload::StateVersion {
                    vendor: c.read_u32::<LittleEndian>().map_err(short_read)?,
                    product: c.read_u32::<LittleEndian>().map_err(short_read)?,
                    version: c.read_u32::<LittleEndian>().map_err(short_read)?,
                }
            }
            MessageKind::GetInfo => {
                expect(0)?;
                Payload::GetInfo
            }
            MessageKind::StateInfo => {
                let mut c = expect(24)?;
                Payload::StateInfo {
                    time: c.read_u64::<LittleEndian>().map_err(short_read)?,
                    uptime: c.read_u64::<LittleEndian>().map_err(short_read)?,
                    downtime: c.read_u64::<LittleEndian>().map_err(short_read)?,
                }
            }
            MessageKind::RebootRequest => {
                expect(0)?;
                Payload::RebootRequest
            }
            MessageKind::RebootResponse => {
                expect(0)?;
                Payload::RebootResponse
            }
            MessageKind::Acknowledgement => {
                expect(0)?;
                Payload::Acknowledgement
            }
            MessageKind::GetLocation => {
                expect(0)?;
                Payload::GetLocation
            }
            MessageKind::StateLocation => {
                let mut c = expect(56)?;
                let mut location = [0u8; 16];
                std::io::Read::read_exact(&mut c, &mut location).map_err(short_read)?;
                Payload::StateLocation {
                    location,
                    label: read_label(&mut c)?,
                    updated_at: c.read_u64::<LittleEndian>().map_err(short_read)?,
                }
            }
            MessageKind::GetGroup => {
                expect(0)?;
                Payload::GetGroup
            }
            MessageKind::StateGroup => {
                let mut c = expect(56)?;
                let mut group = [0u8; 16];
                std::io::Read::read_exact(&mut c, &mut group).map_err(short_read)?;
                Payload::StateGroup {
                    group,
                    label: read_label(&mut c)?,
                    updated_at: c.read_u64::<LittleEndian>().map_err(short_read)?,
                }
            }
            MessageKind::EchoRequest => {
                let mut c = expect(64)?;
                let mut payload = [0u8; 64];
                std::io::Read::read_exact(&mut c, &mut payload).map_err(short_read)?;
                Payload::EchoRequest { payload }
            }
            MessageKind::EchoResponse => {
                let mut c = expect(64)?;
                let mut payload = [0u8; 64];
                std::io::Read::read_exact(&mut c, &mut payload).map_err(short_read)?;
                Payload::EchoResponse { payload }
            }
            MessageKind::GetLight => {
                expect(0)?;
                Payload::GetLight
            }
            MessageKind::SetColor => {
                let mut c = expect(13)?;
                c.read_u8().map_err(short_read)?;
                Payload::SetColor {
                    color: Hsbk::read(&mut c)?,
                    duration: c.read_u32::<LittleEndian>().map_err(short_read)?,
                }
            }
            MessageKind::SetWaveform => {
                let mut c = expect(21)?;
                c.read_u8().map_err(short_read)?;
                let transient = c.read_u8().map_err(short_read)? > 0;
                Payload::SetWaveform {
                    transient,
                    color: Hsbk::read(&mut c)?,
                    period: c.read_u32::<LittleEndian>().map_err(short_read)?,
                    cycles: c.read_f32::<LittleEndian>().map_err(short_read)?,
                    skew_ratio: c.read_i16::<LittleEndian>().map_err(short_read)?,
                    waveform: Waveform::try_from(c.read_u8().map_err(short_read)?)?,
                }
            }
            MessageKind::StateLight => {
                let mut c = expect(52)?;
                let color = Hsbk::read(&mut c)?;
                c.read_i16::<LittleEndian>().map_err(short_read)?;
                let power = c.read_u16::<LittleEndian>().map_err(short_read)?;
                let label = read_label(&mut c)?;
                c.read_u64::<LittleEndian>().map_err(short_read)?;
                Payload::StateLight {
                    color,
                    power,
                    label,
                }
            }
            MessageKind::GetPower => {
                expect(0)?;
                Payload::GetPower
            }
            MessageKind::SetPower => {
                let mut c = expect(6)?;
                Payload::SetPower {
                    level: c.read_u16::<LittleEndian>().map_err(short_read)?,
                    duration: c.read_u32::<LittleEndian>().map_err(short_read)?,
                }
            }
            MessageKind::StatePower => {
                let mut c = expect(2)?;
                Payload::StatePower {
                    level: c.read_u16::<LittleEndian>().map_err(short_read)?,
                }
            }
            MessageKind::GetInfrared => {
                expect(0)?;
                Payload::GetInfrared
            }
            MessageKind::StateInfrared => {
                let mut c = expect(2)?;
                Payload::StateInfrared {
                    brightness: c.read_u16::<LittleEndian>().map_err(short_read)?,
                }
            }
            MessageKind::SetInfrared => {
                let mut c = expect(2)?;
                Payload::SetInfrared {
                    brightness: c.read_u16::<LittleEndian>().map_err(short_read)?,
                }
            }
            MessageKind::GetAmbientLight => {
                expect(0)?;
                Payload::GetAmbientLight
            }
            MessageKind::StateAmbientLight => {
                let mut c = expect(4)?;
                Payload::StateAmbientLight {
                    flux: c.read_f32::<LittleEndian>().map_err(short_read)?,
                }
            }
            MessageKind::SetColorZones => {
                let mut c = expect(15)?;
                Payload::SetColorZones {
                    start_index: c.read_u8().map_err(short_read)?,
                    end_index: c.read_u8().map_err(short_read)?,
                    color: Hsbk::read(&mut c)?,
                    duration: c.read_u32::<LittleEndian>().map_err(short_read)?,
                    apply: ApplicationRequest::try_from(c.read_u8().map_err(short_read)?)?,
                }
            }
            MessageKind::GetColorZones => {
                let mut c = expect(2)?;
                Payload::GetColorZones {
                    start_index: c.read_u8().map_err(short_read)?,
                    end_index: c.read_u8().map_err(short_read)?,
                }
            }
            MessageKind::StateZone => {
                let mut c = expect(10)?;
                Payload::StateZone {
                    count: c.read_u8().map_err(short_read)?,
                    index: c.read_u8().map_err(short_read)?,
                    color: Hsbk::read(&mut c)?,
                }
            }
            MessageKind::StateMultiZone => {
                let mut c = expect(66)?;
                let count = c.read_u8().map_err(short_read)?;
                let index = c.read_u8().map_err(short_read)?;
                let mut colors = [Hsbk::default(); 8];
                for color in colors.iter_mut() {
                    *color = Hsbk::read(&mut c)?;
                }
                Payload::StateMultiZone {
                    count,
                    index,
                    colors,
                }
            }
            MessageKind::SetMultiZoneEffect => {
                let mut c = expect(59)?;
                let instance_id = c.read_u32::<LittleEndian>().map_err(short_read)?;
                let effect_type = MultiZoneEffect::try_from(c.read_u8().map_err(short_read)?)?;
                c.read_u16::<LittleEndian>().map_err(short_read)?;
                let speed = c.read_u32::<LittleEndian>().map_err(short_read)?;
                let duration = c.read_u64::<LittleEndian>().map_err(short_read)?;
                c.read_u32::<LittleEndian>().map_err(short_read)?;
                c.read_u32::<LittleEndian>().map_err(short_read)?;
                c.read_u32::<LittleEndian>().map_err(short_read)?;
                let move_direction = c.read_u32::<LittleEndian>().map_err(short_read)?;
                Payload::SetMultiZoneEffect {
                    instance_id,
                    effect_type,
                    speed,
                    duration,
                    move_direction,
                }
            }
            MessageKind::GetDeviceChain => {
                expect(0)?;
                Payload::GetDeviceChain
            }
            MessageKind::StateDeviceChain => {
                let mut c = expect(1 + DEVICE_CHAIN_SLOTS * Tile::SIZE + 1)?;
                let start_index = c.read_u8().map_err(short_read)?;
                let mut tile_devices = Vec::with_capacity(DEVICE_CHAIN_SLOTS);
                for _ in 0..DEVICE_CHAIN_SLOTS {
                    tile_devices.push(Tile::read(&mut c)?);
                }
                Payload::StateDeviceChain {
                    start_index,
                    tile_devices,
                    total_count: c.read_u8().map_err(short_read)?,
                }
            }
            MessageKind::SetUserPosition => {
                let mut c = expect(11)?;
                let tile_index = c.read_u8().map_err(short_read)?;
                c.read_u16::<LittleEndian>().map_err(short_read)?;
                Payload::SetUserPosition {
                    tile_index,
                    user_x: c.read_f32::<LittleEndian>().map_err(short_read)?,
                    user_y: c.read_f32::<LittleEndian>().map_err(short_read)?,
                }
            }
            MessageKind::GetTileState64 => {
                let mut c = expect(6)?;
                let tile_index = c.read_u8().map_err(short_read)?;
                let length = c.read_u8().map_err(short_read)?;
                c.read_u8().map_err(short_read)?;
                Payload::GetTileState64 {
                    tile_index,
                    length,
                    x: c.read_u8().map_err(short_read)?,
                    y: c.read_u8().map_err(short_read)?,
                    width: c.read_u8().map_err(short_read)?,
                }
            }
            MessageKind::StateTileState64 => {
                let mut c = expect(5 + TILE_STATE_COLORS * Hsbk::SIZE)?;
                let tile_index = c.read_u8().map_err(short_read)?;
                c.read_u8().map_err(short_read)?;
                let x = c.read_u8().map_err(short_read)?;
                let y = c.read_u8().map_err(short_read)?;
                let width = c.read_u8().map_err(short_read)?;
                let mut colors = Vec::with_capacity(TILE_STATE_COLORS);
                for _ in 0..TILE_STATE_COLORS {
                    colors.push(Hsbk::read(&mut c)?);
                }
                Payload::StateTileState64 {
                    tile_index,
                    x,
                    y,
                    width,
                    colors,
                }
            }
            MessageKind::SetTileState64 => {
                if body.len() < 10
                    || (body.len() - 10) % Hsbk::SIZE != 0
                    || body.len() > 10 + TILE_STATE_COLORS * Hsbk::SIZE
                {
                    return Err(Error::format(format!(
                        "invalid length for setTileState64 packet: {}",
                        body.len()
                    )));
                }
                let count = (body.len() - 10) / Hsbk::SIZE;
                let mut c = Cursor::new(body);
                let tile_index = c.read_u8().map_err(short_read)?;
                let length = c.read_u8().map_err(short_read)?;
                c.read_u8().map_err(short_read)?;
                let x = c.read_u8().map_err(short_read)?;
                let y = c.read_u8().map_err(short_read)?;
                let width = c.read_u8().map_err(short_read)?;
                let duration = c.read_u32::<LittleEndian>().map_err(short_read)?;
                let mut colors = Vec::with_capacity(count);
                for _ in 0..count {
                    colors.push(Hsbk::read(&mut c)?);
                }
                Payload::SetTileState64 {
                    tile_index,
                    length,
                    x,
                    y,
                    width,
                    duration,
                    colors,
                }
            }
            MessageKind::GetRelayPower => {
                let mut c = expect(1)?;
                Payload::GetRelayPower {
                    relay_index: c.read_u8().map_err(short_read)?,
                }
            }
            MessageKind::SetRelayPower => {
                let mut c = expect(3)?;
                Payload::SetRelayPower {
                    relay_index: c.read_u8().map_err(short_read)?,
                    relay_level: c.read_u16::<LittleEndian>().map_err(short_read)?,
                }
            }
            MessageKind::StateRelayPower => {
                let mut c = expect(3)?;
                Payload::StateRelayPower {
                    relay_index: c.read_u8().map_err(short_read)?,
                    relay_level: c.read_u16::<LittleEndian>().map_err(short_read)?,
                }
            }
        };
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(payload: Payload) {
        let mut body = Vec::new();
        payload.write(&mut body).unwrap();
        let decoded = Payload::read(payload.kind(), &body).unwrap();
        assert_eq!(decoded, payload, "{} did not round-trip", payload.kind());
    }

    #[test]
    fn test_id_lookup() {
        assert_eq!(MessageKind::GetService.id(), 2);
        assert_eq!(MessageKind::SetPower.id(), 117);
        assert_eq!(MessageKind::StateDeviceChain.id(), 702);
        assert_eq!(MessageKind::from_id(45), Some(MessageKind::Acknowledgement));
        assert_eq!(MessageKind::from_id(506), Some(MessageKind::StateMultiZone));
        assert_eq!(MessageKind::from_id(9999), None);
    }

    #[test]
    fn test_symbolic_names() {
        assert_eq!(MessageKind::GetService.name(), "getService");
        assert_eq!(MessageKind::StateTileState64.name(), "stateTileState64");
        assert_eq!(
            "setColorZones".parse::<MessageKind>().unwrap(),
            MessageKind::SetColorZones
        );
        assert!("noSuchPacket".parse::<MessageKind>().is_err());
    }

    #[test]
    fn test_reply_classification() {
        assert!(MessageKind::StateService.is_reply());
        assert!(MessageKind::Acknowledgement.is_reply());
        assert!(MessageKind::RebootResponse.is_reply());
        assert!(!MessageKind::GetService.is_reply());
        assert!(!MessageKind::SetPower.is_reply());
    }

    #[test]
    fn test_ids_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for kind in MessageKind::iter() {
            assert!(seen.insert(kind.id()), "duplicate id for {kind}");
        }
    }

    #[test]
    fn test_empty_payloads_roundtrip() {
        for payload in [
            Payload::GetService,
            Payload::GetHostInfo,
            Payload::GetHostFirmware,
            Payload::GetWifiInfo,
            Payload::GetWifiFirmware,
            Payload::GetLabel,
            Payload::GetVersion,
            Payload::GetInfo,
            Payload::RebootRequest,
            Payload::RebootResponse,
            Payload::Acknowledgement,
            Payload::GetLocation,
            Payload::GetGroup,
            Payload::GetLight,
            Payload::GetPower,
            Payload::GetInfrared,
            Payload::GetAmbientLight,
            Payload::GetDeviceChain,
        ] {
            roundtrip(payload);
        }
    }

    #[test]
    fn test_device_payloads_roundtrip_boundaries() {
        for level in [0u16, 1, u16::MAX] {
            roundtrip(Payload::SetPower {
                level,
                duration: 300,
            });
            roundtrip(Payload::StatePower { level });
        }
        roundtrip(Payload::StateService {
            service: 1,
            port: 56700,
        });
        roundtrip(Payload::StateHostInfo {
            signal: 1.0e-5,
            tx: u32::MAX,
            rx: 0,
        });
        roundtrip(Payload::StateHostFirmware {
            build: u64::MAX,
            version_minor: 70,
            version_major: 3,
        });
        roundtrip(Payload::StateWifiInfo {
            signal: 0.0,
            tx: 42,
            rx: 17,
        });
        roundtrip(Payload::StateWifiFirmware {
            build: 0,
            version_minor: u16::MAX,
            version_major: u16::MAX,
        });
        roundtrip(Payload::SetLabel {
            label: "Bedroom".into(),
        });
        roundtrip(Payload::StateLabel {
            label: "".into(),
        });
        roundtrip(Payload::StateVersion {
            vendor: 1,
            product: 55,
            version: u32::MAX,
        });
        roundtrip(Payload::StateInfo {
            time: u64::MAX,
            uptime: 1,
            downtime: 0,
        });
        roundtrip(Payload::StateLocation {
            location: [0xab; 16],
            label: "Home".into(),
            updated_at: 1_500_000_000_000_000_000,
        });
        roundtrip(Payload::StateGroup {
            group: [1; 16],
            label: "Upstairs".into(),
            updated_at: 0,
        });
        roundtrip(Payload::EchoRequest { payload: [0x5a; 64] });
        roundtrip(Payload::EchoResponse { payload: [0; 64] });
    }

    #[test]
    fn test_light_payloads_roundtrip_boundaries() {
        let full = Hsbk {
            hue: u16::MAX,
            saturation: u16::MAX,
            brightness: u16::MAX,
            kelvin: 9000,
        };
        roundtrip(Payload::SetColor {
            color: full,
            duration: u32::MAX,
        });
        roundtrip(Payload::SetWaveform {
            transient: true,
            color: full,
            period: 500,
            cycles: 10.0,
            skew_ratio: i16::MIN,
            waveform: Waveform::Pulse,
        });
        roundtrip(Payload::StateLight {
            color: Hsbk::default(),
            power: u16::MAX,
            label: "Kitchen".into(),
        });
        roundtrip(Payload::StateInfrared { brightness: u16::MAX });
        roundtrip(Payload::SetInfrared { brightness: 0 });
        roundtrip(Payload::StateAmbientLight { flux: 402.5 });
    }

    #[test]
    fn test_zone_payloads_roundtrip_boundaries() {
        let color = Hsbk {
            hue: 0x8000,
            saturation: 0,
            brightness: u16::MAX,
            kelvin: 2500,
        };
        for (start, end) in [(0u8, 0u8), (0, 7), (255, 255)] {
            roundtrip(Payload::GetColorZones {
                start_index: start,
                end_index: end,
            });
            roundtrip(Payload::SetColorZones {
                start_index: start,
                end_index: end,
                color,
                duration: 0,
                apply: ApplicationRequest::Apply,
            });
        }
        roundtrip(Payload::StateZone {
            count: 16,
            index: 3,
            color,
        });
        let mut colors = [Hsbk::default(); 8];
        colors[7] = color;
        roundtrip(Payload::StateMultiZone {
            count: 16,
            index: 8,
            colors,
        });
        roundtrip(Payload::SetMultiZoneEffect {
            instance_id: 777,
            effect_type: MultiZoneEffect::Move,
            speed: 1000,
            duration: 0,
            move_direction: MoveDirection::Away as u32,
        });
    }

    #[test]
    fn test_tile_payloads_roundtrip() {
        let tile = Tile {
            user_x: 0.5,
            user_y: 1.0,
            width: 8,
            height: 8,
            device_version_vendor: 1,
            device_version_product: 55,
            ..Tile::default()
        };
        let mut tile_devices = vec![Tile::default(); DEVICE_CHAIN_SLOTS];
        tile_devices[0] = tile;
        roundtrip(Payload::StateDeviceChain {
            start_index: 0,
            tile_devices,
            total_count: 1,
        });
        roundtrip(Payload::SetUserPosition {
            tile_index: 2,
            user_x: -1.5,
            user_y: 0.0,
        });
        roundtrip(Payload::GetTileState64 {
            tile_index: 0,
            length: 1,
            x: 0,
            y: 0,
            width: 8,
        });
        roundtrip(Payload::StateTileState64 {
            tile_index: 1,
            x: 0,
            y: 0,
            width: 8,
            colors: vec![Hsbk::default(); TILE_STATE_COLORS],
        });
        roundtrip(Payload::SetTileState64 {
            tile_index: 0,
            length: 1,
            x: 0,
            y: 0,
            width: 8,
            duration: 500,
            colors: vec![
                Hsbk {
                    hue: 1,
                    saturation: 2,
                    brightness: 3,
                    kelvin: 3500,
                };
                9
            ],
        });
    }

    #[test]
    fn test_relay_payloads_roundtrip() {
        roundtrip(Payload::GetRelayPower { relay_index: 3 });
        roundtrip(Payload::SetRelayPower {
            relay_index: 0,
            relay_level: u16::MAX,
        });
        roundtrip(Payload::StateRelayPower {
            relay_index: 1,
            relay_level: 0,
        });
    }

    #[test]
    fn test_state_device_chain_total_count_is_trailing_byte() {
        let payload = Payload::StateDeviceChain {
            start_index: 1,
            tile_devices: vec![Tile::default(); DEVICE_CHAIN_SLOTS],
            total_count: 13,
        };
        let mut body = Vec::new();
        payload.write(&mut body).unwrap();
        assert_eq!(body.len(), 882);
        assert_eq!(body[0], 1);
        assert_eq!(body[881], 13);
    }

    #[test]
    fn test_state_device_chain_wrong_slot_count_rejected() {
        let payload = Payload::StateDeviceChain {
            start_index: 0,
            tile_devices: vec![Tile::default(); 13],
            total_count: 13,
        };
        let mut body = Vec::new();
        assert!(matches!(
            payload.write(&mut body).unwrap_err(),
            Error::Validation(_)
        ));
    }

    #[test]
    fn test_set_power_layout() {
        let mut body = Vec::new();
        Payload::SetPower {
            level: 65535,
            duration: 300,
        }
        .write(&mut body)
        .unwrap();
        assert_eq!(body, [0xff, 0xff, 0x2c, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn test_set_multi_zone_effect_layout() {
        let mut body = Vec::new();
        Payload::SetMultiZoneEffect {
            instance_id: 1,
            effect_type: MultiZoneEffect::Move,
            speed: 2000,
            duration: 0,
            move_direction: MoveDirection::Towards as u32,
        }
        .write(&mut body)
        .unwrap();
        assert_eq!(body.len(), 59);
        assert_eq!(body[4], 1); // effect type follows the instance id
    }

    #[test]
    fn test_wrong_length_rejected() {
        let err = Payload::read(MessageKind::StatePower, &[0xff]).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
        let err = Payload::read(MessageKind::StateDeviceChain, &[0u8; 881]).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
        let err = Payload::read(MessageKind::GetService, &[0]).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
        // 11 bytes is neither 10 nor 10 + a whole number of colors
        let err = Payload::read(MessageKind::SetTileState64, &[0u8; 11]).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn test_label_overflow_rejected_before_any_write() {
        let mut body = Vec::new();
        let err = Payload::SetLabel {
            label: "a".repeat(40),
        }
        .write(&mut body)
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_unknown_enum_values_rejected() {
        let mut body = vec![0u8; 21];
        body[20] = 9; // waveform
        assert!(Payload::read(MessageKind::SetWaveform, &body).is_err());
        let mut body = vec![0u8; 15];
        body[14] = 7; // application request
        assert!(Payload::read(MessageKind::SetColorZones, &body).is_err());
    }
}
