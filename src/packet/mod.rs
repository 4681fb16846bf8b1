//! The binary packet codec for the LIFX LAN wire format.
//!
//! A packet is a fixed 36-byte header followed by a type-specific payload.
//! All multi-byte integers are little-endian. Reserved header regions are
//! always written as zero; inbound packets may carry anything there.

mod fields;
mod message;

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

pub use fields::{Hsbk, LABEL_SIZE, Tile};
pub use message::{
    ApplicationRequest, DEVICE_CHAIN_SLOTS, MessageKind, MoveDirection, MultiZoneEffect, Payload,
    TILE_STATE_COLORS, Waveform,
};

use crate::errors::Error;
use fields::short_read;

type Result<T> = std::result::Result<T, Error>;

/// Size of the packet header in bytes.
pub const HEADER_SIZE: usize = 36;

/// The protocol number carried in every packet.
pub const PROTOCOL_NUMBER: u16 = 1024;

/// The UDP port LIFX devices listen on.
pub const DEFAULT_PORT: u16 = 56700;

/// The packet header.
///
/// `target` is a 6-byte device MAC followed by two zero bytes, or all zeros
/// for a broadcast. `sequence` wraps at 255 and correlates replies with the
/// request that triggered them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Total packet size in bytes, header included.
    pub size: u16,
    /// 2-bit message origin indicator, normally zero.
    pub origin: u8,
    /// Set when the target field addresses all devices.
    pub tagged: bool,
    /// Must be set; the header carries a target address.
    pub addressable: bool,
    /// 12-bit protocol number, always [`PROTOCOL_NUMBER`].
    pub protocol: u16,
    /// Client-chosen source identifier echoed back in replies.
    pub source: u32,
    pub target: [u8; 8],
    pub ack_required: bool,
    pub res_required: bool,
    pub sequence: u8,
    /// Numeric message type id; decoded packets also expose it as a
    /// [`MessageKind`] through their payload.
    pub message_type: u16,
}

impl Header {
    /// Pack the header into its 36-byte wire form.
    ///
    /// Fields wider than their declared bit width are rejected before any
    /// bytes are written.
    pub fn pack(&self) -> Result<Vec<u8>> {
        if self.origin > 0b11 {
            return Err(Error::validation(format!(
                "origin must fit 2 bits, got {}",
                self.origin
            )));
        }
        if self.protocol > 0x0fff {
            return Err(Error::validation(format!(
                "protocol must fit 12 bits, got {}",
                self.protocol
            )));
        }

        let mut buf = Vec::with_capacity(HEADER_SIZE);
        buf.write_u16::<LittleEndian>(self.size).unwrap();

        let mut flags: u16 = u16::from(self.origin) << 14;
        flags |= u16::from(self.tagged) << 13;
        flags |= u16::from(self.addressable) << 12;
        flags |= self.protocol & 0x0fff;
        buf.write_u16::<LittleEndian>(flags).unwrap();

        buf.write_u32::<LittleEndian>(self.source).unwrap();
        buf.extend_from_slice(&self.target);
        buf.extend_from_slice(&[0u8; 6]);
        buf.write_u8(u8::from(self.ack_required) << 1 | u8::from(self.res_required))
            .unwrap();
        buf.write_u8(self.sequence).unwrap();
        buf.write_u64::<LittleEndian>(0).unwrap();
        buf.write_u16::<LittleEndian>(self.message_type).unwrap();
        buf.write_u16::<LittleEndian>(0).unwrap();
        Ok(buf)
    }

    /// Unpack a header from the first 36 bytes of `buf`.
    pub fn unpack(buf: &[u8]) -> Result<Header> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::format(format!(
                "packet shorter than header: {} < {HEADER_SIZE}",
                buf.len()
            )));
        }
        let mut c = Cursor::new(buf);

        let size = c.read_u16::<LittleEndian>().map_err(short_read)?;
        let flags = c.read_u16::<LittleEndian>().map_err(short_read)?;
        let origin = ((flags >> 14) & 0b11) as u8;
        let tagged = flags & (1 << 13) != 0;
        let addressable = flags & (1 << 12) != 0;
        let protocol = flags & 0x0fff;
        if protocol != PROTOCOL_NUMBER {
            return Err(Error::format(format!(
                "unsupported protocol number {protocol}"
            )));
        }

        let source = c.read_u32::<LittleEndian>().map_err(short_read)?;
        let mut target = [0u8; 8];
        std::io::Read::read_exact(&mut c, &mut target).map_err(short_read)?;
        let mut reserved = [0u8; 6];
        std::io::Read::read_exact(&mut c, &mut reserved).map_err(short_read)?;
        let bits = c.read_u8().map_err(short_read)?;
        let ack_required = bits & 0b10 != 0;
        let res_required = bits & 0b01 != 0;
        let sequence = c.read_u8().map_err(short_read)?;
        c.read_u64::<LittleEndian>().map_err(short_read)?;
        let message_type = c.read_u16::<LittleEndian>().map_err(short_read)?;
        c.read_u16::<LittleEndian>().map_err(short_read)?;

        Ok(Header {
            size,
            origin,
            tagged,
            addressable,
            protocol,
            source,
            target,
            ack_required,
            res_required,
            sequence,
            message_type,
        })
    }
}

/// Per-packet routing options supplied by the sender.
#[derive(Debug, Clone, Copy, Default)]
pub struct PacketOptions {
    /// Device target, or `None` to broadcast to all devices.
    pub target: Option<[u8; 8]>,
    /// Ask the device to confirm receipt with an acknowledgement.
    pub ack_required: bool,
    /// Ask the device to answer with its matching State message.
    pub res_required: bool,
    /// Wrap-around sequence number correlating the reply.
    pub sequence: u8,
    /// Client source identifier.
    pub source: u32,
}

/// A complete message: header plus decoded payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub header: Header,
    pub payload: Payload,
}

impl Packet {
    /// Build a packet for the given payload, filling in the header.
    pub fn compose(payload: Payload, options: PacketOptions) -> Packet {
        let header = Header {
            size: 0,
            origin: 0,
            tagged: options.target.is_none(),
            addressable: true,
            protocol: PROTOCOL_NUMBER,
            source: options.source,
            target: options.target.unwrap_or([0u8; 8]),
            ack_required: options.ack_required,
            res_required: options.res_required,
            sequence: options.sequence,
            message_type: payload.kind().id(),
        };
        Packet { header, payload }
    }

    /// Encode the packet to wire bytes; the header size field is computed.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        self.payload.write(&mut body)?;

        let mut header = self.header;
        header.size = (HEADER_SIZE + body.len()) as u16;
        header.message_type = self.payload.kind().id();

        let mut buf = header.pack()?;
        buf.extend_from_slice(&body);
        Ok(buf)
    }

    /// Decode wire bytes into a packet.
    ///
    /// Fails with [`Error::Format`] when the type id is unrecognized or the
    /// buffer length disagrees with the size declared for that type.
    pub fn parse(buf: &[u8]) -> Result<Packet> {
        let header = Header::unpack(buf)?;
        if header.size as usize != buf.len() {
            return Err(Error::format(format!(
                "declared packet size {} does not match buffer length {}",
                header.size,
                buf.len()
            )));
        }
        let kind = MessageKind::from_id(header.message_type).ok_or_else(|| {
            Error::format(format!("unrecognized message type id {}", header.message_type))
        })?;
        let payload = Payload::read(kind, &buf[HEADER_SIZE..])?;
        Ok(Packet { header, payload })
    }
}

/// Convert a device identifier (12 lowercase-hex characters, the MAC) into
/// the 8-byte header target field.
pub fn target_from_id(id: &str) -> Result<[u8; 8]> {
    if id.len() != 12 || !id.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::validation(format!(
            "device identifier must be 12 hex characters, got {id:?}"
        )));
    }
    let mut target = [0u8; 8];
    for (i, chunk) in id.as_bytes().chunks(2).enumerate() {
        let hex = std::str::from_utf8(chunk).expect("chunk of an ascii string");
        target[i] = u8::from_str_radix(hex, 16).expect("validated hex digits");
    }
    Ok(target)
}

/// Derive the lowercase-hex device identifier from a header target field.
pub fn id_from_target(target: &[u8; 8]) -> String {
    target[..6].iter().map(|b| format!("{b:02x}")).collect()
}
