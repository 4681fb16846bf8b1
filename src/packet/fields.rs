//! Fixed-size sub-structures shared between packet payloads.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// Maximum byte length of a device label on the wire.
pub const LABEL_SIZE: usize = 32;

/// A color in the wire representation: Hue/Saturation/Brightness/Kelvin.
///
/// Hue, saturation and brightness span the full 16-bit range. Kelvin is
/// carried raw; lights accept roughly 2500 (warm) to 9000 (cool). The
/// human-facing ranges (degrees and percent) live in [`crate::Light`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Hsbk {
    pub hue: u16,
    pub saturation: u16,
    pub brightness: u16,
    pub kelvin: u16,
}

impl Hsbk {
    /// Encoded size in bytes.
    pub const SIZE: usize = 8;

    pub(crate) fn write(&self, buf: &mut Vec<u8>) {
        buf.write_u16::<LittleEndian>(self.hue).unwrap();
        buf.write_u16::<LittleEndian>(self.saturation).unwrap();
        buf.write_u16::<LittleEndian>(self.brightness).unwrap();
        buf.write_u16::<LittleEndian>(self.kelvin).unwrap();
    }

    pub(crate) fn read(c: &mut Cursor<&[u8]>) -> Result<Self> {
        Ok(Hsbk {
            hue: c.read_u16::<LittleEndian>().map_err(short_read)?,
            saturation: c.read_u16::<LittleEndian>().map_err(short_read)?,
            brightness: c.read_u16::<LittleEndian>().map_err(short_read)?,
            kelvin: c.read_u16::<LittleEndian>().map_err(short_read)?,
        })
    }
}

/// One tile of a device chain (matrix-capable devices).
///
/// Accelerometer axes and the user-assigned position let a client work out
/// how the physical tiles are arranged. Reserved fields are carried so that
/// decoded packets re-encode bit-for-bit.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Tile {
    pub accel_meas_x: u16,
    pub accel_meas_y: u16,
    pub accel_meas_z: u16,
    pub reserved0: u16,
    pub user_x: f32,
    pub user_y: f32,
    pub width: u8,
    pub height: u8,
    pub reserved1: u8,
    pub device_version_vendor: u32,
    pub device_version_product: u32,
    pub device_version_version: u32,
    pub firmware_build: u64,
    pub reserved2: u64,
    pub firmware_version_minor: u16,
    pub firmware_version_major: u16,
    pub reserved3: u32,
}

impl Tile {
    /// Encoded size in bytes.
    pub const SIZE: usize = 55;

    pub(crate) fn write(&self, buf: &mut Vec<u8>) {
        buf.write_u16::<LittleEndian>(self.accel_meas_x).unwrap();
        buf.write_u16::<LittleEndian>(self.accel_meas_y).unwrap();
        buf.write_u16::<LittleEndian>(self.accel_meas_z).unwrap();
        buf.write_u16::<LittleEndian>(self.reserved0).unwrap();
        buf.write_f32::<LittleEndian>(self.user_x).unwrap();
        buf.write_f32::<LittleEndian>(self.user_y).unwrap();
        buf.write_u8(self.width).unwrap();
        buf.write_u8(self.height).unwrap();
        buf.write_u8(self.reserved1).unwrap();
        buf.write_u32::<LittleEndian>(self.device_version_vendor)
            .unwrap();
        buf.write_u32::<LittleEndian>(self.device_version_product)
            .unwrap();
        buf.write_u32::<LittleEndian>(self.device_version_version)
            .unwrap();
        buf.write_u64::<LittleEndian>(self.firmware_build).unwrap();
        buf.write_u64::<LittleEndian>(self.reserved2).unwrap();
        buf.write_u16::<LittleEndian>(self.firmware_version_minor)
            .unwrap();
        buf.write_u16::<LittleEndian>(self.firmware_version_major)
            .unwrap();
        buf.write_u32::<LittleEndian>(self.reserved3).unwrap();
    }

    pub(crate) fn read(c: &mut Cursor<&[u8]>) -> Result<Self> {
        Ok(Tile {
            accel_meas_x: c.read_u16::<LittleEndian>().map_err(short_read)?,
            accel_meas_y: c.read_u16::<LittleEndian>().map_err(short_read)?,
            accel_meas_z: c.read_u16::<LittleEndian>().map_err(short_read)?,
            reserved0: c.read_u16::<LittleEndian>().map_err(short_read)?,
            user_x: c.read_f32::<LittleEndian>().map_err(short_read)?,
            user_y: c.read_f32::<LittleEndian>().map_err(short_read)?,
            width: c.read_u8().map_err(short_read)?,
            height: c.read_u8().map_err(short_read)?,
            reserved1: c.read_u8().map_err(short_read)?,
            device_version_vendor: c.read_u32::<LittleEndian>().map_err(short_read)?,
            device_version_product: c.read_u32::<LittleEndian>().map_err(short_read)?,
            device_version_version: c.read_u32::<LittleEndian>().map_err(short_read)?,
            firmware_build: c.read_u64::<LittleEndian>().map_err(short_read)?,
            reserved2: c.read_u64::<LittleEndian>().map_err(short_read)?,
            firmware_version_minor: c.read_u16::<LittleEndian>().map_err(short_read)?,
            firmware_version_major: c.read_u16::<LittleEndian>().map_err(short_read)?,
            reserved3: c.read_u32::<LittleEndian>().map_err(short_read)?,
        })
    }
}

/// Append a label as a fixed 32-byte zero-padded UTF-8 field.
///
/// Labels longer than 32 bytes are rejected rather than silently cut.
pub(crate) fn write_label(buf: &mut Vec<u8>, label: &str) -> Result<()> {
    let bytes = label.as_bytes();
    if bytes.len() > LABEL_SIZE {
        return Err(Error::validation(format!(
            "label exceeds {LABEL_SIZE} bytes: {:?}",
            label
        )));
    }
    buf.extend_from_slice(bytes);
    buf.extend(std::iter::repeat(0u8).take(LABEL_SIZE - bytes.len()));
    Ok(())
}

/// Read a fixed 32-byte label, stripping the zero padding.
pub(crate) fn read_label(c: &mut Cursor<&[u8]>) -> Result<String> {
    let mut raw = [0u8; LABEL_SIZE];
    std::io::Read::read_exact(c, &mut raw).map_err(short_read)?;
    let end = raw.iter().position(|&b| b == 0).unwrap_or(LABEL_SIZE);
    Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
}

pub(crate) fn short_read(_: std::io::Error) -> Error {
    Error::format("buffer too short for declared packet type")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip_hsbk(color: Hsbk) -> Hsbk {
        let mut buf = Vec::new();
        color.write(&mut buf);
        assert_eq!(buf.len(), Hsbk::SIZE);
        Hsbk::read(&mut Cursor::new(buf.as_slice())).unwrap()
    }

    #[test]
    fn test_hsbk_roundtrip_boundaries() {
        for color in [
            Hsbk::default(),
            Hsbk {
                hue: 0x8000,
                saturation: 0x1234,
                brightness: 0xabcd,
                kelvin: 3500,
            },
            Hsbk {
                hue: u16::MAX,
                saturation: u16::MAX,
                brightness: u16::MAX,
                kelvin: u16::MAX,
            },
        ] {
            assert_eq!(roundtrip_hsbk(color), color);
        }
    }

    #[test]
    fn test_hsbk_wire_order_little_endian() {
        let mut buf = Vec::new();
        Hsbk {
            hue: 0x1122,
            saturation: 0x3344,
            brightness: 0x5566,
            kelvin: 0x7788,
        }
        .write(&mut buf);
        assert_eq!(buf, [0x22, 0x11, 0x44, 0x33, 0x66, 0x55, 0x88, 0x77]);
    }

    #[test]
    fn test_tile_roundtrip() {
        let tile = Tile {
            accel_meas_x: 1,
            accel_meas_y: 2,
            accel_meas_z: 3,
            user_x: 1.5,
            user_y: -0.25,
            width: 8,
            height: 8,
            device_version_vendor: 1,
            device_version_product: 55,
            device_version_version: 10,
            firmware_build: 1_548_977_726_000_000_000,
            firmware_version_minor: 50,
            firmware_version_major: 3,
            ..Tile::default()
        };
        let mut buf = Vec::new();
        tile.write(&mut buf);
        assert_eq!(buf.len(), Tile::SIZE);
        assert_eq!(Tile::read(&mut Cursor::new(buf.as_slice())).unwrap(), tile);
    }

    #[test]
    fn test_label_padding_and_roundtrip() {
        let mut buf = Vec::new();
        write_label(&mut buf, "Kitchen").unwrap();
        assert_eq!(buf.len(), LABEL_SIZE);
        assert_eq!(&buf[..7], b"Kitchen");
        assert!(buf[7..].iter().all(|&b| b == 0));
        assert_eq!(
            read_label(&mut Cursor::new(buf.as_slice())).unwrap(),
            "Kitchen"
        );
    }

    #[test]
    fn test_label_overflow_rejected() {
        let mut buf = Vec::new();
        let err = write_label(&mut buf, &"x".repeat(33)).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_label_exactly_32_bytes() {
        let label = "y".repeat(32);
        let mut buf = Vec::new();
        write_label(&mut buf, &label).unwrap();
        assert_eq!(
            read_label(&mut Cursor::new(buf.as_slice())).unwrap(),
            label
        );
    }
}
