use std::io::{self, Read, Seek, Write};

use binrw::{BinRead, BinResult, BinWrite, Endian};
use glam::Vec3;

/// Resolution of one packed-XYZ step.
pub const PACKED_XYZ_STEP: f32 = 0.25;

/// Largest magnitude representable on the packed x and y axes (11 bits).
pub const PACKED_XY_LIMIT: f32 = 1024.0 * PACKED_XYZ_STEP;

/// Largest magnitude representable on the packed z axis (10 bits).
pub const PACKED_Z_LIMIT: f32 = 512.0 * PACKED_XYZ_STEP;

/// Packs an offset into 11/11/10 signed bits of quarter units.
pub fn pack_xyz(offset: Vec3) -> u32 {
    let x = (offset.x / PACKED_XYZ_STEP) as i32 as u32;
    let y = (offset.y / PACKED_XYZ_STEP) as i32 as u32;
    let z = (offset.z / PACKED_XYZ_STEP) as i32 as u32;
    (x & 0x7FF) | ((y & 0x7FF) << 11) | ((z & 0x3FF) << 22)
}

pub fn unpack_xyz(packed: u32) -> Vec3 {
    let x = ((packed << 21) as i32) >> 21;
    let y = ((packed << 10) as i32) >> 21;
    let z = (packed as i32) >> 22;
    Vec3::new(x as f32, y as f32, z as f32) * PACKED_XYZ_STEP
}

/// Whether `offset` survives [`pack_xyz`] without wrapping.
pub fn fits_packed_xyz(offset: Vec3) -> bool {
    offset.x.abs() < PACKED_XY_LIMIT
        && offset.y.abs() < PACKED_XY_LIMIT
        && offset.z.abs() < PACKED_Z_LIMIT
}

/// A guid on the wire: a mask byte, then only the non-zero bytes, low first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PackedGuid(pub u64);

impl BinRead for PackedGuid {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        (): Self::Args<'_>,
    ) -> BinResult<Self> {
        let mask = u8::read_options(reader, endian, ())?;
        let mut bytes = [0u8; 8];
        for (index, byte) in bytes.iter_mut().enumerate() {
            if mask & (1 << index) != 0 {
                *byte = u8::read_options(reader, endian, ())?;
            }
        }
        Ok(Self(u64::from_le_bytes(bytes)))
    }
}

impl BinWrite for PackedGuid {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        (): Self::Args<'_>,
    ) -> BinResult<()> {
        let bytes = self.0.to_le_bytes();
        let mask = bytes
            .iter()
            .enumerate()
            .filter(|(_, byte)| **byte != 0)
            .fold(0u8, |mask, (index, _)| mask | (1 << index));

        mask.write_options(writer, endian, ())?;
        for byte in bytes.into_iter().filter(|byte| *byte != 0) {
            byte.write_options(writer, endian, ())?;
        }
        Ok(())
    }
}

/// MSB-first bit writer borrowing a byte sink.
///
/// Bits only reach the sink in whole bytes; [`BitWriter::flush`] pads the
/// last one with zeros and gives the sink back for byte-level writes.
pub struct BitWriter<'a, W> {
    writer: &'a mut W,
    value: u8,
    pos: u8,
}

impl<'a, W: Write> BitWriter<'a, W> {
    pub fn new(writer: &'a mut W) -> Self {
        Self {
            writer,
            value: 0,
            pos: 0,
        }
    }

    pub fn write_bit(&mut self, bit: bool) -> io::Result<()> {
        if bit {
            self.value |= 0x80 >> self.pos;
        }
        self.pos += 1;
        if self.pos == 8 {
            self.writer.write_all(&[self.value])?;
            self.value = 0;
            self.pos = 0;
        }
        Ok(())
    }

    /// Writes the low `count` bits of `value`, most significant first.
    pub fn write_bits(&mut self, value: u32, count: u8) -> io::Result<()> {
        for shift in (0..count).rev() {
            self.write_bit((value >> shift) & 1 != 0)?;
        }
        Ok(())
    }

    pub fn flush(self) -> io::Result<()> {
        if self.pos > 0 {
            self.writer.write_all(&[self.value])?;
        }
        Ok(())
    }
}

/// Reader for [`BitWriter`] output. Dropping it discards the rest of a
/// partially read byte.
pub struct BitReader<'a, R> {
    reader: &'a mut R,
    value: u8,
    pos: u8,
}

impl<'a, R: Read> BitReader<'a, R> {
    pub fn new(reader: &'a mut R) -> Self {
        Self {
            reader,
            value: 0,
            pos: 0,
        }
    }

    pub fn read_bit(&mut self) -> io::Result<bool> {
        if self.pos == 0 {
            let mut byte = [0u8];
            self.reader.read_exact(&mut byte)?;
            self.value = byte[0];
        }
        let bit = self.value & (0x80 >> self.pos) != 0;
        self.pos = (self.pos + 1) % 8;
        Ok(bit)
    }

    pub fn read_bits(&mut self, count: u8) -> io::Result<u32> {
        let mut value = 0;
        for _ in 0..count {
            value = (value << 1) | u32::from(self.read_bit()?);
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use binrw::{BinReaderExt, BinWriterExt};

    use super::*;

    #[test]
    fn packed_guid_skips_zero_bytes() {
        let mut cursor = Cursor::new(Vec::new());
        cursor.write_le(&PackedGuid(0xF130_0000_0000_002A)).unwrap();
        assert_eq!(cursor.get_ref(), &[0b1100_0001, 0x2A, 0x30, 0xF1]);

        let mut empty = Cursor::new(Vec::new());
        empty.write_le(&PackedGuid(0)).unwrap();
        assert_eq!(empty.into_inner(), vec![0]);

        cursor.set_position(0);
        let guid: PackedGuid = cursor.read_le().unwrap();
        assert_eq!(guid, PackedGuid(0xF130_0000_0000_002A));
        assert_eq!(cursor.position(), 4);
    }

    #[test]
    fn truncated_guid_fails() {
        // mask promises two bytes, one follows
        let mut cursor = Cursor::new(vec![0b0000_0011, 0x01]);
        assert!(cursor.read_le::<PackedGuid>().is_err());
    }

    #[test]
    fn bits_are_msb_first_and_flushed() {
        let mut bytes = Vec::new();
        let mut bits = BitWriter::new(&mut bytes);
        bits.write_bits(3, 2).unwrap();
        bits.write_bit(false).unwrap();
        bits.flush().unwrap();
        let mut bits = BitWriter::new(&mut bytes);
        bits.write_bit(true).unwrap();
        bits.flush().unwrap();
        bytes.push(0x55);

        assert_eq!(bytes, vec![0b1100_0000, 0b1000_0000, 0x55]);

        let mut cursor = Cursor::new(bytes);
        let mut bits = BitReader::new(&mut cursor);
        assert_eq!(bits.read_bits(2).unwrap(), 3);
        assert!(!bits.read_bit().unwrap());
        let mut bits = BitReader::new(&mut cursor);
        assert!(bits.read_bit().unwrap());
        assert_eq!(cursor.read_le::<u8>().unwrap(), 0x55);
    }

    #[test]
    fn full_byte_needs_no_flush() {
        let mut bytes = Vec::new();
        let mut bits = BitWriter::new(&mut bytes);
        bits.write_bits(0xA5, 8).unwrap();
        bits.flush().unwrap();
        assert_eq!(bytes, vec![0xA5]);

        let mut nothing = Vec::new();
        BitWriter::new(&mut nothing).flush().unwrap();
        assert!(nothing.is_empty());
    }

    #[test]
    fn reading_past_end_fails() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        let mut bits = BitReader::new(&mut cursor);
        assert_eq!(
            bits.read_bit().unwrap_err().kind(),
            io::ErrorKind::UnexpectedEof
        );
    }

    #[test]
    fn packed_xyz_precision() {
        let offsets = [
            Vec3::new(12.3, -45.6, 7.8),
            Vec3::new(-255.5, 255.5, -127.5),
            Vec3::new(0.1, -0.1, 0.0),
        ];
        for offset in offsets {
            assert!(fits_packed_xyz(offset));
            let decoded = unpack_xyz(pack_xyz(offset));
            assert!((decoded - offset).abs().max_element() < PACKED_XYZ_STEP, "{offset}");
        }
        assert!(!fits_packed_xyz(Vec3::new(0.0, 0.0, 200.0)));
    }
}
