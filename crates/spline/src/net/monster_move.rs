use std::io::{Cursor, Read, Seek, Write};

use binrw::{binrw, BinRead, BinResult, BinWrite, Endian};
use glam::Vec3;

use crate::spline::{FacingSpec, MonsterMoveType, MoveSpline, SplineFlags};
use crate::unit::Mover;

use super::wire::{pack_xyz, unpack_xyz, BitReader, BitWriter, PackedGuid};

#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    #[error("malformed monster move: {0}")]
    Codec(#[from] binrw::Error),
    #[error("invalid monster move mode {0}")]
    InvalidMode(u8),
    #[error("{0} trailing bytes after monster move")]
    TrailingBytes(usize),
}

/// Path section of a monster move.
#[derive(Debug, Clone, PartialEq)]
pub enum MovePath {
    /// Destination plus `midpoint - waypoint` for every interior waypoint,
    /// where the midpoint lies halfway between the first and last waypoint.
    Linear { destination: Vec3, offsets: Vec<Vec3> },
    /// Every waypoint after the start, as literal control points.
    CatmullRom(Vec<Vec3>),
    /// Seam point followed by every waypoint. Clients drop the seam after
    /// the first lap.
    Cyclic(Vec<Vec3>),
    Stop(Vec3),
}

impl MovePath {
    pub fn uncompressed_count(&self) -> usize {
        match self {
            Self::Linear { .. } | Self::Stop(_) => 1,
            Self::CatmullRom(points) | Self::Cyclic(points) => points.len(),
        }
    }

    pub fn compressed_count(&self) -> usize {
        match self {
            Self::Linear { offsets, .. } => offsets.len(),
            _ => 0,
        }
    }

    /// Rebuilds interior waypoints of a linear path given its first point.
    pub fn interior_points(&self, first: Vec3) -> Vec<Vec3> {
        match self {
            Self::Linear {
                destination,
                offsets,
            } => {
                let middle = (first + *destination) * 0.5;
                offsets.iter().map(|offset| middle - *offset).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Literal triples and packed offsets, in wire order.
    fn split(&self) -> (Vec<Vec3>, Vec<Vec3>) {
        match self {
            // fixed single literal waypoint the client parser expects
            Self::Linear {
                destination,
                offsets,
            } => (vec![*destination], offsets.clone()),
            Self::CatmullRom(points) | Self::Cyclic(points) => (points.clone(), Vec::new()),
            Self::Stop(position) => (vec![*position], Vec::new()),
        }
    }
}

/// The spline announcement sent to every observer of a moving unit.
#[derive(Debug, Clone, PartialEq)]
pub struct MonsterMove {
    pub mover: u64,
    pub start: Vec3,
    pub move_ticks: u32,
    pub destination: Vec3,
    pub flags: u32,
    pub animation_id: u8,
    pub animation_time: i32,
    pub elapsed: u32,
    pub duration: u32,
    pub vertical_acceleration: f32,
    pub parabolic_time: i32,
    pub mode: MonsterMoveType,
    pub vehicle_exit_voluntary: bool,
    pub transport: u64,
    pub seat: i8,
    pub path: MovePath,
    pub facing: FacingSpec,
}

/// Transport guid and seat to announce. A spline kept in world space names
/// no transport, so observers never read world points as seat offsets.
fn transport_link<M: Mover + ?Sized>(mover: &M, on_transport: bool) -> (u64, i8) {
    if on_transport {
        (mover.transport_guid(), mover.transport_seat())
    } else {
        (0, -1)
    }
}

impl MonsterMove {
    /// Describes `move_spline` as committed by `mover`.
    pub fn launch<M: Mover + ?Sized>(mover: &M, move_spline: &MoveSpline) -> Self {
        let mut flags = move_spline.flags();
        if move_spline.is_cyclic() {
            flags.insert(SplineFlags::ENTER_CYCLE);
        }

        let real_path = move_spline.spline().real_points();
        let destination = real_path.last().copied().unwrap_or(Vec3::ZERO);

        let path = if move_spline.is_cyclic() {
            let mut points = Vec::with_capacity(real_path.len() + 1);
            points.extend(real_path.first().copied());
            points.extend_from_slice(real_path);
            MovePath::Cyclic(points)
        } else if flags.contains(SplineFlags::UNCOMPRESSED_PATH) {
            MovePath::CatmullRom(real_path.iter().skip(1).copied().collect())
        } else {
            let offsets = match real_path {
                [first, interior @ .., last] => {
                    let middle = (*first + *last) * 0.5;
                    interior.iter().map(|point| middle - *point).collect()
                }
                _ => Vec::new(),
            };
            MovePath::Linear {
                destination,
                offsets,
            }
        };

        let facing = if flags.is_facing() {
            *move_spline.facing()
        } else {
            FacingSpec::None
        };
        let (transport, seat) = transport_link(mover, move_spline.on_transport());

        Self {
            mover: mover.guid(),
            start: mover.position(),
            move_ticks: move_spline.id(),
            destination,
            flags: flags.wire_bits(),
            animation_id: flags.animation_id(),
            animation_time: move_spline.effect_start_time(),
            elapsed: move_spline.time_elapsed().max(0) as u32,
            duration: move_spline.duration().max(0) as u32,
            vertical_acceleration: move_spline.vertical_acceleration(),
            parabolic_time: move_spline.effect_start_time(),
            mode: MonsterMoveType::Normal,
            vehicle_exit_voluntary: false,
            transport,
            seat,
            path,
            facing,
        }
    }

    /// Tells observers the unit halted at `position`, given in the transport
    /// frame when `on_transport` is set.
    pub fn stop<M: Mover + ?Sized>(
        mover: &M,
        position: Vec3,
        on_transport: bool,
        move_ticks: u32,
    ) -> Self {
        let (transport, seat) = transport_link(mover, on_transport);
        Self {
            mover: mover.guid(),
            start: mover.position(),
            move_ticks,
            destination: Vec3::ZERO,
            flags: 0,
            animation_id: 0,
            animation_time: 0,
            elapsed: 0,
            duration: 0,
            vertical_acceleration: 0.0,
            parabolic_time: 0,
            mode: MonsterMoveType::Stop,
            vehicle_exit_voluntary: false,
            transport,
            seat,
            path: MovePath::Stop(position),
            facing: FacingSpec::None,
        }
    }

    pub fn write<W: Write + Seek>(&self, writer: &mut W) -> Result<(), PacketError> {
        MoveFrame::from(self).write(writer)?;
        Ok(())
    }

    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        let mut cursor = Cursor::new(Vec::with_capacity(96));
        self.write(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, PacketError> {
        let mut cursor = Cursor::new(bytes);
        let frame = MoveFrame::read(&mut cursor)?;

        let consumed = usize::try_from(cursor.position()).unwrap_or(usize::MAX);
        let remaining = bytes.len().saturating_sub(consumed);
        if remaining > 0 {
            return Err(PacketError::TrailingBytes(remaining));
        }
        Self::try_from(frame)
    }
}

/// Byte layout of a monster move: the fixed header, the path body and the
/// bit-packed trailer.
#[binrw]
#[brw(little)]
#[derive(Debug)]
struct MoveFrame {
    #[br(map = |guid: PackedGuid| guid.0)]
    #[bw(map = |guid: &u64| PackedGuid(*guid))]
    mover: u64,
    #[br(map = Vec3::from_array)]
    #[bw(map = Vec3::to_array)]
    start: Vec3,
    move_ticks: u32,
    #[br(map = Vec3::from_array)]
    #[bw(map = Vec3::to_array)]
    destination: Vec3,
    flags: u32,
    animation_id: u8,
    animation_time: i32,
    elapsed: u32,
    duration: u32,
    vertical_acceleration: f32,
    parabolic_time: i32,
    #[br(temp)]
    #[bw(try_calc = u32::try_from(points.len()))]
    uncompressed_count: u32,
    mode: u8,
    #[br(map = |exit: u8| exit != 0)]
    #[bw(map = |exit: &bool| u8::from(*exit))]
    vehicle_exit_voluntary: bool,
    #[br(map = |guid: PackedGuid| guid.0)]
    #[bw(map = |guid: &u64| PackedGuid(*guid))]
    transport: u64,
    seat: i8,
    #[br(temp)]
    #[bw(try_calc = u32::try_from(offsets.len()))]
    compressed_count: u32,
    #[br(
        count = uncompressed_count,
        map = |points: Vec<[f32; 3]>| points.into_iter().map(Vec3::from_array).collect::<Vec<_>>()
    )]
    #[bw(map = |points: &Vec<Vec3>| points.iter().map(Vec3::to_array).collect::<Vec<_>>())]
    points: Vec<Vec3>,
    #[br(
        count = compressed_count,
        map = |packed: Vec<u32>| packed.into_iter().map(unpack_xyz).collect::<Vec<_>>()
    )]
    #[bw(map = |offsets: &Vec<Vec3>| offsets.iter().copied().map(pack_xyz).collect::<Vec<_>>())]
    offsets: Vec<Vec3>,
    #[br(map = |trailer: SplineTrailer| trailer.0)]
    #[bw(map = |facing: &FacingSpec| SplineTrailer(*facing))]
    facing: FacingSpec,
}

impl From<&MonsterMove> for MoveFrame {
    fn from(packet: &MonsterMove) -> Self {
        let (points, offsets) = packet.path.split();
        Self {
            mover: packet.mover,
            start: packet.start,
            move_ticks: packet.move_ticks,
            destination: packet.destination,
            flags: packet.flags,
            animation_id: packet.animation_id,
            animation_time: packet.animation_time,
            elapsed: packet.elapsed,
            duration: packet.duration,
            vertical_acceleration: packet.vertical_acceleration,
            parabolic_time: packet.parabolic_time,
            mode: packet.mode as u8,
            vehicle_exit_voluntary: packet.vehicle_exit_voluntary,
            transport: packet.transport,
            seat: packet.seat,
            points,
            offsets,
            facing: packet.facing,
        }
    }
}

impl TryFrom<MoveFrame> for MonsterMove {
    type Error = PacketError;

    fn try_from(frame: MoveFrame) -> Result<Self, Self::Error> {
        let mode = MonsterMoveType::try_from(frame.mode).map_err(PacketError::InvalidMode)?;
        let flags = SplineFlags::from_bits_retain(frame.flags);

        let path = if mode == MonsterMoveType::Stop {
            MovePath::Stop(frame.points.first().copied().unwrap_or(Vec3::ZERO))
        } else if flags.contains(SplineFlags::CYCLIC) {
            MovePath::Cyclic(frame.points)
        } else if flags.contains(SplineFlags::UNCOMPRESSED_PATH) {
            MovePath::CatmullRom(frame.points)
        } else {
            MovePath::Linear {
                destination: frame.points.last().copied().unwrap_or(frame.destination),
                offsets: frame.offsets,
            }
        };

        Ok(Self {
            mover: frame.mover,
            start: frame.start,
            move_ticks: frame.move_ticks,
            destination: frame.destination,
            flags: frame.flags,
            animation_id: frame.animation_id,
            animation_time: frame.animation_time,
            elapsed: frame.elapsed,
            duration: frame.duration,
            vertical_acceleration: frame.vertical_acceleration,
            parabolic_time: frame.parabolic_time,
            mode,
            vehicle_exit_voluntary: frame.vehicle_exit_voluntary,
            transport: frame.transport,
            seat: frame.seat,
            path,
            facing: frame.facing,
        })
    }
}

/// Facing mode bits, the facing payload, then the closing bit group.
#[derive(Debug, Clone, Copy)]
struct SplineTrailer(FacingSpec);

impl BinWrite for SplineTrailer {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        (): Self::Args<'_>,
    ) -> BinResult<()> {
        let mut bits = BitWriter::new(writer);
        bits.write_bits(self.0.move_type() as u32, 2)?;
        bits.write_bit(false)?; // monster spline filter
        bits.flush()?;

        match self.0 {
            FacingSpec::Angle(angle) => angle.write_options(writer, endian, ())?,
            FacingSpec::Target(target) => PackedGuid(target).write_options(writer, endian, ())?,
            FacingSpec::Spot(spot) => spot.to_array().write_options(writer, endian, ())?,
            FacingSpec::None => {}
        }

        let mut bits = BitWriter::new(writer);
        bits.write_bit(false)?; // teleport
        bits.write_bits(0, 2)?;
        bits.flush()?;
        Ok(())
    }
}

impl BinRead for SplineTrailer {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        (): Self::Args<'_>,
    ) -> BinResult<Self> {
        let mut bits = BitReader::new(reader);
        let mode = bits.read_bits(2)? as u8;
        bits.read_bit()?;

        let facing = match MonsterMoveType::try_from(mode) {
            Ok(MonsterMoveType::FacingAngle) => {
                FacingSpec::Angle(f32::read_options(reader, endian, ())?)
            }
            Ok(MonsterMoveType::FacingTarget) => {
                FacingSpec::Target(PackedGuid::read_options(reader, endian, ())?.0)
            }
            Ok(MonsterMoveType::FacingSpot) => {
                FacingSpec::Spot(Vec3::from_array(<[f32; 3]>::read_options(reader, endian, ())?))
            }
            _ => FacingSpec::None,
        };

        let mut bits = BitReader::new(reader);
        bits.read_bit()?;
        bits.read_bits(2)?;
        Ok(Self(facing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(path: MovePath, facing: FacingSpec) -> MonsterMove {
        MonsterMove {
            mover: 0xF130_0000_0000_0001,
            start: Vec3::new(1.0, 2.0, 3.0),
            move_ticks: 77,
            destination: Vec3::new(10.0, 0.0, 0.0),
            flags: SplineFlags::WALKMODE.bits(),
            animation_id: 0,
            animation_time: 0,
            elapsed: 0,
            duration: 1500,
            vertical_acceleration: 0.0,
            parabolic_time: 0,
            mode: MonsterMoveType::Normal,
            vehicle_exit_voluntary: false,
            transport: 0,
            seat: -1,
            path,
            facing,
        }
    }

    fn linear() -> MovePath {
        MovePath::Linear {
            destination: Vec3::new(10.0, 0.0, 0.0),
            offsets: Vec::new(),
        }
    }

    #[test]
    fn header_layout() {
        let bytes = sample(linear(), FacingSpec::None).encode().unwrap();

        // guid(4) + start(12) + ticks(4) + dest(12) + flags(4) + anim(1) + anim time(4)
        // + elapsed(4) + duration(4) + vacc(4) + parabolic(4) + count(4) + mode(1)
        // + exit(1) + transport guid(1) + seat(1) + compressed(4) + waypoint(12) + trailer(2)
        assert_eq!(bytes.len(), 83);
        assert_eq!(&bytes[0..4], &[0b1100_0001, 0x01, 0x30, 0xF1]);
        assert_eq!(&bytes[bytes.len() - 2..], &[0, 0]);
    }

    #[test]
    fn facing_payload_matches_mode_bits() {
        let base = sample(linear(), FacingSpec::None).encode().unwrap().len();

        let cases = [
            (FacingSpec::Angle(1.5), 0b11, 4),
            (FacingSpec::Target(0x2A), 0b10, 2),
            (FacingSpec::Spot(Vec3::ONE), 0b01, 12),
        ];
        for (facing, bits, payload) in cases {
            let bytes = sample(linear(), facing).encode().unwrap();
            assert_eq!(bytes.len(), base + payload);
            let trailer = bytes[base - 2];
            assert_eq!(trailer >> 6, bits);
            assert_eq!(trailer & 0x3F, 0);

            let decoded = MonsterMove::decode(&bytes).unwrap();
            assert_eq!(decoded.facing, facing);
        }
    }

    #[test]
    fn decode_roundtrip_linear() {
        let path = MovePath::Linear {
            destination: Vec3::new(10.0, 0.0, 0.0),
            offsets: vec![Vec3::new(1.0, -2.0, 0.5), Vec3::new(-3.25, 0.0, 0.0)],
        };
        let packet = sample(path, FacingSpec::None);
        let decoded = MonsterMove::decode(&packet.encode().unwrap()).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn invalid_mode_rejected() {
        let mut bytes = sample(linear(), FacingSpec::None).encode().unwrap();
        // mode byte sits after the uncompressed count
        bytes[4 + 12 + 4 + 12 + 4 + 1 + 4 + 4 + 4 + 4 + 4 + 4] = 9;
        assert!(matches!(
            MonsterMove::decode(&bytes),
            Err(PacketError::InvalidMode(9))
        ));
    }

    #[test]
    fn truncated_packet_rejected() {
        let bytes = sample(linear(), FacingSpec::Angle(1.0)).encode().unwrap();
        for len in [0, 3, 40, bytes.len() - 1] {
            assert!(
                matches!(MonsterMove::decode(&bytes[..len]), Err(PacketError::Codec(_))),
                "{len}"
            );
        }
    }

    #[test]
    fn counts_follow_path_shape() {
        let cyclic = MovePath::Cyclic(vec![Vec3::ZERO, Vec3::ZERO, Vec3::X, Vec3::Y]);
        let mut packet = sample(cyclic, FacingSpec::None);
        packet.flags = (SplineFlags::CYCLIC | SplineFlags::UNCOMPRESSED_PATH).bits();
        let bytes = packet.encode().unwrap();

        // uncompressed count, then compressed count after mode, exit, transport and seat
        let count_at = 4 + 12 + 4 + 12 + 4 + 1 + 4 + 4 + 4 + 4 + 4;
        assert_eq!(&bytes[count_at..count_at + 4], &4u32.to_le_bytes());
        assert_eq!(&bytes[count_at + 8..count_at + 12], &0u32.to_le_bytes());
        assert_eq!(MonsterMove::decode(&bytes).unwrap(), packet);
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut bytes = sample(linear(), FacingSpec::None).encode().unwrap();
        bytes.push(0);
        assert!(matches!(
            MonsterMove::decode(&bytes),
            Err(PacketError::TrailingBytes(1))
        ));
    }
}
