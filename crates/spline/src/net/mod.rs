mod broadcast;
mod monster_move;
mod wire;

pub use broadcast::{MessageSink, PacketLog, SentPacket};
pub use monster_move::{MonsterMove, MovePath, PacketError};
pub use wire::{fits_packed_xyz, pack_xyz, unpack_xyz, BitReader, BitWriter, PackedGuid};
