/// Fan-out for encoded packets, implemented by whatever tracks observers.
pub trait MessageSink {
    /// Sends `payload` to every observer of `mover`, and to the mover itself
    /// when `include_self` is set.
    fn send_to_set(&mut self, mover: u64, payload: &[u8], include_self: bool);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentPacket {
    pub mover: u64,
    pub payload: Vec<u8>,
    pub include_self: bool,
}

/// Records every packet instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct PacketLog {
    packets: Vec<SentPacket>,
}

impl PacketLog {
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn packets(&self) -> &[SentPacket] {
        &self.packets
    }

    pub fn last(&self) -> Option<&SentPacket> {
        self.packets.last()
    }

    pub fn clear(&mut self) {
        self.packets.clear();
    }
}

impl MessageSink for PacketLog {
    fn send_to_set(&mut self, mover: u64, payload: &[u8], include_self: bool) {
        self.packets.push(SentPacket {
            mover,
            payload: payload.to_vec(),
            include_self,
        });
    }
}

