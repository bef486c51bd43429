use std::fmt;


#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IPAddress {
    V4([u8; 4]),
    V6([u8; 16]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Protocol {
    TCP,
    UDP,
    Other(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Endpoint {
    pub ip: IPAddress,
    pub port: u16,
}

impl Endpoint {
    pub fn new(ip: IPAddress, port: u16) -> Self {
        Self { ip, port }
    }
}

/// Canonical flow identity: the endpoint pair is stored sorted so both
/// directions of a conversation map to the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlowKey {
    pub first: Endpoint,
    pub second: Endpoint,
    pub protocol: Protocol,
}

impl FlowKey {
    pub fn new(a: Endpoint, b: Endpoint, protocol: Protocol) -> Self {
        Self {
            first: a.min(b),
            second: a.max(b),
            protocol,
        }
    }
}

/// Packet direction relative to the flow initiator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Sent by the initiator (the endpoint that sent the flow's first packet).
    A,
    /// Sent by the responder.
    B,
}

/// Pipeline bookkeeping for one flow.
#[derive(Debug, Clone)]
pub struct FlowMeta {
    pub protocol: Protocol,
    pub initiator: Endpoint,
    pub responder: Endpoint,
    pub first_ts: f64,
    pub last_ts: f64,
    pub packets: u64,
    pub bytes: u64,
}

impl FlowMeta {
    pub fn new(
        initiator: Endpoint,
        responder: Endpoint,
        protocol: Protocol,
        timestamp: f64,
    ) -> Self {
        Self {
            protocol,
            initiator,
            responder,
            first_ts: timestamp,
            last_ts: timestamp,
            packets: 0,
            bytes: 0,
        }
    }

    pub fn direction_of(&self, source: Endpoint) -> Direction {
        if source == self.initiator {
            Direction::A
        } else {
            Direction::B
        }
    }

    pub fn account(&mut self, timestamp: f64, wire_len: u64) {
        self.packets += 1;
        self.bytes += wire_len;
        self.last_ts = timestamp;
    }
}

impl fmt::Display for IPAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IPAddress::V4(bytes) => {
                write!(f, "{}.{}.{}.{}", bytes[0], bytes[1], bytes[2], bytes[3])
            }
            IPAddress::V6(bytes) => {
                let segments: Vec<String> = bytes
                    .chunks(2)
                    .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
                    .map(|segment| format!("{:x}", segment))
                    .collect();
                write!(f, "{}", segments.join(":"))
            }
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::TCP => write!(f, "TCP"),
            Protocol::UDP => write!(f, "UDP"),
            Protocol::Other(n) => write!(f, "Proto-{}", n),
        }
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ↔ {}", self.first, self.second)
    }
}
