//! QUIC transport parameters (RFC 9000 section 18), carried in TLS
//! extension 0x39.
//!
//! Encoded as a sequence of (id: varint, length: varint, value: bytes)
//! where integer values are varint-encoded. The handshake only transports
//! them; interpreting the values is the QUIC layer's job.

use alloc::vec::Vec;

use crate::error::{Error, Result};

/// QUIC transport parameters exchanged during the TLS handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportParams {
    /// Maximum idle timeout in milliseconds (0 = disabled).
    pub max_idle_timeout: u64,
    /// Maximum UDP payload size (default 65527).
    pub max_udp_payload_size: u64,
    /// Maximum total data the peer may send (flow control).
    pub initial_max_data: u64,
    pub initial_max_stream_data_bidi_local: u64,
    pub initial_max_stream_data_bidi_remote: u64,
    pub initial_max_stream_data_uni: u64,
    pub initial_max_streams_bidi: u64,
    pub initial_max_streams_uni: u64,
    /// ACK delay exponent (default 3).
    pub ack_delay_exponent: u64,
    /// Maximum ACK delay in milliseconds (default 25).
    pub max_ack_delay: u64,
    /// Active connection ID limit (default 2).
    pub active_connection_id_limit: u64,
    pub disable_active_migration: bool,
    /// Server only: the DCID of the client's first Initial.
    pub original_destination_connection_id: Option<heapless::Vec<u8, 20>>,
    pub initial_source_connection_id: Option<heapless::Vec<u8, 20>>,
    /// Server only.
    pub stateless_reset_token: Option<[u8; 16]>,
}

const PARAM_ORIGINAL_DESTINATION_CONNECTION_ID: u64 = 0x00;
const PARAM_MAX_IDLE_TIMEOUT: u64 = 0x01;
const PARAM_STATELESS_RESET_TOKEN: u64 = 0x02;
const PARAM_MAX_UDP_PAYLOAD_SIZE: u64 = 0x03;
const PARAM_INITIAL_MAX_DATA: u64 = 0x04;
const PARAM_INITIAL_MAX_STREAM_DATA_BIDI_LOCAL: u64 = 0x05;
const PARAM_INITIAL_MAX_STREAM_DATA_BIDI_REMOTE: u64 = 0x06;
const PARAM_INITIAL_MAX_STREAM_DATA_UNI: u64 = 0x07;
const PARAM_INITIAL_MAX_STREAMS_BIDI: u64 = 0x08;
const PARAM_INITIAL_MAX_STREAMS_UNI: u64 = 0x09;
const PARAM_ACK_DELAY_EXPONENT: u64 = 0x0a;
const PARAM_MAX_ACK_DELAY: u64 = 0x0b;
const PARAM_DISABLE_ACTIVE_MIGRATION: u64 = 0x0c;
const PARAM_ACTIVE_CONNECTION_ID_LIMIT: u64 = 0x0e;
const PARAM_INITIAL_SOURCE_CONNECTION_ID: u64 = 0x0f;

/// Largest value representable as a QUIC varint (2^62 - 1).
const MAX_VARINT: u64 = (1 << 62) - 1;

impl Default for TransportParams {
    fn default() -> Self {
        Self {
            max_idle_timeout: 30_000,
            max_udp_payload_size: 65527,
            initial_max_data: 1_048_576,
            initial_max_stream_data_bidi_local: 262_144,
            initial_max_stream_data_bidi_remote: 262_144,
            initial_max_stream_data_uni: 262_144,
            initial_max_streams_bidi: 100,
            initial_max_streams_uni: 100,
            ack_delay_exponent: 3,
            max_ack_delay: 25,
            active_connection_id_limit: 2,
            disable_active_migration: false,
            original_destination_connection_id: None,
            initial_source_connection_id: None,
            stateless_reset_token: None,
        }
    }
}

fn varint_len(value: u64) -> usize {
    if value <= 63 {
        1
    } else if value <= 16383 {
        2
    } else if value <= 1_073_741_823 {
        4
    } else {
        8
    }
}

fn put_varint(out: &mut Vec<u8>, value: u64) {
    match varint_len(value) {
        1 => out.push(value as u8),
        2 => out.extend_from_slice(&(value as u16 | 0x4000).to_be_bytes()),
        4 => out.extend_from_slice(&(value as u32 | 0x8000_0000).to_be_bytes()),
        _ => out.extend_from_slice(&(value | 0xc000_0000_0000_0000).to_be_bytes()),
    }
}

fn get_varint(data: &[u8], off: &mut usize) -> Result<u64> {
    let first = *data.get(*off).ok_or(Error::Decode("transport parameter varint"))?;
    let len = 1usize << (first >> 6);
    let bytes = data
        .get(*off..*off + len)
        .ok_or(Error::Decode("transport parameter varint"))?;
    let mut value = u64::from(first & 0x3f);
    for &b in &bytes[1..] {
        value = (value << 8) | u64::from(b);
    }
    *off += len;
    Ok(value)
}

fn integer_value(data: &[u8]) -> Result<u64> {
    let mut off = 0;
    let value = get_varint(data, &mut off)?;
    if off != data.len() {
        return Err(Error::Decode("transport parameter value"));
    }
    Ok(value)
}

fn connection_id(data: &[u8]) -> Result<heapless::Vec<u8, 20>> {
    heapless::Vec::from_slice(data).map_err(|_| Error::IllegalParameter("connection ID too long"))
}

impl TransportParams {
    fn integer_params(&self) -> [(u64, u64); 11] {
        [
            (PARAM_MAX_IDLE_TIMEOUT, self.max_idle_timeout),
            (PARAM_MAX_UDP_PAYLOAD_SIZE, self.max_udp_payload_size),
            (PARAM_INITIAL_MAX_DATA, self.initial_max_data),
            (
                PARAM_INITIAL_MAX_STREAM_DATA_BIDI_LOCAL,
                self.initial_max_stream_data_bidi_local,
            ),
            (
                PARAM_INITIAL_MAX_STREAM_DATA_BIDI_REMOTE,
                self.initial_max_stream_data_bidi_remote,
            ),
            (PARAM_INITIAL_MAX_STREAM_DATA_UNI, self.initial_max_stream_data_uni),
            (PARAM_INITIAL_MAX_STREAMS_BIDI, self.initial_max_streams_bidi),
            (PARAM_INITIAL_MAX_STREAMS_UNI, self.initial_max_streams_uni),
            (PARAM_ACK_DELAY_EXPONENT, self.ack_delay_exponent),
            (PARAM_MAX_ACK_DELAY, self.max_ack_delay),
            (PARAM_ACTIVE_CONNECTION_ID_LIMIT, self.active_connection_id_limit),
        ]
    }

    fn put_param(out: &mut Vec<u8>, id: u64, value: &[u8]) {
        put_varint(out, id);
        put_varint(out, value.len() as u64);
        out.extend_from_slice(value);
    }

    /// Append the encoded parameters to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        if let Some(cid) = &self.original_destination_connection_id {
            Self::put_param(out, PARAM_ORIGINAL_DESTINATION_CONNECTION_ID, cid);
        }
        if let Some(token) = &self.stateless_reset_token {
            Self::put_param(out, PARAM_STATELESS_RESET_TOKEN, token);
        }
        for (id, value) in self.integer_params() {
            if value > MAX_VARINT {
                return Err(Error::Config("transport parameter out of range"));
            }
            put_varint(out, id);
            put_varint(out, varint_len(value) as u64);
            put_varint(out, value);
        }
        if self.disable_active_migration {
            Self::put_param(out, PARAM_DISABLE_ACTIVE_MIGRATION, &[]);
        }
        if let Some(cid) = &self.initial_source_connection_id {
            Self::put_param(out, PARAM_INITIAL_SOURCE_CONNECTION_ID, cid);
        }
        Ok(())
    }

    /// Decode transport parameters. Absent parameters take their RFC 9000
    /// defaults; unknown ones are ignored; a repeated one is an error.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut params = Self {
            max_idle_timeout: 0,
            initial_max_data: 0,
            initial_max_stream_data_bidi_local: 0,
            initial_max_stream_data_bidi_remote: 0,
            initial_max_stream_data_uni: 0,
            initial_max_streams_bidi: 0,
            initial_max_streams_uni: 0,
            ..Self::default()
        };

        let mut seen: u32 = 0;
        let mut off = 0;
        while off < buf.len() {
            let id = get_varint(buf, &mut off)?;
            let len = get_varint(buf, &mut off)? as usize;
            let value = buf
                .get(off..off.saturating_add(len))
                .ok_or(Error::Decode("transport parameter"))?;
            off += len;

            if id < 32 {
                if seen & (1 << id) != 0 {
                    return Err(Error::IllegalParameter("duplicate transport parameter"));
                }
                seen |= 1 << id;
            }

            match id {
                PARAM_ORIGINAL_DESTINATION_CONNECTION_ID => {
                    params.original_destination_connection_id = Some(connection_id(value)?)
                }
                PARAM_STATELESS_RESET_TOKEN => {
                    let token: [u8; 16] = value
                        .try_into()
                        .map_err(|_| Error::Decode("stateless reset token"))?;
                    params.stateless_reset_token = Some(token);
                }
                PARAM_MAX_IDLE_TIMEOUT => params.max_idle_timeout = integer_value(value)?,
                PARAM_MAX_UDP_PAYLOAD_SIZE => params.max_udp_payload_size = integer_value(value)?,
                PARAM_INITIAL_MAX_DATA => params.initial_max_data = integer_value(value)?,
                PARAM_INITIAL_MAX_STREAM_DATA_BIDI_LOCAL => {
                    params.initial_max_stream_data_bidi_local = integer_value(value)?
                }
                PARAM_INITIAL_MAX_STREAM_DATA_BIDI_REMOTE => {
                    params.initial_max_stream_data_bidi_remote = integer_value(value)?
                }
                PARAM_INITIAL_MAX_STREAM_DATA_UNI => {
                    params.initial_max_stream_data_uni = integer_value(value)?
                }
                PARAM_INITIAL_MAX_STREAMS_BIDI => {
                    params.initial_max_streams_bidi = integer_value(value)?
                }
                PARAM_INITIAL_MAX_STREAMS_UNI => {
                    params.initial_max_streams_uni = integer_value(value)?
                }
                PARAM_ACK_DELAY_EXPONENT => params.ack_delay_exponent = integer_value(value)?,
                PARAM_MAX_ACK_DELAY => params.max_ack_delay = integer_value(value)?,
                PARAM_DISABLE_ACTIVE_MIGRATION => {
                    if !value.is_empty() {
                        return Err(Error::Decode("disable_active_migration"));
                    }
                    params.disable_active_migration = true;
                }
                PARAM_ACTIVE_CONNECTION_ID_LIMIT => {
                    params.active_connection_id_limit = integer_value(value)?
                }
                PARAM_INITIAL_SOURCE_CONNECTION_ID => {
                    params.initial_source_connection_id = Some(connection_id(value)?)
                }
                _ => {}
            }
        }

        Ok(params)
    }
}
