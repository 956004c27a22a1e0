//! Framing shared by both ends of the link.
//!
//! ssmarshal serialization, a CRC-32 trailer over the marshalled bytes,
//! COBS on the wire with the terminating zero included in the output.

use corncobs::max_encoded_len;
use crc::{Crc, CRC_32_CKSUM};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Largest marshalled payload on the link; sized for a `Response`
/// carrying an audio packet.
pub const MAX_PAYLOAD: usize = 60;

const CRC_SIZE: usize = core::mem::size_of::<u32>();

/// Worst-case encoded frame, the buffer size both sides allocate.
pub const MAX_FRAME: usize = max_encoded_len(MAX_PAYLOAD + CRC_SIZE);

const CKSUM: Crc<u32> = Crc::<u32>::new(&CRC_32_CKSUM);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// Marshalled payload larger than the frame budget.
    Overflow,
    /// COBS-level corruption or truncation.
    Framing,
    Crc {
        expected: u32,
        got: u32,
    },
    Marshal,
}

impl From<ssmarshal::Error> for CodecError {
    fn from(_: ssmarshal::Error) -> Self {
        CodecError::Marshal
    }
}

/// Marshals `value`, appends the CRC and COBS-encodes the result into
/// `out_buf`, returning the bytes to put on the wire.
pub fn serialize_crc_cobs<'a, T: Serialize>(
    value: &T,
    out_buf: &'a mut [u8; MAX_FRAME],
) -> Result<&'a [u8], CodecError> {
    let mut raw = [0u8; MAX_PAYLOAD + CRC_SIZE];
    let n = ssmarshal::serialize(&mut raw, value)?;
    if n > MAX_PAYLOAD {
        return Err(CodecError::Overflow);
    }
    let crc = CKSUM.checksum(&raw[..n]);
    raw[n..n + CRC_SIZE].copy_from_slice(&crc.to_le_bytes());
    let used = corncobs::encode_buf(&raw[..n + CRC_SIZE], out_buf);
    Ok(&out_buf[..used])
}

/// Decodes one COBS frame in place and unmarshals the payload after
/// checking the CRC trailer. `in_buf` must contain the whole frame
/// including the terminating zero.
pub fn deserialize_crc_cobs<T: DeserializeOwned>(in_buf: &mut [u8]) -> Result<T, CodecError> {
    let n = corncobs::decode_in_place(in_buf).map_err(|_| CodecError::Framing)?;
    if n < CRC_SIZE {
        return Err(CodecError::Framing);
    }
    let (payload, trailer) = in_buf[..n].split_at(n - CRC_SIZE);
    let got = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let expected = CKSUM.checksum(payload);
    if expected != got {
        return Err(CodecError::Crc { expected, got });
    }
    let (value, _) = ssmarshal::deserialize(payload)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DateTime, Request, Response, Status};
    use corncobs::ZERO;

    #[test]
    fn roundtrip_request() {
        let mut buf = [0u8; MAX_FRAME];
        let cmd = Request::SetDateTime(DateTime::new(2023, 10, 1, 8, 15, 0).unwrap());
        let wire_len = serialize_crc_cobs(&cmd, &mut buf).unwrap().len();
        assert_eq!(buf[wire_len - 1], ZERO);
        let decoded: Request = deserialize_crc_cobs(&mut buf[..wire_len]).unwrap();
        assert_eq!(decoded, cmd);
    }

    #[test]
    fn roundtrip_response() {
        let mut buf = [0u8; MAX_FRAME];
        let mut status = Status::default();
        status.set_charging(true);
        let _ = status.update_joy_x(17);
        let resp = Response::Status(status);
        let wire_len = serialize_crc_cobs(&resp, &mut buf).unwrap().len();
        let decoded: Response = deserialize_crc_cobs(&mut buf[..wire_len]).unwrap();
        assert_eq!(decoded, resp);
    }

    #[test]
    fn corrupted_payload_fails_crc() {
        let mut buf = [0u8; MAX_FRAME];
        let wire_len = serialize_crc_cobs(&Request::GetStatus, &mut buf)
            .unwrap()
            .len();
        // flip a payload bit, keeping the frame COBS-decodable
        buf[1] ^= 0x01;
        match deserialize_crc_cobs::<Request>(&mut buf[..wire_len]) {
            Err(CodecError::Crc { expected, got }) => assert_ne!(expected, got),
            other => panic!("expected crc error, got {:?}", other),
        }
    }

    #[test]
    fn truncated_frame_is_a_framing_error() {
        let mut buf = [0u8; MAX_FRAME];
        let wire_len = serialize_crc_cobs(&Request::GetStatus, &mut buf)
            .unwrap()
            .len();
        let err = deserialize_crc_cobs::<Request>(&mut buf[..wire_len - 2]).unwrap_err();
        assert_eq!(err, CodecError::Framing);
    }

    #[test]
    fn oversized_payload_is_an_overflow() {
        let mut buf = [0u8; MAX_FRAME];
        // 64 marshalled bytes, four over the payload budget
        let err = serialize_crc_cobs(&([0u8; 32], [0u8; 32]), &mut buf).unwrap_err();
        assert_eq!(err, CodecError::Overflow);
    }

    #[test]
    fn audio_packet_fits_the_frame() {
        let mut buf = [0u8; MAX_FRAME];
        let resp = Response::Audio([0xA5; crate::PACKET_SIZE]);
        let wire = serialize_crc_cobs(&resp, &mut buf).unwrap();
        assert!(wire.len() <= MAX_FRAME);
    }
}
