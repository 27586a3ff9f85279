//! Lossless codec for the ECM (Error Code Modeler) format: strips the
//! deterministic sync/address/EDC/ECC fields out of raw CD-ROM Mode 1
//! and Mode 2 sectors on encode, and rebuilds them on decode.
//!
//! The public surface is just [`encode`] and [`decode`], both generic
//! over `Read`/`Write` (and, for the encoder, `Seek`) so the codec is
//! usable against anything from a `File` to an in-memory `Cursor`
//! without a CLI in the loop.

mod classify;
mod ecc;
mod edc;
mod encode;
mod decode;
mod error;
mod queue;
mod sector;
mod varint;

pub use encode::{encode, EncodeReport};
pub use decode::{decode, DecodeReport};
pub use error::EcmError;
pub use sector::SectorType;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn round_trip(data: &[u8]) -> Vec<u8> {
        let mut encoded = Vec::new();
        encode(Cursor::new(data.to_vec()), data.len() as u64, &mut encoded).unwrap();
        let mut decoded = Vec::new();
        let report = decode(Cursor::new(encoded), &mut decoded).unwrap();
        assert_eq!(report.output_bytes as usize, decoded.len());
        decoded
    }

    #[test]
    fn empty_input() {
        let encoded = {
            let mut out = Vec::new();
            encode(Cursor::new(Vec::new()), 0, &mut out).unwrap();
            out
        };
        assert_eq!(
            encoded,
            vec![0x45, 0x43, 0x4D, 0x00, 0xFC, 0xFF, 0xFF, 0xFF, 0x3F, 0x00, 0x00, 0x00, 0x00]
        );
        assert_eq!(round_trip(&[]), Vec::<u8>::new());
    }

    #[test]
    fn single_literal_byte() {
        assert_eq!(round_trip(&[0xAA]), vec![0xAA]);
    }

    #[test]
    fn thirty_three_literal_bytes() {
        let data = vec![0xFFu8; 33];
        let mut encoded = Vec::new();
        encode(Cursor::new(data.clone()), data.len() as u64, &mut encoded).unwrap();
        assert_eq!(&encoded[4..6], &[0x80, 0x01]);
        assert_eq!(round_trip(&data), data);
    }

    #[test]
    fn non_sector_aligned_trailing_bytes() {
        let data = vec![0x11u8, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77];
        assert_eq!(round_trip(&data), data);
    }

    #[test]
    fn corrupted_trailer_fails_checksum() {
        let data = vec![0x42u8; 100];
        let mut encoded = Vec::new();
        encode(Cursor::new(data.clone()), data.len() as u64, &mut encoded).unwrap();
        let last = encoded.len() - 1;
        encoded[last] ^= 0xFF;
        let mut decoded = Vec::new();
        let err = decode(Cursor::new(encoded), &mut decoded).unwrap_err();
        assert!(matches!(err, EcmError::ChecksumMismatch { .. }));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut decoded = Vec::new();
        let err = decode(Cursor::new(b"XXXX".to_vec()), &mut decoded).unwrap_err();
        assert!(matches!(err, EcmError::BadHeader));
    }

    #[test]
    fn determinism() {
        let data = vec![0x01u8, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let mut a = Vec::new();
        let mut b = Vec::new();
        encode(Cursor::new(data.clone()), data.len() as u64, &mut a).unwrap();
        encode(Cursor::new(data.clone()), data.len() as u64, &mut b).unwrap();
        assert_eq!(a, b);
    }
}
