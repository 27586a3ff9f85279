use std::io::{Read, Write};

use log::{debug, trace};

use crate::edc;
use crate::error::EcmError;
use crate::sector::{self, SectorType};
use crate::varint::{self, Record};

/// Per-type unit tallies and totals from a completed decode.
#[derive(Debug, Clone, Default)]
pub struct DecodeReport {
    pub literal_bytes: u64,
    pub mode1_sectors: u64,
    pub mode2_form1_sectors: u64,
    pub mode2_form2_sectors: u64,
    pub output_bytes: u64,
}

fn eof_as(context: &'static str) -> impl Fn(std::io::Error) -> EcmError {
    move |e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            EcmError::UnexpectedEof { context }
        } else {
            EcmError::Io(e)
        }
    }
}

/// Decodes an ECM stream from `input`, writing the reconstructed bytes
/// to `output`. Sequential: no seeking required on either side (spec §5).
pub fn decode<R: Read, W: Write>(mut input: R, mut output: W) -> Result<DecodeReport, EcmError> {
    let mut magic = [0u8; 4];
    input.read_exact(&mut magic).map_err(eof_as("header"))?;
    if &magic != b"ECM\0" {
        return Err(EcmError::BadHeader);
    }

    let mut output_edc: u32 = 0;
    let mut output_bytes: u64 = 0;
    let mut tally = [0u64; 4];

    loop {
        let record = varint::read_type_count(|| {
            let mut b = [0u8; 1];
            input.read_exact(&mut b).map_err(eof_as("run header"))?;
            Ok(b[0])
        })?;
        let (tag, count) = match record {
            Record::End => break,
            Record::Run { ty, count } => (ty, count),
        };
        let ty = SectorType::from_tag(tag);
        trace!("decoding run: type={:?} count={}", ty, count);
        tally[tag as usize] += count as u64;

        if ty == SectorType::Literal {
            let mut remaining = count as u64;
            let mut chunk = vec![0u8; 65536.min(count as usize).max(1)];
            while remaining > 0 {
                let n = remaining.min(chunk.len() as u64) as usize;
                input.read_exact(&mut chunk[..n]).map_err(eof_as("literal payload"))?;
                output_edc = edc::update(output_edc, &chunk[..n]);
                output.write_all(&chunk[..n])?;
                output_bytes += n as u64;
                remaining -= n as u64;
            }
        } else {
            let mut scratch = [0u8; 2352];
            for _ in 0..count {
                match ty {
                    SectorType::Mode1 => {
                        input
                            .read_exact(&mut scratch[0xC..0xF])
                            .map_err(eof_as("mode 1 address"))?;
                        input
                            .read_exact(&mut scratch[0x10..0x810])
                            .map_err(eof_as("mode 1 data"))?;
                    }
                    SectorType::Mode2Form1 => {
                        input
                            .read_exact(&mut scratch[0x14..0x14 + 0x804])
                            .map_err(eof_as("mode 2 form 1 payload"))?;
                    }
                    SectorType::Mode2Form2 => {
                        input
                            .read_exact(&mut scratch[0x14..0x14 + 0x918])
                            .map_err(eof_as("mode 2 form 2 payload"))?;
                    }
                    SectorType::Literal => unreachable!(),
                }
                sector::reconstruct(&mut scratch, ty);
                let piece: &[u8] = match ty {
                    SectorType::Mode1 => &scratch[0..2352],
                    SectorType::Mode2Form1 | SectorType::Mode2Form2 => &scratch[0x10..0x10 + 2336],
                    SectorType::Literal => unreachable!(),
                };
                output_edc = edc::update(output_edc, piece);
                output.write_all(piece)?;
                output_bytes += piece.len() as u64;
            }
        }
    }

    let mut trailer = [0u8; 4];
    input.read_exact(&mut trailer).map_err(eof_as("trailer"))?;
    let expected = u32::from_le_bytes(trailer);
    if expected != output_edc {
        return Err(EcmError::ChecksumMismatch {
            expected,
            actual: output_edc,
        });
    }

    debug!("decode complete: {} output bytes", output_bytes);

    Ok(DecodeReport {
        literal_bytes: tally[0],
        mode1_sectors: tally[1],
        mode2_form1_sectors: tally[2],
        mode2_form2_sectors: tally[3],
        output_bytes,
    })
}
