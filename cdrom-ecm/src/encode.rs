use std::io::{Read, Seek, SeekFrom, Write};

use log::{debug, trace};

use crate::classify;
use crate::edc;
use crate::error::EcmError;
use crate::sector::SectorType;
use crate::varint;
use crate::queue::Queue;

/// Per-type byte/unit tallies and totals from a completed encode, the
/// library equivalent of the original tool's end-of-run report.
#[derive(Debug, Clone, Default)]
pub struct EncodeReport {
    pub literal_bytes: u64,
    pub mode1_sectors: u64,
    pub mode2_form1_sectors: u64,
    pub mode2_form2_sectors: u64,
    pub input_bytes: u64,
    pub output_bytes: u64,
}

struct CountingWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Encodes the `input_len`-byte stream `input` into the ECM format,
/// writing it to `output`. `input` must support seeking: the encoder
/// reads ahead for classification, then seeks back to re-read each run's
/// raw bytes when emitting its stripped payload (spec §4.6, §5).
pub fn encode<R: Read + Seek, W: Write>(
    mut input: R,
    input_len: u64,
    output: W,
) -> Result<EncodeReport, EcmError> {
    let mut output = CountingWriter { inner: output, written: 0 };
    output.write_all(b"ECM\0")?;

    let mut queue = Queue::new();
    let mut input_bytes_queued: u64 = 0;
    let mut input_bytes_checked: u64 = 0;
    let mut input_edc: u32 = 0;
    let mut tally = [0u64; 4];

    let mut cur_type: Option<SectorType> = None;
    let mut cur_count: u32 = 0;
    let mut cur_in_start: u64 = 0;
    let mut literal_skip: u32 = 0;

    loop {
        if queue.available() < 2352 && (queue.available() as u64) < (input_len - input_bytes_queued) {
            let want = input_len - input_bytes_queued;
            let room = (queue.capacity() - queue.available()) as u64;
            let will_read = want.min(room) as usize;
            if will_read > 0 {
                input.seek(SeekFrom::Start(input_bytes_queued))?;
                let tail = queue.tail_mut();
                input.read_exact(&mut tail[..will_read])?;
                input_edc = edc::update(input_edc, &tail[..will_read]);
                queue.extend_available(will_read);
                input_bytes_queued += will_read as u64;
            }
        }

        let detect_type: Option<SectorType> = if queue.available() == 0 {
            None
        } else if literal_skip > 0 {
            literal_skip -= 1;
            Some(SectorType::Literal)
        } else if matches!(cur_type, Some(t) if t.tag() >= 2)
            && queue.available() >= 0x10
            && classify::looks_like_embedded_mode2_sync(queue.front())
        {
            literal_skip = 15;
            Some(SectorType::Literal)
        } else {
            Some(classify::detect(queue.front(), queue.available()))
        };

        if detect_type == cur_type && cur_count <= 0x7FFF_FFFF {
            cur_count += 1;
        } else {
            if cur_count > 0 {
                let ty = cur_type.expect("count > 0 implies a type was set");
                trace!("flushing run: type={:?} count={}", ty, cur_count);
                tally[ty.tag() as usize] += cur_count as u64;
                flush_run(&mut input, &mut output, ty, cur_count, cur_in_start)?;
            }
            cur_type = detect_type;
            cur_in_start = input_bytes_checked;
            cur_count = 1;
        }

        let Some(ty) = cur_type else { break };
        input_bytes_checked += ty.raw_size() as u64;
        queue.advance(ty.raw_size());
    }

    output.write_all(&varint::end_marker())?;
    output.write_all(&input_edc.to_le_bytes())?;

    debug!(
        "encode complete: {} input bytes, {} output bytes",
        input_bytes_checked, output.written
    );

    Ok(EncodeReport {
        literal_bytes: tally[0],
        mode1_sectors: tally[1],
        mode2_form1_sectors: tally[2],
        mode2_form2_sectors: tally[3],
        input_bytes: input_bytes_checked,
        output_bytes: output.written,
    })
}

fn flush_run<R: Read + Seek, W: Write>(
    input: &mut R,
    output: &mut W,
    ty: SectorType,
    count: u32,
    start: u64,
) -> Result<(), EcmError> {
    output.write_all(&varint::write_type_count(ty.tag(), count))?;
    input.seek(SeekFrom::Start(start))?;

    if ty == SectorType::Literal {
        let mut remaining = count as u64;
        let mut chunk = vec![0u8; 65536.min(count as usize).max(1)];
        while remaining > 0 {
            let n = remaining.min(chunk.len() as u64) as usize;
            input.read_exact(&mut chunk[..n])?;
            output.write_all(&chunk[..n])?;
            remaining -= n as u64;
        }
    } else {
        let mut raw = vec![0u8; ty.raw_size()];
        let mut payload = Vec::with_capacity(ty.stripped_size());
        for _ in 0..count {
            input.read_exact(&mut raw)?;
            payload.clear();
            crate::sector::strip(ty, &raw, &mut payload);
            output.write_all(&payload)?;
        }
    }
    Ok(())
}
