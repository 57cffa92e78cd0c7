//! Global ARIS file header codec.
//!
//! The first 1024 bytes of every recording. All declared fields sit back to back
//! from offset 0 to 456; bytes 456..1024 are reserved and carried opaquely.
//!
//! ```text
//! offset  field
//!      0  version (sentinel 0x05464444)
//!      4  frame_count
//!      8  frame_rate
//!     16  num_raw_beams
//!     20  sample_rate (f32)
//!     24  samples_per_channel
//!     44  serial_number
//!     48  date (32 bytes)
//!     80  header_id (256 bytes)
//!    352  start_frame / end_frame
//!    424  file_size (u64)
//! ```

use super::bytes::{
    FixedText, read_f32, read_i32, read_u32, read_u64, write_f32, write_i32, write_u32,
    write_u64,
};
use super::{ARIS_MAGIC, FILE_HEADER_SIZE};
use crate::{ArisError, Result};
use serde::Serialize;
use std::io::Read;
use tracing::{debug, trace};

const DECLARED_FIELDS_END: usize = 456;
const PADDING_SIZE: usize = FILE_HEADER_SIZE - DECLARED_FIELDS_END;

/// Decoded ARIS file header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileHeader {
    pub version: u32,
    pub frame_count: u32,
    pub frame_rate: u32,
    pub high_resolution: u32,
    pub num_raw_beams: u32,
    pub sample_rate: f32,
    pub samples_per_channel: u32,
    pub receiver_gain: u32,
    pub window_start: f32,
    pub window_length: f32,
    pub reverse: u32,
    pub serial_number: u32,
    pub date: FixedText<32>,
    pub header_id: FixedText<256>,
    pub user_id: [i32; 4],
    pub start_frame: u32,
    pub end_frame: u32,
    pub time_lapse: u32,
    pub record_interval: u32,
    pub radio_seconds: u32,
    pub frame_interval: u32,
    pub flags: u32,
    pub aux_flags: u32,
    pub sound_speed: u32,
    pub flags_3d: u32,
    pub software_version: u32,
    pub water_temp: u32,
    pub salinity: u32,
    pub pulse_length: u32,
    pub tx_mode: u32,
    pub version_fpga: u32,
    pub version_psuc: u32,
    pub thumbnail_fi: u32,
    pub file_size: u64,
    pub optional_header_size: u64,
    pub optional_tail_size: u64,
    pub version_minor: u32,
    pub large_lens: u32,
    /// Reserved bytes 456..1024, preserved but never interpreted.
    #[serde(skip)]
    pub padding: Vec<u8>,
}

impl Default for FileHeader {
    fn default() -> Self {
        Self {
            version: ARIS_MAGIC,
            frame_count: 0,
            frame_rate: 0,
            high_resolution: 0,
            num_raw_beams: 0,
            sample_rate: 0.0,
            samples_per_channel: 0,
            receiver_gain: 0,
            window_start: 0.0,
            window_length: 0.0,
            reverse: 0,
            serial_number: 0,
            date: FixedText::default(),
            header_id: FixedText::default(),
            user_id: [0; 4],
            start_frame: 0,
            end_frame: 0,
            time_lapse: 0,
            record_interval: 0,
            radio_seconds: 0,
            frame_interval: 0,
            flags: 0,
            aux_flags: 0,
            sound_speed: 0,
            flags_3d: 0,
            software_version: 0,
            water_temp: 0,
            salinity: 0,
            pulse_length: 0,
            tx_mode: 0,
            version_fpga: 0,
            version_psuc: 0,
            thumbnail_fi: 0,
            file_size: 0,
            optional_header_size: 0,
            optional_tail_size: 0,
            version_minor: 0,
            large_lens: 0,
            padding: vec![0u8; PADDING_SIZE],
        }
    }
}

impl FileHeader {
    /// Size of the on-disk file header in bytes
    pub const HEADER_SIZE: usize = FILE_HEADER_SIZE;

    /// Decode a header from the first [`FILE_HEADER_SIZE`] bytes of `bytes`.
    ///
    /// Anything past the fixed length is ignored; fewer bytes fail with
    /// [`ArisError::MalformedHeader`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < FILE_HEADER_SIZE {
            return Err(ArisError::MalformedHeader {
                expected: FILE_HEADER_SIZE,
                found: bytes.len(),
            });
        }
        let b = &bytes[..FILE_HEADER_SIZE];

        let header = Self {
            version: read_u32(b, 0),
            frame_count: read_u32(b, 4),
            frame_rate: read_u32(b, 8),
            high_resolution: read_u32(b, 12),
            num_raw_beams: read_u32(b, 16),
            sample_rate: read_f32(b, 20),
            samples_per_channel: read_u32(b, 24),
            receiver_gain: read_u32(b, 28),
            window_start: read_f32(b, 32),
            window_length: read_f32(b, 36),
            reverse: read_u32(b, 40),
            serial_number: read_u32(b, 44),
            date: FixedText::from_block(b, 48),
            header_id: FixedText::from_block(b, 80),
            user_id: [read_i32(b, 336), read_i32(b, 340), read_i32(b, 344), read_i32(b, 348)],
            start_frame: read_u32(b, 352),
            end_frame: read_u32(b, 356),
            time_lapse: read_u32(b, 360),
            record_interval: read_u32(b, 364),
            radio_seconds: read_u32(b, 368),
            frame_interval: read_u32(b, 372),
            flags: read_u32(b, 376),
            aux_flags: read_u32(b, 380),
            sound_speed: read_u32(b, 384),
            flags_3d: read_u32(b, 388),
            software_version: read_u32(b, 392),
            water_temp: read_u32(b, 396),
            salinity: read_u32(b, 400),
            pulse_length: read_u32(b, 404),
            tx_mode: read_u32(b, 408),
            version_fpga: read_u32(b, 412),
            version_psuc: read_u32(b, 416),
            thumbnail_fi: read_u32(b, 420),
            file_size: read_u64(b, 424),
            optional_header_size: read_u64(b, 432),
            optional_tail_size: read_u64(b, 440),
            version_minor: read_u32(b, 448),
            large_lens: read_u32(b, 452),
            padding: b[DECLARED_FIELDS_END..].to_vec(),
        };

        debug!(
            "Parsed ARIS file header: version={:#010x}, frame_count={}, num_raw_beams={}, samples_per_channel={}",
            header.version, header.frame_count, header.num_raw_beams, header.samples_per_channel
        );

        Ok(header)
    }

    /// Read exactly one header block from `reader` and decode it.
    ///
    /// Short reads are retried until end of stream, so a reader that returns the
    /// block in pieces still decodes; a stream that ends early is
    /// [`ArisError::MalformedHeader`].
    pub fn parse_from_reader<R: Read>(reader: &mut R) -> Result<Self> {
        trace!("Reading ARIS file header ({} bytes)", FILE_HEADER_SIZE);
        let mut block = [0u8; FILE_HEADER_SIZE];
        let found = crate::reader::read_full(reader, &mut block)
            .map_err(|e| ArisError::io_error("file header read", e))?;
        Self::decode(&block[..found])
    }

    /// Check the sentinel. No other field is validated.
    pub fn validate(&self) -> Result<()> {
        if self.version != ARIS_MAGIC {
            return Err(ArisError::BadMagic { expected: ARIS_MAGIC, found: self.version });
        }
        Ok(())
    }

    /// Encode back into a [`FILE_HEADER_SIZE`] block.
    pub fn encode(&self) -> Vec<u8> {
        let mut b = vec![0u8; FILE_HEADER_SIZE];

        write_u32(&mut b, 0, self.version);
        write_u32(&mut b, 4, self.frame_count);
        write_u32(&mut b, 8, self.frame_rate);
        write_u32(&mut b, 12, self.high_resolution);
        write_u32(&mut b, 16, self.num_raw_beams);
        write_f32(&mut b, 20, self.sample_rate);
        write_u32(&mut b, 24, self.samples_per_channel);
        write_u32(&mut b, 28, self.receiver_gain);
        write_f32(&mut b, 32, self.window_start);
        write_f32(&mut b, 36, self.window_length);
        write_u32(&mut b, 40, self.reverse);
        write_u32(&mut b, 44, self.serial_number);
        self.date.write_to(&mut b, 48);
        self.header_id.write_to(&mut b, 80);
        for (i, user_id) in self.user_id.iter().enumerate() {
            write_i32(&mut b, 336 + i * 4, *user_id);
        }
        write_u32(&mut b, 352, self.start_frame);
        write_u32(&mut b, 356, self.end_frame);

        let trailing = [
            self.time_lapse,
            self.record_interval,
            self.radio_seconds,
            self.frame_interval,
            self.flags,
            self.aux_flags,
            self.sound_speed,
            self.flags_3d,
            self.software_version,
            self.water_temp,
            self.salinity,
            self.pulse_length,
            self.tx_mode,
            self.version_fpga,
            self.version_psuc,
            self.thumbnail_fi,
        ];
        for (i, value) in trailing.iter().enumerate() {
            write_u32(&mut b, 360 + i * 4, *value);
        }

        write_u64(&mut b, 424, self.file_size);
        write_u64(&mut b, 432, self.optional_header_size);
        write_u64(&mut b, 440, self.optional_tail_size);
        write_u32(&mut b, 448, self.version_minor);
        write_u32(&mut b, 452, self.large_lens);

        let padding_len = self.padding.len().min(PADDING_SIZE);
        b[DECLARED_FIELDS_END..DECLARED_FIELDS_END + padding_len]
            .copy_from_slice(&self.padding[..padding_len]);
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_header() -> FileHeader {
        FileHeader {
            frame_count: 2,
            frame_rate: 15,
            num_raw_beams: 48,
            sample_rate: 1_000_000.0,
            samples_per_channel: 500,
            receiver_gain: 18,
            window_start: 0.7,
            window_length: 10.5,
            serial_number: 1234,
            date: FixedText::new("2019-05-03"),
            header_id: FixedText::new("river survey"),
            user_id: [1, -2, 3, -4],
            start_frame: 0,
            end_frame: 1,
            file_size: 1024 + 2 * (1024 + 24_000),
            large_lens: 1,
            ..FileHeader::default()
        }
    }

    #[test]
    fn documented_offsets_are_honoured() {
        let bytes = sample_header().encode();
        assert_eq!(bytes.len(), FILE_HEADER_SIZE);
        assert_eq!(read_u32(&bytes, 0), ARIS_MAGIC);
        assert_eq!(read_u32(&bytes, 4), 2);
        assert_eq!(read_u32(&bytes, 8), 15);
        assert_eq!(read_u32(&bytes, 16), 48);
        assert_eq!(read_f32(&bytes, 20), 1_000_000.0);
        assert_eq!(read_u32(&bytes, 24), 500);
        assert_eq!(read_u32(&bytes, 44), 1234);
        assert_eq!(&bytes[48..58], b"2019-05-03");
        assert_eq!(&bytes[80..92], b"river survey");
        assert_eq!(read_u32(&bytes, 356), 1);
        assert_eq!(read_u64(&bytes, 424), 1024 + 2 * (1024 + 24_000));
        assert_eq!(read_u32(&bytes, 452), 1);
    }

    #[test]
    fn encode_then_decode_is_field_for_field_equal() {
        let header = sample_header();
        let decoded = FileHeader::decode(&header.encode()).expect("valid block");
        assert_eq!(decoded, header);
        assert_eq!(decoded.date.as_string(), "2019-05-03");
        assert_eq!(decoded.header_id.as_string(), "river survey");
    }

    #[test]
    fn short_input_is_malformed() {
        for len in [0usize, 1, 455, 1023] {
            match FileHeader::decode(&vec![0u8; len]) {
                Err(ArisError::MalformedHeader { expected, found }) => {
                    assert_eq!(expected, FILE_HEADER_SIZE);
                    assert_eq!(found, len);
                }
                other => panic!("Expected MalformedHeader for {} bytes, got {:?}", len, other),
            }
        }
    }

    #[test]
    fn bytes_beyond_the_header_are_ignored() {
        let mut bytes = sample_header().encode();
        bytes.extend_from_slice(&[0xAB; 100]);
        let decoded = FileHeader::decode(&bytes).expect("long input still decodes");
        assert_eq!(decoded, sample_header());
    }

    #[test]
    fn validate_checks_only_the_sentinel() {
        let mut header = sample_header();
        header.frame_count = u32::MAX;
        header.sample_rate = f32::NAN;
        assert!(header.validate().is_ok());

        header.version = 0x05464443;
        match header.validate() {
            Err(ArisError::BadMagic { expected, found }) => {
                assert_eq!(expected, ARIS_MAGIC);
                assert_eq!(found, 0x05464443);
            }
            other => panic!("Expected BadMagic, got {:?}", other),
        }
    }

    #[test]
    fn parse_from_reader_handles_chunked_and_short_streams() {
        struct Trickle<'a>(&'a [u8]);
        impl Read for Trickle<'_> {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                let n = buf.len().min(7).min(self.0.len());
                buf[..n].copy_from_slice(&self.0[..n]);
                self.0 = &self.0[n..];
                Ok(n)
            }
        }

        let bytes = sample_header().encode();
        let header = FileHeader::parse_from_reader(&mut Trickle(&bytes)).expect("chunked read");
        assert_eq!(header, sample_header());

        let mut empty = std::io::Cursor::new(Vec::<u8>::new());
        assert!(matches!(
            FileHeader::parse_from_reader(&mut empty),
            Err(ArisError::MalformedHeader { found: 0, .. })
        ));
    }

    proptest! {
        #[test]
        fn arbitrary_blocks_survive_decode_encode(bytes in prop::collection::vec(any::<u8>(), FILE_HEADER_SIZE)) {
            let header = FileHeader::decode(&bytes).expect("full-length block");
            prop_assert_eq!(header.encode(), bytes);
        }
    }
}
