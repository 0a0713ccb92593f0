//! Binary run record: header, one entry per frame, footer with the final
//! pose and a CRC-32 over everything before it.

use serde::{Deserialize, Serialize};

use crate::constants::{
    TRACE_FOOTER_SIZE, TRACE_FRAME_SIZE, TRACE_HEADER_SIZE, TRACE_MAGIC, TRACE_SEARCH_BIT,
    TRACE_SENSOR_MASK, TRACE_VERSION,
};
use crate::control::{Action, Mode};
use crate::error::TraceError;
use crate::robot::Pose;
use crate::sensors::SensorReadings;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceHeader {
    pub magic: u32,
    pub version: u8,
    pub controller_tag: u8,
    pub seed: u32,
    pub frame_count: u32,
    pub config_digest: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TraceFrame {
    pub readings: SensorReadings,
    pub mode: Mode,
    pub action: Action,
}

impl TraceFrame {
    #[inline]
    pub fn state_byte(&self) -> u8 {
        let mut byte = self.readings.bits() & TRACE_SENSOR_MASK;
        if self.mode == Mode::LostLineSearch {
            byte |= TRACE_SEARCH_BIT;
        }
        byte
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TraceFooter {
    pub final_pose: Pose,
    pub checksum: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TraceView {
    pub header: TraceHeader,
    pub frames: Vec<TraceFrame>,
    pub footer: TraceFooter,
}

pub fn serialize_trace(
    controller_tag: u8,
    seed: u32,
    config_digest: u32,
    frames: &[TraceFrame],
    final_pose: Pose,
) -> Vec<u8> {
    let body_len = frames.len() * TRACE_FRAME_SIZE;
    let total_len = TRACE_HEADER_SIZE + body_len + TRACE_FOOTER_SIZE;
    let mut data = vec![0u8; total_len];

    write_u32_le(&mut data, 0, TRACE_MAGIC);
    data[4] = TRACE_VERSION;
    data[5] = controller_tag;
    write_u32_le(&mut data, 8, seed);
    write_u32_le(&mut data, 12, frames.len() as u32);
    write_u32_le(&mut data, 16, config_digest);

    let mut offset = TRACE_HEADER_SIZE;
    for frame in frames {
        data[offset] = frame.state_byte();
        write_f64_le(&mut data, offset + 1, frame.action.turn_deg);
        write_f64_le(&mut data, offset + 9, frame.action.speed);
        offset += TRACE_FRAME_SIZE;
    }

    write_f64_le(&mut data, offset, final_pose.x);
    write_f64_le(&mut data, offset + 8, final_pose.y);
    write_f64_le(&mut data, offset + 16, final_pose.heading_deg);

    let checksum = crc32(&data[..offset + 24]);
    write_u32_le(&mut data, offset + 24, checksum);

    data
}

pub fn parse_trace(bytes: &[u8], max_frames: u32) -> Result<TraceView, TraceError> {
    let min_len = TRACE_HEADER_SIZE + TRACE_FOOTER_SIZE;
    if bytes.len() < min_len {
        return Err(TraceError::TraceTooShort {
            actual: bytes.len(),
            min: min_len,
        });
    }

    let magic = read_u32_le(bytes, 0);
    if magic != TRACE_MAGIC {
        return Err(TraceError::InvalidMagic { found: magic });
    }

    let version = bytes[4];
    if version != TRACE_VERSION {
        return Err(TraceError::UnsupportedVersion { found: version });
    }

    let controller_tag = bytes[5];
    if bytes[6] != 0 || bytes[7] != 0 || read_u32_le(bytes, 20) != 0 {
        return Err(TraceError::HeaderReservedNonZero);
    }

    let seed = read_u32_le(bytes, 8);
    let frame_count = read_u32_le(bytes, 12);
    let config_digest = read_u32_le(bytes, 16);

    if frame_count == 0 || frame_count > max_frames {
        return Err(TraceError::FrameCountOutOfRange {
            frame_count,
            max_frames,
        });
    }

    let expected_len =
        TRACE_HEADER_SIZE + frame_count as usize * TRACE_FRAME_SIZE + TRACE_FOOTER_SIZE;
    if bytes.len() != expected_len {
        return Err(TraceError::TraceLengthMismatch {
            expected: expected_len,
            actual: bytes.len(),
        });
    }

    let mut frames = Vec::with_capacity(frame_count as usize);
    let mut offset = TRACE_HEADER_SIZE;
    for frame in 0..frame_count {
        let state = bytes[offset];
        if state & !(TRACE_SENSOR_MASK | TRACE_SEARCH_BIT) != 0 {
            return Err(TraceError::ReservedStateBitsNonZero { frame, byte: state });
        }
        frames.push(TraceFrame {
            readings: SensorReadings::from_bits(state & TRACE_SENSOR_MASK),
            mode: if state & TRACE_SEARCH_BIT != 0 {
                Mode::LostLineSearch
            } else {
                Mode::FollowLine
            },
            action: Action {
                turn_deg: read_f64_le(bytes, offset + 1),
                speed: read_f64_le(bytes, offset + 9),
            },
        });
        offset += TRACE_FRAME_SIZE;
    }

    let final_pose = Pose {
        x: read_f64_le(bytes, offset),
        y: read_f64_le(bytes, offset + 8),
        heading_deg: read_f64_le(bytes, offset + 16),
    };
    let checksum = read_u32_le(bytes, offset + 24);
    let computed = crc32(&bytes[..offset + 24]);
    if checksum != computed {
        return Err(TraceError::CrcMismatch {
            stored: checksum,
            computed,
        });
    }

    Ok(TraceView {
        header: TraceHeader {
            magic,
            version,
            controller_tag,
            seed,
            frame_count,
            config_digest,
        },
        frames,
        footer: TraceFooter {
            final_pose,
            checksum,
        },
    })
}

#[inline]
fn read_u32_le(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[inline]
fn write_u32_le(bytes: &mut [u8], offset: usize, value: u32) {
    bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

#[inline]
fn read_f64_le(bytes: &[u8], offset: usize) -> f64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[offset..offset + 8]);
    f64::from_le_bytes(raw)
}

#[inline]
fn write_f64_le(bytes: &mut [u8], offset: usize, value: f64) {
    bytes[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

const CRC_TABLE: [u32; 256] = build_crc_table();

const fn build_crc_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;

    while i < 256 {
        let mut c = i as u32;
        let mut j = 0;

        while j < 8 {
            c = if (c & 1) != 0 {
                0xEDB8_8320u32 ^ (c >> 1)
            } else {
                c >> 1
            };
            j += 1;
        }

        table[i] = c;
        i += 1;
    }

    table
}

pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;

    for byte in data {
        let idx = ((crc ^ (*byte as u32)) & 0xFF) as usize;
        crc = CRC_TABLE[idx] ^ (crc >> 8);
    }

    crc ^ 0xFFFF_FFFFu32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frames() -> Vec<TraceFrame> {
        vec![
            TraceFrame {
                readings: SensorReadings::from_bits(0b00100),
                mode: Mode::FollowLine,
                action: Action {
                    turn_deg: 0.0,
                    speed: 2.0,
                },
            },
            TraceFrame {
                readings: SensorReadings::from_bits(0),
                mode: Mode::LostLineSearch,
                action: Action::STOP,
            },
            TraceFrame {
                readings: SensorReadings::from_bits(0b11000),
                mode: Mode::FollowLine,
                action: Action {
                    turn_deg: -3.0,
                    speed: 0.0,
                },
            },
        ]
    }

    fn sample_trace() -> Vec<u8> {
        serialize_trace(1, 0xABCD_1234, 0x1111_2222, &sample_frames(), Pose::new(1.5, 2.5, 3.5))
    }

    fn footer_offset(frame_count: usize) -> usize {
        TRACE_HEADER_SIZE + frame_count * TRACE_FRAME_SIZE
    }

    #[test]
    fn crc_matches_known_vector() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn roundtrip_small_trace() {
        let bytes = sample_trace();
        let trace = parse_trace(&bytes, 100).expect("trace should parse");

        assert_eq!(trace.header.controller_tag, 1);
        assert_eq!(trace.header.seed, 0xABCD_1234);
        assert_eq!(trace.header.frame_count, 3);
        assert_eq!(trace.header.config_digest, 0x1111_2222);
        assert_eq!(trace.frames, sample_frames());
        assert_eq!(trace.footer.final_pose, Pose::new(1.5, 2.5, 3.5));
    }

    #[test]
    fn rejects_trace_too_short() {
        let bytes = [0u8; TRACE_HEADER_SIZE + TRACE_FOOTER_SIZE - 1];
        assert!(matches!(
            parse_trace(&bytes, 100),
            Err(TraceError::TraceTooShort { .. })
        ));
    }

    #[test]
    fn rejects_invalid_magic() {
        let mut bytes = sample_trace();
        bytes[0] ^= 0x01;
        assert!(matches!(
            parse_trace(&bytes, 100),
            Err(TraceError::InvalidMagic { .. })
        ));
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut bytes = sample_trace();
        bytes[4] = TRACE_VERSION + 1;
        assert_eq!(
            parse_trace(&bytes, 100),
            Err(TraceError::UnsupportedVersion {
                found: TRACE_VERSION + 1
            })
        );
    }

    #[test]
    fn rejects_nonzero_reserved_header_bytes() {
        let mut bytes = sample_trace();
        bytes[7] = 1;
        assert_eq!(
            parse_trace(&bytes, 100),
            Err(TraceError::HeaderReservedNonZero)
        );

        let mut bytes = sample_trace();
        bytes[22] = 1;
        assert_eq!(
            parse_trace(&bytes, 100),
            Err(TraceError::HeaderReservedNonZero)
        );
    }

    #[test]
    fn rejects_frame_count_out_of_range() {
        let bytes = sample_trace();
        assert_eq!(
            parse_trace(&bytes, 2),
            Err(TraceError::FrameCountOutOfRange {
                frame_count: 3,
                max_frames: 2
            })
        );

        let mut bytes = sample_trace();
        bytes[12..16].copy_from_slice(&0u32.to_le_bytes());
        assert!(matches!(
            parse_trace(&bytes, 100),
            Err(TraceError::FrameCountOutOfRange { frame_count: 0, .. })
        ));
    }

    #[test]
    fn rejects_length_mismatch() {
        let mut bytes = sample_trace();
        bytes.push(0);
        assert!(matches!(
            parse_trace(&bytes, 100),
            Err(TraceError::TraceLengthMismatch { .. })
        ));
    }

    #[test]
    fn rejects_reserved_state_bits() {
        let mut bytes = sample_trace();
        bytes[TRACE_HEADER_SIZE + TRACE_FRAME_SIZE] = 0x40;
        assert_eq!(
            parse_trace(&bytes, 100),
            Err(TraceError::ReservedStateBitsNonZero {
                frame: 1,
                byte: 0x40
            })
        );
    }

    #[test]
    fn rejects_crc_mismatch() {
        let mut bytes = sample_trace();
        // Flip a bit inside the second frame's turn value.
        bytes[TRACE_HEADER_SIZE + TRACE_FRAME_SIZE + 3] ^= 0x01;
        assert!(matches!(
            parse_trace(&bytes, 100),
            Err(TraceError::CrcMismatch { .. })
        ));
    }

    #[test]
    fn checksum_covers_header_body_and_pose() {
        let frames = sample_frames();
        let bytes = sample_trace();
        let checksum_offset = footer_offset(frames.len()) + 24;
        let stored = u32::from_le_bytes([
            bytes[checksum_offset],
            bytes[checksum_offset + 1],
            bytes[checksum_offset + 2],
            bytes[checksum_offset + 3],
        ]);
        assert_eq!(stored, crc32(&bytes[..checksum_offset]));
        assert_eq!(bytes.len(), checksum_offset + 4);
    }
}
