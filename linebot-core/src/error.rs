use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    EmptyWorld { width: u32, height: u32 },
    ZeroFps,
    ZeroTolerance,
    NonPositiveSpeed { speed: f64 },
    NonPositiveTurnRate { turn_rate: f64 },
    ZeroMaxLostFrames,
    InvalidDamping { reason: &'static str },
    NonPositiveSensorGeometry,
    InvalidTrack { reason: &'static str },
    StartOutsideWorld { x: f64, y: f64 },
    Unserializable { reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyWorld { width, height } => {
                write!(f, "world must be non-empty: got {width}x{height}")
            }
            Self::ZeroFps => write!(f, "fps must be > 0"),
            Self::ZeroTolerance => write!(f, "line tolerance must be > 0"),
            Self::NonPositiveSpeed { speed } => write!(f, "base speed must be > 0: got {speed}"),
            Self::NonPositiveTurnRate { turn_rate } => {
                write!(f, "turn rate must be > 0: got {turn_rate}")
            }
            Self::ZeroMaxLostFrames => write!(f, "max_lost_frames must be > 0"),
            Self::InvalidDamping { reason } => write!(f, "invalid damping params: {reason}"),
            Self::NonPositiveSensorGeometry => {
                write!(f, "sensor distances and scale must be > 0")
            }
            Self::InvalidTrack { reason } => write!(f, "invalid track: {reason}"),
            Self::StartOutsideWorld { x, y } => {
                write!(f, "start pose ({x}, {y}) lies outside the world")
            }
            Self::Unserializable { reason } => {
                write!(f, "config cannot be serialized for digest: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone, Debug, PartialEq)]
pub enum TraceError {
    TraceTooShort { actual: usize, min: usize },
    InvalidMagic { found: u32 },
    UnsupportedVersion { found: u8 },
    HeaderReservedNonZero,
    FrameCountOutOfRange { frame_count: u32, max_frames: u32 },
    TraceLengthMismatch { expected: usize, actual: usize },
    ReservedStateBitsNonZero { frame: u32, byte: u8 },
    CrcMismatch { stored: u32, computed: u32 },
    ConfigDigestMismatch { recorded: u32, expected: u32 },
    InvalidConfig { error: ConfigError },
    SensorMismatch { frame: u32, recorded: u8, computed: u8 },
    PoseMismatch,
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TraceTooShort { actual, min } => {
                write!(f, "trace too short: got {actual} bytes, need at least {min}")
            }
            Self::InvalidMagic { found } => write!(f, "invalid trace magic: 0x{found:08x}"),
            Self::UnsupportedVersion { found } => write!(f, "unsupported trace version: {found}"),
            Self::HeaderReservedNonZero => write!(f, "header reserved bytes are non-zero"),
            Self::FrameCountOutOfRange {
                frame_count,
                max_frames,
            } => write!(
                f,
                "frame count out of range: {frame_count} (allowed 1..={max_frames})"
            ),
            Self::TraceLengthMismatch { expected, actual } => write!(
                f,
                "trace length mismatch: expected {expected} bytes, got {actual}"
            ),
            Self::ReservedStateBitsNonZero { frame, byte } => write!(
                f,
                "state byte reserved bits set at frame {frame}: 0x{byte:02x}"
            ),
            Self::CrcMismatch { stored, computed } => write!(
                f,
                "crc mismatch: stored=0x{stored:08x}, computed=0x{computed:08x}"
            ),
            Self::ConfigDigestMismatch { recorded, expected } => write!(
                f,
                "config digest mismatch: recorded=0x{recorded:08x}, expected=0x{expected:08x}"
            ),
            Self::InvalidConfig { error } => write!(f, "invalid replay config: {error}"),
            Self::SensorMismatch {
                frame,
                recorded,
                computed,
            } => write!(
                f,
                "sensor mismatch at frame {frame}: recorded=0b{recorded:05b}, computed=0b{computed:05b}"
            ),
            Self::PoseMismatch => write!(f, "final pose does not match replay"),
        }
    }
}

impl std::error::Error for TraceError {}
