//! Canonical-header RIFF/WAV helpers for joining segment audio.
//!
//! The vocoder emits canonical 44-byte-header PCM WAV files (fmt chunk
//! directly followed by the data chunk). These helpers read the few fields
//! the join stage needs and rebuild one file from many payloads. They are
//! not a general WAV parser.

use std::time::Duration;

use thiserror::Error;

/// Canonical header length: RIFF + fmt + data chunk headers.
pub const HEADER_LEN: usize = 44;

const RIFF_SIZE_OFFSET: usize = 4;
const SAMPLE_RATE_OFFSET: usize = 24;
const BITS_PER_SAMPLE_OFFSET: usize = 34;
const DATA_SIZE_OFFSET: usize = 40;

/// Malformed or inconsistent WAV payloads.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WavError {
    /// Payload shorter than the canonical header.
    #[error("data too short for a wav header ({len} bytes)")]
    TooShort {
        /// Actual payload length.
        len: usize,
    },

    /// Payload does not start with RIFF/WAVE magic.
    #[error("not a riff/wave payload")]
    BadMagic,

    /// Declared data size exceeds the bytes present.
    #[error("data chunk declares {declared} bytes, {actual} present")]
    TruncatedData {
        /// Size from the data chunk header.
        declared: usize,
        /// Bytes actually present after the header.
        actual: usize,
    },

    /// Segments to be joined disagree on the sample rate.
    #[error("sample rate mismatch: {first} vs {got}")]
    SampleRateMismatch {
        /// Rate of the first segment.
        first: u32,
        /// Conflicting rate.
        got: u32,
    },

    /// Join called with nothing to join.
    #[error("no audio to join")]
    Empty,

    /// A pause was requested before any audio established the format.
    #[error("no wav data before pause")]
    PauseBeforeAudio,

    /// Joined payload exceeds what a RIFF size field can describe.
    #[error("joined audio exceeds wav size limit")]
    TooLarge,
}

fn ensure_header(data: &[u8]) -> Result<(), WavError> {
    if data.len() < HEADER_LEN {
        return Err(WavError::TooShort { len: data.len() });
    }
    if &data[0..4] != b"RIFF" || &data[8..12] != b"WAVE" {
        return Err(WavError::BadMagic);
    }
    Ok(())
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}

/// Sample rate of a canonical WAV payload.
pub fn sample_rate(data: &[u8]) -> Result<u32, WavError> {
    ensure_header(data)?;
    Ok(read_u32(data, SAMPLE_RATE_OFFSET))
}

/// Bits per sample of a canonical WAV payload.
pub fn bits_per_sample(data: &[u8]) -> Result<u16, WavError> {
    ensure_header(data)?;
    Ok(u16::from_le_bytes([
        data[BITS_PER_SAMPLE_OFFSET],
        data[BITS_PER_SAMPLE_OFFSET + 1],
    ]))
}

/// The PCM payload of a canonical WAV, bounded by the declared data size.
pub fn audio_data(data: &[u8]) -> Result<&[u8], WavError> {
    ensure_header(data)?;
    let declared = read_u32(data, DATA_SIZE_OFFSET) as usize;
    let actual = data.len() - HEADER_LEN;
    if declared > actual {
        return Err(WavError::TruncatedData { declared, actual });
    }
    Ok(&data[HEADER_LEN..HEADER_LEN + declared])
}

/// Join canonical WAV payloads into one file.
///
/// The first payload's header is reused with the size fields patched. All
/// payloads must agree on the sample rate; the caller supplies them in the
/// order they must appear.
pub fn join(parts: &[Vec<u8>]) -> Result<Vec<u8>, WavError> {
    let first = parts.first().ok_or(WavError::Empty)?;
    ensure_header(first)?;
    let rate = sample_rate(first)?;

    let mut payload: Vec<u8> = Vec::new();
    for part in parts {
        let got = sample_rate(part)?;
        if got != rate {
            return Err(WavError::SampleRateMismatch { first: rate, got });
        }
        payload.extend_from_slice(audio_data(part)?);
    }

    let data_len = u32::try_from(payload.len()).map_err(|_| WavError::TooLarge)?;
    let riff_len = data_len.checked_add(36).ok_or(WavError::TooLarge)?;
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&first[..HEADER_LEN]);
    out[RIFF_SIZE_OFFSET..RIFF_SIZE_OFFSET + 4].copy_from_slice(&riff_len.to_le_bytes());
    out[DATA_SIZE_OFFSET..DATA_SIZE_OFFSET + 4].copy_from_slice(&data_len.to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// A silence clip in `template`'s format.
///
/// The template's header is reused with the size fields patched; the payload
/// is `duration` worth of zero samples at the template's rate and bit depth.
pub fn silence(template: &[u8], duration: Duration) -> Result<Vec<u8>, WavError> {
    ensure_header(template)?;
    let rate = sample_rate(template)?;
    let bits = bits_per_sample(template)?;
    let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
    let bytes = ms.saturating_mul(u64::from(rate)) / 1000 * u64::from(bits / 8);
    let data_len = u32::try_from(bytes).map_err(|_| WavError::TooLarge)?;
    let riff_len = data_len.checked_add(36).ok_or(WavError::TooLarge)?;
    let mut out = Vec::with_capacity(HEADER_LEN + data_len as usize);
    out.extend_from_slice(&template[..HEADER_LEN]);
    out[RIFF_SIZE_OFFSET..RIFF_SIZE_OFFSET + 4].copy_from_slice(&riff_len.to_le_bytes());
    out[DATA_SIZE_OFFSET..DATA_SIZE_OFFSET + 4].copy_from_slice(&data_len.to_le_bytes());
    out.resize(HEADER_LEN + data_len as usize, 0);
    Ok(out)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
