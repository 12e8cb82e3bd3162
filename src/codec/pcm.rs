use base64::Engine;

use crate::error::MalformedAudioError;

/// Convert normalized f32 samples to signed 16-bit PCM.
///
/// Each sample is clamped to [-1.0, 1.0] and scaled asymmetrically (negative
/// values by 32768, non-negative by 32767) so both rails are reachable
/// without overflow. Truncates toward zero.
pub fn float_to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| {
            let clamped = s.clamp(-1.0, 1.0);
            if clamped < 0.0 {
                (clamped * 32768.0) as i16
            } else {
                (clamped * 32767.0) as i16
            }
        })
        .collect()
}

/// Decode little-endian PCM16 bytes into normalized f32 samples.
pub fn pcm16_to_float(bytes: &[u8]) -> Result<Vec<f32>, MalformedAudioError> {
    if bytes.len() % 2 != 0 {
        return Err(MalformedAudioError::TruncatedSample(bytes.len()));
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect())
}

/// Serialize i16 samples as little-endian bytes.
pub fn pcm16_to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Parse little-endian bytes back into i16 samples.
pub fn pcm16_from_bytes(bytes: &[u8]) -> Result<Vec<i16>, MalformedAudioError> {
    if bytes.len() % 2 != 0 {
        return Err(MalformedAudioError::TruncatedSample(bytes.len()));
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Encode bytes as standard base64 for embedding in a JSON frame.
pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decode a base64 payload received off the wire.
pub fn decode_base64(text: &str) -> Result<Vec<u8>, MalformedAudioError> {
    Ok(base64::engine::general_purpose::STANDARD.decode(text)?)
}
