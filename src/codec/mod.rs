//! Sample and payload codec
//!
//! Pure, stateless conversions between the three representations audio takes
//! on its way through the pipeline:
//! - normalized f32 samples (capture and playback)
//! - signed 16-bit little-endian PCM (wire payload)
//! - base64 text (embedded in JSON frames)

mod pcm;

pub use pcm::{
    decode_base64, encode_base64, float_to_pcm16, pcm16_from_bytes, pcm16_to_bytes,
    pcm16_to_float,
};
