use serde::{Deserialize, Serialize};

use crate::codec;

/// A transport-level message, discriminated by its `type` field.
///
/// The same shape is used in both directions: the client sends `audio` and
/// `video` frames, the service replies with `audio` and `text`. The kind is
/// fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Frame {
    /// Base64-encoded little-endian PCM16 samples.
    Audio { data: String },

    /// A data-URL-encoded JPEG still frame.
    Video { data: String },

    /// Free-form response text. Some service builds spell the payload field
    /// `text` instead of `data`; both are accepted on receipt.
    Text {
        #[serde(alias = "text")]
        data: String,
    },
}

impl Frame {
    /// Build an audio frame from raw PCM16 bytes.
    pub fn audio(pcm_bytes: &[u8]) -> Self {
        Frame::Audio {
            data: codec::encode_base64(pcm_bytes),
        }
    }

    /// Build a video frame from JPEG bytes as a data URL.
    pub fn video(jpeg_bytes: &[u8]) -> Self {
        Frame::Video {
            data: format!("data:image/jpeg;base64,{}", codec::encode_base64(jpeg_bytes)),
        }
    }

    /// Build a text frame.
    pub fn text(content: impl Into<String>) -> Self {
        Frame::Text {
            data: content.into(),
        }
    }

    /// Discriminator name, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Audio { .. } => "audio",
            Frame::Video { .. } => "video",
            Frame::Text { .. } => "text",
        }
    }
}
