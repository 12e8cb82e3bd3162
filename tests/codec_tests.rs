// Unit tests for the sample/payload codec
//
// These cover the conversion laws the pipeline depends on: PCM round-trips
// within quantization error, clamping at the rails, and base64 round-trips.

use voicewire::codec::{
    decode_base64, encode_base64, float_to_pcm16, pcm16_from_bytes, pcm16_to_bytes,
    pcm16_to_float,
};

#[test]
fn test_float_to_pcm16_scaling() {
    let pcm = float_to_pcm16(&[0.0, 1.0, -1.0, 0.5, -0.5]);

    assert_eq!(pcm[0], 0);
    assert_eq!(pcm[1], 32767);
    assert_eq!(pcm[2], -32768);
    assert_eq!(pcm[3], 16383); // 0.5 * 32767, truncated
    assert_eq!(pcm[4], -16384);
}

#[test]
fn test_float_to_pcm16_clamps_out_of_range() {
    let pcm = float_to_pcm16(&[2.0, -2.0, 1.0001, -1.0001]);

    assert_eq!(pcm[0], 32767);
    assert_eq!(pcm[1], -32768);
    assert_eq!(pcm[2], 32767);
    assert_eq!(pcm[3], -32768);
}

#[test]
fn test_pcm16_to_float_decodes_little_endian() {
    // 256 = 0x0100 little-endian, -32768 = 0x8000
    let bytes = [0x00, 0x01, 0x00, 0x80];
    let samples = pcm16_to_float(&bytes).unwrap();

    assert_eq!(samples.len(), 2);
    assert!((samples[0] - 256.0 / 32768.0).abs() < f32::EPSILON);
    assert!((samples[1] + 1.0).abs() < f32::EPSILON);
}

#[test]
fn test_pcm16_to_float_rejects_odd_length() {
    assert!(pcm16_to_float(&[0x00, 0x01, 0x02]).is_err());
    assert!(pcm16_from_bytes(&[0x7f]).is_err());
}

#[test]
fn test_pcm16_to_float_empty() {
    assert!(pcm16_to_float(&[]).unwrap().is_empty());
}

#[test]
fn test_round_trip_within_quantization_error() {
    let samples: Vec<f32> = (0..1000).map(|i| (i as f32 / 500.0) - 1.0).collect();

    let pcm = float_to_pcm16(&samples);
    let bytes = pcm16_to_bytes(&pcm);
    let decoded = pcm16_to_float(&bytes).unwrap();

    assert_eq!(decoded.len(), samples.len());
    // Bound: one quantization step, plus the 32767/32768 scale skew on the
    // non-negative side.
    for (original, restored) in samples.iter().zip(decoded.iter()) {
        assert!(
            (original - restored).abs() <= 2.0 / 32768.0,
            "sample {} restored as {}",
            original,
            restored
        );
    }
}

#[test]
fn test_pcm16_bytes_round_trip() {
    let samples: Vec<i16> = vec![100, -200, 300, -400, i16::MIN, i16::MAX];

    let bytes = pcm16_to_bytes(&samples);
    assert_eq!(bytes.len(), samples.len() * 2);

    let restored = pcm16_from_bytes(&bytes).unwrap();
    assert_eq!(restored, samples);
}

#[test]
fn test_base64_round_trip() {
    let all_bytes: Vec<u8> = (0..=255).collect();

    let encoded = encode_base64(&all_bytes);
    let decoded = decode_base64(&encoded).unwrap();
    assert_eq!(decoded, all_bytes);

    assert_eq!(decode_base64(&encode_base64(&[])).unwrap(), Vec::<u8>::new());
}

#[test]
fn test_decode_base64_rejects_garbage() {
    assert!(decode_base64("not valid base64!!!").is_err());
}

#[test]
fn test_sine_wave_chunks_survive_wire_encoding() {
    // Three 512-sample chunks of a 440 Hz sine at 16 kHz, encoded the way the
    // capture path does (f32 -> pcm16 -> bytes -> base64) and decoded the way
    // the playback path does.
    let sample_rate = 16000.0;
    for chunk_index in 0..3 {
        let samples: Vec<f32> = (0..512)
            .map(|i| {
                let n = (chunk_index * 512 + i) as f32;
                0.5 * (2.0 * std::f32::consts::PI * 440.0 * n / sample_rate).sin()
            })
            .collect();

        let wire = encode_base64(&pcm16_to_bytes(&float_to_pcm16(&samples)));
        let decoded = pcm16_to_float(&decode_base64(&wire).unwrap()).unwrap();

        assert_eq!(decoded.len(), 512);
        for (original, restored) in samples.iter().zip(decoded.iter()) {
            assert!((original - restored).abs() <= 2.0 / 32768.0);
        }
    }
}
