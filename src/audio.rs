/*!
 * In-memory audio clips.
 *
 * Clips hold interleaved f32 samples. Decoding accepts integer PCM of 8 to
 * 32 bits and 32-bit float WAV; encoding always writes 16-bit PCM.
 */

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;

use crate::errors::AudioError;

/// Interleaved PCM audio
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples,
            channels: channels.max(1),
            sample_rate,
        }
    }

    /// Silent clip of `secs` seconds, rounded to whole frames
    pub fn silence(secs: f64, channels: u16, sample_rate: u32) -> Self {
        let channels = channels.max(1);
        let frames = seconds_to_frames(secs, sample_rate);
        Self::new(vec![0.0; frames * channels as usize], channels, sample_rate)
    }

    /// Decode WAV bytes
    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self, AudioError> {
        let mut reader = WavReader::new(Cursor::new(bytes))?;
        let spec = reader.spec();

        let samples = match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Float, 32) => reader
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()?,
            (SampleFormat::Int, bits @ (8 | 16 | 24 | 32)) => {
                let scale = (1u64 << (bits - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<Vec<_>, _>>()?
            }
            (format, bits) => {
                return Err(AudioError::Unsupported(format!("{:?} {}-bit", format, bits)));
            }
        };

        Ok(Self::new(samples, spec.channels, spec.sample_rate))
    }

    /// Encode as 16-bit PCM WAV
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>, AudioError> {
        let spec = WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec)?;
            for sample in &self.samples {
                let value = (sample * 32_768.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16;
                writer.write_sample(value)?;
            }
            writer.finalize()?;
        }

        Ok(cursor.into_inner())
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    fn check_layout(&self, other: &AudioClip) -> Result<(), AudioError> {
        if self.channels != other.channels || self.sample_rate != other.sample_rate {
            return Err(AudioError::FormatMismatch {
                expected_channels: self.channels,
                expected_rate: self.sample_rate,
                channels: other.channels,
                rate: other.sample_rate,
            });
        }
        Ok(())
    }

    /// Append `other` to the end of this clip
    pub fn append(&mut self, other: &AudioClip) -> Result<(), AudioError> {
        self.check_layout(other)?;
        self.samples.extend_from_slice(&other.samples);
        Ok(())
    }

    /// Join clips in order; all clips must share one layout
    pub fn concat<'a, I>(clips: I) -> Result<Self, AudioError>
    where
        I: IntoIterator<Item = &'a AudioClip>,
    {
        let mut iter = clips.into_iter();
        let mut combined = iter.next().ok_or(AudioError::Empty)?.clone();
        for clip in iter {
            combined.append(clip)?;
        }
        Ok(combined)
    }

    /// Surround the clip with silence; returns the seconds actually inserted
    /// before and after, after rounding to whole frames
    pub fn pad(&mut self, lead_secs: f64, trail_secs: f64) -> (f64, f64) {
        let channels = self.channels as usize;
        let lead_frames = seconds_to_frames(lead_secs, self.sample_rate);
        let trail_frames = seconds_to_frames(trail_secs, self.sample_rate);

        if lead_frames > 0 {
            let mut padded = vec![0.0; lead_frames * channels];
            padded.append(&mut self.samples);
            self.samples = padded;
        }
        self.samples.resize(self.samples.len() + trail_frames * channels, 0.0);

        let rate = self.sample_rate.max(1) as f64;
        (lead_frames as f64 / rate, trail_frames as f64 / rate)
    }
}

fn seconds_to_frames(secs: f64, sample_rate: u32) -> usize {
    if !secs.is_finite() || secs <= 0.0 {
        return 0;
    }
    (secs * sample_rate as f64).round() as usize
}
