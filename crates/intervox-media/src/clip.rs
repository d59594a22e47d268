use intervox_foundation::MediaError;
use std::io::Cursor;

/// A recorded answer segment: mono PCM16 at the capture sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl AudioClip {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / self.sample_rate as u64
    }

    /// Encode as a mono 16-bit WAV for the transcription upload.
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>, MediaError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .map_err(|e| MediaError::Encoding(e.to_string()))?;
            for &sample in &self.samples {
                writer
                    .write_sample(sample)
                    .map_err(|e| MediaError::Encoding(e.to_string()))?;
            }
            writer
                .finalize()
                .map_err(|e| MediaError::Encoding(e.to_string()))?;
        }
        Ok(cursor.into_inner())
    }
}
