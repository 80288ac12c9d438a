use crate::recognition::proto::{
    audio_format_options, language_restriction_options, raw_audio, recognition_model_options,
    text_normalization_options, AudioFormatOptions, LanguageRestrictionOptions, RawAudio,
    RecognitionModelOptions, StreamingOptions, TextNormalizationOptions,
};
use serde::{Deserialize, Serialize};

/// Sample rate the recognizer expects (16kHz)
pub const SAMPLE_RATE_HZ: u32 = 16000;

/// Mono audio
pub const CHANNEL_COUNT: u16 = 1;

/// Languages the recognizer is restricted to, in priority order
pub const LANGUAGE_WHITELIST: [&str; 2] = ["ru-RU", "en-US"];

/// Audio sample encoding sent to the recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioEncoding {
    /// 16-bit signed little-endian linear PCM
    Linear16Pcm,
}

/// How the recognizer schedules its work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingMode {
    /// Results are produced while audio is still arriving
    RealTime,
}

/// Recognition parameters for one relay session
///
/// Sent once, as the first message of every outbound recognition stream.
/// Every session of a deployment uses the same value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub encoding: AudioEncoding,

    /// Sample rate in Hz
    pub sample_rate_hz: u32,

    /// Number of audio channels (1 = mono)
    pub channel_count: u16,

    /// Allowed languages, ordered
    pub language_whitelist: Vec<String>,

    /// Whether the recognizer normalizes numbers, punctuation, etc.
    pub normalization_enabled: bool,

    /// Whether profanity is masked in results
    pub profanity_filter: bool,

    pub processing_mode: ProcessingMode,
}

impl SessionConfig {
    /// The fixed deployment configuration
    pub fn build() -> Self {
        Self {
            encoding: AudioEncoding::Linear16Pcm,
            sample_rate_hz: SAMPLE_RATE_HZ,
            channel_count: CHANNEL_COUNT,
            language_whitelist: LANGUAGE_WHITELIST.iter().map(|code| code.to_string()).collect(),
            normalization_enabled: true,
            profanity_filter: true,
            processing_mode: ProcessingMode::RealTime,
        }
    }

    /// Convert to the recognizer's session options message
    pub fn to_streaming_options(&self) -> StreamingOptions {
        let audio_encoding = match self.encoding {
            AudioEncoding::Linear16Pcm => raw_audio::AudioEncoding::Linear16Pcm,
        };

        let text_normalization = if self.normalization_enabled {
            text_normalization_options::TextNormalization::Enabled
        } else {
            text_normalization_options::TextNormalization::Disabled
        };

        let audio_processing_type = match self.processing_mode {
            ProcessingMode::RealTime => recognition_model_options::AudioProcessingType::RealTime,
        };

        StreamingOptions {
            recognition_model: Some(RecognitionModelOptions {
                model: String::new(),
                audio_format: Some(AudioFormatOptions {
                    audio_format: Some(audio_format_options::AudioFormat::RawAudio(RawAudio {
                        audio_encoding: audio_encoding as i32,
                        sample_rate_hertz: i64::from(self.sample_rate_hz),
                        audio_channel_count: i64::from(self.channel_count),
                    })),
                }),
                text_normalization: Some(TextNormalizationOptions {
                    text_normalization: text_normalization as i32,
                    profanity_filter: self.profanity_filter,
                    literature_text: false,
                }),
                language_restriction: Some(LanguageRestrictionOptions {
                    restriction_type: language_restriction_options::LanguageRestrictionType::Whitelist
                        as i32,
                    language_code: self.language_whitelist.clone(),
                }),
                audio_processing_type: audio_processing_type as i32,
            }),
        }
    }

    /// Bytes of audio per second of speech at this format
    pub fn bytes_per_second(&self) -> u32 {
        let bytes_per_sample = match self.encoding {
            AudioEncoding::Linear16Pcm => 2,
        };
        self.sample_rate_hz * u32::from(self.channel_count) * bytes_per_sample
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::build()
    }
}
