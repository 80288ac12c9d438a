use std::time::Duration;

/// One chunk of raw PCM16LE audio as received from a client
///
/// Zero-length frames are valid on the wire but carry no audio.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AudioFrame {
    data: Vec<u8>,
}

impl AudioFrame {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Playback time covered by this frame at the given byte rate
    pub fn duration(&self, bytes_per_second: u32) -> Duration {
        if bytes_per_second == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.data.len() as f64 / f64::from(bytes_per_second))
    }
}

impl From<Vec<u8>> for AudioFrame {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}
