pub mod file;
pub mod frame;

pub use file::AudioFile;
pub use frame::AudioFrame;
