pub mod candidates;
pub mod ffmpeg;
pub mod transcript;
