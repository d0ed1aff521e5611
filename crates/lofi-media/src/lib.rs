//! Media assembly for album builds: FFmpeg/FFprobe wrappers for audio
//! concatenation, video looping and muxing, plus cover compositing.

mod audio;
mod command;
mod cover;
mod error;
mod probe;
mod video;

pub use audio::concat_audio;
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand};
pub use cover::{compose_landscape, split_for_outpaint};
pub use error::{MediaError, MediaResult};
pub use probe::duration_secs;
pub use video::{loop_to_duration, loops_needed, mux};
