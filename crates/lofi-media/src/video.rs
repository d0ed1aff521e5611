//! Video looping and muxing.
//!
//! The single generated clip is repeated whole-clip enough times to
//! reach or exceed the album audio duration, then trimmed to the exact
//! audio length. The clip is never stretched.

use std::path::Path;

use tracing::info;

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};
use crate::probe::duration_secs;

/// Whole-clip repetitions needed to reach or exceed `audio_secs`.
///
/// `loops_needed(125.0, 40.0)` is 4: three loops give 120s which still
/// falls short, four give 160s which is then trimmed to 125s.
pub fn loops_needed(audio_secs: f64, clip_secs: f64) -> MediaResult<u32> {
    if clip_secs <= 0.0 {
        return Err(MediaError::invalid_media("clip duration must be positive"));
    }
    if audio_secs <= 0.0 {
        return Err(MediaError::invalid_media("audio duration must be positive"));
    }
    Ok((audio_secs / clip_secs).ceil().max(1.0) as u32)
}

/// Loop `clip` to exactly `audio_secs` seconds of video.
pub async fn loop_to_duration(
    clip: impl AsRef<Path>,
    audio_secs: f64,
    output: impl AsRef<Path>,
) -> MediaResult<()> {
    let clip = clip.as_ref();
    let clip_secs = duration_secs(clip).await?;
    let loops = loops_needed(audio_secs, clip_secs)?;

    info!(
        clip = %clip.display(),
        clip_secs,
        audio_secs,
        loops,
        "looping clip to album length"
    );

    // -stream_loop N repeats the input N additional times.
    FfmpegCommand::new(output.as_ref())
        .input_with_args(clip, ["-stream_loop".to_string(), (loops - 1).to_string()])
        .duration(audio_secs)
        .video_codec("libx264")
        .output_args(["-pix_fmt", "yuv420p", "-an"])
        .run()
        .await
}

/// Mux an audio track into a video file. Video is stream-copied; audio
/// is encoded to AAC. `-shortest` keeps the container length pinned to
/// the trimmed video.
pub async fn mux(
    video: impl AsRef<Path>,
    audio: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> MediaResult<()> {
    FfmpegCommand::new(output.as_ref())
        .input(video.as_ref())
        .input(audio.as_ref())
        .output_args(["-map", "0:v:0", "-map", "1:a:0"])
        .video_codec("copy")
        .audio_codec("aac")
        .output_args(["-b:a", "192k", "-shortest"])
        .run()
        .await
}
