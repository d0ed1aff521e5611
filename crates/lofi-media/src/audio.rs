//! Album audio assembly.
//!
//! Tracks are joined with the concat demuxer and re-encoded once. No
//! crossfades are applied, so the final duration is exactly the sum of
//! the inputs.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::info;

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};

/// Concatenate audio files into one mp3 track.
pub async fn concat_audio(inputs: &[PathBuf], output: impl AsRef<Path>) -> MediaResult<()> {
    let output = output.as_ref();

    if inputs.is_empty() {
        return Err(MediaError::invalid_media("no audio inputs to concatenate"));
    }
    for input in inputs {
        if !input.exists() {
            return Err(MediaError::FileNotFound(input.clone()));
        }
    }

    let list_path = output.with_extension("concat.txt");
    fs::write(&list_path, concat_list_content(inputs)).await?;

    info!(tracks = inputs.len(), output = %output.display(), "concatenating album audio");

    let result = FfmpegCommand::new(output)
        .input_with_args(&list_path, ["-f", "concat", "-safe", "0"])
        .audio_codec("libmp3lame")
        .output_args(["-q:a", "2"])
        .run()
        .await;

    let _ = fs::remove_file(&list_path).await;
    result
}

/// Render the concat demuxer list file. Single quotes inside paths are
/// escaped the way the demuxer expects ('\'' splice).
fn concat_list_content(inputs: &[PathBuf]) -> String {
    let mut content = String::new();
    for input in inputs {
        let escaped = input.to_string_lossy().replace('\'', "'\\''");
        content.push_str(&format!("file '{escaped}'\n"));
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_list_content() {
        let inputs = vec![
            PathBuf::from("/tmp/songs/a.mp3"),
            PathBuf::from("/tmp/songs/b.mp3"),
        ];
        let content = concat_list_content(&inputs);
        assert_eq!(content, "file '/tmp/songs/a.mp3'\nfile '/tmp/songs/b.mp3'\n");
    }

    #[test]
    fn test_concat_list_escapes_quotes() {
        let inputs = vec![PathBuf::from("/tmp/it's lofi.mp3")];
        let content = concat_list_content(&inputs);
        assert_eq!(content, "file '/tmp/it'\\''s lofi.mp3'\n");
    }

    #[tokio::test]
    async fn test_concat_rejects_empty_input() {
        let result = concat_audio(&[], "/tmp/out.mp3").await;
        assert!(matches!(result, Err(MediaError::InvalidMedia(_))));
    }
}
