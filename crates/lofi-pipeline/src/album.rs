//! The album builder: runs one album through its stage sequence, and
//! the batch loop around it.
//!
//! Stage order is fixed. Each stage records its outputs on the
//! [`AlbumContext`] and the next stage reads them back; a failure
//! anywhere aborts the album (no partial album is ever published), and
//! the batch loop moves on to the next one after a cooldown.

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use lofi_models::{AlbumContext, VideoMetadata};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult, Stage, StageFailure};
use crate::production::Services;

pub struct AlbumBuilder {
    config: PipelineConfig,
    services: Services,
}

impl AlbumBuilder {
    pub fn new(config: PipelineConfig, services: Services) -> Self {
        Self { config, services }
    }

    /// Produce the whole batch. Returns how many albums were published.
    ///
    /// A failed album is logged and skipped; its prompts are reused
    /// unchanged for the next attempt. Prompts mutate only after a
    /// publish, so a retry never drifts away from what the user asked
    /// for.
    pub async fn run(&self) -> usize {
        let mut music_prompt = self.config.music_prompt.clone();
        let mut cover_prompt = self.config.cover_prompt.clone();
        let mut published = 0;

        for index in 1..=self.config.albums {
            info!(album = index, total = self.config.albums, "starting album");
            let mut ctx =
                AlbumContext::new(&self.config.work_dir, index, &music_prompt, &cover_prompt);

            match self.build_album(&mut ctx).await {
                Ok(video_id) => {
                    info!(album = index, video_id = %video_id, "album published");
                    published += 1;

                    match self.services.text.vary_music_prompt(&music_prompt).await {
                        Ok(next) => music_prompt = next,
                        Err(e) => {
                            warn!(error = %e, "music prompt mutation failed, keeping prompt")
                        }
                    }
                    match self.services.text.vary_cover_prompt(&cover_prompt).await {
                        Ok(next) => cover_prompt = next,
                        Err(e) => {
                            warn!(error = %e, "cover prompt mutation failed, keeping prompt")
                        }
                    }
                }
                Err(e) => {
                    error!(album = index, stage = %e.stage, error = %e, "album failed");
                    if index < self.config.albums {
                        info!(secs = self.config.cooldown.as_secs(), "cooling down");
                        tokio::time::sleep(self.config.cooldown).await;
                    }
                }
            }
        }

        published
    }

    /// Build and publish one album. Returns the published video id.
    pub async fn build_album(&self, ctx: &mut AlbumContext) -> PipelineResult<String> {
        self.prepare_dirs(ctx).await?;

        self.stage_cover_image(ctx).await?;
        self.stage_cover_outpaint(ctx).await?;
        self.stage_cover_video(ctx).await?;
        self.stage_songs(ctx).await?;
        self.stage_filter_short_clips(ctx).await?;
        self.stage_audio_concat(ctx).await?;
        self.stage_video_loop(ctx).await?;
        let metadata = self.stage_metadata(ctx).await?;
        self.stage_publish(ctx, &metadata).await
    }

    /// Reset the per-album stage directories so no stale artifact from
    /// a previous album leaks into this one.
    async fn prepare_dirs(&self, ctx: &AlbumContext) -> PipelineResult<()> {
        for dir in ctx.stage_dirs() {
            if dir.exists() {
                tokio::fs::remove_dir_all(dir)
                    .await
                    .map_err(|e| PipelineError::at(Stage::CoverImage, e))?;
            }
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| PipelineError::at(Stage::CoverImage, e))?;
        }
        Ok(())
    }

    async fn stage_cover_image(&self, ctx: &mut AlbumContext) -> PipelineResult<()> {
        let stage = Stage::CoverImage;
        info!(stage = %stage, "generating cover image");

        // Refinement is an enhancement; the raw prompt still works.
        let prompt = match self
            .services
            .text
            .refine_image_prompt(&ctx.cover_prompt)
            .await
        {
            Ok(refined) => refined,
            Err(e) => {
                warn!(error = %e, "prompt refinement failed, using the raw cover prompt");
                ctx.cover_prompt.clone()
            }
        };

        let url = self
            .services
            .image
            .generate(&prompt)
            .await
            .map_err(|e| PipelineError::at(stage, e))?;

        let dest = ctx.covers_dir.join("cover.png");
        self.services
            .fetcher
            .fetch(&url, &dest)
            .await
            .map_err(|e| PipelineError::at(stage, e))?;

        ctx.cover_path = Some(dest);
        Ok(())
    }

    async fn stage_cover_outpaint(&self, ctx: &mut AlbumContext) -> PipelineResult<()> {
        let stage = Stage::CoverOutpaint;
        let cover = self.required(ctx, stage, ctx.cover_path.as_deref())?;
        info!(stage = %stage, "outpainting cover to landscape");

        // Outpainting is best-effort: if any part of it fails, the
        // square cover is used as-is. A partial composite is never kept.
        match self.outpaint(ctx, &cover).await {
            Ok(landscape) => ctx.landscape_cover_path = Some(landscape),
            Err(e) => {
                warn!(error = %e, "outpainting failed, falling back to the square cover");
                ctx.landscape_cover_path = Some(cover);
            }
        }
        Ok(())
    }

    async fn outpaint(&self, ctx: &AlbumContext, cover: &Path) -> Result<PathBuf, StageFailure> {
        let (left_half, right_half) = self
            .services
            .media
            .split_for_outpaint(cover, &ctx.covers_dir)?;

        let left_url = self.services.image.edit(&left_half, &ctx.cover_prompt).await?;
        let left = ctx.covers_dir.join("outpainted_left.png");
        self.services.fetcher.fetch(&left_url, &left).await?;

        let right_url = self
            .services
            .image
            .edit(&right_half, &ctx.cover_prompt)
            .await?;
        let right = ctx.covers_dir.join("outpainted_right.png");
        self.services.fetcher.fetch(&right_url, &right).await?;

        let landscape = ctx.covers_dir.join("landscape_cover.png");
        self.services
            .media
            .compose_landscape(cover, &left, &right, &landscape)?;
        Ok(landscape)
    }

    async fn stage_cover_video(&self, ctx: &mut AlbumContext) -> PipelineResult<()> {
        let stage = Stage::CoverVideo;
        let cover = self.required(ctx, stage, ctx.landscape_cover_path.as_deref())?;
        info!(stage = %stage, "generating cover video");

        let public_url = self
            .services
            .host
            .publish(&cover, &self.config.propagation_poll)
            .await
            .map_err(|e| PipelineError::at(stage, e))?;

        let clip_url = self
            .services
            .video
            .generate_clip(
                &public_url,
                &self.config.video_prompt,
                self.config.video_clip_secs,
                &self.config.video_poll,
            )
            .await
            .map_err(|e| PipelineError::at(stage, e))?;

        let dest = ctx.video_dir.join("clip.mp4");
        self.services
            .fetcher
            .fetch(&clip_url, &dest)
            .await
            .map_err(|e| PipelineError::at(stage, e))?;

        ctx.clip_path = Some(dest);
        Ok(())
    }

    async fn stage_songs(&self, ctx: &mut AlbumContext) -> PipelineResult<()> {
        let stage = Stage::SongGeneration;

        for round in 1..=self.config.songs_per_album {
            info!(stage = %stage, round, of = self.config.songs_per_album, "generating song pair");

            let ids = self
                .services
                .music
                .generate_pair(&ctx.music_prompt)
                .await
                .map_err(|e| PipelineError::at(stage, e))?;

            let clips = self
                .services
                .music
                .wait_for_audio(&ids, &self.config.song_poll)
                .await
                .map_err(|e| PipelineError::at(stage, e))?;

            for clip in clips {
                let dest = ctx.songs_dir.join(format!("{}.mp3", clip.id));
                self.services
                    .fetcher
                    .fetch(&clip.url, &dest)
                    .await
                    .map_err(|e| PipelineError::at(stage, e))?;
                ctx.song_paths.push(dest);
            }
        }
        Ok(())
    }

    /// Clips below the minimum length are dropped and never
    /// re-requested, so usable track count varies per album (bounded by
    /// twice the generation rounds).
    async fn stage_filter_short_clips(&self, ctx: &mut AlbumContext) -> PipelineResult<()> {
        let stage = Stage::FilterShortClips;
        let mut kept = Vec::new();
        let mut durations = Vec::new();

        for path in &ctx.song_paths {
            let secs = self
                .services
                .media
                .duration_secs(path)
                .await
                .map_err(|e| PipelineError::at(stage, e))?;
            if secs < self.config.min_clip_secs {
                info!(clip = %path.display(), secs, "discarding short clip");
                continue;
            }
            kept.push(path.clone());
            durations.push(secs);
        }

        if kept.is_empty() {
            return Err(PipelineError::invariant(
                stage,
                "no clips reached the minimum track length",
            ));
        }

        info!(stage = %stage, kept = kept.len(), of = ctx.song_paths.len(), "clips filtered");
        ctx.song_paths = kept;
        ctx.track_durations = durations;
        Ok(())
    }

    async fn stage_audio_concat(&self, ctx: &mut AlbumContext) -> PipelineResult<()> {
        let stage = Stage::AudioConcat;
        info!(stage = %stage, tracks = ctx.song_paths.len(), "concatenating album audio");

        let output = ctx.songs_dir.join("album.mp3");
        self.services
            .media
            .concat_audio(&ctx.song_paths, &output)
            .await
            .map_err(|e| PipelineError::at(stage, e))?;

        ctx.final_audio_path = Some(output);
        Ok(())
    }

    async fn stage_video_loop(&self, ctx: &mut AlbumContext) -> PipelineResult<()> {
        let stage = Stage::VideoLoop;
        let audio = self.required(ctx, stage, ctx.final_audio_path.as_deref())?;
        let clip = self.required(ctx, stage, ctx.clip_path.as_deref())?;

        let audio_secs = self
            .services
            .media
            .duration_secs(&audio)
            .await
            .map_err(|e| PipelineError::at(stage, e))?;
        info!(stage = %stage, audio_secs, "looping clip to album length");

        let looped = ctx.video_dir.join("looped.mp4");
        self.services
            .media
            .loop_to_duration(&clip, audio_secs, &looped)
            .await
            .map_err(|e| PipelineError::at(stage, e))?;

        let output = ctx.video_dir.join("album.mp4");
        self.services
            .media
            .mux(&looped, &audio, &output)
            .await
            .map_err(|e| PipelineError::at(stage, e))?;

        ctx.final_video_path = Some(output);
        Ok(())
    }

    async fn stage_metadata(&self, ctx: &AlbumContext) -> PipelineResult<VideoMetadata> {
        let stage = Stage::MetadataGeneration;
        info!(stage = %stage, "generating title and description");

        let title = self
            .services
            .text
            .album_title(&ctx.music_prompt, &ctx.cover_prompt)
            .await
            .map_err(|e| PipelineError::at(stage, e))?;

        let timestamps = format_timestamps(&ctx.track_durations);
        let description = self
            .services
            .text
            .video_description(&ctx.music_prompt, &title, &timestamps)
            .await
            .map_err(|e| PipelineError::at(stage, e))?;

        Ok(VideoMetadata::new(title, description))
    }

    async fn stage_publish(
        &self,
        ctx: &AlbumContext,
        metadata: &VideoMetadata,
    ) -> PipelineResult<String> {
        let stage = Stage::Publish;
        let video = self.required(ctx, stage, ctx.final_video_path.as_deref())?;
        info!(stage = %stage, title = %metadata.title, "uploading album");

        self.services
            .publisher
            .upload(&video, metadata)
            .await
            .map_err(|e| PipelineError::at(stage, e))
    }

    /// Resolve a recorded upstream artifact, verifying it exists on disk.
    fn required(
        &self,
        ctx: &AlbumContext,
        stage: Stage,
        path: Option<&Path>,
    ) -> PipelineResult<PathBuf> {
        let path = path.ok_or_else(|| {
            PipelineError::invariant(stage, "upstream stage recorded no artifact")
        })?;
        let path = ctx
            .require(path)
            .map_err(|e| PipelineError::at(stage, e))?;
        Ok(path.to_path_buf())
    }
}

/// Track start offsets as "M:SS" lines, one per surviving track.
pub fn format_timestamps(durations: &[f64]) -> String {
    let mut lines = Vec::with_capacity(durations.len());
    let mut offset = 0.0_f64;
    for secs in durations {
        let total = offset.round() as u64;
        lines.push(format!("{}:{:02}", total / 60, total % 60));
        offset += secs;
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_are_cumulative_offsets() {
        assert_eq!(format_timestamps(&[45.0, 45.0]), "0:00\n0:45");
        assert_eq!(format_timestamps(&[90.0, 125.5, 60.0]), "0:00\n1:30\n3:36");
    }

    #[test]
    fn test_timestamps_empty() {
        assert_eq!(format_timestamps(&[]), "");
    }
}
