//! RenderExecutor (spec.md §4.9): spawns `ffmpeg` against a `RenderGraph`,
//! registering the child with the `Scheduler` so `Cancel` can SIGKILL it,
//! and works down a fallback ladder when a render attempt fails.
//!
//! Grounded on `vclip-media/src/command.rs::FfmpegRunner`'s child-process
//! lifecycle (stderr capture, cancellation-aware wait), but spawns its own
//! `tokio::process::Command` instead of going through `FfmpegRunner`: the
//! runner never exposes the child's PID, and this executor needs the PID
//! immediately after spawn to hand to `Scheduler::register_child` and to
//! preempt the wait on `Scheduler::is_cancelled` rather than only checking
//! after the process has already exited.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;

use vclip_media::render_graph::{RenderGraph, RenderGraphOptions};
use vclip_media::{apply_watermark_if_available, MediaError};
use vclip_models::constants::{STDERR_CAPTURE_MAX_BYTES, STDERR_TAIL_MAX_CHARS};
use vclip_models::{prepare_segments_for_render, JobId, Segment};
use vclip_queue::Scheduler;

use crate::config::EncoderConfig;
use crate::error::{WorkerError, WorkerResult};

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(400);

/// Outcome of a successful render attempt: the output path plus whatever
/// degradations were applied along the fallback ladder, recorded as
/// optimization notes (spec.md §7: "qualityGateOverride reason ... to
/// optimizationNotes" — the same convention applies to render degradation).
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub output_path: PathBuf,
    pub optimization_notes: Vec<String>,
    pub command: String,
}

pub struct RenderExecutor<'a> {
    scheduler: &'a Scheduler,
    encoder: &'a EncoderConfig,
}

impl<'a> RenderExecutor<'a> {
    pub fn new(scheduler: &'a Scheduler, encoder: &'a EncoderConfig) -> Self {
        Self { scheduler, encoder }
    }

    /// Run the full 5-step fallback ladder from spec.md §4.9.
    pub async fn render(
        &self,
        job_id: &JobId,
        input: &Path,
        work_dir: &Path,
        output: &Path,
        segments: &[Segment],
        duration_secs: f64,
        opts: &RenderGraphOptions,
    ) -> WorkerResult<RenderOutcome> {
        if segments.is_empty() {
            return Err(WorkerError::NoRenderableSegments);
        }
        let segments = prepare_segments_for_render(segments.to_vec(), duration_secs);

        let mut notes = Vec::new();

        // 1. Full graph with all overlays.
        match self.try_graph_render(job_id, input, work_dir, output, &segments, opts).await {
            Ok(command) => return Ok(self.finish(output, notes, command).await),
            Err(e) if e.is_cancellation() => return Err(e),
            Err(e) => notes.push(format!("full-overlay render failed: {e}")),
        }

        // 2. Drop overlays and disable xfade stitching.
        let stripped_opts = RenderGraphOptions {
            transitions_enabled: false,
            subtitle_path: None,
            subtitle_force_style: None,
            watermark: None,
            audio_polish: opts.audio_polish.clone(),
            ..opts.clone()
        };
        match self.try_graph_render(job_id, input, work_dir, output, &segments, &stripped_opts).await {
            Ok(command) => {
                notes.push("overlays and transitions dropped after full-graph render failure".to_string());
                return Ok(self.finish(output, notes, command).await);
            }
            Err(e) if e.is_cancellation() => return Err(e),
            Err(e) => notes.push(format!("stripped-overlay render failed: {e}")),
        }

        // 3. Segment-file fallback.
        match self
            .segment_file_fallback(job_id, input, work_dir, output, &segments, opts)
            .await
        {
            Ok(applied_post_process) => {
                notes.push("rendered via per-segment concat fallback".to_string());
                if !applied_post_process {
                    notes.push("post-process (subtitles/audio polish) skipped on concat fallback".to_string());
                }
                return Ok(self.finish(output, notes, "segment-file fallback".to_string()).await);
            }
            Err(e) if e.is_cancellation() => return Err(e),
            Err(e) => notes.push(format!("segment-file fallback failed: {e}")),
        }

        // 4. Emergency render: all effects zeroed, cut boundaries only.
        let emergency_segments: Vec<Segment> = segments
            .iter()
            .map(|s| {
                let mut e = Segment::new(s.start, s.end);
                e.transition_style = vclip_models::TransitionStyle::Jump;
                e
            })
            .collect();
        let emergency_opts = RenderGraphOptions {
            target_width: opts.target_width,
            target_height: opts.target_height,
            fit_mode: opts.fit_mode,
            transitions_enabled: false,
            subtitle_path: None,
            subtitle_force_style: None,
            watermark: None,
            audio_polish: None,
        };
        match self
            .try_graph_render(job_id, input, work_dir, output, &emergency_segments, &emergency_opts)
            .await
        {
            Ok(command) => {
                notes.push("emergency render: all effects zeroed, cut boundaries only".to_string());
                Ok(self.finish(output, notes, command).await?)
            }
            Err(e) if e.is_cancellation() => Err(e),
            Err(e) => {
                notes.push(format!("emergency render failed: {e}"));
                Err(WorkerError::RenderFailed)
            }
        }
    }

    async fn finish(&self, output: &Path, notes: Vec<String>, command: String) -> RenderOutcome {
        RenderOutcome {
            output_path: output.to_path_buf(),
            optimization_notes: notes,
            command,
        }
    }

    fn check_output(&self, output: &Path) -> WorkerResult<()> {
        let meta = std::fs::metadata(output).map_err(|_| WorkerError::OutputFileMissingAfterRender)?;
        if !meta.is_file() {
            return Err(WorkerError::OutputFileMissingAfterRender);
        }
        if meta.len() == 0 {
            return Err(WorkerError::OutputFileEmptyAfterRender);
        }
        Ok(())
    }

    /// Build a `RenderGraph`, spawn `ffmpeg` against it, and verify the
    /// output file. Returns the formatted command on success.
    async fn try_graph_render(
        &self,
        job_id: &JobId,
        input: &Path,
        work_dir: &Path,
        output: &Path,
        segments: &[Segment],
        opts: &RenderGraphOptions,
    ) -> WorkerResult<String> {
        let graph = RenderGraph::build(segments, opts)?;
        let graph_args = graph.to_ffmpeg_args(work_dir).await?;

        let mut args = vec![
            "-y".to_string(),
            "-v".to_string(),
            "error".to_string(),
            "-progress".to_string(),
            "pipe:2".to_string(),
            "-i".to_string(),
            input.to_string_lossy().into_owned(),
        ];
        args.extend(graph_args);
        args.extend(self.encoder_args());
        args.push(output.to_string_lossy().into_owned());

        let command = format!("ffmpeg {}", args.join(" "));
        self.spawn_and_wait(job_id, &args, "render").await?;
        self.check_output(output)?;
        Ok(command)
    }

    fn encoder_args(&self) -> Vec<String> {
        vec![
            "-c:v".to_string(),
            "libx264".to_string(),
            "-crf".to_string(),
            self.encoder.crf.to_string(),
            "-preset".to_string(),
            self.encoder.preset.clone(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            self.encoder.audio_bitrate.clone(),
            "-ar".to_string(),
            self.encoder.audio_sample_rate.to_string(),
            "-threads".to_string(),
            self.encoder.filter_threads.to_string(),
        ]
    }

    /// Step 3 of the ladder: render each segment to its own file, concat
    /// (stream-copy first, then transcode on failure), then optionally
    /// re-run the post-process stage over the concat output.
    async fn segment_file_fallback(
        &self,
        job_id: &JobId,
        input: &Path,
        work_dir: &Path,
        output: &Path,
        segments: &[Segment],
        opts: &RenderGraphOptions,
    ) -> WorkerResult<bool> {
        tokio::fs::create_dir_all(work_dir).await.ok();
        let mut segment_files = Vec::with_capacity(segments.len());

        for (i, seg) in segments.iter().enumerate() {
            let seg_path = work_dir.join(format!("seg-{i:03}.mp4"));
            let per_segment_opts = RenderGraphOptions {
                transitions_enabled: false,
                subtitle_path: None,
                subtitle_force_style: None,
                watermark: None,
                audio_polish: None,
                ..opts.clone()
            };
            self.try_graph_render(job_id, input, work_dir, &seg_path, std::slice::from_ref(seg), &per_segment_opts)
                .await?;
            segment_files.push(seg_path);
        }

        let concat_list_path = work_dir.join("concat.txt");
        let concat_list = segment_files
            .iter()
            .map(|p| format!("file '{}'", p.to_string_lossy()))
            .collect::<Vec<_>>()
            .join("\n");
        tokio::fs::write(&concat_list_path, concat_list)
            .await
            .map_err(WorkerError::from)?;

        let stream_copy_args = vec![
            "-y".to_string(),
            "-v".to_string(),
            "error".to_string(),
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-i".to_string(),
            concat_list_path.to_string_lossy().into_owned(),
            "-c".to_string(),
            "copy".to_string(),
            output.to_string_lossy().into_owned(),
        ];

        let stream_copy_ok = self.spawn_and_wait(job_id, &stream_copy_args, "concat-stream-copy").await.is_ok()
            && self.check_output(output).is_ok();

        if !stream_copy_ok {
            let mut transcode_args = vec![
                "-y".to_string(),
                "-v".to_string(),
                "error".to_string(),
                "-f".to_string(),
                "concat".to_string(),
                "-safe".to_string(),
                "0".to_string(),
                "-i".to_string(),
                concat_list_path.to_string_lossy().into_owned(),
            ];
            transcode_args.extend(self.encoder_args());
            transcode_args.push(output.to_string_lossy().into_owned());
            self.spawn_and_wait(job_id, &transcode_args, "concat-transcode").await?;
            self.check_output(output)?;
        }

        let expects_post_process = opts.subtitle_path.is_some() || opts.audio_polish.is_some();
        if !expects_post_process {
            return Ok(true);
        }

        // Second pass: apply subtitles/audio-polish over the concat output.
        let polished_path = work_dir.join("polished.mp4");
        let second_pass_opts = RenderGraphOptions {
            transitions_enabled: false,
            target_width: opts.target_width,
            target_height: opts.target_height,
            fit_mode: opts.fit_mode,
            subtitle_path: opts.subtitle_path.clone(),
            subtitle_force_style: opts.subtitle_force_style.clone(),
            watermark: None,
            audio_polish: opts.audio_polish.clone(),
        };
        let whole_span = vec![Segment::new(0.0, probe_concat_duration(output).await.unwrap_or(f64::MAX))];
        match self
            .try_graph_render(job_id, output, work_dir, &polished_path, &whole_span, &second_pass_opts)
            .await
        {
            Ok(_) => {
                tokio::fs::rename(&polished_path, output).await.map_err(WorkerError::from)?;
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    /// Spawn `ffmpeg` with `args`, register the child with the Scheduler,
    /// and race its exit against the Scheduler's cancellation flag so a
    /// `Cancel` mid-render is detected promptly rather than only after
    /// `wait()` resolves on its own.
    async fn spawn_and_wait(&self, job_id: &JobId, args: &[String], description: &str) -> WorkerResult<()> {
        if self.scheduler.is_cancelled(job_id).await {
            return Err(WorkerError::QueueCanceledByUser);
        }
        which::which("ffmpeg").map_err(|_| WorkerError::FfmpegMissing)?;

        let mut child = Command::new("ffmpeg")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(WorkerError::from)?;

        if let Some(pid) = child.id() {
            self.scheduler.register_child(job_id, pid, description).await;
        }

        let mut stderr_pipe = child.stderr.take();
        let mut stdout_pipe = child.stdout.take();
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(pipe) = stderr_pipe.as_mut() {
                let _ = pipe.take(STDERR_CAPTURE_MAX_BYTES as u64).read_to_end(&mut buf).await;
            }
            buf
        });
        let stdout_task = tokio::spawn(async move {
            if let Some(pipe) = stdout_pipe.as_mut() {
                let mut sink = Vec::new();
                let _ = pipe.read_to_end(&mut sink).await;
            }
        });

        let outcome = loop {
            tokio::select! {
                status = child.wait() => {
                    break status.map_err(WorkerError::from);
                }
                _ = tokio::time::sleep(CANCEL_POLL_INTERVAL) => {
                    if self.scheduler.is_cancelled(job_id).await {
                        let _ = child.kill().await;
                        break Err(WorkerError::QueueCanceledByUser);
                    }
                }
            }
        };

        let stderr_bytes = stderr_task.await.unwrap_or_default();
        let _ = stdout_task.await;
        self.scheduler.clear_children(job_id).await;

        let status = outcome?;
        if status.success() {
            Ok(())
        } else {
            let stderr_text = String::from_utf8_lossy(&stderr_bytes);
            let tail: String = stderr_text.chars().rev().take(STDERR_TAIL_MAX_CHARS).collect::<Vec<_>>().into_iter().rev().collect();
            Err(WorkerError::from(MediaError::ffmpeg_failed(
                format!("ffmpeg {description} exited with status {:?}", status.code()),
                Some(tail),
                status.code(),
            )))
        }
    }
}

async fn probe_concat_duration(path: &Path) -> Option<f64> {
    vclip_media::probe_video(path).await.ok().map(|info| info.duration)
}

/// Vertical-mode sub-clip selection: up to `MAX_VERTICAL_CLIPS` peaks of
/// engagement spaced at least `min_spacing_secs` apart (spec.md §4.9).
pub fn select_vertical_windows(
    windows: &[vclip_models::EngagementWindow],
    clip_count: usize,
    clip_duration_secs: f64,
    min_spacing_secs: f64,
) -> Vec<(f64, f64)> {
    let mut candidates: Vec<(usize, f64)> = windows.iter().map(|w| (w.time as usize, w.hook_score)).collect();
    candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

    let mut chosen: Vec<f64> = Vec::new();
    for (time, _) in candidates {
        let start = time as f64;
        if chosen.iter().any(|c: &f64| (c - start).abs() < min_spacing_secs) {
            continue;
        }
        chosen.push(start);
        if chosen.len() >= clip_count.max(1) {
            break;
        }
    }
    chosen.sort_by(|a, b| a.partial_cmp(b).unwrap());
    chosen
        .into_iter()
        .map(|start| {
            let end = (start + clip_duration_secs).min(windows.len() as f64);
            (start, end)
        })
        .collect()
}

/// Apply the watermark config's staged overlay build, falling back to the
/// drawtext fallback when the configured asset is unavailable. Thin wrapper
/// kept here (rather than in `RenderGraphOptions`) since it also needs
/// `WorkerConfig::watermark_image_path` resolution at the pipeline layer.
pub async fn watermark_preview(path: &Path, config: &vclip_media::WatermarkConfig) -> WorkerResult<()> {
    apply_watermark_if_available(path, config).await.map_err(WorkerError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vclip_models::EngagementWindow;

    #[test]
    fn select_vertical_windows_respects_min_spacing() {
        let windows: Vec<EngagementWindow> = (0..60)
            .map(|i| {
                let mut w = EngagementWindow::empty(i as u32);
                w.hook_score = if i % 10 == 0 { 0.9 } else { 0.1 };
                w
            })
            .collect();
        let picks = select_vertical_windows(&windows, 3, 12.0, 8.0);
        assert!(picks.len() <= 3);
        for pair in picks.windows(2) {
            assert!(pair[1].0 - pair[0].0 >= 8.0 - 1e-9);
        }
    }
}
