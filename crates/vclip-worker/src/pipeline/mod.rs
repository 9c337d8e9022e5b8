//! Pipeline orchestrator: runs a job through `StepName::ORDER`'s nine steps
//! (spec.md §2 control flow), persisting `PipelineStepState` per step and
//! publishing `ProgressEvent`s as status changes.
//!
//! Grounded on `vclip-worker/src/processor.rs`'s stage-by-stage shape (each
//! stage owns its own timing/error handling, the top-level function just
//! sequences them) generalized to the new step/state-store primitives.

pub mod calibration;
pub mod edit_plan;
pub mod engagement;
pub mod hook_selection;
pub mod feedback;
pub mod judge;
pub mod render;
pub mod retry_orchestrator;
pub mod style;
pub mod transcript_reader;

pub use calibration::CalibrationStore;
pub use feedback::{FeedbackIngestor, FeedbackPayload};
pub use render::{RenderExecutor, RenderOutcome};

use std::path::PathBuf;

use serde_json::json;

use vclip_firestore::JobStore;
use vclip_media::silence_removal::{analyze_audio_segments, default_config as default_silence_config};
use vclip_media::{extract_audio_rms, extract_face_presence, extract_frames, extract_scene_changes, probe_video};
use vclip_media::render_graph::RenderGraphOptions;
use vclip_ml_client::{EmotionClient, TextDensityClient, TranscriptionClient};
use vclip_models::constants::{ANALYSIS_FRAME_FPS_DEFAULT, MAX_VERTICAL_CLIPS};
use vclip_models::{CalibrationProfile, EditPlan, Job, JobId, JobStatus, RenderMode};
use vclip_queue::{ProgressChannel, ProgressEvent, Scheduler};
use vclip_storage::StorageGateway;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};

use self::edit_plan::{build_edit_plan, EditPlanInput};
use self::engagement::{build_engagement_windows, RawSignals};
use self::hook_selection::{selection_threshold, top_candidates, wait_for_user_hook_pick, HookSelectionOutcome};
use self::judge::SignalStrength;
use self::retry_orchestrator::{run_retry_orchestrator, RetryContext, Strategy};
use self::style::{derive_pacing_profile, infer_content_style, infer_video_niche, resolve_runtime_style};

/// Shared handles the orchestrator threads through every step. Built once
/// per worker process and reused across jobs.
pub struct PipelineContext<'a> {
    pub job_store: &'a JobStore,
    pub storage: &'a StorageGateway,
    pub progress: &'a ProgressChannel,
    pub scheduler: &'a Scheduler,
    pub config: &'a WorkerConfig,
}

/// Run the full nine-step pipeline for `job_id`. Downloads the source,
/// fuses signals, builds and judges an edit plan (retrying strategies on
/// gate failure), renders, scores retention, and uploads the result.
pub async fn run_pipeline(ctx: &PipelineContext<'_>, job_id: &JobId) -> WorkerResult<()> {
    let job = ctx
        .job_store
        .get(job_id)
        .await?
        .ok_or_else(|| WorkerError::Firestore(vclip_firestore::FirestoreError::not_found(job_id.as_str())))?;

    if ctx.scheduler.is_cancelled(job_id).await {
        return Err(WorkerError::QueueCanceledByUser);
    }

    let work_dir = ctx.config.scratch_dir(job_id.as_str());
    tokio::fs::remove_dir_all(&work_dir).await.ok();
    tokio::fs::create_dir_all(&work_dir).await.map_err(WorkerError::from)?;
    let input_path = work_dir.join("input.mp4");

    ctx.job_store.update_status(job_id, JobStatus::Uploading).await.ok();
    ctx.storage.download_object_to_file(&job.input_object_key, &input_path).await?;

    let info = probe_video(&input_path).await?;
    ctx.job_store
        .update(job_id, None, |j| j.input_duration_seconds = Some(info.duration))
        .await?;

    ctx.job_store.update_status(job_id, JobStatus::Analyzing).await.ok();

    // TRANSCRIBE
    let cues = run_step(ctx, job_id, StepKind::Transcribe, || async {
        let client = TranscriptionClient::from_env();
        let raw = if client.is_configured() {
            client.transcribe(&input_path).await.unwrap_or_default()
        } else {
            Vec::new()
        };
        Ok(self::transcript_reader::score_cues(raw))
    })
    .await?;
    let has_transcript = !cues.is_empty();

    // FRAME_ANALYSIS (also fuses the EngagementModel signal fusion)
    let windows = run_step(ctx, job_id, StepKind::FrameAnalysis, || async {
        let frame_dir = work_dir.join("frames");
        tokio::fs::create_dir_all(&frame_dir).await.ok();

        let audio_rms = extract_audio_rms(&input_path, info.duration).await;
        let scene_changes = extract_scene_changes(&input_path, info.duration).await;
        let face_presence = if ctx.config.analysis.disable_face_detection {
            Vec::new()
        } else {
            extract_face_presence(&input_path, info.duration).await
        };

        let text_density = if ctx.config.analysis.disable_text_density {
            Vec::new()
        } else {
            let text_client = TextDensityClient::from_env();
            if text_client.is_configured() {
                let frames = extract_frames(&input_path, info.duration, &frame_dir).await;
                text_client
                    .analyze_frames(&frames, ctx.config.analysis.frame_fps.max(ANALYSIS_FRAME_FPS_DEFAULT))
                    .await
                    .unwrap_or_default()
            } else {
                Vec::new()
            }
        };

        let emotion = if ctx.config.analysis.disable_emotion_model {
            Vec::new()
        } else {
            let emotion_client = EmotionClient::from_env();
            if emotion_client.is_configured() {
                emotion_client.classify(&input_path).await.unwrap_or_default()
            } else {
                Vec::new()
            }
        };

        let signals = RawSignals {
            audio_rms,
            scene_changes,
            face_presence,
            text_density,
            emotion,
            transcript: cues.clone(),
        };
        Ok(build_engagement_windows(info.duration, &signals))
    })
    .await?;

    let style_profile = infer_content_style(&windows, &cues);
    let niche_profile = infer_video_niche(&windows);
    let base_pacing = derive_pacing_profile(&niche_profile, &style_profile);

    let silence_segments = analyze_audio_segments(&input_path, default_silence_config())
        .await
        .unwrap_or_default();

    let calibration = CalibrationStore::new(ctx.job_store, ctx.config.hook_calibration_lookback_jobs)
        .compute(&job.owner_user_id)
        .await
        .unwrap_or_else(|_| CalibrationProfile::default_profile());

    let content_format = job
        .render_settings
        .target_platform
        .clone()
        .unwrap_or_else(|| "default".to_string());
    let target_platform = content_format.clone();
    let aggression = job.render_settings.aggression;
    let signal_strength = classify_signal_strength(&windows);

    // BEST_MOMENT_SCORING: build the baseline edit plan (hook search +
    // reorder + pacing all happen inside `build_edit_plan`).
    let runtime_style = resolve_runtime_style(Strategy::Baseline.as_str(), &niche_profile);
    let baseline_plan = run_step(ctx, job_id, StepKind::BestMomentScoring, || async {
        Ok(build_edit_plan(EditPlanInput {
            duration_secs: info.duration,
            windows: &windows,
            cues: &cues,
            silence_segments: &silence_segments,
            calibration: &calibration,
            pacing_profile: &base_pacing,
            runtime_style: &runtime_style,
            aggression,
            content_format: &content_format,
        }))
    })
    .await?;

    // HOOK_SELECT_AND_AUDIT
    let chosen_hook = run_step(ctx, job_id, StepKind::HookSelectAndAudit, || async {
        let threshold = selection_threshold(aggression, has_transcript, signal_strength);
        let confident = self::hook_selection::hook_confidence(&baseline_plan.hook) >= threshold;

        let hook = if confident {
            baseline_plan.hook.clone()
        } else {
            let ranked = top_candidates(&baseline_plan.candidates);
            match wait_for_user_hook_pick(ctx.job_store, job_id, &ranked.into_iter().cloned().collect::<Vec<_>>()).await? {
                HookSelectionOutcome::UserOverride(candidate) => candidate,
                HookSelectionOutcome::EngineChoice => baseline_plan.hook.clone(),
            }
        };
        self::hook_selection::lock_hook_stage(ctx.job_store, job_id).await?;
        Ok(hook)
    })
    .await?;

    // TIMELINE_REORDER / PACING_AND_INTERRUPTS are already folded into
    // `build_edit_plan`'s internal reorder/pacing/rhythm stages; record them
    // as completed once the plan carrying the chosen hook is in hand.
    run_step(ctx, job_id, StepKind::TimelineReorder, || async { Ok(()) }).await?;
    run_step(ctx, job_id, StepKind::PacingAndInterrupts, || async { Ok(()) }).await?;

    // STORY_QUALITY_GATE: retry orchestrator across strategies.
    let retry_ctx_builder = |cues: &[vclip_models::TranscriptCue]| RetryContext {
        duration_secs: info.duration,
        windows: &windows,
        cues,
        silence_segments: &silence_segments,
        calibration: &calibration,
        base_pacing_profile: &base_pacing,
        runtime_style: &runtime_style,
        base_aggression: aggression,
        content_format: &content_format,
        target_platform: &target_platform,
        captions_enabled: job.render_settings.auto_captions,
        target_interrupt_count: estimate_target_interrupts(info.duration),
        has_transcript,
        signal_strength,
        feedback_offset: 0.0,
    };
    let outcome = run_step(ctx, job_id, StepKind::StoryQualityGate, || async {
        run_retry_orchestrator(retry_ctx_builder(&cues))
    })
    .await?;

    let mut final_plan = outcome.plan;
    final_plan.hook = chosen_hook;

    persist_analysis_snapshot(ctx.job_store, job_id, &final_plan, &outcome.attempts, &style_profile).await.ok();

    // Subtitling/audio-polish/pre-render-retention are status waypoints only
    // (no dedicated pipeline step owns them): `JobStatus::can_transition_to`
    // requires passing through them on the way from `Story` to `Rendering`.
    ctx.job_store.update_status(job_id, JobStatus::Subtitling).await.ok();
    ctx.job_store.update_status(job_id, JobStatus::Audio).await.ok();
    ctx.job_store.update_status(job_id, JobStatus::Retention).await.ok();

    // RENDER_FINAL
    let output_path = work_dir.join("output.mp4");
    let render_outcome = run_step(ctx, job_id, StepKind::RenderFinal, || async {
        ctx.job_store.update_status(job_id, JobStatus::Rendering).await.ok();
        let executor = RenderExecutor::new(ctx.scheduler, &ctx.config.encoder);
        let opts = render_options_for(&job, ctx.config.watermark_image_path.as_deref());
        executor
            .render(job_id, &input_path, &work_dir, &output_path, &final_plan.segments, info.duration, &opts)
            .await
    })
    .await?;

    let output_key = format!("outputs/{}.mp4", job_id.as_str());
    ctx.storage.upload_file(&render_outcome.output_path, &output_key, "video/mp4").await?;

    // RETENTION_SCORE
    let retention_score = run_step(ctx, job_id, StepKind::RetentionScore, || async { Ok(outcome.report.retention_score) }).await?;

    ctx.job_store
        .update(job_id, None, |j| {
            j.status = JobStatus::Completed;
            j.progress = 100;
            j.output_object_key = Some(output_key.clone());
            j.retention_score = Some(retention_score);
            j.optimization_notes.extend(render_outcome.optimization_notes.clone());
        })
        .await?;

    ctx.progress
        .publish_with_history(&ProgressEvent::new(job_id.clone(), JobStatus::Completed, 100))
        .await
        .ok();
    ctx.progress.remove_active(job_id).await.ok();

    Ok(())
}

fn classify_signal_strength(windows: &[vclip_models::EngagementWindow]) -> SignalStrength {
    if windows.is_empty() {
        return SignalStrength::Weak;
    }
    let mean_score = windows.iter().map(|w| w.score).sum::<f64>() / windows.len() as f64;
    if mean_score >= 0.55 {
        SignalStrength::Strong
    } else if mean_score >= 0.3 {
        SignalStrength::Medium
    } else {
        SignalStrength::Weak
    }
}

fn estimate_target_interrupts(duration_secs: f64) -> usize {
    ((duration_secs / 25.0).round() as usize).max(1)
}

fn render_options_for(job: &Job, watermark_image_path: Option<&str>) -> RenderGraphOptions {
    let (target_width, target_height) = match job.render_settings.mode {
        RenderMode::Horizontal => (1920, 1080),
        RenderMode::Vertical => (1080, 1920),
    };
    let watermark = if job.render_settings.watermark_enabled {
        watermark_image_path.map(|path| vclip_media::WatermarkConfig {
            image_path: path.to_string(),
            ..Default::default()
        })
    } else {
        None
    };
    RenderGraphOptions {
        target_width,
        target_height,
        fit_mode: job.render_settings.fit_mode,
        transitions_enabled: true,
        subtitle_path: None,
        subtitle_force_style: None,
        watermark,
        audio_polish: None,
    }
}

async fn persist_analysis_snapshot(
    job_store: &JobStore,
    job_id: &JobId,
    plan: &EditPlan,
    attempts: &[self::retry_orchestrator::AttemptRecord],
    style_profile: &vclip_models::ContentStyleProfile,
) -> WorkerResult<()> {
    job_store
        .update(job_id, None, |job| {
            job.analysis.insert(
                "chosen_strategy".to_string(),
                json!(attempts.last().map(|a| a.strategy.clone()).unwrap_or_default()),
            );
            job.analysis.insert(
                "dominant_content_style".to_string(),
                json!(self::calibration::content_style_tag(style_profile.style)),
            );
            job.analysis
                .insert("hook_candidates".to_string(), json!(plan.candidates));
        })
        .await?;
    Ok(())
}

/// Ordered step kinds matching `StepName::ORDER`, local to this module so
/// `run_step` can be generic over a thunk without importing `StepName` at
/// every call site.
#[derive(Debug, Clone, Copy)]
enum StepKind {
    Transcribe,
    FrameAnalysis,
    BestMomentScoring,
    HookSelectAndAudit,
    TimelineReorder,
    PacingAndInterrupts,
    StoryQualityGate,
    RenderFinal,
    RetentionScore,
}

impl StepKind {
    fn step_name(self) -> vclip_models::StepName {
        use vclip_models::StepName::*;
        match self {
            StepKind::Transcribe => Transcribe,
            StepKind::FrameAnalysis => FrameAnalysis,
            StepKind::BestMomentScoring => BestMomentScoring,
            StepKind::HookSelectAndAudit => HookSelectAndAudit,
            StepKind::TimelineReorder => TimelineReorder,
            StepKind::PacingAndInterrupts => PacingAndInterrupts,
            StepKind::StoryQualityGate => StoryQualityGate,
            StepKind::RenderFinal => RenderFinal,
            StepKind::RetentionScore => RetentionScore,
        }
    }

    fn job_status(self) -> Option<JobStatus> {
        match self {
            StepKind::HookSelectAndAudit => Some(JobStatus::Hooking),
            StepKind::TimelineReorder => Some(JobStatus::Cutting),
            StepKind::PacingAndInterrupts => Some(JobStatus::Pacing),
            StepKind::StoryQualityGate => Some(JobStatus::Story),
            StepKind::RenderFinal => Some(JobStatus::Rendering),
            StepKind::RetentionScore => Some(JobStatus::Retention),
            _ => None,
        }
    }
}

/// Run one pipeline step: checks cancellation, records `PipelineStepState`
/// start/complete/fail, publishes a progress event, and returns the
/// thunk's output (spec.md §4.1 step lifecycle).
async fn run_step<T, F, Fut>(ctx: &PipelineContext<'_>, job_id: &JobId, kind: StepKind, thunk: F) -> WorkerResult<T>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = WorkerResult<T>>,
{
    if ctx.scheduler.is_cancelled(job_id).await {
        return Err(WorkerError::QueueCanceledByUser);
    }

    let step = kind.step_name();
    let mut state = ctx
        .job_store
        .get_step_state(job_id, step)
        .await?
        .unwrap_or_else(|| vclip_models::PipelineStepState::pending(step));
    state.start();
    ctx.job_store.update_step_state(job_id, &state).await?;

    if let Some(status) = kind.job_status() {
        ctx.job_store.update_status(job_id, status).await.ok();
        let progress = step_progress_percent(step);
        ctx.progress
            .publish_with_history(&ProgressEvent::new(job_id.clone(), status, progress).with_step(step))
            .await
            .ok();
    }
    ctx.progress.heartbeat(job_id).await.ok();

    match thunk().await {
        Ok(value) => {
            state.complete();
            ctx.job_store.update_step_state(job_id, &state).await.ok();
            Ok(value)
        }
        Err(e) => {
            state.fail(e.to_string());
            ctx.job_store.update_step_state(job_id, &state).await.ok();
            if !e.is_cancellation() {
                ctx.job_store.update(job_id, None, |j| j.error = Some(e.to_string())).await.ok();
            }
            Err(e)
        }
    }
}

fn step_progress_percent(step: vclip_models::StepName) -> u8 {
    use vclip_models::StepName::*;
    match step {
        Transcribe => 10,
        FrameAnalysis => 25,
        BestMomentScoring => 40,
        HookSelectAndAudit => 50,
        TimelineReorder => 60,
        PacingAndInterrupts => 68,
        StoryQualityGate => 78,
        RenderFinal => 90,
        RetentionScore => 98,
    }
}

/// Up to `MAX_VERTICAL_CLIPS` vertical sub-clips for a completed horizontal
/// plan, used by the API layer when `RenderMode::Vertical` is requested
/// (spec.md §4.9 "Vertical mode").
pub fn vertical_sub_ranges(windows: &[vclip_models::EngagementWindow], clip_count: u32, clip_duration_secs: f64) -> Vec<(f64, f64)> {
    self::render::select_vertical_windows(windows, (clip_count as usize).min(MAX_VERTICAL_CLIPS), clip_duration_secs, clip_duration_secs * 1.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_progress_is_non_decreasing_along_order() {
        let mut last = 0;
        for step in vclip_models::StepName::ORDER {
            let p = step_progress_percent(step);
            assert!(p >= last);
            last = p;
        }
    }

    #[test]
    fn signal_strength_classifies_empty_windows_as_weak() {
        assert!(matches!(classify_signal_strength(&[]), SignalStrength::Weak));
    }
}
