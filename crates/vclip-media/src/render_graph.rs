//! Filter description synthesis for the final render.
//!
//! Builds a single `-filter_complex` string (or, past
//! `FILTER_COMPLEX_SCRIPT_THRESHOLD` characters, a filter-script file) out of
//! final segments, transition style, subtitle burn-in, watermark, and
//! optional audio polish. Execution (spawning ffmpeg, the fallback ladder,
//! vertical-mode sub-clip rendering) lives with the caller, which needs
//! Scheduler/cancellation access this crate doesn't have.

use std::path::{Path, PathBuf};

use vclip_models::constants::{
    ATEMPO_STAGE_MAX, ATEMPO_STAGE_MIN, FILTER_COMPLEX_SCRIPT_THRESHOLD, JUMP_CUT_FADE_SECONDS,
    LOUDNESS_TARGET_LUFS_MAX, LOUDNESS_TARGET_LUFS_MIN, SEGMENT_AUDIO_FADE_SECONDS,
    SOUND_FX_LEVEL_THRESHOLD, XFADE_DURATION_SECONDS,
};
use vclip_models::{FitMode, Segment, TransitionStyle};

use crate::error::{MediaError, MediaResult};
use crate::filters::{filter_face_centered_crop, filter_fit, filter_speed};
use crate::watermark::{build_drawtext_fallback, build_movie_overlay_filter, escape_filter_path, WatermarkConfig};

/// Optional audio mastering stage, applied once to the concatenated track.
#[derive(Debug, Clone)]
pub struct AudioPolishConfig {
    pub highpass_hz: Option<u32>,
    pub lowpass_hz: Option<u32>,
    pub denoise: bool,
    pub de_ess: bool,
    pub mono: bool,
    pub dynamic_normalize: bool,
    pub compress: bool,
    /// Target integrated loudness in LUFS; clamped into the platform band.
    pub loudness_target_lufs: f64,
    pub limiter: bool,
}

impl Default for AudioPolishConfig {
    fn default() -> Self {
        Self {
            highpass_hz: Some(80),
            lowpass_hz: None,
            denoise: false,
            de_ess: false,
            mono: false,
            dynamic_normalize: true,
            compress: true,
            loudness_target_lufs: LOUDNESS_TARGET_LUFS_MIN,
            limiter: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenderGraphOptions {
    pub target_width: u32,
    pub target_height: u32,
    pub fit_mode: FitMode,
    pub transitions_enabled: bool,
    pub subtitle_path: Option<PathBuf>,
    pub subtitle_force_style: Option<String>,
    pub watermark: Option<WatermarkConfig>,
    pub audio_polish: Option<AudioPolishConfig>,
}

/// A synthesized filter description, ready to hand to `ffmpeg -filter_complex`
/// (or `-filter_complex_script` once it grows past the inline threshold).
pub struct RenderGraph {
    pub filter_complex: String,
    pub video_label: String,
    pub audio_label: String,
}

impl RenderGraph {
    /// Build the filter description for `segments` against `input` (input
    /// index `0`). `segments` must already be non-empty and prepared via
    /// `prepare_segments_for_render`.
    pub fn build(segments: &[Segment], opts: &RenderGraphOptions) -> MediaResult<Self> {
        if segments.is_empty() {
            return Err(MediaError::internal("render graph requires at least one segment"));
        }

        let mut chains: Vec<String> = Vec::new();
        let base_fit = format!(
            "{},format=yuv420p",
            filter_fit(opts.target_width, opts.target_height, opts.fit_mode)
        );
        chains.push(format!("[0:v]{base_fit}[vbase]"));

        let mut video_labels = Vec::with_capacity(segments.len());
        let mut audio_labels = Vec::with_capacity(segments.len());

        for (i, seg) in segments.iter().enumerate() {
            let vlabel = format!("v{i}");
            let alabel = format!("a{i}");

            if seg.zoom > 0.0 || seg.face_focus_x.is_some() {
                let crop = filter_face_centered_crop(
                    opts.target_width,
                    opts.target_height,
                    seg.face_focus_x,
                    seg.face_focus_y,
                );
                chains.push(format!(
                    "[0:v]trim=start={:.3}:end={:.3},setpts=(PTS-STARTPTS)/{:.4},{crop},format=yuv420p{}[{vlabel}]",
                    seg.start,
                    seg.end,
                    seg.speed,
                    brightness_suffix(seg.brightness),
                ));
            } else {
                chains.push(format!(
                    "[vbase]trim=start={:.3}:end={:.3},{}{}[{vlabel}]",
                    seg.start,
                    seg.end,
                    filter_speed(seg.speed),
                    brightness_suffix(seg.brightness),
                ));
            }

            chains.push(audio_chain(i, seg, &alabel));

            video_labels.push(vlabel);
            audio_labels.push(alabel);
        }

        let (concat_video, concat_audio) = if opts.transitions_enabled && segments.len() > 1 {
            build_xfade_chain(segments, &video_labels, &audio_labels, &mut chains)
        } else {
            chains.push(concat_filter(&video_labels, &audio_labels));
            ("vconcat".to_string(), "aconcat".to_string())
        };

        let mut video_label = concat_video;
        let mut audio_label = concat_audio;

        if let Some(path) = &opts.subtitle_path {
            let escaped = escape_filter_path(&path.to_string_lossy());
            let style_suffix = opts
                .subtitle_force_style
                .as_ref()
                .map(|s| format!(":force_style='{s}'"))
                .unwrap_or_default();
            chains.push(format!(
                "[{video_label}]subtitles='{escaped}'{style_suffix}[vsub]"
            ));
            video_label = "vsub".to_string();
        }

        if let Some(watermark) = &opts.watermark {
            if watermark.is_available() {
                chains.push(build_movie_overlay_filter(watermark, &video_label, "vwm"));
                video_label = "vwm".to_string();
            } else {
                let fallback = build_drawtext_fallback("vclip.ai", watermark.offset_x, watermark.offset_y);
                chains.push(format!("[{video_label}]{fallback}[vwm]"));
                video_label = "vwm".to_string();
            }
        }

        if let Some(polish) = &opts.audio_polish {
            chains.push(audio_polish_chain(polish, &audio_label, "apolish"));
            audio_label = "apolish".to_string();
        }

        Ok(RenderGraph {
            filter_complex: chains.join(";"),
            video_label,
            audio_label,
        })
    }

    /// Produce the `ffmpeg` arguments for this graph, spilling to a
    /// `-filter_complex_script` file when the description is too long to
    /// pass inline.
    pub async fn to_ffmpeg_args(&self, work_dir: &Path) -> MediaResult<Vec<String>> {
        let maps = vec![
            "-map".to_string(),
            format!("[{}]", self.video_label),
            "-map".to_string(),
            format!("[{}]", self.audio_label),
        ];

        if self.filter_complex.len() > FILTER_COMPLEX_SCRIPT_THRESHOLD {
            let script_path = work_dir.join("filter_complex.script");
            tokio::fs::write(&script_path, &self.filter_complex)
                .await
                .map_err(MediaError::from)?;
            let mut args = vec![
                "-filter_complex_script".to_string(),
                script_path.to_string_lossy().into_owned(),
            ];
            args.extend(maps);
            Ok(args)
        } else {
            let mut args = vec!["-filter_complex".to_string(), self.filter_complex.clone()];
            args.extend(maps);
            Ok(args)
        }
    }
}

fn brightness_suffix(brightness: f64) -> String {
    if brightness.abs() < 1e-6 {
        String::new()
    } else {
        format!(",eq=brightness={brightness:.4}")
    }
}

/// Chain `atempo` stages to realize an arbitrary speed while keeping every
/// stage within ffmpeg's supported `[0.5, 2.0]` range.
fn atempo_chain(speed: f64) -> String {
    let mut remaining = speed;
    let mut stages = Vec::new();
    while remaining > ATEMPO_STAGE_MAX + 1e-9 {
        stages.push(ATEMPO_STAGE_MAX);
        remaining /= ATEMPO_STAGE_MAX;
    }
    while remaining < ATEMPO_STAGE_MIN - 1e-9 {
        stages.push(ATEMPO_STAGE_MIN);
        remaining /= ATEMPO_STAGE_MIN;
    }
    stages.push(remaining);
    stages
        .into_iter()
        .map(|s| format!("atempo={s:.4}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn audio_chain(index: usize, seg: &Segment, label: &str) -> String {
    let duration = seg.duration() / seg.speed.max(1e-6);
    let fade_out_start = (duration - SEGMENT_AUDIO_FADE_SECONDS).max(0.0);
    let mut filter = format!(
        "[0:a]atrim=start={:.3}:end={:.3},asetpts=PTS-STARTPTS,{},volume={:.4},\
         afade=t=in:st=0:d={:.3},afade=t=out:st={:.3}:d={:.3},\
         aformat=sample_fmts=fltp:sample_rates=48000:channel_layouts=stereo",
        seg.start,
        seg.end,
        atempo_chain(seg.speed),
        seg.audio_gain,
        SEGMENT_AUDIO_FADE_SECONDS,
        fade_out_start,
        SEGMENT_AUDIO_FADE_SECONDS,
    );
    if seg.sound_fx_level >= SOUND_FX_LEVEL_THRESHOLD {
        filter = format!(
            "{filter}[a{index}dry];anoisesrc=color=pink:amplitude={:.3}:duration={duration:.3}[a{index}fx];\
             [a{index}dry][a{index}fx]amix=inputs=2:duration=first:dropout_transition=0",
            seg.sound_fx_level,
        );
    }
    format!("{filter}[{label}]")
}

fn concat_filter(video_labels: &[String], audio_labels: &[String]) -> String {
    let inputs: String = video_labels
        .iter()
        .zip(audio_labels)
        .map(|(v, a)| format!("[{v}][{a}]"))
        .collect();
    format!(
        "{inputs}concat=n={}:v=1:a=1[vconcat][aconcat]",
        video_labels.len()
    )
}

/// Pairwise `xfade`/`acrossfade` stitching instead of a plain concat. Jump-cut
/// boundaries get a short fade; smooth boundaries get the full crossfade.
fn build_xfade_chain(
    segments: &[Segment],
    video_labels: &[String],
    audio_labels: &[String],
    chains: &mut Vec<String>,
) -> (String, String) {
    let effective_durations: Vec<f64> = segments
        .iter()
        .map(|s| s.duration() / s.speed.max(1e-6))
        .collect();

    let mut video_acc = video_labels[0].clone();
    let mut audio_acc = audio_labels[0].clone();
    let mut offset = effective_durations[0];

    for i in 1..segments.len() {
        let fade = match segments[i].transition_style {
            TransitionStyle::Jump => JUMP_CUT_FADE_SECONDS,
            TransitionStyle::Smooth => XFADE_DURATION_SECONDS
                .min(effective_durations[i - 1] / 2.0)
                .min(effective_durations[i] / 2.0),
        };
        let xfade_offset = (offset - fade).max(0.0);

        let vout = format!("vxf{i}");
        chains.push(format!(
            "[{video_acc}][{}]xfade=transition=fade:duration={fade:.4}:offset={xfade_offset:.4}[{vout}]",
            video_labels[i]
        ));

        let aout = format!("axf{i}");
        chains.push(format!(
            "[{audio_acc}][{}]acrossfade=d={fade:.4}:curve1=tri:curve2=tri[{aout}]",
            audio_labels[i]
        ));

        video_acc = vout;
        audio_acc = aout;
        offset += effective_durations[i] - fade;
    }

    (video_acc, audio_acc)
}

fn audio_polish_chain(cfg: &AudioPolishConfig, input_label: &str, output_label: &str) -> String {
    let mut stages = Vec::new();
    if let Some(hz) = cfg.highpass_hz {
        stages.push(format!("highpass=f={hz}"));
    }
    if let Some(hz) = cfg.lowpass_hz {
        stages.push(format!("lowpass=f={hz}"));
    }
    if cfg.denoise {
        stages.push("afftdn=nf=-25".to_string());
    }
    if cfg.de_ess {
        stages.push("deesser".to_string());
    }
    if cfg.mono {
        stages.push("pan=mono|c0=0.5*c0+0.5*c1".to_string());
    }
    if cfg.dynamic_normalize {
        stages.push("dynaudnorm=f=150:g=15".to_string());
    }
    if cfg.compress {
        stages.push("acompressor=threshold=-18dB:ratio=3:attack=5:release=80".to_string());
    }
    let target = cfg
        .loudness_target_lufs
        .clamp(LOUDNESS_TARGET_LUFS_MIN, LOUDNESS_TARGET_LUFS_MAX);
    stages.push(format!("loudnorm=I={target:.1}:TP=-1.5:LRA=11"));
    if cfg.limiter {
        stages.push("alimiter=limit=0.98".to_string());
    }
    format!("[{input_label}]{}[{output_label}]", stages.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: f64, end: f64) -> Segment {
        Segment::new(start, end)
    }

    #[test]
    fn build_produces_mapped_labels() {
        let segments = vec![seg(0.0, 2.0), seg(3.0, 5.0)];
        let opts = RenderGraphOptions {
            target_width: 1080,
            target_height: 1920,
            fit_mode: FitMode::Cover,
            ..Default::default()
        };
        let graph = RenderGraph::build(&segments, &opts).unwrap();
        assert!(graph.filter_complex.contains("concat=n=2"));
        assert_eq!(graph.video_label, "vconcat");
        assert_eq!(graph.audio_label, "aconcat");
    }

    #[test]
    fn empty_segments_is_rejected() {
        let opts = RenderGraphOptions::default();
        assert!(RenderGraph::build(&[], &opts).is_err());
    }

    #[test]
    fn atempo_chain_splits_extreme_speeds() {
        let chain = atempo_chain(3.6);
        assert_eq!(chain.matches("atempo=").count(), 2);
    }

    #[test]
    fn atempo_chain_single_stage_within_range() {
        let chain = atempo_chain(1.5);
        assert_eq!(chain.matches("atempo=").count(), 1);
    }

    #[test]
    fn transitions_enabled_uses_xfade_not_concat() {
        let mut segments = vec![seg(0.0, 2.0), seg(3.0, 5.0)];
        segments[1].transition_style = TransitionStyle::Smooth;
        let opts = RenderGraphOptions {
            target_width: 1080,
            target_height: 1920,
            fit_mode: FitMode::Cover,
            transitions_enabled: true,
            ..Default::default()
        };
        let graph = RenderGraph::build(&segments, &opts).unwrap();
        assert!(graph.filter_complex.contains("xfade"));
        assert!(graph.filter_complex.contains("acrossfade"));
    }

    #[test]
    fn jump_cut_uses_short_fade() {
        let fade = JUMP_CUT_FADE_SECONDS;
        assert!(fade < XFADE_DURATION_SECONDS);
    }
}
