//! Shot plan to render schedule lowering.
//!
//! A generative pass proposes the schedule; everything after that is
//! deterministic: source resolution against the library, physical trims into
//! the render workspace, style merging, the voice-track override and timing
//! repair. Given the same generated text and inputs the result is identical.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use reel_media::MediaToolkit;
use reel_ml_client::{TaskContract, TextGenerator};
use reel_models::{
    AudioClip, GlobalStyleFlags, RenderProject, RenderSchedule, ShotPlan, TextClip, TextStyle,
    VideoClip, DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH, DEFAULT_FRAME_RATE, PLACEHOLDER_SOURCE,
};

use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::log_channel::LogChannel;
use crate::logging::JobLogger;
use crate::retry::run_with_contract;

const SCRIPT_PREVIEW_CHARS: usize = 200;

/// Uploaded voice track that replaces any generated audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceTrack {
    pub source_uri: String,
    pub duration_seconds: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct CompileRequest {
    pub script: String,
    pub plan: ShotPlan,
    pub voice: Option<VoiceTrack>,
}

/// File-name component of a URI or path, without query or fragment.
pub fn file_name_of(uri: &str) -> Option<&str> {
    let trimmed = uri.split(['?', '#']).next().unwrap_or(uri);
    trimmed
        .rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
}

pub fn build_schedule_prompt(script: &str, plan: &ShotPlan, library: &[String]) -> String {
    let preview: String = script.chars().take(SCRIPT_PREVIEW_CHARS).collect();
    let plan_json = serde_json::to_string_pretty(plan).unwrap_or_default();
    let files = if library.is_empty() {
        "(none)".to_string()
    } else {
        library.join(", ")
    };

    format!(
        r#"ROLE: Video editor converting a director's plan into a render schedule.

SCRIPT (excerpt): "{preview}..."

DIRECTOR PLAN:
{plan_json}

LIBRARY FILES: {files}

TARGET SCHEMA (use exactly these keys):
{{"canvasWidth": {DEFAULT_CANVAS_WIDTH}, "canvasHeight": {DEFAULT_CANVAS_HEIGHT}, "frameRate": {DEFAULT_FRAME_RATE}, "totalDurationFrames": <int>,
 "tracks": [
  {{"kind": "video", "clips": [{{"sourceUri": "file.mp4", "sourceOffsetSeconds": 0, "clipDurationSeconds": 3, "timelineStartSeconds": 0, "effect": "ken_burns", "transition": "fade", "useExternalTrim": false}}]}},
  {{"kind": "audio", "clips": []}},
  {{"kind": "text", "clips": [{{"content": "WORD", "timelineStartSeconds": 0, "clipDurationSeconds": 1.5, "style": {{"animationKind": "scale"}}}}]}}
 ],
 "globalStyleFlags": {{"vignette": false, "letterbox": false, "filmGrain": false}}}}

RULES:
1. The video track covers the whole duration without gaps.
2. sourceUri is the plan's suggested file name, or "{PLACEHOLDER_SOURCE}" when it has none.
3. Set useExternalTrim with physicalTrimRange [start, end] only to cut a sub-range of a long file.
4. Output pure JSON starting with '{{'."#
    )
}

/// Deterministic schedule built straight from the plan.
pub fn lower_plan(plan: &ShotPlan) -> RenderSchedule {
    let mut schedule = RenderSchedule::vertical(0);
    for segment in &plan.segments {
        let start = segment.time_range.start.max(0.0);
        let duration = segment.time_range.duration().max(0.0);
        if duration <= 0.0 {
            continue;
        }
        schedule.tracks.video.push(VideoClip {
            source_uri: segment
                .suggested_footage_ref
                .clone()
                .unwrap_or_else(|| PLACEHOLDER_SOURCE.to_string()),
            source_offset_seconds: 0.0,
            clip_duration_seconds: duration,
            timeline_start_seconds: start,
            effect: segment.effect,
            transition: segment.transition,
            physical_trim_range: None,
            use_external_trim: false,
        });
        if let Some(text) = &segment.text_overlay {
            schedule.tracks.text.push(TextClip {
                content: text.clone(),
                timeline_start_seconds: start,
                clip_duration_seconds: duration,
                style: TextStyle {
                    animation_kind: segment.text_animation,
                    ..TextStyle::default()
                },
            });
        }
    }
    schedule.total_duration_frames = schedule.frames_covering(plan.planned_duration());
    schedule
}

pub struct ScheduleCompiler {
    generator: Arc<dyn TextGenerator>,
    media: Arc<dyn MediaToolkit>,
    config: PipelineConfig,
    log: LogChannel,
}

impl ScheduleCompiler {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        media: Arc<dyn MediaToolkit>,
        config: PipelineConfig,
        log: LogChannel,
    ) -> Self {
        Self {
            generator,
            media,
            config,
            log,
        }
    }

    /// File names currently in the raw library, sorted.
    pub async fn library_files(&self) -> PipelineResult<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = match tokio::fs::read_dir(self.config.raw_dir()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    pub async fn compile(
        &self,
        request: &CompileRequest,
        project: &RenderProject,
    ) -> PipelineResult<RenderSchedule> {
        let logger = JobLogger::new(project.id.to_string(), "compile").with_channel(self.log.clone());
        logger.log_start(&format!("compiling {} planned segments", request.plan.segments.len()));

        let library = self.library_files().await?;
        let prompt = build_schedule_prompt(&request.script, &request.plan, &library);
        let proposed: RenderSchedule =
            run_with_contract(self.generator.as_ref(), TaskContract::RenderSchedule, &prompt).await?;

        self.finalize(proposed, request, project, &logger).await
    }

    /// Deterministic post-processing of a proposed schedule.
    pub async fn finalize(
        &self,
        mut schedule: RenderSchedule,
        request: &CompileRequest,
        project: &RenderProject,
        logger: &JobLogger,
    ) -> PipelineResult<RenderSchedule> {
        if schedule.canvas_width == 0 || schedule.canvas_height == 0 {
            schedule.canvas_width = DEFAULT_CANVAS_WIDTH;
            schedule.canvas_height = DEFAULT_CANVAS_HEIGHT;
        }
        if schedule.frame_rate == 0 {
            schedule.frame_rate = DEFAULT_FRAME_RATE;
        }

        if schedule.tracks.video.is_empty() {
            logger.log_warning("generated schedule has no video clips, lowering the plan directly");
            let lowered = lower_plan(&request.plan);
            schedule.tracks.video = lowered.tracks.video;
            if schedule.tracks.text.is_empty() {
                schedule.tracks.text = lowered.tracks.text;
            }
        }

        for clip in &mut schedule.tracks.video {
            clip.clip_duration_seconds = clip.clip_duration_seconds.max(0.0);
            clip.timeline_start_seconds = clip.timeline_start_seconds.max(0.0);
            clip.source_offset_seconds = clip.source_offset_seconds.max(0.0);
            let resolved = self.resolve_source(&clip.source_uri).await;
            if resolved.is_none() && clip.source_uri != PLACEHOLDER_SOURCE {
                logger.log_warning(&format!(
                    "footage {} not found, using placeholder",
                    clip.source_uri
                ));
            }
            clip.source_uri = resolved
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_else(|| PLACEHOLDER_SOURCE.to_string());
        }

        self.apply_physical_trims(&mut schedule, project, logger).await;

        schedule.global_style_flags = schedule.global_style_flags.merge(GlobalStyleFlags {
            vignette: request.plan.global_style.vignette,
            letterbox: request.plan.global_style.letterbox,
            film_grain: request.plan.global_style.film_grain,
        });

        let video_end = schedule
            .tracks
            .video
            .iter()
            .map(VideoClip::timeline_end_seconds)
            .fold(0.0, f64::max);
        schedule.total_duration_frames = schedule
            .total_duration_frames
            .max(schedule.frames_covering(video_end));

        match &request.voice {
            Some(voice) => self.override_audio(&mut schedule, voice),
            None => self.resolve_audio(&mut schedule, logger).await,
        }

        clamp_to_timeline(&mut schedule);

        let uncovered = schedule.uncovered_video_seconds();
        if uncovered > 0.05 {
            logger.log_warning(&format!(
                "{:.1}s of the timeline has no video (voice longer than visuals?)",
                uncovered
            ));
        }

        schedule.validate().map_err(reel_compositor::CompositorError::from)?;

        logger.log_completion(&format!(
            "{} video, {} audio, {} text clips over {} frames",
            schedule.tracks.video.len(),
            schedule.tracks.audio.len(),
            schedule.tracks.text.len(),
            schedule.total_duration_frames
        ));
        info!(
            render_id = %project.id,
            frames = schedule.total_duration_frames,
            "Schedule compiled"
        );
        Ok(schedule)
    }

    /// Absolute path of a library file named like `uri`, searching `raw/`
    /// then `renders/`.
    async fn resolve_source(&self, uri: &str) -> Option<PathBuf> {
        if uri == PLACEHOLDER_SOURCE {
            return None;
        }
        let name = file_name_of(uri)?;
        for dir in [self.config.raw_dir(), self.config.renders_dir()] {
            let candidate = dir.join(name);
            if tokio::fs::metadata(&candidate)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false)
            {
                return Some(tokio::fs::canonicalize(&candidate).await.unwrap_or(candidate));
            }
        }
        None
    }

    async fn apply_physical_trims(
        &self,
        schedule: &mut RenderSchedule,
        project: &RenderProject,
        logger: &JobLogger,
    ) {
        for (index, clip) in schedule.tracks.video.iter_mut().enumerate() {
            if !clip.use_external_trim || clip.is_placeholder() {
                continue;
            }
            let Some([start, end]) = clip.physical_trim_range else {
                continue;
            };
            if !(start >= 0.0 && end > start) {
                logger.log_warning(&format!(
                    "clip {} has an unusable trim range [{}, {}], keeping native seek",
                    index, start, end
                ));
                continue;
            }

            let source = PathBuf::from(&clip.source_uri);
            let stem = source
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "clip".to_string());
            let output = project.assets_dir.join(format!("trim_{}_{}.mp4", index, stem));

            match self.media.trim_range(&source, &output, start, end - start).await {
                Ok(()) => {
                    logger.log_progress(&format!(
                        "trimmed {} [{:.1}-{:.1}s] into workspace",
                        stem, start, end
                    ));
                    clip.source_uri = output.to_string_lossy().to_string();
                    clip.source_offset_seconds = 0.0;
                    clip.use_external_trim = false;
                }
                Err(e) => {
                    logger.log_warning(&format!(
                        "trim of {} failed, keeping original reference: {}",
                        stem, e
                    ));
                }
            }
        }
    }

    /// Replace the audio track with the voice and stretch the timeline to it.
    fn override_audio(&self, schedule: &mut RenderSchedule, voice: &VoiceTrack) {
        let voice_seconds = voice.duration_seconds.filter(|d| *d > 0.0);
        if let Some(seconds) = voice_seconds {
            schedule.total_duration_frames = schedule
                .total_duration_frames
                .max(schedule.frames_covering(seconds));
        }
        schedule.tracks.audio = vec![AudioClip {
            source_uri: voice.source_uri.clone(),
            timeline_start_seconds: 0.0,
            clip_duration_seconds: voice_seconds.unwrap_or_else(|| schedule.duration_seconds()),
            volume: 1.0,
        }];
    }

    /// Without a voice track keep only generated audio that points at real files.
    async fn resolve_audio(&self, schedule: &mut RenderSchedule, logger: &JobLogger) {
        let clips = std::mem::take(&mut schedule.tracks.audio);
        for mut clip in clips {
            match self.resolve_source(&clip.source_uri).await {
                Some(path) => {
                    clip.source_uri = path.to_string_lossy().to_string();
                    schedule.tracks.audio.push(clip);
                }
                None => logger.log_warning(&format!("dropping unresolved audio {}", clip.source_uri)),
            }
        }
    }
}

/// Trim text and audio clips that run past the end of the timeline.
fn clamp_to_timeline(schedule: &mut RenderSchedule) {
    let total = schedule.duration_seconds();
    schedule
        .tracks
        .text
        .retain(|c| c.timeline_start_seconds >= 0.0 && c.timeline_start_seconds < total);
    for clip in &mut schedule.tracks.text {
        clip.clip_duration_seconds = clip
            .clip_duration_seconds
            .max(0.0)
            .min(total - clip.timeline_start_seconds);
    }
    schedule
        .tracks
        .audio
        .retain(|c| c.timeline_start_seconds >= 0.0 && c.timeline_start_seconds < total);
    for clip in &mut schedule.tracks.audio {
        clip.clip_duration_seconds = clip
            .clip_duration_seconds
            .max(0.0)
            .min(total - clip.timeline_start_seconds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeToolkit, ScriptedGenerator};
    use crate::workspace::WorkspaceManager;
    use reel_models::{ClipEffect, GlobalStyle, PlanSegment, TextAnimation, TimeRange, TransitionKind};

    struct Fixture {
        _tmp: tempfile::TempDir,
        config: PipelineConfig,
        project: RenderProject,
    }

    impl Fixture {
        async fn new() -> Self {
            let tmp = tempfile::tempdir().unwrap();
            let config = PipelineConfig::with_root(tmp.path());
            config.ensure_dirs().await.unwrap();
            tokio::fs::write(config.raw_dir().join("city.mp4"), b"city").await.unwrap();
            tokio::fs::write(config.raw_dir().join("beach.mp4"), b"beach").await.unwrap();
            let project = WorkspaceManager::new(config.workspaces_dir())
                .create()
                .await
                .unwrap();
            Self {
                _tmp: tmp,
                config,
                project,
            }
        }

        fn compiler(&self, responses: Vec<String>, toolkit: Arc<FakeToolkit>) -> ScheduleCompiler {
            ScheduleCompiler::new(
                Arc::new(ScriptedGenerator::new(responses.into_iter().map(Ok).collect())),
                toolkit,
                self.config.clone(),
                LogChannel::default(),
            )
        }

        fn raw(&self, name: &str) -> String {
            std::fs::canonicalize(self.config.raw_dir().join(name))
                .unwrap()
                .to_string_lossy()
                .to_string()
        }
    }

    fn segment(start: f64, end: f64, footage: Option<&str>) -> PlanSegment {
        PlanSegment {
            time_range: TimeRange::new(start, end).unwrap(),
            script_text: "line".into(),
            visual_intent: "something".into(),
            suggested_footage_ref: footage.map(str::to_string),
            effect: ClipEffect::KenBurns,
            transition: TransitionKind::Fade,
            text_overlay: Some("WOW".into()),
            text_animation: TextAnimation::Scale,
        }
    }

    fn plan() -> ShotPlan {
        ShotPlan {
            script_analysis: None,
            segments: vec![segment(0.0, 3.0, Some("city.mp4")), segment(3.0, 6.0, None)],
            global_style: GlobalStyle {
                vignette: true,
                ..GlobalStyle::default()
            },
        }
    }

    fn request(voice: Option<VoiceTrack>) -> CompileRequest {
        CompileRequest {
            script: "Start now and win big today".into(),
            plan: plan(),
            voice,
        }
    }

    const NATIVE: &str = r#"{"width": 1080, "height": 1920, "fps": 30, "durationInFrames": 180,
      "tracks": [
        {"type": "video", "clips": [
          {"src": "http://localhost:3001/footage/city.mp4", "startAt": 0, "duration": 3, "startFrom": 12.5, "effect": "ken_burns", "transition": "fade"},
          {"src": "missing.mp4", "startAt": 3, "duration": 3, "effect": "glitch"}
        ]},
        {"type": "audio", "clips": [{"src": "Background music", "startAt": 0, "duration": 6}]},
        {"type": "text", "clips": [{"content": "NOW", "startAt": 1, "duration": 9, "textStyle": {"animation": "typewriter"}}]}
      ]}"#;

    #[test]
    fn test_file_name_of() {
        assert_eq!(file_name_of("http://localhost:3001/footage/city.mp4?x=1"), Some("city.mp4"));
        assert_eq!(file_name_of("C:\\clips\\beach.mov"), Some("beach.mov"));
        assert_eq!(file_name_of("city.mp4"), Some("city.mp4"));
        assert_eq!(file_name_of("footage/"), None);
        assert_eq!(file_name_of("../"), None);
    }

    #[test]
    fn test_lower_plan_tiles_segments() {
        let schedule = lower_plan(&plan());
        assert_eq!(schedule.tracks.video.len(), 2);
        assert_eq!(schedule.tracks.video[1].source_uri, PLACEHOLDER_SOURCE);
        assert_eq!(schedule.tracks.text.len(), 2);
        assert_eq!(schedule.total_duration_frames, 180);
        assert_eq!(schedule.uncovered_video_seconds(), 0.0);
    }

    #[tokio::test]
    async fn test_native_path_resolves_and_substitutes_placeholder() {
        let fx = Fixture::new().await;
        let compiler = fx.compiler(vec![NATIVE.to_string()], Arc::new(FakeToolkit::with_duration(30.0)));

        let schedule = compiler.compile(&request(None), &fx.project).await.unwrap();

        let video = &schedule.tracks.video;
        assert_eq!(video[0].source_uri, fx.raw("city.mp4"));
        assert_eq!(video[0].source_offset_seconds, 12.5);
        assert_eq!(video[1].source_uri, PLACEHOLDER_SOURCE);
        assert_eq!(video[1].effect, ClipEffect::Glitch);
        // Unresolvable generated audio is dropped.
        assert!(schedule.tracks.audio.is_empty());
        // Text overrunning the timeline is clamped to it.
        assert_eq!(schedule.tracks.text[0].clip_duration_seconds, 5.0);
        assert_eq!(schedule.tracks.text[0].style.animation_kind, TextAnimation::Typewriter);
        assert!(schedule.global_style_flags.vignette);
        assert!(schedule.validate().is_ok());
    }

    #[tokio::test]
    async fn test_compile_is_idempotent_on_native_path() {
        let fx = Fixture::new().await;
        let toolkit = Arc::new(FakeToolkit::with_duration(30.0));
        let first = fx
            .compiler(vec![NATIVE.to_string()], toolkit.clone())
            .compile(&request(None), &fx.project)
            .await
            .unwrap();
        let second = fx
            .compiler(vec![NATIVE.to_string()], toolkit.clone())
            .compile(&request(None), &fx.project)
            .await
            .unwrap();

        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
        assert!(toolkit.trims().is_empty());
    }

    #[tokio::test]
    async fn test_voice_longer_than_visuals_extends_timeline() {
        let fx = Fixture::new().await;
        let compiler = fx.compiler(vec![NATIVE.to_string()], Arc::new(FakeToolkit::with_duration(30.0)));
        let voice = VoiceTrack {
            source_uri: fx.raw("city.mp4"),
            duration_seconds: Some(9.5),
        };

        let schedule = compiler.compile(&request(Some(voice.clone())), &fx.project).await.unwrap();

        assert_eq!(schedule.total_duration_frames, 285);
        assert_eq!(schedule.tracks.audio.len(), 1);
        let audio = &schedule.tracks.audio[0];
        assert_eq!(audio.source_uri, voice.source_uri);
        assert_eq!(audio.timeline_start_seconds, 0.0);
        assert_eq!(audio.clip_duration_seconds, 9.5);
        assert_eq!(audio.volume, 1.0);
        assert!(schedule.uncovered_video_seconds() > 3.0);
    }

    #[tokio::test]
    async fn test_voice_shorter_never_shortens() {
        let fx = Fixture::new().await;
        let compiler = fx.compiler(vec![NATIVE.to_string()], Arc::new(FakeToolkit::with_duration(30.0)));
        let voice = VoiceTrack {
            source_uri: "voice.mp3".into(),
            duration_seconds: Some(2.0),
        };
        let schedule = compiler.compile(&request(Some(voice)), &fx.project).await.unwrap();
        assert_eq!(schedule.total_duration_frames, 180);
        assert_eq!(schedule.tracks.audio[0].clip_duration_seconds, 2.0);
    }

    #[tokio::test]
    async fn test_physical_trim_rewrites_clip() {
        let fx = Fixture::new().await;
        let proposed = r#"{"canvasWidth": 1080, "canvasHeight": 1920, "frameRate": 30, "totalDurationFrames": 150,
          "tracks": [{"kind": "video", "clips": [
            {"sourceUri": "beach.mp4", "sourceOffsetSeconds": 0, "clipDurationSeconds": 5, "timelineStartSeconds": 0,
             "useExternalTrim": true, "physicalTrimRange": [0, 5]}
          ]}]}"#;
        let toolkit = Arc::new(FakeToolkit::with_duration(30.0));
        let compiler = fx.compiler(vec![proposed.to_string()], toolkit.clone());

        let schedule = compiler.compile(&request(None), &fx.project).await.unwrap();

        let clip = &schedule.tracks.video[0];
        let derivative = PathBuf::from(&clip.source_uri);
        assert!(derivative.starts_with(&fx.project.assets_dir));
        assert_eq!(derivative.file_name().unwrap(), "trim_0_beach.mp4");
        assert_eq!(clip.source_offset_seconds, 0.0);
        assert!(!clip.use_external_trim);

        let trims = toolkit.trims();
        assert_eq!(trims.len(), 1);
        assert_eq!((trims[0].2, trims[0].3), (0.0, 5.0));
        let measured = toolkit.probe_duration(&derivative).await.unwrap();
        assert!((measured - 5.0).abs() < 0.1);
    }

    #[tokio::test]
    async fn test_trim_failure_keeps_original_reference() {
        let fx = Fixture::new().await;
        let proposed = r#"{"totalDurationFrames": 90,
          "tracks": [{"kind": "video", "clips": [
            {"sourceUri": "beach.mp4", "sourceOffsetSeconds": 4, "clipDurationSeconds": 3,
             "useExternalTrim": true, "physicalTrimRange": [4, 7]}
          ]}]}"#;
        let toolkit = Arc::new(FakeToolkit::with_duration(30.0).failing_trims());
        let compiler = fx.compiler(vec![proposed.to_string()], toolkit);

        let schedule = compiler.compile(&request(None), &fx.project).await.unwrap();

        let clip = &schedule.tracks.video[0];
        assert_eq!(clip.source_uri, fx.raw("beach.mp4"));
        assert_eq!(clip.source_offset_seconds, 4.0);
    }

    #[tokio::test]
    async fn test_empty_video_track_falls_back_to_plan() {
        let fx = Fixture::new().await;
        let proposed = r#"{"totalDurationFrames": 0, "tracks": [{"kind": "video", "clips": []}, {"kind": "text", "clips": []}], "note": "padding padding"}"#;
        let compiler = fx.compiler(vec![proposed.to_string()], Arc::new(FakeToolkit::with_duration(30.0)));

        let schedule = compiler.compile(&request(None), &fx.project).await.unwrap();

        assert_eq!(schedule.tracks.video.len(), 2);
        assert_eq!(schedule.tracks.video[0].source_uri, fx.raw("city.mp4"));
        assert_eq!(schedule.tracks.video[1].source_uri, PLACEHOLDER_SOURCE);
        assert_eq!(schedule.total_duration_frames, 180);
    }

    #[tokio::test]
    async fn test_null_source_compiles_to_placeholder() {
        let fx = Fixture::new().await;
        let proposed = r#"{"canvasWidth": 1080, "canvasHeight": 1920, "frameRate": 30, "totalDurationFrames": 180,
          "tracks": [
            {"kind": "video", "clips": [
              {"sourceUri": "city.mp4", "clipDurationSeconds": 3, "timelineStartSeconds": 0},
              {"sourceUri": null, "clipDurationSeconds": 3, "timelineStartSeconds": 3, "effect": "glitch"}
            ]},
            {"kind": "audio", "clips": [{"sourceUri": null, "clipDurationSeconds": 6}]}
          ]}"#;
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok(proposed.to_string())]));
        let compiler = ScheduleCompiler::new(
            generator.clone(),
            Arc::new(FakeToolkit::with_duration(30.0)),
            fx.config.clone(),
            LogChannel::default(),
        );

        let schedule = compiler.compile(&request(None), &fx.project).await.unwrap();

        assert_eq!(generator.prompts().len(), 1);
        assert_eq!(schedule.tracks.video[0].source_uri, fx.raw("city.mp4"));
        assert_eq!(schedule.tracks.video[1].source_uri, PLACEHOLDER_SOURCE);
        assert_eq!(schedule.tracks.video[1].effect, ClipEffect::Glitch);
        assert!(schedule.tracks.audio.is_empty());
        assert!(schedule.validate().is_ok());
    }

    #[tokio::test]
    async fn test_two_chatty_responses_fail_compile() {
        let fx = Fixture::new().await;
        let compiler = fx.compiler(
            vec!["Sure, let me think.".to_string(), "{\"tracks\": []}".to_string()],
            Arc::new(FakeToolkit::with_duration(30.0)),
        );
        let err = compiler.compile(&request(None), &fx.project).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::PipelineError::GenerationExhausted { attempts: 2, .. }
        ));
    }

    #[test]
    fn test_prompt_mentions_library_and_placeholder() {
        let prompt = build_schedule_prompt(&"word ".repeat(100), &plan(), &["city.mp4".into()]);
        assert!(prompt.contains("LIBRARY FILES: city.mp4"));
        assert!(prompt.contains(PLACEHOLDER_SOURCE));
        assert!(prompt.contains("\"suggestedFootageRef\": \"city.mp4\""));
        let excerpt = prompt.split("SCRIPT (excerpt): \"").nth(1).unwrap();
        assert!(excerpt.starts_with(&"word ".repeat(40)));
        assert!(!excerpt.starts_with(&"word ".repeat(41)));
    }
}
