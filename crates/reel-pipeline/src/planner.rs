//! Shot plan generation.

use std::sync::Arc;

use tracing::{info, warn};

use reel_ml_client::{TaskContract, TextGenerator};
use reel_models::{estimate_duration_seconds, AudioAnalysis, ShotPlan};

use crate::error::{PipelineError, PipelineResult};
use crate::insights::FootageInsights;
use crate::retry::run_with_contract;

pub const EFFECT_NAMES: &[&str] = &["ken_burns", "glitch", "bw_filter", "zoom_in", "none"];
pub const TRANSITION_NAMES: &[&str] = &["fade", "slide", "wipe", "none"];
pub const TEXT_ANIMATION_NAMES: &[&str] = &["scale", "slide", "typewriter", "shake", "color_pulse"];

/// Duration the plan should cover: measured when known, else estimated
/// from the word count.
pub fn target_duration(script: &str, audio: Option<&AudioAnalysis>) -> f64 {
    audio
        .and_then(|a| a.duration_seconds)
        .filter(|d| *d > 0.0)
        .unwrap_or_else(|| estimate_duration_seconds(script))
}

pub fn build_plan_prompt(script: &str, audio: Option<&AudioAnalysis>, insights: &FootageInsights) -> String {
    let duration = target_duration(script, audio);
    let emotions = audio
        .map(|a| serde_json::to_string(&a.emotion_timeline).unwrap_or_default())
        .unwrap_or_else(|| "[]".to_string());
    let cues = audio
        .map(|a| serde_json::to_string(&a.cue_words).unwrap_or_default())
        .unwrap_or_else(|| "[]".to_string());

    format!(
        r#"ROLE: Film director planning a short vertical video.

SCRIPT:
"{script}"

AUDIO:
Duration: {duration:.1}s
Emotion timeline: {emotions}
Cue words: {cues}

FOOTAGE:
{digest}

CAPABILITIES (use only these values):
effect: {effects}
transition: {transitions}
textAnimation: {animations}

RULES:
1. Segments cover 0 to {duration:.1}s in order without gaps, 2-3 seconds each.
2. suggestedFootageRef is a file name from FOOTAGE or null.
3. textOverlay is 1-3 words or null.

OUTPUT ONE JSON OBJECT ONLY, starting with '{{':
{{"scriptAnalysis": {{"tone": "...", "estimatedDuration": {duration:.1}}},
 "segments": [{{"timeRange": "0-3s", "scriptText": "...", "visualIntent": "...", "suggestedFootageRef": "file.mp4", "effect": "ken_burns", "transition": "fade", "textOverlay": "...", "textAnimation": "scale"}}],
 "globalStyle": {{"vignette": false, "letterbox": false, "filmGrain": false}}}}"#,
        digest = insights.to_digest(),
        effects = EFFECT_NAMES.join(", "),
        transitions = TRANSITION_NAMES.join(", "),
        animations = TEXT_ANIMATION_NAMES.join(", "),
    )
}

/// Tidy a parsed plan: order segments and drop empty references.
pub fn normalize_plan(mut plan: ShotPlan) -> ShotPlan {
    plan.segments
        .sort_by(|a, b| a.time_range.start.total_cmp(&b.time_range.start));
    for segment in &mut plan.segments {
        let blank = segment
            .suggested_footage_ref
            .as_deref()
            .map(|r| {
                let r = r.trim();
                r.is_empty() || r.eq_ignore_ascii_case("null") || r.eq_ignore_ascii_case("none")
            })
            .unwrap_or(false);
        if blank {
            segment.suggested_footage_ref = None;
        }
        if segment
            .text_overlay
            .as_deref()
            .map(|t| t.trim().is_empty())
            .unwrap_or(false)
        {
            segment.text_overlay = None;
        }
    }
    plan
}

pub struct PlanGenerator {
    generator: Arc<dyn TextGenerator>,
}

impl PlanGenerator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn generate_plan(
        &self,
        script: &str,
        audio: Option<&AudioAnalysis>,
        insights: &FootageInsights,
    ) -> PipelineResult<ShotPlan> {
        if script.trim().is_empty() {
            return Err(PipelineError::invalid_input("script is empty"));
        }

        let prompt = build_plan_prompt(script, audio, insights);
        let plan: ShotPlan =
            run_with_contract(self.generator.as_ref(), TaskContract::DirectorPlan, &prompt).await?;
        let plan = normalize_plan(plan);

        if plan.segments.is_empty() {
            warn!("Generated plan has no segments");
        }
        info!(
            segments = plan.segments.len(),
            planned_seconds = plan.planned_duration(),
            "Shot plan generated"
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedGenerator;
    use reel_models::{ClipEffect, CueWord, EmotionMark, TextAnimation, TransitionKind};

    const PLAN: &str = r#"Here is the plan:
{"script_analysis": {"tone": "urgent", "estimated_duration": 6},
 "segments": [
   {"time_range": "3-6s", "script_text": "and win", "visual_intent": "victory", "suggested_footage": "null", "effect": "zoom_in", "transition": "wipe", "text_overlay": "", "text_animation": "typewriter"},
   {"time_range": "0-3s", "script_text": "Start now", "visual_intent": "city at night", "suggested_footage": "city.mp4", "effect": "ken_burns", "transition": "fade", "text_overlay": "NOW", "text_animation": "shake"}
 ]}"#;

    #[test]
    fn test_duration_prefers_measured() {
        let audio = AudioAnalysis {
            duration_seconds: Some(12.5),
            ..AudioAnalysis::default()
        };
        assert_eq!(target_duration("one two three four five", Some(&audio)), 12.5);
        assert_eq!(target_duration("one two three four five", None), 2.0);
    }

    #[test]
    fn test_prompt_embeds_inputs() {
        let audio = AudioAnalysis {
            text: "x".into(),
            duration_seconds: Some(8.0),
            emotion_timeline: vec![EmotionMark {
                at_seconds: 1.0,
                emotion: "tense".into(),
            }],
            cue_words: vec![CueWord {
                at_seconds: 2.0,
                word: "now".into(),
            }],
        };
        let insights = FootageInsights::from_hits(&[], vec!["city.mp4".into()]);
        let prompt = build_plan_prompt("Start now and win", Some(&audio), &insights);

        assert!(prompt.contains("\"Start now and win\""));
        assert!(prompt.contains("Duration: 8.0s"));
        assert!(prompt.contains("tense"));
        assert!(prompt.contains("\"now\""));
        assert!(prompt.contains("Available files: city.mp4"));
        assert!(prompt.contains("ken_burns, glitch, bw_filter, zoom_in, none"));
    }

    #[tokio::test]
    async fn test_generate_plan_normalizes() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok(PLAN.to_string())]));
        let planner = PlanGenerator::new(generator.clone());

        let plan = planner
            .generate_plan("Start now and win", None, &FootageInsights::default())
            .await
            .unwrap();

        assert_eq!(plan.segments.len(), 2);
        let first = &plan.segments[0];
        assert_eq!(first.suggested_footage_ref.as_deref(), Some("city.mp4"));
        assert_eq!(first.effect, ClipEffect::KenBurns);
        assert_eq!(first.transition, TransitionKind::Fade);
        assert_eq!(first.text_animation, TextAnimation::Shake);

        let second = &plan.segments[1];
        assert_eq!(second.suggested_footage_ref, None);
        assert_eq!(second.text_overlay, None);
        assert_eq!(plan.planned_duration(), 6.0);
    }

    #[tokio::test]
    async fn test_empty_script_rejected_without_calling_service() {
        let generator = Arc::new(ScriptedGenerator::new(vec![]));
        let planner = PlanGenerator::new(generator.clone());
        let err = planner
            .generate_plan("   ", None, &FootageInsights::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
        assert!(generator.prompts().is_empty());
    }
}
