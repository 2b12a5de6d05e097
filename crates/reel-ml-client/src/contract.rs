//! Per-task output contracts.
//!
//! A contract is checked against the cleaned candidate text before it is
//! parsed, so obviously chatty or truncated answers are rejected early.

/// The structured answers the services are asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskContract {
    /// Shot plan from the planning prompt
    DirectorPlan,
    /// Renderer-ready schedule from the compile prompt
    RenderSchedule,
    /// Transcription service output
    AudioAnalysis,
    /// Frame tags from the vision prompt
    ForensicTags,
    /// Trend research payload
    TrendResearch,
}

impl TaskContract {
    pub fn name(&self) -> &'static str {
        match self {
            TaskContract::DirectorPlan => "DirectorPlan",
            TaskContract::RenderSchedule => "RenderSchedule",
            TaskContract::AudioAnalysis => "AudioAnalysis",
            TaskContract::ForensicTags => "ForensicTags",
            TaskContract::TrendResearch => "TrendResearch",
        }
    }

    /// First character a valid answer starts with.
    pub fn start_token(&self) -> char {
        '{'
    }

    fn min_len(&self) -> usize {
        match self {
            TaskContract::RenderSchedule => 100,
            TaskContract::AudioAnalysis => 20,
            _ => 2,
        }
    }

    /// Keys of which at least one must appear in the candidate.
    fn required_any(&self) -> &'static [&'static str] {
        match self {
            TaskContract::DirectorPlan => &["segments", "script_analysis", "scriptAnalysis"],
            TaskContract::RenderSchedule => &["\"tracks\""],
            TaskContract::ForensicTags => &["description"],
            TaskContract::AudioAnalysis | TaskContract::TrendResearch => &[],
        }
    }

    /// Check a cleaned candidate; returns the reason on failure.
    pub fn check(&self, candidate: &str) -> Result<(), String> {
        if !candidate.starts_with(self.start_token()) {
            let preview: String = candidate.chars().take(40).collect();
            return Err(format!(
                "expected output to start with '{}', got {:?}",
                self.start_token(),
                preview
            ));
        }
        if candidate.len() < self.min_len() {
            return Err(format!(
                "output too short ({} < {} bytes)",
                candidate.len(),
                self.min_len()
            ));
        }
        let keys = self.required_any();
        if !keys.is_empty() && !keys.iter().any(|k| candidate.contains(k)) {
            return Err(format!("missing required key, expected one of {:?}", keys));
        }
        Ok(())
    }
}
