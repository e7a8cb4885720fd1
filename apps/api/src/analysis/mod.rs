//! Resume analysis: keyword-gap comparison of a stored resume against a job
//! description, produced by the hosted language model.
//!
//! Pipeline, strictly in order: fetch bytes → extract text → build prompt →
//! call the model (with fallback) → parse JSON → attach a bounded excerpt.
//! Nothing is cached; each request runs the whole chain.

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::{strip_json_fences, LlmClient};
use crate::resumes::extract::TextExtractor;
use crate::resumes::store::ResumeStore;

pub mod handlers;
pub mod prompts;

use prompts::{build_analysis_prompt, ANALYSIS_SYSTEM};

/// Upper bound on `resumeTextExcerpt`, in characters.
pub const EXCERPT_MAX_CHARS: usize = 2000;

/// The four fields the model is asked to produce.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelVerdict {
    matching_keywords: Vec<String>,
    missing_keywords: Vec<String>,
    suggestions: Vec<String>,
    summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub matching_keywords: Vec<String>,
    pub missing_keywords: Vec<String>,
    pub suggestions: Vec<String>,
    pub summary: String,
    pub resume_text_excerpt: String,
}

/// Everything the pipeline needs, borrowed from `AppState`.
pub struct Analyzer<'a> {
    pub resumes: &'a ResumeStore,
    pub extractor: &'a dyn TextExtractor,
    pub llm: &'a LlmClient,
}

impl Analyzer<'_> {
    pub async fn analyze(
        &self,
        owner_id: Uuid,
        resume_id: Uuid,
        job_description: &str,
    ) -> Result<AnalysisResult, AppError> {
        let (_, pdf) = self.resumes.fetch(owner_id, resume_id).await?;

        let resume_text = self.extractor.extract(pdf).await?;

        let prompt = build_analysis_prompt(&resume_text, job_description);

        let raw = self
            .llm
            .call(&prompt, ANALYSIS_SYSTEM)
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        let verdict = parse_verdict(&raw)?;

        info!(
            "Analyzed resume {resume_id}: {} matching, {} missing keywords",
            verdict.matching_keywords.len(),
            verdict.missing_keywords.len()
        );

        Ok(AnalysisResult {
            matching_keywords: verdict.matching_keywords,
            missing_keywords: verdict.missing_keywords,
            suggestions: verdict.suggestions,
            summary: verdict.summary,
            resume_text_excerpt: excerpt(&resume_text, EXCERPT_MAX_CHARS).to_string(),
        })
    }
}

fn parse_verdict(raw: &str) -> Result<ModelVerdict, AppError> {
    serde_json::from_str(strip_json_fences(raw)).map_err(|e| AppError::Parse {
        message: e.to_string(),
        raw: Some(raw.to_string()),
    })
}

/// Longest prefix of `text` holding at most `max_chars` characters.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
