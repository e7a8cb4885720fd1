// Prompt constants for resume analysis.

/// System message framing the reviewer role.
pub const ANALYSIS_SYSTEM: &str = "You are a helpful assistant for resume analysis. \
    You MUST respond with a single valid JSON object. \
    Do NOT include any text outside the JSON object.";

/// Analysis instruction template. Replace `{resume_text}` and `{job_description}` before sending.
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"You are a professional resume reviewer. Given the following resume text and job description, do the following:
1. List the top 5 most relevant keywords from the resume that match the job description.
2. List the top 5 most important keywords missing from the resume that are present in the job description.
3. Provide 3-5 specific, actionable suggestions to improve the resume for this job.
4. Write a 2-3 sentence summary of the resume's strengths and weaknesses for this job.

Return your answer as a JSON object with exactly these keys: matchingKeywords, missingKeywords, suggestions, summary.
matchingKeywords, missingKeywords and suggestions are arrays of strings; summary is a string.

Resume Text:
"""{resume_text}"""

Job Description:
"""{job_description}""""#;

/// Embeds both inputs verbatim in the analysis template.
///
/// Substitution is a single left-to-right pass, so placeholder-looking text
/// inside the resume is never re-expanded.
pub fn build_analysis_prompt(resume_text: &str, job_description: &str) -> String {
    const RESUME: &str = "{resume_text}";
    const JOB: &str = "{job_description}";

    let mut prompt = String::with_capacity(
        ANALYSIS_PROMPT_TEMPLATE.len() + resume_text.len() + job_description.len(),
    );
    let (before_resume, rest) = ANALYSIS_PROMPT_TEMPLATE
        .split_once(RESUME)
        .unwrap_or((ANALYSIS_PROMPT_TEMPLATE, ""));
    let (between, after_job) = rest.split_once(JOB).unwrap_or((rest, ""));

    prompt.push_str(before_resume);
    prompt.push_str(resume_text);
    prompt.push_str(between);
    prompt.push_str(job_description);
    prompt.push_str(after_job);
    prompt
}
