// All LLM prompt constants for the screening pipeline, each paired with a
// logic version that is folded into cache keys. Bumping a version
// transparently invalidates every cached result produced by the old prompt.

/// Cache logic version for metadata extraction.
pub const EXTRACTION_VERSION: &str = "extract-v2";
/// Cache logic version for query interpretation.
pub const INTERPRET_VERSION: &str = "interpret-v1";
/// Cache logic version for candidate analysis.
pub const ANALYSIS_VERSION: &str = "analysis-v1";

/// System prompt for metadata extraction — enforces JSON-only output.
pub const EXTRACTION_SYSTEM: &str =
    "You are an expert technical recruiter extracting structured metadata \
    from a resume. You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Extraction prompt template. Replace `{resume_text}` before sending.
pub const EXTRACTION_PROMPT_TEMPLATE: &str = r#"Extract structured metadata from the following resume.

Return a JSON object with this EXACT schema (no extra fields):
{
  "name": "Jane Doe",
  "skills": ["rust", "postgresql", "kubernetes"],
  "years_experience": 6.5,
  "education": "master",
  "expected_salary": "25K-30K",
  "location": "Berlin",
  "remote_ok": true,
  "domains": ["fintech", "infrastructure"],
  "traits": ["ownership", "mentorship"],
  "summary": "One-sentence professional summary."
}

Rules:
- "education" is the HIGHEST completed level: one of "none", "associate", "bachelor", "master", "doctorate". Use null if unknown.
- "years_experience" is total professional experience in years. Use null if it cannot be determined.
- "expected_salary" keeps the candidate's own notation ("25K", "20K-30K", "45000"). Use null if not stated.
- "skills" and "domains" are lowercase. Domains describe industries, not technologies.
- Any field that is not present in the resume must be null (or [] for lists), never guessed.

RESUME:
{resume_text}"#;

/// Appended on re-extraction attempts after a malformed response.
pub const EXTRACTION_STRICT_SUFFIX: &str = "\n\nIMPORTANT: your previous answer \
was not parseable. Respond with EXACTLY one JSON object matching the schema, \
starting with '{' and ending with '}'. Nothing else.";

/// System prompt for query interpretation — enforces JSON-only output.
pub const INTERPRET_SYSTEM: &str =
    "You are an expert hiring analyst turning a free-text hiring requirement \
    into structured screening criteria. You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Interpretation prompt template. Replace `{query_text}` before sending.
pub const INTERPRET_PROMPT_TEMPLATE: &str = r#"Interpret the following hiring requirement and split it into hard requirements and soft preferences.

Return a JSON object with this EXACT schema (no extra fields):
{
  "required_skills": ["rust", "sql"],
  "preferred_skills": ["docker"],
  "keywords": ["backend", "payments"],
  "min_experience_years": 5,
  "min_education": "bachelor",
  "salary_min": "20K",
  "salary_max": "30K",
  "locations": ["Berlin", "Munich"],
  "remote_allowed": false,
  "domains": ["fintech"],
  "traits": ["leadership"],
  "ambiguous_fields": []
}

Rules:
- Hard requirements are ONLY: minimum experience, salary range, minimum education, and location. Everything else is a soft preference.
- "min_education" is one of "none", "associate", "bachelor", "master", "doctorate", or null.
- If you cannot confidently decide a hard requirement (vague wording, contradiction), set its value anyway as your best reading AND list its name in "ambiguous_fields". Valid names: "experience", "salary", "education", "location".
- Use null (or [] for lists) for anything the requirement does not mention. Never invent constraints.

HIRING REQUIREMENT:
{query_text}"#;

/// System prompt for candidate analysis. Plain prose output, no JSON.
pub const ANALYSIS_SYSTEM: &str =
    "You are a senior HR consultant writing a concise, factual evaluation of \
    one candidate against one role. Base every statement on the provided \
    metadata and scores. Do not invent facts.";

/// Analysis prompt template. Replace `{candidate_json}`, `{criteria_json}`,
/// and `{breakdown_json}` before sending.
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"Write a short evaluation (4-6 sentences) of this candidate for the role below.

Cover: skill fit, experience fit, notable strengths, potential risks, and a clear interview recommendation.

CANDIDATE METADATA:
{candidate_json}

ROLE CRITERIA:
{criteria_json}

DIMENSION SCORES (0-100):
{breakdown_json}"#;
