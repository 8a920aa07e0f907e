// Prompt constants for the alignment collaborators.
// Reuses cross-cutting fragments from llm_client::prompts.

/// Shared JSON-only system suffix.
const JSON_ONLY: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// System prompt for posting analysis.
pub const POSTING_ANALYSIS_SYSTEM: &str = "You are an expert HR analyst specializing in job \
    descriptions and applicant tracking systems.";

/// Posting analysis template. Replace `{posting_text}`.
pub const POSTING_ANALYSIS_PROMPT_TEMPLATE: &str = r#"Analyze the job posting below and extract:

1. Must-have technical skills: technologies, languages, frameworks explicitly required
2. Nice-to-have skills: preferred or bonus skills
3. Key responsibilities: main duties and tasks
4. Important keywords: industry terms and action verbs an ATS would scan for
5. Seniority: junior, mid, senior, staff, principal, director, or unknown
6. Domain knowledge: industry-specific knowledge required
7. Soft skills: communication, leadership, teamwork, etc.

Return a JSON object with this EXACT schema:
{
  "must_have_skills": ["Python", "FastAPI", "PostgreSQL"],
  "nice_to_have_skills": ["Docker", "Kubernetes"],
  "key_responsibilities": ["Design scalable APIs", "Mentor junior developers"],
  "important_keywords": ["scalable", "microservices", "CI/CD"],
  "seniority": "senior",
  "domain_knowledge": ["Healthcare"],
  "soft_skills": ["leadership", "communication"]
}

Extract every keyword an ATS would scan for. Be thorough.

JOB POSTING:
{posting_text}"#;

/// System prompt for the cold gap analysis.
pub const GAP_ANALYSIS_SYSTEM: &str = "You are an expert résumé consultant analyzing the \
    gaps between a candidate's résumé and a target role.";

/// Gap analysis template. Replace `{resume_json}`, `{target_json}`, `{truthfulness_instruction}`.
pub const GAP_ANALYSIS_PROMPT_TEMPLATE: &str = r#"Compare the résumé with the target requirements and identify:

1. Missing must-have skills: required skills not mentioned in the résumé
2. Missing keywords: important ATS keywords absent from the résumé
3. Underemphasized strengths: skills the candidate has but did not highlight
4. Experience gaps: areas lacking detail or examples
5. Sections to enhance: which résumé sections need work first
6. Potential matches: existing experience that could be reframed toward a requirement

Return a JSON object with this EXACT schema:
{
  "missing_must_have_skills": ["Kubernetes"],
  "missing_keywords": ["scalable", "microservices"],
  "underemphasized_strengths": ["Python (mentioned only once)"],
  "experience_gaps": [
    {"gap": "No cloud infrastructure shown", "suggestion": "Reframe project X around its AWS usage"}
  ],
  "sections_to_enhance": [
    {"section": "experiences[0]", "reason": "Missing key responsibilities", "priority": "high"}
  ],
  "potential_matches": [
    {"resume_item": "Built REST APIs using Python", "jd_requirement": "Design scalable services", "alignment_strategy": "Emphasize scalability"}
  ],
  "overall_match_percentage": 65,
  "priority_improvements": ["Highlight scalability"]
}

{truthfulness_instruction}

RÉSUMÉ:
{resume_json}

TARGET REQUIREMENTS:
{target_json}"#;

/// System prompt for the rewrite pass.
pub const REWRITE_SYSTEM: &str = "You are an expert résumé writer specializing in ATS \
    optimization. You rewrite résumé content to match a target role while staying truthful.";

/// Rewrite template. Replace `{resume_json}`, `{report_json}`, `{target_keywords}`,
/// `{truthfulness_instruction}`, `{complete_object_instruction}`.
pub const REWRITE_PROMPT_TEMPLATE: &str = r#"Rewrite the résumé to close the gaps in the deficiency report.

RULES:
1. Add missing keywords where the résumé already supports them
2. Start bullets with strong action verbs (Led, Architected, Optimized)
3. Quantify results only when the numbers are already implied
4. Use the terminology of the target role
5. Keep the résumé's structure and section order
6. If the report carries a critique from the previous pass, address it first

{truthfulness_instruction}

{complete_object_instruction}

Return a JSON object with this EXACT schema:
{
  "updated_resume": { ...the complete résumé object, same shape as the input... },
  "changes": [
    {
      "section": "experiences[0].bullet_points[0]",
      "field": "text",
      "change_type": "modified",
      "original_value": "Built APIs",
      "new_value": "Architected scalable RESTful APIs using Python and FastAPI",
      "reason": "Added keywords: scalable, RESTful",
      "confidence_score": 0.9
    }
  ]
}
change_type is one of: added, modified, removed, reordered.
confidence_score is a number between 0 and 1.

RÉSUMÉ:
{resume_json}

DEFICIENCY REPORT:
{report_json}

TARGET KEYWORDS:
{target_keywords}"#;

/// System prompt for scoring.
pub const SCORING_SYSTEM: &str = "You are an ATS (Applicant Tracking System) expert \
    evaluating résumé quality. Score conservatively.";

/// Scoring template. Replace `{resume_json}`, `{target_json}`.
pub const SCORING_PROMPT_TEMPLATE: &str = r#"Score the résumé against the target requirements.

Weighted factors:
1. Keyword match (40%): how many target keywords are present
2. Skills alignment (25%): do technical skills match the requirements
3. Experience relevance (20%): does experience match the responsibilities
4. Readability (10%): clean, scannable content
5. Quantified achievements (5%): metrics and results

Compute ats_score (0-100) from the weighted factors.
Set "approved" to true ONLY when ats_score >= 95; then set critique to "APPROVED".
Otherwise give a specific, actionable critique.

Return a JSON object with this EXACT schema:
{
  "ats_score": 87.5,
  "keyword_match_score": 0.82,
  "approved": false,
  "critique": "Specific improvements needed",
  "missing_keywords": ["Kubernetes", "CI/CD"],
  "strengths": ["Strong Python emphasis"],
  "weaknesses": ["Missing cloud keywords"],
  "improvement_priority": [
    {"section": "experiences[0].bullet_points[2]", "issue": "Missing 'scalable'", "suggestion": "Use it when describing architecture"}
  ]
}

RÉSUMÉ:
{resume_json}

TARGET REQUIREMENTS:
{target_json}"#;

/// Appends the JSON-only rules to a role preamble.
pub fn json_system(role: &str) -> String {
    format!("{role} {JSON_ONLY}")
}
