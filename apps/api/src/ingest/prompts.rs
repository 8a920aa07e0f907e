// Prompt templates for résumé parsing.

pub const DOCUMENT_PARSE_SYSTEM: &str = "\
You are a precise résumé data extractor. \
Parse raw résumé text into structured JSON. \
You MUST respond with valid JSON only. No markdown fences, no explanations. \
Preserve achievements verbatim and never add information that is not in the text.";

/// Replace `{raw_text}` before sending.
pub const DOCUMENT_PARSE_PROMPT: &str = r#"Parse the résumé text below into a JSON object with this structure:
{
  "full_name": "string",
  "email": "string | null",
  "phone": "string | null",
  "location": "string | null",
  "linkedin": "string | null",
  "github": "string | null",
  "website": "string | null",
  "summary": "string | null",
  "technical_skills": ["string"],
  "soft_skills": ["string"],
  "languages": ["string"],
  "experiences": [
    {
      "company": "string",
      "title": "string",
      "location": "string | null",
      "start_date": "YYYY-MM | null",
      "end_date": "YYYY-MM | null",
      "is_current": false,
      "description": "string | null",
      "bullet_points": ["string"],
      "technologies": ["string"]
    }
  ],
  "education": [
    {
      "institution": "string",
      "degree": "string",
      "field_of_study": "string | null",
      "location": "string | null",
      "graduation_date": "YYYY-MM | null",
      "gpa": "string | null",
      "honors": ["string"]
    }
  ],
  "projects": [
    {
      "name": "string",
      "description": "string",
      "technologies": ["string"],
      "url": "string | null",
      "bullet_points": ["string"]
    }
  ],
  "certifications": [
    {
      "name": "string",
      "issuer": "string",
      "date_obtained": "YYYY-MM | null",
      "expiry_date": "YYYY-MM | null",
      "credential_id": "string | null"
    }
  ],
  "publications": ["string"],
  "awards": ["string"]
}

Rules:
- Use YYYY-MM for dates when the month is known.
- A role that runs to "Present" has end_date null and is_current true.
- Omit nothing that appears in the text; invent nothing that does not.

RÉSUMÉ TEXT:
{raw_text}"#;
