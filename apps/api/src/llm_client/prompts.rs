// Cross-cutting prompt fragments. Each collaborator keeps its own prompts next
// to it (alignment/prompts.rs, ingest/prompts.rs) and splices these in.

/// Common instruction appended to every rewrite/analysis prompt.
pub const TRUTHFULNESS_INSTRUCTION: &str = "\
    CRITICAL: Only rephrase, reorder, or re-emphasize facts already present in the résumé. \
    Do NOT invent employers, titles, dates, degrees, certifications, metrics, or technologies. \
    A missing job requirement stays missing unless the résumé already supports it.";

/// Instruction that keeps structured replies complete.
pub const COMPLETE_OBJECT_INSTRUCTION: &str = "\
    Return EVERY field of the résumé object, including fields you did not change. \
    Never omit a section because it is unchanged.";
