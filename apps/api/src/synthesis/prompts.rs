// All LLM prompt constants for the synthesis module.
// Reuses cross-cutting fragments from llm_client::prompts.

/// Vision prompt for reading an Ideal Team Player rating form.
pub const ITP_EXTRACTION_PROMPT: &str = r#"The images show a completed Ideal Team Player assessment ({rater}).
Read the rating given for each of the three traits: Humble, Hungry and Smart.
Each rating is an integer from 1 to 10.

Return a JSON object with this EXACT schema (no extra fields):
{"humble": 7, "hungry": 8, "smart": 6}"#;

/// Vision prompt for transcribing handwritten or scanned review pages.
pub const TRANSCRIPTION_PROMPT: &str =
    "Transcribe all of the text in these {label} pages, in reading order.";

/// System prompt for the review synthesis call.
pub const SYNTHESIS_SYSTEM: &str = "You are an experienced people manager writing a fair, \
    specific and constructive annual performance review. \
    Ground every statement in the supplied inputs. Do NOT invent projects, numbers or events.";

/// Review synthesis prompt template.
/// Replace: {sources}, {inputs}
pub const SYNTHESIS_PROMPT_TEMPLATE: &str = r#"Write a performance review using ONLY the inputs below.

AVAILABLE SOURCES: {sources}

{inputs}

Structure the review under exactly these four headings, in this order:
1. Strengths
2. Development Feedback
3. Goals for Next Year
4. Overall Assessment

Write two to four short paragraphs or bullets under each heading.
Where self-assessment and manager ratings disagree, address the gap directly."#;
