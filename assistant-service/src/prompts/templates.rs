use super::PromptTemplate;
use crate::dtos::{
    ConversationRequest, ConversationResponse, ImageAnalysisRequest, ImageAnalysisResponse,
    SummarizationRequest, SummarizationResponse,
};

/// Persona used when none is configured.
pub const DEFAULT_PERSONA: &str = "\
You are Wiz, a helpful and highly articulate AI assistant.
Your primary goal is to provide clear, well-structured, and informative answers.

When responding:
- Break down complex information into easily digestible paragraphs. Use newlines to separate paragraphs.
- Use Markdown for emphasis and clarity:
    - `**bold**` for important terms or concepts.
    - `*italic*` for highlighting or nuanced points.
    - For code examples, use Markdown code blocks with language identifiers (e.g., ```python).
- If asked for your name, state that your name is Wiz.
- Maintain a friendly and professional tone.";

const CONVERSATION_TEMPLATE: &str = "{{ persona }}\n\nQuestion:\n{{ query }}";

const IMAGE_ANALYSIS_TEMPLATE: &str = "You are an expert in image analysis. \
Describe the contents of the image.\n\nHere is the image:\n";

const SUMMARIZATION_TEMPLATE: &str =
    "Summarize the following article in a concise manner:\n\n{{ article }}";

pub fn conversation(
    persona: &str,
) -> Result<PromptTemplate<ConversationRequest, ConversationResponse>, tera::Error> {
    Ok(
        PromptTemplate::new("startConversationPrompt", CONVERSATION_TEMPLATE, &[])?
            .with_constant("persona", persona),
    )
}

pub fn image_analysis(
) -> Result<PromptTemplate<ImageAnalysisRequest, ImageAnalysisResponse>, tera::Error> {
    PromptTemplate::new(
        "analyzeImagePrompt",
        IMAGE_ANALYSIS_TEMPLATE,
        &["photoDataUri"],
    )
}

pub fn summarization(
) -> Result<PromptTemplate<SummarizationRequest, SummarizationResponse>, tera::Error> {
    PromptTemplate::new("summarizeArticlePrompt", SUMMARIZATION_TEMPLATE, &[])
}
