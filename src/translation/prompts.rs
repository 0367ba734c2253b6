/*!
 * Prompt construction for batch translation.
 *
 * A prompt has two parts: a system prompt rendered from the project context,
 * and a user prompt listing the batch's lines as tagged blocks the response
 * parser knows how to read back. Retries carry the problems found in the
 * previous attempt.
 */

use crate::project::ProjectContext;
use crate::subtitle_processor::SubtitleLine;

/// Request used when the project does not set `gpt_prompt`
const DEFAULT_REQUEST: &str = "Please translate these subtitles";

/// System prompt template with `{placeholder}` fields.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// The default system prompt for subtitle translation.
    pub const SUBTITLE_TRANSLATOR: &'static str = r#"You are a subtitle translator. {request}{movie_name}.

Translate each line on its own, keeping the meaning and tone of the dialogue.
Keep each translation short enough to read in the time it is on screen.
Answer with one block per line, copying the start and end times exactly:

<translation start='00:00:01,000' end='00:00:02,500'>
translated text
</translation>

Do not merge, split, skip or reorder lines.{context}"#;

    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    pub fn subtitle_translator() -> Self {
        Self::new(Self::SUBTITLE_TRANSLATOR)
    }

    /// Render the template with values taken from the project context
    pub fn render(&self, context: &ProjectContext) -> String {
        let request = non_empty(&context.gpt_prompt).unwrap_or(DEFAULT_REQUEST);
        let movie_name = non_empty(&context.movie_name)
            .map(|name| format!(" for the film \"{}\"", name))
            .unwrap_or_default();

        let mut sections = Vec::new();
        if let Some(synopsis) = non_empty(&context.synopsis) {
            sections.push(format!("Synopsis:\n{}", synopsis));
        }
        if let Some(characters) = context.characters.as_ref().filter(|c| !c.is_empty()) {
            sections.push(format!("Characters: {}", characters.join(", ")));
        }
        if let Some(instructions) = non_empty(&context.instructions) {
            sections.push(format!("Instructions:\n{}", instructions));
        }

        let context_block = if sections.is_empty() {
            String::new()
        } else {
            format!("\n\n{}", sections.join("\n\n"))
        };

        self.template
            .replace("{request}", request.trim_end_matches('.'))
            .replace("{movie_name}", &movie_name)
            .replace("{context}", &context_block)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::subtitle_translator()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// A rendered prompt ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationPrompt {
    pub system: String,
    pub user: String,
}

impl TranslationPrompt {
    /// Both parts as one document, for display or single-message services
    pub fn to_text(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

/// Builder for the prompt of one batch.
#[derive(Debug, Clone)]
pub struct TranslationPromptBuilder {
    context: ProjectContext,
    template: PromptTemplate,
    lines: Vec<SubtitleLine>,
    retry_errors: Vec<String>,
}

impl TranslationPromptBuilder {
    pub fn new(context: &ProjectContext) -> Self {
        Self {
            context: context.clone(),
            template: PromptTemplate::default(),
            lines: Vec::new(),
            retry_errors: Vec::new(),
        }
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    /// Set the lines to translate
    pub fn with_lines(mut self, lines: &[SubtitleLine]) -> Self {
        self.lines = lines.to_vec();
        self
    }

    /// Ask the service to fix the problems found in a previous attempt
    pub fn with_retry_errors(mut self, errors: &[String]) -> Self {
        self.retry_errors = errors.to_vec();
        self
    }

    pub fn build_system_prompt(&self) -> String {
        self.template.render(&self.context)
    }

    /// List each line as an `<original>` block, with substitutions applied.
    ///
    /// Blocks carry the line number so an answer keyed only by number still binds.
    pub fn build_user_prompt(&self) -> String {
        let mut prompt = String::new();

        for line in &self.lines {
            let number = line.number.map(|n| format!(" number='{}'", n)).unwrap_or_default();
            prompt.push_str(&format!(
                "<original{} start='{}' end='{}'>\n{}\n</original>\n",
                number,
                line.start,
                line.end,
                self.context.substitute(&line.text)
            ));
        }

        if !self.retry_errors.is_empty() {
            prompt.push_str("\nThe previous translation had these problems, please correct them:\n");
            for error in &self.retry_errors {
                prompt.push_str(&format!("- {}\n", error));
            }
        }

        prompt
    }

    pub fn build(&self) -> TranslationPrompt {
        TranslationPrompt {
            system: self.build_system_prompt(),
            user: self.build_user_prompt(),
        }
    }
}
