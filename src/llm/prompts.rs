//! Prompt construction
//!
//! A small section-based builder plus the two templates the pipeline needs:
//! the project overview and the per-chunk documentation request.

use crate::content::Chunk;
use crate::types::ProjectMetadata;

/// System message shared by every documentation request
pub const SYSTEM_PROMPT: &str = "You are a senior software engineer writing clear, accurate \
     technical documentation in Markdown. Only describe what the provided material shows.";

/// File paths listed in the overview prompt
const OVERVIEW_FILE_LIMIT: usize = 200;

#[derive(Debug, Clone)]
enum Section {
    Role(String),
    Objectives(Vec<String>),
    Context(Vec<(String, String)>),
    Text { header: String, body: String },
    Focus(Vec<String>),
}

#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<Section>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(mut self, role: &str) -> Self {
        self.sections.push(Section::Role(role.to_string()));
        self
    }

    pub fn objectives(mut self, objectives: &[&str]) -> Self {
        self.sections.push(Section::Objectives(
            objectives.iter().map(|o| o.to_string()).collect(),
        ));
        self
    }

    /// Context items keep insertion order
    pub fn context_item(mut self, key: &str, value: &str) -> Self {
        let item = (key.to_string(), value.to_string());
        match self.sections.iter_mut().find_map(|s| match s {
            Section::Context(items) => Some(items),
            _ => None,
        }) {
            Some(items) => items.push(item),
            None => self.sections.push(Section::Context(vec![item])),
        }
        self
    }

    pub fn section(mut self, header: &str, body: &str) -> Self {
        self.sections.push(Section::Text {
            header: header.to_string(),
            body: body.to_string(),
        });
        self
    }

    pub fn focus(mut self, rules: &[&str]) -> Self {
        self.sections
            .push(Section::Focus(rules.iter().map(|r| r.to_string()).collect()));
        self
    }

    pub fn build(self) -> String {
        let mut prompt = String::new();

        for section in self.sections {
            match section {
                Section::Role(role) => {
                    prompt.push_str(&format!("<ROLE>\nYou are {}.\n</ROLE>\n\n", role));
                }
                Section::Objectives(objectives) => {
                    prompt.push_str("<OBJECTIVES>\n");
                    for (i, objective) in objectives.iter().enumerate() {
                        prompt.push_str(&format!("{}. {}\n", i + 1, objective));
                    }
                    prompt.push_str("</OBJECTIVES>\n\n");
                }
                Section::Context(items) => {
                    prompt.push_str("# Context\n\n");
                    for (key, value) in items {
                        prompt.push_str(&format!("**{}**: {}\n", key, value));
                    }
                    prompt.push('\n');
                }
                Section::Text { header, body } => {
                    prompt.push_str(&format!("# {}\n\n{}\n\n", header, body));
                }
                Section::Focus(rules) => {
                    prompt.push_str("<FOCUS>\n");
                    for rule in rules {
                        prompt.push_str(&format!("- {}\n", rule));
                    }
                    prompt.push_str("</FOCUS>\n\n");
                }
            }
        }

        prompt.trim_end().to_string()
    }
}

/// Overview request: project metadata plus the list of documented files
pub fn overview_prompt(project: &ProjectMetadata, files: &[String]) -> String {
    let mut listing: Vec<String> = files
        .iter()
        .take(OVERVIEW_FILE_LIMIT)
        .map(|f| format!("- {}", f))
        .collect();
    if files.len() > OVERVIEW_FILE_LIMIT {
        listing.push(format!("- ... and {} more", files.len() - OVERVIEW_FILE_LIMIT));
    }

    PromptBuilder::new()
        .role("a technical writer producing a project overview")
        .objectives(&[
            "Summarize the purpose of the project",
            "Describe the main components suggested by the file layout",
            "Note the languages and tooling in use",
        ])
        .context_item("Project", &project.name)
        .context_item("Path", &project.path)
        .context_item("Description", project.description_or_default())
        .context_item("Files", &files.len().to_string())
        .section("File list", &listing.join("\n"))
        .focus(&[
            "Write 2 to 4 short paragraphs of Markdown",
            "Do NOT invent features that the file list does not suggest",
        ])
        .build()
}

/// Per-chunk request: the concatenated file sections
pub fn chunk_prompt(project_name: &str, chunk: &Chunk) -> String {
    let paths: Vec<&str> = chunk.paths().collect();
    PromptBuilder::new()
        .role("a code documentation assistant")
        .objectives(&[
            "Explain what each file does and how it fits the project",
            "Document public functions, types and configuration they expose",
            "Point out notable dependencies between these files",
        ])
        .context_item("Project", project_name)
        .context_item("Files in this batch", &paths.join(", "))
        .section("Source", chunk.payload.trim_start())
        .focus(&[
            "Use one Markdown subsection per file, titled with its path",
            "ONLY document facts observable in the provided code",
        ])
        .build()
}
