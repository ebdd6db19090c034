use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{StoreError, StoreResult, UnknownModeSnafu};

/// Conversational context a chat is tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    #[default]
    Aptitude,
    Coding,
    Document,
    Quiz,
    Custom,
}

/// One entry of the context panel tool list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeTool {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

const CODING_TOOLS: &[ModeTool] = &[
    ModeTool {
        id: "runner",
        name: "Code Runner",
        description: "Execute code snippets",
    },
    ModeTool {
        id: "debugger",
        name: "Debugger",
        description: "Debug your code",
    },
    ModeTool {
        id: "formatter",
        name: "Formatter",
        description: "Format code",
    },
];

const APTITUDE_TOOLS: &[ModeTool] = &[
    ModeTool {
        id: "calculator",
        name: "Calculator",
        description: "Quick calculations",
    },
    ModeTool {
        id: "timer",
        name: "Timer",
        description: "Practice timing",
    },
];

const DOCUMENT_TOOLS: &[ModeTool] = &[
    ModeTool {
        id: "summarizer",
        name: "Summarizer",
        description: "Summarize documents",
    },
    ModeTool {
        id: "extractor",
        name: "Q&A Extractor",
        description: "Extract questions",
    },
];

const QUIZ_TOOLS: &[ModeTool] = &[
    ModeTool {
        id: "generator",
        name: "Quiz Generator",
        description: "Generate quizzes",
    },
    ModeTool {
        id: "timer",
        name: "Timer",
        description: "Quiz timing",
    },
];

const CODING_SUGGESTIONS: &[&str] = &[
    "Explain time complexity",
    "Show me examples",
    "Help me optimize this",
    "What are edge cases?",
];

impl ChatMode {
    pub const ALL: [ChatMode; 5] = [
        ChatMode::Aptitude,
        ChatMode::Coding,
        ChatMode::Document,
        ChatMode::Quiz,
        ChatMode::Custom,
    ];

    /// Lowercase wire name, as accepted by [`ChatMode::from_str`].
    pub fn name(self) -> &'static str {
        match self {
            Self::Aptitude => "aptitude",
            Self::Coding => "coding",
            Self::Document => "document",
            Self::Quiz => "quiz",
            Self::Custom => "custom",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Aptitude => "Aptitude",
            Self::Coding => "Coding",
            Self::Document => "Document",
            Self::Quiz => "Quiz",
            Self::Custom => "Custom",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Aptitude => "Logical reasoning & quantitative problems",
            Self::Coding => "Algorithms & programming help",
            Self::Document => "Analyze & summarize documents",
            Self::Quiz => "Practice tests & assessments",
            Self::Custom => "General conversation",
        }
    }

    /// Title given to a chat started in this mode.
    pub fn new_chat_title(self) -> String {
        format!("New {} Chat", self.label())
    }

    pub fn placeholder(self) -> &'static str {
        match self {
            Self::Aptitude => {
                "Ask about aptitude questions, logical reasoning, or quantitative problems..."
            }
            Self::Coding => "Ask about algorithms, data structures, or coding problems...",
            Self::Document => "Ask questions about your uploaded documents...",
            Self::Quiz => "Create or take a quiz, ask for practice questions...",
            Self::Custom => "Type your message here...",
        }
    }

    pub fn quick_prompts(self) -> &'static [&'static str] {
        match self {
            Self::Aptitude => &[
                "Explain this math problem",
                "Help with logical reasoning",
                "Practice quantitative questions",
            ],
            Self::Coding => &[
                "Explain this algorithm",
                "Optimize this code",
                "Debug this error",
            ],
            Self::Document => &[
                "Summarize this document",
                "Extract key points",
                "Create quiz questions",
            ],
            Self::Quiz => &[
                "Create a practice quiz",
                "Test my knowledge",
                "Review my answers",
            ],
            Self::Custom => &[
                "Help me understand",
                "Explain in detail",
                "Give me examples",
            ],
        }
    }

    /// Context panel suggestions. Custom mode shares the coding list.
    pub fn suggestions(self) -> &'static [&'static str] {
        match self {
            Self::Aptitude => &[
                "Solve step by step",
                "Give me similar problems",
                "Explain the concept",
                "Show me shortcuts",
            ],
            Self::Document => &[
                "Summarize key points",
                "Create flashcards",
                "Generate quiz questions",
                "Find related topics",
            ],
            Self::Quiz => &[
                "Create practice test",
                "Review my answers",
                "Explain mistakes",
                "Give me more questions",
            ],
            Self::Coding | Self::Custom => CODING_SUGGESTIONS,
        }
    }

    pub fn tools(self) -> &'static [ModeTool] {
        match self {
            Self::Aptitude => APTITUDE_TOOLS,
            Self::Document => DOCUMENT_TOOLS,
            Self::Quiz => QUIZ_TOOLS,
            Self::Coding | Self::Custom => CODING_TOOLS,
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

impl FromStr for ChatMode {
    type Err = StoreError;

    fn from_str(raw: &str) -> StoreResult<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|mode| mode.name() == normalized)
            .ok_or_else(|| {
                UnknownModeSnafu {
                    stage: "parse-chat-mode",
                    raw: raw.to_string(),
                }
                .build()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("Coding".parse::<ChatMode>().ok(), Some(ChatMode::Coding));
        assert_eq!(" quiz ".parse::<ChatMode>().ok(), Some(ChatMode::Quiz));
        assert!(matches!(
            "poetry".parse::<ChatMode>(),
            Err(StoreError::UnknownMode { .. })
        ));
    }

    #[test]
    fn custom_mode_falls_back_to_coding_context() {
        assert_eq!(ChatMode::Custom.suggestions(), ChatMode::Coding.suggestions());
        assert_eq!(ChatMode::Custom.tools(), ChatMode::Coding.tools());
        assert_eq!(ChatMode::Document.new_chat_title(), "New Document Chat");
    }

    #[test]
    fn every_mode_offers_three_quick_prompts() {
        for mode in ChatMode::ALL {
            assert_eq!(mode.quick_prompts().len(), 3, "{mode}");
            assert!(!mode.placeholder().is_empty());
        }
    }
}
