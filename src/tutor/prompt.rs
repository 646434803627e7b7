use crate::{
    config::GenerationConfig,
    inference::{ChatMessage, GenerationRequest},
};
use serde::{Deserialize, Serialize};

pub const MIN_MAX_TOKENS: u32 = 50;
pub const MAX_MAX_TOKENS: u32 = 2048;

/// Prepended verbatim, without a separator, for the concise style.
pub const CONCISE_INSTRUCTION: &str = "Provide a response without any introductory explanations, meta-responses, preface, or contextualization.";

pub const IMAGE_SYSTEM_PROMPT: &str = "You are a helpful AI assistant that can analyze images and answer questions about them in detail.";

const DEFAULT_SUBJECT: &str = "General";
const DEFAULT_LANGUAGE: &str = "English";

/// Generation settings as sent by the client. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TutorSettings {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<i64>,
    #[serde(default)]
    pub response_style: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudienceLevel {
    Elementary,
    #[default]
    MiddleSchool,
    HighSchool,
    University,
    Graduate,
    Professional,
    /// Unrecognized key; described generically.
    General,
}

impl AudienceLevel {
    pub fn from_key(key: &str) -> Self {
        match key.trim() {
            "elementary" => Self::Elementary,
            "middle_school" => Self::MiddleSchool,
            "high_school" => Self::HighSchool,
            "university" => Self::University,
            "graduate" => Self::Graduate,
            "professional" => Self::Professional,
            _ => Self::General,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Elementary => "elementary school students (age 6-12)",
            Self::MiddleSchool => "middle school students (age 12-15)",
            Self::HighSchool => "high school students (age 15-18)",
            Self::University => "university students",
            Self::Graduate => "graduate students and researchers",
            Self::Professional => "professionals in the field",
            Self::General => "students",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResponseStyle {
    #[default]
    Default,
    Concise,
    Custom(String),
}

impl ResponseStyle {
    /// `regular`/`default` and blank strings map to the default style,
    /// `effective`/`concise` to the concise one, anything else is a custom
    /// instruction.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed {
            "" | "default" | "regular" => Self::Default,
            "concise" | "effective" => Self::Concise,
            custom => Self::Custom(custom.to_string()),
        }
    }

    pub fn apply(&self, question: &str) -> String {
        match self {
            Self::Default => question.to_string(),
            Self::Concise => format!("{}{}", CONCISE_INSTRUCTION, question),
            Self::Custom(instruction) => format!("{}: {}", instruction, question),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Default => "default",
            Self::Concise => "concise",
            Self::Custom(instruction) => instruction,
        }
    }
}

/// Coerces a requested output length into `[MIN_MAX_TOKENS, MAX_MAX_TOKENS]`.
pub fn clamp_max_tokens(requested: i64) -> u32 {
    requested.clamp(MIN_MAX_TOKENS as i64, MAX_MAX_TOKENS as i64) as u32
}

/// Validated view of [`TutorSettings`].
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    pub subject: String,
    pub language: String,
    pub level: AudienceLevel,
    pub style: ResponseStyle,
    pub max_tokens: u32,
}

impl GenerationOptions {
    pub fn from_settings(settings: &TutorSettings, defaults: &GenerationConfig) -> Self {
        let non_blank = |value: &Option<String>, fallback: &str| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(fallback)
                .to_string()
        };

        Self {
            subject: non_blank(&settings.subject, DEFAULT_SUBJECT),
            language: non_blank(&settings.language, DEFAULT_LANGUAGE),
            level: settings
                .level
                .as_deref()
                .map(AudienceLevel::from_key)
                .unwrap_or_default(),
            style: settings
                .response_style
                .as_deref()
                .map(ResponseStyle::parse)
                .unwrap_or_default(),
            max_tokens: clamp_max_tokens(
                settings
                    .max_tokens
                    .unwrap_or(defaults.max_new_tokens as i64),
            ),
        }
    }

    pub fn system_prompt(&self) -> String {
        format!(
            "You are a helpful {} tutor. Explain concepts clearly and appropriately for {}. \
             Always respond in {}. Be educational, engaging, and provide examples when helpful.",
            self.subject,
            self.level.description(),
            self.language
        )
    }

    pub fn build_request(&self, question: &str, defaults: &GenerationConfig) -> GenerationRequest {
        GenerationRequest {
            messages: vec![
                ChatMessage::system(self.system_prompt()),
                ChatMessage::user(self.style.apply(question)),
            ],
            max_tokens: self.max_tokens,
            temperature: defaults.temperature,
            top_p: Some(defaults.top_p),
        }
    }
}

/// Prompt for the image path: fixed vision system role, image then question.
pub fn build_image_request(
    image_url: String,
    question: &str,
    defaults: &GenerationConfig,
) -> GenerationRequest {
    GenerationRequest {
        messages: vec![
            ChatMessage::system(IMAGE_SYSTEM_PROMPT),
            ChatMessage::user_with_image(image_url, question),
        ],
        max_tokens: defaults.image_max_tokens,
        temperature: defaults.temperature,
        top_p: None,
    }
}
