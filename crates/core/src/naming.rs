#![forbid(unsafe_code)]

pub const SLUG_MAX_LEN: usize = 50;
pub const FALLBACK_SLUG: &str = "workspace";
pub const PROJECT_IDENTIFIER_MAX_CHARS: usize = 5;

/// Derives the URL segment of a workspace from its display name.
///
/// Punctuation is dropped rather than turned into a separator, accents are
/// transliterated, and whitespace (or `_`) runs collapse into one hyphen.
/// Never returns an empty string.
pub fn workspace_slug(name: &str) -> String {
    let kept = name
        .chars()
        .filter(|ch| ch.is_alphanumeric() || ch.is_whitespace() || matches!(ch, '_' | '-'))
        .collect::<String>();

    // slugify output is ASCII, so byte truncation cannot split a char.
    let mut slug = ::slug::slugify(kept);
    if slug.len() > SLUG_MAX_LEN {
        slug.truncate(SLUG_MAX_LEN);
    }

    let trimmed = slug.trim_matches('-');
    if trimmed.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Short per-workspace project code, stored upper-cased (`WEB`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProjectIdentifier(String);

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProjectIdentifierError {
    #[error("identifier is required")]
    Empty,
    #[error("identifier must be at most {max} characters")]
    TooLong { max: usize },
    #[error("identifier must not contain {ch:?}")]
    InvalidChar { ch: char },
}

impl ProjectIdentifier {
    pub fn parse(value: &str) -> Result<Self, ProjectIdentifierError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ProjectIdentifierError::Empty);
        }
        if let Some(ch) = value.chars().find(|c| c.is_whitespace() || c.is_control()) {
            return Err(ProjectIdentifierError::InvalidChar { ch });
        }
        if value.chars().count() > PROJECT_IDENTIFIER_MAX_CHARS {
            return Err(ProjectIdentifierError::TooLong {
                max: PROJECT_IDENTIFIER_MAX_CHARS,
            });
        }
        Ok(Self(value.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}
