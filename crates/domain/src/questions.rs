use crate::error::ValidationError;
use crate::util::char_len;

const MIN_TITLE_LENGTH: usize = 3;
const MIN_QUESTION_TEXT_LENGTH: usize = 3;
const MIN_MULTIPLE_CHOICE_OPTIONS: usize = 2;
const MIN_LIKERT_SCALE_OPTIONS: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuestionFormat {
    Textbox,
    MultipleChoice,
    LikertScale,
}

impl QuestionFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionFormat::Textbox => "Textbox",
            QuestionFormat::MultipleChoice => "Multiple Choice",
            QuestionFormat::LikertScale => "Likert Scale",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Textbox" => Some(QuestionFormat::Textbox),
            "Multiple Choice" => Some(QuestionFormat::MultipleChoice),
            "Likert Scale" => Some(QuestionFormat::LikertScale),
            _ => None,
        }
    }
}

/// A question's format together with the options that format allows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuestionKind {
    Textbox,
    MultipleChoice { options: Vec<String> },
    LikertScale { options: Vec<String> },
}

impl QuestionKind {
    pub fn format(&self) -> QuestionFormat {
        match self {
            QuestionKind::Textbox => QuestionFormat::Textbox,
            QuestionKind::MultipleChoice { .. } => QuestionFormat::MultipleChoice,
            QuestionKind::LikertScale { .. } => QuestionFormat::LikertScale,
        }
    }

    pub fn options(&self) -> &[String] {
        match self {
            QuestionKind::Textbox => &[],
            QuestionKind::MultipleChoice { options } | QuestionKind::LikertScale { options } => {
                options
            }
        }
    }
}

/// A question that has passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Question {
    pub text: String,
    pub kind: QuestionKind,
}

/// Question exactly as the issuer sent it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuestionDraft {
    pub text: String,
    pub format: String,
    pub options: Vec<String>,
}

impl From<&Question> for QuestionDraft {
    fn from(question: &Question) -> Self {
        Self {
            text: question.text.clone(),
            format: question.kind.format().as_str().to_string(),
            options: question.kind.options().to_vec(),
        }
    }
}

pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    if char_len(title) < MIN_TITLE_LENGTH {
        return Err(ValidationError::TitleTooShort);
    }
    Ok(())
}

/// Checks a whole question list in order and stops at the first violation.
pub fn validate_questions(drafts: &[QuestionDraft]) -> Result<Vec<Question>, ValidationError> {
    if drafts.is_empty() {
        return Err(ValidationError::EmptySurvey);
    }
    drafts
        .iter()
        .enumerate()
        .map(|(index, draft)| validate_question(index, draft))
        .collect()
}

pub fn validate_question(
    index: usize,
    draft: &QuestionDraft,
) -> Result<Question, ValidationError> {
    if char_len(&draft.text) < MIN_QUESTION_TEXT_LENGTH {
        return Err(ValidationError::QuestionTitleTooShort(index));
    }

    let format =
        QuestionFormat::parse(&draft.format).ok_or(ValidationError::InvalidFormat(index))?;
    let kind = match format {
        QuestionFormat::Textbox => {
            if !draft.options.is_empty() {
                return Err(ValidationError::UnexpectedSpecification(index));
            }
            QuestionKind::Textbox
        }
        QuestionFormat::MultipleChoice => QuestionKind::MultipleChoice {
            options: require_options(index, &draft.options, MIN_MULTIPLE_CHOICE_OPTIONS)?,
        },
        QuestionFormat::LikertScale => QuestionKind::LikertScale {
            options: require_options(index, &draft.options, MIN_LIKERT_SCALE_OPTIONS)?,
        },
    };

    Ok(Question {
        text: draft.text.clone(),
        kind,
    })
}

fn require_options(
    index: usize,
    options: &[String],
    minimum: usize,
) -> Result<Vec<String>, ValidationError> {
    if options.len() < minimum {
        return Err(ValidationError::TooFewOptions { index, minimum });
    }
    Ok(options.to_vec())
}
