use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("invalid token")]
    BadToken,
    #[error("survey not found")]
    NotFound,
    #[error("no responses")]
    EmptyResult,
    #[error("conflict")]
    Conflict,
    #[error("store operation failed: {0}")]
    Store(String),
}

/// Rule violations reported back to the caller. Question positions are
/// 0-based indices, except `AnswerNotAnOption` which carries the 1-based
/// number shown to respondents.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("the survey title must have at least 3 characters")]
    TitleTooShort,
    #[error("cannot be an empty survey")]
    EmptySurvey,
    #[error("the title of question {} must have at least 3 characters", .0 + 1)]
    QuestionTitleTooShort(usize),
    #[error("invalid question format for question {}", .0 + 1)]
    InvalidFormat(usize),
    #[error("textbox question {} should not have options", .0 + 1)]
    UnexpectedSpecification(usize),
    #[error("question {} should have at least {minimum} options", .index + 1)]
    TooFewOptions { index: usize, minimum: usize },
    #[error("invalid question number")]
    InvalidQuestionNumber,
    #[error("your name must have at least 3 characters")]
    NameTooShort,
    #[error("empty responses are not allowed")]
    EmptyResponse,
    #[error("expected {expected} answers but got {actual}")]
    AnswerCountMismatch { expected: usize, actual: usize },
    #[error("the answer to question {} must have at least 3 characters", .0 + 1)]
    AnswerTooShort(usize),
    #[error("answer is not an option for question {question_number}")]
    AnswerNotAnOption { question_number: usize },
}

impl ValidationError {
    pub fn reason_code(&self) -> &'static str {
        match self {
            ValidationError::TitleTooShort => "title_too_short",
            ValidationError::EmptySurvey => "empty_survey",
            ValidationError::QuestionTitleTooShort(_) => "question_title_too_short",
            ValidationError::InvalidFormat(_) => "invalid_format",
            ValidationError::UnexpectedSpecification(_) => "unexpected_specification",
            ValidationError::TooFewOptions { .. } => "too_few_options",
            ValidationError::InvalidQuestionNumber => "invalid_question_number",
            ValidationError::NameTooShort => "name_too_short",
            ValidationError::EmptyResponse => "empty_response",
            ValidationError::AnswerCountMismatch { .. } => "answer_count_mismatch",
            ValidationError::AnswerTooShort(_) => "answer_too_short",
            ValidationError::AnswerNotAnOption { .. } => "answer_not_an_option",
        }
    }
}
