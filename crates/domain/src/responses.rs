use crate::error::ValidationError;
use crate::questions::{Question, QuestionKind};
use crate::util::char_len;

const MIN_RESPONDENT_NAME_LENGTH: usize = 3;
const MIN_TEXTBOX_ANSWER_LENGTH: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SurveyResponse {
    pub respondent_name: String,
    pub answers: Vec<String>,
    pub submitted_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct ResponseSubmission {
    pub respondent_name: String,
    pub answers: Vec<String>,
}

/// Checks a response against the question list as it stands right now.
pub fn validate_response(
    response: &SurveyResponse,
    questions: &[Question],
) -> Result<(), ValidationError> {
    if char_len(&response.respondent_name) < MIN_RESPONDENT_NAME_LENGTH {
        return Err(ValidationError::NameTooShort);
    }
    if response.answers.is_empty() {
        return Err(ValidationError::EmptyResponse);
    }
    if response.answers.len() != questions.len() {
        return Err(ValidationError::AnswerCountMismatch {
            expected: questions.len(),
            actual: response.answers.len(),
        });
    }

    for (index, (question, answer)) in questions.iter().zip(&response.answers).enumerate() {
        match &question.kind {
            QuestionKind::Textbox => {
                if char_len(answer) < MIN_TEXTBOX_ANSWER_LENGTH {
                    return Err(ValidationError::AnswerTooShort(index));
                }
            }
            QuestionKind::MultipleChoice { options } | QuestionKind::LikertScale { options } => {
                if !options.iter().any(|option| option == answer) {
                    return Err(ValidationError::AnswerNotAnOption {
                        question_number: index + 1,
                    });
                }
            }
        }
    }

    Ok(())
}
