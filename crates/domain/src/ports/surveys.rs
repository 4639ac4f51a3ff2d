use crate::DomainResult;
use crate::ports::BoxFuture;
use crate::responses::SurveyResponse;
use crate::surveys::Survey;
use crate::token::SurveyToken;

/// Document store for surveys and their responses.
///
/// Writes that follow a read carry the revision that was read; a store whose
/// document has moved on reports `DomainError::Conflict` and writes nothing.
pub trait SurveyRepository: Send + Sync {
    /// Inserts a new survey. Fails with `Conflict` when the token is taken.
    fn create(&self, survey: &Survey) -> BoxFuture<'_, DomainResult<Survey>>;

    fn get_by_token(&self, token: &SurveyToken) -> BoxFuture<'_, DomainResult<Option<Survey>>>;

    /// Replaces title and questions. `survey.revision` is the new revision.
    fn update(
        &self,
        survey: &Survey,
        expected_revision: u64,
    ) -> BoxFuture<'_, DomainResult<Survey>>;

    /// Removes the survey and its responses. Returns `false` when nothing matched.
    fn delete(&self, token: &SurveyToken) -> BoxFuture<'_, DomainResult<bool>>;

    fn append_response(
        &self,
        token: &SurveyToken,
        expected_revision: u64,
        response: &SurveyResponse,
    ) -> BoxFuture<'_, DomainResult<()>>;

    /// `None` when the survey does not exist.
    fn list_responses(
        &self,
        token: &SurveyToken,
    ) -> BoxFuture<'_, DomainResult<Option<Vec<SurveyResponse>>>>;
}
