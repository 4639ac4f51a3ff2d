use crate::error::ApiError;
use crate::observability;
use validator::Validate;

pub fn validate<T: Validate>(value: &T) -> Result<(), ApiError> {
    value.validate().map_err(|err| {
        observability::register_validation_failure("payload_bounds");
        ApiError::Validation(err.to_string())
    })?;
    Ok(())
}
