use rstest::rstest;

use crate::error::AppError;

#[rstest]
#[case(AppError::Unauthorized("test".into()), 401, "UNAUTHORIZED")]
#[case(AppError::Forbidden("test".into()), 403, "FORBIDDEN")]
#[case(AppError::NotFound("test".into()), 404, "NOT_FOUND")]
#[case(AppError::Validation("test".into()), 400, "VALIDATION_ERROR")]
#[case(
    AppError::ProviderResolution("test".into()),
    500,
    "PROVIDER_RESOLUTION_FAILED"
)]
#[case(AppError::Unavailable("test".into()), 503, "SERVICE_UNAVAILABLE")]
#[case(AppError::ExternalService("test".into()), 502, "EXTERNAL_SERVICE_ERROR")]
#[case(AppError::Internal("test".into()), 500, "INTERNAL_ERROR")]
fn test_app_error_status_and_code(
    #[case] error: AppError,
    #[case] status: u16,
    #[case] code: &str,
) {
    assert_eq!(error.status_code(), status);
    assert_eq!(error.error_code(), code);
}

#[test]
fn test_app_error_display() {
    assert_eq!(
        format!("{}", AppError::Unauthorized("msg".into())),
        "Authentication failed: msg"
    );
    assert_eq!(
        format!("{}", AppError::NotFound("msg".into())),
        "Not found: msg"
    );
    assert_eq!(
        format!("{}", AppError::ProviderResolution("msg".into())),
        "Provider resolution failed: msg"
    );
    assert_eq!(
        format!("{}", AppError::Unavailable("msg".into())),
        "Service unavailable: msg"
    );
}
