use ofrep_provider::{ErrorCode, OfrepError};

#[test]
fn test_error_code_string_values() {
    assert_eq!(ErrorCode::NetworkError.as_str(), "NETWORK_ERROR");
    assert_eq!(ErrorCode::NetworkTimeout.as_str(), "NETWORK_TIMEOUT");
    assert_eq!(ErrorCode::InvalidResponse.as_str(), "INVALID_RESPONSE");
    assert_eq!(ErrorCode::UnexpectedStatus.as_str(), "UNEXPECTED_STATUS");

    assert_eq!(ErrorCode::Unauthorized.as_str(), "UNAUTHORIZED");
    assert_eq!(ErrorCode::Forbidden.as_str(), "FORBIDDEN");
    assert_eq!(ErrorCode::RateLimited.as_str(), "RATE_LIMITED");

    assert_eq!(ErrorCode::ProviderNotReady.as_str(), "PROVIDER_NOT_READY");
    assert_eq!(ErrorCode::ParseError.as_str(), "PARSE_ERROR");
    assert_eq!(ErrorCode::TargetingKeyMissing.as_str(), "TARGETING_KEY_MISSING");
    assert_eq!(ErrorCode::InvalidContext.as_str(), "INVALID_CONTEXT");
    assert_eq!(ErrorCode::FlagNotFound.as_str(), "FLAG_NOT_FOUND");
    assert_eq!(ErrorCode::TypeMismatch.as_str(), "TYPE_MISMATCH");
    assert_eq!(ErrorCode::General.as_str(), "GENERAL");

    assert_eq!(ErrorCode::NoEventToSend.as_str(), "NO_EVENT_TO_SEND");
    assert_eq!(ErrorCode::ConfigInvalidEndpoint.as_str(), "CONFIG_INVALID_ENDPOINT");
    assert_eq!(ErrorCode::ProviderFatal.as_str(), "PROVIDER_FATAL");
}

#[test]
fn test_remote_codes_round_trip_through_as_str() {
    for code in [
        ErrorCode::ProviderNotReady,
        ErrorCode::ParseError,
        ErrorCode::TargetingKeyMissing,
        ErrorCode::InvalidContext,
        ErrorCode::FlagNotFound,
        ErrorCode::TypeMismatch,
        ErrorCode::General,
    ] {
        assert_eq!(ErrorCode::from_remote(code.as_str()), code);
    }
}

#[test]
fn test_recoverable_errors() {
    assert!(ErrorCode::NetworkError.is_recoverable());
    assert!(ErrorCode::NetworkTimeout.is_recoverable());
    assert!(ErrorCode::UnexpectedStatus.is_recoverable());
    assert!(ErrorCode::RateLimited.is_recoverable());
    assert!(ErrorCode::ProviderNotReady.is_recoverable());
}

#[test]
fn test_non_recoverable_errors() {
    assert!(!ErrorCode::Unauthorized.is_recoverable());
    assert!(!ErrorCode::Forbidden.is_recoverable());
    assert!(!ErrorCode::ConfigInvalidEndpoint.is_recoverable());
    assert!(!ErrorCode::TypeMismatch.is_recoverable());
    assert!(!ErrorCode::ProviderFatal.is_recoverable());
}

#[test]
fn test_only_auth_errors_are_fatal() {
    assert!(ErrorCode::Unauthorized.is_fatal());
    assert!(ErrorCode::Forbidden.is_fatal());
    assert!(!ErrorCode::RateLimited.is_fatal());
    assert!(!ErrorCode::UnexpectedStatus.is_fatal());
    assert!(!ErrorCode::ProviderFatal.is_fatal());
}

#[test]
fn test_evaluation_errors() {
    assert!(ErrorCode::FlagNotFound.is_evaluation_error());
    assert!(ErrorCode::TypeMismatch.is_evaluation_error());
    assert!(ErrorCode::InvalidContext.is_evaluation_error());
    assert!(!ErrorCode::NetworkError.is_evaluation_error());
    assert!(!ErrorCode::NoEventToSend.is_evaluation_error());
}

#[test]
fn test_error_display() {
    let error = OfrepError::new(ErrorCode::UnexpectedStatus, "Server Error: 500");
    assert_eq!(format!("{}", error), "[UNEXPECTED_STATUS] Server Error: 500");
    assert_eq!(format!("{}", ErrorCode::RateLimited), "RATE_LIMITED");
}

#[test]
fn test_rate_limited_without_deadline() {
    let error = OfrepError::rate_limited(None);
    assert_eq!(error.code, ErrorCode::RateLimited);
    assert!(error.retry_after.is_none());
    assert!(error.is_network_error());
}

#[test]
fn test_not_ready_and_lookup_errors() {
    assert_eq!(OfrepError::not_ready().code, ErrorCode::ProviderNotReady);
    assert_eq!(OfrepError::flag_not_found("x").code, ErrorCode::FlagNotFound);
    assert_eq!(OfrepError::type_mismatch("x").code, ErrorCode::TypeMismatch);
}
