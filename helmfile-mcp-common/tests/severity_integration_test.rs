//! Integration tests for the Severity classification of HelmfileMcpError

use helmfile_mcp_common::{ErrorSeverity, HelmfileMcpError, Severity};

#[test]
fn test_severity_levels_are_distinct() {
    assert_ne!(ErrorSeverity::Warning, ErrorSeverity::Error);
    assert_ne!(ErrorSeverity::Error, ErrorSeverity::Critical);
    assert_ne!(ErrorSeverity::Warning, ErrorSeverity::Critical);
}

#[test]
fn test_configuration_errors_are_critical() {
    let error = HelmfileMcpError::configuration("bad config");
    assert_eq!(
        error.severity(),
        ErrorSeverity::Critical,
        "Expected Critical severity for: {}",
        error
    );
}
