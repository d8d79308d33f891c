//! Response validation and run-scoped error reporting

pub mod error_log;
pub mod validator;

pub use error_log::{ErrorKind, ErrorLog, ErrorRecord, ErrorSummary};
pub use validator::{
    evaluate, validate, validate_fields, validate_response_time, validate_status,
    validate_status_in, FieldType, ValidationConfig, ValidationReport,
};
