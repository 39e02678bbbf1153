use std::time::Duration;

use thiserror::Error;

/// Failure reported by one of the collaborator ports (cache, durable store,
/// user center, region oracle). The validator decides which [`AuthError`]
/// kind it becomes based on the call site.
#[derive(Error, Debug)]
pub enum PortError {
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    #[error("cache backend error: {0}")]
    Cache(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("remote call failed: {0}")]
    Remote(String),

    #[error("payload codec error: {0}")]
    Codec(String),
}

pub type PortResult<T> = Result<T, PortError>;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid input: {0}")]
    InputParamInvalid(String),

    #[error("No client application configured for app id {0}")]
    UserCenterConfNotFound(String),

    #[error("Reading the token cache failed")]
    ReadRedisFailed(#[source] PortError),

    #[error("Reading the token store failed")]
    ReadDbFailed(#[source] PortError),

    #[error("Token is no longer valid")]
    OldToken,

    #[error("User center rejected the token")]
    AuthTokenFromUserCenterFailed,

    #[error("Looking up the user's region failed")]
    RegionLookupFailed(#[source] PortError),

    #[error("User data is served from region {authoritative}, not {serving}")]
    UserCreditNotInCurrentRegion {
        serving: String,
        authoritative: String,
    },

    #[error("Writing the token store failed")]
    WriteDbFailed(#[source] PortError),

    #[error("Writing the token cache failed")]
    WriteRedisFailed(#[source] PortError),
}

impl AuthError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AuthError::InputParamInvalid(_) => ErrorCode::InputParamInvalid,
            AuthError::UserCenterConfNotFound(_) => ErrorCode::UserCenterConfNotFound,
            AuthError::ReadRedisFailed(_) => ErrorCode::ReadRedisFailed,
            AuthError::ReadDbFailed(_) => ErrorCode::ReadDbFailed,
            AuthError::OldToken => ErrorCode::OldToken,
            AuthError::AuthTokenFromUserCenterFailed => ErrorCode::AuthTokenFromUserCenterFailed,
            AuthError::RegionLookupFailed(_) => ErrorCode::RegionLookupFailed,
            AuthError::UserCreditNotInCurrentRegion { .. } => {
                ErrorCode::UserCreditNotInCurrentRegion
            }
            AuthError::WriteDbFailed(_) => ErrorCode::WriteDbFailed,
            AuthError::WriteRedisFailed(_) => ErrorCode::WriteRedisFailed,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    InputParamInvalid,
    UserCenterConfNotFound,
    ReadRedisFailed,
    ReadDbFailed,
    OldToken,
    AuthTokenFromUserCenterFailed,
    RegionLookupFailed,
    UserCreditNotInCurrentRegion,
    WriteDbFailed,
    WriteRedisFailed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InputParamInvalid => "INPUT_PARAM_INVALID",
            ErrorCode::UserCenterConfNotFound => "USER_CENTER_CONF_NOT_FOUND",
            ErrorCode::ReadRedisFailed => "READ_REDIS_FAILED",
            ErrorCode::ReadDbFailed => "READ_DB_FAILED",
            ErrorCode::OldToken => "OLD_TOKEN",
            ErrorCode::AuthTokenFromUserCenterFailed => "AUTH_TOKEN_FROM_USER_CENTER_FAILED",
            ErrorCode::RegionLookupFailed => "REGION_LOOKUP_FAILED",
            ErrorCode::UserCreditNotInCurrentRegion => "USER_CREDIT_NOT_IN_CURRENT_REGION",
            ErrorCode::WriteDbFailed => "WRITE_DB_FAILED",
            ErrorCode::WriteRedisFailed => "WRITE_REDIS_FAILED",
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
