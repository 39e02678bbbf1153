pub mod cached_token;
pub mod login_request;
pub mod token_record;
pub mod user_profile;
