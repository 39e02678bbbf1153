pub mod region_check;
pub mod token_validator;
