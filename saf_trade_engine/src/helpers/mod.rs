mod contract_number;
mod otp_code;

pub use contract_number::{new_contract_number, CONTRACT_NUMBER_ATTEMPTS};
pub use otp_code::new_otp_code;
