use rand::Rng;

/// Generates a 6-digit one-time login code.
pub fn new_otp_code() -> String {
    let code: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{code:06}")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn six_digits() {
        for _ in 0..100 {
            let code = new_otp_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
