//! Pairing codes used by channel adapters to claim a session.

use rand::Rng;

/// Generate a numeric pairing code.
pub fn generate_pairing_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length).map(|_| rng.gen_range(0..10).to_string()).collect()
}

/// Check a user-provided code against the expected one.
pub fn verify_pairing_code(expected: &str, provided: &str) -> bool {
    expected == provided
}
