use rand::Rng;

/// Length in bytes of generated nonces.
pub const NONCE_LENGTH: usize = 10;

/// Generates a random request nonce from the thread-local CSPRNG.
///
/// Requests built without a nonce have no replay protection; the TSA response
/// is then only checked against the message imprint and policy.
pub fn generate() -> Vec<u8> {
    let nonce: [u8; NONCE_LENGTH] = rand::rng().random();

    nonce.to_vec()
}
