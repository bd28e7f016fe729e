/// Authentication and authorization
///
/// - `password`: Argon2id hashing and verification
/// - `session`: opaque-token session issuance and validation
/// - `guard`: the ownership/role predicate gating every mutation

pub mod guard;
pub mod password;
pub mod session;
