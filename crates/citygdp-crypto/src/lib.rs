/// CityGDP Crypto Library
///
/// Password hashing for the credential store. Argon2id with a random salt per
/// hash, encoded as a PHC string so the salt and cost travel with the hash.

pub mod password;
