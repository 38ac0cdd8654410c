//! `gatekeep hash-password`: produce the argon2id PHC string the server
//! expects in `auth.admin_password_hash`.
//!
//! The password is read from stdin so it stays out of shell history.

use std::io::{self, BufRead, Write};

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHasher, SaltString};

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    if password.is_empty() {
        anyhow::bail!("Password must not be empty");
    }
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;
    Ok(hash.to_string())
}

/// Read one line from `input`, without its line terminator.
fn read_password(input: &mut impl BufRead) -> anyhow::Result<String> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub fn run() -> anyhow::Result<()> {
    let password = read_password(&mut io::stdin().lock())?;
    let hash = hash_password(&password)?;
    writeln!(io::stdout(), "{hash}")?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use argon2::password_hash::{PasswordHash, PasswordVerifier};

    use super::*;

    #[test]
    fn hash_is_argon2id_and_verifies() {
        let hash = hash_password("open sesame").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(
            Argon2::default()
                .verify_password(b"open sesame", &parsed)
                .is_ok()
        );
    }

    #[test]
    fn empty_password_is_rejected() {
        assert!(hash_password("").is_err());
    }

    #[test]
    fn trailing_newline_is_stripped() {
        let mut input = io::Cursor::new(b"pa ss\r\n".to_vec());
        assert_eq!(read_password(&mut input).unwrap(), "pa ss");
    }
}
