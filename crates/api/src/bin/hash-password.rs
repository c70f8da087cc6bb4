//! Password hashing utility for Authgate
//!
//! Generates a salt and salted SHA-256 digest for seeding accounts by hand
//! (for example the first admin) without storing plaintext.
//!
//! Usage:
//!   cargo run --bin hash-password
//!   cargo run --bin hash-password "MySecurePassword123!"

use std::env;
use std::io::{self, Write};

use authgate_api::auth::password::new_credential;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let password = if let Some(pwd) = env::args().nth(1) {
        pwd
    } else {
        // Read from stdin so the password stays out of the process list
        print!("Enter password to hash: ");
        io::stdout().flush()?;

        let mut password = String::new();
        io::stdin().read_line(&mut password)?;
        password.trim_end_matches(['\r', '\n']).to_string()
    };

    if password.is_empty() {
        eprintln!("Error: Password cannot be empty");
        std::process::exit(1);
    }

    let (password_hash, salt) = new_credential(&password);

    println!("\n===========================================");
    println!("salt:     {}", salt);
    println!("password: {}", password_hash);
    println!("===========================================\n");

    println!("Example SQL:");
    println!(
        "INSERT INTO user_account (username, password, salt, role) VALUES ('admin', '{}', '{}', 'admin');",
        password_hash, salt
    );

    Ok(())
}
