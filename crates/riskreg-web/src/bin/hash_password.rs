//! Prints an Argon2 hash for a `[[login.directory.users]]` entry.

use std::io::{self, Write};

use riskreg_core::directory::static_dir::hash_password;

fn main() -> anyhow::Result<()> {
    eprint!("Enter password: ");
    io::stderr().flush()?;

    let mut password = String::new();
    io::stdin().read_line(&mut password)?;
    let password = password.trim_end_matches(['\r', '\n']);

    if password.is_empty() {
        anyhow::bail!("Password cannot be empty");
    }

    println!("{}", hash_password(password)?);
    Ok(())
}
