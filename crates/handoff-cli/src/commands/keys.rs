//! Key management commands.
//!
//! `handoff keys generate` - Generate a new RSA keypair.

use handoff_token::KeyPair;
use std::fs;
use std::path::PathBuf;

/// Generate a new RSA keypair.
pub fn generate(output: Option<PathBuf>, bits: usize) -> anyhow::Result<()> {
    let keypair = KeyPair::generate(bits)?;

    if let Some(output_dir) = output {
        // Create output directory if it doesn't exist
        fs::create_dir_all(&output_dir)?;

        let private_path = output_dir.join("private.pem");
        let public_path = output_dir.join("public.pem");
        keypair.save_to_files(&private_path, &public_path)?;

        println!("✔ Generated {}-bit RSA keypair:", bits);
        println!("  Private key: {}", private_path.display());
        println!("  Public key:  {}", public_path.display());
        println!();
        println!("⚠️  The private key belongs on the validating server only.");
        println!("   The system of record that issues tokens needs just the public key.");
        println!();
        println!("Set as environment variables:");
        println!(
            "  export HANDOFF_PRIVATE_KEY=\"$(cat {})\"",
            private_path.display()
        );
        println!(
            "  export HANDOFF_PUBLIC_KEY=\"$(cat {})\"",
            public_path.display()
        );
    } else {
        // Print to stdout
        println!("{}", keypair.private_key_pem()?);
        println!("{}", keypair.public_key_pem()?);
        println!("Use --output <dir> to save keys to files.");
    }

    Ok(())
}
