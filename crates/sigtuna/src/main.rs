#![forbid(unsafe_code)]

//! Sigtuna CLI — secure outbound SOAP messages with WS-Security headers.

use std::error::Error;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use sigtuna_wsse::{secure_message, SigningConfigBuilder};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "sigtuna",
    about = "Sigtuna — WS-Security message securing for SOAP (timestamp, username token, XML signature)",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add WS-Security headers to a SOAP message
    Secure {
        /// Input SOAP XML file
        file: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Add a wsu:Timestamp
        #[arg(long)]
        timestamp: bool,

        /// Timestamp time-to-live in seconds
        #[arg(long, default_value_t = 300)]
        ttl: u32,

        /// Millisecond precision for timestamps
        #[arg(long)]
        millis: bool,

        /// Add a wsse:UsernameToken with this username
        #[arg(long)]
        username: Option<String>,

        /// Password for the username token
        #[arg(long)]
        password: Option<String>,

        /// Add a random nonce to the username token
        #[arg(long)]
        nonce: bool,

        /// Add a wsu:Created to the username token
        #[arg(long)]
        created: bool,

        /// Sign the SOAP Body
        #[arg(long)]
        sign: bool,

        /// Keystore file holding the signing key
        #[arg(long)]
        keystore: Option<PathBuf>,

        /// Keystore type (JKS, JCEKS, PKCS11)
        #[arg(long = "keystore-type", default_value = "JKS")]
        keystore_type: String,

        /// Keystore integrity password
        #[arg(long = "keystore-password")]
        keystore_password: Option<String>,

        /// Alias of the signing key entry
        #[arg(long)]
        alias: Option<String>,

        /// Key entry password (default: keystore password)
        #[arg(long = "key-password")]
        key_password: Option<String>,

        /// How KeyInfo identifies the signing key
        #[arg(long = "key-identifier", default_value = "ISSUER_SERIAL")]
        key_identifier: String,

        /// Canonicalization method for signing
        #[arg(long, default_value = "EXCLUSIVE")]
        c14n: String,

        /// Digest method for signing
        #[arg(long, default_value = "SHA1")]
        digest: String,

        /// Emit only the leaf certificate instead of the full chain
        #[arg(long = "single-cert", action = clap::ArgAction::Set, default_value_t = true)]
        single_cert: bool,
    },

    /// List supported options and algorithms
    Info,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Secure {
            file,
            output,
            timestamp,
            ttl,
            millis,
            username,
            password,
            nonce,
            created,
            sign,
            keystore,
            keystore_type,
            keystore_password,
            alias,
            key_password,
            key_identifier,
            c14n,
            digest,
            single_cert,
        } => cmd_secure(SecureArgs {
            file,
            output,
            timestamp,
            ttl,
            millis,
            username,
            password,
            nonce,
            created,
            sign,
            keystore,
            keystore_type,
            keystore_password,
            alias,
            key_password,
            key_identifier,
            c14n,
            digest,
            single_cert,
        }),

        Commands::Info => cmd_info(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

struct SecureArgs {
    file: PathBuf,
    output: Option<PathBuf>,
    timestamp: bool,
    ttl: u32,
    millis: bool,
    username: Option<String>,
    password: Option<String>,
    nonce: bool,
    created: bool,
    sign: bool,
    keystore: Option<PathBuf>,
    keystore_type: String,
    keystore_password: Option<String>,
    alias: Option<String>,
    key_password: Option<String>,
    key_identifier: String,
    c14n: String,
    digest: String,
    single_cert: bool,
}

fn cmd_secure(args: SecureArgs) -> Result<(), Box<dyn Error>> {
    let xml = read_file(&args.file)?;

    let mut builder = SigningConfigBuilder::new();
    builder
        .enable_timestamp(args.timestamp)
        .timestamp_ttl(args.ttl)
        .timestamp_millis(args.millis);

    if let Some(username) = &args.username {
        builder
            .enable_username_token(true)
            .token_credentials(username, args.password.as_deref().unwrap_or(""))
            .token_nonce(args.nonce)
            .token_created(args.created);
    }

    if args.sign {
        builder.enable_signature(true);
        if let Some(keystore) = &args.keystore {
            builder.keystore(
                keystore,
                &args.keystore_type,
                args.keystore_password.as_deref().unwrap_or(""),
            )?;
        }
        if let Some(alias) = &args.alias {
            builder.key_alias(alias);
        }
        if let Some(key_password) = &args.key_password {
            builder.key_password(key_password);
        }
        builder.key_identifier_type(&args.key_identifier)?;
        builder.canonicalization_method(&args.c14n)?;
        builder.digest_method(&args.digest)?;
        builder.single_certificate(args.single_cert);
    }

    let secured = secure_message(&xml, &builder.build())?;
    write_output(args.output, secured.as_bytes())
}

fn cmd_info() -> Result<(), Box<dyn Error>> {
    println!("Sigtuna — WS-Security message securing for SOAP");
    println!();
    println!("Security features (applied in this order):");
    println!("  wsu:Timestamp");
    println!("  wsse:UsernameToken (PasswordText, optional nonce and created)");
    println!("  ds:Signature over the SOAP Body");
    println!();
    println!("Keystore types:");
    println!("  {}", sigtuna_wsse::config::VALID_KEY_STORE_TYPES);
    println!();
    println!("Key identifier types:");
    println!("  {}", sigtuna_wsse::config::VALID_KEY_IDENTIFIER_TYPES);
    println!();
    println!("Canonicalization methods:");
    println!("  {}", sigtuna_wsse::config::VALID_CANONICALIZATION_METHODS);
    println!();
    println!("Digest methods:");
    println!("  {}", sigtuna_wsse::config::VALID_DIGEST_METHODS);
    println!();
    println!("Signature keys:");
    println!("  RSA PKCS#1 v1.5, ECDSA P-256/P-384");
    Ok(())
}

// ── Utility functions ────────────────────────────────────────────────

fn read_file(path: &PathBuf) -> Result<String, Box<dyn Error>> {
    std::fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()).into())
}

fn write_output(path: Option<PathBuf>, data: &[u8]) -> Result<(), Box<dyn Error>> {
    match path {
        Some(p) => std::fs::write(&p, data).map_err(|e| format!("{}: {e}", p.display()).into()),
        None => {
            use std::io::Write;
            std::io::stdout()
                .write_all(data)
                .map_err(|e| format!("stdout: {e}").into())
        }
    }
}
