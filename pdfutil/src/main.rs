use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::error;
use pdfprotect::{BitLayout, EncryptionStrength, Error, Permission, PermissionPolicy, ProtectOptions, Protector};

#[derive(Parser, Debug)]
#[command(name = "pdfprotect", version, about = "Protect a PDF document with passwords and permissions")]
struct Args {
    /// PDF document to protect
    input: PathBuf,

    /// Output file (default: protected_<input name> in the current directory)
    #[arg(short, long, value_name = "output file")]
    output: Option<PathBuf>,

    /// Permissions to allow, on top of the defaults (print, fill, accessibility)
    #[arg(long, value_name = "permissions", value_delimiter = ',')]
    allow: Vec<Permission>,

    /// Permissions to deny; applied after --allow
    #[arg(long, value_name = "permissions", value_delimiter = ',')]
    deny: Vec<Permission>,

    /// Password needed to open the file; empty opens without a password
    #[arg(long, env = "PDFPROTECT_USER_PASSWORD", default_value = "", hide_env_values = true)]
    user_password: String,

    /// Password needed to change the permissions (required)
    #[arg(long, env = "PDFPROTECT_OWNER_PASSWORD", hide_env_values = true)]
    owner_password: String,

    /// Cipher: rc4-40, rc4-128, aes-128 or aes-256
    #[arg(long, default_value = "aes-128")]
    strength: EncryptionStrength,

    /// Encode permissions as a legacy bitmask instead of named permissions
    #[arg(long)]
    bitmask: bool,

    /// Copy bit of the legacy bitmask: standard (0x10) or annotation-aliased (0x20)
    #[arg(long, default_value = "standard")]
    copy_bit: BitLayout,

    /// Store streams without compressing them
    #[arg(long)]
    no_compress: bool,

    /// Overwrite the output file if it already exists
    #[arg(short, long)]
    force: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    if !args
        .input
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
    {
        eprintln!("{} is not a .pdf file.", args.input.display());
        return ExitCode::FAILURE;
    }
    if !args.input.exists() {
        eprintln!("File not found: {}", args.input.display());
        return ExitCode::FAILURE;
    }

    let options = ProtectOptions::builder()
        .strength(args.strength)
        .bit_layout(args.copy_bit)
        .compress(!args.no_compress)
        .build();
    let engine = match pdfprotect::engine::resolve("lopdf", options) {
        Ok(engine) if args.bitmask => engine.without_vocabulary(),
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    let protector = Protector::new(engine);

    // Reject unreadable input before doing anything with the passwords.
    if let Err(err) = protector.validate(&args.input) {
        error!("{err}");
        eprintln!("The file cannot be opened as a PDF.");
        return ExitCode::FAILURE;
    }

    if args.owner_password.is_empty() {
        eprintln!("The owner password must not be empty.");
        return ExitCode::FAILURE;
    }

    let policy = build_policy(&args.allow, &args.deny);
    println!("=== Permissions ===");
    print!("{policy}");
    if args.user_password.is_empty() {
        println!("- User password: none (the file opens without a password)");
    } else {
        println!("- User password: set");
    }
    println!("- Owner password: set (not shown)");

    let output = match args.output {
        Some(output) => output,
        None => match default_output_path(&args.input, args.force) {
            Some(output) => output,
            None => {
                eprintln!("{} has no file name.", args.input.display());
                return ExitCode::FAILURE;
            }
        },
    };
    if output.exists() && !args.force {
        eprintln!("{} already exists; use --force to overwrite it.", output.display());
        return ExitCode::FAILURE;
    }

    match protector.protect(&args.input, &output, &args.user_password, &args.owner_password, &policy) {
        Ok(report) => {
            println!("\nSaved {} ({} pages).", report.destination.display(), report.page_count);
            if !report.permissions_applied() {
                println!("Warning: the PDF engine did not accept the permission settings; only the passwords were applied.");
            }
            println!("\nNotes:");
            println!("- PDF permissions are advisory and some readers or tools ignore them.");
            println!("- For highly sensitive material use DRM or a controlled viewer.");
            println!("- Keep the owner password safe; anyone holding it can change the settings.");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", diagnostic(&err));
            if err.is_settings_error() {
                eprintln!("Check the passwords and the --strength option, then try again.");
            }
            ExitCode::FAILURE
        }
    }
}

fn build_policy(allow: &[Permission], deny: &[Permission]) -> PermissionPolicy {
    let policy = allow
        .iter()
        .fold(PermissionPolicy::default(), |policy, permission| policy.with(*permission, true));
    deny.iter().fold(policy, |policy, permission| policy.with(*permission, false))
}

/// `protected_<name>` in the current directory, or the first free
/// `protected_<i>_<name>` when that exists and overwriting was not requested.
fn default_output_path(input: &Path, overwrite: bool) -> Option<PathBuf> {
    let name = input.file_name()?.to_string_lossy();
    let candidate = PathBuf::from(format!("protected_{name}"));
    if overwrite || !candidate.exists() {
        return Some(candidate);
    }
    (1..)
        .map(|i| PathBuf::from(format!("protected_{i}_{name}")))
        .find(|path| !path.exists())
}

fn diagnostic(err: &Error) -> String {
    match err {
        Error::UnreadableDocument { .. } => format!("The file cannot be read: {err}"),
        Error::Credential(reason) => format!("The password was rejected: {reason}"),
        Error::EncryptionExhausted { .. } => format!("The PDF engine rejected the protection settings: {err}"),
        Error::Write { .. } => format!("Failed to save the file: {err}"),
        _ => err.to_string(),
    }
}
