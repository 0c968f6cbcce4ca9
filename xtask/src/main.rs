use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{exit, Command};

use clap::{Parser, Subcommand, ValueEnum};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const LAMBDA_PACKAGE: &str = "power_tuning_lambda";
const LAMBDA_BINARIES: [&str; 2] = ["initializer_lambda", "finalizer_lambda"];
const ARTIFACT_DIR: &str = "target/lambda";

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace tasks for Lambda power tuning")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// fmt, clippy and tests for every crate
    Ci,
    /// Criterion benchmarks of the selector
    Bench,
    /// Build both Lambda binaries and zip each as a `bootstrap` artifact
    ServerlessPackage {
        #[arg(long, default_value = "x86_64-unknown-linux-gnu")]
        target: String,
        #[arg(value_enum, long, default_value_t = BuildProfile::Release)]
        profile: BuildProfile,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BuildProfile {
    Debug,
    Release,
}

fn cargo(args: &[&str]) {
    eprintln!("+ cargo {}", args.join(" "));
    let status = Command::new("cargo").args(args).status().unwrap_or_else(|error| {
        eprintln!("failed to execute cargo: {error}");
        exit(1)
    });
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn ci() {
    cargo(&["fmt", "--all", "--", "--check"]);
    cargo(&["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"]);
    cargo(&["test", "--workspace"]);
}

fn package(target: &str, profile: BuildProfile) -> Result<Vec<PathBuf>, String> {
    let mut args = vec!["build", "-p", LAMBDA_PACKAGE, "--target", target];
    for bin in LAMBDA_BINARIES {
        args.extend(["--bin", bin]);
    }
    let profile_dir = match profile {
        BuildProfile::Debug => "debug",
        BuildProfile::Release => {
            args.push("--release");
            "release"
        }
    };
    cargo(&args);

    let build_dir = Path::new("target").join(target).join(profile_dir);
    let artifact_dir = Path::new(ARTIFACT_DIR);
    fs::create_dir_all(artifact_dir)
        .map_err(|error| format!("cannot create {}: {error}", artifact_dir.display()))?;

    LAMBDA_BINARIES
        .iter()
        .map(|bin| -> Result<PathBuf, String> {
            let zip_path = artifact_dir.join(format!("{bin}.zip"));
            write_bootstrap_zip(&build_dir.join(bin), &zip_path)?;
            Ok(zip_path)
        })
        .collect()
}

/// The provided.al2023 runtime expects the executable as `bootstrap`.
fn write_bootstrap_zip(binary_path: &Path, zip_path: &Path) -> Result<(), String> {
    let binary = fs::read(binary_path)
        .map_err(|error| format!("cannot read {}: {error}", binary_path.display()))?;
    let file = fs::File::create(zip_path)
        .map_err(|error| format!("cannot create {}: {error}", zip_path.display()))?;

    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);
    let write_error =
        |error: &dyn std::fmt::Display| format!("cannot write {}: {error}", zip_path.display());
    zip.start_file("bootstrap", options)
        .map_err(|error| write_error(&error))?;
    zip.write_all(&binary).map_err(|error| write_error(&error))?;
    zip.finish().map_err(|error| write_error(&error))?;
    Ok(())
}

fn main() {
    match Cli::parse().command {
        Commands::Ci => ci(),
        Commands::Bench => cargo(&["bench", "-p", "power_tuning_core", "--bench", "selection"]),
        Commands::ServerlessPackage { target, profile } => match package(&target, profile) {
            Ok(artifacts) => {
                for artifact in artifacts {
                    eprintln!("packaged {}", artifact.display());
                }
            }
            Err(message) => {
                eprintln!("error: {message}");
                exit(1);
            }
        },
    }
}
