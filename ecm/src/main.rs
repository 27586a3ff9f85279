use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use cdrom_ecm::{decode, encode, DecodeReport, EcmError, EncodeReport};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;
use miette::{Diagnostic, Result};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
enum EcmCliError {
    #[error("unable to determine the filename portion of {path}")]
    NoFilename { path: String },

    #[error("output file {path} already exists")]
    #[diagnostic(help("pass --force to overwrite it"))]
    WouldOverwrite { path: String },

    #[error(transparent)]
    Codec(#[from] EcmError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = "Strip or rebuild the deterministic sync/address/EDC/ECC fields of raw CD-ROM sector images"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Strip deterministic fields from a raw disc image (bin2ecm)
    Encode {
        input: String,
        output: Option<String>,
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Rebuild a raw disc image from an ECM file (ecm2bin)
    Decode {
        input: String,
        output: Option<String>,
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

/// Appends `.ecm` to `input`, preserving its existing extension.
fn derive_encode_output(input: &str) -> Result<PathBuf, EcmCliError> {
    let path = Path::new(input);
    let Some(name) = path.file_name() else {
        return Err(EcmCliError::NoFilename {
            path: input.to_string(),
        });
    };
    let mut appended = name.to_os_string();
    appended.push(".ecm");
    Ok(path.with_file_name(appended))
}

/// Strips a case-insensitive trailing `.ecm`, or appends `.unecm` if there
/// isn't one to strip.
fn derive_decode_output(input: &str) -> Result<PathBuf, EcmCliError> {
    let path = Path::new(input);
    if path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("ecm"))
        .unwrap_or(false)
    {
        return Ok(path.with_extension(""));
    }
    let Some(name) = path.file_name() else {
        return Err(EcmCliError::NoFilename {
            path: input.to_string(),
        });
    };
    let mut appended = name.to_os_string();
    appended.push(".unecm");
    Ok(path.with_file_name(appended))
}

fn open_output(path: &Path, force: bool) -> Result<File, EcmCliError> {
    if !force && path.exists() {
        return Err(EcmCliError::WouldOverwrite {
            path: path.display().to_string(),
        });
    }
    Ok(File::create(path)?)
}

fn report_encode(path: &Path, report: &EncodeReport) {
    info!(
        "{}: {} literal bytes, {} mode 1 sectors, {} mode 2 form 1 sectors, {} mode 2 form 2 sectors",
        path.display(),
        report.literal_bytes,
        report.mode1_sectors,
        report.mode2_form1_sectors,
        report.mode2_form2_sectors,
    );
    info!(
        "{} input bytes -> {} output bytes",
        report.input_bytes, report.output_bytes
    );
}

fn report_decode(path: &Path, report: &DecodeReport) {
    info!(
        "{}: {} literal bytes, {} mode 1 sectors, {} mode 2 form 1 sectors, {} mode 2 form 2 sectors",
        path.display(),
        report.literal_bytes,
        report.mode1_sectors,
        report.mode2_form1_sectors,
        report.mode2_form2_sectors,
    );
    info!("{} output bytes", report.output_bytes);
}

fn main() -> Result<(), miette::Report> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    work()?;
    Ok(())
}

fn work() -> Result<(), EcmCliError> {
    let args = Args::parse();

    match args.command {
        Command::Encode {
            input,
            output,
            force,
        } => {
            let out_path = match output {
                Some(o) => PathBuf::from(o),
                None => derive_encode_output(&input)?,
            };
            let in_len = std::fs::metadata(&input)?.len();
            let in_file = BufReader::new(File::open(&input)?);
            let out_file = BufWriter::new(open_output(&out_path, force)?);
            let report = encode(in_file, in_len, out_file)?;
            report_encode(&out_path, &report);
            println!("Wrote {}", out_path.display());
        }
        Command::Decode {
            input,
            output,
            force,
        } => {
            let out_path = match output {
                Some(o) => PathBuf::from(o),
                None => derive_decode_output(&input)?,
            };
            let in_file = BufReader::new(File::open(&input)?);
            let out_file = BufWriter::new(open_output(&out_path, force)?);
            let report = decode(in_file, out_file)?;
            report_decode(&out_path, &report);
            println!("Wrote {}", out_path.display());
        }
    }

    Ok(())
}
