//! Reference-file creation command-line interface.
//!
//! Reads an input file describing shell quartets, primitive quartets or
//! Boys arguments, computes every entry to the requested number of decimal
//! digits, and writes the reference file.

use clap::Parser;
use color_eyre::eyre::Result;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

use refint::dispatch::PrecisionPolicy;
use refint::kernels::Eri;
use refint::verify::{create_boys_test, create_integral_test, create_single_test};

/// Create a reference file of precision-verified integral values
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input file describing what to compute
    #[arg(long)]
    infile: PathBuf,

    /// Path of the reference file to write
    #[arg(long)]
    outfile: PathBuf,

    /// Integral family: boys, eri or eri_single
    #[arg(long)]
    integral: String,

    /// Significant decimal digits to store per value
    #[arg(long)]
    ndigits: usize,

    /// Working-precision ceiling in bits
    #[arg(long, default_value_t = 16384)]
    max_prec: u32,
}

fn main() -> ExitCode {
    if let Err(e) = color_eyre::install() {
        eprintln!("{}", e);
        return ExitCode::from(1);
    }
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // clap would exit 2 here; argument errors are plain failures
            let _ = e.print();
            return ExitCode::from(if e.exit_code() == 0 { 0 } else { 1 });
        }
    };
    let policy = PrecisionPolicy {
        max_working_bits: args.max_prec,
        ..PrecisionPolicy::default()
    };
    // the header records how the file was produced
    let header = format!(
        "Generated by refint-create\nintegral: {}  ndigits: {}",
        args.integral, args.ndigits
    );

    let run: Result<()> = match args.integral.as_str() {
        "boys" => create_boys_test(&args.infile, &args.outfile, args.ndigits, &header, &policy),
        "eri" => create_integral_test(
            &args.infile,
            &args.outfile,
            args.ndigits,
            &header,
            &Eri,
            &policy,
        ),
        "eri_single" => create_single_test(
            &args.infile,
            &args.outfile,
            args.ndigits,
            &header,
            &Eri,
            &policy,
        ),
        other => {
            error!("unknown integral family \"{}\"", other);
            return ExitCode::from(3);
        }
    };

    match run {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("creation failed: {:#}", e);
            ExitCode::from(1)
        }
    }
}
