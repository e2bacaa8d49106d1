//! Reference-file verification command-line interface.
//!
//! Recomputes every entry of a reference file in the chosen float mode and
//! compares against the stored values. Exits nonzero when any comparison
//! fails.

use clap::Parser;
use color_eyre::eyre::Result;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

use refint::dispatch::PrecisionPolicy;
use refint::kernels::Eri;
use refint::verify::{run_boys_test, run_integral_test, run_single_test, FloatMode, TestReport};

/// Verify a reference file of precision-verified integral values
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the reference file to verify
    #[arg(long)]
    file: PathBuf,

    /// Integral family: boys, eri or eri_single
    #[arg(long)]
    integral: String,

    /// Float mode to verify with
    #[arg(long, value_enum, default_value = "interval")]
    float: FloatMode,

    /// Accuracy to test, in bits (interval mode only)
    #[arg(long, default_value_t = 64)]
    prec: u32,

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

    let run: Result<TestReport> = match args.integral.as_str() {
        "boys" => run_boys_test(&args.file, args.float, args.prec, &policy),
        "eri" => run_integral_test(&args.file, &Eri, args.float, args.prec, &policy),
        "eri_single" => run_single_test(&args.file, &Eri, args.float, args.prec, &policy),
        other => {
            error!("unknown integral family \"{}\"", other);
            return ExitCode::from(3);
        }
    };

    match run {
        Ok(report) => {
            println!("{} comparisons, {} failed", report.tested, report.failed);
            if report.passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            error!("verification failed to run: {:#}", e);
            ExitCode::from(1)
        }
    }
}
