use std::path::Path;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use stegano_outguess::{detect, DetectError, DetectOptions, Verdict};

mod cli;

use cli::CliArgs;

pub type CliResult<T> = Result<T, DetectError>;

fn main() -> ExitCode {
    env_logger::init();

    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            log::debug!("{}", e);
            println!("Usage: {} <image 1.jpg> <image 2.jpg>", program_name());
            return ExitCode::SUCCESS;
        }
    };

    match run(&args) {
        Ok(verdict) => {
            report(&verdict);
            ExitCode::from(verdict.exit_code())
        }
        Err(e) => {
            println!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &CliArgs) -> CliResult<Verdict> {
    let options = DetectOptions {
        temp_dir: args.temp_dir.clone(),
    };
    detect(&args.image1, &args.image2, &options)
}

fn report(verdict: &Verdict) {
    if let Verdict::MetadataMismatch(failures) = verdict {
        for failure in failures {
            println!("{}: {}", failure.path.display(), failure.check);
        }
    }
    println!("{}", verdict);
}

fn program_name() -> String {
    std::env::args_os()
        .next()
        .map(|arg0| Path::new(&arg0).display().to_string())
        .unwrap_or_else(|| env!("CARGO_BIN_NAME").to_string())
}
