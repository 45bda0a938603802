//! Entrypoint for CLI
use std::{
    env,
    error::Error,
    fs,
    io::{self, Write},
    time::Instant,
};

use log::{debug, info, LevelFilter};
use strand::{prelude::*, IMPL_VERSION};

static USAGE: &str = r#"
usage: strand [--conf FILE] CMD FILE

commands:
    run     Run the target source file
    tokens  Print the classified tokens of the target source file

options:
    --conf  YAML file with interpreter settings

examples:
    strand run hello.st
    strand tokens hello.st
    strand --conf small.yaml run hello.st
"#;

fn read_source(filepath: &str) -> StrandResult<String> {
    let file_bytes = fs::read(filepath)?;
    Ok(String::from_utf8(file_bytes)?)
}

fn load_conf(filepath: Option<&str>) -> Result<InterpConf, Box<dyn Error>> {
    match filepath {
        Some(filepath) => {
            let file = fs::File::open(filepath)?;
            let conf: InterpConf = serde_yaml::from_reader(file)?;
            debug!("{conf:?}");
            Ok(conf)
        }
        None => Ok(InterpConf::default()),
    }
}

fn run_source(conf: InterpConf, filepath: &str) -> StrandResult<()> {
    let source_code = read_source(filepath)?;

    let mut interp = Interp::new(conf);
    interp.load_source(filepath, &source_code)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let start = Instant::now();
    let result = interp.execute(&mut out);
    let end = Instant::now();

    info!(
        "time taken: {}ms",
        end.duration_since(start).as_nanos() as f64 / 1000000.0
    ); // to millis
    if log::log_enabled!(log::Level::Debug) {
        if let Ok(dump) = interp.dump_arena() {
            debug!("arena:\n{dump}");
        }
    }

    result
}

fn print_tokens(filepath: &str) -> StrandResult<()> {
    let source_code = read_source(filepath)?;
    let tokens = TokenStream::from_source(&source_code)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    out.write_all(tokens.dump().as_bytes())?;

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::SimpleLogger::new()
        .with_level(LevelFilter::Warn)
        .env()
        .init()?;

    let cmd = match parse_args() {
        Some(cmd) => cmd,
        None => {
            print_usage();
            // FreeBSD EX_USAGE (64)
            std::process::exit(64)
        }
    };

    let (result, filepath) = match cmd {
        Cmd::Run { filepath, conf } => (run_source(load_conf(conf.as_deref())?, &filepath), filepath),
        Cmd::Tokens { filepath } => (print_tokens(&filepath), filepath),
    };

    if let Err(err) = result {
        io::stdout().flush()?;
        eprint!("{}", err.report(&filepath));
        std::process::exit(1)
    }

    Ok(())
}

fn parse_args() -> Option<Cmd> {
    let mut args = env::args().skip(1).peekable();

    let conf = match args.peek().map(String::as_str) {
        Some("--conf") => {
            args.next();
            Some(consume_arg(&mut args)?)
        }
        _ => None,
    };

    match args.next()?.as_str() {
        "run" => Some(Cmd::Run {
            filepath: consume_arg(&mut args)?,
            conf,
        }),
        "tokens" => Some(Cmd::Tokens {
            filepath: consume_arg(&mut args)?,
        }),
        _ => None,
    }
}

/// Consumes the next argument, returning `None` when it doesn't exist.
fn consume_arg(args: &mut impl Iterator<Item = String>) -> Option<String> {
    args.next()
}

fn print_usage() {
    println!("Strand v{IMPL_VERSION}");
    println!("{USAGE}");
}

enum Cmd {
    /// Run file
    Run {
        filepath: String,
        conf: Option<String>,
    },
    /// Dump tokens
    Tokens { filepath: String },
}
