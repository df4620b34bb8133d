use clap::{App, Arg, ErrorKind};
use std::fs;
use std::io::{self, BufRead, Write};
use std::process;
use treelox::Lox;

// sysexits.h
const EX_USAGE: i32 = 64;
const EX_DATAERR: i32 = 65;
const EX_NOINPUT: i32 = 66;
const EX_SOFTWARE: i32 = 70;

fn main() {
    init_tracing();

    let app = App::new("treelox")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Tree-walking interpreter for a small Lox-style scripting language")
        .arg(
            Arg::with_name("print-ast")
                .long("print-ast")
                .help("Print each parsed statement as an s-expression before running it"),
        )
        .arg(
            Arg::with_name("script")
                .help("Script to run; starts an interactive prompt when omitted")
                .index(1),
        );
    let matches = match app.get_matches_safe() {
        Ok(matches) => matches,
        Err(e) => match e.kind {
            ErrorKind::HelpDisplayed | ErrorKind::VersionDisplayed => e.exit(),
            _ => {
                eprintln!("{}", e.message);
                process::exit(EX_USAGE);
            }
        },
    };

    let lox = Lox::new().print_ast(matches.is_present("print-ast"));
    match matches.value_of("script") {
        Some(file) => run_file(lox, file),
        None => run_prompt(lox),
    }
}

/// Installs a subscriber only when `RUST_LOG` is set, e.g.
/// `RUST_LOG=treelox=debug`.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        let filter = EnvFilter::from_default_env();
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_target(true)
                    .with_level(true),
            )
            .with(filter)
            .init();
    }
}

fn run_file(mut lox: Lox, file: &str) {
    let contents = match fs::read_to_string(file) {
        Ok(contents) => contents,
        Err(e) => {
            eprintln!("Could not read '{}': {}", file, e);
            process::exit(EX_NOINPUT);
        }
    };
    lox.run(&contents);
    if lox.diagnostics.had_error() {
        process::exit(EX_DATAERR);
    }
    if lox.diagnostics.had_runtime_error() {
        process::exit(EX_SOFTWARE);
    }
}

fn run_prompt(mut lox: Lox) {
    let stdin = io::stdin();
    prompt_loop(&mut lox, stdin.lock());
}

/// Reads and runs one line at a time until end of input. Each line starts
/// with clean error state.
fn prompt_loop<R: BufRead, W: Write>(lox: &mut Lox<W>, mut input: R) {
    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            return;
        }
        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) => {
                println!();
                return;
            }
            // The offending line has been consumed, so the session can go on.
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                eprintln!("Could not read line: {}", e);
            }
            Err(e) => {
                eprintln!("Could not read line: {}", e);
                return;
            }
            Ok(_) => {
                lox.run(&line);
                lox.diagnostics.take_reports();
                lox.diagnostics.reset();
            }
        }
    }
}

#[cfg(test)]
mod prompt_tests {
    use super::prompt_loop;
    use std::io::Cursor;
    use treelox::Lox;

    #[test]
    fn invalid_utf8_line_does_not_end_session() {
        let mut lox = Lox::with_output(Vec::new());
        let input = Cursor::new(b"print 1;\n\xff\xfe;\nprint 2;\n".to_vec());
        prompt_loop(&mut lox, input);
        assert_eq!(lox.output().as_slice(), b"1\n2\n");
    }

    #[test]
    fn errors_do_not_accumulate_across_lines() {
        let mut lox = Lox::with_output(Vec::new());
        let input = Cursor::new(b"print ;\nprint -nil;\nvar a = 1;\nprint a;\n".to_vec());
        prompt_loop(&mut lox, input);
        assert!(lox.diagnostics.reports().is_empty());
        assert!(!lox.diagnostics.had_error());
        assert!(!lox.diagnostics.had_runtime_error());
        assert_eq!(lox.output().as_slice(), b"1\n");
    }
}
