use std::{
    env, fs,
    io::{self, BufRead, Write},
    process::ExitCode,
};

use hoot::{Hoot, ReplSession, StdPrint};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    match args.len() {
        1 => run_prompt(),
        2 => run_file(&args[1]),
        _ => {
            eprintln!("Usage: hoot [script]");
            ExitCode::from(64)
        }
    }
}

fn run_file(path: &str) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Error reading {path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut hoot = Hoot::new();
    hoot.run(&source, &mut StdPrint);
    ExitCode::from(hoot.exit_code())
}

/// Reads one line at a time; an empty line (or EOF) ends the session.
/// Error flags are cleared between lines so the session keeps going after
/// a bad one.
fn run_prompt() -> ExitCode {
    let mut session = ReplSession::new();
    let mut stdout = StdPrint;
    let stdin = io::stdin();

    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let line = line.trim_end_matches(['\n', '\r']);
        if line.is_empty() {
            break;
        }

        session.execute(line, &mut stdout);
    }

    ExitCode::SUCCESS
}
