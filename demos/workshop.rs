use equilibrium::{
    levels, ops::Operation, session::Phase, InMemoryProgress, Session,
    SessionConfig, SessionError,
};
use log::LevelFilter;
use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};
use std::{
    io::{self, BufRead, BufReader, Write},
    thread,
};

const HELP: &str = "Commands:
  add N | sub N | mul N | div N   apply to both sides (N may be a term, e.g. 2x)
  undo                            go back one step
  reset                           start the level again
  answer N                        submit your answer
  next                            move on to the next level
  quit";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let mut session = Session::new(
        levels::builtin(),
        SessionConfig::default(),
        InMemoryProgress::default(),
    );
    session.resume()?;

    println!("{}", HELP);
    show(&session);

    let stdin = io::stdin();

    for line in BufReader::new(stdin.lock()).lines() {
        let line = line?;
        let line = line.trim();

        let result = match line {
            "" => continue,
            "quit" | "exit" => break,
            "help" => {
                println!("{}", HELP);
                continue;
            },
            "undo" => session.undo(),
            "reset" => session.reset(),
            "next" => session.advance().map(|_| ()),
            _ => match split_verb(line) {
                ("answer", answer) => session.submit_answer(answer).map(|_| ()),
                _ => match line.parse::<Operation>() {
                    Ok(op) => apply(&mut session, &op),
                    Err(e) => {
                        eprintln!("Unable to parse \"{}\": {}", line, e);
                        continue;
                    },
                },
            },
        };

        if let Err(e) = result {
            log::debug!("{}", e);
        }

        show(&session);

        if session.phase() == Phase::Complete {
            break;
        }
    }

    Ok(())
}

/// Commit an operation, then wait out the settle delay like an animation
/// would.
fn apply(
    session: &mut Session<InMemoryProgress>,
    op: &Operation,
) -> Result<(), SessionError> {
    let commit = session.apply(op)?;
    thread::sleep(session.settle_delay());
    session.settle(commit.ticket);

    Ok(())
}

/// Split a command into its first word and the rest of the line.
fn split_verb(line: &str) -> (&str, &str) {
    match line.find(char::is_whitespace) {
        Some(index) => (&line[..index], line[index..].trim()),
        None => (line, ""),
    }
}

fn show(session: &Session<InMemoryProgress>) {
    if let Some(level) = session.level() {
        let solved = if session.solved_looking() { "  (solved?)" } else { "" };
        println!(
            "[level {}] {}{}",
            level.id,
            session.equation(),
            solved
        );
    }
    println!("{}", session.feedback());
    print!("> ");
    let _ = io::stdout().flush();
}

fn init_logging() {
    let level = match std::env::var("WORKSHOP_LOG").as_deref() {
        Ok("debug") => LevelFilter::Debug,
        Ok("info") => LevelFilter::Info,
        Ok("error") => LevelFilter::Error,
        _ => LevelFilter::Warn,
    };

    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
