extern crate ansi_term;
extern crate ctrlc;
extern crate linefeed;

use crate::mach::{Event, Runtime};
use ansi_term::Style;
use linefeed::{Interface, ReadResult, Signal};
use std::fs;
use std::io::Write;
use std::sync::atomic::Ordering;

/// ## Terminal front-end
///
/// Drives a `Runtime` and renders its events. With a filename the
/// program is loaded and run to completion; the process exit code is 0
/// or whatever `QUIT n` asked for. Without one this is the interactive
/// prompt: numbered lines edit the program, anything else executes
/// immediately.

pub fn main() {
    let mut filename = String::new();
    let mut cascade = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "-cascade" => cascade = true,
            "-h" | "--help" => {
                println!("Usage: beebasic [-cascade] [FILENAME]");
                return;
            }
            other if filename.is_empty() => filename = other.to_string(),
            _ => {
                eprintln!("Usage: beebasic [-cascade] [FILENAME]");
                std::process::exit(1);
            }
        }
    }
    let code = match run(&filename, cascade) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{}", error);
            1
        }
    };
    std::process::exit(code);
}

fn run(filename: &str, cascade: bool) -> std::io::Result<i32> {
    let mut runtime = Runtime::new();
    runtime.set_cascade_if(cascade);
    let escape = runtime.escape_flag();
    let _ = ctrlc::set_handler(move || escape.store(true, Ordering::SeqCst));

    let batch = !filename.is_empty();
    if batch {
        load(&mut runtime, filename)?;
        runtime.enter("RUN");
    } else {
        println!("Beeb BASIC VI");
    }

    let command = Interface::new("beebasic")?;
    command.set_prompt(">")?;
    let input = Interface::new("input")?;
    input.set_report_signal(Signal::Interrupt, true);

    let mut failed = false;
    loop {
        match runtime.execute(5000) {
            Event::Running => {}
            Event::Print(text) => {
                print!("{}", text);
                std::io::stdout().flush()?;
            }
            Event::Errors(errors) => {
                for error in errors {
                    println!("{}", Style::new().bold().paint(error.to_string()));
                }
                failed = true;
            }
            Event::Input(prompt) => {
                input.set_prompt(&prompt)?;
                match input.read_line()? {
                    ReadResult::Input(reply) => {
                        runtime.enter(&reply);
                    }
                    ReadResult::Signal(_) | ReadResult::Eof => runtime.interrupt(),
                }
            }
            Event::Quit(code) => return Ok(code),
            Event::Stopped => {
                if batch {
                    return Ok(if failed { 1 } else { 0 });
                }
                match command.read_line()? {
                    ReadResult::Input(line) => {
                        if runtime.enter(&line) {
                            command.add_history_unique(line);
                        }
                    }
                    ReadResult::Signal(_) => {}
                    ReadResult::Eof => return Ok(0),
                }
            }
        }
    }
}

/// Read a program file. Plain text without line numbers is numbered
/// automatically, ten apart.
fn load(runtime: &mut Runtime, filename: &str) -> std::io::Result<()> {
    let text = fs::read_to_string(filename)?;
    let mut auto = 0u16;
    for raw in text.lines() {
        if raw.trim().is_empty() {
            continue;
        }
        let numbered = raw
            .trim_start()
            .chars()
            .next()
            .map_or(false, |ch| ch.is_ascii_digit());
        if numbered {
            runtime.enter(raw);
        } else {
            auto = auto.saturating_add(10);
            runtime.enter(&format!("{} {}", auto, raw));
        }
    }
    Ok(())
}
