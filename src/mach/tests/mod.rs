use crate::mach::{Event, Runtime};

mod expr_test;
mod memory_test;
mod stack_test;
mod val_test;

fn exec(runtime: &mut Runtime) -> String {
    exec_n(runtime, 5000)
}

fn exec_n(runtime: &mut Runtime, cycles: usize) -> String {
    let mut s = String::new();
    let mut prev_running = false;
    loop {
        let event = runtime.execute(cycles);
        match &event {
            Event::Stopped => break,
            Event::Quit(code) => {
                s.push_str(&format!("quit {}\n", code));
                break;
            }
            Event::Errors(errors) => {
                for error in errors.iter() {
                    s.push_str(&format!("{}\n", error));
                }
            }
            Event::Running => {
                if prev_running {
                    s.push_str(&format!("\n{} execution cycles exceeded.\n", cycles));
                    break;
                }
            }
            Event::Print(text) => s.push_str(text),
            Event::Input(prompt) => {
                s.push_str(prompt);
                break;
            }
        }
        prev_running = matches!(event, Event::Running);
    }
    s
}
