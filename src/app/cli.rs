use std::{
    io::{self, Write},
    thread,
};

use crossbeam_channel::Receiver;
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal
};

use crate::app::ingest::Inbox;
use crate::error::IngestError;
use crate::manager::task_manager::TaskManager;

const HELP: &str = "Type a request in plain language, or an operator command:
  :list               list queued tasks
  :status <name>      show one task
  :run <name>         mark a pending task as running
  :done <name>        mark a running task as completed
  :fail <name> <why>  mark a running task as failed
  :next               hand the next task to an executor
  exit                quit";

pub fn run_cli(manager: &TaskManager, inbox: Inbox, replies: Receiver<String>) -> io::Result<()> {
    println!("Task orchestrator started. Type ':help' for commands or 'exit' to quit.");

    thread::spawn(move || {
        for reply in replies {
            print_line(&reply);
            print!("\r>>> ");
            let _ = io::stdout().flush();
        }
    });

    terminal::enable_raw_mode()?;
    let result = input_loop(manager, &inbox);
    terminal::disable_raw_mode()?;
    result
}

fn input_loop(manager: &TaskManager, inbox: &Inbox) -> io::Result<()> {
    let mut commands_history: Vec<String> = Vec::new();
    let mut history_index = 0;

    loop {
        print!("\r>>> ");
        io::stdout().flush()?;

        let Some(input) = read_line(&commands_history, &mut history_index)? else {
            println!("\rExiting the program...");
            return Ok(());
        };
        let input = input.trim().to_string();
        if input.is_empty() {
            continue;
        }
        commands_history.push(input.clone());
        history_index = commands_history.len();

        if input == "exit" {
            println!("\rExiting the program...");
            return Ok(());
        }
        match input.strip_prefix(':') {
            Some(command) => operator_command(manager, command),
            None => match inbox.submit(input) {
                Ok(()) => {}
                Err(IngestError::Closed) => print_line("Conversation has ended. Type 'exit' to quit."),
                Err(e) => print_line(&e.to_string()),
            },
        }
    }
}

/// Reads one line in raw mode. `None` means the user asked to quit.
fn read_line(commands_history: &[String], history_index: &mut usize) -> io::Result<Option<String>> {
    let mut input = String::new();
    loop {
        let Event::Key(key_event) = event::read()? else {
            continue;
        };
        if key_event.kind != KeyEventKind::Press {
            continue;
        }
        match key_event.code {
            KeyCode::Enter => {
                print!("\r\n");
                return Ok(Some(input));
            }
            KeyCode::Char('c') if key_event.modifiers.contains(KeyModifiers::CONTROL) => {
                print!("\r\n");
                return Ok(None);
            }
            KeyCode::Up => {
                if *history_index > 0 {
                    *history_index -= 1;
                }
                if let Some(command) = commands_history.get(*history_index) {
                    input = command.clone();
                    redraw(&input)?;
                }
            }
            KeyCode::Down => {
                if *history_index < commands_history.len() {
                    *history_index += 1;
                }
                input = commands_history.get(*history_index).cloned().unwrap_or_default();
                redraw(&input)?;
            }
            KeyCode::Char(c) => {
                input.push(c);
                print!("{}", c);
                io::stdout().flush()?;
            }
            KeyCode::Backspace => {
                input.pop();
                redraw(&input)?;
            }
            _ => {}
        }
    }
}

fn operator_command(manager: &TaskManager, command: &str) {
    let mut args = command.split_whitespace();
    match args.next() {
        Some("help") => HELP.lines().for_each(print_line),
        Some("list") => {
            let tasks = manager.list_tasks();
            if tasks.is_empty() {
                print_line("No queued tasks");
            } else {
                print_line(&format!("{:<20} {:<13} {:<8} {}", "Name", "Status", "Priority", "Model"));
                print_line(&"-".repeat(60));
                for task in tasks {
                    print_line(&format!(
                        "{:<20} {:<13} {:<8} {}",
                        task.name, task.status.to_string(), task.priority, task.model_name
                    ));
                }
            }
        }
        Some("status") => with_name(args.next(), |name| match manager.task(name) {
            Some(task) => print_line(&format!("Task {}", task.summary())),
            None => print_line(&format!("Task '{}' not found", name)),
        }),
        Some("run") => with_name(args.next(), |name| {
            report_signal(manager.run_task(name), "run", name)
        }),
        Some("done") => with_name(args.next(), |name| {
            report_signal(manager.complete_task(name), "completion", name)
        }),
        Some("fail") => {
            let name = args.next();
            let reason = args.collect::<Vec<_>>().join(" ");
            with_name(name, |name| {
                let reason = if reason.is_empty() { "failed by operator".to_string() } else { reason };
                report_signal(manager.fail_task(name, reason), "failure", name)
            })
        }
        Some("next") => match manager.next_task() {
            Some(task) => print_line(&format!("Dequeued task {}", task.summary())),
            None => print_line("Queue is empty"),
        },
        Some(cmd) => print_line(&format!("Unknown command: {}. Type ':help'.", cmd)),
        None => print_line("Command must be specified."),
    }
}

fn with_name(name: Option<&str>, action: impl FnOnce(&str)) {
    match name {
        Some(name) => action(name),
        None => print_line("Task name must be specified."),
    }
}

fn report_signal(sent: bool, kind: &str, name: &str) {
    if sent {
        print_line(&format!("Sent {} signal for task '{}'", kind, name));
    } else {
        print_line(&format!("Task '{}' not found", name));
    }
}

fn print_line(line: &str) {
    print!("\r{}\r\n", line);
}

fn redraw(input: &str) -> io::Result<()> {
    execute!(io::stdout(),
            cursor::MoveToColumn(0),
            terminal::Clear(terminal::ClearType::CurrentLine))?;
    print!(">>> {}", input);
    io::stdout().flush()
}
