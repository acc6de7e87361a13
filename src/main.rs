// steptrace: line-by-line execution tracer with linked-list visualization

use std::fs;
use std::io;
use std::path::Path;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;

use steptrace::ui::App;

fn usage(program_name: &str) {
    eprintln!("Usage: {} [--view] <file.py>", program_name);
    eprintln!();
    eprintln!("  {} script.py          # Print the JSON trace", program_name);
    eprintln!("  {} --view script.py   # Step through the trace in the terminal", program_name);
    eprintln!();
    eprintln!("Set RUST_LOG=steptrace=debug to see tracer decisions on stderr.");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let program_name = args.first().map(String::as_str).unwrap_or("steptrace");

    let mut view = false;
    let mut path = None;
    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--view" | "-v" => view = true,
            "--help" | "-h" => {
                usage(program_name);
                return Ok(());
            }
            other => path = Some(other),
        }
    }

    let Some(path) = path else {
        eprintln!("Error: No input file provided");
        eprintln!();
        usage(program_name);
        std::process::exit(1);
    };

    if !Path::new(path).exists() {
        eprintln!("Error: File '{}' not found", path);
        usage(program_name);
        std::process::exit(1);
    }

    let source = fs::read_to_string(path)?;
    let trace = steptrace::run(&source);
    tracing::debug!(entries = trace.len(), "trace complete");

    if !view {
        println!("{}", serde_json::to_string_pretty(&trace)?);
        return Ok(());
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(trace, source);
    let res = app.run(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}
