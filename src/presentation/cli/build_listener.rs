use crate::application::build_listener::BuildListener;
use colored::Colorize;

/// Prints the build log to the terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleListener;

impl ConsoleListener {
    pub fn new() -> Self {
        Self
    }
}

impl BuildListener for ConsoleListener {
    fn log(&self, line: &str) {
        if let Some(rest) = line.strip_prefix("WARNING:") {
            println!("{}{}", "WARNING:".yellow().bold(), rest);
        } else if line.starts_with("Checking out")
            || line.starts_with("Switching from")
            || line.starts_with("Updating")
        {
            println!("{} {}", "::".blue().bold(), line);
        } else {
            println!("{}", line);
        }
    }

    fn error(&self, line: &str) {
        eprintln!("{} {}", "ERROR:".red().bold(), line);
    }
}
