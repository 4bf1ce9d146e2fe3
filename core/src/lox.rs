use std::fs;
use std::io::{self, BufRead, Write};

use log::debug;

use crate::scanner::Scanner;

/// Session driver. Owns the had-error flag that decides the process exit
/// status after a file run.
#[derive(Default)]
pub struct Lox {
    had_error: bool,
}

impl Lox {
    pub fn new() -> Self {
        Lox { had_error: false }
    }

    pub fn run_file(&mut self, path: &str) -> io::Result<()> {
        debug!("running file {}", path);
        let source = fs::read_to_string(path)?;
        self.run(&source);
        Ok(())
    }

    pub fn run_prompt(&mut self) -> io::Result<()> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();

        let mut line = String::new();
        loop {
            write!(stdout, "> ")?;
            stdout.flush()?;

            line.clear();
            if stdin.lock().read_line(&mut line)? == 0 {
                break;
            }

            self.run(&line);

            // One bad line must not poison the rest of the session
            self.had_error = false;
        }

        Ok(())
    }

    fn run(&mut self, source: &str) {
        let (tokens, errors) = Scanner::new(source.to_string()).scan_tokens();
        debug!("scanned {} token(s), {} error(s)", tokens.len(), errors.len());

        for error in &errors {
            eprintln!("{}", error);
        }
        for token in &tokens {
            println!("{}", token);
        }

        if !errors.is_empty() {
            self.had_error = true;
        }
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_sets_had_error_on_lexical_errors() {
        let mut lox = Lox::new();
        assert!(!lox.had_error());

        lox.run("var x = 1;");
        assert!(!lox.had_error());

        lox.run("@");
        assert!(lox.had_error());
    }

    #[test]
    fn had_error_stays_set_until_cleared() {
        let mut lox = Lox::new();
        lox.run("@");
        lox.run("var ok = true;");
        assert!(lox.had_error());
    }
}
