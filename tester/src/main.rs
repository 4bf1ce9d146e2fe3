use std::{
    fs::File,
    io::{self, BufRead},
    path::Path,
    process::{exit, Command},
    thread,
    time::Duration,
};

use clap::Parser;
use console::{style, Term};
use glob::glob;
use regex::Regex;

/// Runs every sample under samples/ through the scanner binary and checks
/// the expectation comments embedded in each file.
#[derive(Parser)]
struct Options {
    /// Only run samples whose path, relative to samples/, starts with this prefix
    filter: Option<String>,

    /// Path to the scanner binary under test
    #[arg(long, default_value = "target/release/slox-cli")]
    binary: String,
}

struct ExpectedOutput {
    line: usize,
    output: String,
}

impl ExpectedOutput {
    fn new(line: usize, output: String) -> Self {
        ExpectedOutput { line, output }
    }
}

struct Test {
    path: String,
    expected_output: Vec<ExpectedOutput>,
    expected_errors: Vec<String>,
    expected_exit_code: i32,
    expectations: u32,
}

impl Test {
    fn new(path: String) -> Self {
        Test {
            path,
            expected_output: Vec::new(),
            expected_errors: Vec::new(),
            expected_exit_code: 0,
            expectations: 0,
        }
    }

    /// Collects the expectations in a sample file. `Ok(false)` means the
    /// file opted out with a `// nontest` marker.
    fn parse(&mut self) -> io::Result<bool> {
        let expected_output_pattern = Regex::new(r"// expect: ?(.*)").unwrap();
        let expected_error_pattern = Regex::new(r"// (Error.*)").unwrap();
        let error_line_pattern = Regex::new(r"// \[line (\d+)\] (Error.*)").unwrap();
        let non_test_pattern = Regex::new(r"// nontest").unwrap();

        for (line_num, line) in read_lines(&self.path)?.flatten().enumerate() {
            // Not a test file at all, so ignore it.
            if non_test_pattern.is_match(&line) {
                return Ok(false);
            }

            if let Some(captures) = expected_output_pattern.captures(&line) {
                self.expected_output
                    .push(ExpectedOutput::new(line_num + 1, captures[1].to_string()));
                self.expectations += 1;
                continue;
            }

            // An error expectation names its line explicitly or claims the
            // line it sits on.
            if let Some(captures) = error_line_pattern.captures(&line) {
                self.expected_errors
                    .push(format!("[line {}] {}", &captures[1], &captures[2]));
                self.expected_exit_code = 65;
                self.expectations += 1;
                continue;
            }

            if let Some(captures) = expected_error_pattern.captures(&line) {
                self.expected_errors
                    .push(format!("[line {}] {}", line_num + 1, &captures[1]));
                self.expected_exit_code = 65;
                self.expectations += 1;
                continue;
            }
        }

        Ok(true)
    }

    fn run(&mut self, binary: &str) -> Vec<String> {
        let mut failures = Vec::new();
        let syntax_error_pattern = Regex::new(r"\[.*line (\d+)\] (Error.+)").unwrap();

        let result = Command::new(binary)
            .args([&self.path])
            .output()
            .expect("failed to execute process");

        // Validate reported errors
        let mut found_errors = Vec::new();
        let mut unexpected_count = 0;
        for line in result.stderr.lines().map(|line| line.unwrap()) {
            if let Some(captures) = syntax_error_pattern.captures(&line) {
                let error = format!("[line {}] {}", &captures[1], &captures[2]);
                if self.expected_errors.contains(&error) {
                    found_errors.push(error);
                } else {
                    if unexpected_count < 10 {
                        failures.push(format!("Unexpected error: {}", line));
                    }
                    unexpected_count += 1;
                }
            } else if !line.is_empty() {
                if unexpected_count < 10 {
                    failures.push(format!("Unexpected output on stderr: {}", line));
                }
                unexpected_count += 1;
            }
        }
        if unexpected_count > 10 {
            failures.push(format!("(truncated {} more...)", unexpected_count - 10));
        }

        // Validate that every expected error occurred.
        for error in &self.expected_errors {
            if !found_errors.contains(error) {
                failures.push(format!("Missing expected error: {}", error));
            }
        }

        // Validate the exit code
        if result.status.code() != Some(self.expected_exit_code) {
            failures.push(format!(
                "Expected return code {} and got {:?}.",
                self.expected_exit_code,
                result.status.code()
            ));
        }

        // Validate output lines, in order
        let output_lines: Vec<String> = result.stdout.lines().map(|line| line.unwrap()).collect();

        let mut index = 0;
        for line in &output_lines {
            if index >= self.expected_output.len() {
                failures.push(format!("Got output '{}' when none was expected.", line));
                index += 1;
                continue;
            }
            let expected = &self.expected_output[index];
            if expected.output != *line {
                failures.push(format!(
                    "Expected output '{}' on line {} and got '{}'.",
                    expected.output, expected.line, line
                ));
            }
            index += 1;
        }
        while index < self.expected_output.len() {
            let expected = &self.expected_output[index];
            failures.push(format!(
                "Missing expected output '{}' on line {}.",
                expected.output, expected.line
            ));
            index += 1;
        }

        failures
    }
}

struct Tester {
    filter_path: Option<String>,
    passed: u32,
    failed: u32,
    skipped: u32,
    expectations: u32,
}

impl Tester {
    fn new(filter_path: Option<String>) -> Self {
        Tester {
            filter_path,
            passed: 0,
            failed: 0,
            skipped: 0,
            expectations: 0,
        }
    }

    fn run_suite(&mut self, binary: &str) -> bool {
        let term = Term::stdout();
        term.write_line("").unwrap();

        for path in glob("samples/**/*.lox").expect("Failed to read glob pattern") {
            self.run_test(&term, path.unwrap().to_str().unwrap(), binary);
        }

        term.clear_last_lines(1).unwrap();

        if self.failed == 0 {
            println!(
                "All {} tests passed ({} expectations).",
                style(self.passed).green(),
                self.expectations
            );
        } else {
            println!(
                "{} tests passed. {} tests failed.",
                style(self.passed).green(),
                style(self.failed).red()
            );
        }

        self.failed == 0
    }

    fn run_test(&mut self, term: &Term, path: &str, binary: &str) {
        // Check if we are just running a subset of the tests.
        if let Some(filter_path) = &self.filter_path {
            let test_path: String = pathdiff::diff_paths(path, "samples")
                .unwrap()
                .into_os_string()
                .into_string()
                .unwrap();
            if !test_path.starts_with(filter_path) {
                return;
            }
        }

        // Fake delay to achieve nice effect on the console
        thread::sleep(Duration::from_millis(50));
        term.clear_last_lines(1).unwrap();
        term.write_line(&format!(
            "Passed: {} Failed: {} Skipped: {} ({})",
            style(self.passed).green(),
            style(self.failed).red(),
            style(self.skipped).yellow(),
            style(path)
        ))
        .unwrap();

        let mut test = Test::new(path.to_string());
        match test.parse() {
            Ok(true) => {}
            Ok(false) => {
                self.skipped += 1;
                return;
            }
            Err(err) => {
                self.failed += 1;
                println!("{}: {} ({})", style("FAIL").red(), path, err);
                return;
            }
        }
        self.expectations += test.expectations;

        let failures = test.run(binary);
        if failures.is_empty() {
            self.passed += 1;
        } else {
            self.failed += 1;
            println!("{}: {}", style("FAIL").red(), path);
            println!();
            for failure in &failures {
                println!("\t{}", style(failure).blue());
            }
            println!();
        }
    }
}

fn main() {
    let options = Options::parse();

    let mut tester = Tester::new(options.filter);
    if !tester.run_suite(&options.binary) {
        exit(1);
    }
}

// Returns an iterator over the lines of the file.
fn read_lines<P>(filename: P) -> io::Result<io::Lines<io::BufReader<File>>>
where
    P: AsRef<Path>,
{
    let file = File::open(filename)?;
    Ok(io::BufReader::new(file).lines())
}
