// Terminal output for the gantry binary.
// Status lines go to stderr; step transcript lines go to stdout so captured
// output and the final report stay pipeable.

const RESET: &str = "\x1b[0m";

fn tag(color: &str, glyph: &str, message: &str) {
    eprintln!("{}{:>4}{} {}", color, glyph, RESET, message);
}

/// Cargo-style action column: "     Parsing ci.yml"
pub fn status(action: &str, message: &str) {
    eprintln!("\x1b[1;36m{:>12}{} {}", action, RESET, message);
}

/// Bold section header
pub fn header(message: &str) {
    eprintln!("\x1b[1m==> {}{}", message, RESET);
}

/// One passed validation item
pub fn check(message: &str) {
    tag("\x1b[32m", "ok", message);
}

/// Final success line
pub fn success(message: &str) {
    tag("\x1b[1;32m", "ok", message);
}

/// Final failure line
pub fn failure(message: &str) {
    tag("\x1b[1;31m", "no", message);
}

pub fn warning(message: &str) {
    tag("\x1b[33m", "!", message);
}

pub fn info(message: &str) {
    tag("\x1b[36m", "-", message);
}

pub fn error(message: &str) {
    eprintln!("\x1b[1;31merror:{} {}", RESET, message);
}

/// Muted progress line, colored green or red by outcome
pub fn outcome_line(good: bool, message: &str) {
    let color = if good { "\x1b[32m" } else { "\x1b[31m" };
    eprintln!("{}{}{}", color, message, RESET);
}

/// Muted detail line
pub fn dim(message: &str) {
    eprintln!("\x1b[2m{}{}", message, RESET);
}

/// Header line for one matrix instance
pub fn job_header(label: &str, total_steps: usize) {
    eprintln!("\x1b[1;34m  Job{} '{}' ({} steps)", RESET, label, total_steps);
}

/// One line of a step's captured stdout
pub fn step_output(line: &str) {
    println!("      | {}", line);
}

/// One line of a step's captured stderr
pub fn step_error(line: &str) {
    eprintln!("\x1b[31m      | {}{}", line, RESET);
}
