use std::io::{self, BufRead, Write};

use colored::Colorize;

/// Prints `label` and reads one trimmed line. `None` on end of input.
pub fn prompt_line(label: &str) -> Option<String> {
    print!("{}", label.cyan());
    let _ = io::stdout().flush();

    read_line(&mut io::stdin().lock())
}

/// Asks a yes/no question until it gets an answer. End of input means no.
pub fn confirm(question: &str) -> bool {
    loop {
        let Some(answer) = prompt_line(question) else {
            return false;
        };

        match parse_yes_no(&answer) {
            Some(answer) => return answer,
            None => println!("{}", "Please enter 'y' or 'n'.".red()),
        }
    }
}

fn read_line(reader: &mut impl BufRead) -> Option<String> {
    let mut input = String::new();
    match reader.read_line(&mut input) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(input.trim().to_string()),
    }
}

fn parse_yes_no(answer: &str) -> Option<bool> {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}
