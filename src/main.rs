use std::env;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::process;

use anyhow::{Context, Result};
use linegrep::{parse_pattern, Pattern};

// Usage: echo <input_text> | linegrep -E <pattern>
//        linegrep -E <pattern> <file>...
fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 || args[1] != "-E" {
        eprintln!("usage: linegrep -E <pattern> [file...]");
        process::exit(1);
    }

    let pattern = match parse_pattern(&args[2]) {
        Ok(pattern) => pattern,
        Err(e) => {
            eprintln!("pattern compilation error: {}", e);
            process::exit(1);
        }
    };

    let result = if args.len() == 3 {
        match_stdin(&pattern)
    } else {
        match_files(&pattern, &args[3..])
    };

    match result {
        Ok(true) => process::exit(0),
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("{:#}", e);
            process::exit(1);
        }
    }
}

fn match_stdin(pattern: &Pattern) -> Result<bool> {
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    let line = line.strip_suffix('\n').unwrap_or(&line);
    let line = line.strip_suffix('\r').unwrap_or(line);
    Ok(pattern.is_match(line.as_bytes()))
}

fn match_files(pattern: &Pattern, paths: &[String]) -> Result<bool> {
    let prefix_names = paths.len() > 1;
    let mut any_matched = false;

    for path in paths {
        let file = File::open(path).with_context(|| format!("failed to open {}", path))?;
        for line in BufReader::new(file).lines() {
            let line = line.with_context(|| format!("failed to read {}", path))?;
            if pattern.is_match(line.as_bytes()) {
                any_matched = true;
                if prefix_names {
                    println!("{}:{}", path, line);
                } else {
                    println!("{}", line);
                }
            }
        }
    }

    Ok(any_matched)
}
