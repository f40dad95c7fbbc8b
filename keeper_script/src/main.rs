//! CLI entry point for keeper_script.
//! Usage: cargo run -p keeper_script -- lint keeper_engine/data/demo.txt

use std::{env, fs, process};

use keeper_script::{ParsedScript, parse_script};

fn main() {
    let args: Vec<String> = env::args().collect();

    // Accept either `<bin> -- <cmd> <args>` or `<bin> <cmd> <args>`
    let rest: Vec<String> = match args.as_slice() {
        [_, flag, cmd, tail @ ..] if flag == "--" && (cmd == "lint" || cmd == "dump") => {
            let mut v = vec![cmd.clone()];
            v.extend_from_slice(tail);
            v
        },
        [_, cmd, tail @ ..] if cmd == "lint" || cmd == "dump" => {
            let mut v = vec![cmd.clone()];
            v.extend_from_slice(tail);
            v
        },
        _ => {
            eprintln!("Usage:\n  keeper_script lint <script.txt>...\n  keeper_script dump <script.txt> [--out <out.ron>]");
            process::exit(2);
        },
    };
    if rest[0] == "lint" {
        run_lint(&rest[1..]);
    } else {
        run_dump(&rest[1..]);
    }
}

fn read_script(path: &str) -> ParsedScript {
    let src = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("error: unable to read '{path}': {e}");
        process::exit(1);
    });
    parse_script(&src)
}

fn run_lint(paths: &[String]) {
    if paths.is_empty() {
        eprintln!("Usage: keeper_script lint <script.txt>...");
        process::exit(2);
    }
    let mut failed = 0usize;
    for path in paths {
        let parsed = read_script(path);
        for err in &parsed.errors {
            eprintln!("{path}:{err}");
        }
        if parsed.errors.is_empty() {
            println!("{path}: {} commands, ok", parsed.lines.len());
        } else {
            failed += 1;
        }
    }
    if failed > 0 {
        eprintln!("lint: {failed} file(s) with syntax errors");
        process::exit(1);
    }
}

fn run_dump(args: &[String]) {
    let mut path: Option<&str> = None;
    let mut out_path: Option<&str> = None;
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--out" {
            let Some(out) = args.get(i + 1) else {
                eprintln!("--out requires a filepath");
                process::exit(2);
            };
            out_path = Some(out);
            i += 2;
            continue;
        }
        if path.is_none() {
            path = Some(&args[i]);
        }
        i += 1;
    }
    let Some(path) = path else {
        eprintln!("Usage: keeper_script dump <script.txt> [--out <out.ron>]");
        process::exit(2);
    };
    let parsed = read_script(path);
    for err in &parsed.errors {
        eprintln!("warning: {path}:{err} (line skipped)");
    }
    let text = ron::ser::to_string_pretty(&parsed.lines, ron::ser::PrettyConfig::default()).unwrap_or_else(|e| {
        eprintln!("error: serializing lines: {e}");
        process::exit(1);
    });
    match out_path {
        Some(out) => fs::write(out, text).unwrap_or_else(|e| {
            eprintln!("error: writing '{out}': {e}");
            process::exit(1);
        }),
        None => println!("{text}"),
    }
}
