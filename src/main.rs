// Thin CLI front-end over the `shorthand` library: the same role
// `obv_lexer`'s original `main.rs` played for its lexer, scaled to this
// crate's two-argument (template, input) shape.

use std::{
    env,
    io::{self, Write},
};

use serde::Serialize;

use shorthand_processor::shorthand::{
    Map, ShorthandError, ShorthandProcessor, ShorthandProcessorOptions,
};

#[derive(Serialize)]
#[serde(untagged)]
enum CliOutcome {
    Success(Map),
    Error(ShorthandError),
}

const DEMO_TEMPLATE: &str = r#"[ ?${type_set} ${sensor.type} ] ${sensor.name} "=" ${value}"#;
const DEMO_INPUT: &str = "integer foo=3";

fn main() -> io::Result<()> {
    let mut args: Vec<String> = env::args().skip(1).collect();

    let raw = if let Some(pos) = args.iter().position(|a| a == "--raw") {
        args.remove(pos);
        true
    } else {
        false
    };

    let (template, input) = match args.len() {
        0 => {
            eprintln!("No template/input pair provided. Using built-in demonstration.");
            (DEMO_TEMPLATE.to_string(), DEMO_INPUT.to_string())
        }
        2 => (args[0].clone(), args[1].clone()),
        _ => {
            eprintln!("Usage: shorthand_processor [--raw] <template> <input>");
            std::process::exit(2);
        }
    };

    let options = ShorthandProcessorOptions {
        final_match_raw: raw,
    };

    let outcome = match ShorthandProcessor::with_options(&template, options) {
        Ok(processor) => match processor.matches(&input) {
            Ok(result) => CliOutcome::Success(result),
            Err(e) => CliOutcome::Error(e),
        },
        Err(e) => CliOutcome::Error(e),
    };

    match serde_json::to_string_pretty(&outcome) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            let msg = format!("Internal error: failed to serialize output to JSON: {}", e);
            io::stderr().write_all(msg.as_bytes())?;
            io::stderr().write_all(b"\n")?;
            std::process::exit(1);
        }
    }

    if let CliOutcome::Error(_) = outcome {
        std::process::exit(1);
    }

    Ok(())
}
