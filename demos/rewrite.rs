use std::env;
use std::io;
use std::process;

use xmltransform::{copy, create_reader_if_needed, create_writer_if_needed, TransformConfig};

const USAGE: &str = "usage: rewrite [--rename FROM TO] [--rename-attr FROM TO] \
                     [--drop NAME] [--append TRIGGER SPEC] < input.xml";

fn parse_args() -> Option<TransformConfig> {
    let mut config = TransformConfig::new();
    let mut args = env::args().skip(1);
    while let Some(flag) = args.next() {
        config = match flag.as_str() {
            "--rename" => config.rename_element(args.next()?, args.next()?),
            "--rename-attr" => config.rename_attribute(args.next()?, args.next()?),
            "--drop" => config.drop_element(args.next()?),
            "--append" => config.append_element(args.next()?, args.next()?),
            _ => return None,
        };
    }
    Some(config)
}

fn main() {
    let config = match parse_args() {
        Some(config) => config,
        None => {
            eprintln!("{}", USAGE);
            process::exit(2);
        }
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut reader = create_reader_if_needed(None, stdin.lock(), &config);
    let mut writer = create_writer_if_needed(None, stdout.lock(), &TransformConfig::new());
    if let Err(err) = copy(&mut reader, &mut writer) {
        eprintln!("error: {}", err);
        process::exit(1);
    }
    println!();
}
