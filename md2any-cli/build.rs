use clap::{Arg, ArgAction, Command, ValueHint};
use clap_complete::{generate_to, shells::*};
use std::env;
use std::io::Error;

// Mirror of build_cli() in src/main.rs
// Build scripts can't reach src/ modules, so the command tree is restated here.
fn input_arg() -> Arg {
    Arg::new("input")
        .help("Rendered HTML fragment to export")
        .required(true)
        .index(1)
        .value_hint(ValueHint::FilePath)
}

fn page_arg() -> Arg {
    Arg::new("page")
        .long("page")
        .help("Snapshot of the whole page, for shared formula glyphs")
        .value_hint(ValueHint::FilePath)
}

fn main() -> Result<(), Error> {
    let outdir = match env::var_os("OUT_DIR") {
        None => return Ok(()),
        Some(outdir) => outdir,
    };

    let mut cmd = Command::new("md2any")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Normalize rendered documents for pasting and export")
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("session")
                .long("session")
                .global(true)
                .action(ArgAction::Append)
                .value_hint(ValueHint::Other),
        )
        .subcommand(
            Command::new("normalize")
                .arg(input_arg())
                .arg(page_arg())
                .arg(Arg::new("json").long("json").action(ArgAction::SetTrue)),
        )
        .subcommand(
            Command::new("copy")
                .arg(input_arg())
                .arg(page_arg())
                .arg(Arg::new("json").long("json").action(ArgAction::SetTrue)),
        )
        .subcommand(
            Command::new("export")
                .arg(input_arg())
                .arg(page_arg())
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .required(true)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(Arg::new("title").long("title"))
                .arg(Arg::new("json").long("json").action(ArgAction::SetTrue)),
        );

    // Generate completions for bash
    generate_to(Bash, &mut cmd, "md2any", &outdir)?;

    // Generate completions for zsh
    generate_to(Zsh, &mut cmd, "md2any", &outdir)?;

    // Generate completions for fish
    generate_to(Fish, &mut cmd, "md2any", &outdir)?;

    println!("cargo:warning=Shell completions generated in {outdir:?}");

    Ok(())
}
