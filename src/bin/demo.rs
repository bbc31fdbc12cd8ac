//! CLI demo binary: the spiritual replacement for the original program's
//! `main()`: compile a pattern, then report both an anchored match and a
//! longest-prefix search against one or more haystacks.

use anyhow::{Context, Result};
use clap::Parser;
use tnfa::Regex;

#[derive(Parser, Debug)]
#[command(about = "Compile a pattern and try it against haystacks")]
struct Args {
    /// Pattern to compile.
    pattern: String,

    /// One or more haystacks to match/search against.
    #[arg(required = true)]
    haystacks: Vec<String>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    log::debug!("compiling pattern {:?}", args.pattern);
    let regex = Regex::compile(&args.pattern)
        .with_context(|| format!("compiling pattern {:?}", args.pattern))?;

    for haystack in &args.haystacks {
        try_match_search(&regex, &args.pattern, haystack);
    }
    Ok(())
}

fn try_match_search(regex: &Regex, pattern: &str, haystack: &str) {
    let bytes = haystack.as_bytes();

    regex.match_in(
        bytes,
        |n| see_result(pattern, haystack, Some(n), true),
        |offset| {
            log::trace!("match stuck at offset {offset}");
            see_result(pattern, haystack, None, true)
        },
    );

    regex.search_in(
        bytes,
        |n| see_result(pattern, haystack, Some(n), false),
        |offset| {
            log::trace!("search stuck at offset {offset}");
            see_result(pattern, haystack, None, false)
        },
    );
}

fn see_result(pattern: &str, haystack: &str, matched_len: Option<usize>, use_match: bool) {
    let verb = if use_match { "match" } else { "search" };
    match matched_len {
        Some(n) => println!("<{pattern}> {verb} <{haystack}> get result : <{}>", &haystack[..n]),
        None => println!("<{pattern}> {verb} <{haystack}> FAIL"),
    }
}
