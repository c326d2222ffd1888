// Aspect weaving linker
//
//  Copyright (C) 2014-2023 Ryan Specialty, LLC.
//
//  This file is part of WEAVER.
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! This is the aspect linker,
//!   so named after the traditional `ld` Unix utility.
//! Its job is to take a unit whose members have been overridden by
//!   aspects and produce an equivalent unit in which each member is a
//!   single ordinary declaration.
//!
//! The linked unit is written as source text to the output file,
//!   or to standard out if none is given.
//! With `--eval`,
//!   the linked unit is instead executed and its console output written.
//!
//! Diagnostics are rendered to standard error.
//! Logging is configured through `RUST_LOG`.
//!
//! For more information about the linker,
//!   see the [`weaver::ld`] module.

extern crate weaver;

use getopts::{Fail, Matches, Options};
use std::{
    env,
    error::Error,
    fmt::{self, Display},
    fs,
    io::{self, Write},
};
use weaver::{
    diagnose::{
        AnnotatedSpan, Diagnostic, Reporter, SourceMapResolver, VisualReporter,
    },
    ld::{self, LinkOptions, Linked},
    span::SourceMap,
    syntax::{
        eval::{self, EvalError},
        parse::{parse, ParseError},
        print::print_unit,
    },
};

/// Types of commands
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Link(Job),
    Usage,
}

/// A single invocation of the linker.
#[derive(Debug, PartialEq, Eq)]
struct Job {
    input: String,
    output: Option<String>,

    /// Class and method to execute after linking.
    eval: Option<(String, String)>,
    opts: LinkOptions,
}

/// Entrypoint for the linker
pub fn main() {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map_or("weaveld", String::as_str);
    let opts = get_opts();
    let usage = opts.usage(&format!("Usage: {program} [OPTIONS] INPUT"));

    match parse_options(opts, &args) {
        Ok(Command::Link(job)) => {
            init_logging();
            std::process::exit(weave(&job));
        }
        Ok(Command::Usage) => {
            println!("{usage}");
            std::process::exit(exitcode::OK);
        }
        Err(e) => {
            eprintln!("{e}");
            eprintln!("{usage}");
            std::process::exit(exitcode::USAGE);
        }
    }
}

/// Install a `fmt` subscriber writing to standard error,
///   filtered by `RUST_LOG`.
///
/// Only warnings are logged by default.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let subscriber = fmt::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .finish();

    // May only fail if a subscriber was already installed.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Link the job's input,
///   render any diagnostics,
///   and produce an exit code.
fn weave(job: &Job) -> exitcode::ExitCode {
    let mut sources = SourceMap::new();
    let result = load_and_link(job, &mut sources);

    let mut reporter = VisualReporter::new(SourceMapResolver::new(&sources));

    let linked = match result {
        Ok(linked) => linked,
        Err(e) => return fatal(&mut reporter, job, &e),
    };

    // Rendering to a single buffer ensures that reports are not
    //   interleaved with log output.
    let ebuf: String = linked
        .diagnostics
        .iter()
        .map(|diag| format!("{}\n", reporter.render(diag)))
        .collect();
    eprint!("{ebuf}");

    if let Err(e) = write_output(job, &linked) {
        return fatal(&mut reporter, job, &e);
    }

    if reporter.has_errors() {
        eprintln!(
            "fatal: failed to link `{}` due to {} previous error(s)",
            job.input,
            reporter.error_count(),
        );

        return exitcode::DATAERR;
    }

    exitcode::OK
}

fn fatal<R: Reporter>(
    reporter: &mut R,
    job: &Job,
    e: &WeaveldError,
) -> exitcode::ExitCode {
    let report = reporter.render(e).to_string();
    eprintln!("{report}\nfatal: failed to link `{}`", job.input);

    e.exit_code()
}

fn load_and_link(
    job: &Job,
    sources: &mut SourceMap,
) -> Result<Linked, WeaveldError> {
    let text = fs::read_to_string(&job.input)?;
    let ctx = sources.add(job.input.as_str(), text.as_str());

    let parsed = parse(ctx, &text)?;

    tracing::debug!(
        input = %job.input,
        classes = parsed.unit.classes.len(),
        links = parsed.links.len(),
        "parsed input"
    );

    Ok(ld::link(&parsed, &job.opts))
}

/// Write the linked unit,
///   or the result of executing it,
///   to the job's destination.
fn write_output(job: &Job, linked: &Linked) -> Result<(), WeaveldError> {
    let out = match &job.eval {
        Some((class, method)) => {
            eval::run(&linked.unit, class, method)?.output
        }
        None => print_unit(&linked.unit, &linked.links),
    };

    match &job.output {
        Some(path) => fs::write(path, out)?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(out.as_bytes())?;
            stdout.flush()?;
        }
    }

    Ok(())
}

/// Get 'Options'
fn get_opts() -> Options {
    let mut opts = Options::new();
    opts.optopt("o", "output", "set output file name", "NAME");
    opts.optopt("j", "jobs", "number of worker threads", "N");
    opts.optflag("", "no-inline", "never inline links");
    opts.optopt(
        "",
        "eval",
        "execute the linked unit and write its console output",
        "CLASS.METHOD",
    );
    opts.optflag("h", "help", "print this help menu");

    opts
}

/// Option parser
fn parse_options(opts: Options, args: &[String]) -> Result<Command, Fail> {
    let matches = opts.parse(args.get(1..).unwrap_or_default())?;

    if matches.opt_present("h") {
        return Ok(Command::Usage);
    }

    let input = match matches.free.len() {
        0 => return Err(Fail::OptionMissing(String::from("INPUT"))),
        1 => matches.free[0].clone(),
        _ => return Err(Fail::UnrecognizedOption(matches.free[1].clone())),
    };

    Ok(Command::Link(Job {
        input,
        output: matches.opt_str("o"),
        eval: parse_eval(&matches)?,
        opts: LinkOptions {
            inline: !matches.opt_present("no-inline"),
            threads: parse_jobs(&matches)?,
        },
    }))
}

fn parse_jobs(matches: &Matches) -> Result<usize, Fail> {
    match matches.opt_str("j") {
        None => Ok(0),
        Some(n) => n
            .parse()
            .map_err(|_| Fail::UnexpectedArgument(format!("--jobs {n}"))),
    }
}

fn parse_eval(matches: &Matches) -> Result<Option<(String, String)>, Fail> {
    match matches.opt_str("eval") {
        None => Ok(None),
        Some(entry) => match entry.split_once('.') {
            Some((class, method)) if !class.is_empty() && !method.is_empty() => {
                Ok(Some((class.into(), method.into())))
            }
            _ => Err(Fail::UnexpectedArgument(format!("--eval {entry}"))),
        },
    }
}

/// Linker (`weaveld`) error.
///
/// This represents the aggregation of all possible errors that prevent
///   the linker from producing output.
/// Errors in individual members are not among them;
///   those are reported as diagnostics of the [`Linked`] unit.
#[derive(Debug)]
pub enum WeaveldError {
    Io(io::Error),
    Parse(ParseError),
    Eval(EvalError),
}

impl WeaveldError {
    fn exit_code(&self) -> exitcode::ExitCode {
        match self {
            Self::Io(_) => exitcode::IOERR,
            Self::Parse(_) | Self::Eval(_) => exitcode::DATAERR,
        }
    }
}

impl From<io::Error> for WeaveldError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ParseError> for WeaveldError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<EvalError> for WeaveldError {
    fn from(e: EvalError) -> Self {
        Self::Eval(e)
    }
}

impl Display for WeaveldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => Display::fmt(e, f),
            Self::Parse(e) => Display::fmt(e, f),
            Self::Eval(e) => Display::fmt(e, f),
        }
    }
}

impl Error for WeaveldError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
            Self::Eval(e) => Some(e),
        }
    }
}

impl Diagnostic for WeaveldError {
    fn describe(&self) -> Vec<AnnotatedSpan> {
        match self {
            Self::Parse(e) => e.describe(),
            Self::Eval(e) => e.describe(),

            // Falls back to rendering just the error `Display`.
            Self::Io(_) => vec![],
        }
    }
}
