use crate::interpreter::{self, check_syntax, Config, Interpreter};
use crate::reader;
use ansi_term::Colour::Red;
use linefeed::{DefaultTerminal, Interface, ReadResult, Signal, Terminal};
use std::fmt;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};

const PROMPT: &str = "> ";
const CONTINUATION_PROMPT: &str = ". ";
const USAGE: &str = "usage: slyther [--load FILE] [--max-depth N] [SOURCE]";

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Usage(String),
    Interpreter(interpreter::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "io error: {}", e),
            Error::Usage(reason) => write!(f, "{}\n{}", reason, USAGE),
            Error::Interpreter(e) => write!(f, "{}", e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<interpreter::Error> for Error {
    fn from(e: interpreter::Error) -> Self {
        Error::Interpreter(e)
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Options {
    pub source: Option<PathBuf>,
    pub load: Option<PathBuf>,
    pub config: Config,
    pub help: bool,
}

/// Parses the process arguments, program name included.
pub fn parse_args(args: &[String]) -> Result<Options, Error> {
    let mut options = Options::default();
    let mut args = args.iter().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--load" => {
                let path = args
                    .next()
                    .ok_or_else(|| Error::Usage("--load needs a file".into()))?;
                options.load = Some(PathBuf::from(path));
            }
            "--max-depth" => {
                let depth = args
                    .next()
                    .ok_or_else(|| Error::Usage("--max-depth needs a number".into()))?;
                options.config.max_depth = depth
                    .parse()
                    .map_err(|_| Error::Usage(format!("bad --max-depth {}", depth)))?;
            }
            "-h" | "--help" => options.help = true,
            flag if flag.starts_with("--") => {
                return Err(Error::Usage(format!("unknown option {}", flag)))
            }
            path if options.source.is_none() => options.source = Some(PathBuf::from(path)),
            path => return Err(Error::Usage(format!("unexpected argument {}", path))),
        }
    }
    Ok(options)
}

/// Runs `SOURCE` if given, otherwise loads `--load` and starts a REPL.
pub fn launch(args: &[String]) -> Result<(), Error> {
    let options = parse_args(args)?;
    if options.help {
        println!("{}", USAGE);
        return Ok(());
    }
    let interpreter = Interpreter::with_config(options.config.clone());
    if let Some(path) = &options.source {
        run_file(&interpreter, path)?;
        return Ok(());
    }
    if let Some(path) = &options.load {
        run_file(&interpreter, path)?;
    }
    let interface = setup()?;
    repl(&interface, &interpreter);
    save_history(&interface)?;
    Ok(())
}

fn run_file(interpreter: &Interpreter, path: &Path) -> Result<(), Error> {
    log::info!("running {}", path.display());
    let source = read_to_string(path)?;
    interpreter.execute(&source)?;
    Ok(())
}

pub fn setup() -> std::io::Result<Interface<DefaultTerminal>> {
    let interface = Interface::new("slyther")?;
    interface.set_prompt(PROMPT)?;
    interface.set_report_signal(Signal::Interrupt, true);
    if let Some(path) = history_path() {
        if let Err(e) = interface.load_history(&path) {
            log::warn!("could not read history from {}: {}", path.display(), e);
        }
    };
    Ok(interface)
}

fn history_path() -> Option<PathBuf> {
    dirs::data_dir().map(|mut path| {
        path.push(".slyther_history");
        path
    })
}

pub fn save_history<T: Terminal>(interface: &Interface<T>) -> std::io::Result<()> {
    match history_path() {
        Some(path) => interface.save_history(path),
        None => Ok(()),
    }
}

/// Red when standard error is a terminal.
pub fn paint_error(e: &impl fmt::Display) -> String {
    colour_if(atty::Stream::Stderr, format!("Error: {}", e))
}

fn colour_if(stream: atty::Stream, text: String) -> String {
    match atty::is(stream) {
        true => Red.paint(text).to_string(),
        false => text,
    }
}

/// Reads lines until the buffered input parses, then executes it and prints
/// the value of the last form. Ctrl-C drops the buffered input.
pub fn repl<T: Terminal>(interface: &Interface<T>, interpreter: &Interpreter) {
    let mut buffer = String::new();
    loop {
        let prompt = match buffer.is_empty() {
            true => PROMPT,
            false => CONTINUATION_PROMPT,
        };
        if let Err(e) = interface.set_prompt(prompt) {
            writeln!(interface, "Error: {}", e).ok();
            break;
        }
        match interface.read_line() {
            Ok(ReadResult::Eof) => break,
            Ok(ReadResult::Signal(Signal::Interrupt)) => {
                buffer.clear();
                writeln!(interface, "^C").ok();
            }
            Ok(ReadResult::Signal(sig)) => log::debug!("ignoring signal {:?}", sig),
            Ok(ReadResult::Input(line)) => {
                if !buffer.is_empty() {
                    buffer.push('\n');
                }
                buffer.push_str(&line);
                if let Err(reader::Error::NotClosed) = check_syntax(&buffer) {
                    continue;
                }
                interface.add_history_unique(buffer.clone());
                let output = match interpreter.execute(&buffer) {
                    Ok(value) => value.to_string(),
                    Err(e) => colour_if(atty::Stream::Stdout, format!("Error: {}", e)),
                };
                writeln!(interface, "{}", output).ok();
                buffer.clear();
            }
            Err(e) => {
                writeln!(interface, "Error: {}", e).ok();
                break;
            }
        }
    }
}
