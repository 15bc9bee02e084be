//! Command-line surface.
//!
//! Every option is an action and their relative order is the program, so
//! options are recovered in argv order through clap's value indices rather
//! than grouped per flag.

use crate::action::{byte_from_number, Action};
use clap::builder::NonEmptyStringValueParser;
use clap::error::ErrorKind;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

/// Help text printed for `-h` and for a bare invocation.
pub const USAGE: &str = "\
Usage: arduino-serial -b <bps> -p <serialport> [OPTIONS]

Options:
  -h, --help                 Print this help message
  -b, --baud=baudrate        Baudrate (bps) of Arduino (default 115200)
  -p, --port=serialport      Serial port Arduino is connected to
  -s, --send=string          Send string to Arduino
  -S, --sendline=string      Send string with newline to Arduino
  -r, --receive              Receive string from Arduino & print it out
  -m, --mysql                Read a reply and store it as status+code
  -n, --num=num              Send a number as a single byte
  -F, --flush                Flush serial port buffers for fresh reading
  -d, --delay=millis         Delay for specified milliseconds
  -e, --eolchar=char         Specify EOL char for reads (default '\\n')
  -t, --timeout=millis       Timeout for reads in millisecs (default 5000)
  -q, --quiet                Don't print out as much info
      --config=path          Read settings from this TOML file

Note: Order is important. Set '-b' baudrate before opening port '-p'.
      Used to make series of actions: '-d 2000 -s hello -d 100 -r'
      means 'wait 2secs, send 'hello', wait 100msec, get reply'
";

/// What the command line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Print usage and exit successfully.
    Help,
    /// Print the version and exit successfully.
    Version(String),
    /// Execute the actions in order.
    Run {
        config: Option<PathBuf>,
        actions: Vec<Action>,
    },
}

/// The clap definition of the tool.
pub fn command() -> Command {
    Command::new("arduino-serial")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Talk to a microcontroller over a serial line, one ordered action at a time")
        .override_help(USAGE)
        .arg(
            valued("baud", 'b', "baud")
                .value_parser(value_parser!(u32).range(1..)),
        )
        .arg(valued("port", 'p', "port"))
        .arg(valued("send", 's', "send").allow_hyphen_values(true))
        .arg(valued("sendline", 'S', "sendline").allow_hyphen_values(true))
        .arg(
            valued("num", 'n', "num")
                .value_parser(value_parser!(i64))
                .allow_negative_numbers(true),
        )
        .arg(valued("delay", 'd', "delay").value_parser(value_parser!(u64)))
        .arg(valued("eolchar", 'e', "eolchar").allow_hyphen_values(true))
        .arg(valued("timeout", 't', "timeout").value_parser(value_parser!(u64)))
        .arg(flag("receive", 'r', "receive"))
        .arg(flag("mysql", 'm', "mysql"))
        .arg(flag("flush", 'F', "flush"))
        .arg(flag("quiet", 'q', "quiet"))
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .action(ArgAction::Set),
        )
}

/// Repeatable option taking one value.
fn valued(id: &'static str, short: char, long: &'static str) -> Arg {
    Arg::new(id)
        .short(short)
        .long(long)
        .num_args(1)
        .value_parser(NonEmptyStringValueParser::new())
        .action(ArgAction::Append)
}

/// Repeatable flag. Modelled as an optional-value option so every
/// occurrence keeps its own index.
fn flag(id: &'static str, short: char, long: &'static str) -> Arg {
    Arg::new(id)
        .short(short)
        .long(long)
        .num_args(0..=1)
        .require_equals(true)
        .default_missing_value("true")
        .value_parser(value_parser!(bool))
        .action(ArgAction::Append)
}

/// Parse `std::env::args_os()`.
pub fn parse() -> Result<Invocation, clap::Error> {
    parse_from(std::env::args_os())
}

/// Parse an argv (program name first).
pub fn parse_from<I, T>(args: I) -> Result<Invocation, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    if args.len() <= 1 {
        return Ok(Invocation::Help);
    }

    let mut cmd = command();
    let matches = match cmd.try_get_matches_from_mut(args) {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::DisplayHelp => return Ok(Invocation::Help),
        Err(e) if e.kind() == ErrorKind::DisplayVersion => {
            return Ok(Invocation::Version(cmd.render_version().to_string()))
        }
        Err(e) => return Err(e),
    };

    Ok(Invocation::Run {
        config: matches.get_one::<PathBuf>("config").cloned(),
        actions: ordered_actions(&matches),
    })
}

/// Rebuild the action list in the order the options were given.
fn ordered_actions(m: &ArgMatches) -> Vec<Action> {
    let mut indexed: Vec<(usize, Action)> = Vec::new();

    collect::<u32>(m, "baud", Action::SetBaud, &mut indexed);
    collect::<String>(m, "port", Action::Open, &mut indexed);
    collect::<String>(m, "send", Action::Send, &mut indexed);
    collect::<String>(m, "sendline", Action::SendLine, &mut indexed);
    collect::<i64>(m, "num", |n| Action::SendByte(byte_from_number(n)), &mut indexed);
    collect::<u64>(m, "delay", |ms| Action::Delay(Duration::from_millis(ms)), &mut indexed);
    collect::<String>(
        m,
        "eolchar",
        |s| Action::SetEol(s.as_bytes()[0]),
        &mut indexed,
    );
    collect::<u64>(
        m,
        "timeout",
        |ms| Action::SetTimeout(Duration::from_millis(ms)),
        &mut indexed,
    );
    collect::<bool>(m, "receive", |_| Action::Receive, &mut indexed);
    collect::<bool>(m, "mysql", |_| Action::Report, &mut indexed);
    collect::<bool>(m, "flush", |_| Action::Flush, &mut indexed);
    collect::<bool>(m, "quiet", |_| Action::Quiet, &mut indexed);

    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, action)| action).collect()
}

fn collect<T>(
    m: &ArgMatches,
    id: &str,
    to_action: impl Fn(T) -> Action,
    out: &mut Vec<(usize, Action)>,
) where
    T: Clone + Send + Sync + 'static,
{
    if let (Some(values), Some(indices)) = (m.get_many::<T>(id), m.indices_of(id)) {
        out.extend(indices.zip(values.cloned().map(to_action)));
    }
}
