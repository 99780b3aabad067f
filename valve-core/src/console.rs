//! Text command grammar for operating a valve from a line console.
//!
//! ```text
//! open [force] | close [force] | toggle | status | history
//! advance <n>(ms|s) | jam | free | help [topic]
//! ```
//!
//! Keywords are case-insensitive and separated by spaces or tabs.

use core::fmt;
use core::time::Duration;

use winnow::ascii::{Caseless, digit1, space0, space1};
use winnow::combinator::{alt, opt, preceded, terminated};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::literal;

type PResult<T> = Result<T, ErrMode<ContextError>>;

/// Parsed console command.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConsoleCommand {
    /// Queue an open, or start opening immediately when forced.
    Open { force: bool },
    /// Queue a close, or start closing immediately when forced.
    Close { force: bool },
    Toggle,
    Status,
    History,
    /// Move simulated time forward.
    Advance(Duration),
    /// Stop the simulated valve mechanism mid-travel.
    Jam,
    /// Release a jammed mechanism.
    Free,
    Help(Option<HelpTopic>),
}

/// Subjects accepted by `help`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum HelpTopic {
    Open,
    Close,
    Toggle,
    Status,
    History,
    Advance,
    Jam,
    Free,
    Help,
}

impl HelpTopic {
    /// Every topic, in the order `help` lists them.
    pub const ALL: [HelpTopic; 9] = [
        HelpTopic::Open,
        HelpTopic::Close,
        HelpTopic::Toggle,
        HelpTopic::Status,
        HelpTopic::History,
        HelpTopic::Advance,
        HelpTopic::Jam,
        HelpTopic::Free,
        HelpTopic::Help,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            HelpTopic::Open => "open",
            HelpTopic::Close => "close",
            HelpTopic::Toggle => "toggle",
            HelpTopic::Status => "status",
            HelpTopic::History => "history",
            HelpTopic::Advance => "advance",
            HelpTopic::Jam => "jam",
            HelpTopic::Free => "free",
            HelpTopic::Help => "help",
        }
    }

    #[must_use]
    pub const fn usage(self) -> &'static str {
        match self {
            HelpTopic::Open => "open [force]",
            HelpTopic::Close => "close [force]",
            HelpTopic::Toggle => "toggle",
            HelpTopic::Status => "status",
            HelpTopic::History => "history",
            HelpTopic::Advance => "advance <n>ms | advance <n>s",
            HelpTopic::Jam => "jam",
            HelpTopic::Free => "free",
            HelpTopic::Help => "help [topic]",
        }
    }

    #[must_use]
    pub const fn summary(self) -> &'static str {
        match self {
            HelpTopic::Open => {
                "Queue an open once the valve settles and the bridge has cooled. \
                 `force` energises the open line immediately."
            }
            HelpTopic::Close => {
                "Queue a close once the valve settles and the bridge has cooled. \
                 `force` energises the close line immediately."
            }
            HelpTopic::Toggle => "Queue an open if the valve is closed, otherwise a close.",
            HelpTopic::Status => "Show valve status, pending command and actuator lines.",
            HelpTopic::History => "List recent status transitions.",
            HelpTopic::Advance => "Run the control loop forward by the given time.",
            HelpTopic::Jam => "Seize the mechanism so travel stops short of the limit switch.",
            HelpTopic::Free => "Release a seized mechanism.",
            HelpTopic::Help => "List commands, or describe one.",
        }
    }
}

impl fmt::Display for HelpTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reasons a console line was rejected.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConsoleError {
    /// The line held nothing but whitespace.
    Empty,
    /// Parsing stopped at byte `offset` of the line.
    Syntax { offset: usize },
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleError::Empty => f.write_str("empty command"),
            ConsoleError::Syntax { offset } => {
                write!(f, "unrecognised input at column {}", offset + 1)
            }
        }
    }
}

/// Parses one console line.
///
/// # Errors
///
/// [`ConsoleError::Empty`] for a blank line, otherwise
/// [`ConsoleError::Syntax`] at the first byte that fits no command.
pub fn parse(line: &str) -> Result<ConsoleCommand, ConsoleError> {
    let trimmed = line.trim_start();
    let leading = line.len() - trimmed.len();
    let body = trimmed.trim_end();
    if body.is_empty() {
        return Err(ConsoleError::Empty);
    }

    command.parse(body).map_err(|error| ConsoleError::Syntax {
        offset: leading + error.offset(),
    })
}

/// Parses a standalone duration such as `250ms` or `10s`.
///
/// # Errors
///
/// Same as [`parse`].
pub fn parse_duration(text: &str) -> Result<Duration, ConsoleError> {
    let body = text.trim();
    if body.is_empty() {
        return Err(ConsoleError::Empty);
    }
    duration
        .parse(body)
        .map_err(|error| ConsoleError::Syntax {
            offset: error.offset(),
        })
}

fn keyword<'s>(word: &'static str) -> impl Parser<&'s str, &'s str, ErrMode<ContextError>> {
    literal(Caseless(word))
}

fn force_flag(input: &mut &str) -> PResult<bool> {
    opt(preceded(space1, keyword("force")))
        .map(|flag| flag.is_some())
        .parse_next(input)
}

fn duration(input: &mut &str) -> PResult<Duration> {
    let amount = terminated(
        digit1.verify_map(|digits: &str| digits.parse::<u64>().ok()),
        space0,
    )
    .parse_next(input)?;

    alt((
        keyword("ms").value(Duration::from_millis(amount)),
        keyword("s").value(Duration::from_secs(amount)),
    ))
    .parse_next(input)
}

fn topic(input: &mut &str) -> PResult<HelpTopic> {
    alt((
        keyword("open").value(HelpTopic::Open),
        keyword("close").value(HelpTopic::Close),
        keyword("toggle").value(HelpTopic::Toggle),
        keyword("status").value(HelpTopic::Status),
        keyword("history").value(HelpTopic::History),
        keyword("advance").value(HelpTopic::Advance),
        keyword("jam").value(HelpTopic::Jam),
        keyword("free").value(HelpTopic::Free),
        keyword("help").value(HelpTopic::Help),
    ))
    .parse_next(input)
}

fn command(input: &mut &str) -> PResult<ConsoleCommand> {
    alt((
        preceded(keyword("open"), force_flag).map(|force| ConsoleCommand::Open { force }),
        preceded(keyword("close"), force_flag).map(|force| ConsoleCommand::Close { force }),
        keyword("toggle").value(ConsoleCommand::Toggle),
        keyword("status").value(ConsoleCommand::Status),
        keyword("history").value(ConsoleCommand::History),
        preceded((keyword("advance"), space1), duration).map(ConsoleCommand::Advance),
        keyword("jam").value(ConsoleCommand::Jam),
        keyword("free").value(ConsoleCommand::Free),
        preceded(keyword("help"), opt(preceded(space1, topic))).map(ConsoleCommand::Help),
    ))
    .parse_next(input)
}
