use std::cell::Cell;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant as HostInstant};

use valve_core::console::{self, ConsoleCommand, HelpTopic};
use valve_core::input::{DebouncedInput, InputConfig};
use valve_core::io::{DigitalSink, DigitalSource, Level, Polarity};
use valve_core::output::TimedOutput;
use valve_core::telemetry::TransitionLog;
use valve_core::time::{Millis, duration_to_millis};
use valve_core::valve::{ValveConfig, ValveController, ValveStatus};

const HISTORY_DEPTH: usize = 32;
/// Longest stretch a single `advance` may simulate.
const MAX_ADVANCE: Duration = Duration::from_secs(3_600);

/// Where the simulated valve sits when the bench starts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StartPosition {
    Opened,
    Closed,
    Midway,
}

impl StartPosition {
    pub fn from_tag(tag: &str) -> Result<Self, String> {
        if tag.eq_ignore_ascii_case("opened") {
            Ok(Self::Opened)
        } else if tag.eq_ignore_ascii_case("closed") {
            Ok(Self::Closed)
        } else if tag.eq_ignore_ascii_case("midway") {
            Ok(Self::Midway)
        } else {
            Err(format!("Unknown start position `{tag}`"))
        }
    }
}

/// Bench parameters collected from the command line.
#[derive(Clone, Debug)]
pub struct BenchConfig {
    pub valve: ValveConfig,
    /// Time the mechanism needs to travel between the two stops.
    pub travel: Duration,
    pub start: StartPosition,
    pub transcript: Option<PathBuf>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            valve: ValveConfig::default(),
            travel: Duration::from_secs(5),
            start: StartPosition::Closed,
            transcript: None,
        }
    }
}

/// How the front-end should present a reply line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Tone {
    Plain,
    Status(ValveStatus),
    Error,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Reply {
    pub tone: Tone,
    pub text: String,
}

impl Reply {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            tone: Tone::Plain,
            text: text.into(),
        }
    }

    fn status(status: ValveStatus, text: String) -> Self {
        Self {
            tone: Tone::Status(status),
            text,
        }
    }

    fn error(text: String) -> Self {
        Self {
            tone: Tone::Error,
            text,
        }
    }
}

/// Shared wire between the controller and the simulated mechanism.
#[derive(Clone)]
struct Wire(Rc<Cell<Level>>);

impl Wire {
    fn new(level: Level) -> Self {
        Self(Rc::new(Cell::new(level)))
    }

    fn get(&self) -> Level {
        self.0.get()
    }

    fn set(&self, level: Level) {
        self.0.set(level);
    }
}

impl DigitalSource for Wire {
    fn read(&mut self) -> Level {
        self.get()
    }
}

impl DigitalSink for Wire {
    fn write(&mut self, level: Level) {
        self.set(level);
    }
}

/// Motor and limit switches. Position is counted in milliseconds of travel
/// from the closed stop; the switches pull low at their stop.
struct Mechanism {
    open_line: Wire,
    close_line: Wire,
    opened_switch: Wire,
    closed_switch: Wire,
    position: u32,
    travel: u32,
    jammed: bool,
}

impl Mechanism {
    fn new(travel: u32, start: StartPosition) -> Self {
        let travel = travel.max(1);
        let position = match start {
            StartPosition::Opened => travel,
            StartPosition::Closed => 0,
            StartPosition::Midway => travel / 2,
        };
        let mut mechanism = Self {
            open_line: Wire::new(Level::Low),
            close_line: Wire::new(Level::Low),
            opened_switch: Wire::new(Level::High),
            closed_switch: Wire::new(Level::High),
            position,
            travel,
            jammed: false,
        };
        mechanism.update_switches();
        mechanism
    }

    fn step(&mut self) {
        if !self.jammed {
            match (self.open_line.get(), self.close_line.get()) {
                (Level::High, Level::Low) => {
                    self.position = (self.position + 1).min(self.travel);
                }
                (Level::Low, Level::High) => self.position = self.position.saturating_sub(1),
                _ => {}
            }
        }
        self.update_switches();
    }

    fn update_switches(&mut self) {
        self.opened_switch
            .set(Level::from_high(self.position != self.travel));
        self.closed_switch.set(Level::from_high(self.position != 0));
    }

    fn percent_open(&self) -> u64 {
        u64::from(self.position) * 100 / u64::from(self.travel)
    }
}

type BenchValve = ValveController<TimedOutput<Wire>, DebouncedInput<Wire>>;

pub struct Session {
    valve: BenchValve,
    mechanism: Mechanism,
    history: TransitionLog<HISTORY_DEPTH>,
    now: Millis,
    transcript: Option<TranscriptLogger>,
    started_at: HostInstant,
}

impl Session {
    pub fn new(config: &BenchConfig) -> io::Result<Self> {
        let transcript = match &config.transcript {
            Some(path) => Some(TranscriptLogger::new(path)?),
            None => None,
        };

        let mechanism = Mechanism::new(duration_to_millis(config.travel), config.start);
        let now = Millis::ZERO;
        let valve = ValveController::new(
            TimedOutput::new(mechanism.open_line.clone(), Polarity::ActiveHigh),
            TimedOutput::new(mechanism.close_line.clone(), Polarity::ActiveHigh),
            DebouncedInput::new(mechanism.opened_switch.clone(), InputConfig::default(), now),
            DebouncedInput::new(mechanism.closed_switch.clone(), InputConfig::default(), now),
            config.valve,
            now,
        );

        Ok(Self {
            valve,
            mechanism,
            history: TransitionLog::new(),
            now,
            transcript,
            started_at: HostInstant::now(),
        })
    }

    pub fn status(&self) -> ValveStatus {
        self.valve.status()
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<Reply>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let elapsed = self.started_at.elapsed();
        if let Some(transcript) = self.transcript.as_mut() {
            transcript.append_line(elapsed, TranscriptRole::Host, trimmed)?;
        }

        let replies = match console::parse(trimmed) {
            Ok(command) => self.execute(command),
            Err(err) => vec![Reply::error(format!("ERR syntax: {err}"))],
        };

        if let Some(transcript) = self.transcript.as_mut() {
            for reply in &replies {
                transcript.append_line(elapsed, TranscriptRole::Bench, &reply.text)?;
            }
        }
        Ok(replies)
    }

    fn execute(&mut self, command: ConsoleCommand) -> Vec<Reply> {
        match command {
            ConsoleCommand::Open { force: true } => {
                let from = self.valve.status();
                self.valve.force_open(self.now);
                self.forced(from)
            }
            ConsoleCommand::Close { force: true } => {
                let from = self.valve.status();
                self.valve.force_close(self.now);
                self.forced(from)
            }
            ConsoleCommand::Open { force: false } => {
                self.valve.open();
                vec![self.pending_reply()]
            }
            ConsoleCommand::Close { force: false } => {
                self.valve.close();
                vec![self.pending_reply()]
            }
            ConsoleCommand::Toggle => {
                self.valve.toggle();
                vec![self.pending_reply()]
            }
            ConsoleCommand::Status => vec![self.status_reply()],
            ConsoleCommand::History => self.history_replies(),
            ConsoleCommand::Advance(duration) if duration > MAX_ADVANCE => {
                vec![Reply::error(format!(
                    "ERR advance: at most {}s per command",
                    MAX_ADVANCE.as_secs()
                ))]
            }
            ConsoleCommand::Advance(duration) => self.advance(duration),
            ConsoleCommand::Jam => {
                self.mechanism.jammed = true;
                vec![Reply::plain("mechanism jammed")]
            }
            ConsoleCommand::Free => {
                self.mechanism.jammed = false;
                vec![Reply::plain("mechanism free")]
            }
            ConsoleCommand::Help(topic) => help_replies(topic),
        }
    }

    /// Steps the mechanism and the control loop one millisecond at a time.
    fn advance(&mut self, duration: Duration) -> Vec<Reply> {
        let mut replies = Vec::new();
        for _ in 0..duration_to_millis(duration) {
            self.now = Millis(self.now.ticks().wrapping_add(1));
            self.mechanism.step();
            let from = self.valve.status();
            if let Some(to) = self.valve.poll(self.now) {
                replies.push(self.record(from, to));
            }
        }
        replies.push(Reply::plain(format!(
            "{} position={}%",
            format_time(self.now),
            self.mechanism.percent_open()
        )));
        replies
    }

    fn forced(&mut self, from: ValveStatus) -> Vec<Reply> {
        let to = self.valve.status();
        if to == from {
            vec![Reply::plain(format!("already {to}"))]
        } else {
            vec![self.record(from, to)]
        }
    }

    fn record(&mut self, from: ValveStatus, to: ValveStatus) -> Reply {
        self.history.record(self.now, from, to);
        Reply::status(to, format!("{} {from} -> {to}", format_time(self.now)))
    }

    fn pending_reply(&self) -> Reply {
        match self.valve.pending() {
            Some(command) => Reply::plain(format!("pending {command}")),
            None => Reply::plain("pending none"),
        }
    }

    fn status_reply(&self) -> Reply {
        let status = self.valve.status();
        let pending = self
            .valve
            .pending()
            .map_or_else(|| "none".to_string(), |command| command.to_string());
        Reply::status(
            status,
            format!(
                "{} status={status} pending={pending} open-line={} close-line={} position={}%{}",
                format_time(self.now),
                level_label(self.mechanism.open_line.get()),
                level_label(self.mechanism.close_line.get()),
                self.mechanism.percent_open(),
                if self.mechanism.jammed { " jammed" } else { "" },
            ),
        )
    }

    fn history_replies(&self) -> Vec<Reply> {
        if self.history.is_empty() {
            return vec![Reply::plain("no transitions recorded")];
        }
        self.history
            .iter_oldest()
            .map(|entry| {
                let dwell = entry
                    .dwell
                    .map(|dwell| format!(" after {}", format_duration_short(dwell)))
                    .unwrap_or_default();
                Reply::status(
                    entry.to,
                    format!(
                        "#{} {} {} -> {}{dwell}",
                        entry.id,
                        format_time(entry.at),
                        entry.from,
                        entry.to
                    ),
                )
            })
            .collect()
    }
}

fn help_replies(topic: Option<HelpTopic>) -> Vec<Reply> {
    match topic {
        Some(topic) => vec![
            Reply::plain(topic.usage()),
            Reply::plain(format!("  {}", topic.summary())),
        ],
        None => HelpTopic::ALL
            .iter()
            .map(|topic| Reply::plain(format!("{:<30} {}", topic.usage(), topic.summary())))
            .collect(),
    }
}

struct TranscriptLogger {
    writer: BufWriter<fs::File>,
}

impl TranscriptLogger {
    fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };
        logger.write_header()?;
        Ok(logger)
    }

    fn write_header(&mut self) -> io::Result<()> {
        writeln!(self.writer, "# Valve bench transcript")?;
        writeln!(
            self.writer,
            "# Timestamps are wall-clock milliseconds since session start"
        )?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(
        &mut self,
        elapsed: Duration,
        role: TranscriptRole,
        line: &str,
    ) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>6} ms] {} {line}",
            elapsed.as_millis(),
            role.prefix(),
        )?;
        self.writer.flush()
    }
}

enum TranscriptRole {
    Host,
    Bench,
}

impl TranscriptRole {
    fn prefix(&self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Bench => "BENCH<",
        }
    }
}

fn level_label(level: Level) -> &'static str {
    match level {
        Level::High => "high",
        Level::Low => "low",
    }
}

fn format_time(now: Millis) -> String {
    let ticks = now.ticks();
    format!("t={}.{:03}s", ticks / 1_000, ticks % 1_000)
}

fn format_duration_short(duration: Duration) -> String {
    if duration.as_secs() == 0 {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{:.3}s", duration.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bench(start: StartPosition) -> Session {
        let config = BenchConfig {
            valve: ValveConfig::new(Duration::from_secs(2), Duration::from_secs(1)),
            travel: Duration::from_secs(1),
            start,
            transcript: None,
        };
        Session::new(&config).expect("bench session")
    }

    fn texts(replies: &[Reply]) -> Vec<&str> {
        replies.iter().map(|reply| reply.text.as_str()).collect()
    }

    #[test]
    fn start_position_seeds_status() {
        assert_eq!(bench(StartPosition::Closed).status(), ValveStatus::Closed);
        assert_eq!(bench(StartPosition::Opened).status(), ValveStatus::Opened);
        assert_eq!(bench(StartPosition::Midway).status(), ValveStatus::Unknown);
    }

    #[test]
    fn queued_open_travels_to_open_stop() {
        let mut session = bench(StartPosition::Closed);
        let replies = session.handle_command("open").expect("open");
        assert_eq!(texts(&replies), vec!["pending open"]);

        let replies = session.handle_command("advance 2s").expect("advance");
        let lines = texts(&replies);
        assert!(lines.contains(&"t=0.001s closed -> opening"), "{lines:?}");
        assert!(lines.contains(&"t=1.006s opening -> opened"), "{lines:?}");
        assert_eq!(session.status(), ValveStatus::Opened);

        let history = session.handle_command("history").expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].tone, Tone::Status(ValveStatus::Opened));
    }

    #[test]
    fn jammed_mechanism_stalls_until_forced() {
        let mut session = bench(StartPosition::Closed);
        session.handle_command("jam").expect("jam");
        session.handle_command("open").expect("open");
        let replies = session.handle_command("advance 3s").expect("advance");
        assert!(
            replies
                .iter()
                .any(|reply| reply.tone == Tone::Status(ValveStatus::Stalled))
        );

        session.handle_command("free").expect("free");
        session.handle_command("open").expect("queue while stalled");
        session.handle_command("advance 5s").expect("advance");
        assert_eq!(session.status(), ValveStatus::Stalled);

        let replies = session.handle_command("OPEN force").expect("force");
        assert_eq!(replies[0].tone, Tone::Status(ValveStatus::Opening));
        session.handle_command("advance 2s").expect("advance");
        assert_eq!(session.status(), ValveStatus::Opened);
    }

    #[test]
    fn syntax_errors_are_reported() {
        let mut session = bench(StartPosition::Closed);
        let replies = session.handle_command("advance soon").expect("reply");
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].tone, Tone::Error);
        assert!(replies[0].text.starts_with("ERR syntax"));
    }

    #[test]
    fn oversized_advance_is_rejected() {
        let mut session = bench(StartPosition::Closed);
        session.handle_command("open").expect("open");
        let replies = session.handle_command("advance 4294967296s").expect("reply");
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].tone, Tone::Error);
        assert_eq!(session.status(), ValveStatus::Closed);

        let replies = session.handle_command("status").expect("status");
        assert!(replies[0].text.starts_with("t=0.000s"));
    }

    #[test]
    fn help_lists_every_topic() {
        let mut session = bench(StartPosition::Closed);
        let replies = session.handle_command("help").expect("help");
        assert_eq!(replies.len(), HelpTopic::ALL.len());
        let replies = session.handle_command("help jam").expect("help jam");
        assert_eq!(replies[0].text, "jam");
    }

    #[test]
    fn forcing_into_current_stop_is_ignored() {
        let mut session = bench(StartPosition::Opened);
        let replies = session.handle_command("open force").expect("force");
        assert_eq!(texts(&replies), vec!["already opened"]);
    }

    #[test]
    fn transcript_mirrors_session() {
        let path = std::env::temp_dir().join(format!("valve-bench-{}.log", std::process::id()));
        let config = BenchConfig {
            transcript: Some(path.clone()),
            ..BenchConfig::default()
        };
        let mut session = Session::new(&config).expect("bench session");
        session.handle_command("status").expect("status");
        drop(session);

        let contents = fs::read_to_string(&path).expect("transcript written");
        fs::remove_file(&path).expect("transcript removed");
        assert!(contents.contains("HOST> status"));
        assert!(contents.contains("BENCH< t=0.000s status=closed"));
    }
}
