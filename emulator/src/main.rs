mod session;

use std::env;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process;

use crossterm::style::Stylize;
use session::{BenchConfig, Reply, Session, StartPosition, Tone};
use valve_core::console;
use valve_core::valve::ValveStatus;

const USAGE: &str = "Usage: valve-bench [--power-on-timeout <dur>] [--duty-cycle <dur>] \
                     [--travel <dur>] [--start <opened|closed|midway>] \
                     [--transcript <path>] [--no-color]";

fn main() -> io::Result<()> {
    let (config, color) = parse_args().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let color = color && stdout.is_terminal();
    let mut writer = stdout.lock();
    let mut session = Session::new(&config)?;
    let mut line = String::new();

    writeln!(
        writer,
        "Valve bench ready, valve {}. Type `help` for commands or `exit` to quit.",
        session.status()
    )?;

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        for reply in session.handle_command(trimmed)? {
            write_reply(&mut writer, &reply, color)?;
        }
    }

    Ok(())
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn write_reply(writer: &mut impl Write, reply: &Reply, color: bool) -> io::Result<()> {
    let text = reply.text.as_str();
    if !color {
        return writeln!(writer, "{text}");
    }
    match reply.tone {
        Tone::Plain => writeln!(writer, "{text}"),
        Tone::Error => writeln!(writer, "{}", text.red()),
        Tone::Status(ValveStatus::Opened | ValveStatus::Closed) => {
            writeln!(writer, "{}", text.green())
        }
        Tone::Status(ValveStatus::Opening | ValveStatus::Closing) => {
            writeln!(writer, "{}", text.yellow())
        }
        Tone::Status(ValveStatus::Stalled) => writeln!(writer, "{}", text.red().bold()),
        Tone::Status(ValveStatus::Unknown) => writeln!(writer, "{}", text.dark_grey()),
    }
}

fn parse_args() -> Result<(BenchConfig, bool), String> {
    let mut config = BenchConfig::default();
    let mut color = true;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
            None => (arg, None),
        };
        if flag == "--no-color" {
            color = false;
            continue;
        }

        let value = match inline {
            Some(value) => value,
            None => args
                .next()
                .ok_or_else(|| format!("Expected value after {flag}"))?,
        };
        match flag.as_str() {
            "--power-on-timeout" => {
                config.valve.power_on_timeout = duration_arg(&flag, &value)?;
            }
            "--duty-cycle" => config.valve.duty_cycle_timeout = duration_arg(&flag, &value)?,
            "--travel" => config.travel = duration_arg(&flag, &value)?,
            "--start" => config.start = StartPosition::from_tag(&value)?,
            "--transcript" => config.transcript = Some(PathBuf::from(value)),
            other => return Err(format!("Unknown option `{other}`")),
        }
    }

    Ok((config, color))
}

fn duration_arg(flag: &str, value: &str) -> Result<std::time::Duration, String> {
    console::parse_duration(value).map_err(|err| format!("Invalid {flag} `{value}`: {err}"))
}
