//! Terminal command line parsing for the native binary.

use num_traits::FromPrimitive;
use thiserror::Error;

use crate::stopwatch::WidgetEvent;
use crate::ui::{Button, SnapshotView};

pub const HELP: &str = "\
LAPWATCH HELP

  start | 1      Start
  stop  | 2      Stop
  lap   | 3      Record lap
  reset | 4      Reset
  note <n> <text>  Set note of lap n (index or id)
  del <n>        Delete lap n (index or id)
  help           This text
  quit           Exit";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Press(Button),
    Note { lap: String, text: String },
    Delete { lap: String },
    Help,
    Quit,
    Empty,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command {0:?}, try help")]
    Unknown(String),
    #[error("usage: {0} <lap>")]
    MissingLap(&'static str),
    #[error("no lap {0}")]
    NoSuchLap(String),
}

pub fn parse(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (line, ""),
    };

    let command = match word {
        "" => Command::Empty,
        "start" | "s" => Command::Press(Button::Start),
        "stop" | "x" => Command::Press(Button::Stop),
        "lap" | "l" => Command::Press(Button::Lap),
        "reset" | "r" => Command::Press(Button::Reset),
        "help" | "h" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        "note" | "n" => {
            let (lap, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            if lap.is_empty() {
                return Err(CommandError::MissingLap("note"));
            }
            Command::Note {
                lap: lap.to_string(),
                text: text.trim_start().to_string(),
            }
        }
        "del" | "d" | "delete" => {
            if rest.is_empty() {
                return Err(CommandError::MissingLap("del"));
            }
            Command::Delete {
                lap: rest.to_string(),
            }
        }
        other => match other.parse::<u8>().ok().and_then(Button::from_u8) {
            Some(button) => Command::Press(button),
            None => return Err(CommandError::Unknown(other.to_string())),
        },
    };
    Ok(command)
}

/// Maps a command onto the widget event it stands for, resolving lap
/// references against what is currently on screen.
pub fn to_event(command: &Command, screen: &SnapshotView) -> Result<Option<WidgetEvent>, CommandError> {
    let event = match command {
        Command::Press(button) => Some(WidgetEvent::Click(*button)),
        Command::Note { lap, text } => {
            let row = screen
                .find_row(lap)
                .ok_or_else(|| CommandError::NoSuchLap(lap.clone()))?;
            Some(row.note_event(text))
        }
        Command::Delete { lap } => {
            let row = screen
                .find_row(lap)
                .ok_or_else(|| CommandError::NoSuchLap(lap.clone()))?;
            Some(row.delete_event())
        }
        Command::Help | Command::Quit | Command::Empty => None,
    };
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::{lap_rows, View};
    use timer_core::{LapLedger, LapRecord};

    fn screen() -> SnapshotView {
        let mut laps = LapLedger::new();
        laps.push(LapRecord::new("100abc".into(), 0, 100));
        laps.push(LapRecord::new("250def".into(), 100, 250));
        let mut view = SnapshotView::new();
        view.show_laps(&lap_rows(&laps));
        view
    }

    #[test]
    fn test_buttons() {
        assert_eq!(parse("start"), Ok(Command::Press(Button::Start)));
        assert_eq!(parse("  x "), Ok(Command::Press(Button::Stop)));
        assert_eq!(parse("3"), Ok(Command::Press(Button::Lap)));
        assert_eq!(parse("4"), Ok(Command::Press(Button::Reset)));
        assert_eq!(parse("9"), Err(CommandError::Unknown("9".into())));
        assert_eq!(parse(""), Ok(Command::Empty));
    }

    #[test]
    fn test_note() {
        assert_eq!(
            parse("note 2 felt  good"),
            Ok(Command::Note {
                lap: "2".into(),
                text: "felt  good".into()
            })
        );
        assert_eq!(
            parse("note 2"),
            Ok(Command::Note {
                lap: "2".into(),
                text: String::new()
            })
        );
        assert_eq!(parse("note"), Err(CommandError::MissingLap("note")));
    }

    #[test]
    fn test_delete() {
        assert_eq!(parse("del 100abc"), Ok(Command::Delete { lap: "100abc".into() }));
        assert_eq!(parse("del"), Err(CommandError::MissingLap("del")));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CommandError::Unknown("jump".into()).to_string(),
            "unknown command \"jump\", try help"
        );
        assert_eq!(CommandError::MissingLap("del").to_string(), "usage: del <lap>");
        assert_eq!(CommandError::NoSuchLap("7".into()).to_string(), "no lap 7");
        let boxed: Box<dyn std::error::Error> = Box::new(CommandError::NoSuchLap("2".into()));
        assert_eq!(boxed.to_string(), "no lap 2");
    }

    #[test]
    fn test_to_event_resolves_laps() {
        let screen = screen();
        let note = parse("note 2 hill").unwrap();
        assert_eq!(
            to_event(&note, &screen),
            Ok(Some(WidgetEvent::EditNote {
                id: "250def".into(),
                text: "hill".into()
            }))
        );
        let del = parse("del 100abc").unwrap();
        assert_eq!(
            to_event(&del, &screen),
            Ok(Some(WidgetEvent::DeleteLap("100abc".into())))
        );
        let missing = parse("del 7").unwrap();
        assert_eq!(to_event(&missing, &screen), Err(CommandError::NoSuchLap("7".into())));
        assert_eq!(to_event(&Command::Help, &screen), Ok(None));
    }
}
