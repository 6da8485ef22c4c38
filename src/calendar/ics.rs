// file: src/calendar/ics.rs
//
// Streaming parser for the small subset of iCalendar that external feeds are
// allowed to use. Anything outside that subset is an error rather than
// something to skip over.

use crate::error::ParseError;
use crate::models::ExternalEvent;
use chrono::{NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use regex::Regex;
use std::sync::OnceLock;

/// Properties that are accepted anywhere inside the calendar and dropped.
const IGNORED_COMMANDS: &[&str] = &[
    "VERSION",
    "METHOD",
    "PRODID",
    "X-LIC-LOCATION",
    "DTSTAMP",
    "STATUS",
    "CLASS",
    "PRIORITY",
    "CATEGORIES",
];

const DATETIME_FORMAT: &str = "%Y%m%dT%H%M%S";

fn datetime_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{8}T\d{6}$").expect("datetime pattern is valid"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimezoneRule {
    Standard,
    Daylight,
}

impl TimezoneRule {
    fn end_line(&self) -> &'static str {
        match self {
            TimezoneRule::Standard => "END:STANDARD",
            TimezoneRule::Daylight => "END:DAYLIGHT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    Outside,
    InCalendar,
    InTimezone,
    /// Inside a STANDARD or DAYLIGHT block; everything up to its END is skipped.
    InTimezoneRule(TimezoneRule),
    InEvent,
    /// Inside a whole-day event that is being discarded.
    SkippingEvent,
    Done,
}

#[derive(Debug, Default)]
struct PendingEvent {
    uid: String,
    name: String,
    start: Option<i64>,
    end: Option<i64>,
}

impl PendingEvent {
    fn finish(self) -> ExternalEvent {
        let start = self.start.unwrap_or(0);
        ExternalEvent {
            uid: self.uid,
            name: self.name,
            start,
            end: self.end.unwrap_or(start),
            calendar_id: 0,
        }
    }
}

/// Line-at-a-time ICS parser.
///
/// Bytes can be pushed in arbitrary chunks with [`IcsParser::feed_chunk`];
/// complete lines are parsed as soon as they are available, so a feed never
/// has to be held in memory as a whole. [`IcsParser::finish`] returns the
/// parsed events, or an error if the feed stopped before `END:VCALENDAR`.
#[derive(Debug)]
pub struct IcsParser {
    state: ParserState,
    timezone: Tz,
    current: Option<PendingEvent>,
    events: Vec<ExternalEvent>,
    line_number: usize,
    partial: Vec<u8>,
}

impl Default for IcsParser {
    fn default() -> Self {
        Self::new()
    }
}

impl IcsParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::Outside,
            timezone: chrono_tz::UTC,
            current: None,
            events: Vec::new(),
            line_number: 0,
            partial: Vec::new(),
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Buffers `chunk` and parses every line it completes.
    pub fn feed_chunk(&mut self, chunk: &[u8]) -> Result<(), ParseError> {
        self.partial.extend_from_slice(chunk);

        while let Some(newline) = self.partial.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.partial.drain(..=newline).collect();
            let line = self.decode_line(&raw[..newline])?;
            self.feed_line(&line)?;
        }

        Ok(())
    }

    fn decode_line(&self, raw: &[u8]) -> Result<String, ParseError> {
        String::from_utf8(raw.to_vec()).map_err(|_| ParseError::new(self.line_number + 1, "line is not valid UTF-8"))
    }

    /// Parses a single line. A trailing `\r` is ignored.
    pub fn feed_line(&mut self, line: &str) -> Result<(), ParseError> {
        self.line_number += 1;
        let line = line.strip_suffix('\r').unwrap_or(line);

        match self.state {
            ParserState::Done => return Ok(()),
            ParserState::InTimezoneRule(rule) => {
                if line == rule.end_line() {
                    self.state = ParserState::InTimezone;
                }
                return Ok(());
            }
            ParserState::SkippingEvent => {
                if line == "END:VEVENT" {
                    self.current = None;
                    self.state = ParserState::InCalendar;
                }
                return Ok(());
            }
            _ => {}
        }

        let (head, value) = line
            .split_once(':')
            .ok_or_else(|| self.error(format!("line without ':' '{}'", line)))?;
        let mut head_parts = head.split(';');
        let command = head_parts.next().unwrap_or_default();
        let is_whole_day = head_parts.any(|param| param == "VALUE=DATE");

        match command {
            "BEGIN" => self.begin(value),
            "END" => self.end(value),
            "CALSCALE" => {
                self.require_state(&[ParserState::InCalendar], command)?;
                if value != "GREGORIAN" {
                    return Err(self.error(format!("unexpected CALSCALE '{}'", value)));
                }
                Ok(())
            }
            "TZID" => {
                self.require_state(&[ParserState::InCalendar, ParserState::InTimezone], command)?;
                self.timezone = value
                    .parse::<Tz>()
                    .map_err(|_| self.error(format!("unknown TZID '{}'", value)))?;
                Ok(())
            }
            "UID" | "SUMMARY" | "DTSTART" | "DTEND" => self.event_property(command, value, is_whole_day),
            _ if IGNORED_COMMANDS.contains(&command) => {
                if self.state == ParserState::Outside {
                    return Err(self.error(format!("'{}' outside VCALENDAR", command)));
                }
                Ok(())
            }
            _ => Err(self.error(format!("unhandled line '{}'", line))),
        }
    }

    fn begin(&mut self, component: &str) -> Result<(), ParseError> {
        self.state = match (self.state, component) {
            (ParserState::Outside, "VCALENDAR") => ParserState::InCalendar,
            (ParserState::InCalendar, "VTIMEZONE") => ParserState::InTimezone,
            (ParserState::InCalendar, "VEVENT") => {
                self.current = Some(PendingEvent::default());
                ParserState::InEvent
            }
            (ParserState::InTimezone, "STANDARD") => ParserState::InTimezoneRule(TimezoneRule::Standard),
            (ParserState::InTimezone, "DAYLIGHT") => ParserState::InTimezoneRule(TimezoneRule::Daylight),
            _ => return Err(self.error(format!("unexpected BEGIN '{}'", component))),
        };
        Ok(())
    }

    fn end(&mut self, component: &str) -> Result<(), ParseError> {
        self.state = match (self.state, component) {
            (ParserState::InCalendar, "VCALENDAR") => ParserState::Done,
            (ParserState::InTimezone, "VTIMEZONE") => ParserState::InCalendar,
            (ParserState::InEvent, "VEVENT") => {
                if let Some(pending) = self.current.take() {
                    self.events.push(pending.finish());
                }
                ParserState::InCalendar
            }
            _ => return Err(self.error(format!("unexpected END '{}'", component))),
        };
        Ok(())
    }

    fn event_property(&mut self, command: &str, value: &str, is_whole_day: bool) -> Result<(), ParseError> {
        if self.state != ParserState::InEvent {
            return Err(self.error(format!("'{}' outside VEVENT", command)));
        }

        if is_whole_day {
            // whole-day events are not imported
            self.state = ParserState::SkippingEvent;
            return Ok(());
        }

        let timestamp = match command {
            "DTSTART" | "DTEND" => Some(self.parse_datetime(value)?),
            _ => None,
        };

        let line_number = self.line_number;
        let pending = self
            .current
            .as_mut()
            .ok_or_else(|| ParseError::new(line_number, "event state without an event"))?;

        match command {
            "UID" => pending.uid = value.to_string(),
            "SUMMARY" => pending.name = value.to_string(),
            "DTSTART" => pending.start = timestamp,
            _ => pending.end = timestamp,
        }

        Ok(())
    }

    /// Reads a `YYYYMMDDTHHMMSS` local time in the active zone. Per-property
    /// TZID parameters are ignored.
    fn parse_datetime(&self, value: &str) -> Result<i64, ParseError> {
        if !datetime_pattern().is_match(value) {
            return Err(self.error(format!("malformed date-time '{}'", value)));
        }

        let naive = NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
            .map_err(|e| self.error(format!("malformed date-time '{}': {}", value, e)))?;

        let local = self
            .timezone
            .from_local_datetime(&naive)
            .earliest()
            .ok_or_else(|| self.error(format!("'{}' does not exist in {}", value, self.timezone.name())))?;

        Ok(local.timestamp())
    }

    fn require_state(&self, allowed: &[ParserState], command: &str) -> Result<(), ParseError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(self.error(format!("unexpected '{}' in {:?}", command, self.state)))
        }
    }

    fn error<S: Into<String>>(&self, reason: S) -> ParseError {
        ParseError::new(self.line_number, reason)
    }

    /// Flushes any unterminated last line and returns the parsed events.
    pub fn finish(mut self) -> Result<Vec<ExternalEvent>, ParseError> {
        if !self.partial.is_empty() {
            let raw = std::mem::take(&mut self.partial);
            let line = self.decode_line(&raw)?;
            self.feed_line(&line)?;
        }

        if self.state != ParserState::Done {
            return Err(self.error("feed ended before END:VCALENDAR"));
        }

        log::debug!("Parsed {} events from {} ICS lines", self.events.len(), self.line_number);
        Ok(self.events)
    }
}

/// Parses a complete feed held in memory.
pub fn parse_str(input: &str) -> Result<Vec<ExternalEvent>, ParseError> {
    let mut parser = IcsParser::new();
    parser.feed_chunk(input.as_bytes())?;
    parser.finish()
}
