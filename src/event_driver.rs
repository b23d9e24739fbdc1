//! Line-oriented playback event source for driving the OSD by hand.
//!
//! Each input line becomes one bus message, e.g. `song Muse|Starlight|Black Holes|0|3`,
//! `volume 42`, `repeat playlist`.

use std::io::BufRead;
use std::path::PathBuf;

use log::{info, warn};
use tokio::sync::broadcast::Sender;

use crate::protocol::{ConfigMessage, Message, PlaybackMessage, RepeatMode, ShuffleMode, Song};

/// What a single input line asks for.
#[derive(Debug, Clone)]
pub enum DriverCommand {
    Publish(Message),
    Quit,
}

fn parse_number(field: Option<&str>, name: &str) -> Result<i32, String> {
    match field.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(0),
        Some(value) => value
            .parse::<i32>()
            .map_err(|_| format!("invalid {} '{}'", name, value)),
    }
}

fn parse_song(arguments: &str) -> Result<Song, String> {
    let mut fields = arguments.split('|');
    let artist = fields.next().unwrap_or_default().trim().to_string();
    let title = fields.next().unwrap_or_default().trim().to_string();
    let album = fields.next().unwrap_or_default().trim().to_string();
    let disc = parse_number(fields.next(), "disc")?;
    let track = parse_number(fields.next(), "track")?;
    let path = fields
        .next()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from);
    Ok(Song {
        title,
        artist,
        album,
        disc,
        track,
        path,
        art_path: None,
    })
}

fn parse_shuffle_mode(value: &str) -> Result<ShuffleMode, String> {
    match value {
        "off" => Ok(ShuffleMode::Off),
        "all" => Ok(ShuffleMode::All),
        "album" => Ok(ShuffleMode::Album),
        other => Err(format!("unknown shuffle mode '{}'", other)),
    }
}

fn parse_repeat_mode(value: &str) -> Result<RepeatMode, String> {
    match value {
        "off" => Ok(RepeatMode::Off),
        "track" => Ok(RepeatMode::Track),
        "album" => Ok(RepeatMode::Album),
        "playlist" => Ok(RepeatMode::Playlist),
        other => Err(format!("unknown repeat mode '{}'", other)),
    }
}

/// Parses one input line. Blank lines and `#` comments yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<DriverCommand>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (verb, arguments) = line
        .split_once(char::is_whitespace)
        .map(|(verb, rest)| (verb, rest.trim()))
        .unwrap_or((line, ""));

    let playback = |message: PlaybackMessage| -> Result<Option<DriverCommand>, String> {
        Ok(Some(DriverCommand::Publish(Message::Playback(message))))
    };
    match verb.to_ascii_lowercase().as_str() {
        "song" => playback(PlaybackMessage::SongChanged(parse_song(arguments)?)),
        "pause" => playback(PlaybackMessage::Paused),
        "stop" => playback(PlaybackMessage::Stopped),
        "finished" => playback(PlaybackMessage::PlaylistFinished),
        "volume" => {
            let value = arguments
                .parse::<i32>()
                .map_err(|_| format!("invalid volume '{}'", arguments))?;
            playback(PlaybackMessage::VolumeChanged(value))
        }
        "shuffle" => playback(PlaybackMessage::ShuffleModeChanged(parse_shuffle_mode(
            &arguments.to_ascii_lowercase(),
        )?)),
        "repeat" => playback(PlaybackMessage::RepeatModeChanged(parse_repeat_mode(
            &arguments.to_ascii_lowercase(),
        )?)),
        "reload" => Ok(Some(DriverCommand::Publish(Message::Config(
            ConfigMessage::ReloadOsdSettings,
        )))),
        "preview" => Ok(Some(DriverCommand::Publish(Message::Config(
            ConfigMessage::PreviewOsd,
        )))),
        "quit" | "exit" => Ok(Some(DriverCommand::Quit)),
        other => Err(format!("unknown command '{}'", other)),
    }
}

/// Reads commands from `input` until EOF or `quit`, publishing each on the bus.
pub fn run_event_driver<R: BufRead>(input: R, bus_producer: &Sender<Message>) {
    info!("EventDriver: reading playback events from input");
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!("EventDriver: failed to read input: {}", err);
                break;
            }
        };
        match parse_command(&line) {
            Ok(Some(DriverCommand::Publish(message))) => {
                if bus_producer.send(message).is_err() {
                    warn!("EventDriver: bus has no subscribers, stopping");
                    break;
                }
            }
            Ok(Some(DriverCommand::Quit)) => break,
            Ok(None) => {}
            Err(err) => warn!("EventDriver: {}", err),
        }
    }
}
