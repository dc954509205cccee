//! Wire types for the kowalski command API.
//!
//! The backend speaks JSON over HTTP: `POST /api/command` for text commands
//! and `POST /api/image` (multipart) for image commands. Both answer with the
//! same `{success, result?, error?}` envelope. The shape of `result` depends
//! on which command was issued, so parsing is keyed by the command identifier
//! rather than by a tag in the payload.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Request body for `POST /api/command`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    /// The backend operation to invoke.
    pub command: String,
    /// Raw input text for the operation.
    pub input: String,
}

/// Response envelope shared by both endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Input mode a command expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Text,
    Image,
}

/// A named backend operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Anagram,
    Match,
    Morse,
    MultiAnagram,
    MultiMatch,
    OffByOne,
    T9,
    Analysis,
    Chunk,
    Letters,
    Shift,
    Transpose,
    WordSearch,
    FirstLetters,
    Reverse,
    CheckWords,
    Colours,
    Hidden,
    Rgb,
    FstAnagram,
    FstRegex,
    FstMorse,
    WordLink,
}

impl Command {
    /// Every command the backend understands, in display order.
    pub const ALL: &'static [Command] = &[
        Command::Anagram,
        Command::Match,
        Command::Morse,
        Command::MultiAnagram,
        Command::MultiMatch,
        Command::OffByOne,
        Command::T9,
        Command::Analysis,
        Command::Chunk,
        Command::Letters,
        Command::Shift,
        Command::Transpose,
        Command::WordSearch,
        Command::FirstLetters,
        Command::Reverse,
        Command::CheckWords,
        Command::Colours,
        Command::Hidden,
        Command::Rgb,
        Command::FstAnagram,
        Command::FstRegex,
        Command::FstMorse,
        Command::WordLink,
    ];

    /// The identifier sent over the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Anagram => "anagram",
            Command::Match => "match",
            Command::Morse => "morse",
            Command::MultiAnagram => "multianagram",
            Command::MultiMatch => "multimatch",
            Command::OffByOne => "offbyone",
            Command::T9 => "t9",
            Command::Analysis => "analysis",
            Command::Chunk => "chunk",
            Command::Letters => "letters",
            Command::Shift => "shift",
            Command::Transpose => "transpose",
            Command::WordSearch => "wordsearch",
            Command::FirstLetters => "firstletters",
            Command::Reverse => "reverse",
            Command::CheckWords => "checkwords",
            Command::Colours => "colours",
            Command::Hidden => "hidden",
            Command::Rgb => "rgb",
            Command::FstAnagram => "fstanagram",
            Command::FstRegex => "fstregex",
            Command::FstMorse => "fstmorse",
            Command::WordLink => "wordlink",
        }
    }

    /// Whether this command takes text or an image file.
    pub fn kind(&self) -> InputKind {
        match self {
            Command::Colours | Command::Hidden | Command::Rgb => InputKind::Image,
            _ => InputKind::Text,
        }
    }

    /// Commands backed by the FST model, which may not be loaded server-side.
    pub fn is_fst(&self) -> bool {
        matches!(
            self,
            Command::FstAnagram | Command::FstRegex | Command::FstMorse | Command::WordLink
        )
    }

    /// One-line usage hint shown in `kowctl commands` and the TUI help bar.
    pub fn summary(&self) -> &'static str {
        match self {
            Command::Anagram => "find single-word anagrams",
            Command::Match => "match a pattern with ? wildcards",
            Command::Morse => "decode morse (/-separated letters)",
            Command::MultiAnagram => "find multi-word anagrams",
            Command::MultiMatch => "match a pattern across multiple words",
            Command::OffByOne => "find words one letter away",
            Command::T9 => "decode a T9 digit sequence",
            Command::Analysis => "analyse text for interesting properties",
            Command::Chunk => "split text into chunks (needs --chunk-sizes)",
            Command::Letters => "letter frequency distribution",
            Command::Shift => "score all caesar shifts",
            Command::Transpose => "transpose a grid of lines",
            Command::WordSearch => "find words in a letter grid",
            Command::FirstLetters => "take the first letter of each word",
            Command::Reverse => "reverse the input",
            Command::CheckWords => "check which words are valid",
            Command::Colours => "extract colours from an image",
            Command::Hidden => "reveal near-identical pixels in an image",
            Command::Rgb => "split an image into RGB channels",
            Command::FstAnagram => "anagram search over the FST model",
            Command::FstRegex => "regex search over the FST model",
            Command::FstMorse => "morse search over the FST model",
            Command::WordLink => "find words linking two others",
        }
    }
}

impl FromStr for Command {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // The backend accepts "colors" as an alias; normalise here too.
        let s = s.to_ascii_lowercase();
        Command::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s || (s == "colors" && *c == Command::Colours))
            .ok_or(())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sentinel written in place of raw image payloads before history persistence.
pub const REDACTED_SENTINEL: &str = "[IMAGE_DATA_REMOVED]";

/// Result fields holding raw image data, keyed by command identifier.
///
/// This is the single redaction rule: the history store consults it before
/// every persistence call and blanks the named fields.
pub const REDACTED_FIELDS: &[(&str, &[&str])] =
    &[("hidden", &["image"]), ("rgb", &["red", "green", "blue"])];

/// Fields to blank for `command` before persisting, if any.
pub fn redacted_fields(command: &str) -> Option<&'static [&'static str]> {
    REDACTED_FIELDS
        .iter()
        .find(|(c, _)| *c == command)
        .map(|(_, fields)| *fields)
}

/// Secondary matches come back wrapped in underscores (`_word_`): they were
/// found only by the backup word list. Returns the bare word and the flag.
pub fn split_secondary(word: &str) -> (&str, bool) {
    if word.len() >= 2 && word.starts_with('_') && word.ends_with('_') {
        (&word[1..word.len() - 1], true)
    } else {
        (word, false)
    }
}

/// A single caesar-shift candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftRow {
    pub shift: u32,
    pub text: String,
    pub score: f64,
}

/// One colour bucket from the `colours` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Colour {
    pub hex: String,
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
    pub count: u64,
}

/// A term matched against the FST model, weighted by frequency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FstMatch {
    pub term: String,
    pub score: u64,
}

/// One word from `checkwords`, with the checkers that validated it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckedWord {
    pub word: String,
    pub valid: bool,
    pub checkers: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordsResult {
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub result: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextResult {
    #[serde(default)]
    pub input: String,
    pub result: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LettersResult {
    #[serde(default)]
    pub input: String,
    pub distribution: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftsResult {
    #[serde(default)]
    pub input: String,
    pub shifts: Vec<ShiftRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordSearchResult {
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub normal: Vec<String>,
    #[serde(default)]
    pub updown: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckWordsResult {
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub result: Vec<Vec<CheckedWord>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColoursResult {
    pub total_colours: u64,
    #[serde(default)]
    pub colours: Vec<Colour>,
    #[serde(default)]
    pub truncated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HiddenResult {
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RgbResult {
    pub red: String,
    pub green: String,
    pub blue: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchesResult {
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub matches: Vec<FstMatch>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordLinkResult {
    #[serde(default)]
    pub input: String,
    pub words: Vec<String>,
    #[serde(default)]
    pub links: Vec<FstMatch>,
}

/// Typed result payload, one variant per wire shape.
///
/// Serialization is untagged so persisted history keeps the backend's own
/// field layout. There is deliberately no `Deserialize` impl: the union is
/// keyed by the command identifier, so reads go through [`from_wire`]
/// (shapes like `{input, result}` are shared by several commands and cannot
/// be told apart from the JSON alone).
///
/// [`from_wire`]: CommandResult::from_wire
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CommandResult {
    Letters(LettersResult),
    Shifts(ShiftsResult),
    WordSearch(WordSearchResult),
    CheckWords(CheckWordsResult),
    Colours(ColoursResult),
    Rgb(RgbResult),
    Hidden(HiddenResult),
    WordLink(WordLinkResult),
    Matches(MatchesResult),
    Words(WordsResult),
    Text(TextResult),
    Other(serde_json::Value),
}

impl CommandResult {
    /// Parse a wire payload into the variant `command` is documented to
    /// return. Unrecognised commands keep the raw value for the generic dump.
    pub fn from_wire(command: &str, value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let parsed = match Command::from_str(command) {
            Err(()) => CommandResult::Other(value),
            Ok(cmd) => match cmd {
                Command::Anagram
                | Command::Match
                | Command::Morse
                | Command::MultiAnagram
                | Command::MultiMatch
                | Command::OffByOne
                | Command::T9
                | Command::Analysis
                | Command::Chunk => CommandResult::Words(serde_json::from_value(value)?),
                Command::Transpose | Command::FirstLetters | Command::Reverse => {
                    CommandResult::Text(serde_json::from_value(value)?)
                }
                Command::Letters => CommandResult::Letters(serde_json::from_value(value)?),
                Command::Shift => CommandResult::Shifts(serde_json::from_value(value)?),
                Command::WordSearch => CommandResult::WordSearch(serde_json::from_value(value)?),
                Command::CheckWords => CommandResult::CheckWords(serde_json::from_value(value)?),
                Command::Colours => CommandResult::Colours(serde_json::from_value(value)?),
                Command::Hidden => CommandResult::Hidden(serde_json::from_value(value)?),
                Command::Rgb => CommandResult::Rgb(serde_json::from_value(value)?),
                Command::FstAnagram | Command::FstRegex | Command::FstMorse => {
                    CommandResult::Matches(serde_json::from_value(value)?)
                }
                Command::WordLink => CommandResult::WordLink(serde_json::from_value(value)?),
            },
        };
        Ok(parsed)
    }
}
