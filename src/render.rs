//! Pure rendering of command results into a display tree.
//!
//! Nothing in here touches a terminal: results map to a list of [`Block`]s
//! that both the one-shot printer and the TUI know how to draw. Backend and
//! user text is sanitized at this boundary so control sequences never reach
//! the display.

use crate::history::{HistoryEntry, PendingEntry, SavedImage};
use crate::protocol::{
    split_secondary, Colour, Command, CommandResult, InputKind, REDACTED_SENTINEL,
};
use std::path::PathBuf;
use std::str::FromStr;

/// Columns used by the widest letter-frequency bar.
pub const BAR_WIDTH: u64 = 40;

/// Caesar shifts scoring above this are likely plaintext.
pub const SHIFT_HIGHLIGHT: f64 = 0.5;

/// Visual weight of one item in a word list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStyle {
    Primary,
    /// Found only by the backup word list (`_word_` on the wire).
    Secondary,
    /// Failed validation (`checkwords`).
    Invalid,
}

#[derive(Debug, Clone)]
pub struct WordItem {
    pub text: String,
    pub style: ItemStyle,
}

#[derive(Debug, Clone)]
pub struct LetterBar {
    pub letter: char,
    pub count: u64,
    /// Scaled linearly against the maximum observed count.
    pub width: u64,
}

#[derive(Debug, Clone)]
pub struct ShiftLine {
    pub shift: u32,
    pub text: String,
    /// Pre-formatted to five decimal places.
    pub score: String,
    pub highlight: bool,
}

/// Where an image payload ended up.
#[derive(Debug, Clone)]
pub enum ImageNote {
    /// Decoded and written to disk during this session.
    Saved(PathBuf),
    /// Redacted before persistence; the payload is gone.
    Unavailable,
    /// Payload present but not decoded to a file; size in base64 chars.
    Raw(usize),
}

/// One toolkit-agnostic piece of a rendered result.
#[derive(Debug, Clone)]
pub enum Block {
    Line(String),
    Heading(String),
    WordList(Vec<WordItem>),
    Bullets(Vec<String>),
    /// Preformatted text, line structure preserved.
    Pre(String),
    LetterBars(Vec<LetterBar>),
    Shifts(Vec<ShiftLine>),
    Swatches(Vec<Colour>),
    Image { label: String, note: ImageNote },
    /// Generic structured dump for unknown result shapes.
    Dump(String),
    Error(String),
}

/// A fully rendered history entry.
#[derive(Debug, Clone)]
pub struct EntryView {
    pub command: String,
    pub time: String,
    pub input: String,
    pub blocks: Vec<Block>,
}

/// Strip control and escape sequences so backend text cannot inject
/// terminal state. Newlines and tabs survive for preformatted blocks.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// Render a resolved entry: header fields plus result or error blocks.
pub fn render_entry(entry: &HistoryEntry) -> EntryView {
    let blocks = if let Some(error) = &entry.error {
        vec![Block::Error(format!("Error: {}", sanitize(error)))]
    } else if let Some(result) = &entry.result {
        render_result(&entry.command, result, &entry.saved)
    } else {
        Vec::new()
    };

    EntryView {
        command: sanitize(&entry.command),
        time: entry
            .time
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        input: match entry.kind {
            InputKind::Text => sanitize(&entry.input),
            InputKind::Image => format!("Image: {}", sanitize(&entry.input)),
        },
        blocks,
    }
}

/// Render the in-flight placeholder.
pub fn render_pending(pending: &PendingEntry) -> EntryView {
    EntryView {
        command: sanitize(&pending.command),
        time: "Processing...".to_string(),
        input: sanitize(&pending.input),
        blocks: vec![Block::Line("Executing command...".to_string())],
    }
}

/// Map a typed result to display blocks. Pure: no IO, no terminal calls.
pub fn render_result(command: &str, result: &CommandResult, saved: &[SavedImage]) -> Vec<Block> {
    match result {
        CommandResult::Words(w) => match Command::from_str(command) {
            Ok(Command::Analysis) => render_analysis(&w.result),
            Ok(Command::Chunk) => render_chunks(&w.result),
            _ => render_word_list(&w.result),
        },
        CommandResult::Text(t) => match Command::from_str(command) {
            Ok(Command::Transpose) => vec![Block::Pre(sanitize(&t.result))],
            _ => vec![Block::Line(sanitize(&t.result))],
        },
        CommandResult::Letters(l) => render_letters(&l.distribution),
        CommandResult::Shifts(s) => vec![Block::Shifts(
            s.shifts
                .iter()
                .map(|row| ShiftLine {
                    shift: row.shift,
                    text: sanitize(&row.text),
                    score: format!("{:.5}", row.score),
                    highlight: row.score > SHIFT_HIGHLIGHT,
                })
                .collect(),
        )],
        CommandResult::WordSearch(ws) => {
            let mut blocks = vec![Block::Heading("Normal:".to_string())];
            blocks.extend(render_word_list(&ws.normal));
            blocks.push(Block::Heading("Up/Down:".to_string()));
            blocks.extend(render_word_list(&ws.updown));
            blocks
        }
        CommandResult::CheckWords(cw) => cw
            .result
            .iter()
            .map(|line| {
                Block::WordList(
                    line.iter()
                        .map(|word| WordItem {
                            text: sanitize(&word.word),
                            style: if word.valid {
                                ItemStyle::Primary
                            } else {
                                ItemStyle::Invalid
                            },
                        })
                        .collect(),
                )
            })
            .collect(),
        CommandResult::Colours(c) => {
            let mut line = format!("Total colours: {}", c.total_colours);
            if c.truncated {
                line.push_str(" (showing first 25)");
            }
            vec![Block::Line(line), Block::Swatches(c.colours.clone())]
        }
        CommandResult::Hidden(h) => {
            vec![image_block("Hidden pixels result", &h.image, saved)]
        }
        CommandResult::Rgb(rgb) => vec![
            image_block("Red channel", &rgb.red, saved),
            image_block("Green channel", &rgb.green, saved),
            image_block("Blue channel", &rgb.blue, saved),
        ],
        CommandResult::Matches(m) => {
            if m.matches.is_empty() {
                return vec![Block::Line("No results found".to_string())];
            }
            vec![Block::WordList(
                m.matches
                    .iter()
                    .map(|fm| WordItem {
                        text: format!("{} ({})", sanitize(&fm.term), fm.score),
                        style: ItemStyle::Primary,
                    })
                    .collect(),
            )]
        }
        CommandResult::WordLink(wl) => {
            let (left, right) = match wl.words.as_slice() {
                [left, right, ..] => (left.as_str(), right.as_str()),
                _ => ("?", "?"),
            };
            let mut blocks = vec![Block::Line(format!(
                "Linking words for '{}' <> '{}':",
                sanitize(left),
                sanitize(right)
            ))];
            blocks.push(Block::WordList(
                wl.links
                    .iter()
                    .map(|link| WordItem {
                        text: format!("{} ({})", sanitize(&link.term), link.score),
                        style: ItemStyle::Primary,
                    })
                    .collect(),
            ));
            blocks
        }
        CommandResult::Other(value) => {
            let dump = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
            vec![Block::Dump(sanitize(&dump))]
        }
    }
}

fn render_word_list(words: &[String]) -> Vec<Block> {
    if words.is_empty() {
        return vec![Block::Line("No results found".to_string())];
    }
    vec![Block::WordList(
        words
            .iter()
            .map(|word| {
                let (text, secondary) = split_secondary(word);
                WordItem {
                    text: sanitize(text),
                    style: if secondary {
                        ItemStyle::Secondary
                    } else {
                        ItemStyle::Primary
                    },
                }
            })
            .collect(),
    )]
}

fn render_analysis(items: &[String]) -> Vec<Block> {
    if items.is_empty() {
        return vec![Block::Line("Nothing interesting found".to_string())];
    }
    vec![Block::Bullets(items.iter().map(|i| sanitize(i)).collect())]
}

// Chunks are plain fragments; the secondary-delimiter convention does not
// apply, an underscore-wrapped chunk is shown as-is.
fn render_chunks(chunks: &[String]) -> Vec<Block> {
    vec![Block::WordList(
        chunks
            .iter()
            .map(|chunk| WordItem {
                text: sanitize(chunk),
                style: ItemStyle::Primary,
            })
            .collect(),
    )]
}

fn render_letters(distribution: &std::collections::BTreeMap<String, u64>) -> Vec<Block> {
    let counts: Vec<(char, u64)> = ('A'..='Z')
        .map(|letter| {
            let count = distribution
                .get(&letter.to_string())
                .copied()
                .unwrap_or_default();
            (letter, count)
        })
        .collect();
    let max = counts.iter().map(|(_, c)| *c).max().unwrap_or_default();

    vec![Block::LetterBars(
        counts
            .into_iter()
            .map(|(letter, count)| LetterBar {
                letter,
                count,
                width: if max > 0 { count * BAR_WIDTH / max } else { 0 },
            })
            .collect(),
    )]
}

fn image_block(label: &str, data: &str, saved: &[SavedImage]) -> Block {
    let note = if let Some(image) = saved
        .iter()
        .find(|s| s.label.eq_ignore_ascii_case(label))
    {
        ImageNote::Saved(image.path.clone())
    } else if data == REDACTED_SENTINEL {
        ImageNote::Unavailable
    } else {
        ImageNote::Raw(data.len())
    };
    Block::Image {
        label: label.to_string(),
        note,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{
        CheckWordsResult, CheckedWord, HiddenResult, LettersResult, ShiftRow, ShiftsResult,
        TextResult, WordsResult,
    };

    fn words(items: &[&str]) -> CommandResult {
        CommandResult::Words(WordsResult {
            input: String::new(),
            result: items.iter().map(|s| s.to_string()).collect(),
        })
    }

    #[test]
    fn test_secondary_words_are_marked_and_stripped() {
        let blocks = render_result("anagram", &words(&["cat", "_dog_"]), &[]);
        match &blocks[0] {
            Block::WordList(items) => {
                assert_eq!(items[0].text, "cat");
                assert_eq!(items[0].style, ItemStyle::Primary);
                assert_eq!(items[1].text, "dog");
                assert_eq!(items[1].style, ItemStyle::Secondary);
            }
            other => panic!("unexpected block: {:?}", other),
        }
    }

    #[test]
    fn test_empty_word_list() {
        let blocks = render_result("anagram", &words(&[]), &[]);
        match &blocks[0] {
            Block::Line(text) => assert_eq!(text, "No results found"),
            other => panic!("unexpected block: {:?}", other),
        }
    }

    #[test]
    fn test_empty_analysis() {
        let blocks = render_result("analysis", &words(&[]), &[]);
        match &blocks[0] {
            Block::Line(text) => assert_eq!(text, "Nothing interesting found"),
            other => panic!("unexpected block: {:?}", other),
        }
    }

    #[test]
    fn test_chunks_keep_underscores() {
        let blocks = render_result("chunk", &words(&["_ab_", "cd"]), &[]);
        match &blocks[0] {
            Block::WordList(items) => {
                assert_eq!(items[0].text, "_ab_");
                assert_eq!(items[0].style, ItemStyle::Primary);
            }
            other => panic!("unexpected block: {:?}", other),
        }
    }

    #[test]
    fn test_letter_bars_scale_against_max() {
        let mut distribution = std::collections::BTreeMap::new();
        distribution.insert("A".to_string(), 10);
        distribution.insert("B".to_string(), 5);
        let result = CommandResult::Letters(LettersResult {
            input: String::new(),
            distribution,
        });

        let blocks = render_result("letters", &result, &[]);
        match &blocks[0] {
            Block::LetterBars(bars) => {
                assert_eq!(bars.len(), 26);
                assert_eq!(bars[0].width, BAR_WIDTH);
                assert_eq!(bars[1].width, BAR_WIDTH / 2);
                assert_eq!(bars[2].width, 0);
            }
            other => panic!("unexpected block: {:?}", other),
        }
    }

    #[test]
    fn test_shift_scores_have_five_decimals() {
        let result = CommandResult::Shifts(ShiftsResult {
            input: String::new(),
            shifts: vec![
                ShiftRow {
                    shift: 13,
                    text: "hello".into(),
                    score: 0.9,
                },
                ShiftRow {
                    shift: 1,
                    text: "ifmmp".into(),
                    score: 0.012345678,
                },
            ],
        });

        let blocks = render_result("shift", &result, &[]);
        match &blocks[0] {
            Block::Shifts(lines) => {
                assert_eq!(lines[0].score, "0.90000");
                assert!(lines[0].highlight);
                assert_eq!(lines[1].score, "0.01235");
                assert!(!lines[1].highlight);
            }
            other => panic!("unexpected block: {:?}", other),
        }
    }

    #[test]
    fn test_error_entry_renders_exact_message() {
        let mut entry = HistoryEntry::new("anagram", "listen", InputKind::Text);
        entry.error = Some("x".to_string());
        let view = render_entry(&entry);
        match &view.blocks[0] {
            Block::Error(text) => assert_eq!(text, "Error: x"),
            other => panic!("unexpected block: {:?}", other),
        }
    }

    #[test]
    fn test_sanitize_strips_escape_sequences() {
        assert_eq!(sanitize("\x1b[31mred\x1b[0m"), "[31mred[0m");
        assert_eq!(sanitize("a\r\nb\tc\x07"), "a\nb\tc");
    }

    #[test]
    fn test_redacted_image_is_noted() {
        let result = CommandResult::Hidden(HiddenResult {
            image: REDACTED_SENTINEL.to_string(),
        });
        let blocks = render_result("hidden", &result, &[]);
        match &blocks[0] {
            Block::Image { note, .. } => assert!(matches!(note, ImageNote::Unavailable)),
            other => panic!("unexpected block: {:?}", other),
        }
    }

    #[test]
    fn test_saved_image_points_at_path() {
        let result = CommandResult::Hidden(HiddenResult {
            image: "QkFTRTY0".to_string(),
        });
        let saved = vec![SavedImage {
            label: "Hidden pixels result".to_string(),
            path: PathBuf::from("kowalski-hidden-1.png"),
        }];
        let blocks = render_result("hidden", &result, &saved);
        match &blocks[0] {
            Block::Image {
                note: ImageNote::Saved(path),
                ..
            } => assert_eq!(path, &PathBuf::from("kowalski-hidden-1.png")),
            other => panic!("unexpected block: {:?}", other),
        }
    }

    #[test]
    fn test_checkwords_flags_invalid_words() {
        let result = CommandResult::CheckWords(CheckWordsResult {
            input: String::new(),
            result: vec![vec![
                CheckedWord {
                    word: "hello".into(),
                    valid: true,
                    checkers: vec![0],
                },
                CheckedWord {
                    word: "zzzzz".into(),
                    valid: false,
                    checkers: vec![],
                },
            ]],
        });
        let blocks = render_result("checkwords", &result, &[]);
        match &blocks[0] {
            Block::WordList(items) => {
                assert_eq!(items[0].style, ItemStyle::Primary);
                assert_eq!(items[1].style, ItemStyle::Invalid);
            }
            other => panic!("unexpected block: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_result_dumps_json() {
        let result = CommandResult::Other(serde_json::json!({"weird": [1, 2]}));
        let blocks = render_result("mystery", &result, &[]);
        match &blocks[0] {
            Block::Dump(text) => assert!(text.contains("weird")),
            other => panic!("unexpected block: {:?}", other),
        }
    }

    #[test]
    fn test_transpose_is_preformatted() {
        let result = CommandResult::Text(TextResult {
            input: String::new(),
            result: "ab\ncd".to_string(),
        });
        let blocks = render_result("transpose", &result, &[]);
        assert!(matches!(&blocks[0], Block::Pre(text) if text == "ab\ncd"));
    }

    #[test]
    fn test_image_input_label() {
        let entry = HistoryEntry::new("hidden", "secret.png", InputKind::Image);
        let view = render_entry(&entry);
        assert_eq!(view.input, "Image: secret.png");
    }
}
