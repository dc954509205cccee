//! Terminal output for rendered entries (one-shot and `history show`).
//!
//! Consumes the toolkit-agnostic blocks from [`crate::render`]; all text in
//! them is already sanitized. Colour handling stays in here so the render
//! layer knows nothing about the terminal.

use crate::history::HistoryStore;
use crate::render::{self, Block, EntryView, ImageNote, ItemStyle};
use owo_colors::OwoColorize;

pub struct Printer {
    color: bool,
}

impl Printer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Print one entry: header, input, then its result or error blocks.
    pub fn print_entry(&self, view: &EntryView) {
        if self.color {
            println!("{}  {}", view.command.bold().cyan(), view.time.dimmed());
            println!("{}", format!("> {}", view.input).dimmed());
        } else {
            println!("{}  {}", view.command, view.time);
            println!("> {}", view.input);
        }
        for block in &view.blocks {
            self.print_block(block);
        }
    }

    /// Print the whole history, most recent first, separated by blank lines.
    pub fn print_history(&self, history: &HistoryStore) {
        if history.entries().is_empty() {
            println!("History is empty.");
            return;
        }
        for entry in history.entries() {
            self.print_entry(&render::render_entry(entry));
            println!();
        }
    }

    fn print_block(&self, block: &Block) {
        match block {
            Block::Line(text) => println!("{}", text),
            Block::Heading(text) => {
                if self.color {
                    println!("{}", text.bold());
                } else {
                    println!("{}", text);
                }
            }
            Block::WordList(items) => {
                let rendered: Vec<String> = items
                    .iter()
                    .map(|item| match item.style {
                        ItemStyle::Primary => item.text.clone(),
                        ItemStyle::Secondary => {
                            if self.color {
                                item.text.dimmed().italic().to_string()
                            } else {
                                format!("{}*", item.text)
                            }
                        }
                        ItemStyle::Invalid => {
                            if self.color {
                                item.text.red().to_string()
                            } else {
                                format!("!{}", item.text)
                            }
                        }
                    })
                    .collect();
                println!("{}", rendered.join("  "));
            }
            Block::Bullets(items) => {
                for item in items {
                    println!("  - {}", item);
                }
            }
            Block::Pre(text) => {
                for line in text.lines() {
                    println!("  {}", line);
                }
            }
            Block::LetterBars(bars) => {
                for bar in bars {
                    let fill: String = "█".repeat(bar.width as usize);
                    println!("  {}: {:<40} {}", bar.letter, fill, bar.count);
                }
            }
            Block::Shifts(lines) => {
                for line in lines {
                    let row = format!("{:>2}: {} ({})", line.shift, line.text, line.score);
                    if line.highlight && self.color {
                        println!("  {}", row.bold().green());
                    } else if line.highlight {
                        println!("* {}", row);
                    } else {
                        println!("  {}", row);
                    }
                }
            }
            Block::Swatches(colours) => {
                for colour in colours {
                    let alpha = if colour.a < 255 {
                        format!(" | A({})", colour.a)
                    } else {
                        String::new()
                    };
                    let info = format!(
                        "{} | RGB({}, {}, {}){} | {} pixels",
                        colour.hex, colour.r, colour.g, colour.b, alpha, colour.count
                    );
                    if self.color {
                        println!(
                            "  {} {}",
                            "  ".on_truecolor(colour.r, colour.g, colour.b),
                            info
                        );
                    } else {
                        println!("  {}", info);
                    }
                }
            }
            Block::Image { label, note } => match note {
                ImageNote::Saved(path) => println!("{}: saved to {}", label, path.display()),
                ImageNote::Unavailable => {
                    println!("{}: image data not available in history", label)
                }
                ImageNote::Raw(len) => {
                    println!("{}: image payload present ({} base64 chars)", label, len)
                }
            },
            Block::Dump(text) => {
                for line in text.lines() {
                    println!("  {}", line);
                }
            }
            Block::Error(text) => {
                if self.color {
                    println!("{}", text.red());
                } else {
                    println!("{}", text);
                }
            }
        }
    }
}
