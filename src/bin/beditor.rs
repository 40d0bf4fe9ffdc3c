use beditor::{
    BlockType, Editor, EditorConfig, KeyCommand, LinkRequest, MarkupParser, Position,
    QuoteSource, Selection,
};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reads markup on stdin and prints it in normalized form
    Normalize {
        /// JSON file with quote sources, used to restore avatars
        #[arg(long)]
        quotes: Option<PathBuf>,
    },
    /// Replays a JSON script of editing actions and prints the result
    Replay {
        script: PathBuf,
        /// Initial markup file
        #[arg(long)]
        input: Option<PathBuf>,
        /// Editor config file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Print the raw document as JSON instead of markup
        #[arg(long)]
        json: bool,
    },
}

/// One step of a replay script.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
enum Action {
    Text {
        text: String,
    },
    Key {
        command: String,
    },
    Event {
        name: String,
        #[serde(default)]
        payload: Value,
    },
    #[serde(rename_all = "camelCase")]
    Select {
        block: usize,
        offset: usize,
        #[serde(default)]
        focus_block: Option<usize>,
        #[serde(default)]
        focus_offset: Option<usize>,
    },
    FocusEnd,
    Tab {
        #[serde(default)]
        shift: bool,
    },
    BlockType {
        #[serde(rename = "type")]
        kind: String,
    },
    Style {
        style: String,
    },
    Link {
        #[serde(default)]
        url: String,
        #[serde(default)]
        text: String,
    },
    Unlink,
}

fn main() {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Normalize { quotes } => normalize_command(quotes.as_deref()),
        Commands::Replay {
            script,
            input,
            config,
            json,
        } => replay_command(script, input.as_deref(), config.as_deref(), *json),
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {message}");
    std::process::exit(1);
}

fn read_file(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|err| fail(format!("{}: {err}", path.display())))
}

fn normalize_command(quotes: Option<&Path>) {
    let mut markup = String::new();
    if let Err(err) = std::io::stdin().read_to_string(&mut markup) {
        fail(err);
    }
    let quotes: Vec<QuoteSource> = match quotes {
        Some(path) => serde_json::from_str(&read_file(path)).unwrap_or_else(|err| fail(err)),
        None => Vec::new(),
    };
    println!("{}", MarkupParser::parse(&markup, &quotes).to_markup());
}

fn replay_command(script: &Path, input: Option<&Path>, config: Option<&Path>, json: bool) {
    let actions: Vec<Action> =
        serde_json::from_str(&read_file(script)).unwrap_or_else(|err| fail(err));
    let config = match config {
        Some(path) => EditorConfig::from_path(path).unwrap_or_else(|err| fail(err)),
        None => EditorConfig::default(),
    };

    let mut editor = Editor::new(config, |_| {});
    if let Some(path) = input {
        editor.load(&read_file(path), &[]);
    }
    editor.focus_end();

    for (index, action) in actions.into_iter().enumerate() {
        if let Err(err) = apply(&mut editor, action) {
            fail(format!("action {index}: {err}"));
        }
    }
    editor.flush();

    if json {
        let raw = editor.document().to_raw();
        match serde_json::to_string_pretty(&raw) {
            Ok(output) => println!("{output}"),
            Err(err) => fail(err),
        }
    } else {
        println!("{}", editor.to_markup());
    }
}

fn block_key(editor: &Editor, index: usize) -> Result<beditor::BlockKey, String> {
    editor
        .document()
        .block_at(index)
        .map(|block| block.key)
        .ok_or_else(|| format!("no block at index {index}"))
}

fn apply(editor: &mut Editor, action: Action) -> Result<(), String> {
    match action {
        Action::Text { text } => editor.insert_text(&text),
        Action::Key { command } => {
            // An unhandled command is a no-op, as in the editor itself.
            editor.handle_key_command(&KeyCommand::from_name(&command));
        }
        Action::Event { name, payload } => editor.handle_event(&name, &payload),
        Action::Select {
            block,
            offset,
            focus_block,
            focus_offset,
        } => {
            let anchor = Position::new(block_key(editor, block)?, offset);
            let focus = Position::new(
                block_key(editor, focus_block.unwrap_or(block))?,
                focus_offset.unwrap_or(offset),
            );
            editor.set_selection(Selection::between(anchor, focus));
        }
        Action::FocusEnd => editor.focus_end(),
        Action::Tab { shift } => {
            editor.handle_tab(shift);
        }
        Action::BlockType { kind } => editor.toggle_block_type(BlockType::from_name(&kind)),
        Action::Style { style } => {
            let style = beditor::InlineStyle::from_name(&style)
                .ok_or_else(|| format!("unknown style {style}"))?;
            editor.toggle_inline_style(style);
        }
        Action::Link { url, text } => editor.update_link(&LinkRequest::new(&url, &text)),
        Action::Unlink => editor.unlink(),
    }
    Ok(())
}
