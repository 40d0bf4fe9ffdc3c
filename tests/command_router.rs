use beditor::{
    BlockType, DataValue, Document, Editor, EditorConfig, EditorPlugin, EditorState, InlineStyle,
    JumpDirection, KeyCommand, Pipeline, Plugin, PluginKind, Position, Selection,
};
use serde_json::json;

fn editor_with(markup: &str) -> Editor {
    let mut editor = Editor::new(EditorConfig::default(), |_| {});
    editor.load(markup, &[]);
    editor
}

fn caret(editor: &mut Editor, block: usize, offset: usize) {
    let key = editor.document().block_at(block).unwrap().key;
    editor.set_selection(Selection::collapsed(key, offset));
}

fn texts(doc: &Document) -> Vec<String> {
    doc.blocks().map(|block| block.text().to_string()).collect()
}

fn active_flags(doc: &Document) -> Vec<Option<bool>> {
    doc.blocks()
        .filter(|block| block.is_quote())
        .map(|block| block.data_bool("active"))
        .collect()
}

mod quotes {
    use super::*;

    #[test]
    fn quoteadd_then_typing_goes_after_the_quotes() {
        let mut editor = editor_with("[quote=\"sam\"]\nhello\n[/quote]");
        assert_eq!(texts(editor.document()), vec!["hello", ""]);

        editor.handle_event("quoteadd", &json!({"username": "ann", "text": "world"}));
        assert_eq!(texts(editor.document()), vec!["hello", "world", ""]);
        assert_eq!(
            editor.selection().anchor_key,
            editor.document().last_block().key
        );

        editor.insert_text("reply");
        assert_eq!(
            editor.to_markup(),
            "[quote=\"sam\" src=\"\"]\nhello\n[/quote]\n\n\
             [quote=\"ann\" src=\"\"]\nworld\n[/quote]\n\nreply"
        );
    }

    #[test]
    fn quoteadd_on_text_appends_trailing_paragraph() {
        let mut editor = editor_with("draft");
        editor.handle_event("quoteadd", &json!({"username": "ann", "text": "q"}));
        assert_eq!(texts(editor.document()), vec!["draft", "q", ""]);
    }

    #[test]
    fn anchor_decides_the_active_quote() {
        let mut editor =
            editor_with("[quote=\"a\"]\nA\n[/quote]\n\n[quote=\"b\"]\nB\n[/quote]");
        assert_eq!(editor.document().block_count(), 3);

        caret(&mut editor, 1, 0);
        assert_eq!(active_flags(editor.document()), vec![Some(false), Some(true)]);

        caret(&mut editor, 0, 1);
        assert_eq!(active_flags(editor.document()), vec![Some(true), Some(false)]);

        editor.focus_end();
        assert_eq!(active_flags(editor.document()), vec![Some(false), Some(false)]);
    }

    #[test]
    fn enter_inside_quote_is_a_soft_newline() {
        let mut editor = editor_with("[quote=\"a\"]\nab\n[/quote]");
        caret(&mut editor, 0, 1);
        assert!(editor.handle_key_command(&KeyCommand::SplitBlock));
        assert_eq!(texts(editor.document()), vec!["a\nb", ""]);
        assert_eq!(editor.selection().anchor_offset, 2);
    }

    #[test]
    fn render_block_reports_quote_props() {
        let mut editor = editor_with("[quote=\"a\"]\nA\n[/quote]");
        caret(&mut editor, 0, 0);
        let quote = editor.document().first_block().clone();
        let descriptor = editor.render_block(&quote).unwrap();
        assert_eq!(descriptor.component, "quote");
        assert_eq!(descriptor.props["active"], DataValue::Bool(true));
        assert_eq!(descriptor.props["username"], DataValue::from("a"));
        let trailing = editor.document().last_block().clone();
        assert!(editor.render_block(&trailing).is_none());
    }
}

mod quote_jumps {
    use super::*;

    const TWO_QUOTES: &str = "[quote=\"a\"]\nx\n[/quote]\n\n[quote=\"b\"]\ny\n[/quote]";

    #[test]
    fn jump_below_opens_a_paragraph_between_quotes() {
        let mut editor = editor_with(TWO_QUOTES);
        let first = editor.document().first_block().key;
        editor.handle_event(
            "quotejump",
            &json!({"blockKey": first, "direction": "below"}),
        );
        editor.insert_text("mid");
        assert_eq!(texts(editor.document()), vec!["x", "mid", "y", ""]);
        assert_eq!(
            editor.selection().anchor_key,
            editor.document().block_at(1).unwrap().key
        );
        assert_eq!(
            editor.to_markup(),
            "[quote=\"a\" src=\"\"]\nx\n[/quote]\n\nmid\n\n[quote=\"b\" src=\"\"]\ny\n[/quote]\n\n<br>"
        );
    }

    #[test]
    fn jump_above_the_first_quote_inserts_a_leading_paragraph() {
        let mut editor = editor_with("[quote=\"a\"]\nx\n[/quote]");
        caret(&mut editor, 0, 1);
        assert_eq!(active_flags(editor.document()), vec![Some(true)]);

        let quote = editor.document().first_block().key;
        editor.jump_from_quote(quote, JumpDirection::Above);
        let doc = editor.document();
        assert_eq!(texts(doc), vec!["", "x", ""]);
        assert_eq!(editor.selection().anchor_key, doc.first_block().key);
        assert_eq!(editor.selection().anchor_offset, 0);
        assert_eq!(active_flags(doc), vec![Some(false)]);
    }

    #[test]
    fn jump_below_the_last_quote_reuses_the_trailing_paragraph() {
        let mut editor = editor_with(TWO_QUOTES);
        let last_quote = editor.document().block_at(1).unwrap().key;
        editor.jump_from_quote(last_quote, JumpDirection::Below);
        let doc = editor.document();
        assert_eq!(doc.block_count(), 3);
        assert_eq!(editor.selection().anchor_key, doc.last_block().key);
    }

    #[test]
    fn jump_above_reuses_an_empty_paragraph_between_quotes() {
        let mut editor = editor_with(TWO_QUOTES);
        let first = editor.document().first_block().key;
        editor.jump_from_quote(first, JumpDirection::Below);
        let second = editor.document().block_at(2).unwrap().key;
        editor.jump_from_quote(second, JumpDirection::Above);
        let doc = editor.document();
        assert_eq!(texts(doc), vec!["x", "", "y", ""]);
        assert_eq!(
            editor.selection().anchor_key,
            doc.block_at(1).unwrap().key
        );
    }

    #[test]
    fn jump_from_a_paragraph_is_ignored() {
        let mut editor = editor_with("text");
        editor.flush();
        let key = editor.document().first_block().key;
        let before = editor.document().clone();
        editor.jump_from_quote(key, JumpDirection::Below);
        editor.handle_event(
            "quotejump",
            &json!({"blockKey": key, "direction": "above"}),
        );
        assert_eq!(*editor.document(), before);
        assert!(!editor.has_pending_change());
    }
}

mod trailing_block {
    use super::*;

    #[test]
    fn toggling_last_block_to_quote_keeps_a_paragraph_after_it() {
        let mut editor = editor_with("a");
        editor.focus_end();
        editor.toggle_block_type(BlockType::Quote);
        let doc = editor.document();
        assert_eq!(doc.block_count(), 2);
        assert!(doc.first_block().is_quote());
        assert!(!doc.last_block().is_quote());
        assert_eq!(doc.first_block().data_str("username"), Some(""));
    }

    #[test]
    fn merging_into_a_quote_is_repaired() {
        let mut editor = editor_with("[quote=\"a\"]\nx\n[/quote]");
        editor.focus_end();
        assert!(editor.handle_key_command(&KeyCommand::Backspace));
        let doc = editor.document();
        assert_eq!(texts(doc), vec!["x", ""]);
        assert!(!doc.last_block().is_quote());
        assert_eq!(editor.selection().anchor_key, doc.first_block().key);
        assert_eq!(active_flags(doc), vec![Some(true)]);
    }

    #[test]
    fn backspace_on_sole_empty_paragraph_is_unhandled() {
        let mut editor = Editor::new(EditorConfig::default(), |_| {});
        editor.focus_end();
        editor.flush();
        assert!(!editor.handle_key_command(&KeyCommand::Backspace));
        assert!(!editor.handle_key_command(&KeyCommand::Delete));
        assert_eq!(editor.document().block_count(), 1);
        assert!(!editor.has_pending_change());
    }
}

mod key_commands {
    use super::*;

    #[test]
    fn empty_leading_block_is_removed() {
        let mut editor = editor_with("<br>\n\nnext");
        caret(&mut editor, 0, 0);
        assert!(editor.handle_key_command(&KeyCommand::Backspace));
        assert_eq!(texts(editor.document()), vec!["next"]);
    }

    #[test]
    fn backspace_merges_paragraphs() {
        let mut editor = editor_with("ab\n\ncd");
        caret(&mut editor, 1, 0);
        assert!(editor.handle_key_command(&KeyCommand::Backspace));
        assert_eq!(texts(editor.document()), vec!["abcd"]);
        assert_eq!(editor.selection().anchor_offset, 2);
    }

    #[test]
    fn split_then_type() {
        let mut editor = editor_with("abcd");
        caret(&mut editor, 0, 2);
        assert!(editor.handle_key_command(&KeyCommand::SplitBlock));
        editor.insert_text("X");
        assert_eq!(editor.to_markup(), "ab\n\nXcd");
    }

    #[test]
    fn enter_on_empty_list_item_ends_the_list() {
        let mut editor = editor_with("- a\n\n- ");
        caret(&mut editor, 1, 0);
        assert!(editor.handle_key_command(&KeyCommand::SplitBlock));
        assert_eq!(editor.to_markup(), "- a\n\n<br>");
    }

    #[test]
    fn pending_style_applies_to_typed_text() {
        let mut editor = editor_with("a");
        editor.focus_end();
        assert!(editor.handle_key_command(&KeyCommand::Bold));
        editor.insert_text("b");
        assert_eq!(editor.to_markup(), "a**b**");
    }

    #[test]
    fn style_toggle_over_a_range() {
        let mut editor = editor_with("abc");
        let key = editor.document().first_block().key;
        editor.set_selection(Selection::between(
            Position::new(key, 0),
            Position::new(key, 2),
        ));
        editor.toggle_inline_style(InlineStyle::Italic);
        assert_eq!(editor.to_markup(), "*ab*c");
        editor.toggle_inline_style(InlineStyle::Italic);
        assert_eq!(editor.to_markup(), "abc");
    }

    #[test]
    fn unknown_command_is_unhandled() {
        let mut editor = editor_with("a");
        assert!(!editor.handle_key_command(&KeyCommand::from_name("transpose")));
    }
}

mod tabs {
    use super::*;

    #[test]
    fn tab_nests_under_the_previous_item() {
        let mut editor = editor_with("- a\n\n- b");
        caret(&mut editor, 1, 0);
        assert!(editor.handle_tab(false));
        assert_eq!(editor.document().block_at(1).unwrap().depth, 1);
        // No deeper than one level below the previous item.
        assert!(!editor.handle_tab(false));
        assert!(editor.handle_tab(true));
        assert_eq!(editor.document().block_at(1).unwrap().depth, 0);
    }

    #[test]
    fn tab_outside_lists_is_unhandled() {
        let mut editor = editor_with("a\n\nb");
        caret(&mut editor, 1, 0);
        assert!(!editor.handle_tab(false));
    }

    #[test]
    fn tab_leaves_over_indented_items_alone() {
        let mut editor = editor_with("- a\n\n    - b");
        caret(&mut editor, 1, 0);
        assert_eq!(editor.document().block_at(1).unwrap().depth, 2);
        assert!(!editor.handle_tab(false));
        assert_eq!(editor.document().block_at(1).unwrap().depth, 2);
        assert!(editor.handle_tab(true));
        assert_eq!(editor.document().block_at(1).unwrap().depth, 1);

        let config = EditorConfig {
            max_tab_depth: 1,
            ..EditorConfig::default()
        };
        let mut editor = Editor::new(config, |_| {});
        editor.load("- a\n\n  - b\n\n    - c", &[]);
        caret(&mut editor, 2, 0);
        assert!(!editor.handle_tab(false));
        assert_eq!(editor.document().block_at(2).unwrap().depth, 2);
    }

    #[test]
    fn max_depth_comes_from_config() {
        let config = EditorConfig {
            max_tab_depth: 0,
            ..EditorConfig::default()
        };
        let mut editor = Editor::new(config, |_| {});
        editor.load("- a\n\n- b", &[]);
        caret(&mut editor, 1, 0);
        assert!(!editor.handle_tab(false));
    }
}

mod events {
    use super::*;

    #[test]
    fn imageadd_inserts_at_caret() {
        let mut editor = editor_with("a");
        editor.focus_end();
        editor.handle_event(
            "imageadd",
            &json!({"src": "cat.png", "width": 4, "height": 3}),
        );
        assert_eq!(editor.to_markup(), "a![image|4x3](cat.png)");
    }

    #[test]
    fn upload_lifecycle() {
        let mut editor = editor_with("");
        editor.focus_end();
        editor.handle_event("uploadstart", &json!({"id": "u1", "name": "cat.png"}));
        assert_eq!(editor.to_markup(), "![cat.png](upload://u1)");
        editor.handle_event(
            "uploadfinish",
            &json!({"id": "u1", "src": "http://c/cat.png"}),
        );
        assert_eq!(editor.to_markup(), "![cat.png](http://c/cat.png)");
    }

    #[test]
    fn failed_upload_removes_placeholder() {
        let mut editor = editor_with("ab");
        caret(&mut editor, 0, 1);
        editor.handle_event("uploadstart", &json!({"id": "u1"}));
        editor.insert_text("!");
        editor.handle_event("uploadfail", &json!({"id": "u1"}));
        assert_eq!(editor.document().first_block().text(), "a!b");
        assert_eq!(editor.selection().anchor_offset, 2);
    }

    #[test]
    fn malformed_payload_changes_nothing() {
        let mut editor = editor_with("a");
        editor.handle_event("quoteadd", &json!("not an object"));
        editor.handle_event("nothing", &json!({}));
        assert_eq!(editor.to_markup(), "a");
    }

    #[test]
    fn plugins_can_be_left_out() {
        let config = EditorConfig {
            plugins: vec![PluginKind::Core],
            ..EditorConfig::default()
        };
        let mut editor = Editor::new(config, |_| {});
        editor.handle_event("quoteadd", &json!({"username": "a", "text": "q"}));
        assert_eq!(editor.document().block_count(), 1);
    }
}

mod focus {
    use super::*;

    #[test]
    fn click_focuses_the_end_once() {
        let mut editor = editor_with("ab\n\ncd");
        assert!(!editor.selection().has_focus);
        editor.handle_click();
        assert!(editor.selection().has_focus);
        assert_eq!(editor.selection().anchor_offset, 2);
        assert_eq!(
            editor.selection().anchor_key,
            editor.document().last_block().key
        );

        caret(&mut editor, 0, 0);
        editor.handle_click();
        assert_eq!(
            editor.selection().anchor_key,
            editor.document().first_block().key
        );
    }

    #[test]
    fn selection_is_clamped_into_the_document() {
        let mut editor = editor_with("ab");
        let key = editor.document().first_block().key;
        editor.set_selection(Selection::collapsed(key, 99));
        assert_eq!(editor.selection().anchor_offset, 2);
    }
}

#[derive(Debug)]
struct NumberList;

impl EditorPlugin for NumberList {
    fn name(&self) -> &str {
        "number-list"
    }

    fn handle_key_command(&self, state: &EditorState, command: &KeyCommand) -> Option<EditorState> {
        if command.as_str() != "number" {
            return None;
        }
        let key = state.selection().anchor_key;
        let next = state
            .document()
            .set_block_type(key, BlockType::OrderedListItem)
            .ok()?;
        Some(state.with_document(next))
    }
}

#[test]
fn custom_plugin_intercepts_commands() {
    let mut editor = Editor::new(EditorConfig::default(), |_| {})
        .with_pipeline(Pipeline::default().with(Plugin::Custom(Box::new(NumberList))));
    editor.load("item", &[]);
    assert!(editor.handle_key_command(&KeyCommand::from_name("number")));
    assert_eq!(editor.to_markup(), "1. item");
}
