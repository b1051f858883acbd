use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use toolbelt_commons::ToolError;
use toolbelt_editor::{EditRequest, EditorOptions, FileEditor};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn fixture(dir: &TempDir, name: &str, content: &str) -> std::io::Result<PathBuf> {
    let path = dir.path().join(name);
    std::fs::write(&path, content)?;
    Ok(path)
}

fn read(path: &Path) -> std::io::Result<String> {
    std::fs::read_to_string(path)
}

async fn view_all(editor: &FileEditor, path: &Path) -> Result<String, ToolError> {
    let result = editor.execute(&EditRequest::view(path)).await?;
    Ok(result.output.unwrap_or_default())
}

#[tokio::test]
async fn create_then_view_returns_exact_text() -> TestResult {
    let temp = TempDir::new()?;
    let path = temp.path().join("nested/dir/new.txt");
    let editor = FileEditor::default();
    let text = "first line\n\tsecond line\n\nlast without newline";

    let created = editor.execute(&EditRequest::create(&path, text)).await?;
    assert_eq!(
        created.output,
        Some(format!("File created successfully at: {}", path.display()))
    );
    assert_eq!(view_all(&editor, &path).await?, text);
    assert_eq!(editor.history_depth(&path), 1);
    Ok(())
}

#[tokio::test]
async fn create_refuses_existing_path() -> TestResult {
    let temp = TempDir::new()?;
    let path = fixture(&temp, "exists.txt", "keep me")?;
    let editor = FileEditor::default();

    let error = editor.execute(&EditRequest::create(&path, "clobber")).await.err();
    assert!(matches!(error, Some(ToolError::InvalidArgument(_))));
    assert_eq!(read(&path)?, "keep me");
    assert_eq!(editor.history_depth(&path), 0);
    Ok(())
}

#[tokio::test]
async fn create_requires_file_text() -> TestResult {
    let temp = TempDir::new()?;
    let path = temp.path().join("missing_text.txt");
    let editor = FileEditor::default();

    let request = EditRequest::new(toolbelt_editor::EditCommand::Create, &path);
    let error = editor.execute(&request).await.err();
    assert_eq!(
        error.map(|e| e.to_string()).as_deref(),
        Some("Parameter `file_text` is required for command: create")
    );
    assert!(!path.exists());
    Ok(())
}

#[tokio::test]
async fn missing_paths_fail_without_writing() -> TestResult {
    let temp = TempDir::new()?;
    let path = temp.path().join("ghost.txt");
    let editor = FileEditor::default();

    let requests = [
        EditRequest::view(&path),
        EditRequest::str_replace(&path, "a", "b"),
        EditRequest::insert(&path, 0, "x"),
        EditRequest::undo_edit(&path),
    ];
    for request in &requests {
        let error = editor.execute(request).await.err();
        assert!(
            matches!(error, Some(ToolError::NotFound(_))),
            "{} should report a missing path",
            request.command
        );
    }
    assert!(!path.exists());
    assert_eq!(editor.history_depth(&path), 0);
    Ok(())
}

#[tokio::test]
async fn str_replace_round_trip_restores_content() -> TestResult {
    let temp = TempDir::new()?;
    let original = "fn main() {\n    println!(\"hello\");\n}\n";
    let path = fixture(&temp, "main.rs", original)?;
    let editor = FileEditor::default();

    let edited = editor
        .execute(&EditRequest::str_replace(&path, "\"hello\"", "\"goodbye\""))
        .await?;
    let message = edited.output.unwrap_or_default();
    assert!(message.starts_with(&format!("The file {} has been edited.", path.display())));
    assert!(message.contains("     2\t    println!(\"goodbye\");"));
    assert_eq!(read(&path)?, original.replace("hello", "goodbye"));

    editor
        .execute(&EditRequest::str_replace(&path, "\"goodbye\"", "\"hello\""))
        .await?;
    assert_eq!(read(&path)?, original);
    assert_eq!(editor.history_depth(&path), 2);
    Ok(())
}

#[tokio::test]
async fn str_replace_without_match_is_not_found() -> TestResult {
    let temp = TempDir::new()?;
    let path = fixture(&temp, "notes.txt", "alpha\nbeta\n")?;
    let editor = FileEditor::default();

    let error = editor
        .execute(&EditRequest::str_replace(&path, "gamma", "delta"))
        .await
        .err();
    assert!(matches!(error, Some(ToolError::NotFound(_))));
    assert_eq!(editor.history_depth(&path), 0);
    Ok(())
}

#[tokio::test]
async fn ambiguous_replace_lists_lines_and_leaves_file() -> TestResult {
    let temp = TempDir::new()?;
    let original = "let x = 1;\nlet y = 2;\nlet x = 3;\n";
    let path = fixture(&temp, "dup.rs", original)?;
    let editor = FileEditor::default();

    let error = editor
        .execute(&EditRequest::str_replace(&path, "let x", "let z"))
        .await
        .err();
    match error {
        Some(ToolError::Ambiguous { lines, .. }) => assert_eq!(lines, vec![1, 3]),
        other => panic!("expected ambiguous match, got {other:?}"),
    }
    assert_eq!(view_all(&editor, &path).await?, original);
    assert_eq!(editor.history_depth(&path), 0);
    Ok(())
}

#[tokio::test]
async fn insert_positions() -> TestResult {
    let temp = TempDir::new()?;
    let editor = FileEditor::default();

    let front = fixture(&temp, "front.txt", "a\nb\n")?;
    editor.execute(&EditRequest::insert(&front, 0, "x")).await?;
    assert_eq!(read(&front)?, "x\na\nb\n");

    let back = fixture(&temp, "back.txt", "a\nb\n")?;
    editor.execute(&EditRequest::insert(&back, 2, "x")).await?;
    assert_eq!(read(&back)?, "a\nb\nx\n");

    let past = fixture(&temp, "past.txt", "a\nb\n")?;
    let error = editor.execute(&EditRequest::insert(&past, 3, "x")).await.err();
    assert!(matches!(error, Some(ToolError::InvalidRange(_))));
    let error = editor.execute(&EditRequest::insert(&past, -1, "x")).await.err();
    assert!(matches!(error, Some(ToolError::InvalidRange(_))));
    assert_eq!(read(&past)?, "a\nb\n");
    Ok(())
}

#[tokio::test]
async fn insert_multiline_keeps_missing_trailing_newline() -> TestResult {
    let temp = TempDir::new()?;
    let path = fixture(&temp, "plain.txt", "one\ntwo")?;
    let editor = FileEditor::default();

    let result = editor
        .execute(&EditRequest::insert(&path, 1, "inserted\nlines"))
        .await?;
    assert_eq!(read(&path)?, "one\ninserted\nlines\ntwo");
    let message = result.output.unwrap_or_default();
    assert!(message.contains("     2\tinserted\n     3\tlines"));
    Ok(())
}

#[tokio::test]
async fn insert_requires_new_str() -> TestResult {
    let temp = TempDir::new()?;
    let path = fixture(&temp, "a.txt", "a\n")?;
    let editor = FileEditor::default();

    let mut request = EditRequest::insert(&path, 0, "x");
    request.new_str = None;
    let error = editor.execute(&request).await.err();
    assert!(matches!(error, Some(ToolError::InvalidArgument(_))));
    Ok(())
}

#[tokio::test]
async fn single_undo_restores_prior_content_once() -> TestResult {
    let temp = TempDir::new()?;
    let path = fixture(&temp, "undo.txt", "before\n")?;
    let editor = FileEditor::default();

    editor
        .execute(&EditRequest::str_replace(&path, "before", "after"))
        .await?;
    assert_eq!(read(&path)?, "after\n");

    let undone = editor.execute(&EditRequest::undo_edit(&path)).await?;
    assert!(
        undone
            .output
            .unwrap_or_default()
            .starts_with(&format!("Last edit to {} undone successfully.", path.display()))
    );
    assert_eq!(read(&path)?, "before\n");

    let error = editor.execute(&EditRequest::undo_edit(&path)).await.err();
    assert!(matches!(error, Some(ToolError::NoHistory { .. })));
    assert_eq!(read(&path)?, "before\n");
    Ok(())
}

#[tokio::test]
async fn undo_walks_back_through_several_edits() -> TestResult {
    let temp = TempDir::new()?;
    let path = fixture(&temp, "steps.txt", "v1\n")?;
    let editor = FileEditor::default();

    editor.execute(&EditRequest::str_replace(&path, "v1", "v2")).await?;
    editor.execute(&EditRequest::insert(&path, 1, "extra")).await?;
    assert_eq!(read(&path)?, "v2\nextra\n");

    editor.execute(&EditRequest::undo_edit(&path)).await?;
    assert_eq!(read(&path)?, "v2\n");
    editor.execute(&EditRequest::undo_edit(&path)).await?;
    assert_eq!(read(&path)?, "v1\n");
    assert_eq!(editor.history_depth(&path), 0);
    Ok(())
}

#[tokio::test]
async fn ranged_view_is_numbered_and_bounded() -> TestResult {
    let temp = TempDir::new()?;
    let path = fixture(&temp, "range.txt", "l1\nl2\nl3\nl4\n")?;
    let editor = FileEditor::default();

    let result = editor
        .execute(&EditRequest::view(&path).with_view_range(2, 3))
        .await?;
    assert_eq!(result.output.as_deref(), Some("     2\tl2\n     3\tl3"));

    let result = editor
        .execute(&EditRequest::view(&path).with_view_range(3, -1))
        .await?;
    assert_eq!(result.output.as_deref(), Some("     3\tl3\n     4\tl4"));

    for (start, end) in [(0, 2), (5, 5), (3, 2), (1, 9)] {
        let error = editor
            .execute(&EditRequest::view(&path).with_view_range(start, end))
            .await
            .err();
        assert!(matches!(error, Some(ToolError::InvalidRange(_))), "[{start}, {end}]");
    }
    Ok(())
}

#[tokio::test]
async fn large_view_is_clipped_but_narrow_range_is_whole() -> TestResult {
    let temp = TempDir::new()?;
    let content: String = (1..=400).map(|n| format!("line number {n}\n")).collect();
    let path = fixture(&temp, "big.txt", &content)?;
    let editor = FileEditor::new(EditorOptions {
        max_response_chars: 1_000,
        ..EditorOptions::default()
    });

    let clipped = view_all(&editor, &path).await?;
    assert!(clipped.starts_with("line number 1\nline number 2\n"));
    assert!(clipped.contains("characters omitted"));
    assert!(!clipped.contains("line number 400"));

    let result = editor
        .execute(&EditRequest::view(&path).with_view_range(398, 400))
        .await?;
    assert_eq!(
        result.output.as_deref(),
        Some("   398\tline number 398\n   399\tline number 399\n   400\tline number 400")
    );
    Ok(())
}

#[tokio::test]
async fn directories_are_view_only() -> TestResult {
    let temp = TempDir::new()?;
    std::fs::create_dir(temp.path().join("sub"))?;
    fixture(&temp, "visible.txt", "v")?;
    fixture(&temp, ".hidden", "h")?;
    let editor = FileEditor::default();

    let listing = view_all(&editor, temp.path()).await?;
    assert!(listing.contains("up to 2 levels deep"));
    assert!(listing.contains(&temp.path().join("visible.txt").display().to_string()));
    assert!(listing.contains(&temp.path().join("sub").display().to_string()));
    assert!(!listing.contains(".hidden"));

    let error = editor
        .execute(&EditRequest::view(temp.path()).with_view_range(1, 2))
        .await
        .err();
    assert!(matches!(error, Some(ToolError::InvalidArgument(_))));

    for request in [
        EditRequest::str_replace(temp.path(), "a", "b"),
        EditRequest::insert(temp.path(), 0, "x"),
        EditRequest::undo_edit(temp.path()),
    ] {
        let error = editor.execute(&request).await.err().map(|e| e.to_string());
        assert!(
            error
                .as_deref()
                .is_some_and(|message| message.contains("only the `view` command")),
            "{} on a directory: {error:?}",
            request.command
        );
    }
    Ok(())
}

#[tokio::test]
async fn relative_paths_are_rejected() {
    let editor = FileEditor::default();
    let error = editor
        .execute(&EditRequest::view("relative/file.txt"))
        .await
        .err();
    assert!(matches!(error, Some(ToolError::InvalidArgument(_))));
}
