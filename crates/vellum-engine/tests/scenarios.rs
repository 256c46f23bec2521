//! End-to-end editing sessions driven through the public API.

use std::cell::RefCell;
use std::rc::Rc;

use insta::assert_snapshot;
use pretty_assertions::assert_eq;
use vellum_config::Config;
use vellum_engine::notation::parse_document;
use vellum_engine::{
    Commit, Editor, EngineError, EngineSettings, Mark, Position, Range, State, Step, Transaction,
    Tree,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn at(tree: &Tree, path: &[usize]) -> Position {
    Position::from_path(tree, path.to_vec()).unwrap()
}

fn span(tree: &Tree, start: &[usize], end: &[usize]) -> Range {
    Range::from_paths(tree, start.to_vec(), end.to_vec()).unwrap()
}

#[test]
fn typing_moves_the_caret_and_the_selection() {
    init_logging();
    let document = parse_document("<p>hello world</p>").unwrap();
    let mut editor = Editor::new(State::new(document.clone()));

    let mut tx = editor.transaction();
    tx.select_range(&span(&document, &[0, 11], &[0, 11])).unwrap();
    let caret = tx
        .insert_text(&Range::collapsed(at(&document, &[0, 5])), "X", None)
        .unwrap();
    assert_eq!(caret.start().parent_offset(), 6);

    let commit = editor.dispatch(tx).unwrap();
    let state = editor.state();
    assert_eq!(state.document().to_string(), "<p>helloX world</p>");
    assert_eq!(state.selection().focus().unwrap().path(), &[0, 12]);

    // positions held from before the edit carry over through the commit
    let mapped = commit.mapper.map_range(&span(&document, &[0, 6], &[0, 11])).unwrap();
    assert_eq!(mapped.text(), "world");
}

#[test]
fn bold_then_type_inside_and_at_the_edge() {
    init_logging();
    let document = parse_document("<p>hello world</p>").unwrap();
    let state = State::new(document.clone());
    let mut tx = state.create_transaction();

    let bold = tx
        .add_mark(&span(&document, &[0, 0], &[0, 5]), Mark::new("b"))
        .unwrap();
    assert_eq!(bold.text(), "hello");

    let current = tx.document();
    assert!(span(&current, &[0, 1], &[0, 4]).get_marks().has("b"));
    assert!(span(&current, &[0, 6], &[0, 8]).get_marks().is_empty());

    // a caret at the end of the bold run inherits bold
    tx.insert_text(&span(&current, &[0, 5], &[0, 5]), "!", None)
        .unwrap();
    assert_snapshot!(tx.document().to_string(), @"<p><b>hello!</b> world</p>");
}

#[test]
fn splitting_a_list_around_an_item() {
    init_logging();
    let document =
        parse_document("<ul><li><p>one</p></li><li><p>two</p></li><li><p>three</p></li></ul>")
            .unwrap();
    let ul = document.node_at(&[0]).unwrap();
    let state = State::new(document.clone());
    let mut tx = state.create_transaction();

    let between = tx
        .split_until_element(&at(&document, &[0, 1, 0, 0]), &ul)
        .unwrap();
    assert_eq!(between.path(), &[1]);

    let second = tx.document().node_at(&[1]).unwrap();
    tx.unwrap(&second, false).unwrap();
    assert_snapshot!(
        tx.document().to_string(),
        @"<ul><li><p>one</p></li></ul><li><p>two</p></li><li><p>three</p></li>"
    );
}

#[test]
fn splitting_the_outer_list_from_a_nested_item() {
    init_logging();
    let document = parse_document(concat!(
        "<ul>",
        "<li><p>a</p><ul><li><p>b</p></li><li><p>c</p></li></ul></li>",
        "<li><p>d</p></li>",
        "</ul>"
    ))
    .unwrap();
    let outer = document.node_at(&[0]).unwrap();
    let state = State::new(document.clone());
    let mut tx = state.create_transaction();

    let between = tx
        .split_until_element(&at(&document, &[0, 0, 1, 1, 0, 0]), &outer)
        .unwrap();
    assert_eq!(between.path(), &[1]);
    assert_snapshot!(
        tx.document().to_string(),
        @"<ul><li><p>a</p><ul><li><p>b</p></li></ul></li></ul><ul><li><ul><li><p>c</p></li></ul></li><li><p>d</p></li></ul>"
    );
}

#[test]
fn listeners_that_settle_commit_normally() {
    init_logging();
    let document = parse_document("<p>a</p>").unwrap();
    let state = State::new(document.clone());
    let mut tx = state.create_transaction();

    let dispatched: Rc<RefCell<Vec<usize>>> = Rc::default();
    let sink = dispatched.clone();
    tx.add_dispatch_listener(Rc::new(move |commit: &Commit| {
        sink.borrow_mut().push(commit.steps.len());
    }));
    tx.add_step_listener(Rc::new(|tx: &mut Transaction, steps: &[Step]| {
        let edits = steps.iter().filter(|step| step.is_document_step()).count();
        if edits > 0 {
            tx.set_config("edits", Some(edits.to_string().as_str()))?;
        }
        Ok(())
    }));

    tx.insert_text(&span(&document, &[0, 1], &[0, 1]), "b", None)
        .unwrap();
    let commit = tx.commit().unwrap();

    assert_eq!(commit.state.config("edits"), Some("1"));
    assert_eq!(dispatched.borrow().as_slice(), &[2]);
}

#[test]
fn ping_pong_listeners_hit_the_pass_ceiling() {
    init_logging();
    let settings = EngineSettings {
        max_listener_passes: 5,
        ..EngineSettings::default()
    };
    let document = parse_document("<p>a</p>").unwrap();
    let state = State::with_settings(document.clone(), settings);
    let mut tx = state.create_transaction();

    for (name, answer) in [("ping", "pong"), ("pong", "ping")] {
        tx.add_step_listener(Rc::new(move |tx: &mut Transaction, steps: &[Step]| {
            let called = steps.iter().any(|step| match step {
                Step::Config { key, .. } => key == name,
                step => step.is_document_step(),
            });
            if called {
                tx.set_config(answer, Some("1"))?;
            }
            Ok(())
        }));
    }

    tx.insert_text(&span(&document, &[0, 0], &[0, 0]), "x", None)
        .unwrap();
    let error = tx.commit().unwrap_err();
    assert_eq!(error, EngineError::ListenerLoop { passes: 5 });
}

#[test]
fn editor_session_with_undo() {
    init_logging();
    let config: Config = toml::from_str("[editor]\nundo_depth = 10\n").unwrap();
    let mut editor = Editor::new(State::from_config(&config));
    assert_eq!(editor.state().document().to_string(), "");

    let empty = editor.state().document().clone();
    let mut tx = editor.transaction();
    tx.insert_nodes(
        &Range::collapsed(at(&empty, &[0])),
        vec![vellum_engine::Node::element("p", vec![])],
    )
    .unwrap();
    editor.dispatch(tx).unwrap();

    for text in ["one", " two"] {
        let document = editor.state().document().clone();
        let p = document.node_at(&[0]).unwrap();
        let end = Position::from_in_element(&document, &p, p.max_offset()).unwrap();
        let mut tx = editor.transaction();
        tx.insert_text(&Range::collapsed(end), text, None).unwrap();
        editor.dispatch(tx).unwrap();
    }
    assert_eq!(editor.state().document().to_string(), "<p>one two</p>");
    assert_eq!(editor.state().history_len(), 3);

    assert!(editor.undo().unwrap());
    assert_eq!(editor.state().document().to_string(), "<p>one</p>");
    assert!(editor.undo().unwrap());
    assert!(editor.undo().unwrap());
    assert_eq!(editor.state().document().to_string(), "");
    assert!(!editor.undo().unwrap());
}
