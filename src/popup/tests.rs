use super::*;
use crate::error::PopupError;

fn manager() -> (HeadlessHost, PopupManager) {
    let host = HeadlessHost::new();
    (host.clone(), PopupManager::new(host))
}

#[test]
fn test_reopen_closes_previous_window() {
    let (host, mut popups) = manager();
    let config = PopupConfig::default().protected();

    let first = popups.open("about:blank", "auction_display", &config).unwrap();
    let second = popups.open("about:blank", "auction_display", &config).unwrap();

    assert!(host.is_closed(first.handle.window()));
    assert_eq!(host.close_requests(first.handle.window()), 1);
    assert!(!host.is_closed(second.handle.window()));
    assert_eq!(popups.count(), 1);
    assert_eq!(popups.handle("auction_display"), Some(second.handle.clone()));
    assert!(!popups.is_valid(&first.handle));
    assert!(popups.is_valid(&second.handle));
}

#[test]
fn test_protected_popup_is_not_watched() {
    let (_host, mut popups) = manager();
    let opened = popups
        .open("about:blank", "board", &PopupConfig::default().protected())
        .unwrap();
    assert!(opened.watch.is_none());
    assert!(popups.poll_msg("board").is_none());
}

#[test]
fn test_user_close_is_detected_by_poll() {
    let (host, mut popups) = manager();
    let opened = popups
        .open("about:blank", "board", &PopupConfig::default())
        .unwrap();
    assert!(opened.watch.is_some());
    assert!(popups.is_open("board"));

    // Still open: the poll re-arms.
    let msg = popups.poll_msg("board").unwrap();
    assert!(popups.update(Box::new(msg)).is_some());
    assert_eq!(popups.count(), 1);

    host.simulate_user_close(opened.handle.window());
    assert!(!popups.is_open("board"));

    let msg = popups.poll_msg("board").unwrap();
    assert!(popups.update(Box::new(msg.clone())).is_some());
    assert_eq!(popups.count(), 0);
    assert!(popups.handle("board").is_none());

    // A duplicate of the last poll finds nothing left to watch.
    assert!(popups.update(Box::new(msg)).is_none());
}

#[test]
fn test_stale_poll_after_reopen_is_ignored() {
    let (_host, mut popups) = manager();
    let config = PopupConfig::default();
    popups.open("about:blank", "board", &config).unwrap();
    let old = popups.poll_msg("board").unwrap();

    popups.open("about:blank", "board", &config).unwrap();
    assert!(popups.update(Box::new(old)).is_none());
    assert!(popups.poll_msg("board").is_some());
}

#[test]
fn test_blocked_open() {
    let (host, mut popups) = manager();
    host.set_blocked(true);

    let err = popups
        .open("about:blank", "board", &PopupConfig::default())
        .unwrap_err();
    assert_eq!(err, PopupError::Blocked("board".to_string()));
    assert_eq!(popups.count(), 0);
    assert!(popups.handle("board").is_none());
}

#[test]
fn test_close_is_idempotent() {
    let (host, mut popups) = manager();
    let opened = popups
        .open("about:blank", "board", &PopupConfig::default())
        .unwrap();

    assert!(popups.close("board"));
    assert!(!popups.close("board"));
    assert!(!popups.close("never-opened"));
    assert_eq!(host.close_requests(opened.handle.window()), 1);
}

#[test]
fn test_close_after_user_close_deregisters() {
    let (host, mut popups) = manager();
    let opened = popups
        .open("about:blank", "board", &PopupConfig::default())
        .unwrap();
    host.simulate_user_close(opened.handle.window());

    assert!(!popups.close("board"));
    assert_eq!(popups.count(), 0);
    assert_eq!(host.close_requests(opened.handle.window()), 0);
}

#[test]
fn test_close_all_respects_protection() {
    let (host, mut popups) = manager();
    popups
        .open("about:blank", "a", &PopupConfig::default())
        .unwrap();
    popups
        .open("about:blank", "b", &PopupConfig::default())
        .unwrap();
    let kept = popups
        .open("about:blank", "kept", &PopupConfig::default().protected())
        .unwrap();

    assert_eq!(popups.teardown(), 2);
    assert_eq!(popups.names().collect::<Vec<_>>(), vec!["kept"]);
    assert!(!host.is_closed(kept.handle.window()));

    assert_eq!(popups.close_all(true), 1);
    assert_eq!(popups.count(), 0);
}

#[test]
fn test_document_access_on_closed_window_deregisters() {
    let (host, mut popups) = manager();
    let opened = popups
        .open("about:blank", "board", &PopupConfig::default().protected())
        .unwrap();
    host.simulate_user_close(opened.handle.window());

    let err = popups.document(&opened.handle).unwrap_err();
    assert_eq!(err, PopupError::WindowGone("board".to_string()));
    assert_eq!(popups.count(), 0);
}

#[test]
fn test_document_access_writes_current_document() {
    let (host, mut popups) = manager();
    let opened = popups
        .open("about:blank", "board", &PopupConfig::default())
        .unwrap();

    let mut doc = popups.document(&opened.handle).unwrap();
    let before = doc.generation().unwrap();
    doc.write("<html><head><title>Board</title></head><body><div id=\"root\"></div></body></html>")
        .unwrap();
    assert!(doc.generation().unwrap() > before);
    assert!(doc.has_element("root"));
    assert!(!doc.has_element("missing"));
    assert_eq!(host.title(opened.handle.window()).as_deref(), Some("Board"));
}

#[test]
fn test_open_uses_centred_features() {
    let host = HeadlessHost::with_screen(1600, 900);
    let mut popups = PopupManager::new(host.clone());
    let opened = popups
        .open("about:blank", "board", &PopupConfig::default())
        .unwrap();

    assert_eq!(
        host.features(opened.handle.window()).as_deref(),
        Some(
            "width=800,height=600,top=150,left=400,toolbar=no,scrollbars=yes,\
             resizable=yes,status=no,menubar=no,location=no"
        )
    );
    assert_eq!(host.url(opened.handle.window()).as_deref(), Some("about:blank"));
}

#[test]
fn test_features_clamp_and_explicit_position() {
    let config = PopupConfig::default().with_size(2000, 600);
    assert!(config.features((1024, 768)).contains("top=84,left=0"));

    let config = PopupConfig::default()
        .with_position(10, 20)
        .with_resizable(false)
        .with_scrollbars(false)
        .with_toolbar(true);
    assert_eq!(
        config.features((1920, 1080)),
        "width=800,height=600,top=10,left=20,toolbar=yes,scrollbars=no,\
         resizable=no,status=no,menubar=no,location=no"
    );
}

#[test]
fn test_config_deserializes_with_defaults() {
    let config: PopupConfig =
        serde_json::from_str(r#"{"width": 640, "prevent_auto_close": true}"#).unwrap();
    assert_eq!(config.width, 640);
    assert_eq!(config.height, 600);
    assert!(config.prevent_auto_close);
    assert!(config.resizable);
}

#[test]
fn test_unrelated_messages_are_ignored() {
    let (_host, mut popups) = manager();
    assert!(popups.update(Box::new(42_u32)).is_none());
}
