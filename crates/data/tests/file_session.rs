use rosterspin_core::{DrawOutcome, FrameScheduler, VirtualClock, PNG_SIGNATURE};
use rosterspin_data::open_session;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time")
        .as_nanos();
    std::env::temp_dir().join(format!(
        "rosterspin_file_session_{tag}_{}_{}",
        std::process::id(),
        nanos
    ))
}

fn write_assets(dir: &PathBuf) {
    fs::create_dir_all(dir).expect("mkdir assets");
    fs::write(
        dir.join("roster.json"),
        r#"[{"id":"Ash"},{"id":"Brin","image_ref":"https://img/brin.png"},{"id":"Cole"}]"#,
    )
    .expect("write roster");
    fs::write(dir.join("reveal.json"), r#"{"preview_ms":100,"spin_ms":500}"#)
        .expect("write reveal");
}

#[test]
fn draws_and_icons_persist_across_sessions() {
    let assets = unique_temp_dir("assets");
    let data = unique_temp_dir("data");
    write_assets(&assets);

    let clock = VirtualClock::new(1_000);
    let mut session =
        open_session(&assets, &data, Some(7), FrameScheduler::new(clock.clone())).expect("open");
    assert_eq!(session.animator().config().spin_ms, 500);
    let DrawOutcome::Started(target) = session.trigger_draw() else {
        panic!("draw refused");
    };
    let mut committed = None;
    for _ in 0..200 {
        clock.advance(16);
        if let Some(entry) = session.pump() {
            committed = Some(entry);
            break;
        }
    }
    assert_eq!(committed.as_ref(), Some(&target));

    let mut png = PNG_SIGNATURE.to_vec();
    png.extend_from_slice(b"body");
    session.upload_icon("Ash", &png).expect("upload");
    drop(session);

    let reopened = open_session(
        &assets,
        &data,
        Some(7),
        FrameScheduler::new(VirtualClock::default()),
    )
    .expect("reopen");
    assert!(reopened.history().contains(&target.id));
    assert_eq!(reopened.available_pool().len(), 2);
    assert!(reopened.icons().icons().contains("Ash"));

    let _ = fs::remove_dir_all(assets);
    let _ = fs::remove_dir_all(data);
}

#[test]
fn missing_roster_is_a_load_error() {
    let assets = unique_temp_dir("empty_assets");
    let data = unique_temp_dir("empty_data");
    fs::create_dir_all(&assets).expect("mkdir");
    let err = open_session(&assets, &data, None, FrameScheduler::new(VirtualClock::default()))
        .err()
        .expect("missing roster");
    assert!(format!("{err:#}").contains("load roster"));
    let _ = fs::remove_dir_all(assets);
    let _ = fs::remove_dir_all(data);
}
