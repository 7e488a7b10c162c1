// tests/dedup_registry.rs
use feed_monitor::dedup::{fingerprint, SeenRegistry, FINGERPRINT_LEN};
use feed_monitor::ingest::types::CandidateItem;
use std::fs;

fn item(title: &str, summary: &str, link: &str) -> CandidateItem {
    CandidateItem {
        title: title.into(),
        summary: summary.into(),
        link: link.into(),
        published: String::new(),
    }
}

#[test]
fn fingerprint_is_pure_and_short_hex() {
    let a = item("Quake", "M5.1", "https://x.test/1");
    let fp1 = fingerprint(&a);
    let fp2 = fingerprint(&a.clone());
    assert_eq!(fp1, fp2);
    assert_eq!(fp1.as_str().len(), FINGERPRINT_LEN);
    assert!(fp1.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[test]
fn linkless_items_with_same_title_and_prefix_collide() {
    let a = item("Outage", "North district", "");
    let b = item("Outage", "North district", "");
    assert_eq!(fingerprint(&a), fingerprint(&b));

    // published never participates
    let mut c = b.clone();
    c.published = "yesterday".into();
    assert_eq!(fingerprint(&a), fingerprint(&c));

    // a link switches to (link, title) identity
    let d = item("Outage", "North district", "https://x.test/o");
    assert_ne!(fingerprint(&a), fingerprint(&d));
}

#[test]
fn missing_file_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let reg = SeenRegistry::load(&dir.path().join("nope.json")).unwrap();
    assert_eq!(reg, SeenRegistry::new());
    assert_eq!(reg.total(), 0);
}

#[test]
fn corrupt_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("seen_state.json");
    fs::write(&p, "{ not json").unwrap();
    assert!(SeenRegistry::load(&p).is_err());
}

#[test]
fn save_then_load_roundtrip_creates_dirs_and_leaves_no_temp() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("nested").join("seen_state.json");

    let mut reg = SeenRegistry::new();
    reg.ensure_source("quiet");
    let k = fingerprint(&item("Quake", "", "https://x.test/1"));
    assert!(reg.observe("JMA", k.clone(), "2025-09-07_083005"));
    reg.save(&p).unwrap();

    assert!(!dir.path().join("nested").join("seen_state.json.tmp").exists());
    let back = SeenRegistry::load(&p).unwrap();
    assert_eq!(back, reg);
    assert!(!back.is_novel("JMA", &k));
    assert_eq!(back.first_seen("JMA", &k), Some("2025-09-07_083005"));
    assert_eq!(back.sources().collect::<Vec<_>>(), vec!["JMA", "quiet"]);
}

#[test]
fn reads_existing_state_file_layout() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("seen_state.json");
    fs::write(
        &p,
        r#"{
  "seen": {
    "JMA": { "ba7816bf8f01cfea": "2025-01-01_090000" },
    "Status": {}
  }
}"#,
    )
    .unwrap();
    let reg = SeenRegistry::load(&p).unwrap();
    assert_eq!(reg.len_for("JMA"), 1);
    assert_eq!(reg.len_for("Status"), 0);
    assert_eq!(reg.total(), 1);
}
