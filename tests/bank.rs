//! Banking Integration Tests
//!
//! Config file → bank context → registry → catalog, end to end.

use std::fs;
use std::path::Path;

use assetbank::config::load_config_from;
use assetbank::library::{Catalog, Registry};
use assetbank::{BankContext, ContentHandle, StrategyKind, WriteMode};
use tempfile::TempDir;

fn write_project(root: &Path) {
    fs::create_dir_all(root.join(".assetbank")).unwrap();
    fs::write(
        root.join(".assetbank").join("config.yaml"),
        r#"
version: "1"
registry:
  write_mode: atomic
bank:
  strategy: copy
libraries:
  - name: Characters
    path: libs/characters
  - name: Archive
    path: libs/archive.json
    readonly: true
  - name: Scratch
    path: libs/scratch.json
    enabled: false
"#,
    )
    .unwrap();

    let scenes = root.join("scenes");
    fs::create_dir_all(&scenes).unwrap();
    fs::write(scenes.join("hero_v2.blend"), b"hero").unwrap();
    fs::write(scenes.join("villain.blend"), b"villain").unwrap();
}

#[tokio::test]
async fn test_bank_and_search_from_config() {
    let temp = TempDir::new().unwrap();
    write_project(temp.path());

    let config = load_config_from(&temp.path().join("scenes")).unwrap();
    assert_eq!(config.registry.write_mode, WriteMode::Atomic);
    assert_eq!(config.bank.strategy, StrategyKind::Copy);

    let characters = config.library("Characters");
    assert_eq!(characters.path, temp.path().join("libs").join("characters.json"));

    let context = BankContext::from_config(&config).unwrap();
    let scenes = temp.path().join("scenes");

    let hero = context
        .bank(
            &characters,
            &ContentHandle::new("Hero", scenes.join("hero_v2.blend")).with_tags(["rigged", "biped"]),
        )
        .await
        .unwrap();
    context
        .bank(
            &characters,
            &ContentHandle::new("Villain", scenes.join("villain.blend")).with_tags(["rigged"]),
        )
        .await
        .unwrap();

    // Copy strategy: the entry points at the library-side copy
    assert_eq!(hero.id.as_str(), "Hero:Hero");
    assert_eq!(
        fs::read(temp.path().join("libs").join("Hero.blend")).unwrap(),
        b"hero"
    );

    // Read-only libraries refuse banking
    let archive = config.library("Archive");
    assert!(context
        .bank(&archive, &ContentHandle::new("Hero", scenes.join("hero_v2.blend")))
        .await
        .is_err());

    context.shutdown().await.unwrap();

    let catalog = Catalog::load(&Registry::new(config.registry.write_mode), &config.libraries);
    assert!(catalog.errors.is_empty());
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.search("rigged").len(), 2);
    assert_eq!(catalog.search("characters biped").len(), 1);
    assert_eq!(catalog.search("hero sword").len(), 0);
}
