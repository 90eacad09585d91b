use gacha_engine::{
    DrawEngine, EngineConfig, EngineSnapshot, GachaSession, MemoryStorage, PresetId,
    load_snapshot, save_snapshot,
};

#[test]
fn snapshot_survives_serialize_and_deserialize() {
    let mut engine = DrawEngine::seeded(EngineConfig::default(), 0xFACE_B00C).unwrap();
    engine.pull(250).unwrap();
    let snapshot = engine.snapshot();

    let json = serde_json::to_string(&snapshot).unwrap();
    let back: EngineSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back, snapshot);

    let storage = MemoryStorage::new();
    save_snapshot(&storage, &snapshot).unwrap();
    assert_eq!(load_snapshot(&storage).unwrap(), snapshot);
}

#[test]
fn preset_switch_never_rewrites_recorded_weights() {
    let mut engine = DrawEngine::seeded(EngineConfig::default(), 77).unwrap();
    engine.pull(40).unwrap();
    let before: Vec<f64> = engine.history().iter().map(|o| o.weight).collect();

    for preset in [PresetId::Predatory, PresetId::Generous, PresetId::Standard] {
        engine.set_preset(preset).unwrap();
        engine.pull(10).unwrap();
    }
    let after: Vec<f64> = engine.history().iter().take(40).map(|o| o.weight).collect();
    assert_eq!(before, after);
    assert_eq!(engine.history().len(), 70);
}

#[test]
fn reopened_session_continues_indices_and_pity() {
    let storage = MemoryStorage::new();
    let mut first = GachaSession::open_seeded(EngineConfig::default(), 1, storage.clone()).unwrap();
    first.pull(15).unwrap();
    let pity = first.engine().pity_counter();
    drop(first);

    let mut second = GachaSession::open_seeded(EngineConfig::default(), 2, storage).unwrap();
    assert_eq!(second.engine().pity_counter(), pity);
    let batch = second.pull(5).unwrap();
    assert_eq!(batch[0].index, 16);
    assert_eq!(second.engine().history().len(), 20);
}
