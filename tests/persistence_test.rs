mod helpers;

use cognis::config::CognisConfig;
use cognis::db::Journal;
use cognis::learning::LearningExperience;
use cognis::memory::{MemoryKind, RetrievalQuery};
use cognis::Cognition;
use tempfile::TempDir;

fn on_disk_config(tmp: &TempDir) -> CognisConfig {
    let mut config = CognisConfig::default();
    config.storage.persist = true;
    config.storage.db_path = tmp.path().join("cognis.db").to_string_lossy().into_owned();
    config
}

#[test]
fn state_survives_restart() {
    let tmp = TempDir::new().unwrap();
    let config = on_disk_config(&tmp);

    let (entry_id, adaptation) = {
        let core = Cognition::from_config(config.clone()).unwrap();
        let entry = core
            .store("the staging db lives on host b", MemoryKind::Semantic, 0.8, &["infra".to_string()])
            .unwrap();
        core.retrieve(&RetrievalQuery::new("staging")).unwrap();
        core.retrieve(&RetrievalQuery::new("staging host")).unwrap();
        core.record(LearningExperience::new("moved staging", "success").with_importance(0.6))
            .unwrap();
        core.trigger_evolution().unwrap();
        (entry.id, core.learning().current().unwrap().adaptation_score)
    };

    let core = Cognition::from_config(config).unwrap();

    let entry = core.memory().get(&entry_id).unwrap().unwrap();
    assert_eq!(entry.access_count, 2);
    assert!(entry.tags.contains("infra"));

    let learning = core.learning().current().unwrap();
    assert_eq!(learning.total_experiences, 1);
    assert!((learning.adaptation_score - adaptation).abs() < 1e-9);

    let status = core.evolution_status().unwrap();
    assert_eq!(status.generation, 1);
    assert!(status.last_evolution.is_some());

    // Generation keeps counting from the restored value.
    assert_eq!(core.trigger_evolution().unwrap().generation, 2);
}

#[test]
fn remembered_experiences_are_journaled_as_memories() {
    let journal = Journal::in_memory().unwrap();
    {
        let core = helpers::journaled_core(journal.clone());
        core.record(LearningExperience::new("rotated keys", "worked").with_importance(0.7))
            .unwrap();
    }

    let memories = journal.load_memories().unwrap();
    assert_eq!(memories.len(), 1);
    assert_eq!(memories[0].kind, MemoryKind::Episodic);
    assert!(memories[0].tags.contains("experience"));
    assert!(memories[0].tags.contains("positive"));
}

#[test]
fn persist_off_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let mut config = on_disk_config(&tmp);
    config.storage.persist = false;

    let core = Cognition::from_config(config.clone()).unwrap();
    core.store("ephemeral", MemoryKind::Episodic, 0.5, &[]).unwrap();

    assert!(!config.resolved_db_path().exists());
}

#[test]
fn doctor_reports_journal_counts() {
    let tmp = TempDir::new().unwrap();
    let config = on_disk_config(&tmp);
    {
        let core = Cognition::from_config(config.clone()).unwrap();
        core.store("a", MemoryKind::Semantic, 0.5, &[]).unwrap();
        core.record(LearningExperience::new("b", "ok")).unwrap();
        core.trigger_evolution().unwrap();
    }

    let conn = cognis::db::open_database(config.resolved_db_path()).unwrap();
    let report = cognis::db::check_database_health(&conn).unwrap();
    assert!(report.integrity_ok);
    // One stored memory plus the remembered experience.
    assert_eq!(report.memory_count, 2);
    assert_eq!(report.experience_count, 1);
    assert_eq!(report.cycle_count, 1);

    cognis::cli::doctor(&config).unwrap();
}

#[test]
fn offline_evolve_beside_a_running_core_keeps_generations_consecutive() {
    let tmp = TempDir::new().unwrap();
    let config = on_disk_config(&tmp);

    let server = Cognition::from_config(config.clone()).unwrap();
    let offline = Cognition::from_config(config.clone()).unwrap();

    assert_eq!(server.trigger_evolution().unwrap().generation, 1);
    // The second core still believes it is at generation 0.
    assert_eq!(offline.trigger_evolution().unwrap().generation, 2);
    cognis::cli::evolve(&config).unwrap();

    for expected in 4..=6 {
        assert_eq!(server.trigger_evolution().unwrap().generation, expected);
    }
    let status = server.evolution_status().unwrap();
    assert_eq!(status.generation, 6);
    let trajectory: Vec<u64> = server
        .evolution()
        .history(10)
        .unwrap()
        .iter()
        .map(|c| c.generation)
        .collect();
    assert_eq!(trajectory, vec![1, 2, 3, 4, 5, 6]);

    let journaled = Journal::open(config.resolved_db_path())
        .unwrap()
        .load_cycles()
        .unwrap();
    assert_eq!(journaled.len(), 6);
    assert_eq!(journaled.last().unwrap().generation, 6);
}

#[test]
fn offline_search_does_not_count_accesses() {
    let tmp = TempDir::new().unwrap();
    let config = on_disk_config(&tmp);

    let server = Cognition::from_config(config.clone()).unwrap();
    let entry = server
        .store("hot entry", MemoryKind::Episodic, 0.8, &[])
        .unwrap();

    cognis::cli::search(&config, "hot", None).unwrap();

    assert_eq!(server.memory().get(&entry.id).unwrap().unwrap().access_count, 0);
    let journaled = Journal::open(config.resolved_db_path())
        .unwrap()
        .load_memories()
        .unwrap();
    assert_eq!(journaled[0].access_count, 0);

    // Served retrievals still count in both places.
    server.retrieve(&RetrievalQuery::new("hot")).unwrap();
    assert_eq!(server.memory().get(&entry.id).unwrap().unwrap().access_count, 1);
    let journaled = Journal::open(config.resolved_db_path())
        .unwrap()
        .load_memories()
        .unwrap();
    assert_eq!(journaled[0].access_count, 1);
}
