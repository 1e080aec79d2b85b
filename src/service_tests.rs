use super::*;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

fn service() -> FileIndexService {
    FileIndexService::builder().worker_count(2).build()
}

#[test]
fn index_then_query_is_case_insensitive() {
    // Scenario 1: indexing "Kotlin" and querying "kotlin" must match.
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "Kotlin is great").unwrap();

    let svc = service();
    svc.index(&[dir.path().to_path_buf()]);

    let hits = svc.query("kotlin");
    assert_eq!(hits, HashSet::from([dir.path().join("a.txt")]));
}

#[test]
fn phrase_query_distinguishes_word_order() {
    // Scenario 2: "the quick brown fox" vs "the brown quick fox".
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("one.txt"), "the quick brown fox").unwrap();
    fs::write(dir.path().join("two.txt"), "the brown quick fox").unwrap();

    let svc = service();
    svc.index(&[dir.path().to_path_buf()]);

    assert_eq!(svc.query_phrase("quick brown"), HashSet::from([dir.path().join("one.txt")]));
    assert_eq!(svc.query_phrase("brown quick"), HashSet::from([dir.path().join("two.txt")]));
}

#[test]
fn reindexing_a_changed_file_drops_stale_tokens() {
    // Scenario 4: "alpha bravo" -> "alpha charlie".
    let dir = tempdir().unwrap();
    let file = dir.path().join("doc.txt");
    fs::write(&file, "alpha bravo").unwrap();

    let svc = service();
    svc.index(&[dir.path().to_path_buf()]);
    assert_eq!(svc.query("bravo"), HashSet::from([file.clone()]));

    fs::write(&file, "alpha charlie").unwrap();
    svc.index(&[dir.path().to_path_buf()]);

    assert!(svc.query("bravo").is_empty());
    assert_eq!(svc.query("charlie"), HashSet::from([file]));
}

#[test]
fn deleted_file_is_removed_from_results_after_watch_reconciles() {
    // Scenario 5: create, index, delete while watching, and observe the
    // deletion reflected once the batch quiesces.
    let dir = tempdir().unwrap();
    let file = dir.path().join("doomed.txt");
    fs::write(&file, "doomed content").unwrap();

    let svc = service();
    svc.index(&[dir.path().to_path_buf()]);
    assert_eq!(svc.query("doomed"), HashSet::from([file.clone()]));

    svc.start_watching(&[dir.path().to_path_buf()]).unwrap();
    fs::remove_file(&file).unwrap();

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    loop {
        if svc.query("doomed").is_empty() {
            break;
        }
        assert!(std::time::Instant::now() < deadline, "deletion was never reflected");
        std::thread::sleep(Duration::from_millis(50));
    }

    svc.stop_watching();
}

#[test]
fn duplicate_tokens_collapse_to_one_file_in_results() {
    // Scenario 6: repeated words still resolve to a single matching file.
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("echoes.txt"), "echo echo echo echo echo").unwrap();

    let svc = service();
    svc.index(&[dir.path().to_path_buf()]);

    let hits = svc.query("echo");
    assert_eq!(hits.len(), 1);
}

#[test]
fn query_on_unindexed_term_is_empty() {
    let svc = service();
    assert!(svc.query("nonexistent").is_empty());
}

#[test]
fn blank_query_is_empty_without_waiting() {
    let svc = service();
    assert!(svc.query("").is_empty());
    assert!(svc.query("   \t  ").is_empty());
    assert!(svc.query_phrase("").is_empty());
    assert!(svc.query_phrase_tokens(&[]).is_empty());
}

#[test]
fn query_waits_for_indexing_scheduled_before_it() {
    // A query issued right after scheduling must observe that file's
    // result, not a stale/empty view — it has to wait on the scheduler's
    // completion handle before reading the store.
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("slow.txt"), "alpha").unwrap();

    let svc = service();
    svc.schedule_index(&[dir.path().to_path_buf()]);
    // No explicit wait here: query() itself must block until quiescent.
    assert_eq!(svc.query("alpha"), HashSet::from([dir.path().join("slow.txt")]));
}

#[test]
fn start_watching_twice_errs_already_watching() {
    let dir = tempdir().unwrap();
    let svc = service();
    svc.start_watching(&[dir.path().to_path_buf()]).unwrap();
    let err = svc.start_watching(&[dir.path().to_path_buf()]).unwrap_err();
    assert!(matches!(err, IndexError::AlreadyWatching));
    svc.stop_watching();
}

#[test]
fn operations_after_close_do_not_panic() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "alpha").unwrap();

    let svc = service();
    svc.index(&[dir.path().to_path_buf()]);
    svc.close();

    let err = svc.start_watching(&[dir.path().to_path_buf()]).unwrap_err();
    assert!(matches!(err, IndexError::ServiceClosed));
    // A second close must not panic or deadlock.
    svc.close();
}

#[test]
fn dump_reflects_indexed_state() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "alpha").unwrap();

    let svc = service();
    svc.index(&[dir.path().to_path_buf()]);

    let dump = svc.dump();
    assert!(dump.contains_key(&crate::types::intern("alpha")));
}

#[test]
fn query_phrase_tokens_matches_text_form() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "quick brown fox").unwrap();

    let svc = service();
    svc.index(&[dir.path().to_path_buf()]);

    let via_text = svc.query_phrase("quick brown");
    let via_tokens = svc.query_phrase_tokens(&["quick".to_string(), "brown".to_string()]);
    assert_eq!(via_text, via_tokens);
}
