use plsdiff::{CollectionStream, Hunk, HunkKind, OrderedCollection, diff, reconcile};
use proptest::prelude::*;

/// Séquences courtes sur un petit alphabet, pour forcer les doublons
fn sequence(alphabet: u32) -> impl Strategy<Value = Vec<String>> {
    tracks(alphabet, 12)
}

fn tracks(alphabet: u32, max_len: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec((0..alphabet).prop_map(|i| format!("t{i}")), 0..max_len)
}

/// Distance sans substitution calculée par programmation dynamique
fn lcs(a: &[String], b: &[String]) -> usize {
    let mut table = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for i in 0..a.len() {
        for j in 0..b.len() {
            table[i + 1][j + 1] = if a[i] == b[j] {
                table[i][j] + 1
            } else {
                table[i][j + 1].max(table[i + 1][j])
            };
        }
    }
    table[a.len()][b.len()]
}

#[derive(Debug, thiserror::Error)]
#[error("never")]
struct Never;

#[derive(Default)]
struct Playlist {
    tracks: Vec<String>,
}

impl OrderedCollection for Playlist {
    type Token = String;
    type Error = Never;

    fn len(&self) -> usize {
        self.tracks.len()
    }

    fn get(&self, index: usize) -> Option<&String> {
        self.tracks.get(index)
    }

    fn insert_at(&mut self, index: usize, tokens: Vec<String>) -> Result<(), Never> {
        self.tracks.splice(index..index, tokens);
        Ok(())
    }

    fn remove_at(&mut self, indices: &[usize]) -> Result<(), Never> {
        for &i in indices.iter().rev() {
            self.tracks.remove(i);
        }
        Ok(())
    }

    fn has_pending_changes(&self) -> bool {
        false
    }
}

fn assert_partition(hunks: &[Hunk], a_len: usize, b_len: usize) {
    let mut original = 0;
    let mut modified = 0;
    for hunk in hunks {
        assert_eq!(hunk.original_start, original, "gap in original at {hunk}");
        assert_eq!(hunk.modified_start, modified, "gap in modified at {hunk}");
        assert!(hunk.original_length + hunk.modified_length > 0, "empty hunk {hunk}");
        if hunk.kind == HunkKind::Copy {
            assert_eq!(hunk.original_length, hunk.modified_length);
        }
        original = hunk.original_end();
        modified = hunk.modified_end();
    }
    assert_eq!(original, a_len);
    assert_eq!(modified, b_len);
}

/// Applique les hunks sur une copie de A, en partant de la fin
fn apply_backwards(hunks: &[Hunk], a: &[String], b: &[String]) -> Vec<String> {
    let mut out = a.to_vec();
    for hunk in hunks.iter().rev().filter(|h| !h.is_copy()) {
        out.splice(
            hunk.original_start..hunk.original_end(),
            b[hunk.modified_start..hunk.modified_end()].iter().cloned(),
        );
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

    #[test]
    fn test_hunks_partition_and_round_trip(a in sequence(5), b in sequence(5)) {
        let hunks = diff(&a, &b);

        assert_partition(&hunks, a.len(), b.len());
        prop_assert_eq!(&apply_backwards(&hunks, &a, &b), &b);

        let mut playlist = Playlist { tracks: a.clone() };
        reconcile(&mut playlist, &hunks, &b).unwrap();
        prop_assert_eq!(&playlist.tracks, &b);
    }

    #[test]
    fn test_diff_is_deterministic(a in sequence(4), b in sequence(4)) {
        prop_assert_eq!(diff(&a, &b), diff(&a, &b));
    }

    #[test]
    fn test_no_adjacent_edit_hunks(a in sequence(3), b in sequence(3)) {
        let hunks = diff(&a, &b);
        for pair in hunks.windows(2) {
            prop_assert!(pair[0].is_copy() != pair[1].is_copy(), "{} then {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_edit_distance_is_minimal(a in sequence(4), b in sequence(4)) {
        let copied: usize = diff(&a, &b)
            .iter()
            .filter(|h| h.is_copy())
            .map(|h| h.original_length)
            .sum();
        prop_assert_eq!(copied, lcs(&a, &b));
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]

    #[test]
    fn test_long_sequences_stay_minimal(a in tracks(20, 300), b in tracks(20, 300)) {
        let hunks = diff(&a, &b);
        assert_partition(&hunks, a.len(), b.len());
        let copied: usize = hunks.iter().filter(|h| h.is_copy()).map(|h| h.original_length).sum();
        prop_assert_eq!(copied, lcs(&a, &b));
    }
}

#[test]
fn test_collection_stream_is_single_pass() {
    let playlist = Playlist {
        tracks: vec!["a".into(), "b".into(), "c".into()],
    };
    let mut stream = CollectionStream::new(&playlist);
    assert_eq!(stream.size_hint(), (3, Some(3)));
    assert_eq!(stream.next().map(String::as_str), Some("a"));
    assert_eq!(stream.position(), 1);

    let hunks = diff(CollectionStream::new(&playlist), ["a", "x", "c"]);
    let rendered: Vec<String> = hunks.iter().map(Hunk::to_string).collect();
    assert_eq!(rendered, ["copy(0,1/0,1)", "replace(1,1/1,1)", "copy(2,1/2,1)"]);
}
