//! Deltification and undeltification over the in-memory store.

mod common;

use checksums::Md5;
use common::{stream_contents, write_contents};
use reps::{
    read_rep, rep_contents, rep_deltify, rep_deltify_with, rep_undeltify, Checksum,
    DeltifyOptions, Error, RepKind,
};
use store::{MemoryStore, StoreError};

fn sample_base() -> Vec<u8> {
    // A couple of kilobytes with enough repeated structure to delta well.
    (0..2048u32)
        .map(|i| (i % 251) as u8)
        .collect()
}

fn sample_edit() -> Vec<u8> {
    let mut edited = sample_base();
    edited[100] ^= 0xff;
    edited.extend_from_slice(b"appended tail");
    edited
}

#[test]
fn deltified_content_and_checksum_are_preserved() {
    let store = MemoryStore::new();
    let mut trail = store.begin();
    let txn = trail.new_txn_id();
    let base = write_contents(&mut trail, txn, &sample_base());
    let target = write_contents(&mut trail, txn, &sample_edit());
    trail.commit();

    let mut trail = store.begin();
    let before = read_rep(&trail, target).expect("record decodes");
    let RepKind::Fulltext { string_key: old_string } = before.kind else {
        panic!("target starts as a fulltext");
    };

    rep_deltify(&mut trail, target, base).expect("deltify succeeds");

    let after = read_rep(&trail, target).expect("record decodes");
    let RepKind::Delta { ref chunks } = after.kind else {
        panic!("a similar two-kilobyte text should deltify");
    };
    assert_eq!(after.checksum, before.checksum);
    assert!(chunks.iter().all(|chunk| chunk.rep_key == base));
    assert_eq!(
        chunks[0].checksum,
        Checksum::from(Md5::digest(&sample_edit()))
    );

    // The old fulltext string was released.
    assert_eq!(
        trail.string_size(old_string),
        Err(StoreError::StringNotFound(old_string))
    );

    assert_eq!(rep_contents(&trail, target).expect("contents read"), sample_edit());
    trail.commit();

    let mut trail = store.begin();
    assert_eq!(stream_contents(&mut trail, target), sample_edit());
}

#[test]
fn tiny_targets_respect_the_size_guard() {
    let store = MemoryStore::new();
    let mut trail = store.begin();
    let txn = trail.new_txn_id();
    let base = write_contents(&mut trail, txn, b"hello, world");
    let target = write_contents(&mut trail, txn, b"hello, there");
    trail.commit();

    let mut trail = store.begin();
    rep_deltify(&mut trail, target, base).expect("deltify succeeds");

    // Twelve bytes leave no room for a diff that is strictly smaller, so
    // either the guard kept the fulltext or the diff really is smaller.
    let after = read_rep(&trail, target).expect("record decodes");
    match &after.kind {
        RepKind::Fulltext { string_key } => {
            assert_eq!(trail.string_size(*string_key).expect("string size"), 12);
        }
        RepKind::Delta { chunks } => {
            let stored: u64 = chunks
                .iter()
                .map(|chunk| trail.string_size(chunk.string_key).expect("string size"))
                .sum();
            assert!(stored < 12, "the guard admits only smaller diffs");
        }
    }
    assert_eq!(
        after.checksum,
        Checksum::from(Md5::digest(b"hello, there"))
    );
    assert_eq!(rep_contents(&trail, target).expect("contents read"), b"hello, there");
}

#[test]
fn an_unshrinkable_target_is_left_untouched() {
    let store = MemoryStore::new();
    let mut trail = store.begin();
    let txn = trail.new_txn_id();
    let base = write_contents(&mut trail, txn, b"aaaabbbbcccc");
    let target = write_contents(&mut trail, txn, b"zyxwvutsrqpo");
    trail.commit();

    let mut trail = store.begin();
    let before = read_rep(&trail, target).expect("record decodes");
    rep_deltify(&mut trail, target, base).expect("deltify no-ops");
    let after = read_rep(&trail, target).expect("record decodes");
    assert_eq!(before, after, "the guard leaves the record alone");
}

#[test]
fn deltifying_a_representation_against_itself_is_corruption() {
    let store = MemoryStore::new();
    let mut trail = store.begin();
    let txn = trail.new_txn_id();
    let key = write_contents(&mut trail, txn, b"hello, world");

    assert!(matches!(
        rep_deltify(&mut trail, key, key),
        Err(Error::Corrupt(_))
    ));
}

#[test]
fn an_empty_target_does_not_deltify() {
    let store = MemoryStore::new();
    let mut trail = store.begin();
    let txn = trail.new_txn_id();
    let base = write_contents(&mut trail, txn, &sample_base());
    let target = write_contents(&mut trail, txn, b"");
    trail.commit();

    let mut trail = store.begin();
    rep_deltify(&mut trail, target, base).expect("deltify no-ops");
    let after = read_rep(&trail, target).expect("record decodes");
    assert!(matches!(after.kind, RepKind::Fulltext { .. }));
    assert_eq!(rep_contents(&trail, target).expect("contents read"), b"");
}

#[test]
fn undeltify_restores_an_equal_fulltext() {
    let store = MemoryStore::new();
    let mut trail = store.begin();
    let txn = trail.new_txn_id();
    let base = write_contents(&mut trail, txn, &sample_base());
    let target = write_contents(&mut trail, txn, &sample_edit());
    trail.commit();

    let mut trail = store.begin();
    rep_deltify(&mut trail, target, base).expect("deltify succeeds");
    let deltified = read_rep(&trail, target).expect("record decodes");
    let RepKind::Delta { ref chunks } = deltified.kind else {
        panic!("target should have deltified");
    };
    let chunk_strings: Vec<_> = chunks.iter().map(|chunk| chunk.string_key).collect();
    trail.commit();

    let mut trail = store.begin();
    rep_undeltify(&mut trail, target).expect("undeltify succeeds");

    let restored = read_rep(&trail, target).expect("record decodes");
    assert!(matches!(restored.kind, RepKind::Fulltext { .. }));
    assert_eq!(restored.checksum, deltified.checksum);
    assert_eq!(rep_contents(&trail, target).expect("contents read"), sample_edit());

    for string_key in chunk_strings {
        assert_eq!(
            trail.string_size(string_key),
            Err(StoreError::StringNotFound(string_key))
        );
    }
}

#[test]
fn undeltify_on_a_fulltext_is_a_no_op() {
    let store = MemoryStore::new();
    let mut trail = store.begin();
    let txn = trail.new_txn_id();
    let key = write_contents(&mut trail, txn, b"already flat");

    let before = read_rep(&trail, key).expect("record decodes");
    rep_undeltify(&mut trail, key).expect("no-op succeeds");
    assert_eq!(read_rep(&trail, key).expect("record decodes"), before);
}

#[test]
fn a_delta_target_redeltifies_against_a_new_source() {
    let store = MemoryStore::new();
    let mut trail = store.begin();
    let txn = trail.new_txn_id();
    let base = write_contents(&mut trail, txn, &sample_base());
    let newer_base = write_contents(&mut trail, txn, &sample_edit());
    let mut target_text = sample_edit();
    target_text.extend_from_slice(b" and more");
    let target = write_contents(&mut trail, txn, &target_text);
    trail.commit();

    let mut trail = store.begin();
    rep_deltify(&mut trail, target, base).expect("first deltify succeeds");
    trail.commit();

    // Already a delta: the size guard does not apply on the second pass.
    let mut trail = store.begin();
    rep_deltify_with(
        &mut trail,
        target,
        newer_base,
        DeltifyOptions::default(),
    )
    .expect("second deltify succeeds");

    let after = read_rep(&trail, target).expect("record decodes");
    let RepKind::Delta { ref chunks } = after.kind else {
        panic!("the representation stays a delta");
    };
    assert!(chunks.iter().all(|chunk| chunk.rep_key == newer_base));
    assert_eq!(rep_contents(&trail, target).expect("contents read"), target_text);
}
