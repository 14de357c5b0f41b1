// Facade behaviour against an in-memory store that records every call.

mod common;

use std::fs;

use common::{Call, MemoryStore};
use cyverse_irods::{AccessEntry, CyVerseIrods, Entry, NoProgress, StorageError, UploadObserver, UploadSummary};

const HOME: &str = "/iplant/home/alice";

fn facade() -> CyVerseIrods<MemoryStore> {
    CyVerseIrods::with_store(MemoryStore::with_home(HOME), HOME)
}

fn fixture() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("a.txt"), b"alpha").unwrap();
    fs::create_dir_all(root.join("sub/nested")).unwrap();
    fs::write(root.join("sub/b.txt"), b"beta").unwrap();
    fs::write(root.join("sub/nested/c.txt"), b"gamma").unwrap();
    dir
}

fn mutations(calls: &[Call]) -> Vec<Call> {
    calls
        .iter()
        .filter(|c| matches!(c, Call::Create(_) | Call::Put(_)))
        .cloned()
        .collect()
}

#[test]
fn single_file_creates_destination_and_one_put() {
    let dir = fixture();
    let conn = facade();
    let dest = format!("{}/hub/", HOME);

    let summary = conn
        .recursive_upload(&dir.path().join("a.txt"), &dest, None, &mut NoProgress)
        .unwrap();

    assert_eq!(
        mutations(&conn.store().calls()),
        vec![
            Call::Create("/iplant/home/alice/hub".into()),
            Call::Put("/iplant/home/alice/hub/a.txt".into()),
        ]
    );
    assert_eq!(summary.data_objects, vec!["/iplant/home/alice/hub/a.txt"]);
    assert_eq!(summary.bytes, 5);
}

#[test]
fn directory_upload_mirrors_tree_parents_first() {
    let dir = fixture();
    let conn = facade();

    let summary = conn
        .recursive_upload(dir.path(), "/iplant/home/alice/hub", None, &mut NoProgress)
        .unwrap();

    assert_eq!(
        mutations(&conn.store().calls()),
        vec![
            Call::Create("/iplant/home/alice/hub".into()),
            Call::Create("/iplant/home/alice/hub/sub".into()),
            Call::Create("/iplant/home/alice/hub/sub/nested".into()),
            Call::Put("/iplant/home/alice/hub/a.txt".into()),
            Call::Put("/iplant/home/alice/hub/sub/b.txt".into()),
            Call::Put("/iplant/home/alice/hub/sub/nested/c.txt".into()),
        ]
    );
    assert_eq!(summary.collections.len(), 3);
    assert_eq!(summary.bytes, 14);

    let objects = conn.store().objects.borrow();
    assert_eq!(objects["/iplant/home/alice/hub/sub/nested/c.txt"], b"gamma");
}

#[test]
fn every_file_follows_its_collection() {
    let dir = fixture();
    fs::create_dir_all(dir.path().join("z/y/x")).unwrap();
    fs::write(dir.path().join("z/y/x/deep.bin"), [0u8, 159, 146, 150]).unwrap();
    let conn = facade();

    conn.recursive_upload(dir.path(), "/iplant/home/alice/hub", None, &mut NoProgress)
        .unwrap();

    let calls = mutations(&conn.store().calls());
    for (i, call) in calls.iter().enumerate() {
        if let Call::Put(path) = call {
            let parent = &path[..path.rfind('/').unwrap()];
            let created = calls[..i]
                .iter()
                .any(|c| matches!(c, Call::Create(p) if p == parent));
            assert!(created, "{path} written before {parent} was created");
        }
    }
}

#[test]
fn existing_collections_do_not_abort_upload() {
    let dir = fixture();
    let conn = facade();
    conn.make_collection("/iplant/home/alice/hub/sub", None).unwrap();

    let summary = conn
        .recursive_upload(dir.path(), "/iplant/home/alice/hub", None, &mut NoProgress)
        .unwrap();
    assert_eq!(summary.data_objects.len(), 3);

    // a second run over the same tree succeeds as well
    conn.recursive_upload(dir.path(), "/iplant/home/alice/hub", None, &mut NoProgress)
        .unwrap();
}

#[test]
fn missing_local_path_makes_no_remote_calls() {
    let dir = tempfile::tempdir().unwrap();
    let conn = facade();

    let err = conn
        .recursive_upload(&dir.path().join("absent"), "/iplant/home/alice/hub", None, &mut NoProgress)
        .unwrap_err();
    assert!(matches!(err, StorageError::LocalNotFound(_)));

    let err = conn
        .upload_file(&dir.path().join("absent"), "/iplant/home/alice/x", None)
        .unwrap_err();
    assert!(matches!(err, StorageError::LocalNotFound(_)));

    assert!(conn.store().calls().is_empty());
}

#[test]
fn permissions_follow_each_creation() {
    let dir = fixture();
    let conn = facade();
    let acl: AccessEntry = "read:anonymous#iplant".parse().unwrap();

    let dest = conn.resolve_remote("hub").unwrap();
    assert_eq!(dest, "/iplant/home/alice/hub");

    conn.recursive_upload(&dir.path().join("sub"), &dest, Some(&acl), &mut NoProgress)
        .unwrap();
    let calls = conn.store().calls();
    let perms: Vec<&Call> = calls
        .iter()
        .filter(|c| matches!(c, Call::Permission(..)))
        .collect();
    assert_eq!(perms.len(), 4);
    let create = calls
        .iter()
        .position(|c| *c == Call::Create("/iplant/home/alice/hub/nested".into()))
        .unwrap();
    assert_eq!(
        calls[create + 1],
        Call::Permission("/iplant/home/alice/hub/nested".into(), "read:anonymous#iplant".into())
    );
}

#[test]
fn get_prefers_data_object_then_collection() {
    let dir = fixture();
    let conn = facade();
    conn.recursive_upload(dir.path(), "/iplant/home/alice/hub", None, &mut NoProgress)
        .unwrap();

    match conn.get("iplant/home/alice/hub/a.txt").unwrap() {
        Entry::DataObject(object) => assert_eq!(object.size, 5),
        other => panic!("expected data object, got {other:?}"),
    }
    match conn.get("/iplant/home/alice/hub/").unwrap() {
        Entry::Collection(collection) => {
            assert_eq!(collection.subcollections, vec!["/iplant/home/alice/hub/sub"]);
            assert_eq!(collection.data_objects, vec!["/iplant/home/alice/hub/a.txt"]);
        }
        other => panic!("expected collection, got {other:?}"),
    }
    assert!(matches!(
        conn.get("/iplant/home/alice/nope"),
        Err(StorageError::NotFound(p)) if p == "/iplant/home/alice/nope"
    ));
}

#[test]
fn list_with_existence_check() {
    let conn = facade();
    assert!(conn.list_collection("/iplant/home/alice/nope", true).unwrap().is_none());
    assert!(matches!(
        conn.list_collection("/iplant/home/alice/nope", false),
        Err(StorageError::NotFound(_))
    ));
    assert!(conn.list_data_object("/iplant/home/alice/x", true).unwrap().is_none());
    assert!(conn.list_collection(HOME, true).unwrap().is_some());
    assert!(matches!(conn.list_collection("", true), Err(StorageError::InvalidPath(_))));
}

#[test]
fn download_copies_raw_bytes() {
    let src = tempfile::tempdir().unwrap();
    let payload: Vec<u8> = (0..=255u8).chain([b'\n', 0, b'\r', b'\n']).collect();
    fs::write(src.path().join("blob.bin"), &payload).unwrap();
    let conn = facade();
    conn.recursive_upload(&src.path().join("blob.bin"), "/iplant/home/alice/in", None, &mut NoProgress)
        .unwrap();

    let object = conn
        .list_data_object("/iplant/home/alice/in/blob.bin", true)
        .unwrap()
        .unwrap();
    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("nested/dir");
    let written = conn.download_file(&object, &target).unwrap();
    assert_eq!(written, target.join("blob.bin"));
    assert_eq!(fs::read(&written).unwrap(), payload);

    // an existing destination directory is fine
    conn.download_file(&object, &target).unwrap();
}

#[test]
fn download_into_a_file_fails() {
    let src = tempfile::tempdir().unwrap();
    fs::write(src.path().join("f.txt"), b"x").unwrap();
    let conn = facade();
    conn.upload_file(&src.path().join("f.txt"), "/iplant/home/alice/f.txt", None)
        .unwrap();
    let object = conn.list_data_object("/iplant/home/alice/f.txt", false).unwrap().unwrap();

    let err = conn.download_file(&object, &src.path().join("f.txt")).unwrap_err();
    assert!(matches!(err, StorageError::Io { .. }));
}

#[derive(Default)]
struct Recorder {
    planned: Option<(usize, usize, u64)>,
    events: Vec<String>,
    finished: Option<UploadSummary>,
}

impl UploadObserver for Recorder {
    fn planned(&mut self, collections: usize, files: usize, bytes: u64) {
        self.planned = Some((collections, files, bytes));
    }

    fn collection_created(&mut self, path: &str) {
        self.events.push(format!("C {path}"));
    }

    fn file_uploaded(&mut self, path: &str, bytes: u64) {
        self.events.push(format!("F {path} {bytes}"));
    }

    fn finished(&mut self, summary: &UploadSummary) {
        self.finished = Some(summary.clone());
    }
}

#[test]
fn observer_sees_plan_and_progress() {
    let dir = fixture();
    let conn = facade();
    let mut recorder = Recorder::default();

    let summary = conn
        .recursive_upload(dir.path(), "/iplant/home/alice/hub", None, &mut recorder)
        .unwrap();

    assert_eq!(recorder.planned, Some((3, 3, 14)));
    assert_eq!(recorder.events.first().map(String::as_str), Some("C /iplant/home/alice/hub"));
    assert_eq!(
        recorder.events.last().map(String::as_str),
        Some("F /iplant/home/alice/hub/sub/nested/c.txt 5")
    );
    assert_eq!(recorder.finished, Some(summary));
}
