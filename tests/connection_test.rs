mod common;

use std::io::{Read, Write};
use std::thread;

use common::{README, application_archive, greeting_archive};
use nestjar::connection::ARCHIVE_CONTENT_TYPE;
use nestjar::{EntryLocator, Error, ReadAt, Resolver, ResolverConfig, ResourceConnection};

fn resolver() -> Resolver {
    let resolver = Resolver::default();
    resolver.register_memory("root", application_archive());
    resolver
}

fn read_all(connection: &mut ResourceConnection) -> Vec<u8> {
    let mut buf = Vec::new();
    connection.open_stream().unwrap().read_to_end(&mut buf).unwrap();
    buf
}

fn bytes_read(connection: &mut ResourceConnection) -> u64 {
    connection
        .archive()
        .unwrap()
        .source()
        .reader()
        .transferred_bytes()
}

#[test]
fn test_reads_root_and_nested_entries() {
    let resolver = resolver();

    let mut app = resolver.connection("mem:root!/app.txt").unwrap();
    assert_eq!(read_all(&mut app), b"hi there");

    let mut greeting = resolver.connection("mem:root!/lib/x.jar!/greeting.txt").unwrap();
    assert_eq!(read_all(&mut greeting), b"hello");
    assert_eq!(greeting.content_length().unwrap(), 5);

    let mut leaf = resolver
        .connection("mem:root!/lib/x.jar!/deep/z.jar!/leaf.txt")
        .unwrap();
    assert_eq!(read_all(&mut leaf), b"leaf");
}

#[test]
fn test_missing_nested_entry_is_not_found() {
    let resolver = resolver();
    let mut missing = resolver.connection("mem:root!/lib/x.jar!/missing.txt").unwrap();
    let err = missing.open_stream().err().unwrap();
    assert!(matches!(err, Error::EntryNotFound { ref entry, .. } if entry == "missing.txt"));
    assert!(err.is_not_found());

    let mut missing_archive = resolver.connection("mem:root!/lib/nope.jar!/a.txt").unwrap();
    assert!(matches!(
        missing_archive.connect(),
        Err(Error::EntryNotFound { .. })
    ));
}

#[test]
fn test_deflated_entry_streams_uncompressed_bytes() {
    let resolver = resolver();
    let mut readme = resolver.connection("mem:root!/docs/readme.txt").unwrap();
    assert_eq!(readme.content_length().unwrap(), README.len() as u64);
    assert_eq!(read_all(&mut readme), README.as_bytes());
    assert_eq!(readme.content_type(), "text/plain");
}

#[test]
fn test_directory_is_not_a_file() {
    let resolver = resolver();
    for locator in ["mem:root!/lib/", "mem:root!/lib"] {
        let mut directory = resolver.connection(locator).unwrap();
        assert!(directory.entry_record().unwrap().unwrap().is_directory);
        assert!(matches!(
            directory.open_stream(),
            Err(Error::NotAFile { .. })
        ));
    }
}

#[test]
fn test_archive_locator_exposes_the_archive() {
    let resolver = resolver();
    let library = common::library_archive();

    let mut nested = resolver.connection("mem:root!/lib/x.jar!/").unwrap();
    assert_eq!(nested.content_type(), ARCHIVE_CONTENT_TYPE);
    assert!(nested.entry_record().unwrap().is_none());
    assert_eq!(nested.content_length().unwrap(), library.len() as u64);
    assert_eq!(read_all(&mut nested), library);
    assert_eq!(nested.archive().unwrap().url(), "mem:root!/lib/x.jar!/");
}

#[test]
fn test_nested_resolution_composes() {
    let resolver = resolver();
    let locator = EntryLocator::decode("mem:root!/lib/x.jar!/deep/z.jar!/leaf.txt").unwrap();

    let mut direct = resolver.connection_for(locator.clone());
    let expected = read_all(&mut direct);

    // Resolve one level less, then take the last step by hand
    let parent = locator.parent().unwrap();
    assert_eq!(parent.to_string(), "mem:root!/lib/x.jar!/deep/z.jar!/");
    let mut container = resolver.connection_for(parent.clone());
    let archive = container.archive().unwrap();
    let data = archive.entry_data(locator.entry().unwrap()).unwrap().unwrap();
    assert_eq!(data.read_to_vec().unwrap(), expected);

    // And joining the segment back addresses the same entry
    let mut joined = resolver.connection_for(parent.join("leaf.txt"));
    assert_eq!(read_all(&mut joined), expected);
}

#[test]
fn test_connect_is_idempotent() {
    let resolver = resolver();
    let mut connection = resolver.connection("mem:root!/lib/x.jar!/greeting.txt").unwrap();
    assert!(!connection.is_connected());

    connection.connect().unwrap();
    assert!(connection.is_connected());
    let after_first = bytes_read(&mut connection);
    let record = connection.entry_record().unwrap().cloned();

    connection.connect().unwrap();
    assert_eq!(bytes_read(&mut connection), after_first);
    assert_eq!(connection.entry_record().unwrap().cloned(), record);
    assert_eq!(connection.content_length().unwrap(), 5);
    assert_eq!(bytes_read(&mut connection), after_first);
}

#[test]
fn test_failed_connect_repeats_the_failure() {
    let resolver = Resolver::default();
    let mut connection = resolver.connection("mem:later!/app.txt").unwrap();
    let first = connection.connect().unwrap_err();
    assert!(matches!(first, Error::UnknownSource { .. }));

    // Registering the source afterwards does not change this connection
    resolver.register_memory("later", application_archive());
    let second = connection.connect().unwrap_err();
    assert_eq!(second.to_string(), first.to_string());
    assert!(matches!(connection.open_stream(), Err(Error::UnknownSource { .. })));

    let mut fresh = resolver.connection("mem:later!/app.txt").unwrap();
    assert_eq!(read_all(&mut fresh), b"hi there");
}

#[test]
fn test_malformed_locator_fails_immediately() {
    let resolver = resolver();
    for locator in ["mem:root", "mem:root!/bad%zz", "mem:root!/!/a.txt"] {
        assert!(matches!(
            resolver.connection(locator),
            Err(Error::MalformedLocator { .. })
        ));
    }
}

#[test]
fn test_compressed_nested_archive_is_rejected() {
    let resolver = resolver();
    let mut connection = resolver.connection("mem:root!/lib/y.jar!/greeting.txt").unwrap();
    assert!(matches!(
        connection.connect(),
        Err(Error::CompressedNestedArchive { .. })
    ));

    // The compressed archive is still readable as an entry
    let mut raw = resolver.connection("mem:root!/lib/y.jar").unwrap();
    assert_eq!(read_all(&mut raw), common::library_archive());
}

#[test]
fn test_manifest_of_resolved_archive() {
    let resolver = resolver();
    let mut root = resolver.connection("mem:root!/app.txt").unwrap();
    let manifest = root.manifest().unwrap().unwrap();
    assert_eq!(manifest.main_class(), Some("com.example.Launcher"));
    assert_eq!(manifest.start_class(), Some("com.example.Application"));
    assert_eq!(manifest.get("X-Long"), Some("abcdef"));

    let mut nested = resolver.connection("mem:root!/lib/x.jar!/greeting.txt").unwrap();
    assert!(nested.manifest().unwrap().is_none());
}

#[test]
fn test_entry_urls_round_trip_through_the_resolver() {
    let resolver = resolver();
    let mut root = resolver.connection("mem:root!/").unwrap();
    let archive = root.archive().unwrap().clone();

    for entry in archive.entries().filter(|e| !e.is_directory) {
        let url = archive.entry_url(&entry.name);
        let mut connection = resolver.connection(&url).unwrap();
        assert_eq!(connection.entry_record().unwrap(), Some(entry));
        assert_eq!(connection.locator().to_string(), url);
    }
}

#[test]
fn test_nested_archives_are_cached_once() {
    let resolver = resolver();
    for _ in 0..3 {
        let mut connection = resolver.connection("mem:root!/lib/x.jar!/greeting.txt").unwrap();
        connection.connect().unwrap();
    }
    // root plus lib/x.jar
    assert_eq!(resolver.cache().len(), 2);

    let mut a = resolver.connection("mem:root!/lib/x.jar!/").unwrap();
    let mut b = resolver.connection("mem:root!/lib/x.jar!/greeting.txt").unwrap();
    assert!(std::sync::Arc::ptr_eq(a.archive().unwrap(), b.archive().unwrap()));
}

#[test]
fn test_reregistering_memory_drops_nested_archives() {
    let resolver = Resolver::default();
    let locator = "mem:swap!/lib/x.jar!/greeting.txt";

    resolver.register_memory("swap", greeting_archive(b"hello"));
    let mut before = resolver.connection(locator).unwrap();
    assert_eq!(read_all(&mut before), b"hello");
    assert_eq!(resolver.cache().len(), 2);

    // Same layout, so every nested offset is unchanged
    resolver.register_memory("swap", greeting_archive(b"HOWDY"));
    assert!(resolver.cache().is_empty());

    let mut after = resolver.connection(locator).unwrap();
    assert_eq!(read_all(&mut after), b"HOWDY");
    let mut root = resolver.connection("mem:swap!/").unwrap();
    assert_eq!(read_all(&mut root), greeting_archive(b"HOWDY"));

    // A connection made before the swap keeps what it resolved
    assert_eq!(read_all(&mut before), b"hello");
}

#[test]
fn test_concurrent_connections_share_the_cache() {
    let resolver = resolver();
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let resolver = resolver.clone();
            thread::spawn(move || {
                let mut connection = resolver
                    .connection("mem:root!/lib/x.jar!/greeting.txt")
                    .unwrap();
                read_all(&mut connection)
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), b"hello");
    }
    assert_eq!(resolver.cache().len(), 2);
}

#[test]
fn test_file_backed_archive_matches_memory() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&application_archive()).unwrap();
    file.flush().unwrap();

    let resolver = Resolver::new(ResolverConfig::default().with_library_prefix("lib/"));
    let root = format!("file:{}", nestjar::encode_path(file.path().to_string_lossy().as_bytes()));

    let mut app = resolver.connection(&format!("{}!/app.txt", root)).unwrap();
    assert_eq!(read_all(&mut app), b"hi there");

    let mut greeting = resolver
        .connection(&format!("{}!/lib/x.jar!/greeting.txt", root))
        .unwrap();
    assert_eq!(read_all(&mut greeting), b"hello");

    let mut readme = resolver.connection(&format!("{}!/docs/readme.txt", root)).unwrap();
    assert_eq!(read_all(&mut readme), README.as_bytes());

    let mut missing = resolver
        .connection(&format!("{}!/lib/x.jar!/missing.txt", root))
        .unwrap();
    assert!(matches!(missing.open_stream(), Err(Error::EntryNotFound { .. })));

    let mut archive = resolver.connection(&format!("{}!/", root)).unwrap();
    let prefix = resolver.config().library_prefix.clone();
    let libraries = archive.archive().unwrap().nested_archives(&prefix).unwrap().len();
    assert_eq!(libraries, 1);
}

#[test]
fn test_spellings_of_one_file_share_an_index() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&application_archive()).unwrap();
    file.flush().unwrap();

    let resolver = Resolver::default();
    let path = file.path().to_string_lossy().into_owned();
    let canonical = format!("file:{}", nestjar::encode_path(path.as_bytes()));

    let mut first = resolver
        .connection(&format!("{}!/lib/x.jar!/greeting.txt", canonical))
        .unwrap();
    let archive = first.archive().unwrap().clone();

    for root in [format!("file://{}", path), path.clone()] {
        let mut connection = resolver
            .connection(&format!("{}!/lib/x.jar!/greeting.txt", root))
            .unwrap();
        assert!(std::sync::Arc::ptr_eq(connection.archive().unwrap(), &archive));
        assert_eq!(read_all(&mut connection), b"hello");
    }
    assert_eq!(resolver.cache().len(), 2);
    assert_eq!(archive.url(), format!("{}!/lib/x.jar!/", canonical));
}

#[test]
fn test_missing_file_is_an_io_error() {
    let resolver = Resolver::default();
    let mut connection = resolver
        .connection("file:/definitely/not/here/app.jar!/app.txt")
        .unwrap();
    assert!(matches!(connection.connect(), Err(Error::Io(_))));
}
