use chrono::{TimeZone, Utc};
use peopledb_core::db::open_db_in_memory;
use peopledb_core::{
    project, ContactService, ContactServiceError, ExportError, NewContact,
    SqliteContactRepository, EXPORT_HEADERS,
};

#[test]
fn export_csv_writes_timestamped_file_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::try_new(&mut conn).unwrap();
    let service = ContactService::new(repo);

    let mut zoe = NewContact::new("Zoe").with_tags(["work", "friend"]);
    zoe.like_romantically = true;
    service.add(zoe).unwrap();
    service
        .add(NewContact::new("Ada").with_social("github", "ada"))
        .unwrap();

    let path = service.export_csv(dir.path()).unwrap();
    let file_name = path.file_name().unwrap().to_str().unwrap().to_string();
    assert!(file_name.starts_with("contacts_export_"));
    assert!(file_name.ends_with(".csv"));
    // contacts_export_YYYYMMDD_HHMMSS.csv
    assert_eq!(file_name.len(), "contacts_export_".len() + 15 + ".csv".len());

    let content = std::fs::read_to_string(&path).unwrap();
    let lines = content.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], EXPORT_HEADERS.join(","));
    assert!(lines[1].contains(",Ada,"));
    assert!(lines[1].contains(r#""{""github"":""ada""}""#));
    assert!(lines[2].contains(",Zoe,"));
    assert!(lines[2].contains("\"work, friend\",No,Yes,"));
}

#[test]
fn export_of_empty_store_has_header_only() {
    let dir = tempfile::tempdir().unwrap();
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::try_new(&mut conn).unwrap();
    let service = ContactService::new(repo);

    let path = service.export_csv(dir.path()).unwrap();
    let content = std::fs::read_to_string(path).unwrap();
    assert_eq!(content.lines().count(), 1);
}

#[test]
fn projection_follows_store_order_and_column_layout() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::try_new(&mut conn).unwrap();
    let service = ContactService::new(repo);
    service.add(NewContact::new("b")).unwrap();
    service.add(NewContact::new("a")).unwrap();

    let contacts = service.list_all().unwrap();
    let rows = project(&contacts);
    assert_eq!(rows.len(), 2);
    for (row, contact) in rows.iter().zip(&contacts) {
        let cells = row.cells();
        assert_eq!(cells.len(), EXPORT_HEADERS.len());
        assert_eq!(cells[0], contact.id.to_string());
        assert_eq!(cells[1], contact.name);
        assert_eq!(cells[6], "{}");
        assert_eq!(cells[7], "");
        assert_eq!(cells[8], "No");
        assert_eq!(cells[10], contact.created_at);
    }
}

#[test]
fn export_in_the_same_second_never_overwrites_the_earlier_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::try_new(&mut conn).unwrap();
    let service = ContactService::new(repo);
    service.add(NewContact::new("Ada")).unwrap();

    let stamp = Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap();
    let first = service.export_csv_stamped(dir.path(), &stamp).unwrap();
    assert!(first.ends_with("contacts_export_20240131_235959.csv"));
    let written = std::fs::read_to_string(&first).unwrap();

    service.add(NewContact::new("Bob")).unwrap();
    match service.export_csv_stamped(dir.path(), &stamp) {
        Err(ContactServiceError::Export(ExportError::AlreadyExists(path))) => {
            assert_eq!(path, first)
        }
        other => panic!("unexpected export result: {other:?}"),
    }
    assert_eq!(std::fs::read_to_string(&first).unwrap(), written);
}
