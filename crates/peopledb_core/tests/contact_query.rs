use peopledb_core::db::open_db_in_memory;
use peopledb_core::{ContactRepository, ContactService, NewContact, SqliteContactRepository};

fn names(contacts: Vec<peopledb_core::Contact>) -> Vec<String> {
    contacts.into_iter().map(|contact| contact.name).collect()
}

#[test]
fn search_matches_name_nickname_and_tags_case_insensitively() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::try_new(&mut conn).unwrap();
    let service = ContactService::new(repo);

    let mut zed = NewContact::new("Zed");
    zed.nickname = "Adagio".to_string();
    service.add(zed).unwrap();
    service.add(NewContact::new("Ada Lovelace")).unwrap();
    service
        .add(NewContact::new("Bob").with_tags(["ADAPTIVE"]))
        .unwrap();
    service.add(NewContact::new("Carol")).unwrap();

    let hits = names(service.search("ada").unwrap());
    assert_eq!(hits, vec!["Ada Lovelace", "Bob", "Zed"]);
}

#[test]
fn search_matches_raw_encoded_tag_text() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::try_new(&mut conn).unwrap();
    let service = ContactService::new(repo);

    service.add(NewContact::new("Tagged").with_tags(["x"])).unwrap();
    service.add(NewContact::new("Untagged")).unwrap();

    // `"` only appears in the JSON syntax of a non-empty tag list.
    assert_eq!(names(service.search("\"").unwrap()), vec!["Tagged"]);
}

#[test]
fn search_treats_percent_and_underscore_literally() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::try_new(&mut conn).unwrap();
    let service = ContactService::new(repo);

    service.add(NewContact::new("100% Real")).unwrap();
    service.add(NewContact::new("Plain")).unwrap();

    assert_eq!(names(service.search("%").unwrap()), vec!["100% Real"]);
    assert!(service.search("_lain").unwrap().is_empty());
}

#[test]
fn empty_search_returns_every_contact() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::try_new(&mut conn).unwrap();
    let service = ContactService::new(repo);
    service.add(NewContact::new("b")).unwrap();
    service.add(NewContact::new("a")).unwrap();

    assert_eq!(names(service.search("").unwrap()), vec!["a", "b"]);
}

#[test]
fn search_keeps_surrounding_whitespace_in_the_query() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::try_new(&mut conn).unwrap();
    let service = ContactService::new(repo);
    service.add(NewContact::new("Ada Lovelace")).unwrap();
    service.add(NewContact::new("Ada")).unwrap();

    assert_eq!(names(service.search("ada ").unwrap()), vec!["Ada Lovelace"]);
    assert!(service.search("  ").unwrap().is_empty());
}

#[test]
fn search_folds_case_beyond_ascii() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::try_new(&mut conn).unwrap();
    let service = ContactService::new(repo);

    service.add(NewContact::new("Émile Zola")).unwrap();
    service
        .add(NewContact::new("Ada").with_tags(["Ärzte"]))
        .unwrap();
    service.add(NewContact::new("Bob")).unwrap();

    assert_eq!(names(service.search("émile").unwrap()), vec!["Émile Zola"]);
    assert_eq!(names(service.search("ÄRZTE").unwrap()), vec!["Ada"]);
    assert_eq!(
        service.search("ärzte").unwrap(),
        service.filter_by_tag("ärzte").unwrap()
    );
}

#[test]
fn filter_by_tag_is_exact_and_case_insensitive() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::try_new(&mut conn).unwrap();
    let service = ContactService::new(repo);

    service
        .add(NewContact::new("Ada").with_tags(["Work", "friend"]))
        .unwrap();
    service
        .add(NewContact::new("Bob").with_tags(["workshop"]))
        .unwrap();
    service.add(NewContact::new("Carol")).unwrap();

    assert_eq!(names(service.filter_by_tag("WORK").unwrap()), vec!["Ada"]);
    assert!(service.filter_by_tag("wor").unwrap().is_empty());
    assert!(service.filter_by_tag("   ").unwrap().is_empty());
}

#[test]
fn filter_by_tag_is_the_decoded_subset_of_list_all() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::try_new(&mut conn).unwrap();
    let service = ContactService::new(repo);

    service
        .add(NewContact::new("a").with_tags(["red", "Blue"]))
        .unwrap();
    service.add(NewContact::new("b").with_tags(["blue"])).unwrap();
    service.add(NewContact::new("c").with_tags(["green"])).unwrap();
    service.add(NewContact::new("d")).unwrap();

    let all = service.list_all().unwrap();
    for label in ["red", "BLUE", "green", "missing"] {
        let expected = all
            .iter()
            .filter(|contact| {
                contact
                    .tags
                    .iter()
                    .any(|tag| tag.to_lowercase() == label.to_lowercase())
            })
            .cloned()
            .collect::<Vec<_>>();
        assert_eq!(service.filter_by_tag(label).unwrap(), expected, "{label}");
    }
}

#[test]
fn filter_by_tag_skips_rows_with_corrupted_tags() {
    let mut conn = open_db_in_memory().unwrap();
    let id = {
        let repo = SqliteContactRepository::try_new(&mut conn).unwrap();
        repo.add(&NewContact::new("Ada").with_tags(["work"])).unwrap()
    };
    conn.execute("UPDATE contacts SET tags = 'work' WHERE id = ?1;", [id])
        .unwrap();

    let repo = SqliteContactRepository::try_new(&mut conn).unwrap();
    assert!(repo.filter_by_tag("work").unwrap().is_empty());
}

#[test]
fn all_tags_is_a_sorted_distinct_union() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::try_new(&mut conn).unwrap();
    let service = ContactService::new(repo);

    service
        .add(NewContact::new("a").with_tags(["work", "friend"]))
        .unwrap();
    service
        .add(NewContact::new("b").with_tags(["friend", "Zoo"]))
        .unwrap();
    service.add(NewContact::new("c")).unwrap();

    assert_eq!(service.all_tags().unwrap(), vec!["Zoo", "friend", "work"]);
}
