use radiodj::{Error, Flag, UserDirectory, SUPERADMIN};

#[tokio::test]
async fn accounts_persist_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.json");

    let users = UserDirectory::open(&path).await.unwrap();
    let admin_password = users.ensure_superadmin().await.unwrap().unwrap();
    let password = users.create_user("dj_kool").await.unwrap();
    users.set_flag("dj_kool", Flag::Banned, true).await.unwrap();
    drop(users);

    let users = UserDirectory::open(&path).await.unwrap();
    assert!(users.ensure_superadmin().await.unwrap().is_none());
    assert!(users.verify(SUPERADMIN, &admin_password).await.unwrap());
    assert!(!users.verify("dj_kool", &password).await.unwrap());

    let record = users.get("dj_kool").await.unwrap().unwrap();
    assert!(record.banned);
    assert!(!record.admin);
    assert_eq!(users.list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn refusals_come_back_as_errors() {
    let dir = tempfile::tempdir().unwrap();
    let users = UserDirectory::open(dir.path().join("users.json")).await.unwrap();
    users.ensure_superadmin().await.unwrap();
    users.create_user("dj_kool").await.unwrap();

    assert!(matches!(
        users.create_user("dj_kool").await,
        Err(Error::UserExists(name)) if name == "dj_kool"
    ));
    assert!(matches!(
        users.set_flag(SUPERADMIN, Flag::Banned, true).await,
        Err(Error::ProtectedUser { flag: "banned", .. })
    ));
    assert!(matches!(
        users.set_flag(SUPERADMIN, Flag::Admin, false).await,
        Err(Error::ProtectedUser { flag: "admin", .. })
    ));
    assert!(matches!(
        users.set_password("ghost").await,
        Err(Error::UnknownUser(_))
    ));
    assert!(users.get("ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn concurrent_creations_are_serialized() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.json");
    let users = UserDirectory::open(&path).await.unwrap();

    let creations: Vec<_> = (0..10)
        .map(|i| {
            let users = users.clone();
            tokio::spawn(async move { users.create_user(&format!("dj_{}", i)).await })
        })
        .collect();
    for creation in creations {
        creation.await.unwrap().unwrap();
    }
    drop(users);

    let reopened = UserDirectory::open(&path).await.unwrap();
    assert_eq!(reopened.list().await.unwrap().len(), 10);
}

#[tokio::test]
async fn corrupted_database_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(matches!(
        UserDirectory::open(&path).await,
        Err(Error::Json(_))
    ));
}

#[tokio::test]
async fn failed_write_does_not_register_the_user() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.json");
    let users = UserDirectory::open(&path).await.unwrap();
    std::fs::create_dir(dir.path().join("users.json.tmp")).unwrap();

    for _ in 0..2 {
        assert!(matches!(
            users.create_user("dj_ghost").await,
            Err(Error::Io(_))
        ));
    }
    assert!(users.get("dj_ghost").await.unwrap().is_none());
    assert!(!path.exists());
}
