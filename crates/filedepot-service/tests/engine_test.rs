//! End-to-end tests for the storage engine over in-memory SQLite and a
//! temporary content-store directory.

use std::sync::Arc;

use bytes::Bytes;

use filedepot_auth::access::Caller;
use filedepot_auth::password::PasswordHasher;
use filedepot_core::error::ErrorKind;
use filedepot_core::traits::ContentStore;
use filedepot_core::types::{FileFilter, FileSort, FileSortKey};
use filedepot_database::repositories::{FileRepository, UserRepository};
use filedepot_database::{DatabasePool, migration};
use filedepot_entity::user::{CreateUserRequest, User, UserRole};
use filedepot_service::{CatalogService, IdentityService, LinkService, StorageEngine};
use filedepot_storage::LocalContentStore;

/// Fully wired engine over hermetic backing stores.
struct TestEngine {
    engine: StorageEngine,
    catalog: CatalogService,
    identity: IdentityService,
    store: Arc<LocalContentStore>,
    _dir: tempfile::TempDir,
}

impl TestEngine {
    async fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = Arc::new(
            LocalContentStore::new(dir.path().to_str().unwrap())
                .await
                .expect("Failed to init content store"),
        );

        let db = DatabasePool::connect_in_memory()
            .await
            .expect("Failed to open in-memory database");
        migration::run_migrations(db.pool())
            .await
            .expect("Failed to run migrations");

        let user_repo = Arc::new(UserRepository::new(db.pool().clone()));
        let file_repo = Arc::new(FileRepository::new(db.pool().clone()));
        let hasher = Arc::new(PasswordHasher::new());

        let content: Arc<dyn ContentStore> = store.clone();
        let identity = IdentityService::new(user_repo.clone(), hasher, content.clone());
        let catalog = CatalogService::new(file_repo, user_repo, content, LinkService::new());
        let engine = StorageEngine::new(identity.clone(), catalog.clone());

        Self {
            engine,
            catalog,
            identity,
            store,
            _dir: dir,
        }
    }

    /// Create an account with the given role and return it with its caller.
    async fn user(&self, username: &str, role: UserRole) -> (User, Caller) {
        let user = self
            .identity
            .create_user(CreateUserRequest {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password: "password123".to_string(),
                full_name: String::new(),
                role,
            })
            .await
            .expect("Failed to create user");
        let caller = Caller::from_user(&user);
        (user, caller)
    }

    async fn member(&self, username: &str) -> (User, Caller) {
        self.user(username, UserRole::Member).await
    }
}

fn request(username: &str, email: &str) -> CreateUserRequest {
    CreateUserRequest {
        username: username.to_string(),
        email: email.to_string(),
        password: "password123".to_string(),
        full_name: String::new(),
        role: UserRole::Member,
    }
}

#[tokio::test]
async fn test_database_health_check_reports_connectivity() {
    let db = DatabasePool::connect_in_memory().await.unwrap();
    assert!(db.health_check().await.unwrap());
}

#[tokio::test]
async fn test_duplicate_username_and_email_are_rejected() {
    let t = TestEngine::new().await;

    t.engine.register(request("alice", "alice@example.com")).await.unwrap();

    let err = t
        .engine
        .register(request("alice", "other@example.com"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Duplicate);

    let err = t
        .engine
        .register(request("bob", "alice@example.com"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Duplicate);
}

#[tokio::test]
async fn test_register_ignores_role_flags() {
    let t = TestEngine::new().await;

    let mut req = request("mallory", "mallory@example.com");
    req.role = UserRole::Superuser;
    let user = t.engine.register(req).await.unwrap();

    assert!(!user.is_admin);
    assert!(!user.is_superuser);
}

#[tokio::test]
async fn test_authenticate_roundtrip() {
    let t = TestEngine::new().await;
    t.member("alice").await;

    let user = t.engine.authenticate("alice", "password123").await.unwrap();
    assert_eq!(user.username, "alice");

    let err = t.engine.authenticate("alice", "wrong").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::CredentialInvalid);

    // Unknown user is shaped identically to a wrong password.
    let err = t.engine.authenticate("nobody", "password123").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::CredentialInvalid);
}

#[tokio::test]
async fn test_upload_then_download_returns_identical_bytes() {
    let t = TestEngine::new().await;
    let (_, alice) = t.member("alice").await;

    let payload = Bytes::from(vec![0u8, 1, 2, 3, 255, 254]);
    let file = t
        .engine
        .upload(&alice, "data.bin", payload.clone(), "")
        .await
        .unwrap();
    assert_eq!(file.size, payload.len() as i64);
    assert!(file.last_download_at.is_none());

    let download = t.engine.download(&alice, file.id).await.unwrap();
    assert_eq!(download.bytes, payload);
    assert_eq!(download.original_name, "data.bin");

    let after = t.engine.get_file(&alice, file.id).await.unwrap();
    assert!(after.last_download_at.unwrap() >= after.uploaded_at);
}

#[tokio::test]
async fn test_duplicate_stored_name_is_per_owner() {
    let t = TestEngine::new().await;
    let (_, alice) = t.member("alice").await;
    let (_, bob) = t.member("bob").await;

    t.engine
        .upload(&alice, "notes.txt", Bytes::from("a"), "")
        .await
        .unwrap();

    let err = t
        .engine
        .upload(&alice, "notes.txt", Bytes::from("b"), "")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Duplicate);

    // Another owner may use the same stored name.
    t.engine
        .upload(&bob, "notes.txt", Bytes::from("c"), "")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_failed_upload_leaves_no_orphaned_bytes() {
    let t = TestEngine::new().await;
    let (user, alice) = t.member("alice").await;

    t.engine
        .upload(&alice, "doc.txt", Bytes::from("first"), "")
        .await
        .unwrap();
    // Collides on (owner, original_name); the bytes written for the second
    // attempt must be rolled back.
    t.engine
        .upload(&alice, "doc.txt", Bytes::from("second"), "")
        .await
        .unwrap_err();

    let files = t.catalog.list_by_owner(user.id).await.unwrap();
    assert_eq!(files.len(), 1);
    // Only the surviving file's blob exists in the namespace.
    assert!(t.store.exists(&files[0].content_key).await.unwrap());
    let blobs = std::fs::read_dir(t._dir.path().join(&user.storage_namespace))
        .unwrap()
        .count();
    assert_eq!(blobs, 1);
}

#[tokio::test]
async fn test_minting_replaces_and_invalidates_old_token() {
    let t = TestEngine::new().await;
    let (_, alice) = t.member("alice").await;

    let file = t
        .engine
        .upload(&alice, "shared.txt", Bytes::from("content"), "")
        .await
        .unwrap();

    let old = t.engine.mint_link(&alice, file.id).await.unwrap();
    assert_eq!(old.len(), 64);
    t.engine.download_by_token(&old).await.unwrap();

    let new = t.engine.mint_link(&alice, file.id).await.unwrap();
    assert_ne!(old, new);

    let err = t.engine.download_by_token(&old).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let download = t.engine.download_by_token(&new).await.unwrap();
    assert_eq!(download.file_id, file.id);
    assert_eq!(download.bytes, Bytes::from("content"));
}

#[tokio::test]
async fn test_token_download_is_anonymous_and_recorded() {
    let t = TestEngine::new().await;
    let (_, alice) = t.member("alice").await;

    let file = t
        .engine
        .upload(&alice, "public.txt", Bytes::from("x"), "")
        .await
        .unwrap();
    let token = t.engine.mint_link(&alice, file.id).await.unwrap();

    t.engine.download_by_token(&token).await.unwrap();

    let after = t.engine.get_file(&alice, file.id).await.unwrap();
    assert!(after.last_download_at.is_some());
}

#[tokio::test]
async fn test_share_grants_download_and_nothing_else() {
    let t = TestEngine::new().await;
    let (_, alice) = t.member("alice").await;
    let (bob_user, bob) = t.member("bob").await;

    let file = t
        .engine
        .upload(&alice, "secret.txt", Bytes::from("secret"), "")
        .await
        .unwrap();

    // Before the share, bob sees the same error as for an absent file.
    let err = t.engine.download(&bob, file.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    t.engine.share_file(&alice, file.id, bob_user.id).await.unwrap();

    let download = t.engine.download(&bob, file.id).await.unwrap();
    assert_eq!(download.bytes, Bytes::from("secret"));

    // Read is granted too; mutation and delete are not.
    t.engine.get_file(&bob, file.id).await.unwrap();
    assert_eq!(
        t.engine
            .rename_file(&bob, file.id, "stolen.txt")
            .await
            .unwrap_err()
            .kind,
        ErrorKind::NotFound
    );
    assert_eq!(
        t.engine.delete_file(&bob, file.id).await.unwrap_err().kind,
        ErrorKind::NotFound
    );
}

#[tokio::test]
async fn test_resharing_is_idempotent() {
    let t = TestEngine::new().await;
    let (_, alice) = t.member("alice").await;
    let (bob_user, _) = t.member("bob").await;

    let file = t
        .engine
        .upload(&alice, "doc.txt", Bytes::from("d"), "")
        .await
        .unwrap();

    t.engine.share_file(&alice, file.id, bob_user.id).await.unwrap();
    t.engine.share_file(&alice, file.id, bob_user.id).await.unwrap();

    let file = t.engine.get_file(&alice, file.id).await.unwrap();
    assert_eq!(file.recipients, vec![bob_user.id]);
}

#[tokio::test]
async fn test_self_share_is_rejected() {
    let t = TestEngine::new().await;
    let (alice_user, alice) = t.member("alice").await;

    let file = t
        .engine
        .upload(&alice, "doc.txt", Bytes::from("d"), "")
        .await
        .unwrap();

    let err = t
        .engine
        .share_file(&alice, file.id, alice_user.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);
}

#[tokio::test]
async fn test_share_with_unknown_recipient_fails() {
    let t = TestEngine::new().await;
    let (_, alice) = t.member("alice").await;

    let file = t
        .engine
        .upload(&alice, "doc.txt", Bytes::from("d"), "")
        .await
        .unwrap();

    let err = t
        .engine
        .share_file(&alice, file.id, uuid::Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_rename_rejects_empty_name_and_keeps_original() {
    let t = TestEngine::new().await;
    let (_, alice) = t.member("alice").await;

    let file = t
        .engine
        .upload(&alice, "draft.txt", Bytes::from("d"), "")
        .await
        .unwrap();

    let err = t
        .engine
        .rename_file(&alice, file.id, "")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);

    let renamed = t
        .engine
        .rename_file(&alice, file.id, "final.txt")
        .await
        .unwrap();
    assert_eq!(renamed.display_name, "final.txt");
    assert_eq!(renamed.original_name, "draft.txt");
}

#[tokio::test]
async fn test_comment_bound_is_enforced() {
    let t = TestEngine::new().await;
    let (_, alice) = t.member("alice").await;

    let file = t
        .engine
        .upload(&alice, "doc.txt", Bytes::from("d"), "")
        .await
        .unwrap();

    let updated = t
        .engine
        .update_comment(&alice, file.id, &"c".repeat(200))
        .await
        .unwrap();
    assert_eq!(updated.comment.len(), 200);

    let err = t
        .engine
        .update_comment(&alice, file.id, &"c".repeat(201))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);
}

#[tokio::test]
async fn test_listing_another_users_files_requires_admin() {
    let t = TestEngine::new().await;
    let (alice_user, alice) = t.member("alice").await;
    let (_, bob) = t.member("bob").await;
    let (_, admin) = t.user("root", UserRole::Admin).await;

    t.engine
        .upload(&alice, "mine.txt", Bytes::from("m"), "")
        .await
        .unwrap();

    let err = t
        .engine
        .list_files(&bob, Some(alice_user.id))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Denied);

    let listed = t
        .engine
        .list_files(&admin, Some(alice_user.id))
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);

    // A caller naming their own id needs no privilege.
    let own = t.engine.list_files(&alice, Some(alice_user.id)).await.unwrap();
    assert_eq!(own.len(), 1);
}

#[tokio::test]
async fn test_admin_surface_requires_privileges() {
    let t = TestEngine::new().await;
    let (_, member) = t.member("alice").await;

    assert_eq!(
        t.engine.admin_list_users(&member).await.unwrap_err().kind,
        ErrorKind::Denied
    );

    let mut req = request("newbie", "newbie@example.com");
    req.role = UserRole::Member;
    assert_eq!(
        t.engine
            .admin_create_user(&member, req)
            .await
            .unwrap_err()
            .kind,
        ErrorKind::Denied
    );
}

#[tokio::test]
async fn test_only_superusers_manage_superusers() {
    let t = TestEngine::new().await;
    let (_, admin) = t.user("admin", UserRole::Admin).await;
    let (root_user, root) = t.user("root", UserRole::Superuser).await;

    // Admin cannot mint a superuser.
    let mut req = request("boss", "boss@example.com");
    req.role = UserRole::Superuser;
    assert_eq!(
        t.engine
            .admin_create_user(&admin, req.clone())
            .await
            .unwrap_err()
            .kind,
        ErrorKind::Denied
    );

    // A superuser can.
    let boss = t.engine.admin_create_user(&root, req).await.unwrap();
    assert!(boss.is_superuser);
    assert!(boss.is_admin);

    // Admin cannot delete or demote a superuser.
    assert_eq!(
        t.engine
            .admin_delete_user(&admin, root_user.id)
            .await
            .unwrap_err()
            .kind,
        ErrorKind::Denied
    );
    assert_eq!(
        t.engine
            .admin_set_role(&admin, boss.id, true, false)
            .await
            .unwrap_err()
            .kind,
        ErrorKind::Denied
    );

    // A superuser can demote one.
    let demoted = t
        .engine
        .admin_set_role(&root, boss.id, false, false)
        .await
        .unwrap();
    assert!(!demoted.is_admin);
    assert!(!demoted.is_superuser);
}

#[tokio::test]
async fn test_granting_superuser_forces_admin() {
    let t = TestEngine::new().await;
    let (_, root) = t.user("root", UserRole::Superuser).await;
    let (target, _) = t.member("alice").await;

    let promoted = t
        .engine
        .admin_set_role(&root, target.id, false, true)
        .await
        .unwrap();
    assert!(promoted.is_superuser);
    assert!(promoted.is_admin);
}

#[tokio::test]
async fn test_user_deletion_cascades_to_files_and_bytes() {
    let t = TestEngine::new().await;
    let (alice_user, alice) = t.member("alice").await;
    let (_, bob) = t.member("bob").await;
    let (_, admin) = t.user("root", UserRole::Admin).await;

    let f1 = t
        .engine
        .upload(&alice, "one.txt", Bytes::from("1"), "")
        .await
        .unwrap();
    let f2 = t
        .engine
        .upload(&alice, "two.txt", Bytes::from("2"), "")
        .await
        .unwrap();
    // A file merely shared *with* alice must survive her deletion.
    let bobs = t
        .engine
        .upload(&bob, "keep.txt", Bytes::from("k"), "")
        .await
        .unwrap();
    t.engine.share_file(&bob, bobs.id, alice_user.id).await.unwrap();

    t.engine.admin_delete_user(&admin, alice_user.id).await.unwrap();

    assert!(t.catalog.list_by_owner(alice_user.id).await.unwrap().is_empty());
    assert!(!t.store.exists(&f1.content_key).await.unwrap());
    assert!(!t.store.exists(&f2.content_key).await.unwrap());
    assert_eq!(
        t.identity.get_user(alice_user.id).await.unwrap_err().kind,
        ErrorKind::NotFound
    );

    let kept = t.engine.get_file(&bob, bobs.id).await.unwrap();
    assert_eq!(kept.id, bobs.id);
    assert!(kept.recipients.is_empty());
}

#[tokio::test]
async fn test_missing_bytes_quarantine_the_record() {
    let t = TestEngine::new().await;
    let (_, alice) = t.member("alice").await;

    let file = t
        .engine
        .upload(&alice, "fragile.txt", Bytes::from("f"), "")
        .await
        .unwrap();

    // Simulate external data loss.
    t.store.delete(&file.content_key).await.unwrap();

    let err = t.engine.download(&alice, file.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ContentMissing);

    let flagged = t.engine.get_file(&alice, file.id).await.unwrap();
    assert!(flagged.quarantined);

    // The quarantined record still reports the fault, and can be deleted.
    let err = t.engine.download(&alice, file.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ContentMissing);
    t.engine.delete_file(&alice, file.id).await.unwrap();
}

#[tokio::test]
async fn test_size_filter_bounds_are_inclusive() {
    let t = TestEngine::new().await;
    let (_, alice) = t.member("alice").await;
    let (_, admin) = t.user("root", UserRole::Admin).await;

    for (name, size) in [
        ("low.bin", 899usize),
        ("floor.bin", 900),
        ("mid.bin", 1000),
        ("ceil.bin", 1100),
        ("high.bin", 1101),
    ] {
        t.engine
            .upload(&alice, name, Bytes::from(vec![0u8; size]), "")
            .await
            .unwrap();
    }

    let sort = FileSort::asc(FileSortKey::Size);
    let matched = t
        .engine
        .admin_list_files(&admin, &sort, &FileFilter::SizeNear(1000))
        .await
        .unwrap();

    let sizes: Vec<i64> = matched.iter().map(|f| f.size).collect();
    assert_eq!(sizes, vec![900, 1000, 1100]);
}

#[tokio::test]
async fn test_default_filter_is_recently_downloaded() {
    let t = TestEngine::new().await;
    let (_, alice) = t.member("alice").await;
    let (_, admin) = t.user("root", UserRole::Admin).await;

    let downloaded = t
        .engine
        .upload(&alice, "hot.txt", Bytes::from("h"), "")
        .await
        .unwrap();
    t.engine
        .upload(&alice, "cold.txt", Bytes::from("c"), "")
        .await
        .unwrap();
    t.engine.download(&alice, downloaded.id).await.unwrap();

    let sort = FileSort::default();
    let recent = t
        .engine
        .admin_list_files(&admin, &sort, &FileFilter::default())
        .await
        .unwrap();

    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].id, downloaded.id);
}

#[tokio::test]
async fn test_name_filters_and_sort_direction() {
    let t = TestEngine::new().await;
    let (_, alice) = t.member("alice").await;
    let (_, admin) = t.user("root", UserRole::Admin).await;

    for name in ["alpha-report.pdf", "beta-report.pdf", "gamma.txt"] {
        t.engine
            .upload(&alice, name, Bytes::from("x"), "")
            .await
            .unwrap();
    }

    let sort = FileSort::parse("-original_name").unwrap();
    let reports = t
        .engine
        .admin_list_files(
            &admin,
            &sort,
            &FileFilter::OriginalNameContains("report".to_string()),
        )
        .await
        .unwrap();

    let names: Vec<&str> = reports.iter().map(|f| f.original_name.as_str()).collect();
    assert_eq!(names, vec!["beta-report.pdf", "alpha-report.pdf"]);

    // No matches is an empty list, never an error.
    let none = t
        .engine
        .admin_list_files(
            &admin,
            &sort,
            &FileFilter::NameContains("zzz".to_string()),
        )
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_name_filters_ignore_case() {
    let t = TestEngine::new().await;
    let (_, alice) = t.member("alice").await;
    let (_, admin) = t.user("root", UserRole::Admin).await;

    let file = t
        .engine
        .upload(&alice, "Report.pdf", Bytes::from("r"), "")
        .await
        .unwrap();
    t.engine
        .rename_file(&alice, file.id, "Q3-Summary.PDF")
        .await
        .unwrap();

    let sort = FileSort::default();
    let by_original = t
        .engine
        .admin_list_files(
            &admin,
            &sort,
            &FileFilter::OriginalNameContains("report".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(by_original.len(), 1);
    assert_eq!(by_original[0].id, file.id);

    let by_display = t
        .engine
        .admin_list_files(
            &admin,
            &sort,
            &FileFilter::NameContains("summary".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(by_display.len(), 1);

    // An upper-case fragment matches lower-case names too.
    let upper_fragment = t
        .engine
        .admin_list_files(
            &admin,
            &sort,
            &FileFilter::OriginalNameContains("REPORT".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(upper_fragment.len(), 1);
}

#[tokio::test]
async fn test_full_file_lifecycle_scenario() {
    let t = TestEngine::new().await;
    let (_, alice) = t.member("alice").await;
    let (bob_user, bob) = t.member("bob").await;
    let (_, carol) = t.member("carol").await;

    let payload = Bytes::from(vec![7u8; 500]);
    let uploaded = t
        .engine
        .upload(&alice, "report.pdf", payload.clone(), "quarterly numbers")
        .await
        .unwrap();

    let listed = t.engine.list_files(&alice, None).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].size, 500);
    assert_eq!(listed[0].display_name, "report.pdf");

    let renamed = t
        .engine
        .rename_file(&alice, uploaded.id, "Q3-report.pdf")
        .await
        .unwrap();
    assert_eq!(renamed.display_name, "Q3-report.pdf");
    assert_eq!(renamed.original_name, "report.pdf");

    t.engine.share_file(&alice, uploaded.id, bob_user.id).await.unwrap();

    let download = t.engine.download(&bob, uploaded.id).await.unwrap();
    assert_eq!(download.bytes, payload);
    assert_eq!(
        t.engine.download(&carol, uploaded.id).await.unwrap_err().kind,
        ErrorKind::NotFound
    );

    t.engine.delete_file(&alice, uploaded.id).await.unwrap();

    for caller in [&alice, &bob, &carol] {
        assert_eq!(
            t.engine.get_file(caller, uploaded.id).await.unwrap_err().kind,
            ErrorKind::NotFound
        );
    }
}
