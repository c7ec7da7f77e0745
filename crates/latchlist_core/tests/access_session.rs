use latchlist_core::db::open_db_in_memory;
use latchlist_core::{
    AccessError, AccessSessionManager, AccessState, CredentialInputError, InMemoryIdentityStore,
    ManualClock, RepoError, SqliteCredentialRepository,
};
use rusqlite::Connection;
use std::time::Duration;

type Manager<'conn> =
    AccessSessionManager<InMemoryIdentityStore, SqliteCredentialRepository<'conn>, ManualClock>;

fn manager(conn: &Connection, clock: ManualClock) -> Manager<'_> {
    let repo = SqliteCredentialRepository::try_new(conn).unwrap();
    AccessSessionManager::new(InMemoryIdentityStore::new(), repo, clock)
}

#[test]
fn fresh_device_starts_uninitialized() {
    let conn = open_db_in_memory().unwrap();
    let mut manager = manager(&conn, ManualClock::new());

    assert_eq!(manager.status().unwrap(), AccessState::Uninitialized);
    // Probing the state must not mint an identity behind the caller's back.
    assert_eq!(manager.status().unwrap(), AccessState::Uninitialized);
}

#[test]
fn create_credential_unlocks_immediately() {
    let conn = open_db_in_memory().unwrap();
    let mut manager = manager(&conn, ManualClock::new());

    manager.create_credential("1234", 15, None).unwrap();
    assert_eq!(manager.status().unwrap(), AccessState::Unlocked);
    assert!(manager.unlocked_identity().is_some());
}

#[test]
fn known_identity_with_credential_starts_locked() {
    let conn = open_db_in_memory().unwrap();
    let clock = ManualClock::new();
    let mut first = manager(&conn, clock.clone());
    first.create_credential("1234", 15, None).unwrap();
    let identity = first.unlocked_identity().unwrap();

    // Same device, new process: the session is gone but the identity and
    // credential remain.
    let repo = SqliteCredentialRepository::try_new(&conn).unwrap();
    let mut restarted = AccessSessionManager::new(
        InMemoryIdentityStore::with_identity(identity),
        repo,
        clock,
    );
    assert_eq!(restarted.status().unwrap(), AccessState::Locked);
}

#[test]
fn create_then_verify_with_same_pin_unlocks() {
    let conn = open_db_in_memory().unwrap();
    let mut manager = manager(&conn, ManualClock::new());

    manager.create_credential("4711", 30, None).unwrap();
    manager.lock();
    assert_eq!(manager.status().unwrap(), AccessState::Locked);

    manager.verify_credential("4711", None).unwrap();
    assert_eq!(manager.status().unwrap(), AccessState::Unlocked);
}

#[test]
fn verify_with_wrong_pin_fails_and_stays_locked() {
    let conn = open_db_in_memory().unwrap();
    let mut manager = manager(&conn, ManualClock::new());

    manager.create_credential("1234", 15, None).unwrap();
    manager.lock();

    let err = manager.verify_credential("1235", None).unwrap_err();
    assert!(matches!(err, AccessError::InvalidCredential));
    assert_eq!(manager.status().unwrap(), AccessState::Locked);
}

#[test]
fn verify_without_any_local_identity_fails() {
    let conn = open_db_in_memory().unwrap();
    let mut manager = manager(&conn, ManualClock::new());

    let err = manager.verify_credential("1234", None).unwrap_err();
    assert!(matches!(err, AccessError::InvalidCredential));
}

#[test]
fn create_revalidates_pin_input() {
    let conn = open_db_in_memory().unwrap();
    let mut manager = manager(&conn, ManualClock::new());

    let err = manager.create_credential("123", 15, None).unwrap_err();
    assert!(matches!(
        err,
        AccessError::Input(CredentialInputError::PinTooShort)
    ));

    let err = manager.create_credential("12a4", 15, None).unwrap_err();
    assert!(matches!(
        err,
        AccessError::Input(CredentialInputError::PinNotNumeric)
    ));

    assert_eq!(manager.status().unwrap(), AccessState::Uninitialized);
}

#[test]
fn create_rejects_zero_auto_lock_and_blank_display_name() {
    let conn = open_db_in_memory().unwrap();
    let mut manager = manager(&conn, ManualClock::new());

    let err = manager.create_credential("1234", 0, None).unwrap_err();
    assert!(matches!(
        err,
        AccessError::Input(CredentialInputError::ZeroAutoLock)
    ));

    let err = manager.create_credential("1234", 15, Some("   ")).unwrap_err();
    assert!(matches!(
        err,
        AccessError::Input(CredentialInputError::EmptyDisplayName)
    ));
}

#[test]
fn second_create_for_same_identity_is_a_conflict() {
    let conn = open_db_in_memory().unwrap();
    let mut manager = manager(&conn, ManualClock::new());

    manager.create_credential("1234", 15, None).unwrap();
    let err = manager.create_credential("9999", 30, None).unwrap_err();
    assert!(matches!(
        err,
        AccessError::Repo(RepoError::CredentialConflict(_))
    ));
}

#[test]
fn session_auto_locks_when_the_deadline_passes() {
    let conn = open_db_in_memory().unwrap();
    let clock = ManualClock::new();
    let mut manager = manager(&conn, clock.clone());

    manager.create_credential("1234", 1, None).unwrap();
    assert_eq!(manager.status().unwrap(), AccessState::Unlocked);

    clock.advance(Duration::from_secs(59));
    assert_eq!(manager.status().unwrap(), AccessState::Unlocked);

    clock.advance(Duration::from_secs(1));
    assert_eq!(manager.status().unwrap(), AccessState::Locked);
    assert_eq!(manager.unlocked_identity(), None);
}

#[test]
fn explicit_lock_wins_regardless_of_remaining_time() {
    let conn = open_db_in_memory().unwrap();
    let clock = ManualClock::new();
    let mut manager = manager(&conn, clock.clone());

    manager.create_credential("1234", 60, None).unwrap();
    manager.lock();
    assert_eq!(manager.status().unwrap(), AccessState::Locked);

    // The deadline armed before the lock must not resurrect the session.
    clock.advance(Duration::from_secs(2 * 3600));
    assert_eq!(manager.status().unwrap(), AccessState::Locked);
}

#[test]
fn re_unlock_replaces_the_earlier_deadline() {
    let conn = open_db_in_memory().unwrap();
    let clock = ManualClock::new();
    let mut manager = manager(&conn, clock.clone());

    // First session would expire at t+60s.
    manager.create_credential("1234", 1, None).unwrap();
    clock.advance(Duration::from_secs(30));

    // Second unlock re-arms to t+90s; the t+60s deadline is gone.
    manager.verify_credential("1234", None).unwrap();
    clock.advance(Duration::from_secs(40));
    assert_eq!(manager.status().unwrap(), AccessState::Unlocked);

    clock.advance(Duration::from_secs(25));
    assert_eq!(manager.status().unwrap(), AccessState::Locked);
}

#[test]
fn unresolved_display_name_fails_without_local_fallback() {
    let conn = open_db_in_memory().unwrap();
    let mut manager = manager(&conn, ManualClock::new());

    manager
        .create_credential("1234", 15, Some("alice"))
        .unwrap();
    manager.lock();

    // The PIN is correct for the local identity, but the supplied name
    // does not resolve. Falling back would let a stranger unlock whatever
    // identity this device happens to hold.
    let err = manager.verify_credential("1234", Some("bob")).unwrap_err();
    assert!(matches!(err, AccessError::InvalidCredential));
    assert_eq!(manager.status().unwrap(), AccessState::Locked);
}

#[test]
fn blank_display_name_falls_back_to_the_local_identity() {
    let conn = open_db_in_memory().unwrap();
    let mut manager = manager(&conn, ManualClock::new());

    manager.create_credential("1234", 15, None).unwrap();
    manager.lock();

    manager.verify_credential("1234", Some("   ")).unwrap();
    assert_eq!(manager.status().unwrap(), AccessState::Unlocked);
}

#[test]
fn named_verification_adopts_the_resolved_identity() {
    let conn = open_db_in_memory().unwrap();
    let clock = ManualClock::new();

    let mut device_a = manager(&conn, clock.clone());
    device_a
        .create_credential("1234", 15, Some("alice"))
        .unwrap();
    let identity_a = device_a.unlocked_identity().unwrap();

    // A second device with no identity of its own verifies by name and
    // lands on the same shared list.
    let mut device_b = manager(&conn, clock);
    device_b.verify_credential("1234", Some("alice")).unwrap();
    assert_eq!(device_b.unlocked_identity(), Some(identity_a));

    // Adoption is durable: the next unlock on device B no longer needs
    // the name.
    device_b.lock();
    device_b.verify_credential("1234", None).unwrap();
    assert_eq!(device_b.unlocked_identity(), Some(identity_a));
}

#[test]
fn named_verification_with_wrong_pin_does_not_adopt() {
    let conn = open_db_in_memory().unwrap();
    let clock = ManualClock::new();

    let mut device_a = manager(&conn, clock.clone());
    device_a
        .create_credential("1234", 15, Some("alice"))
        .unwrap();

    let mut device_b = manager(&conn, clock);
    let err = device_b
        .verify_credential("9999", Some("alice"))
        .unwrap_err();
    assert!(matches!(err, AccessError::InvalidCredential));

    // Device B keeps no trace of the probe: still no identity, so a
    // nameless verify has nothing to target.
    let err = device_b.verify_credential("1234", None).unwrap_err();
    assert!(matches!(err, AccessError::InvalidCredential));
}

#[test]
fn display_name_taken_by_another_identity_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let clock = ManualClock::new();

    let mut device_a = manager(&conn, clock.clone());
    device_a
        .create_credential("1234", 15, Some("alice"))
        .unwrap();

    let mut device_b = manager(&conn, clock);
    let err = device_b
        .create_credential("9999", 30, Some("alice"))
        .unwrap_err();
    assert!(matches!(
        err,
        AccessError::Repo(RepoError::DisplayNameTaken(_))
    ));
    assert_eq!(device_b.status().unwrap(), AccessState::Uninitialized);
}

#[test]
fn display_name_is_trimmed_before_storage() {
    let conn = open_db_in_memory().unwrap();
    let clock = ManualClock::new();

    let mut device_a = manager(&conn, clock.clone());
    device_a
        .create_credential("1234", 15, Some("  alice  "))
        .unwrap();
    let identity_a = device_a.unlocked_identity().unwrap();

    let mut device_b = manager(&conn, clock);
    device_b.verify_credential("1234", Some("alice")).unwrap();
    assert_eq!(device_b.unlocked_identity(), Some(identity_a));
}
