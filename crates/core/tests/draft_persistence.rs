//! Draft autosave and restore through the wizard controller.

mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use tokio::time::Instant;

use common::{load, png, valid_draft, Harness, USER};
use evently_core::draft::{Field, ImageRef, StreamingPlatform, Visibility};
use evently_core::persistence::{draft_key, load_draft, save_draft, DraftStore};
use evently_core::steps::StepId;
use evently_core::wizard::{Transition, UploadTarget};
use evently_core::WizardController;

#[tokio::test]
async fn reload_restores_step_and_record() {
    let harness = Harness::new();
    let mut wizard = harness.wizard();
    let mut draft = valid_draft();
    draft.visibility = Visibility::normalize("private", vec!["u_2".into(), " u_2 ".into()]);
    load(&mut wizard, draft);
    for _ in 0..3 {
        assert_matches!(wizard.next().await, Ok(Transition::Moved { .. }));
    }
    assert_eq!(wizard.step(), StepId::Details);
    wizard.flush_draft().unwrap();

    let mut reloaded = WizardController::new(USER, common::test_config(), harness.services());
    assert!(reloaded.mount());
    assert_eq!(reloaded.step(), StepId::Details);
    assert_eq!(reloaded.draft(), wizard.draft());
    assert_eq!(reloaded.draft().visibility.allow_list(), ["u_2".to_string()]);
    assert!(!reloaded.has_unsaved_changes());
}

#[test]
fn pending_files_do_not_survive_reload() {
    let harness = Harness::new();
    let mut wizard = harness.wizard();
    let mut draft = valid_draft();
    draft.images.push(ImageRef::pending(png("local.png")));
    load(&mut wizard, draft);
    wizard.flush_draft().unwrap();

    let raw = harness.store.get(&draft_key(USER)).unwrap().unwrap();
    assert!(!raw.contains("local.png"));

    let mut reloaded = WizardController::new(USER, common::test_config(), harness.services());
    assert!(reloaded.mount());
    let images = &reloaded.draft().images;
    assert_eq!(images.len(), 2);
    assert_eq!(images[0].storage_id, "img_1");
    assert!(!images[1].has_source());

    // The lost file surfaces as an error the user can act on.
    reloaded.blur("images").unwrap();
    assert_eq!(
        reloaded.visible_error("images.1.url"),
        Some("Select the image file again")
    );
}

#[test]
fn edits_in_quick_succession_write_once() {
    let harness = Harness::new();
    let mut wizard = harness.wizard();
    let t0 = Instant::now();

    wizard
        .change_at(Field::Category, t0, |d| d.category = "music".into())
        .unwrap();
    wizard
        .change_at(Field::Category, t0 + Duration::from_secs(1), |d| {
            d.category = "technology".into()
        })
        .unwrap();
    assert_eq!(wizard.next_deadline(), Some(t0 + Duration::from_secs(3)));

    wizard.poll(t0 + Duration::from_secs(2));
    assert_eq!(harness.store.writes(), 0);
    assert!(wizard.has_unsaved_changes());

    wizard.poll(t0 + Duration::from_secs(3));
    assert_eq!(harness.store.writes(), 1);
    assert!(!wizard.has_unsaved_changes());

    wizard.poll(t0 + Duration::from_secs(10));
    assert_eq!(harness.store.writes(), 1);

    let snapshot = load_draft(harness.store.as_ref(), USER).unwrap().unwrap();
    assert_eq!(snapshot.draft.category, "technology");
}

#[test]
fn drafts_are_scoped_per_user() {
    let harness = Harness::new();
    let mut wizard = harness.wizard();
    load(&mut wizard, valid_draft());
    wizard.flush_draft().unwrap();

    let mut other = WizardController::new("user_2", common::test_config(), harness.services());
    assert!(!other.mount());
    assert!(other.draft().title.is_empty());
}

#[tokio::test]
async fn successful_submission_starts_next_session_empty() {
    let harness = Harness::new();
    let mut wizard = harness.wizard();
    load(&mut wizard, valid_draft());
    wizard.flush_draft().unwrap();
    wizard.edit_step(StepId::Review).unwrap();
    assert_matches!(wizard.submit().await, Ok(Transition::Submitted(_)));

    let mut fresh = WizardController::new(USER, common::test_config(), harness.services());
    assert!(!fresh.mount());
    assert_eq!(fresh.step(), StepId::BasicInfo);
    assert!(fresh.draft().title.is_empty());
}

#[test]
fn upload_finished_before_mount_is_kept() {
    let harness = Harness::new();
    save_draft(harness.store.as_ref(), USER, StepId::Media, &valid_draft()).unwrap();

    let mut wizard = WizardController::new(USER, common::test_config(), harness.services());
    let ticket = wizard
        .begin_upload(UploadTarget::NewImage, png("cover.png"))
        .unwrap();
    wizard
        .finish_upload(ticket.id(), Ok(common::asset("https://cdn.example.com/cover.png")))
        .unwrap();

    assert!(!wizard.mount());
    assert_eq!(wizard.step(), StepId::BasicInfo);
    assert_eq!(wizard.draft().images.len(), 1);
    assert_eq!(wizard.draft().images[0].url, "https://cdn.example.com/cover.png");
}

#[tokio::test]
async fn restored_built_in_event_gets_a_room() {
    let harness = Harness::new();
    let mut draft = valid_draft();
    draft.is_virtual = true;
    draft.streaming_platform = StreamingPlatform::BuiltIn;
    draft.room_name.clear();
    save_draft(harness.store.as_ref(), USER, StepId::Location, &draft).unwrap();

    let mut wizard = WizardController::new(USER, common::test_config(), harness.services());
    assert!(wizard.mount());
    let room = &wizard.draft().room_name;
    assert!(room.starts_with("event-temp-"), "{room}");
    assert!(!wizard.has_unsaved_changes());
    assert_matches!(
        wizard.next().await,
        Ok(Transition::Moved {
            to: StepId::Details,
            ..
        })
    );
}
