use super::ids::*;
use super::model::*;
use super::*;
use proptest::prelude::*;

#[derive(Debug)]
struct Snap {
    chapter: i64,
    content: &'static str,
}

impl Chronological for Snap {
    fn valid_from_chapter(&self) -> i64 {
        self.chapter
    }
}

#[test]
fn actor_id_validation() {
    assert_eq!(ActorId::try_new("").unwrap_err(), ActorIdError::Empty);
    assert_eq!(ActorId::try_new("   ").unwrap_err(), ActorIdError::Empty);
    assert_eq!(
        ActorId::try_new("bad\u{0007}actor").unwrap_err(),
        ActorIdError::ContainsControl
    );
    assert_eq!(
        ActorId::try_new("a".repeat(129)).unwrap_err(),
        ActorIdError::TooLong
    );
    assert_eq!(ActorId::try_new("user-42").unwrap().as_str(), "user-42");
}

#[test]
fn chapter_ref_rejects_negative_chapter() {
    assert_eq!(
        ChapterRef::try_new(BranchId::new(1), -1).unwrap_err(),
        ChapterError::Negative
    );
    let chapter = ChapterRef::try_new(BranchId::new(1), 0).unwrap();
    assert_eq!(chapter.chapter_number, 0);
}

#[test]
fn stored_enums_round_trip_through_text() {
    for visibility in [Visibility::Private, Visibility::Public, Visibility::Linked] {
        assert_eq!(Visibility::parse(visibility.as_str()), Some(visibility));
    }
    assert_eq!(CanonStatus::parse("NON_CANON"), Some(CanonStatus::NonCanon));
    assert_eq!(BranchType::parse("IF_STORY"), Some(BranchType::IfStory));
    assert_eq!(LinkRequestStatus::parse("pending"), None);
    assert!(!LinkRequestStatus::Pending.is_terminal());
    assert!(LinkRequestStatus::Approved.is_terminal());
    assert!(LinkRequestStatus::Rejected.is_terminal());
}

#[test]
fn linked_count_delta_only_moves_on_linked_edges() {
    assert_eq!(linked_count_delta(Visibility::Private, Visibility::Linked), 1);
    assert_eq!(linked_count_delta(Visibility::Linked, Visibility::Public), -1);
    assert_eq!(linked_count_delta(Visibility::Linked, Visibility::Linked), 0);
    assert_eq!(linked_count_delta(Visibility::Private, Visibility::Public), 0);
}

#[test]
fn check_version_accepts_absent_or_matching_expectation() {
    assert!(check_version(None, 7).is_ok());
    assert!(check_version(Some(7), 7).is_ok());
    assert_eq!(
        check_version(Some(6), 7).unwrap_err(),
        VersionMismatch {
            expected: 6,
            actual: 7
        }
    );
}

#[test]
fn change_tracker_bumps_only_on_real_change() {
    let mut tracker = ChangeTracker::new();
    let name = tracker.apply("name", "alpha".to_string(), Some("alpha".to_string()));
    let cover = tracker.apply("cover_image_url", None::<String>, None);
    assert_eq!(name, "alpha");
    assert_eq!(cover, None);
    assert!(!tracker.has_changes());
    assert_eq!(tracker.next_version(3), 3);

    let cover = tracker.apply(
        "cover_image_url",
        Some("a.png".to_string()),
        Some(None::<String>),
    );
    assert_eq!(cover, None);
    assert_eq!(tracker.changed_fields(), &["cover_image_url"]);
    assert_eq!(tracker.next_version(3), 4);
}

#[test]
fn resolve_at_picks_latest_not_after_current() {
    let snaps = [
        Snap {
            chapter: 10,
            content: "C",
        },
        Snap {
            chapter: 0,
            content: "A",
        },
        Snap {
            chapter: 5,
            content: "B",
        },
    ];
    assert_eq!(resolve_at(&snaps, 3).map(|s| s.content), Some("A"));
    assert_eq!(resolve_at(&snaps, 5).map(|s| s.content), Some("B"));
    assert_eq!(resolve_at(&snaps, 7).map(|s| s.content), Some("B"));
    assert_eq!(resolve_at(&snaps, 15).map(|s| s.content), Some("C"));
}

#[test]
fn resolve_at_returns_none_before_first_snapshot() {
    let snaps = [Snap {
        chapter: 10,
        content: "later",
    }];
    assert!(resolve_at(&snaps, 3).is_none());
    assert!(resolve_at::<Snap>(&[], 3).is_none());
}

proptest! {
    #[test]
    fn resolve_at_never_leaks_future_content(
        chapters in proptest::collection::btree_set(0i64..200, 0..20),
        current in 0i64..250,
    ) {
        let snaps: Vec<Snap> = chapters
            .iter()
            .map(|chapter| Snap { chapter: *chapter, content: "x" })
            .collect();
        let expected = chapters.iter().rev().find(|chapter| **chapter <= current).copied();
        let resolved = resolve_at(&snaps, current).map(|s| s.chapter);
        prop_assert_eq!(resolved, expected);
        if let Some(chapter) = resolved {
            prop_assert!(chapter <= current);
        }
    }
}
