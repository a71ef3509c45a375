use super::*;

// ============================================================================
// FrameFlags tests
// ============================================================================

#[test]
fn test_init_flags() {
    assert!(FrameFlags::INIT_FLAGS.contains(FrameFlags::OFFSCREEN_TARGET));
    assert!(FrameFlags::INIT_FLAGS.contains(FrameFlags::DO_NOT_PRESENT));
    assert!(!FrameFlags::INIT_FLAGS.contains(FrameFlags::CORRECTABLE_FRAME));
}

// ============================================================================
// FrameFlagSet tests
// ============================================================================

#[test]
fn test_flags_accumulate() {
    let mut set = FrameFlagSet::new(FrameFlags::OFFSCREEN_TARGET);

    assert!(set.insert(FrameFlags::INPUT_ACQUIRED));
    assert!(set.insert(FrameFlags::FRAME_SUBMITTED));
    assert!(!set.insert(FrameFlags::INPUT_ACQUIRED));

    assert!(set.contains(FrameFlags::OFFSCREEN_TARGET | FrameFlags::INPUT_ACQUIRED));
    assert!(set.contains(FrameFlags::FRAME_SUBMITTED));
}

#[test]
fn test_flags_are_never_cleared_by_insert() {
    let mut set = FrameFlagSet::default();
    let sequence = [
        FrameFlags::SWAPCHAIN_IMAGE_ACQUIRED,
        FrameFlags::INPUT_ACQUIRED,
        FrameFlags::FRAME_SUBMITTED,
        FrameFlags::IMAGE_ACQUIRED,
        FrameFlags::QUEUE_SUBMITTED,
        FrameFlags::IMAGE_RENDERED,
        FrameFlags::IMAGE_PRESENTED,
    ];

    let mut previous = set.bits();
    for flag in sequence {
        set.insert(flag);
        assert!(set.bits().contains(previous));
        previous = set.bits();
    }
}

#[test]
fn test_reinsert_invalidated_is_noop() {
    let mut set = FrameFlagSet::default();
    assert!(set.insert(FrameFlags::INVALIDATED));
    let frozen = set.bits();

    assert!(!set.insert(FrameFlags::INVALIDATED));
    assert_eq!(set.bits(), frozen);
    assert!(set.is_invalidated());
}

#[test]
#[cfg(debug_assertions)]
#[should_panic]
fn test_insert_after_invalidated_asserts() {
    let mut set = FrameFlagSet::default();
    set.insert(FrameFlags::INVALIDATED);
    set.insert(FrameFlags::IMAGE_PRESENTED);
}

#[test]
#[cfg(not(debug_assertions))]
fn test_insert_after_invalidated_is_refused() {
    let mut set = FrameFlagSet::default();
    set.insert(FrameFlags::INVALIDATED);
    assert!(!set.insert(FrameFlags::IMAGE_PRESENTED));
    assert!(!set.contains(FrameFlags::IMAGE_PRESENTED));
}

#[test]
fn test_reset_clears_everything() {
    let mut set = FrameFlagSet::new(FrameFlags::DO_NOT_PRESENT);
    set.insert(FrameFlags::INVALIDATED);
    set.reset();

    assert_eq!(set.bits(), FrameFlags::empty());
    assert!(set.insert(FrameFlags::INPUT_ACQUIRED));
}
