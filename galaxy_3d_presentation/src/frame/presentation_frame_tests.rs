use super::*;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use crate::clock::ManualClock;
use crate::device::{Fence, FenceId};
use crate::frame::FrameId;
use crate::frame_queue::{FrameHandle, FrameNotifier, FrameQueue, FrameRequest, RenderTarget};
use crate::info::{Extent2, FrameConstraints, SwapchainConfig};
use crate::looper::Looper;
use crate::swapchain::mock_backend::create_mock_swapchain;
use crate::swapchain::{AcquiredImage, Swapchain};

// ============================================================================
// Helpers
// ============================================================================

#[derive(Default)]
struct RecordingQueue {
    present_output: Option<String>,
    transfer_output: Option<String>,
    refuse: bool,
    next_order: u64,
    requests: Vec<FrameRequest>,
}

impl FrameQueue for RecordingQueue {
    fn name(&self) -> &str {
        "recording"
    }

    fn present_image_output(&self) -> Option<String> {
        self.present_output.clone()
    }

    fn transfer_image_output(&self) -> Option<String> {
        self.transfer_output.clone()
    }

    fn make_frame(&mut self, request: FrameRequest, _priority: u32) -> Option<FrameHandle> {
        if self.refuse {
            return None;
        }
        self.next_order += 1;
        self.requests.push(request);
        Some(FrameHandle { order: self.next_order })
    }

    fn set_render_target(&mut self, _order: u64, _target: RenderTarget) {}

    fn cancel_frame(&mut self, _order: u64) {}
}

fn test_config() -> SwapchainConfig {
    SwapchainConfig { extent: Extent2::new(640, 480), ..Default::default() }
}

fn create_looper() -> Looper {
    Looper::new(Arc::new(ManualClock::new(0)))
}

fn acquire(swapchain: &Arc<Swapchain>, looper: &Looper) -> AcquiredImage {
    let (image, _) = swapchain.acquire(true, &Fence::new(FenceId(1), looper.proxy()));
    image.unwrap()
}

/// Callback recording every `success` value it receives
fn recording_callback() -> (FrameCallback, Rc<RefCell<Vec<bool>>>) {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&calls);
    let callback: FrameCallback = Box::new(move |_frame, success| sink.borrow_mut().push(success));
    (callback, calls)
}

fn create_frame(swapchain: &Arc<Swapchain>, callback: Option<FrameCallback>) -> PresentationFrame {
    PresentationFrame::new(
        Some(Arc::clone(swapchain)),
        FrameConstraints::default(),
        1,
        FrameFlags::empty(),
        callback,
    )
    .unwrap()
}

// ============================================================================
// Creation tests
// ============================================================================

#[test]
fn test_new_binds_swapchain_and_extent() {
    let (swapchain, _state) = create_mock_swapchain(test_config());
    let frame = create_frame(&swapchain, None);

    assert!(frame.is_bound_to(Some(&swapchain)));
    assert_eq!(frame.constraints().extent, Extent2::new(640, 480));
    let image = frame.swapchain_image().unwrap();
    assert!(!image.is_ready());
    assert!(!image.is_submitted());
}

#[test]
fn test_new_without_swapchain_fails() {
    let result = PresentationFrame::new(
        None,
        FrameConstraints::default(),
        1,
        FrameFlags::empty(),
        None,
    );
    assert!(matches!(result, Err(crate::error::Error::SwapchainUnavailable)));
}

#[test]
fn test_new_offscreen_without_swapchain() {
    let constraints = FrameConstraints { extent: Extent2::new(32, 32), ..Default::default() };
    let frame = PresentationFrame::new(None, constraints, 1, FrameFlags::OFFSCREEN_TARGET, None)
        .unwrap();

    assert!(frame.is_offscreen());
    assert!(frame.swapchain_image().is_none());
    assert_eq!(
        frame.render_target(),
        Some(RenderTarget::Offscreen { extent: Extent2::new(32, 32) })
    );
}

#[test]
fn test_new_masks_progress_flags() {
    let (swapchain, _state) = create_mock_swapchain(test_config());
    let frame = PresentationFrame::new(
        Some(swapchain),
        FrameConstraints::default(),
        1,
        FrameFlags::CORRECTABLE_FRAME | FrameFlags::IMAGE_PRESENTED | FrameFlags::INVALIDATED,
        None,
    )
    .unwrap();

    assert_eq!(frame.flags(), FrameFlags::CORRECTABLE_FRAME);
}

// ============================================================================
// Submission tests
// ============================================================================

#[test]
fn test_output_prefers_present_attachment() {
    let (swapchain, _state) = create_mock_swapchain(test_config());
    let mut frame = create_frame(&swapchain, None);
    let queue = RecordingQueue {
        present_output: Some("present".into()),
        transfer_output: Some("transfer".into()),
        ..Default::default()
    };

    assert_eq!(frame.setup_output_attachment(&queue).as_deref(), Some("present"));
    assert!(frame.has_flag(FrameFlags::INPUT_ACQUIRED));
}

#[test]
fn test_output_falls_back_to_transfer_attachment() {
    let (swapchain, _state) = create_mock_swapchain(test_config());
    let mut frame = create_frame(&swapchain, None);
    let queue = RecordingQueue { transfer_output: Some("transfer".into()), ..Default::default() };

    assert_eq!(frame.setup_output_attachment(&queue).as_deref(), Some("transfer"));
}

#[test]
fn test_submit_adopts_queue_order() {
    let looper = create_looper();
    let (swapchain, _state) = create_mock_swapchain(test_config());
    let mut frame = create_frame(&swapchain, None);
    let mut queue = RecordingQueue {
        present_output: Some("present".into()),
        next_order: 41,
        ..Default::default()
    };

    frame.setup_output_attachment(&queue);
    let handle = frame
        .submit_frame(&mut queue, FrameNotifier::new(FrameId::default(), looper.proxy()))
        .unwrap();

    assert_eq!(handle.order, 42);
    assert_eq!(frame.order(), 42);
    assert_eq!(frame.swapchain_image().unwrap().order(), 42);
    assert!(frame.has_flag(FrameFlags::FRAME_SUBMITTED));
    // no image yet, the queue gets the target later
    assert!(queue.requests[0].render_target.is_none());
}

#[test]
fn test_submit_without_output_fails() {
    let looper = create_looper();
    let (swapchain, _state) = create_mock_swapchain(test_config());
    let mut frame = create_frame(&swapchain, None);
    let mut queue = RecordingQueue::default();

    assert!(frame.setup_output_attachment(&queue).is_none());
    assert!(frame
        .submit_frame(&mut queue, FrameNotifier::new(FrameId::default(), looper.proxy()))
        .is_none());
    assert!(!frame.has_flag(FrameFlags::FRAME_SUBMITTED));
}

#[test]
fn test_submit_refused_by_queue() {
    let looper = create_looper();
    let (swapchain, _state) = create_mock_swapchain(test_config());
    let mut frame = create_frame(&swapchain, None);
    let mut queue = RecordingQueue {
        present_output: Some("present".into()),
        refuse: true,
        ..Default::default()
    };

    frame.setup_output_attachment(&queue);
    assert!(frame
        .submit_frame(&mut queue, FrameNotifier::new(FrameId::default(), looper.proxy()))
        .is_none());
    assert!(frame.handle().is_none());
}

// ============================================================================
// Image assignment tests
// ============================================================================

#[test]
fn test_assign_own_swapchain_image() {
    let looper = create_looper();
    let (swapchain, _state) = create_mock_swapchain(test_config());
    let mut frame = create_frame(&swapchain, None);
    let acquired = acquire(&swapchain, &looper);

    assert!(frame.assign_swapchain_image(&acquired, 100));
    assert!(frame.has_flag(FrameFlags::IMAGE_ACQUIRED));

    let image = frame.swapchain_image().unwrap();
    assert!(image.is_ready());
    assert!(image.is_submitted());
    assert_eq!(image.acquisition_time(), 100);
    assert!(matches!(
        frame.render_target(),
        Some(RenderTarget::Swapchain { image_index: 0, .. })
    ));
}

#[test]
fn test_assign_rejects_foreign_swapchain_image() {
    let looper = create_looper();
    let (own, _) = create_mock_swapchain(test_config());
    let (foreign, _) = create_mock_swapchain(test_config());
    let mut frame = create_frame(&own, None);
    let acquired = acquire(&foreign, &looper);

    assert!(!frame.assign_swapchain_image(&acquired, 0));
    assert!(!frame.has_flag(FrameFlags::IMAGE_ACQUIRED));
    assert!(!frame.swapchain_image().unwrap().is_ready());

    acquired.invalidate();
    assert_eq!(foreign.acquired_images_count(), 0);
}

#[test]
fn test_assign_result_checks_image_index() {
    let looper = create_looper();
    let (swapchain, _state) = create_mock_swapchain(test_config());
    let mut frame = create_frame(&swapchain, None);
    frame.assign_swapchain_image(&acquire(&swapchain, &looper), 0);

    assert!(!frame.assign_result(Some(2)));
    assert!(!frame.has_flag(FrameFlags::IMAGE_RENDERED));
    assert!(frame.assign_result(Some(0)));
    assert!(frame.has_flag(FrameFlags::IMAGE_RENDERED));
}

// ============================================================================
// Completion tests
// ============================================================================

#[test]
fn test_set_presented_fires_callback_once() {
    let (swapchain, _state) = create_mock_swapchain(test_config());
    let (callback, calls) = recording_callback();
    let mut frame = create_frame(&swapchain, Some(callback));

    frame.set_submitted();
    assert!(frame.set_presented(Status::Suboptimal));
    assert!(frame.set_presented(Status::Ok));

    assert_eq!(*calls.borrow(), vec![true]);
    assert!(frame.has_flag(FrameFlags::QUEUE_SUBMITTED | FrameFlags::IMAGE_PRESENTED));
    assert_eq!(frame.status(), Status::Ok);
}

#[test]
fn test_invalidate_is_idempotent() {
    let looper = create_looper();
    let (swapchain, state) = create_mock_swapchain(test_config());
    let (callback, calls) = recording_callback();
    let mut frame = create_frame(&swapchain, Some(callback));
    frame.assign_swapchain_image(&acquire(&swapchain, &looper), 0);

    assert!(frame.invalidate());
    let flags = frame.flags();

    assert!(!frame.invalidate());
    assert_eq!(frame.flags(), flags);
    assert_eq!(*calls.borrow(), vec![false]);

    // the image went back to the swapchain and all references are gone
    assert_eq!(swapchain.acquired_images_count(), 0);
    assert_eq!(state.lock().unwrap().invalidated, vec![0]);
    assert!(frame.swapchain().is_none());
    assert!(frame.swapchain_image().is_none());
}

#[test]
fn test_invalidated_frame_ignores_operations() {
    let looper = create_looper();
    let (swapchain, _state) = create_mock_swapchain(test_config());
    let (callback, calls) = recording_callback();
    let mut frame = create_frame(&swapchain, Some(callback));
    frame.invalidate();
    let flags = frame.flags();

    let queue = RecordingQueue { present_output: Some("present".into()), ..Default::default() };
    assert!(frame.setup_output_attachment(&queue).is_none());
    assert!(!frame.assign_swapchain_image(&acquire(&swapchain, &looper), 0));
    assert!(!frame.assign_result(None));
    assert!(!frame.set_presented(Status::Ok));
    frame.set_submitted();
    frame.set_image_requested();

    assert_eq!(frame.flags(), flags);
    assert_eq!(*calls.borrow(), vec![false]);
}
