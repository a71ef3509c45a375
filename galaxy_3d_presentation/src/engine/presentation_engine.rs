/// PresentationEngine - drives frames from scheduling to the display
///
/// The engine owns the current swapchain and every live frame. It runs on a
/// single thread: collaborators (window, frame queue, device, swapchain
/// fences) report completion by posting [`EngineEvent`]s to its loop, and
/// the host drives the loop with [`PresentationEngine::poll`] or one of the
/// blocking waits.
///
/// Frame lifecycle:
/// 1. `schedule_next_image` creates a frame bound to the current swapchain
/// 2. the window prepares frame data, the frame is submitted to the queue
/// 3. a swapchain image is acquired and handed to the frame
/// 4. the queue reports the rendered output, the frame is presented
///    (immediately, at the next present window or on the next display link)
/// 5. the frame is retired and the next one is scheduled
///
/// Swapchain rebuilds are deferred until every acquired image came back.

use std::collections::VecDeque;
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};
use rustc_hash::{FxHashMap, FxHashSet};
use crate::clock::Clock;
use crate::device::{Device, DeviceQueue, Fence, FenceId, QueueFlags, QueueRequest};
use crate::error::{Error, Result};
use crate::frame::{FrameCallback, FrameFlags, FrameId, FrameRegistry, FrameStatus, PresentationFrame};
use crate::frame_queue::{FrameHandle, FrameNotifier, FrameQueue, FrameReport, FrameRequest, RenderTarget};
use crate::info::{FrameConstraints, PresentMode, SurfaceInfo, SwapchainConfig};
use crate::looper::{EngineEvent, Looper, TimerId, TimerKind};
use crate::options::{PresentationOptions, UpdateConstraintsFlags};
use crate::status::Status;
use crate::swapchain::{AcquiredImage, Swapchain};
use crate::timing::{FrameTimeInfo, FrameTiming, PresentationTelemetry};
use crate::window::{FrameDataRequest, PresentationSurface, PresentationWindow};
use crate::{engine_debug, engine_error, engine_info, engine_trace, engine_warn};
use super::engine_proxy::EngineProxy;

const LOG_SOURCE: &str = "galaxy3d::PresentationEngine";

/// Callback fired once a requested swapchain rebuild finished
pub type ConstraintsCallback = Box<dyn FnOnce(bool)>;

/// Acquire waiting for its fence
struct PendingAcquire {
    fence: FenceId,
    image: AcquiredImage,
}

/// Frame request held back by the display-link barrier
struct PendingFrameRequest {
    callback: Option<FrameCallback>,
    flags: FrameFlags,
}

pub struct PresentationEngine {
    options: PresentationOptions,
    window: Box<dyn PresentationWindow>,
    surface: Box<dyn PresentationSurface>,
    /// Replacement surface installed by the next `SWITCH_TO_NEXT` rebuild
    next_surface: Option<Box<dyn PresentationSurface>>,
    device: Box<dyn Device>,
    queue: Box<dyn FrameQueue>,
    looper: Looper,

    running: bool,
    swapchain: Option<Arc<Swapchain>>,
    constraints: FrameConstraints,
    frame_order: u64,

    // ===== Frames =====
    frames: FrameRegistry,
    /// Frames whose queue completion arrived before their early present
    completed_frames: FxHashSet<FrameId>,

    // ===== Image acquisition =====
    frames_awaiting_images: VecDeque<FrameId>,
    acquired_images: VecDeque<AcquiredImage>,
    pending_acquire: Option<PendingAcquire>,
    next_fence_id: u64,
    acquire_retry_timer: Option<TimerId>,

    // ===== Pacing =====
    scheduled_for_present: VecDeque<FrameId>,
    scheduled_present_timers: FxHashMap<TimerId, FrameId>,
    ready_for_next_frame: bool,
    wait_for_display_link: bool,
    barrier_request: Option<PendingFrameRequest>,
    next_present_window: u64,

    // ===== Swapchain rebuild =====
    deprecation_flags: UpdateConstraintsFlags,
    deprecation_callbacks: Vec<ConstraintsCallback>,
    recreation_scheduled: bool,
    recreation_count: u64,
    last_recreation_result: bool,

    // ===== Blocking waits =====
    wait_until_frame: bool,
    frame_presented_during_wait: bool,

    telemetry: PresentationTelemetry,
}

impl PresentationEngine {
    /// Create a stopped engine
    ///
    /// # Arguments
    ///
    /// * `options` - Pacing and ordering configuration
    /// * `window` - Host window
    /// * `surface` - Platform surface swapchains are created for
    /// * `device` - Graphics device providing present queues
    /// * `queue` - Frame queue that renders the frames
    /// * `clock` - Time source in microseconds
    pub fn new(
        options: PresentationOptions,
        window: Box<dyn PresentationWindow>,
        surface: Box<dyn PresentationSurface>,
        device: Box<dyn Device>,
        queue: Box<dyn FrameQueue>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            options,
            window,
            surface,
            next_surface: None,
            device,
            queue,
            looper: Looper::new(clock),
            running: false,
            swapchain: None,
            constraints: FrameConstraints::default(),
            frame_order: 0,
            frames: FrameRegistry::new(),
            completed_frames: FxHashSet::default(),
            frames_awaiting_images: VecDeque::new(),
            acquired_images: VecDeque::new(),
            pending_acquire: None,
            next_fence_id: 1,
            acquire_retry_timer: None,
            scheduled_for_present: VecDeque::new(),
            scheduled_present_timers: FxHashMap::default(),
            ready_for_next_frame: false,
            wait_for_display_link: false,
            barrier_request: None,
            next_present_window: 0,
            deprecation_flags: UpdateConstraintsFlags::empty(),
            deprecation_callbacks: Vec::new(),
            recreation_scheduled: false,
            recreation_count: 0,
            last_recreation_result: false,
            wait_until_frame: false,
            frame_presented_during_wait: false,
            telemetry: PresentationTelemetry::new(),
        }
    }

    // ===== LIFECYCLE =====

    /// Create the first swapchain and start producing frames
    ///
    /// Without `render_on_demand` the first frame is scheduled right away.
    pub fn run(&mut self) -> Result<()> {
        if self.running {
            return Ok(());
        }
        if self.deprecation_flags.contains(UpdateConstraintsFlags::FINALIZED) {
            return Err(Error::NotRunning);
        }

        let info = self.window.get_surface_options(self.surface.surface_options());
        let cfg = self.window.select_config(&info, false);
        if !info.is_supported(&cfg) {
            return Err(Error::UnsupportedConfig(cfg.description()));
        }

        let mode = cfg.present_mode;
        if !self.create_swapchain(&info, cfg, mode) {
            return Err(Error::InitializationFailed(
                "swapchain creation failed".to_string(),
            ));
        }

        self.running = true;
        engine_info!(LOG_SOURCE, "Presentation engine started");

        if !self.options.render_on_demand {
            self.schedule_next_image(None, FrameFlags::CORRECTABLE_FRAME);
        }
        Ok(())
    }

    /// Stop the engine
    ///
    /// Every live frame is invalidated, timers are cancelled and queued
    /// images go back to the swapchain.
    pub fn end(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;

        self.clear_scheduling_state();
        for id in self.frames.ids() {
            self.invalidate_frame(id);
        }
        self.completed_frames.clear();
        self.barrier_request = None;
        self.fire_deprecation_callbacks(false);

        engine_info!(LOG_SOURCE, "Presentation engine stopped");
    }

    /// Running with a usable swapchain
    pub fn is_running(&self) -> bool {
        self.running && self.swapchain.as_ref().is_some_and(|s| !s.is_deprecated())
    }

    /// Cross-thread handle posting to this engine's loop
    pub fn proxy(&self) -> EngineProxy {
        EngineProxy::new(self.looper.proxy(), self.options.wait_timeout)
    }

    // ===== LOOP =====

    /// Process every event that is ready, without blocking
    ///
    /// Returns the number of events handled.
    pub fn poll(&mut self) -> usize {
        let mut count = 0;
        while let Some(event) = self.looper.next_event() {
            self.dispatch(event);
            count += 1;
        }
        count
    }

    /// Wait up to `timeout` for an event, then process everything ready
    pub fn poll_timeout(&mut self, timeout: Duration) -> usize {
        match self.looper.wait_event(timeout) {
            Some(event) => {
                self.dispatch(event);
                1 + self.poll()
            }
            None => 0,
        }
    }

    /// Schedule a frame and process events until one is presented
    ///
    /// Bounded by `wait_timeout`. Returns false on timeout or when called
    /// from inside another wait.
    pub fn wait_until_frame_presentation(&mut self) -> bool {
        if self.wait_until_frame || !self.running {
            return false;
        }

        self.wait_until_frame = true;
        self.frame_presented_during_wait = false;
        self.next_present_window = 0;
        self.set_ready_for_next_frame();

        let deadline = Instant::now() + self.options.wait_timeout;
        while !self.frame_presented_during_wait {
            let now = Instant::now();
            if now >= deadline {
                engine_warn!(LOG_SOURCE, "No frame presented within {:?}", self.options.wait_timeout);
                break;
            }
            if let Some(event) = self.looper.wait_event(deadline - now) {
                self.dispatch(event);
            }
        }

        self.wait_until_frame = false;
        self.frame_presented_during_wait
    }

    fn dispatch(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::FrameDataAcquired { frame } => self.handle_frame_data(frame),
            EngineEvent::QueueSubmitted { frame } => {
                if let Some(f) = self.frames.get_mut(frame) {
                    f.set_submitted();
                }
            }
            EngineEvent::FrameOutput { frame, image_index, success } => {
                self.handle_frame_output(frame, image_index, success)
            }
            EngineEvent::FrameComplete { frame, timing } => self.handle_frame_complete(frame, timing),
            EngineEvent::FenceSignaled { fence, success } => self.handle_fence_signaled(fence, success),
            EngineEvent::QueueAcquired { frame, queue } => self.present_swapchain_image(queue, frame),
            EngineEvent::QueueAcquireFailed { frame } => {
                engine_warn!(LOG_SOURCE, "No present queue available for frame");
                self.invalidate_frame(frame);
            }
            EngineEvent::DisplayLink => self.update(true),
            EngineEvent::UpdateConstraints { flags, reply } => {
                let callback: Option<ConstraintsCallback> = reply.map(|reply| {
                    Box::new(move |ok: bool| {
                        let _ = reply.send(ok);
                    }) as ConstraintsCallback
                });
                self.request_constraints_update(flags, callback);
            }
            EngineEvent::ReadyForNextFrame => self.set_ready_for_next_frame(),
            EngineEvent::RecreateSwapchain => {
                self.device.wait_idle();
                if let Some(swapchain) = self.swapchain.as_ref() {
                    swapchain.recycle_deferred_semaphores();
                }
                self.recreate_swapchain();
                self.recreation_scheduled = false;
            }
            EngineEvent::Present { frame } => {
                self.present(frame);
            }
            EngineEvent::End => self.end(),
            EngineEvent::Timer { id, kind } => self.handle_timer(id, kind),
        }
    }

    fn handle_timer(&mut self, id: TimerId, kind: TimerKind) {
        match kind {
            TimerKind::AcquireRetry => {
                if self.acquire_retry_timer != Some(id) {
                    return;
                }
                let status = self.acquire_scheduled_image();
                if !status.is_retryable() {
                    self.cancel_acquire_retry();
                }
            }
            TimerKind::ScheduledPresent(frame) => {
                if self.scheduled_present_timers.remove(&id).is_some() {
                    self.run_scheduled_present(frame);
                }
            }
        }
    }

    // ===== FRAME SCHEDULING =====

    /// Start a new frame
    ///
    /// Refused while another frame is active, without a usable swapchain, or
    /// (with the display-link barrier) until the next tick; a request held
    /// by the barrier is replayed by [`Self::update`].
    ///
    /// # Arguments
    ///
    /// * `callback` - Fired once with `true` on presentation, `false` on invalidation
    /// * `flags` - `DO_NOT_PRESENT` and `CORRECTABLE_FRAME` are honored
    pub fn schedule_next_image(
        &mut self,
        callback: Option<FrameCallback>,
        flags: FrameFlags,
    ) -> Option<FrameId> {
        if !self.running || self.frames.active_count() > 0 {
            return None;
        }

        let swapchain = match self.swapchain.as_ref() {
            Some(swapchain) if !swapchain.is_deprecated() => Arc::clone(swapchain),
            _ => return None,
        };

        if self.options.follow_display_link_barrier && self.wait_for_display_link {
            self.barrier_request = Some(PendingFrameRequest { callback, flags });
            return None;
        }

        let mut frame_flags = flags & FrameFlags::DO_NOT_PRESENT;
        if self.options.render_image_offscreen {
            frame_flags |= FrameFlags::OFFSCREEN_TARGET;
        }
        if flags.contains(FrameFlags::CORRECTABLE_FRAME) && !self.options.render_on_demand {
            frame_flags |= FrameFlags::CORRECTABLE_FRAME;
        }

        let frame = match PresentationFrame::new(
            Some(swapchain),
            self.constraints,
            self.frame_order + 1,
            frame_flags,
            callback,
        ) {
            Ok(frame) => frame,
            Err(err) => {
                engine_error!(LOG_SOURCE, "Fail to create frame: {}", err);
                return None;
            }
        };

        let id = self.handle_frame_started(frame);
        self.ready_for_next_frame = false;
        if self.options.follow_display_link_barrier {
            self.wait_for_display_link = true;
        }

        self.schedule_swapchain_image(id);
        Some(id)
    }

    /// Ask the window for frame data and queue the frame for an image
    pub fn schedule_swapchain_image(&mut self, frame: FrameId) -> bool {
        let Some(f) = self.frames.get(frame) else {
            return false;
        };
        let order = f.order();
        let onscreen = f.swapchain_image().is_some();

        self.window
            .acquire_frame_data(FrameDataRequest::new(frame, order, self.looper.proxy()));

        if onscreen {
            self.schedule_image(frame);
        }
        true
    }

    /// Queue an extra frame outside the presentation lifecycle (e.g. a capture)
    ///
    /// The request goes to the frame queue as is; the frame is never
    /// presented and its progress reaches only the request's notifier.
    pub fn submit_next_frame(&mut self, request: FrameRequest) -> Option<FrameHandle> {
        if !self.running {
            return None;
        }

        let handle = self.queue.make_frame(request, 0)?;
        self.frame_order = self.frame_order.max(handle.order);
        Some(handle)
    }

    /// Offscreen request with the current constraints and the queue's output
    ///
    /// Progress of the submitted frame is read from the returned receiver.
    pub fn offscreen_frame_request(&self) -> Option<(FrameRequest, mpsc::Receiver<FrameReport>)> {
        let output = self
            .queue
            .present_image_output()
            .or_else(|| self.queue.transfer_image_output())?;

        let (notifier, reports) = FrameNotifier::channel();
        let request = FrameRequest {
            constraints: self.constraints,
            output,
            render_target: Some(RenderTarget::Offscreen { extent: self.constraints.extent }),
            notifier,
        };
        Some((request, reports))
    }

    fn handle_frame_data(&mut self, id: FrameId) {
        let running = self.running;
        let current = self.swapchain.clone();
        let deprecated = current.as_ref().is_some_and(|s| s.is_deprecated());

        let Some(frame) = self.frames.get_mut(id) else {
            return;
        };
        if frame.is_invalidated() {
            return;
        }

        // a deprecated swapchain still serves frames that already asked it for an image
        let served = !deprecated || frame.has_flag(FrameFlags::SWAPCHAIN_IMAGE_ACQUIRED);
        if !running || !served || !frame.is_bound_to(current.as_ref()) {
            engine_error!(LOG_SOURCE, "acquire_frame_data: swapchain was invalidated");
            self.invalidate_frame(id);
            return;
        }

        if frame.setup_output_attachment(self.queue.as_ref()).is_none() {
            engine_error!(
                LOG_SOURCE,
                "Fail to run frame with queue '{}': no usable output attachment",
                self.queue.name()
            );
            self.invalidate_frame(id);
            return;
        }

        let notifier = FrameNotifier::new(id, self.looper.proxy());
        match frame.submit_frame(self.queue.as_mut(), notifier) {
            Some(handle) => {
                self.frame_order = handle.order;
            }
            None => {
                engine_error!(LOG_SOURCE, "Frame queue '{}' refused the frame", self.queue.name());
                self.invalidate_frame(id);
            }
        }
    }

    fn handle_frame_output(&mut self, id: FrameId, image_index: Option<u32>, success: bool) {
        let Some(frame) = self.frames.get_mut(id) else {
            return;
        };
        if frame.is_invalidated() {
            return;
        }

        if success && frame.assign_result(image_index) {
            self.handle_frame_ready(id);
        } else {
            self.invalidate_frame(id);
        }
    }

    // ===== IMAGE ACQUISITION =====

    /// Hand a pooled image to the frame, or queue it for the next acquire
    fn schedule_image(&mut self, id: FrameId) {
        let Some(frame) = self.frames.get_mut(id) else {
            return;
        };
        frame.set_image_requested();

        match self.acquired_images.pop_front() {
            Some(image) => {
                self.assign_image_to_frame(id, image);
            }
            None => {
                self.frames_awaiting_images.push_back(id);
                self.acquire_scheduled_image();
            }
        }
    }

    /// Issue one swapchain acquire for the oldest waiting frame
    ///
    /// Returns `Declined` when an acquire is already pending, nobody waits
    /// for an image, or a frame still awaits presentation. A timeout arms
    /// the periodic retry timer.
    pub fn acquire_scheduled_image(&mut self) -> Status {
        let frames = &self.frames;
        self.frames_awaiting_images.retain(|id| frames.contains(*id));

        if !self.running
            || self.pending_acquire.is_some()
            || self.frames_awaiting_images.is_empty()
            || self.frames.total_count() != self.frames.active_count()
        {
            return Status::Declined;
        }

        let Some(swapchain) = self.swapchain.clone() else {
            return Status::Declined;
        };

        let fence = Fence::new(FenceId(self.next_fence_id), self.looper.proxy());
        self.next_fence_id += 1;

        let (image, status) = swapchain.acquire(true, &fence);
        match image {
            Some(image) => {
                self.cancel_acquire_retry();
                self.pending_acquire = Some(PendingAcquire { fence: fence.id(), image });
            }
            None if status.is_retryable() => {
                if self.acquire_retry_timer.is_none() {
                    let timer = self
                        .looper
                        .schedule_periodic(self.options.acquire_retry_interval, TimerKind::AcquireRetry);
                    self.acquire_retry_timer = Some(timer);
                }
            }
            None => {
                self.cancel_acquire_retry();
                engine_debug!(LOG_SOURCE, "Image acquisition failed: {:?}", status);
                self.deprecate_swapchain(false);
            }
        }
        status
    }

    /// Acquire fence of the pending image signaled
    ///
    /// A suboptimal image from the current swapchain is still handed out;
    /// the rebuild runs once it came back. When the fence failed on a
    /// healthy swapchain the oldest waiting frame is dropped, so the frame
    /// slot frees up.
    fn handle_fence_signaled(&mut self, fence: FenceId, success: bool) {
        match self.pending_acquire.as_ref() {
            Some(pending) if pending.fence == fence => {}
            _ => return,
        }
        let Some(pending) = self.pending_acquire.take() else {
            return;
        };

        let swapchain = Arc::clone(&pending.image.swapchain);
        let current = self.swapchain.as_ref().is_some_and(|s| s.id() == swapchain.id());

        if success && current {
            self.handle_swapchain_image_ready(pending.image);
            return;
        }

        engine_debug!(LOG_SOURCE, "Acquired image dropped (fence success: {})", success);
        pending.image.invalidate();

        if !current || swapchain.is_deprecated() {
            self.schedule_recreation_if_drained();
            return;
        }

        let frames = &self.frames;
        self.frames_awaiting_images.retain(|id| frames.contains(*id));
        if let Some(id) = self.frames_awaiting_images.pop_front() {
            engine_warn!(LOG_SOURCE, "Image acquisition failed, frame dropped");
            self.invalidate_frame(id);
        }

        let wants_frame = !self.options.render_on_demand || self.ready_for_next_frame;
        if wants_frame && self.frames.active_count() == 0 {
            self.schedule_next_image(None, FrameFlags::CORRECTABLE_FRAME);
        }
    }

    /// Route a ready image to the oldest waiting frame, or pool it
    fn handle_swapchain_image_ready(&mut self, image: AcquiredImage) {
        let frames = &self.frames;
        self.frames_awaiting_images.retain(|id| frames.contains(*id));

        match self.frames_awaiting_images.pop_front() {
            Some(id) => {
                self.assign_image_to_frame(id, image);
            }
            None if image.swapchain.is_deprecated() => {
                image.invalidate();
                self.schedule_recreation_if_drained();
            }
            None => self.acquired_images.push_back(image),
        }

        if !self.frames_awaiting_images.is_empty() {
            self.acquire_scheduled_image();
        }
    }

    fn assign_image_to_frame(&mut self, id: FrameId, image: AcquiredImage) -> bool {
        let now = self.looper.now();
        let Some(frame) = self.frames.get_mut(id) else {
            self.acquired_images.push_front(image);
            return false;
        };

        if !frame.assign_swapchain_image(&image, now) {
            image.invalidate();
            self.invalidate_frame(id);
            return false;
        }

        if let (Some(handle), Some(target)) = (frame.handle(), frame.render_target()) {
            self.queue.set_render_target(handle.order, target);
        }
        true
    }

    fn cancel_acquire_retry(&mut self) {
        if let Some(timer) = self.acquire_retry_timer.take() {
            self.looper.cancel(timer);
        }
    }


    // ===== PRESENTATION =====

    /// Present a rendered frame according to the pacing policy
    ///
    /// - `DO_NOT_PRESENT` frames give their image back and complete at once
    /// - with `follow_display_link` the frame waits for the next tick
    /// - with `use_present_window` the frame waits for its present window
    /// - offscreen frames complete without a swapchain present
    pub fn present(&mut self, id: FrameId) -> bool {
        let now = self.looper.now();
        let Some(frame) = self.frames.get_mut(id) else {
            return false;
        };
        if frame.is_invalidated() {
            return false;
        }

        let correctable = frame.has_flag(FrameFlags::CORRECTABLE_FRAME);

        if frame.swapchain_image().is_none() {
            return self.present_offscreen(id, correctable, now);
        }

        if frame.has_flag(FrameFlags::DO_NOT_PRESENT) {
            if let Some(image) = frame.swapchain_image_mut() {
                image.invalidate_image();
            }
            self.set_frame_presented(id, Status::Ok);
            self.schedule_after_present(correctable, None, now);
            return true;
        }

        if self.options.follow_display_link {
            self.scheduled_for_present.push_back(id);
            return true;
        }

        let window = self.next_present_window;
        if self.options.use_present_window && window > now + self.options.engine_update_interval {
            let timer = self.looper.schedule(window - now, TimerKind::ScheduledPresent(id));
            self.scheduled_present_timers.insert(timer, id);
        } else {
            self.run_scheduled_present(id);
        }
        true
    }

    fn present_offscreen(&mut self, id: FrameId, correctable: bool, now: u64) -> bool {
        if !self.options.render_image_offscreen {
            engine_warn!(LOG_SOURCE, "Offscreen frame without offscreen rendering enabled");
            self.invalidate_frame(id);
            return false;
        }

        let dt = self.update_presentation_interval();
        self.set_frame_presented(id, Status::Ok);
        self.schedule_after_present(correctable, Some(dt), now);
        true
    }

    /// Get a present queue for the frame, asynchronously if none is free
    fn run_scheduled_present(&mut self, id: FrameId) {
        if !self.running {
            return;
        }
        match self.frames.get(id) {
            Some(frame) if !frame.is_invalidated() => {}
            _ => return,
        }

        match self.device.try_acquire_queue(QueueFlags::PRESENT) {
            Some(queue) => self.present_swapchain_image(queue, id),
            None => self
                .device
                .acquire_queue(QueueFlags::PRESENT, QueueRequest::new(id, self.looper.proxy())),
        }
    }

    /// Present the frame on `queue` if it still targets the current swapchain
    ///
    /// The queue is released in every case.
    pub fn present_swapchain_image(&mut self, queue: DeviceQueue, id: FrameId) {
        let current = self.swapchain.clone();
        let presentable = self.frames.get(id).map(|frame| {
            !frame.is_invalidated()
                && frame.is_bound_to(current.as_ref())
                && frame.swapchain_image().is_some_and(|image| image.is_submitted())
        });

        match presentable {
            Some(true) => self.present_with_queue(&queue, id),
            Some(false) => {
                engine_warn!(LOG_SOURCE, "Frame no longer matches the current swapchain");
                self.invalidate_frame(id);
            }
            None => {}
        }

        self.device.release_queue(queue);
    }

    /// Present the frame's image and schedule what comes next
    pub fn present_with_queue(&mut self, queue: &DeviceQueue, id: FrameId) {
        let clock = self.looper.now();
        let Some(swapchain) = self.swapchain.clone() else {
            return;
        };
        let window = self.next_present_window;

        let Some(frame) = self.frames.get_mut(id) else {
            return;
        };
        let correctable = frame.has_flag(FrameFlags::CORRECTABLE_FRAME);
        let Some(image) = frame.swapchain_image_mut() else {
            return;
        };

        let status = swapchain.present(queue, image, window);
        let dt = self.update_presentation_interval();

        if status.is_success() || status.requires_deprecation() {
            if status.requires_deprecation() {
                engine_debug!(LOG_SOURCE, "Swapchain deprecated by present: {:?}", status);
                swapchain.deprecate(false);
            }
            self.set_frame_presented(id, status);
        } else {
            engine_error!(LOG_SOURCE, "Fail to present image: {:?}", status);
            self.invalidate_frame(id);
        }

        self.schedule_after_present(correctable, Some(dt), clock);
    }

    fn set_frame_presented(&mut self, id: FrameId, status: Status) {
        let Some(frame) = self.frames.get_mut(id) else {
            return;
        };
        if !frame.set_presented(status) {
            return;
        }
        self.window.handle_frame_presented(frame);
        if self.wait_until_frame {
            self.frame_presented_during_wait = true;
        }
        self.handle_frame_presented(id);
    }

    /// Advance the present window and start the next frame if allowed
    fn schedule_after_present(&mut self, correctable: bool, dt: Option<FrameTimeInfo>, clock: u64) {
        let target = self.options.target_frame_interval;
        let update = self.options.engine_update_interval;

        if target > 0 && !self.options.follow_display_link {
            self.next_present_window = (clock + target).saturating_sub(update);
        }

        if !self.running {
            return;
        }

        let acquired = self.swapchain.as_ref().map_or(0, |s| s.acquired_images_count());
        if acquired != 0 && self.frames.active_count() > 0 {
            return;
        }

        if self.schedule_recreation_if_drained() {
            return;
        }

        let wants_frame = !self.options.render_on_demand || self.ready_for_next_frame;
        if !wants_frame || self.frames.active_count() > 0 {
            return;
        }

        if self.options.follow_display_link {
            self.schedule_next_image(None, FrameFlags::empty());
            return;
        }

        if target == 0 {
            self.next_present_window = 0;
        } else if let Some(dt) = dt {
            // late frame: pull the next window back by the overshoot
            if correctable && dt.dt > target + update {
                self.next_present_window = self.next_present_window.saturating_sub(dt.dt - target);
            }
        }
        self.schedule_next_image(None, FrameFlags::CORRECTABLE_FRAME);
    }

    /// Record a present at the current clock
    pub fn update_presentation_interval(&mut self) -> FrameTimeInfo {
        let now = self.looper.now();
        self.telemetry.update_presentation_interval(now)
    }

    /// Engine tick; `display_link` marks a platform vsync
    ///
    /// A vsync lifts the frame barrier, presents frames waiting for the
    /// display link and replays a frame request held by the barrier.
    pub fn update(&mut self, display_link: bool) {
        if !display_link {
            return;
        }

        self.wait_for_display_link = false;

        if self.options.follow_display_link {
            let queued: Vec<FrameId> = self.scheduled_for_present.drain(..).collect();
            for id in queued {
                self.run_scheduled_present(id);
            }
        }

        if let Some(request) = self.barrier_request.take() {
            self.schedule_next_image(request.callback, request.flags);
        }
    }

    // ===== FRAME HANDLERS =====

    /// Register a new frame as active
    pub fn handle_frame_started(&mut self, frame: PresentationFrame) -> FrameId {
        engine_trace!(LOG_SOURCE, "{}: handle_frame_started", frame.order());
        self.frames.insert(frame)
    }

    /// The frame's output image is rendered
    pub fn handle_frame_ready(&mut self, id: FrameId) {
        engine_trace!(LOG_SOURCE, "handle_frame_ready {:?}", id);
        if self.options.early_present {
            self.present(id);
        } else if self.options.pre_start_frame {
            self.frames.set_status(id, FrameStatus::Rendered);
            let wants_frame = !self.options.render_on_demand || self.ready_for_next_frame;
            if wants_frame && self.frames.active_count() == 0 {
                self.schedule_next_image(None, FrameFlags::CORRECTABLE_FRAME);
            }
        }
    }

    /// The frame was presented
    ///
    /// With `early_present` the frame stays registered until the queue
    /// reports completion.
    pub fn handle_frame_presented(&mut self, id: FrameId) {
        engine_trace!(LOG_SOURCE, "handle_frame_presented {:?}", id);
        if self.options.early_present && !self.completed_frames.remove(&id) {
            self.frames.set_status(id, FrameStatus::Presented);
        } else {
            self.remove_frame(id);
        }

        if !self.frames_awaiting_images.is_empty() {
            self.acquire_scheduled_image();
        }
    }

    /// The frame was dropped
    pub fn handle_frame_invalidated(&mut self, id: FrameId) {
        engine_trace!(LOG_SOURCE, "handle_frame_invalidated {:?}", id);
        self.remove_frame(id);
        if !self.schedule_recreation_if_drained() {
            self.acquire_scheduled_image();
        }
    }

    /// The frame queue finished the frame
    pub fn handle_frame_complete(&mut self, id: FrameId, timing: FrameTiming) {
        engine_trace!(LOG_SOURCE, "handle_frame_complete {:?}", id);
        self.telemetry.record_frame(&timing);

        let Some(frame) = self.frames.get(id) else {
            return;
        };

        if !frame.has_flag(FrameFlags::IMAGE_PRESENTED) {
            if !frame.has_flag(FrameFlags::IMAGE_RENDERED) {
                engine_warn!(LOG_SOURCE, "Frame {} completed without output", frame.order());
                self.invalidate_frame(id);
            } else if self.options.early_present {
                self.completed_frames.insert(id);
            } else {
                self.looper.post(EngineEvent::Present { frame: id });
            }
            return;
        }

        self.remove_frame(id);

        if self.schedule_recreation_if_drained() {
            return;
        }

        let wants_frame = !self.options.render_on_demand || self.ready_for_next_frame;
        if wants_frame && self.frames.active_count() == 0 {
            self.schedule_next_image(None, FrameFlags::CORRECTABLE_FRAME);
        } else if !self.frames_awaiting_images.is_empty() {
            self.acquire_scheduled_image();
        }
    }

    fn invalidate_frame(&mut self, id: FrameId) {
        let Some(frame) = self.frames.get_mut(id) else {
            return;
        };
        frame.invalidate();
        if let Some(handle) = frame.take_handle() {
            self.queue.cancel_frame(handle.order);
        }
        self.handle_frame_invalidated(id);
    }

    fn remove_frame(&mut self, id: FrameId) {
        self.frames.remove(id);
        self.completed_frames.remove(&id);
        self.frames_awaiting_images.retain(|frame| *frame != id);
        self.scheduled_for_present.retain(|frame| *frame != id);

        let timers: Vec<TimerId> = self
            .scheduled_present_timers
            .iter()
            .filter(|(_, frame)| **frame == id)
            .map(|(timer, _)| *timer)
            .collect();
        for timer in timers {
            self.scheduled_present_timers.remove(&timer);
            self.looper.cancel(timer);
        }
    }

    // ===== SWAPCHAIN REBUILD =====

    /// Request a swapchain rebuild
    ///
    /// The current swapchain is deprecated at once; the rebuild runs after
    /// every acquired image came back. With `sync_constraints_update` the
    /// call processes events until the rebuild finished.
    pub fn update_constraints(&mut self, flags: UpdateConstraintsFlags) -> bool {
        self.update_constraints_with(flags, None)
    }

    /// [`Self::update_constraints`] with a callback fired after the rebuild
    pub fn update_constraints_with(
        &mut self,
        flags: UpdateConstraintsFlags,
        callback: Option<ConstraintsCallback>,
    ) -> bool {
        let count = self.recreation_count;
        if !self.request_constraints_update(flags, callback) {
            return false;
        }
        if self.options.sync_constraints_update {
            return self.wait_for_recreation(count);
        }
        true
    }

    fn request_constraints_update(
        &mut self,
        flags: UpdateConstraintsFlags,
        callback: Option<ConstraintsCallback>,
    ) -> bool {
        if !self.running
            || self.swapchain.is_none()
            || self.deprecation_flags.contains(UpdateConstraintsFlags::FINALIZED)
        {
            if let Some(callback) = callback {
                callback(false);
            }
            return false;
        }

        self.deprecation_flags |= flags.difference(UpdateConstraintsFlags::FINALIZED);
        if let Some(callback) = callback {
            self.deprecation_callbacks.push(callback);
        }

        self.deprecate_swapchain(flags.contains(UpdateConstraintsFlags::SWITCH_TO_FAST_MODE));
        true
    }

    fn wait_for_recreation(&mut self, count: u64) -> bool {
        let deadline = Instant::now() + self.options.wait_timeout;
        while self.recreation_count == count {
            let now = Instant::now();
            if now >= deadline {
                engine_warn!(
                    LOG_SOURCE,
                    "Swapchain rebuild not finished within {:?}",
                    self.options.wait_timeout
                );
                return false;
            }
            if let Some(event) = self.looper.wait_event(deadline - now) {
                self.dispatch(event);
            }
        }
        self.last_recreation_result
    }

    /// Deprecate the current swapchain and flush everything bound to it
    ///
    /// Frames waiting for presentation are presented now, pooled images are
    /// given back and frames still waiting for an image are dropped.
    fn deprecate_swapchain(&mut self, fast: bool) -> bool {
        let Some(swapchain) = self.swapchain.clone() else {
            return false;
        };

        let first = swapchain.deprecate(fast);
        if first {
            engine_debug!(LOG_SOURCE, "Swapchain {} deprecated", swapchain.id());
        }

        let queued: Vec<FrameId> = self.scheduled_for_present.drain(..).collect();
        for id in queued {
            self.run_scheduled_present(id);
        }

        let mut timers: Vec<(TimerId, FrameId)> = self.scheduled_present_timers.drain().collect();
        timers.sort_by_key(|(timer, _)| *timer);
        for (timer, id) in timers {
            self.looper.cancel(timer);
            self.run_scheduled_present(id);
        }

        self.cancel_acquire_retry();
        for image in std::mem::take(&mut self.acquired_images) {
            image.invalidate();
        }

        let waiting: Vec<FrameId> = self.frames_awaiting_images.drain(..).collect();
        for id in waiting {
            self.invalidate_frame(id);
        }

        self.schedule_recreation_if_drained();
        first
    }

    fn schedule_recreation_if_drained(&mut self) -> bool {
        let drained = self
            .swapchain
            .as_ref()
            .is_some_and(|s| s.is_deprecated() && s.acquired_images_count() == 0);
        if drained {
            self.schedule_swapchain_recreation();
        }
        drained
    }

    /// Post a rebuild to the loop; repeated requests collapse into one
    fn schedule_swapchain_recreation(&mut self) {
        if self.recreation_scheduled || !self.running {
            return;
        }
        self.recreation_scheduled = true;
        self.looper.post(EngineEvent::RecreateSwapchain);
    }

    /// Rebuild the swapchain from fresh surface capabilities
    ///
    /// With `END_OF_LIFE` pending the engine is finalized instead. Returns
    /// false when no new swapchain was created; the deprecated one is kept
    /// until the next constraints update.
    pub fn recreate_swapchain(&mut self) -> bool {
        let latched = std::mem::replace(&mut self.recreation_scheduled, true);
        let ret = self.rebuild_swapchain();
        self.recreation_scheduled = latched;
        ret
    }

    fn rebuild_swapchain(&mut self) -> bool {
        if !self.running || self.deprecation_flags.contains(UpdateConstraintsFlags::FINALIZED) {
            return false;
        }

        let mut keep_previous = true;
        if self.deprecation_flags.contains(UpdateConstraintsFlags::SWITCH_TO_NEXT) {
            if let Some(next) = self.next_surface.take() {
                engine_info!(LOG_SOURCE, "Switching to the next surface");
                self.surface = next;
                keep_previous = false;
            }
        }

        self.reset_frames();
        self.recreation_count += 1;
        self.last_recreation_result = false;

        if self.deprecation_flags.contains(UpdateConstraintsFlags::END_OF_LIFE) {
            engine_info!(LOG_SOURCE, "End of life requested, finalizing");
            self.deprecation_flags.insert(UpdateConstraintsFlags::FINALIZED);
            self.fire_deprecation_callbacks(false);
            self.end();
            return false;
        }

        let fast = self.deprecation_flags.contains(UpdateConstraintsFlags::SWITCH_TO_FAST_MODE)
            || self
                .swapchain
                .as_ref()
                .is_some_and(|s| s.rebuild_mode() != s.config().present_mode);

        let info = self.window.get_surface_options(self.surface.surface_options());
        let cfg = self.window.select_config(&info, fast);

        if !info.is_supported(&cfg) || cfg.extent.is_empty() {
            engine_warn!(LOG_SOURCE, "Swapchain rebuild skipped for {}", cfg.description());
            self.deprecation_flags = UpdateConstraintsFlags::empty();
            self.fire_deprecation_callbacks(false);
            return false;
        }

        let mode = if fast && cfg.present_mode_fast != PresentMode::Unsupported {
            cfg.present_mode_fast
        } else {
            cfg.present_mode
        };

        let ret = self.replace_swapchain(&info, cfg, mode, keep_previous);
        self.deprecation_flags = UpdateConstraintsFlags::empty();
        self.last_recreation_result = ret;
        self.fire_deprecation_callbacks(ret);

        if ret {
            self.next_present_window = 0;
            self.ready_for_next_frame = true;
            self.schedule_next_image(None, FrameFlags::CORRECTABLE_FRAME);
        }
        ret
    }

    /// Replace the current swapchain
    ///
    /// On failure the previous swapchain stays in place.
    pub fn create_swapchain(&mut self, info: &SurfaceInfo, cfg: SwapchainConfig, mode: PresentMode) -> bool {
        self.replace_swapchain(info, cfg, mode, true)
    }

    /// Swap in a new surface, e.g. for a fullscreen switch
    ///
    /// The swapchain is rebuilt on `surface` once the current one drained.
    /// Returns false if the engine can not rebuild.
    pub fn set_next_surface(&mut self, surface: Box<dyn PresentationSurface>) -> bool {
        if !self.running || self.deprecation_flags.contains(UpdateConstraintsFlags::FINALIZED) {
            return false;
        }
        self.next_surface = Some(surface);
        self.update_constraints(UpdateConstraintsFlags::SWITCH_TO_NEXT)
    }

    /// `keep_previous` hands the old swapchain to the platform for reuse
    fn replace_swapchain(
        &mut self,
        info: &SurfaceInfo,
        cfg: SwapchainConfig,
        mode: PresentMode,
        keep_previous: bool,
    ) -> bool {
        let old = self.swapchain.take();
        if let Some(old) = old.as_ref() {
            if old.presented_frames_count() == 0 {
                engine_warn!(LOG_SOURCE, "Swapchain {} replaced before any presentation", old.id());
            }
        }

        engine_debug!(LOG_SOURCE, "{}", info.description());

        let image_info = self.window.get_swapchain_image_info(&cfg);
        let view_info = self.window.get_swapchain_image_view_info(&image_info);
        let previous = old.as_deref().filter(|s| keep_previous && s.is_valid());

        let backend = match self.surface.create_swapchain(info, &cfg, &image_info, mode, previous) {
            Ok(backend) => backend,
            Err(err) => {
                engine_error!(LOG_SOURCE, "Fail to create swapchain: {}", err);
                self.swapchain = old;
                return false;
            }
        };

        let mut constraints = self.window.export_frame_constraints();
        constraints.extent = cfg.extent;
        constraints.transform = cfg.transform;
        self.constraints = constraints;

        engine_info!(LOG_SOURCE, "{}; mode: {:?}", cfg.description(), mode);
        self.swapchain = Some(Arc::new(Swapchain::new(
            backend,
            info.clone(),
            cfg,
            image_info,
            view_info,
            mode,
        )));

        if let Some(old) = old {
            old.invalidate();
        }

        self.wait_for_display_link = false;
        self.ready_for_next_frame = true;
        true
    }

    fn reset_frames(&mut self) {
        self.clear_scheduling_state();
        // frames still producing first, then those awaiting presentation
        for id in self.frames.active_ids() {
            self.invalidate_frame(id);
        }
        for id in self.frames.ids() {
            self.invalidate_frame(id);
        }
        self.completed_frames.clear();
        self.barrier_request = None;
    }

    fn clear_scheduling_state(&mut self) {
        self.cancel_acquire_retry();
        for (timer, _) in self.scheduled_present_timers.drain() {
            self.looper.cancel(timer);
        }
        self.scheduled_for_present.clear();
        self.frames_awaiting_images.clear();
        for image in std::mem::take(&mut self.acquired_images) {
            image.invalidate();
        }
        if let Some(pending) = self.pending_acquire.take() {
            pending.image.invalidate();
        }
    }

    fn fire_deprecation_callbacks(&mut self, success: bool) {
        for callback in std::mem::take(&mut self.deprecation_callbacks) {
            callback(success);
        }
    }

    // ===== ON-DEMAND RENDERING =====

    /// Request the next frame in on-demand mode
    ///
    /// Starts it at once when the swapchain is idle, otherwise after the
    /// current frame is presented. Ignored in continuous mode.
    pub fn set_ready_for_next_frame(&mut self) {
        if !self.options.render_on_demand {
            self.ready_for_next_frame = false;
            return;
        }
        let idle = self.swapchain.as_ref().is_some_and(|s| s.acquired_images_count() == 0);
        if idle
            && self.frames.active_count() == 0
            && self.schedule_next_image(None, FrameFlags::empty()).is_some()
        {
            return;
        }
        self.ready_for_next_frame = true;
    }

    pub fn is_ready_for_next_frame(&self) -> bool {
        self.ready_for_next_frame
    }

    /// Switch between on-demand and continuous rendering
    pub fn set_render_on_demand(&mut self, value: bool) {
        self.options.render_on_demand = value;
        if !value && self.frames.active_count() == 0 {
            self.schedule_next_image(None, FrameFlags::CORRECTABLE_FRAME);
        }
    }

    pub fn is_render_on_demand(&self) -> bool {
        self.options.render_on_demand
    }

    /// Target interval between presents in microseconds (0 = unpaced)
    pub fn set_target_frame_interval(&mut self, interval: u64) {
        self.options.target_frame_interval = interval;
        self.next_present_window = 0;
    }

    pub fn target_frame_interval(&self) -> u64 {
        self.options.target_frame_interval
    }

    // ===== QUERIES =====

    pub fn options(&self) -> &PresentationOptions {
        &self.options
    }

    /// Frame is alive and bound to the current, non-deprecated swapchain
    pub fn is_frame_valid(&self, id: FrameId) -> bool {
        let Some(frame) = self.frames.get(id) else {
            return false;
        };
        if frame.is_invalidated() {
            return false;
        }
        match self.swapchain.as_ref() {
            Some(swapchain) => !swapchain.is_deprecated() && frame.is_bound_to(Some(swapchain)),
            None => false,
        }
    }

    pub fn frame(&self, id: FrameId) -> Option<&PresentationFrame> {
        self.frames.get(id)
    }

    pub fn frame_status(&self, id: FrameId) -> Option<FrameStatus> {
        self.frames.status(id)
    }

    /// Frames still occupying the frame slot
    pub fn active_frame_count(&self) -> usize {
        self.frames.active_count()
    }

    /// Every frame not yet retired
    pub fn total_frame_count(&self) -> usize {
        self.frames.total_count()
    }

    pub fn swapchain(&self) -> Option<&Arc<Swapchain>> {
        self.swapchain.as_ref()
    }

    pub fn frame_constraints(&self) -> &FrameConstraints {
        &self.constraints
    }

    /// Completed swapchain rebuild attempts
    pub fn swapchain_recreation_count(&self) -> u64 {
        self.recreation_count
    }

    pub fn next_present_window(&self) -> u64 {
        self.next_present_window
    }

    pub fn frames_awaiting_images_count(&self) -> usize {
        self.frames_awaiting_images.len()
    }

    /// Acquired images not handed to a frame yet
    pub fn pooled_images_count(&self) -> usize {
        self.acquired_images.len()
    }

    pub fn has_pending_acquire(&self) -> bool {
        self.pending_acquire.is_some()
    }

    /// Frames held for the next display-link tick
    pub fn display_link_queue_len(&self) -> usize {
        self.scheduled_for_present.len()
    }

    /// Frames held until their present window
    pub fn scheduled_present_count(&self) -> usize {
        self.scheduled_present_timers.len()
    }

    // ===== TELEMETRY =====

    pub fn last_frame_interval(&self) -> u64 {
        self.telemetry.last_frame_interval()
    }

    pub fn avg_frame_interval(&self) -> u64 {
        self.telemetry.avg_frame_interval()
    }

    pub fn last_frame_time(&self) -> u64 {
        self.telemetry.last_frame_time()
    }

    pub fn avg_frame_time(&self) -> u64 {
        self.telemetry.avg_frame_time()
    }

    pub fn last_device_frame_time(&self) -> u64 {
        self.telemetry.last_device_frame_time()
    }

    pub fn avg_device_frame_time(&self) -> u64 {
        self.telemetry.avg_device_frame_time()
    }
}

impl Drop for PresentationEngine {
    fn drop(&mut self) {
        self.end();
    }
}
