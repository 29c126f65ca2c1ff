//! Per-frame systems driving the field.
//!
//! Order within `DeformationSet`: `track_anchor → handle_reset_requests →
//! schedule_capture → collect_capture`. With `CaptureMode::Inline` a capture is
//! dispatched and collected in the same frame.

use bevy::prelude::*;

use super::types::{
    DeformationField, DeformationStats, FieldPublished, ResetDeformation, SkipReason,
    UpdateInFlight, UpdateOutcome,
};
use crate::anchor::{DeformationAnchor, RecenterController, UpdateDecision};
use crate::capture::{CaptureBackend, CapturePoll, CaptureScene, ContactStamp, DeformationContact};
use crate::config::DeformationConfig;
use crate::error::DeformationError;

/// Run condition: the field has been initialized and not yet released.
pub fn field_initialized(field: Option<Res<DeformationField>>) -> bool {
    field.is_some_and(|f| f.is_initialized())
}

/// Allocate the buffers. A bad config or failed allocation stops the app.
pub fn init_deformation_field(
    config: Res<DeformationConfig>,
    mut field: ResMut<DeformationField>,
    mut exit: EventWriter<AppExit>,
) {
    match field.initialize(&config) {
        Ok(()) => info!(
            "Deformation field initialized: {}x{} texels, {:.2} world units per texel",
            config.resolution,
            config.resolution,
            config.texel_world_size()
        ),
        Err(e) => {
            error!("Deformation field failed to initialize: {e}");
            exit.send(AppExit::error());
        }
    }
}

/// Record where the anchor is and how much time has passed.
pub fn track_anchor(
    time: Res<Time>,
    anchors: Query<&Transform, With<DeformationAnchor>>,
    mut controller: ResMut<RecenterController>,
) {
    let position = anchors
        .iter()
        .next()
        .map(|t| Vec2::new(t.translation.x, t.translation.z));
    controller.observe(position, time.delta_secs());
}

/// Clear the field on `ResetDeformation`. Any capture in flight is dropped and
/// its time handed to the first capture after the reset.
pub fn handle_reset_requests(
    mut events: EventReader<ResetDeformation>,
    mut field: ResMut<DeformationField>,
    mut in_flight: ResMut<UpdateInFlight>,
    mut controller: ResMut<RecenterController>,
    mut stats: ResMut<DeformationStats>,
    mut published: EventWriter<FieldPublished>,
) {
    if events.read().count() == 0 {
        return;
    }
    if let Some(dt) = in_flight.cancel() {
        controller.restore_elapsed(dt);
    }

    if let Err(e) = field.request_reset().and_then(|()| field.clear()) {
        warn!("Deformation reset ignored: {e}");
        return;
    }
    stats.resets += 1;
    stats.record_publish(&field);
    published.send(FieldPublished {
        generation: field.generation(),
    });
    info!("Deformation field cleared (generation {})", field.generation());
}

/// Decide whether this frame updates and, if so, dispatch the capture.
///
/// Capture deadlines run on real time so a paused virtual clock cannot hold
/// a stalled capture forever.
#[allow(clippy::too_many_arguments)]
pub fn schedule_capture(
    time: Res<Time<Real>>,
    config: Res<DeformationConfig>,
    backend: Res<CaptureBackend>,
    contacts: Query<(&Transform, &DeformationContact)>,
    mut controller: ResMut<RecenterController>,
    mut field: ResMut<DeformationField>,
    mut in_flight: ResMut<UpdateInFlight>,
    mut stats: ResMut<DeformationStats>,
) {
    if in_flight.is_busy() {
        stats.record_skip(SkipReason::CapturePending);
        return;
    }

    match controller.decide(&config, field.needs_first_capture()) {
        UpdateDecision::Run => {}
        UpdateDecision::Disabled => return stats.record_skip(SkipReason::Disabled),
        UpdateDecision::Inactive => return stats.record_skip(SkipReason::Inactive),
        UpdateDecision::Throttled => {
            debug!(
                "Deformation update throttled ({:.3}s since last update)",
                controller.time_since_update()
            );
            return stats.record_skip(SkipReason::Throttled);
        }
    }

    if let Err(e) = config.validate() {
        warn!("Deformation update skipped: {e}");
        return stats.record_skip(SkipReason::InvalidConfig);
    }

    let Some(recentering) =
        controller.recentering(field.previous_origin(), field.post_delta(), field.resolution())
    else {
        return stats.record_skip(SkipReason::Inactive);
    };
    let delta_time = controller.consume_elapsed();
    let plan = match field.begin_update(recentering, delta_time) {
        Ok(plan) => plan,
        Err(e) => {
            warn!("Deformation update not scheduled: {e}");
            controller.restore_elapsed(delta_time);
            return;
        }
    };

    let scene = CaptureScene {
        contacts: contacts
            .iter()
            .map(|(t, c)| ContactStamp::new(Vec2::new(t.translation.x, t.translation.z), c))
            .collect(),
    };
    match in_flight.capture.dispatch(
        backend.0.clone(),
        plan.request,
        scene,
        config.capture_mode,
        time.elapsed_secs(),
    ) {
        Ok(()) => in_flight.plan = Some(plan),
        Err(e) => {
            warn!("Deformation capture skipped: {e}");
            controller.restore_elapsed(delta_time);
            stats.record_skip(SkipReason::CaptureFailed);
        }
    }
}

/// Poll the capture; on success run the kernel, swap and publish.
pub fn collect_capture(
    time: Res<Time<Real>>,
    config: Res<DeformationConfig>,
    mut field: ResMut<DeformationField>,
    mut in_flight: ResMut<UpdateInFlight>,
    mut controller: ResMut<RecenterController>,
    mut stats: ResMut<DeformationStats>,
    mut published: EventWriter<FieldPublished>,
) {
    let poll = in_flight
        .capture
        .poll(time.elapsed_secs(), config.capture_timeout_secs);
    let snapshot = match poll {
        CapturePoll::Idle | CapturePoll::Pending => return,
        CapturePoll::Complete(Ok(snapshot)) => snapshot,
        CapturePoll::Complete(Err(e)) => {
            warn!("Deformation capture failed: {e}");
            if let Some(dt) = in_flight.cancel() {
                controller.restore_elapsed(dt);
            }
            return stats.record_skip(SkipReason::CaptureFailed);
        }
        CapturePoll::TimedOut { waited } => {
            warn!("Deformation capture timed out after {waited:.3}s");
            if let Some(dt) = in_flight.cancel() {
                controller.restore_elapsed(dt);
            }
            return stats.record_skip(SkipReason::CaptureTimedOut);
        }
    };
    let Some(plan) = in_flight.plan.take() else {
        return;
    };

    match field.apply_update(plan, snapshot, &config) {
        Ok(outcome) => {
            stats.updates_applied += 1;
            match outcome {
                UpdateOutcome::Primed => info!(
                    "Deformation field anchored at texel {}",
                    plan.recentering.origin_texel
                ),
                UpdateOutcome::Restarted => {
                    stats.restarts += 1;
                    info!(
                        "Deformation anchor jumped {} texels; field restarted",
                        plan.recentering.shift
                    );
                }
                UpdateOutcome::Applied => {}
            }
            stats.record_publish(&field);
            published.send(FieldPublished {
                generation: field.generation(),
            });
        }
        Err(e) => {
            warn!("Deformation update skipped: {e}");
            controller.restore_elapsed(plan.delta_time);
            stats.record_skip(match e {
                DeformationError::Configuration(_) => SkipReason::InvalidConfig,
                _ => SkipReason::CaptureFailed,
            });
        }
    }
}

/// Drop the buffers when the app is shutting down.
pub fn release_field_on_exit(
    mut exits: EventReader<AppExit>,
    mut field: ResMut<DeformationField>,
    mut in_flight: ResMut<UpdateInFlight>,
) {
    if exits.read().next().is_none() || !field.is_initialized() {
        return;
    }
    in_flight.cancel();
    field.release();
    info!("Deformation field released");
}
