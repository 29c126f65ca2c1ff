//! Unit tests for the field state machine.

#[cfg(test)]
mod tests {
    use bevy::prelude::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    use crate::anchor::{first_anchor, recenter, Recentering};
    use crate::capture::Snapshot;
    use crate::config::{CaptureMode, DeformationConfig};
    use crate::error::DeformationError;
    use crate::field::{FieldRole, HeightGrid};
    use crate::kernel::{run_height_pass, KernelExecution, UpdateParameters};
    use crate::orchestrator::{DeformationField, FieldPhase, UpdateOutcome, UpdatePlan};

    const R: usize = 8;
    const TEXEL: f32 = 4.0;

    fn config() -> DeformationConfig {
        DeformationConfig {
            resolution: R,
            capture_extent: R as f32 * TEXEL,
            temporal_filter_factor: f32::INFINITY,
            accumulation_rate: 10.0,
            accumulation_cap: 10.0,
            capture_mode: CaptureMode::Inline,
            kernel_execution: KernelExecution::Serial,
            ..Default::default()
        }
    }

    fn ready_field() -> DeformationField {
        let mut field = DeformationField::default();
        field.initialize(&config()).unwrap();
        field
    }

    fn recentering_for(field: &DeformationField, pos: Vec2) -> Recentering {
        match field.previous_origin() {
            None => first_anchor(pos, TEXEL),
            Some(origin) => recenter(pos, origin, TEXEL, R),
        }
    }

    fn contacts(texels: &[(usize, usize)]) -> HeightGrid {
        let mut grid = HeightGrid::new(R).unwrap();
        for &(x, y) in texels {
            grid.set(x, y, 1.0);
        }
        grid
    }

    fn plan(field: &mut DeformationField, pos: Vec2, dt: f32) -> UpdatePlan {
        let recentering = recentering_for(field, pos);
        field.begin_update(recentering, dt).unwrap()
    }

    fn step(
        field: &mut DeformationField,
        pos: Vec2,
        dt: f32,
        texels: &[(usize, usize)],
    ) -> UpdateOutcome {
        let plan = plan(field, pos, dt);
        let snapshot = Snapshot::new(&plan.request, contacts(texels)).unwrap();
        field.apply_update(plan, snapshot, &config()).unwrap()
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    #[test]
    fn test_initialize_enters_awaiting_first_capture() {
        let mut field = DeformationField::default();
        assert_eq!(field.phase(), FieldPhase::Uninitialized);
        field.initialize(&config()).unwrap();
        assert_eq!(field.phase(), FieldPhase::AwaitingFirstCapture);
        assert!(field.needs_first_capture());
        assert_eq!(field.resolution(), R);
        assert!(field.view().is_none());
    }

    #[test]
    fn test_double_initialize_is_invalid_phase() {
        let mut field = ready_field();
        let err = field.initialize(&config()).unwrap_err();
        assert!(matches!(
            err,
            DeformationError::InvalidPhase {
                phase: FieldPhase::AwaitingFirstCapture,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_config_leaves_field_uninitialized() {
        let mut field = DeformationField::default();
        let bad = DeformationConfig {
            resolution: 6,
            ..config()
        };
        let err = field.initialize(&bad).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(field.phase(), FieldPhase::Uninitialized);
    }

    #[test]
    fn test_begin_update_before_initialize_rejected() {
        let mut field = DeformationField::default();
        let err = field
            .begin_update(first_anchor(Vec2::ZERO, TEXEL), 0.1)
            .unwrap_err();
        assert!(matches!(err, DeformationError::InvalidPhase { .. }));
    }

    #[test]
    fn test_first_capture_merges_snapshot_at_new_origin() {
        let mut field = ready_field();
        let outcome = step(&mut field, Vec2::new(9.0, -3.0), 0.5, &[(4, 4)]);
        assert_eq!(outcome, UpdateOutcome::Primed);
        assert_eq!(field.phase(), FieldPhase::Steady);
        assert_eq!(field.generation(), 1);

        let view = field.view().expect("published");
        assert_eq!(view.heights.get(4, 4), 5.0);
        assert_eq!(view.heights.deformed_texels(), 1);
        assert_eq!(view.origin, Vec2::new(8.0, -4.0));
        assert!((view.sample_offset - Vec2::new(0.25, 0.25)).length() < 1e-6);
        let pair = field.buffer_pair().unwrap();
        assert_eq!(pair.slot(pair.slot_for(FieldRole::Next)).max_value(), 0.0);
    }

    #[test]
    fn test_live_config_edit_that_fails_validation_is_rejected() {
        let mut field = ready_field();
        step(&mut field, Vec2::ZERO, 0.5, &[(4, 4)]);
        let before = field.view().unwrap().heights.clone();
        let generation = field.generation();

        let bad = DeformationConfig {
            accumulation_cap: -1.0,
            ..config()
        };
        let update = plan(&mut field, Vec2::ZERO, 0.5);
        let snapshot = Snapshot::new(&update.request, contacts(&[(4, 4)])).unwrap();
        let err = field.apply_update(update, snapshot, &bad).unwrap_err();
        assert!(matches!(err, DeformationError::Configuration(_)));
        assert_eq!(field.view().unwrap().heights, &before);
        assert_eq!(field.generation(), generation);
        assert_eq!(field.phase(), FieldPhase::Steady);

        let nan_cap = DeformationConfig {
            accumulation_cap: f32::NAN,
            ..config()
        };
        let update = plan(&mut field, Vec2::ZERO, 0.5);
        let snapshot = Snapshot::new(&update.request, contacts(&[(4, 4)])).unwrap();
        assert!(field.apply_update(update, snapshot, &nan_cap).is_err());
        assert_eq!(field.view().unwrap().heights, &before);
    }

    #[test]
    fn test_steady_update_applies_contact() {
        let mut field = ready_field();
        step(&mut field, Vec2::ZERO, 0.0, &[]);
        let outcome = step(&mut field, Vec2::ZERO, 0.5, &[(4, 4)]);
        assert_eq!(outcome, UpdateOutcome::Applied);
        let view = field.view().unwrap();
        assert_eq!(view.heights.get(4, 4), 5.0);
        assert_eq!(view.heights.deformed_texels(), 1);
        assert_eq!(view.sample_world(Vec2::ZERO), Some(5.0));
        assert_eq!(view.generation, 2);
    }

    #[test]
    fn test_footprint_stays_put_in_world_when_anchor_moves() {
        let mut field = ready_field();
        step(&mut field, Vec2::ZERO, 0.0, &[]);
        step(&mut field, Vec2::ZERO, 0.5, &[(4, 4)]);

        step(&mut field, Vec2::new(TEXEL, 0.0), 0.5, &[]);
        let view = field.view().unwrap();
        assert_eq!(view.origin, Vec2::new(TEXEL, 0.0));
        assert_eq!(view.heights.get(3, 4), 5.0);
        assert_eq!(view.heights.get(4, 4), 0.0);
        assert_eq!(view.sample_world(Vec2::ZERO), Some(5.0));
    }

    #[test]
    fn test_teleport_restarts_field() {
        let mut field = ready_field();
        step(&mut field, Vec2::ZERO, 0.0, &[]);
        step(&mut field, Vec2::ZERO, 0.5, &[(4, 4), (1, 1)]);
        let outcome = step(&mut field, Vec2::new(1000.0, 0.0), 0.5, &[]);
        assert_eq!(outcome, UpdateOutcome::Restarted);
        assert_eq!(field.view().unwrap().heights.max_value(), 0.0);
        assert_eq!(field.anchor().unwrap().origin_texel, IVec2::new(250, 0));
    }

    #[test]
    fn test_stale_snapshot_rejected_and_field_unchanged() {
        let mut field = ready_field();
        step(&mut field, Vec2::ZERO, 0.0, &[]);
        step(&mut field, Vec2::ZERO, 0.5, &[(2, 2)]);
        let before = field.view().unwrap().heights.clone();
        let generation = field.generation();

        let old = plan(&mut field, Vec2::ZERO, 0.5);
        let new = plan(&mut field, Vec2::ZERO, 0.5);
        let snapshot = Snapshot::new(&old.request, contacts(&[(5, 5)])).unwrap();
        let err = field.apply_update(new, snapshot, &config()).unwrap_err();
        assert!(matches!(err, DeformationError::CaptureUnavailable(_)));
        assert_eq!(field.view().unwrap().heights, &before);
        assert_eq!(field.generation(), generation);
    }

    #[test]
    fn test_capture_request_centers_on_snapped_origin() {
        let mut field = ready_field();
        let plan = plan(&mut field, Vec2::new(-13.0, 6.5), 0.1);
        assert!(plan.first_capture);
        assert_eq!(plan.request.center, Vec2::new(-12.0, 8.0));
        assert_eq!(plan.request.extent, R as f32 * TEXEL);
        assert_eq!(plan.request.resolution, R);
    }

    // -------------------------------------------------------------------------
    // Reset path
    // -------------------------------------------------------------------------

    #[test]
    fn test_reset_clears_and_reanchors() {
        let mut field = ready_field();
        step(&mut field, Vec2::ZERO, 0.0, &[]);
        step(&mut field, Vec2::ZERO, 0.5, &[(4, 4)]);

        field.request_reset().unwrap();
        assert_eq!(field.phase(), FieldPhase::ResetRequested);
        assert!(matches!(
            field.begin_update(first_anchor(Vec2::ZERO, TEXEL), 0.1),
            Err(DeformationError::InvalidPhase { .. })
        ));

        field.clear().unwrap();
        assert_eq!(field.phase(), FieldPhase::Cleared);
        assert!(field.needs_first_capture());
        assert!(field.view().is_none());
        let pair = field.buffer_pair().unwrap();
        assert_eq!(pair.current().max_value(), 0.0);
        assert_eq!(pair.slot(pair.slot_for(FieldRole::Next)).max_value(), 0.0);

        assert_eq!(step(&mut field, Vec2::new(40.0, 0.0), 0.5, &[(4, 4)]), UpdateOutcome::Primed);
        assert_eq!(field.anchor().unwrap().origin_texel, IVec2::new(10, 0));
        assert_eq!(field.view().unwrap().heights.get(4, 4), 5.0);
        assert_eq!(step(&mut field, Vec2::new(40.0, 0.0), 0.5, &[(4, 4)]), UpdateOutcome::Applied);
        assert_eq!(field.view().unwrap().heights.get(4, 4), 10.0);
    }

    #[test]
    fn test_clear_outside_reset_is_invalid_phase() {
        let mut field = ready_field();
        assert!(matches!(
            field.clear(),
            Err(DeformationError::InvalidPhase { operation: "clear", .. })
        ));
        assert!(DeformationField::default().request_reset().is_err());
    }

    #[test]
    fn test_plan_from_before_reset_rejected() {
        let mut field = ready_field();
        step(&mut field, Vec2::ZERO, 0.0, &[]);
        let stale = plan(&mut field, Vec2::ZERO, 0.5);
        field.request_reset().unwrap();
        field.clear().unwrap();
        let snapshot = Snapshot::new(&stale.request, contacts(&[(1, 1)])).unwrap();
        assert!(field.apply_update(stale, snapshot, &config()).is_err());
        assert_eq!(field.phase(), FieldPhase::Cleared);
    }

    #[test]
    fn test_release_returns_to_uninitialized() {
        let mut field = ready_field();
        step(&mut field, Vec2::ZERO, 0.0, &[]);
        field.release();
        assert_eq!(field.phase(), FieldPhase::Uninitialized);
        assert!(field.view().is_none());
        assert!(field.buffer_pair().is_none());
        field.initialize(&config()).unwrap();
        assert!(field.needs_first_capture());
    }

    // -------------------------------------------------------------------------
    // FieldView
    // -------------------------------------------------------------------------

    #[test]
    fn test_sample_world_outside_field_is_none() {
        let mut field = ready_field();
        step(&mut field, Vec2::ZERO, 0.0, &[]);
        let view = field.view().unwrap();
        assert!(view.sample_world(Vec2::new(-16.0, 0.0)).is_some());
        assert!(view.sample_world(Vec2::new(-20.0, 0.0)).is_none());
        assert!(view.sample_world(Vec2::new(0.0, 14.0)).is_some());
        assert!(view.sample_world(Vec2::new(0.0, 16.0)).is_none());
        assert!(view.sample_world(Vec2::new(f32::NAN, 0.0)).is_none());
        assert_eq!(view.normal_at(0, 0), Vec3::Y);
    }

    // -------------------------------------------------------------------------
    // Buffer roles under interleaved updates and reads
    // -------------------------------------------------------------------------

    #[test]
    fn test_readers_only_ever_see_the_published_buffer() {
        let mut rng = ChaCha8Rng::seed_from_u64(97);
        let cfg = DeformationConfig {
            temporal_filter_factor: 3.0,
            decay_rate: 2.0,
            ..config()
        };
        let mut field = DeformationField::default();
        field.initialize(&cfg).unwrap();

        let mut shadow = HeightGrid::new(R).unwrap();
        let mut pos = Vec2::ZERO;
        let mut last_generation = 0;

        for _ in 0..400 {
            if rng.gen_bool(0.6) {
                pos += Vec2::new(rng.gen_range(-6.0..6.0), rng.gen_range(-6.0..6.0));
                let dt = rng.gen_range(0.0..0.3);
                let plan = field
                    .begin_update(recentering_for(&field, pos), dt)
                    .unwrap();
                let texels: Vec<(usize, usize)> = (0..rng.gen_range(0..4))
                    .map(|_| (rng.gen_range(0..R), rng.gen_range(0..R)))
                    .collect();
                let grid = contacts(&texels);

                // A first capture merges with zero shift into the empty field.
                let mut expected = HeightGrid::new(R).unwrap();
                let params = UpdateParameters::from_config(&cfg, dt);
                run_height_pass(
                    &shadow,
                    &grid,
                    plan.recentering.shift.as_vec2(),
                    &params,
                    &mut expected,
                    KernelExecution::Serial,
                )
                .unwrap();
                shadow = expected;
                let snapshot = Snapshot::new(&plan.request, grid).unwrap();
                field.apply_update(plan, snapshot, &cfg).unwrap();
            }

            if let Some(view) = field.view() {
                assert!(view.generation >= last_generation);
                last_generation = view.generation;
                let pair = field.buffer_pair().unwrap();
                assert!(std::ptr::eq(view.heights, pair.current()));
                assert!(!std::ptr::eq(
                    view.heights,
                    pair.slot(pair.slot_for(FieldRole::Next))
                ));
                assert_eq!(view.heights, &shadow, "reader saw an unexpected buffer");
            }
        }
        assert!(last_generation > 100);
    }
}
