use std::sync::atomic::{AtomicU32, Ordering};

use glam::Vec3;

use crate::movement::{select_speed_category, MovementFlags};
use crate::net::{fits_packed_xyz, MessageSink, MonsterMove};
use crate::unit::{ms_time, Mover};

use super::args::{MoveSplineInitArgs, Rejected, SpeedContext};
use super::flags::{normalize_orientation, FacingSpec, SplineFlags};
use super::move_spline::{Location, MoveSpline};
use super::transform::TransportPathTransform;

static NEXT_SPLINE_ID: AtomicU32 = AtomicU32::new(1);

/// Process-wide spline id; never 0.
fn next_spline_id() -> u32 {
    loop {
        let id = NEXT_SPLINE_ID.fetch_add(1, Ordering::Relaxed);
        if id != 0 {
            return id;
        }
    }
}

/// Stages a motion order for `mover` and commits it with [`launch`] or
/// [`stop`].
///
/// [`launch`]: MoveSplineInit::launch
/// [`stop`]: MoveSplineInit::stop
pub struct MoveSplineInit<'a, M: Mover + ?Sized> {
    mover: &'a mut M,
    args: MoveSplineInitArgs,
}

impl<'a, M: Mover + ?Sized> MoveSplineInit<'a, M> {
    pub fn new(mover: &'a mut M) -> Self {
        let mut args = MoveSplineInitArgs::default();
        args.spline_id = next_spline_id();

        let movement_flags = mover.movement_flags();
        args.flags.set(SplineFlags::WALKMODE, movement_flags.is_walking());
        if movement_flags.intersects(MovementFlags::CAN_FLY | MovementFlags::DISABLE_GRAVITY) {
            args.flags.enable_flying();
        }
        args.flags.insert(SplineFlags::SMOOTH_GROUND_PATH);
        args.transform_for_transport = mover.transport().is_some();

        Self { mover, args }
    }

    pub fn args(&self) -> &MoveSplineInitArgs {
        &self.args
    }

    fn transform(&self) -> TransportPathTransform<'_> {
        TransportPathTransform::new(&*self.mover, self.args.transform_for_transport)
    }

    pub fn move_to(&mut self, destination: Vec3) -> &mut Self {
        let local = self.transform().to_local(destination);
        self.args.path_idx_offset = 0;
        self.args.path.clear();
        self.args.path.extend([Vec3::ZERO, local]);
        self
    }

    pub fn move_to_xyz(&mut self, x: f32, y: f32, z: f32) -> &mut Self {
        self.move_to(Vec3::new(x, y, z))
    }

    /// Follows `path` in world space. The first point is replaced by the
    /// mover's position at commit; `point_id` numbers the waypoints for
    /// progress reporting.
    pub fn move_by_path(&mut self, path: &[Vec3], point_id: i32) -> &mut Self {
        let transform = self.transform();
        let local: Vec<Vec3> = path.iter().map(|point| transform.to_local(*point)).collect();
        self.args.path_idx_offset = point_id;
        self.args.path = local;
        self
    }

    pub fn set_facing_angle(&mut self, angle: f32) -> &mut Self {
        let local = self.transform().to_local_angle(angle);
        self.args.facing = FacingSpec::Angle(normalize_orientation(local));
        self
    }

    pub fn set_facing_target<T: Mover + ?Sized>(&mut self, target: &T) -> &mut Self {
        self.set_facing_guid(target.guid())
    }

    pub fn set_facing_guid(&mut self, guid: u64) -> &mut Self {
        self.args.facing = FacingSpec::Target(guid);
        self
    }

    pub fn set_facing_spot(&mut self, spot: Vec3) -> &mut Self {
        let local = self.transform().to_local(spot);
        self.args.facing = FacingSpec::Spot(local);
        self
    }

    pub fn set_fall(&mut self) -> &mut Self {
        self.args.flags.enable_falling();
        if self.mover.movement_flags().contains(MovementFlags::FALLING_SLOW) {
            self.args.flags.insert(SplineFlags::FALLING_SLOW);
        }
        self
    }

    pub fn set_walk(&mut self, enable: bool) -> &mut Self {
        self.args.flags.set(SplineFlags::WALKMODE, enable);
        self
    }

    pub fn set_fly(&mut self) -> &mut Self {
        self.args.flags.enable_flying();
        self
    }

    /// Catmull-Rom curve, sent uncompressed.
    pub fn set_smooth(&mut self) -> &mut Self {
        self.args.flags.enable_catmull_rom();
        self
    }

    pub fn set_uncompressed(&mut self) -> &mut Self {
        self.args.flags.insert(SplineFlags::UNCOMPRESSED_PATH);
        self
    }

    pub fn set_cyclic(&mut self) -> &mut Self {
        self.args.flags.insert(SplineFlags::CYCLIC);
        self
    }

    /// Fixed speed in units per second, bypassing the speed table.
    pub fn set_velocity(&mut self, velocity: f32) -> &mut Self {
        self.args.velocity = velocity;
        self.args.has_velocity = true;
        self
    }

    pub fn set_backward(&mut self) -> &mut Self {
        self.args.flags.insert(SplineFlags::BACKWARD);
        self
    }

    pub fn set_orientation_fixed(&mut self, enable: bool) -> &mut Self {
        self.args.flags.set(SplineFlags::ORIENTATION_FIXED, enable);
        self
    }

    /// Arc of height `amplitude` starting after `time_shift` of the duration.
    pub fn set_parabolic(&mut self, amplitude: f32, time_shift: f32) -> &mut Self {
        self.args.time_perc = time_shift;
        self.args.parabolic_amplitude = amplitude;
        self.args.flags.enable_parabolic();
        self
    }

    pub fn set_animation(&mut self, anim: u8) -> &mut Self {
        self.args.time_perc = 0.0;
        self.args.flags.enable_animation(anim);
        self
    }

    pub fn set_transport_enter(&mut self) -> &mut Self {
        self.args.flags.enable_transport_enter();
        self
    }

    pub fn set_transport_exit(&mut self) -> &mut Self {
        self.args.flags.enable_transport_exit();
        self
    }

    /// Keeps later points and facings in world space even when attached.
    pub fn disable_transport_path_transformations(&mut self) -> &mut Self {
        self.args.transform_for_transport = false;
        self
    }

    fn on_transport(&self) -> bool {
        self.args.transform_for_transport && self.mover.transport().is_some()
    }

    /// Where the new spline starts: the running spline's current sample when
    /// it lives in the same frame, otherwise the mover's resting position.
    fn anchor(&self, on_transport: bool) -> Location {
        let current = self.mover.move_spline();
        if !current.finalized() && current.on_transport() == on_transport {
            return current.compute_position();
        }
        self.resting_location(on_transport)
    }

    /// Raw position, or the seat offset when the order is transport-relative.
    fn resting_location(&self, on_transport: bool) -> Location {
        match self.mover.transport() {
            Some(transport) if on_transport => {
                Location::new(transport.local_offset, transport.local_orientation)
            }
            _ => Location::new(self.mover.anchor_position(), self.mover.orientation()),
        }
    }

    /// Resolves and validates the staged order without touching the mover.
    ///
    /// Returns the spline to install and the movement flags to apply.
    pub fn prepare(&self) -> Result<(MoveSpline, MovementFlags), Rejected> {
        let on_transport = self.on_transport();
        let mut args = self.args.clone();

        if args.path.len() < 2 {
            return Err(Rejected::EmptyPath);
        }
        let anchor = self.anchor(on_transport);
        args.path[0] = anchor.position;
        args.initial_orientation = anchor.orientation;

        let mut movement_flags = self.mover.movement_flags();
        movement_flags.set(MovementFlags::WALKING, args.flags.contains(SplineFlags::WALKMODE));
        movement_flags.insert(MovementFlags::FORWARD);

        let category = select_speed_category(movement_flags);
        let tabulated = self.mover.speed(category);
        if !args.has_velocity {
            args.velocity = tabulated;
        }

        args.check(SpeedContext {
            flags: movement_flags,
            category,
            tabulated,
        })?;

        if movement_flags.is_rooted() {
            movement_flags.strip_moving();
        }

        if args.flags.contains(SplineFlags::CYCLIC) {
            args.flags.insert(SplineFlags::UNCOMPRESSED_PATH | SplineFlags::ENTER_CYCLE);
        } else if !args.flags.contains(SplineFlags::UNCOMPRESSED_PATH) && !offsets_fit(&args.path) {
            args.flags.insert(SplineFlags::UNCOMPRESSED_PATH);
        }

        Ok((MoveSpline::initialize(&args, on_transport), movement_flags))
    }

    /// Commits the order and broadcasts it. Returns the spline duration in
    /// milliseconds, or `None` when the order was rejected.
    pub fn launch(self, sink: &mut impl MessageSink) -> Option<i32> {
        let guid = self.mover.guid();
        let (move_spline, movement_flags) = match self.prepare() {
            Ok(prepared) => prepared,
            Err(Rejected::EmptyPath) => {
                log::debug!("unit {guid:#x}: nothing to launch");
                return None;
            }
            Err(err) => {
                log::error!("unit {guid:#x}: spline not launched: {err}");
                return None;
            }
        };

        let packet = MonsterMove::launch(&*self.mover, &move_spline);
        let payload = match packet.encode() {
            Ok(payload) => payload,
            Err(err) => {
                log::error!("unit {guid:#x}: spline not launched: {err}");
                return None;
            }
        };

        let duration = move_spline.duration();
        self.mover.set_movement_flags(movement_flags);
        *self.mover.move_spline_mut() = move_spline;

        log::debug!(
            "unit {guid:#x}: spline {} launched, {} ms to {}",
            packet.move_ticks,
            duration,
            packet.destination
        );
        sink.send_to_set(guid, &payload, true);

        Some(duration)
    }

    /// Halts the mover. Without `force` the running spline is sampled so the
    /// unit stops where it is drawn, and a mover that is not following a
    /// spline is left alone. With `force` the stop is always sent, anchored
    /// at the raw position. Returns whether a stop was sent.
    pub fn stop(self, force: bool, sink: &mut impl MessageSink) -> bool {
        if self.mover.move_spline().finalized() && !force {
            return false;
        }

        let guid = self.mover.guid();
        let on_transport = self.on_transport();
        let location = if force {
            self.resting_location(on_transport)
        } else {
            self.anchor(on_transport)
        };

        let packet = MonsterMove::stop(&*self.mover, location.position, on_transport, ms_time());
        let payload = match packet.encode() {
            Ok(payload) => payload,
            Err(err) => {
                log::error!("unit {guid:#x}: stop not sent: {err}");
                return false;
            }
        };

        let mut args = MoveSplineInitArgs::new(1);
        args.path.push(location.position);
        args.flags = SplineFlags::DONE;
        args.spline_id = self.args.spline_id;
        args.initial_orientation = location.orientation;

        let mut movement_flags = self.mover.movement_flags();
        movement_flags.remove(MovementFlags::FORWARD);
        self.mover.set_movement_flags(movement_flags);
        *self.mover.move_spline_mut() = MoveSpline::initialize(&args, on_transport);

        log::debug!("unit {guid:#x}: stopped at {}", location.position);
        sink.send_to_set(guid, &payload, true);

        true
    }
}

/// Whether every interior waypoint packs relative to the path midpoint.
fn offsets_fit(path: &[Vec3]) -> bool {
    match path {
        [first, interior @ .., last] => {
            let middle = (*first + *last) * 0.5;
            interior.iter().all(|point| fits_packed_xyz(middle - *point))
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use super::*;
    use crate::movement::{SpeedCategory, SpeedTable};
    use crate::net::{MovePath, PacketLog};
    use crate::spline::SplineState;
    use crate::unit::{TransportFrame, Unit};

    fn unit() -> Unit {
        Unit::new(crate::unit::UNIT_GUID_HIGH | 0x10, Vec3::ZERO)
    }

    #[test]
    fn new_seeds_from_movement_flags() {
        let mut unit = unit();
        unit.movement_flags = MovementFlags::WALKING | MovementFlags::CAN_FLY;
        let init = MoveSplineInit::new(&mut unit);

        let flags = init.args().flags;
        assert!(flags.contains(SplineFlags::WALKMODE));
        assert!(flags.contains(SplineFlags::FLYING));
        assert!(flags.contains(SplineFlags::SMOOTH_GROUND_PATH));
        assert!(!init.args().transform_for_transport);
        assert_ne!(init.args().spline_id, 0);
    }

    #[test]
    fn spline_ids_are_unique() {
        let mut unit = unit();
        let a = MoveSplineInit::new(&mut unit).args().spline_id;
        let b = MoveSplineInit::new(&mut unit).args().spline_id;
        assert_ne!(a, b);
    }

    #[test]
    fn prepare_does_not_touch_mover() {
        let mut unit = unit();
        let mut init = MoveSplineInit::new(&mut unit);
        init.move_to(Vec3::new(10.0, 0.0, 0.0));

        let (spline, flags) = init.prepare().unwrap();
        assert_eq!(spline.duration(), 1428);
        assert!(flags.contains(MovementFlags::FORWARD));

        assert_eq!(unit.move_spline.state(), SplineState::Uncommitted);
        assert!(unit.movement_flags.is_empty());
    }

    #[test]
    fn rejection_carries_speed_context() {
        let mut unit = unit().with_speeds(SpeedTable::default().with(SpeedCategory::Run, 0.05));
        let mut init = MoveSplineInit::new(&mut unit);
        init.move_to(Vec3::new(10.0, 0.0, 0.0));

        match init.prepare() {
            Err(Rejected::VelocityTooLow {
                velocity,
                has_velocity,
                speed,
            }) => {
                assert_eq!(velocity, 0.05);
                assert_eq!(speed.tabulated, 0.05);
                assert_eq!(speed.category, SpeedCategory::Run);
                assert!(speed.flags.contains(MovementFlags::FORWARD));
                assert!(!has_velocity);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn explicit_velocity_skips_table() {
        let mut unit = unit();
        let mut init = MoveSplineInit::new(&mut unit);
        init.move_to(Vec3::new(10.0, 0.0, 0.0)).set_velocity(10.0);
        let (spline, _) = init.prepare().unwrap();
        assert_eq!(spline.duration(), 1000);
    }

    #[test]
    fn walk_mode_uses_walk_speed() {
        let mut unit = unit();
        let mut init = MoveSplineInit::new(&mut unit);
        init.move_to(Vec3::new(10.0, 0.0, 0.0)).set_walk(true);
        let (spline, flags) = init.prepare().unwrap();

        assert!(flags.is_walking());
        assert_eq!(spline.duration(), 4000);
    }

    #[test]
    fn root_strips_moving_flags_but_commits() {
        let mut unit = unit();
        unit.movement_flags = MovementFlags::ROOT;
        let mut sink = PacketLog::default();

        let mut init = MoveSplineInit::new(&mut unit);
        init.move_to(Vec3::new(10.0, 0.0, 0.0));
        assert!(init.launch(&mut sink).is_some());

        assert_eq!(unit.movement_flags, MovementFlags::ROOT);
        assert!(unit.is_moving());
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn set_fall_copies_slow_fall() {
        let mut unit = unit();
        unit.movement_flags = MovementFlags::FALLING_SLOW;
        let mut init = MoveSplineInit::new(&mut unit);
        init.set_fall();

        let flags = init.args().flags;
        assert!(flags.contains(SplineFlags::FALLING | SplineFlags::FALLING_SLOW));
    }

    #[test]
    fn facing_angle_relative_to_transport() {
        let mut unit = unit();
        unit.board(TransportFrame::new(0x55, Vec3::new(50.0, 0.0, 0.0), 1.0));

        let mut init = MoveSplineInit::new(&mut unit);
        init.set_facing_angle(0.5);
        match init.args().facing {
            FacingSpec::Angle(angle) => assert!((angle - (2.0 * PI - 0.5)).abs() < 1e-5),
            other => panic!("unexpected {other:?}"),
        }

        let mut driving = self::unit();
        let mut frame = TransportFrame::new(0x56, Vec3::ZERO, 1.0);
        frame.vehicle_orientation = Some(0.25);
        driving.board(frame);
        let mut init = MoveSplineInit::new(&mut driving);
        init.set_facing_angle(0.5);
        assert_eq!(init.args().facing, FacingSpec::Angle(0.25));
    }

    #[test]
    fn disabled_transform_keeps_world_facing() {
        let mut unit = unit();
        unit.board(TransportFrame::new(0x55, Vec3::ZERO, 1.0));

        let mut init = MoveSplineInit::new(&mut unit);
        init.disable_transport_path_transformations().set_facing_angle(0.5);
        assert_eq!(init.args().facing, FacingSpec::Angle(0.5));
    }

    #[test]
    fn far_interior_points_fall_back_to_uncompressed() {
        let mut unit = unit();
        let mut init = MoveSplineInit::new(&mut unit);
        init.move_by_path(
            &[Vec3::ZERO, Vec3::new(600.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 0.0)],
            0,
        );
        let (spline, _) = init.prepare().unwrap();
        assert!(spline.flags().contains(SplineFlags::UNCOMPRESSED_PATH));

        let mut init = MoveSplineInit::new(&mut unit);
        init.move_by_path(
            &[Vec3::ZERO, Vec3::new(6.0, 3.0, 0.0), Vec3::new(10.0, 0.0, 0.0)],
            0,
        );
        let (spline, _) = init.prepare().unwrap();
        assert!(!spline.flags().contains(SplineFlags::UNCOMPRESSED_PATH));
    }

    #[test]
    fn cyclic_derives_flags() {
        let mut unit = unit();
        let mut init = MoveSplineInit::new(&mut unit);
        init.move_by_path(
            &[Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), Vec3::new(10.0, 10.0, 0.0)],
            0,
        )
        .set_cyclic();
        let (spline, _) = init.prepare().unwrap();
        let flags = spline.flags();
        assert!(flags.contains(SplineFlags::CYCLIC | SplineFlags::UNCOMPRESSED_PATH));
        assert!(flags.contains(SplineFlags::ENTER_CYCLE));
    }

    #[test]
    fn relaunch_starts_from_current_sample() {
        let mut unit = unit();
        let mut sink = PacketLog::default();

        let mut init = MoveSplineInit::new(&mut unit);
        init.move_to(Vec3::new(14.0, 0.0, 0.0));
        init.launch(&mut sink);
        unit.move_spline.update_state(1000);

        let mut init = MoveSplineInit::new(&mut unit);
        init.move_to(Vec3::new(7.0, 7.0, 0.0));
        let (spline, _) = init.prepare().unwrap();
        let start = spline.spline().real_points()[0];
        assert!(start.distance(Vec3::new(7.0, 0.0, 0.0)) < 1e-3);
    }

    #[test]
    fn stop_without_force_needs_active_spline() {
        let mut unit = unit();
        let mut sink = PacketLog::default();

        assert!(!MoveSplineInit::new(&mut unit).stop(false, &mut sink));
        assert!(sink.is_empty());

        assert!(MoveSplineInit::new(&mut unit).stop(true, &mut sink));
        assert_eq!(sink.len(), 1);
        assert_eq!(unit.move_spline.state(), SplineState::Finalized);
    }

    #[test]
    fn builder_flag_setters() {
        let mut unit = unit();
        let mut init = MoveSplineInit::new(&mut unit);
        init.move_to_xyz(3.0, 4.0, 0.0)
            .set_uncompressed()
            .set_backward()
            .set_orientation_fixed(true)
            .set_transport_enter();

        let flags = init.args().flags;
        assert!(flags.contains(
            SplineFlags::UNCOMPRESSED_PATH
                | SplineFlags::BACKWARD
                | SplineFlags::ORIENTATION_FIXED
                | SplineFlags::TRANSPORT_ENTER
        ));
        assert_eq!(init.args().path, vec![Vec3::ZERO, Vec3::new(3.0, 4.0, 0.0)]);

        init.set_transport_exit().set_orientation_fixed(false).set_fly();
        let flags = init.args().flags;
        assert!(flags.contains(SplineFlags::TRANSPORT_EXIT | SplineFlags::FLYING));
        assert!(!flags.intersects(SplineFlags::TRANSPORT_ENTER | SplineFlags::ORIENTATION_FIXED));
    }

    #[test]
    fn parabolic_arc_timing() {
        let mut unit = unit();
        let mut init = MoveSplineInit::new(&mut unit);
        init.move_to(Vec3::new(10.0, 0.0, 0.0)).set_parabolic(3.0, 0.5);
        assert_eq!(init.args().time_perc, 0.5);

        let (spline, _) = init.prepare().unwrap();
        assert!(spline.flags().contains(SplineFlags::PARABOLIC));
        assert_eq!(spline.effect_start_time(), spline.duration() / 2);
        assert!(spline.vertical_acceleration() > 0.0);
    }

    #[test]
    fn animation_replaces_arc() {
        let mut unit = unit();
        let mut sink = PacketLog::default();
        let mut init = MoveSplineInit::new(&mut unit);
        init.move_to(Vec3::new(10.0, 0.0, 0.0))
            .set_parabolic(3.0, 0.5)
            .set_animation(3);
        assert_eq!(init.args().time_perc, 0.0);
        init.launch(&mut sink);

        let flags = unit.move_spline.flags();
        assert!(flags.contains(SplineFlags::ANIMATION));
        assert!(!flags.contains(SplineFlags::PARABOLIC));
        assert_eq!(unit.move_spline.vertical_acceleration(), 0.0);

        let packet = MonsterMove::decode(&sink.last().unwrap().payload).unwrap();
        assert_eq!(packet.animation_id, 3);
        assert_eq!(packet.flags & SplineFlags::MASK_ANIMATIONS.bits(), 0);
    }

    #[test]
    fn forced_stop_uses_raw_position() {
        let mut unit = unit();
        let mut sink = PacketLog::default();

        let mut init = MoveSplineInit::new(&mut unit);
        init.move_to(Vec3::new(14.0, 0.0, 0.0));
        init.launch(&mut sink);
        // spline runs ahead of the unit's stored position
        unit.move_spline.update_state(1000);

        assert!(MoveSplineInit::new(&mut unit).stop(true, &mut sink));
        let packet = MonsterMove::decode(&sink.last().unwrap().payload).unwrap();
        assert_eq!(packet.path, MovePath::Stop(Vec3::ZERO));
        assert!(unit.move_spline.finalized());
    }
}
