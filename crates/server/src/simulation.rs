use std::f32::consts::TAU;

use glam::Vec3;

use movespline::{MessageSink, MoveSplineInit, Unit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatrolStyle {
    /// Walks one waypoint at a time, turning towards the next on arrival.
    Waypoint,
    /// Runs the whole route as one Catmull-Rom spline.
    Smooth,
    /// Loops the route forever.
    Circuit,
}

impl PatrolStyle {
    pub fn for_index(index: usize) -> Self {
        match index % 3 {
            0 => PatrolStyle::Waypoint,
            1 => PatrolStyle::Smooth,
            _ => PatrolStyle::Circuit,
        }
    }
}

/// Evenly spaced points on a horizontal circle.
pub fn patrol_route(center: Vec3, radius: f32, points: usize, phase: f32) -> Vec<Vec3> {
    let points = points.max(2);
    (0..points)
        .map(|i| {
            let angle = phase + TAU * i as f32 / points as f32;
            center + Vec3::new(angle.cos() * radius, angle.sin() * radius, 0.0)
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Patrol {
    pub style: PatrolStyle,
    route: Vec<Vec3>,
    next: usize,
    wait_ms: u32,
}

impl Patrol {
    pub fn new(style: PatrolStyle, route: Vec<Vec3>) -> Self {
        Self {
            style,
            route,
            next: 1,
            wait_ms: 0,
        }
    }

    pub fn start(&self) -> Vec3 {
        self.route[0]
    }

    pub fn next_waypoint(&self) -> Vec3 {
        self.route[self.next % self.route.len()]
    }

    pub fn rest(&mut self, wait_ms: u32) {
        self.wait_ms = wait_ms;
    }

    /// Counts down the rest period; true once the unit may move again.
    pub fn countdown(&mut self, elapsed_ms: u32) -> bool {
        self.wait_ms = self.wait_ms.saturating_sub(elapsed_ms);
        self.wait_ms == 0
    }

    /// Sends `unit` on its next leg. Returns the spline duration.
    pub fn issue(&mut self, unit: &mut Unit, sink: &mut impl MessageSink) -> Option<i32> {
        let len = self.route.len();
        let mut init = MoveSplineInit::new(unit);

        match self.style {
            PatrolStyle::Waypoint => {
                let target = self.route[self.next % len];
                let after = self.route[(self.next + 1) % len];
                init.move_to(target).set_walk(true).set_facing_spot(after);
                self.next = (self.next + 1) % len;
            }
            PatrolStyle::Smooth => {
                let mut path = Vec::with_capacity(len + 1);
                path.push(Vec3::ZERO);
                path.extend((0..len).map(|i| self.route[(self.next + i) % len]));
                init.move_by_path(&path, 0).set_smooth();
            }
            PatrolStyle::Circuit => {
                init.move_by_path(&self.route, 0).set_cyclic();
            }
        }

        init.launch(sink)
    }
}
