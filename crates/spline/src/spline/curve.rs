use glam::Vec3;

const CATMULL_ROM_LENGTH_STEPS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplineMode {
    #[default]
    Linear,
    CatmullRom,
}

/// Parametric curve over a padded control-point list.
///
/// The real path is bracketed by one boundary point on each side so every
/// segment has neighbours for tangent computation. Cyclic curves carry the
/// wrap-around points instead: `[last, p0..pn, p0, p1]`.
///
/// Times are integer milliseconds: `lengths[i]` is the time at which the
/// mover passes padded point `i`.
#[derive(Debug, Clone, Default)]
pub struct Spline {
    points: Vec<Vec3>,
    lengths: Vec<i32>,
    mode: SplineMode,
    cyclic: bool,
    index_lo: usize,
    index_hi: usize,
}

impl Spline {
    pub fn new(controls: &[Vec3], mode: SplineMode, cyclic: bool) -> Self {
        let count = controls.len();
        if count == 0 {
            return Self::default();
        }

        let mut points = Vec::with_capacity(count + 3);
        if cyclic && count > 1 {
            points.push(controls[count - 1]);
            points.extend_from_slice(controls);
            points.push(controls[0]);
            points.push(controls[1]);
        } else {
            points.push(controls[0]);
            points.extend_from_slice(controls);
            points.push(controls[count - 1]);
        }

        let cyclic = cyclic && count > 1;
        let index_hi = if cyclic { count + 1 } else { count };

        Self {
            lengths: vec![0; points.len()],
            points,
            mode,
            cyclic,
            index_lo: 1,
            index_hi,
        }
    }

    /// A curve that stays on a single point.
    pub fn stationary(point: Vec3) -> Self {
        Self::new(&[point], SplineMode::Linear, false)
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_cyclic(&self) -> bool {
        self.cyclic
    }

    /// Padded point count.
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn point(&self, index: usize) -> Vec3 {
        self.points[index]
    }

    pub fn first(&self) -> usize {
        self.index_lo
    }

    pub fn last(&self) -> usize {
        self.index_hi
    }

    /// The path as it was handed in, without padding.
    pub fn real_points(&self) -> &[Vec3] {
        if self.points.is_empty() {
            return &[];
        }
        let real = if self.cyclic {
            self.index_hi - self.index_lo
        } else {
            self.index_hi - self.index_lo + 1
        };
        &self.points[self.index_lo..self.index_lo + real]
    }

    pub fn length_at(&self, index: usize) -> i32 {
        self.lengths[index]
    }

    /// Total traversal time in milliseconds.
    pub fn length(&self) -> i32 {
        if self.points.is_empty() {
            return 0;
        }
        self.lengths[self.index_hi] - self.lengths[self.index_lo]
    }

    pub fn segment_length(&self, index: usize) -> f32 {
        match self.mode {
            SplineMode::Linear => self.points[index].distance(self.points[index + 1]),
            SplineMode::CatmullRom => {
                let mut length = 0.0;
                let mut previous = self.points[index];
                for step in 1..=CATMULL_ROM_LENGTH_STEPS {
                    let u = step as f32 / CATMULL_ROM_LENGTH_STEPS as f32;
                    let next = self.evaluate(index, u);
                    length += previous.distance(next);
                    previous = next;
                }
                length
            }
        }
    }

    /// Fills the time table. `time_at` receives a segment index `i` and
    /// returns the cumulative time at which point `i + 1` is reached.
    pub fn init_lengths<F>(&mut self, mut time_at: F)
    where
        F: FnMut(&Spline, usize) -> i32,
    {
        if self.points.is_empty() {
            return;
        }

        self.lengths[self.index_lo] = 0;
        let mut previous = 0;
        for index in self.index_lo..self.index_hi {
            // never let time run backwards
            let time = time_at(self, index).max(previous);
            self.lengths[index + 1] = time;
            previous = time;
        }
    }

    pub fn set_length(&mut self, index: usize, time: i32) {
        self.lengths[index] = time;
    }

    /// Segment index containing time `t`, clamped to the curve.
    pub fn compute_index(&self, t: i32) -> usize {
        let mut index = self.index_lo;
        while index + 1 < self.index_hi && self.lengths[index + 1] <= t {
            index += 1;
        }
        index
    }

    /// Segment index and progress within it for time `t`.
    pub fn segment_at(&self, t: i32) -> (usize, f32) {
        let index = self.compute_index(t);
        if index >= self.index_hi {
            return (index, 0.0);
        }
        let start = self.lengths[index];
        let span = self.lengths[index + 1] - start;
        let u = if span > 0 {
            ((t - start) as f32 / span as f32).clamp(0.0, 1.0)
        } else {
            1.0
        };
        (index, u)
    }

    pub fn evaluate(&self, index: usize, u: f32) -> Vec3 {
        if self.points.is_empty() {
            return Vec3::ZERO;
        }
        if index >= self.index_hi {
            return self.points[self.index_hi];
        }

        match self.mode {
            SplineMode::Linear => self.points[index].lerp(self.points[index + 1], u),
            SplineMode::CatmullRom => {
                let [p0, p1, p2, p3] = self.neighbourhood(index);
                let u2 = u * u;
                let u3 = u2 * u;
                0.5 * ((2.0 * p1)
                    + (p2 - p0) * u
                    + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * u2
                    + (3.0 * p1 - p0 - 3.0 * p2 + p3) * u3)
            }
        }
    }

    pub fn evaluate_derivative(&self, index: usize, u: f32) -> Vec3 {
        if self.points.is_empty() || index >= self.index_hi {
            return Vec3::ZERO;
        }

        match self.mode {
            SplineMode::Linear => self.points[index + 1] - self.points[index],
            SplineMode::CatmullRom => {
                let [p0, p1, p2, p3] = self.neighbourhood(index);
                0.5 * ((p2 - p0)
                    + 2.0 * (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * u
                    + 3.0 * (3.0 * p1 - p0 - 3.0 * p2 + p3) * u * u)
            }
        }
    }

    /// Position at elapsed time `t` milliseconds.
    pub fn position_at(&self, t: i32) -> Vec3 {
        let (index, u) = self.segment_at(t);
        self.evaluate(index, u)
    }

    pub fn is_finished_at(&self, t: i32) -> bool {
        !self.cyclic && t >= self.length()
    }

    fn neighbourhood(&self, index: usize) -> [Vec3; 4] {
        let last = self.points.len() - 1;
        [
            self.points[index.saturating_sub(1)],
            self.points[index],
            self.points[(index + 1).min(last)],
            self.points[(index + 2).min(last)],
        ]
    }
}
