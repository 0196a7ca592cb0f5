use std::ops::{Index, IndexMut};

use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Pitch,
    Roll,
    Yaw,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::Pitch, Axis::Roll, Axis::Yaw];
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Axis::Pitch => "pitch",
            Axis::Roll => "roll",
            Axis::Yaw => "yaw",
        };
        f.pad(name)
    }
}

/// One value per gimbal axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct AxisMap<T> {
    pub pitch: T,
    pub roll: T,
    pub yaw: T,
}

impl<T> AxisMap<T> {
    pub fn from_fn(mut f: impl FnMut(Axis) -> T) -> Self {
        Self {
            pitch: f(Axis::Pitch),
            roll: f(Axis::Roll),
            yaw: f(Axis::Yaw),
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(Axis, &T) -> U) -> AxisMap<U> {
        AxisMap {
            pitch: f(Axis::Pitch, &self.pitch),
            roll: f(Axis::Roll, &self.roll),
            yaw: f(Axis::Yaw, &self.yaw),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Axis, &T)> {
        [(Axis::Pitch, &self.pitch), (Axis::Roll, &self.roll), (Axis::Yaw, &self.yaw)].into_iter()
    }
}

impl<T> Index<Axis> for AxisMap<T> {
    type Output = T;

    fn index(&self, axis: Axis) -> &T {
        match axis {
            Axis::Pitch => &self.pitch,
            Axis::Roll => &self.roll,
            Axis::Yaw => &self.yaw,
        }
    }
}

impl<T> IndexMut<Axis> for AxisMap<T> {
    fn index_mut(&mut self, axis: Axis) -> &mut T {
        match axis {
            Axis::Pitch => &mut self.pitch,
            Axis::Roll => &mut self.roll,
            Axis::Yaw => &mut self.yaw,
        }
    }
}
