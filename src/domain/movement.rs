// Per-tick control snapshot produced by the input collaborator.

use bitflags::bitflags;

bitflags! {
    /// Packed control flags. Equality compares the packed byte, so detecting
    /// an input change is a single integer comparison.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Movement: u8 {
        const FORWARD = 1 << 0;
        const BACKWARD = 1 << 1;
        const TURN_LEFT = 1 << 2;
        const TURN_RIGHT = 1 << 3;
        const BOOST = 1 << 4;
        const HYPERBOOST = 1 << 5;
        const PRIMARY_FIRE = 1 << 6;
    }
}

impl Movement {
    pub fn forward(self) -> bool {
        self.contains(Self::FORWARD)
    }

    pub fn backward(self) -> bool {
        self.contains(Self::BACKWARD)
    }

    pub fn turn_left(self) -> bool {
        self.contains(Self::TURN_LEFT)
    }

    pub fn turn_right(self) -> bool {
        self.contains(Self::TURN_RIGHT)
    }

    pub fn boost(self) -> bool {
        self.contains(Self::BOOST)
    }

    pub fn hyperboost(self) -> bool {
        self.contains(Self::HYPERBOOST)
    }

    pub fn primary_fire(self) -> bool {
        self.contains(Self::PRIMARY_FIRE)
    }
}
