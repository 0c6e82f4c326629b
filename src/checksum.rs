pub type Checksum = u32;

pub const CHECKSUM_SEED: Checksum = 0x12345678;

const ROTATION: u32 = 5;

/// Rotate-and-xor rolling hash used to detect corrupted block content.
///
/// Order sensitive and cheap. Not a cryptographic digest: anyone can craft
/// colliding inputs.
#[derive(Clone, Copy, Debug)]
pub struct RollingChecksum {
    state: Checksum,
}

impl RollingChecksum {
    pub fn new() -> Self {
        Self {
            state: CHECKSUM_SEED,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.state = self.state.rotate_left(ROTATION) ^ byte as Checksum;
        }
    }

    pub fn finalize(self) -> Checksum {
        self.state
    }
}

pub fn checksum(data: &[u8]) -> Checksum {
    let mut hasher = RollingChecksum::new();
    hasher.update(data);
    hasher.finalize()
}
