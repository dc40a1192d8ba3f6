pub mod jsonc;
pub mod manifest;
pub mod math;
pub mod role;
pub mod settings;
pub mod sidecar;
