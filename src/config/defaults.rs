pub const DEFAULT_FRAME_CHANNEL_CAPACITY: usize = 64;
pub const MIN_FRAME_CHANNEL_CAPACITY: usize = 8;
pub const MAX_FRAME_CHANNEL_CAPACITY: usize = 1024;
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub(super) const MAX_DEVICE_NAME_BYTES: usize = 256;
pub(super) const MAX_DEVICE_ID_BYTES: usize = 128;
// Device ids are echoed into every envelope; keep them printable and shell-safe.
pub(super) const FORBIDDEN_ID_CHARS: &[char] = &[';', '|', '&', '$', '`', '<', '>', '\\', '\'', '"'];
