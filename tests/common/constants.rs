//! Shared constants for end-to-end tests

// ============================================================================
// Track IDs
// ============================================================================

pub const TRACK_1_ID: &str = "track-1";
pub const TRACK_2_ID: &str = "track-2";
pub const TRACK_3_ID: &str = "track-3";
pub const MISSING_TRACK_ID: &str = "missing-track";

// ============================================================================
// Payloads
// ============================================================================

/// Size of generated audio payloads, well above the plausibility threshold.
pub const AUDIO_PAYLOAD_LEN: usize = 16 * 1024;

/// Side of generated square cover images.
pub const COVER_SIDE: u32 = 48;

// ============================================================================
// Run settings
// ============================================================================

/// Attempts per asset used by every test run.
pub const TEST_MAX_ATTEMPTS: u32 = 2;

/// Number of cover header sets tried per cover resolution.
pub const COVER_VARIANTS: usize = 3;
