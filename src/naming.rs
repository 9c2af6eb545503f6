//! Deterministic names for gloss videos: object keys in the bucket and the
//! canonical filename derived from a gloss label.

/// Prefix under which every gloss video lives in the inputs bucket.
pub const VIDEO_KEY_PREFIX: &str = "inputs/Data_Videos/";

pub const VIDEO_EXTENSION: &str = ".mp4";

// Helper function to build the object key for a video filename
pub fn object_key(file_name: &str) -> String {
    format!("{}{}", VIDEO_KEY_PREFIX, file_name)
}

// Helper function to build the filename a gloss label should have
pub fn canonical_file_name(label: &str) -> String {
    format!("{}{}", label, VIDEO_EXTENSION)
}

/// Removes a trailing `.mp4`, leaving anything else (including `.mp4`
/// in the middle of the name) untouched.
pub fn strip_mp4_suffix(file_name: &str) -> &str {
    file_name.strip_suffix(VIDEO_EXTENSION).unwrap_or(file_name)
}
