//! Media information module
//!
//! Typed views over ffprobe output: the stream catalog of an input file and
//! the HDR side data of its first video frame.

pub mod catalog;
pub mod hdr;

// Re-export commonly used types
pub use catalog::{
    CodecType, DEFAULT_PIXEL_FORMAT, Disposition, StreamCatalog, StreamDescriptor,
    TEN_BIT_PIXEL_FORMAT,
};
pub use hdr::{ContentLightLevel, HdrMetadata, MasteringDisplay};
