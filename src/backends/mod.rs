//! Backend adapters bridging opaque recognition models to the pipeline.
//!
//! The trained network's forward-pass mathematics stay external, behind the
//! [`SequenceNetwork`] and [`GlyphRecognizer`] traits; the adapters here
//! translate between those models and the uniform
//! [`RecognitionBackend`](crate::core::RecognitionBackend) capability
//! interface the pipeline is written against.
//!
//! [`SequenceNetwork`]: crate::core::SequenceNetwork
//! [`GlyphRecognizer`]: crate::core::GlyphRecognizer

pub mod codec;
pub mod direct;
pub mod lattice;

pub use codec::Codec;
pub use direct::DirectBackend;
pub use lattice::{prepare_line, LatticeBackend};
