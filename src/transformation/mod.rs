//! Transformation canonicalizer and compiler
//!
//! Options go in, a compact path token comes out:
//!
//! ```text
//! {width: 100, crop: "fill", transformation: [{effect: "sepia"}]}
//!     -> e_sepia/c_fill,w_100
//! ```

pub mod canonicalize;
pub mod compiler;
pub mod param;

pub use canonicalize::{canonicalize, Canonicalized};
pub use compiler::{
    generate_transformation_string, CanonicalParam, CompiledTransformation, HtmlSize,
    TransformationChain, TransformationSegment,
};
pub use param::{Codec, Color, Coordinates, Layer, Offset, OffsetRange, ParamKey};
